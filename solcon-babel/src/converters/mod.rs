pub mod cisco;
pub mod nokia;
pub mod sol6_to_tosca;
