//! Command-line interface for solcon
//! Converts TOSCA VNF descriptors to SOL006 and back.
//!
//! Usage:
//!   solcon `<file>` [-o `<out>`] [-r `<provider>`] [--format json|yaml]   - TOSCA to SOL006
//!   solcon `<file>` --reverse                                             - SOL006 to TOSCA
//!   solcon --list-converters                                              - List converters
//!
//! Settings come from the embedded defaults, then `--settings <file>`, then flags.

use clap::{Arg, ArgAction, ArgMatches, Command};
use solcon_babel::defaults::{SOL6_PATHS, TOSCA_PATHS};
use solcon_babel::input::{find_provider, parse_document};
use solcon_babel::output::{prune_empty, render, wrap_envelope};
use solcon_babel::{load_paths, ConverterRegistry};
use solcon_config::{ConfigError, Loader, SolconConfig};
use std::fs;
use std::process;

const REVERSE_CONVERTER: &str = "sol6-to-tosca";

fn main() {
    let matches = Command::new("solcon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert VNF descriptors between TOSCA and SOL006")
        .arg_required_else_help(true)
        .arg(
            Arg::new("file")
                .help("Descriptor to convert (YAML or JSON)")
                .required_unless_present("list-converters")
                .index(1),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the result here instead of stdout"),
        )
        .arg(
            Arg::new("tosca-paths")
                .long("tosca-paths")
                .short('c')
                .help("TOSCA path bundle replacing the built-in one"),
        )
        .arg(
            Arg::new("sol6-paths")
                .long("sol6-paths")
                .short('s')
                .help("SOL006 path bundle replacing the built-in one"),
        )
        .arg(
            Arg::new("provider")
                .long("provider")
                .short('r')
                .help("Provider of the descriptor (default: read from its provider line)"),
        )
        .arg(
            Arg::new("reverse")
                .long("reverse")
                .help("Convert SOL006 to TOSCA")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .help("Output format: json or yaml"),
        )
        .arg(
            Arg::new("no-prune")
                .long("no-prune")
                .help("Keep null and empty values in the result")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-envelope")
                .long("no-envelope")
                .help("Do not wrap SOL006 results in data.etsi-nfv-descriptors:nfv")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("error, warn, info, debug or trace"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .help("Settings file layered over the defaults"),
        )
        .arg(
            Arg::new("list-converters")
                .long("list-converters")
                .help("List available converters")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("list-converters") {
        handle_list_converters_command();
        return;
    }

    let config = load_settings(&matches).unwrap_or_else(|e| fail(format!("Settings error: {}", e)));
    init_logging(&config.logging.level);

    let Some(file) = matches.get_one::<String>("file") else {
        fail("a descriptor file is required");
    };
    handle_convert_command(file, &matches, &config);
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Defaults, then the settings file, then flags
fn load_settings(matches: &ArgMatches) -> Result<SolconConfig, ConfigError> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("settings") {
        loader = loader.with_file(path);
    }
    if let Some(format) = matches.get_one::<String>("format") {
        loader = loader.set_override("output.format", format.to_lowercase())?;
    }
    if matches.get_flag("no-prune") {
        loader = loader.set_override("output.prune", false)?;
    }
    if matches.get_flag("no-envelope") {
        loader = loader.set_override("output.envelope", false)?;
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        loader = loader.set_override("logging.level", level.as_str())?;
    }
    loader.build()
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(format!("cannot read '{}': {}", path, e)))
}

fn handle_convert_command(file: &str, matches: &ArgMatches, config: &SolconConfig) {
    let text = read_file(file);
    let reverse = matches.get_flag("reverse");

    let tosca_paths = matches
        .get_one::<String>("tosca-paths")
        .map(|path| read_file(path))
        .unwrap_or_else(|| TOSCA_PATHS.to_string());
    let sol6_paths = matches
        .get_one::<String>("sol6-paths")
        .map(|path| read_file(path))
        .unwrap_or_else(|| SOL6_PATHS.to_string());
    let paths = load_paths(&tosca_paths, &sol6_paths)
        .unwrap_or_else(|e| fail(format!("Path bundle error: {}", e)));

    let converter_name = if reverse {
        REVERSE_CONVERTER.to_string()
    } else {
        let token = match matches.get_one::<String>("provider") {
            Some(provider) => provider.clone(),
            None => find_provider(&text).or_else(|e| {
                config
                    .convert
                    .default_provider()
                    .map(str::to_string)
                    .ok_or(e)
            })
            .unwrap_or_else(|e| fail(e)),
        };
        let selected = paths.for_provider(&token).unwrap_or_else(|e| fail(e));
        selected.provider().unwrap_or(token.as_str()).to_string()
    };

    let registry = ConverterRegistry::with_defaults();
    let converter = registry.get(&converter_name).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("\nAvailable converters:");
        for name in registry.list() {
            eprintln!("  {}", name);
        }
        process::exit(1);
    });
    log::info!("converting '{}' with {}", file, converter.name());

    let source = parse_document(&text).unwrap_or_else(|e| fail(e));
    let conversion = converter
        .convert(&source, &paths)
        .unwrap_or_else(|e| fail(format!("Conversion failed: {}", e)));

    let report = &conversion.report;
    log::info!(
        "{} entries, {} writes, {} suppressed, {} skipped, {} warnings",
        report.entries,
        report.writes,
        report.suppressed,
        report.skipped,
        report.warnings().len()
    );

    let mut document = conversion.document;
    if config.output.prune {
        document = prune_empty(document).unwrap_or_else(|| serde_json::json!({}));
    }
    if config.output.envelope && !converter.reads_sol6() {
        document = wrap_envelope(document);
    }

    let rendered = render(&document, config.output.format).unwrap_or_else(|e| fail(e));
    match matches.get_one::<String>("output") {
        Some(path) => fs::write(path, rendered + "\n")
            .unwrap_or_else(|e| fail(format!("cannot write '{}': {}", path, e))),
        None => println!("{}", rendered),
    }
}

fn handle_list_converters_command() {
    let registry = ConverterRegistry::with_defaults();
    println!("Available converters:\n");

    for name in registry.list() {
        if let Ok(converter) = registry.get(&name) {
            println!("  {}", name);
            println!("    {}", converter.description());
            println!();
        }
    }
}
