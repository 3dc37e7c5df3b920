//! Per-entry value transforms
//!
//! Every mapping entry carries a [`FlagSet`]. The [`FlagPipeline`] reads the source
//! value and runs it through the transforms the set enables, always in the same order:
//!
//! ```text
//!     read (key-as-value | source path)
//!       -> unit conversion       UnitGb, UnitFractional
//!       -> numeric filter        OnlyNumbers, OnlyNumbersFloat
//!       -> minimum clamp         Min1
//!       -> append to list        AppendList
//!       -> enum validation       FormatIp, FormatDisk, FormatContainer,
//!                                FormatAffinityScope, FormatStorageType
//!       -> list element          ListFirst, ListNth
//!       -> "[null]" sentinel
//! ```
//!
//! Flag sets are plain values: resolved once per entry, never shared or mutated.

use crate::document::{self, ReadOptions};
use crate::error::{Diagnostics, EngineError, Warning};
use crate::path::Path;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").unwrap());

static DEFAULT_CATALOGS: Lazy<EnumCatalogs> = Lazy::new(|| EnumCatalogs {
    protocols: strings(&["ethernet", "mpls", "odu2", "ipv4", "ipv6", "pseudo-wire"]),
    protocol_prefix: "etsi-nfv-descriptors:".to_string(),
    disk_formats: strings(&[
        "aki", "ami", "ari", "iso", "qcow2", "raw", "vdi", "vhd", "vhdx", "vmdk",
    ]),
    container_formats: strings(&["aki", "ami", "ari", "bare", "docker", "ova", "ovf"]),
    affinity_scopes: strings(&[
        "nfvi-node",
        "zone-group",
        "zone",
        "nfvi-pop",
        "container-namespace",
    ]),
    storage_types: strings(&["root-storage", "swap-storage", "ephemeral-storage"]),
});

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A single toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Use the last segment of the source path as the value
    KeySetValue,
    /// Resolve the source template by slot instead of by name
    UseValue,
    OnlyNumbers,
    OnlyNumbersFloat,
    Min1,
    AppendList,
    ListFirst,
    ListNth,
    FormatIp,
    FormatDisk,
    FormatContainer,
    FormatAffinityScope,
    FormatStorageType,
    /// Validation misses become `null` instead of `"<value> (INVALID)"`
    InvalidIsNone,
    /// Keep warnings for this entry out of the log
    FailSilent,
    /// Skip correspondences that have no parent
    ReqParent,
    UnitGb,
    UnitFractional,
    /// A missing source value aborts the run
    Required,
}

impl Flag {
    pub const ALL: [Flag; 19] = [
        Flag::KeySetValue,
        Flag::UseValue,
        Flag::OnlyNumbers,
        Flag::OnlyNumbersFloat,
        Flag::Min1,
        Flag::AppendList,
        Flag::ListFirst,
        Flag::ListNth,
        Flag::FormatIp,
        Flag::FormatDisk,
        Flag::FormatContainer,
        Flag::FormatAffinityScope,
        Flag::FormatStorageType,
        Flag::InvalidIsNone,
        Flag::FailSilent,
        Flag::ReqParent,
        Flag::UnitGb,
        Flag::UnitFractional,
        Flag::Required,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Token used by older mapping tables
    pub fn legacy_token(self) -> &'static str {
        match self {
            Flag::KeySetValue => "KSV",
            Flag::UseValue => "USESOLMAPFORTOSCA",
            Flag::OnlyNumbers => "NUMBERS",
            Flag::OnlyNumbersFloat => "NUMBERSFLOAT",
            Flag::Min1 => "MINVAL1",
            Flag::AppendList => "APPENDLIST",
            Flag::ListFirst => "GETFIRSTLISTELEM",
            Flag::ListNth => "GETNTHLISTELEM",
            Flag::FormatIp => "FORMATIPVER",
            Flag::FormatDisk => "FORMATDISK",
            Flag::FormatContainer => "FORMATCONTAINER",
            Flag::FormatAffinityScope => "FORMATAFFSCOPE",
            Flag::FormatStorageType => "FORMATSTORAGETYPE",
            Flag::InvalidIsNone => "INVALIDISNONE",
            Flag::FailSilent => "FAILSIILENT",
            Flag::ReqParent => "REQPARENT",
            Flag::UnitGb => "UNITISGB",
            Flag::UnitFractional => "UNITISFRACTIONAL",
            Flag::Required => "REQUIRED",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::KeySetValue => "key-set-value",
            Flag::UseValue => "use-value",
            Flag::OnlyNumbers => "only-numbers",
            Flag::OnlyNumbersFloat => "only-numbers-float",
            Flag::Min1 => "min-1",
            Flag::AppendList => "append-list",
            Flag::ListFirst => "list-first",
            Flag::ListNth => "list-nth",
            Flag::FormatIp => "format-ip",
            Flag::FormatDisk => "format-disk",
            Flag::FormatContainer => "format-container",
            Flag::FormatAffinityScope => "format-affinity-scope",
            Flag::FormatStorageType => "format-storage-type",
            Flag::InvalidIsNone => "invalid-is-none",
            Flag::FailSilent => "fail-silent",
            Flag::ReqParent => "req-parent",
            Flag::UnitGb => "unit-gb",
            Flag::UnitFractional => "unit-fractional",
            Flag::Required => "required",
        }
    }
}

impl FromStr for Flag {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Flag::ALL
            .iter()
            .copied()
            .find(|flag| flag.legacy_token() == token || flag.name() == token)
            .ok_or_else(|| EngineError::InvalidConfig(format!("unknown flag '{}'", token)))
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An immutable set of [`Flag`]s
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u32);

impl FlagSet {
    pub fn empty() -> Self {
        FlagSet(0)
    }

    pub fn with(self, flag: Flag) -> Self {
        FlagSet(self.0 | flag.bit())
    }

    pub fn contains(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Flag> {
        Flag::ALL.into_iter().filter(move |flag| self.contains(*flag))
    }

    /// Parse a comma or whitespace separated token list
    pub fn parse_list(text: &str) -> Result<Self, EngineError> {
        text.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(Flag::from_str)
            .collect()
    }
}

impl From<Flag> for FlagSet {
    fn from(flag: Flag) -> Self {
        FlagSet::empty().with(flag)
    }
}

impl<const N: usize> From<[Flag; N]> for FlagSet {
    fn from(flags: [Flag; N]) -> Self {
        flags.into_iter().collect()
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        iter.into_iter().fold(FlagSet::empty(), FlagSet::with)
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Flag::name)).finish()
    }
}

impl<'de> Deserialize<'de> for FlagSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        tokens
            .iter()
            .map(|token| token.parse::<Flag>())
            .collect::<Result<FlagSet, _>>()
            .map_err(serde::de::Error::custom)
    }
}

/// Allowed values for the enum validators
#[derive(Debug, Clone, PartialEq)]
pub struct EnumCatalogs {
    pub protocols: Vec<String>,
    /// Prepended to every matched protocol
    pub protocol_prefix: String,
    pub disk_formats: Vec<String>,
    pub container_formats: Vec<String>,
    pub affinity_scopes: Vec<String>,
    /// Matched fuzzily
    pub storage_types: Vec<String>,
}

impl Default for EnumCatalogs {
    fn default() -> Self {
        DEFAULT_CATALOGS.clone()
    }
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// The allowed option, spelled the way the catalog spells it
    Match(String),
    /// `None` when misses become null, otherwise `"<value> (INVALID)"`
    Invalid(Option<String>),
}

impl Validated {
    pub fn is_match(&self) -> bool {
        matches!(self, Validated::Match(_))
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Validated::Match(option) => Some(option.as_str()),
            Validated::Invalid(marked) => marked.as_deref(),
        }
    }
}

/// Check `value` against `allowed`, ignoring case and treating `_` as `-`
///
/// With `fuzzy`, either string containing the other is also a match.
pub fn validate<S: AsRef<str>>(
    value: &str,
    allowed: &[S],
    fuzzy: bool,
    none_found: bool,
) -> Validated {
    let wanted = value.to_lowercase().replace('_', "-");
    for option in allowed {
        let option = option.as_ref();
        let candidate = option.to_lowercase();
        if wanted == candidate
            || (fuzzy && (candidate.contains(&wanted) || wanted.contains(&candidate)))
        {
            return Validated::Match(option.to_string());
        }
    }
    invalid(value, none_found)
}

fn invalid(value: impl fmt::Display, none_found: bool) -> Validated {
    if none_found {
        Validated::Invalid(None)
    } else {
        Validated::Invalid(Some(format!("{} (INVALID)", value)))
    }
}

/// Keep only the digits of `text` and parse them
///
/// `None` when no digits are left.
pub fn only_number(text: &str, float: bool) -> Option<Value> {
    let digits = NON_DIGITS.replace_all(text, "");
    if digits.is_empty() {
        return None;
    }
    if float {
        let parsed: f64 = digits.parse().ok()?;
        Number::from_f64(parsed).map(Value::Number)
    } else {
        digits
            .parse::<u64>()
            .ok()
            .map(|n| Value::Number(n.into()))
            .or_else(|| only_number(text, true))
    }
}

/// Convert a size string to gigabytes
///
/// Megabyte values (`"2048 MB"`) are divided by 1024: floored for integers, rounded to
/// one decimal place when `fractional`. Anything else keeps its number. Values that
/// are not strings pass through unchanged.
pub fn convert_units(value: &Value, fractional: bool) -> Option<Value> {
    let Value::String(text) = value else {
        return Some(value.clone());
    };
    if text.is_empty() {
        return Some(value.clone());
    }
    let number = only_number(text, fractional)?;
    if !text.to_lowercase().contains("mb") {
        return Some(number);
    }
    if fractional {
        let megabytes = number.as_f64()?;
        let gigabytes = (megabytes / 1024.0 * 10.0).round() / 10.0;
        Number::from_f64(gigabytes).map(Value::Number)
    } else {
        number.as_u64().map(|mb| Value::Number((mb / 1024).into()))
    }
}

/// Paths and documents one pipeline run works against
#[derive(Debug, Clone, Copy)]
pub struct EntryInput<'a> {
    pub source_path: &'a Path,
    pub target_path: &'a Path,
    /// Position of the correspondence within its entry, used by `ListNth`
    pub run: usize,
    pub source: &'a Value,
    pub target: &'a Value,
}

/// Runs the fixed-order transforms for one entry
#[derive(Debug, Clone, Copy)]
pub struct FlagPipeline<'a> {
    catalogs: &'a EnumCatalogs,
}

impl<'a> FlagPipeline<'a> {
    pub fn new(catalogs: &'a EnumCatalogs) -> Self {
        FlagPipeline { catalogs }
    }

    /// Produce the value to write for one entry (or one correspondence of an entry)
    pub fn apply(
        &self,
        flags: FlagSet,
        input: EntryInput<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Value>, EngineError> {
        let silent = flags.contains(Flag::FailSilent);
        let mut warn = |warning: Warning| {
            if silent {
                diagnostics.push_silent(warning)
            } else {
                diagnostics.push(warning)
            }
        };

        let mut value = if flags.contains(Flag::KeySetValue) {
            input
                .source_path
                .last_segment()
                .map(|segment| Value::String(segment.to_string()))
        } else {
            let options = ReadOptions {
                required: flags.contains(Flag::Required),
                ensure_map: false,
                silent,
            };
            let read = document::read(input.source, input.source_path, options)?;
            if read.is_none() {
                warn(Warning::MissingOptionalValue {
                    path: input.source_path.to_string(),
                });
            }
            read
        };

        if flags.contains(Flag::UnitGb) {
            value = value.and_then(|v| {
                if !document::is_truthy(&v) {
                    return Some(v);
                }
                let converted = convert_units(&v, flags.contains(Flag::UnitFractional));
                if converted.is_none() {
                    warn(not_numeric(&v, input.source_path));
                }
                converted
            });
        }

        if flags.contains(Flag::OnlyNumbers) {
            value = value.and_then(|v| match &v {
                Value::String(text) => {
                    let number = only_number(text, flags.contains(Flag::OnlyNumbersFloat));
                    if number.is_none() {
                        warn(not_numeric(&v, input.source_path));
                    }
                    number
                }
                _ => Some(v),
            });
        }

        if flags.contains(Flag::Min1) {
            value = value.map(|v| match v.as_f64() {
                Some(n) if n <= 1.0 => Value::from(1),
                _ => v,
            });
        }

        if flags.contains(Flag::AppendList) {
            if let Some(item) = value.take() {
                let existing = document::read(
                    input.target,
                    input.target_path,
                    ReadOptions::optional().silent(true),
                )?;
                let mut list = match existing {
                    Some(Value::Array(items)) => items,
                    Some(other) if document::is_truthy(&other) => vec![other],
                    _ => Vec::new(),
                };
                list.push(item);
                value = Some(Value::Array(list));
            }
        }

        let catalogs = self.catalogs;
        let validators: [(Flag, &[String], bool, &str); 5] = [
            (Flag::FormatIp, &catalogs.protocols, false, &catalogs.protocol_prefix),
            (Flag::FormatDisk, &catalogs.disk_formats, false, ""),
            (Flag::FormatContainer, &catalogs.container_formats, false, ""),
            (Flag::FormatAffinityScope, &catalogs.affinity_scopes, false, ""),
            (Flag::FormatStorageType, &catalogs.storage_types, true, ""),
        ];
        for (flag, allowed, fuzzy, prefix) in validators {
            if !flags.contains(flag) {
                continue;
            }
            value = value.map(|v| {
                let items = match v {
                    Value::Array(items) => items,
                    single => vec![single],
                };
                let checked = items
                    .into_iter()
                    .map(|item| {
                        let result = match &item {
                            Value::String(text) => {
                                validate(text, allowed, fuzzy, flags.contains(Flag::InvalidIsNone))
                            }
                            other => invalid(other, flags.contains(Flag::InvalidIsNone)),
                        };
                        if !result.is_match() {
                            warn(Warning::EnumValidationMiss {
                                value: display_value(&item),
                                path: input.target_path.to_string(),
                                allowed: allowed.to_vec(),
                            });
                        }
                        match result {
                            Validated::Match(option) => Value::String(format!("{}{}", prefix, option)),
                            Validated::Invalid(Some(marked)) => Value::String(marked),
                            Validated::Invalid(None) => Value::Null,
                        }
                    })
                    .collect();
                Value::Array(checked)
            });
        }

        if flags.contains(Flag::ListFirst) {
            value = value.and_then(|v| match v {
                Value::Array(items) => items.into_iter().next(),
                other => Some(other),
            });
        }

        if flags.contains(Flag::ListNth) {
            value = value.and_then(|v| match v {
                Value::Array(mut items) => {
                    if input.run < items.len() {
                        Some(items.swap_remove(input.run))
                    } else {
                        items.pop()
                    }
                }
                other => Some(other),
            });
        }

        if value.as_ref().and_then(Value::as_str) == Some("[null]") {
            value = Some(Value::Array(vec![Value::Null]));
        }

        Ok(value)
    }
}

fn not_numeric(value: &Value, path: &Path) -> Warning {
    Warning::NotNumeric {
        value: display_value(value),
        path: path.to_string(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    const PROTOCOLS: [&str; 3] = ["Ethernet", "IPv4", "IPv6"];

    #[rstest]
    #[case("IPv4", false, Validated::Match("IPv4".to_string()))]
    #[case("ipv4", false, Validated::Match("IPv4".to_string()))]
    #[case("bogus", false, Validated::Invalid(Some("bogus (INVALID)".to_string())))]
    #[case("bogus", true, Validated::Invalid(None))]
    fn test_validate_exact(#[case] value: &str, #[case] none_found: bool, #[case] expected: Validated) {
        assert_eq!(validate(value, &PROTOCOLS, false, none_found), expected);
    }

    #[rstest]
    #[case("root", "root-storage")]
    #[case("SWAP_STORAGE", "swap-storage")]
    #[case("ephemeral-storage-large", "ephemeral-storage")]
    fn test_validate_fuzzy(#[case] value: &str, #[case] expected: &str) {
        let catalogs = EnumCatalogs::default();
        assert_eq!(
            validate(value, &catalogs.storage_types, true, false),
            Validated::Match(expected.to_string())
        );
    }

    #[test]
    fn test_fuzzy_is_off_for_exact_catalogs() {
        assert!(!validate("root", &["root-storage"], false, false).is_match());
    }

    #[rstest]
    #[case(json!("2048 MB"), false, json!(2))]
    #[case(json!("1536 MB"), true, json!(1.5))]
    #[case(json!("1500 mb"), false, json!(1))]
    #[case(json!("8 GB"), false, json!(8))]
    #[case(json!(16), false, json!(16))]
    fn test_convert_units(#[case] value: Value, #[case] fractional: bool, #[case] expected: Value) {
        assert_eq!(convert_units(&value, fractional), Some(expected));
    }

    #[test]
    fn test_convert_units_without_digits() {
        assert_eq!(convert_units(&json!("lots"), false), None);
    }

    #[test]
    fn test_only_number() {
        assert_eq!(only_number("8 vCPU", false), Some(json!(8)));
        assert_eq!(only_number("4096", true), Some(json!(4096.0)));
        assert_eq!(only_number("none", false), None);
    }

    #[rstest]
    #[case("KSV", Flag::KeySetValue)]
    #[case("FAILSIILENT", Flag::FailSilent)]
    #[case("format-storage-type", Flag::FormatStorageType)]
    #[case(" min-1 ", Flag::Min1)]
    fn test_flag_tokens(#[case] token: &str, #[case] expected: Flag) {
        assert_eq!(token.parse::<Flag>().unwrap(), expected);
    }

    #[test]
    fn test_flag_set_parse_list() {
        let set = FlagSet::parse_list("APPENDLIST, fail-silent").unwrap();
        assert!(set.contains(Flag::AppendList));
        assert!(set.contains(Flag::FailSilent));
        assert!(!set.contains(Flag::KeySetValue));
        assert_eq!(format!("{:?}", set), r#"{"append-list", "fail-silent"}"#);
        assert!(FlagSet::parse_list("BOGUS").is_err());
    }

    struct Fixture {
        source: Value,
        target: Value,
        catalogs: EnumCatalogs,
        source_path: Path,
        target_path: Path,
    }

    impl Fixture {
        fn new(source: Value, source_path: &str) -> Self {
            Fixture {
                source,
                target: json!({}),
                catalogs: EnumCatalogs::default(),
                source_path: Path::parse(source_path),
                target_path: Path::parse("out"),
            }
        }

        fn run(&self, flags: impl Into<FlagSet>, run: usize) -> (Option<Value>, Diagnostics) {
            let mut diag = Diagnostics::new();
            let input = EntryInput {
                source_path: &self.source_path,
                target_path: &self.target_path,
                run,
                source: &self.source,
                target: &self.target,
            };
            let value = FlagPipeline::new(&self.catalogs)
                .apply(flags.into(), input, &mut diag)
                .unwrap();
            (value, diag)
        }
    }

    #[test]
    fn test_key_set_value_uses_last_segment() {
        let fx = Fixture::new(json!({}), "node_templates.c1");
        assert_eq!(fx.run(Flag::KeySetValue, 0).0, Some(json!("c1")));
    }

    #[test]
    fn test_optional_miss_warns() {
        let fx = Fixture::new(json!({}), "a.b");
        let (value, diag) = fx.run(FlagSet::empty(), 0);
        assert_eq!(value, None);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn test_required_miss_is_fatal() {
        let fx = Fixture::new(json!({}), "a.b");
        let mut diag = Diagnostics::new();
        let input = EntryInput {
            source_path: &fx.source_path,
            target_path: &fx.target_path,
            run: 0,
            source: &fx.source,
            target: &fx.target,
        };
        let err = FlagPipeline::new(&fx.catalogs)
            .apply(Flag::Required.into(), input, &mut diag)
            .unwrap_err();
        assert!(matches!(err, EngineError::PathNotFound { .. }));
    }

    #[test]
    fn test_unit_and_numbers_chain() {
        let fx = Fixture::new(json!({"mem": "4096 MB"}), "mem");
        assert_eq!(fx.run([Flag::UnitGb], 0).0, Some(json!(4)));
        assert_eq!(
            fx.run([Flag::UnitGb, Flag::UnitFractional], 0).0,
            Some(json!(4.0))
        );
    }

    #[test]
    fn test_only_numbers_miss_warns_and_drops() {
        let fx = Fixture::new(json!({"cpu": "many"}), "cpu");
        let (value, diag) = fx.run([Flag::OnlyNumbers], 0);
        assert_eq!(value, None);
        assert!(matches!(diag.warnings()[0], Warning::NotNumeric { .. }));
    }

    #[test]
    fn test_min_1_clamps() {
        let fx = Fixture::new(json!({"n": 0, "m": 5}), "n");
        assert_eq!(fx.run([Flag::Min1], 0).0, Some(json!(1)));
        let fx = Fixture::new(json!({"n": 0, "m": 5}), "m");
        assert_eq!(fx.run([Flag::Min1], 0).0, Some(json!(5)));
    }

    #[test]
    fn test_append_list_extends_target() {
        let mut fx = Fixture::new(json!({"disk": "d2"}), "disk");
        fx.target = json!({"out": "d1"});
        assert_eq!(fx.run([Flag::AppendList], 0).0, Some(json!(["d1", "d2"])));
        fx.target = json!({});
        assert_eq!(fx.run([Flag::AppendList], 0).0, Some(json!(["d2"])));
    }

    #[test]
    fn test_format_ip_prefixes_and_wraps() {
        let fx = Fixture::new(json!({"proto": ["ipv4", "IPV6", "x25"]}), "proto");
        let (value, diag) = fx.run([Flag::FormatIp], 0);
        assert_eq!(
            value,
            Some(json!([
                "etsi-nfv-descriptors:ipv4",
                "etsi-nfv-descriptors:ipv6",
                "x25 (INVALID)"
            ]))
        );
        assert!(matches!(
            diag.warnings()[0],
            Warning::EnumValidationMiss { .. }
        ));
    }

    #[test]
    fn test_validation_miss_is_silenced_under_fail_silent() {
        let fx = Fixture::new(json!({"proto": "x25"}), "proto");
        let (_, diag) = fx.run([Flag::FormatIp], 0);
        assert_eq!((diag.len(), diag.silenced()), (1, 0));

        let (value, diag) = fx.run([Flag::FormatIp, Flag::FailSilent], 0);
        assert_eq!(value, Some(json!(["x25 (INVALID)"])));
        assert_eq!((diag.len(), diag.silenced()), (1, 1));
    }

    #[test]
    fn test_format_then_first_element() {
        let fx = Fixture::new(json!({"fmt": "QCOW2"}), "fmt");
        assert_eq!(
            fx.run([Flag::FormatDisk, Flag::ListFirst], 0).0,
            Some(json!("qcow2"))
        );
        let fx = Fixture::new(json!({"fmt": "floppy"}), "fmt");
        assert_eq!(
            fx.run([Flag::FormatDisk, Flag::InvalidIsNone, Flag::ListFirst], 0).0,
            Some(Value::Null)
        );
    }

    #[test]
    fn test_nth_element_clamps_to_last() {
        let fx = Fixture::new(json!({"l": ["a", "b"]}), "l");
        assert_eq!(fx.run([Flag::ListNth], 1).0, Some(json!("b")));
        assert_eq!(fx.run([Flag::ListNth], 7).0, Some(json!("b")));
        let fx = Fixture::new(json!({"l": []}), "l");
        assert_eq!(fx.run([Flag::ListNth], 0).0, None);
    }

    #[test]
    fn test_null_sentinel() {
        let fx = Fixture::new(json!({"v": "[null]"}), "v");
        assert_eq!(fx.run(FlagSet::empty(), 0).0, Some(json!([null])));
    }
}
