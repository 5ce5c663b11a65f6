//! Value converters for command-line arguments
//!
//! This module provides the typed-value parsing layer and the compound
//! parsers built on top of it. Parsing is strict: the whole argument must
//! be a valid literal of the expected type, so trailing garbage after an
//! otherwise-valid numeric prefix is an error rather than a truncation.

use crate::rust::configuration::errors::ParseError;
use crate::rust::configuration::model::TraceLevel;

/// A type an option argument can be parsed into.
pub trait OptionValue: Sized {
    fn parse_option_value(raw: &str) -> Result<Self, ParseError>;
}

macro_rules! numeric_option_value {
    ($($ty:ty => $hint:literal),* $(,)?) => {
        $(impl OptionValue for $ty {
            fn parse_option_value(raw: &str) -> Result<Self, ParseError> {
                raw.parse::<$ty>().map_err(|_| {
                    ParseError::Format(format!(
                        "failed to parse '{}' as {}", raw, $hint
                    ))
                })
            }
        })*
    };
}

numeric_option_value! {
    i32 => "<integer>",
    i64 => "<integer>",
    u64 => "<integer>",
    f64 => "<float>",
}

impl OptionValue for bool {
    fn parse_option_value(raw: &str) -> Result<Self, ParseError> {
        match raw.to_lowercase().as_str() {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" => Ok(false),
            _ => Err(ParseError::Format(format!(
                "invalid value for bool option: {raw}"
            ))),
        }
    }
}

/// Parse a raw argument string into `T`, rejecting any input that is not a
/// complete literal of that type.
pub fn parse_option<T: OptionValue>(raw: &str) -> Result<T, ParseError> {
    T::parse_option_value(raw)
}

/// Accepts the bool literals `true`/`false` as 1/0, otherwise parses an
/// integer. Used by `--log-verbose`.
pub fn parse_int_bool_option(raw: &str) -> Result<i32, ParseError> {
    match raw.to_lowercase().as_str() {
        "true" => Ok(1),
        "false" => Ok(0),
        lowered => parse_option::<i32>(lowered),
    }
}

/// Split `raw` at the first occurrence of `delim` and parse both halves.
/// A missing delimiter is an error, not a default.
pub fn parse_pair_option<T1, T2>(raw: &str, delim: &str) -> Result<(T1, T2), ParseError>
where
    T1: OptionValue,
    T2: OptionValue,
{
    let (first, second) = raw.split_once(delim).ok_or_else(|| {
        ParseError::Format(format!(
            "cannot parse pair option, argument requires format \
             <first>{delim}<second>. Found: {raw}"
        ))
    })?;
    Ok((parse_option::<T1>(first)?, parse_option::<T2>(second)?))
}

/// Parse a `<name>,<setting>=<value>` argument into its three parts. The
/// name must be non-empty, the `=` must appear after the comma, and both
/// setting and value must be non-empty. `flag` names the offending option
/// in the error message.
pub fn parse_named_setting_option(
    raw: &str,
    flag: &str,
) -> Result<(String, String, String), ParseError> {
    let format_error = || {
        ParseError::Format(format!(
            "--{flag} option format is '<name>,<setting>=<value>'. Got {raw}"
        ))
    };

    let (name, rest) = match raw.split_once(',') {
        Some((name, rest)) if !name.is_empty() => (name, rest),
        _ => return Err(format_error()),
    };
    let (setting, value) = rest.split_once('=').ok_or_else(format_error)?;
    if setting.is_empty() || value.is_empty() {
        return Err(format_error());
    }

    Ok((name.to_string(), setting.to_string(), value.to_string()))
}

/// Parse a `<name>:<count>` or `<name>:<count>:<device>` rate-limit
/// resource. A missing device defaults to -1, meaning the resource applies
/// to every device; a third colon is an error.
pub fn parse_rate_limit_resource_option(raw: &str) -> Result<(String, i32, i32), ParseError> {
    let format_error = || {
        ParseError::Format(format!(
            "--rate-limit-resource option format is \
             '<resource_name>:<count>:<device>' or '<resource_name>:<count>'. \
             Got {raw}"
        ))
    };

    let parts: Vec<&str> = raw.split(':').collect();
    let (name, count, device) = match parts.as_slice() {
        [name, count] => (name, count, None),
        [name, count, device] => (name, count, Some(device)),
        _ => return Err(format_error()),
    };

    let count = parse_option::<i32>(count).map_err(|_| format_error())?;
    let device = match device {
        Some(device) => parse_option::<i32>(device).map_err(|_| format_error())?,
        None => -1,
    };
    Ok((name.to_string(), count, device))
}

/// Parse one `--trace-level` value into its bit. An empty result is the
/// explicit disable signal.
pub fn parse_trace_level_option(raw: &str) -> Result<TraceLevel, ParseError> {
    match raw.to_lowercase().as_str() {
        "false" | "off" => Ok(TraceLevel::empty()),
        "true" | "on" | "min" | "max" | "timestamps" => Ok(TraceLevel::TIMESTAMPS),
        "tensors" => Ok(TraceLevel::TENSORS),
        _ => Err(ParseError::Format(format!(
            "invalid value for trace level option: {raw}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_literals() {
        for raw in ["true", "TRUE", "on", "On", "1"] {
            assert_eq!(parse_option::<bool>(raw).unwrap(), true, "raw: {raw}");
        }
        for raw in ["false", "FALSE", "off", "Off", "0"] {
            assert_eq!(parse_option::<bool>(raw).unwrap(), false, "raw: {raw}");
        }
        assert!(matches!(
            parse_option::<bool>("yes"),
            Err(ParseError::Format(_))
        ));
        assert!(parse_option::<bool>("").is_err());
    }

    #[test]
    fn test_numeric_parsing_is_strict() {
        assert_eq!(parse_option::<i32>("12").unwrap(), 12);
        assert!(parse_option::<i32>("12x").is_err());
        assert!(parse_option::<i32>("1.4").is_err());
        assert!(parse_option::<i32>("").is_err());
        assert_eq!(parse_option::<i64>("-5").unwrap(), -5);
        assert!(parse_option::<u64>("-5").is_err());
        assert_eq!(parse_option::<f64>("1.4").unwrap(), 1.4);
        assert!(parse_option::<f64>("1.4x").is_err());
    }

    #[test]
    fn test_int_bool_option() {
        assert_eq!(parse_int_bool_option("true").unwrap(), 1);
        assert_eq!(parse_int_bool_option("False").unwrap(), 0);
        assert_eq!(parse_int_bool_option("3").unwrap(), 3);
        assert!(parse_int_bool_option("on").is_err());
    }

    #[test]
    fn test_pair_option() {
        assert_eq!(
            parse_pair_option::<i32, u64>("8:1048576", ":").unwrap(),
            (8, 1048576)
        );
        assert!(parse_pair_option::<i32, u64>("81048576", ":").is_err());
        assert_eq!(
            parse_pair_option::<i32, i32>("8000-8002", "-").unwrap(),
            (8000, 8002)
        );
        assert!(parse_pair_option::<i32, f64>("0:x", ":").is_err());
    }

    #[test]
    fn test_named_setting_option() {
        assert_eq!(
            parse_named_setting_option("local,size=1048576", "cache-config").unwrap(),
            (
                "local".to_string(),
                "size".to_string(),
                "1048576".to_string()
            )
        );
        // empty name
        assert!(parse_named_setting_option(",size=1", "cache-config").is_err());
        // no comma at all
        assert!(parse_named_setting_option("size=1", "cache-config").is_err());
        // no '='
        assert!(parse_named_setting_option("local,size", "cache-config").is_err());
        // empty setting / value
        assert!(parse_named_setting_option("local,=1", "cache-config").is_err());
        assert!(parse_named_setting_option("local,size=", "cache-config").is_err());
        // value may itself contain '='
        assert_eq!(
            parse_named_setting_option("tensorrt,opts=a=b", "backend-config").unwrap(),
            (
                "tensorrt".to_string(),
                "opts".to_string(),
                "a=b".to_string()
            )
        );
    }

    #[test]
    fn test_rate_limit_resource_option() {
        assert_eq!(
            parse_rate_limit_resource_option("GPU_UTIL:4").unwrap(),
            ("GPU_UTIL".to_string(), 4, -1)
        );
        assert_eq!(
            parse_rate_limit_resource_option("GPU_UTIL:4:0").unwrap(),
            ("GPU_UTIL".to_string(), 4, 0)
        );
        assert!(parse_rate_limit_resource_option("GPU_UTIL:4:0:1").is_err());
        assert!(parse_rate_limit_resource_option("GPU_UTIL").is_err());
        assert!(parse_rate_limit_resource_option("GPU_UTIL:x").is_err());
    }

    #[test]
    fn test_trace_level_option() {
        assert_eq!(
            parse_trace_level_option("OFF").unwrap(),
            TraceLevel::empty()
        );
        assert_eq!(
            parse_trace_level_option("timestamps").unwrap(),
            TraceLevel::TIMESTAMPS
        );
        assert_eq!(
            parse_trace_level_option("TENSORS").unwrap(),
            TraceLevel::TENSORS
        );
        assert!(parse_trace_level_option("everything").is_err());
    }
}
