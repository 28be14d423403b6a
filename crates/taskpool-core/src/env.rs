//! Environment variable utilities
//!
//! Every runtime knob of the executor can be overridden from the
//! environment (`TP_*`). These helpers parse a variable or fall back to
//! the compiled-in default.
//!
//! ```ignore
//! use taskpool_core::env::{env_get, env_get_bool, env_get_ms};
//!
//! let workers: usize = env_get("TP_NUM_WORKERS", 4);
//! let interval = env_get_ms("TP_POLL_INTERVAL_MS", 1);
//! let run_loop = env_get_bool("TP_RUN_LOOP_DISPATCH", false);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Parse `key` as `T`; unset or unparsable yields `default`
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Parse `key` as `T`; `None` if unset or unparsable
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read `key` as a boolean flag
///
/// `1`, `true`, `yes`, `on` are true; `0`, `false`, `no`, `off` are false
/// (case-insensitive). Unset or anything else yields `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

/// Read `key` as a millisecond count
#[inline]
pub fn env_get_ms(key: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_get(key, default_ms))
}

/// Read `key` as a string, or `default`
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check if `key` is set, whatever its value
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

/// Shared flag parser, also used by the logger
pub fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET: &str = "__TP_TEST_UNSET_VAR__";

    #[test]
    fn test_unset_yields_default() {
        let n: usize = env_get(UNSET, 42);
        assert_eq!(n, 42);
        assert!(env_get_opt::<usize>(UNSET).is_none());
        assert!(env_get_bool(UNSET, true));
        assert_eq!(env_get_str(UNSET, "pool"), "pool");
        assert_eq!(env_get_ms(UNSET, 5), Duration::from_millis(5));
        assert!(!env_is_set(UNSET));
    }

    #[test]
    fn test_parse_flag() {
        for v in ["1", "true", "TRUE", "yes", " on "] {
            assert_eq!(parse_flag(v), Some(true), "{v}");
        }
        for v in ["0", "false", "No", "off"] {
            assert_eq!(parse_flag(v), Some(false), "{v}");
        }
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_set_values() {
        std::env::set_var("__TP_TEST_NUM__", " 123 ");
        let n: usize = env_get("__TP_TEST_NUM__", 0);
        assert_eq!(n, 123);
        std::env::remove_var("__TP_TEST_NUM__");

        std::env::set_var("__TP_TEST_FLAG__", "garbage");
        assert!(env_get_bool("__TP_TEST_FLAG__", true));
        std::env::set_var("__TP_TEST_FLAG__", "off");
        assert!(!env_get_bool("__TP_TEST_FLAG__", true));
        std::env::remove_var("__TP_TEST_FLAG__");
    }

    #[test]
    fn test_invalid_parse_yields_default() {
        std::env::set_var("__TP_TEST_BAD__", "not_a_number");
        let n: u64 = env_get("__TP_TEST_BAD__", 99);
        assert_eq!(n, 99);
        std::env::remove_var("__TP_TEST_BAD__");
    }
}
