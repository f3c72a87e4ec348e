//! Global output mode, set once from the command line.

use serde::Serialize;

pub const JSON_ENV: &str = "SOCIALCHECK_JSON";
pub const QUIET_ENV: &str = "SOCIALCHECK_QUIET";
pub const VERBOSE_ENV: &str = "SOCIALCHECK_VERBOSE";

fn flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

/// `--json`: machine-readable output on stdout, no progress bars.
pub fn is_json() -> bool {
    flag(JSON_ENV)
}

/// `--quiet`: only errors.
pub fn is_quiet() -> bool {
    flag(QUIET_ENV)
}

pub fn is_verbose() -> bool {
    flag(VERBOSE_ENV)
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to serialize output: {e}"),
    }
}
