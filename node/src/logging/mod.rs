use lazy_static::lazy_static;
use serde::Serialize;

pub const DEFAULT_LOG_DIRECTIVES: &str = "sequencer=info";

lazy_static! {
    pub static ref RUST_LOG_JSON: bool = std::env::var("RUST_LOG_JSON").is_ok();
}

/// Uses `RUST_LOG` directives when set, [DEFAULT_LOG_DIRECTIVES] otherwise.
pub fn init() {
    let directives =
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_DIRECTIVES.to_string());
    init_with_directives(&directives);
}

pub fn init_with_directives(directives: &str) {
    pretty_env_logger::formatted_timed_builder()
        .parse_filters(directives)
        .format_timestamp_millis()
        .init();
    log::debug!("Logging enabled with directives: {directives}");
}

/// Logging for tests, honours `RUST_LOG` and can be called from every test.
#[cfg(test)]
pub(crate) fn init_for_tests() {
    let _ = pretty_env_logger::formatted_builder()
        .is_test(true)
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .try_init();
}

/// Renders the value as pretty json when `RUST_LOG_JSON` is set, otherwise with `Debug`.
pub fn pretty_json<T: Serialize + std::fmt::Debug>(value: &T) -> String {
    if *RUST_LOG_JSON {
        let json = serde_json::json!(&value);
        match serde_json::to_string_pretty(&json) {
            Ok(s) => s,
            _ => json.to_string(),
        }
    } else {
        format!("{value:?}",)
    }
}
