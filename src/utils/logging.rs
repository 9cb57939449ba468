use serde::Serialize;
use tracing::{Level, debug, enabled};

/// Logs `value` as pretty JSON at DEBUG, serializing only when DEBUG is enabled.
pub(crate) fn debug_pretty_json<T: Serialize>(what: &str, value: &T) {
    if !enabled!(Level::DEBUG) {
        return;
    }

    match serde_json::to_string_pretty(value) {
        Ok(json) => debug!(what, "{json}"),
        Err(error) => debug!(what, %error, "pretty serialize failed"),
    }
}
