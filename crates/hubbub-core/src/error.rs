//! Errors raised by by-name hub operations.

use thiserror::Error;

/// Why a by-name [`EventHub`](crate::hub::EventHub) operation failed.
///
/// Typed access through the hub's channel fields cannot fail; these only come
/// out of `on`, `emit` and `channel`, which resolve the channel at run time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    #[error("no channel named `{name}` in this hub{}", did_you_mean(.suggestion))]
    UnknownChannel {
        name: String,
        suggestion: Option<&'static str>,
    },

    #[error("channel `{name}` carries `{expected}` payloads, got `{found}`")]
    PayloadMismatch {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("channel `{name}` is not a `{expected}`")]
    NotAChannelOfType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("the hub has been disposed")]
    Disposed,
}

fn did_you_mean(suggestion: &Option<&'static str>) -> String {
    suggestion
        .map(|name| format!(" (did you mean `{name}`?)"))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, HubError>;
