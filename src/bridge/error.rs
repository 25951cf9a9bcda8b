use thiserror::Error;

/// Failures surfaced by a bridge call. Each variant is a distinct,
/// inspectable kind; see [`BridgeError::kind`].
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("analysis process exceeded timeout of {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("analysis process exited with status {}: {stderr}", status_label(.code))]
    ExitNonZero { code: Option<i32>, stderr: String },

    #[error("analysis output is not valid JSON (stdout starts with {preview:?})")]
    ResponseParse {
        #[source]
        source: serde_json::Error,
        preview: String,
    },

    #[error("file bridge is not running")]
    NotRunning,

    #[error("analyser reported an error: {0}")]
    Remote(String),

    #[error("invalid image payload: {0}")]
    InvalidImage(String),

    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable snake_case tag for reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Timeout { .. } => "process_timeout",
            BridgeError::ExitNonZero { .. } => "process_exit_non_zero",
            BridgeError::ResponseParse { .. } => "response_parse_error",
            BridgeError::NotRunning => "bridge_not_running",
            BridgeError::Remote(_) => "remote_error",
            BridgeError::InvalidImage(_) => "invalid_image",
            BridgeError::Spawn { .. } => "spawn_failed",
            BridgeError::Io { .. } => "io",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout { .. })
    }
}

fn status_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".to_string(),
    }
}
