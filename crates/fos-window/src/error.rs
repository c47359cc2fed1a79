//! Window errors

use fos_dom::DomError;
use fos_js::JsError;

/// Errors raised by window operations
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Script(#[from] JsError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("The window has been closed")]
    Closed,

    #[error("Scripting is disabled for this window")]
    ScriptingDisabled,
}

impl WindowError {
    /// The wrapped DOM error, if any
    pub fn as_dom(&self) -> Option<&DomError> {
        match self {
            Self::Dom(error) => Some(error),
            _ => None,
        }
    }
}
