//! DOM errors
//!
//! `DomError` plays the role of `DOMException` plus the `TypeError`s the
//! DOM raises for bad arguments.

/// Errors raised synchronously by DOM operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("SyntaxError: {0}")]
    Syntax(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("NoModificationAllowedError: {0}")]
    NoModificationAllowed(String),

    #[error("InvalidCharacterError: {0}")]
    InvalidCharacter(String),

    #[error("HierarchyRequestError: {0}")]
    HierarchyRequest(String),

    #[error("NotFoundError: {0}")]
    NotFound(String),

    #[error("InvalidStateError: {0}")]
    InvalidState(String),

    #[error("SecurityError: {0}")]
    Security(String),

    #[error("IndexSizeError: {0}")]
    IndexSize(String),

    #[error("NamespaceError: {0}")]
    Namespace(String),
}

impl DomError {
    /// DOM exception name (`"SyntaxError"`, `"TypeError"`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "SyntaxError",
            Self::Type(_) => "TypeError",
            Self::NoModificationAllowed(_) => "NoModificationAllowedError",
            Self::InvalidCharacter(_) => "InvalidCharacterError",
            Self::HierarchyRequest(_) => "HierarchyRequestError",
            Self::NotFound(_) => "NotFoundError",
            Self::InvalidState(_) => "InvalidStateError",
            Self::Security(_) => "SecurityError",
            Self::IndexSize(_) => "IndexSizeError",
            Self::Namespace(_) => "NamespaceError",
        }
    }

    /// Message without the name prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Syntax(m)
            | Self::Type(m)
            | Self::NoModificationAllowed(m)
            | Self::InvalidCharacter(m)
            | Self::HierarchyRequest(m)
            | Self::NotFound(m)
            | Self::InvalidState(m)
            | Self::Security(m)
            | Self::IndexSize(m)
            | Self::Namespace(m) => m,
        }
    }
}

/// Selector parse failure reported by a `SelectorMatcher`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{selector}' is not a valid selector: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

impl SelectorError {
    pub fn new(selector: &str, reason: impl Into<String>) -> Self {
        Self {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<SelectorError> for DomError {
    fn from(err: SelectorError) -> Self {
        DomError::Syntax(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        assert_eq!(DomError::Syntax("x".into()).name(), "SyntaxError");
        assert_eq!(
            DomError::NoModificationAllowed("x".into()).name(),
            "NoModificationAllowedError"
        );
        assert_eq!(DomError::Type("bad".into()).message(), "bad");
    }

    #[test]
    fn test_selector_error_maps_to_syntax() {
        let err: DomError = SelectorError::new("a[", "unterminated attribute selector").into();
        assert_eq!(err.name(), "SyntaxError");
        assert!(err.message().contains("a["));
    }
}
