use core::fmt;
use std::sync::Arc;

/// Error codes emitted by the path engine.
///
/// The `XP*` and `FO*` codes follow the W3C xqt-errors naming; `STOP0000` is local to
/// this crate and signals a cooperative abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    XPST0003, // syntax error
    XPST0017, // unknown function or wrong arity
    XPDY0002, // no data context bound
    XPTY0004, // type error
    FODC0006, // document input not well-formed
    STOP0000, // evaluation stopped on request
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::XPST0003 => "err:XPST0003",
            ErrorCode::XPST0017 => "err:XPST0017",
            ErrorCode::XPDY0002 => "err:XPDY0002",
            ErrorCode::XPTY0004 => "err:XPTY0004",
            ErrorCode::FODC0006 => "err:FODC0006",
            ErrorCode::STOP0000 => "STOP0000",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>, // optional chained cause
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            source: None,
        }
    }

    /// Compose an error with a source cause.
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::XPST0003, msg)
    }

    pub fn no_data_context() -> Self {
        Self::from_code(ErrorCode::XPDY0002, "no data context")
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::XPTY0004, msg)
    }

    pub fn stopped() -> Self {
        Self::from_code(ErrorCode::STOP0000, "evaluation stopped")
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::from_code(ErrorCode::FODC0006, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::from(quick_xml::Error::from(e))
    }
}
