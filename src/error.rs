use thiserror::Error;

/// Failure reported by a host collaborator (buffer, finder, clipboard).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Broad classes of engine failure, used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad keystroke sequence or argument; shown as a transient warning.
    UserInput,
    /// Feature deliberately left out; shown as a status message, otherwise a no-op.
    NotImplemented,
    /// A collaborator call failed; logged and shown with the failing command.
    HostFailure,
    /// An ex command line matched nothing in the grammar cascade.
    Parse,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0}")]
    UserInput(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("{command} failed: {message}")]
    HostFailure { command: String, message: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Not an editor command: {0}")]
    UnknownExCommand(String),

    #[error("Register {0} is read-only")]
    ReadOnlyRegister(char),

    #[error("Invalid register name: {0}")]
    InvalidRegister(char),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl EngineError {
    pub fn user(message: impl Into<String>) -> Self {
        EngineError::UserInput(message.into())
    }

    pub fn host(command: impl Into<String>, err: HostError) -> Self {
        EngineError::HostFailure {
            command: command.into(),
            message: err.0,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotImplemented(_) => ErrorKind::NotImplemented,
            EngineError::HostFailure { .. } => ErrorKind::HostFailure,
            EngineError::UnknownExCommand(_) => ErrorKind::Parse,
            EngineError::UserInput(_)
            | EngineError::UnknownCommand(_)
            | EngineError::ReadOnlyRegister(_)
            | EngineError::InvalidRegister(_)
            | EngineError::InvalidRange(_)
            | EngineError::PatternNotFound(_)
            | EngineError::InvalidPattern(_) => ErrorKind::UserInput,
        }
    }

    /// User-facing problems are shown as warnings, the rest as plain messages.
    pub fn is_warning(&self) -> bool {
        !matches!(self.kind(), ErrorKind::NotImplemented)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_failure_names_command() {
        let err = EngineError::host("join_lines", HostError::new("buffer is read-only"));
        assert_eq!(err.to_string(), "join_lines failed: buffer is read-only");
        assert_eq!(err.kind(), ErrorKind::HostFailure);
    }

    #[test]
    fn test_not_implemented_is_not_a_warning() {
        let err = EngineError::NotImplemented("register =".to_string());
        assert!(!err.is_warning());
        assert!(EngineError::ReadOnlyRegister(':').is_warning());
    }
}
