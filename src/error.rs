use crate::config::SettingsError;
use crate::infrastructure::{AuthClientError, CipherError};
use crate::proxy::ProxyError;
use thiserror::Error;

/// Gateway application error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Configuration(#[from] SettingsError),

    #[error("Cipher configuration error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Authorization client error: {0}")]
    AuthClient(#[from] AuthClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An expected business-rule rejection
    #[error("{message}")]
    Application { message: String },
}

impl Error {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
        }
    }
}

impl From<Error> for ProxyError {
    fn from(error: Error) -> Self {
        match error {
            Error::Application { message } => ProxyError::logical(message),
            other => ProxyError::unhandled(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::FaultKind;

    #[test]
    fn test_application_errors_become_logical_faults() {
        match ProxyError::from(Error::application("Cart is locked")) {
            ProxyError::Fault(fault) => {
                assert_eq!(fault.kind, FaultKind::Logical);
                assert_eq!(fault.message, "Cart is locked");
                assert_eq!(fault.detail, None);
            }
            other => panic!("Expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_become_unhandled_faults() {
        let io = std::io::Error::other("disk gone");
        match ProxyError::from(Error::from(io)) {
            ProxyError::Fault(fault) => {
                assert_eq!(fault.kind, FaultKind::Unhandled);
                assert_eq!(fault.message, "Unhandled Exception");
                assert!(fault.detail.unwrap().contains("disk gone"));
            }
            other => panic!("Expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_cipher_errors_are_configuration_failures() {
        let error = Error::from(CipherError::MissingKey);
        assert!(error.to_string().starts_with("Cipher configuration error"));
    }
}
