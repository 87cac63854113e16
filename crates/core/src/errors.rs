use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DomainError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        InterfaceError { message: self.to_string(), correlation_id: correlation_id.into() }
    }
}

/// A rejected request as reported to an HTTP caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("bad request: {message}")]
pub struct InterfaceError {
    message: String,
    correlation_id: String,
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        "The request could not be processed. Check inputs and try again."
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::DomainError;

    #[test]
    fn invalid_request_carries_detail_and_correlation_id() {
        let interface = DomainError::InvalidRequest("missing field `wound_type`".to_owned())
            .into_interface("req-1");

        assert_eq!(interface.correlation_id(), "req-1");
        assert_eq!(
            interface.to_string(),
            "bad request: invalid request: missing field `wound_type`"
        );
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }
}
