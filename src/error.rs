//! Error taxonomy shared by the fleet registry, event coordinator and API.

use thiserror::Error;

/// Errors raised by registry, coordinator and administrative operations.
#[derive(Debug, Error)]
pub enum VtnError {
    /// No resource matches the given name or id.
    #[error("VEN {0} not found")]
    UnknownResource(String),

    /// A resource with this name is already registered.
    #[error("VEN {0} already registered")]
    DuplicateResource(String),

    /// Signal name or type outside the supported enumerations.
    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    /// A structurally identical event is already active for the resource.
    #[error("duplicate event detected for VEN {0}")]
    DuplicateEvent(String),

    /// Event id not present in the resource's event list.
    #[error("event with id {event_id} not found for VEN {resource_id}")]
    UnknownEvent {
        resource_id: String,
        event_id: String,
    },

    /// Request is missing a field or carries a malformed value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Durable-store I/O failed or timed out.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// The dispatch collaborator could not deliver or cancel an event.
    #[error("dispatch failure: {0}")]
    DispatchFailure(String),
}

impl VtnError {
    /// Returns `true` for expected client-input conditions.
    ///
    /// These are answered with a structured response and never treated
    /// as operation failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            VtnError::StorageFailure(_) | VtnError::DispatchFailure(_)
        )
    }
}

/// Result alias for fallible VTN operations.
pub type Result<T> = std::result::Result<T, VtnError>;

#[cfg(test)]
mod tests {
    use super::VtnError;

    #[test]
    fn classifies_client_errors() {
        assert!(VtnError::UnknownResource("ven_1".into()).is_client_error());
        assert!(VtnError::DuplicateEvent("ven_1".into()).is_client_error());
        assert!(VtnError::InvalidSignal("BOGUS".into()).is_client_error());
        assert!(!VtnError::StorageFailure("disk full".into()).is_client_error());
        assert!(!VtnError::DispatchFailure("timeout".into()).is_client_error());
    }

    #[test]
    fn messages_name_the_resource() {
        let err = VtnError::UnknownEvent {
            resource_id: "abc".into(),
            event_id: "e1".into(),
        };
        assert_eq!(err.to_string(), "event with id e1 not found for VEN abc");
        assert_eq!(
            VtnError::DuplicateResource("ven_1".into()).to_string(),
            "VEN ven_1 already registered"
        );
    }
}
