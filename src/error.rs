//! Error types for registration and resolution

use crate::ServiceId;
use thiserror::Error;

/// Why a [`Registration`](crate::Registration) was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRegistration {
    /// None of instance, constructor or factory was set.
    #[error("no provisioning strategy was set")]
    MissingStrategy,

    /// More than one of instance, constructor or factory was set.
    #[error("{0} provisioning strategies were set, expected exactly one")]
    ConflictingStrategies(usize),

    /// Property injection requested for a pre-existing instance.
    #[error("property injection is not valid for a stored instance")]
    InjectOnInstance,

    /// Lifetime set for a pre-existing instance.
    #[error("a lifetime is not valid for a stored instance")]
    LifetimeOnInstance,

    /// Post-injection hook set for a pre-existing instance.
    #[error("a post-injection hook is not valid for a stored instance")]
    HookOnInstance,

    /// Factory dependencies declared without a factory.
    #[error("factory dependencies are only valid with a factory")]
    DependenciesWithoutFactory,
}

/// Errors that can occur during registration, resolution or injection
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No registration exists for the requested service
    #[error("Service not registered: {service}")]
    UnregisteredService { service: ServiceId },

    /// A constructor, factory or dependency lookup could not produce a value
    #[error("Failed to construct {}: {reason}", display_service(.service))]
    ConstructionFailed {
        service: Option<ServiceId>,
        reason: String,
    },

    /// The registration was rejected before it reached the registry
    #[error("Invalid registration for {service}: {reason}")]
    InvalidRegistration {
        service: ServiceId,
        reason: InvalidRegistration,
    },
}

fn display_service(service: &Option<ServiceId>) -> String {
    match service {
        Some(service) => service.to_string(),
        None => "service".to_string(),
    }
}

impl DiError {
    /// Create an UnregisteredService error
    #[inline]
    pub fn unregistered(service: ServiceId) -> Self {
        Self::UnregisteredService { service }
    }

    /// Create a ConstructionFailed error for a known service
    #[inline]
    pub fn construction_failed(service: ServiceId, reason: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            service: Some(service),
            reason: reason.into(),
        }
    }

    /// Create a ConstructionFailed error from inside a factory
    ///
    /// The failing service is not known to the factory body; use
    /// [`DiError::construction_failed`] when it is.
    #[inline]
    pub fn factory_failed(reason: impl Into<String>) -> Self {
        Self::ConstructionFailed {
            service: None,
            reason: reason.into(),
        }
    }

    /// Create an InvalidRegistration error
    #[inline]
    pub fn invalid(service: ServiceId, reason: InvalidRegistration) -> Self {
        Self::InvalidRegistration { service, reason }
    }

    /// Attach the service being built to an anonymous construction failure.
    pub(crate) fn for_service(self, id: ServiceId) -> Self {
        match self {
            Self::ConstructionFailed {
                service: None,
                reason,
            } => Self::ConstructionFailed {
                service: Some(id),
                reason,
            },
            other => other,
        }
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn test_messages_name_the_service() {
        let err = DiError::unregistered(ServiceId::of_type::<Database>());
        assert!(err.to_string().contains("Database"));

        let err = DiError::invalid(
            ServiceId::of_type::<Database>(),
            InvalidRegistration::ConflictingStrategies(2),
        );
        assert!(err.to_string().contains("2 provisioning strategies"));
    }

    #[test]
    fn test_factory_failure_picks_up_service() {
        let err = DiError::factory_failed("disk full").for_service(ServiceId::of_type::<Database>());
        match err {
            DiError::ConstructionFailed { service, reason } => {
                assert_eq!(service, Some(ServiceId::of_type::<Database>()));
                assert_eq!(reason, "disk full");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
