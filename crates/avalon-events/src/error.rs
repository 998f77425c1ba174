use thiserror::Error;

/// Errors from subscribing to the event bus.
///
/// Emission itself never fails; callback failures are logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event name must not be empty")]
    EmptyEventName,

    #[error("event bus lock poisoned")]
    LockPoisoned,
}

pub type EventResult<T> = Result<T, EventError>;
