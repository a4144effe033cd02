use std::any::Any;

use thiserror::Error;

use crate::core::carrier::{Carrier, FieldValue};
use crate::core::unit::Mode;

/// What delegate logic returns on failure; any `std::error::Error` converts with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Status code attached to every failure raised by delegate processing logic.
pub const PROCESSING_FAILURE: u16 = 500;

/// A delegate failure, tagged with a status code and the carrier that was in flight.
#[derive(Debug, Error)]
#[error("unit processing failed ({code}): {cause}")]
pub struct TaggedError {
    code: u16,
    #[source]
    cause: BoxError,
    payload: Carrier,
}

impl TaggedError {
    pub fn new(code: u16, cause: impl Into<BoxError>, payload: Carrier) -> Self {
        TaggedError {
            code,
            cause: cause.into(),
            payload,
        }
    }

    /// Wraps a delegate failure with the [`PROCESSING_FAILURE`] code.
    pub fn processing_failure(cause: BoxError, payload: Carrier) -> Self {
        Self::new(PROCESSING_FAILURE, cause, payload)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// The error raised by the delegate.
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.cause
    }

    /// The carrier as it entered the failing unit.
    pub fn payload(&self) -> &Carrier {
        &self.payload
    }

    pub fn into_parts(self) -> (u16, BoxError, Carrier) {
        (self.code, self.cause, self.payload)
    }
}

/// Raised in place of a delegate that panicked instead of returning an error.
#[derive(Debug, Clone, Error)]
#[error("delegate panicked: {message}")]
pub struct DelegatePanic {
    message: String,
}

impl DelegatePanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        DelegatePanic { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Raised when a JSON value cannot become a carrier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CarrierError {
    #[error("carrier must be a JSON object, got {0}")]
    NotAnObject(FieldValue),
}

impl CarrierError {
    /// The rejected value.
    pub fn into_value(self) -> FieldValue {
        match self {
            CarrierError::NotAnObject(value) => value,
        }
    }
}

/// Errors returned by the synchronous entry points of a unit.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(transparent)]
    Processing(#[from] TaggedError),

    #[error("unit '{unit}' runs in {mode} mode and cannot {operation} synchronously")]
    ModeMismatch {
        unit: String,
        mode: Mode,
        operation: &'static str,
    },
}

impl UnitError {
    /// Returns the tagged error if this is a processing failure.
    pub fn as_tagged(&self) -> Option<&TaggedError> {
        match self {
            UnitError::Processing(tagged) => Some(tagged),
            UnitError::ModeMismatch { .. } => None,
        }
    }
}
