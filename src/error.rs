//! Error kinds surfaced by the core and by the reconciliation job.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FacilityError {
    /// Missing or malformed input, or an unknown enum value.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Uniqueness or referential-integrity violation, or a forbidden transition.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[source] DieselError),

    #[error("store connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("applying database migrations failed: {0}")]
    Migration(String),
}

pub type FacilityResult<T> = Result<T, FacilityError>;

impl FacilityError {
    pub fn validation(msg: impl Into<String>) -> Self {
        FacilityError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        FacilityError::Conflict(msg.into())
    }

    /// Classify a diesel error raised while writing `what`.
    pub fn from_write(what: &str, err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                FacilityError::Conflict(format!("{what} already exists ({})", info.message()))
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                FacilityError::Conflict(format!("{what} is still referenced ({})", info.message()))
            }
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                FacilityError::Validation(format!("{what} rejected by store ({})", info.message()))
            }
            DieselError::DatabaseError(DatabaseErrorKind::NotNullViolation, info) => {
                FacilityError::Validation(format!("{what} is missing a required field ({})", info.message()))
            }
            other => FacilityError::Store(other),
        }
    }
}

impl From<DieselError> for FacilityError {
    fn from(err: DieselError) -> Self {
        FacilityError::Store(err)
    }
}

/// Failures of the legacy → canonical reconciliation run.
///
/// The first three variants are raised before anything is written.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("legacy store unavailable: {0}")]
    LegacyUnavailable(String),

    #[error("canonical store unavailable: {0}")]
    CanonicalUnavailable(String),

    #[error("legacy schema check failed: {0}")]
    LegacySchema(String),

    #[error("{entity} {legacy_id} could not be reconciled: {reason}")]
    Row {
        entity: &'static str,
        legacy_id: i64,
        reason: String,
    },

    #[error("store error while {stage}: {source}")]
    Store {
        stage: &'static str,
        #[source]
        source: DieselError,
    },
}

impl ReconcileError {
    pub(crate) fn store(stage: &'static str) -> impl FnOnce(DieselError) -> Self {
        move |source| ReconcileError::Store { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_store_for_writes() {
        let err = FacilityError::from_write("room", DieselError::NotFound);
        assert!(matches!(err, FacilityError::Store(DieselError::NotFound)));
    }

    #[test]
    fn messages_name_the_entity() {
        let err = FacilityError::NotFound { entity: "room", id: 42 };
        assert_eq!(err.to_string(), "room 42 not found");

        let err = ReconcileError::Row {
            entity: "maintenance ticket",
            legacy_id: 7,
            reason: "bad day".into(),
        };
        assert_eq!(err.to_string(), "maintenance ticket 7 could not be reconciled: bad day");
    }
}
