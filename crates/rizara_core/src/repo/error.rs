//! Error taxonomy shared by repositories and services.
//!
//! Every variant except `IdGenerationFailed`, `InvalidData` and `Db` is a
//! recoverable caller mistake that the request layer can show to a user.

use crate::db::DbError;
use crate::model::batch::BatchKind;
use crate::model::goat::GoatStatus;
use crate::model::{BatchId, FarmerId, GoatId, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity families addressed by `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Farmer,
    Goat,
    AggregationBatch,
    ProcessingBatch,
    TraceabilityRecord,
    User,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Farmer => "farmer",
            Self::Goat => "goat",
            Self::AggregationBatch => "aggregation batch",
            Self::ProcessingBatch => "processing batch",
            Self::TraceabilityRecord => "traceability record",
            Self::User => "user",
        }
    }
}

impl From<BatchKind> for Entity {
    fn from(value: BatchKind) -> Self {
        match value {
            BatchKind::Aggregation => Self::AggregationBatch,
            BatchKind::Processing => Self::ProcessingBatch,
        }
    }
}

/// Coarse classification used by request handlers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    DuplicateKey,
    ReferentialViolation,
    BatchLocked,
    InvalidStatusTransition,
    AlreadyExists,
    Validation,
    Fatal,
}

#[derive(Debug)]
pub enum RepoError {
    /// Read lookup found nothing for the given key.
    NotFound { entity: Entity, key: String },
    DuplicatePhone(String),
    DuplicateEmail(String),
    DuplicateRizaraId(String),
    /// Goat registration referenced a farmer that does not exist.
    UnknownFarmer(FarmerId),
    /// Mutation referenced a goat that does not exist.
    UnknownGoat(GoatId),
    /// Mutation referenced a batch that does not exist.
    UnknownBatch { kind: BatchKind, batch_id: BatchId },
    /// Membership change attempted on a locked batch.
    BatchLocked { kind: BatchKind, batch_id: BatchId },
    /// Lock requested for a batch that is already locked.
    AlreadyLocked { kind: BatchKind, batch_id: BatchId },
    /// Goat already has a membership in an open batch of this kind.
    GoatAlreadyInBatch {
        goat_id: GoatId,
        kind: BatchKind,
        batch_id: BatchId,
    },
    InvalidStatusTransition {
        goat_id: GoatId,
        from: GoatStatus,
        to: GoatStatus,
    },
    DuplicateTraceabilityRecord(GoatId),
    /// Every rizara id candidate collided with an existing one.
    IdGenerationFailed { farmer_id: FarmerId, attempts: u32 },
    /// Engine-level foreign key failure not covered by a more specific variant.
    ReferentialViolation(String),
    Validation(ValidationError),
    /// Connection schema is not at the version this build expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted into a valid model.
    InvalidData(String),
    Db(DbError),
}

impl RepoError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } | Self::UnknownGoat(_) | Self::UnknownBatch { .. } => {
                ErrorClass::NotFound
            }
            Self::DuplicatePhone(_) | Self::DuplicateEmail(_) | Self::DuplicateRizaraId(_) => {
                ErrorClass::DuplicateKey
            }
            Self::UnknownFarmer(_) | Self::ReferentialViolation(_) => {
                ErrorClass::ReferentialViolation
            }
            Self::BatchLocked { .. } => ErrorClass::BatchLocked,
            Self::InvalidStatusTransition { .. } => ErrorClass::InvalidStatusTransition,
            Self::AlreadyLocked { .. }
            | Self::GoatAlreadyInBatch { .. }
            | Self::DuplicateTraceabilityRecord(_) => ErrorClass::AlreadyExists,
            Self::Validation(_) => ErrorClass::Validation,
            Self::IdGenerationFailed { .. }
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_)
            | Self::Db(_) => ErrorClass::Fatal,
        }
    }

    /// Whether the request layer should surface this as a user-facing message.
    pub fn is_recoverable(&self) -> bool {
        self.class() != ErrorClass::Fatal
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{} not found: {key}", entity.as_str()),
            Self::DuplicatePhone(phone) => write!(f, "phone already registered: {phone}"),
            Self::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            Self::DuplicateRizaraId(id) => write!(f, "rizara id already in use: {id}"),
            Self::UnknownFarmer(id) => write!(f, "unknown farmer: {id}"),
            Self::UnknownGoat(id) => write!(f, "unknown goat: {id}"),
            Self::UnknownBatch { kind, batch_id } => {
                write!(f, "unknown {kind} batch: {batch_id}")
            }
            Self::BatchLocked { kind, batch_id } => {
                write!(f, "{kind} batch {batch_id} is locked")
            }
            Self::AlreadyLocked { kind, batch_id } => {
                write!(f, "{kind} batch {batch_id} is already locked")
            }
            Self::GoatAlreadyInBatch {
                goat_id,
                kind,
                batch_id,
            } => write!(
                f,
                "goat {goat_id} is already in open {kind} batch {batch_id}"
            ),
            Self::InvalidStatusTransition { goat_id, from, to } => {
                write!(f, "goat {goat_id} cannot move from {from} to {to}")
            }
            Self::DuplicateTraceabilityRecord(goat_id) => {
                write!(f, "traceability record already exists for goat {goat_id}")
            }
            Self::IdGenerationFailed {
                farmer_id,
                attempts,
            } => write!(
                f,
                "could not generate a unique rizara id for farmer {farmer_id} after {attempts} attempts"
            ),
            Self::ReferentialViolation(details) => write!(f, "referential violation: {details}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
