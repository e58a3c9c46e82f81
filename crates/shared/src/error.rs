use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ItemId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    NoActiveSession,
    Storage,
}

/// Failures reported by an entity store.
///
/// Missing rows are kept apart from faults so callers can tell a bad
/// identifier from a broken database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),
    #[error("item {0} does not exist")]
    ItemNotFound(ItemId),
    /// The store refused a write because of its input, e.g. a blank or duplicate name.
    #[error("{0}")]
    Invalid(String),
    #[error("storage fault: {0:#}")]
    Fault(#[from] anyhow::Error),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound(_) | Self::ItemNotFound(_) => ErrorCode::NotFound,
            Self::Invalid(_) => ErrorCode::Validation,
            Self::Fault(_) => ErrorCode::Storage,
        }
    }
}

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("room {0} does not exist")]
    UnknownRoom(RoomId),
    #[error("no practice session is active; start one first")]
    NoActiveSession,
    #[error(transparent)]
    Storage(StoreError),
}

impl PracticeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownRoom(_) => ErrorCode::NotFound,
            Self::NoActiveSession => ErrorCode::NoActiveSession,
            Self::Storage(err) => err.code(),
        }
    }
}

impl From<StoreError> for PracticeError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::RoomNotFound(room_id) => Self::UnknownRoom(room_id),
            other => Self::Storage(other),
        }
    }
}

/// Serializable form of an error for user-facing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedError {
    pub code: ErrorCode,
    pub message: String,
}

impl ReportedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&PracticeError> for ReportedError {
    fn from(value: &PracticeError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

impl From<&StoreError> for ReportedError {
    fn from(value: &StoreError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_room_reports_the_same_code_from_both_layers() {
        let store = StoreError::RoomNotFound(RoomId(3));
        assert_eq!(store.code(), ErrorCode::NotFound);

        let err = PracticeError::from(store);
        assert!(matches!(err, PracticeError::UnknownRoom(RoomId(3))));
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.to_string(), "room 3 does not exist");
    }

    #[test]
    fn rejected_input_is_a_validation_error() {
        let err = StoreError::Invalid("room name must not be empty".into());
        assert_eq!(err.code(), ErrorCode::Validation);

        let reported = ReportedError::from(&PracticeError::from(err));
        assert_eq!(reported.code, ErrorCode::Validation);
        assert_eq!(reported.message, "room name must not be empty");
    }

    #[test]
    fn faults_stay_storage_errors() {
        let err = PracticeError::from(StoreError::Fault(anyhow::anyhow!("disk full")));
        assert_eq!(err.code(), ErrorCode::Storage);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn reported_error_uses_snake_case_codes() {
        let reported = ReportedError::from(&PracticeError::NoActiveSession);
        let value = serde_json::to_value(&reported).expect("encode");
        assert_eq!(value["code"], "no_active_session");
    }
}
