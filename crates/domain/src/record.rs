//! Core linear record trait.

use chrono::{DateTime, Utc};
use common::{LinearId, Party};
use ledger::{OutputState, StateEnvelope, StateRef, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DomainError, Result};

/// Trait for records stored on the ledger as a chain of immutable versions.
///
/// A record is never changed in place. A transition consumes the current
/// version and produces a new one carrying the same [`LinearId`].
pub trait LinearRecord: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// The record type name used on the ledger.
    const RECORD_TYPE: &'static str;

    /// Returns the record's stable identifier.
    fn linear_id(&self) -> LinearId;

    /// Returns the parties with a stake in the record.
    fn participants(&self) -> Vec<Party>;

    /// Converts the record into a transaction output.
    fn to_output(&self) -> Result<OutputState> {
        Ok(OutputState::new(
            self.linear_id(),
            Self::RECORD_TYPE,
            self.participants(),
            serde_json::to_value(self)?,
        ))
    }

    /// Reads the record back from a ledger state.
    fn from_state(state: &StateEnvelope) -> Result<Self> {
        if state.record_type != Self::RECORD_TYPE {
            return Err(DomainError::UnexpectedRecordType {
                expected: Self::RECORD_TYPE,
                found: state.record_type.clone(),
            });
        }
        let record: Self = state.payload_as()?;
        if record.linear_id() != state.linear_id {
            return Err(DomainError::RecordIdMismatch {
                linear_id: state.linear_id,
                payload_id: record.linear_id(),
            });
        }
        Ok(record)
    }
}

/// A record together with the ledger position of its version.
#[derive(Debug, Clone)]
pub struct Versioned<R> {
    pub record: R,
    pub state_ref: StateRef,
    pub version: Version,
    pub committed_at: DateTime<Utc>,
    pub consumed: bool,
}

impl<R: LinearRecord> Versioned<R> {
    /// Decodes a ledger state into a typed record version.
    pub fn from_state(state: &StateEnvelope) -> Result<Self> {
        Ok(Self {
            record: R::from_state(state)?,
            state_ref: state.state_ref,
            version: state.version,
            committed_at: state.committed_at,
            consumed: state.is_consumed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        id: LinearId,
        text: String,
    }

    impl LinearRecord for Note {
        const RECORD_TYPE: &'static str = "Note";

        fn linear_id(&self) -> LinearId {
            self.id
        }

        fn participants(&self) -> Vec<Party> {
            vec![Party::FinanceAgency]
        }
    }

    fn state_for(note: &Note) -> StateEnvelope {
        let output = note.to_output().unwrap();
        StateEnvelope::builder()
            .linear_id(output.linear_id)
            .record_type(output.record_type)
            .participants(output.participants)
            .payload_raw(output.payload)
            .build()
    }

    #[test]
    fn test_output_round_trips_through_state() {
        let note = Note {
            id: LinearId::new(),
            text: "hello".to_string(),
        };
        let state = state_for(&note);
        let versioned = Versioned::<Note>::from_state(&state).unwrap();
        assert_eq!(versioned.record.text, "hello");
        assert_eq!(versioned.version, Version::first());
        assert!(!versioned.consumed);
    }

    #[test]
    fn test_wrong_record_type_rejected() {
        let note = Note {
            id: LinearId::new(),
            text: "hello".to_string(),
        };
        let mut state = state_for(&note);
        state.record_type = "Other".to_string();
        assert!(matches!(
            Note::from_state(&state),
            Err(DomainError::UnexpectedRecordType { .. })
        ));
    }

    #[test]
    fn test_payload_id_must_match_linear_id() {
        let note = Note {
            id: LinearId::new(),
            text: "hello".to_string(),
        };
        let mut state = state_for(&note);
        state.linear_id = LinearId::new();
        assert!(matches!(
            Note::from_state(&state),
            Err(DomainError::RecordIdMismatch { .. })
        ));
    }
}
