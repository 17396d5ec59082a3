use chrono::{DateTime, Utc};
use common::{LinearId, Party};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(Uuid);

impl TxId {
    /// Creates a new random transaction ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a transaction ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Points at one output of one committed transaction.
///
/// Every version of a linear record lives at its own `StateRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateRef {
    pub tx_id: TxId,
    pub index: u32,
}

impl StateRef {
    pub fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl std::fmt::Display for StateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.tx_id, self.index)
    }
}

/// Position of a state in its linear record's version chain.
///
/// Versions start at 1 for the issuing transaction and increment by 1 for
/// each supersession.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the first version (1) of a newly issued record.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record version proposed as the output of a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputState {
    pub linear_id: LinearId,
    pub record_type: String,
    pub participants: Vec<Party>,
    pub payload: serde_json::Value,
}

impl OutputState {
    pub fn new(
        linear_id: LinearId,
        record_type: impl Into<String>,
        participants: Vec<Party>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            linear_id,
            record_type: record_type.into(),
            participants,
            payload,
        }
    }
}

/// One immutable version of a linear record as stored on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Where this version lives.
    pub state_ref: StateRef,

    /// Stable identifier shared by every version of the record.
    pub linear_id: LinearId,

    /// The kind of record (e.g. "LoanApplication").
    pub record_type: String,

    /// Position in the version chain.
    pub version: Version,

    /// Parties with a stake in this record.
    pub participants: Vec<Party>,

    /// The record contents as JSON.
    pub payload: serde_json::Value,

    /// When the producing transaction was committed.
    pub committed_at: DateTime<Utc>,

    /// The transaction that superseded this version, if any.
    pub consumed_by: Option<TxId>,
}

impl StateEnvelope {
    /// Creates a new state envelope builder.
    pub fn builder() -> StateEnvelopeBuilder {
        StateEnvelopeBuilder::default()
    }

    /// Returns true if a later transaction superseded this version.
    pub fn is_consumed(&self) -> bool {
        self.consumed_by.is_some()
    }

    /// Returns true if `party` is a participant of this record.
    pub fn has_participant(&self, party: Party) -> bool {
        self.participants.contains(&party)
    }

    /// Returns a top-level payload field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload.get(name)
    }

    /// Deserializes the payload into a typed record.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Builder for constructing state envelopes.
#[derive(Debug, Default)]
pub struct StateEnvelopeBuilder {
    state_ref: Option<StateRef>,
    linear_id: Option<LinearId>,
    record_type: Option<String>,
    version: Option<Version>,
    participants: Vec<Party>,
    payload: Option<serde_json::Value>,
    committed_at: Option<DateTime<Utc>>,
    consumed_by: Option<TxId>,
}

impl StateEnvelopeBuilder {
    /// Sets the state reference. If not set, a fresh reference is generated.
    pub fn state_ref(mut self, state_ref: StateRef) -> Self {
        self.state_ref = Some(state_ref);
        self
    }

    pub fn linear_id(mut self, id: LinearId) -> Self {
        self.linear_id = Some(id);
        self
    }

    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Sets the version. Defaults to `Version::first()`.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn participants(mut self, participants: Vec<Party>) -> Self {
        self.participants = participants;
        self
    }

    /// Sets the payload from a serializable value.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Sets the payload from a raw JSON value.
    pub fn payload_raw(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the commit timestamp. If not set, the current time will be used.
    pub fn committed_at(mut self, committed_at: DateTime<Utc>) -> Self {
        self.committed_at = Some(committed_at);
        self
    }

    pub fn consumed_by(mut self, tx_id: TxId) -> Self {
        self.consumed_by = Some(tx_id);
        self
    }

    /// Builds the state envelope.
    ///
    /// # Panics
    ///
    /// Panics if linear_id, record_type or payload is not set.
    pub fn build(self) -> StateEnvelope {
        self.try_build()
            .expect("linear_id, record_type and payload are required")
    }

    /// Builds the state envelope, returning None if required fields are missing.
    pub fn try_build(self) -> Option<StateEnvelope> {
        Some(StateEnvelope {
            state_ref: self.state_ref.unwrap_or_else(|| StateRef::new(TxId::new(), 0)),
            linear_id: self.linear_id?,
            record_type: self.record_type?,
            version: self.version.unwrap_or_else(Version::first),
            participants: self.participants,
            payload: self.payload?,
            committed_at: self.committed_at.unwrap_or_else(Utc::now),
            consumed_by: self.consumed_by,
        })
    }
}
