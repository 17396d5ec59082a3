use common::{LinearId, Party};

use crate::StateEnvelope;

/// Which versions of a record a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateStatus {
    /// Only the current version of each record.
    #[default]
    Unconsumed,

    /// Only superseded versions.
    Consumed,

    /// Every version.
    All,
}

/// Builder for constructing state queries.
///
/// Allows filtering states by record type, linear ID, top-level payload
/// fields (linking identifiers, status) and consumption status.
#[derive(Debug, Clone, Default)]
pub struct StateQuery {
    /// Filter by record type.
    pub record_type: Option<String>,

    /// Filter by linear ID.
    pub linear_id: Option<LinearId>,

    /// Filter by participant.
    pub participant: Option<Party>,

    /// Top-level payload fields that must equal the given values.
    pub field_equals: Vec<(String, serde_json::Value)>,

    /// Filter by consumption status.
    pub status: StateStatus,

    /// Maximum number of states to return.
    pub limit: Option<usize>,

    /// Number of states to skip.
    pub offset: Option<usize>,
}

impl StateQuery {
    /// Creates a new query for every current state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for current states of a record type.
    pub fn for_record_type(record_type: impl Into<String>) -> Self {
        Self {
            record_type: Some(record_type.into()),
            ..Default::default()
        }
    }

    /// Creates a query for the current version of a linear record.
    pub fn for_linear_id(linear_id: LinearId) -> Self {
        Self {
            linear_id: Some(linear_id),
            ..Default::default()
        }
    }

    /// Filters by record type.
    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = Some(record_type.into());
        self
    }

    /// Filters by linear ID.
    pub fn linear_id(mut self, linear_id: LinearId) -> Self {
        self.linear_id = Some(linear_id);
        self
    }

    /// Filters to records `party` participates in.
    pub fn participant(mut self, party: Party) -> Self {
        self.participant = Some(party);
        self
    }

    /// Requires a top-level payload field to equal `value`.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.field_equals.push((field.into(), value.into()));
        self
    }

    /// Filters by consumption status.
    pub fn status(mut self, status: StateStatus) -> Self {
        self.status = status;
        self
    }

    /// Includes superseded versions.
    pub fn include_consumed(self) -> Self {
        self.status(StateStatus::All)
    }

    /// Limits the number of states returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many states before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the state satisfies every filter.
    pub fn matches(&self, state: &StateEnvelope) -> bool {
        let status_ok = match self.status {
            StateStatus::Unconsumed => !state.is_consumed(),
            StateStatus::Consumed => state.is_consumed(),
            StateStatus::All => true,
        };
        status_ok && self.matches_content(state)
    }

    /// Returns true if the state satisfies every filter except consumption status.
    ///
    /// Change-feed subscriptions use this: a delivered state may already have
    /// been superseded by the time a slow subscriber sees it.
    pub fn matches_content(&self, state: &StateEnvelope) -> bool {
        if let Some(ref record_type) = self.record_type
            && &state.record_type != record_type
        {
            return false;
        }
        if let Some(id) = self.linear_id
            && state.linear_id != id
        {
            return false;
        }
        if let Some(party) = self.participant
            && !state.has_participant(party)
        {
            return false;
        }
        self.field_equals
            .iter()
            .all(|(field, value)| state.field(field) == Some(value))
    }
}
