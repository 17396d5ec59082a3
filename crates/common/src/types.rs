use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a linear record.
///
/// A linear record is superseded rather than mutated: every new version
/// carries the same `LinearId`, only the reference to the current version moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinearId(Uuid);

impl LinearId {
    /// Creates a new random linear ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a linear ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LinearId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LinearId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LinearId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for LinearId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<LinearId> for Uuid {
    fn from(id: LinearId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_id_new_creates_unique_ids() {
        let id1 = LinearId::new();
        let id2 = LinearId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn linear_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = LinearId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn linear_id_serializes_as_bare_uuid_string() {
        let id = LinearId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn linear_id_parses_from_display_form() {
        let id = LinearId::new();
        let parsed: LinearId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<LinearId>().is_err());
    }
}
