use serde::{Deserialize, Serialize};

/// One of the organizations taking part in the loan-approval network.
///
/// Each party runs its own node, keeps its own view of the shared ledger
/// and co-signs the transitions it has a stake in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Party {
    /// Owns loan applications and drives the saga.
    FinanceAgency,

    /// Scores credit checks.
    CreditAgency,

    /// Decides on and disburses loans.
    Bank,
}

impl Party {
    /// All parties in the network.
    pub const ALL: [Party; 3] = [Party::FinanceAgency, Party::CreditAgency, Party::Bank];

    /// Returns the party name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::FinanceAgency => "FinanceAgency",
            Party::CreditAgency => "CreditAgency",
            Party::Bank => "Bank",
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown party name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePartyError {
    pub name: String,
}

impl std::fmt::Display for ParsePartyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown party: {}", self.name)
    }
}

impl std::error::Error for ParsePartyError {}

impl std::str::FromStr for Party {
    type Err = ParsePartyError;

    /// Accepts the display name or the serialized name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "financeagency" | "fa" => Ok(Party::FinanceAgency),
            "creditagency" | "ca" => Ok(Party::CreditAgency),
            "bank" => Ok(Party::Bank),
            _ => Err(ParsePartyError {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_serializes_screaming_snake() {
        let json = serde_json::to_string(&Party::FinanceAgency).unwrap();
        assert_eq!(json, "\"FINANCE_AGENCY\"");
        let back: Party = serde_json::from_str("\"CREDIT_AGENCY\"").unwrap();
        assert_eq!(back, Party::CreditAgency);
    }

    #[test]
    fn party_parses_loose_names() {
        assert_eq!("FINANCE_AGENCY".parse::<Party>().unwrap(), Party::FinanceAgency);
        assert_eq!("CreditAgency".parse::<Party>().unwrap(), Party::CreditAgency);
        assert_eq!(" bank ".parse::<Party>().unwrap(), Party::Bank);
        assert!("insurer".parse::<Party>().is_err());
    }

    #[test]
    fn party_display_uses_name() {
        assert_eq!(Party::Bank.to_string(), "Bank");
        assert_eq!(Party::ALL.len(), 3);
    }
}
