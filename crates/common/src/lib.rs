//! Identifiers shared by every crate in the loan-approval network.

mod party;
mod types;

pub use party::{ParsePartyError, Party};
pub use types::LinearId;
