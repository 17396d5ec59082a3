//! Demo node for the loan-approval network.

pub mod config;
pub mod demo;

pub use config::Config;
