#![forbid(unsafe_code)]

//! Governance gateway library.
//!
//! Sits between an autonomous agent and the tools it is permitted to invoke:
//! every intercepted tool call is risk-scored, then either auto-approved or
//! parked until an authorized reviewer supplies a decision. Pending
//! authorizations survive process restarts.

pub mod audit;
pub mod config;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod gateway;
pub mod http;
pub mod models;
pub mod persistence;
pub mod router;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
