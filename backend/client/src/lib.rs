//! Client side of the rollbook service.
//!
//! - [`api`]: typed HTTP calls against the server
//! - [`hook`]: a local mirror of one user's quick rolls with loading and
//!   error state, resynchronized from the server after every mutation
pub mod api;
pub mod error;
pub mod hook;

pub use api::{HttpApi, QuickRollApi};
pub use error::ClientError;
pub use hook::{QuickRollState, QuickRolls};
