//! Passgen - generates random passwords and keeps them encrypted in a
//! Postgres database whose container it manages itself.
//!
//! The flow of a single invocation: reconcile the database container to
//! the running state, connect, make sure the schema exists, then run
//! exactly one store operation.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod docker;
pub mod generator;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use docker::{CliDaemon, ContainerDaemon, ContainerSpec};
pub use logging::{LogConfig, init_logging};
pub use store::{Confirmation, PasswordStore, StdinConfirmation};
