//! The KennyFS network-protocol server: a single-threaded event loop built
//! on a current-thread Tokio runtime, the operation handler table, TOML
//! configuration, and the CLI surface. See SPEC_FULL.md §4.C/§4.D and §10.

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::run;
