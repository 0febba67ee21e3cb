//! Output formatting for the CLI: JSON envelope and exit codes.

pub mod envelope;
pub mod exit_code;

pub use envelope::{EntityType, Envelope, Meta, ResultCode, SCHEMA_VERSION, Status};
pub use exit_code::ExitCode;
