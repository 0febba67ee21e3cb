//! Pipeline stages
//!
//! Each stage is a separate module that can be tested independently.

pub mod collect;
pub mod extract;
pub mod read;

pub use collect::{CollectStage, Collected};
pub use extract::ExtractStage;
pub use read::{read_failure, read_file};
