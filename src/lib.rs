pub mod build;
pub mod config;
pub mod decision;
pub mod directory;
pub mod error;
pub mod git;
pub mod logging;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod registry;
pub mod release;
pub mod selector;
pub mod sync;
pub mod trace;
pub mod ui;
pub mod version;
pub mod warning;

pub use error::{BuildError, Result};
