pub mod config;
pub mod core;
pub mod domain;
pub mod spreadsheet;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{etl::AlignEngine, pipeline::AlignPipeline, reference::ReferenceData};
pub use domain::model::{AlignOptions, RunArtifacts};
pub use utils::error::{AlignError, Result};
