pub mod enricher;
pub mod etl;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod serializer;
pub mod text;

pub use crate::domain::model::{AlignResult, RunArtifacts, Table};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
