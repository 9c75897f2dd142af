use crate::core::Pipeline;
use crate::domain::model::RunArtifacts;
use crate::utils::error::Result;

pub struct AlignEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> AlignEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunArtifacts> {
        tracing::info!("Starting alignment run...");

        // Extract
        tracing::info!("Loading source export...");
        let source = self.pipeline.extract().await?;
        tracing::info!(
            "Loaded {} rows across {} source columns",
            source.row_count(),
            source.column_count()
        );

        // Transform
        tracing::info!("Resolving mapping rules...");
        let result = self.pipeline.transform(source).await?;
        tracing::info!(
            "Resolved {} rules into {} destination columns",
            result.outcomes.len(),
            result.destination.column_count()
        );

        // Load
        tracing::info!("Writing outputs...");
        let artifacts = self.pipeline.load(result).await?;
        for path in &artifacts.written {
            tracing::info!("Output saved to: {}", path);
        }
        for (kind, reason) in &artifacts.failures {
            tracing::warn!("{:?} output was not produced: {}", kind, reason);
        }

        Ok(artifacts)
    }
}
