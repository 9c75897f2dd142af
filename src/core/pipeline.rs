use crate::core::enricher::NameEnricher;
use crate::core::reference::{read_input, ReferenceData};
use crate::core::report::RunReport;
use crate::core::resolver::MappingResolver;
use crate::core::serializer::{bundle, OutputSerializer};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{AlignOptions, AlignResult, RunArtifacts, Table};
use crate::spreadsheet::read_table;
use crate::utils::error::{AlignError, Result};
use std::path::Path;
use std::sync::Arc;

pub struct AlignPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) reference: Arc<ReferenceData>,
    options: AlignOptions,
}

impl<S: Storage, C: ConfigProvider> AlignPipeline<S, C> {
    pub fn new(storage: S, config: C, reference: Arc<ReferenceData>) -> Self {
        let options = config.options();
        Self {
            storage,
            config,
            reference,
            options,
        }
    }

    fn output_file(&self, file_name: &str) -> String {
        let output_path = self.config.output_path().trim_end_matches('/');
        if output_path.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", output_path, file_name)
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AlignPipeline<S, C> {
    async fn extract(&self) -> Result<Table> {
        let source_path = self
            .config
            .source_file()
            .ok_or_else(|| AlignError::MissingInputError {
                what: "source export (no source file configured)".to_string(),
            })?;

        tracing::debug!("Reading source export from: {}", source_path);
        let bytes = read_input(&self.storage, "source export", source_path).await?;
        let table = read_table(source_path, &bytes)?;
        tracing::debug!("Source columns: {:?}", table.column_names());

        Ok(table)
    }

    async fn transform(&self, source: Table) -> Result<AlignResult> {
        let resolution =
            MappingResolver::new(self.options.strict_headers).resolve(&source, &self.reference.mapping)?;
        let mut destination = resolution.table;

        if self.options.enrich_names {
            let added = NameEnricher::new().enrich(&mut destination);
            tracing::debug!("Name enrichment added {} column(s)", added.len());
        }

        let degraded: Vec<&str> = resolution
            .outcomes
            .iter()
            .filter(|outcome| outcome.status.is_blank())
            .map(|outcome| outcome.destination.as_str())
            .collect();
        if !degraded.is_empty() {
            tracing::warn!("{} rule(s) produced blank columns: {}", degraded.len(), degraded.join(", "));
        }

        let source_name = self
            .config
            .source_file()
            .and_then(|path| Path::new(path).file_name())
            .and_then(|name| name.to_str())
            .unwrap_or("source")
            .to_string();

        Ok(AlignResult {
            source_name,
            destination,
            outcomes: resolution.outcomes,
            duplicate_headers: resolution.duplicate_headers,
            enriched: self.options.enrich_names,
        })
    }

    async fn load(&self, result: AlignResult) -> Result<RunArtifacts> {
        let report = RunReport::new(
            &result,
            self.reference.template_headers.as_deref(),
            chrono::Local::now().naive_local(),
        );
        let serializer = OutputSerializer::new(
            self.options.clone(),
            self.config.template_header_column(),
            self.config.source_header_column(),
        );
        let mut artifacts = serializer.serialize(&result, &self.reference.mapping, &report);

        let mut written = Vec::new();
        for artifact in artifacts.all() {
            let path = self.output_file(&artifact.file_name);
            tracing::debug!("Writing {} ({} bytes) to storage", path, artifact.bytes.len());
            self.storage.write_file(&path, &artifact.bytes).await?;
            written.push(path);
        }

        if let Some(zip_name) = &self.options.bundle_zip {
            let zip_data = bundle(&artifacts)?;
            let path = self.output_file(zip_name);
            tracing::debug!("Writing ZIP bundle ({} bytes) to {}", zip_data.len(), path);
            self.storage.write_file(&path, &zip_data).await?;
            written.push(path);
        }

        artifacts.written = written;
        Ok(artifacts)
    }
}
