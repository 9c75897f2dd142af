use crate::domain::model::{AlignOptions, AlignResult, RunArtifacts, Table};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn source_file(&self) -> Option<&str>;
    fn mapping_file(&self) -> Option<&str>;
    fn template_file(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn template_header_column(&self) -> &str;
    fn source_header_column(&self) -> &str;
    fn options(&self) -> AlignOptions;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Table>;
    async fn transform(&self, source: Table) -> Result<AlignResult>;
    async fn load(&self, result: AlignResult) -> Result<RunArtifacts>;
}
