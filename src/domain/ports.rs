use crate::core::context::RunContext;
use crate::domain::model::{FlatUserRow, StagedArtifact};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// 暫存檔的存放位置
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn full_path(&self, path: &str) -> String;
}

/// 批次載入的目標
#[async_trait]
pub trait UserSink: Send + Sync {
    async fn ensure_table(&self) -> Result<()>;
    async fn copy_rows(&self, data: &[u8]) -> Result<u64>;
    fn target(&self) -> &str;
}

pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn request_headers(&self) -> &HashMap<String, String>;
    fn query_parameters(&self) -> &HashMap<String, String>;
    fn request_timeout(&self) -> Option<Duration>;
    fn probe_enabled(&self) -> bool;
    fn probe_endpoint(&self) -> &str;
    fn poke_interval(&self) -> Duration;
    fn probe_timeout(&self) -> Duration;
    fn staging_file(&self) -> &str;
}

/// 一次 run 的各個步驟，由 [`crate::EtlEngine`] 依序呼叫
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn context(&self) -> &RunContext;
    async fn prepare(&self) -> Result<()>;
    async fn probe(&self) -> Result<()>;
    async fn extract(&self) -> Result<serde_json::Value>;
    async fn transform(&self, payload: serde_json::Value) -> Result<FlatUserRow>;
    async fn stage(&self, row: &FlatUserRow) -> Result<StagedArtifact>;
    async fn load(&self, staged: &StagedArtifact) -> Result<Option<u64>>;
}
