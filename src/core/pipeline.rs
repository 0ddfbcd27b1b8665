use crate::core::context::RunContext;
use crate::core::probe::AvailabilityProbe;
use crate::core::transformer;
use crate::core::{ConfigProvider, FlatUserRow, Pipeline, StagedArtifact, Storage, UserSink};
use crate::utils::error::{EtlError, Result};
use reqwest::header::ACCEPT;
use reqwest::Client;

/// 回應內容寫入日誌時的最大長度
const LOGGED_BODY_LIMIT: usize = 2048;

/// 使用者資料的 pipeline：probe → fetch → transform → stage → COPY
pub struct UserPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
    sink: Option<Box<dyn UserSink>>,
    context: RunContext,
}

impl<S: Storage, C: ConfigProvider> UserPipeline<S, C> {
    /// 沒有 sink 時只寫到暫存檔
    pub fn new(storage: S, config: C, context: RunContext) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
            sink: None,
            context,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn UserSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn is_stage_only(&self) -> bool {
        self.sink.is_none()
    }
}

fn truncate_body(body: &str) -> &str {
    if body.len() <= LOGGED_BODY_LIMIT {
        return body;
    }
    let mut end = LOGGED_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for UserPipeline<S, C> {
    fn context(&self) -> &RunContext {
        &self.context
    }

    async fn prepare(&self) -> Result<()> {
        match &self.sink {
            Some(sink) => {
                tracing::info!("🗄️ Ensuring target table {} exists", sink.target());
                sink.ensure_table().await
            }
            None => {
                tracing::info!("⏭️ Stage-only run, skipping table creation");
                Ok(())
            }
        }
    }

    async fn probe(&self) -> Result<()> {
        if !self.config.probe_enabled() {
            tracing::info!("⏭️ Availability probe disabled");
            return Ok(());
        }

        tracing::info!(
            "📡 Probing {} (interval {:?}, timeout {:?})",
            self.config.probe_endpoint(),
            self.config.poke_interval(),
            self.config.probe_timeout()
        );
        let probe = AvailabilityProbe::new(
            self.client.clone(),
            self.config.probe_endpoint(),
            self.config.poke_interval(),
            self.config.probe_timeout(),
        );
        probe.wait_until_available().await?;
        Ok(())
    }

    async fn extract(&self) -> Result<serde_json::Value> {
        let endpoint = self.config.api_endpoint();
        tracing::info!("🚀 Fetching user data from: {}", endpoint);

        let mut request = self.client.get(endpoint).header(ACCEPT, "application/json");

        // 添加自定義標頭
        for (key, value) in self.config.request_headers() {
            request = request.header(key.as_str(), value.as_str());
        }

        // 添加查詢參數
        let params: Vec<(&String, &String)> = self.config.query_parameters().iter().collect();
        if !params.is_empty() {
            request = request.query(&params);
        }

        if let Some(timeout) = self.config.request_timeout() {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            return Err(EtlError::ApiStatusError {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        tracing::debug!("API response body: {}", truncate_body(&body));

        serde_json::from_str(&body).map_err(|source| {
            tracing::error!(
                "❌ Failed to parse response: {} (body: {})",
                source,
                truncate_body(&body)
            );
            EtlError::DecodeError {
                source,
                body: truncate_body(&body).to_string(),
            }
        })
    }

    async fn transform(&self, payload: serde_json::Value) -> Result<FlatUserRow> {
        tracing::info!("🔧 Transforming user record");
        let row = transformer::transform_payload(payload)?;
        tracing::debug!("Transformed user {}", row.username);
        Ok(row)
    }

    async fn stage(&self, row: &FlatUserRow) -> Result<StagedArtifact> {
        let mut line = transformer::serialize(row)?;
        line.push('\n');

        let file = self.config.staging_file();
        self.storage.write_file(file, line.as_bytes()).await?;

        let staged = StagedArtifact {
            file: file.to_string(),
            path: self.storage.full_path(file),
            bytes: line.len(),
        };
        tracing::info!("💾 Staged {} bytes to {}", staged.bytes, staged.path);
        Ok(staged)
    }

    async fn load(&self, staged: &StagedArtifact) -> Result<Option<u64>> {
        let Some(sink) = &self.sink else {
            tracing::info!("⏭️ Stage-only run, leaving {} for an external loader", staged.path);
            return Ok(None);
        };

        let data = self.storage.read_file(&staged.file).await?;
        if data.is_empty() {
            return Err(EtlError::LoadError {
                message: format!("Staging file {} is empty", staged.path),
            });
        }

        tracing::info!("📥 Copying {} into {}", staged.path, sink.target());
        let rows = sink.copy_rows(&data).await?;
        tracing::info!("✅ Loaded {} row(s) into {}", rows, sink.target());
        Ok(Some(rows))
    }
}
