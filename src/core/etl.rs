use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::{Duration, Instant};

/// 一次 run 的結果摘要
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_id: String,
    pub staging_path: String,
    /// stage-only 時為 None
    pub rows_loaded: Option<u64>,
    pub elapsed: Duration,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// 依序執行各步驟，遇到第一個錯誤就停止並原樣回傳
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let ctx = self.pipeline.context();
        tracing::info!(
            "Starting {} run {} (schedule {}, tags: [{}])",
            ctx.pipeline,
            ctx.run_id,
            ctx.schedule,
            ctx.tags.join(", ")
        );

        // create_table
        self.pipeline.prepare().await?;

        // is_api_available
        self.pipeline.probe().await?;

        // extract_data
        let payload = self.pipeline.extract().await?;
        tracing::debug!("Extract finished after {:?}", started.elapsed());

        // process_user
        let row = self.pipeline.transform(payload).await?;
        let staged = self.pipeline.stage(&row).await?;

        // store_user
        let rows_loaded = self.pipeline.load(&staged).await?;

        let report = RunReport {
            run_id: ctx.run_id.clone(),
            staging_path: staged.path,
            rows_loaded,
            elapsed: started.elapsed(),
        };
        tracing::info!("🏁 Run {} finished in {:?}", report.run_id, report.elapsed);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RunContext;
    use crate::core::{FlatUserRow, StagedArtifact};
    use crate::utils::error::EtlError;
    use std::sync::Mutex;

    /// 記錄呼叫順序，可指定在哪一步失敗
    struct ScriptedPipeline {
        context: RunContext,
        calls: Mutex<Vec<&'static str>>,
        fail_at: Option<&'static str>,
    }

    impl ScriptedPipeline {
        fn new(fail_at: Option<&'static str>) -> Self {
            Self {
                context: RunContext::manual("user_process"),
                calls: Mutex::new(Vec::new()),
                fail_at,
            }
        }

        fn step(&self, name: &'static str) -> Result<()> {
            self.calls.lock().unwrap().push(name);
            if self.fail_at == Some(name) {
                return Err(EtlError::ProcessingError {
                    message: format!("{} failed", name),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for ScriptedPipeline {
        fn context(&self) -> &RunContext {
            &self.context
        }

        async fn prepare(&self) -> Result<()> {
            self.step("prepare")
        }

        async fn probe(&self) -> Result<()> {
            self.step("probe")
        }

        async fn extract(&self) -> Result<serde_json::Value> {
            self.step("extract")?;
            Ok(serde_json::json!({"results": []}))
        }

        async fn transform(&self, _payload: serde_json::Value) -> Result<FlatUserRow> {
            self.step("transform")?;
            Ok(FlatUserRow {
                firstname: "Jane".to_string(),
                lastname: "Doe".to_string(),
                country: "US".to_string(),
                username: "jdoe".to_string(),
                password: "p@ss".to_string(),
                email: "j@x.com".to_string(),
            })
        }

        async fn stage(&self, _row: &FlatUserRow) -> Result<StagedArtifact> {
            self.step("stage")?;
            Ok(StagedArtifact {
                file: "processed_user_new.csv".to_string(),
                path: "/tmp/processed_user_new.csv".to_string(),
                bytes: 30,
            })
        }

        async fn load(&self, _staged: &StagedArtifact) -> Result<Option<u64>> {
            self.step("load")?;
            Ok(Some(1))
        }
    }

    #[tokio::test]
    async fn test_run_executes_steps_in_order() {
        let engine = EtlEngine::new(ScriptedPipeline::new(None));

        let report = engine.run().await.unwrap();

        assert_eq!(
            engine.pipeline().calls(),
            vec!["prepare", "probe", "extract", "transform", "stage", "load"]
        );
        assert_eq!(report.rows_loaded, Some(1));
        assert_eq!(report.staging_path, "/tmp/processed_user_new.csv");
        assert!(report.run_id.starts_with("manual__"));
    }

    #[tokio::test]
    async fn test_run_stops_at_first_failure() {
        let engine = EtlEngine::new(ScriptedPipeline::new(Some("probe")));

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, EtlError::ProcessingError { .. }));
        assert_eq!(engine.pipeline().calls(), vec!["prepare", "probe"]);
    }

    #[tokio::test]
    async fn test_transform_failure_leaves_nothing_staged() {
        let engine = EtlEngine::new(ScriptedPipeline::new(Some("transform")));

        assert!(engine.run().await.is_err());
        assert!(!engine.pipeline().calls().contains(&"stage"));
    }
}
