use crate::core::context::{RunContext, Schedule};
use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://randomuser.me/api/";
pub const DEFAULT_STAGING_DIR: &str = "/tmp";
pub const DEFAULT_STAGING_FILE: &str = "processed_user_new.csv";
pub const DEFAULT_TABLE: &str = "users_new";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub run: RunConfig,
    pub source: SourceConfig,
    pub probe: ProbeConfig,
    pub staging: StagingConfig,
    pub load: LoadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

/// 原本由排程平台隱含提供的 run 設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub start_date: NaiveDate,
    pub schedule: Schedule,
    pub catchup: bool,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub headers: HashMap<String, String>,
    pub parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    /// 未設定時使用 source.endpoint
    pub endpoint: Option<String>,
    pub poke_interval_seconds: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub dir: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub enabled: bool,
    pub database_url: Option<String>,
    pub table: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "user_process".to_string(),
            description: None,
            version: None,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("static start date is valid"),
            schedule: Schedule::Daily,
            catchup: false,
            tags: vec!["users".to_string()],
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: Some(30),
            headers: HashMap::new(),
            parameters: HashMap::new(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            poke_interval_seconds: 60,
            timeout_seconds: 60,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_STAGING_DIR.to_string(),
            file: DEFAULT_STAGING_FILE.to_string(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_url: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATABASE_URL})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env pattern is valid"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        if self.run.catchup {
            return Err(EtlError::InvalidConfigValueError {
                field: "run.catchup".to_string(),
                value: "true".to_string(),
                reason: "Backfilling is not supported; only the latest interval is run".to_string(),
            });
        }

        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_positive_number("source.timeout_seconds", timeout, 1)?;
        }

        if self.probe.enabled {
            validation::validate_url("probe.endpoint", self.probe_endpoint())?;
            validation::validate_positive_number(
                "probe.poke_interval_seconds",
                self.probe.poke_interval_seconds,
                1,
            )?;
            validation::validate_positive_number(
                "probe.timeout_seconds",
                self.probe.timeout_seconds,
                1,
            )?;
        }

        validation::validate_path("staging.dir", &self.staging.dir)?;
        validation::validate_file_name("staging.file", &self.staging.file)?;

        if self.load.enabled {
            validation::validate_identifier("load.table", &self.load.table)?;
            let url = self.database_url().map(str::to_string);
            validation::validate_required_field("load.database_url", &url)?;
        }

        Ok(())
    }

    /// 已解析的資料庫連線字串，空字串或未替換的 `${VAR}` 視為未設定
    pub fn database_url(&self) -> Option<&str> {
        self.load
            .database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty() && !url.contains("${"))
    }

    pub fn staging_dir(&self) -> &str {
        &self.staging.dir
    }

    pub fn staging_path(&self) -> String {
        Path::new(&self.staging.dir)
            .join(&self.staging.file)
            .to_string_lossy()
            .into_owned()
    }

    /// 依照 run 設定建立本次的上下文
    pub fn run_context(&self, now: DateTime<Utc>) -> Result<RunContext> {
        RunContext::resolve(
            &self.pipeline.name,
            self.run.start_date,
            self.run.schedule,
            &self.run.tags,
            now,
        )
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn request_headers(&self) -> &HashMap<String, String> {
        &self.source.headers
    }

    fn query_parameters(&self) -> &HashMap<String, String> {
        &self.source.parameters
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.source.timeout_seconds.map(Duration::from_secs)
    }

    fn probe_enabled(&self) -> bool {
        self.probe.enabled
    }

    fn probe_endpoint(&self) -> &str {
        self.probe.endpoint.as_deref().unwrap_or(&self.source.endpoint)
    }

    fn poke_interval(&self) -> Duration {
        Duration::from_secs(self.probe.poke_interval_seconds)
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_seconds)
    }

    fn staging_file(&self) -> &str {
        &self.staging.file
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
