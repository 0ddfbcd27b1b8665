use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::Path;

/// 未指定 --config 時，若工作目錄有這個檔案就自動載入
pub const DEFAULT_CONFIG_FILE: &str = "user-etl.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "user-etl")]
#[command(about = "Fetch a user record, flatten it to one CSV row and bulk-load it into Postgres")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override source.endpoint
    #[arg(long)]
    pub api_endpoint: Option<String>,

    /// Override load.database_url
    #[arg(long)]
    pub database_url: Option<String>,

    /// Override staging.dir
    #[arg(long)]
    pub staging_dir: Option<String>,

    /// Skip the availability probe
    #[arg(long)]
    pub skip_probe: bool,

    /// Stop after writing the staging file (no table creation, no COPY)
    #[arg(long)]
    pub stage_only: bool,

    /// Show what would be processed without executing
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// 載入設定檔（或預設值）並套用命令列覆蓋
    pub fn load_config(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                TomlConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(endpoint) = &self.api_endpoint {
            config.source.endpoint = endpoint.clone();
        }
        if let Some(url) = &self.database_url {
            config.load.database_url = Some(url.clone());
        }
        if let Some(dir) = &self.staging_dir {
            config.staging.dir = dir.clone();
        }
        if self.skip_probe {
            config.probe.enabled = false;
        }
        if self.stage_only {
            config.load.enabled = false;
        }
        if self.log_json {
            config.logging.json = true;
        }
        if self.verbose {
            config.logging.verbose = true;
        }
    }
}
