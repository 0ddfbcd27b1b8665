use anyhow::Context;
use clap::Parser;
use user_etl::utils::error::ErrorSeverity;
use user_etl::utils::{logger, validation::Validate};
use user_etl::{CliArgs, EtlEngine, EtlError, LocalStorage, TomlConfig, UserPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }

    tracing::info!("🚀 Starting user-etl");
    tracing::debug!("Effective config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if args.dry_run {
        display_config_summary(&config);
        return Ok(());
    }

    let context = config
        .run_context(chrono::Utc::now())
        .context("failed to resolve run context")?;

    let storage = LocalStorage::new(config.staging_dir().to_string());
    let load_enabled = config.load.enabled;
    let database_url = config.database_url().map(str::to_string);
    let table = config.load.table.clone();

    let mut pipeline = UserPipeline::new(storage, config, context);
    if load_enabled {
        pipeline = attach_sink(pipeline, database_url.as_deref(), &table).await;
    }

    let engine = EtlEngine::new(pipeline);
    match engine.run().await {
        Ok(report) => {
            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ Run {} completed", report.run_id);
            println!("📁 Staging file: {}", report.staging_path);
            match report.rows_loaded {
                Some(rows) => println!("🗄️ Rows loaded: {}", rows),
                None => println!("⏭️ Load skipped (stage-only)"),
            }
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

#[cfg(feature = "postgres")]
async fn attach_sink(
    pipeline: UserPipeline<LocalStorage, TomlConfig>,
    database_url: Option<&str>,
    table: &str,
) -> UserPipeline<LocalStorage, TomlConfig> {
    // 驗證階段已確認 load 啟用時一定有 database_url
    let Some(url) = database_url else {
        exit_with(EtlError::MissingConfigError {
            field: "load.database_url".to_string(),
        });
    };

    match user_etl::PostgresSink::connect(url, table).await {
        Ok(sink) => pipeline.with_sink(Box::new(sink)),
        Err(e) => exit_with(e),
    }
}

#[cfg(not(feature = "postgres"))]
async fn attach_sink(
    pipeline: UserPipeline<LocalStorage, TomlConfig>,
    _database_url: Option<&str>,
    _table: &str,
) -> UserPipeline<LocalStorage, TomlConfig> {
    tracing::warn!("Built without the `postgres` feature; running stage-only");
    pipeline
}

fn exit_with(e: EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(config: &TomlConfig) {
    println!("📋 Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline.name);
    println!(
        "  Run: start {} / {} / catchup {}",
        config.run.start_date, config.run.schedule, config.run.catchup
    );
    if !config.run.tags.is_empty() {
        println!("  Tags: {}", config.run.tags.join(", "));
    }
    println!("  Source: {}", config.source.endpoint);
    if config.probe.enabled {
        println!(
            "  Probe: {} every {}s, timeout {}s",
            config
                .probe
                .endpoint
                .as_deref()
                .unwrap_or(&config.source.endpoint),
            config.probe.poke_interval_seconds,
            config.probe.timeout_seconds
        );
    } else {
        println!("  Probe: disabled");
    }
    println!("  Staging: {}", config.staging_path());
    if config.load.enabled {
        println!("  Load: COPY into {}", config.load.table);
    } else {
        println!("  Load: disabled (stage-only)");
    }
    println!();
    println!("🔍 DRY RUN MODE - nothing was fetched or written");
}
