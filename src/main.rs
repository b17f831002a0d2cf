use clap::Parser;
use skillmap_etl::utils::error::{EtlError, ErrorSeverity};
use skillmap_etl::utils::{logger, validation::Validate};
use skillmap_etl::{CliConfig, EnrichmentPipeline, EtlEngine, LocalStorage};

fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn report_failure(e: &EtlError) {
    tracing::error!(
        "❌ Enrichment failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = CliConfig::parse();

    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting skillmap-etl CLI");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 儲存以輸出目錄為根，輸入改用絕對路徑
    config.input = match std::fs::canonicalize(&config.input) {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            let e = EtlError::IoError(e);
            report_failure(&e);
            std::process::exit(exit_code(&e).max(1));
        }
    };

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let monitor_enabled = config.monitor;
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = match EnrichmentPipeline::from_config(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            report_failure(&e);
            std::process::exit(exit_code(&e).max(1));
        }
    };

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Enrichment completed successfully!");
            println!("✅ Enrichment completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            report_failure(&e);
            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
