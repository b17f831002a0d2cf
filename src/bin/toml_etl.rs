use clap::Parser;
use skillmap_etl::core::ConfigProvider;
use skillmap_etl::utils::error::ErrorSeverity;
use skillmap_etl::utils::{logger, validation::Validate};
use skillmap_etl::{EnrichmentPipeline, EtlEngine, LocalStorage, RuleSet, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-etl")]
#[command(about = "Institution enrichment driven by a TOML pipeline file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "etl-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_cli_logger(args.verbose || config.debug_logging());

    tracing::info!("🚀 Starting TOML-based enrichment");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    let rules = match config.rules_path() {
        Some(path) => RuleSet::from_file(path)?,
        None => RuleSet::builtin(),
    };

    display_config_summary(&config, &rules, args.dry_run);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        display_rule_table(&rules);
        return Ok(());
    }

    // 儲存以輸出目錄為根，輸入改用絕對路徑
    config.source.input_path = std::fs::canonicalize(&config.source.input_path)?
        .to_string_lossy()
        .into_owned();

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = EnrichmentPipeline::new(storage, config).with_rules(rules);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Enrichment completed successfully!");
            println!("✅ Enrichment completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Enrichment failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, rules: &RuleSet, dry_run: bool) {
    println!("📋 Configuration Summary:");
    println!(
        "  Pipeline: {} v{}",
        config.pipeline.name, config.pipeline.version
    );
    println!("  Input: {}", config.input_path());
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.load.output_formats.join(", "));

    if let Some(max_records) = config.max_records() {
        println!("  Max Records: {}", max_records);
    }

    match config.rules_path() {
        Some(path) => println!("  Rules: {}", path),
        None => println!("  Rules: built-in"),
    }
    println!(
        "  Rule Groups: {} ({} patterns)",
        rules.groups.len(),
        rules.pattern_count()
    );

    if let Some(bundle) = config.bundle_filename() {
        println!("  Bundle: {} (ZIP)", bundle);
    }

    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn display_rule_table(rules: &RuleSet) {
    println!("📐 Rule Table (evaluation order):");
    for group in &rules.groups {
        println!(
            "  [{}] baseline: {} contributions",
            group.category,
            group.baseline.len()
        );
        for pattern in &group.patterns {
            println!(
                "    - {} <- {} ({} contributions)",
                pattern.name,
                pattern.triggers.join(" | "),
                pattern.contributions.len()
            );
        }
    }
    println!();
    println!("✅ Dry run complete. Use --verbose for more details during an actual run.");
}
