use clap::Parser;
use comps_align::config::toml_config::TomlConfig;
use comps_align::core::reference::ReferenceData;
use comps_align::core::resolver::SourceExpression;
use comps_align::core::ConfigProvider;
use comps_align::utils::error::AlignError;
use comps_align::utils::{logger, validation::Validate};
use comps_align::{AlignEngine, AlignPipeline, LocalStorage};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "toml-align")]
#[command(about = "Align CoStar sale comps exports from a TOML job file")]
struct Args {
    /// Path to TOML job file
    #[arg(short, long, default_value = "comps-align.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override name enrichment from the job file
    #[arg(long)]
    enrich: Option<bool>,

    /// Dry run - print the mapping plan without reading the source export
    #[arg(long)]
    dry_run: bool,
}

fn fail(stage: &str, e: &AlignError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code().max(1));
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based alignment");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(enrich) = args.enrich {
        config.transform.enrich_names = Some(enrich);
        tracing::info!("🔧 Name enrichment overridden to: {}", enrich);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        fail("Configuration validation", &e);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    let storage = LocalStorage::new(".");
    let reference = match ReferenceData::load(&storage, &config).await {
        Ok(reference) => Arc::new(reference),
        Err(e) => fail("Loading mapping sheet", &e),
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No source will be read");
        print_mapping_plan(&reference);
        return Ok(());
    }

    let pipeline = AlignPipeline::new(storage, config, reference);
    let engine = AlignEngine::new(pipeline);

    match engine.run().await {
        Ok(artifacts) => {
            for path in &artifacts.written {
                println!("📁 {}", path);
            }
            if !artifacts.is_complete() {
                for (kind, reason) in &artifacts.failures {
                    eprintln!("⚠️ {:?} output failed: {}", kind, reason);
                }
                anyhow::bail!("{} output(s) could not be produced", artifacts.failures.len());
            }
            println!("✅ Alignment completed successfully!");
        }
        Err(e) => fail("Alignment", &e),
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    let options = config.options();
    let formats: Vec<&str> = options.output_formats.iter().map(|f| f.extension()).collect();

    println!("📋 Configuration Summary:");
    println!("  Job: {}", config.job.name);
    println!("  Source: {}", config.source_file().unwrap_or("-"));
    println!("  Mapping: {}", config.mapping_file().unwrap_or("-"));
    if let Some(template) = config.template_file() {
        println!("  Template: {}", template);
    }
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", formats.join(", "));
    println!("  Audit: {:?}", options.audit_mode);
    println!("  Name enrichment: {}", options.enrich_names);
    println!("  Strict headers: {}", options.strict_headers);
    if let Some(bundle) = &options.bundle_zip {
        println!("  Bundle: {} (ZIP)", bundle);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn print_mapping_plan(reference: &ReferenceData) {
    println!("🔄 Mapping Plan ({} rules):", reference.mapping.len());

    for (index, rule) in reference.mapping.rules.iter().enumerate() {
        let header = rule.destination_header.trim();
        let plan = match SourceExpression::parse(rule.source_expression.as_deref()) {
            _ if header.is_empty() => "blank (empty template header)".to_string(),
            SourceExpression::Unmapped => "blank".to_string(),
            SourceExpression::Single(column) => format!("copy '{}'", column),
            SourceExpression::Concat(columns) => format!("join {}", columns.join(" + ")),
        };
        println!("  {:>3}. {} <- {}", index + 1, header, plan);
    }

    if let Some(template) = &reference.template_headers {
        println!();
        println!("📐 Template columns: {}", template.len());
    }

    println!();
    println!("✅ Dry run complete. Remove --dry-run to align the source export.");
}
