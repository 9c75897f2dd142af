use clap::Parser;
use comps_align::core::reference::ReferenceData;
use comps_align::utils::error::AlignError;
use comps_align::utils::{logger, validation::Validate};
use comps_align::{AlignEngine, AlignPipeline, CliConfig, LocalStorage};
use std::sync::Arc;

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
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(&config.log_format, config.verbose);

    tracing::info!("Starting comps-align");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        fail("Configuration validation", &e);
    }

    // 輸入以呼叫端路徑讀取，輸出寫到 output_path 之下
    let storage = LocalStorage::new(".");

    let reference = match ReferenceData::load(&storage, &config).await {
        Ok(reference) => Arc::new(reference),
        Err(e) => fail("Loading mapping sheet", &e),
    };

    let pipeline = AlignPipeline::new(storage, config, reference);
    let engine = AlignEngine::new(pipeline);

    match engine.run().await {
        Ok(artifacts) => {
            for path in &artifacts.written {
                println!("📁 {}", path);
            }
            if artifacts.is_complete() {
                println!("✅ Alignment completed successfully!");
            } else {
                for (kind, reason) in &artifacts.failures {
                    eprintln!("⚠️ {:?} output failed: {}", kind, reason);
                }
                anyhow::bail!("{} output(s) could not be produced", artifacts.failures.len());
            }
        }
        Err(e) => fail("Alignment", &e),
    }

    Ok(())
}
