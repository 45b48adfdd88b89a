use clap::Parser;
use doc_import::domain::ports::DescriptorHandler;
use doc_import::utils::{logger, validation::Validate};
use doc_import::{CliArgs, DirectoryIntake, ImportConfig, ImportPipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 載入 TOML 配置
    let config = match ImportConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.json_logging() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting doc-import");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let pipeline = Arc::new(ImportPipeline::from_config(&config)?);

    if let Some(descriptor) = args.file {
        match pipeline.process(&descriptor).await {
            Ok(context) => {
                println!(
                    "✅ Imported {} into {}",
                    descriptor.display(),
                    context.workflow_href.unwrap_or_default()
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("❌ {} (Category: {:?})", e, e.category());
                eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
                std::process::exit(2);
            }
        }
    }

    let intake = DirectoryIntake::from_config(&config);
    let handler: Arc<dyn DescriptorHandler> = pipeline;

    if args.once {
        let summary = intake.run_once(handler).await?;
        println!(
            "📊 {} descriptor(s): {} succeeded, {} failed",
            summary.total(),
            summary.succeeded,
            summary.failed
        );
        if summary.failed > 0 {
            std::process::exit(2);
        }
        return Ok(());
    }

    intake
        .run(handler, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
