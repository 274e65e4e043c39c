use anyhow::Context;
use clap::Parser;
use email_slicer::config::{CliCommand, LogFormat};
use email_slicer::core::CoreMessage;
use email_slicer::utils::{logger, validation::Validate};
use email_slicer::{
    ChannelUi, CliConfig, LocalStorage, MemoryScene, SlicerConfig, SlicerPlugin, ZipPackager,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Plays the UI panel: prints status and packages the export.
async fn consume_messages(
    mut rx: UnboundedReceiver<CoreMessage>,
    packager: ZipPackager<LocalStorage>,
    output: std::path::PathBuf,
) -> anyhow::Result<bool> {
    let mut ok = true;

    while let Some(message) = rx.recv().await {
        match message {
            CoreMessage::SelectionChanged(state) if state.valid => {
                tracing::info!(
                    "🖼  Frame '{}' ({} x {}), {} horizontal guides",
                    state.frame_name.unwrap_or_default(),
                    state.frame_width.unwrap_or_default(),
                    state.frame_height.unwrap_or_default(),
                    state.guide_count.unwrap_or_default()
                );
            }
            CoreMessage::SelectionChanged(_) => {
                eprintln!("⚠️  Select exactly one top-level frame (use --frame <name>)");
                ok = false;
            }
            CoreMessage::SlicesGenerated { count } => println!("✅ Generated {} slices", count),
            CoreMessage::SlicesCleared {} => println!("🧹 Slices cleared"),
            CoreMessage::GuidesCleared {} => println!("🧹 Guides cleared"),
            CoreMessage::ExportProgress { current, total } => {
                tracing::info!("📤 Exporting slice {}/{}", current, total);
            }
            CoreMessage::Error { message } => {
                eprintln!("❌ {}", message);
                ok = false;
            }
            CoreMessage::PackageZip(package) => {
                let name = packager
                    .package(&package)
                    .await
                    .context("failed to write ZIP package")?;
                println!(
                    "📁 {} slices packaged to {}",
                    package.images.len(),
                    output.join(name).display()
                );
            }
        }
    }

    Ok(ok)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }
    tracing::debug!("CLI config: {:?}", cli);

    let mut config = match &cli.config {
        Some(path) => SlicerConfig::from_file(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => SlicerConfig::default(),
    };
    if let Some(format) = cli.format {
        config.export.format = format;
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let scene = MemoryScene::load(&cli.scene)
        .await
        .with_context(|| format!("failed to load scene '{}'", cli.scene.display()))?;
    if let Some(name) = &cli.frame {
        scene.select_frame(name).await?;
    }

    let (ui, rx) = ChannelUi::channel();
    let packager = ZipPackager::new(LocalStorage::new(&cli.output));
    let consumer = tokio::spawn(consume_messages(rx, packager, cli.output.clone()));

    let plugin = SlicerPlugin::new(scene.clone(), config, ui);
    let selection = plugin.refresh_selection().await?;

    if let Some(command) = cli.command.to_ui_command() {
        if selection.valid {
            plugin.dispatch(command).await?;
        }
    } else if cli.command == CliCommand::Inspect && selection.valid {
        let frame = plugin.orchestrator().selected_frame().await?;
        for guide in frame.iter().flat_map(|f| &f.guides) {
            println!("{:?} guide at {}", guide.axis, guide.offset);
        }
    }

    // Closing the channel lets the consumer finish.
    drop(plugin);
    let ok = consumer.await.context("message consumer panicked")??;

    if cli.save_scene {
        let document = scene.to_document().await;
        tokio::fs::write(&cli.scene, document.to_json()?)
            .await
            .with_context(|| format!("failed to save scene '{}'", cli.scene.display()))?;
        tracing::info!("💾 Scene saved to {}", cli.scene.display());
    }

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
