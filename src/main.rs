mod app;

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;

use crop_markup::EditorConfig;

/// Crop an image, then annotate the crop with arrows, boxes and callouts.
#[derive(Parser, Debug)]
#[command(name = "crop-markup", version, about)]
struct Args {
    /// Image to open; pick one from the toolbar when omitted.
    image: Option<PathBuf>,

    /// JSON config file (defaults to the per-user config when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output pixels per stage pixel when cropping.
    #[arg(long)]
    pixel_ratio: Option<f32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let mut config = EditorConfig::load(args.config.as_deref())?;
    if let Some(ratio) = args.pixel_ratio {
        anyhow::ensure!(ratio > 0.0, "pixel ratio must be positive, got {ratio}");
        config.pixel_ratio = ratio;
    }
    if let Some(ref path) = args.image {
        anyhow::ensure!(path.exists(), "file not found: {}", path.display());
    }

    let title = match args.image.as_deref().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
        Some(name) => format!("crop-markup - {name}"),
        None => "crop-markup".to_string(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(app::CropMarkupApp::new(config, args.image)))),
    )
    .map_err(|err| anyhow::anyhow!("failed to run eframe: {err}"))
}
