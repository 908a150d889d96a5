//! Zinc viewer entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use zinc_core::{MetadataLoader, Scene, ZincConfig};
use zinc_viewer::{Fetcher, HttpTransport, SceneReport};

/// Load a zinc metadata document and play it back headless
#[derive(Debug, Parser)]
#[command(name = "zinc", version, about)]
struct Args {
    /// Metadata document: a path, a file:// URL or an http(s) URL
    document: String,

    /// RON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Frames to render after loading
    #[arg(long, default_value_t = 0)]
    ticks: u32,

    /// Wall time per frame in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    delta: f32,

    /// Advance animation time while rendering
    #[arg(long)]
    play: bool,

    /// Show markers for named objects
    #[arg(long)]
    markers: bool,

    /// Switch to this named view after loading
    #[arg(long)]
    view: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zinc_viewer=info,zinc_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("Starting zinc viewer");

    let config = match &args.config {
        Some(path) => ZincConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ZincConfig::default(),
    };

    let mut scene = Scene::new(config.scene.clone());
    scene.set_display_markers(args.markers || config.scene.display_markers);
    let mut loader = MetadataLoader::new(config.loader.clone());
    loader.set_item_callback(Box::new(|object| {
        tracing::debug!("Item loaded: {:?}", object);
    }));
    loader.set_complete_callback(Box::new(|| tracing::info!("All items loaded")));

    let mut fetcher = Fetcher::new(Arc::new(HttpTransport::new()));
    loader.load_metadata_url(&args.document);
    fetcher.drive(&mut loader, &mut scene);

    if let Some(view) = &args.view {
        if loader.request_view(&mut scene, view).is_some() {
            fetcher.drive(&mut loader, &mut scene);
        } else if !scene.set_viewport(view) {
            tracing::warn!("Unknown view {}", view);
        }
    }

    let stats = *fetcher.stats().lock();
    tracing::info!(
        "Fetched {} of {} requests ({} bytes)",
        stats.succeeded,
        stats.started,
        stats.bytes
    );
    if !loader.is_complete() {
        tracing::warn!(
            "Loaded {} of {} items",
            loader.completed_items(),
            loader.expected_items()
        );
    }

    for _ in 0..args.ticks {
        scene.render(args.delta, args.play);
    }

    let report = SceneReport::new(&scene);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    anyhow::ensure!(
        !loader.error_occurred() || loader.completed_items() > 0,
        "nothing could be loaded from {}",
        args.document
    );
    Ok(())
}
