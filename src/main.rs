use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use glitchframe::{
    composition::{Compositor, LayerSettings},
    config::Config,
    effects::EffectRegistry,
    export::{ExportManager, ExportRequest, ExportStatus},
    pipeline::{EffectInstance, EffectStates, Pipeline},
    transport::RingBufferWriter,
    video::{FfmpegBackend, Frame},
};

#[derive(Parser)]
#[command(
    name = "glitchframe",
    version,
    about = "Deterministic glitch effects for images and video",
    long_about = "glitchframe applies ordered chains of pixel effects to frames, composites layers, streams previews through a shared-memory ring buffer, and exports whole videos in the background."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Effect chain sources shared by several subcommands
#[derive(clap::Args)]
struct ChainArgs {
    /// JSON file holding an array of effect instances
    #[arg(long)]
    chain: Option<PathBuf>,

    /// Effect id to append to the chain (repeatable)
    #[arg(short, long = "effect")]
    effects: Vec<String>,

    /// Project seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
}

#[derive(Subcommand)]
enum Command {
    /// List registered effects and their parameters
    Effects {
        /// Print the full listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply an effect chain to a single image
    Render {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Output image; a .jpg/.jpeg path is size-bounded by the encoder settings
        #[arg(short, long)]
        output: PathBuf,

        /// Frame index the effects see
        #[arg(long, default_value_t = 0)]
        frame: u64,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Composite a layer stack described in a JSON file
    Composite {
        /// Layer stack description
        #[arg(short, long)]
        layers: PathBuf,

        /// Output PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Project seed
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },

    /// Stream rendered frames of an image into the preview ring buffer
    Preview {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Number of frames to write
        #[arg(short = 'n', long, default_value_t = 30)]
        frames: u64,

        /// Frames per second
        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// Ring buffer file (overrides configuration)
        #[arg(long)]
        shm: Option<PathBuf>,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Render a whole video through an effect chain
    Export {
        /// Input video
        #[arg(short, long)]
        input: PathBuf,

        /// Output video
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        chain: ChainArgs,
    },
}

/// Layer stack file for the `composite` command
#[derive(Deserialize)]
struct LayerStack {
    /// Output size; defaults to the first layer's image size
    #[serde(default)]
    resolution: Option<(u32, u32)>,
    layers: Vec<LayerEntry>,
}

#[derive(Deserialize)]
struct LayerEntry {
    image: PathBuf,
    #[serde(flatten)]
    settings: LayerSettings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    let registry = EffectRegistry::new();

    match cli.command {
        Command::Effects { json } => list_effects(&registry, json),
        Command::Render { input, output, frame, chain } => render(&registry, &config, &input, &output, frame, &chain),
        Command::Composite { layers, output, seed } => composite(&registry, &config, &layers, &output, seed),
        Command::Preview { input, frames, fps, shm, chain } => {
            preview(&registry, &config, &input, frames, fps, shm, &chain)
        }
        Command::Export { input, output, chain } => export(registry, &config, input, output, &chain),
    }
}

fn load_chain(args: &ChainArgs) -> Result<Vec<EffectInstance>> {
    let mut chain: Vec<EffectInstance> = match &args.chain {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading chain file {}", path.display()))?;
            serde_json::from_str(&content).with_context(|| format!("parsing chain file {}", path.display()))?
        }
        None => Vec::new(),
    };
    chain.extend(args.effects.iter().map(EffectInstance::new));
    Ok(chain)
}

fn open_image(path: &Path) -> Result<Frame> {
    Frame::open(path).with_context(|| format!("opening image {}", path.display()))
}

fn is_jpeg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

fn list_effects(registry: &EffectRegistry, json: bool) -> Result<()> {
    let effects = registry.list_all();
    if json {
        println!("{}", serde_json::to_string_pretty(&effects)?);
        return Ok(());
    }

    for effect in effects {
        println!("{:<18} {:<16} {}", effect.id, effect.name, effect.description);
        for param in effect.params {
            let range = match (param.min, param.max) {
                (Some(min), Some(max)) => format!("{}..{}", min, max),
                _ => param.choices.join("|"),
            };
            println!("    {:<20} {:<12} default {}", param.name, range, serde_json::to_string(&param.default)?);
        }
    }
    Ok(())
}

fn render(registry: &EffectRegistry, config: &Config, input: &Path, output: &Path, frame_index: u64, args: &ChainArgs) -> Result<()> {
    let chain = load_chain(args)?;
    let frame = open_image(input)?;
    let pipeline = Pipeline::with_config(registry, &config.pipeline);

    let (result, _) = pipeline.apply_chain(&frame, &chain, args.seed, frame_index, frame.dimensions(), &EffectStates::new())?;
    if is_jpeg_path(output) {
        let (bytes, quality) = config.encoder.encode(&result)?;
        std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
        info!("Encoded {} bytes at quality {}", bytes.len(), quality);
    } else {
        result.save_png(output).with_context(|| format!("writing {}", output.display()))?;
    }

    info!("Rendered {} effects into {}", chain.len(), output.display());
    Ok(())
}

fn composite(registry: &EffectRegistry, config: &Config, layers_path: &Path, output: &Path, seed: u64) -> Result<()> {
    let content = std::fs::read_to_string(layers_path)
        .with_context(|| format!("reading layer stack {}", layers_path.display()))?;
    let stack: LayerStack = serde_json::from_str(&content)?;

    // Image paths are relative to the stack file
    let base = layers_path.parent().unwrap_or_else(|| Path::new("."));
    let mut layers = Vec::with_capacity(stack.layers.len());
    for entry in stack.layers {
        let frame = open_image(&base.join(&entry.image))?;
        layers.push(entry.settings.into_layer(frame));
    }

    let resolution = match (stack.resolution, layers.first()) {
        (Some(resolution), _) => resolution,
        (None, Some(layer)) => layer.frame.dimensions(),
        (None, None) => bail!("layer stack is empty and has no resolution"),
    };

    let compositor = Compositor::new(Pipeline::with_config(registry, &config.pipeline));
    let result = compositor.render_composite(&layers, resolution, seed)?;
    result.save_png(output).with_context(|| format!("writing {}", output.display()))?;

    info!("Composited {} layers into {}", layers.len(), output.display());
    Ok(())
}

fn preview(
    registry: &EffectRegistry,
    config: &Config,
    input: &Path,
    frames: u64,
    fps: f64,
    shm: Option<PathBuf>,
    args: &ChainArgs,
) -> Result<()> {
    let chain = load_chain(args)?;
    let frame = open_image(input)?;
    let pipeline = Pipeline::with_config(registry, &config.pipeline);

    let path = shm.unwrap_or_else(|| config.ring_buffer.resolve_path());
    let mut writer = RingBufferWriter::create(&path, config.ring_buffer.slot_count, config.ring_buffer.slot_size)?;
    let interval = if fps.is_finite() && fps > 0.0 {
        Duration::from_secs_f64(1.0 / fps)
    } else {
        Duration::ZERO
    };

    let mut states = EffectStates::new();
    for index in 0..frames {
        let (output, next) = pipeline.apply_chain(&frame, &chain, args.seed, index, frame.dimensions(), &states)?;
        states = next;

        if let Err(e) = writer.write_frame(&output, config.ring_buffer.quality) {
            warn!("Dropping preview frame {}: {}", index, e);
        }
        thread::sleep(interval);
    }
    writer.flush()?;

    info!("Wrote {} preview frames to {}", frames, path.display());
    Ok(())
}

fn export(registry: EffectRegistry, config: &Config, input: PathBuf, output: PathBuf, args: &ChainArgs) -> Result<()> {
    if !FfmpegBackend::is_available() {
        bail!("ffmpeg was not found on PATH");
    }

    let chain = load_chain(args)?;
    let backend = FfmpegBackend::new(config.export.codec.clone(), config.export.fallback_fps);
    let manager = ExportManager::new(Arc::new(backend), Arc::new(registry))
        .with_pipeline_config(config.pipeline.clone());

    let job = manager.start(ExportRequest {
        input_path: input,
        output_path: output,
        chain,
        project_seed: args.seed,
    })?;

    while job.status() == ExportStatus::Running {
        thread::sleep(Duration::from_millis(500));
        let status = job.snapshot();
        info!(
            "Export {:.1}% ({}/{} frames)",
            status.progress * 100.0,
            status.current_frame,
            status.total_frames
        );
    }
    manager.join();

    let status = job.snapshot();
    match status.status {
        ExportStatus::Complete => {
            info!("Export complete! Output saved to: {:?}", job.output_path());
            Ok(())
        }
        other => bail!(
            "export finished with status {} ({})",
            other,
            status.error.unwrap_or_default()
        ),
    }
}
