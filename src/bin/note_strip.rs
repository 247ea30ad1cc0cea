use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use note_strip::analysis::pitch::PitchClass;
use note_strip::audio::{list_input_devices, CpalCapture, ReplayOptions, WavReplay};
use note_strip::fixtures::{analyze_clip, load_wav};
use note_strip::led::{open_spi_bus, LedBus, MemoryBus, PixelStrip};
use note_strip::shutdown::install_ctrl_c_handler;
use note_strip::{AppConfig, NotePipeline, NoteRenderer, ShutdownFlag};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "note_strip",
    about = "Light a WS2812 strip with the pitch classes heard on the microphone"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the live capture → analysis → LED loop until Ctrl+C
    Run {
        #[command(flatten)]
        overrides: Overrides,
        /// Write frames to memory instead of the SPI device
        #[arg(long)]
        dry_run: bool,
        /// Feed the pipeline from a WAV file instead of the microphone
        #[arg(long)]
        wav: Option<PathBuf>,
    },
    /// Print the active pitch classes of every frame of a WAV file as JSON lines
    Analyze {
        #[arg(long)]
        wav: PathBuf,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Light each pitch-class block in turn to check wiring and colors
    Palette {
        #[command(flatten)]
        overrides: Overrides,
        /// Time each block stays lit
        #[arg(long, default_value_t = 500)]
        hold_ms: u64,
        #[arg(long)]
        dry_run: bool,
    },
    /// List audio input devices
    Devices,
}

/// Command-line overrides for configuration fields
#[derive(Args, Debug)]
struct Overrides {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Audio input device name
    #[arg(long)]
    device: Option<String>,
    /// spidev device node
    #[arg(long)]
    spi: Option<String>,
    /// Number of LEDs on the strip
    #[arg(long)]
    leds: Option<usize>,
    /// Dimming factor 0.0-1.0
    #[arg(long)]
    brightness: Option<f32>,
    /// Magnitude threshold for a note to count as present
    #[arg(long)]
    threshold: Option<f32>,
}

impl Overrides {
    /// Load the config file (or defaults), apply overrides and validate
    fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from_file(path),
            None => AppConfig::default(),
        };

        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(spi) = &self.spi {
            config.strip.spi_device = spi.clone();
        }
        if let Some(leds) = self.leds {
            config.strip.num_leds = leds;
        }
        if let Some(brightness) = self.brightness {
            config.strip.brightness = brightness;
        }
        if let Some(threshold) = self.threshold {
            config.analysis.magnitude_threshold = threshold;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Run {
            overrides,
            dry_run,
            wav,
        } => run_live(&overrides, dry_run, wav.as_deref()),
        Commands::Analyze { wav, overrides } => run_analyze(&wav, &overrides),
        Commands::Palette {
            overrides,
            hold_ms,
            dry_run,
        } => run_palette(&overrides, hold_ms, dry_run),
        Commands::Devices => run_devices(),
    }
}

fn open_bus(config: &AppConfig, dry_run: bool) -> Result<Box<dyn LedBus>> {
    if dry_run {
        tracing::info!("Dry run: LED frames are kept in memory");
        return Ok(Box::new(MemoryBus::new()));
    }
    let bus = open_spi_bus(&config.strip)
        .with_context(|| format!("opening {}", config.strip.spi_device))?;
    Ok(bus)
}

fn run_live(overrides: &Overrides, dry_run: bool, wav: Option<&Path>) -> Result<ExitCode> {
    let mut config = overrides.resolve()?;

    let clip = match wav {
        Some(path) => {
            let clip = load_wav(path).with_context(|| format!("loading {}", path.display()))?;
            if clip.sample_rate != config.audio.sample_rate {
                tracing::warn!(
                    "{} is {} Hz; analyzing at that rate instead of {} Hz",
                    path.display(),
                    clip.sample_rate,
                    config.audio.sample_rate
                );
                config.audio.sample_rate = clip.sample_rate;
                config.validate().context("invalid configuration for clip")?;
            }
            Some(clip)
        }
        None => None,
    };

    let shutdown = ShutdownFlag::new();
    install_ctrl_c_handler(shutdown.clone()).context("installing Ctrl+C handler")?;

    let bus = open_bus(&config, dry_run)?;
    let mut pipeline = NotePipeline::new(&config, bus, shutdown.clone())
        .context("initializing LED strip")?;

    match clip {
        Some(clip) => {
            let replay = WavReplay::start(
                clip,
                pipeline.exchange(),
                shutdown.clone(),
                ReplayOptions::default(),
            )?;
            pipeline.attach_capture(Box::new(replay));
        }
        None => {
            let capture = CpalCapture::start(&config.audio, pipeline.exchange(), shutdown.clone())
                .context("starting audio capture")?;
            pipeline.attach_capture(Box::new(capture));
        }
    }

    pipeline.run().context("LED transmission failed")?;

    let stats = pipeline.stats();
    tracing::info!(
        "Analyzed {} frames, rendered {}",
        stats.frames_analyzed,
        stats.frames_rendered
    );
    Ok(ExitCode::SUCCESS)
}

fn run_analyze(wav: &Path, overrides: &Overrides) -> Result<ExitCode> {
    let config = overrides.resolve()?;
    let clip = load_wav(wav).with_context(|| format!("loading {}", wav.display()))?;

    for report in analyze_clip(&clip, &config.audio, &config.analysis) {
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_palette(overrides: &Overrides, hold_ms: u64, dry_run: bool) -> Result<ExitCode> {
    let config = overrides.resolve()?;
    let shutdown = ShutdownFlag::new();
    install_ctrl_c_handler(shutdown.clone()).context("installing Ctrl+C handler")?;

    let bus = open_bus(&config, dry_run)?;
    let mut strip =
        PixelStrip::from_config(bus, &config.strip).context("initializing LED strip")?;
    let renderer = NoteRenderer::from_config(&config.strip);

    for class in PitchClass::ALL {
        if shutdown.is_requested() {
            break;
        }
        let block = renderer.block(class);
        tracing::info!(
            "{:<2} LEDs {}..{} color {:?}",
            class.name(),
            block.start,
            block.end,
            class.color(config.strip.palette_order)
        );

        strip.clear();
        renderer.light(class, &mut strip);
        strip.show().context("LED transmission failed")?;
        thread::sleep(Duration::from_millis(hold_ms));
    }

    strip.close();
    Ok(ExitCode::SUCCESS)
}

fn run_devices() -> Result<ExitCode> {
    let devices = list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for name in devices {
        println!("{name}");
    }
    Ok(ExitCode::SUCCESS)
}
