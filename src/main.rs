use anyhow::{bail, Context};
use clap::Parser;
use music_palette::config::{get_config, Settings};
use music_palette::{
    analyze_with, Color, FeatureSet, FileSource, Palette, SignalSource, TextColor,
};
use serde_derive::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Derive a color palette from the first seconds of a piece of music
#[derive(Debug, Parser)]
#[command(name = "music-palette", version)]
struct Cli {
    /// Audio file to analyze (MP3, WAV, FLAC, OGG)
    input: Option<PathBuf>,

    /// Number of colors in the palette
    #[arg(short, long)]
    colors: Option<usize>,

    /// Seconds of audio to analyze from the start of the input
    #[arg(short, long)]
    duration: Option<f64>,

    /// Configuration file name, extension optional
    #[arg(long, default_value = "./config")]
    config: String,

    /// Print features and palette as JSON
    #[arg(long)]
    json: bool,

    /// Record from the input device instead of reading a file
    #[cfg(feature = "capture")]
    #[arg(long, conflicts_with = "input")]
    capture: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    features: &'a FeatureSet,
    palette: &'a Palette,
}

fn swatch(color: &Color) -> String {
    let (fr, fg, fb) = match color.text_color() {
        TextColor::White => (255, 255, 255),
        TextColor::Black => (0, 0, 0),
    };

    format!(
        "\x1b[48;2;{};{};{}m\x1b[38;2;{};{};{}m  {}  \x1b[0m",
        color.red,
        color.green,
        color.blue,
        fr,
        fg,
        fb,
        color.hex()
    )
}

fn print_report(palette: &Palette, features: &FeatureSet) {
    let swatches: Vec<String> = palette.iter().map(swatch).collect();
    println!("{}", swatches.join(""));
    println!();

    println!("Tempo:      {:.1} BPM", features.tempo);
    println!("Energy:     {:.3}", features.energy);
    println!("Brightness: {:.1} Hz", features.brightness);
    println!("Complexity: {:.1} Hz", features.complexity);
    println!();

    for (i, color) in palette.iter().enumerate() {
        println!(
            "Color {}: RGB({}, {}, {}) -> {}",
            i + 1,
            color.red,
            color.green,
            color.blue,
            color.hex()
        );
    }
}

fn load_signal(cli: &Cli, settings: &Settings) -> anyhow::Result<music_palette::AudioSignal> {
    let options = settings.load_options();

    #[cfg(feature = "capture")]
    if cli.capture {
        let source = music_palette::CaptureSource::new(settings.devices.clone(), options);
        return source.load().context("Failed to record audio");
    }

    let Some(path) = &cli.input else {
        bail!("No input file given");
    };

    FileSource::new(path, options)
        .load()
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = get_config(&cli.config)
        .with_context(|| format!("Failed to read configuration {}", cli.config))?;

    if cli.colors.is_some() {
        settings.colors = cli.colors;
    }

    if cli.duration.is_some() {
        settings.max_duration = cli.duration;
    }

    let signal = load_signal(&cli, &settings)?;

    tracing::info!(
        seconds = signal.duration_secs(),
        sample_rate = signal.sample_rate(),
        "analyzing audio"
    );

    let (palette, features) =
        analyze_with(&signal, settings.num_colors(), &settings.analysis_settings())
            .context("Analysis failed")?;

    if cli.json {
        let report = Report {
            features: &features,
            palette: &palette,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&palette, &features);
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(Cli::parse()) {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}
