use crate::config::{Config, load_config};
use crate::dump::write_deck_dump;
use crate::input::{load_ir_value, parse_ir_guess};
use crate::ir::Meta;
use crate::normalize::into_presentation;
use crate::orchestrator::{RenderedDeck, render_presentation};
use crate::render::{render_deck_svg, write_output_svg};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "deckr", version, about = "Lay out a slide-deck IR into absolute shapes and render it")]
pub struct Args {
    /// Input IR file (.yaml/.yml/.json/.json5) or '-' for stdin
    pub input: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "output", default_value = ".")]
    pub output: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "svg")]
    pub format: OutputFormat,

    /// Config JSON5 file (theme, layout and render tunables)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())
        .with_context(|| format!("loading config {:?}", args.config))?;
    let raw = read_input(args.input.as_deref())?;
    let presentation = into_presentation(raw)?;
    tracing::debug!(
        slides = presentation.slide_count(),
        tools = ?presentation.tools_used(),
        "loaded IR"
    );
    let deck = render_presentation(&presentation, &ToolRegistry::builtin(), &config)?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;
    let written = write_outputs(&deck, &presentation.meta, &config, &args.output, args.format)?;

    tracing::info!(
        files = written.len(),
        rendered = deck.report.rendered.len(),
        skipped = deck.report.skipped.len(),
        "done"
    );
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(path: Option<&Path>) -> Result<Value> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(load_ir_value(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    parse_ir_guess(&buf).map_err(|message| anyhow::anyhow!("failed to parse stdin: {message}"))
}

/// `slide-1.svg`, `slide-2.png`, … or `deck.json`.
pub fn output_paths(dir: &Path, format: OutputFormat, slides: usize) -> Vec<PathBuf> {
    match format {
        OutputFormat::Json => vec![dir.join("deck.json")],
        OutputFormat::Svg => (1..=slides).map(|n| dir.join(format!("slide-{n}.svg"))).collect(),
        OutputFormat::Png => (1..=slides).map(|n| dir.join(format!("slide-{n}.png"))).collect(),
    }
}

fn write_outputs(
    deck: &RenderedDeck,
    meta: &Meta,
    config: &Config,
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    let paths = output_paths(dir, format, deck.document.slides.len());
    match format {
        OutputFormat::Json => {
            write_deck_dump(&paths[0], deck, meta)?;
        }
        OutputFormat::Svg => {
            for (svg, path) in render_deck_svg(deck, &config.render).iter().zip(&paths) {
                write_output_svg(svg, path)?;
            }
        }
        OutputFormat::Png => write_pngs(deck, config, &paths)?,
    }
    Ok(paths)
}

#[cfg(feature = "png")]
fn write_pngs(deck: &RenderedDeck, config: &Config, paths: &[PathBuf]) -> Result<()> {
    for (svg, path) in render_deck_svg(deck, &config.render).iter().zip(paths) {
        crate::render::write_output_png(svg, path, &config.render, &deck.theme)?;
    }
    Ok(())
}

#[cfg(not(feature = "png"))]
fn write_pngs(_: &RenderedDeck, _: &Config, _: &[PathBuf]) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}
