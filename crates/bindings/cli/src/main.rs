//! divisi CLI - split a closed-score SATB file into four part scores.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use divisi_format::FormatRegistry;
use divisi_format::musescore::MuseScoreBridge;
use divisi_musicxml::{MuseScoreFormat, MusicXmlFormat};
use divisi_split::{SplitOptions, split_score};

/// divisi: closed-score SATB part extraction
///
/// Reads one choral score (MusicXML, compressed MusicXML, or MuseScore
/// archive) holding soprano/alto on the top staff and tenor/bass on the
/// bottom staff, and writes four single-staff MusicXML part scores.
#[derive(Parser, Debug)]
#[command(name = "divisi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input score (.musicxml, .xml, .mxl, .mscz)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (defaults to the input file's directory)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Notation tool for converting MuseScore archives
    /// (default: $DIVISI_MSCORE, then `mscore`)
    #[arg(long, value_name = "TOOL")]
    mscore: Option<PathBuf>,

    /// Skip dynamics unification
    #[arg(long)]
    skip_dynamics: bool,

    /// Skip lyrics unification
    #[arg(long)]
    skip_lyrics: bool,

    /// Skip spanner (wedge) unification
    #[arg(long)]
    skip_spanners: bool,

    /// Skip layout and tempo unification
    #[arg(long)]
    skip_layout: bool,

    /// Skip output validation
    #[arg(long)]
    no_validate: bool,
}

impl Cli {
    fn split_options(&self) -> SplitOptions {
        SplitOptions {
            apply_dynamics_unification: !self.skip_dynamics,
            apply_lyrics_unification: !self.skip_lyrics,
            apply_spanner_unification: !self.skip_spanners,
            apply_layout_unification: !self.skip_layout,
            validate_output: !self.no_validate,
        }
    }
}

/// Build the default format registry with all compiled-in formats.
fn build_registry(mscore: Option<PathBuf>) -> FormatRegistry {
    let mut registry = FormatRegistry::new();

    registry.register_importer(Box::new(MusicXmlFormat));
    registry.register_exporter(Box::new(MusicXmlFormat));

    let bridge = match mscore {
        Some(tool) => MuseScoreBridge::new(tool),
        None => MuseScoreBridge::from_env(),
    };
    registry.register_importer(Box::new(MuseScoreFormat::new(bridge)));

    registry
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = build_registry(cli.mscore.clone());

    // Read input file.
    let content = fs::read(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;

    // Resolve input format (extension first, content fallback).
    let input_ext = cli
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let importer = registry
        .find_importer(input_ext, Some(&content))
        .with_context(|| format!("Could not detect format of input file: {:?}", cli.input))?;

    tracing::debug!(format = importer.id(), "input format resolved");
    let mut score = importer
        .import(&content)
        .with_context(|| format!("Failed to import {} file", importer.name()))?;

    // Title fallbacks use the name the user gave us, never an intermediate
    // conversion artifact.
    let base = cli
        .input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "score".to_string());
    score.metadata.source_basename = Some(base.clone());

    let output = split_score(&score, &cli.split_options())?;

    let out_dir = cli.out_dir.clone().unwrap_or_else(|| {
        cli.input
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create output directory: {out_dir:?}"))?;

    let exporter = registry
        .find_exporter("musicxml")
        .context("MusicXML exporter not registered")?;

    for (name, part_score) in output.iter() {
        let xml = exporter
            .export(part_score)
            .with_context(|| format!("Failed to export {name} part"))?;
        let path = out_dir.join(format!("{base}-{name}.musicxml"));
        fs::write(&path, xml).with_context(|| format!("Failed to write {path:?}"))?;
        println!("Wrote {path:?} ({name})");
    }

    Ok(())
}
