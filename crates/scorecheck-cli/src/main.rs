// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scorecheck-prep: prepare box score screenshots for OCR.
//
// Entry point. Initialises logging on stderr, runs one operation over one
// input image and either writes the result files or prints the JSON envelope
// on stdout. The exit status mirrors the envelope's `success` flag.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use scorecheck_core::human_errors::humanize_error;
use scorecheck_core::{CropRect, Operation, PrepConfig, ResultEnvelope, ScorecheckError};
use scorecheck_imaging::pipeline::{EncodedImage, PipelineOutput};
use scorecheck_imaging::{RunOptions, run, to_envelope};
use tracing::{debug, info, warn};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Prepare box score screenshots for OCR
#[derive(Parser, Debug)]
#[command(name = "scorecheck-prep")]
#[command(version, about, long_about = None)]
struct Args {
    /// Operation to run (crop, crop_box_score, preprocess_ocr,
    /// preprocess_ocr_alternative, multiple_versions, dimensions,
    /// preprocess_binary_ocr, otsu_ocr, adaptive_threshold, enhanced_binary,
    /// multi_level)
    #[arg(long, required_unless_present = "print_config")]
    operation: Option<String>,

    /// Input image file
    #[arg(long, required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Output file; multi-image results are written as <stem>_<name>.<ext>
    #[arg(long)]
    output: Option<PathBuf>,

    /// Crop rectangle as JSON: {"left":..,"top":..,"width":..,"height":..}
    #[arg(long)]
    coordinates: Option<String>,

    /// Median denoise before binarization (preprocess_binary_ocr)
    #[arg(long)]
    denoise: bool,

    /// Named crop preset from the configuration
    #[arg(long)]
    preset: Option<String>,

    /// JSON configuration file overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

/// What a successful invocation produced.
#[derive(Debug)]
enum Outcome {
    /// Result files written to disk.
    Written(Vec<PathBuf>),
    /// Envelope to print on stdout.
    Envelope(ResultEnvelope),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.print_config {
        let printed = load_config(args.config.as_deref())
            .and_then(|config| Ok(serde_json::to_string_pretty(&config)?));
        return match printed {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => fail(&err),
        };
    }

    match execute(&args) {
        Ok(Outcome::Written(paths)) => {
            let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            println!(
                "Successfully processed image. Output saved to: {}",
                listed.join(", ")
            );
            ExitCode::SUCCESS
        }
        Ok(Outcome::Envelope(envelope)) => print_envelope(&envelope),
        Err(err) => fail(&err),
    }
}

/// Print the failure envelope on stdout and the operator hint on stderr.
fn fail(err: &ScorecheckError) -> ExitCode {
    let hint = humanize_error(err);
    eprintln!("Error: {}\n  {}", hint.message, hint.suggestion);
    print_envelope(&ResultEnvelope::failure(err))
}

fn print_envelope(envelope: &ResultEnvelope) -> ExitCode {
    match serde_json::to_string_pretty(envelope) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("Error: failed to serialize result: {err}"),
    }
    ExitCode::from(envelope.exit_code())
}

// =============================================================================
// Execution
// =============================================================================

fn load_config(path: Option<&Path>) -> Result<PrepConfig, ScorecheckError> {
    match path {
        Some(path) => PrepConfig::load(path),
        None => Ok(PrepConfig::default()),
    }
}

/// Run the requested operation. Nothing is written unless the whole pipeline
/// succeeded.
fn execute(args: &Args) -> Result<Outcome, ScorecheckError> {
    let config = load_config(args.config.as_deref())?;

    let operation: Operation = args
        .operation
        .as_deref()
        .ok_or_else(|| ScorecheckError::InvalidParameter("--operation is required".into()))?
        .parse()?;
    let input_path = args
        .input
        .as_deref()
        .ok_or_else(|| ScorecheckError::InvalidParameter("--input is required".into()))?;

    let options = RunOptions {
        crop: args
            .coordinates
            .as_deref()
            .map(CropRect::from_json)
            .transpose()?,
        preset: args.preset.clone(),
        denoise: args.denoise,
    };
    if options.denoise && operation != Operation::PreprocessBinaryOcr {
        warn!(%operation, "--denoise only affects preprocess_binary_ocr");
    }

    let input = fs::read(input_path).map_err(|source| ScorecheckError::InputRead {
        path: input_path.to_path_buf(),
        source,
    })?;
    info!(%operation, input = %input_path.display(), bytes = input.len(), "Processing image");

    let output = run(operation, &input, &options, &config)?;

    match (&args.output, output) {
        (Some(path), PipelineOutput::Single(image)) => {
            write_all(&[(path.clone(), &image)])?;
            Ok(Outcome::Written(vec![path.clone()]))
        }
        (Some(path), PipelineOutput::Variants(map)) => {
            let targets: Vec<(PathBuf, &EncodedImage)> = map
                .iter()
                .map(|(name, image)| (variant_path(path, name, image), image))
                .collect();
            write_all(&targets)?;
            Ok(Outcome::Written(
                targets.into_iter().map(|(p, _)| p).collect(),
            ))
        }
        (_, output) => Ok(Outcome::Envelope(to_envelope(&Ok(output)))),
    }
}

/// `<dir>/<stem>_<name>.<ext>` next to the requested output path.
fn variant_path(output: &Path, name: &str, image: &EncodedImage) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{stem}_{name}.{}", image.encoding.extension()))
}

/// Write every target, removing the ones already written if any write fails.
fn write_all(targets: &[(PathBuf, &EncodedImage)]) -> Result<(), ScorecheckError> {
    for (index, (path, image)) in targets.iter().enumerate() {
        if let Err(source) = fs::write(path, &image.bytes) {
            for (written, _) in &targets[..index] {
                let _ = fs::remove_file(written);
            }
            return Err(ScorecheckError::OutputWrite {
                path: path.clone(),
                source,
            });
        }
        debug!(path = %path.display(), bytes = image.bytes.len(), "Output written");
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
