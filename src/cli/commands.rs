//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::{EqualizerConfig, ParameterSet};
use crate::dsp::equalizer::{process_batch, Equalizer};
use crate::engine::{linear_to_db, read_wav, write_wav, AudioBuffer, WavFormat};

fn load_equalizer(path: &Path) -> Result<(EqualizerConfig, Box<dyn Equalizer>)> {
    let config = EqualizerConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    let eq = config
        .build()
        .with_context(|| format!("Invalid equalizer config {}", path.display()))?;
    Ok((config, eq))
}

fn load_params(path: &Path) -> Result<ParameterSet> {
    ParameterSet::from_file(path)
        .with_context(|| format!("Failed to load parameters {}", path.display()))
}

/// Warn when a graphic EQ was designed for another sample rate than the audio
fn check_sample_rate(config: &EqualizerConfig, input: &AudioBuffer, path: &Path) {
    if let EqualizerConfig::Graphic(geq) = config {
        if geq.sample_rate != input.sample_rate as f64 {
            warn!(
                file = %path.display(),
                file_rate = input.sample_rate,
                design_rate = geq.sample_rate,
                "sample rate differs from the equalizer design; band frequencies will be shifted"
            );
        }
    }
}

/// Print parameter shapes, optionally writing a flat parameter template.
pub fn shape(config: &Path, template: Option<&Path>) -> Result<()> {
    let (_, eq) = load_equalizer(config)?;
    let sizes = eq.parameter_size();

    println!("{} ({} mode)", eq.name(), eq.channel_mode());
    for (name, (rows, cols)) in sizes.iter() {
        println!("  {}: {} x {}", name, rows, cols);
    }

    if let Some(path) = template {
        let json = ParameterSet::zeros(&sizes).to_json_string()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write template {}", path.display()))?;
        println!("Template written: {}", path.display());
    }

    Ok(())
}

/// Print the designed filters as JSON.
pub fn design(config: &Path, params: &Path) -> Result<()> {
    let (_, eq) = load_equalizer(config)?;
    let params = load_params(params)?;

    let filters = eq.design(params.for_equalizer(eq.as_ref())?)?;
    info!(filters = filters.len(), "designed filters");
    println!("{}", serde_json::to_string_pretty(&filters)?);

    Ok(())
}

/// Equalize one WAV file.
pub fn apply(config: &Path, params: &Path, input: &Path, output: &Path, bit_depth: u16) -> Result<()> {
    let (config, eq) = load_equalizer(config)?;
    let params = load_params(params)?;
    let rows = params.for_equalizer(eq.as_ref())?;

    let audio = read_wav(input).with_context(|| format!("Failed to read {}", input.display()))?;
    check_sample_rate(&config, &audio, input);
    info!(
        file = %input.display(),
        channels = audio.channels(),
        seconds = audio.duration_secs(),
        "processing"
    );

    let processed = eq
        .process(&audio, rows)
        .with_context(|| format!("Failed to equalize {}", input.display()))?;
    report_level(&processed, output);

    write_wav(&processed, output, WavFormat::new(bit_depth))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Written: {}", output.display());

    Ok(())
}

/// Equalize several WAV files in parallel.
pub fn batch(
    config: &Path,
    params: &Path,
    inputs: &[PathBuf],
    output_dir: &Path,
    bit_depth: u16,
) -> Result<()> {
    let (config, eq) = load_equalizer(config)?;
    let params = load_params(params)?;
    let rows = params.for_equalizer(eq.as_ref())?.to_vec();

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut items = Vec::with_capacity(inputs.len());
    for input in inputs {
        let audio =
            read_wav(input).with_context(|| format!("Failed to read {}", input.display()))?;
        check_sample_rate(&config, &audio, input);
        items.push((audio, rows.clone()));
    }

    let results = process_batch(eq.as_ref(), &items);

    let mut failures = 0usize;
    for (input, result) in inputs.iter().zip(results) {
        let Some(name) = input.file_name() else {
            bail!("Input path has no file name: {}", input.display());
        };
        let output = output_dir.join(name);
        match result {
            Ok(processed) => {
                report_level(&processed, &output);
                write_wav(&processed, &output, WavFormat::new(bit_depth))
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                println!("Written: {}", output.display());
            }
            Err(e) => {
                failures += 1;
                warn!(file = %input.display(), error = %e, hint = e.recovery_hint(), "skipped");
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} files failed", failures, inputs.len());
    }
    Ok(())
}

fn report_level(buffer: &AudioBuffer, output: &Path) {
    let peak_db = linear_to_db(buffer.peak());
    let rms_db = linear_to_db(buffer.rms());
    if peak_db > 0.0 {
        warn!(
            file = %output.display(),
            peak_db,
            rms_db,
            "output exceeds full scale and will clip in integer formats"
        );
    } else {
        info!(file = %output.display(), peak_db, rms_db, "output level");
    }
}
