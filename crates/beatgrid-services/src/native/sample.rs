//! Sample loading (WAV via hound) and resampling

use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::backend::BackendError;

/// Resolve a kit sample reference to a local path.
///
/// Plain paths and `file://` URIs are accepted; other schemes are not.
pub fn sample_path(uri: &str) -> Result<&Path, BackendError> {
    if let Some(path) = uri.strip_prefix("file://") {
        return Ok(Path::new(path));
    }
    if uri.contains("://") {
        return Err(BackendError::SampleLoad {
            uri: uri.to_string(),
            reason: "unsupported URI scheme".into(),
        });
    }
    Ok(Path::new(uri))
}

/// Load a WAV file as mono f32 at `target_rate`.
pub fn load_sample(uri: &str, target_rate: u32) -> Result<Vec<f32>, BackendError> {
    let load_err = |reason: String| BackendError::SampleLoad { uri: uri.to_string(), reason };

    let path = sample_path(uri)?;
    let mut reader = hound::WavReader::open(path).map_err(|e| load_err(e.to_string()))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| load_err(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| load_err(e.to_string()))?
        }
    };

    let mono = downmix(&interleaved, spec.channels);
    if mono.is_empty() {
        return Err(load_err("no audio frames".into()));
    }
    resample(&mono, spec.sample_rate, target_rate)
}

/// Average interleaved channels into one.
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Sinc resample a mono buffer; a no-op when the rates already match.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, BackendError> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    ).map_err(|e| BackendError::Resample(format!("init: {}", e)))?;

    let input = vec![samples.to_vec()];
    let output = resampler
        .process(&input, None)
        .map_err(|e| BackendError::Resample(e.to_string()))?;

    Ok(output.into_iter().flatten().collect())
}

/// Write mono f32 samples as a 32-bit float WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}
