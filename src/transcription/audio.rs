//! Sample conversion for speech models

/// Sample rate expected by the speech model
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Average interleaved channels into mono
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Simple linear resampling
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let new_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 * ratio;
        let idx = src_idx as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = match (samples.get(idx), samples.get(idx + 1)) {
            (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
            (Some(a), None) => *a,
            _ => 0.0,
        };
        output.push(sample);
    }

    output
}

/// Downmix and resample raw device audio for the speech model
pub fn prepare_for_model(samples: &[f32], source_rate: u32, channels: usize) -> Vec<f32> {
    let mono = downmix_to_mono(samples, channels);
    resample_linear(&mono, source_rate, TARGET_SAMPLE_RATE)
}

/// Peak and RMS level of a clip
pub fn levels(samples: &[f32]) -> (f32, f32) {
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    let rms = (samples.iter().map(|s| s * s).sum::<f32>() / samples.len().max(1) as f32).sqrt();
    (peak, rms)
}
