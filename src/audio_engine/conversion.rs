//! Layout conversions applied to decoded audio before it reaches the mixer.

use crate::audio_engine::errors::AudioError;

/// Maps interleaved samples from the file's channel count to the output channel count.
///
/// Supports mono → stereo (duplicate), stereo → mono (average), and identity.
pub fn map_channels(
    samples: Vec<f32>,
    file_channels: usize,
    output_channels: usize,
) -> Result<Vec<f32>, AudioError> {
    if file_channels == output_channels {
        return Ok(samples);
    }

    match (file_channels, output_channels) {
        (1, 2) => Ok(samples.iter().flat_map(|&s| [s, s]).collect()),
        (2, 1) => Ok(samples
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) * 0.5)
            .collect()),
        _ => Err(AudioError::UnsupportedChannels {
            file_channels,
            output_channels,
        }),
    }
}

/// Linearly resamples interleaved audio from `source_rate` to `target_rate`.
///
/// Clips on a soundboard are short one-shots, so linear interpolation is good enough here.
pub fn resample_linear(
    samples: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    if source_rate == target_rate || channels == 0 || source_rate == 0 {
        return samples.to_vec();
    }

    let frames = samples.len() / channels;
    if frames == 0 {
        return Vec::new();
    }

    let ratio = f64::from(target_rate) / f64::from(source_rate);
    let out_frames = (frames as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;

        if idx + 1 >= frames {
            // past the last pair: hold the final frame
            let last = (frames - 1) * channels;
            out.extend_from_slice(&samples[last..last + channels]);
            continue;
        }

        let a = idx * channels;
        let b = a + channels;
        for ch in 0..channels {
            out.push(samples[a + ch] * (1.0 - frac) + samples[b + ch] * frac);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_channels_mono_to_stereo() {
        let output = map_channels(vec![0.5, -0.3, 0.8], 1, 2).unwrap();
        assert_eq!(output, vec![0.5, 0.5, -0.3, -0.3, 0.8, 0.8]);
    }

    #[test]
    fn test_map_channels_stereo_to_mono() {
        let output = map_channels(vec![0.5, 0.3, -0.2, 0.4], 2, 1).unwrap();

        assert_eq!(output.len(), 2);
        assert!((output[0] - 0.4).abs() < 1e-6);
        assert!((output[1] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_map_channels_unsupported() {
        let result = map_channels(vec![0.5, -0.3, 0.8, 0.2], 2, 4);
        assert!(matches!(
            result,
            Err(AudioError::UnsupportedChannels { .. })
        ));
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample_linear(&input, 2, 44_100, 44_100), input);
    }

    #[test]
    fn test_resample_doubles_frame_count() {
        let input = vec![0.0, 1.0];
        let output = resample_linear(&input, 1, 22_050, 44_100);

        assert_eq!(output.len(), 4);
        assert!((output[0] - 0.0).abs() < 1e-6);
        assert!((output[1] - 0.5).abs() < 1e-6);
        assert!((output[2] - 1.0).abs() < 1e-6);
        assert!((output[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_resample_keeps_channels_interleaved() {
        // left ramps up, right stays at -1
        let input = vec![0.0, -1.0, 1.0, -1.0];
        let output = resample_linear(&input, 2, 1, 2);

        assert_eq!(output.len(), 8);
        assert!(output.chunks_exact(2).all(|f| (f[1] + 1.0).abs() < 1e-6));
        assert!((output[2] - 0.5).abs() < 1e-6);
    }
}
