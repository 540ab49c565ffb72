//! Audio file loading, decoding, and duration probing.
//!
//! Sound clips are decoded in full with Symphonia, mapped to the output channel layout, and
//! resampled to the output rate so the mixer can index them by frame.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use symphonia::core::{
    audio::SampleBuffer as SymphoniaSampleBuffer,
    codecs::DecoderOptions,
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::audio_engine::conversion::{map_channels, resample_linear};
use crate::audio_engine::errors::AudioError;
use crate::messages::SampleBuffer;

/// Interleaved samples as they come out of the decoder.
struct DecodedAudio {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>, AudioError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    Ok(probed.format)
}

fn decode_all(mut format: Box<dyn FormatReader>) -> Result<DecodedAudio, AudioError> {
    let track = format.default_track().ok_or(AudioError::NoDefaultTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::MissingSampleRate)?;
    let channels = track
        .codec_params
        .channels
        .ok_or(AudioError::MissingChannels)?
        .count();

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(AudioError::Decode(err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = decoder.decode(&packet)?;
        let spec = *audio_buf.spec();
        let capacity = audio_buf.capacity() as u64;

        let mut sample_buf = SymphoniaSampleBuffer::<f32>::new(capacity, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

/// Decodes an audio file into a sample buffer matching the output stream layout.
///
/// # Errors
///
/// - File not found or cannot be opened
/// - Format not recognized or corrupt data
/// - Channel layout that cannot be mapped to the output
pub(crate) fn decode_audio_file(
    path: &Path,
    output_channels: usize,
    output_rate_hz: u32,
) -> Result<SampleBuffer, AudioError> {
    let decoded = decode_all(open_format(path)?)?;

    let resampled = resample_linear(
        &decoded.samples,
        decoded.channels,
        decoded.sample_rate,
        output_rate_hz,
    );
    let mapped = map_channels(resampled, decoded.channels, output_channels)?;

    log::debug!(
        "Decoded {} ({} ch@{} Hz -> {} ch@{} Hz)",
        path.display(),
        decoded.channels,
        decoded.sample_rate,
        output_channels,
        output_rate_hz
    );

    Ok(SampleBuffer {
        channels: output_channels,
        samples: Arc::from(mapped.into_boxed_slice()),
    })
}

/// Returns the duration of an audio file in seconds.
///
/// Uses the container's frame count when it is known and falls back to a full decode otherwise.
pub fn probe_duration(path: &Path) -> Result<f64, AudioError> {
    let format = open_format(path)?;
    let track = format.default_track().ok_or(AudioError::NoDefaultTrack)?;

    if let (Some(n_frames), Some(rate)) =
        (track.codec_params.n_frames, track.codec_params.sample_rate)
    {
        if rate > 0 {
            return Ok(n_frames as f64 / f64::from(rate));
        }
    }

    let decoded = decode_all(format)?;
    if decoded.channels == 0 || decoded.sample_rate == 0 {
        return Ok(0.0);
    }
    let frames = decoded.samples.len() / decoded.channels;
    Ok(frames as f64 / f64::from(decoded.sample_rate))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;

    /// Writes a PCM16 WAV file for tests.
    pub(crate) fn write_pcm16_wav(
        path: &Path,
        channels: u16,
        sample_rate_hz: u32,
        samples: &[i16],
    ) -> std::io::Result<()> {
        let bits_per_sample = 16u16;
        let block_align = channels * (bits_per_sample / 8);
        let byte_rate = sample_rate_hz * u32::from(block_align);
        let data_len_bytes = u32::try_from(samples.len() * 2).expect("sample data too large");
        let chunk_size = 36 + data_len_bytes;

        let mut file = File::create(path)?;
        file.write_all(b"RIFF")?;
        file.write_all(&chunk_size.to_le_bytes())?;
        file.write_all(b"WAVE")?;

        file.write_all(b"fmt ")?;
        file.write_all(&16u32.to_le_bytes())?;
        file.write_all(&1u16.to_le_bytes())?; // PCM
        file.write_all(&channels.to_le_bytes())?;
        file.write_all(&sample_rate_hz.to_le_bytes())?;
        file.write_all(&byte_rate.to_le_bytes())?;
        file.write_all(&block_align.to_le_bytes())?;
        file.write_all(&bits_per_sample.to_le_bytes())?;

        file.write_all(b"data")?;
        file.write_all(&data_len_bytes.to_le_bytes())?;
        for sample in samples {
            file.write_all(&sample.to_le_bytes())?;
        }

        Ok(())
    }

    #[test]
    fn test_decode_wav_to_f32_buffer() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("horn.wav");

        let samples = [0i16, 16_384i16, -16_384i16, 32_767i16];
        write_pcm16_wav(&path, 1, 44_100, &samples).unwrap();

        let decoded = decode_audio_file(&path, 1, 44_100).unwrap();
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.frames(), samples.len());
        assert!(decoded.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_decode_maps_mono_to_stereo() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("horn.wav");

        let samples = [0i16, 16_384i16, -16_384i16];
        write_pcm16_wav(&path, 1, 44_100, &samples).unwrap();

        let decoded = decode_audio_file(&path, 2, 44_100).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), samples.len() * 2);
        for frame in decoded.samples.chunks_exact(2) {
            assert!((frame[0] - frame[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_decode_resamples_to_output_rate() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("low.wav");

        let samples = vec![1_000i16; 100];
        write_pcm16_wav(&path, 1, 22_050, &samples).unwrap();

        let decoded = decode_audio_file(&path, 1, 44_100).unwrap();
        assert_eq!(decoded.frames(), 200);
    }

    #[test]
    fn test_probe_duration_of_wav() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("half_second.wav");

        let samples = vec![0i16; 4_000];
        write_pcm16_wav(&path, 1, 8_000, &samples).unwrap();

        let duration = probe_duration(&path).unwrap();
        assert!((duration - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nonexistent.wav");

        assert!(matches!(
            decode_audio_file(&path, 1, 44_100),
            Err(AudioError::Io(_))
        ));
        assert!(probe_duration(&path).is_err());
    }

    #[test]
    fn test_probe_rejects_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(probe_duration(&path).is_err());
    }
}
