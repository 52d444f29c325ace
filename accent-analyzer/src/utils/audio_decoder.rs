//! Audio Decoding Utilities
//!
//! **Purpose:** Decode staged audio files to mono f32 PCM and resample them
//! to the classifier's input rate.
//!
//! Uses symphonia for format-agnostic decoding (WAV, MP3, FLAC, OGG) and
//! rubato for sinc resampling.

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Duration in seconds
    pub duration_seconds: f64,
}

/// Decode audio file to mono f32 PCM samples
///
/// **Algorithm:**
/// 1. Open file and probe format using symphonia (extension used as hint)
/// 2. Find default audio track
/// 3. Decode all packets, skipping individually corrupt packets
/// 4. Convert multi-channel to mono (average channels)
///
/// # Errors
/// * File I/O errors
/// * Unsupported format or missing audio track
/// * Unrecoverable decoder errors
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let mut channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut mono_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // End of stream
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e).context("Error reading packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channel_count = spec.channels.count().max(1);
                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                mono_samples.extend(mix_to_mono(sample_buf.samples(), channel_count));
            }
            Err(SymphoniaError::DecodeError(err)) => {
                tracing::warn!(error = %err, "Skipping corrupt packet");
            }
            Err(e) => return Err(e).context("Failed to decode packet"),
        }
    }

    let duration_seconds = mono_samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        path = %file_path.display(),
        sample_rate,
        channels = channel_count,
        total_samples = mono_samples.len(),
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: mono_samples,
        sample_rate,
        channels: channel_count,
        duration_seconds,
    })
}

/// Average interleaved frames down to one channel
fn mix_to_mono(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved
        .chunks(channels)
        .map(move |frame| frame.iter().sum::<f32>() / frame.len() as f32)
}

/// Resample mono PCM from `source_rate` to `target_rate`
///
/// Single-pass sinc interpolation with a BlackmanHarris2 window; the whole
/// input is processed as one chunk. Returns the input unchanged when the
/// rates already match.
pub fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples);
    }

    let num_frames = samples.len();

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let resample_ratio = target_rate as f64 / source_rate as f64;

    let mut resampler = SincFixedIn::<f32>::new(
        resample_ratio,
        1.0, // Fixed ratio for the lifetime of the resampler
        params,
        num_frames,
        1,
    )
    .context("Failed to create rubato resampler")?;

    let output_channels = resampler
        .process(&[samples], None)
        .context("Rubato resampling failed")?;

    let output = output_channels.into_iter().next().unwrap_or_default();

    tracing::debug!(
        "Resampled {} frames ({} Hz) → {} frames ({} Hz)",
        num_frames,
        source_rate,
        output.len(),
        target_rate
    );

    Ok(output)
}
