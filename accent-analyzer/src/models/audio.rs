//! Canonical PCM representation handed to the classifier

/// Output sample rate for normalized audio (16 kHz)
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Mono 16 kHz 16-bit little-endian linear PCM
///
/// Never empty: construction fails for zero samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAudio {
    pcm: Vec<u8>,
}

impl NormalizedAudio {
    /// Peak-normalize mono f32 samples to [-1, 1] and quantize to i16
    ///
    /// Normalization is skipped when the peak is zero. Returns `None` for an
    /// empty input.
    pub fn from_samples(samples: &[f32]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let peak = samples
            .iter()
            .filter(|s| s.is_finite())
            .fold(0.0f32, |max, s| max.max(s.abs()));
        let gain = if peak > 0.0 { 1.0 / peak } else { 1.0 };

        let mut pcm = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            // `as` saturates and maps NaN to 0
            let quantized = (sample * gain * i16::MAX as f32) as i16;
            pcm.extend_from_slice(&quantized.to_le_bytes());
        }

        Some(Self { pcm })
    }

    /// Raw PCM bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.pcm
    }

    pub fn sample_count(&self) -> usize {
        self.pcm.len() / 2
    }

    pub fn duration_seconds(&self) -> f64 {
        self.sample_count() as f64 / TARGET_SAMPLE_RATE as f64
    }

    /// Decoded i16 samples
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.pcm
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> u16 {
        self.samples().map(i16::unsigned_abs).max().unwrap_or(0)
    }
}
