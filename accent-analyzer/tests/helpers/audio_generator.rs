//! Audio Test Fixture Generator
//!
//! In-memory WAV fixtures with a configurable tone

use std::io::Cursor;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Tone frequency in Hz; 0 produces silence
    pub frequency: f32,
    /// Peak amplitude in [0, 1]
    pub amplitude: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 1.0,
            sample_rate: 44100,
            channels: 2,
            frequency: 440.0,
            amplitude: 0.3,
        }
    }
}

impl AudioConfig {
    pub fn silence() -> Self {
        Self {
            amplitude: 0.0,
            ..Self::default()
        }
    }
}

/// Generate a 16-bit PCM WAV file in memory
pub fn generate_test_wav(config: &AudioConfig) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let total_frames = (config.duration_seconds * config.sample_rate as f64) as usize;

        for i in 0..total_frames {
            let t = i as f32 / config.sample_rate as f32;
            let value = config.amplitude * (2.0 * std::f32::consts::PI * config.frequency * t).sin();
            let sample = (value * i16::MAX as f32) as i16;

            for _ in 0..config.channels {
                writer.write_sample(sample).unwrap();
            }
        }

        writer.finalize().unwrap();
    }

    cursor.into_inner()
}
