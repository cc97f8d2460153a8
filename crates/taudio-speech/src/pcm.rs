//! Raw PCM to normalized float conversion for playback.
//!
//! Playback engines want per-channel f32 buffers in `[-1.0, 1.0]`; the
//! wire format is interleaved s16le. The conversion divides by 32768.0 —
//! asymmetric on purpose, matching the signed 16-bit range: `-32768` maps
//! to exactly `-1.0` while `+32767` lands just under `1.0`.

/// A decoded, normalized audio buffer: one sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatBuffer {
    /// Sample rate of the audio in Hz.
    pub sample_rate: u32,

    /// Per-channel samples, each of equal length.
    pub channels: Vec<Vec<f32>>,
}

impl FloatBuffer {
    /// Number of frames (samples per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

/// Interpret interleaved s16le bytes as normalized f32 samples.
///
/// `frames = floor(sample_count / channel_count)`; a trailing partial frame
/// (or odd trailing byte) is dropped silently rather than raised — callers
/// feed whatever the wire delivered.
#[must_use]
pub fn to_float_samples(pcm: &[u8], sample_rate: u32, channel_count: usize) -> FloatBuffer {
    if channel_count == 0 {
        return FloatBuffer {
            sample_rate,
            channels: Vec::new(),
        };
    }

    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let frames = samples.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (channel, &sample) in channels.iter_mut().zip(frame) {
            channel.push(f32::from(sample) / 32_768.0);
        }
    }

    FloatBuffer {
        sample_rate,
        channels,
    }
}
