//! Minimal WAV container encoding for raw synthesis output.
//!
//! The remote synthesis call returns raw s16le mono PCM with no container.
//! Before the blob is persisted it is wrapped in the fixed 44-byte
//! RIFF/WAVE header so any player can replay it offline. The header layout
//! is a protocol boundary — byte positions and endianness must not drift.

/// Length in bytes of the fixed RIFF/WAVE header.
pub const HEADER_LEN: usize = 44;

/// Sample rate of the remote synthesis payload, by convention.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Wrap raw s16le mono PCM bytes in a WAV container.
///
/// The header is fully determined by `pcm.len()` and `sample_rate`; the
/// payload bytes are appended unmodified. The caller is responsible for
/// passing whole 16-bit samples (an even byte count).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let byte_rate = sample_rate * u32::from(CHANNELS) * u32::from(BITS_PER_SAMPLE / 8);
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);

    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // linear PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

/// The PCM payload region of an encoded container, if the buffer is large
/// enough to carry the fixed header.
#[must_use]
pub fn payload(wav: &[u8]) -> Option<&[u8]> {
    wav.get(HEADER_LEN..)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_header_is_byte_exact() {
        let wav = encode(&[], 24_000);
        assert_eq!(wav.len(), HEADER_LEN);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 36);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32::from_le_bytes(wav[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(wav[20..22].try_into().unwrap()), 1);
        assert_eq!(u16::from_le_bytes(wav[22..24].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 24_000);
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 48_000);
        assert_eq!(u16::from_le_bytes(wav[32..34].try_into().unwrap()), 2);
        assert_eq!(u16::from_le_bytes(wav[34..36].try_into().unwrap()), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 0);
    }

    #[test]
    fn payload_region_round_trips() {
        let pcm: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        let wav = encode(&pcm, DEFAULT_SAMPLE_RATE);

        assert_eq!(payload(&wav), Some(pcm.as_slice()));
        assert_eq!(
            u32::from_le_bytes(wav[40..44].try_into().unwrap()) as usize,
            pcm.len()
        );
        assert_eq!(
            u32::from_le_bytes(wav[4..8].try_into().unwrap()) as usize,
            36 + pcm.len()
        );
    }

    #[test]
    fn header_reflects_the_sample_rate() {
        let wav = encode(&[0, 0, 0, 0], 16_000);
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 16_000);
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 32_000);
    }

    #[test]
    fn payload_of_a_truncated_buffer_is_none() {
        assert!(payload(&[0u8; 10]).is_none());
    }
}
