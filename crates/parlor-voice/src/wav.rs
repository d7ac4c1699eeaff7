//! PCM16 ↔ WAV container framing.
//!
//! The browser and the synthesis engine both speak raw little-endian PCM16
//! mono at 24 kHz; the transcription API requires a framed file. Wrapping
//! the byte stream in a minimal RIFF/WAVE header is the only container work
//! in the bridge.

/// Sample rate of all audio crossing the bridge, in Hz.
pub const SAMPLE_RATE_HZ: u32 = 24_000;

/// Size of the RIFF/WAVE header produced by [`pcm16_to_wav`], in bytes.
pub const WAV_HEADER_LEN: usize = 44;

const NUM_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Wraps raw PCM16 mono samples in a standard single-channel WAV container.
///
/// Byte-transparent: the payload lands in the data chunk unchanged, so
/// stripping the header yields the input exactly. Accepts any length,
/// including empty (a valid zero-data-length WAV); sample alignment is the
/// caller's contract.
pub fn pcm16_to_wav(pcm: &[u8]) -> Vec<u8> {
    let block_align = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = SAMPLE_RATE_HZ * u32::from(block_align);
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format tag
    wav.extend_from_slice(&NUM_CHANNELS.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE_HZ.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}
