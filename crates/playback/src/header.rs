//! AudioHeader — RIFF/WAVE container parse, bounded to one block.
//!
//! The import tool writes each clip with its WAV header at the start of the
//! payload, so everything needed to configure the output path sits inside
//! the first 512 bytes. The parser walks the chunk list in that block only;
//! a header that does not resolve within it is treated as malformed rather
//! than chased across further reads.

use platform::{Block, BLOCK_SIZE};
use thiserror_no_std::Error;

/// Reasons a header block failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderError {
    /// Missing RIFF/WAVE signature.
    #[error("not a RIFF/WAVE container")]
    BadSignature,
    /// No `fmt ` chunk before the data chunk.
    #[error("missing format chunk")]
    MissingFormat,
    /// No `data` chunk within the header block.
    #[error("missing data chunk")]
    MissingData,
    /// Encoding other than uncompressed PCM.
    #[error("unsupported encoding")]
    Unsupported,
    /// Declared sizes disagree with each other or with the container.
    #[error("inconsistent declared size")]
    InconsistentSize,
}

/// Parsed playback parameters of one stored clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AudioHeader {
    /// Samples per second.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bit_depth: u16,
    /// Channel count.
    pub channels: u16,
    /// Byte offset of the sample data from the start of the payload.
    pub data_offset: u32,
    /// Sample data length in bytes.
    pub data_size: u32,
}

impl AudioHeader {
    /// Bytes of sample data consumed per second of playback.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate
            .saturating_mul(u32::from(self.channels))
            .saturating_mul(u32::from(self.bit_depth) / 8)
    }

    /// Clip duration in whole seconds (zero for a degenerate byte rate).
    pub fn duration_secs(&self) -> u32 {
        self.data_size.checked_div(self.byte_rate()).unwrap_or(0)
    }
}

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const WAVE_MAGIC: &[u8; 4] = b"WAVE";
const FMT_CHUNK: &[u8; 4] = b"fmt ";
const DATA_CHUNK: &[u8; 4] = b"data";
const PCM_FORMAT: u16 = 1;

fn read_u16(block: &Block, pos: usize) -> Option<u16> {
    let bytes = block.get(pos..pos.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

fn read_u32(block: &Block, pos: usize) -> Option<u32> {
    let bytes = block.get(pos..pos.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Parse the WAV header found in the first payload block.
///
/// # Errors
///
/// One of the [`HeaderError`] variants; the engine maps any of them to a
/// rejected `start` request with no stream I/O issued.
pub fn parse(block: &Block) -> Result<AudioHeader, HeaderError> {
    if block.get(0..4) != Some(RIFF_MAGIC.as_ref()) || block.get(8..12) != Some(WAVE_MAGIC.as_ref())
    {
        return Err(HeaderError::BadSignature);
    }
    let riff_size = read_u32(block, 4).ok_or(HeaderError::BadSignature)?;
    // The RIFF size field counts everything after itself.
    let container_end = riff_size.saturating_add(8);

    let mut pos: usize = 12;
    let mut format: Option<(u32, u16, u16)> = None;
    while pos.saturating_add(8) <= BLOCK_SIZE {
        let id = block.get(pos..pos.saturating_add(4)).ok_or(HeaderError::MissingData)?;
        let chunk_size = read_u32(block, pos.saturating_add(4)).ok_or(HeaderError::MissingData)?;
        let body = pos.saturating_add(8);
        if id == FMT_CHUNK.as_ref() {
            let audio_format = read_u16(block, body).ok_or(HeaderError::MissingFormat)?;
            if audio_format != PCM_FORMAT {
                return Err(HeaderError::Unsupported);
            }
            let channels = read_u16(block, body.saturating_add(2)).ok_or(HeaderError::MissingFormat)?;
            let sample_rate = read_u32(block, body.saturating_add(4)).ok_or(HeaderError::MissingFormat)?;
            let bit_depth = read_u16(block, body.saturating_add(14)).ok_or(HeaderError::MissingFormat)?;
            if channels == 0 || sample_rate == 0 || bit_depth == 0 {
                return Err(HeaderError::Unsupported);
            }
            format = Some((sample_rate, bit_depth, channels));
        } else if id == DATA_CHUNK.as_ref() {
            let (sample_rate, bit_depth, channels) = format.ok_or(HeaderError::MissingFormat)?;
            let data_offset = body as u32;
            if chunk_size == 0 || data_offset.saturating_add(chunk_size) > container_end {
                return Err(HeaderError::InconsistentSize);
            }
            return Ok(AudioHeader {
                sample_rate,
                bit_depth,
                channels,
                data_offset,
                data_size: chunk_size,
            });
        }
        // Chunks are word-aligned; odd sizes carry one pad byte.
        let advance = (chunk_size as usize).saturating_add(chunk_size as usize & 1);
        pos = body.saturating_add(advance);
    }
    Err(HeaderError::MissingData)
}

/// Minimal canonical WAV header block: RIFF + fmt + data at offset 44.
#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
pub(crate) fn wav_block(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> Block {
    let mut block = [0u8; BLOCK_SIZE];
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bit_depth) / 8;
    let block_align = channels * bit_depth / 8;
    block[0..4].copy_from_slice(b"RIFF");
    block[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    block[8..12].copy_from_slice(b"WAVE");
    block[12..16].copy_from_slice(b"fmt ");
    block[16..20].copy_from_slice(&16u32.to_le_bytes());
    block[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    block[22..24].copy_from_slice(&channels.to_le_bytes());
    block[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    block[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    block[32..34].copy_from_slice(&block_align.to_le_bytes());
    block[34..36].copy_from_slice(&bit_depth.to_le_bytes());
    block[36..40].copy_from_slice(b"data");
    block[40..44].copy_from_slice(&data_size.to_le_bytes());
    block
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_header() {
        let block = wav_block(22_050, 16, 1, 80_000);
        let header = parse(&block).unwrap();
        assert_eq!(header.sample_rate, 22_050);
        assert_eq!(header.bit_depth, 16);
        assert_eq!(header.channels, 1);
        assert_eq!(header.data_offset, 44);
        assert_eq!(header.data_size, 80_000);
    }

    #[test]
    fn skips_extra_chunks_before_data() {
        let mut block = [0u8; BLOCK_SIZE];
        let canonical = wav_block(44_100, 16, 2, 1000);
        block[0..36].copy_from_slice(&canonical[0..36]);
        // Insert a LIST chunk between fmt and data.
        block[36..40].copy_from_slice(b"LIST");
        block[40..44].copy_from_slice(&10u32.to_le_bytes());
        block[54..58].copy_from_slice(b"data");
        block[58..62].copy_from_slice(&1000u32.to_le_bytes());
        block[4..8].copy_from_slice(&(54 + 1000u32).to_le_bytes());
        let header = parse(&block).unwrap();
        assert_eq!(header.data_offset, 62);
        assert_eq!(header.data_size, 1000);
    }

    #[test]
    fn rejects_missing_signature() {
        let block = [0u8; BLOCK_SIZE];
        assert_eq!(parse(&block), Err(HeaderError::BadSignature));
    }

    #[test]
    fn rejects_non_pcm_encoding() {
        let mut block = wav_block(22_050, 16, 1, 1000);
        block[20..22].copy_from_slice(&85u16.to_le_bytes()); // MP3-in-WAV
        assert_eq!(parse(&block), Err(HeaderError::Unsupported));
    }

    #[test]
    fn rejects_data_before_format() {
        let mut block = [0u8; BLOCK_SIZE];
        block[0..4].copy_from_slice(b"RIFF");
        block[4..8].copy_from_slice(&1000u32.to_le_bytes());
        block[8..12].copy_from_slice(b"WAVE");
        block[12..16].copy_from_slice(b"data");
        block[16..20].copy_from_slice(&100u32.to_le_bytes());
        assert_eq!(parse(&block), Err(HeaderError::MissingFormat));
    }

    #[test]
    fn rejects_size_past_container() {
        let mut block = wav_block(22_050, 16, 1, 1000);
        // Declare more sample data than the RIFF container holds.
        block[40..44].copy_from_slice(&10_000u32.to_le_bytes());
        assert_eq!(parse(&block), Err(HeaderError::InconsistentSize));
    }

    #[test]
    fn rejects_header_without_data_chunk() {
        let mut block = wav_block(22_050, 16, 1, 1000);
        block[36..40].copy_from_slice(b"junk");
        block[40..44].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(parse(&block), Err(HeaderError::MissingData));
    }

    #[test]
    fn byte_rate_and_duration() {
        let header = AudioHeader {
            sample_rate: 22_050,
            bit_depth: 16,
            channels: 1,
            data_offset: 44,
            data_size: 441_000,
        };
        assert_eq!(header.byte_rate(), 44_100);
        assert_eq!(header.duration_secs(), 10);
    }
}
