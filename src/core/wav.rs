//! Canonical RIFF/WAVE framing for raw PCM.
//!
//! Layout written by [`encode`] (all integers little endian):
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 4    | `RIFF`                                 |
//! | 4      | 4    | 36 + data length                       |
//! | 8      | 4    | `WAVE`                                 |
//! | 12     | 4    | `fmt `                                 |
//! | 16     | 4    | 16 (fmt chunk size)                    |
//! | 20     | 2    | 1 (PCM)                                |
//! | 22     | 2    | channels                               |
//! | 24     | 4    | sample rate                            |
//! | 28     | 4    | byte rate                              |
//! | 32     | 2    | block align                            |
//! | 34     | 2    | bits per sample                        |
//! | 36     | 4    | `data`                                 |
//! | 40     | 4    | data length                            |
//! | 44     | ..   | samples                                |

use thiserror::Error;

pub const HEADER_LEN: usize = 44;
const PCM_FORMAT: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    /// Mono, 24 kHz, 16-bit: the format of upstream speech output.
    fn default() -> Self {
        WavSpec {
            channels: 1,
            sample_rate: 24_000,
            bits_per_sample: 16,
        }
    }
}

impl WavSpec {
    /// `None` when the frame size overflows the header field.
    pub fn block_align(&self) -> Option<u16> {
        self.channels.checked_mul(self.bits_per_sample.div_ceil(8))
    }

    /// `None` when the byte rate overflows the header field.
    pub fn byte_rate(&self) -> Option<u32> {
        self.block_align()
            .and_then(|align| self.sample_rate.checked_mul(u32::from(align)))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WavError {
    #[error("pcm payload of {0} bytes does not fit a WAV container")]
    TooLarge(usize),
    #[error("unplayable format: {0:?}")]
    InvalidSpec(WavSpec),
    #[error("container shorter than the {HEADER_LEN}-byte header")]
    Truncated,
    #[error("missing `{0}` marker")]
    MissingMarker(&'static str),
    #[error("unsupported audio format {0}, only PCM is supported")]
    UnsupportedFormat(u16),
    #[error("declared data length {declared} exceeds the {available} bytes present")]
    DataLengthMismatch { declared: usize, available: usize },
}

/// Prepends a canonical WAV header to `pcm`.
pub fn encode(pcm: &[u8], spec: WavSpec) -> Result<Vec<u8>, WavError> {
    let data_len = u32::try_from(pcm.len())
        .ok()
        .filter(|len| len.checked_add(36).is_some())
        .ok_or(WavError::TooLarge(pcm.len()))?;

    if spec.sample_rate == 0 || spec.channels == 0 || spec.bits_per_sample == 0 {
        return Err(WavError::InvalidSpec(spec));
    }
    let (block_align, byte_rate) = spec
        .block_align()
        .zip(spec.byte_rate())
        .ok_or(WavError::InvalidSpec(spec))?;

    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&spec.channels.to_le_bytes());
    out.extend_from_slice(&spec.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&spec.bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);

    Ok(out)
}

/// A parsed WAV container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wav<'a> {
    pub spec: WavSpec,
    pub riff_len: u32,
    pub data: &'a [u8],
}

impl Wav<'_> {
    /// Number of sample frames in the data chunk.
    pub fn frames(&self) -> usize {
        match self.spec.block_align() {
            None | Some(0) => 0,
            Some(align) => self.data.len() / usize::from(align),
        }
    }
}

/// Parses a canonical (44-byte header) WAV container.
pub fn parse(bytes: &[u8]) -> Result<Wav<'_>, WavError> {
    if bytes.len() < HEADER_LEN {
        return Err(WavError::Truncated);
    }

    expect_marker(bytes, 0, b"RIFF", "RIFF")?;
    expect_marker(bytes, 8, b"WAVE", "WAVE")?;
    expect_marker(bytes, 12, b"fmt ", "fmt ")?;
    expect_marker(bytes, 36, b"data", "data")?;

    let format = u16_at(bytes, 20);
    if format != PCM_FORMAT {
        return Err(WavError::UnsupportedFormat(format));
    }

    let spec = WavSpec {
        channels: u16_at(bytes, 22),
        sample_rate: u32_at(bytes, 24),
        bits_per_sample: u16_at(bytes, 34),
    };

    let declared = u32_at(bytes, 40) as usize;
    let available = bytes.len() - HEADER_LEN;
    if declared > available {
        return Err(WavError::DataLengthMismatch {
            declared,
            available,
        });
    }

    Ok(Wav {
        spec,
        riff_len: u32_at(bytes, 4),
        data: &bytes[HEADER_LEN..HEADER_LEN + declared],
    })
}

fn expect_marker(
    bytes: &[u8],
    offset: usize,
    marker: &[u8; 4],
    name: &'static str,
) -> Result<(), WavError> {
    if &bytes[offset..offset + 4] == marker {
        Ok(())
    } else {
        Err(WavError::MissingMarker(name))
    }
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
