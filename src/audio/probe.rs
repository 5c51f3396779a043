//! # Audio Container Probing
//!
//! Identifies what kind of recording was uploaded by looking at its first
//! bytes. Browsers record with whatever codec they prefer (Chrome and Firefox
//! produce WebM/Opus, Safari produces MP4/AAC) regardless of the file name the
//! page attaches, so the declared name and MIME type are not trusted.
//!
//! For RIFF/WAVE payloads the `fmt ` and `data` chunks are decoded so the
//! sample rate, channel count and duration can be logged and handed to the
//! analyzer. Probing never fails: anything unrecognised is `Unknown`.

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{Cursor, Read, Seek, SeekFrom};

/// Container format detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioContainer {
    Wav,
    WebM,
    Ogg,
    Mp4,
    Mp3,
    Unknown,
}

impl AudioContainer {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioContainer::Wav => "wav",
            AudioContainer::WebM => "webm",
            AudioContainer::Ogg => "ogg",
            AudioContainer::Mp4 => "mp4",
            AudioContainer::Mp3 => "mp3",
            AudioContainer::Unknown => "unknown",
        }
    }
}

/// PCM layout read from a WAV `fmt ` chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WavFormat {
    /// 1 = integer PCM, 3 = IEEE float, 0xFFFE = extensible
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    /// Length of the `data` chunk in bytes, if one was found.
    pub data_bytes: Option<u32>,
    /// Duration derived from `data_bytes` and the byte rate.
    pub duration_ms: Option<u64>,
}

/// Everything the gateway learns about an upload before analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioInfo {
    pub container: AudioContainer,
    pub size_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wav: Option<WavFormat>,
}

/// Sniff the container and, for WAV, decode the format header.
pub fn probe(bytes: &[u8]) -> AudioInfo {
    let container = detect_container(bytes);
    let wav = match container {
        AudioContainer::Wav => read_wav_format(bytes).ok(),
        _ => None,
    };

    AudioInfo {
        container,
        size_bytes: bytes.len(),
        wav,
    }
}

fn detect_container(bytes: &[u8]) -> AudioContainer {
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
        AudioContainer::Wav
    } else if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        // EBML header, used by both WebM and Matroska
        AudioContainer::WebM
    } else if bytes.starts_with(b"OggS") {
        AudioContainer::Ogg
    } else if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        AudioContainer::Mp4
    } else if bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0) {
        AudioContainer::Mp3
    } else {
        AudioContainer::Unknown
    }
}

/// Walk the RIFF chunk list looking for `fmt ` and `data`.
fn read_wav_format(bytes: &[u8]) -> std::io::Result<WavFormat> {
    let mut cursor = Cursor::new(bytes);
    // Skip "RIFF", the riff size and "WAVE"
    cursor.seek(SeekFrom::Start(12))?;

    let mut format: Option<(u16, u16, u32, u32, u16)> = None;
    let mut data_bytes: Option<u32> = None;

    while format.is_none() || data_bytes.is_none() {
        let mut id = [0u8; 4];
        if cursor.read_exact(&mut id).is_err() {
            break;
        }
        let len = cursor.read_u32::<LittleEndian>()?;

        match &id {
            b"fmt " => {
                let format_tag = cursor.read_u16::<LittleEndian>()?;
                let channels = cursor.read_u16::<LittleEndian>()?;
                let sample_rate = cursor.read_u32::<LittleEndian>()?;
                let byte_rate = cursor.read_u32::<LittleEndian>()?;
                let _block_align = cursor.read_u16::<LittleEndian>()?;
                let bits_per_sample = cursor.read_u16::<LittleEndian>()?;
                format = Some((format_tag, channels, sample_rate, byte_rate, bits_per_sample));
                // fmt chunks can carry an extension after the 16 base bytes
                skip_chunk_rest(&mut cursor, len, 16)?;
            }
            b"data" => {
                data_bytes = Some(len);
                skip_chunk_rest(&mut cursor, len, 0)?;
            }
            _ => skip_chunk_rest(&mut cursor, len, 0)?,
        }
    }

    let (format_tag, channels, sample_rate, byte_rate, bits_per_sample) = format.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "WAV file has no fmt chunk")
    })?;

    let duration_ms = match (data_bytes, byte_rate) {
        (Some(len), rate) if rate > 0 => Some(len as u64 * 1000 / rate as u64),
        _ => None,
    };

    Ok(WavFormat {
        format_tag,
        channels,
        sample_rate,
        bits_per_sample,
        data_bytes,
        duration_ms,
    })
}

/// Move past the unread remainder of a chunk, including the RIFF pad byte.
fn skip_chunk_rest(cursor: &mut Cursor<&[u8]>, len: u32, consumed: u32) -> std::io::Result<()> {
    let padded = len as u64 + (len as u64 & 1);
    let remaining = padded.saturating_sub(consumed as u64);
    cursor.seek(SeekFrom::Current(remaining as i64))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a minimal 16-bit PCM WAV file.
    pub(crate) fn wav_bytes(sample_rate: u32, channels: u16, samples_per_channel: u32) -> Vec<u8> {
        let bits: u16 = 16;
        let block_align = channels * bits / 8;
        let byte_rate = sample_rate * block_align as u32;
        let data_len = samples_per_channel * block_align as u32;

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    #[test]
    fn test_probe_wav() {
        let info = probe(&wav_bytes(16_000, 1, 16_000));
        assert_eq!(info.container, AudioContainer::Wav);

        let wav = info.wav.unwrap();
        assert_eq!(wav.channels, 1);
        assert_eq!(wav.sample_rate, 16_000);
        assert_eq!(wav.bits_per_sample, 16);
        assert_eq!(wav.data_bytes, Some(32_000));
        assert_eq!(wav.duration_ms, Some(1_000));
    }

    #[test]
    fn test_probe_wav_with_extra_chunk() {
        let plain = wav_bytes(8_000, 2, 400);
        // Insert an odd-length LIST chunk between fmt and data
        let mut bytes = plain[..36].to_vec();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 0]);
        bytes.extend_from_slice(&plain[36..]);

        let wav = probe(&bytes).wav.unwrap();
        assert_eq!(wav.channels, 2);
        assert_eq!(wav.duration_ms, Some(50));
    }

    #[test]
    fn test_probe_browser_containers() {
        assert_eq!(probe(&[0x1A, 0x45, 0xDF, 0xA3, 0x9F]).container, AudioContainer::WebM);
        assert_eq!(probe(b"OggS\0\x02").container, AudioContainer::Ogg);
        assert_eq!(probe(b"\0\0\0\x20ftypM4A ").container, AudioContainer::Mp4);
        assert_eq!(probe(b"ID3\x04").container, AudioContainer::Mp3);
    }

    #[test]
    fn test_probe_unknown_and_truncated() {
        let info = probe(b"hello");
        assert_eq!(info.container, AudioContainer::Unknown);
        assert_eq!(info.size_bytes, 5);

        // Valid RIFF header, no chunks
        let info = probe(b"RIFF\x04\0\0\0WAVE");
        assert_eq!(info.container, AudioContainer::Wav);
        assert!(info.wav.is_none());
    }
}
