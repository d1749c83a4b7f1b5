//! WAV encoding and decoding for 16-bit mono PCM.
//!
//! Sound assets are read the simple way: the canonical 44-byte header is
//! skipped and everything after it is taken as little-endian i16 samples.

use crate::FormatError;
use bb_engine::SoundAsset;
use std::io::Write;
use std::path::Path;

/// Bytes before the PCM data in a canonical WAV file.
pub const PCM_DATA_OFFSET: usize = 44;

// --- Writing ---

const FMT_CHUNK_LEN: u32 = 16;
const PCM_FORMAT_TAG: u16 = 1;
const BYTES_PER_SAMPLE: u32 = 2;

/// Write `samples` as a canonical mono 16-bit PCM WAV file.
pub fn write_wav(w: &mut impl Write, samples: &[i16], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&wav_header(samples.len(), sample_rate))?;
    write_pcm(w, samples.iter().copied())
}

pub fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PCM_DATA_OFFSET + samples.len() * 2);
    // Writing into a Vec cannot fail.
    let _ = write_wav(&mut buf, samples, sample_rate);
    buf
}

/// The 44 bytes in front of the PCM data: RIFF header, `fmt ` chunk and
/// the `data` chunk header.
fn wav_header(sample_count: usize, sample_rate: u32) -> [u8; PCM_DATA_OFFSET] {
    let data_len = sample_count as u32 * BYTES_PER_SAMPLE;
    let mut header = [0u8; PCM_DATA_OFFSET];
    let mut put = |at: usize, bytes: &[u8]| header[at..at + bytes.len()].copy_from_slice(bytes);
    put(0, b"RIFF");
    put(4, &(36 + data_len).to_le_bytes());
    put(8, b"WAVE");
    put(12, b"fmt ");
    put(16, &FMT_CHUNK_LEN.to_le_bytes());
    put(20, &PCM_FORMAT_TAG.to_le_bytes());
    put(22, &1u16.to_le_bytes()); // mono
    put(24, &sample_rate.to_le_bytes());
    put(28, &(sample_rate * BYTES_PER_SAMPLE).to_le_bytes());
    put(32, &(BYTES_PER_SAMPLE as u16).to_le_bytes());
    put(34, &16u16.to_le_bytes());
    put(36, b"data");
    put(40, &data_len.to_le_bytes());
    header
}

fn write_pcm(w: &mut impl Write, samples: impl Iterator<Item = i16>) -> std::io::Result<()> {
    let mut chunk = [0u8; 512];
    let mut filled = 0;
    for sample in samples {
        chunk[filled..filled + 2].copy_from_slice(&sample.to_le_bytes());
        filled += 2;
        if filled == chunk.len() {
            w.write_all(&chunk)?;
            filled = 0;
        }
    }
    w.write_all(&chunk[..filled])
}

// --- Reading ---

/// Load a sound asset from a file on disk. A file with no samples after
/// the header is rejected, since it could never be played.
pub fn load_sound(path: &Path) -> Result<SoundAsset, FormatError> {
    let data = std::fs::read(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let sound = parse_sound(&data, &name)?;
    if sound.is_empty() {
        return Err(FormatError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(sound)
}

/// Decode a sound asset from raw file bytes.
///
/// A trailing odd byte is ignored. Bytes holding only a header decode to
/// an empty asset; [`load_sound`] rejects those.
pub fn parse_sound(data: &[u8], name: &str) -> Result<SoundAsset, FormatError> {
    if data.len() < PCM_DATA_OFFSET {
        return Err(FormatError::TooShort { len: data.len() });
    }
    let samples = read_16bit_mono(&data[PCM_DATA_OFFSET..]);
    Ok(SoundAsset::new(name, samples))
}

fn read_16bit_mono(raw: &[u8]) -> Vec<i16> {
    raw.chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}
