//! Sound asset loading and WAV export for the beatbox drum machine.

mod wav_format;

use std::path::PathBuf;
use thiserror::Error;

pub use wav_format::{load_sound, parse_sound, samples_to_wav, write_wav, PCM_DATA_OFFSET};

/// Error type for asset loading.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file has a header but no samples.
    #[error("{} has no samples", path.display())]
    Empty { path: PathBuf },
    /// The file ends before the PCM data starts.
    #[error("file is {len} bytes, shorter than a WAV header")]
    TooShort { len: usize },
}
