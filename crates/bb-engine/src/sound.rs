//! Decoded sound assets.

use arrayvec::ArrayString;

/// One decoded sound effect: signed 16-bit mono PCM held in memory.
///
/// Assets are immutable once built and shared between voices behind an
/// `Arc`, so overlapping plays of the same sound never copy the data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoundAsset {
    /// Display name (truncated to 32 bytes).
    pub name: ArrayString<32>,
    samples: Vec<i16>,
}

impl SoundAsset {
    /// Build an asset from already-decoded samples.
    pub fn new(name: &str, samples: Vec<i16>) -> Self {
        let mut short = ArrayString::new();
        for ch in name.chars() {
            if short.try_push(ch).is_err() {
                break;
            }
        }
        Self { name: short, samples }
    }

    /// The sample data.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the asset has no samples and cannot be played.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
