//! Voice: one in-flight playback of a sound asset.

use std::sync::Arc;

use crate::pcm::mix_into;
use crate::sound::SoundAsset;

/// A sound being played, with its own cursor into the shared asset.
#[derive(Clone, Debug)]
pub struct Voice {
    /// Which asset this voice plays.
    sound: Arc<SoundAsset>,
    /// Samples already emitted. Never decreases, never exceeds `sound.len()`.
    cursor: usize,
}

impl Voice {
    /// Start a voice at the beginning of `sound`.
    pub fn new(sound: Arc<SoundAsset>) -> Self {
        Self { sound, cursor: 0 }
    }

    pub fn sound(&self) -> &Arc<SoundAsset> {
        &self.sound
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Samples left to play.
    pub fn remaining(&self) -> usize {
        self.sound.len() - self.cursor
    }

    /// Returns true once every sample has been emitted.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.sound.len()
    }

    /// Mix the next run of samples into `out` and advance the cursor.
    /// Returns how many samples were taken.
    pub fn render_into(&mut self, out: &mut [i16]) -> usize {
        let take = self.remaining().min(out.len());
        let start = self.cursor;
        mix_into(&mut out[..take], &self.sound.samples()[start..start + take]);
        self.cursor += take;
        take
    }
}
