//! Mixer: the voice pool and cached volume behind one lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::MixerError;
use crate::sound::SoundAsset;
use crate::voice_pool::{VoiceId, VoicePool, MAX_VOICES};

/// Volume applied at startup, in percent.
pub const DEFAULT_VOLUME: u8 = 80;

/// Upper bound for volume, in percent.
pub const MAX_VOLUME: u8 = 100;

/// Accept a volume in 0..=100 percent.
pub fn validate_volume(percent: i32) -> Result<u8, MixerError> {
    u8::try_from(percent)
        .ok()
        .filter(|v| *v <= MAX_VOLUME)
        .ok_or(MixerError::VolumeOutOfRange(percent))
}

/// `current + delta`, saturating at 0 and 100. For stepwise controls that
/// should stop at the ends rather than be rejected.
pub fn step_volume(current: u8, delta: i32) -> u8 {
    (current as i32).saturating_add(delta).clamp(0, MAX_VOLUME as i32) as u8
}

struct MixerState {
    pool: VoicePool,
    volume: u8,
}

/// Shared mixing state.
///
/// Enqueue, render and volume changes all go through the same mutex, so a
/// render pass always sees a consistent set of voices. The lock is only
/// held for buffer math, never across device I/O.
pub struct Mixer {
    state: Mutex<MixerState>,
}

impl Mixer {
    /// Create a mixer with [`MAX_VOICES`] slots at [`DEFAULT_VOLUME`].
    pub fn new() -> Self {
        Self::with_capacity(MAX_VOICES)
    }

    pub fn with_capacity(voices: usize) -> Self {
        Self {
            state: Mutex::new(MixerState {
                pool: VoicePool::with_capacity(voices),
                volume: DEFAULT_VOLUME,
            }),
        }
    }

    // The guarded data has no cross-field invariant a panic could break.
    fn lock(&self) -> MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last volume accepted by [`Mixer::set_volume`].
    pub fn volume(&self) -> u8 {
        self.lock().volume
    }

    /// Cache a new volume. Values outside 0..=100 are rejected and the
    /// previous volume is kept.
    pub fn set_volume(&self, percent: i32) -> Result<u8, MixerError> {
        let volume = validate_volume(percent)?;
        self.store_volume(volume);
        Ok(volume)
    }

    /// Cache an already validated volume.
    pub fn store_volume(&self, volume: u8) {
        self.lock().volume = volume.min(MAX_VOLUME);
    }

    /// Queue `sound` to start on the next rendered block.
    ///
    /// When every slot is busy the sound is dropped and `PoolFull` is
    /// returned; callers must not retry in a loop.
    pub fn enqueue(&self, sound: &Arc<SoundAsset>) -> Result<VoiceId, MixerError> {
        self.lock().pool.allocate(sound)
    }

    /// Fill `out` with the next block: zero it, mix every active voice with
    /// saturation, and retire voices that ran out of samples.
    pub fn render_block(&self, out: &mut [i16]) {
        out.fill(0);
        self.lock().pool.render_all(out);
    }

    /// Number of voices currently playing.
    pub fn active_voices(&self) -> usize {
        self.lock().pool.active_count()
    }

    pub fn capacity(&self) -> usize {
        self.lock().pool.capacity()
    }

    /// Drop every voice, releasing their asset references.
    pub fn clear(&self) {
        self.lock().pool.clear();
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}
