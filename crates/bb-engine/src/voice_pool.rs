//! VoicePool: fixed-capacity voice allocation and retirement.

use std::sync::Arc;

use crate::error::MixerError;
use crate::sound::SoundAsset;
use crate::voice::Voice;

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Default number of simultaneous voices.
pub const MAX_VOICES: usize = 30;

/// Bounded set of playing voices.
///
/// The slot vector is sized once at construction and never grows, so
/// rendering and allocation never touch the heap.
pub struct VoicePool {
    /// Voice slots (None = free).
    slots: Vec<Option<Voice>>,
}

impl VoicePool {
    /// Create an empty pool with [`MAX_VOICES`] slots.
    pub fn new() -> Self {
        Self::with_capacity(MAX_VOICES)
    }

    /// Create an empty pool with a specific number of slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Start playing `sound` in the first free slot.
    ///
    /// A full pool drops the request; existing voices are never stolen.
    pub fn allocate(&mut self, sound: &Arc<SoundAsset>) -> Result<VoiceId, MixerError> {
        if sound.is_empty() {
            return Err(MixerError::EmptySound);
        }
        let id = self
            .slots
            .iter()
            .position(|s| s.is_none())
            .ok_or(MixerError::PoolFull)?;
        self.slots[id] = Some(Voice::new(Arc::clone(sound)));
        Ok(id)
    }

    /// Get a reference to a voice.
    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.slots.get(id).and_then(|s| s.as_ref())
    }

    /// Count of occupied slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Stop every voice immediately.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Mix all active voices into `out` and retire the ones that ran out.
    /// Returns how many voices were retired.
    pub fn render_all(&mut self, out: &mut [i16]) -> usize {
        let mut retired = 0;
        for slot in &mut self.slots {
            if let Some(voice) = slot {
                voice.render_into(out);
                if voice.is_finished() {
                    *slot = None;
                    retired += 1;
                }
            }
        }
        retired
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound(data: Vec<i16>) -> Arc<SoundAsset> {
        Arc::new(SoundAsset::new("test", data))
    }

    // === Allocation tests ===

    #[test]
    fn pool_new_is_empty() {
        let pool = VoicePool::new();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.capacity(), MAX_VOICES);
    }

    #[test]
    fn pool_allocate_returns_valid_id() {
        let mut pool = VoicePool::new();
        let id = pool.allocate(&sound(vec![1; 10])).unwrap();
        assert!(pool.get(id).is_some());
        assert_eq!(pool.get(id).unwrap().cursor(), 0);
    }

    #[test]
    fn pool_allocate_uses_first_free_slot() {
        let mut pool = VoicePool::with_capacity(4);
        let long = sound(vec![1; 100]);
        let short = sound(vec![1; 2]);
        assert_eq!(pool.allocate(&long).unwrap(), 0);
        assert_eq!(pool.allocate(&short).unwrap(), 1);
        assert_eq!(pool.allocate(&long).unwrap(), 2);

        let mut out = [0i16; 4];
        pool.render_all(&mut out);
        assert!(pool.get(1).is_none());
        assert_eq!(pool.allocate(&long).unwrap(), 1);
    }

    #[test]
    fn pool_rejects_empty_sound() {
        let mut pool = VoicePool::new();
        assert_eq!(pool.allocate(&sound(vec![])), Err(MixerError::EmptySound));
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn pool_full_drops_without_touching_slots() {
        let mut pool = VoicePool::with_capacity(3);
        let a = sound(vec![1; 50]);
        for _ in 0..3 {
            pool.allocate(&a).unwrap();
        }
        let mut out = [0i16; 10];
        pool.render_all(&mut out);

        let b = sound(vec![2; 50]);
        assert_eq!(pool.allocate(&b), Err(MixerError::PoolFull));
        assert_eq!(pool.active_count(), 3);
        for id in 0..3 {
            let voice = pool.get(id).unwrap();
            assert!(Arc::ptr_eq(voice.sound(), &a));
            assert_eq!(voice.cursor(), 10);
        }
    }

    #[test]
    fn pool_clear_frees_everything() {
        let mut pool = VoicePool::with_capacity(2);
        let a = sound(vec![1; 50]);
        pool.allocate(&a).unwrap();
        pool.allocate(&a).unwrap();
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(Arc::strong_count(&a), 1);
    }

    // === Render tests ===

    #[test]
    fn pool_render_silent_when_empty() {
        let mut pool = VoicePool::new();
        let mut out = [0i16; 8];
        assert_eq!(pool.render_all(&mut out), 0);
        assert_eq!(out, [0; 8]);
    }

    #[test]
    fn pool_render_sums_voices() {
        let mut pool = VoicePool::new();
        pool.allocate(&sound(vec![100; 4])).unwrap();
        pool.allocate(&sound(vec![-30; 4])).unwrap();
        let mut out = [0i16; 4];
        pool.render_all(&mut out);
        assert_eq!(out, [70; 4]);
    }

    #[test]
    fn pool_render_retires_in_the_exhausting_cycle() {
        let mut pool = VoicePool::new();
        let id = pool.allocate(&sound(vec![1; 5])).unwrap();
        let mut out = [0i16; 8];
        assert_eq!(pool.render_all(&mut out), 1);
        assert!(pool.get(id).is_none());
        assert_eq!(out, [1, 1, 1, 1, 1, 0, 0, 0]);
    }
}
