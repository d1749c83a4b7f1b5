//! Drum kit: the named sounds a pattern can trigger.

use bb_engine::{DrumSound, Mixer, MixerError, SoundAsset, VoiceId};
use bb_formats::{load_sound, FormatError};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::sequencer::TriggerSink;

/// Where each drum sound is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KitPaths {
    pub base: PathBuf,
    pub hihat: PathBuf,
    pub snare: PathBuf,
}

impl Default for KitPaths {
    fn default() -> Self {
        Self {
            base: "wave-files/100051__menegass__gui-drum-bd-hard.wav".into(),
            hihat: "wave-files/100053__menegass__gui-drum-cc.wav".into(),
            snare: "wave-files/100059__menegass__gui-drum-snare-soft.wav".into(),
        }
    }
}

/// One loaded asset per [`DrumSound`].
pub struct DrumKit {
    sounds: [Arc<SoundAsset>; 3],
}

impl DrumKit {
    /// Load every sound. Any missing or unreadable file fails the whole kit.
    pub fn load(paths: &KitPaths) -> Result<Self, FormatError> {
        let kit = Self::from_sounds(
            load_sound(&paths.base)?,
            load_sound(&paths.hihat)?,
            load_sound(&paths.snare)?,
        );
        info!(
            "drum sounds loaded: base {} / hihat {} / snare {} samples",
            kit.get(DrumSound::Base).len(),
            kit.get(DrumSound::HiHat).len(),
            kit.get(DrumSound::Snare).len()
        );
        Ok(kit)
    }

    /// Build a kit from already-decoded assets.
    pub fn from_sounds(base: SoundAsset, hihat: SoundAsset, snare: SoundAsset) -> Self {
        Self {
            sounds: [Arc::new(base), Arc::new(hihat), Arc::new(snare)],
        }
    }

    pub fn get(&self, sound: DrumSound) -> &Arc<SoundAsset> {
        &self.sounds[sound.index()]
    }

    /// Free the sample data. Returns how many assets were still referenced
    /// by live voices and therefore outlive the kit.
    pub fn release(self) -> usize {
        let mut shared = 0;
        for (sound, asset) in DrumSound::ALL.iter().zip(self.sounds) {
            if let Err(asset) = Arc::try_unwrap(asset) {
                warn!(
                    "{} still referenced by {} voice(s) at release",
                    sound,
                    Arc::strong_count(&asset) - 1
                );
                shared += 1;
            }
        }
        shared
    }
}

/// Plays kit sounds through a mixer.
pub struct KitPlayer {
    mixer: Arc<Mixer>,
    kit: Arc<DrumKit>,
}

impl KitPlayer {
    pub fn new(mixer: Arc<Mixer>, kit: Arc<DrumKit>) -> Self {
        Self { mixer, kit }
    }

    /// Queue one drum hit. A full pool drops the hit and logs it.
    pub fn play(&self, sound: DrumSound) -> Result<VoiceId, MixerError> {
        self.mixer.enqueue(self.kit.get(sound)).inspect_err(|err| {
            warn!("{} dropped: {}", sound, err);
        })
    }
}

impl TriggerSink for KitPlayer {
    fn trigger(&self, sound: DrumSound) {
        let _ = self.play(sound);
    }
}
