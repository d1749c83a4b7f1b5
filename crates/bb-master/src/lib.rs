//! Headless controller for the beatbox drum machine.
//!
//! Ties the mixer, the playback thread and the beat sequencer together
//! behind one owner, [`BeatBox`], that both the live binary and tests use.

mod audio_mixer;
mod bounce;
mod driver;
mod kit;
mod sequencer;
mod status;

use bb_audio::{SinkOpener, VolumeControl};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// Re-export common types so callers don't need the lower crates directly.
pub use bb_audio::{AudioError, CpalSink, MemorySink, MemoryTap, SinkConfig, SoftwareVolume};
pub use bb_engine::{
    BeatError, BeatMode, DrumSound, Mixer, MixerError, PeriodStats, PeriodTimer, SoundAsset,
    VoiceId, DEFAULT_BPM, DEFAULT_VOLUME, MAX_VOICES,
};
pub use bb_formats::{load_sound, samples_to_wav, write_wav, FormatError};

pub use audio_mixer::AudioMixer;
pub use bounce::bounce;
pub use driver::{DriverState, PlaybackDriver};
pub use kit::{DrumKit, KitPaths, KitPlayer};
pub use sequencer::{BeatSequencer, TriggerSink, IDLE_POLL};
pub use status::{format_status, StatusReporter};

/// Anything that can stop the drum machine from starting or running.
#[derive(Debug, Error)]
pub enum BeatBoxError {
    #[error(transparent)]
    Mixer(#[from] MixerError),
    #[error(transparent)]
    Beat(#[from] BeatError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("cannot spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// The playback thread gave up on the sink while running.
    #[error("playback driver failed: {0}")]
    DriverFailed(AudioError),
}

/// Startup settings. Volume and tempo go through the same checks as
/// runtime changes.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub volume: i32,
    pub tempo: i32,
    pub mode: BeatMode,
    pub voices: usize,
    /// Interval of the status line; `None` disables it.
    pub status_interval: Option<Duration>,
    /// Start the beat immediately.
    pub autoplay: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME as i32,
            tempo: DEFAULT_BPM as i32,
            mode: BeatMode::Rock,
            voices: MAX_VOICES,
            status_interval: Some(Duration::from_secs(1)),
            autoplay: true,
        }
    }
}

/// The running drum machine.
///
/// Field order is drop order: status thread, sequencer, player, audio,
/// kit. [`BeatBox::shutdown`] does the same explicitly and reports errors.
pub struct BeatBox {
    status: Option<StatusReporter>,
    sequencer: Arc<BeatSequencer>,
    player: Arc<KitPlayer>,
    audio: AudioMixer,
    kit: Arc<DrumKit>,
}

impl BeatBox {
    /// Bring everything up, or nothing: settings are checked before the
    /// sink is opened, and any later failure tears down what was started.
    pub fn start(
        kit: DrumKit,
        settings: &Settings,
        opener: SinkOpener,
        volume_control: Box<dyn VolumeControl>,
    ) -> Result<Self, BeatBoxError> {
        bb_engine::validate_tempo(settings.tempo)?;
        bb_engine::validate_volume(settings.volume)?;

        let audio = AudioMixer::init(opener, volume_control, settings.voices)?;
        audio.set_volume(settings.volume)?;

        let kit = Arc::new(kit);
        let player = Arc::new(KitPlayer::new(audio.mixer().clone(), kit.clone()));
        let sequencer = Arc::new(BeatSequencer::new(player.clone()));
        sequencer.set_mode(settings.mode);
        sequencer.set_tempo(settings.tempo)?;

        let status = match settings.status_interval {
            Some(interval) => Some(StatusReporter::start(
                interval,
                sequencer.clone(),
                audio.mixer().clone(),
                audio.timer().clone(),
            )?),
            None => None,
        };

        if settings.autoplay {
            sequencer.start();
        }
        info!(
            "beatbox running: {} at {} bpm, volume {}%",
            settings.mode,
            sequencer.tempo(),
            audio.volume()
        );

        Ok(Self {
            status,
            sequencer,
            player,
            audio,
            kit,
        })
    }

    /// Trigger one drum hit now, outside the pattern.
    pub fn play_sound(&self, sound: DrumSound) -> Result<VoiceId, MixerError> {
        self.player.play(sound)
    }

    pub fn set_volume(&self, percent: i32) -> Result<u8, BeatBoxError> {
        self.audio.set_volume(percent)
    }

    pub fn adjust_volume(&self, delta: i32) -> Result<u8, AudioError> {
        self.audio.adjust_volume(delta)
    }

    pub fn volume(&self) -> u8 {
        self.audio.volume()
    }

    pub fn sequencer(&self) -> &BeatSequencer {
        &self.sequencer
    }

    pub fn mixer(&self) -> &Arc<Mixer> {
        self.audio.mixer()
    }

    pub fn kit(&self) -> &DrumKit {
        &self.kit
    }

    /// False once the playback thread has died.
    pub fn is_healthy(&self) -> bool {
        self.audio.is_healthy()
    }

    /// Stop the beat, stop playback, then free the sounds.
    pub fn shutdown(self) -> Result<(), BeatBoxError> {
        let BeatBox {
            status,
            sequencer,
            player,
            mut audio,
            kit,
        } = self;

        drop(status);
        sequencer.shutdown();
        drop(sequencer);
        let result = audio.cleanup();
        drop(player);

        match Arc::try_unwrap(kit) {
            Ok(kit) => {
                kit.release();
            }
            Err(_) => warn!("drum kit still shared at shutdown"),
        }
        info!("beatbox stopped");
        result.map_err(BeatBoxError::DriverFailed)
    }
}
