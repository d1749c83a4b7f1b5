//! Mixer lifecycle: shared mixing state, the device volume and the driver.

use bb_audio::{AudioError, SinkOpener, VolumeControl};
use bb_engine::{
    step_volume, validate_volume, Mixer, MixerError, PeriodTimer, SoundAsset, VoiceId,
    DEFAULT_VOLUME,
};
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};

use crate::driver::PlaybackDriver;
use crate::BeatBoxError;

/// Owns everything between a triggered sound and the speaker.
///
/// Created once by [`AudioMixer::init`] and torn down by
/// [`AudioMixer::cleanup`] (or on drop): the driver thread is joined
/// first, then the sink is drained and closed, then the voices are freed.
pub struct AudioMixer {
    mixer: Arc<Mixer>,
    volume_control: Mutex<Box<dyn VolumeControl>>,
    driver: Option<PlaybackDriver>,
    timer: Arc<PeriodTimer>,
}

impl AudioMixer {
    /// Open the sink, start the playback thread and apply the default
    /// volume. Fails without starting anything if the sink cannot open.
    pub fn init(
        opener: SinkOpener,
        volume_control: Box<dyn VolumeControl>,
        voices: usize,
    ) -> Result<Self, BeatBoxError> {
        let mixer = Arc::new(Mixer::with_capacity(voices));
        let timer = Arc::new(PeriodTimer::new());
        volume_control.set_hardware_volume(DEFAULT_VOLUME)?;
        let driver = PlaybackDriver::start(mixer.clone(), opener, timer.clone())?;
        info!("mixer ready: {} voices, volume {}%", voices, DEFAULT_VOLUME);

        Ok(Self {
            mixer,
            volume_control: Mutex::new(volume_control),
            driver: Some(driver),
            timer,
        })
    }

    /// Set the output volume and push it to the device.
    ///
    /// Out-of-range values are rejected before anything changes. The cache
    /// only moves once the device has taken the value.
    pub fn set_volume(&self, percent: i32) -> Result<u8, BeatBoxError> {
        let volume = validate_volume(percent)?;
        self.push_volume(|_| volume)?;
        Ok(volume)
    }

    /// Step the volume by `delta`, clamped to 0..=100.
    pub fn adjust_volume(&self, delta: i32) -> Result<u8, AudioError> {
        self.push_volume(|current| step_volume(current, delta))
    }

    /// Hold the control lock across push and cache so concurrent setters
    /// land in the same order on the device and in the mixer.
    fn push_volume(&self, next: impl FnOnce(u8) -> u8) -> Result<u8, AudioError> {
        let control = self.volume_control.lock().unwrap_or_else(PoisonError::into_inner);
        let volume = next(self.mixer.volume());
        control.set_hardware_volume(volume)?;
        self.mixer.store_volume(volume);
        Ok(volume)
    }

    /// Cached volume; the device is not queried.
    pub fn volume(&self) -> u8 {
        self.mixer.volume()
    }

    /// Start `sound` on the next block. A full pool drops the sound.
    pub fn enqueue(&self, sound: &Arc<SoundAsset>) -> Result<VoiceId, MixerError> {
        self.mixer.enqueue(sound).inspect_err(|err| {
            warn!("{} not played: {}", sound.name, err);
        })
    }

    pub fn mixer(&self) -> &Arc<Mixer> {
        &self.mixer
    }

    /// Block timing of the playback thread.
    pub fn timer(&self) -> &Arc<PeriodTimer> {
        &self.timer
    }

    /// False once the playback thread has died on a sink error or stopped.
    pub fn is_healthy(&self) -> bool {
        self.driver
            .as_ref()
            .is_some_and(|d| d.is_running() && !d.has_failed())
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.driver.as_ref().map(PlaybackDriver::sample_rate)
    }

    /// Stop playback and free every voice. Returns the driver's fatal
    /// error, if it had one. Safe to call more than once.
    pub fn cleanup(&mut self) -> Result<(), AudioError> {
        let result = match self.driver.take() {
            Some(mut driver) => driver.stop(),
            None => return Ok(()),
        };
        self.mixer.clear();
        info!("mixer shut down");
        result
    }
}

impl Drop for AudioMixer {
    fn drop(&mut self) {
        if let Err(err) = self.cleanup() {
            warn!("mixer cleanup: {}", err);
        }
    }
}
