//! Beat patterns, tempo math, and the sequencer's step state.
//!
//! A bar is eight half-beat steps. Each mode maps a step to the set of drum
//! sounds triggered on it; the tables are plain static data.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::BeatError;

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 120;

/// Half-beat steps in one pattern.
pub const STEPS_PER_BAR: usize = 8;

/// The closed set of sounds a pattern can trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrumSound {
    /// Bass (kick) drum.
    Base,
    HiHat,
    Snare,
}

impl DrumSound {
    pub const ALL: [DrumSound; 3] = [DrumSound::Base, DrumSound::HiHat, DrumSound::Snare];

    /// Position in [`DrumSound::ALL`].
    pub const fn index(self) -> usize {
        match self {
            DrumSound::Base => 0,
            DrumSound::HiHat => 1,
            DrumSound::Snare => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DrumSound::Base => "base",
            DrumSound::HiHat => "hihat",
            DrumSound::Snare => "snare",
        }
    }
}

impl fmt::Display for DrumSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which pattern the sequencer plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BeatMode {
    /// Silent; the clock keeps running but nothing triggers.
    None,
    /// Standard rock beat.
    #[default]
    Rock,
    /// Alternate syncopated beat.
    Custom,
}

use DrumSound::{Base, HiHat, Snare};

type Pattern = [&'static [DrumSound]; STEPS_PER_BAR];

//  step | 1    1.5  2    2.5  3    3.5  4    4.5
//  base   X              X
//  snare            X                   X
//  hihat  X    X    X    X    X    X    X    X
static ROCK: Pattern = [
    &[Base, HiHat],
    &[HiHat],
    &[Snare, HiHat],
    &[HiHat],
    &[Base, HiHat],
    &[HiHat],
    &[Snare, HiHat],
    &[HiHat],
];

//  step | 1    1.5  2    2.5  3    3.5  4    4.5
//  base   X                   X                   X
//  snare  X              X              X
//  hihat            X              X    X
static CUSTOM: Pattern = [
    &[Base, Snare],
    &[],
    &[HiHat],
    &[Snare],
    &[Base],
    &[HiHat],
    &[Snare, HiHat],
    &[Base],
];

impl BeatMode {
    pub const ALL: [BeatMode; 3] = [BeatMode::None, BeatMode::Rock, BeatMode::Custom];

    pub const fn index(self) -> u8 {
        match self {
            BeatMode::None => 0,
            BeatMode::Rock => 1,
            BeatMode::Custom => 2,
        }
    }

    /// Sounds triggered on `step` (taken modulo the bar length).
    pub fn sounds_at(self, step: usize) -> &'static [DrumSound] {
        let step = step % STEPS_PER_BAR;
        match self {
            BeatMode::None => &[],
            BeatMode::Rock => ROCK[step],
            BeatMode::Custom => CUSTOM[step],
        }
    }
}

impl TryFrom<u8> for BeatMode {
    type Error = BeatError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        BeatMode::ALL
            .get(index as usize)
            .copied()
            .ok_or(BeatError::InvalidMode(index))
    }
}

impl FromStr for BeatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "0" => Ok(BeatMode::None),
            "rock" | "1" => Ok(BeatMode::Rock),
            "custom" | "2" => Ok(BeatMode::Custom),
            other => Err(format!("unknown beat mode '{other}' (expected none, rock or custom)")),
        }
    }
}

impl fmt::Display for BeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M{}", self.index())
    }
}

/// Accept a tempo in 40..=300 bpm.
pub fn validate_tempo(bpm: i32) -> Result<u32, BeatError> {
    u32::try_from(bpm)
        .ok()
        .filter(|b| (MIN_BPM..=MAX_BPM).contains(b))
        .ok_or(BeatError::TempoOutOfRange(bpm))
}

/// Wall-clock length of one half-beat: `60000 / bpm / 2` ms, truncated.
pub fn half_beat(bpm: u32) -> Duration {
    Duration::from_millis(60_000 / bpm.max(1) as u64 / 2)
}

/// Length of one half-beat in samples.
pub fn half_beat_samples(bpm: u32, sample_rate: u32) -> usize {
    (sample_rate as u64 * 60 / bpm.max(1) as u64 / 2) as usize
}

/// Mode, tempo and step position of a running sequencer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeatState {
    mode: BeatMode,
    bpm: u32,
    step: usize,
}

impl BeatState {
    pub fn new(mode: BeatMode, bpm: u32) -> Self {
        Self {
            mode,
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            step: 0,
        }
    }

    pub fn mode(&self) -> BeatMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: BeatMode) {
        self.mode = mode;
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Change tempo; out-of-range values leave the current tempo in place.
    pub fn set_tempo(&mut self, bpm: i32) -> Result<u32, BeatError> {
        self.bpm = validate_tempo(bpm)?;
        Ok(self.bpm)
    }

    /// Step that the next call to [`BeatState::advance`] will play.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn half_beat(&self) -> Duration {
        half_beat(self.bpm)
    }

    /// Return the sounds for the current step and move to the next one.
    /// The step advances in silent mode too, so the bar stays in phase.
    pub fn advance(&mut self) -> &'static [DrumSound] {
        let sounds = self.mode.sounds_at(self.step);
        self.step = (self.step + 1) % STEPS_PER_BAR;
        sounds
    }
}

impl Default for BeatState {
    fn default() -> Self {
        Self::new(BeatMode::None, DEFAULT_BPM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_beat_at_120_is_250ms() {
        assert_eq!(half_beat(120), Duration::from_millis(250));
        assert_eq!(half_beat(40), Duration::from_millis(750));
        assert_eq!(half_beat(300), Duration::from_millis(100));
    }

    #[test]
    fn half_beat_samples_at_44k() {
        assert_eq!(half_beat_samples(120, 44100), 11025);
        assert_eq!(half_beat_samples(60, 8000), 4000);
    }

    #[test]
    fn tempo_bounds() {
        assert_eq!(validate_tempo(39), Err(BeatError::TempoOutOfRange(39)));
        assert_eq!(validate_tempo(301), Err(BeatError::TempoOutOfRange(301)));
        assert_eq!(validate_tempo(-5), Err(BeatError::TempoOutOfRange(-5)));
        assert_eq!(validate_tempo(40), Ok(40));
        assert_eq!(validate_tempo(300), Ok(300));
    }

    #[test]
    fn rejected_tempo_keeps_previous() {
        let mut state = BeatState::new(BeatMode::Rock, 100);
        assert!(state.set_tempo(39).is_err());
        assert!(state.set_tempo(301).is_err());
        assert_eq!(state.bpm(), 100);
        assert_eq!(state.set_tempo(120), Ok(120));
        assert_eq!(state.half_beat(), Duration::from_millis(250));
    }

    #[test]
    fn mode_from_index() {
        assert_eq!(BeatMode::try_from(0), Ok(BeatMode::None));
        assert_eq!(BeatMode::try_from(1), Ok(BeatMode::Rock));
        assert_eq!(BeatMode::try_from(2), Ok(BeatMode::Custom));
        assert_eq!(BeatMode::try_from(3), Err(BeatError::InvalidMode(3)));
    }

    #[test]
    fn mode_from_str_and_display() {
        assert_eq!("rock".parse::<BeatMode>(), Ok(BeatMode::Rock));
        assert_eq!(" Custom ".parse::<BeatMode>(), Ok(BeatMode::Custom));
        assert_eq!("0".parse::<BeatMode>(), Ok(BeatMode::None));
        assert!("polka".parse::<BeatMode>().is_err());
        assert_eq!(BeatMode::Custom.to_string(), "M2");
    }

    #[test]
    fn rock_pattern_has_hihat_on_every_step() {
        for step in 0..STEPS_PER_BAR {
            assert!(BeatMode::Rock.sounds_at(step).contains(&HiHat));
        }
        assert_eq!(BeatMode::Rock.sounds_at(0), &[Base, HiHat]);
        assert_eq!(BeatMode::Rock.sounds_at(2), &[Snare, HiHat]);
        assert_eq!(BeatMode::Rock.sounds_at(6), &[Snare, HiHat]);
    }

    #[test]
    fn custom_pattern_table() {
        assert_eq!(BeatMode::Custom.sounds_at(0), &[Base, Snare]);
        assert!(BeatMode::Custom.sounds_at(1).is_empty());
        assert_eq!(BeatMode::Custom.sounds_at(7), &[Base]);
        assert_eq!(BeatMode::Custom.sounds_at(8), BeatMode::Custom.sounds_at(0));
    }

    #[test]
    fn silent_mode_triggers_nothing() {
        for step in 0..STEPS_PER_BAR {
            assert!(BeatMode::None.sounds_at(step).is_empty());
        }
    }

    #[test]
    fn advance_wraps_after_a_bar() {
        let mut state = BeatState::new(BeatMode::Rock, 120);
        let triggered: usize = (0..STEPS_PER_BAR).map(|_| state.advance().len()).sum();
        assert_eq!(triggered, 12);
        assert_eq!(state.step(), 0);
    }

    #[test]
    fn advance_moves_in_silent_mode() {
        let mut state = BeatState::new(BeatMode::None, 120);
        state.advance();
        state.advance();
        assert_eq!(state.step(), 2);
        state.set_mode(BeatMode::Rock);
        assert_eq!(state.advance(), &[Snare, HiHat]);
    }
}
