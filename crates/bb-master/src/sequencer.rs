//! Beat sequencer: a thread that triggers pattern sounds on a half-beat clock.

use bb_engine::{BeatError, BeatMode, BeatState, DrumSound, DEFAULT_BPM};
use log::{debug, info};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long a stopped sequencer sleeps before re-checking its flags.
pub const IDLE_POLL: Duration = Duration::from_millis(100);

/// Anything that can start a drum sound.
pub trait TriggerSink: Send + Sync {
    fn trigger(&self, sound: DrumSound);
}

impl<F> TriggerSink for F
where
    F: Fn(DrumSound) + Send + Sync,
{
    fn trigger(&self, sound: DrumSound) {
        self(sound)
    }
}

struct SeqState {
    beat: BeatState,
    running: bool,
    shutdown: bool,
    ticks: u64,
}

struct Shared {
    state: Mutex<SeqState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SeqState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, SeqState>, timeout: Duration) -> MutexGuard<'a, SeqState> {
        match self.wake.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}

/// Plays the current pattern at the current tempo.
///
/// All methods take `&self`; settings can be changed from any thread while
/// the beat is running. The thread is created on the first `start` and
/// lives until [`BeatSequencer::shutdown`].
pub struct BeatSequencer {
    shared: Arc<Shared>,
    target: Arc<dyn TriggerSink>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl BeatSequencer {
    /// A stopped, silent sequencer at the default tempo.
    pub fn new(target: Arc<dyn TriggerSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SeqState {
                    beat: BeatState::new(BeatMode::None, DEFAULT_BPM),
                    running: false,
                    shutdown: false,
                    ticks: 0,
                }),
                wake: Condvar::new(),
            }),
            target,
            thread: Mutex::new(None),
        }
    }

    /// Start triggering. Spawns the clock thread the first time; later
    /// calls only set the running flag.
    pub fn start(&self) {
        let mut thread = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.shared.lock();
            if state.shutdown || state.running {
                return;
            }
            state.running = true;
        }
        self.shared.wake.notify_all();

        if thread.is_none() {
            let shared = self.shared.clone();
            let target = self.target.clone();
            match thread::Builder::new()
                .name("bb-sequencer".into())
                .spawn(move || sequencer_thread(shared, target))
            {
                Ok(handle) => *thread = Some(handle),
                Err(err) => {
                    log::error!("cannot spawn sequencer thread: {}", err);
                    self.shared.lock().running = false;
                    return;
                }
            }
        }
        info!("beat started");
    }

    /// Stop triggering. The thread stays alive and idles.
    pub fn stop(&self) {
        let was_running = std::mem::replace(&mut self.shared.lock().running, false);
        if was_running {
            self.shared.wake.notify_all();
            info!("beat stopped");
        }
    }

    /// Stop the thread and wait for it to exit. The sequencer cannot be
    /// restarted afterwards.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            state.running = false;
            state.shutdown = true;
        }
        self.shared.wake.notify_all();
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().running
    }

    pub fn set_mode(&self, mode: BeatMode) {
        self.shared.lock().beat.set_mode(mode);
    }

    /// Set the mode from its numeric index (0 = none, 1 = rock, 2 = custom).
    pub fn set_mode_index(&self, index: u8) -> Result<BeatMode, BeatError> {
        let mode = BeatMode::try_from(index)?;
        self.set_mode(mode);
        Ok(mode)
    }

    pub fn mode(&self) -> BeatMode {
        self.shared.lock().beat.mode()
    }

    /// Change the tempo. Takes effect from the next half-beat; values
    /// outside 40..=300 are rejected and the old tempo is kept.
    pub fn set_tempo(&self, bpm: i32) -> Result<u32, BeatError> {
        self.shared.lock().beat.set_tempo(bpm)
    }

    pub fn tempo(&self) -> u32 {
        self.shared.lock().beat.bpm()
    }

    /// Current half-beat interval.
    pub fn half_beat(&self) -> Duration {
        self.shared.lock().beat.half_beat()
    }

    /// Half-beat ticks processed while running.
    pub fn ticks(&self) -> u64 {
        self.shared.lock().ticks
    }
}

impl Drop for BeatSequencer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sequencer_thread(shared: Arc<Shared>, target: Arc<dyn TriggerSink>) {
    let mut deadline = Instant::now();
    let mut state = shared.lock();

    loop {
        if state.shutdown {
            break;
        }
        if !state.running {
            state = shared.wait(state, IDLE_POLL);
            deadline = Instant::now();
            continue;
        }

        let now = Instant::now();
        if now < deadline {
            state = shared.wait(state, deadline - now);
            continue;
        }

        let step = state.beat.step();
        let sounds = state.beat.advance();
        let interval = state.beat.half_beat();
        state.ticks += 1;
        drop(state);

        debug!("step {} -> {:?}", step, sounds);
        for &sound in sounds {
            target.trigger(sound);
        }

        // Fell more than a tick behind: restart the grid instead of bursting.
        deadline = if now.duration_since(deadline) > interval {
            now + interval
        } else {
            deadline + interval
        };
        state = shared.lock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        hits: Mutex<Vec<DrumSound>>,
    }

    impl Counter {
        fn hits(&self) -> Vec<DrumSound> {
            self.hits.lock().unwrap().clone()
        }
    }

    impl TriggerSink for Counter {
        fn trigger(&self, sound: DrumSound) {
            self.hits.lock().unwrap().push(sound);
        }
    }

    fn sequencer() -> (BeatSequencer, Arc<Counter>) {
        let counter = Arc::new(Counter::default());
        (BeatSequencer::new(counter.clone()), counter)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn defaults() {
        let (seq, _) = sequencer();
        assert_eq!(seq.mode(), BeatMode::None);
        assert_eq!(seq.tempo(), DEFAULT_BPM);
        assert!(!seq.is_playing());
    }

    #[test]
    fn tempo_clamp_and_interval() {
        let (seq, _) = sequencer();
        assert_eq!(seq.set_tempo(39), Err(BeatError::TempoOutOfRange(39)));
        assert_eq!(seq.set_tempo(301), Err(BeatError::TempoOutOfRange(301)));
        assert_eq!(seq.tempo(), DEFAULT_BPM);
        assert_eq!(seq.set_tempo(120), Ok(120));
        assert_eq!(seq.half_beat(), Duration::from_millis(250));
    }

    #[test]
    fn mode_by_index() {
        let (seq, _) = sequencer();
        assert_eq!(seq.set_mode_index(2), Ok(BeatMode::Custom));
        assert_eq!(seq.set_mode_index(7), Err(BeatError::InvalidMode(7)));
        assert_eq!(seq.mode(), BeatMode::Custom);
    }

    #[test]
    fn start_twice_spawns_one_thread() {
        let (seq, _) = sequencer();
        seq.start();
        seq.start();
        assert!(seq.is_playing());
        assert!(seq.thread.lock().unwrap().is_some());
        seq.stop();
        seq.stop();
        assert!(!seq.is_playing());
        seq.shutdown();
    }

    #[test]
    fn first_tick_plays_step_zero() {
        let (seq, counter) = sequencer();
        seq.set_mode(BeatMode::Rock);
        seq.set_tempo(60).unwrap();
        seq.start();
        assert!(wait_for(|| counter.hits().len() >= 2));
        seq.stop();
        let hits = counter.hits();
        assert_eq!(&hits[..2], &[DrumSound::Base, DrumSound::HiHat]);
    }

    #[test]
    fn ticks_follow_the_tempo() {
        let (seq, _) = sequencer();
        seq.set_mode(BeatMode::Rock);
        seq.set_tempo(300).unwrap(); // 100 ms half-beats
        seq.start();
        thread::sleep(Duration::from_millis(450));
        seq.stop();
        let ticks = seq.ticks();
        assert!((3..=6).contains(&ticks), "ticks = {}", ticks);
    }

    #[test]
    fn tempo_change_applies_from_the_next_tick() {
        let hats = Arc::new(Mutex::new(Vec::<Instant>::new()));
        let seen = hats.clone();
        let seq = BeatSequencer::new(Arc::new(move |sound: DrumSound| {
            if sound == DrumSound::HiHat {
                seen.lock().unwrap().push(Instant::now());
            }
        }));
        seq.set_mode(BeatMode::Rock);
        seq.set_tempo(40).unwrap(); // 750 ms half-beats
        seq.start();
        assert!(wait_for(|| !hats.lock().unwrap().is_empty()));
        seq.set_tempo(300).unwrap(); // 100 ms half-beats
        assert!(wait_for(|| hats.lock().unwrap().len() >= 6));
        seq.shutdown();

        let hats = hats.lock().unwrap();
        let gaps: Vec<u128> = hats.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
        // the tick already scheduled keeps the old interval
        assert!((650..=900).contains(&gaps[0]), "gaps = {:?}", gaps);
        assert!(gaps[1..].iter().all(|g| (50..=200).contains(g)), "gaps = {:?}", gaps);
    }

    #[test]
    fn silent_mode_keeps_ticking_without_triggers() {
        let (seq, counter) = sequencer();
        seq.set_tempo(300).unwrap();
        seq.start();
        assert!(wait_for(|| seq.ticks() >= 2));
        seq.stop();
        assert!(counter.hits().is_empty());
    }

    #[test]
    fn stop_halts_triggering() {
        let (seq, counter) = sequencer();
        seq.set_mode(BeatMode::Rock);
        seq.set_tempo(300).unwrap();
        seq.start();
        assert!(wait_for(|| !counter.hits().is_empty()));
        seq.stop();
        thread::sleep(Duration::from_millis(50));
        let after_stop = counter.hits().len();
        thread::sleep(Duration::from_millis(250));
        assert_eq!(counter.hits().len(), after_stop);
    }

    #[test]
    fn restart_after_stop() {
        let (seq, counter) = sequencer();
        seq.set_mode(BeatMode::Rock);
        seq.set_tempo(300).unwrap();
        seq.start();
        assert!(wait_for(|| !counter.hits().is_empty()));
        seq.stop();
        let before = counter.hits().len();
        seq.start();
        assert!(wait_for(|| counter.hits().len() > before));
        seq.shutdown();
    }

    #[test]
    fn shutdown_joins_promptly() {
        let (seq, _) = sequencer();
        seq.set_tempo(40).unwrap(); // 750 ms half-beats
        seq.set_mode(BeatMode::Rock);
        seq.start();
        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        seq.shutdown();
        assert!(started.elapsed() < Duration::from_millis(500));
        seq.start();
        assert!(!seq.is_playing());
    }

    #[test]
    fn closures_are_trigger_sinks() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let seq = BeatSequencer::new(Arc::new(move |_: DrumSound| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));
        seq.set_mode(BeatMode::Custom);
        seq.set_tempo(300).unwrap();
        seq.start();
        assert!(wait_for(|| count.load(Ordering::Relaxed) >= 2));
        seq.shutdown();
    }
}
