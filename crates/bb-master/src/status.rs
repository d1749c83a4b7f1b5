//! Periodic status line: mode, tempo, volume and audio block timing.

use bb_engine::{BeatMode, Mixer, PeriodStats, PeriodTimer};
use log::info;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::sequencer::BeatSequencer;

/// Format one status line, e.g.
/// `M1 120bpm vol:80 Audio[11.201, 12.650] avg 12.497/80`.
pub fn format_status(mode: BeatMode, bpm: u32, volume: u8, audio: &PeriodStats) -> String {
    format!(
        "{} {}bpm vol:{} Audio[{:.3}, {:.3}] avg {:.3}/{}",
        mode, bpm, volume, audio.min_ms, audio.max_ms, audio.avg_ms, audio.count
    )
}

/// Thread that logs a status line at a fixed interval.
pub struct StatusReporter {
    stop: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl StatusReporter {
    pub fn start(
        interval: Duration,
        sequencer: Arc<BeatSequencer>,
        mixer: Arc<Mixer>,
        timer: Arc<PeriodTimer>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_stop = stop.clone();

        let thread = thread::Builder::new()
            .name("bb-status".into())
            .spawn(move || {
                let (lock, cvar) = &*thread_stop;
                let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
                loop {
                    let (guard, timeout) = cvar
                        .wait_timeout_while(stopped, interval, |s| !*s)
                        .unwrap_or_else(PoisonError::into_inner);
                    stopped = guard;
                    if *stopped {
                        break;
                    }
                    if timeout.timed_out() {
                        let line = format_status(
                            sequencer.mode(),
                            sequencer.tempo(),
                            mixer.volume(),
                            &timer.take_stats(),
                        );
                        info!("{}", line);
                    }
                }
            })?;

        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        let (lock, cvar) = &*self.stop;
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusReporter {
    fn drop(&mut self) {
        self.stop();
    }
}
