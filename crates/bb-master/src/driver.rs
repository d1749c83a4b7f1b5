//! Playback driver: the real-time thread feeding mixer blocks to the sink.

use bb_audio::{AudioError, OutputSink, SinkOpener};
use bb_engine::{Mixer, PeriodTimer};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use crate::BeatBoxError;

/// Lifecycle of the driver thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Running,
    /// Stop requested; the current block is still being written.
    Draining,
}

impl DriverState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => DriverState::Running,
            2 => DriverState::Draining,
            _ => DriverState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            DriverState::Stopped => 0,
            DriverState::Running => 1,
            DriverState::Draining => 2,
        }
    }
}

/// Handle to a running playback thread.
pub struct PlaybackDriver {
    stop_signal: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    failed: Arc<AtomicBool>,
    sample_rate: u32,
    block_size: usize,
    thread: Option<JoinHandle<Result<(), AudioError>>>,
}

impl PlaybackDriver {
    /// Open the sink on a dedicated thread and start rendering.
    ///
    /// Returns once the sink is open, so a device that cannot be opened is
    /// reported here rather than from inside the thread.
    pub fn start(
        mixer: Arc<Mixer>,
        opener: SinkOpener,
        timer: Arc<PeriodTimer>,
    ) -> Result<Self, BeatBoxError> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let state = Arc::new(AtomicU8::new(DriverState::Running.as_u8()));
        let failed = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let stop = stop_signal.clone();
        let thread_state = state.clone();
        let thread_failed = failed.clone();

        let thread = thread::Builder::new()
            .name("bb-playback".into())
            .spawn(move || {
                let mut sink = match opener() {
                    Ok(sink) => sink,
                    Err(err) => {
                        thread_state.store(DriverState::Stopped.as_u8(), Ordering::Release);
                        let _ = ready_tx.send(Err(err.clone()));
                        return Err(err);
                    }
                };
                let _ = ready_tx.send(Ok((sink.sample_rate(), sink.block_size())));

                let result = playback_loop(&mixer, sink.as_mut(), &stop, &timer);
                if let Err(err) = &result {
                    error!("audio output lost: {}", err);
                    thread_failed.store(true, Ordering::Release);
                } else if let Err(err) = sink.drain() {
                    warn!("audio drain failed: {}", err);
                }
                sink.close();
                thread_state.store(DriverState::Stopped.as_u8(), Ordering::Release);
                result
            })?;

        match ready_rx.recv() {
            Ok(Ok((sample_rate, block_size))) => {
                info!("playback started: {} Hz, {} samples per block", sample_rate, block_size);
                Ok(Self {
                    stop_signal,
                    state,
                    failed,
                    sample_rate,
                    block_size,
                    thread: Some(thread),
                })
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err.into())
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::DeviceInit("playback thread exited during startup".into()).into())
            }
        }
    }

    pub fn state(&self) -> DriverState {
        DriverState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == DriverState::Running
    }

    /// True once the thread has given up on the sink.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Ask the thread to finish its current block, drain and close the
    /// sink, then wait for it. Returns the fatal error if the thread died
    /// on one. Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };
        let _ = self.state.compare_exchange(
            DriverState::Running.as_u8(),
            DriverState::Draining.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.stop_signal.store(true, Ordering::Release);
        let result = handle
            .join()
            .unwrap_or_else(|_| Err(AudioError::Playback("playback thread panicked".into())));
        self.state.store(DriverState::Stopped.as_u8(), Ordering::Release);
        info!("playback stopped");
        result
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Render and write blocks until asked to stop.
///
/// A failed write gets one recovery attempt; if that fails too the error
/// is returned and the thread ends.
fn playback_loop(
    mixer: &Mixer,
    sink: &mut dyn OutputSink,
    stop: &AtomicBool,
    timer: &PeriodTimer,
) -> Result<(), AudioError> {
    let mut block = vec![0i16; sink.block_size().max(1)];

    while !stop.load(Ordering::Acquire) {
        render(mixer, &mut block);
        timer.mark();

        match sink.write(&block) {
            Ok(written) if written < block.len() => {
                warn!("short write (expected {}, wrote {})", block.len(), written);
            }
            Ok(_) => {}
            Err(err) => {
                warn!("audio write failed: {}; recovering", err);
                sink.recover()?;
            }
        }
    }
    Ok(())
}

#[cfg(not(feature = "alloc_check"))]
fn render(mixer: &Mixer, block: &mut [i16]) {
    mixer.render_block(block);
}

#[cfg(feature = "alloc_check")]
fn render(mixer: &Mixer, block: &mut [i16]) {
    assert_no_alloc::assert_no_alloc(|| mixer.render_block(block));
}
