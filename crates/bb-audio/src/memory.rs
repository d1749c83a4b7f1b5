//! In-memory sink: captures every written block.
//!
//! Used for tests and for driving the mixer without a sound card. Can pace
//! writes to real time and inject write/recovery failures.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::traits::{AudioError, OutputSink, SinkOpener, VolumeControl};

#[derive(Debug, Default)]
struct TapState {
    samples: Vec<i16>,
    writes: usize,
    recoveries: usize,
    drained: bool,
    closed: bool,
    fail_writes: usize,
    fail_recover: bool,
    short_writes: bool,
    hardware_volume: Option<u8>,
}

/// Shared view of a [`MemorySink`], kept by whoever wants to inspect it.
#[derive(Clone, Debug, Default)]
pub struct MemoryTap {
    state: Arc<Mutex<TapState>>,
}

impl MemoryTap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything written so far.
    pub fn samples(&self) -> Vec<i16> {
        self.lock().samples.clone()
    }

    pub fn sample_count(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn recoveries(&self) -> usize {
        self.lock().recoveries
    }

    pub fn drained(&self) -> bool {
        self.lock().drained
    }

    pub fn closed(&self) -> bool {
        self.lock().closed
    }

    /// Make the next `count` writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().fail_writes = count;
    }

    /// Make recovery attempts fail.
    pub fn fail_recovery(&self, fail: bool) {
        self.lock().fail_recover = fail;
    }

    /// Accept only half of each block.
    pub fn short_writes(&self, short: bool) {
        self.lock().short_writes = short;
    }

    /// Last value pushed through [`VolumeControl`].
    pub fn hardware_volume(&self) -> Option<u8> {
        self.lock().hardware_volume
    }
}

impl VolumeControl for MemoryTap {
    fn set_hardware_volume(&self, percent: u8) -> Result<(), AudioError> {
        self.lock().hardware_volume = Some(percent);
        Ok(())
    }
}

/// Sink that appends every block to a [`MemoryTap`].
pub struct MemorySink {
    tap: MemoryTap,
    sample_rate: u32,
    block_size: usize,
    pace: Option<Duration>,
}

impl MemorySink {
    /// A sink that accepts writes as fast as they arrive.
    pub fn new(tap: MemoryTap, sample_rate: u32, block_size: usize) -> Self {
        Self {
            tap,
            sample_rate,
            block_size: block_size.max(1),
            pace: None,
        }
    }

    /// Sleep for each block's playing time, like a real device would.
    pub fn realtime(mut self) -> Self {
        let secs = self.block_size as f64 / self.sample_rate.max(1) as f64;
        self.pace = Some(Duration::from_secs_f64(secs));
        self
    }

    /// Sleep a fixed time per write.
    pub fn paced(mut self, per_write: Duration) -> Self {
        self.pace = Some(per_write);
        self
    }

    pub fn opener(self) -> SinkOpener {
        Box::new(move || Ok(Box::new(self) as Box<dyn OutputSink>))
    }
}

impl OutputSink for MemorySink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn write(&mut self, block: &[i16]) -> Result<usize, AudioError> {
        if let Some(pace) = self.pace {
            std::thread::sleep(pace);
        }
        let mut state = self.tap.lock();
        if state.closed {
            return Err(AudioError::Closed);
        }
        state.writes += 1;
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(AudioError::Write("injected failure".into()));
        }
        let accepted = if state.short_writes {
            block.len() / 2
        } else {
            block.len()
        };
        state.samples.extend_from_slice(&block[..accepted]);
        Ok(accepted)
    }

    fn recover(&mut self) -> Result<(), AudioError> {
        let mut state = self.tap.lock();
        state.recoveries += 1;
        if state.fail_recover {
            return Err(AudioError::Recover("injected failure".into()));
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), AudioError> {
        self.tap.lock().drained = true;
        Ok(())
    }

    fn close(&mut self) {
        self.tap.lock().closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_blocks_in_order() {
        let tap = MemoryTap::new();
        let mut sink = MemorySink::new(tap.clone(), 8000, 4);
        assert_eq!(sink.write(&[1, 2, 3, 4]).unwrap(), 4);
        assert_eq!(sink.write(&[5, 6]).unwrap(), 2);
        assert_eq!(tap.samples(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(tap.writes(), 2);
    }

    #[test]
    fn injected_failures_are_consumed() {
        let tap = MemoryTap::new();
        let mut sink = MemorySink::new(tap.clone(), 8000, 4);
        tap.fail_next_writes(1);
        assert!(sink.write(&[1]).is_err());
        assert_eq!(sink.write(&[1]).unwrap(), 1);
        assert_eq!(tap.sample_count(), 1);
    }

    #[test]
    fn recovery_can_fail() {
        let tap = MemoryTap::new();
        let mut sink = MemorySink::new(tap.clone(), 8000, 4);
        assert!(sink.recover().is_ok());
        tap.fail_recovery(true);
        assert!(matches!(sink.recover(), Err(AudioError::Recover(_))));
        assert_eq!(tap.recoveries(), 2);
    }

    #[test]
    fn short_writes_accept_half() {
        let tap = MemoryTap::new();
        let mut sink = MemorySink::new(tap.clone(), 8000, 4);
        tap.short_writes(true);
        assert_eq!(sink.write(&[1, 2, 3, 4]).unwrap(), 2);
        assert_eq!(tap.samples(), vec![1, 2]);
    }

    #[test]
    fn closed_sink_rejects_writes() {
        let tap = MemoryTap::new();
        let mut sink = MemorySink::new(tap.clone(), 8000, 4);
        sink.drain().unwrap();
        sink.close();
        assert!(tap.drained());
        assert!(tap.closed());
        assert_eq!(sink.write(&[1]), Err(AudioError::Closed));
    }

    #[test]
    fn tap_records_hardware_volume() {
        let tap = MemoryTap::new();
        assert_eq!(tap.hardware_volume(), None);
        tap.set_hardware_volume(55).unwrap();
        assert_eq!(tap.hardware_volume(), Some(55));
    }
}
