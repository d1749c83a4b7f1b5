//! Audio output sinks for the beatbox drum machine.

mod cpal_backend;
mod memory;
mod traits;

pub use cpal_backend::{CpalSink, SoftwareVolume};
pub use memory::{MemorySink, MemoryTap};
pub use traits::{AudioError, OutputSink, SinkConfig, SinkOpener, VolumeControl};
