//! Offline rendering of a pattern to a sample buffer.

use bb_engine::{half_beat_samples, BeatError, BeatMode, BeatState, Mixer, STEPS_PER_BAR};
use log::{info, warn};

use crate::kit::DrumKit;

/// Render `bars` bars of `mode` at `bpm` without touching a device.
///
/// Each half-beat enqueues that step's sounds, then renders exactly one
/// half-beat of samples in blocks of `block_size`. Sounds still ringing
/// at the end are cut off.
pub fn bounce(
    kit: &DrumKit,
    mode: BeatMode,
    bpm: i32,
    bars: usize,
    sample_rate: u32,
    block_size: usize,
) -> Result<Vec<i16>, BeatError> {
    let mut state = BeatState::new(mode, 0);
    let bpm = state.set_tempo(bpm)?;
    let step_len = half_beat_samples(bpm, sample_rate);
    let steps = bars * STEPS_PER_BAR;
    let block_size = block_size.max(1);

    let mixer = Mixer::new();
    let mut out = vec![0i16; steps * step_len];

    for step in out.chunks_mut(step_len.max(1)).take(steps) {
        for &sound in state.advance() {
            if let Err(err) = mixer.enqueue(kit.get(sound)) {
                warn!("{} dropped while bouncing: {}", sound, err);
            }
        }
        for block in step.chunks_mut(block_size) {
            mixer.render_block(block);
        }
    }

    info!(
        "bounced {} bar(s) of {} at {} bpm: {} samples",
        bars,
        mode,
        bpm,
        out.len()
    );
    Ok(out)
}
