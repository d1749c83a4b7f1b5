use std::sync::Arc;

use bb_engine::{Mixer, SoundAsset, MAX_VOICES};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const BLOCK: usize = 551;

fn test_sound(len: usize) -> Arc<SoundAsset> {
    let data = (0..len).map(|i| ((i * 37) % 20000) as i16 - 10000).collect();
    Arc::new(SoundAsset::new("bench", data))
}

fn render_full_pool(c: &mut Criterion) {
    let sound = test_sound(44100 * 10);
    let mixer = Mixer::new();
    for _ in 0..MAX_VOICES {
        mixer.enqueue(&sound).unwrap();
    }
    let mut block = vec![0i16; BLOCK];
    c.bench_function("render_block_30_voices", |b| {
        b.iter(|| {
            mixer.render_block(black_box(&mut block));
            if mixer.active_voices() < MAX_VOICES {
                mixer.clear();
                for _ in 0..MAX_VOICES {
                    let _ = mixer.enqueue(&sound);
                }
            }
        })
    });
}

fn render_empty_pool(c: &mut Criterion) {
    let mixer = Mixer::new();
    let mut block = vec![0i16; BLOCK];
    c.bench_function("render_block_silent", |b| {
        b.iter(|| mixer.render_block(black_box(&mut block)))
    });
}

criterion_group!(benches, render_full_pool, render_empty_pool);
criterion_main!(benches);
