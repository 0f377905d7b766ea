//! Benchmark tests for tubeframe-core operations
//!
//! Run with: cargo bench -p tubeframe-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parking_lot::Mutex;
use std::sync::Arc;

use tubeframe_core::{
    render_player_page, BridgeConfig, Command, MemoryTransport, Player, PlayerEvent,
    PlayerListener, PlayerOptions, PlayerState,
};

// ============================================================================
// Helpers
// ============================================================================

struct Counter {
    events: Mutex<u64>,
}

impl PlayerListener for Counter {
    fn on_state_change(&self, _player: &Player, _state: PlayerState) {
        *self.events.lock() += 1;
    }

    fn on_current_second(&self, _player: &Player, _second: f64) {
        *self.events.lock() += 1;
    }
}

fn ready_player(listeners: usize) -> (Arc<MemoryTransport>, Player, Vec<Arc<dyn PlayerListener>>) {
    let transport = Arc::new(MemoryTransport::new());
    let player = Player::new(transport.clone());
    let all: Vec<Arc<dyn PlayerListener>> = (0..listeners.max(1))
        .map(|_| Arc::new(Counter { events: Mutex::new(0) }) as Arc<dyn PlayerListener>)
        .collect();

    player
        .initialize(&all[0], PlayerOptions::default())
        .unwrap();
    for listener in &all[1..] {
        player.add_listener(listener);
    }
    transport.emit(PlayerEvent::Ready);
    (transport, player, all)
}

// ============================================================================
// Options
// ============================================================================

fn bench_options(c: &mut Criterion) {
    let mut group = c.benchmark_group("Options");

    let defaults = PlayerOptions::default();
    group.bench_function("encode_default", |b| {
        b.iter(|| black_box(defaults.encode()))
    });

    let with_origin = PlayerOptions::default()
        .with_autoplay(1)
        .with_origin("https://example.com");
    group.bench_function("encode_with_origin", |b| {
        b.iter(|| black_box(with_origin.encode()))
    });

    group.bench_function("player_vars", |b| {
        b.iter(|| black_box(defaults.player_vars()))
    });

    group.bench_function("render_page", |b| {
        let config = BridgeConfig::default();
        b.iter(|| black_box(render_player_page(&defaults, &config)))
    });

    group.finish();
}

// ============================================================================
// Protocol
// ============================================================================

fn bench_protocol(c: &mut Criterion) {
    let mut group = c.benchmark_group("Protocol");

    let raw_events = [
        ("state_change", r#"{"event":"onStateChange","data":1}"#),
        ("current_second", r#"{"event":"onCurrentSecond","data":"41.37"}"#),
        ("video_id", r#"{"event":"onVideoId","data":"uHq9km2E6rk"}"#),
    ];

    for (name, raw) in raw_events {
        group.bench_with_input(BenchmarkId::new("decode", name), &raw, |b, raw| {
            b.iter(|| black_box(PlayerEvent::from_json(raw)))
        });
    }

    let load = Command::LoadVideo {
        video_id: "uHq9km2E6rk".to_string(),
        start_seconds: 0.0,
    };
    group.bench_function("load_video_script", |b| {
        b.iter(|| black_box(load.to_script()))
    });

    group.bench_function("set_volume_script", |b| {
        b.iter(|| black_box(Command::set_volume(black_box(0.42)).to_script()))
    });

    group.finish();
}

// ============================================================================
// Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dispatch");

    for listeners in [1usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("current_second", listeners),
            &listeners,
            |b, &listeners| {
                let (transport, _player, _listeners) = ready_player(listeners);
                let mut second = 0.0;
                b.iter(|| {
                    second += 0.1;
                    transport.emit(PlayerEvent::CurrentSecond(black_box(second)));
                })
            },
        );
    }

    group.bench_function("state_change", |b| {
        let (transport, _player, _listeners) = ready_player(4);
        let mut playing = false;
        b.iter(|| {
            playing = !playing;
            let state = if playing { PlayerState::Playing } else { PlayerState::Paused };
            transport.emit(PlayerEvent::StateChange(state));
        })
    });

    group.bench_function("snapshot", |b| {
        let (_transport, player, _listeners) = ready_player(1);
        b.iter(|| black_box(player.snapshot()))
    });

    group.finish();
}

criterion_group!(
    options_benches,
    bench_options,
);

criterion_group!(
    protocol_benches,
    bench_protocol,
);

criterion_group!(
    dispatch_benches,
    bench_dispatch,
);

criterion_main!(
    options_benches,
    protocol_benches,
    dispatch_benches,
);
