//! Headless host: wraps the builtin gain plugin, listens for OSC, and runs a
//! simulated audio callback on its own thread.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example headless_host -- 9000 10
//! oscsend localhost 9000 /module/0/gain f 0.25
//! ```
//!
//! Arguments: OSC port (default 9000), run time in seconds (default 10).
//! The final state document is printed on exit.

use hostwrap::prelude::*;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK_SIZE: usize = 256;

fn main() -> hostwrap::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let port = args.next().and_then(|a| a.parse().ok()).unwrap_or(9000);
    let seconds = args.next().and_then(|a| a.parse().ok()).unwrap_or(10);

    let mut host = HostProcessor::builder().osc_port(port).build()?;
    host.prepare_to_play(SAMPLE_RATE, BLOCK_SIZE);
    host.create_plugin(GainPlugin::description_template());

    let running = Arc::new(AtomicBool::new(true));
    let audio = {
        let dispatcher = host.audio_dispatcher();
        let running = Arc::clone(&running);
        thread::spawn(move || audio_callback(dispatcher, running))
    };

    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline {
        host.dispatch_pending_timeout(Duration::from_millis(10));
        for notification in host.notifications() {
            println!("{:?}", notification);
        }
    }

    running.store(false, Ordering::Release);
    let peak = audio.join().unwrap_or(0.0);
    println!("last block peak: {:.3}", peak);

    let state = host.save_state()?;
    println!("{}", String::from_utf8_lossy(&state));
    Ok(())
}

/// Feeds a 440 Hz sine through the dispatcher roughly in real time. Returns
/// the peak of the last processed block.
fn audio_callback(dispatcher: AudioDispatcher, running: Arc<AtomicBool>) -> f32 {
    let block_time = Duration::from_secs_f64(BLOCK_SIZE as f64 / SAMPLE_RATE);
    let step = 2.0 * std::f64::consts::PI * 440.0 / SAMPLE_RATE;
    let mut phase = 0.0f64;
    let mut left = vec![0.0f32; BLOCK_SIZE];
    let mut right = vec![0.0f32; BLOCK_SIZE];
    let mut midi = MidiEventVec::new();
    let transport = TransportInfo::default();
    let mut peak = 0.0f32;

    while running.load(Ordering::Acquire) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let s = phase.sin() as f32 * 0.5;
            *l = s;
            *r = s;
            phase += step;
        }
        {
            let mut chans: [&mut [f32]; 2] = [&mut left, &mut right];
            let mut buffer = AudioBuffer::new(&mut chans, BLOCK_SIZE);
            dispatcher.process_f32(&mut buffer, &mut midi, &transport);
        }
        midi.clear();
        peak = left.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        thread::sleep(block_time);
    }
    peak
}
