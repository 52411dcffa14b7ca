//! Serial loopback on the host.
//!
//! A worker thread plays the UART receive interrupt: each "tick" it offers a
//! small burst of bytes to the ring through the producer half, keeping
//! whatever didn't fit for the next tick. The main loop plays the firmware
//! main loop and drains the consumer half, checking the byte pattern.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p loopback -- loopback.toml
//! ```

use anyhow::{Context, bail};
use bytering_config::LoopbackConfig;
use bytering_fifo::{Consumer, FifoError, Producer, RingBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Byte the simulated peer sends at stream offset `pos`.
fn pattern(pos: u64) -> u8 {
    pos as u8
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Debug, Default)]
struct IsrStats {
    ticks: u64,
    /// Ticks where the ring had no room at all.
    overflow_ticks: u64,
    /// Ticks where only part of the burst fit.
    partial_ticks: u64,
}

fn run_isr(
    mut tx: Producer<'_, '_>,
    total: u64,
    chunk_size: usize,
    stop: &AtomicBool,
) -> IsrStats {
    let mut stats = IsrStats::default();
    let mut burst = vec![0u8; chunk_size];
    let mut sent: u64 = 0;
    // `burst[pending..filled]` has not been accepted by the ring yet.
    let mut pending = 0usize;
    let mut filled = 0usize;

    while sent < total && !stop.load(Ordering::Relaxed) {
        if pending == filled {
            filled = (total - sent).min(chunk_size as u64) as usize;
            for (i, b) in burst[..filled].iter_mut().enumerate() {
                *b = pattern(sent + i as u64);
            }
            pending = 0;
        }

        stats.ticks += 1;
        match tx.write(&burst[pending..filled]) {
            Ok(n) => {
                if pending + n < filled {
                    stats.partial_ticks += 1;
                }
                pending += n;
                sent += n as u64;
            }
            Err(FifoError::Full) => {
                stats.overflow_ticks += 1;
                std::hint::spin_loop();
            }
            Err(e) => {
                tracing::error!(error = %e, "producer failed");
                break;
            }
        }
    }

    tracing::debug!(?stats, "isr finished");
    stats
}

fn run_main_loop(
    rx: &mut Consumer<'_, '_>,
    total: u64,
    report_every: Duration,
) -> anyhow::Result<u64> {
    let mut scratch = [0u8; 64];
    let mut received: u64 = 0;
    let mut last = Instant::now();
    let mut since_last: u64 = 0;

    while received < total {
        match rx.read(&mut scratch) {
            Ok(n) => {
                for (i, &b) in scratch[..n].iter().enumerate() {
                    let pos = received + i as u64;
                    if b != pattern(pos) {
                        bail!("byte {pos}: expected {:#04x}, got {b:#04x}", pattern(pos));
                    }
                }
                received += n as u64;
                since_last += n as u64;
            }
            Err(FifoError::Empty) => std::hint::spin_loop(),
            Err(e) => return Err(e).context("consumer failed"),
        }

        if last.elapsed() >= report_every {
            let rate = since_last as f64 / last.elapsed().as_secs_f64();
            tracing::info!(received, queued = rx.len(), "rx rate ~ {rate:.0} B/s");
            since_last = 0;
            last = Instant::now();
        }
    }

    Ok(received)
}

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => LoopbackConfig::load(path.as_str())
            .with_context(|| format!("failed to load config from {path}"))?,
        None => LoopbackConfig::default(),
    };
    config.validate().context("invalid config")?;
    init_tracing(&config.log_level);

    let capacity = config.capacity()?.get();
    let mut storage = vec![0u8; capacity];
    let mut ring = RingBuffer::new(&mut storage).context("failed to build ring buffer")?;

    tracing::info!(
        capacity,
        total_bytes = config.total_bytes,
        chunk_size = config.chunk_size,
        "loopback starting"
    );

    let start = Instant::now();
    let (tx, mut rx) = ring.split();
    let report_every = Duration::from_millis(config.report_interval_ms);

    let stop = AtomicBool::new(false);

    let (received, stats) = std::thread::scope(|s| {
        let isr = s.spawn(|| run_isr(tx, config.total_bytes, config.chunk_size, &stop));
        let received = run_main_loop(&mut rx, config.total_bytes, report_every);
        // Unblocks the producer if the main loop gave up early.
        stop.store(true, Ordering::Relaxed);
        let stats = isr.join().map_err(|_| anyhow::anyhow!("isr thread panicked"));
        (received, stats)
    });
    let received = received?;
    let stats = stats?;

    let elapsed = start.elapsed();
    if stats.overflow_ticks > 0 {
        tracing::warn!(
            overflow_ticks = stats.overflow_ticks,
            "ring ran full; a real receiver would have dropped bytes here"
        );
    }
    tracing::info!(
        received,
        ticks = stats.ticks,
        partial_ticks = stats.partial_ticks,
        ?elapsed,
        "loopback complete ({:.0} B/s)",
        received as f64 / elapsed.as_secs_f64()
    );

    Ok(())
}
