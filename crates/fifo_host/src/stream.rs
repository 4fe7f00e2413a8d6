use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use fifo_core::{CancelToken, Channel, Role};

use crate::codes::CodeGen;
use crate::stats::BatchStats;

const DRAIN_POLL_MS: u64 = 20;

pub fn run_stream(
    capacity: usize,
    period_ms: u64,
    threshold: u32,
    format: &str,
    duration_secs: u64,
) -> Result<()> {
    if threshold == 0 || threshold > 100 {
        bail!("threshold must be between 1 and 100 percent");
    }
    let mut generator = CodeGen::new(format, 12345)?;
    if format.len() + 1 > capacity {
        bail!("capacity too small for a single '{}' code", format);
    }

    println!("CODE STREAMING");
    println!("Capacity: {} bytes", capacity);
    println!("Period: {} ms", period_ms);
    println!("Threshold: {} %", threshold);
    println!("Format: {}", format);
    println!("Duration: {} s", duration_secs);
    println!("-------------------------------");

    let channel = Arc::new(Channel::new(capacity));
    let running = Arc::new(AtomicBool::new(true));
    let generated = Arc::new(AtomicU64::new(0));
    let drained = Arc::new(AtomicU64::new(0));
    let threshold_bytes = (capacity * threshold as usize).div_ceil(100).max(1);

    let ch_drain = Arc::clone(&channel);
    let d_drain = Arc::clone(&drained);

    let drainer = thread::spawn(move || -> Result<BatchStats> {
        let cancel = CancelToken::new();
        let handle = ch_drain.attach(Role::Consumer, &cancel)?;
        let mut stats = BatchStats::new();

        loop {
            let occupancy = ch_drain.occupancy();
            // A parked producer means the buffer cannot take the next code;
            // drain even if the threshold has not been reached yet.
            let trigger = occupancy >= threshold_bytes
                || ch_drain.parked(Role::Producer) > 0
                || ch_drain.attached(Role::Producer) == 0;
            if !trigger {
                thread::sleep(Duration::from_millis(DRAIN_POLL_MS));
                continue;
            }

            // Re-read after the trigger: this is the only consumer, so the
            // occupancy can only have grown and the receive cannot block.
            let batch = handle.receive(ch_drain.occupancy().max(1), &cancel)?;
            if batch.is_empty() {
                break;
            }
            let codes = batch.iter().filter(|&&b| b == 0).count() as u64;
            d_drain.fetch_add(codes, Ordering::Relaxed);
            stats.update(codes);
        }
        Ok(stats)
    });

    let ch_prod = Arc::clone(&channel);
    let g_prod = Arc::clone(&generated);
    let r_prod = Arc::clone(&running);

    let producer = thread::spawn(move || -> Result<u64> {
        let cancel = CancelToken::new();
        let handle = ch_prod.attach(Role::Producer, &cancel)?;
        let mut sent = 0u64;

        while r_prod.load(Ordering::Relaxed) {
            let code = generator.next_code();
            let mut payload = code.into_bytes();
            payload.push(0);
            handle.send(&payload, &cancel)?;
            sent += 1;
            g_prod.fetch_add(1, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(period_ms));
        }
        Ok(sent)
    });

    for t in 1..=duration_secs {
        thread::sleep(Duration::from_secs(1));
        println!(
            "T={:2}s | Gen: {:6} | Drained: {:6} | Occ: {:3}%",
            t,
            generated.load(Ordering::Relaxed),
            drained.load(Ordering::Relaxed),
            channel.occupancy() * 100 / capacity
        );
    }

    running.store(false, Ordering::Relaxed);
    let sent = producer.join().unwrap()?;
    let stats = drainer.join().unwrap()?;

    println!("\nCodes generated: {}", sent);
    println!("Codes drained: {}", drained.load(Ordering::Relaxed));
    stats.print_report();
    println!("Done.");
    Ok(())
}
