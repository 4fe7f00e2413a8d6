use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Result, bail};
use fifo_core::{CancelToken, Channel, Role};

pub fn run_stress(
    capacity: usize,
    producers: usize,
    consumers: usize,
    payload: usize,
    per_producer: usize,
) -> Result<()> {
    if producers == 0 || consumers == 0 {
        bail!("need at least one producer and one consumer");
    }
    if payload == 0 {
        bail!("payload must be at least one byte");
    }
    // With capacity >= 2 * payload, a parked producer implies enough
    // buffered bytes for a consumer and a parked consumer implies enough
    // free space for a producer, so the run cannot wedge.
    if capacity < 2 * payload {
        bail!("capacity must be at least twice the payload");
    }

    println!("CHANNEL STRESS");
    println!("Capacity: {} bytes", capacity);
    println!("Producers: {} x {} payloads", producers, per_producer);
    println!("Consumers: {}", consumers);
    println!("Payload: {} bytes", payload);
    println!("-------------------------------");

    let channel = Arc::new(Channel::new(capacity));
    let start = Instant::now();

    let producer_threads: Vec<_> = (0..producers)
        .map(|id| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || -> Result<u64> {
                let cancel = CancelToken::new();
                let handle = channel.attach(Role::Producer, &cancel)?;
                let mut sum = 0u64;
                for i in 0..per_producer {
                    let byte = ((id * per_producer + i) % 251) as u8;
                    let bytes = vec![byte; payload];
                    handle.send(&bytes, &cancel)?;
                    sum += byte as u64 * payload as u64;
                }
                Ok(sum)
            })
        })
        .collect();

    let consumer_threads: Vec<_> = (0..consumers)
        .map(|_| {
            let channel = Arc::clone(&channel);
            thread::spawn(move || -> Result<(u64, u64)> {
                let cancel = CancelToken::new();
                let handle = channel.attach(Role::Consumer, &cancel)?;
                let (mut bytes, mut sum) = (0u64, 0u64);
                loop {
                    let batch = handle.receive(payload, &cancel)?;
                    if batch.is_empty() {
                        break;
                    }
                    bytes += batch.len() as u64;
                    sum += batch.iter().map(|&b| b as u64).sum::<u64>();
                }
                Ok((bytes, sum))
            })
        })
        .collect();

    let mut sent_sum = 0u64;
    for producer in producer_threads {
        sent_sum += producer.join().unwrap()?;
    }
    let (mut received_bytes, mut received_sum) = (0u64, 0u64);
    for consumer in consumer_threads {
        let (bytes, sum) = consumer.join().unwrap()?;
        received_bytes += bytes;
        received_sum += sum;
    }

    let expected_bytes = (producers * per_producer * payload) as u64;
    if received_bytes != expected_bytes {
        bail!("byte count mismatch: sent {}, received {}", expected_bytes, received_bytes);
    }
    if received_sum != sent_sum {
        bail!("checksum mismatch: sent {}, received {}", sent_sum, received_sum);
    }

    let seconds = start.elapsed().as_secs_f64();
    let total_payloads = (producers * per_producer) as f64;

    println!("Results");
    println!("Time: {:.4} s", seconds);
    println!("Throughput: {:.2} payloads/s", total_payloads / seconds);
    println!("Verified: {} bytes, checksums match", received_bytes);
    println!("Residual occupancy: {}", channel.occupancy());
    Ok(())
}
