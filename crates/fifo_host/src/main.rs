mod codes;
mod endpoint;
mod pipe;
mod stats;
mod stream;
mod stress;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Periodic random-code producer with a threshold-triggered bulk drainer.
    Stream {
        #[arg(long, default_value_t = 32)]
        capacity: usize,
        #[arg(long, default_value_t = 500)]
        period_ms: u64,
        /// Occupancy percentage that triggers a bulk drain.
        #[arg(long, default_value_t = 75)]
        threshold: u32,
        /// Code shape: '0' digit, 'a' lowercase, 'A' uppercase per position.
        #[arg(long, default_value = "00A")]
        format: String,
        #[arg(long, default_value_t = 10)]
        duration: u64,
    },
    /// Bridge stdin through the channel to stdout.
    Pipe {
        #[arg(long, default_value_t = 64)]
        capacity: usize,
    },
    /// Hammer one channel with many producers and consumers, then verify totals.
    Stress {
        #[arg(long, default_value_t = 64)]
        capacity: usize,
        #[arg(short, long, default_value_t = 4)]
        producers: usize,
        #[arg(short, long, default_value_t = 2)]
        consumers: usize,
        #[arg(long, default_value_t = 16)]
        payload: usize,
        #[arg(long, default_value_t = 10_000)]
        per_producer: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Stream {
            capacity,
            period_ms,
            threshold,
            format,
            duration,
        } => {
            stream::run_stream(capacity, period_ms, threshold, &format, duration)?;
        }
        Commands::Pipe { capacity } => {
            pipe::run_pipe(capacity)?;
        }
        Commands::Stress {
            capacity,
            producers,
            consumers,
            payload,
            per_producer,
        } => {
            stress::run_stress(capacity, producers, consumers, payload, per_producer)?;
        }
    }
    Ok(())
}
