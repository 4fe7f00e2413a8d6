use std::io;
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use fifo_core::{CancelToken, Channel, Role};

use crate::endpoint::Endpoint;

/// Bridges stdin through the channel to stdout. The writer thread detaches
/// on stdin EOF, which the reader observes as end-of-stream.
pub fn run_pipe(capacity: usize) -> Result<()> {
    let channel = Arc::new(Channel::new(capacity));

    let writer = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || -> Result<u64> {
            let mut endpoint = Endpoint::open(&channel, Role::Producer, CancelToken::new())?;
            Ok(io::copy(&mut io::stdin().lock(), &mut endpoint)?)
        })
    };

    let mut endpoint = Endpoint::open(&channel, Role::Consumer, CancelToken::new())?;
    let copied = io::copy(&mut endpoint, &mut io::stdout().lock())?;
    writer.join().unwrap()?;

    eprintln!("{} bytes piped", copied);
    Ok(())
}
