//! Built-in multiplexer: record-boundary-preserving N:M redistribution.
//!
//! One reader thread per input and one writer thread per output, joined by a
//! bounded channel. Distribution is demand-driven: whichever writer is ready
//! takes the next record, so a slow endpoint never stalls the others beyond
//! the channel capacity. Every record lands on exactly one output; no
//! ordering is promised.
//!
//! Each thread does its own open(2), so the blocking FIFO-open handshake
//! happens per pipe and no open order can deadlock the process.

use anyhow::{Context, Result, bail};
use crossbeam_channel::bounded;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::thread;

use crate::utils::config::FAN_CHANNEL_CAP;

pub struct MuxArgs {
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

pub fn run(args: &MuxArgs) -> Result<()> {
    if args.inputs.is_empty() || args.outputs.is_empty() {
        bail!("mux needs at least one input and one output");
    }

    let (tx, rx) = bounded::<String>(FAN_CHANNEL_CAP);

    let readers: Vec<_> = args
        .inputs
        .iter()
        .cloned()
        .map(|path| {
            let tx = tx.clone();
            thread::spawn(move || -> Result<usize> {
                let f =
                    File::open(&path).with_context(|| format!("open input {}", path.display()))?;
                let mut count = 0usize;
                for line in BufReader::new(f).lines() {
                    let line = line.with_context(|| format!("read {}", path.display()))?;
                    if tx.send(line).is_err() {
                        // All writers are gone; the first writer error is the
                        // one reported, stop quietly.
                        break;
                    }
                    count += 1;
                }
                Ok(count)
            })
        })
        .collect();
    drop(tx);

    let writers: Vec<_> = args
        .outputs
        .iter()
        .cloned()
        .map(|path| {
            let rx = rx.clone();
            thread::spawn(move || -> Result<usize> {
                let f = OpenOptions::new()
                    .write(true)
                    .open(&path)
                    .with_context(|| format!("open output {}", path.display()))?;
                let mut w = BufWriter::new(f);
                let mut count = 0usize;
                while let Ok(line) = rx.recv() {
                    w.write_all(line.as_bytes())
                        .and_then(|_| w.write_all(b"\n"))
                        .with_context(|| format!("write {}", path.display()))?;
                    count += 1;
                }
                w.flush()
                    .with_context(|| format!("flush {}", path.display()))?;
                Ok(count)
            })
        })
        .collect();
    drop(rx);

    let mut read = 0usize;
    let mut written = 0usize;
    let mut first_err: Option<anyhow::Error> = None;
    for h in readers {
        match h.join() {
            Ok(Ok(n)) => read += n,
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(_) => {
                first_err.get_or_insert(anyhow::anyhow!("reader thread panicked"));
            }
        };
    }
    for h in writers {
        match h.join() {
            Ok(Ok(n)) => written += n,
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(_) => {
                first_err.get_or_insert(anyhow::anyhow!("writer thread panicked"));
            }
        };
    }
    if let Some(e) = first_err {
        return Err(e);
    }
    debug!(
        "mux moved {} records ({} read) across {}:{} pipes",
        written,
        read,
        args.inputs.len(),
        args.outputs.len()
    );
    Ok(())
}
