//! Built-in unloader: stream all rows of a query out across N pipes.
//!
//! Rows are distributed round-robin, one record per line. Every output pipe
//! is opened even when the query returns nothing, so downstream readers
//! always reach EOF instead of blocking in open(2).

use anyhow::{Context, Result};
use log::debug;
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::types::Format;

pub struct UnloadArgs {
    pub db: PathBuf,
    pub query: String,
    pub format: Format,
    pub pipes: Vec<PathBuf>,
}

pub fn run(args: &UnloadArgs) -> Result<()> {
    let conn = Connection::open(&args.db)
        .with_context(|| format!("open database {}", args.db.display()))?;
    conn.busy_timeout(std::time::Duration::from_secs(60))
        .context("set busy timeout")?;
    let mut stmt = conn.prepare(&args.query).context("prepare source query")?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    // Opening a FIFO for write blocks until its reader shows up; the
    // multiplexer opens all of them concurrently, so plain sequential opens
    // cannot deadlock here.
    let mut writers = Vec::with_capacity(args.pipes.len());
    for pipe in &args.pipes {
        let f = OpenOptions::new()
            .write(true)
            .open(pipe)
            .with_context(|| format!("open output pipe {}", pipe.display()))?;
        writers.push(BufWriter::new(f));
    }

    let mut rows = stmt.query([]).context("run source query")?;
    let mut n = 0usize;
    while let Some(row) = rows.next().context("read source row")? {
        let values: Vec<SqlValue> = (0..columns.len())
            .map(|c| row.get(c))
            .collect::<rusqlite::Result<_>>()
            .context("decode source row")?;
        let line = super::encode_row(args.format, &columns, &values);
        let k = n % writers.len();
        let w = &mut writers[k];
        w.write_all(line.as_bytes())
            .and_then(|_| w.write_all(b"\n"))
            .context("write record to pipe")?;
        n += 1;
    }
    for mut w in writers {
        w.flush().context("flush output pipe")?;
    }
    debug!("unloaded {} rows across {} pipes", n, args.pipes.len());
    Ok(())
}
