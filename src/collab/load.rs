//! Built-in loader: drain N pipes concurrently and insert every record into
//! the sink table in batched transactions.
//!
//! One reader thread per pipe feeds a bounded channel; the main thread
//! decodes and inserts. Any interleaving across pipes is acceptable, per the
//! sink contract.

use anyhow::{Context, Result, bail};
use crossbeam_channel::bounded;
use log::debug;
use rusqlite::Connection;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::thread;

use crate::types::Format;
use crate::utils::config::{DB_INSERT_BATCH_SIZE, FAN_CHANNEL_CAP};

pub struct LoadArgs {
    pub db: PathBuf,
    pub table: String,
    pub format: Format,
    pub pipes: Vec<PathBuf>,
}

pub fn run(args: &LoadArgs) -> Result<()> {
    let mut conn = Connection::open(&args.db)
        .with_context(|| format!("open database {}", args.db.display()))?;
    // Source and sink may share one database file; wait out the unloader's
    // read lock instead of failing with SQLITE_BUSY.
    conn.busy_timeout(std::time::Duration::from_secs(60))
        .context("set busy timeout")?;
    let columns = table_columns(&conn, &args.table)?;
    if columns.is_empty() {
        bail!("no such table: {}", args.table);
    }
    let insert_sql = insert_sql(&args.table, &columns);

    let (line_tx, line_rx) = bounded::<String>(FAN_CHANNEL_CAP);
    let reader_handles: Vec<_> = args
        .pipes
        .iter()
        .cloned()
        .map(|pipe| {
            let tx = line_tx.clone();
            thread::spawn(move || -> Result<usize> {
                let f = File::open(&pipe)
                    .with_context(|| format!("open input pipe {}", pipe.display()))?;
                let mut count = 0usize;
                for line in BufReader::new(f).lines() {
                    let line =
                        line.with_context(|| format!("read from pipe {}", pipe.display()))?;
                    if tx.send(line).is_err() {
                        break; // insert side gave up
                    }
                    count += 1;
                }
                Ok(count)
            })
        })
        .collect();
    // Dropping the last sender closes the channel so the insert loop exits.
    drop(line_tx);

    let mut total = 0usize;
    let mut batch = Vec::with_capacity(DB_INSERT_BATCH_SIZE);
    let insert_result = (|| -> Result<()> {
        while let Ok(line) = line_rx.recv() {
            batch.push(line);
            if batch.len() >= DB_INSERT_BATCH_SIZE {
                total += flush_batch(&mut conn, &insert_sql, args.format, &columns, &batch)?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            total += flush_batch(&mut conn, &insert_sql, args.format, &columns, &batch)?;
        }
        Ok(())
    })();
    drop(line_rx); // unblocks readers if the insert loop bailed early

    for h in reader_handles {
        match h.join() {
            Ok(res) => {
                res?;
            }
            Err(_) => bail!("pipe reader thread panicked"),
        }
    }
    insert_result?;
    debug!("loaded {} rows into {}", total, args.table);
    Ok(())
}

/// Insert one batch inside a single transaction.
fn flush_batch(
    conn: &mut Connection,
    insert_sql: &str,
    format: Format,
    columns: &[String],
    batch: &[String],
) -> Result<usize> {
    let tx = conn.transaction().context("begin insert transaction")?;
    {
        let mut stmt = tx.prepare_cached(insert_sql).context("prepare insert")?;
        for line in batch {
            let values = super::decode_row(format, columns, line)?;
            stmt.execute(rusqlite::params_from_iter(values))
                .context("insert record")?;
        }
    }
    tx.commit().context("commit insert transaction")?;
    Ok(batch.len())
}

/// Column names of `table`, in declared order. Empty when the table is missing.
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let sql = format!("PRAGMA table_info({})", super::quote_ident(table));
    let mut stmt = conn.prepare(&sql).context("query table columns")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .context("read table columns")?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn insert_sql(table: &str, columns: &[String]) -> String {
    let cols = columns
        .iter()
        .map(|c| super::quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        super::quote_ident(table),
        cols,
        placeholders
    )
}
