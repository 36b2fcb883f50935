//! Collaborator tests: wire codecs, and the unloader/loader/multiplexer run
//! against regular files and throwaway SQLite databases (they only open
//! paths, so no FIFOs are needed here).

use rowfan::Format;
use rowfan::collab::{self, load, mux, unload};
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Fresh scratch directory under the system temp dir; removed and recreated
/// so reruns start clean.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rowfan_collab_{}_{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn multiset(lines: impl IntoIterator<Item = String>) -> BTreeMap<String, usize> {
    let mut m = BTreeMap::new();
    for l in lines {
        *m.entry(l).or_insert(0) += 1;
    }
    m
}

fn file_lines(path: &PathBuf) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

// --- Wire codecs ---

#[test]
fn test_tsv_round_trip_special_chars() {
    let cols = vec!["a".to_string(), "b".to_string()];
    let row = vec![
        SqlValue::Text("tab\there\nand newline \\ backslash".into()),
        SqlValue::Text("plain".into()),
    ];
    let line = collab::encode_row(Format::Tsv, &cols, &row);
    assert!(!line.contains('\n'), "record must stay on one line");
    let back = collab::decode_row(Format::Tsv, &cols, &line).unwrap();
    assert_eq!(back, row);
}

#[test]
fn test_tsv_null_vs_literal_backslash_n() {
    let cols = vec!["a".to_string()];
    // A real NULL and the two-character text "\N" must stay distinct.
    let null_line = collab::encode_row(Format::Tsv, &cols, &[SqlValue::Null]);
    let text_line = collab::encode_row(Format::Tsv, &cols, &[SqlValue::Text("\\N".into())]);
    assert_ne!(null_line, text_line);
    assert_eq!(
        collab::decode_row(Format::Tsv, &cols, &null_line).unwrap(),
        vec![SqlValue::Null]
    );
    assert_eq!(
        collab::decode_row(Format::Tsv, &cols, &text_line).unwrap(),
        vec![SqlValue::Text("\\N".into())]
    );
}

#[test]
fn test_tsv_blob_and_numbers_round_trip() {
    let cols = vec!["a".into(), "b".into(), "c".into()];
    let row = vec![
        SqlValue::Integer(-42),
        SqlValue::Real(1.5),
        SqlValue::Blob(vec![0x00, 0xff, 0x10]),
    ];
    let line = collab::encode_row(Format::Tsv, &cols, &row);
    let back = collab::decode_row(Format::Tsv, &cols, &line).unwrap();
    // tsv is stringly typed; numbers come back as text and SQLite affinity
    // sorts it out on insert. Only the blob keeps its type.
    assert_eq!(back[0], SqlValue::Text("-42".into()));
    assert_eq!(back[1], SqlValue::Text("1.5".into()));
    assert_eq!(back[2], SqlValue::Blob(vec![0x00, 0xff, 0x10]));
}

#[test]
fn test_tsv_field_count_mismatch_is_an_error() {
    let cols = vec!["a".to_string(), "b".to_string()];
    assert!(collab::decode_row(Format::Tsv, &cols, "only-one-field").is_err());
}

#[test]
fn test_jsonl_round_trip() {
    let cols = vec!["n".into(), "s".into(), "x".into(), "b".into()];
    let row = vec![
        SqlValue::Integer(7),
        SqlValue::Text("hello \"world\"".into()),
        SqlValue::Null,
        SqlValue::Blob(vec![0xde, 0xad]),
    ];
    let line = collab::encode_row(Format::Jsonl, &cols, &row);
    let back = collab::decode_row(Format::Jsonl, &cols, &line).unwrap();
    assert_eq!(back, row);
}

#[test]
fn test_jsonl_missing_key_becomes_null() {
    let cols = vec!["a".to_string(), "missing".to_string()];
    let back = collab::decode_row(Format::Jsonl, &cols, r#"{"a": 1}"#).unwrap();
    assert_eq!(back, vec![SqlValue::Integer(1), SqlValue::Null]);
}

#[test]
fn test_jsonl_garbage_is_an_error() {
    let cols = vec!["a".to_string()];
    assert!(collab::decode_row(Format::Jsonl, &cols, "not json").is_err());
    assert!(collab::decode_row(Format::Jsonl, &cols, "[1, 2]").is_err());
}

// --- Multiplexer over regular files ---

#[test]
fn test_mux_redistributes_all_records_exactly_once() {
    let dir = scratch("mux");
    let in1 = dir.join("in1");
    let in2 = dir.join("in2");
    fs::write(&in1, "a\nb\nc\n").unwrap();
    fs::write(&in2, "d\ne\n").unwrap();
    let outs = [dir.join("o1"), dir.join("o2"), dir.join("o3")];
    for o in &outs {
        fs::write(o, "").unwrap();
    }

    mux::run(&mux::MuxArgs {
        inputs: vec![in1, in2],
        outputs: outs.to_vec(),
    })
    .unwrap();

    let got = multiset(outs.iter().flat_map(file_lines));
    let want = multiset(["a", "b", "c", "d", "e"].map(String::from));
    assert_eq!(got, want);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_mux_missing_input_fails() {
    let dir = scratch("mux_missing");
    let out = dir.join("o1");
    fs::write(&out, "").unwrap();
    let res = mux::run(&mux::MuxArgs {
        inputs: vec![dir.join("does-not-exist")],
        outputs: vec![out],
    });
    assert!(res.is_err());
    let _ = fs::remove_dir_all(&dir);
}

// --- Unloader ---

fn seed_db(path: &PathBuf) -> Connection {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE nums (n INTEGER, label TEXT);
         INSERT INTO nums VALUES (1, 'one'), (2, 'two'), (3, 'three'), (4, NULL);",
    )
    .unwrap();
    conn
}

#[test]
fn test_unload_round_robin_covers_all_rows() {
    let dir = scratch("unload");
    let db = dir.join("src.db");
    seed_db(&db);
    let pipes = [dir.join("p1"), dir.join("p2")];
    for p in &pipes {
        fs::write(p, "").unwrap();
    }

    unload::run(&unload::UnloadArgs {
        db: db.clone(),
        query: "SELECT n, label FROM nums ORDER BY n".into(),
        format: Format::Tsv,
        pipes: pipes.to_vec(),
    })
    .unwrap();

    // Round-robin: 4 rows over 2 pipes is 2 + 2.
    assert_eq!(file_lines(&pipes[0]).len(), 2);
    assert_eq!(file_lines(&pipes[1]).len(), 2);
    let got = multiset(pipes.iter().flat_map(file_lines));
    let want = multiset(
        ["1\tone", "2\ttwo", "3\tthree", "4\t\\N"].map(String::from),
    );
    assert_eq!(got, want);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_unload_bad_query_fails_before_touching_pipes() {
    let dir = scratch("unload_bad");
    let db = dir.join("src.db");
    seed_db(&db);
    let res = unload::run(&unload::UnloadArgs {
        db,
        query: "SELECT * FROM missing_table".into(),
        format: Format::Tsv,
        // Deliberately nonexistent: prepare must fail before any open.
        pipes: vec![dir.join("never-created")],
    });
    assert!(res.is_err());
    assert!(!dir.join("never-created").exists());
    let _ = fs::remove_dir_all(&dir);
}

// --- Loader ---

#[test]
fn test_load_inserts_from_all_pipes() {
    let dir = scratch("load");
    let db = dir.join("sink.db");
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE sink (n INTEGER, label TEXT);")
            .unwrap();
    }
    let p1 = dir.join("p1");
    let p2 = dir.join("p2");
    fs::write(&p1, "1\tone\n2\ttwo\n").unwrap();
    fs::write(&p2, "3\tthree\n4\t\\N\n").unwrap();

    load::run(&load::LoadArgs {
        db: db.clone(),
        table: "sink".into(),
        format: Format::Tsv,
        pipes: vec![p1, p2],
    })
    .unwrap();

    let conn = Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM sink", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 4);
    let nulls: i64 = conn
        .query_row("SELECT COUNT(*) FROM sink WHERE label IS NULL", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(nulls, 1);
    // Affinity turns the tsv text back into integers.
    let total: i64 = conn
        .query_row("SELECT SUM(n) FROM sink", [], |r| r.get(0))
        .unwrap();
    assert_eq!(total, 10);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_load_missing_table_fails() {
    let dir = scratch("load_missing");
    let db = dir.join("sink.db");
    Connection::open(&db).unwrap();
    let p = dir.join("p1");
    fs::write(&p, "1\n").unwrap();
    let res = load::run(&load::LoadArgs {
        db,
        table: "nope".into(),
        format: Format::Tsv,
        pipes: vec![p],
    });
    assert!(res.is_err());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_load_rejects_malformed_record() {
    let dir = scratch("load_malformed");
    let db = dir.join("sink.db");
    {
        let conn = Connection::open(&db).unwrap();
        conn.execute_batch("CREATE TABLE sink (a TEXT, b TEXT);")
            .unwrap();
    }
    let p = dir.join("p1");
    fs::write(&p, "only-one-field\n").unwrap();
    let res = load::run(&load::LoadArgs {
        db,
        table: "sink".into(),
        format: Format::Tsv,
        pipes: vec![p],
    });
    assert!(res.is_err());
    let _ = fs::remove_dir_all(&dir);
}

// --- Unload → load through files (jsonl) ---

#[test]
fn test_unload_then_load_jsonl_preserves_rows() {
    let dir = scratch("roundtrip");
    let src = dir.join("src.db");
    seed_db(&src);
    let sink = dir.join("sink.db");
    {
        let conn = Connection::open(&sink).unwrap();
        conn.execute_batch("CREATE TABLE nums (n INTEGER, label TEXT);")
            .unwrap();
    }
    let pipes = [dir.join("p1"), dir.join("p2"), dir.join("p3")];
    for p in &pipes {
        fs::write(p, "").unwrap();
    }

    unload::run(&unload::UnloadArgs {
        db: src,
        query: "SELECT n, label FROM nums".into(),
        format: Format::Jsonl,
        pipes: pipes.to_vec(),
    })
    .unwrap();
    load::run(&load::LoadArgs {
        db: sink.clone(),
        table: "nums".into(),
        format: Format::Jsonl,
        pipes: pipes.to_vec(),
    })
    .unwrap();

    let conn = Connection::open(&sink).unwrap();
    let mut stmt = conn
        .prepare("SELECT n, COALESCE(label, '<null>') FROM nums ORDER BY n")
        .unwrap();
    let rows: Vec<(i64, String)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(
        rows,
        vec![
            (1, "one".to_string()),
            (2, "two".to_string()),
            (3, "three".to_string()),
            (4, "<null>".to_string()),
        ]
    );
    let _ = fs::remove_dir_all(&dir);
}
