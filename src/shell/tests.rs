//! Tests for the shell session

use std::io::Write;

use tempfile::NamedTempFile;

use super::*;
use crate::btree::{BTreeError, MAX_HEIGHT};

fn session(order: usize) -> Session {
    Session::new(Config {
        order,
        verify: true,
        ..Config::default()
    })
    .unwrap()
}

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_session_rejects_invalid_order() {
    let result = Session::new(Config {
        order: 1,
        ..Config::default()
    });
    assert!(matches!(
        result,
        Err(ShellError::Tree(BTreeError::InvalidOrder(1)))
    ));
}

#[test]
fn test_insert_search_delete() {
    let mut session = session(3);

    let reply = session.run_line("insert 1 2 2").unwrap();
    assert_eq!(reply.output, "inserted 1\ninserted 2\n2 already present");
    assert!(!reply.exit);

    let reply = session.run_line("search 2 9").unwrap();
    assert!(reply.output.starts_with("2 found in node "));
    assert!(reply.output.ends_with("9 not found"));

    let reply = session.run_line("delete 1 1").unwrap();
    assert_eq!(reply.output, "deleted 1\n1 not found");
    assert_eq!(session.tree().len(), 1);
}

#[test]
fn test_print_output() {
    let mut session = session(3);
    session.run_line("insert 1 2 3 4 5 6").unwrap();

    let reply = session.run_line("print").unwrap();
    assert_eq!(
        reply.output,
        "order 3: at most 2 keys per node\n[root|2] 2 4\n[2|1] 1   [4|1] 3   [4|2] 5 6"
    );
}

#[test]
fn test_check_and_dump() {
    let mut session = session(3);
    session.run_line("insert 1 2 3").unwrap();

    let reply = session.run_line("check").unwrap();
    assert_eq!(reply.output, "ok: all invariants hold");

    let reply = session.run_line("dump").unwrap();
    let snapshot: crate::btree::TreeSnapshot = serde_json::from_str(&reply.output).unwrap();
    assert_eq!(snapshot.len, 3);
    assert_eq!(snapshot.root.keys, vec![2]);
}

#[test]
fn test_stats_table() {
    let mut session = session(3);
    session.run_line("insert 1 2 3; delete 1").unwrap();

    let reply = session.run_line("stats").unwrap();
    assert!(reply.output.contains("leaf splits"));
    assert!(reply.output.contains("root collapses"));
    assert!(reply.output.contains("height"));
}

#[test]
fn test_reset() {
    let mut session = session(3);
    session.run_line("insert 1 2 3").unwrap();

    let reply = session.run_line("reset 5").unwrap();
    assert_eq!(reply.output, "new empty tree of order 5");
    assert!(session.tree().is_empty());
    assert_eq!(session.tree().order(), 5);

    session.run_line("reset").unwrap();
    assert_eq!(session.tree().order(), 5);

    assert!(matches!(
        session.run_line("reset 1"),
        Err(ShellError::Tree(BTreeError::InvalidOrder(1)))
    ));
}

#[test]
fn test_exit_stops_line() {
    let mut session = session(3);

    let reply = session.run_line("insert 1; exit; insert 2").unwrap();
    assert!(reply.exit);
    assert_eq!(reply.output, "inserted 1");
    assert!(!session.tree().contains(2));
}

#[test]
fn test_parse_error() {
    let mut session = session(3);
    assert!(matches!(
        session.run_line("insert one"),
        Err(ShellError::Parse(_))
    ));
}

#[test]
fn test_load_csv() {
    let file = csv_file("5, 3, 8\n1\n\n3,10,\n");
    let mut session = session(3);

    let reply = session
        .run_line(&format!("load '{}'", file.path().display()))
        .unwrap();
    assert!(reply.output.starts_with("loaded 5 keys from "));
    assert!(reply.output.ends_with("(1 already present)"));
    assert_eq!(session.tree().keys().unwrap(), vec![1, 3, 5, 8, 10]);
}

#[test]
fn test_load_rejects_non_integer() {
    let file = csv_file("1,two,3\n");
    assert!(matches!(
        read_keys(file.path()),
        Err(ShellError::InvalidKey(field)) if field == "two"
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    assert!(matches!(read_keys(&missing), Err(ShellError::Csv(_))));
}

#[test]
fn test_height_limit_surfaces_as_error() {
    let mut session = session(2);
    let keys = (0..100)
        .rev()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    assert!(matches!(
        session.run_line(&format!("insert {}", keys)),
        Err(ShellError::Tree(BTreeError::HeightLimit(MAX_HEIGHT)))
    ));
    assert_eq!(session.tree().len(), MAX_HEIGHT);
    assert_eq!(
        session.run_line("check").unwrap().output,
        "ok: all invariants hold"
    );
}
