//! History and alias persistence through cache files

use ccli::cache::{load_section_file, save_section_file};
use ccli::{CliError, Flow, ScriptedConsole, Session};
use std::fs;
use tempfile::tempdir;

fn session(input: &str) -> Session {
    let mut session = Session::new(ScriptedConsole::new(input), "> ").unwrap();
    session.register_unknown(|_, _| Flow::Continue);
    session
}

#[test]
fn test_history_survives_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("ccli");

    let mut first = session("one\ntwo 'x'\n\n");
    first.run().unwrap();
    assert_eq!(first.history_save_file("demo", &path).unwrap(), 2);

    let mut second = session("\x1b[A\n");
    assert_eq!(second.history_load_file("demo", &path).unwrap(), 2);
    assert_eq!(second.history(1), Some("two 'x'"));
    second.run().unwrap();
    assert_eq!(
        second.history_iter().collect::<Vec<_>>(),
        ["one", "two 'x'", "two 'x'"]
    );
}

#[test]
fn test_missing_file_loads_nothing() {
    let dir = tempdir().unwrap();
    let mut s = session("");
    assert_eq!(s.history_load_file("demo", &dir.path().join("none")).unwrap(), 0);
    assert_eq!(s.alias_load_file("demo", &dir.path().join("none")).unwrap(), 0);
    assert_eq!(s.history_len(), 0);
}

#[test]
fn test_save_replaces_section_in_place() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ccli");
    fs::write(
        &path,
        "####---ccli---#### other 1\nkeep me\n%%%%---ccli---%%%% other\n\
         ####---ccli---#### demo 1\nold\n%%%%---ccli---%%%% demo\n",
    )
    .unwrap();

    let mut s = session("");
    s.history_add("new 1").unwrap();
    s.history_add("new 2").unwrap();
    s.history_save_file("demo", &path).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "####---ccli---#### other 1\nkeep me\n%%%%---ccli---%%%% other\n\
         ####---ccli---#### demo 2\nnew 1\nnew 2\n%%%%---ccli---%%%% demo\n"
    );
    assert_eq!(
        load_section_file(&path, "other").unwrap(),
        Some(vec!["keep me".to_string()])
    );
}

#[test]
fn test_saving_empty_removes_section() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ccli");
    save_section_file(&path, "a", ["x"]).unwrap();
    save_section_file(&path, "b", ["y"]).unwrap();

    let s = session("");
    assert_eq!(s.history_save_file("a", &path).unwrap(), 0);

    assert_eq!(load_section_file(&path, "a").unwrap(), None);
    assert_eq!(
        load_section_file(&path, "b").unwrap(),
        Some(vec!["y".to_string()])
    );
}

#[test]
fn test_aliases_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ccli-alias");

    let mut first = session("");
    first.register_alias("ll", "ls -l").unwrap();
    first.register_alias("eq", "set a=b").unwrap();
    assert_eq!(first.alias_save_file("demo", &path).unwrap(), 2);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "####---ccli---#### demo 2\neq=set a=b\nll=ls -l\n%%%%---ccli---%%%% demo\n"
    );

    let mut second = session("");
    assert_eq!(second.alias_load_file("demo", &path).unwrap(), 2);
    assert_eq!(second.aliases().get("eq"), Some("set a=b"));
    assert_eq!(second.aliases().get("ll"), Some("ls -l"));
}

#[test]
fn test_bad_alias_lines_are_skipped() {
    let text = "####---ccli---#### t 3\nok=fine\nno equals\n=nameless\n%%%%---ccli---%%%% t\n";
    let mut s = session("");
    assert_eq!(s.alias_load_from(text.as_bytes(), "t").unwrap(), 1);
    assert_eq!(s.aliases().len(), 1);
}

#[test]
fn test_writer_and_reader_api() {
    let mut s = session("");
    s.history_add("a").unwrap();
    s.history_add("b").unwrap();
    let mut buf = Vec::new();
    assert_eq!(s.history_save_to(&mut buf, "t").unwrap(), 2);

    let mut t = session("");
    assert_eq!(t.history_load_from(buf.as_slice(), "t").unwrap(), 2);
    assert_eq!(t.history_iter().collect::<Vec<_>>(), ["a", "b"]);
}

#[test]
fn test_multi_line_history_entry_does_not_block_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ccli");
    let mut s = session("");
    s.history_add("before").unwrap();
    s.history_add("a\nb").unwrap();
    s.history_add("after").unwrap();

    assert_eq!(s.history_save_file("demo", &path).unwrap(), 2);
    assert_eq!(
        load_section_file(&path, "demo").unwrap(),
        Some(vec!["before".to_string(), "after".to_string()])
    );

    let mut buf = Vec::new();
    assert_eq!(s.history_save_to(&mut buf, "demo").unwrap(), 2);
}

#[test]
fn test_corrupt_count_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ccli");
    fs::write(&path, "####---ccli---#### demo many\nx\n").unwrap();

    let mut s = session("");
    assert!(matches!(
        s.history_load_file("demo", &path),
        Err(CliError::CorruptCache(_))
    ));
    s.history_add("x").unwrap();
    assert!(matches!(
        s.history_save_file("demo", &path),
        Err(CliError::CorruptCache(_))
    ));
}
