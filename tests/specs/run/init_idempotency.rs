//! `ao init` idempotency specs.

use crate::prelude::*;

#[test]
fn init_creates_layout_and_single_gitignore_entry() {
    let dir = tempfile::tempdir().unwrap();

    let first = ao(dir.path(), &["init"]);
    assert!(first.status.success());
    assert!(dir.path().join(".agents/rpi/runs").is_dir());
    assert!(dir.path().join(".agents/handoff/pending").is_dir());

    let second = ao(dir.path(), &["init"]);
    assert!(second.status.success());

    let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
    assert_eq!(
        gitignore.lines().filter(|l| l.trim() == ".agents/").count(),
        1,
        "got: {gitignore:?}"
    );
}
