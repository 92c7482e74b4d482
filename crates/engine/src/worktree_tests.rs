// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ao_adapters::FakeGateway;
use tempfile::TempDir;

fn manager(root: &Path) -> (FakeGateway, WorktreeManager<FakeGateway>) {
    let fake = FakeGateway::new();
    (fake.clone(), WorktreeManager::new(fake, root))
}

fn make_sibling(parent: &Path, name: &str) -> PathBuf {
    let path = parent.join(name);
    std::fs::create_dir_all(&path).unwrap();
    path
}

#[tokio::test]
async fn create_adds_worktree_on_run_branch() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    let (fake, manager) = manager(&repo);

    let path = manager.create(&RunId::new("abcdef0123")).await.unwrap();
    assert_eq!(path, dir.path().join("repo-rpi-abcdef0123"));

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("worktree add"));
    assert!(calls[0].contains("-b rpi/abcdef0123"));
}

#[tokio::test]
async fn remove_falls_back_to_fs_delete_and_prunes() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    let worktree = make_sibling(dir.path(), "repo-rpi-abcdef0123");
    let (fake, manager) = manager(&repo);
    fake.fail_with("worktree remove", "is dirty");

    manager.remove(&RunId::new("abcdef0123")).await.unwrap();

    assert!(!worktree.exists(), "filesystem fallback should delete");
    let calls = fake.calls();
    assert!(calls.iter().any(|c| c.contains("worktree remove --force")));
    assert!(calls.last().unwrap().contains("worktree prune"));
}

#[tokio::test]
async fn remove_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    let (_fake, manager) = manager(&repo);

    // No worktree directory exists at all
    manager.remove(&RunId::new("abcdef0123")).await.unwrap();
}

#[tokio::test]
async fn dirty_check_reads_porcelain_status() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    let (fake, manager) = manager(&repo);

    fake.succeed_with("status --porcelain", " M src/lib.rs\n");
    assert!(manager.is_dirty(&repo).await.unwrap());
}

#[tokio::test]
async fn clean_tree_is_not_dirty() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    let (fake, manager) = manager(&repo);
    fake.succeed_with("status --porcelain", "\n");
    assert!(!manager.is_dirty(&repo).await.unwrap());
}

#[test]
fn reference_time_prefers_newest_artifact() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    let worktree = make_sibling(dir.path(), "repo-rpi-abcdef0123");
    let (_fake, manager) = manager(&repo);

    let base = manager.reference_time(&worktree).unwrap();

    std::thread::sleep(Duration::from_millis(20));
    let live = worktree.join(".agents/rpi/live-status.md");
    std::fs::create_dir_all(live.parent().unwrap()).unwrap();
    std::fs::write(&live, "cycle 2 in progress").unwrap();

    let updated = manager.reference_time(&worktree).unwrap();
    assert!(updated >= base);
}

#[tokio::test]
async fn gc_skips_active_fresh_and_dirty() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    make_sibling(dir.path(), "repo-rpi-aaaa000001");
    make_sibling(dir.path(), "repo-rpi-bbbb000002");
    make_sibling(dir.path(), "repo-rpi-cccc000003");
    let (fake, manager) = manager(&repo);
    fake.succeed_with("status --porcelain", "");

    let active: HashSet<RunId> = [RunId::new("aaaa000001")].into_iter().collect();
    let now = SystemTime::now() + Duration::from_secs(7200);

    let candidates = manager
        .gc_candidates(now, Duration::from_secs(3600), &active, false)
        .await;
    let ids: Vec<&str> = candidates.iter().map(|c| c.run_id.as_str()).collect();
    assert_eq!(ids, ["bbbb000002", "cccc000003"]);

    // Fresh worktrees are skipped
    let fresh = manager
        .gc_candidates(SystemTime::now(), Duration::from_secs(3600), &active, false)
        .await;
    assert!(fresh.is_empty());
}

#[tokio::test]
async fn gc_dirty_requires_include_dirty() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    make_sibling(dir.path(), "repo-rpi-aaaa000001");
    let (fake, manager) = manager(&repo);
    fake.succeed_with("status --porcelain", " M notes.md\n");

    let active = HashSet::new();
    let now = SystemTime::now() + Duration::from_secs(7200);
    let stale_after = Duration::from_secs(3600);

    assert!(manager
        .gc_candidates(now, stale_after, &active, false)
        .await
        .is_empty());

    let with_dirty = manager
        .gc_candidates(now, stale_after, &active, true)
        .await;
    assert_eq!(with_dirty.len(), 1);
    assert!(with_dirty[0].dirty);
}

#[tokio::test]
async fn worktree_roots_parses_porcelain_or_falls_back() {
    let dir = TempDir::new().unwrap();
    let repo = make_sibling(dir.path(), "repo");
    let sibling = make_sibling(dir.path(), "repo-rpi-abcdef0123");
    let (fake, manager) = manager(&repo);

    fake.succeed_with(
        "worktree list --porcelain",
        format!(
            "worktree {}\nHEAD deadbeef\nbranch refs/heads/main\n\nworktree {}\nHEAD deadbeef\n",
            repo.display(),
            sibling.display()
        ),
    );
    let roots = manager.worktree_roots().await;
    assert_eq!(roots, vec![repo.clone(), sibling.clone()]);

    let (failing, manager) = {
        let fake = FakeGateway::new();
        fake.fail_with("worktree list", "not a git repository");
        (fake.clone(), WorktreeManager::new(fake, &repo))
    };
    let _ = failing;
    let fallback = manager.worktree_roots().await;
    assert_eq!(fallback, vec![sibling]);
}
