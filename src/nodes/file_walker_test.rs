//! # File Walker Test Suite

use crate::channel::channel;
use crate::error::NodeError;
use crate::message::path_of;
use crate::node::Node;
use crate::nodes::file_walker::{FileWalker, walk_tree};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn touch(path: &Path) {
  std::fs::write(path, b"x").unwrap();
}

async fn run_walker(walker: FileWalker) -> Result<Vec<PathBuf>, NodeError> {
  let (tx, rx) = channel("files", 4);
  walker.set_output("files", tx);
  let cancel = CancellationToken::new();
  let run = tokio::spawn({
    let cancel = cancel.clone();
    async move { walker.start(cancel).await }
  });
  let mut out = Vec::new();
  while let Some(item) = rx.recv(&cancel).await.unwrap() {
    out.push(path_of(&item).unwrap());
  }
  run.await.unwrap().map(|()| out)
}

#[tokio::test]
async fn test_walks_nested_directories() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path().canonicalize().unwrap();
  std::fs::create_dir_all(root.join("a/b/c")).unwrap();
  touch(&root.join("top.txt"));
  touch(&root.join("a/one.txt"));
  touch(&root.join("a/b/c/deep.txt"));

  let files: HashSet<PathBuf> = run_walker(FileWalker::new("walk", vec![root.clone()]))
    .await
    .unwrap()
    .into_iter()
    .collect();
  let expected: HashSet<PathBuf> = ["top.txt", "a/one.txt", "a/b/c/deep.txt"]
    .iter()
    .map(|p| root.join(p))
    .collect();
  assert_eq!(files, expected);
  assert!(files.iter().all(|p| p.is_absolute()));
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_cycle_terminates() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path().canonicalize().unwrap();
  std::fs::create_dir_all(root.join("sub")).unwrap();
  touch(&root.join("sub/file.txt"));
  std::os::unix::fs::symlink(&root, root.join("sub/loop")).unwrap();

  let files = timeout(Duration::from_secs(5), run_walker(FileWalker::new("walk", vec![root.clone()])))
    .await
    .expect("walk must terminate")
    .unwrap();
  assert_eq!(files, vec![root.join("sub/file.txt")]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_file_symlink_is_emitted_by_link_path_and_dangling_skipped() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path().canonicalize().unwrap();
  touch(&root.join("real.txt"));
  std::os::unix::fs::symlink(root.join("real.txt"), root.join("alias.txt")).unwrap();
  std::os::unix::fs::symlink(root.join("gone.txt"), root.join("dangling.txt")).unwrap();

  let files: HashSet<PathBuf> = run_walker(FileWalker::new("walk", vec![root.clone()]))
    .await
    .unwrap()
    .into_iter()
    .collect();
  let expected: HashSet<PathBuf> = [root.join("real.txt"), root.join("alias.txt")].into_iter().collect();
  assert_eq!(files, expected);
}

// Collects formatted log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
  fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
    self.0.lock().unwrap().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> std::io::Result<()> {
    Ok(())
  }
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangling_symlink_is_logged_as_warning() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path().canonicalize().unwrap();
  std::os::unix::fs::symlink(root.join("gone.txt"), root.join("dangling.txt")).unwrap();

  let logs = LogBuffer::default();
  let subscriber = tracing_subscriber::fmt()
    .with_writer({
      let logs = logs.clone();
      move || logs.clone()
    })
    .with_ansi(false)
    .with_max_level(tracing::Level::WARN)
    .finish();
  let _guard = tracing::subscriber::set_default(subscriber);

  let (tx, _rx) = channel("files", 4);
  walk_tree(&root, &tx, &CancellationToken::new()).await.unwrap();

  let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
  assert!(text.contains("WARN"), "{text}");
  assert!(text.contains("dangling symlink skipped"), "{text}");
  assert!(text.contains("dangling.txt"), "{text}");
}

#[tokio::test]
async fn test_failing_walker_does_not_strand_remaining_roots() {
  let dir = tempfile::tempdir().unwrap();
  let missing = dir.path().join("missing");
  let roots = vec![missing.clone(), missing.clone(), missing];
  let result = timeout(Duration::from_secs(5), run_walker(FileWalker::new("walk", roots)))
    .await
    .expect("walker must not hang");
  assert!(matches!(result, Err(NodeError::Io { .. })));
}

#[tokio::test]
async fn test_multiple_roots_with_several_workers() {
  let dirs: Vec<_> = (0..3).map(|_| tempfile::tempdir().unwrap()).collect();
  let mut expected = HashSet::new();
  for (i, d) in dirs.iter().enumerate() {
    let root = d.path().canonicalize().unwrap();
    let path = root.join(format!("f{i}.txt"));
    touch(&path);
    expected.insert(path);
  }
  let roots = dirs.iter().map(|d| d.path().to_path_buf()).collect();

  let files: HashSet<PathBuf> = run_walker(FileWalker::new("walk", roots).with_workers(2))
    .await
    .unwrap()
    .into_iter()
    .collect();
  assert_eq!(files, expected);
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
  let dir = tempfile::tempdir().unwrap();
  let missing = dir.path().join("does-not-exist");
  let err = run_walker(FileWalker::new("walk", vec![missing])).await.unwrap_err();
  assert!(matches!(err, NodeError::Io { .. }), "{err:?}");
}

#[tokio::test]
async fn test_empty_roots_default_to_current_dir() {
  let walker = FileWalker::new("walk", Vec::new());
  assert_eq!(walker.roots(), &[PathBuf::from(".")]);
  assert_eq!(walker.workers(), 1);
}

#[tokio::test]
async fn test_walk_observes_cancellation() {
  let dir = tempfile::tempdir().unwrap();
  touch(&dir.path().join("a.txt"));
  let (tx, _rx) = channel("files", 1);
  let cancel = CancellationToken::new();
  cancel.cancel();
  let err = walk_tree(dir.path(), &tx, &cancel).await.unwrap_err();
  assert!(err.is_cancelled());
}
