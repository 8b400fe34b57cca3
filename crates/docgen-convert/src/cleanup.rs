//! Deferred workspace cleanup.
//!
//! [`CleanupRegistry`] keeps a map from workspace path to removal deadline.
//! A single reaper thread sleeps until the earliest deadline, takes the due
//! entries out of the map, and deletes them. Whoever removes an entry from
//! the map owns the deletion, so a directory is deleted at most once.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Name of the reaper thread.
const REAPER_THREAD: &str = "docgen-cleanup";

/// Longest accepted cleanup delay (7 days). Longer delays are clamped.
pub const MAX_CLEANUP_DELAY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Registry of workspaces awaiting deferred removal.
///
/// Shutting down (explicitly or on drop) stops the reaper and removes every
/// pending workspace immediately.
#[derive(Debug)]
pub struct CleanupRegistry {
    inner: Arc<Inner>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    wake: Condvar,
}

#[derive(Debug, Default)]
struct State {
    pending: HashMap<PathBuf, Instant>,
    shutdown: bool,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CleanupRegistry {
    /// Create a registry and start its reaper thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the reaper thread cannot be spawned.
    pub fn new() -> io::Result<Self> {
        let inner = Arc::new(Inner::default());
        let reaper = thread::Builder::new()
            .name(REAPER_THREAD.to_owned())
            .spawn({
                let inner = Arc::clone(&inner);
                move || reap(&inner)
            })?;

        Ok(Self {
            inner,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Schedule `path` for removal after `delay`.
    ///
    /// Scheduling a path that is already pending replaces its deadline. Delays
    /// above [`MAX_CLEANUP_DELAY`] are clamped to it. After shutdown the path
    /// is removed immediately.
    pub fn schedule(&self, path: impl Into<PathBuf>, delay: Duration) {
        let path = path.into();
        let delay = delay.min(MAX_CLEANUP_DELAY);
        let mut state = self.inner.lock();
        if state.shutdown {
            drop(state);
            remove_workspace(&path);
            return;
        }

        tracing::debug!(
            path = %path.display(),
            delay_secs = delay.as_secs_f64(),
            "Scheduled workspace cleanup"
        );
        let now = Instant::now();
        state
            .pending
            .insert(path, now.checked_add(delay).unwrap_or(now));
        drop(state);
        self.inner.wake.notify_one();
    }

    /// Remove `path` from the registry without deleting it.
    ///
    /// Returns whether an entry was pending.
    pub fn cancel(&self, path: &Path) -> bool {
        self.inner.lock().pending.remove(path).is_some()
    }

    /// Paths currently awaiting removal, sorted.
    #[must_use]
    pub fn pending(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.inner.lock().pending.keys().cloned().collect();
        paths.sort();
        paths
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Stop the reaper and remove every pending workspace now.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        let drained: Vec<PathBuf> = {
            let mut state = self.inner.lock();
            state.shutdown = true;
            state.pending.drain().map(|(path, _)| path).collect()
        };
        self.inner.wake.notify_all();

        let reaper = self
            .reaper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reaper) = reaper
            && reaper.join().is_err()
        {
            tracing::error!("Cleanup reaper thread panicked");
        }

        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Removing pending workspaces on shutdown");
        }
        for path in &drained {
            remove_workspace(path);
        }
    }
}

impl Drop for CleanupRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reap(inner: &Inner) {
    let mut state = inner.lock();
    loop {
        if state.shutdown {
            return;
        }

        let now = Instant::now();
        let due: Vec<PathBuf> = state
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        if !due.is_empty() {
            for path in &due {
                state.pending.remove(path);
            }
            drop(state);
            for path in &due {
                remove_workspace(path);
            }
            state = inner.lock();
            continue;
        }

        state = match state.pending.values().min().copied() {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(now);
                let (guard, _) = inner
                    .wake
                    .wait_timeout(state, timeout)
                    .unwrap_or_else(PoisonError::into_inner);
                guard
            }
            None => inner
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner),
        };
    }
}

/// Remove a workspace directory, ignoring one that is already gone.
pub(crate) fn remove_workspace(path: &Path) {
    match fs::remove_dir_all(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed workspace"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove workspace"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dir(parent: &Path, name: &str) -> PathBuf {
        let dir = parent.join(name);
        fs::create_dir_all(dir.join("images")).unwrap();
        fs::write(dir.join("input.md"), "# doc").unwrap();
        dir
    }

    fn wait_until_gone(path: &Path, limit: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if !path.exists() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        !path.exists()
    }

    #[test]
    fn test_schedule_removes_after_delay() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_dir(root.path(), "ws");
        let registry = CleanupRegistry::new().unwrap();

        registry.schedule(&dir, Duration::from_millis(50));

        assert!(dir.exists());
        assert_eq!(registry.pending_count(), 1);
        assert!(wait_until_gone(&dir, Duration::from_secs(5)));
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_earlier_deadline_not_blocked_by_later() {
        let root = tempfile::tempdir().unwrap();
        let late = make_dir(root.path(), "late");
        let early = make_dir(root.path(), "early");
        let registry = CleanupRegistry::new().unwrap();

        registry.schedule(&late, Duration::from_secs(60));
        registry.schedule(&early, Duration::from_millis(20));

        assert!(wait_until_gone(&early, Duration::from_secs(5)));
        assert!(late.exists());
        assert_eq!(registry.pending(), vec![late]);
    }

    #[test]
    fn test_reschedule_keeps_single_entry() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_dir(root.path(), "ws");
        let registry = CleanupRegistry::new().unwrap();

        registry.schedule(&dir, Duration::from_secs(60));
        registry.schedule(&dir, Duration::from_secs(120));

        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn test_cancel_keeps_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_dir(root.path(), "ws");
        let registry = CleanupRegistry::new().unwrap();

        registry.schedule(&dir, Duration::from_millis(20));
        assert!(registry.cancel(&dir));
        assert!(!registry.cancel(&dir));

        thread::sleep(Duration::from_millis(100));
        assert!(dir.exists());
    }

    #[test]
    fn test_shutdown_drains_pending() {
        let root = tempfile::tempdir().unwrap();
        let first = make_dir(root.path(), "first");
        let second = make_dir(root.path(), "second");
        let registry = CleanupRegistry::new().unwrap();

        registry.schedule(&first, Duration::from_secs(300));
        registry.schedule(&second, Duration::from_secs(300));
        registry.shutdown();

        assert!(!first.exists());
        assert!(!second.exists());
        assert_eq!(registry.pending_count(), 0);

        // Idempotent
        registry.shutdown();
    }

    #[test]
    fn test_schedule_after_shutdown_removes_immediately() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_dir(root.path(), "ws");
        let registry = CleanupRegistry::new().unwrap();

        registry.shutdown();
        registry.schedule(&dir, Duration::from_secs(300));

        assert!(!dir.exists());
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_oversized_delay_is_clamped() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_dir(root.path(), "ws");
        let registry = CleanupRegistry::new().unwrap();

        registry.schedule(&dir, Duration::MAX);
        registry.schedule(&dir, Duration::from_secs(u64::MAX));

        assert!(dir.exists());
        assert_eq!(registry.pending(), vec![dir.clone()]);

        registry.shutdown();
        assert!(!dir.exists());
    }

    #[test]
    fn test_drop_drains_pending() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_dir(root.path(), "ws");

        {
            let registry = CleanupRegistry::new().unwrap();
            registry.schedule(&dir, Duration::from_secs(300));
        }

        assert!(!dir.exists());
    }

    #[test]
    fn test_already_removed_directory_is_ignored() {
        let root = tempfile::tempdir().unwrap();
        let dir = make_dir(root.path(), "ws");
        let registry = CleanupRegistry::new().unwrap();

        registry.schedule(&dir, Duration::from_millis(20));
        fs::remove_dir_all(&dir).unwrap();

        thread::sleep(Duration::from_millis(100));
        assert_eq!(registry.pending_count(), 0);
    }
}
