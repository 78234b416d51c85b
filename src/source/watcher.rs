//! Script File Watcher
//!
//! Drops the cached copy of a file-backed PAC script when the file changes,
//! so the next resolution reads the new version.

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ScriptSource;
use crate::Result;
use anyhow::{bail, Context};

/// Watches the file behind a [`ScriptSource`]
pub struct ScriptWatcher {
    script_path: PathBuf,
    invalidator: JoinHandle<()>,
    _watcher: RecommendedWatcher,
}

impl ScriptWatcher {
    /// Start watching; must be called from within a Tokio runtime
    pub fn new(source: Arc<ScriptSource>) -> Result<Self> {
        let script_path = match source.location().file_path() {
            Some(path) => path.clone(),
            None => bail!(
                "Only file-backed PAC scripts can be watched, got {}",
                source.location()
            ),
        };

        let (change_tx, mut change_rx) = mpsc::unbounded_channel::<()>();
        let path_clone = script_path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if Self::affects_script(&event, &path_clone) {
                        let _ = change_tx.send(());
                    }
                }
                Err(e) => error!("Script watcher error: {}", e),
            },
            NotifyConfig::default(),
        )
        .context("Failed to create script file watcher")?;

        // Watch the directory: editors often replace the file instead of writing it in place.
        let parent_dir = match script_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&parent_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", parent_dir.display()))?;

        info!(
            "Watching PAC script {} for changes",
            script_path.display()
        );

        let invalidator = tokio::spawn(async move {
            while change_rx.recv().await.is_some() {
                source.invalidate().await;
            }
            debug!("Script watcher channel closed");
        });

        Ok(Self {
            script_path,
            invalidator,
            _watcher: watcher,
        })
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    fn affects_script(event: &Event, script_path: &Path) -> bool {
        let touches_script = event
            .paths
            .iter()
            .any(|path| path.file_name() == script_path.file_name());

        if !touches_script {
            return false;
        }

        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) => true,
            EventKind::Remove(_) => {
                warn!(
                    "PAC script file was removed: {}",
                    script_path.display()
                );
                true
            }
            _ => false,
        }
    }
}

impl Drop for ScriptWatcher {
    fn drop(&mut self) {
        self.invalidator.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[tokio::test]
    async fn test_watcher_rejects_remote_and_inline_sources() {
        let source = Arc::new(ScriptSource::from_text(
            "function FindProxyForURL(u, h) { return 'DIRECT'; }",
            Arc::new(SystemClock),
        ));
        assert!(ScriptWatcher::new(source).is_err());
    }

    #[test]
    fn test_affects_script_matches_file_name() {
        let script = PathBuf::from("/tmp/pac/proxy.pac");
        let event = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("/tmp/pac/proxy.pac"));
        assert!(ScriptWatcher::affects_script(&event, &script));

        let other = Event::new(EventKind::Create(notify::event::CreateKind::File))
            .add_path(PathBuf::from("/tmp/pac/other.pac"));
        assert!(!ScriptWatcher::affects_script(&other, &script));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/tmp/pac/proxy.pac"));
        assert!(!ScriptWatcher::affects_script(&access, &script));
    }
}
