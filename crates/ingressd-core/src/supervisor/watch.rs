//! Template and geoip-directory watchers.
//!
//! File-change notifications enqueue a dummy task so the next
//! reconciliation rebuilds and reloads, rather than trying to interpret
//! what about the template changed.

use crate::queue::WorkQueue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::time::{interval, Duration};

/// Polls the filesystem for modification-time changes on a fixed interval
/// and enqueues a dummy work item whenever something changes.
pub struct FileWatcher {
    paths: Vec<PathBuf>,
    poll_interval: Duration,
}

impl FileWatcher {
    /// Watches the template file plus every entry currently under the
    /// geoip directory.
    pub fn new(template_path: impl Into<PathBuf>, geoip_dir: impl Into<PathBuf>) -> Self {
        let mut paths = vec![template_path.into()];
        let geoip_dir = geoip_dir.into();
        if let Ok(entries) = std::fs::read_dir(&geoip_dir) {
            paths.extend(entries.filter_map(|e| e.ok()).map(|e| e.path()));
        }
        Self { paths, poll_interval: Duration::from_secs(5) }
    }

    /// Spawns the background polling task, enqueueing `"file-watch"` on
    /// the given queue whenever any watched path's mtime changes.
    pub fn spawn(self, queue: Arc<WorkQueue>) {
        tokio::spawn(async move {
            let mut tick = interval(self.poll_interval);
            let mut last_modified: Vec<Option<SystemTime>> =
                self.paths.iter().map(|p| modified_time(p)).collect();

            loop {
                tick.tick().await;
                if queue.is_shutting_down() {
                    return;
                }

                for (path, last) in self.paths.iter().zip(last_modified.iter_mut()) {
                    let current = modified_time(path);
                    if current != *last {
                        log::info!("watched file '{}' changed, enqueuing rebuild", path.display());
                        queue.enqueue_skippable("file-watch").await;
                        *last = current;
                    }
                }
            }
        });
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[tokio::test]
    async fn detects_template_change_and_enqueues() {
        let dir = tempdir().unwrap();
        let template_path = dir.path().join("nginx.tmpl");
        std::fs::write(&template_path, "initial").unwrap();
        let geoip_dir = dir.path().join("geoip");
        std::fs::create_dir(&geoip_dir).unwrap();

        let queue = Arc::new(WorkQueue::new());
        let watcher = FileWatcher { paths: vec![template_path.clone()], poll_interval: Duration::from_millis(20) };
        watcher.spawn(queue.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        let mut file = std::fs::OpenOptions::new().append(true).open(&template_path).unwrap();
        writeln!(file, "changed").unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        queue.shutdown();
        let item = queue.pop().await;
        assert!(item.is_some());
    }
}
