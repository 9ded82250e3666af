//! File watching for automatic rebuilds.
//!
//! Uses `notify-debouncer-full` to watch the pages root (page sources and
//! their assets), the templates directory and the config file for changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{
    Config as NotifyConfig, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher,
};
use notify_debouncer_full::{
    DebounceEventResult, Debouncer, RecommendedCache, new_debouncer, new_debouncer_opt,
};

use super::cache::ChangeKind;
use super::page::ContentKind;
use crate::config::WatchConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

// =============================================================================
// Watch events
// =============================================================================

/// Events sent from the file watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// Files changed, rebuild needed.
    FilesChanged(Vec<ChangeKind>),
    /// Watcher error occurred.
    Error(String),
}

// =============================================================================
// Path classification
// =============================================================================

/// Paths to watch for changes.
pub struct WatchPaths {
    /// Pages root.
    pub pages_dir: PathBuf,
    /// Templates directory (for layout changes).
    pub templates_dir: PathBuf,
    /// Config file path.
    pub config_path: PathBuf,
}

/// Classifies file paths into change types.
#[derive(Clone)]
pub struct PathClassifier {
    pages_dir: PathBuf,
    templates_dir: PathBuf,
    config_path: PathBuf,
}

impl PathClassifier {
    /// Create a new path classifier.
    pub fn new(paths: &WatchPaths) -> Self {
        Self {
            pages_dir: paths.pages_dir.clone(),
            templates_dir: paths.templates_dir.clone(),
            config_path: paths.config_path.clone(),
        }
    }

    /// Classify a changed path into a ChangeKind.
    pub fn classify(&self, path: &Path, deleted: bool) -> Option<ChangeKind> {
        if path == self.config_path {
            return Some(ChangeKind::Config);
        }

        if let Ok(relative) = path.strip_prefix(&self.templates_dir) {
            if is_hidden(relative) || path.extension().is_none_or(|e| e != "html") {
                return None;
            }
            return Some(ChangeKind::Template {
                name: relative.to_string_lossy().replace('\\', "/"),
            });
        }

        if let Ok(relative) = path.strip_prefix(&self.pages_dir) {
            if is_hidden(relative) {
                return None;
            }
            if ContentKind::from_path(path).is_some() {
                return Some(ChangeKind::Page {
                    path: path.to_path_buf(),
                    deleted,
                });
            }
            if !deleted && path.is_dir() {
                return None;
            }
            return Some(ChangeKind::Asset {
                path: path.to_path_buf(),
                deleted,
            });
        }

        None
    }
}

/// Whether any component below the watched root is hidden.
fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

// =============================================================================
// File watcher
// =============================================================================

/// A file watcher that can use either native or polling backend.
pub enum FileWatcher {
    /// Native file system watcher (recommended for local development).
    Native {
        _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
    /// Polling-based watcher (for network filesystems, Docker, etc.).
    Polling {
        _debouncer: Debouncer<PollWatcher, RecommendedCache>,
        rx: Receiver<WatchEvent>,
    },
}

impl FileWatcher {
    /// Create a new file watcher.
    pub fn new(config: &WatchConfig, paths: &WatchPaths) -> Result<Self, WatchError> {
        let debounce_timeout = Duration::from_millis(config.debounce_ms);

        // Create channel for events
        let (tx, rx) = mpsc::channel();

        // Callback to convert notify events to our WatchEvent type
        let classifier = PathClassifier::new(paths);
        let callback = move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let changes: Vec<ChangeKind> = events
                        .iter()
                        .filter_map(|event| {
                            let deleted = matches!(event.kind, EventKind::Remove(_));
                            // Only process events for actual file changes
                            if !is_relevant_event(&event.kind) {
                                return None;
                            }
                            // Classify the first path (usually there's only one)
                            event
                                .paths
                                .first()
                                .and_then(|p| classifier.classify(p, deleted))
                        })
                        .collect();

                    if !changes.is_empty() {
                        let _ = tx.send(WatchEvent::FilesChanged(changes));
                    }
                }
                Err(errors) => {
                    for e in errors {
                        let _ = tx.send(WatchEvent::Error(e.to_string()));
                    }
                }
            }
        };

        if config.poll {
            // Use polling watcher
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let notify_config = NotifyConfig::default().with_poll_interval(poll_interval);

            let mut debouncer = new_debouncer_opt::<_, PollWatcher, RecommendedCache>(
                debounce_timeout,
                None,
                callback,
                RecommendedCache::default(),
                notify_config,
            )
            .map_err(WatchError::Notify)?;

            add_watch_paths_to_debouncer(&mut debouncer, paths)?;

            Ok(FileWatcher::Polling {
                _debouncer: debouncer,
                rx,
            })
        } else {
            // Use native watcher
            let mut debouncer =
                new_debouncer(debounce_timeout, None, callback).map_err(WatchError::Notify)?;

            add_watch_paths_to_debouncer(&mut debouncer, paths)?;

            Ok(FileWatcher::Native {
                _debouncer: debouncer,
                rx,
            })
        }
    }

    /// Receive the next watch event (blocking).
    pub fn recv(&self) -> Option<WatchEvent> {
        match self {
            FileWatcher::Native { rx, .. } => rx.recv().ok(),
            FileWatcher::Polling { rx, .. } => rx.recv().ok(),
        }
    }
}

/// Add watch paths to a debouncer.
fn add_watch_paths_to_debouncer<W: Watcher, C: notify_debouncer_full::FileIdCache>(
    debouncer: &mut Debouncer<W, C>,
    paths: &WatchPaths,
) -> Result<(), WatchError> {
    if paths.pages_dir.exists() {
        debouncer.watch(&paths.pages_dir, RecursiveMode::Recursive)?;
    }

    // Watch templates directory for layout changes
    if paths.templates_dir.exists() {
        debouncer.watch(&paths.templates_dir, RecursiveMode::Recursive)?;
    }

    // Watch config file's parent directory (to catch config changes)
    if let Some(parent) = paths.config_path.parent()
        && parent.exists()
    {
        debouncer.watch(parent, RecursiveMode::NonRecursive)?;
    }

    Ok(())
}

/// Check if an event kind is relevant for rebuilds.
fn is_relevant_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PathClassifier {
        PathClassifier::new(&WatchPaths {
            pages_dir: PathBuf::from("/p/src/modules/pages"),
            templates_dir: PathBuf::from("/p/templates"),
            config_path: PathBuf::from("/p/pagemill.yaml"),
        })
    }

    #[test]
    fn test_classify_page() {
        let path = Path::new("/p/src/modules/pages/about/index.tera");
        assert_eq!(
            classifier().classify(path, true),
            Some(ChangeKind::Page {
                path: path.to_path_buf(),
                deleted: true,
            })
        );
        assert_eq!(
            classifier().classify(Path::new("/p/src/modules/pages/.draft.md"), false),
            None
        );
    }

    #[test]
    fn test_classify_asset() {
        let path = Path::new("/p/src/modules/pages/images/logo.png");
        assert_eq!(
            classifier().classify(path, false),
            Some(ChangeKind::Asset {
                path: path.to_path_buf(),
                deleted: false,
            })
        );
        assert_eq!(
            classifier().classify(Path::new("/p/src/modules/pages/.cache/x.png"), false),
            None
        );
    }

    #[test]
    fn test_classify_template() {
        let path = Path::new("/p/templates/partials/nav.html");
        assert_eq!(
            classifier().classify(path, false),
            Some(ChangeKind::Template {
                name: "partials/nav.html".to_string(),
            })
        );
        assert_eq!(
            classifier().classify(Path::new("/p/templates/style.css"), false),
            None
        );
    }

    #[test]
    fn test_classify_config_and_unknown() {
        assert_eq!(
            classifier().classify(Path::new("/p/pagemill.yaml"), false),
            Some(ChangeKind::Config)
        );
        assert_eq!(classifier().classify(Path::new("/p/README.md"), false), None);
    }

    #[test]
    fn test_relevant_events() {
        use notify::event::{CreateKind, MetadataKind};

        assert!(is_relevant_event(&EventKind::Create(CreateKind::File)));
        assert!(!is_relevant_event(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Any
        ))));
    }
}
