use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use log::{error, info, warn};
use tower_http::services::ServeDir;

use crate::{
    ServeArgs,
    build::{BuildResult, Builder, ChangeKind, FileWatcher, WatchEvent, WatchPaths},
};

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let config_path = super::config_path(args.config_file.as_deref())?;
    let builder = super::load_builder(&config_path)?;

    // Build the site first
    println!("Building site...");
    let result = builder.build()?;
    println!("Built {} page(s)", result.pages.len());

    let output_dir = result.output_dir.clone();

    // Set up file watcher if enabled
    let _watcher_handle = if args.watch {
        let watch_paths = WatchPaths {
            pages_dir: canonical(&builder.pages_dir()),
            templates_dir: canonical(&result.templates_dir),
            config_path: canonical(&config_path),
        };

        let watch_config = builder.config().dev.watch.clone();
        match FileWatcher::new(&watch_config, &watch_paths) {
            Ok(watcher) => {
                println!("Watching for changes...");
                Some(tokio::task::spawn_blocking(move || {
                    watch_loop(watcher, builder, result, config_path)
                }))
            }
            Err(e) => {
                warn!("failed to start file watcher: {e}");
                None
            }
        }
    } else {
        None
    };

    // Create the static file server
    let serve_dir = ServeDir::new(&output_dir).append_index_html_on_directories(true);
    let app = Router::new().fallback_service(serve_dir);

    // Parse the address
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    // Determine the URL to display
    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, args.port);

    println!("\nServing site at {}", url);
    println!("Press Ctrl+C to stop\n");

    // Open browser if requested
    if args.open
        && let Err(e) = open::that(&url)
    {
        warn!("failed to open browser: {e}");
    }

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Rebuild on every batch of changes until the watcher stops.
fn watch_loop(
    watcher: FileWatcher,
    mut builder: Builder,
    mut last: BuildResult,
    config_path: PathBuf,
) {
    while let Some(event) = watcher.recv() {
        match event {
            WatchEvent::FilesChanged(changes) => {
                info!("detected {} change(s), rebuilding", changes.len());

                if changes.contains(&ChangeKind::Config) {
                    match super::load_builder(&config_path) {
                        Ok(reloaded) => builder = reloaded,
                        Err(e) => {
                            error!("config error: {e}");
                            continue;
                        }
                    }
                }

                match builder.rebuild(&last, &changes) {
                    Ok(result) => {
                        println!(
                            "Rebuilt {} page(s), copied {} asset(s)",
                            result.pages.len(),
                            result.assets.len()
                        );
                        last = result;
                    }
                    Err(e) => error!("build error: {e}"),
                }
            }
            WatchEvent::Error(e) => {
                error!("watch error: {e}");
            }
        }
    }
}

/// Canonicalize a path to ensure consistent matching with file events.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
