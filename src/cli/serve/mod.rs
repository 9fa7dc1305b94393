//! Live preview server.
//!
//! ```text
//! SourceWatcher ──▶ VersionedCache ──▶ ChangeNotifier
//!                        ▲                  │
//!       GET /data?ts ──▶ LongPoll ◀─────────┘
//! ```
//!
//! The page at `/` is rendered once from the first build. The browser then
//! polls `/data?ts=<version>` and applies every newer tree it receives.

mod lifecycle;
mod response;
mod route;

use crate::{
    cli::Input,
    config::PreviewConfig,
    core::{is_shutdown, register_server},
    debug,
    embed::preview::{self, PollVars},
    log, logger,
    sync::{LongPoll, Version, VersionedCache},
    transform::MarkdownTransformer,
    utils::{browser, path::normalize_path},
    watch::SourceWatcher,
};
use anyhow::{Context, Result};
use crossbeam::channel;
use rayon::ThreadPool;
use std::path::Path;
use std::sync::Arc;
use tiny_http::Server;

use route::{Preview, Route};

/// A watched source with its first build done.
struct Session {
    cache: Arc<VersionedCache>,
    watcher: SourceWatcher,
    /// Page embedding the first build and the poll loop
    shell: String,
    version: Version,
}

/// Run the preview server for `input` until Ctrl+C.
pub fn serve(config: &PreviewConfig, input: &Path, open: bool) -> Result<()> {
    let source = normalize_path(Input::classify(input).watchable()?);
    let Session {
        cache,
        mut watcher,
        shell,
        version,
    } = start_session(config, &source)?;

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_server(Arc::clone(&server), shutdown_tx);
    let release = lifecycle::spawn_waiter_release(shutdown_rx, Arc::clone(&cache));

    let url = browser::local_url(addr);
    log!("serve"; "{}", url);
    logger::status_success(&format!("built {} (v{})", cache.source().display(), version));
    if open {
        browser::open_in_browser(&url);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.serve.workers)
        .thread_name(|i| format!("serve-{i}"))
        .build()
        .context("failed to create request pool")?;
    let preview = Arc::new(Preview::new(
        shell,
        LongPoll::new(Arc::clone(&cache), config.serve.timeouts()),
    ));

    run_request_loop(&server, &preview, &pool);

    watcher.stop();
    cache.notifier().close();
    lifecycle::wait_for_shutdown(release, &cache);
    debug!("serve"; "stopped after {} rebuild(s)", cache.recompute_count());
    Ok(())
}

/// Start watching `source`, then build it and render the page.
///
/// The watch is registered before the first read, so a save landing
/// during startup still triggers a rebuild.
fn start_session(config: &PreviewConfig, source: &Path) -> Result<Session> {
    let cache = VersionedCache::new(
        source,
        Arc::new(MarkdownTransformer),
        config.watch.cache_options(),
    );

    let mut watcher = SourceWatcher::new(source);
    watcher
        .start(cache.clone())
        .with_context(|| format!("failed to watch {}", source.display()))?;

    let initial = cache
        .get()
        .with_context(|| format!("initial build of {} failed", source.display()))?;
    let shell = preview::render_page(
        &initial,
        &config.render.title_for(source),
        Some(PollVars {
            ts: initial.version,
            poll_delay: config.serve.poll_delay,
        }),
    )?;

    Ok(Session {
        cache,
        watcher,
        shell,
        version: initial.version,
    })
}

/// Serve requests until the server is unblocked.
fn run_request_loop(server: &Server, preview: &Arc<Preview>, pool: &ThreadPool) {
    for request in server.incoming_requests() {
        let preview = Arc::clone(preview);
        pool.spawn(move || {
            let method = request.method().clone();
            let url = request.url().to_string();
            let head = response::is_head_request(&request);
            let route = Route::resolve(&method, &url, is_shutdown());

            let result = preview
                .reply(route, head)
                .and_then(|reply| {
                    let status = reply.status;
                    response::send(request, reply)?;
                    Ok(status)
                });
            match result {
                Ok(status) => debug!("serve"; "{} {} {}", method, url, status),
                Err(e) => log!("serve"; "request error: {e}"),
            }
        });
    }
}
