//! Server lifecycle management.

use crate::{debug, log, sync::VersionedCache};
use anyhow::{Result, anyhow};
use crossbeam::channel::Receiver;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tiny_http::Server;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// How long shutdown waits for background work.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some((port, e)),
        }
    }

    Err(match last_error {
        Some((port, e)) => anyhow!(
            "Failed to bind after {} attempts (ports {}-{}): {}",
            MAX_PORT_RETRIES,
            base_port,
            port,
            e
        ),
        None => anyhow!("no usable port at or above {}", base_port),
    })
}

/// Release long-poll waiters as soon as shutdown is requested.
pub fn spawn_waiter_release(
    shutdown_rx: Receiver<()>,
    cache: Arc<VersionedCache>,
) -> Option<JoinHandle<()>> {
    thread::Builder::new()
        .name("shutdown".into())
        .spawn(move || {
            if shutdown_rx.recv().is_ok() {
                let released = cache.notifier().close();
                debug!("serve"; "released {} pending poll(s)", released);
            }
        })
        .ok()
}

/// Wait for background shutdown work (max 2 seconds).
pub fn wait_for_shutdown(handle: Option<JoinHandle<()>>, cache: &VersionedCache) {
    if !cache.wait_idle(SHUTDOWN_GRACE) {
        debug!("serve"; "recompute still running at exit");
    }

    let Some(handle) = handle else { return };
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
