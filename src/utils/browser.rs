//! Opening results in the default browser.

use std::ffi::OsStr;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::{debug, log};

/// Open `target` (a file or URL) without waiting for the browser.
///
/// Failure is logged and otherwise ignored; the result is still on disk or
/// being served.
pub fn open_in_browser(target: impl AsRef<OsStr>) {
    let target = target.as_ref();
    match open::that_detached(target) {
        Ok(()) => debug!("open"; "opened {}", target.to_string_lossy()),
        Err(e) => log!("open"; "could not open {}: {}", target.to_string_lossy(), e),
    }
}

/// URL a local browser can reach for a server bound to `addr`.
///
/// Wildcard binds are reached over loopback.
pub fn local_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}/", SocketAddr::new(ip, addr.port()))
}
