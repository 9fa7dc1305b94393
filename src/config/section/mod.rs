//! Configuration sections of `mindwatch.toml`.

mod render;
mod serve;
mod watch;

pub use render::RenderConfig;
pub use serve::ServeConfig;
pub use watch::WatchConfig;
