//! `[render]` section configuration.
//!
//! ```toml
//! [render]
//! title = "Roadmap"     # Page title (default: input file stem)
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub title: Option<String>,
}

impl RenderConfig {
    /// Configured title, or the stem of `input`.
    pub fn title_for(&self, input: &Path) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty() && s != "-")
            .unwrap_or_else(|| "mindwatch".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_title_defaults_to_file_stem() {
        let config = test_parse_config("");
        assert_eq!(config.render.title_for(Path::new("docs/roadmap.md")), "roadmap");
        assert_eq!(config.render.title_for(Path::new("-")), "mindwatch");
    }

    #[test]
    fn test_configured_title_wins() {
        let config = test_parse_config("[render]\ntitle = \"Plan\"");
        assert_eq!(config.render.title_for(Path::new("roadmap.md")), "Plan");
    }
}
