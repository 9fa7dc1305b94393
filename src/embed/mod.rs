//! Embedded page templates.
//!
//! - `template` - Template types for typed variable injection
//! - `preview` - The mind-map page (`shell.html`) and its poll loop (`poll.js`)
//!
//! ```ignore
//! use embed::preview::{self, PollVars};
//!
//! let page = preview::render_page(&artifact, "notes", Some(PollVars { ts, poll_delay: 300 }))?;
//! ```

mod template;

pub use template::{Template, TemplateVars, substitute};

pub mod preview {
    use super::{Template, TemplateVars, substitute};
    use crate::sync::{Artifact, Version};
    use crate::transform::{FeatureTag, Features};
    use crate::utils::html::{escape, script_safe_json};

    /// Variables for shell.html.
    pub struct ShellVars {
        pub title: String,
        pub features: Features,
        /// Serialized artifact (`{ts, root, features}`)
        pub data_json: String,
        /// Poll loop, empty for static renders
        pub poll_script: String,
    }

    impl TemplateVars for ShellVars {
        fn apply(&self, content: &str) -> String {
            let title = escape(&self.title);
            let data = script_safe_json(&self.data_json);
            // A live page may receive math in a later tree
            let live = !self.poll_script.is_empty();
            let styles = feature_styles(&self.features, live);
            let scripts = feature_scripts(&self.features, live);
            let poll = if self.poll_script.is_empty() {
                String::new()
            } else {
                format!("<script>\n{}</script>", self.poll_script)
            };
            substitute(
                content,
                &[
                    ("__MINDWATCH_TITLE__", &*title),
                    ("__MINDWATCH_STYLES__", styles.as_str()),
                    ("__MINDWATCH_SCRIPTS__", scripts.as_str()),
                    ("__MINDWATCH_DATA__", &*data),
                    ("__MINDWATCH_POLL__", poll.as_str()),
                ],
            )
        }
    }

    /// Mind-map page.
    pub const SHELL_HTML: Template<ShellVars> = Template::new(include_str!("preview/shell.html"));

    /// Variables for poll.js.
    pub struct PollVars {
        /// Version the page was rendered with
        pub ts: Version,
        /// Pause between polls (ms)
        pub poll_delay: u64,
    }

    impl TemplateVars for PollVars {
        fn apply(&self, content: &str) -> String {
            let ts = self.ts.to_string();
            let delay = self.poll_delay.to_string();
            substitute(
                content,
                &[
                    ("__MINDWATCH_TS__", ts.as_str()),
                    ("__MINDWATCH_POLL_DELAY__", delay.as_str()),
                ],
            )
        }
    }

    /// Client poll loop against `/data?ts=`.
    pub const POLL_JS: Template<PollVars> = Template::new(include_str!("preview/poll.js"));

    /// Render the page for `artifact`, with a poll loop when `poll` is set.
    pub fn render_page(
        artifact: &Artifact,
        title: &str,
        poll: Option<PollVars>,
    ) -> serde_json::Result<String> {
        let vars = ShellVars {
            title: title.to_string(),
            features: artifact.payload.features.clone(),
            data_json: serde_json::to_string(artifact)?,
            poll_script: poll.map(|vars| POLL_JS.render(&vars)).unwrap_or_default(),
        };
        Ok(SHELL_HTML.render(&vars))
    }

    const KATEX_CSS: &str = "https://cdn.jsdelivr.net/npm/katex@0.12.0/dist/katex.min.css";
    const KATEX_JS: &str = "https://cdn.jsdelivr.net/npm/katex@0.12.0/dist/katex.min.js";
    const PRISM_CSS: &str = "https://cdn.jsdelivr.net/npm/prismjs@1.23.0/themes/prism.css";

    fn needs_katex(features: &Features, live: bool) -> bool {
        live || features.contains(FeatureTag::Katex)
    }

    /// Stylesheets needed by the features a tree uses.
    fn feature_styles(features: &Features, live: bool) -> String {
        let mut links = Vec::new();
        if needs_katex(features, live) {
            links.push(KATEX_CSS);
        }
        if features.contains(FeatureTag::Prism) {
            links.push(PRISM_CSS);
        }
        links
            .into_iter()
            .map(|href| format!("<link rel=\"stylesheet\" href=\"{href}\">"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Scripts the page loads before building the map.
    fn feature_scripts(features: &Features, live: bool) -> String {
        if needs_katex(features, live) {
            format!("<script src=\"{KATEX_JS}\"></script>")
        } else {
            String::new()
        }
    }

}
