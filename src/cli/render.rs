//! One-shot render to a standalone HTML file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::Input;
use crate::config::PreviewConfig;
use crate::embed::preview;
use crate::log;
use crate::sync::Artifact;
use crate::transform::{MarkdownTransformer, Transformer};
use crate::utils::{browser, hash};

/// Fallback when there is no home directory.
const FALLBACK_OUTPUT: &str = "mindwatch.html";

/// Render `input` (a file, `-` for stdin, or an http(s) URL) and write the
/// page. Returns the path written.
pub fn render(
    config: &PreviewConfig,
    input: &Path,
    output: Option<&Path>,
    open: bool,
) -> Result<PathBuf> {
    let source = Input::classify(input);
    let content = source.read()?;

    let page = render_html(config, input, &content)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output(&source.key(), cache_dir()),
    };
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    fs::write(&output, page).with_context(|| format!("failed to write `{}`", output.display()))?;

    log!("render"; "{}", output.display());
    if open {
        browser::open_in_browser(&output);
    }
    Ok(output)
}

/// Transform `content` and fill the page without a poll loop.
fn render_html(config: &PreviewConfig, input: &Path, content: &str) -> Result<String> {
    let payload = MarkdownTransformer.transform(content)?;
    let artifact = Artifact::new(config.watch.clock.next(None), payload);
    let title = config.render.title_for(input);
    Ok(preview::render_page(&artifact, &title, None)?)
}

/// `~/.cache/mindwatch`, if a home directory is known.
fn cache_dir() -> Option<PathBuf> {
    let expanded = shellexpand::tilde("~/.cache/mindwatch");
    (!expanded.starts_with('~')).then(|| PathBuf::from(expanded.as_ref()))
}

fn default_output(key: &str, cache_dir: Option<PathBuf>) -> PathBuf {
    match cache_dir {
        Some(dir) => dir.join(format!("{}.html", hash::fingerprint(key, 16))),
        None => PathBuf::from(FALLBACK_OUTPUT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_render_writes_explicit_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("plan.md");
        fs::write(&input, "# Plan\n## Ship").unwrap();
        let output = dir.path().join("out").join("plan.html");

        let written = render(&PreviewConfig::default(), &input, Some(&output), false).unwrap();
        assert_eq!(written, output);

        let page = fs::read_to_string(&output).unwrap();
        assert!(page.contains("<title>plan</title>"));
        assert!(page.contains("Ship"));
        assert!(!page.contains("/data?ts="));
    }

    #[test]
    fn test_render_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let err = render(
            &PreviewConfig::default(),
            &dir.path().join("missing.md"),
            Some(&dir.path().join("out.html")),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing.md"));
    }

    #[test]
    fn test_render_html_uses_configured_title() {
        let mut config = PreviewConfig::default();
        config.render.title = Some("Roadmap".into());
        let page = render_html(&config, Path::new("-"), "# A").unwrap();
        assert!(page.contains("<title>Roadmap</title>"));
    }

    #[test]
    fn test_default_output_names() {
        let cache = PathBuf::from("/home/u/.cache/mindwatch");
        let a = default_output("/notes/a.md", Some(cache.clone()));
        let b = default_output("/notes/b.md", Some(cache.clone()));

        assert!(a.starts_with(&cache));
        assert_eq!(a.extension().unwrap(), "html");
        assert_ne!(a, b);
        assert_eq!(a, default_output("/notes/a.md", Some(cache)));
        assert_eq!(default_output("/notes/a.md", None), PathBuf::from(FALLBACK_OUTPUT));
    }

    #[test]
    fn test_render_fetches_url_input() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}/roadmap.md", server.server_addr().to_ip().unwrap());
        let remote = thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let body = "# Roadmap\n## Launch";
                let _ = request.respond(tiny_http::Response::from_string(body));
            }
        });

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("roadmap.html");
        render(&PreviewConfig::default(), Path::new(&url), Some(&output), false).unwrap();
        remote.join().unwrap();

        let page = fs::read_to_string(&output).unwrap();
        assert!(page.contains("<title>roadmap</title>"));
        assert!(page.contains("Launch"));
    }
}
