//! Where the markdown comes from: a file, stdin (`-`) or an http(s) URL.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::debug;
use crate::utils::path::normalize_path;

/// A classified `INPUT` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    Stdin,
    Url(Url),
    File(&'a Path),
}

impl<'a> Input<'a> {
    pub fn classify(input: &'a Path) -> Self {
        if input == Path::new("-") {
            return Self::Stdin;
        }
        match input.to_str().and_then(|s| Url::parse(s).ok()) {
            Some(url) if matches!(url.scheme(), "http" | "https") => Self::Url(url),
            _ => Self::File(input),
        }
    }

    /// Read the whole markdown source.
    pub fn read(&self) -> Result<String> {
        match self {
            Self::Stdin => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read markdown from stdin")?;
                Ok(buf)
            }
            Self::Url(url) => fetch(url),
            Self::File(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read `{}`", path.display())),
        }
    }

    /// Stable identity of the input, used to name the default output file.
    pub fn key(&self) -> String {
        match self {
            Self::Stdin => "stdin".to_string(),
            Self::Url(url) => url.to_string(),
            Self::File(path) => normalize_path(path).to_string_lossy().into_owned(),
        }
    }

    /// The local file behind this input. Only files can be watched.
    pub fn watchable(self) -> Result<&'a Path> {
        match self {
            Self::File(path) => Ok(path),
            Self::Stdin => bail!("serve needs a file to watch, not stdin"),
            Self::Url(url) => bail!("serve needs a local file to watch, not a URL ({url})"),
        }
    }
}

fn fetch(url: &Url) -> Result<String> {
    debug!("render"; "fetching {}", url);
    reqwest::blocking::get(url.as_str())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .with_context(|| format!("failed to fetch `{url}`"))
}
