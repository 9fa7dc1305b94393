//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Live mind-map preview for markdown outlines
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (searched upward from the current directory)
    #[arg(short = 'C', long, global = true, default_value = "mindwatch.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render a markdown outline to a standalone HTML mind map
    #[command(visible_alias = "r")]
    Render {
        #[command(flatten)]
        common: CommonArgs,

        /// Output HTML file (default: a cache file named after the input)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Serve a live preview that follows edits to the input file
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        common: CommonArgs,

        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Arguments shared by every subcommand
#[derive(clap::Args, Debug, Clone)]
pub struct CommonArgs {
    /// Markdown file to preview (`-` reads stdin, render also takes an http(s) URL)
    #[arg(value_name = "INPUT", value_hint = clap::ValueHint::AnyPath)]
    pub input: PathBuf,

    /// Open the result in the default browser (default)
    #[arg(long, overrides_with = "no_open")]
    pub open: bool,

    /// Do not open a browser
    #[arg(long, overrides_with = "open")]
    pub no_open: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Whether to open a browser; on unless `--no-open` came last.
    pub fn should_open(&self) -> bool {
        self.open || !self.no_open
    }
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Render { common, .. } | Self::Serve { common, .. } => common,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["mindwatch", "serve", "notes.md", "-p", "8080", "-V"]).unwrap();
        let Commands::Serve { common, port, interface } = &cli.command else {
            panic!("expected serve");
        };
        assert_eq!(common.input, PathBuf::from("notes.md"));
        assert!(common.verbose);
        assert_eq!(*port, Some(8080));
        assert!(interface.is_none());
        assert_eq!(cli.config, PathBuf::from("mindwatch.toml"));
    }

    #[test]
    fn test_parse_render_alias_and_stdin() {
        let cli = Cli::try_parse_from(["mindwatch", "-C", "alt.toml", "r", "-", "-o", "out.html"]).unwrap();
        let Commands::Render { common, output } = &cli.command else {
            panic!("expected render");
        };
        assert_eq!(common.input, PathBuf::from("-"));
        assert_eq!(output.as_deref(), Some(Path::new("out.html")));
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
    }

    #[test]
    fn test_open_flags() {
        let parse = |args: &[&str]| {
            let cli = Cli::try_parse_from(args).unwrap();
            cli.command.common().should_open()
        };
        assert!(parse(&["mindwatch", "render", "a.md"]));
        assert!(!parse(&["mindwatch", "render", "a.md", "--no-open"]));
        assert!(parse(&["mindwatch", "serve", "a.md", "--no-open", "--open"]));
        assert!(!parse(&["mindwatch", "serve", "a.md", "--open", "--no-open"]));
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["mindwatch", "serve"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
