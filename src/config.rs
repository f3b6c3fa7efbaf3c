//! Command line options.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::util::getenv;
use crate::warn;
use crate::wicket::{compose::EngineConfig, substitute::UndefinedVariables};

#[derive(clap::Parser, Debug, Clone)]
/// Serve HTML mockups composed from Wicket style markup fragments:
/// pages extending other pages, panels included into pages, and
/// `[variable]` placeholders filled from the query string.
pub struct Opts {
    /// Require HTTP basic auth for all requests except static files.
    #[clap(short, long)]
    pub auth: bool,

    /// The user name for --auth.
    #[clap(long, default_value = "user")]
    pub auth_user: String,

    /// The password for --auth.
    #[clap(long, default_value = "password")]
    pub auth_password: String,

    /// Markdown file shown (as HTML) at `/`.
    #[clap(long, alias = "entryPage", default_value = "README.md")]
    pub entry_page: PathBuf,

    /// Directory whose files are served as they are, before any
    /// other route is tried.
    #[clap(long, alias = "expressRoot", default_value = ".")]
    pub static_root: PathBuf,

    /// Directory served below `/doc`, with directory listings.
    #[clap(long, default_value = "doc")]
    pub doc_root: PathBuf,

    /// Add the live reload client script to HTML pages.
    #[clap(short, long)]
    pub reload: bool,

    /// Port of the live reload server.
    #[clap(long, alias = "reloadPort", default_value_t = 35729)]
    pub reload_port: u16,

    /// Add highlight.js syntax highlighting to composed pages.
    #[clap(short, long)]
    pub code: bool,

    /// Start the HTTP server; without it, only the options and
    /// directories are checked.
    #[clap(short, long)]
    pub server: bool,

    /// Port to listen on (see also LISTEN_HTTP).
    #[clap(long, alias = "serverPort", default_value_t = 3000)]
    pub server_port: u16,

    /// Address to listen on.
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory searched for fragments (pages, panels, ancestors);
    /// can be given multiple times, earlier ones win. Must cover
    /// --template-scope.
    #[clap(long, alias = "templateExpansion", default_value = "test/templates",
           multiple_occurrences(true))]
    pub template_expansion: Vec<PathBuf>,

    /// Directory whose pages, panels and dialogs are listed.
    #[clap(long, alias = "templateScope", default_value = "test/templates/package-a")]
    pub template_scope: PathBuf,

    /// What to do with `[name]` placeholders for unset variables:
    /// "empty", "keep" or "fail".
    #[clap(long, default_value = "empty")]
    pub undefined_vars: UndefinedVariables,

    /// Limit for panel inclusions while rendering one fragment.
    #[clap(long, default_value_t = 1000)]
    pub max_panel_inclusions: usize,

    /// Write access.log and error.log into this directory instead of
    /// to stderr.
    #[clap(long)]
    pub log_dir: Option<PathBuf>,

    /// Print timings and more information.
    #[clap(short, long)]
    pub verbose: bool,
}

fn is_below(path: &Path, root: &Path) -> bool {
    match (path.canonicalize(), root.canonicalize()) {
        (Ok(path), Ok(root)) => path.starts_with(root),
        _ => path.starts_with(root),
    }
}

impl Opts {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            undefined_variables: self.undefined_vars,
            max_panel_inclusions: self.max_panel_inclusions,
        }
    }

    /// `LISTEN_HTTP` if set, otherwise from --host and --server-port.
    pub fn listen_addr(&self) -> Result<String> {
        Ok(getenv("LISTEN_HTTP")?.unwrap_or_else(
            || format!("{}:{}", self.host, self.server_port)))
    }

    pub fn basic_auth(&self) -> Option<(String, String)> {
        if self.auth {
            Some((self.auth_user.clone(), self.auth_password.clone()))
        } else {
            None
        }
    }

    /// Fail if there's nowhere to find fragments, warn about other
    /// missing paths.
    pub fn check(&self) -> Result<()> {
        if self.template_expansion.is_empty() {
            bail!("need at least one --template-expansion directory")
        }
        for dir in &self.template_expansion {
            if !dir.is_dir() {
                bail!("--template-expansion directory {dir:?} does not exist")
            }
        }
        if !self.template_scope.is_dir() {
            warn!("--template-scope directory {:?} does not exist", self.template_scope);
        } else if !self.template_expansion.iter().any(|root| is_below(&self.template_scope, root)) {
            warn!("--template-scope {:?} is not below any --template-expansion directory, \
                   its fragments may not be found", self.template_scope);
        }
        if !self.entry_page.is_file() {
            warn!("--entry-page {:?} does not exist", self.entry_page);
        }
        if self.max_panel_inclusions == 0 {
            warn!("--max-panel-inclusions is 0, no panel can be included");
        }
        Ok(())
    }
}
