//! CLI entrypoint and argument definitions (§6 Config surface), following
//! `shelter`'s `Cli`/`AdditionalArgs` split between the thing being run and
//! the cross-cutting flags that apply regardless.

use std::path::PathBuf;

/// Cross-cutting flags that shape every run regardless of which sources end
/// up enabled (mirrors `AdditionalArgs`' `global = true` flatten pattern).
#[derive(Debug, Clone, clap::Args)]
pub struct AdditionalArgs {
    /// Enable AXFR zone-transfer attempts and widen the reverse-DNS sweep window (§4.4/§4.6).
    #[arg(long = "active", global = true)]
    pub active_mode: bool,

    /// Recursive resolver to use, in `host:port` form. Repeatable; overrides the built-in default list.
    #[arg(long = "resolver", global = true)]
    pub resolvers: Vec<String>,

    /// Name of a source to skip (matched against `SourceWorker::name`). Repeatable.
    #[arg(long = "disable-source", global = true)]
    pub disabled_sources: Vec<String>,

    /// Sinkhole blacklist CIDR to screen A answers against. Repeatable; overrides the compiled-in default.
    #[arg(long = "blacklist", global = true)]
    pub blacklist: Vec<String>,

    /// Cap on concurrent in-flight DNS transactions across the resolver pool.
    #[arg(long = "max-dns-queries", default_value_t = 2_000, global = true)]
    pub max_dns_queries: usize,

    /// Emit a record (with empty addresses) for every in-scope name that never resolved.
    #[arg(long = "include-unresolvable", global = true)]
    pub include_unresolvable: bool,

    /// Optional JSON config file; CLI flags take precedence over anything it sets.
    #[arg(long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    /// Write newline-delimited JSON output here instead of stdout.
    #[arg(long = "output", global = true)]
    pub output_file: Option<PathBuf>,

    /// Feed an already-known name directly into the resolution pipeline, bypassing source workers. Repeatable.
    #[arg(long = "also-resolve", global = true)]
    pub also_resolve: Vec<String>,
}

/// Top-level CLI entrypoint and argument definitions for the `enumctl` binary.
#[derive(Debug, clap::Parser)]
#[command(version, about = "Passive + active subdomain enumeration")]
pub struct Cli {
    /// Root domains to enumerate.
    #[arg(required = true)]
    pub root_domains: Vec<String>,

    #[command(flatten)]
    pub additional_args: AdditionalArgs,
}

impl AdditionalArgs {
    /// Log the run's effective configuration before any network activity starts.
    pub fn log_summary(&self, root_domains: &[String]) {
        log::info!("enumerating {} root domain(s): {}", root_domains.len(), root_domains.join(", "));
        if self.active_mode {
            log::info!("active mode: AXFR/NSEC walking enabled, reverse sweep window widened");
        }
        if !self.disabled_sources.is_empty() {
            log::info!("disabled sources: {}", self.disabled_sources.join(", "));
        }
        if let Some(path) = &self.config_file {
            log::info!("loading config file: {}", path.display());
        }
    }
}

