use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use jsprof_core::{Analyzer, AnalyzerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Analyze a V8 CPU profile and print a JSON performance report.
#[derive(Debug, Parser)]
#[command(name = "jsprof", version)]
struct Args {
    /// Profile captured by DevTools, Puppeteer or `node --cpu-prof`.
    profile: PathBuf,

    /// Chrome trace with script evaluate/compile/call events.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// TOML file with analyzer settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report minified locations as-is.
    #[arg(long)]
    no_source_maps: bool,

    /// Number of functions in the report.
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Log debug output to stderr.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => AnalyzerConfig::default(),
        };
        if self.no_source_maps {
            config.resolve_source_maps = false;
        }
        if let Some(top) = self.top {
            config.report_limit = top;
            config.top_n = config.top_n.max(top);
        }
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<AnalyzerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.analyzer_config()?;
    let profile = std::fs::read(&args.profile)
        .with_context(|| format!("reading profile {}", args.profile.display()))?;
    let trace = match &args.trace {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("reading trace {}", path.display()))?,
        ),
        None => None,
    };

    let analyzer = Analyzer::new(config)?;
    let report = analyzer
        .analyze(&profile, trace.as_deref())
        .await
        .with_context(|| format!("analyzing {}", args.profile.display()))?;
    info!(
        functions = report.high_impact_functions.len(),
        "analysis complete"
    );

    let mut out = std::io::stdout().lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut out, &report)?;
    } else {
        serde_json::to_writer(&mut out, &report)?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_flags() {
        let args = Args::try_parse_from(["jsprof", "run.cpuprofile"]).unwrap();
        assert_eq!(args.profile, PathBuf::from("run.cpuprofile"));
        assert!(!args.pretty);
        assert_eq!(args.analyzer_config().unwrap(), AnalyzerConfig::default());
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "top_n = 30\nreport_limit = 8\n\n[resolver]\nfetch_timeout_ms = 2500"
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let args = Args::try_parse_from(["jsprof", "p.cpuprofile", "--config", path]).unwrap();
        let config = args.analyzer_config().unwrap();
        assert_eq!(config.top_n, 30);
        assert_eq!(config.report_limit, 8);
        assert_eq!(config.resolver.fetch_timeout_ms, 2500);
        assert!(config.resolve_source_maps);

        let args = Args::try_parse_from([
            "jsprof",
            "p.cpuprofile",
            "--config",
            path,
            "--top",
            "50",
            "--no-source-maps",
        ])
        .unwrap();
        let config = args.analyzer_config().unwrap();
        assert_eq!(config.report_limit, 50);
        assert_eq!(config.top_n, 50);
        assert!(!config.resolve_source_maps);
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "top_n = \"many\"").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("parsing config"));
    }
}
