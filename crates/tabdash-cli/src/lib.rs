//! Shared CLI definitions for tabdash.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};

/// Verbosity of the log output written to stderr
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Errors and warnings
    Warn,
    /// Startup, session and request summaries (default)
    Info,
    /// Every control change and rule evaluation
    Debug,
    /// Everything, including HTTP client internals
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Command-line arguments for tabdash
#[derive(Clone, Parser, Debug, Default)]
#[command(
    name = "tabdash",
    version,
    about = "Interactive penguin and wine data dashboard",
    long_about = "Loads the penguins and wine datasets at startup and serves a three-tab \
                  dashboard (tables, charts, notes, upload preview and an API-call proxy) \
                  as a JSON API.\n\nSecurity: the API-call tab performs an HTTP GET to any \
                  URL a client supplies. Do not expose the server on untrusted networks."
)]
pub struct Args {
    /// Address to listen on (default: 127.0.0.1)
    #[arg(long = "host", value_name = "ADDR")]
    pub host: Option<String>,

    /// Port to listen on (default: 5000)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// URL or local path of the penguins CSV (default: seaborn-data penguins.csv on GitHub)
    #[arg(long = "penguins-url", value_name = "URL")]
    pub penguins_url: Option<String>,

    /// URL or local path of a wine dataset to use instead of the bundled one (scikit-learn wine_data.csv layout or a CSV with a WineType column)
    #[arg(long = "wine-source", value_name = "URL")]
    pub wine_source: Option<String>,

    /// Timeout in seconds for requests made by the API-call tab (default: 10)
    #[arg(long = "api-timeout", value_name = "SECS")]
    pub api_timeout: Option<u64>,

    /// Log verbosity; RUST_LOG takes precedence when set
    #[arg(long = "log-level", value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Generate default configuration file at ~/.config/tabdash/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let mut parts = Vec::new();
        if let Some(s) = arg.get_short() {
            parts.push(format!("-{s}"));
        }
        if let Some(l) = arg.get_long() {
            parts.push(format!("--{l}"));
        }
        let op = parts.join(", ");
        let placeholder: String = if arg.get_action().takes_values() {
            arg.get_value_names()
                .map(|names| {
                    names
                        .iter()
                        .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default()
        } else {
            String::new()
        };
        let option_str = if placeholder.is_empty() {
            op
        } else {
            format!("{op} {placeholder}")
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_server_flags() {
        let args = Args::parse_from(["tabdash", "--host", "0.0.0.0", "-p", "8050"]);
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(8050));
        assert!(!args.generate_config);
    }

    #[test]
    fn force_requires_generate_config() {
        assert!(Args::try_parse_from(["tabdash", "--force"]).is_err());
        let args = Args::parse_from(["tabdash", "--generate-config", "--force"]);
        assert!(args.generate_config && args.force);
    }

    #[test]
    fn log_level_directive() {
        let args = Args::parse_from(["tabdash", "--log-level", "debug"]);
        assert_eq!(args.log_level.map(|l| l.as_str()), Some("debug"));
    }

    #[test]
    fn options_markdown_lists_flags() {
        let md = render_options_markdown();
        assert!(md.contains("| `-p, --port <PORT>` |"));
        assert!(md.contains("--generate-config"));
        assert!(!md.contains("`--help`"));
    }
}
