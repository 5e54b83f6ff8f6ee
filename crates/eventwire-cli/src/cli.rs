//! Command-line interface definitions and parsing

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// http service address [default: localhost:8080]
    #[arg(long)]
    pub addr: Option<String>,

    /// Project ID for the telemetry sink; unset disables reporting
    #[arg(long)]
    pub project: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["wsclient"]);
        assert!(cli.addr.is_none());
        assert!(cli.project.is_none());
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "wsclient",
            "--addr",
            "10.0.0.5:9000",
            "--project",
            "demo",
            "-v",
            "-c",
            "client.toml",
        ]);
        assert_eq!(cli.addr.as_deref(), Some("10.0.0.5:9000"));
        assert_eq!(cli.project.as_deref(), Some("demo"));
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("client.toml"));
    }
}
