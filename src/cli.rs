use clap::Parser;

use crate::suite::SuiteKind;

pub const DEFAULT_CONFIG_PATH: &str = "livros-smoke.toml";

/// Smoke tests for the livros book catalog API
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML config file. Without this flag `livros-smoke.toml` is read if it
    /// exists
    #[arg(short, long)]
    pub config: Option<String>,

    /// Collection URL of the catalog, e.g. http://localhost:3000/api/livros
    #[arg(short = 'u', long)]
    pub base_url: Option<String>,

    /// Which built-in suite to run
    #[arg(short, long, value_enum)]
    pub suite: Option<SuiteKind>,

    /// Exit with a non-zero status when a step fails
    #[arg(long)]
    pub strict: bool,

    /// Debug logging on stderr, unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::Cli;
    use crate::suite::SuiteKind;

    #[test]
    fn no_flags() {
        let cli = Cli::try_parse_from(["livros-smoke"]).unwrap();

        assert!(cli.config.is_none());
        assert!(cli.base_url.is_none());
        assert!(cli.suite.is_none());
        assert!(!cli.strict);
        assert!(!cli.verbose);
    }

    #[test]
    fn all_flags() {
        let cli = Cli::try_parse_from([
            "livros-smoke",
            "-c",
            "ci.toml",
            "-u",
            "http://catalog:3000/api/livros",
            "--suite",
            "quick",
            "--strict",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("ci.toml"));
        assert_eq!(
            cli.base_url.as_deref(),
            Some("http://catalog:3000/api/livros")
        );
        assert_eq!(cli.suite, Some(SuiteKind::Quick));
        assert!(cli.strict);
        assert!(cli.verbose);
    }

    #[test]
    fn unknown_suite_fails() {
        assert!(Cli::try_parse_from(["livros-smoke", "--suite", "slow"]).is_err());
    }
}
