//! CLI definitions for fenix-inject.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// fenix-inject CLI.
#[derive(Parser)]
#[command(name = "fenix-inject")]
#[command(about = "Inject a custom addon collection into Android Firefox")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Rebuild the manifest even if the cached copy is still fresh
    #[arg(long, global = true)]
    pub force: bool,

    /// Android device serial (passed to adb -s)
    #[arg(short = 's', long, global = true)]
    pub device: Option<String>,

    /// Target package id
    #[arg(short, long, global = true)]
    pub app: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Assemble the manifest and write it out (`-` for stdout)
    Build {
        /// Destination file; defaults to the configured output path
        file: Option<PathBuf>,
    },

    /// Inject an existing manifest document without rebuilding
    Inject {
        /// Manifest file; defaults to the configured output path
        file: Option<PathBuf>,
    },

    /// Build if stale, then inject (the default)
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["fenix-inject"]);
        assert!(cli.command.is_none());
        assert!(!cli.force);
        assert!(cli.device.is_none());
    }

    #[test]
    fn test_build_with_stdout_marker() {
        let cli = Cli::parse_from(["fenix-inject", "build", "-"]);
        match cli.command {
            Some(Commands::Build { file }) => assert_eq!(file.unwrap(), PathBuf::from("-")),
            _ => panic!("expected build subcommand"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "fenix-inject",
            "inject",
            "--force",
            "-s",
            "emulator-5554",
            "-a",
            "org.mozilla.fenix",
        ]);
        assert!(cli.force);
        assert_eq!(cli.device.as_deref(), Some("emulator-5554"));
        assert_eq!(cli.app.as_deref(), Some("org.mozilla.fenix"));
        assert!(matches!(cli.command, Some(Commands::Inject { file: None })));
    }
}
