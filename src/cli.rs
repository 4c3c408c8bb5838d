use crate::config::AuthMode;
use crate::controller::ExecutionMode;
use crate::engine::OperationKind;
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "cmscale")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Scale a managed cluster up or down through its control plane", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (KEY=VALUE lines)
    #[arg(long, global = true, env = "CMSCALE_CONFIG")]
    pub config: Option<String>,

    /// Host list, one hostname per line
    #[arg(long, global = true, env = "CMSCALE_HOSTS")]
    pub hosts: Option<String>,

    /// Checkpoint file used to resume an interrupted run
    #[arg(long, global = true, env = "CMSCALE_STATE_FILE")]
    pub state_file: Option<String>,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add the listed hosts to the cluster
    #[command(name = "scaleup")]
    ScaleUp(ScaleArgs),

    /// Remove the listed hosts from the cluster
    #[command(name = "scaledown")]
    ScaleDown(ScaleArgs),

    /// Show the saved checkpoint
    Status,

    /// Delete the saved checkpoint
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// Operation kind for the scale subcommands.
    pub fn operation(&self) -> Option<(OperationKind, &ScaleArgs)> {
        match self {
            Self::ScaleUp(args) => Some((OperationKind::ScaleUp, args)),
            Self::ScaleDown(args) => Some((OperationKind::ScaleDown, args)),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ScaleArgs {
    /// SSH authentication used to install agents
    #[arg(long, value_enum, default_value_t = AuthMode::Password)]
    pub auth_mode: AuthMode,

    /// Run for real, simulate every call, or only show the plan
    #[arg(long, value_enum, default_value_t = ExecutionMode::Run)]
    pub mode: ExecutionMode,

    /// Continue from the saved checkpoint
    #[arg(
        long,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    pub resume: bool,
}

/// Exit code for a failed parse. Help and version requests succeed; any
/// other parse failure is a usage error and exits like every other failure.
pub fn parse_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cmscale").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scaleup_defaults() {
        let cli = parse(&["scaleup"]).unwrap();
        let (kind, args) = cli.command.operation().unwrap();
        assert_eq!(kind, OperationKind::ScaleUp);
        assert_eq!(args.mode, ExecutionMode::Run);
        assert_eq!(args.auth_mode, AuthMode::Password);
        assert!(!args.resume);
    }

    #[test]
    fn test_scaledown_flags() {
        let cli = parse(&[
            "scaledown",
            "--mode",
            "dry-run",
            "--resume",
            "--hosts",
            "/tmp/hosts",
        ])
        .unwrap();
        let (kind, args) = cli.command.operation().unwrap();
        assert_eq!(kind, OperationKind::ScaleDown);
        assert_eq!(args.mode, ExecutionMode::DryRun);
        assert!(args.resume);
        assert_eq!(cli.hosts.as_deref(), Some("/tmp/hosts"));
    }

    #[test]
    fn test_resume_accepts_explicit_value() {
        let cli = parse(&["scaleup", "--resume", "false", "--auth-mode", "key"]).unwrap();
        let (_, args) = cli.command.operation().unwrap();
        assert!(!args.resume);
        assert_eq!(args.auth_mode, AuthMode::Key);
    }

    #[test]
    fn test_unknown_action_is_usage_error() {
        let err = parse(&["scalesideways"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        assert_eq!(parse_exit_code(&err), 1);

        let err = parse(&["scaleup", "--mode", "maybe"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        assert_eq!(parse_exit_code(&err), 1);

        let err = parse(&[]).err().unwrap();
        assert_eq!(parse_exit_code(&err), 1);
    }

    #[test]
    fn test_help_and_version_exit_cleanly() {
        assert_eq!(parse_exit_code(&parse(&["--help"]).err().unwrap()), 0);
        assert_eq!(parse_exit_code(&parse(&["--version"]).err().unwrap()), 0);
    }
}
