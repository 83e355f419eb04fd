//! rolegate CLI: execute privileged commands with a role-based access
//! control system.
//!
//! Pipeline: resolve identity, authenticate, load policy, resolve the
//! decision, then either report rights (`--info`) or enforce the decision,
//! sanitize the environment, secure PATH, and replace the process image
//! with the target command. Every fatal error exits 1 with a diagnostic on
//! stderr; informational displays exit 0.

use std::path::Path;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use nix::unistd::geteuid;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rolegate::{
    enforce_decision, load_system_policy, resolve_identity, Authenticator, DecisionSource, Error,
    PreparedExec, SysEnforcer, TrustingAuthenticator,
};

#[derive(Parser, Debug)]
#[command(name = "rolegate")]
#[command(
    about = "Execute privileged commands with a role-based access control system",
    long_about = "rolegate runs a command with the least-privilege capability set a \
matching role grants: the executor's identity and command are matched against \
policy, the granted capability triple is installed, the environment and PATH \
are sanitized, and the command replaces the process image."
)]
struct Cli {
    /// Role to use
    #[arg(short, long)]
    role: Option<String>,

    /// Display rights of the executor
    #[arg(short, long)]
    info: bool,

    /// Display version
    #[arg(short = 'v', long)]
    version: bool,

    /// Command to execute and its arguments
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

fn print_usage() {
    // Usage is informational, never an error.
    let _ = Cli::command().print_help();
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
    };

    if cli.version {
        println!("rolegate {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    if !cli.info && cli.command.is_empty() {
        print_usage();
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rolegate: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let identity = resolve_identity(geteuid())?;
    debug!(user = %identity.username, uid = identity.euid.as_raw(), "resolved executor");

    TrustingAuthenticator.authenticate(&identity.username)?;

    let policy = load_system_policy()?;

    if cli.info {
        // Read-only query path: renders the decision, performs zero
        // privilege transitions.
        let decision = policy.rights_of(&identity, cli.role.as_deref());
        println!("{}", rolegate::render(&identity, &decision));
        return Ok(());
    }

    let raw = &cli.command[0];
    let decision = policy.load(&identity, cli.role.as_deref(), Path::new(raw))?;

    let grant = enforce_decision(&decision, &mut SysEnforcer)?;
    debug!(role = %grant.role, "decision enforced");

    let mut env = grant.options.env.filter(std::env::vars())?;

    let raw_path = std::env::var("PATH").unwrap_or_default();
    let secured_path = grant.options.path.secure(&raw_path)?;

    // The child sees the secured PATH, never the inherited one.
    env.retain(|(key, _)| key != "PATH");
    env.push(("PATH".to_string(), secured_path.clone()));

    let command = rolegate::resolve(raw, &secured_path)?;
    debug!(command = %command.display(), "executing");

    let prepared = PreparedExec {
        command,
        argv0: raw.clone(),
        args: cli.command[1..].to_vec(),
        env,
    };

    // Never returns on success; the process image has been replaced.
    Err(prepared.exec().into())
}
