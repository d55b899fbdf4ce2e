mod inputs;
mod logging;
mod options;

use anyhow::{Context, Result};
use clap::{CommandFactory as _, Parser, Subcommand, ValueEnum};
use ndo_policy::{
    framework::{parse_params, reconcile, PolicyKind, Request, State},
    kinds::{MacSecPolicy, NodeSetting},
    transport::HttpTransport,
};
use options::Options;
use std::process::exit;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    match &args.command {
        Commands::MacSecPolicy(sub) => run_policy(&MacSecPolicy, &args.options, sub),
        Commands::NodeSetting(sub) => run_policy(&NodeSetting, &args.options, sub),
        Commands::GenerateMan => (|| {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        })(),
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(*shell, &mut cmd, "ndo", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Create the single-threaded tokio runtime used by the CLI.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize tokio runtime")
}

fn run_policy<K: PolicyKind>(kind: &K, options: &Options, args: &PolicyArgs) -> Result<()> {
    let mut logger = logging::set_up(options.logging())?;
    let result = converge(kind, options, args);
    logger.tear_down()?;
    result
}

fn converge<K: PolicyKind>(kind: &K, options: &Options, args: &PolicyArgs) -> Result<()> {
    let description = kind.schema().description;
    let params = parse_params::<K::Params>(description, args.inputs.gather()?)?;
    let transport = HttpTransport::new(&options.http_config()?)?;
    let request = Request {
        template: args.template.clone(),
        state: args.state.into(),
        check_mode: options.check,
        params,
    };
    let outcome = runtime()?
        .block_on(reconcile(kind, &transport, &request))
        .with_context(|| format!("{} {} failed", description, request.state))?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("ndo error: {:?}", e);
            exit(1);
        }
    }
}

/// Manage Nexus Dashboard Orchestrator fabric policy objects declaratively
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum StateArg {
    /// Create or update the object
    Present,
    /// Delete the object
    Absent,
    /// Show the object, or all objects when no name or uuid is given
    Query,
}

impl From<StateArg> for State {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => State::Present,
            StateArg::Absent => State::Absent,
            StateArg::Query => State::Query,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
struct PolicyArgs {
    /// Name of the fabric policy template holding the object
    #[arg(long, alias = "fabric-template")]
    template: String,

    #[arg(long, value_enum, default_value_t = StateArg::Query)]
    state: StateArg,

    #[command(flatten)]
    inputs: inputs::InputArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage a MACSec policy
    MacSecPolicy(PolicyArgs),

    /// Manage the node settings (SyncE and PTP) of fabric nodes
    NodeSetting(PolicyArgs),

    /// Generate markdown documentation for ndo
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for ndo
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for ndo
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_policy_command() {
        let args = Args::try_parse_from([
            "ndo",
            "--host",
            "ndo.example.com",
            "node-setting",
            "--fabric-template",
            "fabric",
            "--state",
            "present",
            "-s",
            "name",
            "ns1",
        ])
        .unwrap();
        let Commands::NodeSetting(sub) = &args.command else {
            panic!("expected node-setting, got {:?}", args.command);
        };
        assert_eq!(sub.template, "fabric");
        assert_eq!(State::from(sub.state), State::Present);
        assert_eq!(sub.inputs.input_str, vec!["name", "ns1"]);
        assert_eq!(args.options.host.as_deref(), Some("ndo.example.com"));
    }

    #[test]
    fn test_state_defaults_to_query() {
        let args = Args::try_parse_from(["ndo", "mac-sec-policy", "--template", "fabric"]).unwrap();
        let Commands::MacSecPolicy(sub) = &args.command else {
            panic!("expected mac-sec-policy, got {:?}", args.command);
        };
        assert_eq!(sub.state, StateArg::Query);
    }
}
