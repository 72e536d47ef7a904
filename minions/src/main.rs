//! `minions`: pursue a development goal in a workspace with a tree of
//! model-planned task nodes.

use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use minions::agents::selector::selection_grammars;
use minions::agents::{AgentContext, EngineSettings, code_grammars, run_goal};
use minions::core::palette::{ActionKind, planning_grammars};
use minions::core::parser::CommandParser;
use minions::core::status::Status;
use minions::exit_codes;
use minions::io::config::load_config;
use minions::io::editor::{EditorState, FileEditor, LineRange};
use minions::io::init::{MinionsPaths, init_minions};
use minions::io::llm::{CommandLlmClient, CountingLlm};
use minions::io::progress::Progress;
use minions::io::prompt::Prompts;
use minions::io::run_log::{RunMeta, next_run_id, write_run};
use minions::io::user::ConsolePrompt;
use minions::io::workspace::FsWorkspace;
use minions::logging;

#[derive(Parser)]
#[command(
    name = "minions",
    version,
    about = "Goal-planning development agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.minions/` with a default config.
    Init {
        /// Workspace root (defaults to the current directory).
        #[arg(long)]
        root: Option<PathBuf>,
        /// Overwrite an existing `.minions/`.
        #[arg(short, long)]
        force: bool,
    },
    /// Pursue a goal in the workspace.
    Run(RunArgs),
    /// Parse a reply from stdin and print the recognized commands as JSON lines.
    Parse {
        #[arg(long, value_enum, default_value_t = GrammarSet::Plan)]
        grammar: GrammarSet,
    },
    /// List the actions a goal can plan with, as the model sees them.
    Actions,
}

#[derive(Args)]
struct RunArgs {
    /// The goal, in plain language.
    goal: String,
    /// Workspace root (defaults to the current directory).
    #[arg(long)]
    root: Option<PathBuf>,
    /// Workspace-relative path of the file treated as open in the editor.
    #[arg(long)]
    active_file: Option<String>,
    /// 1-based line the editor cursor sits on (defaults to end of file).
    #[arg(long)]
    cursor: Option<usize>,
    /// Selected lines in the active file, `START-END`.
    #[arg(long)]
    selection: Option<LineRange>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GrammarSet {
    /// Goal planning replies.
    Plan,
    /// Knowledge selection replies.
    Select,
    /// Code replies.
    Code,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { root, force } => cmd_init(root, force),
        Command::Run(args) => cmd_run(args),
        Command::Parse { grammar } => cmd_parse(grammar),
        Command::Actions => cmd_actions(),
    }
}

fn workspace_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => std::env::current_dir().context("resolve current directory"),
    }
}

fn cmd_init(root: Option<PathBuf>, force: bool) -> Result<i32> {
    let root = workspace_root(root)?;
    let paths = init_minions(&root, force)?;
    println!("{}", paths.config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(args: RunArgs) -> Result<i32> {
    let root = workspace_root(args.root)?;
    let paths = MinionsPaths::new(&root);
    if !paths.minions_dir.is_dir() {
        bail!(
            "{} is not initialized; run `minions init` first",
            root.display()
        );
    }
    let cfg = load_config(&paths.config_path)?;

    let workspace = FsWorkspace::new(&root);
    let editor = FileEditor::new(
        &workspace,
        EditorState {
            active_file: args.active_file,
            cursor_line: args.cursor,
            selection: args.selection,
        },
    );
    let llm = CountingLlm::new(CommandLlmClient::new(cfg.llm.clone(), &root));
    let progress = Progress::new(args.goal.as_str())
        .with_deadline(Instant::now() + Duration::from_secs(cfg.run_timeout_secs));
    let prompts = Prompts::new()?;
    let ctx = AgentContext {
        llm: &llm,
        workspace: &workspace,
        editor: &editor,
        user: &ConsolePrompt,
        progress: &progress,
        prompts: &prompts,
        settings: EngineSettings {
            max_steps: cfg.max_steps,
            max_depth: cfg.max_depth,
        },
    };

    let started = Instant::now();
    let run = run_goal(&args.goal, &ctx);
    let run_id = next_run_id(&root);
    let meta = RunMeta {
        run_id,
        goal: args.goal.clone(),
        status: run.report.status,
        message: run.report.message.clone(),
        nodes: run.arena.len(),
        model_calls: llm.calls(),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    let run_paths = write_run(&root, &meta, &run.arena)?;
    info!(run_dir = %run_paths.dir.display(), "wrote run log");

    println!("{}", run.report);
    println!("{}", run_paths.dir.display());
    Ok(match run.report.status {
        Status::Finished => exit_codes::OK,
        Status::UserCancelled => exit_codes::CANCELLED,
        Status::NotStarted | Status::Failed(_) => exit_codes::FAILED,
    })
}

fn cmd_parse(grammar: GrammarSet) -> Result<i32> {
    let mut reply = String::new();
    std::io::stdin()
        .read_to_string(&mut reply)
        .context("read reply from stdin")?;
    let grammars = match grammar {
        GrammarSet::Plan => planning_grammars(&ActionKind::ALL),
        GrammarSet::Select => selection_grammars(),
        GrammarSet::Code => code_grammars(),
    };
    for command in CommandParser::new(grammars).parse(&reply) {
        println!(
            "{}",
            serde_json::to_string(&command).context("serialize command")?
        );
    }
    Ok(exit_codes::OK)
}

fn cmd_actions() -> Result<i32> {
    for kind in ActionKind::ALL {
        println!("{}", kind.render_for_prompt());
    }
    Ok(exit_codes::OK)
}
