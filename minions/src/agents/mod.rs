//! Node behaviour: what each [`ActionKind`] does when executed.
//!
//! Agents read and write the [`TaskArena`] and reach the outside world only
//! through the collaborators in [`AgentContext`]. Every agent reports exactly
//! one terminal [`StatusReport`], which [`execute_node`] records on the node.

mod code;
mod edit;
mod gather;
pub mod goal;
pub mod selector;

use tracing::{error, info, info_span, warn};

use crate::core::arena::{NodeId, TaskArena};
use crate::core::palette::{ActionKind, ShareKnowledge};
use crate::core::status::{Failure, StatusReport};
use crate::io::editor::{Editor, EditorError};
use crate::io::llm::{ChatMessage, LlmClient};
use crate::io::progress::{Cancelled, Progress};
use crate::io::prompt::Prompts;
use crate::io::user::UserInteraction;
use crate::io::workspace::{Workspace, WorkspaceError};

pub use code::{code_grammars, extract_code};
pub use goal::{GoalRun, run_goal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Iteration bound for each goal's plan/execute loop.
    pub max_steps: u32,
    /// Deepest nesting of sub-goals below the root goal.
    pub max_depth: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_steps: 25,
            max_depth: 5,
        }
    }
}

/// Everything an agent may touch besides the arena.
#[derive(Clone, Copy)]
pub struct AgentContext<'a> {
    pub llm: &'a dyn LlmClient,
    pub workspace: &'a dyn Workspace,
    pub editor: &'a dyn Editor,
    pub user: &'a dyn UserInteraction,
    pub progress: &'a Progress,
    pub prompts: &'a Prompts,
    pub settings: EngineSettings,
}

/// Early exit from an agent: either a finished report (usually a failure)
/// or an unexpected error.
#[derive(Debug)]
pub(crate) enum Halt {
    Report(StatusReport),
    Error(anyhow::Error),
}

pub(crate) type Step<T> = Result<T, Halt>;

impl From<StatusReport> for Halt {
    fn from(report: StatusReport) -> Self {
        Halt::Report(report)
    }
}

impl From<Cancelled> for Halt {
    fn from(cancelled: Cancelled) -> Self {
        Halt::Report(cancelled.into())
    }
}

impl From<anyhow::Error> for Halt {
    fn from(err: anyhow::Error) -> Self {
        Halt::Error(err)
    }
}

/// Run one node and record its terminal status.
///
/// Unexpected errors become `UnspecifiedError`. When that happens at the
/// root, the progress surface is closed as well.
pub fn execute_node(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> StatusReport {
    let kind = arena.node(id).kind;
    let span = info_span!("node", id = id.index(), verb = kind.verb());
    let _guard = span.enter();
    info!(purpose = %purpose(arena, id), "executing");

    let outcome = match kind {
        ActionKind::Goal => goal::pursue(arena, id, ctx),
        ActionKind::ReadFile => gather::read_file(arena, id, ctx),
        ActionKind::DirectoryStructure => gather::directory_structure(arena, id, ctx),
        ActionKind::RequestClarification => gather::request_clarification(arena, id, ctx),
        ActionKind::ActiveEditorFilepath => gather::active_editor_filepath(arena, id, ctx),
        ActionKind::SelectedText => gather::selected_text(arena, id, ctx),
        ActionKind::WriteCode => code::write_code(arena, id, ctx),
        ActionKind::ModifyStoredCode => code::modify_stored_code(arena, id, ctx),
        ActionKind::InsertCodeAtCursor => edit::insert_code_at_cursor(arena, id, ctx),
        ActionKind::ReplaceSelectedCode => edit::replace_selected_code(arena, id, ctx),
        ActionKind::CreateFile => edit::create_file(arena, id, ctx),
        ActionKind::CreateDirectory => edit::create_directory(arena, id, ctx),
        ActionKind::MoveFile => edit::move_file(arena, id, ctx),
    };

    let report = match outcome {
        Ok(report) | Err(Halt::Report(report)) => report,
        Err(Halt::Error(err)) => {
            error!(err = %format!("{err:#}"), "node raised an unexpected error");
            if arena.node(id).boss.is_none() {
                ctx.progress.close();
            }
            StatusReport::failed(Failure::UnspecifiedError, format!("{err:#}"))
        }
    };
    if report.status.is_failure() {
        warn!(status = %report.status, message = report.message.as_deref(), "node failed");
    } else {
        info!(status = %report.status, "node done");
    }
    arena.set_report(id, &report);
    report
}

/// Human-readable description of what a node is for.
pub fn purpose(arena: &TaskArena, id: NodeId) -> String {
    let node = arena.node(id);
    let arg = |index: usize| node.arg(index).unwrap_or("?");
    match node.kind {
        ActionKind::Goal => arg(0).to_string(),
        ActionKind::ReadFile => format!("Read the file \"{}\"", arg(0)),
        ActionKind::DirectoryStructure => {
            format!("Describe the structure of the directory \"{}\"", arg(0))
        }
        ActionKind::RequestClarification => format!("Ask the user \"{}\"", arg(0)),
        ActionKind::WriteCode => format!(
            "Write code for \"{}\" and store it at \"{}\"",
            arg(1),
            arg(0)
        ),
        ActionKind::ModifyStoredCode => format!(
            "Modify the code stored at \"{}\" to \"{}\"",
            arg(0),
            arg(1)
        ),
        ActionKind::InsertCodeAtCursor => {
            format!("Insert the code stored at \"{}\" at the cursor", arg(0))
        }
        ActionKind::ReplaceSelectedCode => format!(
            "Replace the selected text with the code stored at \"{}\"",
            arg(0)
        ),
        ActionKind::ActiveEditorFilepath => format!(
            "Store the path of the file in the active editor at \"{}\"",
            arg(0)
        ),
        ActionKind::SelectedText => "Read the text selected in the active editor".to_string(),
        ActionKind::CreateFile => format!(
            "Create the file \"{}\" from the text stored at \"{}\"",
            arg(0),
            arg(1)
        ),
        ActionKind::CreateDirectory => format!("Create the directory \"{}\"", arg(0)),
        ActionKind::MoveFile => format!("Move \"{}\" to \"{}\"", arg(0), arg(1)),
    }
}

/// Hand a finished minion's knowledge up to its boss, as its kind dictates.
pub(crate) fn share_knowledge_with_boss(
    arena: &mut TaskArena,
    minion: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<()> {
    let node = arena.node(minion);
    let Some(boss) = node.boss else {
        return Ok(());
    };
    let shared = match node.kind.metadata().share {
        ShareKnowledge::Nothing => return Ok(()),
        ShareKnowledge::Keyed => match node.arg(0) {
            Some(key) => node.knowledge.subset([key]),
            None => return Ok(()),
        },
        ShareKnowledge::Selected => {
            if node.knowledge.is_empty() {
                return Ok(());
            }
            let preamble = vec![
                format!(
                    "You have been asked to \"{}\".",
                    purpose(arena, boss)
                ),
                format!(
                    "You delegated \"{}\" to a subordinate, who has finished.",
                    purpose(arena, minion)
                ),
                "The subordinate gathered the knowledge below.".to_string(),
                "Pick the items that will help you with your own goal.".to_string(),
            ];
            selector::select_relevant(ctx, &preamble, &node.knowledge)?
        }
    };
    if !shared.is_empty() {
        info!(minion = minion.index(), items = shared.len(), "sharing knowledge with boss");
        arena.merge_knowledge(boss, &shared);
    }
    Ok(())
}

/// Send a prompt to the model inside a progress step and map transport
/// failures to statuses.
pub(crate) fn ask_model(ctx: &AgentContext<'_>, title: &str, prompt: &str) -> Step<String> {
    let messages = [
        ChatMessage::system(ctx.prompts.system()),
        ChatMessage::user(format!("Your assignment: {prompt}")),
    ];
    let response = ctx.progress.wrap(title, || ctx.llm.respond(&messages))?;
    response
        .into_text()
        .map_err(|(failure, detail)| StatusReport::failed(failure, detail).into())
}

/// Argument at `index`, or a `MissingArgument` failure naming `what`.
pub(crate) fn required_arg(arena: &TaskArena, id: NodeId, index: usize, what: &str) -> Step<String> {
    arena
        .node(id)
        .arg(index)
        .map(str::to_string)
        .ok_or_else(|| StatusReport::failed(Failure::MissingArgument, format!("no {what} was supplied")).into())
}

/// Look up a memory location in the node's and its boss's knowledge.
pub(crate) fn stored_value(arena: &TaskArena, id: NodeId, key: &str) -> Step<String> {
    arena
        .knowledge_with_boss(id)
        .get(key)
        .map(str::to_string)
        .ok_or_else(|| {
            StatusReport::failed(
                Failure::InvalidArgument,
                format!("nothing is stored at \"{key}\""),
            )
            .into()
        })
}

pub(crate) fn workspace_failure(err: WorkspaceError) -> Halt {
    let failure = match &err {
        WorkspaceError::NoWorkspace(_) => Failure::InvalidWorkspace,
        WorkspaceError::InvalidPath(_) => Failure::InvalidArgument,
        WorkspaceError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
            Failure::InvalidArgument
        }
        WorkspaceError::Io { .. } => Failure::UnspecifiedError,
    };
    StatusReport::failed(failure, err.to_string()).into()
}

pub(crate) fn editor_failure(err: EditorError) -> Halt {
    match err {
        EditorError::Workspace(inner) => workspace_failure(inner),
        EditorError::NoActiveEditor | EditorError::NoSelection | EditorError::OutOfRange { .. } => {
            StatusReport::failed(Failure::InvalidArgument, err.to_string()).into()
        }
    }
}
