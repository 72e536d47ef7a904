//! Leaf actions that gather knowledge: files, directories, the user, and
//! the active editor.

use std::collections::BTreeMap;

use anyhow::Context;
use tracing::warn;

use crate::agents::{AgentContext, Step, editor_failure, required_arg, workspace_failure};
use crate::core::arena::{NodeId, TaskArena};
use crate::core::status::{Failure, StatusReport};
use crate::io::user::Question;
use crate::io::workspace::{EntryKind, join_relative};

pub(crate) fn read_file(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> Step<StatusReport> {
    let path = required_arg(arena, id, 0, "file path")?;
    let contents = ctx
        .progress
        .wrap(&format!("Reading \"{path}\""), || ctx.workspace.read_file(&path))?
        .map_err(workspace_failure)?;
    arena.store_knowledge(id, format!("Contents of \"{path}\""), contents);
    Ok(StatusReport::finished(format!("Read the contents of \"{path}\"")))
}

/// Stores a JSON object mapping each entry's workspace-relative path to
/// `"File"` or `"Directory"`.
pub(crate) fn directory_structure(
    arena: &mut TaskArena,
    id: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<StatusReport> {
    let dir = required_arg(arena, id, 0, "directory path")?;
    let entries = ctx
        .progress
        .wrap(&format!("Listing \"{dir}\""), || ctx.workspace.list_dir(&dir))?
        .map_err(workspace_failure)?;
    let listing: BTreeMap<String, EntryKind> = entries
        .into_iter()
        .map(|entry| (join_relative(&dir, &entry.name), entry.kind))
        .collect();
    let description = serde_json::to_string(&listing).context("serialize directory listing")?;
    arena.store_knowledge(
        id,
        format!("Structure of the directory \"{dir}\""),
        description,
    );
    Ok(StatusReport::finished(format!(
        "Described the structure of \"{dir}\" ({} entries)",
        listing.len()
    )))
}

pub(crate) fn request_clarification(
    arena: &mut TaskArena,
    id: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<StatusReport> {
    let question = required_arg(arena, id, 0, "question")?;
    let question_ref = Question {
        title: "The agent needs clarification",
        prompt: &question,
        placeholder: "Type your answer and press enter, or leave it empty to skip",
    };
    let answer = match ctx
        .progress
        .wrap("Waiting for the user", || ctx.user.ask(&question_ref))?
    {
        Ok(answer) => answer,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "could not ask the user");
            None
        }
    };
    let Some(answer) = answer.filter(|answer| !answer.trim().is_empty()) else {
        return Ok(StatusReport::failed(
            Failure::UserDidNotRespond,
            format!("no answer to \"{question}\""),
        ));
    };
    arena.store_knowledge(id, format!("Clarification for \"{question}\""), answer);
    Ok(StatusReport::finished(format!("The user answered \"{question}\"")))
}

pub(crate) fn active_editor_filepath(
    arena: &mut TaskArena,
    id: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<StatusReport> {
    let key = required_arg(arena, id, 0, "memory location")?;
    let path = ctx
        .progress
        .wrap("Checking the active editor", || ctx.editor.active_file())?
        .map_err(editor_failure)?;
    arena.store_knowledge(id, key.as_str(), path.as_str());
    Ok(StatusReport::finished(format!("Stored \"{path}\" at \"{key}\"")))
}

pub(crate) fn selected_text(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> Step<StatusReport> {
    let text = ctx
        .progress
        .wrap("Reading the selection", || ctx.editor.selected_text())?
        .map_err(editor_failure)?;
    arena.store_knowledge(id, "Currently selected text in the active editor", text);
    Ok(StatusReport::finished("Read the selected text"))
}

#[cfg(test)]
mod tests {
    use crate::agents::execute_node;
    use crate::core::palette::ActionKind;
    use crate::core::status::{Failure, Status};
    use crate::test_support::{Harness, minion_of_root};

    #[test]
    fn read_file_stores_contents() {
        let harness = Harness::new(Vec::<&str>::new());
        harness.workspace.write("notes/todo.txt", "buy milk\n");
        let (mut arena, id) = minion_of_root(ActionKind::ReadFile, &["notes/todo.txt"]);

        let report = execute_node(&mut arena, id, &harness.context());

        assert_eq!(report.status, Status::Finished);
        assert_eq!(
            arena.node(id).knowledge.get("Contents of \"notes/todo.txt\""),
            Some("buy milk\n")
        );
        assert_eq!(arena.node(id).status, Status::Finished);
    }

    #[test]
    fn read_file_without_path_is_missing_argument() {
        let harness = Harness::new(Vec::<&str>::new());
        let (mut arena, id) = minion_of_root(ActionKind::ReadFile, &[]);
        let report = execute_node(&mut arena, id, &harness.context());
        assert_eq!(report.status, Status::Failed(Failure::MissingArgument));
    }

    #[test]
    fn read_file_outside_workspace_is_invalid() {
        let harness = Harness::new(Vec::<&str>::new());
        let (mut arena, id) = minion_of_root(ActionKind::ReadFile, &["../etc/passwd"]);
        let report = execute_node(&mut arena, id, &harness.context());
        assert_eq!(report.status, Status::Failed(Failure::InvalidArgument));
        assert!(arena.node(id).knowledge.is_empty());
    }

    #[test]
    fn directory_structure_is_a_json_map() {
        let harness = Harness::new(Vec::<&str>::new());
        harness.workspace.write("src/main.rs", "fn main() {}\n");
        harness.workspace.write("src/util/mod.rs", "");
        let (mut arena, id) = minion_of_root(ActionKind::DirectoryStructure, &["src"]);

        let report = execute_node(&mut arena, id, &harness.context());

        assert_eq!(report.status, Status::Finished);
        assert_eq!(
            arena.node(id).knowledge.get("Structure of the directory \"src\""),
            Some(r#"{"src/main.rs":"File","src/util":"Directory"}"#)
        );
    }

    #[test]
    fn clarification_records_the_answer() {
        let harness = Harness::new(Vec::<&str>::new());
        harness.user.push_answer(Some("use tabs"));
        let (mut arena, id) = minion_of_root(ActionKind::RequestClarification, &["Tabs or spaces?"]);

        let report = execute_node(&mut arena, id, &harness.context());

        assert_eq!(report.status, Status::Finished);
        assert_eq!(
            arena.node(id).knowledge.get("Clarification for \"Tabs or spaces?\""),
            Some("use tabs")
        );
        assert_eq!(harness.user.questions(), vec!["Tabs or spaces?".to_string()]);
    }

    #[test]
    fn unanswered_clarification_fails() {
        let harness = Harness::new(Vec::<&str>::new());
        harness.user.push_answer(None);
        let (mut arena, id) = minion_of_root(ActionKind::RequestClarification, &["Tabs or spaces?"]);
        let report = execute_node(&mut arena, id, &harness.context());
        assert_eq!(report.status, Status::Failed(Failure::UserDidNotRespond));
    }

    #[test]
    fn editor_actions_store_path_and_selection() {
        let harness = Harness::new(Vec::<&str>::new());
        harness.editor.open("src/lib.rs", "fn a() {}\n");
        harness.editor.select("fn a() {}");

        let (mut arena, id) = minion_of_root(ActionKind::ActiveEditorFilepath, &["current file"]);
        execute_node(&mut arena, id, &harness.context());
        assert_eq!(arena.node(id).knowledge.get("current file"), Some("src/lib.rs"));

        let (mut arena, id) = minion_of_root(ActionKind::SelectedText, &[]);
        execute_node(&mut arena, id, &harness.context());
        assert_eq!(
            arena
                .node(id)
                .knowledge
                .get("Currently selected text in the active editor"),
            Some("fn a() {}")
        );
    }

    #[test]
    fn cancelled_run_skips_the_read() {
        let harness = Harness::new(Vec::<&str>::new());
        harness.workspace.write("a.txt", "a");
        harness.progress.cancel();
        let (mut arena, id) = minion_of_root(ActionKind::ReadFile, &["a.txt"]);
        let report = execute_node(&mut arena, id, &harness.context());
        assert_eq!(report.status, Status::UserCancelled);
        assert!(arena.node(id).knowledge.is_empty());
    }
}
