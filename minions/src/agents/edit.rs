//! Leaf actions with direct effects on the editor or the workspace.

use crate::agents::{AgentContext, Step, editor_failure, required_arg, stored_value, workspace_failure};
use crate::core::arena::{NodeId, TaskArena};
use crate::core::status::StatusReport;

pub(crate) fn insert_code_at_cursor(
    arena: &mut TaskArena,
    id: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<StatusReport> {
    let key = required_arg(arena, id, 0, "memory location")?;
    let code = stored_value(arena, id, &key)?;
    ctx.progress
        .wrap("Inserting code at the cursor", || ctx.editor.insert_at_cursor(&code))?
        .map_err(editor_failure)?;
    Ok(StatusReport::finished(format!(
        "Inserted the code stored at \"{key}\" at the cursor"
    )))
}

pub(crate) fn replace_selected_code(
    arena: &mut TaskArena,
    id: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<StatusReport> {
    let key = required_arg(arena, id, 0, "memory location")?;
    let code = stored_value(arena, id, &key)?;
    ctx.progress
        .wrap("Replacing the selection", || ctx.editor.replace_selection(&code))?
        .map_err(editor_failure)?;
    Ok(StatusReport::finished(format!(
        "Replaced the selection with the code stored at \"{key}\""
    )))
}

pub(crate) fn create_file(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> Step<StatusReport> {
    let path = required_arg(arena, id, 0, "file path")?;
    let key = required_arg(arena, id, 1, "memory location")?;
    let contents = stored_value(arena, id, &key)?;
    ctx.progress
        .wrap(&format!("Creating \"{path}\""), || ctx.workspace.create_file(&path, &contents))?
        .map_err(workspace_failure)?;
    Ok(StatusReport::finished(format!(
        "Created \"{path}\" from the text stored at \"{key}\""
    )))
}

pub(crate) fn create_directory(
    arena: &mut TaskArena,
    id: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<StatusReport> {
    let path = required_arg(arena, id, 0, "directory path")?;
    ctx.progress
        .wrap(&format!("Creating directory \"{path}\""), || ctx.workspace.create_dir(&path))?
        .map_err(workspace_failure)?;
    Ok(StatusReport::finished(format!("Created the directory \"{path}\"")))
}

pub(crate) fn move_file(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> Step<StatusReport> {
    let from = required_arg(arena, id, 0, "source path")?;
    let to = required_arg(arena, id, 1, "destination path")?;
    ctx.progress
        .wrap(&format!("Moving \"{from}\" to \"{to}\""), || ctx.workspace.move_path(&from, &to))?
        .map_err(workspace_failure)?;
    Ok(StatusReport::finished(format!("Moved \"{from}\" to \"{to}\"")))
}
