//! The user's active editor: open file, cursor line, and selected lines.
//!
//! [`FileEditor`] stands in for an IDE from the command line. Its state comes
//! from CLI flags and every edit goes through the [`Workspace`], so the same
//! path rules apply. Edits move the cursor and selection the way an editor
//! would, so consecutive edits land in document order.

use std::cell::RefCell;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::io::workspace::{Workspace, WorkspaceError};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no file is open in the active editor")]
    NoActiveEditor,
    #[error("no text is selected in the active editor")]
    NoSelection,
    #[error("line {line} is outside {path} ({lines} lines)")]
    OutOfRange {
        path: String,
        line: usize,
        lines: usize,
    },
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

pub trait Editor {
    /// Workspace-relative path of the open file.
    fn active_file(&self) -> Result<String, EditorError>;
    fn selected_text(&self) -> Result<String, EditorError>;
    fn insert_at_cursor(&self, text: &str) -> Result<(), EditorError>;
    fn replace_selection(&self, text: &str) -> Result<(), EditorError>;
}

/// Inclusive 1-based line range, written `START-END` or `LINE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl FromStr for LineRange {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .ok()
                .filter(|line| *line > 0)
                .ok_or_else(|| format!("invalid line number {part:?}"))
        };
        let (start, end) = match raw.split_once('-') {
            Some((start, end)) => (parse(start)?, parse(end)?),
            None => {
                let line = parse(raw)?;
                (line, line)
            }
        };
        if end < start {
            return Err(format!("selection {raw:?} ends before it starts"));
        }
        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub active_file: Option<String>,
    /// 1-based line the cursor sits on; inserts go before it. `None` means
    /// end of file.
    pub cursor_line: Option<usize>,
    pub selection: Option<LineRange>,
}

pub struct FileEditor<'w> {
    workspace: &'w dyn Workspace,
    state: RefCell<EditorState>,
}

impl<'w> FileEditor<'w> {
    pub fn new(workspace: &'w dyn Workspace, state: EditorState) -> Self {
        Self {
            workspace,
            state: RefCell::new(state),
        }
    }

    /// Current editor state, after any edits made so far.
    pub fn state(&self) -> EditorState {
        self.state.borrow().clone()
    }

    fn open(&self) -> Result<(String, Vec<String>), EditorError> {
        let path = self.active_file()?;
        let contents = self.workspace.read_file(&path)?;
        let lines = contents.split_inclusive('\n').map(str::to_string).collect();
        Ok((path, lines))
    }

    fn selection(&self, path: &str, lines: &[String]) -> Result<LineRange, EditorError> {
        let range = self.state.borrow().selection.ok_or(EditorError::NoSelection)?;
        if range.end > lines.len() {
            return Err(EditorError::OutOfRange {
                path: path.to_string(),
                line: range.end,
                lines: lines.len(),
            });
        }
        Ok(range)
    }
}

fn line_count(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

fn as_block(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

impl Editor for FileEditor<'_> {
    fn active_file(&self) -> Result<String, EditorError> {
        self.state
            .borrow()
            .active_file
            .clone()
            .ok_or(EditorError::NoActiveEditor)
    }

    fn selected_text(&self) -> Result<String, EditorError> {
        let (path, lines) = self.open()?;
        let range = self.selection(&path, &lines)?;
        Ok(lines[range.start - 1..range.end].concat())
    }

    fn insert_at_cursor(&self, text: &str) -> Result<(), EditorError> {
        let (path, mut lines) = self.open()?;
        let cursor = self.state.borrow().cursor_line;
        let index = match cursor {
            Some(line) if line == 0 || line > lines.len() + 1 => {
                return Err(EditorError::OutOfRange {
                    path,
                    line,
                    lines: lines.len(),
                });
            }
            Some(line) => line - 1,
            None => lines.len(),
        };
        if index == lines.len()
            && let Some(last) = lines.last_mut()
            && !last.ends_with('\n')
        {
            last.push('\n');
        }
        let block = as_block(text);
        let inserted = line_count(&block);
        lines.insert(index, block);
        debug!(path, line = index + 1, inserted, "insert at cursor");
        self.workspace.create_file(&path, &lines.concat())?;
        if let Some(line) = cursor {
            self.state.borrow_mut().cursor_line = Some(line + inserted);
        }
        Ok(())
    }

    fn replace_selection(&self, text: &str) -> Result<(), EditorError> {
        let (path, mut lines) = self.open()?;
        let range = self.selection(&path, &lines)?;
        let keeps_newline = lines[range.end - 1].ends_with('\n');
        let replacement = if keeps_newline {
            as_block(text)
        } else {
            text.trim_end_matches('\n').to_string()
        };
        let replaced = line_count(&replacement);
        lines.splice(range.start - 1..range.end, [replacement]);
        debug!(path, start = range.start, end = range.end, replaced, "replace selection");
        self.workspace.create_file(&path, &lines.concat())?;
        self.state.borrow_mut().selection = (replaced > 0).then(|| LineRange {
            start: range.start,
            end: range.start + replaced - 1,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::workspace::FsWorkspace;

    fn setup(contents: &str) -> (tempfile::TempDir, FsWorkspace) {
        let temp = tempfile::tempdir().expect("tempdir");
        let ws = FsWorkspace::new(temp.path());
        ws.create_file("main.rs", contents).expect("seed");
        (temp, ws)
    }

    fn state(cursor: Option<usize>, selection: Option<&str>) -> EditorState {
        EditorState {
            active_file: Some("main.rs".to_string()),
            cursor_line: cursor,
            selection: selection.map(|raw| raw.parse().expect("range")),
        }
    }

    #[test]
    fn parses_line_ranges() {
        assert_eq!("3-5".parse(), Ok(LineRange { start: 3, end: 5 }));
        assert_eq!("7".parse(), Ok(LineRange { start: 7, end: 7 }));
        assert!("5-3".parse::<LineRange>().is_err());
        assert!("0".parse::<LineRange>().is_err());
        assert!("a-b".parse::<LineRange>().is_err());
    }

    #[test]
    fn inserts_before_cursor_line() {
        let (_temp, ws) = setup("one\ntwo\n");
        let editor = FileEditor::new(&ws, state(Some(2), None));
        editor.insert_at_cursor("inserted").expect("insert");
        assert_eq!(ws.read_file("main.rs").expect("read"), "one\ninserted\ntwo\n");
    }

    #[test]
    fn inserts_at_end_without_cursor() {
        let (_temp, ws) = setup("one");
        let editor = FileEditor::new(&ws, state(None, None));
        editor.insert_at_cursor("two\n").expect("insert");
        assert_eq!(ws.read_file("main.rs").expect("read"), "one\ntwo\n");
    }

    #[test]
    fn replaces_and_reads_selection() {
        let (_temp, ws) = setup("a\nb\nc\nd\n");
        let editor = FileEditor::new(&ws, state(None, Some("2-3")));
        assert_eq!(editor.selected_text().expect("selected"), "b\nc\n");
        editor.replace_selection("X").expect("replace");
        assert_eq!(ws.read_file("main.rs").expect("read"), "a\nX\nd\n");
    }

    #[test]
    fn consecutive_inserts_keep_document_order() {
        let (_temp, ws) = setup("one\ntwo\n");
        let editor = FileEditor::new(&ws, state(Some(2), None));
        editor.insert_at_cursor("A").expect("first insert");
        editor.insert_at_cursor("B\nC\n").expect("second insert");
        assert_eq!(ws.read_file("main.rs").expect("read"), "one\nA\nB\nC\ntwo\n");
        assert_eq!(editor.state().cursor_line, Some(5));
    }

    #[test]
    fn second_replace_targets_the_first_replacement() {
        let (_temp, ws) = setup("a\nb\nc\nd\n");
        let editor = FileEditor::new(&ws, state(None, Some("2-3")));
        editor.replace_selection("X").expect("first replace");
        assert_eq!(editor.state().selection, Some(LineRange { start: 2, end: 2 }));
        editor.replace_selection("Y\nZ").expect("second replace");
        assert_eq!(ws.read_file("main.rs").expect("read"), "a\nY\nZ\nd\n");
        assert_eq!(editor.selected_text().expect("selected"), "Y\nZ\n");
    }

    #[test]
    fn empty_replacement_clears_the_selection() {
        let (_temp, ws) = setup("a\nb\n");
        let editor = FileEditor::new(&ws, state(None, Some("1")));
        editor.replace_selection("").expect("replace");
        assert_eq!(ws.read_file("main.rs").expect("read"), "b\n");
        assert!(matches!(editor.selected_text(), Err(EditorError::NoSelection)));
    }

    #[test]
    fn reports_missing_editor_state() {
        let (_temp, ws) = setup("a\n");
        let editor = FileEditor::new(&ws, EditorState::default());
        assert!(matches!(editor.active_file(), Err(EditorError::NoActiveEditor)));

        let editor = FileEditor::new(&ws, state(None, None));
        assert!(matches!(editor.selected_text(), Err(EditorError::NoSelection)));

        let editor = FileEditor::new(&ws, state(None, Some("1-4")));
        assert!(matches!(editor.replace_selection("x"), Err(EditorError::OutOfRange { .. })));
    }
}
