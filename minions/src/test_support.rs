//! Test doubles and a harness for exercising agents without a real model,
//! terminal, or editor.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;

use anyhow::Result;
use tempfile::TempDir;

use crate::agents::{AgentContext, EngineSettings};
use crate::core::arena::{NodeId, TaskArena};
use crate::core::palette::ActionKind;
use crate::io::editor::{Editor, EditorError};
use crate::io::llm::{ChatMessage, LlmClient, LlmResponse, Role};
use crate::io::progress::Progress;
use crate::io::prompt::Prompts;
use crate::io::user::{Question, UserInteraction};
use crate::io::workspace::FsWorkspace;

/// Model double that replays canned responses in order and records every
/// transcript it receives. Once the script runs out it answers with an API
/// error.
pub struct ScriptedLlm {
    responses: RefCell<VecDeque<LlmResponse>>,
    transcripts: RefCell<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            transcripts: RefCell::new(Vec::new()),
        }
    }

    pub fn replying<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::new(replies.into_iter().map(LlmResponse::ok).collect())
    }

    pub fn calls(&self) -> usize {
        self.transcripts.borrow().len()
    }

    /// User message of the `index`-th request.
    pub fn user_prompt(&self, index: usize) -> String {
        self.transcripts.borrow()[index]
            .iter()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.clone())
            .unwrap_or_default()
    }
}

impl LlmClient for ScriptedLlm {
    fn respond(&self, messages: &[ChatMessage]) -> LlmResponse {
        self.transcripts.borrow_mut().push(messages.to_vec());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| LlmResponse::error("no scripted reply left"))
    }
}

/// User double with queued answers. Unqueued questions get no answer.
#[derive(Default)]
pub struct ScriptedUser {
    answers: RefCell<VecDeque<Option<String>>>,
    questions: RefCell<Vec<String>>,
}

impl ScriptedUser {
    pub fn push_answer(&self, answer: Option<&str>) {
        self.answers.borrow_mut().push_back(answer.map(str::to_string));
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }
}

impl UserInteraction for ScriptedUser {
    fn ask(&self, question: &Question<'_>) -> Result<Option<String>> {
        self.questions.borrow_mut().push(question.prompt.to_string());
        Ok(self.answers.borrow_mut().pop_front().flatten())
    }
}

/// In-memory editor: one open buffer, an optional selected span, and a
/// cursor at the end of the buffer.
#[derive(Default)]
pub struct MemoryEditor {
    path: RefCell<Option<String>>,
    buffer: RefCell<String>,
    selection: RefCell<Option<String>>,
}

impl MemoryEditor {
    pub fn open(&self, path: &str, contents: &str) {
        *self.path.borrow_mut() = Some(path.to_string());
        *self.buffer.borrow_mut() = contents.to_string();
        *self.selection.borrow_mut() = None;
    }

    pub fn select(&self, text: &str) {
        *self.selection.borrow_mut() = Some(text.to_string());
    }

    pub fn buffer(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl Editor for MemoryEditor {
    fn active_file(&self) -> Result<String, EditorError> {
        self.path.borrow().clone().ok_or(EditorError::NoActiveEditor)
    }

    fn selected_text(&self) -> Result<String, EditorError> {
        self.active_file()?;
        self.selection.borrow().clone().ok_or(EditorError::NoSelection)
    }

    fn insert_at_cursor(&self, text: &str) -> Result<(), EditorError> {
        self.active_file()?;
        self.buffer.borrow_mut().push_str(text);
        Ok(())
    }

    fn replace_selection(&self, text: &str) -> Result<(), EditorError> {
        let selected = self.selected_text()?;
        let replaced = self.buffer.borrow().replacen(&selected, text, 1);
        *self.buffer.borrow_mut() = replaced;
        *self.selection.borrow_mut() = None;
        Ok(())
    }
}

/// Workspace rooted in a temp directory that lives as long as the harness.
pub struct TestWorkspace {
    dir: TempDir,
    workspace: FsWorkspace,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = FsWorkspace::new(dir.path());
        Self { dir, workspace }
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.dir.path().join(relative)).expect("read")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.dir.path().join(relative).exists()
    }

    pub fn fs(&self) -> &FsWorkspace {
        &self.workspace
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns one of each collaborator and lends them out as an [`AgentContext`].
pub struct Harness {
    pub llm: ScriptedLlm,
    pub workspace: TestWorkspace,
    pub editor: MemoryEditor,
    pub user: ScriptedUser,
    pub progress: Progress,
    pub prompts: Prompts,
    pub settings: EngineSettings,
}

impl Harness {
    /// Harness whose model answers successfully with `replies`, in order.
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::with_llm(ScriptedLlm::replying(replies))
    }

    pub fn with_responses(responses: Vec<LlmResponse>) -> Self {
        Self::with_llm(ScriptedLlm::new(responses))
    }

    fn with_llm(llm: ScriptedLlm) -> Self {
        Self {
            llm,
            workspace: TestWorkspace::new(),
            editor: MemoryEditor::default(),
            user: ScriptedUser::default(),
            progress: Progress::new("test run"),
            prompts: Prompts::new().expect("prompts"),
            settings: EngineSettings::default(),
        }
    }

    pub fn context(&self) -> AgentContext<'_> {
        AgentContext {
            llm: &self.llm,
            workspace: self.workspace.fs(),
            editor: &self.editor,
            user: &self.user,
            progress: &self.progress,
            prompts: &self.prompts,
            settings: self.settings,
        }
    }
}

/// Arena with a root goal and a single minion of `kind` already in its plan.
pub fn minion_of_root(kind: ActionKind, args: &[&str]) -> (TaskArena, NodeId) {
    let mut arena = TaskArena::new();
    let root = arena.add_root(ActionKind::Goal, [Some("test goal".to_string()), None, None]);
    let mut minion_args: [Option<String>; 3] = Default::default();
    for (slot, arg) in minion_args.iter_mut().zip(args) {
        *slot = Some((*arg).to_string());
    }
    let minion = arena.add_minion(root, kind, minion_args);
    arena.splice_plan(root, 0, vec![minion]);
    (arena, minion)
}
