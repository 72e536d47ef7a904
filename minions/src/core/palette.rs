//! The action palette: every node kind, its command grammar, and the static
//! metadata the planning engine needs about it.

use serde::Serialize;

use crate::core::grammar::{Grammar, Token};

/// Replies that end planning without creating minions.
pub const ACHIEVED: &str = "ACHIEVED";
pub const REFUSE: &str = "REFUSE";
pub const IMPOSSIBLE: &str = "IMPOSSIBLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Goal,
    ReadFile,
    DirectoryStructure,
    RequestClarification,
    WriteCode,
    ModifyStoredCode,
    InsertCodeAtCursor,
    ReplaceSelectedCode,
    ActiveEditorFilepath,
    SelectedText,
    CreateFile,
    CreateDirectory,
    MoveFile,
}

/// What a finished minion hands up to its boss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKnowledge {
    /// A model-selected subset of the minion's knowledge.
    Selected,
    /// Only the entry stored under the minion's first argument.
    Keyed,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct ActionMetadata {
    pub grammar: Grammar,
    /// Human label per grammar token, used to render the grammar for prompts.
    pub interpretation: Vec<&'static str>,
    pub description: &'static str,
    /// Kinds a node of this kind may create as minions.
    pub palette: &'static [ActionKind],
    pub triggers_replan: bool,
    pub share: ShareKnowledge,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        ActionKind::Goal,
        ActionKind::ReadFile,
        ActionKind::DirectoryStructure,
        ActionKind::RequestClarification,
        ActionKind::WriteCode,
        ActionKind::ModifyStoredCode,
        ActionKind::InsertCodeAtCursor,
        ActionKind::ReplaceSelectedCode,
        ActionKind::ActiveEditorFilepath,
        ActionKind::SelectedText,
        ActionKind::CreateFile,
        ActionKind::CreateDirectory,
        ActionKind::MoveFile,
    ];

    pub fn verb(self) -> &'static str {
        match self {
            ActionKind::Goal => "GOAL",
            ActionKind::ReadFile => "READFILE",
            ActionKind::DirectoryStructure => "GET-DIRECTORY-STRUCTURE-DESCRIPTION",
            ActionKind::RequestClarification => "REQUEST-CLARIFICATION",
            ActionKind::WriteCode => "WRITE-CODE",
            ActionKind::ModifyStoredCode => "MODIFY-STORED-CODE",
            ActionKind::InsertCodeAtCursor => "INSERT-CODE-AT-CURSOR-POSITION",
            ActionKind::ReplaceSelectedCode => "REPLACE-SELECTED-CODE-WITH-NEW-CODE",
            ActionKind::ActiveEditorFilepath => "GET-ACTIVE-EDITOR-FILEPATH",
            ActionKind::SelectedText => "GET-SELECTED-TEXT-IN-ACTIVE-EDITOR",
            ActionKind::CreateFile => "CREATE-FILE",
            ActionKind::CreateDirectory => "CREATE-DIRECTORY",
            ActionKind::MoveFile => "MOVE-FILE",
        }
    }

    pub fn metadata(self) -> ActionMetadata {
        let verb = self.verb();
        let leaf = |grammar: Grammar,
                    interpretation: Vec<&'static str>,
                    description: &'static str,
                    share: ShareKnowledge| ActionMetadata {
            grammar,
            interpretation,
            description,
            palette: &[],
            triggers_replan: false,
            share,
        };
        match self {
            ActionKind::Goal => ActionMetadata {
                grammar: Grammar::new(verb).until_eol(),
                interpretation: vec![verb, "goal"],
                description: "Creates a new goal for a subordinate to plan and achieve. The goal should be narrower than your own",
                palette: &ActionKind::ALL,
                triggers_replan: true,
                share: ShareKnowledge::Selected,
            },
            ActionKind::ReadFile => leaf(
                Grammar::new(verb).quoted(),
                vec![verb, "file path"],
                "Reads the file at the given path, relative to the workspace root, and remembers its contents",
                ShareKnowledge::Selected,
            ),
            ActionKind::DirectoryStructure => leaf(
                Grammar::new(verb).quoted(),
                vec![verb, "directory path"],
                "Lists the files and directories inside the given directory, relative to the workspace root. Use \".\" for the root",
                ShareKnowledge::Selected,
            ),
            ActionKind::RequestClarification => ActionMetadata {
                triggers_replan: true,
                ..leaf(
                    Grammar::new(verb).until_eol(),
                    vec![verb, "question"],
                    "Asks the user a question when something about the goal is unclear",
                    ShareKnowledge::Selected,
                )
            },
            ActionKind::WriteCode => leaf(
                Grammar::new(verb).quoted().until_eol(),
                vec![verb, "memory location", "requirements"],
                "Writes code that meets the requirements and stores it at the given memory location",
                ShareKnowledge::Keyed,
            ),
            ActionKind::ModifyStoredCode => leaf(
                Grammar::new(verb).quoted().until_eol(),
                vec![verb, "memory location", "instructions"],
                "Changes the code stored at the given memory location according to the instructions",
                ShareKnowledge::Keyed,
            ),
            ActionKind::InsertCodeAtCursor => leaf(
                Grammar::new(verb).quoted(),
                vec![verb, "memory location"],
                "Inserts the code stored at the given memory location at the cursor in the active editor",
                ShareKnowledge::Nothing,
            ),
            ActionKind::ReplaceSelectedCode => leaf(
                Grammar::new(verb).quoted(),
                vec![verb, "memory location"],
                "Replaces the selected text in the active editor with the code stored at the given memory location",
                ShareKnowledge::Nothing,
            ),
            ActionKind::ActiveEditorFilepath => leaf(
                Grammar::new(verb).quoted(),
                vec![verb, "memory location"],
                "Stores the path of the file open in the active editor at the given memory location",
                ShareKnowledge::Keyed,
            ),
            ActionKind::SelectedText => leaf(
                Grammar::new(verb),
                vec![verb],
                "Remembers the text currently selected in the active editor",
                ShareKnowledge::Selected,
            ),
            ActionKind::CreateFile => leaf(
                Grammar::new(verb).quoted().quoted(),
                vec![verb, "file path", "memory location"],
                "Creates a file at the given path, relative to the workspace root, containing the text stored at the given memory location",
                ShareKnowledge::Nothing,
            ),
            ActionKind::CreateDirectory => leaf(
                Grammar::new(verb).quoted(),
                vec![verb, "directory path"],
                "Creates a directory, and any missing parents, at the given path relative to the workspace root",
                ShareKnowledge::Nothing,
            ),
            ActionKind::MoveFile => leaf(
                Grammar::new(verb).quoted().quoted(),
                vec![verb, "source path", "destination path"],
                "Moves or renames a file or directory within the workspace",
                ShareKnowledge::Nothing,
            ),
        }
    }

    /// One prompt line describing the action and its format, e.g.
    /// `Reads the file ... Format: READFILE "<file-path>"`.
    pub fn render_for_prompt(self) -> String {
        let metadata = self.metadata();
        let format: Vec<String> = metadata
            .grammar
            .tokens()
            .iter()
            .zip(&metadata.interpretation)
            .map(|(token, label)| render_token(token, label))
            .collect();
        format!("{}. Format: {}", metadata.description, format.join(" "))
    }
}

fn render_token(token: &Token, label: &str) -> String {
    let label = label.replace(' ', "-");
    match token {
        Token::Literal(keyword) => keyword.clone(),
        Token::QuotedOrWord => format!("\"<{label}>\""),
        Token::UntilEol => format!("<{label}>"),
        Token::UntilEof => format!("<{label}-multiline>"),
        Token::UntilSentinel(sentinel) => format!("<{label}-multiline> {sentinel}"),
    }
}

/// Resolve a parsed verb against a palette.
pub fn lookup(palette: &[ActionKind], verb: &str) -> Option<ActionKind> {
    palette.iter().copied().find(|kind| kind.verb() == verb)
}

/// Grammars a planner's reply is parsed with: the palette's actions followed
/// by the plan-ending replies.
pub fn planning_grammars(palette: &[ActionKind]) -> Vec<Grammar> {
    palette
        .iter()
        .map(|kind| kind.metadata().grammar)
        .chain([REFUSE, IMPOSSIBLE, ACHIEVED].map(Grammar::new))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_are_unique_and_resolve() {
        for kind in ActionKind::ALL {
            assert_eq!(lookup(&ActionKind::ALL, kind.verb()), Some(kind));
            assert_eq!(kind.metadata().grammar.verb(), kind.verb());
        }
        assert_eq!(lookup(&ActionKind::ALL, "readfile"), None);
        assert_eq!(lookup(&[], "READFILE"), None);
    }

    #[test]
    fn interpretation_covers_every_token() {
        for kind in ActionKind::ALL {
            let metadata = kind.metadata();
            assert_eq!(
                metadata.interpretation.len(),
                metadata.grammar.tokens().len(),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn only_goals_have_a_palette() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.metadata().palette.is_empty(), kind != ActionKind::Goal);
        }
    }

    #[test]
    fn replan_triggers() {
        let triggering: Vec<ActionKind> = ActionKind::ALL
            .into_iter()
            .filter(|kind| kind.metadata().triggers_replan)
            .collect();
        assert_eq!(
            triggering,
            vec![ActionKind::Goal, ActionKind::RequestClarification]
        );
    }

    #[test]
    fn renders_grammar_for_prompts() {
        assert_eq!(
            ActionKind::MoveFile.render_for_prompt(),
            "Moves or renames a file or directory within the workspace. Format: MOVE-FILE \"<source-path>\" \"<destination-path>\""
        );
        assert!(
            ActionKind::WriteCode
                .render_for_prompt()
                .ends_with("Format: WRITE-CODE \"<memory-location>\" <requirements>")
        );
    }

    #[test]
    fn planning_grammars_end_with_exit_replies() {
        let grammars = planning_grammars(&[ActionKind::ReadFile]);
        let verbs: Vec<&str> = grammars.iter().map(Grammar::verb).collect();
        assert_eq!(verbs, vec!["READFILE", REFUSE, IMPOSSIBLE, ACHIEVED]);
    }
}
