//! Command parser: turns a free-form model reply into typed commands.
//!
//! The parser repeatedly trims leading whitespace and tries each grammar in
//! order at the current position. The first grammar that matches yields a
//! [`Command`]; when none matches, the current line is discarded as chatter.
//! Parsing never fails: unrecognized text simply produces no commands.

use serde::Serialize;

use crate::core::grammar::Grammar;

/// A recognized command: its verb plus up to three captured arguments.
///
/// Empty captures are reported as absent. Captures beyond the third are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub verb: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg3: Option<String>,
}

impl Command {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            arg1: None,
            arg2: None,
            arg3: None,
        }
    }

    pub fn from_fields(verb: &str, fields: Vec<String>) -> Self {
        let mut args = fields.into_iter().map(|field| (!field.is_empty()).then_some(field));
        Self {
            verb: verb.to_string(),
            arg1: args.next().flatten(),
            arg2: args.next().flatten(),
            arg3: args.next().flatten(),
        }
    }

    pub fn with_arg(mut self, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        if self.arg1.is_none() {
            self.arg1 = value;
        } else if self.arg2.is_none() {
            self.arg2 = value;
        } else {
            self.arg3 = value;
        }
        self
    }

    pub fn into_args(self) -> [Option<String>; 3] {
        [self.arg1, self.arg2, self.arg3]
    }
}

/// Parser over an ordered grammar set. Earlier grammars win ties.
#[derive(Debug, Clone)]
pub struct CommandParser {
    grammars: Vec<Grammar>,
}

impl CommandParser {
    pub fn new(grammars: impl IntoIterator<Item = Grammar>) -> Self {
        Self {
            grammars: grammars.into_iter().collect(),
        }
    }

    pub fn grammars(&self) -> &[Grammar] {
        &self.grammars
    }

    /// Extract every command from `text`, in order of appearance.
    pub fn parse(&self, text: &str) -> Vec<Command> {
        let mut commands = Vec::new();
        let mut rest = text;
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            let matched = self.grammars.iter().find_map(|grammar| {
                grammar
                    .match_prefix(rest)
                    .filter(|m| m.rest.len() < rest.len())
                    .map(|m| (grammar, m))
            });
            match matched {
                Some((grammar, m)) => {
                    commands.push(Command::from_fields(grammar.verb(), m.fields));
                    rest = m.rest;
                }
                None => rest = discard_line(rest),
            }
        }
        commands
    }
}

fn discard_line(text: &str) -> &str {
    match text.find('\n') {
        Some(end) => &text[end + 1..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_parser() -> CommandParser {
        CommandParser::new([
            Grammar::new("READFILE").quoted(),
            Grammar::new("GOAL").until_eol(),
            Grammar::new("MOVE-FILE").quoted().quoted(),
            Grammar::new("ACHIEVED"),
        ])
    }

    #[test]
    fn chatter_between_commands_is_ignored() {
        let reply = "Sure! Here is my plan:\n\n1. READFILE \"Cargo.toml\"\nThat should tell us the crate name.\n2. GOAL \"rename the crate\"\nLet me know if that helps.";
        let commands = plan_parser().parse(reply);
        assert_eq!(
            commands,
            vec![
                Command::new("READFILE").with_arg("Cargo.toml"),
                Command::new("GOAL").with_arg("rename the crate"),
            ]
        );
    }

    #[test]
    fn unknown_text_yields_nothing() {
        assert!(plan_parser().parse("I cannot help with that.\nSorry.").is_empty());
        assert!(plan_parser().parse("").is_empty());
        assert!(plan_parser().parse("   \n\t\n").is_empty());
    }

    #[test]
    fn two_commands_on_one_line() {
        let commands = plan_parser().parse("READFILE a.txt READFILE b.txt");
        assert_eq!(
            commands,
            vec![
                Command::new("READFILE").with_arg("a.txt"),
                Command::new("READFILE").with_arg("b.txt"),
            ]
        );
    }

    #[test]
    fn incomplete_command_is_discarded_with_its_line() {
        let commands = plan_parser().parse("MOVE-FILE \"a.txt\"\n\"b.txt\"\nACHIEVED");
        assert_eq!(commands, vec![Command::new("ACHIEVED")]);
    }

    #[test]
    fn empty_capture_becomes_absent() {
        let commands = plan_parser().parse("GOAL \"\"");
        assert_eq!(commands, vec![Command::new("GOAL")]);
    }

    #[test]
    fn extra_captures_are_dropped() {
        let parser = CommandParser::new([Grammar::new("X")
            .quoted()
            .quoted()
            .quoted()
            .quoted()]);
        let commands = parser.parse("X a b c d");
        assert_eq!(
            commands,
            vec![Command::new("X").with_arg("a").with_arg("b").with_arg("c")]
        );
    }

    #[test]
    fn sentinel_capture_survives_decoys() {
        let parser = CommandParser::new([Grammar::new("BEGINCODE").until("ENDCODE")]);
        let reply = "Here you go:\nBEGINCODE\nconst END: &str = \"ENDCODE\";\nENDCODE\nDone.";
        let commands = parser.parse(reply);
        assert_eq!(
            commands,
            vec![Command::new("BEGINCODE").with_arg("const END: &str = \"ENDCODE\";")]
        );
    }

    #[test]
    fn sentinel_capture_hides_commands_inside_it() {
        let parser = CommandParser::new([
            Grammar::new("READFILE").quoted(),
            Grammar::new("BEGIN").quoted().until("END"),
        ]);
        let commands = parser.parse("BEGIN key\nline one\nREADFILE x\nEND");
        assert_eq!(
            commands,
            vec![Command::new("BEGIN").with_arg("key").with_arg("line one\nREADFILE x")]
        );
    }

    #[test]
    fn trailing_text_after_a_bare_word_is_ignored() {
        let commands = plan_parser().parse("READFILE bareword \"ignored\"");
        assert_eq!(commands, vec![Command::new("READFILE").with_arg("bareword")]);
    }

    #[test]
    fn to_end_of_input_capture_stops_parsing() {
        let parser = CommandParser::new([
            Grammar::new("NOTE").until_eof(),
            Grammar::new("ACHIEVED"),
        ]);
        let commands = parser.parse("NOTE keep going\nACHIEVED");
        assert_eq!(
            commands,
            vec![Command::new("NOTE").with_arg("keep going\nACHIEVED")]
        );
    }
}
