//! Interpretation of a planner's reply.

use crate::core::palette::{ACHIEVED, ActionKind, IMPOSSIBLE, REFUSE, lookup, planning_grammars};
use crate::core::parser::{Command, CommandParser};

/// What a planning reply asks the goal engine to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanReply {
    /// New minions, in order, to splice in at the cursor.
    Actions(Vec<(ActionKind, Command)>),
    /// The goal needs no further work.
    Complete,
    /// The model declined or judged the goal impossible.
    Declined { verb: &'static str },
    /// Non-blank reply containing nothing recognizable.
    Unparseable,
}

/// Classify `reply` against `palette`.
///
/// Action commands win over `ACHIEVED` when both appear; a refusal anywhere
/// wins over everything. A blank reply counts as completion.
pub fn interpret_reply(palette: &[ActionKind], reply: &str) -> PlanReply {
    let commands = CommandParser::new(planning_grammars(palette)).parse(reply);
    if let Some(verb) = commands.iter().find_map(|command| match command.verb.as_str() {
        REFUSE => Some(REFUSE),
        IMPOSSIBLE => Some(IMPOSSIBLE),
        _ => None,
    }) {
        return PlanReply::Declined { verb };
    }

    let mut achieved = false;
    let mut actions = Vec::new();
    for command in commands {
        if command.verb == ACHIEVED {
            achieved = true;
        } else if let Some(kind) = lookup(palette, &command.verb) {
            actions.push((kind, command));
        }
    }

    if !actions.is_empty() {
        PlanReply::Actions(actions)
    } else if achieved || reply.trim().is_empty() {
        PlanReply::Complete
    } else {
        PlanReply::Unparseable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_in_reply_order() {
        let reply = "1. READFILE \"a.txt\"\n2. GOAL \"summarize a.txt\"";
        let PlanReply::Actions(actions) = interpret_reply(&ActionKind::ALL, reply) else {
            panic!("expected actions");
        };
        let kinds: Vec<ActionKind> = actions.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec![ActionKind::ReadFile, ActionKind::Goal]);
        assert_eq!(actions[1].1.arg1.as_deref(), Some("summarize a.txt"));
    }

    #[test]
    fn blank_and_achieved_complete() {
        assert_eq!(interpret_reply(&ActionKind::ALL, ""), PlanReply::Complete);
        assert_eq!(interpret_reply(&ActionKind::ALL, "  \n"), PlanReply::Complete);
        assert_eq!(
            interpret_reply(&ActionKind::ALL, "All done.\nACHIEVED"),
            PlanReply::Complete
        );
    }

    #[test]
    fn refusal_wins() {
        assert_eq!(
            interpret_reply(&ActionKind::ALL, "READFILE a.txt\nIMPOSSIBLE"),
            PlanReply::Declined { verb: IMPOSSIBLE }
        );
        assert_eq!(
            interpret_reply(&ActionKind::ALL, "REFUSE"),
            PlanReply::Declined { verb: REFUSE }
        );
    }

    #[test]
    fn chatter_only_is_unparseable() {
        assert_eq!(
            interpret_reply(&ActionKind::ALL, "I would start by looking around."),
            PlanReply::Unparseable
        );
    }

    #[test]
    fn verbs_outside_the_palette_are_ignored() {
        assert_eq!(
            interpret_reply(&[ActionKind::ReadFile], "CREATE-DIRECTORY \"out\""),
            PlanReply::Unparseable
        );
    }
}
