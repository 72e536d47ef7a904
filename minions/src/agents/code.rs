//! Leaf actions that produce code into a memory location.

use tracing::debug;

use crate::agents::selector::select_relevant;
use crate::agents::{AgentContext, Step, ask_model, required_arg, stored_value};
use crate::core::arena::{NodeId, TaskArena};
use crate::core::grammar::Grammar;
use crate::core::parser::CommandParser;
use crate::core::status::{Failure, StatusReport};

const BEGIN_CODE: &str = "BEGINCODE";
const END_CODE: &str = "ENDCODE";

/// Grammars for a code reply: a `BEGINCODE` line, the code, an `ENDCODE` line.
pub fn code_grammars() -> Vec<Grammar> {
    vec![Grammar::new(BEGIN_CODE).until(END_CODE)]
}

/// First `BEGINCODE ... ENDCODE` block in a reply.
pub fn extract_code(reply: &str) -> Option<String> {
    CommandParser::new(code_grammars())
        .parse(reply)
        .into_iter()
        .find_map(|command| command.arg1)
}

pub(crate) fn write_code(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> Step<StatusReport> {
    let key = required_arg(arena, id, 0, "memory location")?;
    let requirements = required_arg(arena, id, 1, "requirements")?;

    let preamble = vec![
        format!("You have been asked to write code that meets these requirements: \"{requirements}\"."),
        "You may need some of the knowledge below to write this code.".to_string(),
    ];
    let knowledge = select_relevant(ctx, &preamble, &arena.knowledge_with_boss(id))?;
    let prompt = ctx.prompts.write_code(&requirements, &knowledge.render_qna())?;
    let reply = ask_model(ctx, &format!("Writing code for \"{requirements}\""), &prompt)?;

    let Some(code) = extract_code(&reply) else {
        return Ok(StatusReport::failed(
            Failure::DidNotAchieveGoal,
            "the reply contained no BEGINCODE block",
        ));
    };
    debug!(key = %key, bytes = code.len(), "storing written code");
    arena.store_knowledge(id, key.as_str(), code);
    Ok(StatusReport::finished(format!("Wrote code and stored it at \"{key}\"")))
}

pub(crate) fn modify_stored_code(
    arena: &mut TaskArena,
    id: NodeId,
    ctx: &AgentContext<'_>,
) -> Step<StatusReport> {
    let key = required_arg(arena, id, 0, "memory location")?;
    let instructions = required_arg(arena, id, 1, "instructions")?;
    let code = stored_value(arena, id, &key)?;

    let prompt = ctx.prompts.modify_code(&instructions, &code)?;
    let reply = ask_model(ctx, &format!("Modifying the code at \"{key}\""), &prompt)?;

    let Some(modified) = extract_code(&reply) else {
        return Ok(StatusReport::failed(
            Failure::InsufficientAiResponse,
            "the reply contained no BEGINCODE block",
        ));
    };
    arena.store_knowledge(id, key.as_str(), modified);
    Ok(StatusReport::finished(format!("Modified the code stored at \"{key}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::execute_node;
    use crate::core::palette::ActionKind;
    use crate::core::status::Status;
    use crate::test_support::{Harness, minion_of_root};

    #[test]
    fn extracts_the_first_block() {
        let reply = "Sure:\nBEGINCODE\nfn a() {}\nENDCODE\nBEGINCODE\nfn b() {}\nENDCODE";
        assert_eq!(extract_code(reply), Some("fn a() {}".to_string()));
        assert_eq!(extract_code("no code here"), None);
    }

    #[test]
    fn write_code_stores_under_the_key() {
        // No knowledge in scope, so the only model call is the code request.
        let harness = Harness::new(vec!["BEGINCODE\nfn greet() {}\nENDCODE"]);
        let (mut arena, id) = minion_of_root(ActionKind::WriteCode, &["greeting", "a greet function"]);

        let report = execute_node(&mut arena, id, &harness.context());

        assert_eq!(report.status, Status::Finished);
        assert_eq!(arena.node(id).knowledge.get("greeting"), Some("fn greet() {}"));
        assert_eq!(harness.llm.calls(), 1);
        assert!(harness.llm.user_prompt(0).starts_with("Your assignment: "));
    }

    #[test]
    fn write_code_selects_knowledge_first() {
        let harness = Harness::new(vec!["SELECT 1", "BEGINCODE\nlet x = 1;\nENDCODE"]);
        let (mut arena, id) = minion_of_root(ActionKind::WriteCode, &["snippet", "use the style guide"]);
        let boss = arena.node(id).boss.expect("boss");
        arena.store_knowledge(boss, "Contents of \"STYLE.md\"", "four spaces");

        let report = execute_node(&mut arena, id, &harness.context());

        assert_eq!(report.status, Status::Finished);
        assert!(harness.llm.user_prompt(1).contains("- Question: \"Contents of \"STYLE.md\"\". Answer: \"four spaces\""));
    }

    #[test]
    fn write_code_without_block_does_not_achieve_goal() {
        let harness = Harness::new(vec!["I'd rather not."]);
        let (mut arena, id) = minion_of_root(ActionKind::WriteCode, &["k", "anything"]);
        let report = execute_node(&mut arena, id, &harness.context());
        assert_eq!(report.status, Status::Failed(Failure::DidNotAchieveGoal));
        assert!(arena.node(id).knowledge.is_empty());
    }

    #[test]
    fn modify_requires_stored_code() {
        let harness = Harness::new(Vec::<&str>::new());
        let (mut arena, id) = minion_of_root(ActionKind::ModifyStoredCode, &["missing", "rename"]);
        let report = execute_node(&mut arena, id, &harness.context());
        assert_eq!(report.status, Status::Failed(Failure::InvalidArgument));
        assert_eq!(harness.llm.calls(), 0);
    }

    #[test]
    fn modify_replaces_the_stored_code() {
        let harness = Harness::new(vec!["BEGINCODE\nlet total = 1;\nENDCODE"]);
        let (mut arena, id) = minion_of_root(ActionKind::ModifyStoredCode, &["snippet", "rename x to total"]);
        let boss = arena.node(id).boss.expect("boss");
        arena.store_knowledge(boss, "snippet", "let x = 1;");

        let report = execute_node(&mut arena, id, &harness.context());

        assert_eq!(report.status, Status::Finished);
        assert_eq!(arena.node(id).knowledge.get("snippet"), Some("let total = 1;"));
        assert!(harness.llm.user_prompt(0).contains("let x = 1;"));
    }

    #[test]
    fn modify_without_block_is_insufficient() {
        let harness = Harness::new(vec!["Done!"]);
        let (mut arena, id) = minion_of_root(ActionKind::ModifyStoredCode, &["snippet", "rename"]);
        let boss = arena.node(id).boss.expect("boss");
        arena.store_knowledge(boss, "snippet", "let x = 1;");
        let report = execute_node(&mut arena, id, &harness.context());
        assert_eq!(report.status, Status::Failed(Failure::InsufficientAiResponse));
    }
}
