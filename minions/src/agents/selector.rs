//! Knowledge selection: asks the model which numbered items matter.

use tracing::debug;

use crate::agents::{AgentContext, Step, ask_model};
use crate::core::grammar::Grammar;
use crate::core::knowledge::{KnowledgeBank, parse_selection_number};
use crate::core::parser::CommandParser;

const SELECT: &str = "SELECT";
const NONE: &str = "NONE";

/// Grammars for a selection reply: `SELECT <number>` lines or `NONE`.
pub fn selection_grammars() -> Vec<Grammar> {
    vec![Grammar::new(SELECT).until_eol(), Grammar::new(NONE)]
}

/// 1-based item numbers picked by a selection reply, in reply order.
pub fn selected_numbers(reply: &str) -> Vec<usize> {
    CommandParser::new(selection_grammars())
        .parse(reply)
        .into_iter()
        .filter(|command| command.verb == SELECT)
        .filter_map(|command| command.arg1.as_deref().and_then(parse_selection_number))
        .collect()
}

/// Pick the entries of `candidates` relevant to the situation described by
/// `preamble`. An empty bank is answered without a model call.
pub(crate) fn select_relevant(
    ctx: &AgentContext<'_>,
    preamble: &[String],
    candidates: &KnowledgeBank,
) -> Step<KnowledgeBank> {
    if candidates.is_empty() {
        return Ok(KnowledgeBank::new());
    }
    let prompt = ctx
        .prompts
        .knowledge_selection(preamble, &candidates.numbered_questions())?;
    let reply = ask_model(ctx, "Selecting relevant knowledge", &prompt)?;
    let picked = candidates.select_numbers(selected_numbers(&reply));
    debug!(candidates = candidates.len(), picked = picked.len(), "selected knowledge");
    Ok(picked)
}
