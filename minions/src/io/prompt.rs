//! Prompt rendering for model requests.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");
const PLAN_TEMPLATE: &str = include_str!("prompts/plan.md");
const SELECT_KNOWLEDGE_TEMPLATE: &str = include_str!("prompts/select_knowledge.md");
const WRITE_CODE_TEMPLATE: &str = include_str!("prompts/write_code.md");
const MODIFY_CODE_TEMPLATE: &str = include_str!("prompts/modify_code.md");

/// Inputs for a goal's planning request.
#[derive(Debug, Clone, Default)]
pub struct PlanningPrompt<'a> {
    pub purpose: &'a str,
    /// Purposes of the ancestors, nearest first.
    pub reasons: &'a [String],
    /// One line per executed minion with its status.
    pub finished: &'a [String],
    /// Selected knowledge rendered as question/answer bullets.
    pub knowledge: &'a [String],
    /// Palette actions rendered with their formats.
    pub actions: &'a [String],
}

/// Template engine wrapper around minijinja.
pub struct Prompts {
    env: Environment<'static>,
}

impl Prompts {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in [
            ("plan", PLAN_TEMPLATE),
            ("select_knowledge", SELECT_KNOWLEDGE_TEMPLATE),
            ("write_code", WRITE_CODE_TEMPLATE),
            ("modify_code", MODIFY_CODE_TEMPLATE),
        ] {
            env.add_template(name, source)
                .with_context(|| format!("load {name} template"))?;
        }
        Ok(Self { env })
    }

    pub fn system(&self) -> &'static str {
        SYSTEM_PROMPT.trim_end()
    }

    pub fn planning(&self, input: &PlanningPrompt<'_>) -> Result<String> {
        let template = self.env.get_template("plan")?;
        let rendered = template.render(context! {
            purpose => input.purpose,
            reasons => input.reasons,
            finished => input.finished,
            knowledge => input.knowledge,
            actions => input.actions,
        })?;
        Ok(rendered)
    }

    pub fn knowledge_selection(&self, preamble: &[String], items: &[String]) -> Result<String> {
        let template = self.env.get_template("select_knowledge")?;
        let rendered = template.render(context! { preamble => preamble, items => items })?;
        Ok(rendered)
    }

    pub fn write_code(&self, requirements: &str, knowledge: &[String]) -> Result<String> {
        let template = self.env.get_template("write_code")?;
        let rendered = template.render(context! { requirements => requirements, knowledge => knowledge })?;
        Ok(rendered)
    }

    pub fn modify_code(&self, instructions: &str, code: &str) -> Result<String> {
        let template = self.env.get_template("modify_code")?;
        let rendered = template.render(context! { instructions => instructions, code => code })?;
        Ok(rendered)
    }
}
