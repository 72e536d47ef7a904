//! The goal-planning engine.
//!
//! A goal node alternates between planning and executing:
//!
//! 1. When a plan is needed, select relevant knowledge, ask the model for the
//!    remaining actions, and splice them in at the cursor. Unexecuted minions
//!    from the previous plan are retired.
//! 2. Execute the minion at the cursor.
//!    - Fatal failures (cancellation, bad key, rate limit, missing workspace)
//!      end the goal with the minion's status, unchanged.
//!    - Other failures advance the cursor and force a replan.
//!    - Successes hand knowledge up and replan only if the minion's kind asks
//!      for it.
//!
//! The loop is bounded by [`EngineSettings::max_steps`](crate::agents::EngineSettings),
//! and a goal nested deeper than `max_depth` fails without planning.

use tracing::{debug, info, instrument, warn};

use crate::agents::selector::select_relevant;
use crate::agents::{AgentContext, Step, ask_model, execute_node, purpose, required_arg, share_knowledge_with_boss};
use crate::core::arena::{NodeId, TaskArena};
use crate::core::palette::ActionKind;
use crate::core::plan::{PlanReply, interpret_reply};
use crate::core::status::{Failure, StatusReport};
use crate::io::prompt::PlanningPrompt;

/// Result of pursuing a top-level goal.
#[derive(Debug, Clone)]
pub struct GoalRun {
    pub arena: TaskArena,
    pub root: NodeId,
    pub report: StatusReport,
}

/// Build a root goal node for `goal` and pursue it to a terminal status.
#[instrument(skip_all)]
pub fn run_goal(goal: &str, ctx: &AgentContext<'_>) -> GoalRun {
    let mut arena = TaskArena::new();
    let root = arena.add_root(ActionKind::Goal, [Some(goal.to_string()), None, None]);
    info!(goal, max_steps = ctx.settings.max_steps, "pursuing goal");
    let report = execute_node(&mut arena, root, ctx);
    ctx.progress.close();
    info!(status = %report.status, nodes = arena.len(), "goal run finished");
    GoalRun {
        arena,
        root,
        report,
    }
}

pub(crate) fn pursue(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> Step<StatusReport> {
    let goal = required_arg(arena, id, 0, "goal")?;
    let depth = arena.ancestors(id).count();
    if depth > ctx.settings.max_depth as usize {
        warn!(depth, max_depth = ctx.settings.max_depth, "goal nested too deeply");
        return Ok(StatusReport::failed(
            Failure::DidNotAchieveGoal,
            format!(
                "sub-goals may nest at most {} levels deep",
                ctx.settings.max_depth
            ),
        ));
    }
    let mut cursor = 0usize;
    let mut needs_planning = true;

    for step in 1..=ctx.settings.max_steps {
        if needs_planning {
            let Some(minions) = plan(arena, id, ctx)? else {
                arena.splice_plan(id, cursor, Vec::new());
                return Ok(StatusReport::finished(format!("Achieved \"{goal}\"")));
            };
            let retired = arena.splice_plan(id, cursor, minions);
            if !retired.is_empty() {
                debug!(retired = retired.len(), "retired unexecuted minions");
            }
            needs_planning = false;
        }

        let Some(&minion) = arena.plan(id).get(cursor) else {
            debug!(step, cursor, "plan exhausted, replanning");
            needs_planning = true;
            continue;
        };

        let report = execute_node(arena, minion, ctx);
        cursor += 1;
        if report.status.is_fatal_failure() {
            return Ok(report);
        }
        if report.status.is_failure() {
            debug!(step, minion = minion.index(), "minion failed, replanning");
            needs_planning = true;
            continue;
        }
        needs_planning |= arena.node(minion).kind.metadata().triggers_replan;
        share_knowledge_with_boss(arena, minion, ctx)?;
    }

    warn!(max_steps = ctx.settings.max_steps, "goal ran out of steps");
    Ok(StatusReport::failed(
        Failure::DidNotAchieveGoal,
        format!("gave up after {} steps", ctx.settings.max_steps),
    ))
}

/// Ask the model for the rest of the plan. `None` means the goal is complete.
fn plan(arena: &mut TaskArena, id: NodeId, ctx: &AgentContext<'_>) -> Step<Option<Vec<NodeId>>> {
    let node_purpose = purpose(arena, id);
    let reasons: Vec<String> = arena.ancestors(id).map(|boss| purpose(arena, boss)).collect();
    let finished: Vec<String> = arena
        .executed_minions(id)
        .map(|minion| match &minion.message {
            Some(message) => format!("- {}: \"{}\" ({message})", minion.status, purpose(arena, minion.id)),
            None => format!("- {}: \"{}\"", minion.status, purpose(arena, minion.id)),
        })
        .collect();

    let preamble = vec![
        format!("You have been asked to \"{node_purpose}\"."),
        "Before planning, you are choosing which of the knowledge gathered so far is useful."
            .to_string(),
    ];
    let knowledge = select_relevant(ctx, &preamble, &arena.knowledge_with_boss(id))?;

    let palette = arena.node(id).kind.metadata().palette;
    let actions: Vec<String> = palette.iter().map(|kind| kind.render_for_prompt()).collect();
    let prompt = ctx.prompts.planning(&PlanningPrompt {
        purpose: &node_purpose,
        reasons: &reasons,
        finished: &finished,
        knowledge: &knowledge.render_qna(),
        actions: &actions,
    })?;
    let reply = ask_model(ctx, &format!("Planning how to \"{node_purpose}\""), &prompt)?;

    match interpret_reply(palette, &reply) {
        PlanReply::Actions(actions) => {
            info!(minions = actions.len(), "planned");
            let minions = actions
                .into_iter()
                .map(|(kind, command)| arena.add_minion(id, kind, command.into_args()))
                .collect();
            Ok(Some(minions))
        }
        PlanReply::Complete => {
            info!("planner reports the goal is complete");
            Ok(None)
        }
        PlanReply::Declined { verb } => Err(StatusReport::failed(
            Failure::DidNotAchieveGoal,
            format!("the planner answered {verb}"),
        )
        .into()),
        PlanReply::Unparseable => Err(StatusReport::failed(
            Failure::NoParseablePlan,
            "the planner's reply contained no recognizable actions",
        )
        .into()),
    }
}
