//! Goal-planning development agent.
//!
//! A user goal becomes the root of a tree of task nodes. Goal nodes ask a
//! language model for a plan, parse the free-form reply into typed commands,
//! and execute the resulting minions one by one, replanning whenever a step
//! fails or reveals new knowledge. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (grammar matching, command parsing,
//!   knowledge banks, statuses, the node arena, the action palette).
//! - **[`io`]**: Side-effecting collaborators (model transport, workspace,
//!   editor, user prompts, cancellation, prompts, config, run logs).
//! - **[`agents`]**: Behaviour of each node kind, wiring core logic to the
//!   collaborators passed in through [`agents::AgentContext`].

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
