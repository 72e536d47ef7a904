//! Side-effecting collaborators: model transport, workspace, editor, user
//! prompts, cancellation, prompt rendering, config, and run logs.

pub mod config;
pub mod editor;
pub mod init;
pub mod llm;
pub mod process;
pub mod progress;
pub mod prompt;
pub mod run_log;
pub mod user;
pub mod workspace;
