//! Pure, deterministic logic: no I/O, no model calls.

pub mod arena;
pub mod grammar;
pub mod knowledge;
pub mod palette;
pub mod parser;
pub mod plan;
pub mod status;
