//! Agent configuration stored under `.minions/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Agent configuration (TOML). Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MinionsConfig {
    /// Upper bound on iterations of a single goal's plan/execute loop.
    pub max_steps: u32,

    /// How many levels of sub-goals may nest below the root goal.
    pub max_depth: u32,

    /// Wall-clock budget for a whole run; exceeding it cancels the run.
    pub run_timeout_secs: u64,

    pub llm: LlmConfig,
}

/// How the model is reached: a command that reads the transcript on stdin
/// and prints its reply on stdout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    /// Command line, e.g. `["llm", "-m", "gpt-4o"]`.
    pub command: Vec<String>,

    pub input_format: InputFormat,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Replies longer than this many bytes are truncated.
    pub output_limit_bytes: usize,

    /// Environment variable that must hold the API key. Checked before the
    /// command is spawned; unset means no check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Role-tagged plain text sections.
    #[default]
    Text,
    /// JSON array of `{ "role", "content" }` messages.
    Json,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm".to_string()],
            input_format: InputFormat::Text,
            timeout_secs: 5 * 60,
            output_limit_bytes: 200_000,
            api_key_env: None,
        }
    }
}

impl Default for MinionsConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            max_depth: 5,
            run_timeout_secs: 60 * 60,
            llm: LlmConfig::default(),
        }
    }
}

impl MinionsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be > 0"));
        }
        if self.max_depth == 0 {
            return Err(anyhow!("max_depth must be > 0"));
        }
        if self.run_timeout_secs == 0 {
            return Err(anyhow!("run_timeout_secs must be > 0"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(anyhow!("llm.timeout_secs must be > 0"));
        }
        if self.llm.output_limit_bytes == 0 {
            return Err(anyhow!("llm.output_limit_bytes must be > 0"));
        }
        if self.llm.command.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(anyhow!("llm.command must be a non-empty array"));
        }
        if self
            .llm
            .api_key_env
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(anyhow!("llm.api_key_env must not be blank"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `MinionsConfig::default()`.
pub fn load_config(path: &Path) -> Result<MinionsConfig> {
    if !path.exists() {
        let cfg = MinionsConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MinionsConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &MinionsConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, MinionsConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let mut cfg = MinionsConfig::default();
        cfg.llm.api_key_env = Some("OPENAI_API_KEY".to_string());
        cfg.llm.input_format = InputFormat::Json;
        write_config(&path, &cfg).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_steps = 4\n[llm]\ncommand = [\"sh\", \"-c\", \"cat\"]\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_steps, 4);
        assert_eq!(cfg.max_depth, MinionsConfig::default().max_depth);
        assert_eq!(cfg.llm.command, vec!["sh", "-c", "cat"]);
        assert_eq!(cfg.llm.timeout_secs, LlmConfig::default().timeout_secs);
    }

    #[test]
    fn rejects_zero_steps_and_empty_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_steps = 0\n").expect("write");
        assert!(load_config(&path).is_err());

        fs::write(&path, "max_depth = 0\n").expect("write");
        assert!(load_config(&path).is_err());

        let mut cfg = MinionsConfig::default();
        cfg.llm.command = vec![" ".to_string()];
        assert!(cfg.validate().is_err());
    }
}
