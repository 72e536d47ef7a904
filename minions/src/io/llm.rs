//! Model transport.
//!
//! The [`LlmClient`] trait decouples the agents from the model backend.
//! [`CommandLlmClient`] spawns a configured command per request; tests use
//! scripted clients that return canned replies without spawning anything.

use std::cell::Cell;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::status::Failure;
use crate::io::config::{InputFormat, LlmConfig};
use crate::io::process::{ProcessRequest, run_process};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Outcome of one model request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmResponse {
    pub success: bool,
    /// Reply text on success, error detail otherwise.
    pub text: String,
    pub rate_limited: bool,
    pub bad_api_key: bool,
}

impl LlmResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            text: detail.into(),
            ..Self::default()
        }
    }

    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self {
            rate_limited: true,
            ..Self::error(detail)
        }
    }

    pub fn bad_api_key(detail: impl Into<String>) -> Self {
        Self {
            bad_api_key: true,
            ..Self::error(detail)
        }
    }

    /// Reply text, or the failure kind the response maps to.
    pub fn into_text(self) -> Result<String, (Failure, String)> {
        if self.bad_api_key {
            Err((Failure::BadApiKey, self.text))
        } else if self.rate_limited {
            Err((Failure::RateLimited, self.text))
        } else if !self.success {
            Err((Failure::OtherApiError, self.text))
        } else {
            Ok(self.text)
        }
    }
}

/// Abstraction over model backends.
pub trait LlmClient {
    /// Send a transcript and return the reply. Transport problems are
    /// reported through the response flags, never by panicking.
    fn respond(&self, messages: &[ChatMessage]) -> LlmResponse;
}

/// Client that runs a configured command, writes the transcript to its stdin
/// and takes stdout as the reply.
pub struct CommandLlmClient {
    config: LlmConfig,
    workdir: PathBuf,
}

impl CommandLlmClient {
    pub fn new(config: LlmConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            workdir: workdir.into(),
        }
    }

    fn run(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let transcript = render_transcript(messages, self.config.input_format)?;
        let request = ProcessRequest {
            argv: self.config.command.clone(),
            workdir: self.workdir.clone(),
            stdin: transcript.into_bytes(),
            timeout: Duration::from_secs(self.config.timeout_secs),
            output_limit_bytes: self.config.output_limit_bytes,
        };
        let output = run_process(&request).context("run model command")?;
        if output.timed_out {
            warn!(timeout_secs = self.config.timeout_secs, "model command timed out");
            return Ok(LlmResponse::error(format!(
                "model command timed out after {}s",
                self.config.timeout_secs
            )));
        }
        if !output.status.success() {
            let stderr = output.stderr_text();
            warn!(exit_code = ?output.status.code(), "model command failed");
            return Ok(classify_failure(stderr.trim()));
        }
        Ok(LlmResponse::ok(output.stdout_text()))
    }
}

impl LlmClient for CommandLlmClient {
    #[instrument(skip_all, fields(messages = messages.len()))]
    fn respond(&self, messages: &[ChatMessage]) -> LlmResponse {
        if let Some(name) = self.config.api_key_env.as_deref()
            && !std::env::var(name).is_ok_and(|value| !value.trim().is_empty())
        {
            warn!(env = name, "API key variable is not set");
            return LlmResponse::bad_api_key(format!("environment variable {name} is not set"));
        }
        info!("asking model");
        match self.run(messages) {
            Ok(response) => {
                debug!(success = response.success, bytes = response.text.len(), "model replied");
                response
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "model request failed");
                LlmResponse::error(format!("{err:#}"))
            }
        }
    }
}

/// Wrapper that counts requests for the run log.
pub struct CountingLlm<C> {
    inner: C,
    calls: Cell<u32>,
}

impl<C: LlmClient> CountingLlm<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl<C: LlmClient> LlmClient for CountingLlm<C> {
    fn respond(&self, messages: &[ChatMessage]) -> LlmResponse {
        self.calls.set(self.calls.get() + 1);
        self.inner.respond(messages)
    }
}

fn render_transcript(messages: &[ChatMessage], format: InputFormat) -> Result<String> {
    match format {
        InputFormat::Json => serde_json::to_string(messages).context("serialize transcript"),
        InputFormat::Text => {
            let sections: Vec<String> = messages
                .iter()
                .map(|message| {
                    let role = match message.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    };
                    format!("[{role}]\n{}\n", message.content)
                })
                .collect();
            Ok(sections.join("\n"))
        }
    }
}

fn classify_failure(stderr: &str) -> LlmResponse {
    let lower = stderr.to_lowercase();
    let detail = if stderr.is_empty() {
        "model command failed".to_string()
    } else {
        stderr.to_string()
    };
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit") {
        LlmResponse::rate_limited(detail)
    } else if lower.contains("401")
        || lower.contains("api key")
        || lower.contains("api_key")
        || lower.contains("unauthorized")
    {
        LlmResponse::bad_api_key(detail)
    } else {
        LlmResponse::error(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(script: &str) -> CommandLlmClient {
        let config = LlmConfig {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            timeout_secs: 10,
            ..LlmConfig::default()
        };
        CommandLlmClient::new(config, std::env::temp_dir())
    }

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("Your assignment: say hi"),
        ]
    }

    #[test]
    fn stdout_becomes_the_reply() {
        let response = client("cat >/dev/null; echo ACHIEVED").respond(&transcript());
        assert_eq!(response, LlmResponse::ok("ACHIEVED\n"));
    }

    #[test]
    fn text_transcript_tags_roles() {
        let response = client("cat").respond(&transcript());
        assert_eq!(
            response.text,
            "[system]\nbe brief\n\n[user]\nYour assignment: say hi\n"
        );
    }

    #[test]
    fn json_transcript_is_a_message_array() {
        let mut client = client("cat");
        client.config.input_format = InputFormat::Json;
        let response = client.respond(&transcript());
        let value: serde_json::Value = serde_json::from_str(&response.text).expect("json");
        assert_eq!(value[1]["role"], "user");
        assert_eq!(value[0]["content"], "be brief");
    }

    #[test]
    fn classifies_failures_from_stderr() {
        let limited = client("echo 'HTTP 429 Too Many Requests' >&2; exit 1").respond(&transcript());
        assert_eq!(limited.into_text().unwrap_err().0, Failure::RateLimited);

        let bad_key = client("echo 'Error: invalid API key' >&2; exit 1").respond(&transcript());
        assert_eq!(bad_key.into_text().unwrap_err().0, Failure::BadApiKey);

        let other = client("exit 3").respond(&transcript());
        assert_eq!(other.into_text().unwrap_err().0, Failure::OtherApiError);
    }

    #[test]
    fn missing_api_key_skips_the_command() {
        let mut client = client("echo should-not-run");
        client.config.api_key_env = Some("MINIONS_TEST_KEY_THAT_IS_NEVER_SET".to_string());
        let response = client.respond(&transcript());
        assert!(response.bad_api_key);
        assert!(!response.success);
    }

    #[test]
    fn spawn_failure_is_an_api_error() {
        let config = LlmConfig {
            command: vec!["/definitely/not/a/model-binary".to_string()],
            ..LlmConfig::default()
        };
        let response = CommandLlmClient::new(config, std::env::temp_dir()).respond(&transcript());
        assert_eq!(response.into_text().unwrap_err().0, Failure::OtherApiError);
    }

    #[test]
    fn counting_wrapper_counts() {
        let counting = CountingLlm::new(client("cat >/dev/null; echo hi"));
        counting.respond(&transcript());
        counting.respond(&transcript());
        assert_eq!(counting.calls(), 2);
    }
}
