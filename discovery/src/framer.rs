//! Response framing.
//!
//! The shell never signals the end of a response, so completion is inferred
//! by polling the [`ResponseBuffer`]:
//!
//! 1. the buffer ends with a prompt and holds reply text before it (fast
//!    path; a re-sent prompt or the echoed probe alone is not a reply),
//! 2. the buffer length is unchanged for `stability_polls` consecutive polls,
//! 3. the hard timeout for the probe kind elapses.
//!
//! A timeout is not an error. Whatever was captured is returned and the caller
//! decides whether it is usable.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::buffer::ResponseBuffer;
use crate::config::FramerConfig;
use crate::prompt::PromptMatcher;

/// Which bound applies to a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// The initial `help` probe.
    TopLevel,
    /// A `<path> --help` probe.
    Subcommand,
}

/// How a response was judged complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Prompt,
    Stable,
    TimedOut,
}

/// A framed response.
#[derive(Debug, Clone)]
pub struct FramedResponse {
    pub text: String,
    pub completion: Completion,
    pub elapsed: Duration,
}

impl FramedResponse {
    pub fn timed_out(&self) -> bool {
        self.completion == Completion::TimedOut
    }
}

/// Polls a [`ResponseBuffer`] until a response is complete.
#[derive(Debug, Clone)]
pub struct ResponseFramer {
    buffer: ResponseBuffer,
    prompt: PromptMatcher,
    config: FramerConfig,
}

impl ResponseFramer {
    pub fn new(buffer: ResponseBuffer, prompt: PromptMatcher, config: FramerConfig) -> Self {
        Self {
            buffer,
            prompt,
            config,
        }
    }

    pub fn buffer(&self) -> &ResponseBuffer {
        &self.buffer
    }

    /// Clears the buffer and starts capturing. Call before sending the probe.
    pub fn begin(&self) {
        self.buffer.begin();
    }

    /// Stops capturing without waiting.
    pub fn abort(&self) {
        self.buffer.finish();
    }

    /// Waits for the response to the probe started with [`begin`](Self::begin).
    ///
    /// `probe` is the command text sent, used to tell its echo from the reply.
    pub async fn wait_for_response(&self, kind: ProbeKind, probe: &str) -> FramedResponse {
        let start = Instant::now();
        let deadline = self.config.timeout(kind);
        let poll = self.config.poll_interval();
        let mut last_len: Option<usize> = None;
        let mut unchanged = 0u32;

        let completion = loop {
            tokio::time::sleep(poll).await;

            let len = self.buffer.len();
            if len > 0 && self.prompt.ends_reply(&self.buffer.snapshot(), probe) {
                break Completion::Prompt;
            }

            if len > 0 && last_len == Some(len) {
                unchanged += 1;
                if unchanged >= self.config.stability_polls {
                    break Completion::Stable;
                }
            } else {
                unchanged = 0;
            }
            last_len = Some(len);

            if start.elapsed() >= deadline {
                break Completion::TimedOut;
            }
        };

        let text = self.buffer.finish();
        let elapsed = start.elapsed();
        debug!(
            ?kind,
            ?completion,
            bytes = text.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "response framed"
        );

        FramedResponse {
            text,
            completion,
            elapsed,
        }
    }
}
