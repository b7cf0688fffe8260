//! Scripted answers for interactive command-line prompts
//!
//! A [`PromptScript`] is an ordered list of expected-text/reply pairs. [`drive`]
//! reads the child's output until the current expected text shows up, sends the
//! reply line, and moves to the next pair. Every wait is bounded by a timeout.

use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// One prompt to wait for and the line to answer it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptReply {
    pub expect: String,
    pub reply: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptScript {
    steps: Vec<PromptReply>,
}

impl PromptScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, expect: impl Into<String>, reply: impl Into<String>) -> Self {
        self.steps.push(PromptReply {
            expect: expect.into(),
            reply: reply.into(),
        });
        self
    }

    pub fn steps(&self) -> &[PromptReply] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("timed out after {:.1}s waiting for \"{}\"", .waited.as_secs_f32(), .expected)]
    Timeout { expected: String, waited: Duration },

    #[error("output ended before \"{expected}\" was seen")]
    Eof { expected: String, output: String },

    #[error("prompt I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Run the script against a reader/writer pair.
///
/// Transitions happen only on an exact substring match. Output up to the end
/// of each match is consumed, so a later prompt must appear after the earlier one.
pub async fn drive<R, W>(
    reader: &mut R,
    writer: &mut W,
    script: &PromptScript,
    wait: Duration,
) -> Result<(), PromptError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pending: Vec<u8> = Vec::new();

    for step in script.steps() {
        match timeout(wait, wait_for(reader, &mut pending, step.expect.as_bytes())).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                return Err(PromptError::Eof {
                    expected: step.expect.clone(),
                    output: String::from_utf8_lossy(&pending).to_string(),
                })
            }
            Ok(Err(e)) => return Err(PromptError::Io(e)),
            Err(_) => {
                return Err(PromptError::Timeout {
                    expected: step.expect.clone(),
                    waited: wait,
                })
            }
        }

        writer.write_all(step.reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Read until `expected` is in `pending`. Returns false on end of stream.
async fn wait_for<R>(reader: &mut R, pending: &mut Vec<u8>, expected: &[u8]) -> io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(pos) = find(pending, expected) {
            pending.drain(..pos + expected.len());
            return Ok(true);
        }

        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(false);
        }
        pending.extend_from_slice(&chunk[..n]);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
