use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// Kills the child process when dropped, so a timed-out search does not
/// leave `rg` running.
pub struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    pub fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    pub fn as_mut(&mut self) -> Option<&mut Child> {
        self.child.as_mut()
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.start_kill();
        }
    }
}

/// One ripgrep invocation.
#[derive(Clone, Debug)]
pub struct RipgrepRequest {
    pub pattern: String,
    pub case_sensitive: bool,
}

#[derive(Clone, Debug)]
pub struct RipgrepTool {
    timeout: Duration,
    max_matches: usize,
}

impl RipgrepTool {
    pub fn new(timeout: Duration, max_matches: usize) -> Self {
        Self {
            timeout,
            max_matches,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn search(&self, root: &Path, request: &RipgrepRequest) -> Result<Vec<RipgrepMatch>> {
        let mut cmd = Command::new("rg");
        cmd.arg("--json")
            .arg("--line-number")
            .arg("--max-columns")
            .arg("400")
            .arg(if request.case_sensitive {
                "--case-sensitive"
            } else {
                "--ignore-case"
            })
            .arg("-e")
            .arg(&request.pattern)
            .arg(".")
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let child = cmd
            .spawn()
            .with_context(|| "failed to spawn ripgrep; is rg installed and on PATH?")?;
        let mut guard = ChildGuard::new(child);
        let child = guard.as_mut().context("ripgrep child already reaped")?;
        let stdout = child
            .stdout
            .take()
            .context("ripgrep did not produce stdout pipe")?;
        let mut reader = BufReader::new(stdout).lines();
        let max_matches = self.max_matches;

        let collect = async {
            let mut matches = Vec::new();
            while let Some(line) = reader.next_line().await? {
                if matches.len() >= max_matches {
                    tracing::debug!(max_matches, "ripgrep match limit reached");
                    return Ok(matches);
                }
                let parsed: RgMessage = match serde_json::from_str(&line) {
                    Ok(msg) => msg,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to parse ripgrep json line");
                        continue;
                    }
                };
                if let RgMessage::Match { data } = parsed {
                    matches.push(RipgrepMatch::from(data));
                }
            }
            let status = child.wait().await?;
            if !status.success() && status.code() != Some(1) {
                anyhow::bail!("ripgrep exited with status {}", status);
            }
            Result::<Vec<RipgrepMatch>>::Ok(matches)
        };

        timeout(self.timeout, collect)
            .await
            .with_context(|| format!("ripgrep timed out after {} ms", self.timeout.as_millis()))?
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RgMessage {
    Match {
        data: RgMatchData,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RgMatchData {
    path: RgText,
    lines: RgText,
    line_number: usize,
    #[serde(default)]
    submatches: Vec<RgSubmatch>,
}

#[derive(Debug, Deserialize)]
struct RgText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct RgSubmatch {
    start: usize,
    end: usize,
}

/// A matching line. Line numbers are zero-based; submatch spans are byte
/// offsets into `line`.
#[derive(Clone, Debug)]
pub struct RipgrepMatch {
    pub path: PathBuf,
    pub line_number: usize,
    pub line: String,
    pub spans: Vec<(usize, usize)>,
}

impl From<RgMatchData> for RipgrepMatch {
    fn from(data: RgMatchData) -> Self {
        let path = data.path.text;
        let path = path.strip_prefix("./").unwrap_or(&path);
        let line = data.lines.text.trim_end_matches(['\n', '\r']).to_string();
        let spans = data
            .submatches
            .iter()
            .filter(|m| m.start <= m.end && m.end <= line.len())
            .map(|m| (m.start, m.end))
            .collect();
        Self {
            path: PathBuf::from(path),
            line_number: data.line_number.saturating_sub(1),
            line,
            spans,
        }
    }
}
