//! BIRD client execution
//!
//! Queries run as `<birdc command line> -r show <query words>`, executed
//! directly (no shell). `-r` keeps the client in restricted, read-only mode.

use crate::error::{BirdwatcherError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Executes a read-only console query and returns its raw output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, query: &str) -> Result<String>;
}

/// Runs the `birdc` client
#[derive(Debug, Clone)]
pub struct Birdc {
    program: String,
    args: Vec<String>,
}

impl Birdc {
    /// Split a client command line such as `birdc -s /run/bird/bird.ctl`
    pub fn new(command_line: &str) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(String::from);
        let program = words
            .next()
            .ok_or_else(|| BirdwatcherError::config("birdc command line is empty"))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    fn command_line(&self, query: &str) -> String {
        let mut words = vec![self.program.as_str()];
        words.extend(self.args.iter().map(String::as_str));
        words.extend(["-r", "show"]);
        words.extend(query.split_whitespace());
        words.join(" ")
    }
}

#[async_trait]
impl CommandRunner for Birdc {
    async fn run(&self, query: &str) -> Result<String> {
        let command = self.command_line(query);
        tracing::debug!(command = %command, "Executing BIRD query");

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(["-r", "show"])
            .args(query.split_whitespace())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| BirdwatcherError::CommandSpawn {
                command: command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(command = %command, exit_code, stderr = %stderr, "BIRD query failed");
            return Err(BirdwatcherError::CommandFailed {
                command,
                exit_code,
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
