//! Shared helpers for `cw` integration tests

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// `cw` invocation builder with timing
pub struct CwCommand {
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl CwCommand {
    /// Command running in `working_dir` with an isolated config file
    pub fn new(working_dir: impl AsRef<Path>, config_dir: &Path) -> Self {
        let mut env = HashMap::new();
        env.insert(
            "COWORK_CONFIG".to_string(),
            config_dir.join("config.toml").display().to_string(),
        );
        env.insert("COWORK_LOG".to_string(), "warn".to_string());
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
            env,
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let start = Instant::now();
        let output = Command::new(env!("CARGO_BIN_EXE_cw"))
            .args(&self.args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .output()
            .context("Failed to execute cw")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            duration: start.elapsed(),
        })
    }

    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A canonical root with a few configuration files and its own config dir
pub struct TestRoot {
    pub dir: TempDir,
    pub config: TempDir,
}

impl TestRoot {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("cfg/deep"))?;
        fs::write(dir.path().join("a.yaml"), "a: 1\n")?;
        fs::write(dir.path().join("cfg/b.yaml"), "b: 2\nkeep: true\n")?;
        fs::write(dir.path().join("cfg/deep/c.yaml"), "c: 3\n")?;
        Ok(Self {
            dir,
            config: TempDir::new()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `cw --user <user> <args>` run from the root
    pub fn cw(&self, user: &str, args: &[&str]) -> CwCommand {
        let mut command = CwCommand::new(self.path(), self.config.path());
        command.args(&["--user", user]).args(args);
        command
    }

    pub fn private(&self, user: &str) -> PathBuf {
        self.path().join(".users").join(user)
    }
}
