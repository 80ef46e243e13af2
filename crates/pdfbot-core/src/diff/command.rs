//! Diff routine backed by an external program.

use std::ffi::OsString;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, warn};

use super::DiffRoutine;
use crate::error::DiffError;
use crate::models::config::DiffConfig;

/// Runs an external diff program such as `diff-pdf`.
#[derive(Debug, Clone)]
pub struct CommandDiff {
    program: String,
    args: Vec<String>,
    success_codes: Vec<i32>,
}

impl CommandDiff {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            success_codes: vec![0],
        }
    }

    pub fn from_config(config: &DiffConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            success_codes: config.success_codes.clone(),
        }
    }

    /// Exit codes treated as success.
    pub fn with_success_codes(mut self, codes: Vec<i32>) -> Self {
        self.success_codes = codes;
        self
    }

    fn expand_args(&self, a: &Path, b: &Path, out: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| match arg.as_str() {
                "{a}" => a.as_os_str().to_owned(),
                "{b}" => b.as_os_str().to_owned(),
                "{out}" => out.as_os_str().to_owned(),
                _ => arg
                    .replace("{a}", &a.to_string_lossy())
                    .replace("{b}", &b.to_string_lossy())
                    .replace("{out}", &out.to_string_lossy())
                    .into(),
            })
            .collect()
    }
}

impl Default for CommandDiff {
    fn default() -> Self {
        Self::from_config(&DiffConfig::default())
    }
}

impl DiffRoutine for CommandDiff {
    async fn run(&self, a: &Path, b: &Path, out: &Path) -> Result<(), DiffError> {
        let args = self.expand_args(a, b, out);
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| DiffError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let code = output.status.code();
        if !code.is_some_and(|c| self.success_codes.contains(&c)) {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("{} exited with {:?}", self.program, code);
            return Err(DiffError::Failed { code, stderr });
        }

        if !out.exists() {
            return Err(DiffError::MissingOutput(out.to_path_buf()));
        }

        Ok(())
    }
}
