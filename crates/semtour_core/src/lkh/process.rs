use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use crate::{Error, Result};

pub(crate) struct LkhProcess {
    exe_path: PathBuf,
}

impl LkhProcess {
    pub(crate) fn new(exe_path: PathBuf) -> Self {
        Self { exe_path }
    }

    /// Runs LKH on `par_path` inside `work_dir`; a non-zero exit carries
    /// both output streams.
    pub(crate) fn run(&self, par_path: &Path, work_dir: &Path, context: impl ToString) -> Result<Output> {
        let output = Command::new(&self.exe_path)
            .arg(par_path)
            .current_dir(work_dir)
            .output()?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(Error::ProcessFailed {
                context: context.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}
