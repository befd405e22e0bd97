//! Run every configured linter, then report which failed.

use anyhow::{bail, Result};

use crate::config::Project;
use crate::process::run_command;

/// Run the lint command.
pub async fn run(project: &Project) -> Result<()> {
    let mut failed: Vec<String> = Vec::new();

    for cmd in &project.config.tools.lint {
        let passed = match run_command(cmd, &project.root, false).await {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        };
        if !passed {
            failed.push(cmd.first().cloned().unwrap_or_default());
        }
    }

    if !failed.is_empty() {
        bail!("Linter(s) failed: {:?}", failed);
    }

    tracing::info!("All linters passed");
    Ok(())
}
