//! Open the project in an editor.

use anyhow::Result;
use tokio::process::Command;

use crate::config::Project;
use crate::process;

/// Run the edit command.
pub async fn run(project: &Project) -> Result<()> {
    let editor = &project.config.tools.editor;
    let cmd = Command::from(open::with_command(&project.root, editor.as_str()));
    let root = project.root.to_string_lossy();
    let shown = process::shell_join(&[editor.as_str(), root.as_ref()]);

    process::run(cmd, editor, &shown, true).await?;
    Ok(())
}
