//! Run the configured formatters.

use anyhow::Result;

use crate::config::Project;
use crate::process::run_command;

/// Run the format command. Stops at the first formatter that fails.
pub async fn run(project: &Project) -> Result<()> {
    for cmd in &project.config.tools.format {
        run_command(cmd, &project.root, true).await?;
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use tempfile::tempdir;

    #[tokio::test]
    async fn stops_at_first_failure() {
        let temp = tempdir().unwrap();
        let mut config = ConfigFile::default();
        config.tools.format = vec![
            vec!["false".to_string()],
            vec!["touch".to_string(), "reached".to_string()],
        ];
        let project = Project {
            root: temp.path().to_path_buf(),
            config,
        };

        assert!(run(&project).await.is_err());
        assert!(!temp.path().join("reached").exists());
    }
}
