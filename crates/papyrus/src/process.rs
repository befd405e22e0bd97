//! Running external tools.

use std::io;
use std::path::Path;
use std::process::ExitStatus;

use tokio::process::Command;

/// Errors from running an external command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Command is empty")]
    Empty,

    #[error("Could not find '{0}' in PATH.")]
    NotFound(String),

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command returned non-zero exit status {0}.")]
    Failed(i32),

    #[error("Command was terminated by a signal.")]
    Killed,
}

/// Render an argv the way a shell would accept it.
pub fn shell_join<S: AsRef<str>>(argv: &[S]) -> String {
    argv.iter()
        .map(|arg| snailquote::escape(arg.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `argv` in `cwd`, waiting for it to finish.
///
/// With `check`, a non-zero exit is turned into an error.
pub async fn run_command(
    argv: &[String],
    cwd: &Path,
    check: bool,
) -> Result<ExitStatus, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd);
    run(cmd, program, &shell_join(argv), check).await
}

/// Run an already prepared command. `shown` is what gets logged.
pub async fn run(
    mut cmd: Command,
    program: &str,
    shown: &str,
    check: bool,
) -> Result<ExitStatus, CommandError> {
    tracing::info!("Running command: {}", shown);

    let status = cmd.status().await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CommandError::NotFound(program.to_string())
        } else {
            CommandError::Spawn {
                program: program.to_string(),
                source,
            }
        }
    })?;

    if check && !status.success() {
        let err = match status.code() {
            Some(code) => CommandError::Failed(code),
            None => CommandError::Killed,
        };
        return Err(err);
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn joins_with_quoting() {
        assert_eq!(shell_join(&["cargo", "fmt", "--check"]), "cargo fmt --check");
        let quoted = shell_join(&["echo", "two words"]);
        assert!(quoted.contains("two words"));
        assert_ne!(quoted, "echo two words");
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let err = run_command(&[], Path::new("."), true).await.unwrap_err();
        assert!(matches!(err, CommandError::Empty));
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let err = run_command(
            &argv(&["papyrus-definitely-not-installed"]),
            Path::new("."),
            true,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CommandError::NotFound(name) if name == "papyrus-definitely-not-installed"));
    }

    #[cfg(unix)]
    #[tokio::test]
    #[traced_test]
    async fn non_zero_exit() {
        let cmd = argv(&["sh", "-c", "exit 3"]);

        let err = run_command(&cmd, Path::new("."), true).await.unwrap_err();
        assert!(matches!(err, CommandError::Failed(3)));
        // Reported once, by whoever handles the error.
        assert!(logs_contain("Running command: sh -c"));
        assert!(!logs_contain("non-zero exit status"));

        let status = run_command(&cmd, Path::new("."), false).await.unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_working_directory() {
        let temp = tempfile::tempdir().unwrap();
        let cmd = argv(&["sh", "-c", "touch marker"]);

        run_command(&cmd, temp.path(), true).await.unwrap();

        assert!(temp.path().join("marker").exists());
    }
}
