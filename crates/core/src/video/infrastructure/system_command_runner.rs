use std::process::{Command, Stdio};

use crate::video::domain::command_runner::{CommandOutput, CommandRunner};

/// Spawns real processes via `std::process::Command` (no shell involved).
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        log::debug!("Running: {program} {}", args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_status() {
        let runner = SystemCommandRunner::new();
        let out = runner
            .run("sh", &["-c".to_string(), "printf hello".to_string()])
            .unwrap();
        assert!(out.success);
        assert_eq!(out.code, Some(0));
        assert_eq!(out.stdout, b"hello");
    }

    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let runner = SystemCommandRunner::new();
        let out = runner
            .run(
                "sh",
                &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
            )
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(String::from_utf8_lossy(&out.stderr).trim(), "oops");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = SystemCommandRunner::new();
        assert!(runner.run("definitely-not-a-real-tool-xyz", &[]).is_err());
    }
}
