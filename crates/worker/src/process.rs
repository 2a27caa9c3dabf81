//! Spawns a task's binary with a hard execution-time limit and turns its
//! outcome into `(is_success, result)`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Outcome of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub is_success: u8,
    pub result: String,
}

impl Outcome {
    fn success(stdout: String) -> Self {
        Self {
            is_success: 1,
            result: trim_trailing_newlines(&stdout),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: 0,
            result: message.into(),
        }
    }
}

/// Trim trailing `\n` characters only — matches the original wire
/// behavior of `rtrim(s, "\n")`, not a general whitespace trim.
fn trim_trailing_newlines(s: &str) -> String {
    s.trim_end_matches('\n').to_string()
}

/// Run `bin_path` with whitespace-split `args`, capturing stdout and
/// stderr separately, enforcing `timeout` as a hard wall-clock limit.
///
/// On timeout, the child is killed best-effort (a kill failure is logged,
/// not propagated — the task is still reported as having timed out) and
/// its eventual exit is awaited on a detached task so the process is never
/// left unreaped without blocking this call.
pub async fn run_with_timeout(bin_path: &Path, args: &str, timeout: Duration) -> Outcome {
    let arg_list: Vec<&str> = if args.trim().is_empty() {
        Vec::new()
    } else {
        args.split_whitespace().collect()
    };

    let mut child = match Command::new(bin_path)
        .args(&arg_list)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => return Outcome::failure(format!("spawn error: {err}")),
    };

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            let stdout = stdout_task.await.ok().and_then(Result::ok).unwrap_or_default();
            let stderr = stderr_task.await.ok().and_then(Result::ok).unwrap_or_default();
            let stdout = String::from_utf8_lossy(&stdout).into_owned();
            let stderr = String::from_utf8_lossy(&stderr).into_owned();

            if !status.success() || !stderr.is_empty() {
                Outcome::failure(trim_trailing_newlines(&stderr))
            } else {
                Outcome::success(stdout)
            }
        }
        Ok(Err(err)) => Outcome::failure(format!("wait error: {err}")),
        Err(_elapsed) => {
            if let Err(err) = child.start_kill() {
                tracing::warn!(error = %err, "failed to kill timed-out process");
            }
            tokio::spawn(async move {
                let _ = child.wait().await;
                let _ = stdout_task.await;
                let _ = stderr_task.await;
            });
            Outcome::failure("exec time out")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn success_captures_trimmed_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "echo.sh", "#!/bin/sh\necho hi\n");

        let outcome = run_with_timeout(&script, "", Duration::from_secs(5)).await;
        assert_eq!(outcome, Outcome { is_success: 1, result: "hi".into() });
    }

    #[tokio::test]
    async fn nonzero_exit_is_failure_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "fail.sh", "#!/bin/sh\necho boom >&2\nexit 1\n");

        let outcome = run_with_timeout(&script, "", Duration::from_secs(5)).await;
        assert_eq!(outcome, Outcome { is_success: 0, result: "boom".into() });
    }

    #[tokio::test]
    async fn nonempty_stderr_is_failure_even_on_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "warn.sh", "#!/bin/sh\necho warning >&2\nexit 0\n");

        let outcome = run_with_timeout(&script, "", Duration::from_secs(5)).await;
        assert_eq!(outcome, Outcome { is_success: 0, result: "warning".into() });
    }

    #[tokio::test]
    async fn timeout_is_reported_and_process_killed() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(&dir, "slow.sh", "#!/bin/sh\nsleep 30\n");

        let start = std::time::Instant::now();
        let outcome = run_with_timeout(&script, "", Duration::from_millis(200)).await;
        assert_eq!(outcome, Outcome { is_success: 0, result: "exec time out".into() });
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn spawn_error_on_nonexistent_binary() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");

        let outcome = run_with_timeout(&missing, "", Duration::from_secs(5)).await;
        assert_eq!(outcome.is_success, 0);
        assert!(outcome.result.starts_with("spawn error"));
    }

    #[tokio::test]
    async fn args_are_split_on_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            &dir,
            "args.sh",
            "#!/bin/sh\nfor a in \"$@\"; do echo \"$a\"; done\n",
        );

        let outcome = run_with_timeout(&script, "one two", Duration::from_secs(5)).await;
        assert_eq!(outcome, Outcome { is_success: 1, result: "one\ntwo".into() });
    }
}
