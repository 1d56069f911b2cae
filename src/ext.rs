use std::{
  io::Read,
  process::{Command, ExitStatus, Stdio},
  thread,
  time::Duration,
};

use anyhow::{Context, Result};
use wait_timeout::ChildExt as WaitExt;

/// Output of a finished subprocess with both streams captured.
pub struct Captured {
  pub status: ExitStatus,
  pub stdout: String,
  pub stderr: String,
}

#[extend::ext(name = ExitStatusExt)]
pub impl ExitStatus {
  fn check_success(&self) -> Result<()> {
    if !self.success() {
      anyhow::bail!("exited with non-zero status {self}");
    }

    Ok(())
  }
}

#[extend::ext(name = CommandExt)]
pub impl Command {
  /// Runs the command with inherited stdio, returning an error on non-zero
  /// exit.
  fn check_success(&mut self) -> Result<()> {
    self.status().context("status")?.check_success()
  }

  /// Runs the command to completion, capturing stdout and stderr.
  fn capture(&mut self) -> Result<Captured> {
    let output = self.output().context("output")?;

    Ok(Captured {
      status: output.status,
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }

  /// Like `capture`, but returns `Ok(None)` if the command does not exit
  /// within `timeout`. The child is killed on timeout.
  fn capture_timeout(&mut self, timeout: Duration) -> Result<Option<Captured>> {
    let mut child = self
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .context("spawn")?;

    let stdout = child.stdout.take().context("stdout")?;
    let stderr = child.stderr.take().context("stderr")?;

    // Both pipes are drained off-thread so a chatty child cannot fill one of
    // them and deadlock against `wait`.
    let stdout = thread::spawn(move || read_to_string(stdout));
    let stderr = thread::spawn(move || read_to_string(stderr));

    let Some(status) = child.wait_timeout(timeout).context("wait")? else {
      child.kill().context("kill after timeout")?;
      child.wait().context("wait after kill")?;

      return Ok(None);
    };

    let stdout = stdout.join().map_err(|_| anyhow::anyhow!("stdout reader panicked"))??;
    let stderr = stderr.join().map_err(|_| anyhow::anyhow!("stderr reader panicked"))??;

    Ok(Some(Captured { status, stdout, stderr }))
  }
}

fn read_to_string<R: Read>(mut reader: R) -> Result<String> {
  let mut buf = String::new();
  reader.read_to_string(&mut buf).context("read")?;

  Ok(buf)
}
