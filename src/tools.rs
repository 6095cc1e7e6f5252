//! Runs the external KiCad helpers (`kinet2pcb`, `kinjector`).

use crate::error::{KcResult, KeyCadError};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Lines of stderr quoted in a failure message.
const STDERR_TAIL_LINES: usize = 10;

#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
}

impl ToolRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Runs `program` to completion. A missing binary, a nonzero exit or
    /// running past the timeout is an error.
    pub fn run(&self, program: &str, args: &[&str], cwd: &Path) -> KcResult<()> {
        let tool_error = |reason: String| KeyCadError::ExternalTool {
            program: program.to_string(),
            reason,
        };

        let resolved = which::which(program).map_err(|_| tool_error("not found in PATH".to_string()))?;
        debug!("running {} {:?} in {}", resolved.display(), args, cwd.display());

        // Spooled to files so a chatty tool cannot fill a pipe and stall.
        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut child = Command::new(&resolved)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?))
            .spawn()
            .map_err(|e| tool_error(format!("failed to start: {}", e)))?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(tool_error(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let out = read_spool(&mut stdout)?;
        let err = read_spool(&mut stderr)?;
        if !out.trim().is_empty() {
            debug!("{} stdout:\n{}", program, out.trim_end());
        }

        if !status.success() {
            let tail: Vec<&str> = err.lines().rev().take(STDERR_TAIL_LINES).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(tool_error(format!("exited with {}: {}", status, tail.join("\n"))));
        }

        info!("{} finished in {:.1}s", program, started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Builds a board from the netlist, then moves footprints per the placement file.
    pub fn generate_kicad_pcb(&self, dir: &Path, netlist: &str, kinjector_json: &str, pcb: &str) -> KcResult<()> {
        self.run(
            "kinet2pcb",
            &["--nobackup", "--overwrite", "-i", netlist, "-w"],
            dir,
        )?;
        self.run(
            "kinjector",
            &["--nobackup", "--overwrite", "--from", kinjector_json, "--to", pcb],
            dir,
        )
    }
}

fn read_spool(file: &mut std::fs::File) -> KcResult<String> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Opens the board in the desktop's default viewer. Failure is only logged.
pub fn open_board(path: &Path) {
    match open::that(path) {
        Ok(()) => info!("Opened {}", path.display()),
        Err(e) => warn!("Could not open {}: {}", path.display(), e),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_reported() {
        let runner = ToolRunner::new(Duration::from_secs(1));
        let err = runner
            .run("keycad-no-such-tool", &[], Path::new("."))
            .unwrap_err();
        assert!(matches!(err, KeyCadError::ExternalTool { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn nonzero_exit_is_an_error() {
        let runner = ToolRunner::new(Duration::from_secs(5));
        let err = runner.run("false", &[], Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[test]
    fn slow_tool_times_out() {
        let runner = ToolRunner::new(Duration::from_millis(200));
        let err = runner.run("sleep", &["5"], Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn successful_tool_passes() {
        let runner = ToolRunner::new(Duration::from_secs(5));
        runner.run("true", &[], Path::new(".")).unwrap();
    }
}
