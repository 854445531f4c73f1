//! Helpers to run the explainer binary on the instances in `tests/instances`.
#![allow(
    dead_code,
    reason = "is used in integration tests but unable to find a way to silence these warnings"
)]

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;

use wait_timeout::ChildExt;

#[derive(Debug)]
pub(crate) struct Run {
    pub(crate) success: bool,
    pub(crate) stdout: String,
}

impl Run {
    /// The lines of the output which are not log messages.
    pub(crate) fn lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .filter(|line| !line.starts_with("c "))
            .collect()
    }

    /// Whether a line of the output ends with `text`; prompts are not terminated by a newline,
    /// so the output following a prompt is on the same line.
    pub(crate) fn has_line_ending_with(&self, text: &str) -> bool {
        self.stdout.lines().any(|line| line.ends_with(text))
    }
}

pub(crate) fn instance_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("instances")
        .join(name)
}

/// Runs the explainer on an instance with the given arguments and console input.
///
/// The output is written next to the instance, in a file with the given `prefix` in its name, so
/// tests running in parallel should use distinct prefixes.
pub(crate) fn run_explainer(instance: &str, args: &[&str], input: &str, prefix: &str) -> Run {
    const TEST_TIMEOUT: Duration = Duration::from_secs(60);

    let instance_path = instance_path(instance);
    let log_file_path = instance_path.with_extension(format!("{prefix}.log"));

    let mut child = Command::new(env!("CARGO_BIN_EXE_explainer"))
        .args(args)
        .arg(&instance_path)
        .stdin(Stdio::piped())
        .stdout(File::create(&log_file_path).expect("Failed to create log file"))
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to run explainer");

    if let Some(mut stdin) = child.stdin.take() {
        // The explainer may exit without reading its input.
        let _ = stdin.write_all(input.as_bytes());
    }

    let status = match child.wait_timeout(TEST_TIMEOUT) {
        Ok(None) => {
            let _ = child.kill();
            panic!("explainer ran longer than {}s", TEST_TIMEOUT.as_secs());
        }
        Ok(Some(status)) => status,
        Err(e) => panic!("error starting explainer: {e}"),
    };

    let stdout = std::fs::read_to_string(&log_file_path).expect("Failed to read explainer output");
    std::fs::remove_file(&log_file_path).expect("Failed to remove log file");

    Run {
        success: status.success(),
        stdout,
    }
}
