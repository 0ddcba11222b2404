//! Markdown to HTML conversion through an external program.
//!
//! Conversion is modelled as a [`Converter`] so the build can run against a
//! fake in tests. The real implementation shells out to pandoc:
//!
//! ```text
//! pandoc --from gfm --to html <post.md>
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Arguments passed before the input path.
const PANDOC_ARGS: [&str; 4] = ["--from", "gfm", "--to", "html"];

#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("`{program}` not found, please install it first")]
    NotInstalled { program: String },

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed with {}: {}", describe_exit(.exit_code), .stderr.trim())]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Turns a Markdown file into an HTML fragment.
pub trait Converter {
    /// The command line used for `markdown_path`, for diagnostics.
    fn command_line(&self, markdown_path: &Path) -> String;

    /// Convert the file, returning the HTML fragment.
    fn convert(
        &self,
        markdown_path: &Path,
    ) -> impl Future<Output = Result<String, ConversionError>>;
}

/// Converter backed by the `pandoc` executable.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    program: String,
    timeout: Duration,
}

impl PandocConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Check that the program can be found before any post is built.
    pub fn preflight(&self) -> Result<PathBuf, ConversionError> {
        which::which(&self.program).map_err(|_| ConversionError::NotInstalled {
            program: self.program.clone(),
        })
    }
}

impl Converter for PandocConverter {
    fn command_line(&self, markdown_path: &Path) -> String {
        format!(
            "{} {} {}",
            self.program,
            PANDOC_ARGS.join(" "),
            markdown_path.display()
        )
    }

    async fn convert(&self, markdown_path: &Path) -> Result<String, ConversionError> {
        let command = self.command_line(markdown_path);

        let child = Command::new(&self.program)
            .args(PANDOC_ARGS)
            .arg(markdown_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed out child is killed when its handle is dropped
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                command: command.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|source| ConversionError::Spawn {
                command: command.clone(),
                source,
            })?,
            Err(_) => {
                return Err(ConversionError::TimedOut {
                    command,
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(ConversionError::Failed {
                command,
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
