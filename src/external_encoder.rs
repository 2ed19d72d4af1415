//! # External Encoder
//!
//! JPEG XL has no in-process encoder, so it is produced by the `cjxl` command
//! line tool. This module handles:
//! - finding the tool (`$TOOLS_DIR` override, then system `PATH`)
//! - running it and waiting for it to exit
//!
//! The call is a blocking contract from the pipeline's point of view: the
//! conversion does not advance until the child process has exited. There is no
//! timeout, a hung encoder blocks the run.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, warn};

/// Name of the JPEG XL reference encoder.
pub const CJXL: &str = "cjxl";

/// How the external encoder exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderStatus {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl EncoderStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for EncoderStatus {
    fn from(status: ExitStatus) -> Self {
        Self { code: status.code() }
    }
}

/// Capability to turn a lossless intermediate into the final encoded file.
pub trait ExternalEncoder {
    /// Name used in log and error messages
    fn name(&self) -> &str;

    /// Encode `input` into `output`. An `Err` means the process could not be launched.
    fn encode<'a>(
        &'a self,
        input: &'a Path,
        output: &'a Path,
        verbose: bool,
    ) -> BoxFuture<'a, std::io::Result<EncoderStatus>>;
}

/// Runs `cjxl <input> <output>`.
#[derive(Debug, Clone)]
pub struct CjxlEncoder {
    program: PathBuf,
}

impl CjxlEncoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Use the resolved tool path, or fall back to the bare name so a missing
    /// tool surfaces as a launch failure when the format is actually reached.
    pub fn resolve(resolver: &ToolPathResolver) -> Self {
        match resolver.check_tool_with_instructions(CJXL) {
            Ok(path) => {
                debug!("Using {} at {}", CJXL, path.display());
                Self::new(path)
            }
            Err(message) => {
                warn!("{}", message);
                warn!("JPEG XL output will fail until {} is installed", CJXL);
                Self::new(CJXL)
            }
        }
    }
}

impl ExternalEncoder for CjxlEncoder {
    fn name(&self) -> &str {
        CJXL
    }

    fn encode<'a>(
        &'a self,
        input: &'a Path,
        output: &'a Path,
        verbose: bool,
    ) -> BoxFuture<'a, std::io::Result<EncoderStatus>> {
        async move {
            let mut command = Command::new(&self.program);
            command.arg(input).arg(output).stdin(Stdio::null());

            // Child output only shows up in verbose mode
            if verbose {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            } else {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }

            debug!("Command: {:?} {:?} {:?}", self.program, input, output);

            let start_time = std::time::Instant::now();
            let status = command.status().await?;
            debug!("{} finished in {:?} with {}", CJXL, start_time.elapsed(), status);

            Ok(EncoderStatus::from(status))
        }
        .boxed()
    }
}

/// Locates external tools: `$TOOLS_DIR` first, then the system `PATH`.
pub struct ToolPathResolver {
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    pub fn new() -> Self {
        let tools_dir = env::var_os("TOOLS_DIR")
            .map(PathBuf::from)
            .filter(|path| path.is_dir());

        if let Some(ref dir) = tools_dir {
            debug!("Found tools directory via TOOLS_DIR: {:?}", dir);
        }

        Self { tools_dir }
    }

    /// Resolver that only looks at the given directory and never at `PATH`.
    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self { tools_dir: Some(tools_dir.into()) }
    }

    fn executable_name(tool_name: &str) -> String {
        format!("{}{}", tool_name, env::consts::EXE_SUFFIX)
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        let executable = Self::executable_name(tool_name);

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = tools_dir.join(&executable);
            if bundled_path.is_file() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
            debug!("Bundled path does not exist: {:?}", bundled_path);
            return None;
        }

        self.find_in_system_path(&executable)
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, executable: &str) -> Option<PathBuf> {
        env::var_os("PATH").and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(executable))
                .find(|path| path.is_file())
        })
    }

    /// Get installation instructions for a tool
    fn install_instructions(&self, tool_name: &str) -> String {
        match tool_name {
            CJXL if cfg!(target_os = "macos") => "brew install jpeg-xl".to_string(),
            CJXL => "sudo apt-get install libjxl-tools".to_string(),
            _ => format!("sudo apt-get install {}", tool_name),
        }
    }

    /// Check if a tool is available and provide installation instructions if not
    pub fn check_tool_with_instructions(&self, tool_name: &str) -> Result<PathBuf, String> {
        self.resolve_tool(tool_name).ok_or_else(|| {
            format!(
                "Tool '{}' not found. To install it, run:\n  {}",
                tool_name,
                self.install_instructions(tool_name)
            )
        })
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
