//! External-command transform.
//!
//! Pipes the source through a configured compiler (`coffee --stdio`,
//! `lessc -`, ...) and reads the transformed text from its stdout. The
//! compiler runs with the source file's directory as its working directory so
//! relative imports resolve the way they would on the command line.

use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use onload_core::config::PATH_PLACEHOLDER;
use onload_core::{Error, TransformConfig};

use super::{Transform, TransformError};

/// Environment variable carrying the advisory cache directory to the compiler.
pub const CACHE_DIR_ENV: &str = "ONLOAD_TRANSFORM_CACHE_DIR";

/// A transform backed by an external program.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    id: String,
    extensions: Vec<String>,
    mime_type: String,
    program: String,
    args: Vec<String>,
    cache_dir: Option<PathBuf>,
}

impl CommandTransform {
    /// Build a transform from its configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::TransformBuild` if the command line is empty.
    pub fn from_config(config: &TransformConfig) -> Result<Self, Error> {
        let (program, args) = config
            .command
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or_else(|| Error::TransformBuild { id: config.id.clone(), reason: "empty command".into() })?;

        Ok(Self {
            id: config.id.clone(),
            extensions: config.extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            mime_type: config.mime_type.clone(),
            program: program.clone(),
            args: args.to_vec(),
            cache_dir: None,
        })
    }

    /// Arguments for compiling `path`, with the path placeholder substituted.
    fn args_for(&self, path: &Path) -> Vec<String> {
        let path = path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
            .collect()
    }

    fn display_command(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Transform for CommandTransform {
    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, path: &Path) -> Result<bool, TransformError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Ok(false);
        };
        Ok(self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn compile(&self, path: &Path, source: &str) -> Result<String, TransformError> {
        self.compile_until(path, source, None)
    }

    fn compile_until(
        &self, path: &Path, source: &str, deadline: Option<Instant>,
    ) -> Result<String, TransformError> {
        let args = self.args_for(path);
        let display = self.display_command(&args);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(parent) = path.parent().filter(|p| p.is_dir()) {
            command.current_dir(parent);
        }
        if let Some(dir) = &self.cache_dir {
            command.env(CACHE_DIR_ENV, dir);
        }

        let started = Instant::now();
        let mut child = command
            .spawn()
            .map_err(|source| TransformError::Spawn { command: display.clone(), source })?;

        // Each pipe gets its own thread so a compiler that streams output
        // before consuming all input cannot deadlock against us.
        let writer = feed(&mut child, source)?;
        let stdout = drain(child.stdout.take())?;
        let stderr = drain(child.stderr.take())?;

        let Some(status) = wait_until(&mut child, deadline)? else {
            let elapsed_ms = started.elapsed().as_millis();
            let command_line = &display;
            tracing::warn!(command = %command_line, elapsed_ms, "compiler killed at deadline");
            return Err(TransformError::TimedOut { command: display, elapsed_ms });
        };

        match writer.join() {
            Ok(Ok(())) => {}
            // the compiler stopped reading; its exit status explains why
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(io::Error::other("stdin writer panicked").into()),
        }
        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            return Err(TransformError::Exited {
                command: display,
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        String::from_utf8(stdout).map_err(|e| TransformError::InvalidOutput(e.to_string()))
    }

    fn set_cache_directory(&mut self, dir: &Path) {
        self.cache_dir = Some(dir.join(&self.id));
    }
}

/// Interval between exit checks while a deadline is pending.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

type Pipe = JoinHandle<io::Result<Vec<u8>>>;

/// Write `source` to the child's stdin from a separate thread, closing it
/// when done.
fn feed(child: &mut Child, source: &str) -> io::Result<JoinHandle<io::Result<()>>> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("compiler stdin was not captured"))?;
    let input = source.as_bytes().to_vec();
    Ok(std::thread::spawn(move || stdin.write_all(&input)))
}

/// Read a child pipe to its end from a separate thread.
fn drain(pipe: Option<impl Read + Send + 'static>) -> io::Result<Pipe> {
    let mut pipe = pipe.ok_or_else(|| io::Error::other("compiler output was not captured"))?;
    Ok(std::thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).map(|_| buf)
    }))
}

fn collect(pipe: Pipe) -> io::Result<Vec<u8>> {
    pipe.join()
        .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")))
}

/// Wait for the child to exit, killing it once `deadline` passes.
///
/// Returns `None` when the child was killed. Pipe threads of a killed child
/// are left to finish on their own once the pipes close.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            if let Err(e) = child.kill() {
                tracing::debug!(error = %e, "compiler exited before it could be killed");
            }
            child.wait()?;
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
