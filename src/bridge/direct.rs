use super::{AnalysisType, BridgeError, ImagePayload, TempImage, Transport};
use crate::config::Config;
use crate::util::expand_tilde;
use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PREVIEW_CHARS: usize = 200;

/// Runs one analyser subprocess per request:
/// `<python> <script> --type <kind> --input <temp image> --format <fmt>`.
pub struct DirectTransport {
    python_exe: PathBuf,
    script: PathBuf,
    timeout: Duration,
    temp_dir: PathBuf,
    temp_prefix: String,
    output_format: String,
    env: BTreeMap<String, String>,
    keep_stderr: bool,
}

impl DirectTransport {
    pub fn new(cfg: &Config) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.bridge.scripts_dir);
        if cfg.security.pin_scripts_dir {
            let cwd = std::env::current_dir().with_context(|| "current_dir")?;
            let canon = scripts_dir
                .canonicalize()
                .with_context(|| format!("canonicalize scripts_dir: {}", scripts_dir.display()))?;
            if !canon.starts_with(&cwd) {
                return Err(anyhow!(
                    "scripts_dir is outside cwd while pin_scripts_dir=true: {}",
                    canon.display()
                ));
            }
        }
        let script = scripts_dir.join(&cfg.bridge.analyzer_script);
        if !script.exists() {
            return Err(anyhow!("missing analyzer script: {}", script.display()));
        }
        Ok(Self {
            python_exe: resolve_python_exe(&cfg.bridge.python_exe),
            script,
            timeout: Duration::from_millis(cfg.bridge.timeout_ms),
            temp_dir: resolve_temp_dir(&cfg.bridge.temp_dir),
            temp_prefix: cfg.bridge.temp_prefix.clone(),
            output_format: cfg.bridge.output_format.clone(),
            env: cfg.bridge.env.clone(),
            keep_stderr: cfg.debug.keep_python_stderr,
        })
    }

    pub fn python_exe(&self) -> &Path {
        &self.python_exe
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks that the interpreter starts and reports its version.
    pub fn probe(&self) -> Result<String, BridgeError> {
        let child = Command::new(&self.python_exe)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                program: self.python_exe.display().to_string(),
                source,
            })?;
        let out = wait_with_timeout(child, PROBE_TIMEOUT)?;
        if !out.status.success() {
            return Err(BridgeError::ExitNonZero {
                code: out.status.code(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            });
        }
        // Older interpreters print the version on stderr.
        let text = if out.stdout.is_empty() {
            out.stderr
        } else {
            out.stdout
        };
        Ok(String::from_utf8_lossy(&text).trim().to_string())
    }

    fn run(&self, kind: AnalysisType, image: &ImagePayload) -> Result<Value, BridgeError> {
        let temp = TempImage::write(&self.temp_dir, &self.temp_prefix, image)?;

        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.script)
            .arg("--type")
            .arg(kind.as_str())
            .arg("--input")
            .arg(temp.path())
            .arg("--format")
            .arg(&self.output_format)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        debug!(
            "python run {} --type {} timeout={:?}",
            self.script.display(),
            kind,
            self.timeout
        );
        let child = cmd.spawn().map_err(|source| BridgeError::Spawn {
            program: self.python_exe.display().to_string(),
            source,
        })?;

        let started = Instant::now();
        let output = wait_with_timeout(child, self.timeout)?;
        debug!("{kind} finished in {:?}", started.elapsed());

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BridgeError::ExitNonZero {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        if self.keep_stderr && !stderr.trim().is_empty() {
            debug!("python stderr {}: {}", kind, stderr.trim());
        }

        let value: Value =
            serde_json::from_slice(&output.stdout).map_err(|source| BridgeError::ResponseParse {
                source,
                preview: String::from_utf8_lossy(&output.stdout)
                    .chars()
                    .take(PREVIEW_CHARS)
                    .collect(),
            })?;

        if let Some(msg) = value.get("error").and_then(Value::as_str) {
            return Err(BridgeError::Remote(msg.to_string()));
        }
        Ok(value)
    }
}

impl Transport for DirectTransport {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn analyze(&self, kind: AnalysisType, image: &ImagePayload) -> Result<Value, BridgeError> {
        self.run(kind, image)
    }
}

pub(crate) fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("DESIGN_PROMPT_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
            warn!("DESIGN_PROMPT_PYTHON does not exist: {}", p.display());
        }
        return PathBuf::from(if cfg!(windows) { "python" } else { "python3" });
    }
    expand_tilde(raw)
}

fn resolve_temp_dir(raw: &str) -> PathBuf {
    if raw.trim().is_empty() {
        std::env::temp_dir()
    } else {
        expand_tilde(raw.trim())
    }
}

struct ProcessOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut r) = reader {
            if let Err(e) = r.read_to_end(&mut buf) {
                debug!("pipe read ended early: {e}");
            }
        }
        let _ = tx.send(buf);
    });
    rx
}

fn timed_out(timeout: Duration) -> BridgeError {
    BridgeError::Timeout {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Waits for a pipe to reach EOF, but no later than `deadline`.
fn collect(
    rx: &Receiver<Vec<u8>>,
    deadline: Instant,
    timeout: Duration,
) -> Result<Vec<u8>, BridgeError> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Ok(buf),
        Err(RecvTimeoutError::Timeout) => {
            info!("python output still open after {:?}; giving up", timeout);
            Err(timed_out(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<ProcessOutput, BridgeError> {
    // Drain pipes while waiting so a chatty analyser can't deadlock on a full
    // stdout/stderr buffer.
    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let start = Instant::now();
    let deadline = start + timeout;
    loop {
        let polled = child
            .try_wait()
            .map_err(|e| BridgeError::io("try_wait", e))?;
        if let Some(status) = polled {
            // A background process may inherit the pipes and hold them open
            // past the child's exit.
            let stdout = collect(&stdout_rx, deadline, timeout)?;
            let stderr = collect(&stderr_rx, deadline, timeout)?;
            return Ok(ProcessOutput {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() >= timeout {
            info!("python process timed out after {:?}; killing", timeout);
            if let Err(e) = child.kill() {
                warn!("kill after timeout failed: {e}");
            }
            if let Err(e) = child.wait() {
                warn!("wait after kill failed: {e}");
            }
            // Reader threads are detached: a grandchild may still hold the pipes.
            return Err(timed_out(timeout));
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}
