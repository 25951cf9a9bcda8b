//! File-exchange transport for environments where direct stdio is unreliable.
//!
//! Requests are written as `request_<stamp>_<id8>.json` into a shared
//! directory. The server answers with `response_*.json` files holding
//! `{id, result, error}`. A watcher thread polls the directory, consumes
//! responses oldest first by modification time, hands each to the callback
//! registered for its id (at most once) and deletes the file.

use super::{AnalysisType, BridgeError, ImagePayload, Transport, direct::resolve_python_exe};
use crate::config::Config;
use crate::util::compact_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

pub type Callback = Box<dyn FnOnce(Result<Value, BridgeError>) + Send + 'static>;

/// Unparsable response files younger than this are left for the next poll,
/// in case the server is still writing them.
const STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFile {
    pub id: String,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResponseFile {
    fn into_result(self) -> Result<Value, BridgeError> {
        match self.error {
            Some(err) => Err(BridgeError::Remote(err)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

struct ServerCommand {
    python_exe: PathBuf,
    script: PathBuf,
}

struct Shared {
    exchange_dir: PathBuf,
    running: AtomicBool,
    pending: Mutex<HashMap<String, Callback>>,
    child: Mutex<Option<Child>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct FileTransport {
    shared: Arc<Shared>,
    server: Option<ServerCommand>,
    polling_interval: Duration,
    call_timeout: Duration,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl FileTransport {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let ft = &cfg.file_transport;
        let mut transport = Self::with_dir(
            Path::new(&ft.exchange_dir),
            Duration::from_millis(ft.polling_interval_ms),
            Duration::from_millis(ft.call_timeout_ms),
        )?;
        if !ft.server_script.trim().is_empty() {
            transport.server = Some(ServerCommand {
                python_exe: resolve_python_exe(&cfg.bridge.python_exe),
                script: PathBuf::from(&cfg.bridge.scripts_dir).join(&ft.server_script),
            });
        }
        Ok(transport)
    }

    /// A transport without a managed server; use [`FileTransport::attach`].
    pub fn with_dir(
        exchange_dir: &Path,
        polling_interval: Duration,
        call_timeout: Duration,
    ) -> Result<Self, BridgeError> {
        std::fs::create_dir_all(exchange_dir).map_err(|e| {
            BridgeError::io(
                format!("create exchange dir {}", exchange_dir.display()),
                e,
            )
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                exchange_dir: exchange_dir.to_path_buf(),
                running: AtomicBool::new(false),
                pending: Mutex::new(HashMap::new()),
                child: Mutex::new(None),
            }),
            server: None,
            polling_interval,
            call_timeout,
            watcher: Mutex::new(None),
        })
    }

    pub fn exchange_dir(&self) -> &Path {
        &self.shared.exchange_dir
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    /// Spawns the configured server and starts polling.
    pub fn start(&self) -> Result<(), BridgeError> {
        if self.is_running() {
            debug!("file bridge already running");
            return Ok(());
        }
        if let Some(server) = &self.server {
            let child = Command::new(&server.python_exe)
                .arg(&server.script)
                .arg(&self.shared.exchange_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
                .map_err(|source| BridgeError::Spawn {
                    program: server.python_exe.display().to_string(),
                    source,
                })?;
            info!(pid = child.id(), "file bridge server started");
            *lock(&self.shared.child) = Some(child);
        }
        self.start_watcher();
        Ok(())
    }

    /// Starts polling without owning a server process.
    pub fn attach(&self) {
        if !self.is_running() {
            self.start_watcher();
        }
    }

    fn start_watcher(&self) {
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let interval = self.polling_interval;
        let handle = std::thread::spawn(move || {
            while shared.running.load(Ordering::SeqCst) {
                if shared.server_exited() {
                    shared.shutdown();
                    break;
                }
                if let Err(e) = shared.poll_once() {
                    warn!("response poll failed: {e}");
                }
                std::thread::park_timeout(interval);
            }
            debug!("response watcher stopped");
        });
        *lock(&self.watcher) = Some(handle);
        info!(dir = %self.shared.exchange_dir.display(), "response watcher started");
    }

    /// Stops polling, kills an owned server and fails outstanding requests.
    pub fn stop(&self) {
        let watcher = lock(&self.watcher).take();
        if let Some(handle) = watcher {
            self.shared.running.store(false, Ordering::SeqCst);
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("response watcher panicked");
            }
        }
        self.shared.shutdown();
    }

    /// Writes a request file and registers `callback` for its response.
    /// Returns the request id.
    pub fn send_command(
        &self,
        command: &str,
        params: Map<String, Value>,
        callback: Option<Callback>,
    ) -> Result<String, BridgeError> {
        if !self.is_running() {
            return Err(BridgeError::NotRunning);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut body = params;
        body.insert("id".into(), Value::String(id.clone()));
        body.insert("command".into(), Value::String(command.to_string()));

        if let Some(cb) = callback {
            lock(&self.shared.pending).insert(id.clone(), cb);
        }

        let name = format!("request_{}_{}.json", compact_timestamp(), &id[..8]);
        if let Err(e) = self.write_request(&name, &Value::Object(body)) {
            lock(&self.shared.pending).remove(&id);
            return Err(e);
        }
        debug!(%id, command, "request written: {name}");
        Ok(id)
    }

    fn write_request(&self, name: &str, body: &Value) -> Result<(), BridgeError> {
        let final_path = self.shared.exchange_dir.join(name);
        // Written under a name the server ignores, then renamed into place.
        let tmp_path = self.shared.exchange_dir.join(format!(".{name}.tmp"));
        let bytes = serde_json::to_vec_pretty(body).map_err(|e| BridgeError::Io {
            context: "serialize request".into(),
            source: e.into(),
        })?;
        std::fs::write(&tmp_path, bytes)
            .map_err(|e| BridgeError::io(format!("write {}", tmp_path.display()), e))?;
        std::fs::rename(&tmp_path, &final_path)
            .map_err(|e| BridgeError::io(format!("rename to {}", final_path.display()), e))
    }

    /// Sends a command and blocks until its response or the call timeout.
    pub fn call(&self, command: &str, params: Map<String, Value>) -> Result<Value, BridgeError> {
        let (tx, rx) = mpsc::channel();
        let id = self.send_command(
            command,
            params,
            Some(Box::new(move |res: Result<Value, BridgeError>| {
                let _ = tx.send(res);
            })),
        )?;

        match rx.recv_timeout(self.call_timeout) {
            Ok(res) => res,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if lock(&self.shared.pending).remove(&id).is_none() {
                    // Consumed between the timeout and the removal.
                    if let Ok(res) = rx.try_recv() {
                        return res;
                    }
                }
                warn!(%id, command, "file bridge call timed out");
                Err(BridgeError::Timeout {
                    timeout_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(BridgeError::NotRunning),
        }
    }

    /// Processes every response file currently present. Returns the number
    /// of callbacks invoked.
    pub fn poll_once(&self) -> Result<usize, BridgeError> {
        self.shared.poll_once()
    }
}

impl Shared {
    fn server_exited(&self) -> bool {
        let mut guard = lock(&self.child);
        let Some(child) = guard.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                warn!("file bridge server exited: {status}");
                *guard = None;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!("file bridge server status unavailable: {e}");
                false
            }
        }
    }

    fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(mut child) = lock(&self.child).take() {
            if let Err(e) = child.kill() {
                debug!("kill file bridge server: {e}");
            }
            let _ = child.wait();
            info!("file bridge server stopped");
        }
        let orphaned: Vec<(String, Callback)> = lock(&self.pending).drain().collect();
        for (id, cb) in orphaned {
            debug!(%id, "failing pending request on shutdown");
            cb(Err(BridgeError::NotRunning));
        }
    }

    fn response_files(&self) -> Result<Vec<(SystemTime, PathBuf)>, BridgeError> {
        let entries = match std::fs::read_dir(&self.exchange_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(BridgeError::io(
                    format!("read exchange dir {}", self.exchange_dir.display()),
                    e,
                ));
            }
        };

        let mut files: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with("response_") && n.ends_with(".json"))
            })
            .map(|entry| {
                let mtime = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (mtime, entry.path())
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn poll_once(&self) -> Result<usize, BridgeError> {
        let mut delivered = 0;
        for (mtime, path) in self.response_files()? {
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("read {}: {e}", path.display());
                    continue;
                }
            };

            let response: ResponseFile = match serde_json::from_str(&raw) {
                Ok(r) => r,
                Err(e) => {
                    let age = SystemTime::now().duration_since(mtime).unwrap_or_default();
                    if age < STALE_AFTER {
                        debug!("response {} not parseable yet: {e}", path.display());
                        continue;
                    }
                    warn!("discarding unparsable response {}: {e}", path.display());
                    remove_response(&path);
                    continue;
                }
            };

            let callback = lock(&self.pending).remove(&response.id);
            match callback {
                Some(cb) => {
                    cb(response.into_result());
                    delivered += 1;
                }
                None => debug!(id = %response.id, "dropping response with no pending request"),
            }
            remove_response(&path);
        }
        Ok(delivered)
    }
}

fn remove_response(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("remove {}: {e}", path.display());
    }
}

impl Drop for FileTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Transport for FileTransport {
    fn name(&self) -> &'static str {
        "file"
    }

    fn analyze(&self, kind: AnalysisType, image: &ImagePayload) -> Result<Value, BridgeError> {
        let mut params = Map::new();
        params.insert("type".into(), Value::String(kind.as_str().to_string()));
        params.insert("image".into(), Value::String(image.to_data_url()));
        self.call(kind.as_str(), params)
    }
}
