//! Appium automation adapter
//!
//! Runs the server as a child process and drives sessions over the WebDriver
//! HTTP protocol. The server PID, its endpoint and the active session id are
//! persisted in a state directory so that separate CLI invocations can stop
//! what an earlier one started.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use liftoff_core::config::AutomationConfig;
use liftoff_core::{AutomationError, AutomationServer, Capabilities, Result};

use crate::process::ToolCommand;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

const SERVER_STATE_FILE: &str = "server.json";
const SESSION_STATE_FILE: &str = "session.json";
const SERVER_LOG_FILE: &str = "appium.log";

/// Persisted record of a server we started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ServerRecord {
    pid: u32,
    endpoint: String,
}

/// Persisted record of an open client session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionRecord {
    session_id: String,
    endpoint: String,
}

/// JSON files under the automation state directory
#[derive(Debug, Clone)]
struct StateDir {
    root: PathBuf,
}

impl StateDir {
    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| state_error(&self.root, e))?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(state_error(&path, e)),
        };
        let value = serde_json::from_str(&content).map_err(|e| state_error(&path, e))?;
        Ok(Some(value))
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.ensure()?;
        let path = self.path(name);
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content).map_err(|e| state_error(&path, e))?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(state_error(&path, e)),
        }
    }
}

fn state_error(path: &Path, err: impl std::fmt::Display) -> liftoff_core::LiftoffError {
    AutomationError::State {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
    .into()
}

fn http_error(err: reqwest::Error) -> liftoff_core::LiftoffError {
    AutomationError::Http(err.to_string()).into()
}

/// HTTP endpoint clients should use for a server bound to `hostname:port`
pub fn endpoint_for(hostname: &str, port: u16) -> String {
    let host = match hostname {
        "0.0.0.0" => "127.0.0.1".to_string(),
        "::" | "[::]" => "[::1]".to_string(),
        h if h.contains(':') && !h.starts_with('[') => format!("[{}]", h),
        h => h.to_string(),
    };
    format!("http://{}:{}", host, port)
}

/// URL of the session collection, or of one session when `id` is given
pub fn session_url(endpoint: &str, base_path: &str, id: Option<&str>) -> String {
    let base = base_path.trim_end_matches('/');
    match id {
        Some(id) => format!("{}{}/session/{}", endpoint, base, id),
        None => format!("{}{}/session", endpoint, base),
    }
}

/// New-session payload carrying both W3C and legacy capability forms
pub fn new_session_body(capabilities: &Capabilities) -> Value {
    let caps = capabilities.to_value();
    json!({
        "capabilities": {
            "alwaysMatch": caps,
            "firstMatch": [{}],
        },
        "desiredCapabilities": caps,
    })
}

/// Session id from a W3C (`value.sessionId`) or legacy (`sessionId`) response
pub fn parse_session_id(payload: &Value) -> Option<String> {
    payload
        .pointer("/value/sessionId")
        .or_else(|| payload.get("sessionId"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Human readable message from a WebDriver error response
pub fn error_message(payload: &Value) -> Option<String> {
    payload
        .pointer("/value/message")
        .or_else(|| payload.pointer("/value/error"))
        .or_else(|| payload.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Appium server process and WebDriver client
pub struct AppiumServer {
    executable: String,
    extra_args: Vec<String>,
    base_path: String,
    default_endpoint: String,
    state: StateDir,
    client: Client,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    child: Option<Child>,
    endpoint: Option<String>,
    session: Option<SessionRecord>,
}

impl AppiumServer {
    pub fn new(config: &AutomationConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            extra_args: config.extra_args.clone(),
            base_path: config.base_path.clone(),
            default_endpoint: endpoint_for(&config.hostname, config.port),
            state: StateDir {
                root: config.resolved_state_dir(),
            },
            client: Client::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// File the server's stdout/stderr are written to
    pub fn log_path(&self) -> PathBuf {
        self.state.path(SERVER_LOG_FILE)
    }

    fn resolve_endpoint(&self, inner: &Inner) -> Result<String> {
        if let Some(ref endpoint) = inner.endpoint {
            return Ok(endpoint.clone());
        }
        if let Some(record) = self.state.read::<ServerRecord>(SERVER_STATE_FILE)? {
            return Ok(record.endpoint);
        }
        Ok(self.default_endpoint.clone())
    }

    async fn is_ready(&self, endpoint: &str) -> bool {
        let url = format!("{}{}/status", endpoint, self.base_path.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url, error = %e, "server not ready yet");
                false
            }
        }
    }

    /// Poll the status endpoint until it answers or the child exits.
    ///
    /// The child must still be alive once the endpoint answers, so a server
    /// that grabbed the port in the meantime is not mistaken for ours.
    async fn wait_until_ready(&self, child: &mut Child, endpoint: &str) -> Result<()> {
        loop {
            if let Some(status) = child.try_wait()? {
                warn!(?status, "automation server exited during startup");
                return Err(AutomationError::ServerExited {
                    log: self.log_path(),
                }
                .into());
            }

            if self.is_ready(endpoint).await {
                if let Some(status) = child.try_wait()? {
                    warn!(?status, "endpoint answered but our server exited");
                    return Err(AutomationError::ServerExited {
                        log: self.log_path(),
                    }
                    .into());
                }
                return Ok(());
            }

            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Refuse to start over a live recorded server or a busy endpoint.
    ///
    /// A record whose process is gone is dropped.
    async fn ensure_free(&self, endpoint: &str) -> Result<()> {
        if let Some(record) = self.state.read::<ServerRecord>(SERVER_STATE_FILE)? {
            if pid_alive(record.pid).await {
                return Err(AutomationError::AlreadyRunning { pid: record.pid }.into());
            }
            debug!(pid = record.pid, "removing stale server record");
            self.state.remove(SERVER_STATE_FILE)?;
        }

        if self.is_ready(endpoint).await {
            return Err(AutomationError::EndpointInUse {
                endpoint: endpoint.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Whether a process with `pid` still exists
async fn pid_alive(pid: u32) -> bool {
    #[cfg(windows)]
    let command = ToolCommand::new("tasklist").args([
        "/FI".to_string(),
        format!("PID eq {}", pid),
        "/NH".to_string(),
    ]);
    #[cfg(not(windows))]
    let command = ToolCommand::new("kill").args(["-0".to_string(), pid.to_string()]);

    match command.run().await {
        #[cfg(windows)]
        Ok(output) => output.stdout.contains(&pid.to_string()),
        #[cfg(not(windows))]
        Ok(output) => output.success(),
        Err(e) => {
            debug!(pid, error = %e, "could not check process");
            false
        }
    }
}

async fn kill_pid(pid: u32) -> Result<()> {
    #[cfg(windows)]
    let command = ToolCommand::new("taskkill").args(["/PID", &pid.to_string(), "/F"]);
    #[cfg(not(windows))]
    let command = ToolCommand::new("kill").arg(pid.to_string());

    let output = command.run().await.map_err(|e| AutomationError::KillFailed {
        pid,
        reason: e.to_string(),
    })?;

    if !output.success() {
        return Err(AutomationError::KillFailed {
            pid,
            reason: output.stderr.trim().to_string(),
        }
        .into());
    }
    Ok(())
}

#[async_trait]
impl AutomationServer for AppiumServer {
    #[instrument(skip(self))]
    async fn run_server(&self, hostname: &str, port: u16) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if let Some(child) = inner.child.as_mut() {
            if child.try_wait()?.is_none() {
                return Err(AutomationError::AlreadyRunning {
                    pid: child.id().unwrap_or_default(),
                }
                .into());
            }
            inner.child = None;
            inner.endpoint = None;
        }

        let endpoint = endpoint_for(hostname, port);
        self.ensure_free(&endpoint).await?;

        self.state.ensure()?;
        let log_path = self.log_path();
        let log = std::fs::File::create(&log_path).map_err(|e| state_error(&log_path, e))?;
        let log_err = log.try_clone().map_err(|e| state_error(&log_path, e))?;

        let mut child = Command::new(&self.executable)
            .args(["--address", hostname, "--port", &port.to_string()])
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| AutomationError::SpawnFailed {
                command: self.executable.clone(),
                reason: e.to_string(),
            })?;

        let pid = child.id().unwrap_or_default();
        info!(pid, endpoint, log = %log_path.display(), "automation server spawned");

        self.wait_until_ready(&mut child, &endpoint).await?;

        self.state.write(
            SERVER_STATE_FILE,
            &ServerRecord {
                pid,
                endpoint: endpoint.clone(),
            },
        )?;
        info!(pid, endpoint, "automation server listening");

        inner.child = Some(child);
        inner.endpoint = Some(endpoint);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn quit_server(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.endpoint = None;

        if let Some(mut child) = inner.child.take() {
            let pid = child.id().unwrap_or_default();
            if child.try_wait()?.is_none() {
                child.kill().await.map_err(|e| AutomationError::KillFailed {
                    pid,
                    reason: e.to_string(),
                })?;
            }
            self.state.remove(SERVER_STATE_FILE)?;
            info!(pid, "automation server stopped");
            return Ok(());
        }

        let record = self
            .state
            .read::<ServerRecord>(SERVER_STATE_FILE)?
            .ok_or(AutomationError::NotRunning)?;

        // a stale record is dropped even when the kill fails
        let killed = kill_pid(record.pid).await;
        self.state.remove(SERVER_STATE_FILE)?;
        killed?;

        info!(pid = record.pid, "automation server stopped");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn start_client(&self, capabilities: &Capabilities) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if let Some(ref session) = inner.session {
            return Err(AutomationError::SessionActive(session.session_id.clone()).into());
        }
        if let Some(session) = self.state.read::<SessionRecord>(SESSION_STATE_FILE)? {
            return Err(AutomationError::SessionActive(session.session_id).into());
        }

        let endpoint = self.resolve_endpoint(&inner)?;
        let url = session_url(&endpoint, &self.base_path, None);
        debug!(url, "creating session");

        let response = self
            .client
            .post(&url)
            .json(&new_session_body(capabilities))
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        let text = response.text().await.map_err(http_error)?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(AutomationError::WebDriver {
                status: status.as_u16(),
                message: error_message(&payload).unwrap_or(text),
            }
            .into());
        }

        let session_id = parse_session_id(&payload)
            .ok_or_else(|| AutomationError::InvalidResponse(text.clone()))?;
        let record = SessionRecord {
            session_id,
            endpoint,
        };
        self.state.write(SESSION_STATE_FILE, &record)?;

        info!(session_id = %record.session_id, "client session started");
        inner.session = Some(record);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop_client(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let session = match inner.session.take() {
            Some(session) => session,
            None => self
                .state
                .read::<SessionRecord>(SESSION_STATE_FILE)?
                .ok_or(AutomationError::NoSession)?,
        };

        let url = session_url(&session.endpoint, &self.base_path, Some(&session.session_id));
        debug!(url, "deleting session");
        let sent = self.client.delete(&url).send().await;
        self.state.remove(SESSION_STATE_FILE)?;

        let response = sent.map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            return Err(AutomationError::WebDriver {
                status: status.as_u16(),
                message: error_message(&payload).unwrap_or(text),
            }
            .into());
        }

        info!(session_id = %session.session_id, "client session stopped");
        Ok(())
    }
}
