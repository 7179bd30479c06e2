//! Browser launcher
//!
//! Finds a Chrome-family executable, starts it with a remote-debugging port and
//! connects one browser-level CDP client to it. Every tab the preview opens is a
//! flattened session on that one connection.

use async_trait::async_trait;
use protocol::PreviewConfig;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::cdp::{CDPClient, CDPSession};
use crate::error::{HostError, Result};
use crate::page::PageChannel;

/// How long a fresh browser gets to print its DevTools endpoint
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

const DEVTOOLS_PREFIX: &str = "DevTools listening on ";

const CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
];

#[cfg(target_os = "linux")]
const KNOWN_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

#[cfg(target_os = "macos")]
const KNOWN_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "windows")]
const KNOWN_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const KNOWN_PATHS: &[&str] = &[];

/// Locates the browser executable
pub trait ExecutableResolver: Send + Sync {
    fn resolve(&self, configured: Option<&str>) -> Option<PathBuf>;
}

/// Configured path, then `CHROME_PATH`, then `PATH`, then well-known install locations
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl ExecutableResolver for SystemResolver {
    fn resolve(&self, configured: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = configured.map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
            tracing::warn!(path = %path.display(), "Configured browser executable not found");
        }

        if let Some(path) = std::env::var_os("CHROME_PATH").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        CANDIDATES
            .iter()
            .find_map(|name| which::which(name).ok())
            .or_else(|| {
                KNOWN_PATHS
                    .iter()
                    .map(PathBuf::from)
                    .find(|path| path.exists())
            })
    }
}

/// What a launch needs to know
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub executable: Option<String>,
    pub headless: bool,
    pub ignore_https_errors: bool,
    pub startup_timeout: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            ignore_https_errors: false,
            startup_timeout: STARTUP_TIMEOUT,
        }
    }
}

impl From<&PreviewConfig> for LaunchConfig {
    fn from(config: &PreviewConfig) -> Self {
        Self {
            executable: config.chrome_executable.clone(),
            headless: config.headless,
            ignore_https_errors: config.ignore_https_errors,
            ..Self::default()
        }
    }
}

/// A running browser process
#[derive(Debug)]
pub struct BrowserHandle {
    pub debug_port: u16,
    pub executable: PathBuf,
    alive: AtomicBool,
}

impl BrowserHandle {
    pub fn new(debug_port: u16, executable: impl Into<PathBuf>) -> Self {
        Self {
            debug_port,
            executable: executable.into(),
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Returns false if the handle was already dead
    pub fn mark_dead(&self) -> bool {
        self.alive.swap(false, Ordering::SeqCst)
    }
}

/// A launched browser that can open tabs
#[async_trait]
pub trait Browser: Send + Sync {
    fn handle(&self) -> Arc<BrowserHandle>;

    async fn open_page(&self) -> Result<Arc<dyn PageChannel>>;

    /// Terminate the process. Idempotent.
    async fn close(&self);
}

#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, config: &LaunchConfig) -> Result<Arc<dyn Browser>>;
}

/// Launches a local Chrome/Chromium/Edge
pub struct ChromeLauncher {
    resolver: Arc<dyn ExecutableResolver>,
}

impl ChromeLauncher {
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(SystemResolver))
    }

    pub fn with_resolver(resolver: Arc<dyn ExecutableResolver>) -> Self {
        Self { resolver }
    }
}

impl Default for ChromeLauncher {
    fn default() -> Self {
        Self::new()
    }
}

/// Ask the OS for a free port. The listener is dropped before the browser binds it.
pub fn free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

pub fn user_data_dir(port: u16) -> PathBuf {
    std::env::temp_dir().join(format!("browser-preview-{}", port))
}

/// Command line for a debuggable browser on `port`
pub fn build_args(config: &LaunchConfig, port: u16, user_data_dir: &Path) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", port),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
    ];

    if config.headless {
        args.push("--headless=new".to_string());
    }

    if cfg!(target_os = "linux") {
        args.push("--no-sandbox".to_string());
    }

    if config.ignore_https_errors {
        args.push("--ignore-certificate-errors".to_string());
    }

    args.push("about:blank".to_string());
    args
}

/// Read lines until the browser announces its WebSocket endpoint.
/// Returns the endpoint and the rest of the stream.
pub async fn read_devtools_url<R>(
    stream: R,
    timeout: Duration,
) -> Result<(String, Lines<BufReader<R>>)>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let line = tokio::time::timeout_at(deadline, lines.next_line())
            .await
            .map_err(|_| {
                HostError::LaunchFailed("Timed out waiting for the browser to start".to_string())
            })??;

        match line {
            Some(line) => {
                if let Some((_, url)) = line.split_once(DEVTOOLS_PREFIX) {
                    return Ok((url.trim().to_string(), lines));
                }
            }
            None => {
                return Err(HostError::LaunchFailed(
                    "Browser exited before printing its DevTools endpoint".to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl Launcher for ChromeLauncher {
    async fn launch(&self, config: &LaunchConfig) -> Result<Arc<dyn Browser>> {
        let executable = self
            .resolver
            .resolve(config.executable.as_deref())
            .ok_or_else(|| {
                HostError::BrowserNotFound(
                    "set the chromeExecutable setting to a Chrome or Chromium binary".to_string(),
                )
            })?;

        let port = free_port()?;
        let data_dir = user_data_dir(port);
        let args = build_args(config, port, &data_dir);

        tracing::info!(executable = %executable.display(), port, "Launching browser");
        tracing::debug!("Browser args: {:?}", args);

        let mut child = Command::new(&executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HostError::LaunchFailed(format!("{}: {}", executable.display(), e))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| HostError::LaunchFailed("No stderr from browser".to_string()))?;
        let (ws_url, mut rest) = read_devtools_url(stderr, config.startup_timeout).await?;
        tracing::debug!(ws_url = %ws_url, "Got DevTools endpoint");

        // Keep the pipe drained so the browser never blocks on a full stderr
        tokio::spawn(async move {
            while let Ok(Some(line)) = rest.next_line().await {
                tracing::trace!(target: "browser", "{}", line);
            }
        });

        let client = CDPClient::connect(&ws_url).await?;

        Ok(Arc::new(ChromeBrowser {
            handle: Arc::new(BrowserHandle::new(port, executable)),
            client,
            child: Mutex::new(Some(child)),
            user_data_dir: data_dir,
        }))
    }
}

pub struct ChromeBrowser {
    handle: Arc<BrowserHandle>,
    client: Arc<CDPClient>,
    child: Mutex<Option<Child>>,
    user_data_dir: PathBuf,
}

#[async_trait]
impl Browser for ChromeBrowser {
    fn handle(&self) -> Arc<BrowserHandle> {
        self.handle.clone()
    }

    async fn open_page(&self) -> Result<Arc<dyn PageChannel>> {
        if !self.handle.is_alive() {
            return Err(HostError::Disposed);
        }
        let session = CDPSession::open(self.client.clone(), "about:blank").await?;
        Ok(Arc::new(session))
    }

    async fn close(&self) {
        if !self.handle.mark_dead() {
            return;
        }

        if let Err(e) = self.client.close().await {
            tracing::debug!("CDP connection close: {}", e);
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill browser: {}", e);
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            tracing::debug!("Profile cleanup skipped: {}", e);
        }

        tracing::info!(port = self.handle.debug_port, "Browser closed");
    }
}
