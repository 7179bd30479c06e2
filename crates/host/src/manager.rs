//! Browser Process Manager
//!
//! One browser per manager. The first `new_page` launches it; concurrent callers
//! wait on the same launch. A failed launch is final for this manager. A launch
//! that finishes after `dispose` closes its own browser.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::editor::Clipboard;
use crate::error::{HostError, Result};
use crate::launcher::{Browser, BrowserHandle, LaunchConfig, Launcher};
use crate::page::PageSession;

pub struct BrowserProcessManager {
    config: LaunchConfig,
    launcher: Arc<dyn Launcher>,
    browser: OnceCell<Arc<dyn Browser>>,
    failure: Mutex<Option<String>>,
    disposed: AtomicBool,
    closed: AtomicBool,
}

impl BrowserProcessManager {
    pub fn new(config: LaunchConfig, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            config,
            launcher,
            browser: OnceCell::new(),
            failure: Mutex::new(None),
            disposed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    async fn browser(&self) -> Result<Arc<dyn Browser>> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(HostError::Disposed);
        }
        if let Some(reason) = self.failure.lock().clone() {
            return Err(HostError::LaunchFailed(reason));
        }

        let browser = self
            .browser
            .get_or_try_init(|| async {
                // A waiter that lost the race to a failed launch must not relaunch
                if let Some(reason) = self.failure.lock().clone() {
                    return Err(HostError::LaunchFailed(reason));
                }
                match self.launcher.launch(&self.config).await {
                    Ok(browser) => Ok(browser),
                    Err(e) => {
                        tracing::error!("Browser launch failed: {}", e);
                        *self.failure.lock() = Some(e.to_string());
                        Err(e)
                    }
                }
            })
            .await?;

        // Dispose may have run while the launch was in flight
        if self.disposed.load(Ordering::SeqCst) {
            tracing::debug!("Browser launched after dispose, closing it");
            self.close_browser(browser).await;
            return Err(HostError::Disposed);
        }

        Ok(browser.clone())
    }

    async fn close_browser(&self, browser: &Arc<dyn Browser>) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            browser.close().await;
        }
    }

    /// Open a new tab. Launches the browser on first use.
    pub async fn new_page(&self, clipboard: Arc<dyn Clipboard>) -> Result<PageSession> {
        let browser = self.browser().await?;
        let page = PageSession::new(browser, clipboard);
        page.launch().await?;
        Ok(page)
    }

    /// The running browser, if any
    pub fn handle(&self) -> Option<Arc<BrowserHandle>> {
        self.browser.get().map(|browser| browser.handle())
    }

    pub fn debug_port(&self) -> Option<u16> {
        self.handle()
            .filter(|handle| handle.is_alive())
            .map(|handle| handle.debug_port)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Terminate the browser. Safe to call more than once.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(browser) = self.browser.get() {
            self.close_browser(browser).await;
        }
    }
}
