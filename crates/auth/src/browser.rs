use tracing::{info, warn};

/// Fire-and-forget launcher for the consent page. There is no completion
/// signal: the listener timeout is the only bound on an abandoned login.
pub trait BrowserOpener: Send + Sync {
    fn open_external(&self, url: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    fn open_external(&self, url: &str) {
        match webbrowser::open(url) {
            Ok(()) => info!("Opened browser for OAuth consent"),
            Err(e) => warn!("Failed to open browser ({e}); visit {url} manually"),
        }
    }
}
