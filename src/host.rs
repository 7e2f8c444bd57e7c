use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::timestamp::{format_timestamp, watch_url_at};
use crate::{Error, Result, extract_video_id};

/// What the surrounding player/page lets the pipeline see and do.
pub trait HostEnvironment: Send + Sync {
    /// URL of the page currently shown, if any
    fn current_url(&self) -> Option<String>;

    /// Move playback to `offset` seconds
    fn seek(&self, offset: f64) -> Result<()>;

    fn current_video_id(&self) -> Option<String> {
        self.current_url().as_deref().and_then(extract_video_id)
    }
}

/// Host for a terminal session: the "page" is whatever URL was last opened,
/// and seeking hands back a watch link at the requested time.
#[derive(Debug, Default)]
pub struct TerminalHost {
    url: Mutex<Option<String>>,
    last_seek: Mutex<Option<String>>,
}

impl TerminalHost {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(Some(url.into())),
            last_seek: Mutex::default(),
        }
    }

    pub fn navigate(&self, url: impl Into<String>) {
        let url = url.into();
        info!("Navigating to {url}");
        *self.url.lock().unwrap_or_else(|e| e.into_inner()) = Some(url);
    }

    /// Watch link produced by the most recent seek
    pub fn last_seek(&self) -> Option<String> {
        self.last_seek.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl HostEnvironment for TerminalHost {
    fn current_url(&self) -> Option<String> {
        self.url.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn seek(&self, offset: f64) -> Result<()> {
        let video_id = self.current_video_id().ok_or(Error::NoVideoDetected)?;
        let link = watch_url_at(&video_id, offset.max(0.0).floor() as u32);
        info!("Seek to {} -> {link}", format_timestamp(offset));
        *self.last_seek.lock().unwrap_or_else(|e| e.into_inner()) = Some(link);
        Ok(())
    }
}

/// Tracks the last video id seen on the host and reports changes.
#[derive(Debug, Default)]
pub struct VideoWatcher {
    last_seen: Option<Option<String>>,
}

impl VideoWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(new_id)` when the host's video differs from the last check.
    /// The first check always reports.
    pub fn check(&mut self, host: &dyn HostEnvironment) -> Option<Option<String>> {
        let current = host.current_video_id();
        if self.last_seen.as_ref() == Some(&current) {
            return None;
        }
        debug!("Video changed: {:?} -> {current:?}", self.last_seen.as_ref().and_then(|v| v.as_ref()));
        self.last_seen = Some(current.clone());
        Some(current)
    }

    /// Poll `host` every `interval`, sending each change. Stops once the
    /// receiver is dropped.
    pub fn spawn(host: Arc<dyn HostEnvironment>, interval: Duration) -> mpsc::Receiver<Option<String>> {
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let mut watcher = VideoWatcher::new();
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Some(change) = watcher.check(host.as_ref())
                    && tx.send(change).await.is_err()
                {
                    break;
                }
                if tx.is_closed() {
                    break;
                }
            }
        });
        rx
    }
}
