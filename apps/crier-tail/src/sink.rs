//! Outputs the stream client drives: the render sink that receives a full
//! markup replacement per render, and the degraded-state indicator.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write page {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Receives the complete view after every ingested event. Each call replaces
/// whatever was displayed before.
pub trait RenderSink: Send {
    fn render(&mut self, markup: &str) -> Result<(), SinkError>;
}

/// Two-state "connection lost" indicator. While shown it must not be
/// dismissable by the viewer.
pub trait DegradedSignal: Send {
    fn show(&mut self) -> Result<(), SinkError>;
    fn hide(&mut self) -> Result<(), SinkError>;
}

const STYLESHEET: &str = "https://cdn.jsdelivr.net/npm/semantic-ui@2.4.2/dist/semantic.min.css";

/// A self-refreshing HTML document on disk.
///
/// Clones share one page, so the same handle can serve as both the render
/// sink and the degraded signal. Every change rewrites the whole document
/// through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    inner: Arc<Mutex<PageState>>,
}

#[derive(Debug)]
struct PageState {
    path: PathBuf,
    refresh_secs: u32,
    markup: String,
    degraded: bool,
}

impl HtmlPage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PageState {
                path: path.into(),
                refresh_secs: 2,
                markup: String::new(),
                degraded: false,
            })),
        }
    }

    pub fn with_refresh_secs(self, secs: u32) -> Self {
        self.lock().refresh_secs = secs;
        self
    }

    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Write the current (possibly empty) page immediately.
    pub fn publish(&self) -> Result<(), SinkError> {
        self.lock().write()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl PageState {
    fn document(&self) -> String {
        let overlay = if self.degraded {
            r#"<div class="ui active page dimmer" id="connection_lost" data-closable="false">
    <div class="content">
        <h2 class="ui inverted header">Connection lost<div class="sub header">Reconnecting&hellip;</div></h2>
    </div>
</div>
"#
        } else {
            ""
        };
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh}">
<title>crier</title>
<link rel="stylesheet" href="{STYLESHEET}">
</head>
<body>
<div class="ui container" id="message_container">
{markup}</div>
{overlay}</body>
</html>
"#,
            refresh = self.refresh_secs,
            markup = self.markup,
        )
    }

    fn write(&self) -> Result<(), SinkError> {
        let io_err = |source| SinkError::Io {
            path: self.path.clone(),
            source,
        };
        let staging = staging_path(&self.path);
        fs::write(&staging, self.document()).map_err(io_err)?;
        fs::rename(&staging, &self.path).map_err(io_err)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl RenderSink for HtmlPage {
    fn render(&mut self, markup: &str) -> Result<(), SinkError> {
        let mut page = self.lock();
        page.markup.clear();
        page.markup.push_str(markup);
        page.write()
    }
}

impl DegradedSignal for HtmlPage {
    fn show(&mut self) -> Result<(), SinkError> {
        let mut page = self.lock();
        page.degraded = true;
        page.write()
    }

    fn hide(&mut self) -> Result<(), SinkError> {
        let mut page = self.lock();
        page.degraded = false;
        page.write()
    }
}

/// Records everything it is given; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemoryRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryRecord {
    pub renders: Vec<String>,
    pub degraded: bool,
    /// Every show (`true`) / hide (`false`) in call order.
    pub toggles: Vec<bool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> MemoryRecord {
        self.lock().clone()
    }

    pub fn last_render(&self) -> Option<String> {
        self.lock().renders.last().cloned()
    }

    pub fn is_degraded(&self) -> bool {
        self.lock().degraded
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRecord> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl RenderSink for MemorySink {
    fn render(&mut self, markup: &str) -> Result<(), SinkError> {
        self.lock().renders.push(markup.to_owned());
        Ok(())
    }
}

impl DegradedSignal for MemorySink {
    fn show(&mut self) -> Result<(), SinkError> {
        let mut record = self.lock();
        record.degraded = true;
        record.toggles.push(true);
        Ok(())
    }

    fn hide(&mut self) -> Result<(), SinkError> {
        let mut record = self.lock();
        record.degraded = false;
        record.toggles.push(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_fully_replaced_on_each_render() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tail.html");
        let mut page = HtmlPage::new(&path);

        page.render("<table>one</table>\n").expect("render");
        page.render("<table>two</table>\n").expect("render");

        let written = fs::read_to_string(&path).expect("read page");
        assert!(written.contains("<table>two</table>"));
        assert!(!written.contains("<table>one</table>"));
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn degraded_overlay_tracks_show_and_hide() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tail.html");
        let mut page = HtmlPage::new(&path).with_refresh_secs(5);
        let mut signal = page.clone();

        page.render("<table>rows</table>\n").expect("render");
        signal.show().expect("show");
        let degraded = fs::read_to_string(&path).expect("read page");
        assert!(degraded.contains(r#"id="connection_lost" data-closable="false""#));
        assert!(degraded.contains("<table>rows</table>"));
        assert!(degraded.contains(r#"content="5""#));

        signal.hide().expect("hide");
        let restored = fs::read_to_string(&path).expect("read page");
        assert!(!restored.contains("connection_lost"));
    }

    #[test]
    fn write_errors_name_the_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut page = HtmlPage::new(dir.path().join("missing").join("tail.html"));
        let err = page.render("x").unwrap_err();
        assert!(err.to_string().contains("tail.html"));
    }

    #[test]
    fn memory_sink_shares_record_across_clones() {
        let sink = MemorySink::new();
        let mut as_sink = sink.clone();
        let mut as_signal = sink.clone();
        as_sink.render("a").expect("render");
        as_signal.show().expect("show");
        as_signal.hide().expect("hide");
        let record = sink.record();
        assert_eq!(record.renders, vec!["a".to_string()]);
        assert_eq!(record.toggles, vec![true, false]);
        assert!(!record.degraded);
    }
}
