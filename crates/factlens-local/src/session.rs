//! Popup-side orchestration of one scan: extract → analyze → highlight.
//!
//! A session serves one tab. Runs never overlap (busy flag), and a run whose generation
//! was superseded while it waited on the page is discarded instead of applied.

use crate::analyzer::analyze;
use crate::config::Config;
use crate::store;
use factlens_core::{
    AnalysisReport, AnalysisRequest, ContentChannel, ContentRequest, ContentResponse, Error,
    FeedbackTally, HistoryEntry, KvStore, Result, ScanMode, ScanResult,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Default)]
pub struct Tab {
    pub url: String,
    pub title: String,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScanSession<C, S> {
    channel: C,
    store: S,
    tab: Tab,
    scan_timeout: Duration,
    language: String,
    busy: AtomicBool,
    generation: AtomicU64,
    visible: AtomicBool,
}

impl<C: ContentChannel, S: KvStore> ScanSession<C, S> {
    pub fn new(channel: C, store: S, tab: Tab, cfg: &Config) -> Self {
        Self {
            channel,
            store,
            tab,
            scan_timeout: cfg.scan_timeout,
            language: cfg.language.clone(),
            busy: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            visible: AtomicBool::new(true),
        }
    }

    pub fn tab(&self) -> &Tab {
        &self.tab
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Mark every in-flight run stale (e.g. the tab navigated).
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    async fn request_scan(&self, mode: ScanMode) -> Result<ScanResult> {
        let fut = self.channel.send(ContentRequest::scan(mode));
        let resp = tokio::time::timeout(self.scan_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(self.scan_timeout.as_millis() as u64))??;
        match resp {
            ContentResponse::Scan(r) => Ok(r),
            ContentResponse::Ack => Err(Error::NoResponder(
                "page acknowledged a scan without returning text".to_string(),
            )),
        }
    }

    /// One full scan. Fails only with `Busy` (another action in flight) or `Stale`.
    ///
    /// Extraction and highlighting problems degrade the report and show up in `notices`.
    pub async fn run(&self, mode: ScanMode) -> Result<AnalysisReport> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let issued = self.invalidate();

        let mut notices = Vec::new();
        let text = match self.request_scan(mode).await {
            Ok(r) => r.text,
            Err(e) => {
                tracing::warn!(error = %e, %mode, "scan failed; continuing without page text");
                notices.push(format!("Could not read the page ({e}); showing a neutral result."));
                String::new()
            }
        };

        let current = self.generation();
        if current != issued {
            tracing::debug!(issued, current, "discarding stale scan");
            return Err(Error::Stale { issued, current });
        }

        if text.trim().is_empty() {
            let mut report = AnalysisReport::neutral();
            report.notices = notices;
            return Ok(report);
        }

        let req = AnalysisRequest {
            text,
            url: self.tab.url.clone(),
            title: self.tab.title.clone(),
            mode,
            language: self.language.clone(),
        };
        let mut report = analyze(&req);
        report.notices.extend(notices);

        let apply = ContentRequest::ApplyHighlights {
            highlights: report.highlights.clone(),
        };
        let applied = tokio::time::timeout(self.scan_timeout, self.channel.send(apply))
            .await
            .map_err(|_| Error::Timeout(self.scan_timeout.as_millis() as u64))
            .and_then(|r| r);
        if let Err(e) = applied {
            tracing::warn!(error = %e, "could not apply highlights");
            report
                .notices
                .push(format!("Highlights could not be shown on the page ({e})."));
        }
        Ok(report)
    }

    pub fn highlights_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Flip marker visibility. Returns the new state; on failure the state is unchanged.
    pub async fn toggle_highlights(&self) -> Result<bool> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let visible = !self.highlights_visible();
        let fut = self
            .channel
            .send(ContentRequest::ToggleHighlights { visible });
        tokio::time::timeout(self.scan_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(self.scan_timeout.as_millis() as u64))??;
        self.visible.store(visible, Ordering::Release);
        Ok(visible)
    }

    pub fn save_history(&self, report: &AnalysisReport) -> Result<Vec<HistoryEntry>> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64;
        store::push_history(
            &self.store,
            HistoryEntry {
                url: self.tab.url.clone(),
                timestamp_ms,
                score: report.final_score,
            },
        )
    }

    /// Record agree/disagree for this tab. Rejected with `Busy` while a scan is running.
    pub fn submit_feedback(&self, mode: ScanMode, agree: bool) -> Result<FeedbackTally> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        store::record_feedback(&self.store, &self.tab.url, &self.tab.title, mode, agree)
    }
}
