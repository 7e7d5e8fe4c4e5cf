//! In-process stand-in for the page's content script.
//!
//! A `ContentScript` owns the page document (through its `HighlightApplier`) and the
//! current selection. `spawn` moves it onto a tokio task that serves one message at a time;
//! the returned `ContentHandle` is the analysis side's `ContentChannel`.

use crate::applier::HighlightApplier;
use crate::document::Document;
use crate::extract::{scan_page, scan_selection};
use factlens_core::{ContentChannel, ContentRequest, ContentResponse, Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct ContentScript {
    applier: HighlightApplier,
    selection: Option<String>,
}

impl ContentScript {
    pub fn new(doc: Document) -> Self {
        Self {
            applier: HighlightApplier::attach(doc),
            selection: None,
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(Document::parse(html))
    }

    pub fn select(&mut self, text: impl Into<String>) {
        self.selection = Some(text.into());
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn applier(&self) -> &HighlightApplier {
        &self.applier
    }

    pub fn document(&self) -> &Document {
        self.applier.document()
    }

    /// Navigation: drop markers and hand back the clean document.
    pub fn into_document(self) -> Document {
        self.applier.detach()
    }

    pub fn handle(&mut self, req: ContentRequest) -> ContentResponse {
        match req {
            ContentRequest::ScanPage => ContentResponse::Scan(scan_page(self.document())),
            ContentRequest::ScanSelection => ContentResponse::Scan(scan_selection(
                self.document(),
                self.selection.as_deref(),
            )),
            ContentRequest::ApplyHighlights { highlights } => {
                self.applier.apply(&highlights);
                ContentResponse::Ack
            }
            ContentRequest::ToggleHighlights { visible } => {
                self.applier.set_visible(visible);
                ContentResponse::Ack
            }
        }
    }

    /// Serve requests until every handle is dropped, then return the script.
    pub fn spawn(mut self, buffer: usize) -> (ContentHandle, JoinHandle<ContentScript>) {
        let (tx, mut rx) = mpsc::channel::<Envelope>(buffer.max(1));
        let task = tokio::spawn(async move {
            while let Some(env) = rx.recv().await {
                let resp = self.handle(env.req);
                // The requester may have timed out and gone away.
                let _ = env.reply.send(resp);
            }
            self
        });
        (ContentHandle { tx }, task)
    }
}

#[derive(Debug)]
struct Envelope {
    req: ContentRequest,
    reply: oneshot::Sender<ContentResponse>,
}

#[derive(Debug, Clone)]
pub struct ContentHandle {
    tx: mpsc::Sender<Envelope>,
}

#[async_trait::async_trait]
impl ContentChannel for ContentHandle {
    async fn send(&self, req: ContentRequest) -> Result<ContentResponse> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { req, reply })
            .await
            .map_err(|_| Error::NoResponder("content script is not running".to_string()))?;
        rx.await
            .map_err(|_| Error::NoResponder("content script dropped the request".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factlens_core::{Category, Highlight};

    const PAGE: &str =
        "<html><body><article><p>Shocking claims. Experts say so.</p></article></body></html>";

    #[tokio::test]
    async fn serves_scan_and_apply_in_order() {
        let (h, task) = ContentScript::from_html(PAGE).spawn(4);
        let resp = h.send(ContentRequest::ScanPage).await.unwrap();
        let ContentResponse::Scan(scan) = resp else {
            panic!("expected scan response");
        };
        assert_eq!(scan.text, "Shocking claims. Experts say so.");

        let hl = Highlight {
            span: "Experts say".to_string(),
            start: 17,
            end: 28,
            category: Category::SourceAmbiguity,
            reason: "Ambiguous source reference".to_string(),
            explanation: String::new(),
        };
        let ack = h
            .send(ContentRequest::ApplyHighlights {
                highlights: vec![hl],
            })
            .await
            .unwrap();
        assert_eq!(ack, ContentResponse::Ack);
        h.send(ContentRequest::ToggleHighlights { visible: false })
            .await
            .unwrap();

        drop(h);
        let script = task.await.unwrap();
        assert_eq!(script.applier().marker_count(), 1);
        assert!(!script.applier().visible());
        assert!(script.document().to_html().contains("factlens-hide-highlights"));
        assert!(!script.into_document().to_html().contains("<mark"));
    }

    #[tokio::test]
    async fn selection_scan_uses_current_selection() {
        let mut script = ContentScript::from_html(PAGE);
        script.select("Experts say so.");
        let (h, _task) = script.spawn(1);
        let resp = h.send(ContentRequest::ScanSelection).await.unwrap();
        let ContentResponse::Scan(scan) = resp else {
            panic!("expected scan response");
        };
        assert_eq!(scan.text, "Experts say so.");
        assert!(scan.meta.surrounding.is_some());
    }

    #[tokio::test]
    async fn stopped_script_is_no_responder() {
        let (h, task) = ContentScript::from_html(PAGE).spawn(1);
        task.abort();
        let _ = task.await;
        let err = h.send(ContentRequest::ScanPage).await.unwrap_err();
        assert!(matches!(err, Error::NoResponder(_)), "got {err:?}");
    }
}
