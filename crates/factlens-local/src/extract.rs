//! Page-side text extraction: main article text, selection context, and page metadata.

use crate::document::{inner_text, Document};
use crate::textprep::{norm_ws, truncate_chars};
use factlens_core::{ScanMeta, ScanMode, ScanResult, Surrounding};
use html_scraper::{ElementRef, Selector};
use std::collections::BTreeMap;

/// Characters of neighbouring-paragraph context kept on each side of a selection.
pub const SURROUNDING_MAX_CHARS: usize = 400;

const SELECTION_BLOCK_TAGS: &[&str] = &["p", "div", "section", "article"];

/// Main-content containers, most specific first.
const CONTAINER_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=main]",
    ".article-body",
    ".story-body",
    ".post-content",
    "body",
];

/// Container whose text a page scan reports. Falls back to the `<html>` element.
pub fn main_container(doc: &Document) -> ElementRef<'_> {
    CONTAINER_SELECTORS
        .iter()
        .find_map(|sel| doc.select_first(sel))
        .unwrap_or_else(|| doc.root())
}

pub fn headline(doc: &Document) -> String {
    doc.first_text("article h1")
        .or_else(|| doc.first_text("h1"))
        .or_else(|| doc.first_attr(r#"meta[property="og:title"]"#, "content"))
        .or_else(|| doc.first_text("title"))
        .unwrap_or_default()
}

pub fn description(doc: &Document) -> String {
    doc.first_attr(r#"meta[name="description"]"#, "content")
        .or_else(|| doc.first_attr(r#"meta[property="og:description"]"#, "content"))
        .unwrap_or_default()
}

pub fn published(doc: &Document) -> Option<String> {
    doc.first_attr(r#"meta[property="article:published_time"]"#, "content")
        .or_else(|| doc.first_attr(r#"meta[name="pubdate"]"#, "content"))
        .or_else(|| doc.first_attr(r#"meta[name="date"]"#, "content"))
        .or_else(|| doc.first_attr("time[datetime]", "datetime"))
        .or_else(|| doc.first_text("time[datetime]"))
}

/// Number of `a[href]` elements under `el`.
pub fn count_links(el: ElementRef<'_>) -> usize {
    let sel = Selector::parse("a[href]").ok();
    let Some(sel) = sel else { return 0 };
    el.select(&sel).count()
}

pub fn scan_page(doc: &Document) -> ScanResult {
    let container = main_container(doc);
    let text = inner_text(container).trim().to_string();

    let link_scope = ["article", "main", "body"]
        .iter()
        .find_map(|sel| doc.select_first(sel))
        .unwrap_or_else(|| doc.root());
    let mut link_counts = BTreeMap::new();
    link_counts.insert("article".to_string(), count_links(link_scope));

    tracing::debug!(
        container = container.value().name(),
        chars = text.chars().count(),
        "page scanned"
    );

    ScanResult {
        text,
        meta: ScanMeta {
            kind: ScanMode::Page,
            headline: headline(doc),
            description: description(doc),
            published: published(doc),
            surrounding: None,
            link_counts,
        },
    }
}

/// Deepest element (along the first matching path) whose visible text contains `needle`.
fn locate<'a>(doc: &'a Document, needle: &str) -> Option<ElementRef<'a>> {
    let mut cur = doc.body().unwrap_or_else(|| doc.root());
    if !norm_ws(&inner_text(cur)).contains(needle) {
        return None;
    }
    loop {
        let next = cur
            .children()
            .filter_map(ElementRef::wrap)
            .find(|c| norm_ws(&inner_text(*c)).contains(needle));
        match next {
            Some(n) => cur = n,
            None => return Some(cur),
        }
    }
}

fn enclosing_block(el: ElementRef<'_>) -> ElementRef<'_> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .find(|e| SELECTION_BLOCK_TAGS.contains(&e.value().name()))
        .unwrap_or(el)
}

fn sibling_text(el: Option<ElementRef<'_>>) -> String {
    el.map(|e| truncate_chars(inner_text(e).trim(), SURROUNDING_MAX_CHARS).0)
        .unwrap_or_default()
}

/// Scan the user's selection. `None`/blank selection yields empty text plus page metadata.
pub fn scan_selection(doc: &Document, selection: Option<&str>) -> ScanResult {
    let text = selection.map(str::trim).unwrap_or_default().to_string();
    let mut meta = ScanMeta {
        kind: ScanMode::Selection,
        headline: headline(doc),
        description: description(doc),
        ..ScanMeta::default()
    };
    if text.is_empty() {
        return ScanResult { text, meta };
    }
    meta.published = published(doc);

    match locate(doc, &norm_ws(&text)) {
        Some(found) => {
            let block = enclosing_block(found);
            let before = block.prev_siblings().find_map(ElementRef::wrap);
            let after = block.next_siblings().find_map(ElementRef::wrap);
            meta.surrounding = Some(Surrounding {
                before: sibling_text(before),
                after: sibling_text(after),
            });
            meta.link_counts
                .insert("block".to_string(), count_links(block));
            meta.link_counts
                .insert("before".to_string(), before.map(count_links).unwrap_or(0));
            meta.link_counts
                .insert("after".to_string(), after.map(count_links).unwrap_or(0));
        }
        None => {
            tracing::debug!("selection text not found in document; no context");
        }
    }
    ScanResult { text, meta }
}
