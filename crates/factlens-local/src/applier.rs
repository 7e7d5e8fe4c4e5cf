//! Marks highlight spans in a live document and can undo it exactly.

use crate::document::{
    element_from_markup, escape_attr, in_hidden_subtree, text_content, text_node, Document,
};
use factlens_core::Highlight;
use html_scraper::{ElementRef, Node};

pub const MARKER_TAG: &str = "mark";
pub const MARKER_CLASS: &str = "factlens-highlight";
/// Carries the serial of each marker this applier created.
pub const MARKER_ATTR: &str = "data-factlens-marker";
/// Set on the root element while highlights are hidden.
pub const HIDDEN_CLASS: &str = "factlens-hide-highlights";

/// Owns one document and the markers it has put into it.
///
/// The marker list lives and dies with the document: `attach` starts empty, `detach`
/// clears before handing the document back. Markers the page already had are never touched.
#[derive(Debug)]
pub struct HighlightApplier {
    doc: Document,
    markers: Vec<u64>,
    next_serial: u64,
    visible: bool,
}

impl HighlightApplier {
    pub fn attach(doc: Document) -> Self {
        Self {
            doc,
            markers: Vec::new(),
            next_serial: 0,
            visible: true,
        }
    }

    pub fn detach(mut self) -> Document {
        self.clear();
        self.doc
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Serials of the live markers, in creation order.
    pub fn markers(&self) -> &[u64] {
        &self.markers
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    fn is_ours(&self, el: ElementRef<'_>) -> bool {
        el.value()
            .attr(MARKER_ATTR)
            .and_then(|s| s.parse::<u64>().ok())
            .is_some_and(|n| self.markers.contains(&n))
    }

    /// Unwrap every tracked marker back into plain text. Safe to call repeatedly.
    pub fn clear(&mut self) {
        if self.markers.is_empty() {
            return;
        }
        let selector = format!("{MARKER_TAG}[{MARKER_ATTR}]");
        let targets: Vec<_> = self
            .doc
            .select_all(&selector)
            .into_iter()
            .filter(|m| self.is_ours(*m))
            .map(|m| (m.id(), m.parent().map(|p| p.id()), text_content(m)))
            .collect();
        self.markers.clear();

        let tree = &mut self.doc.html.tree;
        let mut parents = Vec::new();
        for (id, parent, text) in targets {
            if let Some(mut mark) = tree.get_mut(id) {
                mark.insert_before(text_node(&text));
                mark.detach();
            }
            if let Some(p) = parent {
                if !parents.contains(&p) {
                    parents.push(p);
                }
            }
        }

        // Merge the text runs the unwrapping left behind.
        for p in parents {
            let kids: Vec<_> = match tree.get(p) {
                Some(n) => n.children().map(|c| c.id()).collect(),
                None => continue,
            };
            let mut run: Option<(_, String)> = None;
            for k in kids {
                let text = tree
                    .get(k)
                    .and_then(|n| n.value().as_text().map(|t| String::from(&**t)));
                match text {
                    Some(t) => {
                        let merged = match run.take() {
                            Some((head, mut acc)) => {
                                acc.push_str(&t);
                                if let Some(mut n) = tree.get_mut(k) {
                                    n.detach();
                                }
                                (head, acc)
                            }
                            None => (k, t),
                        };
                        run = Some(merged);
                    }
                    None => {
                        if let Some((head, acc)) = run.take() {
                            if let Some(mut n) = tree.get_mut(head) {
                                *n.value() = text_node(&acc);
                            }
                        }
                    }
                }
            }
            if let Some((head, acc)) = run {
                if let Some(mut n) = tree.get_mut(head) {
                    *n.value() = text_node(&acc);
                }
            }
        }
    }

    /// Clear, then wrap every occurrence of every highlight span. Returns markers created.
    ///
    /// Only non-blank text under `<body>` outside hidden subtrees is searched. Spans that
    /// do not occur verbatim in one text node are skipped.
    pub fn apply(&mut self, items: &[Highlight]) -> usize {
        self.clear();
        if items.is_empty() {
            return 0;
        }
        let mut nodes: Vec<_> = {
            let scope = self.doc.body().unwrap_or_else(|| self.doc.root());
            scope
                .descendants()
                .filter(|n| {
                    n.value()
                        .as_text()
                        .is_some_and(|t| t.chars().any(|c| !c.is_whitespace()))
                        && n
                            .parent()
                            .and_then(ElementRef::wrap)
                            .is_some_and(|p| !in_hidden_subtree(p))
                })
                .map(|n| n.id())
                .collect()
        };

        for item in items {
            let needle = item.span.trim();
            if needle.is_empty() {
                continue;
            }
            let title = escape_attr(&item.tooltip());
            let mut hits = 0usize;
            let mut next = Vec::with_capacity(nodes.len());

            for id in nodes {
                let tree = &mut self.doc.html.tree;
                let text = tree
                    .get(id)
                    .and_then(|n| n.value().as_text().map(|t| String::from(&**t)))
                    .unwrap_or_default();
                let ranges: Vec<(usize, usize)> = text
                    .match_indices(needle)
                    .map(|(i, m)| (i, i + m.len()))
                    .collect();
                if ranges.is_empty() {
                    next.push(id);
                    continue;
                }
                let Some(mut old) = tree.get_mut(id) else {
                    continue;
                };

                let mut cursor = 0usize;
                for (s, e) in ranges {
                    if s > cursor {
                        next.push(old.insert_before(text_node(&text[cursor..s])).id());
                    }
                    let serial = self.next_serial;
                    let markup = format!(
                        r#"<{MARKER_TAG} class="{MARKER_CLASS} {}" title="{title}" data-category="{}" {MARKER_ATTR}="{serial}"></{MARKER_TAG}>"#,
                        item.category.display_class(),
                        item.category.as_str(),
                    );
                    match element_from_markup(&markup, MARKER_TAG) {
                        Some(el) => {
                            let mut mark = old.insert_before(Node::Element(el));
                            mark.append(text_node(&text[s..e]));
                            self.next_serial += 1;
                            self.markers.push(serial);
                            hits += 1;
                        }
                        None => next.push(old.insert_before(text_node(&text[s..e])).id()),
                    }
                    cursor = e;
                }
                if cursor < text.len() {
                    next.push(old.insert_before(text_node(&text[cursor..])).id());
                }
                old.detach();
            }

            if hits == 0 {
                tracing::trace!(span = needle, "span not found in document; skipped");
            }
            nodes = next;
        }
        tracing::debug!(
            highlights = items.len(),
            markers = self.markers.len(),
            "highlights applied"
        );
        self.markers.len()
    }

    /// Presentation-only toggle on the root element; markers are untouched.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.doc.set_root_class(HIDDEN_CLASS, !visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::find_highlights;
    use factlens_core::Category;
    use proptest::prelude::*;

    const PAGE: &str = r#"<html><head><title>x</title></head><body>
        <article><p>This is shocking news. Truly shocking!</p>
        <p>Experts say it works.</p>
        <script>var s = "shocking";</script>
        <noscript>shocking</noscript></article></body></html>"#;

    fn hl(span: &str, category: Category) -> Highlight {
        Highlight {
            span: span.to_string(),
            start: 0,
            end: span.chars().count(),
            category,
            reason: category.default_reason().to_string(),
            explanation: "Needs citation or nuance.".to_string(),
        }
    }

    fn body_text(a: &HighlightApplier) -> String {
        text_content(a.document().body().unwrap())
    }

    #[test]
    fn wraps_every_visible_occurrence() {
        let mut a = HighlightApplier::attach(Document::parse(PAGE));
        let n = a.apply(&[hl("shocking", Category::Sensationalism)]);
        assert_eq!(n, 2);
        let html = a.document().to_html();
        assert_eq!(html.matches("<mark").count(), 2);
        assert!(html.contains("var s = \"shocking\""));
        assert!(html.contains("<noscript>shocking</noscript>"));
        assert!(html.contains("class=\"factlens-highlight factlens-yellow\""));
        assert!(html.contains("title=\"Likely sensational framing: Needs citation or nuance.\""));
        assert_eq!(a.markers(), &[0, 1]);
    }

    #[test]
    fn clear_restores_original_markup() {
        let before = Document::parse(PAGE);
        let before_html = before.to_html();
        let mut a = HighlightApplier::attach(before);
        a.apply(&[
            hl("shocking", Category::Sensationalism),
            hl("Experts say", Category::SourceAmbiguity),
            hl("not present", Category::ProvenFalse),
        ]);
        assert_eq!(a.marker_count(), 3);
        a.clear();
        assert_eq!(a.marker_count(), 0);
        assert_eq!(a.document().to_html(), before_html);
        a.clear();
        assert_eq!(a.document().to_html(), before_html);
    }

    #[test]
    fn reapply_replaces_previous_markers() {
        let mut a = HighlightApplier::attach(Document::parse(PAGE));
        a.apply(&[hl("shocking", Category::Sensationalism)]);
        a.apply(&[hl("Experts say", Category::SourceAmbiguity)]);
        let html = a.document().to_html();
        assert_eq!(html.matches("<mark").count(), 1);
        assert!(html.contains("data-category=\"source_ambiguity\""));
    }

    #[test]
    fn apply_empty_leaves_text_unchanged() {
        let mut a = HighlightApplier::attach(Document::parse(PAGE));
        let before = body_text(&a);
        a.apply(&[hl("shocking", Category::Sensationalism)]);
        a.clear();
        a.apply(&[]);
        assert_eq!(body_text(&a), before);
    }

    #[test]
    fn later_spans_do_not_rewrap_marked_text() {
        let mut a = HighlightApplier::attach(Document::parse("<body><p>miracle cure</p></body>"));
        let n = a.apply(&[
            hl("miracle cure", Category::Exaggeration),
            hl("miracle", Category::Exaggeration),
        ]);
        assert_eq!(n, 1);
    }

    #[test]
    fn category_controls_marker_class() {
        let mut a = HighlightApplier::attach(Document::parse("<body><p>a b c</p></body>"));
        a.apply(&[hl("a", Category::ProvenFalse), hl("c", Category::MissingEvidence)]);
        let html = a.document().to_html();
        assert!(html.contains("factlens-red"));
        assert!(html.contains("factlens-blue"));
    }

    #[test]
    fn toggle_only_touches_root_class() {
        let mut a = HighlightApplier::attach(Document::parse(PAGE));
        a.apply(&[hl("shocking", Category::Sensationalism)]);
        let marked = a.document().to_html();
        a.set_visible(false);
        assert!(a.document().has_root_class(HIDDEN_CLASS));
        assert!(!a.visible());
        assert_eq!(a.marker_count(), 2);
        a.set_visible(true);
        assert!(!a.document().has_root_class(HIDDEN_CLASS));
        assert!(a.visible());
        assert_eq!(a.document().to_html(), marked);
    }

    #[test]
    fn detach_returns_clean_document() {
        let before = Document::parse(PAGE).to_html();
        let mut a = HighlightApplier::attach(Document::parse(PAGE));
        a.apply(&find_highlights("This is shocking news. Experts say it works."));
        assert_eq!(a.detach().to_html(), before);
    }

    #[test]
    fn comments_and_noscript_markup_survive_a_highlight_cycle() {
        let page = r#"<html><body><!-- ad slot --><p>shocking news</p>
            <noscript><img src="/pixel.gif"></noscript></body></html>"#;
        let before = Document::parse(page).to_html();
        let mut a = HighlightApplier::attach(Document::parse(page));
        assert_eq!(a.apply(&[hl("shocking", Category::Sensationalism)]), 1);
        let marked = a.document().to_html();
        assert!(marked.contains("<!-- ad slot -->"));
        assert!(marked.contains(r#"<noscript><img src="/pixel.gif"></noscript>"#));
        assert_eq!(a.detach().to_html(), before);
    }

    #[test]
    fn clear_leaves_page_owned_marks_alone() {
        let page = "<body><p><mark>already marked</mark> shocking</p></body>";
        let mut a = HighlightApplier::attach(Document::parse(page));
        a.apply(&[hl("shocking", Category::Sensationalism)]);
        assert_eq!(a.document().to_html().matches("<mark").count(), 2);
        a.clear();
        let html = a.document().to_html();
        assert!(html.contains("<mark>already marked</mark> shocking"), "{html}");
    }

    #[test]
    fn tooltip_text_is_attribute_escaped() {
        let mut item = hl("a", Category::ProvenFalse);
        item.explanation = r#"says "b" & <c>"#.to_string();
        let mut a = HighlightApplier::attach(Document::parse("<body><p>a</p></body>"));
        a.apply(&[item]);
        let mark = a.document().select_first("mark").unwrap();
        assert_eq!(
            mark.value().attr("title"),
            Some(r#"Contradicted by established fact-checks: says "b" & <c>"#)
        );
    }

    proptest! {
        #[test]
        fn apply_then_clear_is_lossless(
            paras in prop::collection::vec("[a-z !%0-9]{0,60}", 1..6),
            spans in prop::collection::vec("[a-z ]{1,6}", 0..5),
        ) {
            let mut html = String::from("<html><body>");
            for p in &paras {
                html.push_str("<p>");
                html.push_str(p);
                html.push_str("</p>");
            }
            html.push_str("</body></html>");
            let doc = Document::parse(&html);
            let before_html = doc.to_html();
            let before_text = text_content(doc.root());

            let mut a = HighlightApplier::attach(doc);
            let items: Vec<Highlight> = spans.iter().map(|s| hl(s, Category::Exaggeration)).collect();
            a.apply(&items);
            prop_assert_eq!(text_content(a.document().root()), before_text.clone());
            a.clear();
            prop_assert_eq!(text_content(a.document().root()), before_text);
            prop_assert_eq!(a.document().to_html(), before_html);
        }
    }
}
