//! The page document: a parsed `scraper::Html` that the content script reads, marks and
//! serializes back out.
//!
//! Parsing runs with scripting disabled, so `<noscript>` bodies arrive as raw text. `parse`
//! re-parses them into element children so they serialize back as markup.

use crate::textprep::norm_ws;
use html_scraper::node::Text;
use html_scraper::{CaseSensitivity, ElementRef, Html, Node, Selector};

/// Subtrees whose text is never shown to the reader.
pub const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        let mut doc = Self {
            html: Html::parse_document(html),
        };
        doc.expand_noscript();
        doc
    }

    fn expand_noscript(&mut self) {
        let Ok(sel) = Selector::parse("noscript") else {
            return;
        };
        let targets: Vec<_> = self
            .html
            .select(&sel)
            .map(|el| (el.id(), el.text().collect::<String>()))
            .collect();
        for (id, raw) in targets {
            let kids: Vec<_> = self
                .html
                .tree
                .get(id)
                .map(|n| n.children().map(|c| c.id()).collect())
                .unwrap_or_default();
            for k in kids {
                if let Some(mut n) = self.html.tree.get_mut(k) {
                    n.detach();
                }
            }

            let frag = Html::parse_fragment(&raw);
            let mut stack = vec![(frag.root_element().id(), id)];
            while let Some((from, to)) = stack.pop() {
                let Some(src) = frag.tree.get(from) else {
                    continue;
                };
                for child in src.children() {
                    let Some(mut dst) = self.html.tree.get_mut(to) else {
                        break;
                    };
                    let copied = dst.append(child.value().clone()).id();
                    stack.push((child.id(), copied));
                }
            }
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// The `<html>` element.
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.select_first("body")
    }

    /// First element matching `selector`; `None` for no match or an invalid selector.
    pub fn select_first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(selector).ok()?;
        self.html.select(&sel).next()
    }

    pub fn select_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.html.select(&sel).collect()
    }

    pub fn first_text(&self, selector: &str) -> Option<String> {
        let t = norm_ws(&text_content(self.select_first(selector)?));
        (!t.is_empty()).then_some(t)
    }

    pub fn first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let el = self.select_first(selector)?;
        let v = el.value().attr(attr)?.trim();
        (!v.is_empty()).then(|| v.to_string())
    }

    pub fn has_root_class(&self, class: &str) -> bool {
        self.root()
            .value()
            .has_class(class, CaseSensitivity::CaseSensitive)
    }

    /// Add or remove one class on the `<html>` element, keeping its other attributes.
    pub fn set_root_class(&mut self, class: &str, on: bool) {
        if self.has_root_class(class) == on {
            return;
        }
        let root = self.root();
        let mut classes: Vec<&str> = root.value().classes().filter(|c| *c != class).collect();
        if on {
            classes.push(class);
        }
        let mut markup = String::from("<span");
        for (k, v) in root.value().attrs() {
            if k != "class" {
                markup.push_str(&format!(" {k}=\"{}\"", escape_attr(v)));
            }
        }
        if !classes.is_empty() {
            markup.push_str(&format!(" class=\"{}\"", escape_attr(&classes.join(" "))));
        }
        markup.push_str("></span>");

        let Some(mut el) = element_from_markup(&markup, "span") else {
            return;
        };
        el.name = root.value().name.clone();
        let id = root.id();
        if let Some(mut n) = self.html.tree.get_mut(id) {
            *n.value() = Node::Element(el);
        }
    }
}

/// Parse `markup` as a fragment and return a detached copy of its first `tag` element.
pub(crate) fn element_from_markup(markup: &str, tag: &str) -> Option<html_scraper::node::Element> {
    let frag = Html::parse_fragment(markup);
    let sel = Selector::parse(tag).ok()?;
    let el = frag.select(&sel).next()?;
    Some(el.value().clone())
}

pub(crate) fn text_node(s: &str) -> Node {
    Node::Text(Text { text: s.into() })
}

pub(crate) fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Concatenated text of every descendant text node (DOM `textContent`).
pub fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Reader-visible text: hidden subtrees skipped, block elements on their own lines,
/// whitespace collapsed within each line.
pub fn inner_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_visible(el, &mut raw);
    raw.lines()
        .map(norm_ws)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_visible(el: ElementRef<'_>, out: &mut String) {
    let tag = el.value().name();
    if HIDDEN_TAGS.contains(&tag) {
        return;
    }
    let block = BLOCK_TAGS.contains(&tag);
    if block {
        out.push('\n');
    }
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(_) => {
                if let Some(c) = ElementRef::wrap(child) {
                    collect_visible(c, out);
                }
            }
            _ => {}
        }
    }
    if block {
        out.push('\n');
    }
}

/// True when `el` is, or sits inside, a script/style/noscript/template element.
pub fn in_hidden_subtree(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .any(|a| HIDDEN_TAGS.contains(&a.value().name()))
}
