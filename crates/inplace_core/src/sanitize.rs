//! Allow-list markup sanitizer for the rich-text input.
//!
//! Markup is parsed as an HTML body fragment with html5ever, cleaned into a
//! small owned tree, and serialized back. Output re-parses to the same tree,
//! so sanitizing twice yields the same string.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_fragment, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::{BTreeMap, BTreeSet};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Attribute allow-list key that applies to every tag.
pub const ANY_TAG: &str = "*";

/// Elements dropped together with everything inside them.
const STRIPPED_WHOLESALE: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "noscript",
    "template", "link", "meta", "base", "title", "head", "html", "body", "svg", "math",
];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose first newline the parser swallows.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

/// Tags and attributes permitted to survive cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizerPolicy {
    pub allowed_tags: BTreeSet<String>,
    /// Tag name (or [`ANY_TAG`]) to permitted attribute names.
    pub allowed_attributes: BTreeMap<String, BTreeSet<String>>,
    /// Text length above which [`Cleaned::exceeds_limit`] is raised.
    pub max_text_length: Option<usize>,
}

impl Default for SanitizerPolicy {
    fn default() -> Self {
        let tags = [
            "p", "br", "b", "strong", "i", "em", "u", "s", "ul", "ol", "li", "a", "span", "div",
            "blockquote", "code", "pre", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
        ];
        let mut allowed_attributes = BTreeMap::new();
        allowed_attributes.insert(
            "a".to_string(),
            ["href", "title", "target", "rel"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        allowed_attributes.insert(
            ANY_TAG.to_string(),
            std::iter::once("class".to_string()).collect(),
        );
        Self {
            allowed_tags: tags.into_iter().map(String::from).collect(),
            allowed_attributes,
            max_text_length: Some(crate::constants::DEFAULT_MAX_RICH_TEXT_LENGTH),
        }
    }
}

impl SanitizerPolicy {
    /// Policy with no tags allowed: every element collapses to its text.
    pub fn text_only() -> Self {
        Self {
            allowed_tags: BTreeSet::new(),
            allowed_attributes: BTreeMap::new(),
            max_text_length: None,
        }
    }

    pub fn allow_tag(mut self, tag: &str) -> Self {
        self.allowed_tags.insert(tag.to_ascii_lowercase());
        self
    }

    pub fn allow_attribute(mut self, tag: &str, attribute: &str) -> Self {
        self.allowed_attributes
            .entry(tag.to_ascii_lowercase())
            .or_default()
            .insert(attribute.to_ascii_lowercase());
        self
    }

    fn attribute_allowed(&self, tag: &str, attribute: &str) -> bool {
        [tag, ANY_TAG].iter().any(|key| {
            self.allowed_attributes
                .get(*key)
                .map(|names| names.contains(attribute))
                .unwrap_or(false)
        })
    }
}

/// Result of a cleaning pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cleaned {
    pub markup: String,
    /// Character count of the text that survived.
    pub text_len: usize,
    /// The policy's maximum text length was exceeded. The markup is not
    /// truncated.
    pub exceeds_limit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CleanNode {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<CleanNode>,
    },
    Text(String),
}

/// Markup cleaner bound to one [`SanitizerPolicy`].
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    policy: SanitizerPolicy,
}

impl Sanitizer {
    pub fn new(policy: SanitizerPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SanitizerPolicy {
        &self.policy
    }

    /// Clean `raw` and return only the markup.
    pub fn sanitize(&self, raw: &str) -> String {
        self.clean(raw).markup
    }

    /// Clean `raw` against the policy.
    ///
    /// Input that does not yield a fragment root is treated as plain text and
    /// escaped.
    ///
    /// # Returns
    /// The cleaned markup plus length bookkeeping.
    pub fn clean(&self, raw: &str) -> Cleaned {
        let dom = parse_fragment_dom(raw);
        let (markup, text_len) = match fragment_root(&dom) {
            Some(root) => {
                let mut nodes = Vec::new();
                self.clean_children(&root, &mut nodes);
                let mut markup = String::with_capacity(raw.len());
                serialize_nodes(&nodes, &mut markup);
                (markup, text_length(&nodes))
            }
            None => {
                tracing::warn!("Markup could not be parsed; falling back to escaped text");
                (escape_text(raw), raw.chars().count())
            }
        };

        let exceeds_limit = self
            .policy
            .max_text_length
            .map(|limit| text_len > limit)
            .unwrap_or(false);
        if exceeds_limit {
            tracing::warn!(
                "Sanitized text is {} characters, above the configured maximum of {:?}",
                text_len,
                self.policy.max_text_length
            );
        }

        Cleaned {
            markup,
            text_len,
            exceeds_limit,
        }
    }

    fn clean_children(&self, handle: &Handle, out: &mut Vec<CleanNode>) {
        for child in handle.children.borrow().iter() {
            self.clean_node(child, out);
        }
    }

    fn clean_node(&self, handle: &Handle, out: &mut Vec<CleanNode>) {
        match handle.data {
            NodeData::Text { ref contents } => {
                let borrowed = contents.borrow();
                let text: &str = &borrowed;
                push_text(out, text);
            }
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                let local: &str = &name.local;
                let tag = local.to_ascii_lowercase();
                if STRIPPED_WHOLESALE.contains(&tag.as_str()) {
                    return;
                }
                let namespace: &str = &name.ns;
                if namespace != HTML_NAMESPACE || !self.policy.allowed_tags.contains(&tag) {
                    let mut text = String::new();
                    collect_visible_text(handle, &mut text);
                    push_text(out, &text);
                    return;
                }

                let attributes = attrs
                    .borrow()
                    .iter()
                    .filter_map(|attr| {
                        let attr_ns: &str = &attr.name.ns;
                        if !attr_ns.is_empty() {
                            return None;
                        }
                        let attr_local: &str = &attr.name.local;
                        let attr_name = attr_local.to_ascii_lowercase();
                        let value: &str = &attr.value;
                        self.keep_attribute(&tag, &attr_name, value)
                            .then(|| (attr_name, value.to_string()))
                    })
                    .collect();

                let mut children = Vec::new();
                if !VOID_ELEMENTS.contains(&tag.as_str()) {
                    self.clean_children(handle, &mut children);
                }
                out.push(CleanNode::Element {
                    tag,
                    attributes,
                    children,
                });
            }
            _ => {}
        }
    }

    fn keep_attribute(&self, tag: &str, name: &str, value: &str) -> bool {
        if name.starts_with("on") {
            return false;
        }
        if !self.policy.attribute_allowed(tag, name) {
            return false;
        }
        !has_script_scheme(value)
    }
}

fn parse_fragment_dom(raw: &str) -> RcDom {
    let context = QualName::new(
        None,
        Namespace::from(HTML_NAMESPACE),
        LocalName::from("body"),
    );
    parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new()).one(raw)
}

/// The `<html>` element the fragment parser puts its output under.
///
/// The handle is only usable while `dom` is alive: dropping an `RcDom`
/// detaches the children of every node it owns.
fn fragment_root(dom: &RcDom) -> Option<Handle> {
    let children = dom.document.children.borrow();
    let root = children
        .iter()
        .find(|child| match child.data {
            NodeData::Element { ref name, .. } => {
                let local: &str = &name.local;
                local == "html"
            }
            _ => false,
        })
        .cloned();
    root
}

fn push_text(out: &mut Vec<CleanNode>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(CleanNode::Text(previous)) = out.last_mut() {
        previous.push_str(text);
        return;
    }
    out.push(CleanNode::Text(text.to_string()));
}

fn collect_visible_text(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        match child.data {
            NodeData::Text { ref contents } => {
                let borrowed = contents.borrow();
                let text: &str = &borrowed;
                out.push_str(text);
            }
            NodeData::Element { ref name, .. } => {
                let local: &str = &name.local;
                if !STRIPPED_WHOLESALE.contains(&local.to_ascii_lowercase().as_str()) {
                    collect_visible_text(child, out);
                }
            }
            _ => {}
        }
    }
}

fn has_script_scheme(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    normalized.starts_with("javascript:")
        || normalized.starts_with("vbscript:")
        || normalized.starts_with("data:text/html")
}

fn text_length(nodes: &[CleanNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            CleanNode::Text(text) => text.chars().count(),
            CleanNode::Element { children, .. } => text_length(children),
        })
        .sum()
}

fn serialize_nodes(nodes: &[CleanNode], out: &mut String) {
    for node in nodes {
        match node {
            CleanNode::Text(text) => out.push_str(&escape_text(text)),
            CleanNode::Element {
                tag,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    continue;
                }
                if LEADING_NEWLINE_ELEMENTS.contains(&tag.as_str()) {
                    if let Some(CleanNode::Text(text)) = children.first() {
                        if text.starts_with('\n') {
                            out.push('\n');
                        }
                    }
                }
                serialize_nodes(children, out);
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

/// Escape text for inclusion in markup.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Visible text of a markup fragment (scripts and styles excluded).
pub fn markup_text(markup: &str) -> String {
    let mut out = String::new();
    let dom = parse_fragment_dom(markup);
    if let Some(root) = fragment_root(&dom) {
        collect_visible_text(&root, &mut out);
    } else {
        out.push_str(markup);
    }
    out
}
