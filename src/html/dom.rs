//! Tolerant HTML tree over `quick-xml` events.
//!
//! Untouched nodes keep their exact source text, so a parse/serialize cycle
//! reproduces the input byte for byte. Only elements whose attributes were
//! changed get their start tag regenerated.

use std::borrow::Cow;

use quick_xml::escape::{escape, resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub type NodeId = usize;

const ROOT: NodeId = 0;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Bodies of these are not markup and are kept as a single text node.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    raw_start: String,
    end_tag: Option<String>,
    self_closing: bool,
    dirty: bool,
}

impl Element {
    fn from_start(e: &BytesStart, raw_start: &str, self_closing: bool) -> Self {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
        let mut attrs = Vec::new();
        for attr in e.html_attributes() {
            let Ok(attr) = attr else { break };
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = decode(&String::from_utf8_lossy(&attr.value));
            attrs.push((key, value));
        }
        Element {
            name,
            attrs,
            raw_start: raw_start.to_string(),
            end_tag: None,
            self_closing,
            dirty: false,
        }
    }

    /// A fresh element for markup built in code.
    pub fn new(name: &str, attrs: &[(&str, &str)]) -> Self {
        Element {
            name: name.to_string(),
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            raw_start: String::new(),
            end_tag: Some(format!("</{}>", name)),
            self_closing: false,
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((key.to_string(), value)),
        }
        self.dirty = true;
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", classes);
    }

    fn write_start(&self, out: &mut String) {
        if !self.dirty {
            out.push_str(&self.raw_start);
            return;
        }
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v.as_str()));
            out.push('"');
        }
        out.push_str(if self.self_closing { "/>" } else { ">" });
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(Element),
    /// Character data exactly as written (entities still escaped).
    Text(String),
    /// Comments, doctype, declarations, stray end tags: written back verbatim.
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

fn decode(raw: &str) -> String {
    unescape_with(raw, resolve_html5_entity)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

fn html_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    reader
}

/// Byte offset of the `</name` that closes a raw-text element body.
fn find_close_tag(body: &str, name: &str) -> Option<usize> {
    let lower = body.to_ascii_lowercase();
    let needle = format!("</{}", name);
    let mut from = 0;
    while let Some(i) = lower[from..].find(&needle) {
        let at = from + i;
        let next = lower.as_bytes().get(at + needle.len()).copied();
        if matches!(next, None | Some(b'>') | Some(b'/') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

impl Document {
    fn empty() -> Self {
        Document {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn parse(html: &str) -> Result<Self, quick_xml::Error> {
        let mut doc = Document::empty();
        let mut stack: Vec<NodeId> = vec![ROOT];
        let mut offset = 0usize;
        let mut reader = html_reader(html);

        loop {
            let start = offset + reader.buffer_position() as usize;
            let event = reader.read_event()?;
            let end = offset + reader.buffer_position() as usize;
            let raw = &html[start..end];
            let parent = stack.last().copied().unwrap_or(ROOT);

            match event {
                Event::Start(e) => {
                    let el = Element::from_start(&e, raw, false);
                    let name = el.name.clone();
                    let id = doc.append(parent, NodeData::Element(el));
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        continue;
                    }
                    if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                        let body = &html[end..];
                        let close = find_close_tag(body, &name).map_or(html.len(), |i| end + i);
                        if close > end {
                            doc.append(id, NodeData::Text(html[end..close].to_string()));
                        }
                        let close_end = html[close..].find('>').map_or(html.len(), |i| close + i + 1);
                        if close < close_end {
                            doc.set_end_tag(id, &html[close..close_end]);
                        }
                        offset = close_end;
                        reader = html_reader(&html[close_end..]);
                        continue;
                    }
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let el = Element::from_start(&e, raw, true);
                    doc.append(parent, NodeData::Element(el));
                }
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    let open = stack
                        .iter()
                        .rposition(|&id| doc.element(id).is_some_and(|el| el.name == name));
                    match open {
                        // anything above it was closed implicitly
                        Some(pos) if pos > 0 => {
                            doc.set_end_tag(stack[pos], raw);
                            stack.truncate(pos);
                        }
                        _ => {
                            doc.append(parent, NodeData::Raw(raw.to_string()));
                        }
                    }
                }
                Event::Text(_) => {
                    doc.append(parent, NodeData::Text(raw.to_string()));
                }
                Event::Eof => break,
                _ => {
                    doc.append(parent, NodeData::Raw(raw.to_string()));
                }
            }
        }
        Ok(doc)
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn set_end_tag(&mut self, id: NodeId, raw: &str) {
        if let Some(el) = self.element_mut(id) {
            el.end_tag = Some(raw.to_string());
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id)?.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_named(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|el| el.name == name)
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = pending.pop() {
            out.push(next);
            pending.extend(self.nodes[next].children.iter().rev());
        }
        out
    }

    /// All elements in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(ROOT)
            .into_iter()
            .filter(|&id| self.element(id).is_some())
            .collect()
    }

    /// Decoded text of all text nodes below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        for n in self.descendants(id) {
            if let NodeData::Text(raw) = &self.nodes[n].data {
                text.push_str(&decode(raw));
            }
        }
        text
    }

    /// Next sibling that is an element, skipping text and comments.
    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let siblings = &self.nodes[parent].children;
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings[pos + 1..]
            .iter()
            .copied()
            .find(|&s| self.element(s).is_some())
    }

    /// Whether an element named `name` sits between `id` and `stop`
    /// (both exclusive) on the ancestor chain.
    pub fn has_ancestor_before(&self, id: NodeId, name: &str, stop: NodeId) -> bool {
        let mut cur = self.nodes[id].parent;
        while let Some(p) = cur {
            if p == stop {
                return false;
            }
            if self.is_named(p, name) {
                return true;
            }
            cur = self.nodes[p].parent;
        }
        false
    }

    /// Insert a new node right before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, data: NodeData) -> NodeId {
        let parent = self.nodes[sibling].parent.unwrap_or(ROOT);
        let id = self.nodes.len();
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        let children = &mut self.nodes[parent].children;
        let pos = children
            .iter()
            .position(|&c| c == sibling)
            .unwrap_or(children.len());
        children.insert(pos, id);
        id
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write_node(ROOT, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id];
        match &node.data {
            NodeData::Document => self.write_children(node, out),
            NodeData::Element(el) => {
                el.write_start(out);
                self.write_children(node, out);
                if let Some(end) = &el.end_tag {
                    out.push_str(end);
                }
            }
            NodeData::Text(s) | NodeData::Raw(s) => out.push_str(s),
        }
    }

    fn write_children(&self, node: &Node, out: &mut String) {
        for &child in &node.children {
            self.write_node(child, out);
        }
    }
}

// ── Tests ──
