use std::path::Path;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::dom::{Document, Element, NodeData, NodeId};
use crate::index::classify::{classify, leaf_name, ResourceKind};

/// Characters `encodeURIComponent` leaves alone.
const ANCHOR_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const HEADINGS: &[&str] = &["h1", "h2", "h3"];
const SKIPPED_HEADING: &str = "legend";
const ANCHOR_CLASS: &str = "dashAnchor";

/// Section headings whose following block lists API members.
const SECTION_KINDS: &[(&str, ResourceKind)] = &[
    ("properties", ResourceKind::Property),
    ("methods", ResourceKind::Method),
    ("types", ResourceKind::Type),
    ("events", ResourceKind::Event),
    ("event handlers", ResourceKind::Event),
    ("interfaces", ResourceKind::Type),
    ("functions", ResourceKind::Method),
    ("constants", ResourceKind::Constant),
    ("javascript api listing", ResourceKind::Namespace),
    ("parameters", ResourceKind::Parameter),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocAnchor {
    pub kind: ResourceKind,
    pub name: String,
    pub anchor_id: String,
}

impl TocAnchor {
    pub fn new(kind: ResourceKind, name: &str) -> Self {
        TocAnchor {
            kind,
            name: name.to_string(),
            anchor_id: utf8_percent_encode(name, ANCHOR_ENCODE).to_string(),
        }
    }

    pub fn apple_ref(&self) -> String {
        format!("//apple_ref/cpp/{}/{}", self.kind, self.anchor_id)
    }

    fn to_element(&self) -> Element {
        let name = self.apple_ref();
        Element::new("a", &[("name", name.as_str()), ("class", ANCHOR_CLASS)])
    }
}

fn section_kind(heading: &str) -> Option<ResourceKind> {
    let wanted = heading.to_lowercase();
    SECTION_KINDS
        .iter()
        .find(|(title, _)| *title == wanted)
        .map(|(_, kind)| *kind)
}

/// API and manifest key pages list members below their section headings.
/// Only the part of `page` below `documents_root` is looked at.
fn lists_members(page: &Path, documents_root: &Path) -> bool {
    let page = page.strip_prefix(documents_root).unwrap_or(page);
    page.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        s.eq_ignore_ascii_case("api") || s.eq_ignore_ascii_case("manifest.json")
    })
}

/// Definition terms of `block` that aren't nested inside a description.
fn member_terms(doc: &Document, block: NodeId) -> Vec<NodeId> {
    let mut terms: Vec<NodeId> = doc
        .descendants(block)
        .into_iter()
        .filter(|&id| doc.is_named(id, "dt") && !doc.has_ancestor_before(id, "dd", block))
        .collect();
    if doc.is_named(block, "dt") {
        terms.insert(0, block);
    }
    terms
}

/// Constants are often listed under "Properties"; the name shape wins.
fn member_kind(section: ResourceKind, name: &str) -> ResourceKind {
    match classify(name) {
        Some(ResourceKind::Constant) => ResourceKind::Constant,
        _ => section,
    }
}

fn insert_anchor(doc: &mut Document, before: NodeId, anchor: TocAnchor, out: &mut Vec<TocAnchor>) {
    doc.insert_before(before, NodeData::Element(anchor.to_element()));
    out.push(anchor);
}

/// Insert table-of-contents anchors into a rendered page and return them in
/// insertion order.
pub fn build_toc(doc: &mut Document, page: &Path, documents_root: &Path) -> Vec<TocAnchor> {
    let members = lists_members(page, documents_root);
    let headings: Vec<NodeId> = doc
        .elements()
        .into_iter()
        .filter(|&id| HEADINGS.iter().any(|h| doc.is_named(id, h)))
        .collect();

    let mut anchors = Vec::new();
    for heading in headings {
        let text = doc.text_content(heading);
        let title = text.trim();
        if title.is_empty() || title.eq_ignore_ascii_case(SKIPPED_HEADING) {
            continue;
        }
        let section = section_kind(title);
        insert_anchor(doc, heading, TocAnchor::new(ResourceKind::Section, title), &mut anchors);

        let (true, Some(section)) = (members, section) else { continue };
        let Some(block) = doc.next_element_sibling(heading) else { continue };
        for term in member_terms(doc, block) {
            let text = doc.text_content(term);
            let name = leaf_name(text.trim()).trim();
            if name.is_empty() {
                continue;
            }
            let anchor = TocAnchor::new(member_kind(section, name), name);
            insert_anchor(doc, term, anchor, &mut anchors);
        }
    }
    anchors
}

// ── Tests ──
