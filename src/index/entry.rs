use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::classify::{classify, ResourceKind};
use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::meta::DocumentMetadata;

static INVALID_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)[^a-z0-9_()]").unwrap());
static TOP_LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)/API/[^/]+$").unwrap());

const MANIFEST_SEGMENT: &str = "/manifest.json/";
const API_SEGMENT: &str = "/API/";

/// One row of the lookup index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub kind: ResourceKind,
    pub name: String,
    pub location: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Manifest,
    Api,
    Guide,
}

impl Category {
    fn of_slug(slug: &str) -> Self {
        if slug.contains(MANIFEST_SEGMENT) {
            Category::Manifest
        } else if slug.contains(API_SEGMENT) {
            Category::Api
        } else {
            Category::Guide
        }
    }
}

/// Everything the kind policy looks at, computed once per document.
struct Facts {
    category: Category,
    valid_name: bool,
    top_level: bool,
    tag_kinds: Vec<ResourceKind>,
    inferred: Option<ResourceKind>,
}

/// One step of the kind policy. Steps run in `KIND_POLICY` order and the
/// first that resolves decides the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    ManifestKey,
    NonApiPage,
    TopLevelNamespace,
    InvalidApiName,
    MethodTag,
    NameShape,
    FirstTag,
}

const KIND_POLICY: &[Step] = &[
    Step::ManifestKey,
    Step::NonApiPage,
    Step::TopLevelNamespace,
    Step::InvalidApiName,
    Step::MethodTag,
    Step::NameShape,
    Step::FirstTag,
];

impl Step {
    fn resolve(self, f: &Facts) -> Option<ResourceKind> {
        match self {
            Step::ManifestKey => {
                (f.category == Category::Manifest && f.valid_name).then_some(ResourceKind::Section)
            }
            Step::NonApiPage => (f.category != Category::Api).then_some(ResourceKind::Guide),
            Step::TopLevelNamespace => {
                (f.top_level && f.valid_name).then_some(ResourceKind::Namespace)
            }
            Step::InvalidApiName => (!f.valid_name).then_some(ResourceKind::Guide),
            Step::MethodTag => f
                .tag_kinds
                .contains(&ResourceKind::Method)
                .then_some(ResourceKind::Method),
            Step::NameShape => f.inferred,
            Step::FirstTag => f.tag_kinds.first().copied(),
        }
    }

    /// Steps where a declared tag and the name shape can disagree.
    fn weighs_tags(self) -> bool {
        matches!(self, Step::MethodTag | Step::NameShape)
    }
}

fn tag_kind(tag: &str) -> Option<ResourceKind> {
    match tag {
        "Property" => Some(ResourceKind::Property),
        "Method" => Some(ResourceKind::Method),
        "Type" => Some(ResourceKind::Type),
        "Event" => Some(ResourceKind::Event),
        "Constant" => Some(ResourceKind::Constant),
        _ => None,
    }
}

/// Dotted namespace encoded in the slug: the path between the last `/API/`
/// and the page itself.
pub fn slug_namespace(slug: &str) -> String {
    let rest = match slug.rfind(API_SEGMENT) {
        Some(i) => &slug[i + API_SEGMENT.len()..],
        None => slug,
    };
    let parts: Vec<&str> = rest.split('/').collect();
    parts[..parts.len().saturating_sub(1)].join(".")
}

/// Rewrite a source document path into its published location, replacing
/// everything up to the last locale segment with `{locale}/docs`.
pub fn docs_location(path: &str, locale: &str) -> String {
    let normalized = path.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').collect();
    match segments.iter().rposition(|s| s.eq_ignore_ascii_case(locale)) {
        Some(i) => {
            let mut out = vec![segments[i], "docs"];
            out.extend_from_slice(&segments[i + 1..]);
            out.join("/")
        }
        None => normalized,
    }
}

/// Methods always carry `()`, nothing else does.
pub fn normalize_name(kind: ResourceKind, name: &str) -> String {
    let bare = name.strip_suffix("()").unwrap_or(name);
    if kind == ResourceKind::Method {
        format!("{}()", bare)
    } else {
        bare.to_string()
    }
}

/// Build the index entry for one document, or `None` when title or slug
/// is missing. Every non-fatal oddity is recorded in `diags`.
pub fn build_entry(
    meta: &DocumentMetadata,
    path: &str,
    locale: &str,
    diags: &mut Diagnostics,
) -> Option<IndexEntry> {
    let (title, slug) = match (meta.title.as_deref(), meta.slug.as_deref()) {
        (Some(t), Some(s)) => (t, s),
        _ => {
            diags.push(
                DiagnosticKind::MissingMetadata,
                path,
                "can't add to the index, title or slug is missing",
            );
            return None;
        }
    };

    let (title_prefix, leaf) = match title.rsplit_once('.') {
        Some((prefix, leaf)) => (Some(prefix), leaf),
        None => (None, title),
    };
    let tag_kinds: Vec<ResourceKind> = meta.tags.iter().filter_map(|t| tag_kind(t)).collect();

    let facts = Facts {
        category: Category::of_slug(slug),
        valid_name: !INVALID_NAME_RE.is_match(leaf),
        top_level: TOP_LEVEL_RE.is_match(slug),
        inferred: classify(leaf),
        tag_kinds,
    };
    let namespace = slug_namespace(slug);

    if facts.tag_kinds.len() > 1 {
        let listed: Vec<&str> = facts.tag_kinds.iter().map(|k| k.as_str()).collect();
        diags.push(
            DiagnosticKind::AmbiguousTags,
            title,
            format!("ambiguous resource type: {}", listed.join(",")),
        );
    }
    if facts.category == Category::Manifest && title_prefix.is_some() {
        diags.push(DiagnosticKind::NestedManifestKey, title, "nested manifest key");
    }
    if facts.category == Category::Api
        && facts.valid_name
        && !facts.top_level
        && title_prefix.is_none()
    {
        diags.push(
            DiagnosticKind::MissingNamespace,
            title,
            format!("does not belong to any namespace, slug says \"{}\"", namespace),
        );
    }

    let resolved = KIND_POLICY
        .iter()
        .find_map(|step| step.resolve(&facts).map(|kind| (*step, kind)));
    let kind = match resolved {
        Some((step, kind)) => {
            if step.weighs_tags() {
                if let Some(inferred) = facts.inferred {
                    if !facts.tag_kinds.is_empty() && !facts.tag_kinds.contains(&inferred) {
                        diags.push(
                            DiagnosticKind::TagMismatch,
                            title,
                            format!("tags disagree with inferred type \"{}\", using \"{}\"", inferred, kind),
                        );
                    }
                }
            }
            kind
        }
        None => {
            diags.push(
                DiagnosticKind::Unclassifiable,
                title,
                "could not detect resource type, falling back to \"Object\"",
            );
            ResourceKind::Object
        }
    };

    // Guide titles are prose, not dotted identifiers.
    let name = if kind == ResourceKind::Guide {
        title.to_string()
    } else {
        normalize_name(kind, leaf)
    };
    let description = if kind.is_container() {
        String::new()
    } else {
        namespace
    };

    Some(IndexEntry {
        kind,
        name,
        location: docs_location(path, locale),
        description,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/tmp/content/files/en-us/mozilla/add-ons/webextensions/api/x/index.html";

    fn meta(title: &str, slug: &str, tags: &[&str]) -> DocumentMetadata {
        DocumentMetadata {
            title: Some(title.to_string()),
            slug: Some(slug.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn build(m: &DocumentMetadata) -> (IndexEntry, Diagnostics) {
        let mut diags = Diagnostics::new();
        let entry = build_entry(m, PATH, "en-us", &mut diags).unwrap();
        (entry, diags)
    }

    #[test]
    fn manifest_key_is_section() {
        let (e, _) = build(&meta(
            "background",
            "Mozilla/Add-ons/WebExtensions/manifest.json/background",
            &["Add-ons", "Extensions"],
        ));
        assert_eq!(e.kind, ResourceKind::Section);
        assert_eq!(e.name, "background");
        assert_eq!(e.description, "");
    }

    #[test]
    fn nested_manifest_key_is_diagnosed() {
        let (e, diags) = build(&meta(
            "search_provider.favicon_url",
            "Mozilla/Add-ons/WebExtensions/manifest.json/chrome_settings_overrides",
            &[],
        ));
        assert_eq!(e.kind, ResourceKind::Section);
        assert!(diags.has(DiagnosticKind::NestedManifestKey));
    }

    #[test]
    fn manifest_page_with_prose_title_is_guide() {
        let (e, _) = build(&meta(
            "Native manifests",
            "Mozilla/Add-ons/WebExtensions/manifest.json/native manifests",
            &[],
        ));
        assert_eq!(e.kind, ResourceKind::Guide);
        assert_eq!(e.name, "Native manifests");
    }

    #[test]
    fn top_level_api_folder_is_namespace() {
        let (e, _) = build(&meta("storage", "Mozilla/Add-ons/WebExtensions/API/storage", &["API"]));
        assert_eq!(e.kind, ResourceKind::Namespace);
        assert_eq!(e.name, "storage");
        assert_eq!(e.description, "");
    }

    #[test]
    fn non_api_page_is_guide() {
        let (e, _) = build(&meta(
            "Your first extension",
            "Mozilla/Add-ons/WebExtensions/Your_first_WebExtension",
            &["Guide"],
        ));
        assert_eq!(e.kind, ResourceKind::Guide);
        assert_eq!(e.description, "");
    }

    #[test]
    fn invalid_api_name_is_guide() {
        let (e, _) = build(&meta(
            "Chrome incompatibilities",
            "Mozilla/Add-ons/WebExtensions/API/Chrome_incompatibilities/details",
            &["Method"],
        ));
        assert_eq!(e.kind, ResourceKind::Guide);
    }

    #[test]
    fn method_tag_beats_name_shape() {
        let (e, diags) = build(&meta(
            "tabs.query",
            "Mozilla/Add-ons/WebExtensions/API/tabs/query",
            &["API", "Method"],
        ));
        assert_eq!(e.kind, ResourceKind::Method);
        assert_eq!(e.name, "query()");
        assert_eq!(e.description, "tabs");
        assert!(diags.has(DiagnosticKind::TagMismatch));
    }

    #[test]
    fn name_shape_beats_other_tags() {
        let (e, diags) = build(&meta(
            "runtime.onMessage",
            "Mozilla/Add-ons/WebExtensions/API/runtime/onMessage",
            &["Property"],
        ));
        assert_eq!(e.kind, ResourceKind::Event);
        assert!(diags.has(DiagnosticKind::TagMismatch));
    }

    #[test]
    fn first_tag_when_shape_unknown() {
        let (e, diags) = build(&meta(
            "menus.ACTION_MENU_TOP_LEVEL_limit",
            "Mozilla/Add-ons/WebExtensions/API/menus/ACTION_MENU_TOP_LEVEL_LIMIT",
            &["Constant", "Property"],
        ));
        assert_eq!(e.kind, ResourceKind::Constant);
        assert!(diags.has(DiagnosticKind::AmbiguousTags));
        assert!(!diags.has(DiagnosticKind::TagMismatch));
    }

    #[test]
    fn object_fallback() {
        let (e, diags) = build(&meta(
            "menus.Weird_Name",
            "Mozilla/Add-ons/WebExtensions/API/menus/Weird_Name",
            &["API"],
        ));
        assert_eq!(e.kind, ResourceKind::Object);
        assert!(diags.has(DiagnosticKind::Unclassifiable));
    }

    #[test]
    fn stray_parentheses_are_stripped_from_non_methods() {
        let (e, _) = build(&meta(
            "storage.StorageArea()",
            "Mozilla/Add-ons/WebExtensions/API/storage/StorageArea",
            &["Type"],
        ));
        // the call suffix makes it a method by shape
        assert_eq!(e.kind, ResourceKind::Method);
        assert_eq!(normalize_name(ResourceKind::Type, "StorageArea()"), "StorageArea");
    }

    #[test]
    fn description_comes_from_slug() {
        let (e, diags) = build(&meta(
            "get()",
            "Mozilla/Add-ons/WebExtensions/API/storage/StorageArea/get",
            &["Method"],
        ));
        assert_eq!(e.kind, ResourceKind::Method);
        assert_eq!(e.name, "get()");
        assert_eq!(e.description, "storage.StorageArea");
        assert!(diags.has(DiagnosticKind::MissingNamespace));
    }

    #[test]
    fn missing_slug_is_skipped() {
        let mut diags = Diagnostics::new();
        let m = DocumentMetadata {
            title: Some("tabs".into()),
            slug: None,
            tags: vec![],
        };
        assert_eq!(build_entry(&m, PATH, "en-us", &mut diags), None);
        assert!(diags.has(DiagnosticKind::MissingMetadata));
    }

    #[test]
    fn method_name_round_trip() {
        for name in ["get", "get()"] {
            assert_eq!(normalize_name(ResourceKind::Method, name), "get()");
            assert_eq!(normalize_name(ResourceKind::Property, name), "get");
        }
        let stored = normalize_name(ResourceKind::Method, "get");
        assert_eq!(
            normalize_name(ResourceKind::Method, &normalize_name(ResourceKind::Property, &stored)),
            stored
        );
    }

    #[test]
    fn location_is_rooted_at_locale() {
        assert_eq!(
            docs_location(PATH, "en-us"),
            "en-us/docs/mozilla/add-ons/webextensions/api/x/index.html"
        );
        assert_eq!(
            docs_location(r"C:\mdn\files\en-US\mozilla\index.html", "en-us"),
            "en-US/docs/mozilla/index.html"
        );
        assert_eq!(docs_location("elsewhere/index.html", "en-us"), "elsewhere/index.html");
    }

    #[test]
    fn slug_namespace_drops_page_segment() {
        assert_eq!(slug_namespace("Mozilla/Add-ons/WebExtensions/API/storage/local/get"), "storage.local");
        assert_eq!(slug_namespace("Mozilla/Add-ons/WebExtensions/API/storage"), "");
    }
}
