use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::{debug, error};

use super::dom::{Document, NodeId};
use crate::error::Error;

pub const INDEX_FILE: &str = "index.html";
pub const EXTERNAL_CLASS: &str = "external";

const IMAGE_BACKGROUND: &str = "background-color: white";
const CSS_STATIC_PREFIX: &str = "url(/static/";
const CSS_PARENT_PREFIX: &str = "url(../";

/// Counts for one rewritten page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteReport {
    pub relative: usize,
    pub external: usize,
    pub skipped: usize,
}

/// Stylesheets referenced by processed pages, patched once after the batch.
#[derive(Debug, Default)]
pub struct StylesheetFixups {
    paths: BTreeSet<PathBuf>,
}

impl StylesheetFixups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Patch every recorded stylesheet once. Returns how many files changed;
    /// files that can't be read or written are logged and skipped.
    pub fn apply(&self) -> usize {
        let mut patched = 0;
        for path in &self.paths {
            match patch_css_file(path) {
                Ok(true) => patched += 1,
                Ok(false) => debug!("{}: no static urls to patch", path.display()),
                Err(e) => error!("{}", e),
            }
        }
        patched
    }
}

/// Root-relative static asset urls become parent-relative.
pub fn patch_css(css: &str) -> Cow<'_, str> {
    if css.contains(CSS_STATIC_PREFIX) {
        Cow::Owned(css.replace(CSS_STATIC_PREFIX, CSS_PARENT_PREFIX))
    } else {
        Cow::Borrowed(css)
    }
}

fn patch_css_file(path: &Path) -> Result<bool, Error> {
    let css = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    match patch_css(&css) {
        Cow::Owned(fixed) => {
            std::fs::write(path, fixed).map_err(|e| Error::io(path, e))?;
            Ok(true)
        }
        Cow::Borrowed(_) => Ok(false),
    }
}

/// A root-absolute reference that exists under the documents root.
struct Target {
    /// Url segments to emit, relative to the root.
    segments: Vec<String>,
    fs_path: PathBuf,
    is_dir: bool,
}

/// Split `/a/b?q#f` into (`/a/b`, `?q#f`).
fn split_suffix(value: &str) -> (&str, &str) {
    match value.find(['?', '#']) {
        Some(i) => value.split_at(i),
        None => (value, ""),
    }
}

/// Url path segments with `.` and `..` resolved lexically.
fn url_segments(path: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s.to_string()),
        }
    }
    out
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn locate(root: &Path, segments: Vec<String>) -> Option<Target> {
    let fs_path = segments.iter().fold(root.to_path_buf(), |p, s| p.join(decode(s)));
    let meta = std::fs::metadata(&fs_path).ok()?;
    Some(Target {
        segments,
        fs_path,
        is_dir: meta.is_dir(),
    })
}

/// Relative url from the directory `from` to `to`, both given as segments
/// below the same root.
fn relative_url(from: &[String], to: &[String]) -> String {
    let common = from
        .iter()
        .zip(to)
        .take_while(|(a, b)| **a == decode(b))
        .count();
    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(to[common..].iter().map(String::as_str));
    parts.join("/")
}

fn join_url(base: &str, tail: &str) -> String {
    if base.is_empty() {
        tail.to_string()
    } else {
        format!("{}/{}", base, tail)
    }
}

fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn with_background(style: Option<&str>) -> Option<String> {
    let style = style.map(str::trim).unwrap_or("");
    if style.contains(IMAGE_BACKGROUND) {
        return None;
    }
    Some(if style.is_empty() {
        IMAGE_BACKGROUND.to_string()
    } else if style.ends_with(';') {
        format!("{} {}", style, IMAGE_BACKGROUND)
    } else {
        format!("{}; {}", style, IMAGE_BACKGROUND)
    })
}

/// Rewrites root-absolute references of rendered pages below one
/// documents root.
pub struct LinkRewriter {
    root: PathBuf,
    origin: String,
}

impl LinkRewriter {
    pub fn new(root: impl Into<PathBuf>, origin: &str) -> Self {
        LinkRewriter {
            root: root.into(),
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// Directory of `page` as segments below the root. Pages are always
    /// addressed from their directory, `index.html` included.
    fn page_dir(&self, page: &Path) -> Result<Vec<String>, Error> {
        let dir = page.parent().unwrap_or(Path::new(""));
        if let Ok(rel) = dir.strip_prefix(&self.root) {
            return Ok(path_segments(rel));
        }
        let root = self.root.canonicalize().map_err(|e| Error::io(&self.root, e))?;
        let dir = dir.canonicalize().map_err(|e| Error::io(dir, e))?;
        dir.strip_prefix(&root)
            .map(path_segments)
            .map_err(|_| Error::OutsideRoot { path: page.to_path_buf() })
    }

    /// Find the target of a root-absolute path, falling back to its
    /// lower-cased form (rendered folders are lower-case, links keep the
    /// slug's case).
    fn resolve(&self, path: &str) -> Option<Target> {
        let segments = url_segments(path);
        let lowered: Vec<String> = segments.iter().map(|s| s.to_lowercase()).collect();
        let differs = lowered != segments;
        locate(&self.root, segments).or_else(|| {
            if differs {
                locate(&self.root, lowered)
            } else {
                None
            }
        })
    }

    pub fn rewrite(
        &self,
        doc: &mut Document,
        page: &Path,
        fixups: &mut StylesheetFixups,
    ) -> Result<RewriteReport, Error> {
        let from = self.page_dir(page)?;
        let mut report = RewriteReport::default();

        for id in doc.elements() {
            for attr in ["href", "src"] {
                self.rewrite_attr(doc, id, attr, &from, fixups, &mut report);
            }
        }
        Ok(report)
    }

    fn rewrite_attr(
        &self,
        doc: &mut Document,
        id: NodeId,
        attr: &str,
        from: &[String],
        fixups: &mut StylesheetFixups,
        report: &mut RewriteReport,
    ) {
        let Some(el) = doc.element_mut(id) else { return };
        let value = match el.attr(attr) {
            Some(v) if v.starts_with('/') && !v.starts_with("//") => v.to_string(),
            _ => return,
        };
        let rel_tokens: Vec<String> = el
            .attr("rel")
            .unwrap_or("")
            .split_ascii_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        let is_link = el.name() == "link";
        if is_link && rel_tokens.iter().any(|r| r == "preload") {
            report.skipped += 1;
            return;
        }

        let (path, suffix) = split_suffix(&value);
        let Some(target) = self.resolve(path) else {
            el.set_attr(attr, format!("{}{}", self.origin, value));
            if el.name() == "a" {
                el.add_class(EXTERNAL_CLASS);
            }
            report.external += 1;
            return;
        };

        let relative = relative_url(from, &target.segments);
        let new_value = match el.name() {
            "a" if target.is_dir => format!("{}{}", join_url(&relative, INDEX_FILE), suffix),
            _ if relative.is_empty() => format!(".{}", suffix),
            _ => format!("{}{}", relative, suffix),
        };
        if is_link && rel_tokens.iter().any(|r| r == "stylesheet") && fixups.record(target.fs_path) {
            debug!(stylesheet = %new_value, "queued for patching");
        }
        if el.name() == "img" {
            if let Some(style) = with_background(el.attr("style")) {
                el.set_attr("style", style);
            }
        }
        el.set_attr(attr, new_value);
        report.relative += 1;
    }
}

// ── Tests ──
