use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Title or slug absent; the document produces no entry.
    MissingMetadata,
    /// Front matter present but not valid YAML.
    MalformedMetadata,
    /// More than one recognized kind tag.
    AmbiguousTags,
    /// Kind inferred from the name disagrees with the declared tags.
    TagMismatch,
    /// Nothing yielded a kind; entry falls back to `Object`.
    Unclassifiable,
    /// Manifest key page whose title is dotted.
    NestedManifestKey,
    /// API member whose title lacks a namespace prefix.
    MissingNamespace,
    /// Document could not be read.
    FileAccess,
}

impl DiagnosticKind {
    fn severity(self) -> Severity {
        match self {
            DiagnosticKind::MissingNamespace => Severity::Info,
            DiagnosticKind::FileAccess => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: String,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} \"{}\": {}", self.kind, self.subject, self.message)
    }
}

/// Append-only collection of diagnostics produced during one indexing pass.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) {
        self.items.push(Diagnostic {
            kind,
            subject: subject.into(),
            severity: kind.severity(),
            message: message.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }

    /// Render every diagnostic through `tracing` at its severity.
    pub fn emit(&self) {
        for d in &self.items {
            match d.severity {
                Severity::Info => info!(kind = ?d.kind, subject = %d.subject, "{}", d.message),
                Severity::Warning => warn!(kind = ?d.kind, subject = %d.subject, "{}", d.message),
                Severity::Error => error!(kind = ?d.kind, subject = %d.subject, "{}", d.message),
            }
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_kind() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());
        diags.push(DiagnosticKind::FileAccess, "a.html", "gone");
        diags.push(DiagnosticKind::AmbiguousTags, "tabs.query()", "Method,Property");
        diags.push(DiagnosticKind::MissingNamespace, "get()", "storage.local");

        let severities: Vec<_> = diags.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Warning, Severity::Info]);
        assert_eq!(diags.count(DiagnosticKind::AmbiguousTags), 1);
        assert!(!diags.has(DiagnosticKind::Unclassifiable));
        assert!(!diags.is_empty());
    }
}
