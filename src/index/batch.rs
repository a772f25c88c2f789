use std::path::Path;

use tracing::debug;

use super::diagnostics::{DiagnosticKind, Diagnostics};
use super::entry::{build_entry, IndexEntry};
use super::meta;
use crate::error::Error;

/// Index one document file. `None` when the file can't be read or lacks
/// the metadata an entry needs; the reason lands in `diags`.
pub fn index_document(path: &Path, locale: &str, diags: &mut Diagnostics) -> Option<IndexEntry> {
    let shown = path.to_string_lossy();
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) => {
            diags.push(DiagnosticKind::FileAccess, shown.as_ref(), format!("can't read document: {}", e));
            return None;
        }
    };

    let metadata = match meta::extract(&body) {
        Ok(m) => m,
        Err(e) => {
            diags.push(DiagnosticKind::MalformedMetadata, shown.as_ref(), e.to_string());
            Default::default()
        }
    };

    let entry = build_entry(&metadata, &shown, locale, diags);
    if let Some(ref e) = entry {
        debug!(kind = %e.kind, name = %e.name, "indexed {}", path.display());
    }
    entry
}

/// One result per input path, in input order.
pub fn build_index<P: AsRef<Path>>(
    paths: &[P],
    locale: &str,
    diags: &mut Diagnostics,
) -> Vec<Option<IndexEntry>> {
    paths
        .iter()
        .map(|p| index_document(p.as_ref(), locale, diags))
        .collect()
}

/// Drop skipped documents. A batch with nothing usable is a hard failure.
pub fn usable_entries(results: Vec<Option<IndexEntry>>) -> Result<Vec<IndexEntry>, Error> {
    let entries: Vec<IndexEntry> = results.into_iter().flatten().collect();
    if entries.is_empty() {
        return Err(Error::NoDocuments);
    }
    Ok(entries)
}

// ── Tests ──
