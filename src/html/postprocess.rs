use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use super::dom::Document;
use super::links::{LinkRewriter, RewriteReport, StylesheetFixups};
use super::toc;
use crate::error::Error;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessSummary {
    pub pages: usize,
    pub failed: usize,
    pub relative_links: usize,
    pub external_links: usize,
    pub anchors: usize,
    pub stylesheets: usize,
}

struct PageReport {
    links: RewriteReport,
    anchors: usize,
}

/// Read, rewrite and write back one rendered page.
fn process_page(
    path: &Path,
    documents_root: &Path,
    rewriter: &LinkRewriter,
    fixups: &mut StylesheetFixups,
) -> Result<PageReport, Error> {
    let html = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut doc = Document::parse(&html).map_err(|source| Error::Html {
        path: path.to_path_buf(),
        source,
    })?;

    let links = rewriter.rewrite(&mut doc, path, fixups)?;
    let anchors = toc::build_toc(&mut doc, path, documents_root);

    std::fs::write(path, doc.serialize()).map_err(|e| Error::io(path, e))?;
    Ok(PageReport {
        links,
        anchors: anchors.len(),
    })
}

/// Rewrite every page in place, then patch the stylesheets they reference.
/// A page that fails is logged and counted; the rest of the batch goes on.
pub fn post_process<P: AsRef<Path>>(
    paths: &[P],
    documents_root: &Path,
    origin: &str,
) -> PostProcessSummary {
    let rewriter = LinkRewriter::new(documents_root, origin);
    let mut fixups = StylesheetFixups::new();
    let mut summary = PostProcessSummary::default();

    let pb = ProgressBar::new(paths.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    for path in paths {
        let path = path.as_ref();
        summary.pages += 1;
        match process_page(path, documents_root, &rewriter, &mut fixups) {
            Ok(report) => {
                debug!(
                    relative = report.links.relative,
                    external = report.links.external,
                    anchors = report.anchors,
                    "processed {}",
                    path.display()
                );
                summary.relative_links += report.links.relative;
                summary.external_links += report.links.external;
                summary.anchors += report.anchors;
            }
            Err(e) => {
                error!("{}", e);
                summary.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if fixups.is_empty() {
        info!(
            "Post-processed {} pages ({} failed), no stylesheets referenced",
            summary.pages, summary.failed
        );
        return summary;
    }
    summary.stylesheets = fixups.apply();
    info!(
        "Post-processed {} pages ({} failed), patched {} of {} stylesheets",
        summary.pages,
        summary.failed,
        summary.stylesheets,
        fixups.len()
    );
    summary
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PAGE_DIR: &str = "en-us/docs/mozilla/add-ons/webextensions/api/storage";

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(PAGE_DIR)).unwrap();
        fs::create_dir_all(root.join("en-us/docs/mozilla/add-ons/webextensions/api/tabs")).unwrap();
        fs::create_dir_all(root.join("static/css")).unwrap();
        fs::write(
            root.join("static/css/main.css"),
            ".icon{background:url(/static/media/icon.svg)}\n.x{background:url(/static/media/x.svg)}",
        )
        .unwrap();
        let page = fs::read_to_string("tests/fixtures/pages/storage.html").unwrap();
        fs::write(root.join(PAGE_DIR).join("index.html"), &page).unwrap();
        fs::write(
            root.join("en-us/docs/mozilla/add-ons/webextensions/api/tabs/index.html"),
            &page,
        )
        .unwrap();
        dir
    }

    #[test]
    fn rewrites_pages_and_patches_css_once() {
        let dir = site();
        let root = dir.path();
        let pages = vec![
            root.join(PAGE_DIR).join("index.html"),
            root.join("en-us/docs/mozilla/add-ons/webextensions/api/tabs/index.html"),
        ];

        let summary = post_process(&pages, root, "https://developer.mozilla.org");
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.stylesheets, 1);

        let html = fs::read_to_string(&pages[0]).unwrap();
        assert!(html.contains(r#"href="../../../../../../../static/css/main.css""#));
        assert!(html.contains(r#"href="../tabs/index.html#method-query""#));
        assert!(html.contains(r#"href="https://developer.mozilla.org/en-US/docs/Web/JavaScript" class="external""#));
        assert!(html.contains(r#"<a name="//apple_ref/cpp/Section/Methods" class="dashAnchor"></a>"#));
        assert!(html.contains(r#"<a name="//apple_ref/cpp/Method/get()" class="dashAnchor"></a>"#));
        assert!(html.contains(r#"<a name="//apple_ref/cpp/Constant/QUOTA_BYTES" class="dashAnchor"></a>"#));
        assert!(!html.contains("//apple_ref/cpp/Section/Legend"));
        // inline script survives untouched
        assert!(html.contains("if (a < b && b > c)"));

        let css = fs::read_to_string(root.join("static/css/main.css")).unwrap();
        assert_eq!(css, ".icon{background:url(../media/icon.svg)}\n.x{background:url(../media/x.svg)}");
    }

    #[test]
    fn pages_without_stylesheets_patch_nothing() {
        let dir = site();
        let root = dir.path();
        let page = root.join("en-us/docs/mozilla/add-ons/webextensions/plain.html");
        fs::write(&page, "<h2>Plain</h2><p>no styles</p>").unwrap();

        let summary = post_process(&[&page], root, "https://developer.mozilla.org");
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.anchors, 1);
        assert_eq!(summary.stylesheets, 0);
        let css = fs::read_to_string(root.join("static/css/main.css")).unwrap();
        assert!(css.contains("url(/static/media/icon.svg)"));
    }

    #[test]
    fn failing_page_does_not_stop_the_batch() {
        let dir = site();
        let root = dir.path();
        let pages = vec![
            root.join("en-us/docs/missing/index.html"),
            root.join(PAGE_DIR).join("index.html"),
        ];
        let summary = post_process(&pages, root, "https://developer.mozilla.org");
        assert_eq!(summary.failed, 1);
        assert!(summary.anchors > 0);
    }
}
