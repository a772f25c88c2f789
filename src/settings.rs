use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Error;

const CONFIG_FILE: &str = "docset";
const ENV_PREFIX: &str = "DOCSET";

/// Paths and naming conventions of one docset build.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Source documents (HTML with front matter), one folder per locale.
    pub content_dir: PathBuf,
    /// `Contents/Resources/Documents` of the docset, holding rendered pages.
    pub documents_dir: PathBuf,
    pub db_path: PathBuf,
    pub locale: String,
    /// Part of the tree below `{locale}/docs` that gets post-processed.
    pub subtree: String,
    /// Where references that can't be resolved locally point to.
    pub origin: String,
}

impl Settings {
    /// Defaults, then `docset.toml` if present, then `DOCSET_*` variables.
    pub fn load() -> Result<Self, Error> {
        let settings = Config::builder()
            .set_default("content_dir", "mdn_content")?
            .set_default("documents_dir", "webextensions.docset/Contents/Resources/Documents")?
            .set_default("db_path", "webextensions.docset/Contents/Resources/docSet.dsidx")?
            .set_default("locale", "en-us")?
            .set_default("subtree", "mozilla/add-ons/webextensions")?
            .set_default("origin", "https://developer.mozilla.org")?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Rendered pages below the configured subtree.
    pub fn pages_glob(&self) -> String {
        format!(
            "{}/{}/docs/{}/**/index.html",
            self.documents_dir.display(),
            self.locale,
            self.subtree
        )
    }

    /// Source documents of the configured locale and subtree.
    pub fn content_glob(&self) -> String {
        format!(
            "{}/{}/{}/**/*.html",
            self.content_dir.display(),
            self.locale,
            self.subtree
        )
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load() {
        let s = Settings::load().unwrap();
        assert!(!s.locale.is_empty());
        assert!(s.origin.starts_with("https://"));
    }

    #[test]
    fn globs_follow_locale_and_subtree() {
        let s = Settings {
            content_dir: PathBuf::from("content"),
            documents_dir: PathBuf::from("Documents"),
            db_path: PathBuf::from("docSet.dsidx"),
            locale: "en-us".into(),
            subtree: "mozilla/add-ons/webextensions".into(),
            origin: "https://developer.mozilla.org".into(),
        };
        assert_eq!(
            s.pages_glob(),
            "Documents/en-us/docs/mozilla/add-ons/webextensions/**/index.html"
        );
        assert_eq!(s.content_glob(), "content/en-us/mozilla/add-ons/webextensions/**/*.html");
    }
}
