use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};

static FRONT_MATTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\A---[ \t]*\r?\n(?s:(.*?))^---[ \t]*\r?$").unwrap());

/// Header fields of one source document. Fields are optional here; the
/// entry builder decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
}

/// Parse the `---` delimited YAML block at the top of `body`.
///
/// A body without a block (or with an empty one) yields empty metadata;
/// only a block that is not valid YAML is an error.
pub fn extract(body: &str) -> Result<DocumentMetadata, serde_yaml::Error> {
    let body = body.trim_start_matches('\u{feff}').trim_start();
    let block = match FRONT_MATTER_RE.captures(body) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => return Ok(DocumentMetadata::default()),
    };
    if block.trim().is_empty() {
        return Ok(DocumentMetadata::default());
    }
    serde_yaml::from_str(block)
}

fn scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    let s = match value {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_yaml::Value>::deserialize(d)?;
    Ok(value.and_then(scalar_to_string))
}

fn lenient_tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<serde_yaml::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_yaml::Value::Sequence(seq)) => {
            seq.into_iter().filter_map(scalar_to_string).collect()
        }
        Some(other) => scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    })
}

// ── Tests ──
