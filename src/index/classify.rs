use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static EVENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^on[A-Z].*$").unwrap());
static UPPER_SNAKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());
static LOWER_CAMEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap());
static UPPER_CAMEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap());

/// Entry kinds understood by the docset browser. The string form is the
/// entry type name written to the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    Namespace,
    Interface,
    Method,
    Property,
    Type,
    Event,
    Constant,
    Guide,
    Section,
    Parameter,
    Object,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 11] = [
        ResourceKind::Namespace,
        ResourceKind::Interface,
        ResourceKind::Method,
        ResourceKind::Property,
        ResourceKind::Type,
        ResourceKind::Event,
        ResourceKind::Constant,
        ResourceKind::Guide,
        ResourceKind::Section,
        ResourceKind::Parameter,
        ResourceKind::Object,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Interface => "Interface",
            ResourceKind::Method => "Method",
            ResourceKind::Property => "Property",
            ResourceKind::Type => "Type",
            ResourceKind::Event => "Event",
            ResourceKind::Constant => "Constant",
            ResourceKind::Guide => "Guide",
            ResourceKind::Section => "Section",
            ResourceKind::Parameter => "Parameter",
            ResourceKind::Object => "Object",
        }
    }

    /// Container kinds group other entries and carry no description.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            ResourceKind::Namespace | ResourceKind::Guide | ResourceKind::Section
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if wanted.eq_ignore_ascii_case("module") {
            return Ok(ResourceKind::Namespace);
        }
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown resource kind: {}", s))
    }
}

/// Lexical shapes a leaf name can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `onSomething`
    EventHandler,
    /// `something()`
    CallSuffix,
    /// `SOME_THING`
    UpperSnake,
    /// `someThing`
    LowerCamel,
    /// `SomeThing`
    UpperCamel,
}

impl Shape {
    fn matches(self, leaf: &str) -> bool {
        match self {
            Shape::EventHandler => EVENT_RE.is_match(leaf),
            Shape::CallSuffix => leaf.ends_with("()"),
            Shape::UpperSnake => UPPER_SNAKE_RE.is_match(leaf),
            Shape::LowerCamel => LOWER_CAMEL_RE.is_match(leaf),
            Shape::UpperCamel => UPPER_CAMEL_RE.is_match(leaf),
        }
    }
}

/// Evaluated top to bottom, first match wins. UpperSnake must precede
/// UpperCamel: `ALLCAPS` satisfies both.
const RULES: &[(Shape, ResourceKind)] = &[
    (Shape::EventHandler, ResourceKind::Event),
    (Shape::CallSuffix, ResourceKind::Method),
    (Shape::UpperSnake, ResourceKind::Constant),
    (Shape::LowerCamel, ResourceKind::Property),
    (Shape::UpperCamel, ResourceKind::Type),
];

/// Final `.`-separated segment of a dotted identifier.
pub fn leaf_name(identifier: &str) -> &str {
    identifier.rsplit('.').next().unwrap_or(identifier)
}

/// Infer a kind from the shape of the identifier's leaf name alone.
/// `None` means the name says nothing and the caller must look elsewhere.
pub fn classify(identifier: &str) -> Option<ResourceKind> {
    let leaf = leaf_name(identifier);
    RULES
        .iter()
        .find(|(shape, _)| shape.matches(leaf))
        .map(|(_, kind)| *kind)
}

// ── Tests ──
