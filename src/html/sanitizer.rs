// Sanitizer
// Parses arbitrary markup with html5ever (through scraper) and copies the
// parts the policy allows into a Document. Disallowed elements vanish but keep
// their text and disallowed attributes are stripped. Sanitizing never fails
// and sanitizing a serialized result again yields the same tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use scraper::{ElementRef, Html, Node as DomNode};

use super::{Document, Element, Node};

/// Elements removed together with everything inside them
const DISCARDED_ELEMENTS: &[&str] = &[
    "head", "iframe", "noscript", "object", "script", "style", "svg", "template", "title",
];

/// Wrapper elements that are never materialized
const TRANSPARENT_ROOTS: &[&str] = &["html", "body"];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite"];

const DEFAULT_TAGS: &[&str] = &[
    "a",
    "abbr",
    "address",
    "b",
    "big",
    "blockquote",
    "br",
    "center",
    "cite",
    "code",
    "del",
    "dfn",
    "div",
    "em",
    "font",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "i",
    "img",
    "ins",
    "li",
    "ol",
    "p",
    "pre",
    "q",
    "s",
    "small",
    "span",
    "strike",
    "strong",
    "sub",
    "sup",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "tt",
    "u",
    "ul",
];

const DEFAULT_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title"]),
    ("blockquote", &["cite"]),
    ("img", &["src", "alt", "width", "height", "title"]),
    ("ol", &["start"]),
    ("td", &["colspan", "rowspan"]),
    ("th", &["colspan", "rowspan"]),
];

const DEFAULT_SCHEMES: &[&str] = &["cid", "data", "http", "https", "mailto"];

/// Which tags, attributes and URL schemes survive sanitizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizePolicy {
    pub allowed_tags: BTreeSet<String>,
    /// Per-tag attribute allow list; the `*` entry applies to every tag
    pub allowed_attributes: BTreeMap<String, BTreeSet<String>>,
    pub url_schemes: BTreeSet<String>,
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        SanitizePolicy {
            allowed_tags: DEFAULT_TAGS.iter().map(|tag| tag.to_string()).collect(),
            allowed_attributes: DEFAULT_ATTRIBUTES
                .iter()
                .map(|(tag, attributes)| {
                    (
                        tag.to_string(),
                        attributes.iter().map(|name| name.to_string()).collect(),
                    )
                })
                .collect(),
            url_schemes: DEFAULT_SCHEMES
                .iter()
                .map(|scheme| scheme.to_string())
                .collect(),
        }
    }
}

impl SanitizePolicy {
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.allowed_tags.contains(tag)
    }

    pub fn allows_attribute(&self, tag: &str, attribute: &str) -> bool {
        let listed = |key: &str| {
            self.allowed_attributes
                .get(key)
                .is_some_and(|names| names.contains(attribute))
        };
        listed(tag) || listed("*")
    }

    /// Relative references are always fine; absolute ones need an allowed
    /// scheme. `data:` is only accepted for images.
    pub fn allows_url(&self, tag: &str, value: &str) -> bool {
        let Some(scheme) = url_scheme(value) else {
            return true;
        };
        if !self.url_schemes.contains(&scheme) {
            return false;
        }
        scheme != "data"
            || (tag == "img"
                && value
                    .trim_start()
                    .to_ascii_lowercase()
                    .starts_with("data:image/"))
    }
}

fn url_scheme(value: &str) -> Option<String> {
    let value = value.trim_start();
    let colon = value.find(':')?;
    let candidate = &value[..colon];
    let mut chars = candidate.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic()
        || !chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
    {
        // "?a:b", "/x:y" and friends are relative references
        return None;
    }
    Some(candidate.to_ascii_lowercase())
}

pub struct Sanitizer {
    policy: SanitizePolicy,
}

impl Sanitizer {
    pub fn new(policy: SanitizePolicy) -> Self {
        Sanitizer { policy }
    }

    pub fn policy(&self) -> &SanitizePolicy {
        &self.policy
    }

    pub fn sanitize(&self, html: &str) -> Document {
        let parsed = Html::parse_fragment(html);
        let mut root = Element::new("body");
        self.filter_children(parsed.root_element(), &mut root);
        Document { root }
    }

    fn filter_children(&self, element: ElementRef<'_>, parent: &mut Element) {
        for child in element.children() {
            match child.value() {
                DomNode::Text(text) => parent.append(Node::Text(String::from(&**text))),
                DomNode::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.filter_element(child, parent);
                    }
                }
                _ => {}
            }
        }
    }

    fn filter_element(&self, element: ElementRef<'_>, parent: &mut Element) {
        let name = element.value().name();
        if DISCARDED_ELEMENTS.contains(&name) {
            return;
        }
        if TRANSPARENT_ROOTS.contains(&name) || !self.policy.allows_tag(name) {
            self.filter_children(element, parent);
            return;
        }

        let mut out = Element::new(name);
        out.attributes = self.filter_attributes(name, element.value().attrs());
        self.filter_children(element, &mut out);
        parent.append(Node::Element(out));
    }

    /// Allowed attributes, sorted by name
    fn filter_attributes<'a>(
        &self,
        tag: &str,
        attributes: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> Vec<(String, String)> {
        let mut kept: Vec<(String, String)> = attributes
            .filter(|(name, value)| {
                self.policy.allows_attribute(tag, name)
                    && (!URL_ATTRIBUTES.contains(name) || self.policy.allows_url(tag, value))
            })
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        kept.sort();
        kept
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SanitizePolicy::default())
    }
}
