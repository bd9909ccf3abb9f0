//! Qualified names and the short-alias namespace table.
//!
//! A [`QualName`] is the `(prefix?, namespace, local)` triple attached to
//! every element and attribute. It wraps the interned
//! [`markup5ever::QualName`] so names coming straight from the parsers are
//! reused without copying, and layers on the comparison semantics this
//! crate guarantees: the prefix is *presentation only* - it is ignored for
//! equality and hashing but preserved for serialization, and it breaks
//! ties when ordering.

use core::cmp::Ordering as CmpOrdering;
use core::fmt;
use core::hash::Hash;
use core::hash::Hasher;

use derive_more::with_trait::AsRef;
use derive_more::with_trait::Deref;
use derive_more::with_trait::From;
use derive_more::with_trait::Into;
use markup5ever::namespace_url;
use markup5ever::ns;
use markup5ever::LocalName;
use markup5ever::Namespace;
use markup5ever::Prefix;

/// Expands the well-known namespace aliases accepted by the [`QualName`]
/// constructors. Unknown names pass through as literal namespace URIs.
pub(crate) fn expand_namespace(name: &str) -> Namespace {
  match name {
    "html" | "xhtml" => ns!(html),
    "xml" => ns!(xml),
    "xmlns" => ns!(xmlns),
    "svg" => ns!(svg),
    "mathml" => ns!(mathml),
    other => Namespace::from(other),
  }
}

/// A qualified name: `(prefix?, namespace, local)`.
///
/// ```
/// use arbordom::QualName;
///
/// let div = QualName::with_namespace("div", "html");
/// assert_eq!(div.namespace().as_ref(), "http://www.w3.org/1999/xhtml");
///
/// // Prefixes don't participate in equality.
/// let a = QualName::with_prefix("child", "custom-ns", Some("ns1"));
/// let b = QualName::with_namespace("child", "custom-ns");
/// assert_eq!(a, b);
/// ```
#[derive(Clone, Debug, Deref, From, Into, AsRef)]
pub struct QualName(pub(crate) markup5ever::QualName);

impl QualName {
  /// A name with no prefix and the empty namespace.
  pub fn new(local: &str) -> Self {
    QualName(markup5ever::QualName::new(None, ns!(), LocalName::from(local)))
  }

  /// A name in the given namespace. `namespace` may be one of the short
  /// aliases (`html`, `xhtml`, `xml`, `xmlns`, `svg`, `mathml`) or a
  /// literal URI.
  pub fn with_namespace(local: &str, namespace: &str) -> Self {
    QualName(markup5ever::QualName::new(
      None,
      expand_namespace(namespace),
      LocalName::from(local),
    ))
  }

  /// A name with an explicit prefix.
  pub fn with_prefix(local: &str, namespace: &str, prefix: Option<&str>) -> Self {
    QualName(markup5ever::QualName::new(
      prefix.map(Prefix::from),
      expand_namespace(namespace),
      LocalName::from(local),
    ))
  }

  pub fn local(&self) -> &LocalName {
    &self.0.local
  }

  pub fn namespace(&self) -> &Namespace {
    &self.0.ns
  }

  pub fn prefix(&self) -> Option<&Prefix> {
    self.0.prefix.as_ref()
  }
}

impl From<&str> for QualName {
  fn from(local: &str) -> Self {
    QualName::new(local)
  }
}

/// Equality is component-wise on `(namespace, local)`; the prefix is
/// ignored.
impl PartialEq for QualName {
  fn eq(&self, other: &Self) -> bool {
    self.0.ns == other.0.ns && self.0.local == other.0.local
  }
}

impl Eq for QualName {}

impl Hash for QualName {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.ns.hash(state);
    self.0.local.hash(state);
  }
}

/// Lexicographic on `(namespace, local, prefix)`.
impl Ord for QualName {
  fn cmp(&self, other: &Self) -> CmpOrdering {
    let this = (
      self.0.ns.as_ref(),
      self.0.local.as_ref(),
      self.0.prefix.as_ref().map(|p| p.as_ref()),
    );
    let that = (
      other.0.ns.as_ref(),
      other.0.local.as_ref(),
      other.0.prefix.as_ref().map(|p| p.as_ref()),
    );
    this.cmp(&that)
  }
}

impl PartialOrd for QualName {
  fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for QualName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0.prefix.as_ref() {
      Some(prefix) => write!(f, "{}:{}", prefix, self.0.local),
      None => write!(f, "{}", self.0.local),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_form_has_empty_namespace() {
    let name = QualName::new("name");
    assert_eq!(name.local().as_ref(), "name");
    assert_eq!(name.namespace().as_ref(), "");
    assert!(name.prefix().is_none());
  }

  #[test]
  fn aliases_expand() {
    let div = QualName::with_namespace("div", "html");
    assert_eq!(div.namespace().as_ref(), "http://www.w3.org/1999/xhtml");

    let span = QualName::with_namespace("span", "xhtml");
    assert_eq!(span.namespace().as_ref(), "http://www.w3.org/1999/xhtml");

    let svg = QualName::with_namespace("rect", "svg");
    assert_eq!(svg.namespace().as_ref(), "http://www.w3.org/2000/svg");

    let custom = QualName::with_namespace("test", "custom-ns");
    assert_eq!(custom.namespace().as_ref(), "custom-ns");

    let star = QualName::with_namespace("test", "*");
    assert_eq!(star.namespace().as_ref(), "*");
  }

  #[test]
  fn prefix_is_ignored_for_equality_but_not_ordering() {
    let plain = QualName::with_namespace("span", "html");
    let prefixed = QualName::with_prefix("span", "html", Some("x"));
    assert_eq!(plain, prefixed);

    assert_eq!(QualName::new("test"), QualName::new("test"));
    assert_ne!(QualName::new("test"), QualName::with_namespace("test", "html"));

    // Same (namespace, local): the prefix decides.
    assert!(plain < prefixed);
  }

  #[test]
  fn ordering_is_namespace_then_local() {
    let a = QualName::new("z");
    let b = QualName::with_namespace("a", "html");
    assert!(a < b, "empty namespace sorts before the html namespace");

    let c = QualName::new("a");
    assert!(c < a);
  }

  #[test]
  fn displays_with_prefix() {
    let name = QualName::with_prefix("child", "custom-ns", Some("ns1"));
    assert_eq!(name.to_string(), "ns1:child");
    assert_eq!(QualName::new("div").to_string(), "div");
  }
}
