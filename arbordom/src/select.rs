//! The CSS selector engine.
//!
//! Selector groups are compiled with Servo's [`selectors`] crate against
//! the owning tree's prefix map, so `ns1|child` resolves through whatever
//! namespaces were declared in the parsed document. Matching walks the
//! scope's descendants in document order; the scope itself is excluded.

use std::fmt;

use cssparser::serialize_string;
use cssparser::Parser as CssParser;
use cssparser::ParserInput;
use cssparser::ToCss;
use indexmap::IndexMap;
use markup5ever::namespace_url;
use markup5ever::ns;
use markup5ever::LocalName;
use markup5ever::Namespace;
use precomputed_hash::PrecomputedHash;
use selectors::attr::AttrSelectorOperation;
use selectors::attr::CaseSensitivity;
use selectors::attr::NamespaceConstraint;
use selectors::bloom::BloomFilter;
use selectors::matching::matches_selector;
use selectors::matching::ElementSelectorFlags;
use selectors::matching::MatchingContext;
use selectors::matching::MatchingForInvalidation;
use selectors::matching::MatchingMode;
use selectors::matching::NeedsSelectorFlags;
use selectors::matching::QuirksMode as SelectorsQuirksMode;
use selectors::matching::SelectorCaches;
use selectors::parser;
use selectors::parser::ParseRelative;
use selectors::parser::SelectorList;
use selectors::parser::SelectorParseErrorKind;
use selectors::OpaqueElement;

use crate::errors::Error;
use crate::errors::Result;
use crate::iter::Descendants;
use crate::node::Element;
use crate::node::Node;

/// Marker type wiring our atoms into the `selectors` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomSelectorImpl;

impl parser::SelectorImpl for DomSelectorImpl {
  type ExtraMatchingData<'a> = ();
  type AttrValue = CssString;
  type Identifier = CssLocalName;
  type LocalName = CssLocalName;
  type NamespaceUrl = Namespace;
  type NamespacePrefix = CssLocalName;
  type BorrowedNamespaceUrl = Namespace;
  type BorrowedLocalName = CssLocalName;
  type NonTSPseudoClass = NonTSPseudoClass;
  type PseudoElement = PseudoElement;
}

/// Wraps [`String`] so it can be used as a selector attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssString(pub String);

impl<'a> From<&'a str> for CssString {
  fn from(value: &'a str) -> Self {
    CssString(value.to_owned())
  }
}

impl AsRef<str> for CssString {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl ToCss for CssString {
  fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
    serialize_string(&self.0, dest)
  }
}

/// Wraps [`LocalName`] so it can be used as a selector identifier.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CssLocalName(pub LocalName);

impl<'a> From<&'a str> for CssLocalName {
  fn from(value: &'a str) -> Self {
    CssLocalName(value.into())
  }
}

impl ToCss for CssLocalName {
  fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
    dest.write_str(&self.0)
  }
}

impl PrecomputedHash for CssLocalName {
  fn precomputed_hash(&self) -> u32 {
    self.0.precomputed_hash()
  }
}

/// Non-tree-structural pseudo-classes are not supported; the tree has no
/// user-interaction state to match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonTSPseudoClass {}

impl parser::NonTSPseudoClass for NonTSPseudoClass {
  type Impl = DomSelectorImpl;

  fn is_active_or_hover(&self) -> bool {
    match *self {}
  }

  fn is_user_action_state(&self) -> bool {
    match *self {}
  }
}

impl ToCss for NonTSPseudoClass {
  fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
    match *self {}
  }
}

/// Pseudo-elements are rejected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {}

impl parser::PseudoElement for PseudoElement {
  type Impl = DomSelectorImpl;
}

impl ToCss for PseudoElement {
  fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
    match *self {}
  }
}

/// Parser hook resolving namespace prefixes through the tree's map.
struct SelectorParser<'a> {
  namespaces: &'a IndexMap<String, String>,
}

impl<'i, 'a> parser::Parser<'i> for SelectorParser<'a> {
  type Impl = DomSelectorImpl;
  type Error = SelectorParseErrorKind<'i>;

  fn parse_is_and_where(&self) -> bool {
    true
  }

  fn parse_has(&self) -> bool {
    true
  }

  fn namespace_for_prefix(&self, prefix: &CssLocalName) -> Option<Namespace> {
    self
      .namespaces
      .get(prefix.0.as_ref())
      .map(|url| Namespace::from(url.as_str()))
  }
}

/// A compiled selector group.
pub struct Selectors(SelectorList<DomSelectorImpl>);

impl Selectors {
  /// Compiles a (possibly comma-separated) selector group. Unknown
  /// namespace prefixes and syntax errors fail with
  /// [`Error::InvalidSelector`].
  pub fn compile(
    expr: &str,
    namespaces: &IndexMap<String, String>,
  ) -> Result<Selectors> {
    let mut input = ParserInput::new(expr);
    let mut css_parser = CssParser::new(&mut input);
    let parser = SelectorParser { namespaces };
    SelectorList::parse(&parser, &mut css_parser, ParseRelative::No)
      .map(Selectors)
      .map_err(|err| Error::InvalidSelector(format!("{expr:?}: {err:?}")))
  }

  /// Whether any selector of the group matches `element`.
  pub fn matches(&self, element: &Element) -> bool {
    let mut caches = SelectorCaches::default();
    let mut context = MatchingContext::new(
      MatchingMode::Normal,
      None,
      &mut caches,
      SelectorsQuirksMode::NoQuirks,
      NeedsSelectorFlags::No,
      MatchingForInvalidation::No,
    );
    self
      .0
      .slice()
      .iter()
      .any(|selector| matches_selector(selector, 0, None, element, &mut context))
  }
}

impl fmt::Debug for Selectors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Selectors({:?})", self.0)
  }
}

impl selectors::Element for Element {
  type Impl = DomSelectorImpl;

  fn opaque(&self) -> OpaqueElement {
    // Slot storage is stable while matching runs; the address is only
    // used as a cache key within one `matches` call.
    let data = self.node.dom.data_ref(self.node.index());
    OpaqueElement::new(&*data)
  }

  fn parent_element(&self) -> Option<Self> {
    self.as_node().parent().and_then(|parent| parent.as_element())
  }

  fn parent_node_is_shadow_root(&self) -> bool {
    false
  }

  fn containing_shadow_host(&self) -> Option<Self> {
    None
  }

  fn is_pseudo_element(&self) -> bool {
    false
  }

  fn prev_sibling_element(&self) -> Option<Self> {
    self.as_node().prev_siblings().find_map(|node| node.as_element())
  }

  fn next_sibling_element(&self) -> Option<Self> {
    self.as_node().next_siblings().find_map(|node| node.as_element())
  }

  fn first_element_child(&self) -> Option<Self> {
    self.as_node().children().find_map(|node| node.as_element())
  }

  fn is_html_element_in_html_document(&self) -> bool {
    self.name().namespace() == &ns!(html)
  }

  fn has_local_name(&self, local_name: &CssLocalName) -> bool {
    self.name().local() == &local_name.0
  }

  fn has_namespace(&self, ns: &Namespace) -> bool {
    self.name().namespace() == ns
  }

  fn is_same_type(&self, other: &Self) -> bool {
    self.name() == other.name()
  }

  fn attr_matches(
    &self,
    ns: &NamespaceConstraint<&Namespace>,
    local_name: &CssLocalName,
    operation: &AttrSelectorOperation<&CssString>,
  ) -> bool {
    let attrs = self.attrs();
    attrs.iter().any(|(key, value)| {
      !matches!(*ns, NamespaceConstraint::Specific(url) if url != key.namespace())
        && key.local() == &local_name.0
        && operation.eval_str(value)
    })
  }

  fn match_non_ts_pseudo_class(
    &self,
    pc: &NonTSPseudoClass,
    _context: &mut MatchingContext<Self::Impl>,
  ) -> bool {
    match *pc {}
  }

  fn match_pseudo_element(
    &self,
    pe: &PseudoElement,
    _context: &mut MatchingContext<Self::Impl>,
  ) -> bool {
    match *pe {}
  }

  fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

  fn is_link(&self) -> bool {
    let name = self.name();
    name.namespace() == &ns!(html)
      && matches!(name.local().as_ref(), "a" | "area" | "link")
      && self.attrs().contains_key("href")
  }

  fn is_html_slot_element(&self) -> bool {
    false
  }

  fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
    match self.id() {
      Some(value) => case_sensitivity.eq(value.as_bytes(), id.0.as_bytes()),
      None => false,
    }
  }

  fn has_class(
    &self,
    name: &CssLocalName,
    case_sensitivity: CaseSensitivity,
  ) -> bool {
    let attrs = self.attrs();
    match attrs.find("class", 0) {
      Some((_, value)) => value
        .split_ascii_whitespace()
        .any(|class| case_sensitivity.eq(class.as_bytes(), name.0.as_bytes())),
      None => false,
    }
  }

  fn has_custom_state(&self, _name: &CssLocalName) -> bool {
    false
  }

  fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
    None
  }

  fn is_part(&self, _name: &CssLocalName) -> bool {
    false
  }

  fn is_empty(&self) -> bool {
    !self.as_node().children().any(|child| {
      child.is_element() || (child.is_text() && !child.text("", false).is_empty())
    })
  }

  fn is_root(&self) -> bool {
    self
      .as_node()
      .parent()
      .is_some_and(|parent| parent.is_document() || parent.is_fragment())
  }

  fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
    false
  }
}

/// Iterator over the elements matching a selector group, in document
/// order among the scope's descendants (the scope itself is excluded).
///
/// Matching is re-evaluated lazily on each step, so nodes inserted into
/// not-yet-visited subtrees are picked up. The `offset` is consumed once,
/// when the iterator is constructed.
#[derive(Debug)]
pub struct Select {
  iter: Descendants,
  selectors: Selectors,
  /// `None` means unlimited.
  remaining: Option<usize>,
}

impl Select {
  pub(crate) fn new(
    scope: &Node,
    expr: &str,
    limit: usize,
    offset: usize,
  ) -> Result<Select> {
    let namespaces = scope.tree().namespaces();
    let selectors = Selectors::compile(expr, &namespaces)?;
    let mut iter = scope.descendants();
    let _ = iter.next(); // descendants() starts at the scope itself
    let mut select =
      Select { iter, selectors, remaining: (limit > 0).then_some(limit) };
    for _ in 0..offset {
      if select.advance().is_none() {
        break;
      }
    }
    Ok(select)
  }

  fn advance(&mut self) -> Option<Element> {
    loop {
      let node = self.iter.next()?;
      if let Some(element) = node.as_element() {
        if self.selectors.matches(&element) {
          return Some(element);
        }
      }
    }
  }
}

impl Iterator for Select {
  type Item = Element;

  fn next(&mut self) -> Option<Element> {
    if self.remaining == Some(0) {
      return None;
    }
    let element = self.advance()?;
    if let Some(remaining) = self.remaining.as_mut() {
      *remaining -= 1;
    }
    Some(element)
  }
}
