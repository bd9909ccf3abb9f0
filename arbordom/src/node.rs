//! The public node façade.
//!
//! A [`Node`] is a cheap, clonable handle pairing a [`TreeDom`] with a
//! [`NodeId`]. Typed views ([`Element`], [`Text`], ...) wrap a `Node` and
//! add the payload accessors of their kind; they all deref back to
//! `Node`, so navigation and mutation read the same everywhere.

use std::cell::Ref;
use std::cell::RefMut;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::ops::Deref;
use std::ops::DerefMut;

use derive_more::with_trait::TryFrom;
use tendril::StrTendril;

use crate::attrs::Attr;
use crate::attrs::AttrsList;
use crate::errors::Error;
use crate::errors::Result;
use crate::iter::Ancestors;
use crate::iter::Children;
use crate::iter::Descendants;
use crate::iter::FirstChildren;
use crate::iter::LastChildren;
use crate::iter::NextSiblings;
use crate::iter::PrevSiblings;
use crate::iter::Traverse;
use crate::name::QualName;
use crate::select::Select;
use crate::serializer;
use crate::serializer::Markup;
use crate::tree::fmt_node_data;
use crate::tree::DoctypeData;
use crate::tree::ElementData;
use crate::tree::NodeData;
use crate::tree::NodeId;
use crate::tree::ProcessingInstructionData;
use crate::tree::TreeDom;

/// Where a node is placed relative to the anchor of an `attach` or
/// `create_*` call.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, TryFrom)]
#[try_from(repr)]
pub enum Ordering {
  /// Create/attach as the anchor's `last_child`.
  #[default]
  Append = 0,
  /// Create/attach as the anchor's `first_child`.
  Prepend = 1,
  /// Create/attach as the anchor's `next_sibling`.
  After = 2,
  /// Create/attach as the anchor's `prev_sibling`.
  Before = 3,
}

/// A handle to a node of a [`TreeDom`].
#[derive(Clone)]
pub struct Node {
  pub(crate) dom: TreeDom,
  pub(crate) id: NodeId,
}

impl Node {
  pub(crate) fn new(dom: TreeDom, id: NodeId) -> Self {
    Node { dom, id }
  }

  pub(crate) fn index(&self) -> u32 {
    self.id.index
  }

  /// The raw id of this node.
  pub fn id(&self) -> NodeId {
    self.id
  }

  /// The tree this node belongs to.
  pub fn tree(&self) -> TreeDom {
    self.dom.clone()
  }

  /// A clone of this node's payload.
  pub fn data(&self) -> NodeData {
    self.dom.with_data(self.index(), |data| data.clone())
  }

  pub fn is_document(&self) -> bool {
    self.dom.with_data(self.index(), NodeData::is_document)
  }

  pub fn is_fragment(&self) -> bool {
    self.dom.with_data(self.index(), NodeData::is_fragment)
  }

  pub fn is_doctype(&self) -> bool {
    self.dom.with_data(self.index(), NodeData::is_doctype)
  }

  pub fn is_comment(&self) -> bool {
    self.dom.with_data(self.index(), NodeData::is_comment)
  }

  pub fn is_text(&self) -> bool {
    self.dom.with_data(self.index(), NodeData::is_text)
  }

  pub fn is_element(&self) -> bool {
    self.dom.with_data(self.index(), NodeData::is_element)
  }

  pub fn is_processing_instruction(&self) -> bool {
    self.dom.with_data(self.index(), NodeData::is_processing_instruction)
  }

  // ---- navigation -------------------------------------------------------

  pub fn parent(&self) -> Option<Node> {
    self.relative(self.dom.links(self.index()).parent)
  }

  pub fn first_child(&self) -> Option<Node> {
    self.relative(self.dom.links(self.index()).first)
  }

  pub fn last_child(&self) -> Option<Node> {
    self.relative(self.dom.links(self.index()).last)
  }

  pub fn prev_sibling(&self) -> Option<Node> {
    self.relative(self.dom.links(self.index()).prev)
  }

  pub fn next_sibling(&self) -> Option<Node> {
    self.relative(self.dom.links(self.index()).next)
  }

  pub fn has_children(&self) -> bool {
    self.dom.links(self.index()).first.is_some()
  }

  pub fn has_siblings(&self) -> bool {
    let links = self.dom.links(self.index());
    links.prev.is_some() || links.next.is_some()
  }

  fn relative(&self, index: Option<u32>) -> Option<Node> {
    index.map(|index| Node::new(self.dom.clone(), self.dom.id_at(index)))
  }

  // ---- iterators --------------------------------------------------------

  pub fn children(&self) -> Children {
    Children::new(self)
  }

  pub fn ancestors(&self) -> Ancestors {
    Ancestors::new(self)
  }

  pub fn prev_siblings(&self) -> PrevSiblings {
    PrevSiblings::new(self)
  }

  pub fn next_siblings(&self) -> NextSiblings {
    NextSiblings::new(self)
  }

  pub fn first_children(&self) -> FirstChildren {
    FirstChildren::new(self)
  }

  pub fn last_children(&self) -> LastChildren {
    LastChildren::new(self)
  }

  /// This node and its descendants, in tree order.
  pub fn descendants(&self) -> Descendants {
    Descendants::new(self)
  }

  /// Open/close edges of this subtree, in tree order.
  pub fn traverse(&self) -> Traverse {
    Traverse::new(self)
  }

  // ---- mutation ---------------------------------------------------------

  /// Attaches `node` relative to this node according to `ordering`.
  ///
  /// The node is implicitly detached from its current parent first, so a
  /// node always ends up with at most one parent.
  pub fn attach(&self, node: &Node, ordering: Ordering) -> Result<()> {
    self.check_ordering(ordering)?;
    match ordering {
      Ordering::Append => self.dom.append(self.id, node.id),
      Ordering::Prepend => self.dom.prepend(self.id, node.id),
      Ordering::After => self.dom.insert_after(self.id, node.id),
      Ordering::Before => self.dom.insert_before(self.id, node.id),
    }
  }

  /// Detaches this node from its parent and siblings, keeping its subtree
  /// intact. The node stays in the tree as an orphan.
  pub fn detach(&self) -> Result<()> {
    self.dom.detach(self.id)
  }

  fn check_ordering(&self, ordering: Ordering) -> Result<()> {
    let invalid = self.dom.with_data(self.index(), |data| {
      if data.is_root_kind() {
        matches!(ordering, Ordering::After | Ordering::Before)
      } else {
        data.is_leaf() && matches!(ordering, Ordering::Append | Ordering::Prepend)
      }
    });
    if invalid {
      let kind = self.kind_name();
      return Err(Error::InvalidOrdering(format!(
        "{ordering:?} is not permitted on a {kind} node"
      )));
    }
    Ok(())
  }

  fn kind_name(&self) -> &'static str {
    self.dom.with_data(self.index(), |data| match data {
      NodeData::Document => "Document",
      NodeData::Fragment => "Fragment",
      NodeData::Doctype(_) => "Doctype",
      NodeData::Comment(_) => "Comment",
      NodeData::Text(_) => "Text",
      NodeData::Element(_) => "Element",
      NodeData::ProcessingInstruction(_) => "ProcessingInstruction",
    })
  }

  fn create(&self, data: NodeData, ordering: Ordering) -> Result<Node> {
    // Validate before allocating so a failure leaves the arena untouched.
    self.check_ordering(ordering)?;
    if matches!(ordering, Ordering::After | Ordering::Before)
      && self.dom.links(self.index()).parent.is_none()
    {
      return Err(Error::structural("the anchor node has no parent"));
    }
    let node = self.dom.create_node(data);
    self.attach(&node, ordering)?;
    Ok(node)
  }

  /// Creates an element and attaches it relative to this node.
  pub fn create_element(
    &self,
    name: impl Into<QualName>,
    attrs: impl IntoIterator<Item = Attr>,
    ordering: Ordering,
  ) -> Result<Element> {
    let data = NodeData::Element(ElementData::new(
      name.into(),
      attrs.into_iter().collect(),
    ));
    Ok(Element { node: self.create(data, ordering)? })
  }

  /// Creates a text node and attaches it relative to this node.
  ///
  /// Unlike the parser, this never merges with adjacent text nodes.
  pub fn create_text(
    &self,
    contents: impl Into<StrTendril>,
    ordering: Ordering,
  ) -> Result<Text> {
    let node = self.create(NodeData::Text(contents.into()), ordering)?;
    Ok(Text { node })
  }

  /// Creates a comment and attaches it relative to this node.
  pub fn create_comment(
    &self,
    contents: impl Into<StrTendril>,
    ordering: Ordering,
  ) -> Result<Comment> {
    let node = self.create(NodeData::Comment(contents.into()), ordering)?;
    Ok(Comment { node })
  }

  /// Creates a doctype and attaches it relative to this node.
  pub fn create_doctype(
    &self,
    name: impl Into<StrTendril>,
    public_id: impl Into<StrTendril>,
    system_id: impl Into<StrTendril>,
    ordering: Ordering,
  ) -> Result<Doctype> {
    let data = NodeData::Doctype(DoctypeData {
      name: name.into(),
      public_id: public_id.into(),
      system_id: system_id.into(),
    });
    Ok(Doctype { node: self.create(data, ordering)? })
  }

  /// Creates a processing instruction and attaches it relative to this
  /// node.
  pub fn create_processing_instruction(
    &self,
    target: impl Into<StrTendril>,
    data: impl Into<StrTendril>,
    ordering: Ordering,
  ) -> Result<ProcessingInstruction> {
    let data = NodeData::ProcessingInstruction(ProcessingInstructionData {
      target: target.into(),
      data: data.into(),
    });
    Ok(ProcessingInstruction { node: self.create(data, ordering)? })
  }

  // ---- content ----------------------------------------------------------

  /// Yields the contents of every text node in this subtree, in tree
  /// order (this node included if it is a text node).
  pub fn strings(&self, strip: bool) -> impl Iterator<Item = String> + use<> {
    self.descendants().filter_map(move |node| {
      node.dom.with_data(node.index(), |data| match data {
        NodeData::Text(contents) => Some(if strip {
          contents.trim().to_string()
        } else {
          contents.to_string()
        }),
        _ => None,
      })
    })
  }

  /// Concatenates the contents of every text node in this subtree.
  pub fn text(&self, separator: &str, strip: bool) -> String {
    let mut parts = self.strings(strip);
    let Some(first) = parts.next() else {
      return String::new();
    };
    let mut out = first;
    for part in parts {
      out.push_str(separator);
      out.push_str(&part);
    }
    out
  }

  // ---- selectors --------------------------------------------------------

  /// Elements among this node's descendants matching the selector group,
  /// in document order. `limit == 0` means unlimited; the first `offset`
  /// matches are skipped once, when the iterator is built.
  pub fn select(&self, expr: &str, limit: usize, offset: usize) -> Result<Select> {
    Select::new(self, expr, limit, offset)
  }

  /// The first match of [`select`](Self::select), if any.
  pub fn select_one(&self, expr: &str, offset: usize) -> Result<Option<Element>> {
    let mut matches = Select::new(self, expr, 1, offset)?;
    Ok(matches.next())
  }

  // ---- serialization ----------------------------------------------------

  /// Serializes this subtree. With `markup == None` the rules are chosen
  /// by the dominant namespace of the top-level elements.
  pub fn serialize_bytes(&self, markup: Option<Markup>) -> Vec<u8> {
    serializer::serialize_node(self, markup)
  }

  pub fn serialize(&self) -> String {
    String::from_utf8_lossy(&self.serialize_bytes(None)).into_owned()
  }

  pub fn serialize_html(&self) -> String {
    String::from_utf8_lossy(&self.serialize_bytes(Some(Markup::Html)))
      .into_owned()
  }

  pub fn serialize_xml(&self) -> String {
    String::from_utf8_lossy(&self.serialize_bytes(Some(Markup::Xml)))
      .into_owned()
  }

  // ---- typed views ------------------------------------------------------

  pub fn as_document(&self) -> Option<Document> {
    self.is_document().then(|| Document { node: self.clone() })
  }

  pub fn as_fragment(&self) -> Option<Fragment> {
    self.is_fragment().then(|| Fragment { node: self.clone() })
  }

  pub fn as_doctype(&self) -> Option<Doctype> {
    self.is_doctype().then(|| Doctype { node: self.clone() })
  }

  pub fn as_comment(&self) -> Option<Comment> {
    self.is_comment().then(|| Comment { node: self.clone() })
  }

  pub fn as_text(&self) -> Option<Text> {
    self.is_text().then(|| Text { node: self.clone() })
  }

  pub fn as_element(&self) -> Option<Element> {
    self.is_element().then(|| Element { node: self.clone() })
  }

  pub fn as_processing_instruction(&self) -> Option<ProcessingInstruction> {
    self
      .is_processing_instruction()
      .then(|| ProcessingInstruction { node: self.clone() })
  }
}

impl PartialEq for Node {
  fn eq(&self, other: &Self) -> bool {
    self.dom == other.dom && self.id == other.id
  }
}

impl Eq for Node {}

impl Hash for Node {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.dom.with_data(self.index(), |data| fmt_node_data(f, data))
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.dom.with_data(self.index(), |data| fmt_node_data(f, data))
  }
}

/// Declares a typed view struct wrapping [`Node`].
macro_rules! typed_view {
  ($(#[$doc:meta])* $name:ident) => {
    $(#[$doc])*
    #[derive(Clone, PartialEq, Eq)]
    pub struct $name {
      pub(crate) node: Node,
    }

    impl $name {
      /// The untyped handle for this node.
      pub fn as_node(&self) -> &Node {
        &self.node
      }
    }

    impl Deref for $name {
      type Target = Node;

      fn deref(&self) -> &Node {
        &self.node
      }
    }

    impl From<$name> for Node {
      fn from(view: $name) -> Node {
        view.node
      }
    }

    impl fmt::Debug for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node, f)
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.node, f)
      }
    }
  };
}

typed_view! {
  /// The root of a full document.
  Document
}

typed_view! {
  /// The root of a fragment parse.
  Fragment
}

typed_view! {
  /// A `<!DOCTYPE ...>` node.
  Doctype
}

typed_view! {
  /// A comment node.
  Comment
}

typed_view! {
  /// A text node.
  Text
}

typed_view! {
  /// An element node.
  Element
}

typed_view! {
  /// A processing-instruction node.
  ProcessingInstruction
}

impl Doctype {
  fn with<R>(&self, f: impl FnOnce(&DoctypeData) -> R) -> R {
    self.node.dom.with_data(self.node.index(), |data| match data {
      NodeData::Doctype(doctype) => f(doctype),
      _ => unreachable!("Doctype view over a non-doctype node"),
    })
  }

  fn with_mut<R>(&self, f: impl FnOnce(&mut DoctypeData) -> R) -> R {
    self.node.dom.with_data_mut(self.node.index(), |data| match data {
      NodeData::Doctype(doctype) => f(doctype),
      _ => unreachable!("Doctype view over a non-doctype node"),
    })
  }

  pub fn name(&self) -> StrTendril {
    self.with(|d| d.name.clone())
  }

  pub fn set_name(&self, name: impl Into<StrTendril>) {
    let name = name.into();
    self.with_mut(|d| d.name = name);
  }

  pub fn public_id(&self) -> StrTendril {
    self.with(|d| d.public_id.clone())
  }

  pub fn set_public_id(&self, public_id: impl Into<StrTendril>) {
    let public_id = public_id.into();
    self.with_mut(|d| d.public_id = public_id);
  }

  pub fn system_id(&self) -> StrTendril {
    self.with(|d| d.system_id.clone())
  }

  pub fn set_system_id(&self, system_id: impl Into<StrTendril>) {
    let system_id = system_id.into();
    self.with_mut(|d| d.system_id = system_id);
  }
}

impl Comment {
  pub fn contents(&self) -> StrTendril {
    self.node.dom.with_data(self.node.index(), |data| match data {
      NodeData::Comment(contents) => contents.clone(),
      _ => unreachable!("Comment view over a non-comment node"),
    })
  }

  pub fn set_contents(&self, contents: impl Into<StrTendril>) {
    let contents = contents.into();
    self.node.dom.with_data_mut(self.node.index(), |data| match data {
      NodeData::Comment(slot) => *slot = contents,
      _ => unreachable!("Comment view over a non-comment node"),
    });
  }
}

impl Text {
  pub fn contents(&self) -> StrTendril {
    self.node.dom.with_data(self.node.index(), |data| match data {
      NodeData::Text(contents) => contents.clone(),
      _ => unreachable!("Text view over a non-text node"),
    })
  }

  pub fn set_contents(&self, contents: impl Into<StrTendril>) {
    let contents = contents.into();
    self.node.dom.with_data_mut(self.node.index(), |data| match data {
      NodeData::Text(slot) => *slot = contents,
      _ => unreachable!("Text view over a non-text node"),
    });
  }
}

impl ProcessingInstruction {
  fn with<R>(&self, f: impl FnOnce(&ProcessingInstructionData) -> R) -> R {
    self.node.dom.with_data(self.node.index(), |data| match data {
      NodeData::ProcessingInstruction(pi) => f(pi),
      _ => unreachable!("ProcessingInstruction view over another kind"),
    })
  }

  fn with_mut<R>(&self, f: impl FnOnce(&mut ProcessingInstructionData) -> R) -> R {
    self.node.dom.with_data_mut(self.node.index(), |data| match data {
      NodeData::ProcessingInstruction(pi) => f(pi),
      _ => unreachable!("ProcessingInstruction view over another kind"),
    })
  }

  pub fn target(&self) -> StrTendril {
    self.with(|pi| pi.target.clone())
  }

  pub fn set_target(&self, target: impl Into<StrTendril>) {
    let target = target.into();
    self.with_mut(|pi| pi.target = target);
  }

  pub fn data(&self) -> StrTendril {
    self.with(|pi| pi.data.clone())
  }

  pub fn set_data(&self, data: impl Into<StrTendril>) {
    let data = data.into();
    self.with_mut(|pi| pi.data = data);
  }
}

impl Element {
  fn with<R>(&self, f: impl FnOnce(&ElementData) -> R) -> R {
    self.node.dom.with_data(self.node.index(), |data| match data {
      NodeData::Element(element) => f(element),
      _ => unreachable!("Element view over a non-element node"),
    })
  }

  fn with_mut<R>(&self, f: impl FnOnce(&mut ElementData) -> R) -> R {
    self.node.dom.with_data_mut(self.node.index(), |data| match data {
      NodeData::Element(element) => f(element),
      _ => unreachable!("Element view over a non-element node"),
    })
  }

  pub fn name(&self) -> QualName {
    self.with(|e| e.name.clone())
  }

  pub fn set_name(&self, name: impl Into<QualName>) {
    let name = name.into();
    self.node.dom.register_namespace(&name);
    self.with_mut(|e| e.name = name);
  }

  /// Shared view of the attribute list.
  ///
  /// The guard borrows the tree; drop it before mutating other nodes.
  pub fn attrs(&self) -> Ref<'_, AttrsList> {
    self.node.dom.attrs_ref(self.node.index())
  }

  /// Mutable view of the attribute list. Namespaced attribute keys are
  /// registered in the tree's namespace map when the guard is dropped.
  pub fn attrs_mut(&self) -> AttrsMut<'_> {
    AttrsMut {
      attrs: Some(self.node.dom.attrs_mut_ref(self.node.index())),
      dom: &self.node.dom,
    }
  }

  /// The value of the first `id` attribute.
  pub fn id(&self) -> Option<StrTendril> {
    self.with(|e| e.attrs.id())
  }

  /// The first `class` attribute split on ASCII whitespace.
  pub fn class_list(&self) -> Vec<String> {
    self.with(|e| e.attrs.class_list())
  }

  pub fn template(&self) -> bool {
    self.with(|e| e.template)
  }

  pub fn set_template(&self, template: bool) {
    self.with_mut(|e| e.template = template);
  }

  pub fn mathml_annotation_xml_integration_point(&self) -> bool {
    self.with(|e| e.mathml_annotation_xml_integration_point)
  }

  pub fn set_mathml_annotation_xml_integration_point(&self, value: bool) {
    self.with_mut(|e| e.mathml_annotation_xml_integration_point = value);
  }
}

/// Mutable attribute-list guard returned by [`Element::attrs_mut`].
pub struct AttrsMut<'a> {
  attrs: Option<RefMut<'a, AttrsList>>,
  dom: &'a TreeDom,
}

impl Deref for AttrsMut<'_> {
  type Target = AttrsList;

  fn deref(&self) -> &AttrsList {
    self.attrs.as_ref().expect("attrs guard taken")
  }
}

impl DerefMut for AttrsMut<'_> {
  fn deref_mut(&mut self) -> &mut AttrsList {
    self.attrs.as_mut().expect("attrs guard taken")
  }
}

impl Drop for AttrsMut<'_> {
  fn drop(&mut self) {
    if let Some(attrs) = self.attrs.take() {
      for (key, _) in attrs.iter() {
        self.dom.register_namespace(key);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tree::TreeDom;

  #[test]
  fn ordering_reprs() {
    assert_eq!(Ordering::Append as u8, 0);
    assert_eq!(Ordering::Prepend as u8, 1);
    assert_eq!(Ordering::After as u8, 2);
    assert_eq!(Ordering::Before as u8, 3);
    assert!(matches!(Ordering::try_from(3u8), Ok(Ordering::Before)));
    assert!(Ordering::try_from(4u8).is_err());
  }

  #[test]
  fn document_forbids_sibling_orderings() {
    let dom = TreeDom::new();
    let root = dom.root();

    assert!(matches!(
      root.create_comment("c", Ordering::After),
      Err(Error::InvalidOrdering(_))
    ));
    assert!(matches!(
      root.create_comment("c", Ordering::Before),
      Err(Error::InvalidOrdering(_))
    ));
    assert!(root.create_comment("c", Ordering::Append).is_ok());
  }

  #[test]
  fn leaves_forbid_child_orderings() {
    let dom = TreeDom::new();
    let root = dom.root();
    let text = root.create_text("hello", Ordering::Append).unwrap();

    assert!(matches!(
      text.create_comment("c", Ordering::Append),
      Err(Error::InvalidOrdering(_))
    ));
    assert!(matches!(
      text.create_comment("c", Ordering::Prepend),
      Err(Error::InvalidOrdering(_))
    ));

    // Siblings are fine for leaves.
    let after = text.create_comment("c", Ordering::After).unwrap();
    assert_eq!(text.next_sibling(), Some(after.as_node().clone()));
  }

  #[test]
  fn elements_allow_every_ordering() {
    let dom = TreeDom::new();
    let root = dom.root();
    let div = root
      .create_element("div", AttrsList::new(), Ordering::Append)
      .unwrap();
    div
      .create_element("child", AttrsList::new(), Ordering::Append)
      .unwrap();
    div
      .create_element("first", AttrsList::new(), Ordering::Prepend)
      .unwrap();
    div
      .create_element("next", AttrsList::new(), Ordering::After)
      .unwrap();
    div
      .create_element("prev", AttrsList::new(), Ordering::Before)
      .unwrap();

    let names: Vec<_> = root
      .children()
      .map(|n| n.as_element().unwrap().name().local().to_string())
      .collect();
    assert_eq!(names, ["prev", "div", "next"]);

    let inner: Vec<_> = div
      .children()
      .map(|n| n.as_element().unwrap().name().local().to_string())
      .collect();
    assert_eq!(inner, ["first", "child"]);
  }

  #[test]
  fn create_failures_do_not_grow_the_tree() {
    let dom = TreeDom::new();
    let root = dom.root();
    let before = dom.len();
    assert!(root.create_comment("c", Ordering::After).is_err());
    assert_eq!(dom.len(), before);
  }

  #[test]
  fn attach_validates_ordering_per_kind() {
    let dom = TreeDom::new();
    let root = dom.root();
    let comment = root.create_comment("c", Ordering::Append).unwrap();
    let text = dom.create_node(NodeData::Text("t".into()));

    assert!(matches!(
      comment.attach(&text, Ordering::Append),
      Err(Error::InvalidOrdering(_))
    ));
    comment.attach(&text, Ordering::Before).unwrap();
    assert_eq!(root.children().count(), 2);
  }

  #[test]
  fn public_text_creation_never_coalesces() {
    let dom = TreeDom::new();
    let root = dom.root();
    let div = root
      .create_element("div", AttrsList::new(), Ordering::Append)
      .unwrap();
    div.create_text("a", Ordering::Append).unwrap();
    div.create_text("b", Ordering::Append).unwrap();

    assert_eq!(div.children().count(), 2);
    assert_eq!(div.text("", false), "ab");
  }

  #[test]
  fn text_with_separator_and_strip() {
    let dom = TreeDom::new();
    let root = dom.root();
    let div = root
      .create_element("div", AttrsList::new(), Ordering::Append)
      .unwrap();
    div.create_text("  a  ", Ordering::Append).unwrap();
    let span = div
      .create_element("span", AttrsList::new(), Ordering::Append)
      .unwrap();
    span.create_text("b", Ordering::Append).unwrap();

    assert_eq!(div.text("", false), "  a  b");
    assert_eq!(div.text(" ", true), "a b");

    // Property: text() equals the concatenation of strings().
    let joined: String = div.strings(false).collect();
    assert_eq!(div.text("", false), joined);
  }

  #[test]
  fn payload_setters_round_trip() {
    let dom = TreeDom::new();
    let root = dom.root();

    let doctype = root.create_doctype("html", "", "", Ordering::Append).unwrap();
    doctype.set_name("svg");
    assert_eq!(&doctype.name()[..], "svg");

    let text = root.create_text("a", Ordering::Append).unwrap();
    text.set_contents("b");
    assert_eq!(&text.contents()[..], "b");

    let comment = root.create_comment("x", Ordering::Append).unwrap();
    comment.set_contents("y");
    assert_eq!(&comment.contents()[..], "y");

    let pi = root
      .create_processing_instruction("target", "data", Ordering::Append)
      .unwrap();
    pi.set_data("newdata");
    assert_eq!(&pi.target()[..], "target");
    assert_eq!(&pi.data()[..], "newdata");
  }

  #[test]
  fn element_attrs_guards() {
    let dom = TreeDom::new();
    let root = dom.root();
    let el = root
      .create_element("div", AttrsList::new(), Ordering::Append)
      .unwrap();

    {
      let mut attrs = el.attrs_mut();
      attrs.push("id", "main");
      attrs.push(
        QualName::with_prefix("href", "http://www.w3.org/1999/xlink", Some("xlink")),
        "#x",
      );
    }
    assert_eq!(el.attrs().len(), 2);
    assert_eq!(el.id().as_deref(), Some("main"));

    // The prefixed key was registered on the tree.
    assert_eq!(
      dom.namespaces().get("xlink").map(String::as_str),
      Some("http://www.w3.org/1999/xlink")
    );
  }

  #[test]
  fn set_name_registers_namespaces() {
    let dom = TreeDom::new();
    let el = dom
      .root()
      .create_element("div", AttrsList::new(), Ordering::Append)
      .unwrap();
    el.set_name(QualName::with_prefix("child", "http://namespace1/", Some("ns1")));
    assert_eq!(
      dom.namespaces().get("ns1").map(String::as_str),
      Some("http://namespace1/")
    );
    assert_eq!(el.name().to_string(), "ns1:child");
  }
}
