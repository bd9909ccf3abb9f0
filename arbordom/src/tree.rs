//! The arena that owns every node of a document.
//!
//! A [`TreeDom`] is a densely packed vector of node slots plus the
//! parent/sibling/child links between them. Handles ([`NodeId`]) are
//! small copyable indexes carrying the identity token of the tree that
//! issued them, so resolving an id against the wrong (or an already
//! dropped) tree is a defined failure rather than undefined nonsense.
//!
//! Slots are never reclaimed while the tree is alive: detached nodes stay
//! allocated as orphans and memory is released only when the whole tree
//! is dropped. That keeps every id stable across arbitrary mutation.

use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering as AtomicOrdering;

use derive_more::with_trait::IsVariant;
use indexmap::IndexMap;
use tendril::StrTendril;

use crate::attrs::AttrsList;
use crate::errors::Error;
use crate::errors::Result;
use crate::name::QualName;
use crate::node::Node;

/// Source of per-tree identity tokens.
static NEXT_TREE_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Doctype payload: `<!DOCTYPE name PUBLIC "public_id" "system_id">`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DoctypeData {
  pub name: StrTendril,
  pub public_id: StrTendril,
  pub system_id: StrTendril,
}

/// Processing-instruction payload: `<?target data?>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessingInstructionData {
  pub target: StrTendril,
  pub data: StrTendril,
}

/// Element payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementData {
  pub name: QualName,
  pub attrs: AttrsList,
  /// Whether this is an HTML `<template>` element.
  pub template: bool,
  /// Whether the element is a MathML `<annotation-xml>` HTML integration
  /// point.
  pub mathml_annotation_xml_integration_point: bool,
}

impl ElementData {
  pub fn new(name: QualName, attrs: AttrsList) -> Self {
    ElementData {
      name,
      attrs,
      template: false,
      mathml_annotation_xml_integration_point: false,
    }
  }
}

/// The kind and payload of a node.
#[derive(Clone, Debug, PartialEq, IsVariant)]
pub enum NodeData {
  /// The root of a full document. One per tree, never a child.
  Document,

  /// The root of a fragment parse. Same restrictions as `Document`.
  Fragment,

  /// A `<!DOCTYPE ...>` declaration.
  Doctype(DoctypeData),

  /// A comment.
  Comment(StrTendril),

  /// Character data.
  Text(StrTendril),

  /// An element with attributes.
  Element(ElementData),

  /// A processing instruction.
  ProcessingInstruction(ProcessingInstructionData),
}

impl NodeData {
  /// Leaf kinds can never have children.
  pub fn is_leaf(&self) -> bool {
    matches!(
      self,
      NodeData::Doctype(_)
        | NodeData::Comment(_)
        | NodeData::Text(_)
        | NodeData::ProcessingInstruction(_)
    )
  }

  /// Root kinds can never have a parent or siblings.
  pub fn is_root_kind(&self) -> bool {
    matches!(self, NodeData::Document | NodeData::Fragment)
  }
}

/// A stable handle to a node inside a specific [`TreeDom`].
///
/// Two ids compare equal iff they refer to the same node of the same
/// tree. Resolving an id against a tree it does not belong to (including
/// trees that have since been dropped) fails lookups and navigation with
/// [`Error::DanglingHandle`]; *attaching* a node that belongs to a
/// different tree is part of the mutation contract and fails with a
/// structural error instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
  pub(crate) token: u64,
  pub(crate) index: u32,
}

/// Links + payload stored per arena slot.
#[derive(Debug)]
struct Slot {
  parent: Option<u32>,
  prev: Option<u32>,
  next: Option<u32>,
  first: Option<u32>,
  last: Option<u32>,
  data: NodeData,
}

impl Slot {
  fn orphan(data: NodeData) -> Self {
    Slot { parent: None, prev: None, next: None, first: None, last: None, data }
  }
}

/// Copy of a slot's links, taken under a single borrow.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Links {
  pub parent: Option<u32>,
  pub prev: Option<u32>,
  pub next: Option<u32>,
  pub first: Option<u32>,
  pub last: Option<u32>,
}

pub(crate) struct TreeInner {
  token: u64,
  nodes: RefCell<Vec<Slot>>,
  namespaces: RefCell<IndexMap<String, String>>,
}

/// A tree structure specially designed for HTML and XML documents.
///
/// The memory consumed by a `TreeDom` grows with the number of nodes
/// created in it. It is never reduced before the tree itself is dropped;
/// detached nodes simply become orphans inside the same arena.
#[derive(Clone)]
pub struct TreeDom {
  pub(crate) inner: Rc<TreeInner>,
}

impl TreeDom {
  fn with_root(data: NodeData) -> Self {
    let token = NEXT_TREE_TOKEN.fetch_add(1, AtomicOrdering::Relaxed);
    TreeDom {
      inner: Rc::new(TreeInner {
        token,
        nodes: RefCell::new(vec![Slot::orphan(data)]),
        namespaces: RefCell::new(IndexMap::new()),
      }),
    }
  }

  /// An empty tree rooted at a `Document` node.
  pub fn new() -> Self {
    TreeDom::with_root(NodeData::Document)
  }

  /// An empty tree rooted at a `Fragment` node.
  pub fn new_fragment() -> Self {
    TreeDom::with_root(NodeData::Fragment)
  }

  /// The root node. Its kind is always `Document` or `Fragment`.
  pub fn root(&self) -> Node {
    Node::new(self.clone(), self.id_at(0))
  }

  /// Total number of nodes in the tree, orphans included.
  pub fn len(&self) -> usize {
    self.inner.nodes.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    false // there is always a root
  }

  /// The prefix -> namespace-URI mapping collected while attaching
  /// qualified names to elements of this tree.
  pub fn namespaces(&self) -> IndexMap<String, String> {
    self.inner.namespaces.borrow().clone()
  }

  /// Resolves a raw id back into a [`Node`] handle.
  pub fn get(&self, id: NodeId) -> Result<Node> {
    self.idx(id)?;
    Ok(Node::new(self.clone(), id))
  }

  /// Creates an orphan node owned by this tree.
  pub fn create_node(&self, data: NodeData) -> Node {
    if let NodeData::Element(element) = &data {
      self.register_element_namespaces(element);
    }
    let index = self.alloc(data);
    Node::new(self.clone(), self.id_at(index))
  }

  /// Iterates every node in insertion order, orphans included.
  pub fn nodes(&self) -> Nodes {
    Nodes { dom: self.clone(), index: 0 }
  }

  /// Shorthand for `self.root().select(expr, limit, offset)`.
  pub fn select(
    &self,
    expr: &str,
    limit: usize,
    offset: usize,
  ) -> Result<crate::select::Select> {
    self.root().select(expr, limit, offset)
  }

  /// Shorthand for `self.root().select_one(expr, offset)`.
  pub fn select_one(
    &self,
    expr: &str,
    offset: usize,
  ) -> Result<Option<crate::node::Element>> {
    self.root().select_one(expr, offset)
  }

  /// Adds `child` as the last child of `parent`.
  pub fn append(&self, parent: NodeId, child: NodeId) -> Result<()> {
    let (parent, child) = self.check_attach(parent, child)?;
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, child);
    link_last(&mut nodes, parent, child);
    Ok(())
  }

  /// Adds `child` as the first child of `parent`.
  pub fn prepend(&self, parent: NodeId, child: NodeId) -> Result<()> {
    let (parent, child) = self.check_attach(parent, child)?;
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, child);
    link_first(&mut nodes, parent, child);
    Ok(())
  }

  /// Places `new` as the sibling immediately before `anchor`.
  pub fn insert_before(&self, anchor: NodeId, new: NodeId) -> Result<()> {
    let (anchor, new) = self.check_sibling_insert(anchor, new)?;
    if anchor == new {
      return Ok(());
    }
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, new);
    link_before(&mut nodes, anchor, new);
    Ok(())
  }

  /// Places `new` as the sibling immediately after `anchor`.
  pub fn insert_after(&self, anchor: NodeId, new: NodeId) -> Result<()> {
    let (anchor, new) = self.check_sibling_insert(anchor, new)?;
    if anchor == new {
      return Ok(());
    }
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, new);
    link_after(&mut nodes, anchor, new);
    Ok(())
  }

  /// Removes `node` from its parent and siblings. Its subtree stays
  /// intact; the node becomes an orphan root inside the same tree.
  pub fn detach(&self, node: NodeId) -> Result<()> {
    let index = self.idx(node)?;
    {
      let nodes = self.inner.nodes.borrow();
      if nodes[index as usize].data.is_root_kind() {
        return Err(Error::structural("cannot detach a Document or Fragment root"));
      }
    }
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, index);
    Ok(())
  }

  /// Moves all children of `from` to the end of `to`'s child list,
  /// preserving their order.
  pub fn reparent_children(&self, from: NodeId, to: NodeId) -> Result<()> {
    let from = self.attaching_idx(from)?;
    let to = self.attaching_idx(to)?;
    if from == to {
      return Ok(());
    }
    {
      let nodes = self.inner.nodes.borrow();
      if is_ancestor_or_self(&nodes, from, to) {
        return Err(Error::structural(
          "cannot reparent children into their own subtree",
        ));
      }
    }
    let mut nodes = self.inner.nodes.borrow_mut();
    let mut child = nodes[from as usize].first;
    while let Some(c) = child {
      let next = nodes[c as usize].next;
      unlink(&mut nodes, c);
      link_last(&mut nodes, to, c);
      child = next;
    }
    Ok(())
  }

  // ---- crate-internal plumbing ------------------------------------------

  pub(crate) fn id_at(&self, index: u32) -> NodeId {
    NodeId { token: self.inner.token, index }
  }

  /// Validates that `id` belongs to this tree and returns its slot index.
  ///
  /// This is the lookup/navigation path; a foreign or stale id is a
  /// dangling handle here.
  pub(crate) fn idx(&self, id: NodeId) -> Result<u32> {
    if id.token != self.inner.token
      || (id.index as usize) >= self.inner.nodes.borrow().len()
    {
      return Err(Error::DanglingHandle);
    }
    Ok(id.index)
  }

  /// Like [`idx`](Self::idx), but for nodes taking part in an attachment:
  /// a node from another tree fails the mutation contract with a
  /// structural error, not a dangling handle.
  fn attaching_idx(&self, id: NodeId) -> Result<u32> {
    if id.token != self.inner.token {
      return Err(Error::structural("the node belongs to a different tree"));
    }
    self.idx(id)
  }

  pub(crate) fn alloc(&self, data: NodeData) -> u32 {
    let mut nodes = self.inner.nodes.borrow_mut();
    let index = u32::try_from(nodes.len()).expect("tree node index overflow");
    nodes.push(Slot::orphan(data));
    index
  }

  pub(crate) fn links(&self, index: u32) -> Links {
    let nodes = self.inner.nodes.borrow();
    let slot = &nodes[index as usize];
    Links {
      parent: slot.parent,
      prev: slot.prev,
      next: slot.next,
      first: slot.first,
      last: slot.last,
    }
  }

  pub(crate) fn with_data<R>(
    &self,
    index: u32,
    f: impl FnOnce(&NodeData) -> R,
  ) -> R {
    let nodes = self.inner.nodes.borrow();
    f(&nodes[index as usize].data)
  }

  pub(crate) fn with_data_mut<R>(
    &self,
    index: u32,
    f: impl FnOnce(&mut NodeData) -> R,
  ) -> R {
    let mut nodes = self.inner.nodes.borrow_mut();
    f(&mut nodes[index as usize].data)
  }

  /// Shared view of a slot's payload.
  pub(crate) fn data_ref(&self, index: u32) -> Ref<'_, NodeData> {
    Ref::map(self.inner.nodes.borrow(), |nodes| &nodes[index as usize].data)
  }

  /// Shared view of an element's attribute list.
  ///
  /// Panics if the slot does not hold an element; callers go through the
  /// `Element` view, which guarantees the kind.
  pub(crate) fn attrs_ref(&self, index: u32) -> Ref<'_, AttrsList> {
    Ref::map(self.inner.nodes.borrow(), |nodes| {
      match &nodes[index as usize].data {
        NodeData::Element(element) => &element.attrs,
        data => panic!("not an element: {data:?}"),
      }
    })
  }

  /// Mutable view of an element's attribute list. Same panic contract as
  /// [`attrs_ref`](Self::attrs_ref).
  pub(crate) fn attrs_mut_ref(&self, index: u32) -> RefMut<'_, AttrsList> {
    RefMut::map(self.inner.nodes.borrow_mut(), |nodes| {
      match &mut nodes[index as usize].data {
        NodeData::Element(element) => &mut element.attrs,
        data => panic!("not an element: {data:?}"),
      }
    })
  }

  /// Unchecked variants used by the parser sink, which only ever holds
  /// ids it created itself.
  pub(crate) fn append_unchecked(&self, parent: u32, child: u32) {
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, child);
    link_last(&mut nodes, parent, child);
  }

  pub(crate) fn insert_before_unchecked(&self, anchor: u32, new: u32) {
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, new);
    link_before(&mut nodes, anchor, new);
  }

  pub(crate) fn detach_unchecked(&self, index: u32) {
    let mut nodes = self.inner.nodes.borrow_mut();
    unlink(&mut nodes, index);
  }

  pub(crate) fn reparent_children_unchecked(&self, from: u32, to: u32) {
    let mut nodes = self.inner.nodes.borrow_mut();
    let mut child = nodes[from as usize].first;
    while let Some(c) = child {
      let next = nodes[c as usize].next;
      unlink(&mut nodes, c);
      link_last(&mut nodes, to, c);
      child = next;
    }
  }

  /// Records `prefix -> namespace` when a name carries both.
  pub(crate) fn register_namespace(&self, name: &QualName) {
    if let Some(prefix) = name.prefix() {
      let ns = name.namespace();
      if !prefix.is_empty() && !ns.is_empty() {
        self
          .inner
          .namespaces
          .borrow_mut()
          .insert(prefix.to_string(), ns.to_string());
      }
    }
  }

  pub(crate) fn register_element_namespaces(&self, element: &ElementData) {
    self.register_namespace(&element.name);
    for (key, _) in element.attrs.iter() {
      self.register_namespace(key);
    }
  }

  fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<(u32, u32)> {
    let parent = self.idx(parent)?;
    let child = self.attaching_idx(child)?;
    let nodes = self.inner.nodes.borrow();
    if nodes[child as usize].data.is_root_kind() {
      return Err(Error::structural(
        "a Document or Fragment node cannot become a child",
      ));
    }
    if is_ancestor_or_self(&nodes, child, parent) {
      return Err(Error::structural("attachment would create a cycle"));
    }
    Ok((parent, child))
  }

  fn check_sibling_insert(&self, anchor: NodeId, new: NodeId) -> Result<(u32, u32)> {
    let anchor = self.idx(anchor)?;
    let new = self.attaching_idx(new)?;
    let nodes = self.inner.nodes.borrow();
    if nodes[new as usize].data.is_root_kind() {
      return Err(Error::structural(
        "a Document or Fragment node cannot become a sibling",
      ));
    }
    let parent = nodes[anchor as usize]
      .parent
      .ok_or_else(|| Error::structural("the anchor node has no parent"))?;
    if is_ancestor_or_self(&nodes, new, parent) {
      return Err(Error::structural("attachment would create a cycle"));
    }
    Ok((anchor, new))
  }
}

impl Default for TreeDom {
  fn default() -> Self {
    TreeDom::new()
  }
}

/// Trees are equal only to themselves.
impl PartialEq for TreeDom {
  fn eq(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.inner, &other.inner)
  }
}

impl Eq for TreeDom {}

impl fmt::Debug for TreeDom {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "TreeDom(len={}, namespaces={:?})",
      self.len(),
      self.inner.namespaces.borrow()
    )
  }
}

/// Indent-prints the tree reachable from the root.
impl fmt::Display for TreeDom {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let nodes = self.inner.nodes.borrow();
    let mut stack: Vec<(u32, usize)> = vec![(0, 0)];
    let mut first = true;
    while let Some((index, depth)) = stack.pop() {
      if !first {
        writeln!(f)?;
      }
      first = false;
      for _ in 0..depth {
        write!(f, "  ")?;
      }
      fmt_node_data(f, &nodes[index as usize].data)?;

      let mut children = Vec::new();
      let mut child = nodes[index as usize].first;
      while let Some(c) = child {
        children.push((c, depth + 1));
        child = nodes[c as usize].next;
      }
      stack.extend(children.into_iter().rev());
    }
    Ok(())
  }
}

pub(crate) fn fmt_node_data(
  f: &mut fmt::Formatter<'_>,
  data: &NodeData,
) -> fmt::Result {
  match data {
    NodeData::Document => write!(f, "Document"),
    NodeData::Fragment => write!(f, "Fragment"),
    NodeData::Doctype(doctype) => write!(f, "<!DOCTYPE {}>", doctype.name),
    NodeData::Comment(contents) => write!(f, "<!-- {} -->", contents),
    NodeData::Text(contents) => write!(f, "{:?}", &contents[..]),
    NodeData::Element(element) => {
      write!(f, "<{}{}>", element.name, element.attrs)
    }
    NodeData::ProcessingInstruction(pi) => {
      write!(f, "<?{} {}?>", pi.target, pi.data)
    }
  }
}

/// Removes `index` from its parent's child list and sibling chain.
fn unlink(nodes: &mut [Slot], index: u32) {
  let (parent, prev, next) = {
    let slot = &nodes[index as usize];
    (slot.parent, slot.prev, slot.next)
  };
  match prev {
    Some(prev) => nodes[prev as usize].next = next,
    None => {
      if let Some(parent) = parent {
        nodes[parent as usize].first = next;
      }
    }
  }
  match next {
    Some(next) => nodes[next as usize].prev = prev,
    None => {
      if let Some(parent) = parent {
        nodes[parent as usize].last = prev;
      }
    }
  }
  let slot = &mut nodes[index as usize];
  slot.parent = None;
  slot.prev = None;
  slot.next = None;
}

/// Links an unlinked `child` as the last child of `parent`.
fn link_last(nodes: &mut [Slot], parent: u32, child: u32) {
  nodes[child as usize].parent = Some(parent);
  match nodes[parent as usize].last {
    Some(last) => {
      nodes[last as usize].next = Some(child);
      nodes[child as usize].prev = Some(last);
    }
    None => nodes[parent as usize].first = Some(child),
  }
  nodes[parent as usize].last = Some(child);
}

/// Links an unlinked `child` as the first child of `parent`.
fn link_first(nodes: &mut [Slot], parent: u32, child: u32) {
  nodes[child as usize].parent = Some(parent);
  match nodes[parent as usize].first {
    Some(first) => {
      nodes[first as usize].prev = Some(child);
      nodes[child as usize].next = Some(first);
    }
    None => nodes[parent as usize].last = Some(child),
  }
  nodes[parent as usize].first = Some(child);
}

/// Links an unlinked `new` immediately before `anchor`.
fn link_before(nodes: &mut [Slot], anchor: u32, new: u32) {
  let parent = nodes[anchor as usize].parent;
  let prev = nodes[anchor as usize].prev;
  nodes[new as usize].parent = parent;
  nodes[new as usize].next = Some(anchor);
  nodes[new as usize].prev = prev;
  nodes[anchor as usize].prev = Some(new);
  match prev {
    Some(prev) => nodes[prev as usize].next = Some(new),
    None => {
      if let Some(parent) = parent {
        nodes[parent as usize].first = Some(new);
      }
    }
  }
}

/// Links an unlinked `new` immediately after `anchor`.
fn link_after(nodes: &mut [Slot], anchor: u32, new: u32) {
  let parent = nodes[anchor as usize].parent;
  let next = nodes[anchor as usize].next;
  nodes[new as usize].parent = parent;
  nodes[new as usize].prev = Some(anchor);
  nodes[new as usize].next = next;
  nodes[anchor as usize].next = Some(new);
  match next {
    Some(next) => nodes[next as usize].prev = Some(new),
    None => {
      if let Some(parent) = parent {
        nodes[parent as usize].last = Some(new);
      }
    }
  }
}

fn is_ancestor_or_self(nodes: &[Slot], ancestor: u32, node: u32) -> bool {
  let mut current = Some(node);
  while let Some(index) = current {
    if index == ancestor {
      return true;
    }
    current = nodes[index as usize].parent;
  }
  false
}

/// Iterator over all nodes of a tree in insertion order.
pub struct Nodes {
  dom: TreeDom,
  index: u32,
}

impl Iterator for Nodes {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    if (self.index as usize) >= self.dom.len() {
      return None;
    }
    let node = Node::new(self.dom.clone(), self.dom.id_at(self.index));
    self.index += 1;
    Some(node)
  }
}
