//! Node iterators.
//!
//! All iterators here are *fresh objects* that re-read the tree's links on
//! every step instead of snapshotting them up front. That makes them
//! tolerant of mutation in parts of the tree they have not visited yet;
//! deleting a node that was already yielded is always safe.

use crate::node::Node;

/// An iterator over the children of a node, in order.
#[derive(Clone, Debug)]
pub struct Children {
  next: Option<Node>,
}

impl Children {
  pub(crate) fn new(node: &Node) -> Self {
    Children { next: node.first_child() }
  }
}

impl Iterator for Children {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    let node = self.next.take()?;
    self.next = node.next_sibling();
    Some(node)
  }
}

/// An iterator over the ancestors of a node, from the parent upwards.
#[derive(Clone, Debug)]
pub struct Ancestors {
  next: Option<Node>,
}

impl Ancestors {
  pub(crate) fn new(node: &Node) -> Self {
    Ancestors { next: node.parent() }
  }
}

impl Iterator for Ancestors {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    let node = self.next.take()?;
    self.next = node.parent();
    Some(node)
  }
}

/// An iterator over the siblings before a node, nearest first.
#[derive(Clone, Debug)]
pub struct PrevSiblings {
  next: Option<Node>,
}

impl PrevSiblings {
  pub(crate) fn new(node: &Node) -> Self {
    PrevSiblings { next: node.prev_sibling() }
  }
}

impl Iterator for PrevSiblings {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    let node = self.next.take()?;
    self.next = node.prev_sibling();
    Some(node)
  }
}

/// An iterator over the siblings after a node, nearest first.
#[derive(Clone, Debug)]
pub struct NextSiblings {
  next: Option<Node>,
}

impl NextSiblings {
  pub(crate) fn new(node: &Node) -> Self {
    NextSiblings { next: node.next_sibling() }
  }
}

impl Iterator for NextSiblings {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    let node = self.next.take()?;
    self.next = node.next_sibling();
    Some(node)
  }
}

/// An iterator following the `first_child` chain downwards.
#[derive(Clone, Debug)]
pub struct FirstChildren {
  next: Option<Node>,
}

impl FirstChildren {
  pub(crate) fn new(node: &Node) -> Self {
    FirstChildren { next: node.first_child() }
  }
}

impl Iterator for FirstChildren {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    let node = self.next.take()?;
    self.next = node.first_child();
    Some(node)
  }
}

/// An iterator following the `last_child` chain downwards.
#[derive(Clone, Debug)]
pub struct LastChildren {
  next: Option<Node>,
}

impl LastChildren {
  pub(crate) fn new(node: &Node) -> Self {
    LastChildren { next: node.last_child() }
  }
}

impl Iterator for LastChildren {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    let node = self.next.take()?;
    self.next = node.last_child();
    Some(node)
  }
}

/// Marks the open or close edge of a node during traversal.
///
/// In HTML or XML terms, `Open` corresponds to an opening tag like
/// `<div>` and `Close` to the matching `</div>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edge {
  Open(Node),
  Close(Node),
}

impl Edge {
  pub fn node(&self) -> &Node {
    match self {
      Edge::Open(node) | Edge::Close(node) => node,
    }
  }

  pub fn is_open(&self) -> bool {
    matches!(self, Edge::Open(_))
  }

  pub fn is_close(&self) -> bool {
    matches!(self, Edge::Close(_))
  }
}

/// An iterator over the open and close edges of a subtree, in tree order.
///
/// The subtree root itself is included: its `Open` edge is yielded first
/// and its `Close` edge last.
#[derive(Clone, Debug)]
pub struct Traverse {
  root: Node,
  next: Option<Edge>,
}

impl Traverse {
  pub(crate) fn new(node: &Node) -> Self {
    Traverse { root: node.clone(), next: Some(Edge::Open(node.clone())) }
  }
}

impl Iterator for Traverse {
  type Item = Edge;

  fn next(&mut self) -> Option<Edge> {
    let edge = self.next.take()?;
    self.next = match &edge {
      Edge::Open(node) => match node.first_child() {
        Some(child) => Some(Edge::Open(child)),
        None => Some(Edge::Close(node.clone())),
      },
      Edge::Close(node) => {
        if *node == self.root {
          None
        } else {
          match node.next_sibling() {
            Some(sibling) => Some(Edge::Open(sibling)),
            None => node.parent().map(Edge::Close),
          }
        }
      }
    };
    Some(edge)
  }
}

/// An iterator over a node and its descendants, in tree order (parents
/// before their descendants).
///
/// This is the `Edge::Open` half of [`Traverse`].
#[derive(Clone, Debug)]
pub struct Descendants(Traverse);

impl Descendants {
  pub(crate) fn new(node: &Node) -> Self {
    Descendants(Traverse::new(node))
  }
}

impl Iterator for Descendants {
  type Item = Node;

  fn next(&mut self) -> Option<Node> {
    loop {
      match self.0.next()? {
        Edge::Open(node) => return Some(node),
        Edge::Close(_) => {}
      }
    }
  }
}
