// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `TreeSink` bridging the tokenizers to the arena.
//!
//! Both `html5ever`'s HTML5 tree builder and `xml5ever`'s XML builder
//! drive the same [`Sink`]: every callback translates into one of the
//! arena's mutation primitives. Text is coalesced with adjacent text
//! nodes *only* on this path, per the HTML5 tree-construction rules; the
//! public `create_text` API never merges.
//!
//! The sink surface is crate-private: callers interact with parsing
//! through [`Parser`](crate::Parser), [`Html`](crate::Html) and
//! [`Xml`](crate::Xml).

use std::borrow::Cow;
use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeSet;

use html5ever::tendril::StrTendril;
use html5ever::tree_builder::ElemName;
use html5ever::tree_builder::ElementFlags;
use html5ever::tree_builder::NodeOrText;
use html5ever::tree_builder::TreeSink;
use html5ever::Attribute;
use markup5ever::interface::QuirksMode as ServoQuirksMode;
use markup5ever::LocalName;
use markup5ever::Namespace;

use crate::attrs::AttrsList;
use crate::name::QualName;
use crate::tree::DoctypeData;
use crate::tree::ElementData;
use crate::tree::NodeData;
use crate::tree::NodeId;
use crate::tree::ProcessingInstructionData;
use crate::tree::TreeDom;

/// Owned element-name view handed back to the tree builder.
///
/// Handles are arena indexes, so `elem_name` cannot borrow a `QualName`
/// out of the tree the way an `Rc`-based DOM can.
#[derive(Debug)]
pub(crate) struct OwnedElemName {
  ns: Namespace,
  local: LocalName,
}

impl ElemName for OwnedElemName {
  fn ns(&self) -> &Namespace {
    &self.ns
  }

  fn local_name(&self) -> &LocalName {
    &self.local
  }
}

/// The tree-construction sink; the result of parsing.
pub(crate) struct Sink {
  /// The tree under construction.
  pub dom: TreeDom,

  /// Errors reported by the tokenizer and tree builder.
  pub errors: RefCell<Vec<Cow<'static, str>>>,

  /// The document's quirks mode.
  pub quirks_mode: Cell<ServoQuirksMode>,

  /// Tokenizer line number, updated as input is consumed.
  pub line: Cell<u64>,
}

impl Sink {
  pub fn new_document() -> Self {
    Sink {
      dom: TreeDom::new(),
      errors: RefCell::new(Vec::new()),
      quirks_mode: Cell::new(ServoQuirksMode::NoQuirks),
      line: Cell::new(1),
    }
  }

  pub fn new_fragment() -> Self {
    Sink {
      dom: TreeDom::new_fragment(),
      errors: RefCell::new(Vec::new()),
      quirks_mode: Cell::new(ServoQuirksMode::NoQuirks),
      line: Cell::new(1),
    }
  }

  /// Appends `text` to the node at `index` if it is a text node.
  fn append_to_existing_text(&self, index: u32, text: &str) -> bool {
    self.dom.with_data_mut(index, |data| match data {
      NodeData::Text(contents) => {
        contents.push_slice(text);
        true
      }
      _ => false,
    })
  }

  fn new_text_node(&self, text: StrTendril) -> u32 {
    self.dom.alloc(NodeData::Text(text))
  }
}

impl TreeSink for Sink {
  type Output = Self;
  type Handle = NodeId;
  type ElemName<'a>
    = OwnedElemName
  where
    Self: 'a;

  fn finish(self) -> Self {
    self
  }

  fn parse_error(&self, msg: Cow<'static, str>) {
    self.errors.borrow_mut().push(msg);
  }

  fn get_document(&self) -> NodeId {
    self.dom.id_at(0)
  }

  fn get_template_contents(&self, target: &NodeId) -> NodeId {
    // Template contents are modelled as ordinary children; the element
    // carries a `template` flag instead of a separate fragment.
    *target
  }

  fn set_quirks_mode(&self, mode: ServoQuirksMode) {
    self.quirks_mode.set(mode);
  }

  fn set_current_line(&self, line: u64) {
    self.line.set(line);
  }

  fn same_node(&self, x: &NodeId, y: &NodeId) -> bool {
    x == y
  }

  fn elem_name<'a>(&'a self, target: &'a NodeId) -> OwnedElemName {
    self.dom.with_data(target.index, |data| match data {
      NodeData::Element(element) => OwnedElemName {
        ns: element.name.namespace().clone(),
        local: element.name.local().clone(),
      },
      data => panic!("not an element: {data:?}"),
    })
  }

  fn create_element(
    &self,
    name: html5ever::QualName,
    attrs: Vec<Attribute>,
    flags: ElementFlags,
  ) -> NodeId {
    let element = ElementData {
      name: QualName::from(name),
      attrs: attrs
        .into_iter()
        .map(|attr| (QualName::from(attr.name), attr.value))
        .collect::<AttrsList>(),
      template: flags.template,
      mathml_annotation_xml_integration_point: flags
        .mathml_annotation_xml_integration_point,
    };
    self.dom.register_element_namespaces(&element);
    let index = self.dom.alloc(NodeData::Element(element));
    self.dom.id_at(index)
  }

  fn create_comment(&self, contents: StrTendril) -> NodeId {
    let index = self.dom.alloc(NodeData::Comment(contents));
    self.dom.id_at(index)
  }

  fn create_pi(&self, target: StrTendril, data: StrTendril) -> NodeId {
    let index = self
      .dom
      .alloc(NodeData::ProcessingInstruction(ProcessingInstructionData {
        target,
        data,
      }));
    self.dom.id_at(index)
  }

  fn append(&self, parent: &NodeId, child: NodeOrText<NodeId>) {
    match child {
      NodeOrText::AppendText(text) => {
        // Append to an existing Text node if we have one.
        if let Some(last) = self.dom.links(parent.index).last {
          if self.append_to_existing_text(last, &text) {
            return;
          }
        }
        let index = self.new_text_node(text);
        self.dom.append_unchecked(parent.index, index);
      }
      NodeOrText::AppendNode(node) => {
        self.dom.append_unchecked(parent.index, node.index);
      }
    }
  }

  fn append_before_sibling(&self, sibling: &NodeId, child: NodeOrText<NodeId>) {
    let index = match child {
      NodeOrText::AppendText(text) => {
        // Look for a text node immediately before the insertion point.
        if let Some(prev) = self.dom.links(sibling.index).prev {
          if self.append_to_existing_text(prev, &text) {
            return;
          }
        }
        // The tree builder promises we won't have a text node after
        // the insertion point.
        self.new_text_node(text)
      }
      NodeOrText::AppendNode(node) => node.index,
    };
    self.dom.insert_before_unchecked(sibling.index, index);
  }

  fn append_based_on_parent_node(
    &self,
    element: &NodeId,
    prev_element: &NodeId,
    child: NodeOrText<NodeId>,
  ) {
    if self.dom.links(element.index).parent.is_some() {
      self.append_before_sibling(element, child);
    } else {
      self.append(prev_element, child);
    }
  }

  fn append_doctype_to_document(
    &self,
    name: StrTendril,
    public_id: StrTendril,
    system_id: StrTendril,
  ) {
    let index = self
      .dom
      .alloc(NodeData::Doctype(DoctypeData { name, public_id, system_id }));
    self.dom.append_unchecked(0, index);
  }

  fn add_attrs_if_missing(&self, target: &NodeId, attrs: Vec<Attribute>) {
    let added: Vec<QualName> =
      self.dom.with_data_mut(target.index, |data| match data {
        NodeData::Element(element) => {
          let existing = element
            .attrs
            .iter()
            .map(|(key, _)| key.clone())
            .collect::<BTreeSet<_>>();
          let mut added = Vec::new();
          for attr in attrs {
            let key = QualName::from(attr.name);
            if !existing.contains(&key) {
              added.push(key.clone());
              element.attrs.push(key, attr.value);
            }
          }
          added
        }
        data => panic!("not an element: {data:?}"),
      });
    for key in &added {
      self.dom.register_namespace(key);
    }
  }

  fn remove_from_parent(&self, target: &NodeId) {
    self.dom.detach_unchecked(target.index);
  }

  fn reparent_children(&self, node: &NodeId, new_parent: &NodeId) {
    self.dom.reparent_children_unchecked(node.index, new_parent.index);
  }

  fn is_mathml_annotation_xml_integration_point(&self, target: &NodeId) -> bool {
    self.dom.with_data(target.index, |data| match data {
      NodeData::Element(element) => {
        element.mathml_annotation_xml_integration_point
      }
      _ => false,
    })
  }

  fn mark_script_already_started(&self, _node: &NodeId) {
    // Scripting is not executed; the marker has no observable effect.
  }
}

#[cfg(test)]
mod tests {
  use markup5ever::namespace_url;
  use markup5ever::ns;

  use super::*;

  fn element_name(local: &str) -> html5ever::QualName {
    html5ever::QualName::new(None, ns!(html), LocalName::from(local))
  }

  #[test]
  fn sink_append_coalesces_adjacent_text() {
    let sink = Sink::new_document();
    let doc = sink.get_document();
    let p = sink.create_element(element_name("p"), vec![], ElementFlags::default());
    sink.append(&doc, NodeOrText::AppendNode(p));
    sink.append(&p, NodeOrText::AppendText("a".into()));
    sink.append(&p, NodeOrText::AppendText("b".into()));

    let p = sink.dom.get(p).unwrap();
    assert_eq!(p.children().count(), 1);
    assert_eq!(p.text("", false), "ab");
  }

  #[test]
  fn append_before_sibling_merges_with_predecessor() {
    let sink = Sink::new_document();
    let doc = sink.get_document();
    let p = sink.create_element(element_name("p"), vec![], ElementFlags::default());
    let b = sink.create_element(element_name("b"), vec![], ElementFlags::default());
    sink.append(&doc, NodeOrText::AppendNode(p));
    sink.append(&p, NodeOrText::AppendText("start".into()));
    sink.append(&p, NodeOrText::AppendNode(b));
    sink.append_before_sibling(&b, NodeOrText::AppendText("-more".into()));

    let p = sink.dom.get(p).unwrap();
    assert_eq!(p.children().count(), 2);
    assert_eq!(p.first_child().unwrap().text("", false), "start-more");
  }

  #[test]
  fn add_attrs_if_missing_keeps_existing_values() {
    let sink = Sink::new_document();
    let attr = |local: &str, value: &str| Attribute {
      name: html5ever::QualName::new(None, ns!(), LocalName::from(local)),
      value: value.into(),
    };
    let html = sink.create_element(
      element_name("html"),
      vec![attr("lang", "en")],
      ElementFlags::default(),
    );
    sink.add_attrs_if_missing(&html, vec![attr("lang", "fr"), attr("dir", "ltr")]);

    let element = sink.dom.get(html).unwrap().as_element().unwrap();
    let attrs = element.attrs();
    assert_eq!(attrs.len(), 2);
    assert_eq!(&attrs.find("lang", 0).unwrap().1[..], "en");
    assert_eq!(&attrs.find("dir", 0).unwrap().1[..], "ltr");
  }

  #[test]
  fn reparent_children_moves_everything_in_order() {
    let sink = Sink::new_document();
    let doc = sink.get_document();
    let from = sink.create_element(element_name("a"), vec![], ElementFlags::default());
    let to = sink.create_element(element_name("b"), vec![], ElementFlags::default());
    sink.append(&doc, NodeOrText::AppendNode(from));
    sink.append(&doc, NodeOrText::AppendNode(to));
    sink.append(&from, NodeOrText::AppendText("x".into()));
    let child = sink.create_element(element_name("c"), vec![], ElementFlags::default());
    sink.append(&from, NodeOrText::AppendNode(child));

    sink.reparent_children(&from, &to);
    let from = sink.dom.get(from).unwrap();
    let to = sink.dom.get(to).unwrap();
    assert!(!from.has_children());
    assert_eq!(to.children().count(), 2);
    assert!(to.first_child().unwrap().is_text());
    assert!(to.last_child().unwrap().is_element());
  }
}
