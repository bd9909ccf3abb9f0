// Copyright 2014-2017 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Subtree serialization.
//!
//! One [`Serialize`] walk drives two back ends: html5ever's stock
//! serializer for HTML output, and a local [`XmlWriter`] implementing the
//! same `Serializer` trait for XML output. The XML back end is local
//! because `<tag/>` for empty elements, doctypes with PUBLIC/SYSTEM ids,
//! and re-emitted namespace declarations cannot be expressed through the
//! stock one.

use std::io;
use std::io::Write;

use html5ever::serialize::AttrRef;
use html5ever::serialize::Serialize;
use html5ever::serialize::SerializeOpts;
use html5ever::serialize::Serializer;
use html5ever::serialize::TraversalScope;
use markup5ever::namespace_url;
use markup5ever::ns;
use markup5ever::LocalName;
use markup5ever::Prefix;
use tendril::StrTendril;

use crate::node::Node;
use crate::tree::DoctypeData;
use crate::tree::NodeData;
use crate::tree::TreeDom;

/// Which serialization rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
  Html,
  Xml,
}

/// Picks serialization rules from the tree when the caller does not say:
/// an element serializes by its own namespace, a Document/Fragment by the
/// dominant namespace of its top-level elements.
pub(crate) fn detect_markup(node: &Node) -> Markup {
  let dom = node.tree();
  let by_namespace = |index: u32| {
    dom.with_data(index, |data| match data {
      NodeData::Element(element) => {
        Some(element.name.namespace() == &ns!(html))
      }
      _ => None,
    })
  };

  if let Some(is_html) = by_namespace(node.index()) {
    return if is_html { Markup::Html } else { Markup::Xml };
  }
  if node.is_document() || node.is_fragment() {
    let mut html = 0usize;
    let mut other = 0usize;
    for child in node.children() {
      match by_namespace(child.index()) {
        Some(true) => html += 1,
        Some(false) => other += 1,
        None => {}
      }
    }
    if other > html {
      return Markup::Xml;
    }
  }
  Markup::Html
}

/// Serializes the subtree rooted at `node` into `writer`.
pub fn serialize_to<W: Write>(
  node: &Node,
  writer: &mut W,
  markup: Option<Markup>,
) -> io::Result<()> {
  let markup = markup.unwrap_or_else(|| detect_markup(node));
  let handle = SerializableHandle::new(node.clone(), markup);
  match markup {
    Markup::Html => html5ever::serialize::serialize(
      writer,
      &handle,
      SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
      },
    ),
    Markup::Xml => {
      let mut xml = XmlWriter::new(writer);
      handle.serialize(&mut xml, TraversalScope::IncludeNode)
    }
  }
}

/// Serializes the subtree rooted at `node` into a byte buffer.
pub(crate) fn serialize_node(node: &Node, markup: Option<Markup>) -> Vec<u8> {
  let mut buf = Vec::new();
  serialize_to(node, &mut buf, markup)
    .expect("serializing into a Vec<u8> cannot fail");
  buf
}

enum SerializeOp {
  Open(u32),
  Close(markup5ever::QualName),
}

/// A subtree handed to a `Serializer` back end.
struct SerializableHandle {
  node: Node,
  markup: Markup,
  /// Prefix declarations to re-emit on the outermost element (XML only).
  decls: Vec<(String, String)>,
}

impl SerializableHandle {
  fn new(node: Node, markup: Markup) -> Self {
    let decls = match markup {
      Markup::Html => Vec::new(),
      Markup::Xml => node
        .tree()
        .namespaces()
        .into_iter()
        .filter(|(prefix, _)| prefix != "xml" && prefix != "xmlns")
        .collect(),
    };
    SerializableHandle { node, markup, decls }
  }

  fn doctype_payload(&self, doctype: &DoctypeData) -> String {
    match self.markup {
      Markup::Html => doctype.name.to_string(),
      Markup::Xml => {
        if !doctype.public_id.is_empty() {
          format!(
            "{} PUBLIC \"{}\" \"{}\"",
            doctype.name, doctype.public_id, doctype.system_id
          )
        } else if !doctype.system_id.is_empty() {
          format!("{} SYSTEM \"{}\"", doctype.name, doctype.system_id)
        } else {
          doctype.name.to_string()
        }
      }
    }
  }
}

fn child_indexes(dom: &TreeDom, index: u32) -> Vec<u32> {
  let mut children = Vec::new();
  let mut child = dom.links(index).first;
  while let Some(index) = child {
    children.push(index);
    child = dom.links(index).next;
  }
  children
}

impl Serialize for SerializableHandle {
  fn serialize<S>(
    &self,
    serializer: &mut S,
    traversal_scope: TraversalScope,
  ) -> io::Result<()>
  where
    S: Serializer,
  {
    let dom = self.node.tree();
    let mut ops: Vec<SerializeOp> = match traversal_scope {
      TraversalScope::IncludeNode => vec![SerializeOp::Open(self.node.index())],
      TraversalScope::ChildrenOnly(_) => child_indexes(&dom, self.node.index())
        .into_iter()
        .rev()
        .map(SerializeOp::Open)
        .collect(),
    };
    let mut decls_pending =
      self.markup == Markup::Xml && !self.decls.is_empty();

    while let Some(op) = ops.pop() {
      match op {
        SerializeOp::Open(index) => {
          let data = dom.with_data(index, |data| data.clone());
          match data {
            NodeData::Element(element) => {
              let name = element.name.0.clone();
              let mut attrs: Vec<(markup5ever::QualName, StrTendril)> =
                Vec::with_capacity(element.attrs.len());
              if decls_pending {
                decls_pending = false;
                if name.prefix.is_none() && !name.ns.is_empty() {
                  attrs.push((
                    markup5ever::QualName::new(
                      None,
                      ns!(xmlns),
                      LocalName::from("xmlns"),
                    ),
                    StrTendril::from(name.ns.as_ref()),
                  ));
                }
                for (prefix, uri) in &self.decls {
                  attrs.push((
                    markup5ever::QualName::new(
                      Some(Prefix::from("xmlns")),
                      ns!(xmlns),
                      LocalName::from(prefix.as_str()),
                    ),
                    StrTendril::from(uri.as_str()),
                  ));
                }
              }
              for (key, value) in element.attrs.iter() {
                attrs.push((key.0.clone(), value.clone()));
              }

              serializer.start_elem(
                name.clone(),
                attrs.iter().map(|(key, value)| (key, &value[..])),
              )?;

              ops.push(SerializeOp::Close(name));
              for child in child_indexes(&dom, index).into_iter().rev() {
                ops.push(SerializeOp::Open(child));
              }
            }

            NodeData::Doctype(doctype) => {
              serializer.write_doctype(&self.doctype_payload(&doctype))?
            }

            NodeData::Text(contents) => serializer.write_text(&contents)?,

            NodeData::Comment(contents) => {
              serializer.write_comment(&contents)?
            }

            NodeData::ProcessingInstruction(pi) => {
              serializer.write_processing_instruction(&pi.target, &pi.data)?
            }

            NodeData::Document | NodeData::Fragment => {
              for child in child_indexes(&dom, index).into_iter().rev() {
                ops.push(SerializeOp::Open(child));
              }
            }
          }
        }

        SerializeOp::Close(name) => serializer.end_elem(name)?,
      }
    }

    Ok(())
  }
}

/// XML 1.0 back end for the shared `Serializer` trait.
///
/// The `>` of a start tag is deferred until the next event so empty
/// elements collapse to `<tag/>`.
pub(crate) struct XmlWriter<W: Write> {
  writer: W,
  tag_open: bool,
}

impl<W: Write> XmlWriter<W> {
  pub fn new(writer: W) -> Self {
    XmlWriter { writer, tag_open: false }
  }

  fn close_pending_tag(&mut self) -> io::Result<()> {
    if self.tag_open {
      self.writer.write_all(b">")?;
      self.tag_open = false;
    }
    Ok(())
  }

  fn write_qual_name(&mut self, name: &markup5ever::QualName) -> io::Result<()> {
    if let Some(prefix) = &name.prefix {
      self.writer.write_all(prefix.as_bytes())?;
      self.writer.write_all(b":")?;
    }
    self.writer.write_all(name.local.as_bytes())
  }

  fn write_escaped(&mut self, text: &str, attr_mode: bool) -> io::Result<()> {
    for c in text.chars() {
      match c {
        '&' => self.writer.write_all(b"&amp;")?,
        '<' => self.writer.write_all(b"&lt;")?,
        '>' => self.writer.write_all(b"&gt;")?,
        '"' if attr_mode => self.writer.write_all(b"&quot;")?,
        c => write!(self.writer, "{}", c)?,
      }
    }
    Ok(())
  }
}

impl<W: Write> Serializer for XmlWriter<W> {
  fn start_elem<'a, AttrIter>(
    &mut self,
    name: markup5ever::QualName,
    attrs: AttrIter,
  ) -> io::Result<()>
  where
    AttrIter: Iterator<Item = AttrRef<'a>>,
  {
    self.close_pending_tag()?;
    self.writer.write_all(b"<")?;
    self.write_qual_name(&name)?;
    for (key, value) in attrs {
      self.writer.write_all(b" ")?;
      self.write_qual_name(key)?;
      self.writer.write_all(b"=\"")?;
      self.write_escaped(value, true)?;
      self.writer.write_all(b"\"")?;
    }
    self.tag_open = true;
    Ok(())
  }

  fn end_elem(&mut self, name: markup5ever::QualName) -> io::Result<()> {
    if self.tag_open {
      self.tag_open = false;
      return self.writer.write_all(b"/>");
    }
    self.writer.write_all(b"</")?;
    self.write_qual_name(&name)?;
    self.writer.write_all(b">")
  }

  fn write_text(&mut self, text: &str) -> io::Result<()> {
    self.close_pending_tag()?;
    self.write_escaped(text, false)
  }

  fn write_comment(&mut self, text: &str) -> io::Result<()> {
    self.close_pending_tag()?;
    self.writer.write_all(b"<!--")?;
    self.writer.write_all(text.as_bytes())?;
    self.writer.write_all(b"-->")
  }

  fn write_doctype(&mut self, name: &str) -> io::Result<()> {
    self.close_pending_tag()?;
    self.writer.write_all(b"<!DOCTYPE ")?;
    self.writer.write_all(name.as_bytes())?;
    self.writer.write_all(b">")
  }

  fn write_processing_instruction(
    &mut self,
    target: &str,
    data: &str,
  ) -> io::Result<()> {
    self.close_pending_tag()?;
    self.writer.write_all(b"<?")?;
    self.writer.write_all(target.as_bytes())?;
    if !data.is_empty() {
      self.writer.write_all(b" ")?;
      self.writer.write_all(data.as_bytes())?;
    }
    self.writer.write_all(b"?>")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::attrs::AttrsList;
  use crate::driver::parse;
  use crate::driver::Html;
  use crate::driver::HtmlOptions;
  use crate::driver::Xml;
  use crate::driver::XmlOptions;
  use crate::node::Ordering;
  use crate::tree::TreeDom;

  #[test]
  fn html_round_trip_of_a_normalized_document() {
    let input =
      "<!DOCTYPE html><html><head></head><body><p>x</p></body></html>";
    let html = Html::parse(input, HtmlOptions::default()).unwrap();
    assert_eq!(html.serialize(), input);
  }

  #[test]
  fn html_void_elements_have_no_close_tag() {
    let html = Html::parse(
      "<!DOCTYPE html><html><body><br><img src=\"a.png\"></body></html>",
      HtmlOptions::default(),
    )
    .unwrap();
    let out = html.serialize();
    assert!(out.contains("<br>"));
    assert!(out.contains("<img src=\"a.png\">"));
    assert!(!out.contains("</br>"));
    assert!(!out.contains("</img>"));
  }

  #[test]
  fn html_script_content_is_verbatim() {
    let html = Html::parse(
      "<!DOCTYPE html><html><head><script>if (a<b) go();</script></head>\
       <body></body></html>",
      HtmlOptions::default(),
    )
    .unwrap();
    assert!(html.serialize().contains("<script>if (a<b) go();</script>"));
  }

  #[test]
  fn xml_round_trip_with_namespaces() {
    let input = "<tag xmlns:ns1=\"http://namespace1/\" \
                 xmlns:ns2=\"http://namespace2/\">\
                 <ns1:child>A</ns1:child><ns2:child>B</ns2:child></tag>";
    let xml = Xml::parse(input, XmlOptions::default()).unwrap();
    assert_eq!(xml.serialize(), input);
  }

  #[test]
  fn xml_empty_elements_self_close() {
    let xml = Xml::parse("<a><b/><c>x</c></a>", XmlOptions::default()).unwrap();
    assert_eq!(xml.serialize(), "<a><b/><c>x</c></a>");
  }

  #[test]
  fn xml_escapes_the_predefined_entities() {
    let input = "<a attr=\"x &amp; &quot;y&quot;\">1 &lt; 2 &amp; 3 &gt; 2</a>";
    let xml = Xml::parse(input, XmlOptions::default()).unwrap();
    assert_eq!(xml.serialize(), input);
  }

  #[test]
  fn xml_default_namespace_round_trips() {
    let input = "<root xmlns=\"http://example.com/\"><child>v</child></root>";
    let xml = Xml::parse(input, XmlOptions::default()).unwrap();
    assert_eq!(xml.serialize(), input);
  }

  #[test]
  fn xml_processing_instructions_round_trip() {
    let input = "<?xml-stylesheet href=\"a.css\"?><doc>x</doc>";
    let xml = Xml::parse(input, XmlOptions::default()).unwrap();
    assert_eq!(xml.serialize(), input);
  }

  #[test]
  fn xml_doctype_forms() {
    let dom = TreeDom::new();
    let root = dom.root();
    root.create_doctype("html", "", "", Ordering::Append).unwrap();
    assert_eq!(root.serialize_xml(), "<!DOCTYPE html>");

    let dom = TreeDom::new();
    let root = dom.root();
    root
      .create_doctype("html", "", "about:legacy-compat", Ordering::Append)
      .unwrap();
    assert_eq!(
      root.serialize_xml(),
      "<!DOCTYPE html SYSTEM \"about:legacy-compat\">"
    );

    let dom = TreeDom::new();
    let root = dom.root();
    root
      .create_doctype(
        "html",
        "-//W3C//DTD XHTML 1.0//EN",
        "http://www.w3.org/TR/xhtml1/DTD/xhtml1.dtd",
        Ordering::Append,
      )
      .unwrap();
    assert_eq!(
      root.serialize_xml(),
      "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0//EN\" \
       \"http://www.w3.org/TR/xhtml1/DTD/xhtml1.dtd\">"
    );
  }

  #[test]
  fn markup_detection_follows_the_dominant_namespace() {
    let html_dom =
      parse("<!DOCTYPE html><html></html>", HtmlOptions::default()).unwrap();
    assert_eq!(detect_markup(&html_dom.root()), Markup::Html);

    let xml_dom = parse("<data><x/></data>", XmlOptions::default()).unwrap();
    assert_eq!(detect_markup(&xml_dom.root()), Markup::Xml);

    // An element picks by its own namespace.
    let element = xml_dom.root().first_child().unwrap();
    assert_eq!(detect_markup(&element), Markup::Xml);
  }

  #[test]
  fn subtree_serialization_starts_at_the_node() {
    let html = Html::parse(
      "<!DOCTYPE html><html><body><div id=\"a\"><p>x</p></div></body></html>",
      HtmlOptions::default(),
    )
    .unwrap();
    let div = html.select_one("div", 0).unwrap().expect("no div");
    assert_eq!(div.serialize_html(), "<div id=\"a\"><p>x</p></div>");
  }

  #[test]
  fn manual_tree_serializes_as_html() {
    let dom = TreeDom::new();
    let root = dom.root();
    let div = root
      .create_element(
        crate::QualName::with_namespace("div", "html"),
        AttrsList::new(),
        Ordering::Append,
      )
      .unwrap();
    div.create_text("a < b", Ordering::Append).unwrap();
    assert_eq!(root.serialize(), "<div>a &lt; b</div>");
  }
}
