//! Arena-backed HTML/XML document model with CSS selectors, powered by
//! Servo's html5ever/xml5ever under the hood.
//!
//! Every document is a [`TreeDom`]: a densely packed arena of nodes with
//! parent/child/sibling links and small copyable handles. The HTML5 and
//! XML parsers stream into the same tree sink, collecting parse errors,
//! the line number, and the quirks mode along the way. On top of the
//! tree sit a typed node façade ([`Node`], [`Element`], [`Text`], ...),
//! a compiled CSS selector engine that honors the namespace prefixes
//! declared in the document, and HTML/XML serializers.
//!
//! ```
//! use arbordom::{Html, HtmlOptions};
//!
//! let html = Html::parse(
//!   "<!DOCTYPE html><html><body><p id=\"hi\">Hello</p></body></html>",
//!   HtmlOptions::default(),
//! )?;
//!
//! assert!(html.errors().is_empty());
//! let p = html.select_one("body > p", 0)?.expect("no match");
//! assert_eq!(p.id().as_deref(), Some("hi"));
//! assert_eq!(p.text("", false), "Hello");
//! assert_eq!(p.serialize_html(), "<p id=\"hi\">Hello</p>");
//! # Ok::<(), arbordom::Error>(())
//! ```
//!
//! Trees can also be built and mutated directly:
//!
//! ```
//! use arbordom::{AttrsList, Ordering, TreeDom};
//!
//! let dom = TreeDom::new();
//! let root = dom.root();
//! let div = root.create_element("div", AttrsList::new(), Ordering::Append)?;
//! div.create_text("hi", Ordering::Append)?;
//! assert_eq!(dom.to_string(), "Document\n  <div>\n    \"hi\"");
//! # Ok::<(), arbordom::Error>(())
//! ```

pub mod attrs;
pub mod driver;
pub mod errors;
pub mod iter;
pub mod name;
pub mod node;
pub mod quirks;
pub mod select;
pub mod serializer;
mod sink;
pub mod tree;

pub use attrs::Attr;
pub use attrs::AttrsList;
pub use driver::parse;
pub use driver::parse_file;
pub use driver::parse_reader;
pub use driver::Html;
pub use driver::HtmlOptions;
pub use driver::Parser;
pub use driver::ParserOptions;
pub use driver::Xml;
pub use driver::XmlOptions;
pub use errors::Error;
pub use errors::Result;
pub use iter::Ancestors;
pub use iter::Children;
pub use iter::Descendants;
pub use iter::Edge;
pub use iter::FirstChildren;
pub use iter::LastChildren;
pub use iter::NextSiblings;
pub use iter::PrevSiblings;
pub use iter::Traverse;
pub use name::QualName;
pub use node::AttrsMut;
pub use node::Comment;
pub use node::Doctype;
pub use node::Document;
pub use node::Element;
pub use node::Fragment;
pub use node::Node;
pub use node::Ordering;
pub use node::ProcessingInstruction;
pub use node::Text;
pub use quirks::QuirksMode;
pub use quirks::QUIRKS_MODE_FULL;
pub use quirks::QUIRKS_MODE_LIMITED;
pub use quirks::QUIRKS_MODE_OFF;
pub use select::Select;
pub use select::Selectors;
pub use serializer::serialize_to;
pub use serializer::Markup;
pub use tree::DoctypeData;
pub use tree::ElementData;
pub use tree::NodeData;
pub use tree::NodeId;
pub use tree::Nodes;
pub use tree::ProcessingInstructionData;
pub use tree::TreeDom;
