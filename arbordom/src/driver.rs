//! Parser drivers: options, the streaming lifecycle, and the one-shot
//! `Html`/`Xml` entry points.
//!
//! A [`Parser`] walks a fixed lifecycle:
//!
//! ```text
//! NEW -> RUNNING -> FINISHED -> CONVERTED
//!           |           |
//!       process(..)  into_dom()
//! ```
//!
//! `process` accepts raw bytes and decodes them incrementally following
//! the HTML5 encoding-sniffing order: a BOM wins, then a `charset`
//! declaration found by prescanning the first kilobyte, then UTF-8 as
//! the default. Chunk boundaries never affect the resulting tree.
//! Calling a method in the wrong state fails with
//! [`Error::IllegalState`]; tokenizer errors never abort parsing and are
//! collected on the side instead.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::mem;
use std::path::Path;

use derive_more::with_trait::From;
use html5ever::namespace_url;
use html5ever::ns;
use html5ever::tendril::StrTendril;
use html5ever::tendril::TendrilSink;
use html5ever::tokenizer::TokenizerOpts;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::LocalName;
use html5ever::ParseOpts;
use xml5ever::driver::XmlParseOpts;
use xml5ever::tokenizer::XmlTokenizerOpts;

use crate::errors::Error;
use crate::errors::Result;
use crate::node::Node;
use crate::quirks::QuirksMode;
use crate::select::Select;
use crate::sink::Sink;
use crate::tree::TreeDom;

/// Options for the HTML5 parser.
#[derive(Debug, Clone)]
pub struct HtmlOptions {
  /// Parse a full document (`true`) or a fragment (`false`).
  pub full_document: bool,
  /// Report the precise character position of errors. Costs speed.
  pub exact_errors: bool,
  /// Discard a `U+FEFF` at the beginning of the stream.
  pub discard_bom: bool,
  /// Keep a timing profile of tokenizer states.
  pub profile: bool,
  /// Parse as if inside an `<iframe srcdoc>` document.
  pub iframe_srcdoc: bool,
  /// Drop any doctype token instead of appending it to the document.
  pub drop_doctype: bool,
  /// Behave as if scripting were enabled (affects `<noscript>`).
  pub scripting_enabled: bool,
  /// Initial quirks mode; the doctype may change it during parsing.
  pub quirks_mode: QuirksMode,
  /// Context element name for fragment parsing.
  pub context_element: String,
}

impl Default for HtmlOptions {
  fn default() -> Self {
    HtmlOptions {
      full_document: true,
      exact_errors: true,
      discard_bom: true,
      profile: false,
      iframe_srcdoc: false,
      drop_doctype: false,
      scripting_enabled: true,
      quirks_mode: QuirksMode::Off,
      context_element: "div".into(),
    }
  }
}

impl From<&HtmlOptions> for ParseOpts {
  fn from(opts: &HtmlOptions) -> Self {
    ParseOpts {
      tokenizer: TokenizerOpts {
        exact_errors: opts.exact_errors,
        discard_bom: opts.discard_bom,
        profile: opts.profile,
        ..Default::default()
      },
      tree_builder: TreeBuilderOpts {
        exact_errors: opts.exact_errors,
        scripting_enabled: opts.scripting_enabled,
        iframe_srcdoc: opts.iframe_srcdoc,
        drop_doctype: opts.drop_doctype,
        quirks_mode: opts.quirks_mode.into(),
      },
    }
  }
}

/// Options for the XML parser.
#[derive(Debug, Clone)]
pub struct XmlOptions {
  /// Report the precise character position of errors. Costs speed.
  pub exact_errors: bool,
  /// Discard a `U+FEFF` at the beginning of the stream.
  pub discard_bom: bool,
  /// Keep a timing profile of tokenizer states.
  pub profile: bool,
}

impl Default for XmlOptions {
  fn default() -> Self {
    XmlOptions { exact_errors: true, discard_bom: true, profile: false }
  }
}

impl From<&XmlOptions> for XmlParseOpts {
  fn from(opts: &XmlOptions) -> Self {
    XmlParseOpts {
      tokenizer: XmlTokenizerOpts {
        exact_errors: opts.exact_errors,
        discard_bom: opts.discard_bom,
        profile: opts.profile,
        ..Default::default()
      },
      tree_builder: Default::default(),
    }
  }
}

/// Either kind of parser options.
#[derive(Debug, Clone, From)]
pub enum ParserOptions {
  Html(HtmlOptions),
  Xml(XmlOptions),
}

/// How many leading bytes the prescan may inspect for a `charset`
/// declaration.
const PRESCAN_WINDOW: usize = 1024;

/// Outcome of the declared-encoding prescan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredEncoding {
  Utf8,
  Windows1252,
}

/// Incremental byte decoder implementing the HTML5 encoding-sniffing
/// order: BOM, then a declared `charset` found within the first kilobyte,
/// then UTF-8 as the default. Undecodable input fails with
/// [`Error::Decode`]; a `U+FEFF` is forwarded so the tokenizers'
/// `discard_bom` option keeps the final say.
#[derive(Debug)]
enum ByteDecoder {
  /// Buffering the prescan window until the encoding is settled.
  Sniff(Vec<u8>),
  /// UTF-8 with an incomplete trailing sequence carried between chunks.
  Utf8(Vec<u8>),
  /// UTF-16 with a dangling half code unit and/or lead surrogate.
  Utf16 { big_endian: bool, half: Option<u8>, lead: Option<u16> },
  /// windows-1252; every byte maps to exactly one scalar.
  Windows1252,
}

impl ByteDecoder {
  fn new() -> Self {
    ByteDecoder::Sniff(Vec::new())
  }

  fn push(&mut self, input: &[u8], out: &mut String) -> Result<()> {
    if let ByteDecoder::Sniff(buf) = &mut *self {
      buf.extend_from_slice(input);
      // A BOM settles things immediately; otherwise keep buffering until
      // the prescan window fills (`finish` resolves shorter streams).
      let has_bom = buf.starts_with(&[0xFE, 0xFF])
        || buf.starts_with(&[0xFF, 0xFE])
        || buf.starts_with(&[0xEF, 0xBB, 0xBF]);
      if has_bom || buf.len() >= PRESCAN_WINDOW {
        return self.resolve(out);
      }
      return Ok(());
    }
    match self {
      ByteDecoder::Sniff(_) => Ok(()),
      ByteDecoder::Utf8(tail) => utf8_step(tail, input, out),
      ByteDecoder::Utf16 { big_endian, half, lead } => {
        utf16_step(*big_endian, half, lead, input, out)
      }
      ByteDecoder::Windows1252 => {
        out.extend(input.iter().map(|&byte| windows_1252_char(byte)));
        Ok(())
      }
    }
  }

  fn finish(&mut self, out: &mut String) -> Result<()> {
    if matches!(self, ByteDecoder::Sniff(_)) {
      self.resolve(out)?;
    }
    match self {
      ByteDecoder::Sniff(_) | ByteDecoder::Windows1252 => Ok(()),
      ByteDecoder::Utf8(tail) => {
        if tail.is_empty() {
          Ok(())
        } else {
          Err(Error::decode("incomplete utf-8 sequence at end of input"))
        }
      }
      ByteDecoder::Utf16 { half, lead, .. } => {
        if half.is_some() {
          Err(Error::decode("incomplete utf-16 code unit at end of input"))
        } else if lead.is_some() {
          Err(Error::decode("unpaired utf-16 surrogate at end of input"))
        } else {
          Ok(())
        }
      }
    }
  }

  /// Settles the encoding question using the buffered prefix: BOM first,
  /// then the `charset` prescan, then the UTF-8 default.
  fn resolve(&mut self, out: &mut String) -> Result<()> {
    let buf = match self {
      ByteDecoder::Sniff(buf) => mem::take(buf),
      _ => return Ok(()),
    };
    *self = if buf.starts_with(&[0xFE, 0xFF]) {
      ByteDecoder::Utf16 { big_endian: true, half: None, lead: None }
    } else if buf.starts_with(&[0xFF, 0xFE]) {
      ByteDecoder::Utf16 { big_endian: false, half: None, lead: None }
    } else if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
      // A UTF-8 BOM outranks any declaration further down the stream.
      ByteDecoder::Utf8(Vec::new())
    } else {
      match prescan_declared_encoding(&buf) {
        Some(DeclaredEncoding::Windows1252) => ByteDecoder::Windows1252,
        _ => ByteDecoder::Utf8(Vec::new()),
      }
    };
    match self {
      // Re-emit the BOM as U+FEFF; `discard_bom` decides its fate.
      ByteDecoder::Utf16 { .. } => {
        out.push('\u{FEFF}');
        self.push(&buf[2..], out)
      }
      _ => self.push(&buf, out),
    }
  }
}

/// Scans the prescan window for a `charset=` declaration (`<meta
/// charset="...">` or the `http-equiv` `content="...; charset=..."`
/// form) and maps its label. Unknown labels fall through to the UTF-8
/// default.
fn prescan_declared_encoding(buf: &[u8]) -> Option<DeclaredEncoding> {
  let window = &buf[..buf.len().min(PRESCAN_WINDOW)];
  let mut i = 0;
  while i + 7 <= window.len() {
    if !window[i..i + 7].eq_ignore_ascii_case(b"charset") {
      i += 1;
      continue;
    }
    let mut j = i + 7;
    while j < window.len() && window[j].is_ascii_whitespace() {
      j += 1;
    }
    if window.get(j) == Some(&b'=') {
      j += 1;
      while j < window.len() && window[j].is_ascii_whitespace() {
        j += 1;
      }
      let label = match window.get(j) {
        Some(&quote @ (b'"' | b'\'')) => {
          let start = j + 1;
          window[start..]
            .iter()
            .position(|&byte| byte == quote)
            .map(|end| &window[start..start + end])
        }
        Some(_) => {
          let start = j;
          let end = window[start..]
            .iter()
            .position(|&byte| {
              byte.is_ascii_whitespace()
                || matches!(byte, b';' | b'>' | b'"' | b'\'')
            })
            .map_or(window.len(), |end| start + end);
          Some(&window[start..end])
        }
        None => None,
      };
      if let Some(encoding) = label.and_then(encoding_from_label) {
        return Some(encoding);
      }
    }
    i += 7;
  }
  None
}

fn encoding_from_label(label: &[u8]) -> Option<DeclaredEncoding> {
  let label = std::str::from_utf8(label).ok()?;
  match label.trim().to_ascii_lowercase().as_str() {
    "utf-8" | "utf8" | "unicode-1-1-utf-8" => Some(DeclaredEncoding::Utf8),
    // The sniffing rules turn a declared utf-16 into utf-8: the bytes of
    // a document that says so are overwhelmingly really utf-8.
    "utf-16" | "utf-16le" | "utf-16be" => Some(DeclaredEncoding::Utf8),
    "windows-1252" | "cp1252" | "x-cp1252" | "iso-8859-1" | "iso8859-1"
    | "iso_8859-1" | "latin1" | "l1" | "ascii" | "us-ascii"
    | "x-user-defined" => Some(DeclaredEncoding::Windows1252),
    _ => None,
  }
}

/// The windows-1252 mapping for 0x80..=0x9F; all other bytes map to the
/// identical code point.
const WINDOWS_1252_C1: [u16; 32] = [
  0x20AC, 0x0081, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, //
  0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0x008D, 0x017D, 0x008F, //
  0x0090, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, //
  0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x009D, 0x017E, 0x0178,
];

fn windows_1252_char(byte: u8) -> char {
  match byte {
    0x80..=0x9F => {
      char::from_u32(u32::from(WINDOWS_1252_C1[(byte - 0x80) as usize]))
        .unwrap_or('\u{FFFD}')
    }
    _ => char::from(byte),
  }
}

fn utf8_step(tail: &mut Vec<u8>, input: &[u8], out: &mut String) -> Result<()> {
  let mut data = mem::take(tail);
  data.extend_from_slice(input);
  match std::str::from_utf8(&data) {
    Ok(s) => out.push_str(s),
    Err(err) => {
      if err.error_len().is_some() {
        return Err(Error::decode("invalid utf-8 sequence"));
      }
      // Incomplete trailing sequence: carry at most 3 bytes over.
      let (valid, rest) = data.split_at(err.valid_up_to());
      if let Ok(s) = std::str::from_utf8(valid) {
        out.push_str(s);
      }
      *tail = rest.to_vec();
    }
  }
  Ok(())
}

fn utf16_step(
  big_endian: bool,
  half: &mut Option<u8>,
  lead: &mut Option<u16>,
  input: &[u8],
  out: &mut String,
) -> Result<()> {
  let mut bytes = input.iter().copied();
  let mut units = Vec::with_capacity(input.len() / 2 + 1);

  if let Some(first) = half.take() {
    match bytes.next() {
      Some(second) => units.push(combine_utf16(big_endian, first, second)),
      None => {
        *half = Some(first);
        return Ok(());
      }
    }
  }
  while let Some(first) = bytes.next() {
    match bytes.next() {
      Some(second) => units.push(combine_utf16(big_endian, first, second)),
      None => *half = Some(first),
    }
  }

  for unit in units {
    if let Some(high) = lead.take() {
      if !(0xDC00..=0xDFFF).contains(&unit) {
        return Err(Error::decode("unpaired utf-16 lead surrogate"));
      }
      let scalar = 0x10000
        + (((high as u32) - 0xD800) << 10)
        + ((unit as u32) - 0xDC00);
      match char::from_u32(scalar) {
        Some(c) => out.push(c),
        None => return Err(Error::decode("invalid utf-16 surrogate pair")),
      }
    } else if (0xD800..=0xDBFF).contains(&unit) {
      *lead = Some(unit);
    } else if (0xDC00..=0xDFFF).contains(&unit) {
      return Err(Error::decode("unexpected utf-16 trail surrogate"));
    } else {
      match char::from_u32(unit as u32) {
        Some(c) => out.push(c),
        None => return Err(Error::decode("invalid utf-16 code unit")),
      }
    }
  }
  Ok(())
}

fn combine_utf16(big_endian: bool, first: u8, second: u8) -> u16 {
  if big_endian {
    u16::from_be_bytes([first, second])
  } else {
    u16::from_le_bytes([first, second])
  }
}

enum ParserState {
  Html { parser: html5ever::driver::Parser<Sink>, decoder: ByteDecoder },
  Xml { parser: xml5ever::driver::XmlParser<Sink>, decoder: ByteDecoder },
  Finished(Sink),
  Converted,
}

/// A streaming markup parser.
///
/// ```
/// use arbordom::{Parser, HtmlOptions};
///
/// let mut parser = Parser::new(HtmlOptions::default());
/// parser.process("<p>a")?;
/// parser.process("b</p>")?;
/// parser.finish()?;
/// let dom = parser.into_dom()?;
/// assert_eq!(dom.root().text("", false), "ab");
/// # Ok::<(), arbordom::Error>(())
/// ```
pub struct Parser {
  state: ParserState,
}

impl Parser {
  pub fn new(options: impl Into<ParserOptions>) -> Self {
    let state = match options.into() {
      ParserOptions::Html(opts) => {
        let parse_opts = ParseOpts::from(&opts);
        let parser = if opts.full_document {
          let sink = Sink::new_document();
          sink.quirks_mode.set(opts.quirks_mode.into());
          html5ever::parse_document(sink, parse_opts)
        } else {
          let sink = Sink::new_fragment();
          sink.quirks_mode.set(opts.quirks_mode.into());
          html5ever::parse_fragment(
            sink,
            parse_opts,
            html5ever::QualName::new(
              None,
              ns!(html),
              LocalName::from(&*opts.context_element),
            ),
            vec![],
            false,
          )
        };
        ParserState::Html { parser, decoder: ByteDecoder::new() }
      }
      ParserOptions::Xml(opts) => {
        let sink = Sink::new_document();
        let parser =
          xml5ever::driver::parse_document(sink, XmlParseOpts::from(&opts));
        ParserState::Xml { parser, decoder: ByteDecoder::new() }
      }
    };
    Parser { state }
  }

  /// Feeds a chunk of bytes (or a string) to the parser. Valid before
  /// [`finish`](Self::finish).
  pub fn process(&mut self, content: impl AsRef<[u8]>) -> Result<()> {
    let mut decoded = String::new();
    match &mut self.state {
      ParserState::Html { parser, decoder } => {
        decoder.push(content.as_ref(), &mut decoded)?;
        if !decoded.is_empty() {
          parser.process(StrTendril::from(decoded.as_str()));
        }
        Ok(())
      }
      ParserState::Xml { parser, decoder } => {
        decoder.push(content.as_ref(), &mut decoded)?;
        if !decoded.is_empty() {
          parser.process(StrTendril::from(decoded.as_str()));
        }
        Ok(())
      }
      _ => Err(Error::illegal_state("process() after finish()")),
    }
  }

  /// Runs the tokenizer to completion. Valid once, before
  /// [`into_dom`](Self::into_dom).
  pub fn finish(&mut self) -> Result<()> {
    match mem::replace(&mut self.state, ParserState::Converted) {
      ParserState::Html { mut parser, mut decoder } => {
        let mut decoded = String::new();
        decoder.finish(&mut decoded)?;
        if !decoded.is_empty() {
          parser.process(StrTendril::from(decoded.as_str()));
        }
        self.state = ParserState::Finished(parser.finish());
        Ok(())
      }
      ParserState::Xml { mut parser, mut decoder } => {
        let mut decoded = String::new();
        decoder.finish(&mut decoded)?;
        if !decoded.is_empty() {
          parser.process(StrTendril::from(decoded.as_str()));
        }
        self.state = ParserState::Finished(parser.finish());
        Ok(())
      }
      other => {
        self.state = other;
        Err(Error::illegal_state("finish() called twice"))
      }
    }
  }

  /// Hands the finished tree over. Valid once, after
  /// [`finish`](Self::finish); afterwards every observer fails.
  pub fn into_dom(&mut self) -> Result<TreeDom> {
    match mem::replace(&mut self.state, ParserState::Converted) {
      ParserState::Finished(sink) => Ok(sink.dom),
      other => {
        self.state = other;
        Err(Error::illegal_state("into_dom() is only valid after finish()"))
      }
    }
  }

  /// Parse errors accumulated by the tokenizer and tree builder.
  pub fn errors(&self) -> Result<Vec<Cow<'static, str>>> {
    match &self.state {
      ParserState::Finished(sink) => Ok(sink.errors.borrow().clone()),
      _ => Err(Error::illegal_state("errors() is only valid after finish()")),
    }
  }

  /// The tokenizer's final line number.
  pub fn lineno(&self) -> Result<u64> {
    match &self.state {
      ParserState::Finished(sink) => Ok(sink.line.get()),
      _ => Err(Error::illegal_state("lineno is only valid after finish()")),
    }
  }

  /// The document's quirks mode.
  pub fn quirks_mode(&self) -> Result<QuirksMode> {
    match &self.state {
      ParserState::Finished(sink) => Ok(sink.quirks_mode.get().into()),
      _ => {
        Err(Error::illegal_state("quirks_mode is only valid after finish()"))
      }
    }
  }

  pub fn is_finished(&self) -> bool {
    matches!(self.state, ParserState::Finished(_))
  }

  pub fn is_converted(&self) -> bool {
    matches!(self.state, ParserState::Converted)
  }
}

impl std::fmt::Debug for Parser {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match &self.state {
      ParserState::Html { .. } => "html",
      ParserState::Xml { .. } => "xml",
      ParserState::Finished(_) => "finished",
      ParserState::Converted => "converted",
    };
    write!(f, "Parser(state={state})")
  }
}

/// Parses an in-memory buffer to completion.
pub fn parse(
  content: impl AsRef<[u8]>,
  options: impl Into<ParserOptions>,
) -> Result<TreeDom> {
  let mut parser = Parser::new(options);
  parser.process(content)?;
  parser.finish()?;
  parser.into_dom()
}

/// Drives a parser from any reader, in chunks.
pub fn parse_reader(
  mut reader: impl Read,
  options: impl Into<ParserOptions>,
) -> Result<TreeDom> {
  let mut parser = Parser::new(options);
  let mut buf = [0u8; 8192];
  loop {
    let n = reader.read(&mut buf)?;
    if n == 0 {
      break;
    }
    parser.process(&buf[..n])?;
  }
  parser.finish()?;
  parser.into_dom()
}

/// Opens `path` and parses its contents. I/O failures surface as
/// [`Error::Io`].
pub fn parse_file(
  path: impl AsRef<Path>,
  options: impl Into<ParserOptions>,
) -> Result<TreeDom> {
  let file = File::open(path)?;
  parse_reader(file, options)
}

/// A parsed HTML document: the tree plus everything observed while
/// parsing it.
#[derive(Debug)]
pub struct Html {
  dom: TreeDom,
  errors: Vec<Cow<'static, str>>,
  quirks_mode: QuirksMode,
  lineno: u64,
}

impl Html {
  /// Single-shot HTML parse.
  pub fn parse(content: impl AsRef<[u8]>, options: HtmlOptions) -> Result<Html> {
    let mut parser = Parser::new(options);
    parser.process(content)?;
    parser.finish()?;
    let errors = parser.errors()?;
    let quirks_mode = parser.quirks_mode()?;
    let lineno = parser.lineno()?;
    let dom = parser.into_dom()?;
    Ok(Html { dom, errors, quirks_mode, lineno })
  }

  pub fn dom(&self) -> &TreeDom {
    &self.dom
  }

  pub fn root(&self) -> Node {
    self.dom.root()
  }

  pub fn errors(&self) -> &[Cow<'static, str>] {
    &self.errors
  }

  pub fn quirks_mode(&self) -> QuirksMode {
    self.quirks_mode
  }

  pub fn lineno(&self) -> u64 {
    self.lineno
  }

  pub fn select(&self, expr: &str, limit: usize, offset: usize) -> Result<Select> {
    self.root().select(expr, limit, offset)
  }

  pub fn select_one(
    &self,
    expr: &str,
    offset: usize,
  ) -> Result<Option<crate::node::Element>> {
    self.root().select_one(expr, offset)
  }

  pub fn serialize(&self) -> String {
    self.root().serialize_html()
  }
}

/// A parsed XML document.
#[derive(Debug)]
pub struct Xml {
  dom: TreeDom,
  errors: Vec<Cow<'static, str>>,
  lineno: u64,
}

impl Xml {
  /// Single-shot XML parse.
  pub fn parse(content: impl AsRef<[u8]>, options: XmlOptions) -> Result<Xml> {
    let mut parser = Parser::new(options);
    parser.process(content)?;
    parser.finish()?;
    let errors = parser.errors()?;
    let lineno = parser.lineno()?;
    let dom = parser.into_dom()?;
    Ok(Xml { dom, errors, lineno })
  }

  pub fn dom(&self) -> &TreeDom {
    &self.dom
  }

  pub fn root(&self) -> Node {
    self.dom.root()
  }

  pub fn errors(&self) -> &[Cow<'static, str>] {
    &self.errors
  }

  /// XML documents never leave no-quirks mode.
  pub fn quirks_mode(&self) -> QuirksMode {
    QuirksMode::Off
  }

  pub fn lineno(&self) -> u64 {
    self.lineno
  }

  pub fn select(&self, expr: &str, limit: usize, offset: usize) -> Result<Select> {
    self.root().select(expr, limit, offset)
  }

  pub fn select_one(
    &self,
    expr: &str,
    offset: usize,
  ) -> Result<Option<crate::node::Element>> {
    self.root().select_one(expr, offset)
  }

  pub fn serialize(&self) -> String {
    self.root().serialize_xml()
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn quirks_off_for_a_proper_doctype() {
    let html = Html::parse(
      "<!DOCTYPE html><html><p>x</p></html>",
      HtmlOptions::default(),
    )
    .unwrap();

    assert!(html.root().is_document());
    assert_eq!(html.quirks_mode(), QuirksMode::Off);
    assert!(html.errors().is_empty());
    let p = html.select_one("p", 0).unwrap().expect("no <p> matched");
    assert_eq!(p.text("", false), "x");
  }

  #[test]
  fn missing_doctype_means_full_quirks() {
    let html =
      Html::parse("<html><p>x</p></html>", HtmlOptions::default()).unwrap();
    assert_eq!(html.quirks_mode(), QuirksMode::Full);
  }

  #[test]
  fn chunked_text_is_coalesced() {
    let mut parser = Parser::new(HtmlOptions::default());
    parser.process("<p>a").unwrap();
    parser.process("b</p>").unwrap();
    parser.finish().unwrap();
    let dom = parser.into_dom().unwrap();

    let p = dom.root().select_one("p", 0).unwrap().expect("no <p>");
    assert_eq!(p.children().count(), 1);
    let text = p.first_child().unwrap();
    assert!(text.is_text());
    assert_eq!(text.text("", false), "ab");
  }

  #[test]
  fn chunk_granularity_does_not_change_the_tree() {
    let input = "<!DOCTYPE html><html><body><p id=\"a\">one</p></body></html>";
    let whole = parse(input, HtmlOptions::default()).unwrap();

    let mut parser = Parser::new(HtmlOptions::default());
    for byte in input.as_bytes() {
      parser.process(std::slice::from_ref(byte)).unwrap();
    }
    parser.finish().unwrap();
    let chunked = parser.into_dom().unwrap();

    assert_eq!(
      whole.root().serialize_html(),
      chunked.root().serialize_html()
    );
  }

  #[test]
  fn lifecycle_misuse_is_an_illegal_state() {
    let mut parser = Parser::new(HtmlOptions::default());
    parser.process("<html><p>x</p></html>").unwrap();

    assert!(matches!(parser.into_dom(), Err(Error::IllegalState(_))));
    assert!(matches!(parser.errors(), Err(Error::IllegalState(_))));

    parser.finish().unwrap();
    assert!(parser.is_finished());
    assert!(matches!(parser.process(""), Err(Error::IllegalState(_))));
    assert!(matches!(parser.finish(), Err(Error::IllegalState(_))));
    assert!(parser.errors().is_ok());
    assert!(parser.lineno().is_ok());
    assert!(parser.quirks_mode().is_ok());

    parser.into_dom().unwrap();
    assert!(parser.is_converted());
    assert!(matches!(parser.into_dom(), Err(Error::IllegalState(_))));
    assert!(matches!(parser.errors(), Err(Error::IllegalState(_))));
  }

  #[test]
  fn empty_input_can_finish_immediately() {
    let mut parser = Parser::new(HtmlOptions::default());
    parser.finish().unwrap();
    let dom = parser.into_dom().unwrap();
    assert!(dom.root().is_document());
  }

  #[test]
  fn line_numbers_are_tracked() {
    let mut parser = Parser::new(HtmlOptions::default());
    for chunk in ["<html><p>Ali</p>", "\n", "</html>"] {
      parser.process(chunk).unwrap();
    }
    parser.finish().unwrap();
    assert_eq!(parser.lineno().unwrap(), 2);
  }

  #[test]
  fn fragment_parsing_roots_at_a_fragment() {
    let options = HtmlOptions { full_document: false, ..Default::default() };
    let dom = parse("<p>frag</p>", options).unwrap();
    assert!(dom.root().is_fragment());
    assert_eq!(dom.root().text("", false), "frag");
  }

  #[test]
  fn xml_documents_parse_with_namespaces() {
    let xml = Xml::parse(
      "<tag xmlns:ns1=\"http://namespace1/\"><ns1:child>A</ns1:child></tag>",
      XmlOptions::default(),
    )
    .unwrap();

    assert!(xml.root().is_document());
    assert_eq!(xml.quirks_mode(), QuirksMode::Off);
    let namespaces = xml.dom().namespaces();
    assert_eq!(
      namespaces.get("ns1").map(String::as_str),
      Some("http://namespace1/")
    );
  }

  #[test]
  fn utf16_input_is_decoded_via_bom() {
    let text = "<p>ok</p>";
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
      bytes.extend_from_slice(&unit.to_le_bytes());
    }

    let html = Html::parse(&bytes, HtmlOptions::default()).unwrap();
    let p = html.select_one("p", 0).unwrap().expect("no <p>");
    assert_eq!(p.text("", false), "ok");
  }

  #[test]
  fn invalid_utf8_is_a_decode_error() {
    let mut parser = Parser::new(HtmlOptions::default());
    // Short streams stay buffered for the prescan; the decode failure
    // surfaces once the encoding is settled at finish().
    parser.process(&[b'<', b'p', b'>', 0xC0, 0xC1, b'x'][..]).unwrap();
    assert!(matches!(parser.finish(), Err(Error::Decode(_))));
  }

  #[test]
  fn prescan_finds_charset_labels() {
    assert_eq!(
      prescan_declared_encoding(b"<meta charset=utf-8>"),
      Some(DeclaredEncoding::Utf8)
    );
    assert_eq!(
      prescan_declared_encoding(b"<meta charset = 'UTF-16'>"),
      Some(DeclaredEncoding::Utf8)
    );
    assert_eq!(
      prescan_declared_encoding(
        b"<meta http-equiv=\"Content-Type\" \
          content=\"text/html; charset=iso-8859-1\">"
      ),
      Some(DeclaredEncoding::Windows1252)
    );
    assert_eq!(prescan_declared_encoding(b"<p>no declaration</p>"), None);
    assert_eq!(prescan_declared_encoding(b"<meta charset=klingon>"), None);
  }

  #[test]
  fn declared_windows_1252_is_honored() {
    let mut bytes = b"<!DOCTYPE html><html><head>\
      <meta charset=\"windows-1252\"></head><body><p>caf"
      .to_vec();
    bytes.push(0xE9); // 'e' acute in windows-1252
    bytes.extend_from_slice(b"</p></body></html>");

    let html = Html::parse(&bytes, HtmlOptions::default()).unwrap();
    let p = html.select_one("p", 0).unwrap().expect("no <p>");
    assert_eq!(p.text("", false), "caf\u{e9}");
  }

  #[test]
  fn a_bom_outranks_the_declared_charset() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(
      "<html><head><meta charset=\"windows-1252\"></head>\
       <body><p>café</p></body></html>"
        .as_bytes(),
    );

    let html = Html::parse(&bytes, HtmlOptions::default()).unwrap();
    let p = html.select_one("p", 0).unwrap().expect("no <p>");
    // Decoded as UTF-8: a windows-1252 read would have produced "cafÃ©".
    assert_eq!(p.text("", false), "café");
  }

  #[test]
  fn utf8_streaming_continues_past_the_prescan_window() {
    let mut input = String::from("<!DOCTYPE html><html><body><p>");
    input.push_str(&"a".repeat(1100));
    input.push_str("é</p></body></html>");
    let bytes = input.as_bytes();
    let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;

    let mut parser = Parser::new(HtmlOptions::default());
    parser.process(&bytes[..split]).unwrap();
    parser.process(&bytes[split..]).unwrap();
    parser.finish().unwrap();
    let dom = parser.into_dom().unwrap();
    let p = dom.root().select_one("p", 0).unwrap().expect("no <p>");
    assert!(p.text("", false).ends_with("aé"));
  }

  #[test]
  fn windows_1252_c1_bytes_map_to_their_symbols() {
    assert_eq!(windows_1252_char(0x80), '\u{20AC}');
    assert_eq!(windows_1252_char(0x9F), '\u{0178}');
    assert_eq!(windows_1252_char(0x41), 'A');
    assert_eq!(windows_1252_char(0xE9), '\u{e9}');
  }

  #[test]
  fn utf8_sequences_may_span_chunks() {
    let input = "<p>héllo</p>".as_bytes();
    let split = input.iter().position(|&b| b == 0xC3).unwrap() + 1;

    let mut parser = Parser::new(HtmlOptions::default());
    parser.process(&input[..split]).unwrap();
    parser.process(&input[split..]).unwrap();
    parser.finish().unwrap();
    let dom = parser.into_dom().unwrap();
    let p = dom.root().select_one("p", 0).unwrap().expect("no <p>");
    assert_eq!(p.text("", false), "héllo");
  }

  #[test]
  fn parse_file_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file
      .write_all(b"<!DOCTYPE html><html><body>file</body></html>")
      .unwrap();

    let dom = parse_file(file.path(), HtmlOptions::default()).unwrap();
    assert_eq!(dom.root().text("", false), "file");

    let missing = parse_file("/definitely/not/here.html", HtmlOptions::default());
    assert!(matches!(missing, Err(Error::Io(_))));
  }
}
