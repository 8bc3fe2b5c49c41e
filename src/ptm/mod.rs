/*!
  PTM is the line-oriented text form of a patch-token binary. A decoded binary becomes one PTM
  document plus side-files, and the encoder turns the same document back into bytes. Every byte of
  the binary is accounted for by exactly one line (or by a side-file the `KernelName` line refers
  to), which is what makes the text re-encodable.

  `PtmWriter` produces the text incrementally while a binary is walked; `parse_document` reads it
  back into `PtmLine`s. `PtmLine` renders with the same formatting the writer uses.
*/

mod parser;

use std::fmt::{Display, Formatter, Write};

use string_cache::DefaultAtom;

use crate::schema::FieldWidth;

pub use parser::{parse_document, parse_line};

pub const PROGRAM_HEADER_BLOCK : &str = "ProgramBinaryHeader";
pub const KERNEL_HEADER_BLOCK  : &str = "KernelBinaryHeader";
pub const UNIDENTIFIED_TOKEN   : &str = "Unidentified PatchToken";
pub const KERNEL_MARKER        : &str = "Kernel #";
pub const KERNEL_NAME_TAG      : &str = "KernelName";
pub const HEX_TAG              : &str = "Hex";
/// The name of the PTM document inside a dump directory.
pub const PTM_FILE             : &str = "PTM.txt";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldLine {
  pub width : FieldWidth,
  pub name  : DefaultAtom,
  pub value : u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PtmLine {
  /// `<Name>:` starts a header or token block.
  Block(String),
  KernelMarker(u32),
  Field(FieldLine),
  Hex(Vec<u8>),
  KernelName(String),
}

impl PtmLine {

  pub fn is_block(&self) -> bool {
    matches!(self, PtmLine::Block(_))
  }

  /// A block holding one of the two fixed headers rather than a patch token.
  pub fn is_header_block(&self) -> bool {
    match self {
      PtmLine::Block(name) => name == PROGRAM_HEADER_BLOCK || name == KERNEL_HEADER_BLOCK,
      _ => false
    }
  }

  /// The number of binary bytes the line itself stands for.
  pub fn byte_len(&self) -> usize {
    match self {
      PtmLine::Field(field) => field.width.bytes(),
      PtmLine::Hex(bytes)   => bytes.len(),
      _ => 0
    }
  }
}

fn write_hex<W: Write>(out: &mut W, bytes: &[u8]) -> std::fmt::Result {
  write!(out, "\t{}", HEX_TAG)?;
  for byte in bytes {
    write!(out, " {:x}", byte)?;
  }
  Ok(())
}

impl Display for PtmLine{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      PtmLine::Block(name)         => write!(f, "{}:", name),
      PtmLine::KernelMarker(index) => write!(f, "{}{}", KERNEL_MARKER, index),
      PtmLine::Field(field)        => write!(f, "\t{} {} {}", field.width, field.name, field.value),
      PtmLine::Hex(bytes)          => write_hex(f, bytes),
      PtmLine::KernelName(name)    => write!(f, "\t{} {}", KERNEL_NAME_TAG, name),
    }
  }
}

/// A parsed line together with its 1-based line number in the source text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NumberedLine {
  pub number : usize,
  pub line   : PtmLine,
}

/// Renders a document back to text.
pub fn render_document(lines: &[NumberedLine]) -> String {
  let mut text = String::new();
  for numbered in lines {
    // Writing into a `String` cannot fail.
    let _ = writeln!(text, "{}", numbered.line);
  }
  text
}

/// Accumulates PTM text.
#[derive(Clone, Debug, Default)]
pub struct PtmWriter {
  text: String,
}

impl PtmWriter {

  pub fn new() -> Self {
    PtmWriter::default()
  }

  pub fn block(&mut self, name: &str) {
    let _ = writeln!(self.text, "{}:", name);
  }

  pub fn kernel_marker(&mut self, index: u32) {
    let _ = writeln!(self.text, "{}{}", KERNEL_MARKER, index);
  }

  pub fn field(&mut self, width: FieldWidth, name: &str, value: u64) {
    let _ = writeln!(self.text, "\t{} {} {}", width, name, value);
  }

  pub fn hex(&mut self, bytes: &[u8]) {
    let _ = write_hex(&mut self.text, bytes);
    self.text.push('\n');
  }

  pub fn kernel_name(&mut self, name: &str) {
    let _ = writeln!(self.text, "\t{} {}", KERNEL_NAME_TAG, name);
  }

  pub fn as_str(&self) -> &str {
    &self.text
  }

  pub fn finish(self) -> String {
    self.text
  }
}
