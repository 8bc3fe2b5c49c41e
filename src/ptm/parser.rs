/*!
  Reads PTM text back into `PtmLine`s. Each line of a PTM document is exactly one of
  ```text
  <Name>:                       block header
  Kernel #<index>               kernel marker
  \t<width> <name> <value>      field
  \tHex <byte> <byte> ...       raw bytes, lowercase hex without padding
  \tKernelName <name>           kernel name
  ```
  Blank lines are ignored. Anything else is a format error, reported with its line number, since
  a line the encoder cannot account for would shift every offset after it.
*/


use nom::{
  branch::alt,
  bytes::complete::{tag, take_till1, take_while_m_n},
  character::complete::{
    char as one_char,
    space0,
    space1,
    u32 as decimal_u32,
    u64 as decimal_u64
  },
  combinator::{all_consuming, map, map_res, rest},
  multi::many0,
  sequence::{pair, preceded, terminated, tuple},
  IResult
};
use string_cache::DefaultAtom;

use crate::error::{CodecError, Result};
use crate::schema::FieldWidth;
use super::{FieldLine, NumberedLine, PtmLine, HEX_TAG, KERNEL_MARKER, KERNEL_NAME_TAG};

enum RawLine<'a> {
  Block(&'a str),
  KernelMarker(u32),
  Field{
    width : u64,
    name  : &'a str,
    value : u64
  },
  Hex(Vec<u8>),
  KernelName(&'a str),
}

fn kernel_marker_p(input: &str) -> IResult<&str, RawLine> {
  map(preceded(tag(KERNEL_MARKER), decimal_u32), RawLine::KernelMarker)(input)
}

fn kernel_name_p(input: &str) -> IResult<&str, RawLine> {
  map(
    preceded(tuple((space0, tag(KERNEL_NAME_TAG), one_char(' '))), rest),
    RawLine::KernelName
  )(input)
}

fn hex_byte_p(input: &str) -> IResult<&str, u8> {
  map_res(
    take_while_m_n(1, 2, |c: char| c.is_ascii_hexdigit()),
    |digits: &str| u8::from_str_radix(digits, 16)
  )(input)
}

fn hex_p(input: &str) -> IResult<&str, RawLine> {
  map(
    terminated(
      preceded(pair(space0, tag(HEX_TAG)), many0(preceded(space1, hex_byte_p))),
      space0
    ),
    RawLine::Hex
  )(input)
}

fn field_p(input: &str) -> IResult<&str, RawLine> {
  map(
    tuple((
      space0,
      decimal_u64,
      space1,
      take_till1(|c: char| c.is_whitespace()),
      space1,
      decimal_u64,
      space0
    )),
    |(_, width, _, name, _, value, _)| RawLine::Field{ width, name, value }
  )(input)
}

fn block_p(input: &str) -> IResult<&str, RawLine> {
  map(
    terminated(take_till1(|c: char| c == ':'), pair(one_char(':'), space0)),
    |name: &str| RawLine::Block(name.trim())
  )(input)
}

fn raw_line_p(input: &str) -> IResult<&str, RawLine> {
  alt((
    all_consuming(kernel_marker_p),
    all_consuming(kernel_name_p),
    all_consuming(hex_p),
    all_consuming(field_p),
    all_consuming(block_p),
  ))(input)
}

/// Parses a single line. `number` is 1-based and only used for diagnostics. Blank lines give
/// `Ok(None)`.
pub fn parse_line(text: &str, number: usize) -> Result<Option<PtmLine>> {
  if text.trim().is_empty() {
    return Ok(None);
  }

  let raw =
    match raw_line_p(text.trim_end()) {
      Ok((_, raw)) => raw,
      Err(_) => {
        return Err(CodecError::MalformedLine{ text: text.to_string(), line: number });
      }
    };

  let line =
    match raw {

      RawLine::Block(name) => PtmLine::Block(name.to_string()),

      RawLine::KernelMarker(index) => PtmLine::KernelMarker(index),

      RawLine::KernelName(name) => PtmLine::KernelName(name.to_string()),

      RawLine::Hex(bytes) => PtmLine::Hex(bytes),

      RawLine::Field{ width, name, value } => {
        let field_width =
          u8::try_from(width)
            .ok()
            .and_then(|width| FieldWidth::try_from(width).ok())
            .ok_or_else(|| CodecError::UnsupportedWidth{
              width,
              name: name.to_string(),
              line: number
            })?;
        if !field_width.fits(value) {
          return Err(CodecError::ValueOutOfRange{
            value,
            width: field_width,
            name: name.to_string(),
            line: number
          });
        }
        PtmLine::Field(FieldLine{ width: field_width, name: DefaultAtom::from(name), value })
      }

    };

  Ok(Some(line))
}

/// Parses a whole PTM document, keeping the line number of every non-blank line.
pub fn parse_document(text: &str) -> Result<Vec<NumberedLine>> {
  let mut lines = vec![];
  for (index, text_line) in text.lines().enumerate() {
    if let Some(line) = parse_line(text_line, index + 1)? {
      lines.push(NumberedLine{ number: index + 1, line });
    }
  }
  Ok(lines)
}
