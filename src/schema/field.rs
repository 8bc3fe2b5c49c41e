use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use string_cache::DefaultAtom;
use strum_macros::EnumIter;

/**
  The byte width of a field. Every field of the format is an unsigned little-endian integer, so the
  width alone selects how a field is read, printed, parsed, and written. The discriminant is the
  number of bytes, which is also what appears in front of the field name in PTM text.
*/
#[derive(
TryFromPrimitive, IntoPrimitive, EnumIter,
Clone,            Copy,          Eq, PartialEq, Debug, Hash, Ord, PartialOrd
)]
#[repr(u8)]
pub enum FieldWidth {
  Byte       = 1,
  Word       = 2,
  DoubleWord = 4,
  QuadWord   = 8,
}

impl FieldWidth {

  pub fn bytes(&self) -> usize {
    Into::<u8>::into(*self) as usize
  }

  /// Maps a C integer type name to its width. Returns `None` for anything not exactly
  /// `uint8_t`, `uint16_t`, `uint32_t`, or `uint64_t`.
  pub fn from_type_name(type_name: &str) -> Option<FieldWidth> {
    match type_name {
      "uint8_t"  => Some(FieldWidth::Byte),
      "uint16_t" => Some(FieldWidth::Word),
      "uint32_t" => Some(FieldWidth::DoubleWord),
      "uint64_t" => Some(FieldWidth::QuadWord),
      _          => None
    }
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      FieldWidth::Byte       => "uint8_t",
      FieldWidth::Word       => "uint16_t",
      FieldWidth::DoubleWord => "uint32_t",
      FieldWidth::QuadWord   => "uint64_t",
    }
  }

  pub fn max_value(&self) -> u64 {
    match self {
      FieldWidth::QuadWord => u64::MAX,
      width                => (1u64 << (8 * width.bytes())) - 1
    }
  }

  pub fn fits(&self, value: u64) -> bool {
    value <= self.max_value()
  }

  /// Appends `value` as a little-endian integer of this width. The caller checks `fits` first.
  pub fn encode(&self, value: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_le_bytes()[..self.bytes()]);
  }

  /// Overwrites `self.bytes()` bytes of `out` starting at `offset`.
  pub fn encode_at(&self, value: u64, out: &mut [u8], offset: usize) {
    out[offset..offset + self.bytes()].copy_from_slice(&value.to_le_bytes()[..self.bytes()]);
  }
}

impl Display for FieldWidth{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.bytes())
  }
}

/// A named, fixed-width field of a record. Names are interned; the same handful of names
/// (`Token`, `Size`, `Offset`, ...) repeat across hundreds of records.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Field {
  pub width : FieldWidth,
  pub name  : DefaultAtom,
}

impl Field {
  pub fn new(width: FieldWidth, name: &str) -> Field {
    Field{ width, name: DefaultAtom::from(name) }
  }
}

impl Display for Field{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.width, self.name)
  }
}

/// An ordered field list together with the sum of its widths.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RecordSchema {
  pub fields     : Vec<Field>,
  pub total_size : u32,
}

impl RecordSchema {

  pub fn new() -> Self {
    RecordSchema::default()
  }

  pub fn push(&mut self, field: Field) {
    self.total_size += field.width.bytes() as u32;
    self.fields.push(field);
  }

  /// Concatenates another record, as the kernel header is a base record plus its extension.
  pub fn extend(&mut self, other: RecordSchema) {
    for field in other.fields {
      self.push(field);
    }
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Field> {
    self.fields.iter()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.fields.iter().any(|field| &*field.name == name)
  }
}
