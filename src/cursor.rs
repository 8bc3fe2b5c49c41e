/*!
  A forward-only, bounds-checked reader over a device binary. Every size that steers the cursor
  comes from the binary itself, so every advance is checked against what is left: a declared size
  that runs past the end of its section is reported as `CodecError::Truncated` instead of being
  read.

  Sections are nested cursors. `ByteCursor::section` carves the next `n` bytes out as their own
  cursor, which is how a patch list is kept from reading into whatever follows it.
*/

use nom::number::complete::{le_u16, le_u32, le_u64, le_u8};

use crate::error::{CodecError, Result};
use crate::schema::FieldWidth;

type ByteError<'a> = nom::error::Error<&'a [u8]>;

#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
  data     : &'a [u8],
  // Offset of `data[0]` in the outermost buffer, for diagnostics.
  base     : usize,
  position : usize,
}

impl<'a> ByteCursor<'a> {

  pub fn new(data: &'a [u8]) -> Self {
    ByteCursor{
      data,
      base     : 0,
      position : 0
    }
  }

  /// Offset from the start of the outermost buffer.
  pub fn offset(&self) -> usize {
    self.base + self.position
  }

  pub fn remaining(&self) -> usize {
    self.data.len() - self.position
  }

  pub fn is_empty(&self) -> bool {
    self.remaining() == 0
  }

  fn rest(&self) -> &'a [u8] {
    &self.data[self.position..]
  }

  fn require(&self, needed: u64, what: &str) -> Result<usize> {
    match usize::try_from(needed) {
      Ok(needed) if needed <= self.remaining() => Ok(needed),
      _ => Err(CodecError::Truncated{
        what      : what.to_string(),
        offset    : self.offset(),
        needed,
        remaining : self.remaining()
      })
    }
  }

  /// Reads one unsigned little-endian field of the given width.
  pub fn read_field(&mut self, width: FieldWidth, what: &str) -> Result<u64> {
    self.require(width.bytes() as u64, what)?;

    let result =
      match width {
        FieldWidth::Byte       => le_u8::<_, ByteError>(self.rest()).map(|(_, v)| v as u64),
        FieldWidth::Word       => le_u16::<_, ByteError>(self.rest()).map(|(_, v)| v as u64),
        FieldWidth::DoubleWord => le_u32::<_, ByteError>(self.rest()).map(|(_, v)| v as u64),
        FieldWidth::QuadWord   => le_u64::<_, ByteError>(self.rest()).map(|(_, v)| v)
      };

    match result {
      Ok(value) => {
        self.position += width.bytes();
        Ok(value)
      }
      // Unreachable after `require`, but a parse failure is still a truncation.
      Err(_) => Err(CodecError::Truncated{
        what      : what.to_string(),
        offset    : self.offset(),
        needed    : width.bytes() as u64,
        remaining : self.remaining()
      })
    }
  }

  pub fn read_u32(&mut self, what: &str) -> Result<u32> {
    Ok(self.read_field(FieldWidth::DoubleWord, what)? as u32)
  }

  /// Returns the next `len` bytes and moves past them.
  pub fn take(&mut self, len: u64, what: &str) -> Result<&'a [u8]> {
    let len = self.require(len, what)?;
    let bytes = &self.data[self.position..self.position + len];
    self.position += len;
    Ok(bytes)
  }

  /// Moves past the next `len` bytes.
  pub fn skip(&mut self, len: u64, what: &str) -> Result<()> {
    self.take(len, what).map(|_| ())
  }

  /// Splits the next `len` bytes off as a cursor of their own and moves past them.
  pub fn section(&mut self, len: u64, what: &str) -> Result<ByteCursor<'a>> {
    let base = self.offset();
    let data = self.take(len, what)?;
    Ok(ByteCursor{ data, base, position: 0 })
  }

  /// The bytes between two offsets previously returned by `offset`.
  pub fn slice_between(&self, start: usize, end: usize) -> &'a [u8] {
    &self.data[start - self.base..end - self.base]
  }
}
