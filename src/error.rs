//! Errors produced while loading a schema, decoding a device binary, or encoding a PTM document.
//! Recoverable conditions (a missing side-file, an unavailable assembler) are not errors; they are
//! reported through the `MessagePrinter` and processing continues.

use std::path::PathBuf;

use thiserror::Error;

use crate::schema::FieldWidth;

pub type Result<T> = std::result::Result<T, CodecError>;

/// The schema text cannot be trusted to size anything, so every variant is fatal for the run.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum SchemaError {
  #[error("While parsing patchtoken definitions: couldn't find {0}.")]
  MissingDeclaration(&'static str),

  #[error("Unhandled type : {type_name} (line {line})")]
  UnknownFieldType {
    type_name: String,
    line: usize
  },

  #[error("Token {name} has id {id}, which does not fit in a byte (line {line})")]
  TokenIdOutOfRange {
    name: String,
    id: u64,
    line: usize
  },

  #[error("Malformed array length in `{text}` (line {line})")]
  MalformedArray {
    text: String,
    line: usize
  },
}

#[derive(Debug, Error)]
pub enum CodecError {
  #[error(transparent)]
  Schema(#[from] SchemaError),

  // Structural errors in a binary //
  #[error("Device Binary section was not found.")]
  NoDeviceBinary,

  #[error("Reading {what} at offset {offset} needs {needed} bytes, but only {remaining} remain.")]
  Truncated {
    what: String,
    offset: usize,
    needed: u64,
    remaining: usize
  },

  #[error("KernelNameSize was 0 for kernel #{kernel}.")]
  EmptyKernelName {
    kernel: u32
  },

  #[error("Kernel #{kernel} has the name {name:?}, which doesn't survive as a KernelName line.")]
  UnrepresentableKernelName {
    kernel: u32,
    name: String
  },

  #[error("Patch token {token} at offset {offset} declares size {size}, smaller than its own header.")]
  TokenTooSmall {
    token: u32,
    size: u32,
    offset: usize
  },

  // Format errors in PTM text //
  #[error("Unknown size {width} of field {name} on line {line}.")]
  UnsupportedWidth {
    width: u64,
    name: String,
    line: usize
  },

  #[error("Value {value} of field {name} does not fit in {width} bytes (line {line}).")]
  ValueOutOfRange {
    value: u64,
    width: FieldWidth,
    name: String,
    line: usize
  },

  #[error("Cannot parse line {line}: `{text}`")]
  MalformedLine {
    text: String,
    line: usize
  },

  #[error("Line {line}: {what} appears outside of a kernel.")]
  OutOfPlace {
    what: &'static str,
    line: usize
  },

  #[error("{0} was not found.")]
  MissingFile(String),

  #[error("Side-file name `{0}` does not name a file inside the dump directory.")]
  UnsafeFileName(String),

  // Container //
  #[error("Malformed ELF container: {0}")]
  Container(#[from] object::Error),

  #[error("Couldn't build ELF container: {0}")]
  ContainerWrite(#[from] object::write::Error),

  #[error("Couldn't access {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error
  },
}

impl CodecError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    CodecError::Io { path: path.into(), source }
  }
}
