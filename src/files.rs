/*!
  Side-files are the named blobs that sit next to `PTM.txt` in a dump: one instruction heap and up
  to three state heaps per kernel, plus the sections recovered from an ELF container. The codec
  itself never touches the file system. It reads and writes through `SideFileStore`, which is
  backed either by memory (`MemoryFiles`) or by a dump directory (`DirectoryFiles`).
*/

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use strum_macros::{Display as StrumDisplay, EnumIter, IntoStaticStr};

use crate::error::{CodecError, Result};

pub const ASM_EXTENSION : &str = "asm";
pub const DAT_EXTENSION : &str = "dat";
pub const BIN_EXTENSION : &str = "bin";

/// The heaps that follow a kernel's name in the binary, in binary order.
#[derive(StrumDisplay, IntoStaticStr, EnumIter, Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum HeapKind {
  KernelHeap,
  GeneralStateHeap,
  DynamicStateHeap,
  SurfaceStateHeap,
}

impl HeapKind {

  /// The state heaps, in the order they follow the instruction heap.
  pub const STATE_HEAPS: [HeapKind; 3] = [
    HeapKind::GeneralStateHeap,
    HeapKind::DynamicStateHeap,
    HeapKind::SurfaceStateHeap,
  ];

  /// The kernel header field holding this heap's size.
  pub fn size_field(&self) -> &'static str {
    match self {
      HeapKind::KernelHeap       => "KernelHeapSize",
      HeapKind::GeneralStateHeap => "GeneralStateHeapSize",
      HeapKind::DynamicStateHeap => "DynamicStateHeapSize",
      HeapKind::SurfaceStateHeap => "SurfaceStateHeapSize",
    }
  }

  /// `<kernel>_<Kind>.<extension>`
  pub fn file_name(&self, kernel: &str, extension: &str) -> String {
    format!("{}_{}.{}", kernel, self, extension)
  }

  /// The name under which a heap is stored verbatim.
  pub fn binary_file_name(&self, kernel: &str) -> String {
    match self {
      HeapKind::KernelHeap => self.file_name(kernel, DAT_EXTENSION),
      _ => self.file_name(kernel, BIN_EXTENSION)
    }
  }
}

pub trait SideFileStore {
  /// Returns `Ok(None)` when no file of that name exists.
  fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

  fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;

  fn contains(&self, name: &str) -> bool;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryFiles {
  files: BTreeMap<String, Vec<u8>>,
}

impl MemoryFiles {

  pub fn new() -> Self {
    MemoryFiles::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
    self.files.insert(name.into(), data);
  }

  pub fn get(&self, name: &str) -> Option<&[u8]> {
    self.files.get(name).map(Vec::as_slice)
  }

  pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
    self.files.remove(name)
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  /// Files in name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
    self.files.iter().map(|(name, data)| (name.as_str(), data.as_slice()))
  }

  /// Copies every file into `store`.
  pub fn write_to(&self, store: &mut dyn SideFileStore) -> Result<()> {
    for (name, data) in self.iter() {
      store.write(name, data)?;
    }
    Ok(())
  }
}

impl SideFileStore for MemoryFiles {
  fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
    Ok(self.files.get(name).cloned())
  }

  fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
    self.files.insert(name.to_string(), data.to_vec());
    Ok(())
  }

  fn contains(&self, name: &str) -> bool {
    self.files.contains_key(name)
  }
}

/// A dump directory on disk.
#[derive(Clone, Debug)]
pub struct DirectoryFiles {
  root: PathBuf,
}

impl DirectoryFiles {

  /// Uses an existing directory.
  pub fn open(root: impl Into<PathBuf>) -> Self {
    DirectoryFiles{ root: root.into() }
  }

  /// Creates the directory (and its parents) if needed.
  pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    std::fs::create_dir_all(&root).map_err(|e| CodecError::io(&root, e))?;
    Ok(DirectoryFiles{ root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// The path of a side-file. Names come from binaries, so anything that could resolve outside
  /// the root is refused.
  pub fn path_of(&self, name: &str) -> Result<PathBuf> {
    if !is_plain_file_name(name) {
      return Err(CodecError::UnsafeFileName(name.to_string()));
    }
    Ok(self.root.join(name))
  }
}

/// A single path component that is not `.` or `..`.
pub fn is_plain_file_name(name: &str) -> bool {
  !name.is_empty()
    && name != "."
    && name != ".."
    && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

impl SideFileStore for DirectoryFiles {
  fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
    let path = self.path_of(name)?;
    match std::fs::read(&path) {
      Ok(data) => Ok(Some(data)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(CodecError::io(path, e))
    }
  }

  fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
    let path = self.path_of(name)?;
    tracing::debug!("Writing {} bytes to {}.", data.len(), path.display());
    std::fs::write(&path, data).map_err(|e| CodecError::io(path, e))
  }

  fn contains(&self, name: &str) -> bool {
    self.path_of(name).map_or(false, |path| path.is_file())
  }
}
