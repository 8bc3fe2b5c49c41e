/*!
  Turns a PTM document and its side-files back into a device binary.

  Encoding is two passes over the parsed document. The first recomputes every header's
  `PatchListSize` from the token blocks that actually follow it, so tokens can be added, removed or
  resized by editing the text alone. The second emits bytes: fields and hex lines as written, and
  at each `KernelName` line the name followed by the kernel's heaps read from side-files.

  Some header fields can only be known once later bytes exist. Their offsets are remembered while
  the header is emitted and the values are patched in place afterward: the heap sizes once the
  heaps are spliced, `CheckSum` once the kernel's last token is out, and `NumberOfKernels` at the
  very end.
*/

use std::collections::HashMap;

use string_cache::DefaultAtom;

use crate::container::{self, ElfSections, BUILD_OPTIONS_FILE, LLVM_FILE, SPIRV_FILE};
use crate::error::{CodecError, Result};
use crate::files::{HeapKind, SideFileStore, ASM_EXTENSION};
use crate::hash::kernel_checksum;
use crate::isa::IsaAssembler;
use crate::messages::MessagePrinter;
use crate::ptm::{
  parse_document,
  FieldLine,
  NumberedLine,
  PtmLine,
  KERNEL_HEADER_BLOCK,
  PROGRAM_HEADER_BLOCK,
  PTM_FILE,
  UNIDENTIFIED_TOKEN
};
use crate::schema::{FieldWidth, Schema};

/// Zero bytes appended after assembled code so instruction prefetch never reads past the heap.
pub const ISA_PREFETCH_PADDING : usize = 128;
pub const CACHE_LINE_SIZE      : usize = 64;

/// Zero bytes a declared `KernelNameSize` may reserve past the terminated name before it is
/// treated as a mistake.
pub const MAX_NAME_PADDING     : usize = 64;

const PATCH_LIST_SIZE : &str = "PatchListSize";
const KERNEL_NAME_SIZE: &str = "KernelNameSize";
const UNPADDED_SIZE   : &str = "KernelUnpaddedSize";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ContainerPolicy {
  /// The bare patch-token binary.
  #[default]
  Raw,
  /// The binary wrapped in an OpenCL ELF together with `build.bin` and the IR side-files.
  Elf,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EncodeOptions {
  pub container          : ContainerPolicy,
  /// Splice instruction heaps exactly as found, without prefetch or cache line padding. Pairs
  /// with a dump decoded with `DecodeOptions::ignore_isa_padding`.
  pub ignore_isa_padding : bool,
}

pub fn align_up(value: usize, alignment: usize) -> usize {
  (value + alignment - 1) / alignment * alignment
}

/// Pads assembled code the way kernel heaps are laid out: prefetch padding, then up to a whole
/// cache line.
pub fn pad_kernel_heap(mut code: Vec<u8>) -> Vec<u8> {
  let padded = align_up(code.len() + ISA_PREFETCH_PADDING, CACHE_LINE_SIZE);
  code.resize(padded, 0);
  code
}

/// Where an already emitted header field lives in the output.
#[derive(Copy, Clone, Debug)]
struct FieldSlot {
  offset : usize,
  width  : FieldWidth,
  value  : u64,
  line   : usize,
}

#[derive(Clone, Debug, Default)]
struct HeaderSlots {
  slots: HashMap<DefaultAtom, FieldSlot>,
}

impl HeaderSlots {

  fn record(&mut self, field: &FieldLine, offset: usize, line: usize) {
    self.slots.insert(
      field.name.clone(),
      FieldSlot{ offset, width: field.width, value: field.value, line }
    );
  }

  fn value(&self, name: &str) -> Option<u64> {
    self.slots.get(&DefaultAtom::from(name)).map(|slot| slot.value)
  }

  /// Overwrites an emitted field, returning its previous value. Fields the header never had are
  /// left alone.
  fn patch(&mut self, out: &mut [u8], name: &str, value: u64) -> Result<Option<u64>> {
    let slot =
      match self.slots.get_mut(&DefaultAtom::from(name)) {
        Some(slot) => slot,
        None => {
          tracing::debug!("No {} field to patch.", name);
          return Ok(None);
        }
      };

    if !slot.width.fits(value) {
      return Err(CodecError::ValueOutOfRange{
        value,
        width : slot.width,
        name  : name.to_string(),
        line  : slot.line
      });
    }
    slot.width.encode_at(value, out, slot.offset);
    let previous = slot.value;
    slot.value = value;
    Ok(Some(previous))
  }
}

struct KernelFrame {
  index      : u32,
  header     : HeaderSlots,
  // Output offset of the kernel name; the checksum covers everything from here on.
  blob_start : Option<usize>,
}

enum Scope {
  Outside,
  ProgramHeader,
  KernelHeader,
  Token(String),
}

pub struct BinaryEncoder<'a> {
  schema      : &'a Schema,
  isa         : &'a mut dyn IsaAssembler,
  options     : EncodeOptions,
  pub printer : MessagePrinter,
}

impl<'a> BinaryEncoder<'a> {

  pub fn new(
    schema  : &'a Schema,
    isa     : &'a mut dyn IsaAssembler,
    options : EncodeOptions,
    printer : MessagePrinter
  ) -> Self
  {
    BinaryEncoder{ schema, isa, options, printer }
  }

  /// Encodes the `PTM.txt` found in `files` together with the side-files next to it.
  pub fn encode_dump(&mut self, files: &dyn SideFileStore) -> Result<Vec<u8>> {
    let text =
      files.read(PTM_FILE)?
           .ok_or_else(|| CodecError::MissingFile(PTM_FILE.to_string()))?;
    self.encode(&String::from_utf8_lossy(&text), files)
  }

  pub fn encode(&mut self, ptm_text: &str, files: &dyn SideFileStore) -> Result<Vec<u8>> {
    let mut document = parse_document(ptm_text)?;
    self.recompute_patch_list_sizes(&mut document)?;
    let binary = self.emit(&document, files)?;

    match self.options.container {
      ContainerPolicy::Raw => Ok(binary),
      ContainerPolicy::Elf => self.wrap_in_elf(&binary, files)
    }
  }

  /**
    Replaces the value of every header `PatchListSize` with the number of bytes in the token
    blocks that follow it, up to the next kernel marker or header block. Changed values are
    reported with their line number.
  */
  pub fn recompute_patch_list_sizes(&mut self, document: &mut [NumberedLine]) -> Result<()> {
    let mut in_header = false;

    for position in 0..document.len() {
      match &document[position].line {
        PtmLine::Block(_) => {
          in_header = document[position].line.is_header_block();
          continue;
        }
        PtmLine::KernelMarker(_) => {
          in_header = false;
          continue;
        }
        PtmLine::Field(field) if in_header && &*field.name == PATCH_LIST_SIZE => {}
        _ => continue
      }

      let computed = patch_list_bytes(&document[position + 1..]);
      let number   = document[position].number;
      if let PtmLine::Field(field) = &mut document[position].line {
        if !field.width.fits(computed) {
          return Err(CodecError::ValueOutOfRange{
            value : computed,
            width : field.width,
            name  : PATCH_LIST_SIZE.to_string(),
            line  : number
          });
        }
        if field.value != computed {
          self.printer.warning(format!(
            "Calculated PatchListSize ( {} ) differs from file ( {} ) - changing it. Line {}",
            computed, field.value, number
          ));
          field.value = computed;
        }
      }
    }

    Ok(())
  }

  fn emit(&mut self, document: &[NumberedLine], files: &dyn SideFileStore) -> Result<Vec<u8>> {
    let mut out: Vec<u8> = vec![];
    let mut scope = Scope::Outside;
    let mut program = HeaderSlots::default();
    let mut kernel: Option<KernelFrame> = None;
    let mut kernel_count = 0u64;

    for NumberedLine{ number, line } in document {
      match line {

        PtmLine::Block(name) => {
          scope =
            match name.as_str() {
              PROGRAM_HEADER_BLOCK => Scope::ProgramHeader,
              KERNEL_HEADER_BLOCK  => Scope::KernelHeader,
              _ => Scope::Token(name.clone())
            };
        }

        PtmLine::KernelMarker(index) => {
          if let Some(frame) = kernel.take() {
            self.finish_kernel(frame, &mut out)?;
          }
          kernel = Some(KernelFrame{ index: *index, header: HeaderSlots::default(), blob_start: None });
          kernel_count += 1;
          scope = Scope::Outside;
        }

        PtmLine::Field(field) => {
          match &scope {
            Scope::ProgramHeader => {
              program.record(field, out.len(), *number);
              if &*field.name == "Device" {
                self.isa.set_device(field.value as u32);
              }
            }
            Scope::KernelHeader => {
              match kernel.as_mut() {
                Some(frame) => frame.header.record(field, out.len(), *number),
                None => return Err(CodecError::OutOfPlace{ what: KERNEL_HEADER_BLOCK, line: *number })
              }
            }
            Scope::Token(block) => {
              if &*field.name == "Token" {
                self.check_token_name(block, field.value, *number);
              }
            }
            Scope::Outside => {}
          }
          field.width.encode(field.value, &mut out);
        }

        PtmLine::Hex(bytes) => out.extend_from_slice(bytes),

        PtmLine::KernelName(name) => {
          let frame =
            kernel.as_mut()
                  .ok_or(CodecError::OutOfPlace{ what: "KernelName", line: *number })?;
          self.splice_kernel(frame, name, files, &mut out)?;
        }

      }
    }

    if let Some(frame) = kernel.take() {
      self.finish_kernel(frame, &mut out)?;
    }

    match program.value("NumberOfKernels") {
      Some(declared) if declared != kernel_count => {
        self.printer.warning(format!(
          "NumberOfKernels ( {} ) differs from the number of kernels ( {} ) - changing it.",
          declared, kernel_count
        ));
        program.patch(&mut out, "NumberOfKernels", kernel_count)?;
      }
      _ => {}
    }

    Ok(out)
  }

  fn check_token_name(&mut self, block: &str, token_id: u64, line: usize) {
    if block == UNIDENTIFIED_TOKEN {
      return;
    }
    match self.schema.tokens.id_of(block) {
      Some(id) if id as u64 != token_id => {
        self.printer.warning(format!(
          "{} has Token {}, but the schema gives it id {}. Line {}", block, token_id, id, line
        ));
      }
      None => tracing::debug!("Token block {} on line {} is not in the schema.", block, line),
      _ => {}
    }
  }

  /// Emits the kernel name and the kernel's heaps, and patches the header sizes to match what was
  /// actually emitted.
  fn splice_kernel(
    &mut self,
    frame : &mut KernelFrame,
    name  : &str,
    files : &dyn SideFileStore,
    out   : &mut Vec<u8>
  ) -> Result<()>
  {
    if frame.blob_start.is_some() {
      self.printer.warning(format!("Kernel #{} has more than one KernelName line.", frame.index));
    } else {
      frame.blob_start = Some(out.len());
    }

    // Name, zero padded to KernelNameSize.
    let declared_name_size = frame.header.value(KERNEL_NAME_SIZE).unwrap_or(0);
    let fitted_name_size   = align_up(name.len() + 1, 4);
    let mut name_bytes = name.as_bytes().to_vec();
    if (name_bytes.len() as u64) > declared_name_size {
      name_bytes.resize(fitted_name_size, 0);
      self.printer.warning(format!(
        "KernelName {} doesn't fit in KernelNameSize ( {} ) - changing it to {}.",
        name, declared_name_size, fitted_name_size
      ));
      frame.header.patch(out, KERNEL_NAME_SIZE, fitted_name_size as u64)?;
    } else if declared_name_size > (fitted_name_size + MAX_NAME_PADDING) as u64 {
      name_bytes.resize(fitted_name_size, 0);
      self.printer.warning(format!(
        "KernelNameSize ( {} ) is far larger than KernelName {} needs - changing it to {}.",
        declared_name_size, name, fitted_name_size
      ));
      frame.header.patch(out, KERNEL_NAME_SIZE, fitted_name_size as u64)?;
    } else {
      name_bytes.resize(declared_name_size as usize, 0);
    }
    out.extend_from_slice(&name_bytes);

    // Instruction heap
    let (heap, unpadded) = self.kernel_heap(frame, name, files)?;
    out.extend_from_slice(&heap);
    self.patch_size(frame, out, HeapKind::KernelHeap.size_field(), heap.len() as u64)?;
    self.patch_size(frame, out, UNPADDED_SIZE, unpadded)?;

    // State heaps
    for kind in HeapKind::STATE_HEAPS {
      let file_name = kind.binary_file_name(name);
      let declared = frame.header.value(kind.size_field()).unwrap_or(0);
      let data =
        match files.read(&file_name)? {
          Some(data) => data,
          None => {
            if kind != HeapKind::GeneralStateHeap || declared != 0 {
              self.printer.warning(format!("{} not found - not copied.", file_name));
            }
            vec![]
          }
        };
      out.extend_from_slice(&data);
      self.patch_size(frame, out, kind.size_field(), data.len() as u64)?;
    }

    Ok(())
  }

  /**
    Produces the instruction heap and its unpadded size. Disassembly text is preferred when the
    assembler can handle it. A binary heap whose length equals the declared `KernelHeapSize` is
    used verbatim with the declared `KernelUnpaddedSize`; any other binary heap is treated as bare
    code and padded. With `ignore_isa_padding` nothing is padded and the heap is all code.
  */
  fn kernel_heap(&mut self, frame: &KernelFrame, name: &str, files: &dyn SideFileStore)
    -> Result<(Vec<u8>, u64)>
  {
    let asm_file = HeapKind::KernelHeap.file_name(name, ASM_EXTENSION);
    let dat_file = HeapKind::KernelHeap.binary_file_name(name);

    if let Some(text) = files.read(&asm_file)? {
      match self.isa.assemble(&String::from_utf8_lossy(&text)) {
        Some(code) => {
          let unpadded = code.len() as u64;
          return Ok((self.pad(code), unpadded));
        }
        None => {
          self.printer.warning(format!("Couldn't assemble {} - trying {}.", asm_file, dat_file));
        }
      }
    }

    match files.read(&dat_file)? {
      Some(data) => {
        let length = data.len() as u64;
        let declared = frame.header.value(HeapKind::KernelHeap.size_field());
        if !self.options.ignore_isa_padding && declared == Some(length) {
          let unpadded =
            frame.header
                 .value(UNPADDED_SIZE)
                 .filter(|unpadded| *unpadded <= length)
                 .unwrap_or(length);
          Ok((data, unpadded))
        } else {
          Ok((self.pad(data), length))
        }
      }
      None => {
        self.printer.warning(format!("{} not found - not copied.", dat_file));
        Ok((vec![], 0))
      }
    }
  }

  fn pad(&self, code: Vec<u8>) -> Vec<u8> {
    match self.options.ignore_isa_padding {
      true  => code,
      false => pad_kernel_heap(code)
    }
  }

  fn patch_size(&mut self, frame: &mut KernelFrame, out: &mut [u8], field: &str, value: u64) -> Result<()> {
    if let Some(previous) = frame.header.patch(out, field, value)? {
      if previous != value {
        self.printer.warning(format!(
          "{} of kernel #{} changed from {} to {}.", field, frame.index, previous, value
        ));
      }
    }
    Ok(())
  }

  fn finish_kernel(&mut self, mut frame: KernelFrame, out: &mut [u8]) -> Result<()> {
    match frame.blob_start {
      Some(start) => {
        let checksum = kernel_checksum(&out[start..]) as u64;
        if let Some(previous) = frame.header.patch(out, "CheckSum", checksum)? {
          if previous != checksum {
            tracing::debug!("Kernel #{} CheckSum {} -> {}.", frame.index, previous, checksum);
          }
        }
      }
      None => {
        self.printer.warning(format!(
          "Kernel #{} has no KernelName line; its CheckSum is left as is.", frame.index
        ));
      }
    }
    Ok(())
  }

  fn wrap_in_elf(&mut self, binary: &[u8], files: &dyn SideFileStore) -> Result<Vec<u8>> {
    let build_options = files.read(BUILD_OPTIONS_FILE)?;
    if build_options.is_none() {
      self.printer.warning(format!("{} not found - not copied.", BUILD_OPTIONS_FILE));
    }
    let llvm  = files.read(LLVM_FILE)?;
    let spirv = files.read(SPIRV_FILE)?;
    if llvm.is_none() && spirv.is_none() {
      self.printer.warning(format!(
        "Neither {} nor {} was found; the container has no IR section.", LLVM_FILE, SPIRV_FILE
      ));
    }

    container::wrap(&ElfSections{
      device_binary : binary,
      build_options : build_options.as_deref(),
      llvm          : llvm.as_deref(),
      spirv         : spirv.as_deref()
    })
  }
}

/// Bytes in the token blocks that follow, up to the next kernel marker or header block.
fn patch_list_bytes(lines: &[NumberedLine]) -> u64 {
  let mut in_token = false;
  let mut total = 0u64;
  for numbered in lines {
    match &numbered.line {
      PtmLine::KernelMarker(_) => break,
      PtmLine::Block(_) => {
        if numbered.line.is_header_block() {
          break;
        }
        in_token = true;
      }
      line => {
        if in_token {
          total += line.byte_len() as u64;
        }
      }
    }
  }
  total
}
