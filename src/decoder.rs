/*!
  Turns a device binary into a PTM document plus side-files.

  The walk follows the binary layout exactly:

  ```text
  ProgramHeader
  program patch list                        (PatchListSize bytes)
  NumberOfKernels times:
    KernelHeader
    kernel name                             (KernelNameSize bytes)
    instruction heap                        (KernelHeapSize bytes)
    general state heap                      (GeneralStateHeapSize bytes, usually 0)
    dynamic state heap                      (DynamicStateHeapSize bytes)
    surface state heap                      (SurfaceStateHeapSize bytes)
    kernel patch list                       (PatchListSize bytes)
  ```

  Every size in that list comes from the binary, and every one is checked by the `ByteCursor`
  before it is used. A patch list is carved out as its own cursor, so a token whose `Size` runs
  past the end of its list fails instead of reading into the next kernel.
*/

use std::collections::HashMap;

use string_cache::DefaultAtom;

use crate::container::{self, DeviceBinary};
use crate::cursor::ByteCursor;
use crate::error::{CodecError, Result};
use crate::files::{HeapKind, MemoryFiles, SideFileStore, ASM_EXTENSION};
use crate::hash::kernel_checksum;
use crate::isa::IsaAssembler;
use crate::messages::MessagePrinter;
use crate::ptm::{
  PtmWriter,
  KERNEL_HEADER_BLOCK,
  PROGRAM_HEADER_BLOCK,
  PTM_FILE,
  UNIDENTIFIED_TOKEN
};
use crate::schema::{FieldWidth, RecordSchema, Schema};

/// Size of the `Token`/`Size` pair every patch token starts with.
pub const TOKEN_HEADER_SIZE: u32 = 8;
/// A known token field holding the length of data that follows the token outside its `Size`.
pub const INLINE_DATA_FIELD: &str = "InlineDataSize";

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DecodeOptions {
  /// Dump only `KernelUnpaddedSize` bytes of an instruction heap that cannot be disassembled.
  pub ignore_isa_padding : bool,
  /// Dump the data trailing tokens that carry an `InlineDataSize` field along with the token.
  pub inline_data        : bool,
}

/// What was found in one kernel, for reporting.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KernelSummary {
  pub index                   : u32,
  pub name                    : String,
  pub heap_size               : u64,
  pub unpadded_size           : u64,
  pub general_state_heap_size : u64,
  pub dynamic_state_heap_size : u64,
  pub surface_state_heap_size : u64,
  pub patch_list_size         : u64,
  pub token_count             : usize,
  pub disassembled            : bool,
  pub checksum_matches        : bool,
}

/// The result of decoding one binary.
#[derive(Clone, Debug, Default)]
pub struct DecodedProgram {
  pub ptm     : String,
  pub files   : MemoryFiles,
  pub kernels : Vec<KernelSummary>,
}

impl DecodedProgram {
  /// Writes `PTM.txt` and every side-file into `store`.
  pub fn write_to(&self, store: &mut dyn SideFileStore) -> Result<()> {
    store.write(PTM_FILE, self.ptm.as_bytes())?;
    self.files.write_to(store)
  }
}

/// Header field values by name. Absent fields read as zero.
#[derive(Clone, Debug, Default)]
struct HeaderValues {
  values: HashMap<DefaultAtom, u64>,
}

impl HeaderValues {
  fn get(&self, name: &str) -> u64 {
    self.values.get(&DefaultAtom::from(name)).copied().unwrap_or(0)
  }
}

pub struct BinaryDecoder<'a> {
  schema      : &'a Schema,
  isa         : &'a mut dyn IsaAssembler,
  options     : DecodeOptions,
  pub printer : MessagePrinter,
  ptm         : PtmWriter,
  files       : MemoryFiles,
  kernels     : Vec<KernelSummary>,
}

impl<'a> BinaryDecoder<'a> {

  pub fn new(
    schema  : &'a Schema,
    isa     : &'a mut dyn IsaAssembler,
    options : DecodeOptions,
    printer : MessagePrinter
  ) -> Self
  {
    BinaryDecoder{
      schema,
      isa,
      options,
      printer,
      ptm     : PtmWriter::new(),
      files   : MemoryFiles::new(),
      kernels : vec![]
    }
  }

  /**
    Decodes `data`, which is either a bare device binary or an OpenCL ELF wrapping one. In the ELF
    case the build options and IR sections become side-files as well.

    On error nothing is returned; whatever was produced before the error is discarded.
  */
  pub fn decode(&mut self, data: &[u8]) -> Result<DecodedProgram> {
    self.ptm     = PtmWriter::new();
    self.files   = MemoryFiles::new();
    self.kernels = vec![];

    let device_binary = container::locate(data)?;
    if let DeviceBinary::Elf(sections) = &device_binary {
      for (name, contents) in sections.side_files() {
        self.files.insert(name, contents.to_vec());
      }
    }

    let mut cursor = ByteCursor::new(device_binary.patch_tokens());
    self.process_binary(&mut cursor)?;

    Ok(DecodedProgram{
      ptm     : std::mem::take(&mut self.ptm).finish(),
      files   : std::mem::take(&mut self.files),
      kernels : std::mem::take(&mut self.kernels)
    })
  }

  /// Walks one bare device binary from the program header to the last kernel.
  pub fn process_binary(&mut self, cursor: &mut ByteCursor<'_>) -> Result<()> {
    let schema = self.schema;

    self.ptm.block(PROGRAM_HEADER_BLOCK);
    let header = self.read_header(cursor, &schema.program_header)?;

    let device = header.get("Device");
    self.isa.set_device(device as u32);

    let number_of_kernels = header.get("NumberOfKernels");
    let patch_list_size   = header.get("PatchListSize");
    tracing::debug!("Program: {} kernels, {} bytes of program patch tokens.", number_of_kernels, patch_list_size);

    let mut patch_list = cursor.section(patch_list_size, "program patch list")?;
    self.process_patch_tokens(&mut patch_list)?;

    if number_of_kernels == 0 {
      self.printer.warning("Number of Kernels is 0.");
    }

    for index in 0..number_of_kernels {
      // A kernel count beyond `u32` would have run out of bytes long before this point.
      let index = u32::try_from(index).unwrap_or(u32::MAX);
      self.process_kernel(cursor, index)?;
    }

    if !cursor.is_empty() {
      tracing::debug!("{} bytes after the last kernel are not part of the PTM document.", cursor.remaining());
    }
    Ok(())
  }

  fn read_header(&mut self, cursor: &mut ByteCursor<'_>, record: &RecordSchema) -> Result<HeaderValues> {
    let mut header = HeaderValues::default();
    for field in record.iter() {
      let value = cursor.read_field(field.width, &field.name)?;
      self.ptm.field(field.width, &field.name, value);
      header.values.insert(field.name.clone(), value);
    }
    Ok(header)
  }

  fn process_kernel(&mut self, cursor: &mut ByteCursor<'_>, index: u32) -> Result<()> {
    let schema = self.schema;

    self.ptm.kernel_marker(index);
    self.ptm.block(KERNEL_HEADER_BLOCK);
    let header = self.read_header(cursor, &schema.kernel_header)?;

    let name_size = header.get("KernelNameSize");
    if name_size == 0 {
      return Err(CodecError::EmptyKernelName{ kernel: index });
    }

    // The checksum covers everything from the name to the end of the kernel's patch list.
    let blob_start = cursor.offset();
    let name = kernel_name(cursor.take(name_size, "KernelName")?, index)?;
    self.ptm.kernel_name(&name);

    let mut summary = KernelSummary{
      index,
      name                    : name.clone(),
      heap_size               : header.get(HeapKind::KernelHeap.size_field()),
      unpadded_size           : header.get("KernelUnpaddedSize"),
      general_state_heap_size : header.get(HeapKind::GeneralStateHeap.size_field()),
      dynamic_state_heap_size : header.get(HeapKind::DynamicStateHeap.size_field()),
      surface_state_heap_size : header.get(HeapKind::SurfaceStateHeap.size_field()),
      patch_list_size         : header.get("PatchListSize"),
      ..KernelSummary::default()
    };
    tracing::debug!("Kernel #{} `{}` at offset {}: {:?}", index, name, blob_start, summary);

    // Instruction heap
    let heap_offset = cursor.offset();
    let heap = cursor.take(summary.heap_size, "kernel heap")?;
    let unpadded =
      match usize::try_from(summary.unpadded_size) {
        Ok(unpadded) if unpadded <= heap.len() => &heap[..unpadded],
        _ => {
          return Err(CodecError::Truncated{
            what      : format!("KernelUnpaddedSize of kernel #{}", index),
            offset    : heap_offset,
            needed    : summary.unpadded_size,
            remaining : heap.len()
          });
        }
      };

    match self.isa.disassemble(unpadded) {
      Some(text) => {
        self.files.insert(HeapKind::KernelHeap.file_name(&name, ASM_EXTENSION), text.into_bytes());
        summary.disassembled = true;
      }
      None => {
        let dumped = if self.options.ignore_isa_padding { unpadded } else { heap };
        self.files.insert(HeapKind::KernelHeap.binary_file_name(&name), dumped.to_vec());
      }
    }

    // State heaps
    if summary.general_state_heap_size != 0 {
      self.printer.warning("GeneralStateHeapSize wasn't 0.");
      let general = cursor.take(summary.general_state_heap_size, "general state heap")?;
      self.files.insert(HeapKind::GeneralStateHeap.binary_file_name(&name), general.to_vec());
    }
    let dynamic = cursor.take(summary.dynamic_state_heap_size, "dynamic state heap")?;
    self.files.insert(HeapKind::DynamicStateHeap.binary_file_name(&name), dynamic.to_vec());
    let surface = cursor.take(summary.surface_state_heap_size, "surface state heap")?;
    self.files.insert(HeapKind::SurfaceStateHeap.binary_file_name(&name), surface.to_vec());

    // Kernel patch list
    let mut patch_list = cursor.section(summary.patch_list_size, "kernel patch list")?;
    summary.token_count = self.process_patch_tokens(&mut patch_list)?;

    let computed = kernel_checksum(cursor.slice_between(blob_start, cursor.offset()));
    let declared = header.get("CheckSum");
    summary.checksum_matches = declared == computed as u64;
    if !summary.checksum_matches {
      self.printer.warning(format!(
        "Kernel #{} ({}): CheckSum {} doesn't match the computed {}.", index, name, declared, computed
      ));
    }

    self.kernels.push(summary);
    Ok(())
  }

  /**
    Dumps the tokens of one patch list, returning how many there were.

    A known token's fields are dumped while they fit in its declared body; whatever body is left
    over is dumped as hex. Unknown tokens are dumped entirely as hex. Either way the cursor moves
    exactly `Size` bytes per token, plus the inline data when `inline_data` is on.
  */
  fn process_patch_tokens(&mut self, tokens: &mut ByteCursor<'_>) -> Result<usize> {
    let schema = self.schema;
    let mut count = 0;

    while !tokens.is_empty() {
      let token_offset = tokens.offset();
      let token_id = tokens.read_u32("Token")?;
      let size     = tokens.read_u32("Size")?;
      if size < TOKEN_HEADER_SIZE {
        return Err(CodecError::TokenTooSmall{ token: token_id, size, offset: token_offset });
      }
      let body_size = (size - TOKEN_HEADER_SIZE) as u64;
      let mut body = tokens.section(body_size, "patch token")?;

      match schema.tokens.get(token_id) {

        Some(token) => {
          self.ptm.block(&token.name);
          self.ptm.field(FieldWidth::DoubleWord, "Token", token_id as u64);
          self.ptm.field(FieldWidth::DoubleWord, "Size", size as u64);

          let mut used = 0u64;
          let mut inline_data_size = 0u64;
          for field in &token.fields {
            used += field.width.bytes() as u64;
            if used > body_size {
              break;
            }
            let value = body.read_field(field.width, &field.name)?;
            self.ptm.field(field.width, &field.name, value);
            if &*field.name == INLINE_DATA_FIELD {
              inline_data_size = value;
            }
          }

          let mut hex = body.take(body.remaining() as u64, "patch token")?.to_vec();
          if self.options.inline_data && inline_data_size > 0 {
            hex.extend_from_slice(tokens.take(inline_data_size, "inline data")?);
          }
          if !hex.is_empty() {
            self.ptm.hex(&hex);
          }
        }

        None => {
          tracing::trace!("Unidentified token {} of {} bytes at offset {}.", token_id, size, token_offset);
          self.ptm.block(UNIDENTIFIED_TOKEN);
          self.ptm.field(FieldWidth::DoubleWord, "Token", token_id as u64);
          self.ptm.field(FieldWidth::DoubleWord, "Size", size as u64);
          let hex = body.take(body_size, "patch token")?;
          if !hex.is_empty() {
            self.ptm.hex(hex);
          }
        }

      }

      count += 1;
    }

    Ok(count)
  }
}

/**
  The kernel name held in a zero-padded name field. It must come back byte for byte from its
  `KernelName` line, so it has to be UTF-8 without whitespace or control characters, followed by
  nothing but zeros.
*/
fn kernel_name(bytes: &[u8], kernel: u32) -> Result<String> {
  let end = bytes.iter().position(|&byte| byte == 0).unwrap_or(bytes.len());
  let unrepresentable = || CodecError::UnrepresentableKernelName{
    kernel,
    name: String::from_utf8_lossy(bytes).into_owned()
  };

  if end == 0 || bytes[end..].iter().any(|&byte| byte != 0) {
    return Err(unrepresentable());
  }
  let name = std::str::from_utf8(&bytes[..end]).map_err(|_| unrepresentable())?;
  if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
    return Err(unrepresentable());
  }
  Ok(name.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
  use proptest::prelude::*;

  use super::*;
  use crate::container::{ElfSections, MAGIC_CL};
  use crate::isa::NoIsa;

  /// "Disassembles" machine code into one hex byte per line and assembles that text back.
  #[derive(Default)]
  pub(crate) struct HexIsa {
    pub device: Option<u32>,
  }

  impl IsaAssembler for HexIsa {
    fn set_device(&mut self, core_family: u32) {
      self.device = Some(core_family);
    }

    fn set_product(&mut self, _product: &str) {}

    fn disassemble(&self, machine_code: &[u8]) -> Option<String> {
      Some(machine_code.iter().map(|byte| format!("{:02x}\n", byte)).collect())
    }

    fn assemble(&self, text: &str) -> Option<Vec<u8>> {
      text.lines().map(|line| u8::from_str_radix(line.trim(), 16).ok()).collect()
    }
  }

  pub(crate) fn words(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|value| value.to_le_bytes()).collect()
  }

  pub(crate) fn token(id: u32, body: &[u8]) -> Vec<u8> {
    let mut bytes = words(&[id, body.len() as u32 + TOKEN_HEADER_SIZE]);
    bytes.extend_from_slice(body);
    bytes
  }

  pub(crate) fn program(kernels: u32, patch_list: &[u8]) -> Vec<u8> {
    let mut bytes = words(&[MAGIC_CL, 1085, 12, 8, kernels, 0, patch_list.len() as u32]);
    bytes.extend_from_slice(patch_list);
    bytes
  }

  #[derive(Clone)]
  pub(crate) struct KernelParts {
    pub name       : Vec<u8>,
    pub heap       : Vec<u8>,
    pub unpadded   : u32,
    pub general    : Vec<u8>,
    pub dynamic    : Vec<u8>,
    pub surface    : Vec<u8>,
    pub patch_list : Vec<u8>,
  }

  impl KernelParts {
    pub fn new(name: &str) -> Self {
      let mut name = name.as_bytes().to_vec();
      name.resize((name.len() / 4 + 1) * 4, 0);
      KernelParts{
        name,
        heap       : (0..64).collect(),
        unpadded   : 10,
        general    : vec![],
        dynamic    : vec![0xd0; 8],
        surface    : vec![0x50; 16],
        patch_list : token(19, &words(&[0x40]))
      }
    }

    pub fn blob(&self) -> Vec<u8> {
      [&self.name, &self.heap, &self.general, &self.dynamic, &self.surface, &self.patch_list]
        .iter()
        .flat_map(|part| part.iter().copied())
        .collect()
    }

    pub fn bytes(&self) -> Vec<u8> {
      let blob = self.blob();
      let mut bytes = words(&[kernel_checksum(&blob)]);
      bytes.extend_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
      bytes.extend(words(&[
        self.name.len() as u32,
        self.patch_list.len() as u32,
        self.heap.len() as u32,
        self.general.len() as u32,
        self.dynamic.len() as u32,
        self.surface.len() as u32,
        self.unpadded,
      ]));
      bytes.extend(blob);
      bytes
    }
  }

  fn decode_with(data: &[u8], isa: &mut dyn IsaAssembler, options: DecodeOptions)
    -> (Result<DecodedProgram>, MessagePrinter)
  {
    let schema = Schema::builtin().unwrap();
    let mut decoder = BinaryDecoder::new(&schema, isa, options, MessagePrinter::new(true));
    let result = decoder.decode(data);
    (result, decoder.printer)
  }

  fn decode(data: &[u8]) -> (Result<DecodedProgram>, MessagePrinter) {
    decode_with(data, &mut NoIsa, DecodeOptions::default())
  }

  #[test]
  fn decodes_a_kernel() {
    let mut kernel = KernelParts::new("add");
    // A known token with four bytes more than its fields, then an unknown one.
    let mut patch_list = token(19, &words(&[0x40, 0xdead]));
    patch_list.extend(token(200, &[1, 2, 0x3f]));
    kernel.patch_list = patch_list;

    let mut data = program(1, &token(19, &words(&[7])));
    data.extend(kernel.bytes());

    let (result, printer) = decode(&data);
    let decoded = result.unwrap();
    let ptm = &decoded.ptm;

    assert!(ptm.starts_with("ProgramBinaryHeader:\n\t4 Magic 1229870147\n"));
    assert!(ptm.contains("\t4 NumberOfKernels 1\n"));
    assert!(ptm.contains("PATCH_TOKEN_MEDIA_INTERFACE_DESCRIPTOR_LOAD:\n\t4 Token 19\n\t4 Size 12\n\t4 InterfaceDescriptorDataOffset 7\n"));
    assert!(ptm.contains("Kernel #0\nKernelBinaryHeader:\n"));
    assert!(ptm.contains("\t8 ShaderHashCode 1234605616436508552\n"));
    assert!(ptm.contains("\tKernelName add\n"));
    assert!(ptm.contains("\t4 InterfaceDescriptorDataOffset 64\n\tHex ad de 0 0\n"));
    assert!(ptm.contains("Unidentified PatchToken:\n\t4 Token 200\n\t4 Size 11\n\tHex 1 2 3f\n"));

    assert_eq!(decoded.files.get("add_KernelHeap.dat"), Some(&kernel.heap[..]));
    assert_eq!(decoded.files.get("add_DynamicStateHeap.bin"), Some(&kernel.dynamic[..]));
    assert_eq!(decoded.files.get("add_SurfaceStateHeap.bin"), Some(&kernel.surface[..]));
    assert!(decoded.files.get("add_GeneralStateHeap.bin").is_none());

    let summary = &decoded.kernels[0];
    assert_eq!((summary.token_count, summary.heap_size, summary.unpadded_size), (2, 64, 10));
    assert!(summary.checksum_matches);
    assert_eq!(printer.warnings().count(), 0);
  }

  #[test]
  fn disassembles_through_the_isa_port() {
    let kernel = KernelParts::new("k");
    let mut data = program(1, &[]);
    data.extend(kernel.bytes());

    let mut isa = HexIsa::default();
    let (result, _) = decode_with(&data, &mut isa, DecodeOptions::default());
    let decoded = result.unwrap();

    assert_eq!(isa.device, Some(12));
    let text = decoded.files.get("k_KernelHeap.asm").unwrap();
    // Only the unpadded part of the heap goes to the disassembler.
    assert_eq!(std::str::from_utf8(text).unwrap().lines().count(), 10);
    assert!(decoded.files.get("k_KernelHeap.dat").is_none());
    assert!(decoded.kernels[0].disassembled);
  }

  #[test]
  fn padding_can_be_stripped() {
    let kernel = KernelParts::new("k");
    let mut data = program(1, &[]);
    data.extend(kernel.bytes());

    let options = DecodeOptions{ ignore_isa_padding: true, ..DecodeOptions::default() };
    let (result, _) = decode_with(&data, &mut NoIsa, options);
    assert_eq!(result.unwrap().files.get("k_KernelHeap.dat"), Some(&kernel.heap[..10]));
  }

  #[test]
  fn zero_kernels_is_a_warning() {
    let (result, printer) = decode(&program(0, &[]));
    let decoded = result.unwrap();

    assert!(printer.log().contains("Number of Kernels is 0."));
    assert!(decoded.files.is_empty());
    assert!(!decoded.ptm.contains("Kernel #"));
    assert_eq!(decoded.ptm.lines().filter(|line| line.ends_with(':')).count(), 1);
  }

  #[test]
  fn general_state_heap_is_dumped_with_a_warning() {
    let mut kernel = KernelParts::new("k");
    kernel.general = vec![9; 4];
    let mut data = program(1, &[]);
    data.extend(kernel.bytes());

    let (result, printer) = decode(&data);
    assert_eq!(result.unwrap().files.get("k_GeneralStateHeap.bin"), Some(&[9u8; 4][..]));
    assert!(printer.log().contains("GeneralStateHeapSize wasn't 0."));
  }

  #[test]
  fn checksum_mismatch_is_reported() {
    let kernel = KernelParts::new("k");
    let mut data = program(1, &[]);
    let kernel_start = data.len();
    data.extend(kernel.bytes());
    data[kernel_start] ^= 0xff;

    let (result, printer) = decode(&data);
    assert!(!result.unwrap().kernels[0].checksum_matches);
    assert!(printer.log().contains("CheckSum"));
  }

  #[test]
  fn unknown_format_is_rejected() {
    let (result, _) = decode(b"\x00\x01\x02\x03 definitely not a device binary");
    let error = result.unwrap_err();
    assert!(matches!(error, CodecError::NoDeviceBinary));
    assert_eq!(error.to_string(), "Device Binary section was not found.");
  }

  #[test]
  fn empty_kernel_name_is_fatal() {
    let mut kernel = KernelParts::new("k");
    kernel.name = vec![];
    let mut data = program(1, &[]);
    data.extend(kernel.bytes());

    assert!(matches!(decode(&data).0, Err(CodecError::EmptyKernelName{ kernel: 0 })));
  }

  #[test]
  fn names_that_cannot_be_written_back_are_fatal() {
    let names: [&[u8]; 5] = [b"a\xffb\0", b"ab  \0\0\0\0", b"a\tb\0", b"ab\0c", b"\0\0\0\0"];
    for name in names {
      let mut kernel = KernelParts::new("k");
      kernel.name = name.to_vec();
      let mut data = program(1, &[]);
      data.extend(kernel.bytes());

      match decode(&data).0 {
        Err(CodecError::UnrepresentableKernelName{ kernel: 0, .. }) => {}
        other => panic!("expected {:?} to be refused, got {:?}", name, other.map(|decoded| decoded.ptm))
      }
    }

    // Unterminated names that fill the field exactly are fine.
    let mut kernel = KernelParts::new("k");
    kernel.name = b"abcd".to_vec();
    let mut data = program(1, &[]);
    data.extend(kernel.bytes());
    let (result, _) = decode(&data);
    assert!(result.unwrap().ptm.contains("\tKernelName abcd\n"));
  }

  #[test]
  fn oversized_heap_is_fatal() {
    let kernel = KernelParts::new("k");
    let mut bytes = kernel.bytes();
    // KernelHeapSize lives at offset 20 of the kernel header.
    bytes[20..24].copy_from_slice(&0x1000_0000u32.to_le_bytes());
    let mut data = program(1, &[]);
    data.extend(bytes);

    match decode(&data).0 {
      Err(CodecError::Truncated{ what, needed, .. }) => {
        assert_eq!(what, "kernel heap");
        assert_eq!(needed, 0x1000_0000);
      }
      other => panic!("expected a truncation, got {:?}", other.map(|_| ()))
    }
  }

  #[test]
  fn unpadded_size_must_fit_in_the_heap() {
    let mut kernel = KernelParts::new("k");
    kernel.unpadded = 65;
    let mut data = program(1, &[]);
    data.extend(kernel.bytes());
    assert!(matches!(decode(&data).0, Err(CodecError::Truncated{ .. })));
  }

  #[test]
  fn token_smaller_than_its_header_is_fatal() {
    let data = program(0, &words(&[19, 4]));
    match decode(&data).0 {
      Err(CodecError::TokenTooSmall{ token, size, offset }) => {
        assert_eq!((token, size, offset), (19, 4, 28));
      }
      other => panic!("expected a token size error, got {:?}", other.map(|_| ()))
    }
  }

  #[test]
  fn token_overrunning_its_patch_list_is_fatal() {
    let mut patch_list = words(&[19, 64]);
    patch_list.extend(words(&[0; 4]));
    assert!(matches!(decode(&program(0, &patch_list)).0, Err(CodecError::Truncated{ .. })));
  }

  #[test]
  fn short_known_token_dumps_only_whole_fields() {
    // PATCH_TOKEN_EXECUTION_ENVIRONMENT has many fields; give it room for one.
    let (result, _) = decode(&program(0, &token(23, &words(&[8]))));
    let ptm = result.unwrap().ptm;

    assert!(ptm.contains("PATCH_TOKEN_EXECUTION_ENVIRONMENT:\n\t4 Token 23\n\t4 Size 12\n\t4 RequiredWorkGroupSizeX 8\n"));
    assert!(!ptm.contains("Hex"));
  }

  #[test]
  fn inline_data_follows_its_token() {
    // Constant buffer 0 with 6 bytes of inline data.
    let mut patch_list = token(42, &words(&[0, 6]));
    patch_list.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
    let data = program(0, &patch_list);

    let options = DecodeOptions{ inline_data: true, ..DecodeOptions::default() };
    let (result, _) = decode_with(&data, &mut NoIsa, options);
    let ptm = result.unwrap().ptm;
    assert!(ptm.contains("\t4 InlineDataSize 6\n\tHex 1 2 3 4 5 6\n"));

    // Without the option the inline bytes are read as a token header and are too short.
    assert!(decode(&data).0.is_err());
  }

  #[test]
  fn elf_sections_become_side_files() {
    let mut device_binary = program(1, &[]);
    device_binary.extend(KernelParts::new("k").bytes());
    let elf =
      container::wrap(&ElfSections{
        device_binary : &device_binary,
        build_options : Some(&b"-g"[..]),
        llvm          : Some(&b"BC"[..]),
        spirv         : None
      }).unwrap();

    let decoded = decode(&elf).0.unwrap();
    assert_eq!(decoded.files.get("build.bin"), Some(&b"-g"[..]));
    assert_eq!(decoded.files.get("llvm.bin"), Some(&b"BC"[..]));
    assert!(decoded.files.get("spirv.bin").is_none());
    assert!(decoded.ptm.contains("\tKernelName k\n"));

    let mut store = MemoryFiles::new();
    decoded.write_to(&mut store).unwrap();
    assert!(store.contains(PTM_FILE));
    assert!(store.contains("k_KernelHeap.dat"));
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_token_is_consumed_exactly(
      tokens in prop::collection::vec((0u32..64, prop::collection::vec(any::<u8>(), 0..40)), 0..12)
    ) {
      let patch_list: Vec<u8> = tokens.iter().flat_map(|(id, body)| token(*id, body)).collect();
      let (result, _) = decode(&program(0, &patch_list));
      let ptm = result.unwrap().ptm;

      let sizes: Vec<String> =
        ptm.lines()
           .filter(|line| line.starts_with("\t4 Size "))
           .map(str::to_string)
           .collect();
      let expected: Vec<String> =
        tokens.iter()
              .map(|(_, body)| format!("\t4 Size {}", body.len() as u32 + TOKEN_HEADER_SIZE))
              .collect();
      prop_assert_eq!(sizes, expected);
    }
  }
}
