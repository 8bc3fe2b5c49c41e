/*!
  Finding the patch-token stream inside whatever the user hands us, and putting it back.

  A device binary arrives either bare, starting with the `MAGIC_CL` program header magic, or
  wrapped in an OpenCL ELF whose sections carry the device binary next to the build options and
  the intermediate representation (LLVM bitcode or SPIR-V) it was compiled from. The ELF wrapper
  is a 64-bit little-endian file with vendor section types and no program headers.
*/

use object::elf::{FileHeader64, ELFMAG};
use object::read::elf::{FileHeader as _, SectionHeader as _};
use object::write::elf::{FileHeader, SectionHeader, Writer};
use object::write::StringId;
use object::Endianness;

use crate::error::{CodecError, Result};

/// `"INTC"` read as a little-endian `u32`.
pub const MAGIC_CL: u32 = 0x494E_5443;

pub const ET_OPENCL_EXECUTABLE   : u16 = 0xff04;
pub const SHT_OPENCL_LLVM_BINARY : u32 = 0xff00_0003;
pub const SHT_OPENCL_DEV_BINARY  : u32 = 0xff00_0005;
pub const SHT_OPENCL_OPTIONS     : u32 = 0xff00_0006;
pub const SHT_OPENCL_SPIRV       : u32 = 0xff00_0009;

pub const DEV_BINARY_SECTION_NAME : &str = "Intel(R) OpenCL Device Binary";
pub const OPTIONS_SECTION_NAME    : &str = "BuildOptions";
pub const SPIRV_SECTION_NAME      : &str = "SPIRV Object";
pub const LLVM_SECTION_NAME       : &str = "Intel(R) OpenCL LLVM Object";

pub const BUILD_OPTIONS_FILE : &str = "build.bin";
pub const LLVM_FILE          : &str = "llvm.bin";
pub const SPIRV_FILE         : &str = "spirv.bin";

const SECTION_ALIGNMENT: usize = 8;

/// The sections of an OpenCL ELF the codec cares about.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ElfSections<'a> {
  pub device_binary : &'a [u8],
  pub build_options : Option<&'a [u8]>,
  pub llvm          : Option<&'a [u8]>,
  pub spirv         : Option<&'a [u8]>,
}

impl<'a> ElfSections<'a> {

  /// The non-device sections, with the side-file name each is dumped to.
  pub fn side_files(&self) -> Vec<(&'static str, &'a [u8])> {
    [
      (BUILD_OPTIONS_FILE, self.build_options),
      (LLVM_FILE,          self.llvm),
      (SPIRV_FILE,         self.spirv),
    ]
      .into_iter()
      .filter_map(|(name, data)| data.map(|data| (name, data)))
      .collect()
  }

  /// Sections in the order they are written: IR first, then options, then the device binary.
  fn layout(&self) -> Vec<(u32, &'static str, &'a [u8])> {
    let mut sections = vec![];
    if let Some(spirv) = self.spirv {
      sections.push((SHT_OPENCL_SPIRV, SPIRV_SECTION_NAME, spirv));
    }
    if let Some(llvm) = self.llvm {
      sections.push((SHT_OPENCL_LLVM_BINARY, LLVM_SECTION_NAME, llvm));
    }
    if let Some(options) = self.build_options {
      sections.push((SHT_OPENCL_OPTIONS, OPTIONS_SECTION_NAME, options));
    }
    sections.push((SHT_OPENCL_DEV_BINARY, DEV_BINARY_SECTION_NAME, self.device_binary));
    sections
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeviceBinary<'a> {
  Raw(&'a [u8]),
  Elf(ElfSections<'a>),
}

impl<'a> DeviceBinary<'a> {
  pub fn patch_tokens(&self) -> &'a [u8] {
    match self {
      DeviceBinary::Raw(data) => data,
      DeviceBinary::Elf(sections) => sections.device_binary
    }
  }
}

pub fn is_raw_device_binary(data: &[u8]) -> bool {
  data.len() >= 4 && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == MAGIC_CL
}

/// Works out what `data` is. Anything that is neither a bare device binary nor an ELF carrying
/// one is `CodecError::NoDeviceBinary`.
pub fn locate(data: &[u8]) -> Result<DeviceBinary<'_>> {
  if is_raw_device_binary(data) {
    tracing::debug!("Input is a bare device binary of {} bytes.", data.len());
    return Ok(DeviceBinary::Raw(data));
  }
  if data.starts_with(&ELFMAG) {
    return read_elf(data).map(DeviceBinary::Elf);
  }
  Err(CodecError::NoDeviceBinary)
}

fn read_elf(data: &[u8]) -> Result<ElfSections<'_>> {
  let header   = FileHeader64::<Endianness>::parse(data)?;
  let endian   = header.endian()?;
  let sections = header.sections(endian, data)?;

  if header.e_type(endian) != ET_OPENCL_EXECUTABLE {
    tracing::debug!("ELF type is {:#x}, not an OpenCL executable.", header.e_type(endian));
  }

  let mut device_binary = None;
  let mut found = ElfSections::default();
  for section in sections.iter() {
    let target =
      match section.sh_type(endian) {
        SHT_OPENCL_DEV_BINARY  => &mut device_binary,
        SHT_OPENCL_OPTIONS     => &mut found.build_options,
        SHT_OPENCL_LLVM_BINARY => &mut found.llvm,
        SHT_OPENCL_SPIRV       => &mut found.spirv,
        _ => continue
      };
    *target = Some(section.data(endian, data)?);
  }

  found.device_binary = device_binary.ok_or(CodecError::NoDeviceBinary)?;
  tracing::debug!("Device binary section holds {} bytes.", found.device_binary.len());
  Ok(found)
}

/// Builds an OpenCL ELF around the given sections.
pub fn wrap(sections: &ElfSections<'_>) -> Result<Vec<u8>> {
  let layout = sections.layout();
  let mut buffer = Vec::new();

  {
    let mut writer = Writer::new(Endianness::Little, true, &mut buffer);
    writer.reserve_file_header();
    writer.reserve_null_section_index();

    let mut placed: Vec<(StringId, usize)> = vec![];
    for (_, name, data) in &layout {
      let name_id = writer.add_section_name(name.as_bytes());
      writer.reserve_section_index();
      let alignment = if data.is_empty() { 1 } else { SECTION_ALIGNMENT };
      let offset = writer.reserve(data.len(), alignment);
      placed.push((name_id, offset));
    }
    writer.reserve_shstrtab_section_index();
    writer.reserve_shstrtab();
    writer.reserve_section_headers();

    writer.write_file_header(&FileHeader{
      os_abi      : 0,
      abi_version : 0,
      e_type      : ET_OPENCL_EXECUTABLE,
      e_machine   : 0,
      e_entry     : 0,
      e_flags     : 0
    })?;

    // Empty sections are reserved unaligned, so they are written unaligned too.
    for (_, _, data) in &layout {
      if !data.is_empty() {
        writer.write_align(SECTION_ALIGNMENT);
        writer.write(data);
      }
    }
    writer.write_shstrtab();

    writer.write_null_section_header();
    for ((sh_type, _, data), (name_id, offset)) in layout.iter().zip(placed) {
      writer.write_section_header(&SectionHeader{
        name         : Some(name_id),
        sh_type      : *sh_type,
        sh_flags     : 0,
        sh_addr      : 0,
        sh_offset    : offset as u64,
        sh_size      : data.len() as u64,
        sh_link      : 0,
        sh_info      : 0,
        sh_addralign : SECTION_ALIGNMENT as u64,
        sh_entsize   : 0
      });
    }
    writer.write_shstrtab_section_header();
  }

  Ok(buffer)
}
