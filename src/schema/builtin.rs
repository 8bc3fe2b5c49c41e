/*!
  The built-in default schema, used when no schema directory is supplied.

  The layouts are written down once, as data. The header-like text the loader consumes is rendered
  from these tables, so the default schema goes through exactly the same parsing as an external
  one and there is no second, hand-maintained copy of any layout.
*/

use std::fmt::Write;

use super::field::FieldWidth;

const U32: FieldWidth = FieldWidth::DoubleWord;
const U64: FieldWidth = FieldWidth::QuadWord;

pub const PROGRAM_HEADER_RECORD : &str = "SProgramBinaryHeader";
pub const KERNEL_HEADER_RECORD  : &str = "SKernelBinaryHeader";
pub const KERNEL_COMMON_RECORD  : &str = "SKernelBinaryHeaderCommon";
pub const TOKEN_ENUM            : &str = "PATCH_TOKEN";
pub const ITEM_HEADER_RECORD    : &str = "SPatchItemHeader";

/// A record declaration: `struct name : base { fields };`.
pub struct RecordDecl {
  pub name   : &'static str,
  pub base   : Option<&'static str>,
  pub fields : &'static [(FieldWidth, &'static str)],
}

/// An enumerator of `enum PATCH_TOKEN`, optionally annotated with its companion record.
pub struct TokenDecl {
  pub id     : u8,
  pub name   : &'static str,
  pub record : Option<&'static str>,
}

pub static RECORDS: &[RecordDecl] = &[
  RecordDecl{
    name: PROGRAM_HEADER_RECORD,
    base: None,
    fields: &[
      (U32, "Magic"),
      (U32, "Version"),
      (U32, "Device"),
      (U32, "GPUPointerSizeInBytes"),
      (U32, "NumberOfKernels"),
      (U32, "SteppingId"),
      (U32, "PatchListSize"),
    ]
  },
  RecordDecl{
    name: KERNEL_HEADER_RECORD,
    base: None,
    fields: &[
      (U32, "CheckSum"),
      (U64, "ShaderHashCode"),
      (U32, "KernelNameSize"),
      (U32, "PatchListSize"),
    ]
  },
  RecordDecl{
    name: KERNEL_COMMON_RECORD,
    base: Some(KERNEL_HEADER_RECORD),
    fields: &[
      (U32, "KernelHeapSize"),
      (U32, "GeneralStateHeapSize"),
      (U32, "DynamicStateHeapSize"),
      (U32, "SurfaceStateHeapSize"),
      (U32, "KernelUnpaddedSize"),
    ]
  },
  RecordDecl{
    name: ITEM_HEADER_RECORD,
    base: None,
    fields: &[
      (U32, "Token"),
      (U32, "Size"),
    ]
  },
  RecordDecl{
    name: "SPatchSamplerStateArray",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Offset"),
      (U32, "Count"),
      (U32, "BorderColorOffset"),
    ]
  },
  RecordDecl{
    name: "SPatchBindingTableState",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Offset"),
      (U32, "Count"),
      (U32, "SurfaceStateOffset"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateScratchSurface",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Offset"),
      (U32, "PerThreadScratchSpaceSize"),
    ]
  },
  RecordDecl{
    name: "SPatchGlobalMemoryObjectKernelArgument",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ArgumentNumber"),
      (U32, "Offset"),
      (U32, "LocationIndex"),
      (U32, "LocationIndex2"),
      (U32, "IsEmulationArgument"),
    ]
  },
  RecordDecl{
    name: "SPatchImageMemoryObjectKernelArgument",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ArgumentNumber"),
      (U32, "Type"),
      (U32, "Offset"),
      (U32, "LocationIndex"),
      (U32, "LocationIndex2"),
      (U32, "Writeable"),
      (U32, "Transformable"),
      (U32, "needBindlessHandle"),
      (U32, "IsEmulationArgument"),
      (U32, "btiOffset"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateLocalSurface",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Offset"),
      (U32, "TotalInlineLocalMemorySize"),
    ]
  },
  RecordDecl{
    name: "SPatchSamplerKernelArgument",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ArgumentNumber"),
      (U32, "Type"),
      (U32, "Offset"),
      (U32, "LocationIndex"),
      (U32, "LocationIndex2"),
      (U32, "needBindlessHandle"),
      (U32, "TextureMask"),
      (U32, "IsEmulationArgument"),
      (U32, "btiOffset"),
    ]
  },
  RecordDecl{
    name: "SPatchDataParameterBuffer",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Type"),
      (U32, "ArgumentNumber"),
      (U32, "Offset"),
      (U32, "DataSize"),
      (U32, "SourceOffset"),
      (U32, "LocationIndex"),
      (U32, "LocationIndex2"),
      (U32, "IsEmulationArgument"),
    ]
  },
  RecordDecl{
    name: "SPatchMediaVFEState",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ScratchSpaceOffset"),
      (U32, "PerThreadScratchSpace"),
    ]
  },
  RecordDecl{
    name: "SPatchMediaInterfaceDescriptorLoad",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "InterfaceDescriptorDataOffset"),
    ]
  },
  RecordDecl{
    name: "SPatchInterfaceDescriptorData",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Offset"),
      (U32, "SamplerStateOffset"),
      (U32, "KernelOffset"),
      (U32, "BindingTableOffset"),
    ]
  },
  RecordDecl{
    name: "SPatchThreadPayload",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "HeaderPresent"),
      (U32, "LocalIDXPresent"),
      (U32, "LocalIDYPresent"),
      (U32, "LocalIDZPresent"),
      (U32, "LocalIDFlattenedPresent"),
      (U32, "IndirectPayloadStorage"),
      (U32, "UnusedPerThreadConstantPresent"),
      (U32, "GetLocalIDPresent"),
      (U32, "GetGroupIDPresent"),
      (U32, "GetGlobalOffsetPresent"),
      (U32, "StageInGridOriginPresent"),
      (U32, "StageInGridSizePresent"),
      (U32, "OffsetToSkipPerThreadDataLoad"),
      (U32, "OffsetToSkipSetFFIDGP"),
      (U32, "PassInlineData"),
    ]
  },
  RecordDecl{
    name: "SPatchExecutionEnvironment",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "RequiredWorkGroupSizeX"),
      (U32, "RequiredWorkGroupSizeY"),
      (U32, "RequiredWorkGroupSizeZ"),
      (U32, "LargestCompiledSIMDSize"),
      (U32, "CompiledSubGroupsNumber"),
      (U32, "HasBarriers"),
      (U32, "DisableMidThreadPreemption"),
      (U32, "CompiledSIMD8"),
      (U32, "CompiledSIMD16"),
      (U32, "CompiledSIMD32"),
      (U32, "HasDeviceEnqueue"),
      (U32, "MayAccessUndeclaredResource"),
      (U32, "UsesFencesForReadWriteImages"),
      (U32, "UsesStatelessSpillFill"),
      (U32, "UsesMultiScratchSpaces"),
      (U32, "IsCoherent"),
      (U32, "IsInitializer"),
      (U32, "IsFinalizer"),
      (U32, "SubgroupIndependentForwardProgressRequired"),
      (U32, "CompiledForGreaterThan4GBBuffers"),
      (U32, "NumGRFRequired"),
      (U32, "WorkgroupWalkOrderDims"),
      (U32, "HasGlobalAtomics"),
    ]
  },
  RecordDecl{
    name: "SPatchDataParameterStream",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "DataParameterStreamSize"),
    ]
  },
  RecordDecl{
    name: "SPatchKernelArgumentInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ArgumentNumber"),
      (U32, "AddressQualifierSize"),
      (U32, "AccessQualifierSize"),
      (U32, "ArgumentNameSize"),
      (U32, "TypeNameSize"),
      (U32, "TypeQualifierSize"),
    ]
  },
  RecordDecl{
    name: "SPatchKernelAttributesInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "AttributesSize"),
    ]
  },
  RecordDecl{
    name: "SPatchString",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Index"),
      (U32, "StringSize"),
    ]
  },
  RecordDecl{
    name: "SPatchStatelessGlobalMemoryObjectKernelArgument",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ArgumentNumber"),
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
      (U32, "LocationIndex"),
      (U32, "LocationIndex2"),
      (U32, "IsEmulationArgument"),
    ]
  },
  RecordDecl{
    name: "SPatchStatelessConstantMemoryObjectKernelArgument",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ArgumentNumber"),
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
      (U32, "LocationIndex"),
      (U32, "LocationIndex2"),
      (U32, "IsEmulationArgument"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateStatelessPrintfSurface",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "PrintfSurfaceIndex"),
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateStatelessEventPoolSurface",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "EventPoolSurfaceIndex"),
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateStatelessPrivateSurface",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
      (U32, "PerThreadPrivateMemorySize"),
      (U32, "IsSimtThread"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateGlobalMemorySurfaceProgramBinaryInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "Type"),
      (U32, "GlobalBufferIndex"),
      (U32, "InlineDataSize"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateConstantMemorySurfaceProgramBinaryInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ConstantBufferIndex"),
      (U32, "InlineDataSize"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateStatelessGlobalMemorySurfaceWithInitialization",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "GlobalBufferIndex"),
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateStatelessConstantMemorySurfaceWithInitialization",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ConstantBufferIndex"),
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
    ]
  },
  RecordDecl{
    name: "SPatchAllocateStatelessDefaultDeviceQueueSurface",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "SurfaceStateHeapOffset"),
      (U32, "DataParamOffset"),
      (U32, "DataParamSize"),
    ]
  },
  RecordDecl{
    name: "SPatchGlobalPointerProgramBinaryInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "GlobalBufferIndex"),
      (U64, "GlobalPointerOffset"),
      (U32, "BufferType"),
      (U32, "BufferIndex"),
    ]
  },
  RecordDecl{
    name: "SPatchConstantPointerProgramBinaryInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "ConstantBufferIndex"),
      (U64, "ConstantPointerOffset"),
      (U32, "BufferType"),
      (U32, "BufferIndex"),
    ]
  },
  RecordDecl{
    name: "SPatchGtpinFreeGRFInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "BufferSize"),
    ]
  },
  RecordDecl{
    name: "SPatchFunctionTableInfo",
    base: Some(ITEM_HEADER_RECORD),
    fields: &[
      (U32, "NumEntries"),
    ]
  },
];

pub static TOKENS: &[TokenDecl] = &[
  TokenDecl{ id:  0, name: "PATCH_TOKEN_UNKNOWN", record: None },
  TokenDecl{ id:  1, name: "PATCH_TOKEN_MEDIA_STATE_POINTERS", record: None },
  TokenDecl{ id:  2, name: "PATCH_TOKEN_STATE_SIP", record: None },
  TokenDecl{ id:  3, name: "PATCH_TOKEN_CS_URB_STATE", record: None },
  TokenDecl{ id:  4, name: "PATCH_TOKEN_CONSTANT_BUFFER", record: None },
  TokenDecl{ id:  5, name: "PATCH_TOKEN_SAMPLER_STATE_ARRAY", record: Some("SPatchSamplerStateArray") },
  TokenDecl{ id:  6, name: "PATCH_TOKEN_INTERFACE_DESCRIPTOR", record: None },
  TokenDecl{ id:  7, name: "PATCH_TOKEN_VFE_STATE", record: None },
  TokenDecl{ id:  8, name: "PATCH_TOKEN_BINDING_TABLE_STATE", record: Some("SPatchBindingTableState") },
  TokenDecl{ id:  9, name: "PATCH_TOKEN_ALLOCATE_SCRATCH_SURFACE", record: Some("SPatchAllocateScratchSurface") },
  TokenDecl{ id: 10, name: "PATCH_TOKEN_ALLOCATE_SIP_SURFACE", record: None },
  TokenDecl{ id: 11, name: "PATCH_TOKEN_GLOBAL_MEMORY_OBJECT_KERNEL_ARGUMENT", record: Some("SPatchGlobalMemoryObjectKernelArgument") },
  TokenDecl{ id: 12, name: "PATCH_TOKEN_IMAGE_MEMORY_OBJECT_KERNEL_ARGUMENT", record: Some("SPatchImageMemoryObjectKernelArgument") },
  TokenDecl{ id: 13, name: "PATCH_TOKEN_CONSTANT_MEMORY_OBJECT_KERNEL_ARGUMENT", record: None },
  TokenDecl{ id: 14, name: "PATCH_TOKEN_ALLOCATE_SURFACE_WITH_INITIALIZATION", record: None },
  TokenDecl{ id: 15, name: "PATCH_TOKEN_ALLOCATE_LOCAL_SURFACE", record: Some("SPatchAllocateLocalSurface") },
  TokenDecl{ id: 16, name: "PATCH_TOKEN_SAMPLER_KERNEL_ARGUMENT", record: Some("SPatchSamplerKernelArgument") },
  TokenDecl{ id: 17, name: "PATCH_TOKEN_DATA_PARAMETER_BUFFER", record: Some("SPatchDataParameterBuffer") },
  TokenDecl{ id: 18, name: "PATCH_TOKEN_MEDIA_VFE_STATE", record: Some("SPatchMediaVFEState") },
  TokenDecl{ id: 19, name: "PATCH_TOKEN_MEDIA_INTERFACE_DESCRIPTOR_LOAD", record: Some("SPatchMediaInterfaceDescriptorLoad") },
  TokenDecl{ id: 20, name: "PATCH_TOKEN_MEDIA_CURBE_LOAD", record: None },
  TokenDecl{ id: 21, name: "PATCH_TOKEN_INTERFACE_DESCRIPTOR_DATA", record: Some("SPatchInterfaceDescriptorData") },
  TokenDecl{ id: 22, name: "PATCH_TOKEN_THREAD_PAYLOAD", record: Some("SPatchThreadPayload") },
  TokenDecl{ id: 23, name: "PATCH_TOKEN_EXECUTION_ENVIRONMENT", record: Some("SPatchExecutionEnvironment") },
  TokenDecl{ id: 24, name: "PATCH_TOKEN_ALLOCATE_PRIVATE_MEMORY", record: None },
  TokenDecl{ id: 25, name: "PATCH_TOKEN_DATA_PARAMETER_STREAM", record: Some("SPatchDataParameterStream") },
  TokenDecl{ id: 26, name: "PATCH_TOKEN_KERNEL_ARGUMENT_INFO", record: Some("SPatchKernelArgumentInfo") },
  TokenDecl{ id: 27, name: "PATCH_TOKEN_KERNEL_ATTRIBUTES_INFO", record: Some("SPatchKernelAttributesInfo") },
  TokenDecl{ id: 28, name: "PATCH_TOKEN_STRING", record: Some("SPatchString") },
  TokenDecl{ id: 29, name: "PATCH_TOKEN_ALLOCATE_PRINTF_SURFACE", record: None },
  TokenDecl{ id: 30, name: "PATCH_TOKEN_STATELESS_GLOBAL_MEMORY_OBJECT_KERNEL_ARGUMENT", record: Some("SPatchStatelessGlobalMemoryObjectKernelArgument") },
  TokenDecl{ id: 31, name: "PATCH_TOKEN_STATELESS_CONSTANT_MEMORY_OBJECT_KERNEL_ARGUMENT", record: Some("SPatchStatelessConstantMemoryObjectKernelArgument") },
  TokenDecl{ id: 32, name: "PATCH_TOKEN_ALLOCATE_STATELESS_SURFACE_WITH_INITIALIZATION", record: None },
  TokenDecl{ id: 33, name: "PATCH_TOKEN_ALLOCATE_STATELESS_PRINTF_SURFACE", record: Some("SPatchAllocateStatelessPrintfSurface") },
  TokenDecl{ id: 34, name: "PATCH_TOKEN_CB_MAPPING", record: None },
  TokenDecl{ id: 35, name: "PATCH_TOKEN_CB2CR_GATHER_TABLE", record: None },
  TokenDecl{ id: 36, name: "PATCH_TOKEN_ALLOCATE_STATELESS_EVENT_POOL_SURFACE", record: Some("SPatchAllocateStatelessEventPoolSurface") },
  TokenDecl{ id: 37, name: "PATCH_TOKEN_NULL_SURFACE_LOCATION", record: None },
  TokenDecl{ id: 38, name: "PATCH_TOKEN_ALLOCATE_STATELESS_PRIVATE_MEMORY", record: Some("SPatchAllocateStatelessPrivateSurface") },
  TokenDecl{ id: 39, name: "PATCH_TOKEN_ALLOCATE_CONSTANT_MEMORY_SURFACE_WITH_INITIALIZATION", record: None },
  TokenDecl{ id: 40, name: "PATCH_TOKEN_ALLOCATE_GLOBAL_MEMORY_SURFACE_WITH_INITIALIZATION", record: None },
  TokenDecl{ id: 41, name: "PATCH_TOKEN_ALLOCATE_GLOBAL_MEMORY_SURFACE_PROGRAM_BINARY_INFO", record: Some("SPatchAllocateGlobalMemorySurfaceProgramBinaryInfo") },
  TokenDecl{ id: 42, name: "PATCH_TOKEN_ALLOCATE_CONSTANT_MEMORY_SURFACE_PROGRAM_BINARY_INFO", record: Some("SPatchAllocateConstantMemorySurfaceProgramBinaryInfo") },
  TokenDecl{ id: 43, name: "PATCH_TOKEN_ALLOCATE_STATELESS_GLOBAL_MEMORY_SURFACE_WITH_INITIALIZATION", record: Some("SPatchAllocateStatelessGlobalMemorySurfaceWithInitialization") },
  TokenDecl{ id: 44, name: "PATCH_TOKEN_ALLOCATE_STATELESS_CONSTANT_MEMORY_SURFACE_WITH_INITIALIZATION", record: Some("SPatchAllocateStatelessConstantMemorySurfaceWithInitialization") },
  TokenDecl{ id: 45, name: "PATCH_TOKEN_ALLOCATE_STATELESS_DEFAULT_DEVICE_QUEUE_SURFACE", record: Some("SPatchAllocateStatelessDefaultDeviceQueueSurface") },
  TokenDecl{ id: 46, name: "PATCH_TOKEN_STATELESS_DEVICE_QUEUE_KERNEL_ARGUMENT", record: None },
  TokenDecl{ id: 47, name: "PATCH_TOKEN_GLOBAL_POINTER_PROGRAM_BINARY_INFO", record: Some("SPatchGlobalPointerProgramBinaryInfo") },
  TokenDecl{ id: 48, name: "PATCH_TOKEN_CONSTANT_POINTER_PROGRAM_BINARY_INFO", record: Some("SPatchConstantPointerProgramBinaryInfo") },
  TokenDecl{ id: 49, name: "PATCH_TOKEN_CONSTRUCTOR_DESTRUCTOR_KERNEL_PROGRAM_BINARY_INFO", record: None },
  TokenDecl{ id: 50, name: "PATCH_TOKEN_INLINE_VME_SAMPLER_INFO", record: None },
  TokenDecl{ id: 51, name: "PATCH_TOKEN_GTPIN_FREE_GRF_INFO", record: Some("SPatchGtpinFreeGRFInfo") },
  TokenDecl{ id: 52, name: "PATCH_TOKEN_GTPIN_INFO", record: None },
  TokenDecl{ id: 53, name: "PATCH_TOKEN_PROGRAM_SYMBOL_TABLE", record: Some("SPatchFunctionTableInfo") },
  TokenDecl{ id: 54, name: "PATCH_TOKEN_PROGRAM_RELOCATION_TABLE", record: Some("SPatchFunctionTableInfo") },
  TokenDecl{ id: 55, name: "PATCH_TOKEN_MEDIA_VFE_STATE_SLOT1", record: Some("SPatchMediaVFEState") },
];

fn render_record(record: &RecordDecl, text: &mut String) {
  // Writing to a `String` cannot fail.
  match record.base {
    Some(base) => {
      let _ = writeln!(text, "struct {} :", record.name);
      let _ = writeln!(text, "       {}", base);
    }
    None => {
      let _ = writeln!(text, "struct {}", record.name);
    }
  }
  text.push_str("{\n");
  for (width, name) in record.fields {
    let _ = writeln!(text, "    {:<10} {};", width.type_name(), name);
  }
  text.push_str("};\n\n");
}

fn render_tokens(text: &mut String) {
  let _ = writeln!(text, "enum {}", TOKEN_ENUM);
  text.push_str("{\n");
  for token in TOKENS {
    let entry = format!("{},", token.name);
    match token.record {
      Some(record) => {
        let _ = writeln!(text, "    {:<76}// {:<5} @{}@", entry, token.id, record);
      }
      None => {
        let _ = writeln!(text, "    {:<76}// {:<5} - (Unused)", entry, token.id);
      }
    }
  }
  text.push_str("};\n\n");
}

/// Renders the default schema as header text, program header first, in the shape of the
/// compiler's own patch list headers.
pub fn render() -> String {
  let mut text = String::new();
  let mut records = RECORDS.iter();

  // The program header leads, then the token enumeration, then everything else.
  if let Some(program_header) = records.next() {
    render_record(program_header, &mut text);
  }
  render_tokens(&mut text);
  for record in records {
    render_record(record, &mut text);
  }
  text
}

lazy_static! {
  pub static ref BUILTIN_SCHEMA_TEXT: String = render();
}

/// The default schema as a list of lines, ready for `SchemaLoader::load`.
pub fn lines() -> Vec<&'static str> {
  BUILTIN_SCHEMA_TEXT.lines().collect()
}
