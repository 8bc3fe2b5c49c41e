/*!
  The schema describes the binary layout the codec works with: the field list of the program
  header, the field list of the kernel header, and a table of the patch tokens it can lay out.

  A schema is read from C-like header text, either the real patch list headers shipped with the
  compiler (see `SCHEMA_FILES`) or the built-in default in `builtin`. Loading is a pure function
  of the text. A schema that is missing one of its three anchor declarations, or that declares a
  field of an integer type the codec cannot size, is rejected outright: every offset computed from
  such a schema would be meaningless.
*/

mod builtin;
mod field;
mod parser;
mod table;

use std::path::Path;

use crate::error::{CodecError, Result, SchemaError};
use crate::messages::MessagePrinter;

pub use builtin::{
  BUILTIN_SCHEMA_TEXT,
  ITEM_HEADER_RECORD,
  KERNEL_COMMON_RECORD,
  KERNEL_HEADER_RECORD,
  PROGRAM_HEADER_RECORD,
  TOKEN_ENUM
};
pub use field::{Field, FieldWidth, RecordSchema};
pub use parser::find_declaration;
pub use table::{Token, TokenId, TokenTable};

use parser::{is_closing_line, parse_array_len, parse_enum_entry, parse_field_declaration};

/// The header files a schema directory is expected to hold, in the order they are concatenated.
pub const SCHEMA_FILES: &[&str] = &[
  "patch_list.h",
  "patch_shared.h",
  "patch_g7.h",
  "patch_g8.h",
  "patch_g9.h",
  "patch_g10.h",
];

#[derive(Clone, Debug)]
pub struct Schema {
  pub program_header : RecordSchema,
  pub kernel_header  : RecordSchema,
  pub tokens         : TokenTable,
}

impl Schema {

  /// The built-in default schema.
  pub fn builtin() -> Result<Schema> {
    Ok(SchemaLoader::load(&builtin::lines())?)
  }

  /// Reads the headers of `SCHEMA_FILES` found in `directory` and loads them as one text. Absent
  /// files are reported and skipped; whether what remains is usable is up to the loader.
  pub fn from_directory(directory: &Path, printer: &mut MessagePrinter) -> Result<Schema> {
    let mut lines: Vec<String> = vec![];
    for file_name in SCHEMA_FILES {
      let path = directory.join(file_name);
      if !path.is_file() {
        printer.warning(format!("Missing schema file {}.", path.display()));
        continue;
      }
      let text = std::fs::read_to_string(&path).map_err(|e| CodecError::io(&path, e))?;
      lines.extend(text.lines().map(str::to_string));
    }
    Ok(SchemaLoader::load(&lines)?)
  }
}

/// Parses schema text into a `Schema`.
pub struct SchemaLoader;

impl SchemaLoader {

  pub fn load<S: AsRef<str>>(lines: &[S]) -> std::result::Result<Schema, SchemaError> {
    let program_header_decl = format!("struct {}", PROGRAM_HEADER_RECORD);
    let token_enum_decl     = format!("enum {}", TOKEN_ENUM);
    let kernel_header_decl  = format!("struct {}", KERNEL_HEADER_RECORD);
    let kernel_common_decl  = format!("struct {}", KERNEL_COMMON_RECORD);

    let program_header_pos =
      find_declaration(lines, &program_header_decl)
        .ok_or(SchemaError::MissingDeclaration(PROGRAM_HEADER_RECORD))?;
    let token_enum_pos =
      find_declaration(lines, &token_enum_decl)
        .ok_or(SchemaError::MissingDeclaration(TOKEN_ENUM))?;
    let kernel_header_pos =
      find_declaration(lines, &kernel_header_decl)
        .ok_or(SchemaError::MissingDeclaration(KERNEL_HEADER_RECORD))?;

    let tokens = SchemaLoader::read_tokens(lines, token_enum_pos)?;

    let program_header = SchemaLoader::read_record(lines, program_header_pos)?;

    let mut kernel_header = SchemaLoader::read_record(lines, kernel_header_pos)?;
    match find_declaration(lines, &kernel_common_decl) {
      Some(kernel_common_pos) => {
        kernel_header.extend(SchemaLoader::read_record(lines, kernel_common_pos)?);
      }
      None => {
        tracing::debug!("Schema has no {}; kernel header is the base record only.", KERNEL_COMMON_RECORD);
      }
    }

    tracing::debug!(
      "Loaded schema: program header {} bytes, kernel header {} bytes, {} tokens.",
      program_header.total_size, kernel_header.total_size, tokens.len()
    );

    Ok(Schema{ program_header, kernel_header, tokens })
  }

  /**
    Reads the fields of the record declared on line `declaration`, up to its closing `};`. Each
    integer-typed declaration becomes a field; array declarations become one field per element,
    named `Name[i]`. Lines that declare something other than an integer are not part of the
    layout and are skipped.
  */
  pub fn read_record<S: AsRef<str>>(lines: &[S], declaration: usize)
    -> std::result::Result<RecordSchema, SchemaError>
  {
    let mut record = RecordSchema::new();

    for (index, line) in lines.iter().enumerate().skip(declaration + 1) {
      let line = line.as_ref();
      if is_closing_line(line) {
        break;
      }

      let field_declaration =
        match parse_field_declaration(line) {
          Some(field_declaration) if field_declaration.is_integer() => field_declaration,
          Some(other) => {
            tracing::trace!("Skipping non-integer member `{}` on line {}.", other.name, index + 1);
            continue;
          }
          None => continue
        };

      let width =
        FieldWidth::from_type_name(field_declaration.type_name)
          .ok_or_else(|| SchemaError::UnknownFieldType{
            type_name: field_declaration.type_name.to_string(),
            line: index + 1
          })?;

      match field_declaration.array_len {
        None => record.push(Field::new(width, field_declaration.name)),
        Some(text) => {
          let count =
            parse_array_len(text)
              .ok_or_else(|| SchemaError::MalformedArray{
                text: line.trim().to_string(),
                line: index + 1
              })?;
          for element in 0..count {
            record.push(Field::new(width, &format!("{}[{}]", field_declaration.name, element)));
          }
        }
      }
    }

    Ok(record)
  }

  /// Reads the token enumeration starting at line `declaration`. Only entries annotated with a
  /// companion record whose declaration exists become tokens.
  fn read_tokens<S: AsRef<str>>(lines: &[S], declaration: usize)
    -> std::result::Result<TokenTable, SchemaError>
  {
    let mut tokens = TokenTable::new();
    // C enumerators count up from the previous value.
    let mut next_id: u64 = 0;

    for (index, line) in lines.iter().enumerate().skip(declaration + 1) {
      let line = line.as_ref();
      if is_closing_line(line) {
        break;
      }

      let entry =
        match parse_enum_entry(line) {
          Some(entry) => entry,
          None => continue
        };

      let id = entry.assigned.or(entry.documented).unwrap_or(next_id);
      next_id = id + 1;

      let record_name =
        match entry.record {
          Some(record_name) => record_name,
          None => continue
        };

      let id =
        TokenId::try_from(id)
          .map_err(|_| SchemaError::TokenIdOutOfRange{
            name: entry.name.to_string(),
            id,
            line: index + 1
          })?;

      let record_decl = format!("struct {}", record_name);
      let record_pos =
        match find_declaration(lines, &record_decl) {
          Some(position) => position,
          None => {
            tracing::debug!("No declaration of {} for {}; token stays unidentified.", record_name, entry.name);
            continue;
          }
        };

      let record = SchemaLoader::read_record(lines, record_pos)?;
      if let Some(displaced) = tokens.insert(Token::new(id, entry.name, record)) {
        tracing::warn!("Token id {} declared again by {}; replacing {}.", id, entry.name, displaced.name);
      }
    }

    Ok(tokens)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn minimal_schema(extra: &str) -> Vec<String> {
    format!(
"struct SProgramBinaryHeader
{{
    uint32_t   Magic;
    uint32_t   NumberOfKernels;
    uint32_t   PatchListSize;
}};
enum PATCH_TOKEN
{{
    PATCH_TOKEN_UNKNOWN,                       // 0 - (Unused)
    PATCH_TOKEN_MEDIA_STATE_POINTERS,          // 1 @SPatchNothing@
    PATCH_TOKEN_STATE_SIP,                     // 2 @SPatchStateSip@
}};
struct SKernelBinaryHeader
{{
    uint32_t   CheckSum;
    uint64_t   ShaderHashCode;
    uint32_t   KernelNameSize;
    uint32_t   PatchListSize;
}};
struct SKernelBinaryHeaderCommon :
       SKernelBinaryHeader
{{
    uint32_t   KernelHeapSize;
}};
struct SPatchStateSip :
       SPatchItemHeader
{{
    uint32_t   SystemKernelOffset;
}};
{}", extra)
      .lines()
      .map(str::to_string)
      .collect()
  }

  #[test]
  fn known_struct_parse() {
    let lines = vec![
      "struct SRecord",
      "{",
      "    uint64_t   A;",
      "    uint32_t   B;",
      "    uint16_t   C;",
      "    uint8_t    D;",
      "};",
    ];
    let record = SchemaLoader::read_record(&lines, 0).unwrap();

    assert_eq!(record.len(), 4);
    let widths: Vec<usize> = record.iter().map(|field| field.width.bytes()).collect();
    let names: Vec<&str> = record.iter().map(|field| &*field.name).collect();
    assert_eq!(widths, vec![8, 4, 2, 1]);
    assert_eq!(names, vec!["A", "B", "C", "D"]);
    assert_eq!(record.total_size, 15);
  }

  #[test]
  fn kernel_header_is_base_plus_common() {
    let schema = SchemaLoader::load(&minimal_schema("")).unwrap();
    let names: Vec<&str> = schema.kernel_header.iter().map(|field| &*field.name).collect();

    assert_eq!(names, vec!["CheckSum", "ShaderHashCode", "KernelNameSize", "PatchListSize", "KernelHeapSize"]);
    assert_eq!(schema.kernel_header.total_size, 24);
    assert_eq!(schema.program_header.total_size, 12);
  }

  #[test]
  fn tokens_need_an_existing_record() {
    let schema = SchemaLoader::load(&minimal_schema("")).unwrap();

    assert_eq!(schema.tokens.len(), 1);
    let sip = schema.tokens.get(2).unwrap();
    assert_eq!(&*sip.name, "PATCH_TOKEN_STATE_SIP");
    assert_eq!(sip.declared_size, 4);
    // `SPatchNothing` is never declared.
    assert!(schema.tokens.get(1).is_none());
  }

  #[test]
  fn missing_declarations_are_fatal() {
    let lines: Vec<String> =
      minimal_schema("")
        .into_iter()
        .map(|line| line.replace("enum PATCH_TOKEN", "enum SOMETHING_ELSE"))
        .collect();
    assert_eq!(
      SchemaLoader::load(&lines).unwrap_err(),
      SchemaError::MissingDeclaration(TOKEN_ENUM)
    );

    // Only the common extension is declared; the base must not match it.
    let lines: Vec<String> =
      minimal_schema("")
        .into_iter()
        .map(|line| if line == "struct SKernelBinaryHeader" { "struct Other".to_string() } else { line })
        .collect();
    assert_eq!(
      SchemaLoader::load(&lines).unwrap_err(),
      SchemaError::MissingDeclaration(KERNEL_HEADER_RECORD)
    );
  }

  #[test]
  fn unknown_integer_type_is_fatal() {
    let lines: Vec<String> =
      minimal_schema("")
        .into_iter()
        .map(|line| line.replace("uint32_t   SystemKernelOffset", "uint128_t  SystemKernelOffset"))
        .collect();

    match SchemaLoader::load(&lines) {
      Err(SchemaError::UnknownFieldType{ type_name, .. }) => assert_eq!(type_name, "uint128_t"),
      other => panic!("expected an unknown type error, got {:?}", other)
    }
  }

  #[test]
  fn array_fields_expand() {
    let lines = vec![
      "struct SRecord",
      "{",
      "    uint32_t   Reserved[3];",
      "    float      Scale;",
      "};",
    ];
    let record = SchemaLoader::read_record(&lines, 0).unwrap();
    let names: Vec<&str> = record.iter().map(|field| &*field.name).collect();

    assert_eq!(names, vec!["Reserved[0]", "Reserved[1]", "Reserved[2]"]);
    assert_eq!(record.total_size, 12);
  }

  #[test]
  fn directory_headers_load_in_file_order() {
    let directory = tempfile::tempdir().unwrap();
    let write = |name: &str, text: &str| std::fs::write(directory.path().join(name), text).unwrap();

    write("patch_list.h", "\
struct SProgramBinaryHeader
{
    uint32_t   Magic;
    uint32_t   NumberOfKernels;
};
enum PATCH_TOKEN
{
    PATCH_TOKEN_STATE_SIP = 2,                 // @SPatchStateSip@
};
");
    write("patch_shared.h", "\
struct SKernelBinaryHeader
{
    uint32_t   CheckSum;
    uint32_t   KernelNameSize;
};
");
    // Declared twice: the header concatenated first wins.
    write("patch_g9.h", "\
struct SPatchStateSip :
       SPatchItemHeader
{
    uint32_t   SystemKernelOffset;
};
");
    write("patch_g10.h", "\
struct SPatchStateSip :
       SPatchItemHeader
{
    uint64_t   SystemKernelAddress;
};
");

    let mut printer = MessagePrinter::new(true);
    let schema = Schema::from_directory(directory.path(), &mut printer).unwrap();

    assert_eq!(schema.program_header.total_size, 8);
    let names: Vec<&str> = schema.kernel_header.iter().map(|field| &*field.name).collect();
    assert_eq!(names, vec!["CheckSum", "KernelNameSize"]);
    let sip = schema.tokens.get(2).unwrap();
    assert_eq!(&*sip.fields[0].name, "SystemKernelOffset");
    assert_eq!(sip.declared_size, 4);

    let warnings: Vec<String> = printer.warnings().map(|message| message.text.clone()).collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].starts_with("Missing schema file") && warnings[0].ends_with("patch_g7.h."));
    assert!(warnings[1].ends_with("patch_g8.h."));
  }

  #[test]
  fn empty_directory_is_not_a_schema() {
    let directory = tempfile::tempdir().unwrap();
    let mut printer = MessagePrinter::new(true);

    match Schema::from_directory(directory.path(), &mut printer) {
      Err(CodecError::Schema(SchemaError::MissingDeclaration(name))) => assert_eq!(name, PROGRAM_HEADER_RECORD),
      other => panic!("expected a missing declaration, got {:?}", other)
    }
    assert_eq!(printer.warnings().count(), SCHEMA_FILES.len());
  }

  #[test]
  fn builtin_schema_loads() {
    let schema = Schema::builtin().unwrap();

    assert_eq!(schema.program_header.total_size, 28);
    assert_eq!(schema.kernel_header.total_size, 40);
    assert!(schema.program_header.contains("NumberOfKernels"));
    assert!(schema.kernel_header.contains("KernelUnpaddedSize"));

    let payload = schema.tokens.get(22).unwrap();
    assert_eq!(&*payload.name, "PATCH_TOKEN_THREAD_PAYLOAD");
    assert_eq!(payload.declared_size, 15 * 4);
    // Tokens without a companion record are not in the table.
    assert!(schema.tokens.get(0).is_none());
    assert_eq!(schema.tokens.id_of("PATCH_TOKEN_EXECUTION_ENVIRONMENT"), Some(23));
  }

  #[test]
  fn builtin_text_shape() {
    assert!(BUILTIN_SCHEMA_TEXT.starts_with("struct SProgramBinaryHeader\n{\n"));
    assert!(BUILTIN_SCHEMA_TEXT.contains("@SPatchMediaInterfaceDescriptorLoad@"));
  }
}
