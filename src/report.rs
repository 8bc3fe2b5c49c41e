//! Tables printed by the command line tool: a per-kernel summary after `disasm`, and the token
//! table of a schema for `tokens`.

use prettytable::{format as TableFormat, Table};

use crate::decoder::KernelSummary;
use crate::schema::Schema;

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

pub fn kernel_table(kernels: &[KernelSummary]) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![
    ubr->"#", ubl->"Kernel", ubr->"Heap", ubr->"Unpadded", ubr->"GSH", ubr->"DSH", ubr->"SSH",
    ubr->"Patch list", ubr->"Tokens", ubl->"ISA", ubl->"CheckSum"
  ]);

  for kernel in kernels {
    let isa = match kernel.disassembled {
      true  => "asm",
      false => "dat"
    };
    let checksum = match kernel.checksum_matches {
      true  => "ok",
      false => "mismatch"
    };
    table.add_row(row![
      r->kernel.index,
      kernel.name,
      r->kernel.heap_size,
      r->kernel.unpadded_size,
      r->kernel.general_state_heap_size,
      r->kernel.dynamic_state_heap_size,
      r->kernel.surface_state_heap_size,
      r->kernel.patch_list_size,
      r->kernel.token_count,
      isa,
      checksum
    ]);
  }
  table
}

pub fn token_table(schema: &Schema) -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"Id", ubl->"Token", ubr->"Size", ubl->"Fields"]);

  for token in schema.tokens.iter() {
    let fields =
      token.fields
           .iter()
           .map(|field| field.to_string())
           .collect::<Vec<String>>()
           .join(", ");
    table.add_row(row![r->token.id, token.name, r->token.declared_size, fields]);
  }
  table
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_table_lists_every_token() {
    let schema = Schema::builtin().unwrap();
    let table = token_table(&schema);
    assert_eq!(table.len(), schema.tokens.len());

    let text = table.to_string();
    assert!(text.contains("PATCH_TOKEN_MEDIA_INTERFACE_DESCRIPTOR_LOAD"));
    assert!(text.contains("4 InterfaceDescriptorDataOffset"));
  }

  #[test]
  fn kernel_table_rows() {
    let kernels = vec![
      KernelSummary{ name: "first".to_string(), heap_size: 64, checksum_matches: true, ..KernelSummary::default() },
      KernelSummary{ index: 1, name: "second".to_string(), disassembled: true, ..KernelSummary::default() },
    ];
    let text = kernel_table(&kernels).to_string();

    assert!(text.contains("first"));
    assert!(text.contains("mismatch"));
    assert!(text.contains("asm"));
  }
}
