/*!
  `ptm` command line tool.

  ```text
  ptm disasm -f <binary> [-p <schema dir>] [-d <dump dir>] [--device <platform>]
  ptm asm    -o <binary> [-p <schema dir>] [-d <dump dir>] [--device <platform>] [--elf]
  ptm tokens [-p <schema dir>]
  ```

  Exit status is 0 on success and non-zero on any error, including invalid arguments.
*/

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ptm::files::DirectoryFiles;
use ptm::isa::{IsaAssembler, NoIsa};
use ptm::{
  report,
  BinaryDecoder,
  BinaryEncoder,
  CodecError,
  ContainerPolicy,
  DecodeOptions,
  EncodeOptions,
  MessagePrinter,
  Result,
  Schema
};

const DEFAULT_DUMP_DIRECTORY: &str = "dump";

/// Disassembles patch-token device binaries into PTM text and assembles them back.
#[derive(Parser, Debug)]
#[command(name = "ptm")]
#[command(version)]
struct Cli {
  /// Print nothing; the exit status still reports failure.
  #[arg(short, long, global = true)]
  quiet: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Options shared by `disasm` and `asm`.
#[derive(Args, Debug)]
struct CodecArgs {
  /// Directory holding the patch list headers. The built-in schema is used when absent.
  #[arg(short, long, value_name = "DIR")]
  patch: Option<PathBuf>,

  /// Dump directory.
  #[arg(short, long, value_name = "DIR", default_value = DEFAULT_DUMP_DIRECTORY)]
  dump: PathBuf,

  /// Target platform for the ISA assembler, overriding the Device field of the binary.
  #[arg(long, value_name = "PLATFORM")]
  device: Option<String>,

  /// Dump only the unpadded part of instruction heaps (disasm), or splice heaps without padding (asm).
  #[arg(long)]
  ignore_isa_padding: bool,

  /// The `iga64` executable. Defaults to $IGA_PATH.
  #[arg(long, value_name = "PATH")]
  iga: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Decode a device binary into PTM.txt and side-files
  Disasm {
    /// The device binary, bare or wrapped in an OpenCL ELF.
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Dump the inline data of constant and global surface tokens with the token.
    #[arg(long)]
    inline_data: bool,

    #[command(flatten)]
    codec: CodecArgs,
  },

  /// Encode a dump directory back into a device binary
  Asm {
    /// Where to write the binary.
    #[arg(short, long, value_name = "FILE")]
    out: PathBuf,

    /// Wrap the binary in an OpenCL ELF with the build options and IR from the dump.
    #[arg(long)]
    elf: bool,

    #[command(flatten)]
    codec: CodecArgs,
  },

  /// List the patch tokens a schema knows
  Tokens {
    #[arg(short, long, value_name = "DIR")]
    patch: Option<PathBuf>,
  },
}

fn load_schema(patch: Option<&Path>, printer: &mut MessagePrinter) -> Result<Schema> {
  match patch {
    Some(directory) => Schema::from_directory(directory, printer),
    None => Schema::builtin()
  }
}

fn make_isa(codec: &CodecArgs, printer: &mut MessagePrinter) -> Box<dyn IsaAssembler> {
  let mut isa: Box<dyn IsaAssembler> = external_isa(codec.iga.as_deref(), printer);
  if let Some(device) = &codec.device {
    isa.set_product(device);
  }
  isa
}

#[cfg(feature = "external_iga")]
fn external_isa(iga: Option<&Path>, _printer: &mut MessagePrinter) -> Box<dyn IsaAssembler> {
  use ptm::isa::IgaCommand;

  match iga.map(|path| IgaCommand::new(path)).or_else(IgaCommand::from_env) {
    Some(command) => {
      tracing::debug!("Using {} for ISA translation.", command.executable().display());
      Box::new(command)
    }
    None => Box::new(NoIsa)
  }
}

#[cfg(not(feature = "external_iga"))]
fn external_isa(iga: Option<&Path>, printer: &mut MessagePrinter) -> Box<dyn IsaAssembler> {
  if iga.is_some() {
    printer.warning("Built without external_iga; --iga is ignored.");
  }
  Box::new(NoIsa)
}

fn disasm(file: &Path, inline_data: bool, codec: &CodecArgs, printer: &mut MessagePrinter) -> Result<()> {
  let schema = load_schema(codec.patch.as_deref(), printer)?;
  let data = std::fs::read(file).map_err(|e| CodecError::io(file, e))?;
  let mut isa = make_isa(codec, printer);

  let options = DecodeOptions{ ignore_isa_padding: codec.ignore_isa_padding, inline_data };
  let mut decoder = BinaryDecoder::new(&schema, isa.as_mut(), options, MessagePrinter::new(printer.is_quiet()));
  let result = decoder.decode(&data);
  printer.absorb(decoder.printer);
  let decoded = result?;

  let mut dump = DirectoryFiles::create(&codec.dump)?;
  decoded.write_to(&mut dump)?;

  if !printer.is_quiet() && !decoded.kernels.is_empty() {
    report::kernel_table(&decoded.kernels).printstd();
  }
  printer.info(format!(
    "Decoded {} kernel(s) into {}.", decoded.kernels.len(), dump.root().display()
  ));
  Ok(())
}

fn asm(out: &Path, elf: bool, codec: &CodecArgs, printer: &mut MessagePrinter) -> Result<()> {
  let schema = load_schema(codec.patch.as_deref(), printer)?;
  if !codec.dump.is_dir() {
    return Err(CodecError::MissingFile(codec.dump.display().to_string()));
  }
  let dump = DirectoryFiles::open(&codec.dump);
  let mut isa = make_isa(codec, printer);

  let options = EncodeOptions{
    container          : if elf { ContainerPolicy::Elf } else { ContainerPolicy::Raw },
    ignore_isa_padding : codec.ignore_isa_padding
  };
  let mut encoder = BinaryEncoder::new(&schema, isa.as_mut(), options, MessagePrinter::new(printer.is_quiet()));
  let result = encoder.encode_dump(&dump);
  printer.absorb(encoder.printer);
  let binary = result?;

  std::fs::write(out, &binary).map_err(|e| CodecError::io(out, e))?;
  printer.info(format!("Wrote {} bytes to {}.", binary.len(), out.display()));
  Ok(())
}

fn tokens(patch: Option<&Path>, printer: &mut MessagePrinter) -> Result<()> {
  let schema = load_schema(patch, printer)?;
  if !printer.is_quiet() {
    report::token_table(&schema).printstd();
  }
  Ok(())
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let mut printer = MessagePrinter::new(cli.quiet);

  let result =
    match &cli.command {
      Commands::Disasm{ file, inline_data, codec } => disasm(file, *inline_data, codec, &mut printer),
      Commands::Asm{ out, elf, codec }             => asm(out, *elf, codec, &mut printer),
      Commands::Tokens{ patch }                    => tokens(patch.as_deref(), &mut printer),
    };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(error) => {
      printer.error(error.to_string());
      ExitCode::FAILURE
    }
  }
}
