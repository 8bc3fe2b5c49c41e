use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

const PTM: &str = "\
ProgramBinaryHeader:
\t4 Magic 1229870147
\t4 Version 1085
\t4 Device 12
\t4 GPUPointerSizeInBytes 8
\t4 NumberOfKernels 1
\t4 SteppingId 0
\t4 PatchListSize 0
Kernel #0
KernelBinaryHeader:
\t4 CheckSum 0
\t8 ShaderHashCode 42
\t4 KernelNameSize 8
\t4 PatchListSize 0
\t4 KernelHeapSize 64
\t4 GeneralStateHeapSize 0
\t4 DynamicStateHeapSize 8
\t4 SurfaceStateHeapSize 16
\t4 KernelUnpaddedSize 10
\tKernelName vecadd
PATCH_TOKEN_MEDIA_INTERFACE_DESCRIPTOR_LOAD:
\t4 Token 19
\t4 Size 12
\t4 InterfaceDescriptorDataOffset 0
";

fn write_dump(dump: &Path) {
  fs::create_dir_all(dump).expect("create dump");
  fs::write(dump.join("PTM.txt"), PTM).expect("write PTM");
  fs::write(dump.join("vecadd_KernelHeap.dat"), (0..64u8).collect::<Vec<u8>>()).expect("write heap");
  fs::write(dump.join("vecadd_DynamicStateHeap.bin"), [0xd5u8; 8]).expect("write dsh");
  fs::write(dump.join("vecadd_SurfaceStateHeap.bin"), [0x55u8; 16]).expect("write ssh");
}

fn ptm(args: &[&str], dir: &Path) -> Output {
  Command::new(env!("CARGO_BIN_EXE_ptm"))
    .args(args)
    .current_dir(dir)
    .env_remove("IGA_PATH")
    .output()
    .expect("spawn ptm")
}

#[test]
fn asm_then_disasm_is_stable() {
  let dir = tempdir().expect("tempdir");
  write_dump(&dir.path().join("dump"));

  let first = ptm(&["asm", "-d", "dump", "-o", "first.bin"], dir.path());
  assert!(first.status.success(), "asm failed: {}", String::from_utf8_lossy(&first.stderr));
  assert!(String::from_utf8_lossy(&first.stderr).contains("Calculated PatchListSize ( 12 ) differs from file ( 0 )"));

  let decoded = ptm(&["disasm", "-f", "first.bin", "-d", "redump"], dir.path());
  assert!(decoded.status.success(), "disasm failed: {}", String::from_utf8_lossy(&decoded.stderr));
  assert!(String::from_utf8_lossy(&decoded.stdout).contains("vecadd"));

  let redump = dir.path().join("redump");
  let text = fs::read_to_string(redump.join("PTM.txt")).expect("read PTM");
  assert!(text.contains("Kernel #0\n"));
  assert!(text.contains("\t4 PatchListSize 12\n"));
  assert!(text.contains("\tKernelName vecadd\n"));
  assert!(!text.contains("\t4 CheckSum 0\n"));
  assert_eq!(fs::read(redump.join("vecadd_KernelHeap.dat")).expect("read heap").len(), 64);

  let second = ptm(&["asm", "-d", "redump", "-o", "second.bin", "-q"], dir.path());
  assert!(second.status.success());
  assert!(second.stdout.is_empty() && second.stderr.is_empty());
  assert_eq!(
    fs::read(dir.path().join("first.bin")).expect("read first"),
    fs::read(dir.path().join("second.bin")).expect("read second")
  );
}

#[test]
fn elf_container_round_trip() {
  let dir = tempdir().expect("tempdir");
  let dump = dir.path().join("dump");
  write_dump(&dump);
  fs::write(dump.join("build.bin"), "-cl-std=CL2.0").expect("write options");
  fs::write(dump.join("spirv.bin"), [0x03u8, 0x02, 0x23, 0x07]).expect("write spirv");

  let output = ptm(&["asm", "-o", "wrapped.bin", "--elf"], dir.path());
  assert!(output.status.success(), "asm failed: {}", String::from_utf8_lossy(&output.stderr));
  let wrapped = fs::read(dir.path().join("wrapped.bin")).expect("read binary");
  assert!(wrapped.starts_with(b"\x7fELF"));

  let output = ptm(&["disasm", "-f", "wrapped.bin", "-d", "out", "-q"], dir.path());
  assert!(output.status.success());
  let out = dir.path().join("out");
  assert_eq!(fs::read_to_string(out.join("build.bin")).expect("read options"), "-cl-std=CL2.0");
  assert!(out.join("spirv.bin").is_file());
  assert!(out.join("PTM.txt").is_file());
}

const PATCH_LIST_HEADER: &str = "\
struct SProgramBinaryHeader
{
    uint32_t   Magic;
    uint32_t   Version;
    uint32_t   Device;
    uint32_t   GPUPointerSizeInBytes;
    uint32_t   NumberOfKernels;
    uint32_t   SteppingId;
    uint32_t   PatchListSize;
};
struct SKernelBinaryHeader
{
    uint32_t   CheckSum;
    uint64_t   ShaderHashCode;
    uint32_t   KernelNameSize;
    uint32_t   PatchListSize;
};
struct SKernelBinaryHeaderCommon :
       SKernelBinaryHeader
{
    uint32_t   KernelHeapSize;
    uint32_t   GeneralStateHeapSize;
    uint32_t   DynamicStateHeapSize;
    uint32_t   SurfaceStateHeapSize;
    uint32_t   KernelUnpaddedSize;
};
enum PATCH_TOKEN
{
    PATCH_TOKEN_DESCRIPTOR_LOAD = 19,          // @SPatchDescriptorLoad@
};
struct SPatchDescriptorLoad :
       SPatchItemHeader
{
    uint32_t   DescriptorOffset;
};
";

#[test]
fn disasm_with_a_schema_directory() {
  let dir = tempdir().expect("tempdir");
  write_dump(&dir.path().join("dump"));
  let headers = dir.path().join("headers");
  fs::create_dir_all(&headers).expect("create headers");
  fs::write(headers.join("patch_list.h"), PATCH_LIST_HEADER).expect("write header");

  let output = ptm(&["asm", "-o", "first.bin", "-q"], dir.path());
  assert!(output.status.success());

  let output = ptm(&["disasm", "-f", "first.bin", "-p", "headers", "-d", "out"], dir.path());
  assert!(output.status.success(), "disasm failed: {}", String::from_utf8_lossy(&output.stderr));
  assert!(String::from_utf8_lossy(&output.stderr).contains("Missing schema file"));

  let text = fs::read_to_string(dir.path().join("out").join("PTM.txt")).expect("read PTM");
  assert!(text.contains("PATCH_TOKEN_DESCRIPTOR_LOAD:\n\t4 Token 19\n\t4 Size 12\n\t4 DescriptorOffset 0\n"));

  // A directory without any of the headers cannot describe a binary.
  fs::create_dir_all(dir.path().join("empty")).expect("create empty");
  let output = ptm(&["disasm", "-f", "first.bin", "-p", "empty", "-d", "never"], dir.path());
  assert!(!output.status.success());
  assert!(!dir.path().join("never").exists());
}

#[test]
fn unknown_input_fails() {
  let dir = tempdir().expect("tempdir");
  fs::write(dir.path().join("junk.bin"), b"this is not a device binary").expect("write junk");

  let output = ptm(&["disasm", "-f", "junk.bin"], dir.path());
  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("Device Binary section was not found."));
  assert!(!dir.path().join("dump").join("PTM.txt").exists());
}

#[test]
fn missing_inputs_fail() {
  let dir = tempdir().expect("tempdir");

  assert!(!ptm(&["disasm", "-f", "nowhere.bin"], dir.path()).status.success());
  assert!(!ptm(&["asm", "-d", "no_dump", "-o", "out.bin"], dir.path()).status.success());
  assert!(!dir.path().join("out.bin").exists());
}

#[test]
fn argument_errors_fail() {
  let dir = tempdir().expect("tempdir");

  // Missing value, missing required flag, unknown flag, unknown command.
  assert!(!ptm(&["disasm", "-f"], dir.path()).status.success());
  assert!(!ptm(&["asm"], dir.path()).status.success());
  assert!(!ptm(&["disasm", "-f", "a.bin", "--bogus"], dir.path()).status.success());
  assert!(!ptm(&["frobnicate"], dir.path()).status.success());
}

#[test]
fn tokens_lists_the_builtin_schema() {
  let dir = tempdir().expect("tempdir");
  let output = ptm(&["tokens"], dir.path());

  assert!(output.status.success());
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("PATCH_TOKEN_EXECUTION_ENVIRONMENT"));
  assert!(stdout.contains("PATCH_TOKEN_MEDIA_INTERFACE_DESCRIPTOR_LOAD"));
}
