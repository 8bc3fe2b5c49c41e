/*!
  The port to an ISA assembler/disassembler. The codec only needs two things from one: turn a
  kernel's machine code into text, and turn that text back into machine code. Either direction may
  be unavailable (no assembler installed, unknown device, malformed input), in which case the
  method returns `None` and the codec falls back to raw bytes.

  `NoIsa` is the always-unavailable port. `IgaCommand`, behind the `external_iga` feature, runs an
  external `iga64` executable.
*/

pub trait IsaAssembler {
  /// Selects the target from the `Device` field of a program header (a GPU core family number).
  fn set_device(&mut self, core_family: u32);

  /// Selects the target from a user-supplied product or platform name. Takes precedence over
  /// `set_device`.
  fn set_product(&mut self, product: &str);

  fn disassemble(&self, machine_code: &[u8]) -> Option<String>;

  fn assemble(&self, text: &str) -> Option<Vec<u8>>;
}

/// No assembler is available; every translation fails.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoIsa;

impl IsaAssembler for NoIsa {
  fn set_device(&mut self, _core_family: u32) {}

  fn set_product(&mut self, _product: &str) {}

  fn disassemble(&self, _machine_code: &[u8]) -> Option<String> {
    None
  }

  fn assemble(&self, _text: &str) -> Option<Vec<u8>> {
    None
  }
}

/// The `iga64` platform name for a GPU core family number, when there is one.
pub fn platform_for_core_family(core_family: u32) -> Option<&'static str> {
  match core_family {
    11      => Some("gen8"),
    12      => Some("gen9"),
    13      => Some("gen10"),
    15 | 16 => Some("gen11"),
    17 | 18 => Some("gen12p1"),
    _       => None
  }
}

#[cfg(feature = "external_iga")]
pub use self::command::{IgaCommand, IGA_PATH_VARIABLE};

#[cfg(feature = "external_iga")]
mod command {
  use std::path::{Path, PathBuf};
  use std::process::Command;

  use super::{platform_for_core_family, IsaAssembler};

  /// Environment variable naming the `iga64` executable.
  pub const IGA_PATH_VARIABLE: &str = "IGA_PATH";

  /// Runs `iga64` in a scratch directory, one process per kernel.
  #[derive(Clone, Debug)]
  pub struct IgaCommand {
    executable : PathBuf,
    platform   : Option<String>,
    // Set by `set_product`; a device read from a binary does not override it.
    pinned     : bool,
  }

  impl IgaCommand {

    pub fn new(executable: impl Into<PathBuf>) -> Self {
      IgaCommand{
        executable : executable.into(),
        platform   : None,
        pinned     : false
      }
    }

    /// Uses the executable named by `IGA_PATH`, if that variable is set.
    pub fn from_env() -> Option<Self> {
      std::env::var_os(IGA_PATH_VARIABLE).map(|path| IgaCommand::new(path))
    }

    pub fn executable(&self) -> &Path {
      &self.executable
    }

    pub fn platform(&self) -> Option<&str> {
      self.platform.as_deref()
    }

    fn run(&self, mode: &str, input: &[u8], input_name: &str, output_name: &str) -> Option<Vec<u8>> {
      let platform = match &self.platform {
        Some(platform) => platform,
        None => {
          tracing::debug!("No ISA platform selected; skipping {}.", self.executable.display());
          return None;
        }
      };

      let scratch = tempfile::tempdir().ok()?;
      let input_path  = scratch.path().join(input_name);
      let output_path = scratch.path().join(output_name);
      std::fs::write(&input_path, input).ok()?;

      let output =
        Command::new(&self.executable)
          .arg(mode)
          .arg(format!("-p={}", platform))
          .arg(&input_path)
          .arg("-o")
          .arg(&output_path)
          .output();

      match output {
        Ok(output) if output.status.success() => std::fs::read(&output_path).ok(),
        Ok(output) => {
          tracing::debug!(
            "{} {} failed: {}",
            self.executable.display(), mode, String::from_utf8_lossy(&output.stderr).trim()
          );
          None
        }
        Err(e) => {
          tracing::debug!("Couldn't run {}: {}", self.executable.display(), e);
          None
        }
      }
    }
  }

  impl IsaAssembler for IgaCommand {
    fn set_device(&mut self, core_family: u32) {
      if self.pinned {
        return;
      }
      self.platform = platform_for_core_family(core_family).map(str::to_string);
    }

    fn set_product(&mut self, product: &str) {
      self.platform = Some(product.to_string());
      self.pinned   = true;
    }

    fn disassemble(&self, machine_code: &[u8]) -> Option<String> {
      let text = self.run("-d", machine_code, "kernel.bin", "kernel.asm")?;
      String::from_utf8(text).ok()
    }

    fn assemble(&self, text: &str) -> Option<Vec<u8>> {
      self.run("-a", text.as_bytes(), "kernel.asm", "kernel.bin")
    }
  }

}
