//! The single sink for user-visible diagnostics. Every message is recorded so that callers and
//! tests can inspect what was reported; printing can be switched off with quiet mode.

use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Severity {
  Info,
  Warning,
  Error
}

impl Display for Severity{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self{
      Severity::Info    => Ok(()),
      Severity::Warning => write!(f, "Warning! "),
      Severity::Error   => write!(f, "Error! ")
    }
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
  pub severity : Severity,
  pub text     : String
}

impl Display for Message{
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}{}", self.severity, self.text)
  }
}

#[derive(Clone, Debug, Default)]
pub struct MessagePrinter {
  quiet    : bool,
  messages : Vec<Message>
}

impl MessagePrinter {

  pub fn new(quiet: bool) -> Self {
    MessagePrinter{
      quiet,
      messages: vec![]
    }
  }

  pub fn is_quiet(&self) -> bool {
    self.quiet
  }

  pub fn set_quiet(&mut self, quiet: bool) {
    self.quiet = quiet;
  }

  pub fn info(&mut self, text: impl Into<String>) {
    self.push(Severity::Info, text.into());
  }

  pub fn warning(&mut self, text: impl Into<String>) {
    self.push(Severity::Warning, text.into());
  }

  pub fn error(&mut self, text: impl Into<String>) {
    self.push(Severity::Error, text.into());
  }

  fn push(&mut self, severity: Severity, text: String) {
    let message = Message{ severity, text };
    if !self.quiet {
      match severity {
        Severity::Info => println!("{}", message),
        _              => eprintln!("{}", message)
      }
    }
    self.messages.push(message);
  }

  pub fn messages(&self) -> &[Message] {
    &self.messages
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Message> {
    self.messages.iter().filter(|m| m.severity == Severity::Warning)
  }

  /// Everything reported so far, one message per line, as it would have been printed.
  pub fn log(&self) -> String {
    self.messages
        .iter()
        .map(Message::to_string)
        .collect::<Vec<String>>()
        .join("\n")
  }

  /// Moves the messages of another printer (e.g. one owned by a finished decoder) into this one.
  pub fn absorb(&mut self, other: MessagePrinter) {
    self.messages.extend(other.messages);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quiet_printer_still_records() {
    let mut printer = MessagePrinter::new(true);
    printer.info("Kernel #0");
    printer.warning("Number of Kernels is 0.");

    assert_eq!(printer.messages().len(), 2);
    assert_eq!(printer.warnings().count(), 1);
    assert_eq!(printer.log(), "Kernel #0\nWarning! Number of Kernels is 0.");
  }
}
