use regex::Regex;

use crate::error::Result;

/// An open, authenticated interactive shell on one remote host.
///
/// The caller creates and closes it; this crate only issues commands and
/// reads output. Exactly one command may be in flight at a time: prompt-based
/// reads have no framing, so interleaving two commands garbles both.
pub trait ShellChannel {
    fn is_connected(&self) -> bool;

    /// Runs `command` as a one-shot execution and returns its full output.
    ///
    /// `Ok(None)` means the remote side never acknowledged the command.
    fn exec(&mut self, command: &str) -> Result<Option<String>>;

    /// Writes raw text to the interactive stream.
    fn write(&mut self, data: &str) -> Result<()>;

    /// Reads the interactive stream until `pattern` matches what has been
    /// read so far, and returns that text.
    fn read_until(&mut self, pattern: &Regex) -> Result<String>;

    /// Returns whatever the interactive stream has buffered right now.
    fn read(&mut self) -> Result<String>;
}

impl<C: ShellChannel + ?Sized> ShellChannel for &mut C {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn exec(&mut self, command: &str) -> Result<Option<String>> {
        (**self).exec(command)
    }

    fn write(&mut self, data: &str) -> Result<()> {
        (**self).write(data)
    }

    fn read_until(&mut self, pattern: &Regex) -> Result<String> {
        (**self).read_until(pattern)
    }

    fn read(&mut self) -> Result<String> {
        (**self).read()
    }
}
