use crate::error::Result;
use crate::template::{CommandTemplate, FILE_EXISTS, shell_quote};
use crate::terminal::Executor;

/// Where the launchable artifact lives.
pub trait Locator {
    /// Directory holding the artifact.
    fn path(&self) -> &str;

    /// File name of the artifact, without directory.
    fn file(&self) -> &str;

    fn is_file_exist(&self, executor: &mut dyn Executor) -> Result<bool>;

    fn full_path(&self) -> String {
        if self.path().is_empty() {
            self.file().to_string()
        } else {
            format!("{}/{}", self.path().trim_end_matches('/'), self.file())
        }
    }
}

/// An artifact on the remote host, checked with `test -f` over the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocator {
    path: String,
    file: String,
    check: CommandTemplate,
}

impl RemoteLocator {
    pub fn new(full_path: &str) -> Self {
        let (path, file) = match full_path.rsplit_once('/') {
            Some(("", file)) => ("/", file),
            Some((path, file)) => (path, file),
            None => ("", full_path),
        };
        Self {
            path: path.to_string(),
            file: file.to_string(),
            check: CommandTemplate::new(FILE_EXISTS),
        }
    }

    pub fn with_check(mut self, check: CommandTemplate) -> Self {
        self.check = check;
        self
    }
}

impl Locator for RemoteLocator {
    fn path(&self) -> &str {
        &self.path
    }

    fn file(&self) -> &str {
        &self.file
    }

    fn is_file_exist(&self, executor: &mut dyn Executor) -> Result<bool> {
        let target = shell_quote(&self.full_path());
        let out = executor.exec(&self.check.render(&[("PATH", &target)]))?;
        Ok(out.trim().ends_with('1'))
    }
}
