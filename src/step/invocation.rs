use std::path::{Path, PathBuf};

/// A single external process launch: program, arguments, working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a `--flag value` pair.
    pub fn opt(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append a `--flag value` pair when a value is present.
    pub fn opt_if(self, flag: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.opt(flag, value),
            None => self,
        }
    }

    /// Full argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Shell-quoted rendering suitable for copy-paste reproduction.
    pub fn display(&self) -> String {
        shell_words::join(self.argv())
    }
}

/// What a step's command builder decided for the current configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    /// Run this process.
    Execute(Invocation),
    /// Nothing to run; record an accepted skip with this reason.
    Skip(String),
    /// A precondition is unmet; the whole run must stop.
    Fail(String),
}
