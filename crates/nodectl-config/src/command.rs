/// Program plus arguments for an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program to execute, resolved through `PATH` when not absolute.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Builds a command line.
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Uses the configured program and arguments, or the built-in default
    /// pair when no program is configured.
    pub(crate) fn configured_or(
        program: Option<&str>,
        args: &[String],
        default_program: &str,
        default_args: &[&str],
    ) -> Self {
        match program {
            Some(program) => Self::new(program, args.to_vec()),
            None => Self::new(
                default_program,
                default_args.iter().map(|arg| (*arg).to_owned()).collect(),
            ),
        }
    }

    /// Returns a copy with `arg` appended.
    #[must_use]
    pub fn with_arg(&self, arg: impl Into<String>) -> Self {
        let mut args = self.args.clone();
        args.push(arg.into());
        Self::new(self.program.clone(), args)
    }
}
