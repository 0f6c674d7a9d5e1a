//! Every stage of the pipeline fails fast with a single [`CompileError`]. The
//! error kinds mirror what a user can get wrong (syntax, types, unbound names)
//! plus an internal kind reserved for compiler bugs.

use colored::Colorize;

use crate::frontend::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    /// Lexing, reading and parsing violations
    #[strum(serialize = "SyntaxError")]
    Syntax,
    /// Type checker violations
    #[strum(serialize = "TypeError")]
    Type,
    /// Unresolved bindings at compile time
    #[strum(serialize = "ReferenceError")]
    Reference,
    /// Broken invariant inside the compiler itself (never the user's fault)
    #[strum(serialize = "InternalError")]
    Internal,
}

#[derive(Debug, Clone)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
    /// Where in the compiler the error was raised
    pub origin: Option<&'static str>,
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        location: impl Into<Option<SourceLocation>>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            location: location.into(),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: &'static str) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// The message without any terminal color codes (types are rendered in
    /// color when embedded in messages)
    pub fn plain_message(&self) -> String {
        strip_ansi_escapes::strip_str(&self.message)
    }
}

impl core::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(origin) = self.origin {
            writeln!(f, "{}: {}", "backtrace".blue(), origin.white())?;
        }

        write!(f, "{}: {}", self.kind.to_string().red(), self.message)?;

        if let Some(location) = &self.location {
            write!(f, " {}", format!("(at {location})").white())?;
        }

        Ok(())
    }
}

impl std::error::Error for CompileError {}

macro_rules! report_error {
    ($kind:expr, $location:expr, $($message:tt)+) => {{
        let error = $crate::error::CompileError::new($kind, format!($($message)+), $location);

        #[cfg(feature = "error-backtrace")]
        let error = error.with_origin(concat!(module_path!(), " (at ", file!(), ":", line!(), ")"));

        error
    }};
}

macro_rules! syntax_error {
    ($location:expr, $($message:tt)+) => {
        $crate::error::report_error!($crate::error::ErrorKind::Syntax, $location, $($message)+)
    };
}

macro_rules! type_error {
    ($location:expr, $($message:tt)+) => {
        $crate::error::report_error!($crate::error::ErrorKind::Type, $location, $($message)+)
    };
}

macro_rules! reference_error {
    ($location:expr, $($message:tt)+) => {
        $crate::error::report_error!($crate::error::ErrorKind::Reference, $location, $($message)+)
    };
}

macro_rules! internal_error {
    ($($message:tt)+) => {
        $crate::error::report_error!(
            $crate::error::ErrorKind::Internal,
            None::<$crate::frontend::SourceLocation>,
            $($message)+
        )
    };
}

pub(crate) use internal_error;
pub(crate) use reference_error;
pub(crate) use report_error;
pub(crate) use syntax_error;
pub(crate) use type_error;
