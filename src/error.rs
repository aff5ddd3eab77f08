//! Errors raised when the input violates the instrumentation contract.

use crate::ir::{InstId, Signature};
use std::fmt;

/// An error that halts instrumentation or pruning.
///
/// There is no partial-success mode: once one of these is returned the
/// transformation stops and the error should be reported.
#[derive(Debug)]
pub struct Error {
    inner: Box<ErrorInner>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    function: Option<String>,
    inst: Option<InstId>,
}

/// The kind of contract violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// An instruction carries a flag that its opcode cannot support, e.g.
    /// `nsw` on `udiv`.
    UnsupportedFlag {
        /// The instruction's opcode.
        opcode: &'static str,
        /// The offending flag.
        flag: &'static str,
    },

    /// An arithmetic instruction or array index is not integer typed.
    NonIntegerOperand {
        /// The instruction's opcode.
        opcode: &'static str,
    },

    /// An instruction uses an integer type of zero bits or wider than
    /// [`MAX_INT_WIDTH`][crate::ir::MAX_INT_WIDTH].
    InvalidWidth {
        /// The instruction's opcode.
        opcode: &'static str,
        /// The offending width.
        width: u32,
    },

    /// The assertion entry point is already declared with a different
    /// signature.
    SignatureMismatch {
        /// The entry point's name.
        name: String,
        /// The signature the instrumentation needs.
        expected: Signature,
        /// The signature found in the module.
        found: Signature,
    },

    /// An assertion's predicate is a constant that is not `true`. The
    /// instrumentation generated a check that always fails.
    ConstantFalseAssertion,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedFlag { opcode, flag } => {
                write!(f, "`{}` flag is not supported on `{}`", flag, opcode)
            }
            ErrorKind::NonIntegerOperand { opcode } => {
                write!(f, "`{}` requires integer operands", opcode)
            }
            ErrorKind::InvalidWidth { opcode, width } => write!(
                f,
                "`{}` on i{} is outside the supported widths i1 to i{}",
                opcode,
                width,
                crate::ir::MAX_INT_WIDTH
            ),
            ErrorKind::SignatureMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "`@{}` is declared as `{}` but `{}` is required",
                name, found, expected
            ),
            ErrorKind::ConstantFalseAssertion => {
                write!(f, "assertion predicate is a constant other than `true`")
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(function) = &self.inner.function {
            write!(f, "@{}", function)?;
            if let Some(inst) = self.inner.inst {
                write!(f, ":%{}", inst.index())?;
            }
            write!(f, ": ")?;
        }
        write!(f, "error: {}", self.inner.kind)
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Error {
            inner: Box::new(ErrorInner {
                kind,
                function: None,
                inst: None,
            }),
        }
    }

    pub(crate) fn in_function(mut self, name: &str) -> Self {
        self.inner.function = Some(name.to_string());
        self
    }

    pub(crate) fn at_inst(mut self, inst: InstId) -> Self {
        self.inner.inst = Some(inst);
        self
    }

    /// What went wrong.
    pub fn kind(&self) -> &ErrorKind {
        &self.inner.kind
    }

    /// The name of the function being transformed, if any.
    pub fn function(&self) -> Option<&str> {
        self.inner.function.as_deref()
    }

    /// The offending instruction, if any.
    pub fn inst(&self) -> Option<InstId> {
        self.inner.inst
    }
}

/// A `Result` type for instrumentation and pruning.
///
/// Either `Ok(T)` or `Err(Error)`.
pub type Result<T> = std::result::Result<T, Error>;
