//! Run-time configuration for the instrumentation passes.

use crate::ir::{Signature, Type};

/// The assertion entry point's name when none is configured.
pub const DEFAULT_ENTRY_POINT: &str = "assert";

/// Options shared by the instrumenter and the pruner.
///
/// Both passes must be run with the same options so that the pruner
/// recognizes the calls the instrumenter inserted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    entry_point: String,
    identifiers: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            identifiers: false,
        }
    }
}

impl Options {
    /// The default options: `void @assert(i1)` without identifiers.
    pub fn new() -> Self {
        Options::default()
    }

    /// Call the function named `name` instead of `assert`.
    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    /// Pass a unique `i32` identifier as a second argument to every assertion.
    pub fn identifiers(mut self, enabled: bool) -> Self {
        self.identifiers = enabled;
        self
    }

    /// The assertion entry point's name.
    pub fn entry_point_name(&self) -> &str {
        &self.entry_point
    }

    /// Do assertions carry an identifier?
    pub fn has_identifiers(&self) -> bool {
        self.identifiers
    }

    /// The signature the assertion entry point must have.
    pub fn entry_signature(&self) -> Signature {
        let mut params = vec![Type::bool()];
        if self.identifiers {
            params.push(Type::Int(32));
        }
        Signature {
            params,
            ret: Type::Void,
        }
    }
}
