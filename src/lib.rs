//! Turning undefined behavior in a typed SSA IR into runtime assertions.
//!
//! This crate takes a module of functions in a small LLVM-like IR and makes
//! its integer and pointer undefined behavior observable: before every
//! instruction that could trigger undefined behavior, it inserts a call to an
//! assertion entry point whose `i1` argument is true exactly when the
//! instruction is well defined. A second pass then removes assertions that are
//! trivially true or that duplicate an earlier one.
//!
//! ## IR
//!
//! The module, function and instruction definitions live in the
//! `autoassert::ir` module. Functions are built with
//! `autoassert::ir::FunctionBuilder`.
//!
//! ## Instrumenting
//!
//! `autoassert::instrument` inserts the checks. The entry point's name and
//! whether each assertion carries a unique `i32` identifier are configured
//! with `autoassert::config::Options`.
//!
//! ## Pruning
//!
//! `autoassert::prune` removes redundant assertions, using the structural
//! value numbering in `autoassert::vn` and the constant folder in
//! `autoassert::fold`.
//!
//! ## Emitting the IR's Text Format
//!
//! When the `stringify` Cargo feature is enabled, the
//! `autoassert::stringify` module implements `Display` for modules and
//! functions.
//!
//! ## Example
//!
//! ```
//! use autoassert::ir::{BinaryOp, Flags, FunctionBuilder, Module, Type};
//! use autoassert::{Context, Instrument, ModulePass, Prune};
//!
//! # fn main() -> autoassert::Result<()> {
//! let mut b = FunctionBuilder::new("f", vec![Type::Int(32), Type::Int(32)], Type::Int(32));
//! let (x, y) = (b.arg(0), b.arg(1));
//! let q = b.binary("q", BinaryOp::Udiv, Flags::NONE, x, y);
//! b.ret(Some(q));
//!
//! let mut module = Module::new();
//! module.add_function(b.finish());
//!
//! let mut cx = Context::default();
//! assert!(Instrument.run(&mut cx, &mut module)?);
//! assert_eq!(cx.assertions_issued(), 1);
//! assert!(!Prune.run(&mut cx, &mut module)?);
//! # Ok(())
//! # }
//! ```

#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod fold;
pub mod instrument;
pub mod int;
pub mod ir;
pub mod opcode;
pub mod pass;
pub mod prune;
pub mod vn;

#[cfg(feature = "stringify")]
pub mod stringify;

pub use config::Options;
pub use error::{Error, ErrorKind, Result};
pub use instrument::Instrument;
pub use pass::{run_passes, Context, ModulePass};
pub use prune::Prune;
