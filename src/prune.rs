//! Removing assertions that are always true or already asserted.
//!
//! Within each function, assertion calls are visited in layout order. A call
//! is removed when its predicate is the constant `true`, when its predicate
//! folds exactly to `true`, or when its predicate is structurally identical
//! (see [`vn`][crate::vn]) to the predicate of an earlier assertion in the
//! same function. A literal constant predicate other than `true` is an error:
//! it means a generated check can never pass.
//!
//! A predicate that only folds to `false` is kept, with a warning. It means
//! the checked program really does have undefined behavior on that path, and
//! the assertion must stay so the failure is reported when it runs. A literal
//! `false` can only come from a broken instrumenter, so it is fatal instead.
//!
//! Folding and numbering both walk operands iteratively, so predicates at
//! the end of very long dependency chains are handled like any other.
//!
//! The pass starts from scratch every time it runs, so running it again is a
//! no-op unless something else changed the function in between.

use crate::error::{Error, ErrorKind, Result};
use crate::fold::Evaluator;
use crate::ir::{Constant, FuncId, Function, InstId, InstKind, Module, Value};
use crate::pass::{Context, ModulePass};
use crate::vn::ValueNumbering;
use std::collections::HashSet;

/// The pruner as a [`ModulePass`][crate::pass::ModulePass].
#[derive(Clone, Copy, Debug, Default)]
pub struct Prune;

impl ModulePass for Prune {
    fn name(&self) -> &str {
        "prune-asserts"
    }

    fn run(&mut self, cx: &mut Context, module: &mut Module) -> Result<bool> {
        prune_module(cx, module)
    }
}

/// Prune assertions in every function defined in `module`.
///
/// Returns whether any assertion was removed.
pub fn prune_module(cx: &Context, module: &mut Module) -> Result<bool> {
    let callee = match entry_point(cx, module)? {
        Some(callee) => callee,
        None => return Ok(false),
    };
    let mut changed = false;
    for id in module.definitions() {
        changed |= prune(&mut module.functions[id], callee)?;
    }
    Ok(changed)
}

/// Prune assertions in a single function of `module`.
///
/// Returns whether any assertion was removed.
pub fn prune_function(cx: &Context, module: &mut Module, id: FuncId) -> Result<bool> {
    match entry_point(cx, module)? {
        Some(callee) => prune(&mut module.functions[id], callee),
        None => Ok(false),
    }
}

fn entry_point(cx: &Context, module: &Module) -> Result<Option<FuncId>> {
    let name = cx.options().entry_point_name();
    let callee = match module.get_function(name) {
        Some(callee) => callee,
        None => return Ok(None),
    };
    let expected = cx.options().entry_signature();
    let found = &module.functions[callee].signature;
    if *found != expected {
        return Err(Error::new(ErrorKind::SignatureMismatch {
            name: name.to_string(),
            expected,
            found: found.clone(),
        }));
    }
    Ok(Some(callee))
}

/// The predicate of `inst`, if it is an assertion.
fn assertion_predicate(func: &Function, inst: InstId, callee: FuncId) -> Option<Value> {
    match &func.inst(inst).kind {
        InstKind::Call { callee: c, args } if *c == callee => args.first().cloned(),
        _ => None,
    }
}

fn prune(func: &mut Function, callee: FuncId) -> Result<bool> {
    let dead = {
        let func = &*func;
        let mut numbering = ValueNumbering::new(func);
        let mut evaluator = Evaluator::new(func);
        let mut seen = HashSet::new();
        let mut dead = HashSet::new();

        for inst in func.layout() {
            let predicate = match assertion_predicate(func, inst, callee) {
                Some(p) => p,
                None => continue,
            };

            if let Value::Const(c) = &predicate {
                match c {
                    Constant::Int(c) if c.is_true() => {
                        log::trace!(
                            "`@{}`: removing constant assertion %{}",
                            func.name,
                            inst.index()
                        );
                        dead.insert(inst);
                        continue;
                    }
                    _ => {
                        return Err(Error::new(ErrorKind::ConstantFalseAssertion)
                            .in_function(&func.name)
                            .at_inst(inst))
                    }
                }
            }

            match evaluator.eval(&predicate) {
                Some(c) if c.is_true() => {
                    log::trace!("`@{}`: removing folded assertion %{}", func.name, inst.index());
                    dead.insert(inst);
                    continue;
                }
                Some(_) => log::warn!(
                    "`@{}`: assertion %{} always fails",
                    func.name,
                    inst.index()
                ),
                None => {}
            }

            if !seen.insert(numbering.number(&predicate)) {
                log::trace!("`@{}`: removing duplicate assertion %{}", func.name, inst.index());
                dead.insert(inst);
            }
        }

        dead
    };

    if dead.is_empty() {
        return Ok(false);
    }
    for block in &mut func.blocks {
        block.insts.retain(|inst| !dead.contains(inst));
    }
    log::debug!("`@{}`: removed {} assertions", func.name, dead.len());
    Ok(true)
}
