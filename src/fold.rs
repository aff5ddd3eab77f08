//! Exact evaluation of pure instruction DAGs.
//!
//! The pruner uses this with no argument bindings to fold predicates whose
//! leaves are all constants. Binding arguments turns it into a small
//! interpreter for checking what a synthesized predicate computes.
//!
//! Evaluation walks operands with an explicit stack, so arbitrarily long
//! dependency chains do not grow the call stack.

use crate::int::ConstInt;
use crate::ir::{Constant, Function, InstId, InstKind, Value};
use std::collections::HashMap;

/// The width pointers are given when evaluated as integers.
pub const POINTER_WIDTH: u32 = 64;

/// Evaluates values of one function to constants.
#[derive(Debug)]
pub struct Evaluator<'a> {
    func: &'a Function,
    args: HashMap<u32, ConstInt>,
    memo: HashMap<InstId, Option<ConstInt>>,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator where every argument is unknown.
    pub fn new(func: &'a Function) -> Self {
        Evaluator {
            func,
            args: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    /// Give the `n`th argument a known value. Pointer arguments are given as
    /// `POINTER_WIDTH`-bit addresses.
    pub fn bind_arg(&mut self, n: u32, value: ConstInt) -> &mut Self {
        self.args.insert(n, value);
        self.memo.clear();
        self
    }

    /// Evaluate `value`.
    ///
    /// Returns `None` if it depends on an unknown argument, a global's
    /// address, or a non-pure instruction, or if evaluating it is undefined.
    pub fn eval(&mut self, value: &Value) -> Option<ConstInt> {
        match value {
            Value::Inst(id) => {
                self.eval_inst(*id);
                self.memo.get(id).cloned().flatten()
            }
            _ => self.leaf(value),
        }
    }

    fn leaf(&self, value: &Value) -> Option<ConstInt> {
        match value {
            Value::Const(Constant::Int(c)) => Some(c.clone()),
            Value::Const(Constant::Null) => Some(ConstInt::zero(POINTER_WIDTH)),
            Value::Arg(n) => self.args.get(n).cloned(),
            Value::Global(_) => None,
            Value::Inst(id) => self.memo.get(id).cloned().flatten(),
        }
    }

    /// Evaluate `root` and everything it depends on, operands first.
    fn eval_inst(&mut self, root: InstId) {
        let func = self.func;
        let mut stack = vec![root];
        while let Some(&id) = stack.last() {
            if self.memo.contains_key(&id) {
                stack.pop();
                continue;
            }

            let kind = &func.insts[id].kind;
            let mut pending = false;
            if kind.is_pure() {
                kind.operands(|v| {
                    if let Value::Inst(op) = v {
                        if !self.memo.contains_key(op) {
                            stack.push(*op);
                            pending = true;
                        }
                    }
                });
            }
            if pending {
                continue;
            }

            stack.pop();
            let result = self.compute(id);
            self.memo.insert(id, result);
        }
    }

    /// Evaluate one instruction whose operands are already evaluated.
    fn compute(&self, id: InstId) -> Option<ConstInt> {
        let inst = &self.func.insts[id];
        match &inst.kind {
            InstKind::Binary { op, flags, a, b } => {
                ConstInt::binary(*op, *flags, &self.leaf(a)?, &self.leaf(b)?)
            }
            InstKind::Icmp { cc, a, b } => {
                ConstInt::compare(*cc, &self.leaf(a)?, &self.leaf(b)?).map(ConstInt::bool)
            }
            InstKind::Cast { op, value } => {
                let width = inst.ty.int_width()?;
                self.leaf(value)?.cast(*op, width)
            }
            InstKind::Gep { .. }
            | InstKind::Alloca { .. }
            | InstKind::Load { .. }
            | InstKind::Store { .. }
            | InstKind::Call { .. }
            | InstKind::Ret { .. } => None,
        }
    }
}
