//! Structural value numbering by hash-consing.
//!
//! Two values get the same number when they are the same leaf (argument,
//! global, constant, or non-pure instruction) or when they are pure
//! instructions with the same opcode, flags, result type and operand numbers.
//! Operands of commutative opcodes are ordered canonically first; nothing
//! else is normalized, so `a < b` and `b > a` get different numbers.

use crate::ir::{
    BinaryOp, CastOp, Constant, Flags, Function, GlobalId, InstId, InstKind, IntCC, Type, Value,
};
use std::collections::HashMap;

/// A value number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vn(u32);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Key {
    Const(Constant),
    Arg(u32),
    Global(GlobalId),
    Opaque(InstId),
    Binary {
        op: BinaryOp,
        flags: Flags,
        ty: Type,
        a: Vn,
        b: Vn,
    },
    Icmp {
        cc: IntCC,
        a: Vn,
        b: Vn,
    },
    Cast {
        op: CastOp,
        ty: Type,
        value: Vn,
    },
    Gep {
        inbounds: bool,
        source: Type,
        base: Vn,
        indices: Vec<Vn>,
    },
}

/// Assigns value numbers to the values of one function.
#[derive(Debug)]
pub struct ValueNumbering<'a> {
    func: &'a Function,
    table: HashMap<Key, Vn>,
    memo: HashMap<InstId, Vn>,
}

impl<'a> ValueNumbering<'a> {
    /// Create an empty numbering for `func`.
    pub fn new(func: &'a Function) -> Self {
        ValueNumbering {
            func,
            table: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    /// Number `value`, numbering its operands first.
    pub fn number(&mut self, value: &Value) -> Vn {
        match value {
            Value::Inst(id) => {
                self.number_inst(*id);
                self.memo[id]
            }
            Value::Const(c) => self.intern(Key::Const(c.clone())),
            Value::Arg(n) => self.intern(Key::Arg(*n)),
            Value::Global(g) => self.intern(Key::Global(*g)),
        }
    }

    fn intern(&mut self, key: Key) -> Vn {
        let next = Vn(self.table.len() as u32);
        *self.table.entry(key).or_insert(next)
    }

    /// Number `root` and every pure instruction it depends on, operands
    /// first, without recursing.
    fn number_inst(&mut self, root: InstId) {
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
            let key = self.inst_key(id);
            let vn = self.intern(key);
            self.memo.insert(id, vn);
        }
    }

    /// The key of an instruction whose operands are already numbered.
    fn inst_key(&mut self, id: InstId) -> Key {
        let func = self.func;
        let inst = &func.insts[id];
        match &inst.kind {
            InstKind::Binary { op, flags, a, b } => {
                let (a, b) = self.operand_pair(a, b, op.is_commutative());
                Key::Binary {
                    op: *op,
                    flags: *flags,
                    ty: inst.ty.clone(),
                    a,
                    b,
                }
            }
            InstKind::Icmp { cc, a, b } => {
                let (a, b) = self.operand_pair(a, b, cc.is_commutative());
                Key::Icmp { cc: *cc, a, b }
            }
            InstKind::Cast { op, value } => Key::Cast {
                op: *op,
                ty: inst.ty.clone(),
                value: self.number(value),
            },
            InstKind::Gep {
                inbounds,
                source,
                base,
                indices,
            } => Key::Gep {
                inbounds: *inbounds,
                source: source.clone(),
                base: self.number(base),
                indices: indices.iter().map(|i| self.number(i)).collect(),
            },
            InstKind::Alloca { .. }
            | InstKind::Load { .. }
            | InstKind::Store { .. }
            | InstKind::Call { .. }
            | InstKind::Ret { .. } => Key::Opaque(id),
        }
    }

    fn operand_pair(&mut self, a: &Value, b: &Value, commutative: bool) -> (Vn, Vn) {
        let a = self.number(a);
        let b = self.number(b);
        if commutative && b < a {
            (b, a)
        } else {
            (a, b)
        }
    }
}
