//! Inserting runtime assertions before instructions that may have undefined
//! behavior.
//!
//! Every original instruction is visited once, in layout order, and the
//! checks that apply to it are inserted immediately before it. Checks on the
//! same instruction are emitted in this order, so that no check relies on an
//! operation whose own safety is established by a later one:
//!
//! 1. shift amount in range: `amount <u width`
//! 2. signed division overflow: `(a != MIN) | (b != -1)`
//! 3. division by zero: `b != 0`
//! 4. `nuw`: a zero-extended recomputation is `<=u` the unsigned maximum
//!    (`a >=u b` for `sub`)
//! 5. `nsw`: a sign-extended recomputation lies within the signed range
//! 6. `exact`: the implied remainder is zero
//! 7. `getelementptr inbounds`: non-null base, zero first index into fixed
//!    allocations, and `0 <= index < N` at every array level
//! 8. `load` and `store`: non-null pointer
//!
//! Recomputations use `width + 1` bits for `add` and `sub`, `2 * width` for
//! `mul` and `2 * width - 1` for `shl`. Range bounds are taken at the original
//! width and then extended.

use crate::error::{Error, ErrorKind, Result};
use crate::int::ConstInt;
use crate::ir::{
    self, Arena, BinaryOp, CastOp, Flags, FuncId, Function, Inst, InstId, InstKind, IntCC, Module,
    Type, Value, MAX_INT_WIDTH,
};
use crate::pass::{Context, ModulePass};
use num_bigint::BigUint;
use std::result::Result as StdResult;

/// The instrumenter as a [`ModulePass`][crate::pass::ModulePass].
#[derive(Clone, Copy, Debug, Default)]
pub struct Instrument;

impl ModulePass for Instrument {
    fn name(&self) -> &str {
        "auto-assert"
    }

    fn run(&mut self, cx: &mut Context, module: &mut Module) -> Result<bool> {
        instrument_module(cx, module)
    }
}

/// Instrument every function defined in `module`.
///
/// Every function is validated before any is changed, and the assertion
/// entry point is declared only if some check is needed. Returns whether
/// anything was inserted.
pub fn instrument_module(cx: &mut Context, module: &mut Module) -> Result<bool> {
    let ids = module.definitions();
    instrument(cx, module, &ids)
}

/// Instrument a single function of `module`.
///
/// Returns whether anything was inserted.
pub fn instrument_function(cx: &mut Context, module: &mut Module, id: FuncId) -> Result<bool> {
    instrument(cx, module, &[id])
}

fn instrument(cx: &mut Context, module: &mut Module, ids: &[FuncId]) -> Result<bool> {
    // Reject malformed input anywhere before touching anything.
    let mut wanted = vec![];
    for &id in ids {
        let func = &module.functions[id];
        if func.is_declaration() || func.name == cx.options().entry_point_name() {
            continue;
        }
        if validate(func)? {
            wanted.push(id);
        } else {
            log::debug!("`@{}`: nothing to check", func.name);
        }
    }
    let first = match wanted.first() {
        Some(&first) => first,
        None => return Ok(false),
    };

    let callee = module
        .get_or_insert_function(
            cx.options().entry_point_name(),
            cx.options().entry_signature(),
        )
        .map_err(|e| e.in_function(&module.functions[first].name))?;

    let mut changed = false;
    for id in wanted {
        changed |= rewrite(cx, &mut module.functions[id], callee)?;
    }
    Ok(changed)
}

/// Check every instruction of `func`, reporting whether any needs checks.
fn validate(func: &Function) -> Result<bool> {
    let mut wanted = false;
    for inst in func.layout() {
        wanted |= wants_checks(func, inst)
            .map_err(|kind| Error::new(kind).in_function(&func.name).at_inst(inst))?;
    }
    Ok(wanted)
}

/// Insert checks before every original instruction of a validated `func`.
fn rewrite(cx: &mut Context, func: &mut Function, callee: FuncId) -> Result<bool> {
    let mut inserted = 0;
    for block in 0..func.blocks.len() {
        let original = func.blocks[block].insts.clone();
        let name = &func.name;
        let mut cursor = Cursor {
            insts: &mut func.insts,
            params: &func.signature.params,
            out: Vec::with_capacity(original.len() * 2),
            cx: &mut *cx,
            callee,
            inserted: 0,
        };
        for inst in original {
            cursor
                .check(inst)
                .map_err(|kind| Error::new(kind).in_function(name).at_inst(inst))?;
            cursor.out.push(inst);
        }
        inserted += cursor.inserted;
        func.blocks[block].insts = cursor.out;
    }

    log::debug!("`@{}`: inserted {} assertions", func.name, inserted);
    Ok(inserted > 0)
}

fn check_flags(op: BinaryOp, flags: Flags) -> StdResult<(), ErrorKind> {
    let opcode = op.name();
    if flags.nuw && !op.supports_wrap_flags() {
        return Err(ErrorKind::UnsupportedFlag { opcode, flag: "nuw" });
    }
    if flags.nsw && !op.supports_wrap_flags() {
        return Err(ErrorKind::UnsupportedFlag { opcode, flag: "nsw" });
    }
    if flags.exact && !op.supports_exact() {
        return Err(ErrorKind::UnsupportedFlag {
            opcode,
            flag: "exact",
        });
    }
    Ok(())
}

fn check_width(opcode: &'static str, width: Option<u32>) -> StdResult<u32, ErrorKind> {
    match width {
        Some(width) if width >= 1 && width <= MAX_INT_WIDTH => Ok(width),
        Some(width) => Err(ErrorKind::InvalidWidth { opcode, width }),
        None => Err(ErrorKind::NonIntegerOperand { opcode }),
    }
}

fn widen(op: BinaryOp, width: u32, flag: &'static str) -> StdResult<u32, ErrorKind> {
    op.widened_width(width).ok_or(ErrorKind::UnsupportedFlag {
        opcode: op.name(),
        flag,
    })
}

/// `c` extended to `wide` bits, which is at least its own width.
fn extend(c: ConstInt, ext: CastOp, wide: u32) -> Value {
    let c = match ext {
        CastOp::Sext => ConstInt::from_bigint(wide, &c.to_signed()),
        CastOp::Zext | CastOp::Trunc => ConstInt::from_biguint(wide, c.bits().clone()),
    };
    Value::from(c)
}

/// Validate `inst` and report whether any check applies to it.
fn wants_checks(func: &Function, inst: InstId) -> StdResult<bool, ErrorKind> {
    let inst = func.inst(inst);
    match &inst.kind {
        InstKind::Binary { op, flags, .. } => {
            check_flags(*op, *flags)?;
            check_width(op.name(), inst.ty.int_width())?;
            Ok(op.is_shift() || op.is_div_rem() || flags.any())
        }
        InstKind::Gep {
            inbounds, indices, ..
        } => {
            for index in indices {
                check_width("getelementptr", func.int_width(index))?;
            }
            Ok(*inbounds)
        }
        InstKind::Load { .. } | InstKind::Store { .. } => Ok(true),
        InstKind::Icmp { .. }
        | InstKind::Cast { .. }
        | InstKind::Alloca { .. }
        | InstKind::Call { .. }
        | InstKind::Ret { .. } => Ok(false),
    }
}

/// Inserts new instructions into a rebuilt block, ahead of the original
/// instruction that is pushed after them.
struct Cursor<'a> {
    insts: &'a mut Arena<Inst>,
    params: &'a [Type],
    out: Vec<InstId>,
    cx: &'a mut Context,
    callee: FuncId,
    inserted: usize,
}

impl Cursor<'_> {
    fn ins(&mut self, ty: Type, kind: InstKind) -> Value {
        let id = self.insts.alloc(Inst::new(kind, ty));
        self.out.push(id);
        Value::Inst(id)
    }

    fn icmp(&mut self, cc: IntCC, a: Value, b: impl Into<Value>) -> Value {
        let b = b.into();
        self.ins(Type::bool(), InstKind::Icmp { cc, a, b })
    }

    fn binary(&mut self, width: u32, op: BinaryOp, a: impl Into<Value>, b: Value) -> Value {
        let a = a.into();
        self.ins(
            Type::Int(width),
            InstKind::Binary {
                op,
                flags: Flags::NONE,
                a,
                b,
            },
        )
    }

    fn cast(&mut self, op: CastOp, value: Value, width: u32) -> Value {
        self.ins(Type::Int(width), InstKind::Cast { op, value })
    }

    fn assert(&mut self, predicate: Value) {
        let id = self.cx.next_assert_id();
        let mut args = vec![predicate];
        if self.cx.options().has_identifiers() {
            args.push(ConstInt::new(32, u128::from(id)).into());
        }
        let callee = self.callee;
        let call = self.ins(Type::Void, InstKind::Call { callee, args });
        self.inserted += 1;
        log::trace!("inserted assertion #{} as {:?}", id, call);
    }

    fn assert_nonnull(&mut self, ptr: Value) {
        let p = self.icmp(IntCC::Ne, ptr, Value::null());
        self.assert(p);
    }

    fn index_width(&self, index: &Value) -> StdResult<u32, ErrorKind> {
        check_width("getelementptr", ir::int_width(&*self.insts, self.params, index))
    }

    fn is_fixed_allocation(&self, base: &Value) -> bool {
        match base {
            Value::Global(_) => true,
            Value::Inst(id) => matches!(self.insts[*id].kind, InstKind::Alloca { .. }),
            Value::Arg(_) | Value::Const(_) => false,
        }
    }

    fn check(&mut self, inst: InstId) -> StdResult<(), ErrorKind> {
        let inst = self.insts[inst].clone();
        match inst.kind {
            InstKind::Binary { op, flags, a, b } => {
                let width = check_width(op.name(), inst.ty.int_width())?;
                self.check_binary(op, flags, width, a, b)
            }
            InstKind::Gep {
                inbounds: true,
                source,
                base,
                indices,
            } => self.check_gep(&source, base, &indices),
            InstKind::Load { ptr } | InstKind::Store { ptr, .. } => {
                self.assert_nonnull(ptr);
                Ok(())
            }
            InstKind::Gep { inbounds: false, .. }
            | InstKind::Icmp { .. }
            | InstKind::Cast { .. }
            | InstKind::Alloca { .. }
            | InstKind::Call { .. }
            | InstKind::Ret { .. } => Ok(()),
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        flags: Flags,
        width: u32,
        a: Value,
        b: Value,
    ) -> StdResult<(), ErrorKind> {
        check_flags(op, flags)?;

        if op.is_shift() {
            let p = self.icmp(IntCC::Ult, b.clone(), ConstInt::new(width, u128::from(width)));
            self.assert(p);
        }

        if op.is_signed_div_rem() {
            let not_min = self.icmp(IntCC::Ne, a.clone(), ConstInt::signed_min(width));
            let not_minus_one = self.icmp(IntCC::Ne, b.clone(), ConstInt::all_ones(width));
            let p = self.binary(1, BinaryOp::Or, not_min, not_minus_one);
            self.assert(p);
        }

        if op.is_div_rem() {
            let p = self.icmp(IntCC::Ne, b.clone(), ConstInt::zero(width));
            self.assert(p);
        }

        if flags.nuw {
            if op == BinaryOp::Sub {
                let p = self.icmp(IntCC::Uge, a.clone(), b.clone());
                self.assert(p);
            } else {
                let wide = widen(op, width, "nuw")?;
                let result = self.recompute(op, CastOp::Zext, wide, &a, &b);
                let max = extend(ConstInt::unsigned_max(width), CastOp::Zext, wide);
                let p = self.icmp(IntCC::Ule, result, max);
                self.assert(p);
            }
        }

        if flags.nsw {
            let wide = widen(op, width, "nsw")?;
            let result = self.recompute(op, CastOp::Sext, wide, &a, &b);
            let min = extend(ConstInt::signed_min(width), CastOp::Sext, wide);
            let max = extend(ConstInt::signed_max(width), CastOp::Sext, wide);
            let p = self.icmp(IntCC::Sge, result.clone(), min);
            self.assert(p);
            let p = self.icmp(IntCC::Sle, result, max);
            self.assert(p);
        }

        if flags.exact {
            let rem = match op {
                BinaryOp::Lshr | BinaryOp::Ashr => {
                    let divisor = self.binary(width, BinaryOp::Shl, ConstInt::one(width), b);
                    self.binary(width, BinaryOp::Urem, a, divisor)
                }
                BinaryOp::Udiv | BinaryOp::Urem => self.binary(width, BinaryOp::Urem, a, b),
                BinaryOp::Sdiv | BinaryOp::Srem => self.binary(width, BinaryOp::Srem, a, b),
                _ => {
                    return Err(ErrorKind::UnsupportedFlag {
                        opcode: op.name(),
                        flag: "exact",
                    })
                }
            };
            let p = self.icmp(IntCC::Eq, rem, ConstInt::zero(width));
            self.assert(p);
        }

        Ok(())
    }

    /// Recompute `a op b` at `wide` bits, extending both operands with `ext`.
    fn recompute(&mut self, op: BinaryOp, ext: CastOp, wide: u32, a: &Value, b: &Value) -> Value {
        let a = self.cast(ext, a.clone(), wide);
        let b = self.cast(ext, b.clone(), wide);
        self.binary(wide, op, a, b)
    }

    fn check_gep(
        &mut self,
        source: &Type,
        base: Value,
        indices: &[Value],
    ) -> StdResult<(), ErrorKind> {
        let fixed = self.is_fixed_allocation(&base);
        self.assert_nonnull(base);

        let (first, rest) = match indices.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };

        if fixed {
            let width = self.index_width(first)?;
            let p = self.icmp(IntCC::Eq, first.clone(), ConstInt::zero(width));
            self.assert(p);
        }

        let mut level = source;
        for index in rest {
            let (element, count) = match level {
                Type::Array(element, count) => (element, *count),
                // Struct fields are selected by constants and need no check.
                _ => break,
            };
            let width = self.index_width(index)?;
            let p = self.icmp(IntCC::Sge, index.clone(), ConstInt::zero(width));
            self.assert(p);
            if BigUint::from(count) <= *ConstInt::signed_max(width).bits() {
                let bound = ConstInt::from_biguint(width, BigUint::from(count));
                let p = self.icmp(IntCC::Slt, index.clone(), bound);
                self.assert(p);
            }
            level = element;
        }

        Ok(())
    }
}
