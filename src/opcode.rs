//! Opcode enumerations and the classification helpers shared by the
//! instrumenter, the pruner and constant folding.

/// A binary integer operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Integer addition.
    Add,
    /// Integer subtraction.
    Sub,
    /// Integer multiplication.
    Mul,
    /// Bit shift left. Undefined behavior if `b` is greater than or equal to
    /// `bitwidth(a)`.
    Shl,
    /// Logical bit shift right (fills the left `b` bits with zero).
    Lshr,
    /// Arithmetic bit shift right (sign extends the left `b` bits).
    Ashr,
    /// Unsigned integer division.
    Udiv,
    /// Unsigned integer remainder.
    Urem,
    /// Signed integer division.
    Sdiv,
    /// Signed integer remainder.
    Srem,
    /// Bit-wise and.
    And,
    /// Bit-wise or.
    Or,
    /// Bit-wise xor.
    Xor,
}

impl BinaryOp {
    /// The textual name of this operation.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Shl => "shl",
            BinaryOp::Lshr => "lshr",
            BinaryOp::Ashr => "ashr",
            BinaryOp::Udiv => "udiv",
            BinaryOp::Urem => "urem",
            BinaryOp::Sdiv => "sdiv",
            BinaryOp::Srem => "srem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    /// Is this one of `shl`, `lshr` or `ashr`?
    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Lshr | BinaryOp::Ashr)
    }

    /// Is this a division or remainder, signed or unsigned?
    pub fn is_div_rem(self) -> bool {
        matches!(
            self,
            BinaryOp::Udiv | BinaryOp::Urem | BinaryOp::Sdiv | BinaryOp::Srem
        )
    }

    /// Is this `sdiv` or `srem`, which overflow on `signed_min / -1`?
    pub fn is_signed_div_rem(self) -> bool {
        matches!(self, BinaryOp::Sdiv | BinaryOp::Srem)
    }

    /// Can this operation carry the `nuw` and `nsw` flags?
    pub fn supports_wrap_flags(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Shl
        )
    }

    /// Can this operation carry the `exact` flag?
    pub fn supports_exact(self) -> bool {
        matches!(
            self,
            BinaryOp::Udiv
                | BinaryOp::Sdiv
                | BinaryOp::Urem
                | BinaryOp::Srem
                | BinaryOp::Lshr
                | BinaryOp::Ashr
        )
    }

    /// Does `a op b == b op a` hold for every `a` and `b`?
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor
        )
    }

    /// The bit width needed to recompute this operation on `width`-bit
    /// operands without any possibility of wrapping.
    ///
    /// Returns `None` for operations that never wrap. `width` must be at most
    /// [`MAX_INT_WIDTH`][crate::ir::MAX_INT_WIDTH], so the result always fits.
    pub fn widened_width(self, width: u32) -> Option<u32> {
        match self {
            BinaryOp::Add | BinaryOp::Sub => Some(width + 1),
            BinaryOp::Mul => Some(width * 2),
            BinaryOp::Shl => Some(width * 2 - 1),
            _ => None,
        }
    }
}

/// Overflow and exactness flags attached to a binary operation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    /// Unsigned wrapping is undefined behavior.
    pub nuw: bool,
    /// Signed wrapping is undefined behavior.
    pub nsw: bool,
    /// Discarding non-zero bits (a remainder, or bits shifted out) is
    /// undefined behavior.
    pub exact: bool,
}

impl Flags {
    /// No flags set.
    pub const NONE: Flags = Flags {
        nuw: false,
        nsw: false,
        exact: false,
    };

    /// Only `nuw` set.
    pub const NUW: Flags = Flags {
        nuw: true,
        nsw: false,
        exact: false,
    };

    /// Only `nsw` set.
    pub const NSW: Flags = Flags {
        nuw: false,
        nsw: true,
        exact: false,
    };

    /// Only `exact` set.
    pub const EXACT: Flags = Flags {
        nuw: false,
        nsw: false,
        exact: true,
    };

    /// Is any flag set?
    pub fn any(self) -> bool {
        self.nuw || self.nsw || self.exact
    }
}

/// An integer comparison condition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntCC {
    /// `a == b`.
    Eq,
    /// `a != b`.
    Ne,
    /// Unsigned less than.
    Ult,
    /// Unsigned less than or equal.
    Ule,
    /// Unsigned greater than.
    Ugt,
    /// Unsigned greater than or equal.
    Uge,
    /// Signed less than.
    Slt,
    /// Signed less than or equal.
    Sle,
    /// Signed greater than.
    Sgt,
    /// Signed greater than or equal.
    Sge,
}

impl IntCC {
    /// The textual name of this condition.
    pub fn name(self) -> &'static str {
        match self {
            IntCC::Eq => "eq",
            IntCC::Ne => "ne",
            IntCC::Ult => "ult",
            IntCC::Ule => "ule",
            IntCC::Ugt => "ugt",
            IntCC::Uge => "uge",
            IntCC::Slt => "slt",
            IntCC::Sle => "sle",
            IntCC::Sgt => "sgt",
            IntCC::Sge => "sge",
        }
    }

    /// Only `eq` and `ne` are symmetric in their operands.
    pub fn is_commutative(self) -> bool {
        matches!(self, IntCC::Eq | IntCC::Ne)
    }
}

/// An integer width conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CastOp {
    /// Zero extend.
    Zext,
    /// Sign extend.
    Sext,
    /// Truncate.
    Trunc,
}

impl CastOp {
    /// The textual name of this conversion.
    pub fn name(self) -> &'static str {
        match self {
            CastOp::Zext => "zext",
            CastOp::Sext => "sext",
            CastOp::Trunc => "trunc",
        }
    }
}
