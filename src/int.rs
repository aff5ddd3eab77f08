//! Fixed-width two's complement integer constants of any width.

use crate::opcode::{BinaryOp, CastOp, Flags, IntCC};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};

/// An integer constant: a bit pattern together with its bit width.
///
/// Bits above `width` are always zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConstInt {
    bits: BigUint,
    width: u32,
}

fn modulus(width: u32) -> BigUint {
    BigUint::one() << width as usize
}

fn mask(width: u32) -> BigUint {
    modulus(width) - 1u32
}

impl ConstInt {
    /// Create a constant of the given width, truncating `bits` to fit.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn from_biguint(width: u32, bits: BigUint) -> Self {
        assert!(width >= 1, "invalid width: {}", width);
        let bits = if bits.bits() > u64::from(width) {
            bits % modulus(width)
        } else {
            bits
        };
        ConstInt { bits, width }
    }

    /// Create a constant from a signed value, wrapping it to `width` bits.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn from_bigint(width: u32, value: &BigInt) -> Self {
        let m = BigInt::from(modulus(width));
        let mut r = value % &m;
        if r.sign() == Sign::Minus {
            r += &m;
        }
        ConstInt::from_biguint(width, r.magnitude().clone())
    }

    /// Create a constant of the given width, truncating `bits` to fit.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    pub fn new(width: u32, bits: u128) -> Self {
        ConstInt::from_biguint(width, BigUint::from(bits))
    }

    /// Create a constant from a signed value, truncating it to `width` bits.
    pub fn from_i128(width: u32, value: i128) -> Self {
        ConstInt::from_bigint(width, &BigInt::from(value))
    }

    /// The `i1` constant for `b`.
    pub fn bool(b: bool) -> Self {
        ConstInt::new(1, b as u128)
    }

    /// Zero.
    pub fn zero(width: u32) -> Self {
        ConstInt::from_biguint(width, BigUint::zero())
    }

    /// One.
    pub fn one(width: u32) -> Self {
        ConstInt::from_biguint(width, BigUint::one())
    }

    /// All bits set, i.e. `-1`.
    pub fn all_ones(width: u32) -> Self {
        ConstInt::from_biguint(width, mask(width))
    }

    /// The smallest signed value: only the sign bit set.
    pub fn signed_min(width: u32) -> Self {
        ConstInt::from_biguint(width, BigUint::one() << (width - 1) as usize)
    }

    /// The largest signed value: every bit but the sign bit set.
    pub fn signed_max(width: u32) -> Self {
        ConstInt::from_biguint(width, mask(width) >> 1usize)
    }

    /// The largest unsigned value.
    pub fn unsigned_max(width: u32) -> Self {
        ConstInt::all_ones(width)
    }

    /// This constant's bit width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The bit pattern, read as an unsigned number.
    pub fn bits(&self) -> &BigUint {
        &self.bits
    }

    /// The value interpreted as signed.
    pub fn to_signed(&self) -> BigInt {
        let unsigned = BigInt::from(self.bits.clone());
        if self.sign_bit() {
            unsigned - BigInt::from(modulus(self.width))
        } else {
            unsigned
        }
    }

    /// The bit pattern as a `u128`, if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        self.bits.to_u128()
    }

    /// The signed value as an `i128`, if it fits.
    pub fn to_i128(&self) -> Option<i128> {
        self.to_signed().to_i128()
    }

    fn sign_bit(&self) -> bool {
        self.bits.bits() == u64::from(self.width)
    }

    /// Is this the `i1` constant `true`?
    pub fn is_true(&self) -> bool {
        self.width == 1 && self.bits.is_one()
    }

    /// Is this the `i1` constant `false`?
    pub fn is_false(&self) -> bool {
        self.width == 1 && self.bits.is_zero()
    }

    /// Zero extend to `width` bits.
    ///
    /// Returns `None` when `width` is narrower than this constant.
    pub fn zext(&self, width: u32) -> Option<Self> {
        if width < self.width {
            return None;
        }
        Some(ConstInt::from_biguint(width, self.bits.clone()))
    }

    /// Sign extend to `width` bits.
    ///
    /// Returns `None` when `width` is narrower than this constant.
    pub fn sext(&self, width: u32) -> Option<Self> {
        if width < self.width {
            return None;
        }
        Some(ConstInt::from_bigint(width, &self.to_signed()))
    }

    /// Truncate to `width` bits.
    ///
    /// Returns `None` when `width` is wider than this constant.
    pub fn trunc(&self, width: u32) -> Option<Self> {
        if width > self.width || width == 0 {
            return None;
        }
        Some(ConstInt::from_biguint(width, self.bits.clone()))
    }

    /// Apply a width conversion.
    pub fn cast(&self, op: CastOp, width: u32) -> Option<Self> {
        match op {
            CastOp::Zext => self.zext(width),
            CastOp::Sext => self.sext(width),
            CastOp::Trunc => self.trunc(width),
        }
    }

    /// Compare two constants of the same width.
    ///
    /// Returns `None` if the widths differ.
    pub fn compare(cc: IntCC, a: &Self, b: &Self) -> Option<bool> {
        if a.width != b.width {
            return None;
        }
        let (ua, ub) = (&a.bits, &b.bits);
        Some(match cc {
            IntCC::Eq => ua == ub,
            IntCC::Ne => ua != ub,
            IntCC::Ult => ua < ub,
            IntCC::Ule => ua <= ub,
            IntCC::Ugt => ua > ub,
            IntCC::Uge => ua >= ub,
            IntCC::Slt => a.to_signed() < b.to_signed(),
            IntCC::Sle => a.to_signed() <= b.to_signed(),
            IntCC::Sgt => a.to_signed() > b.to_signed(),
            IntCC::Sge => a.to_signed() >= b.to_signed(),
        })
    }

    /// Evaluate `a op b` exactly.
    ///
    /// Returns `None` when the result is undefined: mismatched widths,
    /// division by zero, signed division overflow, a shift amount of at least
    /// the bit width, or a violated `nuw`, `nsw` or `exact` flag.
    pub fn binary(op: BinaryOp, flags: Flags, a: &Self, b: &Self) -> Option<Self> {
        if a.width != b.width {
            return None;
        }
        let width = a.width;
        let (ua, ub) = (&a.bits, &b.bits);
        let (sa, sb) = (a.to_signed(), b.to_signed());
        let smin = ConstInt::signed_min(width).to_signed();
        let smax = ConstInt::signed_max(width).to_signed();
        let umax = mask(width);
        let in_signed_range = |v: &BigInt| *v >= smin && *v <= smax;
        // Shift amounts at or above the width are undefined.
        let amount = || ub.to_u32().filter(|s| *s < width).map(|s| s as usize);

        let result = match op {
            BinaryOp::Add => {
                let sum = ua + ub;
                if flags.nuw && sum > umax {
                    return None;
                }
                if flags.nsw && !in_signed_range(&(&sa + &sb)) {
                    return None;
                }
                ConstInt::from_biguint(width, sum)
            }
            BinaryOp::Sub => {
                if flags.nuw && ua < ub {
                    return None;
                }
                let diff = &sa - &sb;
                if flags.nsw && !in_signed_range(&diff) {
                    return None;
                }
                ConstInt::from_bigint(width, &diff)
            }
            BinaryOp::Mul => {
                let product = ua * ub;
                if flags.nuw && product > umax {
                    return None;
                }
                if flags.nsw && !in_signed_range(&(&sa * &sb)) {
                    return None;
                }
                ConstInt::from_biguint(width, product)
            }
            BinaryOp::Shl => {
                let s = amount()?;
                let shifted = ua.clone() << s;
                if flags.nuw && shifted > umax {
                    return None;
                }
                if flags.nsw && !in_signed_range(&(sa << s)) {
                    return None;
                }
                ConstInt::from_biguint(width, shifted)
            }
            BinaryOp::Lshr | BinaryOp::Ashr => {
                let s = amount()?;
                if flags.exact && !(ua % modulus(s as u32)).is_zero() {
                    return None;
                }
                if op == BinaryOp::Ashr && a.sign_bit() {
                    // Shift the complement so that ones come in from the top.
                    ConstInt::from_biguint(width, &umax ^ ((&umax ^ ua) >> s))
                } else {
                    ConstInt::from_biguint(width, ua.clone() >> s)
                }
            }
            BinaryOp::Udiv | BinaryOp::Urem => {
                if ub.is_zero() {
                    return None;
                }
                let rem = ua % ub;
                if flags.exact && !rem.is_zero() {
                    return None;
                }
                if op == BinaryOp::Udiv {
                    ConstInt::from_biguint(width, ua / ub)
                } else {
                    ConstInt::from_biguint(width, rem)
                }
            }
            BinaryOp::Sdiv | BinaryOp::Srem => {
                if sb.is_zero() || (sa == smin && sb == -BigInt::one()) {
                    return None;
                }
                let rem = &sa % &sb;
                if flags.exact && !rem.is_zero() {
                    return None;
                }
                if op == BinaryOp::Sdiv {
                    ConstInt::from_bigint(width, &(&sa / &sb))
                } else {
                    ConstInt::from_bigint(width, &rem)
                }
            }
            BinaryOp::And => ConstInt::from_biguint(width, ua & ub),
            BinaryOp::Or => ConstInt::from_biguint(width, ua | ub),
            BinaryOp::Xor => ConstInt::from_biguint(width, ua ^ ub),
        };
        Some(result)
    }
}
