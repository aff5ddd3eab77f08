//! The typed SSA instruction IR that assertions are inserted into.
//!
//! A [`Module`][crate::ir::Module] owns an arena of functions and an arena of
//! global variables. Each [`Function`][crate::ir::Function] owns an arena of
//! instructions and an ordered list of basic blocks, where each block is an
//! ordered list of ids into that arena.

use crate::error::{Error, ErrorKind, Result};
use crate::int::ConstInt;
pub use crate::opcode::{BinaryOp, CastOp, Flags, IntCC};
pub use id_arena::{Arena, Id};
use std::{convert::TryFrom, fmt};

/// An identifier for an instruction within its function's arena.
pub type InstId = Id<Inst>;

/// An identifier for a function within its module.
pub type FuncId = Id<Function>;

/// An identifier for a global variable within its module.
pub type GlobalId = Id<Global>;

/// The widest integer type an input instruction may use, in bits.
///
/// Checks recompute arithmetic in types up to twice as wide as this.
pub const MAX_INT_WIDTH: u32 = 1 << 23;

/// A type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// The type of instructions that produce no value.
    Void,

    /// An integer of the given bit width, between 1 and `MAX_INT_WIDTH`.
    Int(u32),

    /// A pointer to a value of the given type.
    Ptr(Box<Type>),

    /// A fixed-length array of elements.
    Array(Box<Type>, u64),

    /// A structure of heterogeneous fields.
    Struct(Vec<Type>),
}

impl Type {
    /// The `i1` boolean type.
    pub fn bool() -> Type {
        Type::Int(1)
    }

    /// A pointer to `pointee`.
    pub fn ptr(pointee: Type) -> Type {
        Type::Ptr(Box::new(pointee))
    }

    /// An array of `count` elements of type `element`.
    pub fn array(element: Type, count: u64) -> Type {
        Type::Array(Box::new(element), count)
    }

    /// The bit width, if this is an integer type.
    pub fn int_width(&self) -> Option<u32> {
        match self {
            Type::Int(w) => Some(*w),
            _ => None,
        }
    }

    /// The type reached by indexing one level into this aggregate with
    /// `index`.
    ///
    /// Struct fields can only be selected with constant indices.
    pub fn index_into(&self, index: &Value) -> Option<&Type> {
        match (self, index) {
            (Type::Array(element, _), _) => Some(element),
            (Type::Struct(fields), Value::Const(Constant::Int(c))) => {
                fields.get(usize::try_from(c.to_u128()?).ok()?)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(w) => write!(f, "i{}", w),
            Type::Ptr(p) => write!(f, "{}*", p),
            Type::Array(e, n) => write!(f, "[{} x {}]", n, e),
            Type::Struct(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}", field)?;
                }
                write!(f, " }}")
            }
        }
    }
}

/// A function's parameter and return types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Parameter types, in order.
    pub params: Vec<Type>,

    /// The return type.
    pub ret: Type,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (", self.ret)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")
    }
}

/// A literal constant value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    /// An integer constant.
    Int(ConstInt),

    /// The null pointer.
    Null,
}

/// Anything that can be used as an operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// The result of an instruction in the same function.
    Inst(InstId),

    /// The `n`th argument of the enclosing function.
    Arg(u32),

    /// The address of a global variable.
    Global(GlobalId),

    /// A literal constant.
    Const(Constant),
}

impl Value {
    /// The null pointer constant.
    pub fn null() -> Value {
        Value::Const(Constant::Null)
    }
}

impl From<ConstInt> for Value {
    fn from(c: ConstInt) -> Self {
        Value::Const(Constant::Int(c))
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Value::Const(c)
    }
}

impl From<InstId> for Value {
    fn from(id: InstId) -> Self {
        Value::Inst(id)
    }
}

impl From<GlobalId> for Value {
    fn from(id: GlobalId) -> Self {
        Value::Global(id)
    }
}

/// An instruction: an operation, its result type and an optional name.
#[derive(Clone, Debug)]
pub struct Inst {
    /// The operation and its operands.
    pub kind: InstKind,

    /// The type of the value this instruction defines, or `Type::Void`.
    pub ty: Type,

    /// The name used when rendering this instruction's result, if any.
    pub name: Option<String>,
}

impl Inst {
    /// Create an unnamed instruction.
    pub fn new(kind: InstKind, ty: Type) -> Self {
        Inst {
            kind,
            ty,
            name: None,
        }
    }
}

/// The operation performed by an instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstKind {
    /// Integer arithmetic or bit-wise logic.
    Binary {
        #[allow(missing_docs)]
        op: BinaryOp,
        #[allow(missing_docs)]
        flags: Flags,
        #[allow(missing_docs)]
        a: Value,
        #[allow(missing_docs)]
        b: Value,
    },

    /// Integer or pointer comparison producing an `i1`.
    Icmp {
        #[allow(missing_docs)]
        cc: IntCC,
        #[allow(missing_docs)]
        a: Value,
        #[allow(missing_docs)]
        b: Value,
    },

    /// Integer width conversion to the instruction's result type.
    Cast {
        #[allow(missing_docs)]
        op: CastOp,
        #[allow(missing_docs)]
        value: Value,
    },

    /// Address computation. The first index steps over whole `source`
    /// objects behind `base`; each later index selects one level inside
    /// `source`.
    Gep {
        /// Leaving the bounds of the underlying object is undefined behavior.
        inbounds: bool,
        /// The type `base` points to.
        source: Type,
        #[allow(missing_docs)]
        base: Value,
        #[allow(missing_docs)]
        indices: Vec<Value>,
    },

    /// Reserve stack storage for a value of the given type.
    Alloca {
        #[allow(missing_docs)]
        allocated: Type,
    },

    /// Read the value behind a pointer.
    Load {
        #[allow(missing_docs)]
        ptr: Value,
    },

    /// Write a value behind a pointer.
    Store {
        #[allow(missing_docs)]
        value: Value,
        #[allow(missing_docs)]
        ptr: Value,
    },

    /// Call a function in the same module.
    Call {
        #[allow(missing_docs)]
        callee: FuncId,
        #[allow(missing_docs)]
        args: Vec<Value>,
    },

    /// Return from the function.
    Ret {
        #[allow(missing_docs)]
        value: Option<Value>,
    },
}

impl InstKind {
    /// The opcode name, as rendered in text.
    pub fn opcode_name(&self) -> &'static str {
        match self {
            InstKind::Binary { op, .. } => op.name(),
            InstKind::Icmp { .. } => "icmp",
            InstKind::Cast { op, .. } => op.name(),
            InstKind::Gep { .. } => "getelementptr",
            InstKind::Alloca { .. } => "alloca",
            InstKind::Load { .. } => "load",
            InstKind::Store { .. } => "store",
            InstKind::Call { .. } => "call",
            InstKind::Ret { .. } => "ret",
        }
    }

    /// Visit every operand, in order.
    pub fn operands(&self, mut f: impl FnMut(&Value)) {
        match self {
            InstKind::Binary { a, b, .. } | InstKind::Icmp { a, b, .. } => {
                f(a);
                f(b);
            }
            InstKind::Cast { value, .. } => f(value),
            InstKind::Gep { base, indices, .. } => {
                f(base);
                indices.iter().for_each(f);
            }
            InstKind::Alloca { .. } => {}
            InstKind::Load { ptr } => f(ptr),
            InstKind::Store { value, ptr } => {
                f(value);
                f(ptr);
            }
            InstKind::Call { args, .. } => args.iter().for_each(f),
            InstKind::Ret { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }
        }
    }

    /// Does this instruction's result depend only on its operands?
    pub fn is_pure(&self) -> bool {
        matches!(
            self,
            InstKind::Binary { .. }
                | InstKind::Icmp { .. }
                | InstKind::Cast { .. }
                | InstKind::Gep { .. }
        )
    }
}

/// A basic block: a straight-line sequence of instructions.
#[derive(Clone, Debug, Default)]
pub struct Block {
    /// The block's instructions, in execution order.
    pub insts: Vec<InstId>,
}

/// A function definition or declaration.
#[derive(Clone, Debug)]
pub struct Function {
    /// The function's symbol name, without the leading `@`.
    pub name: String,

    /// Parameter and return types.
    pub signature: Signature,

    /// Storage for every instruction ever created in this function, including
    /// ones no longer referenced by any block.
    pub insts: Arena<Inst>,

    /// Basic blocks, in layout order. Empty for declarations.
    pub blocks: Vec<Block>,
}

impl Function {
    /// Create a function with no blocks.
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Function {
            name: name.into(),
            signature,
            insts: Arena::new(),
            blocks: vec![],
        }
    }

    /// Is this only a declaration, with no body?
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get an instruction.
    ///
    /// # Panics
    ///
    /// May panic or produce incorrect results if given an `InstId` from
    /// another function's arena.
    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id]
    }

    /// Iterate over the ids of every instruction placed in a block, in layout
    /// order.
    pub fn layout(&self) -> impl Iterator<Item = InstId> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter().copied())
    }

    /// The bit width of `value`, if it is integer typed.
    ///
    /// Global addresses and the null pointer are never integers.
    pub fn int_width(&self, value: &Value) -> Option<u32> {
        int_width(&self.insts, &self.signature.params, value)
    }
}

pub(crate) fn int_width(insts: &Arena<Inst>, params: &[Type], value: &Value) -> Option<u32> {
    match value {
        Value::Inst(id) => insts[*id].ty.int_width(),
        Value::Arg(n) => params.get(*n as usize)?.int_width(),
        Value::Const(Constant::Int(c)) => Some(c.width()),
        Value::Const(Constant::Null) | Value::Global(_) => None,
    }
}

/// A global variable.
#[derive(Clone, Debug)]
pub struct Global {
    /// The symbol name, without the leading `@`.
    pub name: String,

    /// The type of the value stored in this global.
    pub ty: Type,
}

/// A compilation unit: functions and global variables.
#[derive(Clone, Debug)]
pub struct Module {
    /// Every function in this module, declared or defined.
    pub functions: Arena<Function>,

    /// Every global variable in this module.
    pub globals: Arena<Global>,
}

impl Default for Module {
    fn default() -> Self {
        Module {
            functions: Arena::new(),
            globals: Arena::new(),
        }
    }
}

impl Module {
    /// Create an empty module.
    pub fn new() -> Self {
        Module::default()
    }

    /// Add a function.
    pub fn add_function(&mut self, function: Function) -> FuncId {
        self.functions.alloc(function)
    }

    /// Add a global variable holding a value of type `ty`.
    pub fn add_global(&mut self, name: impl Into<String>, ty: Type) -> GlobalId {
        self.globals.alloc(Global {
            name: name.into(),
            ty,
        })
    }

    /// Find a function by name.
    pub fn get_function(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(id, _)| id)
    }

    /// Find the function named `name`, or declare it with `signature`.
    ///
    /// Fails if the function exists with a different signature.
    pub fn get_or_insert_function(&mut self, name: &str, signature: Signature) -> Result<FuncId> {
        match self.get_function(name) {
            Some(id) if self.functions[id].signature == signature => Ok(id),
            Some(id) => Err(Error::new(ErrorKind::SignatureMismatch {
                name: name.to_string(),
                expected: signature,
                found: self.functions[id].signature.clone(),
            })),
            None => Ok(self.add_function(Function::new(name, signature))),
        }
    }

    /// The ids of every function with a body, in creation order.
    pub fn definitions(&self) -> Vec<FuncId> {
        self.functions
            .iter()
            .filter(|(_, f)| !f.is_declaration())
            .map(|(id, _)| id)
            .collect()
    }
}

/// A builder for a [`Function`][crate::ir::Function].
///
/// Instructions are appended to the current block, which starts out as the
/// function's first block.
#[derive(Clone, Debug)]
pub struct FunctionBuilder {
    function: Function,
    current: usize,
}

impl FunctionBuilder {
    /// Start building a function with an empty entry block.
    pub fn new(name: impl Into<String>, params: Vec<Type>, ret: Type) -> Self {
        let mut function = Function::new(name, Signature { params, ret });
        function.blocks.push(Block::default());
        FunctionBuilder {
            function,
            current: 0,
        }
    }

    /// The `n`th argument.
    ///
    /// # Panics
    ///
    /// Panics if the function has no `n`th parameter.
    pub fn arg(&self, n: u32) -> Value {
        assert!((n as usize) < self.function.signature.params.len());
        Value::Arg(n)
    }

    /// Append a new empty block and make it current. Returns its index.
    pub fn block(&mut self) -> usize {
        self.function.blocks.push(Block::default());
        self.current = self.function.blocks.len() - 1;
        self.current
    }

    /// Append subsequent instructions to the block at `index`.
    ///
    /// # Panics
    ///
    /// Panics if there is no such block.
    pub fn switch_to_block(&mut self, index: usize) {
        assert!(index < self.function.blocks.len());
        self.current = index;
    }

    /// Append an instruction to the current block.
    ///
    /// Returns the value defined by the instruction.
    pub fn inst(&mut self, name: Option<String>, ty: Type, kind: InstKind) -> Value {
        let id = self.function.insts.alloc(Inst { kind, ty, name });
        self.function.blocks[self.current].insts.push(id);
        Value::Inst(id)
    }

    /// Append a named binary operation. The result type is `a`'s type, or
    /// `b`'s when `a` is untyped.
    ///
    /// # Panics
    ///
    /// Panics if neither operand is integer typed.
    pub fn binary(&mut self, name: &str, op: BinaryOp, flags: Flags, a: Value, b: Value) -> Value {
        let width = self
            .function
            .int_width(&a)
            .or_else(|| self.function.int_width(&b))
            .expect("binary operation with no integer operand");
        self.inst(
            Some(name.to_string()),
            Type::Int(width),
            InstKind::Binary { op, flags, a, b },
        )
    }

    /// Append a named comparison.
    pub fn icmp(&mut self, name: &str, cc: IntCC, a: Value, b: Value) -> Value {
        self.inst(Some(name.to_string()), Type::bool(), InstKind::Icmp { cc, a, b })
    }

    /// Append a named width conversion to `iN`.
    pub fn cast(&mut self, name: &str, op: CastOp, value: Value, width: u32) -> Value {
        self.inst(
            Some(name.to_string()),
            Type::Int(width),
            InstKind::Cast { op, value },
        )
    }

    /// Append a named address computation.
    ///
    /// The result points to the type reached by walking `source` with every
    /// index after the first; it is `i8*` when that walk fails.
    pub fn gep(
        &mut self,
        name: &str,
        inbounds: bool,
        source: Type,
        base: Value,
        indices: Vec<Value>,
    ) -> Value {
        let mut target = Some(&source);
        for index in indices.iter().skip(1) {
            target = target.and_then(|t| t.index_into(index));
        }
        let ty = Type::ptr(target.cloned().unwrap_or(Type::Int(8)));
        self.inst(
            Some(name.to_string()),
            ty,
            InstKind::Gep {
                inbounds,
                source,
                base,
                indices,
            },
        )
    }

    /// Append a named stack allocation.
    pub fn alloca(&mut self, name: &str, allocated: Type) -> Value {
        self.inst(
            Some(name.to_string()),
            Type::ptr(allocated.clone()),
            InstKind::Alloca { allocated },
        )
    }

    /// Append a named load of a `ty` value.
    pub fn load(&mut self, name: &str, ty: Type, ptr: Value) -> Value {
        self.inst(Some(name.to_string()), ty, InstKind::Load { ptr })
    }

    /// Append a store.
    pub fn store(&mut self, value: Value, ptr: Value) {
        self.inst(None, Type::Void, InstKind::Store { value, ptr });
    }

    /// Append a call returning `ret`.
    pub fn call(&mut self, ret: Type, callee: FuncId, args: Vec<Value>) -> Value {
        self.inst(None, ret, InstKind::Call { callee, args })
    }

    /// Append a return.
    pub fn ret(&mut self, value: Option<Value>) {
        self.inst(None, Type::Void, InstKind::Ret { value });
    }

    /// Finish building this function.
    pub fn finish(self) -> Function {
        self.function
    }
}
