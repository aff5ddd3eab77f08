//! Emitting the IR's text format.
//!
//! The format is LLVM-like, for logs and test expectations:
//!
//! ```text
//! declare void @assert(i1)
//!
//! define i32 @f(i32 %arg0, i32 %arg1) {
//! bb0:
//!   %2 = icmp ne %arg1, 0
//!   call void @assert(%2)
//!   %q = udiv i32 %arg0, %arg1
//!   ret %q
//! }
//! ```
//!
//! Unnamed instructions are rendered by their index in the function's arena.

use crate::int::ConstInt;
use crate::ir::{self, FuncId};
use std::fmt::{self, Display};

/// Like `std::fmt::Display`, but with the enclosing module and function as
/// context.
trait DisplayWithContext {
    fn display(&self, cx: &Cx, f: &mut fmt::Formatter) -> fmt::Result;
}

struct Cx<'a> {
    module: &'a ir::Module,
    func: &'a ir::Function,
}

/// Displays one function of a module. See
/// [`Module::display_function`][crate::ir::Module::display_function].
#[derive(Debug)]
pub struct FunctionDisplay<'a> {
    module: &'a ir::Module,
    id: FuncId,
}

impl ir::Module {
    /// Render the function `id` in text form.
    ///
    /// # Panics
    ///
    /// Displaying the result panics if `id` is not from this module.
    pub fn display_function(&self, id: FuncId) -> FunctionDisplay<'_> {
        FunctionDisplay { module: self, id }
    }
}

impl Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cx = Cx {
            module: self.module,
            func: &self.module.functions[self.id],
        };
        cx.func.display(&cx, f)
    }
}

impl Display for ir::Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (_, global) in self.globals.iter() {
            writeln!(f, "@{} = global {}", global.name, global.ty)?;
        }
        let mut first = true;
        for (id, _) in self.functions.iter() {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{}", self.display_function(id))?;
        }
        Ok(())
    }
}

impl DisplayWithContext for ir::Function {
    fn display(&self, cx: &Cx, f: &mut fmt::Formatter) -> fmt::Result {
        let sig = &self.signature;
        if self.is_declaration() {
            write!(f, "declare {} @{}(", sig.ret, self.name)?;
            for (i, p) in sig.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", p)?;
            }
            return writeln!(f, ")");
        }

        write!(f, "define {} @{}(", sig.ret, self.name)?;
        for (i, p) in sig.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} ", p)?;
            ir::Value::Arg(i as u32).display(cx, f)?;
        }
        writeln!(f, ") {{")?;
        for (i, block) in self.blocks.iter().enumerate() {
            writeln!(f, "bb{}:", i)?;
            for id in &block.insts {
                write!(f, "  ")?;
                let inst = &self.insts[*id];
                if inst.ty != ir::Type::Void {
                    ir::Value::Inst(*id).display(cx, f)?;
                    write!(f, " = ")?;
                }
                inst.display(cx, f)?;
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }
}

fn comma_separated<'v>(
    values: impl IntoIterator<Item = &'v ir::Value>,
    cx: &Cx,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        v.display(cx, f)?;
    }
    Ok(())
}

impl DisplayWithContext for ir::Inst {
    fn display(&self, cx: &Cx, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind.opcode_name())?;
        match &self.kind {
            ir::InstKind::Binary { flags, a, b, .. } => {
                if flags.nuw {
                    write!(f, " nuw")?;
                }
                if flags.nsw {
                    write!(f, " nsw")?;
                }
                if flags.exact {
                    write!(f, " exact")?;
                }
                write!(f, " {} ", self.ty)?;
                comma_separated([a, b], cx, f)
            }
            ir::InstKind::Icmp { cc, a, b } => {
                write!(f, " {} ", cc.name())?;
                comma_separated([a, b], cx, f)
            }
            ir::InstKind::Cast { value, .. } => {
                write!(f, " ")?;
                value.display(cx, f)?;
                write!(f, " to {}", self.ty)
            }
            ir::InstKind::Gep {
                inbounds,
                source,
                base,
                indices,
            } => {
                if *inbounds {
                    write!(f, " inbounds")?;
                }
                write!(f, " {}, ", source)?;
                base.display(cx, f)?;
                for index in indices {
                    write!(f, ", ")?;
                    index.display(cx, f)?;
                }
                Ok(())
            }
            ir::InstKind::Alloca { allocated } => write!(f, " {}", allocated),
            ir::InstKind::Load { ptr } => {
                write!(f, " {}, ", self.ty)?;
                ptr.display(cx, f)
            }
            ir::InstKind::Store { value, ptr } => {
                write!(f, " ")?;
                comma_separated([value, ptr], cx, f)
            }
            ir::InstKind::Call { callee, args } => {
                write!(f, " {} @{}(", self.ty, cx.module.functions[*callee].name)?;
                comma_separated(args, cx, f)?;
                write!(f, ")")
            }
            ir::InstKind::Ret { value: Some(v) } => {
                write!(f, " ")?;
                v.display(cx, f)
            }
            ir::InstKind::Ret { value: None } => write!(f, " void"),
        }
    }
}

impl DisplayWithContext for ir::Value {
    fn display(&self, cx: &Cx, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ir::Value::Inst(id) => match &cx.func.insts[*id].name {
                Some(name) => write!(f, "%{}", name),
                None => write!(f, "%{}", id.index()),
            },
            ir::Value::Arg(n) => write!(f, "%arg{}", n),
            ir::Value::Global(g) => write!(f, "@{}", cx.module.globals[*g].name),
            ir::Value::Const(ir::Constant::Int(c)) => write!(f, "{}", c),
            ir::Value::Const(ir::Constant::Null) => write!(f, "null"),
        }
    }
}

impl Display for ConstInt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_true() {
            write!(f, "true")
        } else if self.is_false() {
            write!(f, "false")
        } else {
            write!(f, "{}", self.to_signed())
        }
    }
}
