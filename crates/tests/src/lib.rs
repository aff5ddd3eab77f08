use autoassert::ir::{InstKind, Module};
use autoassert::{run_passes, Context, Instrument, ModulePass, Options, Prune};

/// Count the assertion calls to the function named `entry` across `module`.
pub fn count_assertions(module: &Module, entry: &str) -> usize {
    let callee = match module.get_function(entry) {
        Some(callee) => callee,
        None => return 0,
    };
    module
        .functions
        .iter()
        .flat_map(|(_, func)| func.layout().map(move |inst| func.inst(inst)))
        .filter(|inst| matches!(&inst.kind, InstKind::Call { callee: c, .. } if *c == callee))
        .count()
}

/// Instrument and prune the module produced by `build`, returning its text.
///
/// Checks that the pipeline is deterministic and that pruning a second time
/// changes nothing.
pub fn assert_pipeline(build: impl Fn() -> Module, options: Options) -> String {
    let run = || {
        let mut module = build();
        let mut cx = Context::new(options.clone());
        run_passes(&mut cx, &mut module, &mut [&mut Instrument, &mut Prune])
            .expect("instrumenting and pruning should succeed");
        let text = module.to_string();

        let again = Prune
            .run(&mut cx, &mut module)
            .expect("pruning again should succeed");
        assert!(!again, "pruning twice should be a no-op:\n{}", text);
        assert_eq!(text, module.to_string());

        text
    };

    let text_1 = run();
    let text_2 = run();
    assert_eq!(
        text_1, text_2,
        "running the same pipeline twice should generate the same module",
    );
    text_1
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoassert::int::ConstInt;
    use autoassert::ir::{BinaryOp, Flags, FunctionBuilder, IntCC, Type, Value};
    use autoassert::ErrorKind;

    fn init() {
        let _ = env_logger::try_init();
    }

    /// `(x + y) / y` with a signed, non-wrapping add.
    fn add_then_sdiv() -> Module {
        let mut b = FunctionBuilder::new("f", vec![Type::Int(32), Type::Int(32)], Type::Int(32));
        let (x, y) = (b.arg(0), b.arg(1));
        let s = b.binary("s", BinaryOp::Add, Flags::NSW, x, y.clone());
        let q = b.binary("q", BinaryOp::Sdiv, Flags::NONE, s, y);
        b.ret(Some(q));
        let mut module = Module::new();
        module.add_function(b.finish());
        module
    }

    #[test]
    fn add_nsw_then_sdiv() -> anyhow::Result<()> {
        init();
        let mut module = add_then_sdiv();
        let mut cx = Context::default();
        assert!(Instrument.run(&mut cx, &mut module)?);

        let expected = "\
define i32 @f(i32 %arg0, i32 %arg1) {
bb0:
  %3 = sext %arg0 to i33
  %4 = sext %arg1 to i33
  %5 = add i33 %3, %4
  %6 = icmp sge %5, -2147483648
  call void @assert(%6)
  %8 = icmp sle %5, 2147483647
  call void @assert(%8)
  %s = add nsw i32 %arg0, %arg1
  %10 = icmp ne %s, -2147483648
  %11 = icmp ne %arg1, -1
  %12 = or i1 %10, %11
  call void @assert(%12)
  %14 = icmp ne %arg1, 0
  call void @assert(%14)
  %q = sdiv i32 %s, %arg1
  ret %q
}

declare void @assert(i1)
";
        assert_eq!(module.to_string(), expected);

        // Every check is distinct and none folds.
        assert!(!Prune.run(&mut cx, &mut module)?);
        assert_eq!(module.to_string(), expected);
        Ok(())
    }

    #[test]
    fn pipeline_is_deterministic() {
        init();
        let text = assert_pipeline(add_then_sdiv, Options::default());
        assert_eq!(text.matches("call void @assert").count(), 4);
    }

    #[test]
    fn duplicate_divisor_checks_are_pruned() -> anyhow::Result<()> {
        init();
        let build = || {
            let ty = Type::Int(16);
            let mut b = FunctionBuilder::new("g", vec![ty.clone(), ty.clone(), ty.clone()], ty);
            let (x, y, z) = (b.arg(0), b.arg(1), b.arg(2));
            let a = b.binary("a", BinaryOp::Udiv, Flags::NONE, x, z.clone());
            let c = b.binary("c", BinaryOp::Urem, Flags::NONE, y, z);
            let r = b.binary("r", BinaryOp::Add, Flags::NONE, a, c);
            b.ret(Some(r));
            let mut module = Module::new();
            module.add_function(b.finish());
            module
        };

        let mut module = build();
        let mut cx = Context::default();
        Instrument.run(&mut cx, &mut module)?;
        assert_eq!(count_assertions(&module, "assert"), 2);
        assert!(Prune.run(&mut cx, &mut module)?);
        assert_eq!(count_assertions(&module, "assert"), 1);

        let text = assert_pipeline(build, Options::default());
        assert_eq!(text.matches("icmp ne %arg2, 0").count(), 2);
        assert_eq!(text.matches("call void @assert").count(), 1);
        Ok(())
    }

    #[test]
    fn memory_checks() -> anyhow::Result<()> {
        init();
        let build = || {
            let mut module = Module::new();
            let array = Type::array(Type::Int(32), 4);
            let g = module.add_global("g", array.clone());
            let mut b = FunctionBuilder::new("h", vec![Type::Int(64)], Type::Int(32));
            let i = b.arg(0);
            let zero = Value::from(ConstInt::zero(64));
            let p = b.gep("p", true, array, Value::Global(g), vec![zero, i]);
            let v = b.load("v", Type::Int(32), p);
            b.ret(Some(v));
            module.add_function(b.finish());
            module
        };

        let mut module = build();
        let mut cx = Context::default();
        Instrument.run(&mut cx, &mut module)?;
        let expected = "\
@g = global [4 x i32]
define i32 @h(i64 %arg0) {
bb0:
  %3 = icmp ne @g, null
  call void @assert(%3)
  %5 = icmp eq 0, 0
  call void @assert(%5)
  %7 = icmp sge %arg0, 0
  call void @assert(%7)
  %9 = icmp slt %arg0, 4
  call void @assert(%9)
  %p = getelementptr inbounds [4 x i32], @g, 0, %arg0
  %11 = icmp ne %p, null
  call void @assert(%11)
  %v = load i32, %p
  ret %v
}

declare void @assert(i1)
";
        assert_eq!(module.to_string(), expected);

        // The constant first index folds away.
        assert!(Prune.run(&mut cx, &mut module)?);
        assert_eq!(count_assertions(&module, "assert"), 4);
        assert!(!module.to_string().contains("call void @assert(%5)"));
        Ok(())
    }

    #[test]
    fn wide_checks_across_blocks() -> anyhow::Result<()> {
        init();
        let build = || {
            let ty = Type::Int(200);
            let mut b = FunctionBuilder::new("w", vec![ty.clone(), ty.clone()], ty);
            let (x, y) = (b.arg(0), b.arg(1));
            b.binary("q", BinaryOp::Udiv, Flags::NONE, x.clone(), y.clone());
            b.block();
            let r = b.binary("r", BinaryOp::Urem, Flags::NONE, x, y);
            b.ret(Some(r));
            let mut module = Module::new();
            module.add_function(b.finish());
            module
        };

        let mut module = build();
        let mut cx = Context::default();
        assert!(Instrument.run(&mut cx, &mut module)?);
        let expected = "\
define i200 @w(i200 %arg0, i200 %arg1) {
bb0:
  %3 = icmp ne %arg1, 0
  call void @assert(%3)
  %q = udiv i200 %arg0, %arg1
bb1:
  %5 = icmp ne %arg1, 0
  call void @assert(%5)
  %r = urem i200 %arg0, %arg1
  ret %r
}

declare void @assert(i1)
";
        assert_eq!(module.to_string(), expected);

        // The second block's check repeats the first one's.
        let text = assert_pipeline(build, Options::default());
        assert_eq!(text.matches("call void @assert").count(), 1);
        assert!(text.contains("bb1:\n  %5 = icmp ne %arg1, 0\n  %r = urem"), "{}", text);
        Ok(())
    }

    #[test]
    fn identifiers_are_unique_across_functions() -> anyhow::Result<()> {
        init();
        let mut module = Module::new();
        for name in &["a", "b"] {
            let mut b = FunctionBuilder::new(*name, vec![Type::Int(8)], Type::Int(8));
            let x = b.arg(0);
            let s = b.binary("s", BinaryOp::Shl, Flags::NONE, x.clone(), x);
            b.ret(Some(s));
            module.add_function(b.finish());
        }

        let options = Options::new().entry_point("check").identifiers(true);
        let mut cx = Context::new(options);
        Instrument.run(&mut cx, &mut module)?;
        assert_eq!(cx.assertions_issued(), 2);

        let text = module.to_string();
        assert!(text.contains("call void @check(%2, 0)"), "{}", text);
        assert!(text.contains("call void @check(%2, 1)"), "{}", text);
        assert!(text.contains("declare void @check(i1, i32)"), "{}", text);
        Ok(())
    }

    #[test]
    fn always_failing_check_is_kept() -> anyhow::Result<()> {
        init();
        let mut b = FunctionBuilder::new("k", vec![], Type::Int(8));
        let one = Value::from(ConstInt::one(8));
        let zero = Value::from(ConstInt::zero(8));
        let q = b.binary("q", BinaryOp::Udiv, Flags::NONE, one, zero);
        b.ret(Some(q));
        let mut module = Module::new();
        module.add_function(b.finish());

        let mut cx = Context::default();
        Instrument.run(&mut cx, &mut module)?;
        assert!(!Prune.run(&mut cx, &mut module)?);
        assert_eq!(count_assertions(&module, "assert"), 1);
        Ok(())
    }

    #[test]
    fn literal_false_assertion_is_an_error() -> anyhow::Result<()> {
        init();
        let mut module = Module::new();
        let cx = Context::default();
        let entry = module.get_or_insert_function("assert", cx.options().entry_signature())?;
        let mut b = FunctionBuilder::new("bad", vec![], Type::Void);
        b.call(Type::Void, entry, vec![ConstInt::bool(false).into()]);
        b.ret(None);
        let id = module.add_function(b.finish());

        let err = autoassert::prune::prune_function(&cx, &mut module, id).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::ConstantFalseAssertion);
        assert_eq!(err.function(), Some("bad"));
        Ok(())
    }

    #[test]
    fn comparisons_are_not_instrumented() -> anyhow::Result<()> {
        init();
        let mut b = FunctionBuilder::new("cmp", vec![Type::Int(8), Type::Int(8)], Type::bool());
        let (x, y) = (b.arg(0), b.arg(1));
        let c = b.icmp("c", IntCC::Ult, x, y);
        b.ret(Some(c));
        let mut module = Module::new();
        module.add_function(b.finish());

        let mut cx = Context::default();
        assert!(!Instrument.run(&mut cx, &mut module)?);
        assert!(module.get_function("assert").is_none());
        Ok(())
    }
}
