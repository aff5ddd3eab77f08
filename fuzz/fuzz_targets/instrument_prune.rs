#![no_main]

use autoassert::int::ConstInt;
use autoassert::ir::{BinaryOp, Flags, FunctionBuilder, IntCC, Module, Type, Value};
use autoassert::{Context, Instrument, ModulePass, Prune};
use libfuzzer_sys::fuzz_target;

const OPS: [BinaryOp; 13] = [
    BinaryOp::Add,
    BinaryOp::Sub,
    BinaryOp::Mul,
    BinaryOp::Udiv,
    BinaryOp::Sdiv,
    BinaryOp::Urem,
    BinaryOp::Srem,
    BinaryOp::Shl,
    BinaryOp::Lshr,
    BinaryOp::Ashr,
    BinaryOp::And,
    BinaryOp::Or,
    BinaryOp::Xor,
];

/// Build a straight-line function over `i16` values from the input bytes.
fn build(data: &[u8]) -> Module {
    let ty = Type::Int(16);
    let mut b = FunctionBuilder::new("fuzz", vec![ty.clone(), ty.clone()], ty);
    let mut values = vec![b.arg(0), b.arg(1)];

    for (i, chunk) in data.chunks_exact(4).enumerate() {
        let pick = |byte: u8| values[usize::from(byte) % values.len()].clone();
        let a = pick(chunk[1]);
        let v = if chunk[2] & 0x80 != 0 {
            Value::from(ConstInt::new(16, u128::from(chunk[3])))
        } else {
            pick(chunk[2])
        };
        let name = format!("v{}", i);
        let value = if chunk[0] == 0xff {
            let c = b.icmp(&name, IntCC::Ult, a, v);
            b.cast(&format!("{}.z", name), autoassert::ir::CastOp::Zext, c, 16)
        } else {
            let op = OPS[usize::from(chunk[0]) % OPS.len()];
            let mut flags = Flags::NONE;
            if op.supports_wrap_flags() {
                flags.nuw = chunk[3] & 1 != 0;
                flags.nsw = chunk[3] & 2 != 0;
            }
            if op.supports_exact() {
                flags.exact = chunk[3] & 4 != 0;
            }
            b.binary(&name, op, flags, a, v)
        };
        values.push(value);
    }

    let last = values[values.len() - 1].clone();
    b.ret(Some(last));
    let mut module = Module::new();
    module.add_function(b.finish());
    module
}

fuzz_target!(|data: &[u8]| {
    let _ = env_logger::try_init();

    let mut module = build(data);
    log::debug!("input module:\n{}", module);

    let mut cx = Context::default();
    Instrument
        .run(&mut cx, &mut module)
        .expect("well-formed input should instrument");
    Prune
        .run(&mut cx, &mut module)
        .expect("pruning instrumented code should succeed");
    let text = module.to_string();

    let changed = Prune
        .run(&mut cx, &mut module)
        .expect("pruning again should succeed");
    assert!(!changed, "pruning twice should be a no-op:\n{}", text);
    assert_eq!(text, module.to_string());
});
