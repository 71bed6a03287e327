//! End-to-end programs driven through the public API: build a module,
//! step a Job to completion, check what came out.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use reed_eval::{
    ErrorKind, Job, JobId, JobState, NativeOutcome, ObjectWeak, StepOutcome, Value,
};
use reed_ir::{BinaryOp, IncDecOp, LogicalOp, ModuleBuilder, SharedInterner, StmtId};

fn build_job(build: impl FnOnce(&mut ModuleBuilder) -> Vec<StmtId>) -> Job {
    let interner = SharedInterner::new();
    let mut b = ModuleBuilder::new(interner.clone(), "test.rd");
    let top = build(&mut b);
    let module = b.finish(&top);
    Job::new(JobId::new(1), Rc::new(module), interner)
}

fn run(build: impl FnOnce(&mut ModuleBuilder) -> Vec<StmtId>) -> Value {
    build_job(build).finish().expect("program should finish")
}

#[test]
fn test_arithmetic_expression() {
    // return (2 + 3) * 4 - 1;
    let result = run(|b| {
        let two = b.int(2);
        let three = b.int(3);
        let four = b.int(4);
        let one = b.int(1);
        let sum = b.binary(BinaryOp::Add, two, three);
        let prod = b.binary(BinaryOp::Mul, sum, four);
        let total = b.binary(BinaryOp::Sub, prod, one);
        vec![b.ret(Some(total))]
    });
    assert_eq!(result, Value::Int(19));
}

#[test]
fn test_scalar_assignment_copies() {
    // a = 1; b = a; a = 2; return b;
    let result = run(|b| {
        let a1 = b.ident("a");
        let one = b.int(1);
        let s1 = {
            let e = b.assign(a1, one);
            b.expr_stmt(e)
        };
        let bb = b.ident("b");
        let a2 = b.ident("a");
        let s2 = {
            let e = b.assign(bb, a2);
            b.expr_stmt(e)
        };
        let a3 = b.ident("a");
        let two = b.int(2);
        let s3 = {
            let e = b.assign(a3, two);
            b.expr_stmt(e)
        };
        let b_ret = b.ident("b");
        vec![s1, s2, s3, b.ret(Some(b_ret))]
    });
    assert_eq!(result, Value::Int(1));
}

#[test]
fn test_object_assignment_aliases() {
    // o.x = 1; p = o; o.x = 9; return p.x;
    let result = run(|b| {
        let o1 = b.ident("o");
        let ox1 = b.member(o1, "x");
        let one = b.int(1);
        let s1 = {
            let e = b.assign(ox1, one);
            b.expr_stmt(e)
        };
        let p = b.ident("p");
        let o2 = b.ident("o");
        let s2 = {
            let e = b.assign(p, o2);
            b.expr_stmt(e)
        };
        let o3 = b.ident("o");
        let ox3 = b.member(o3, "x");
        let nine = b.int(9);
        let s3 = {
            let e = b.assign(ox3, nine);
            b.expr_stmt(e)
        };
        let p2 = b.ident("p");
        let px = b.member(p2, "x");
        vec![s1, s2, s3, b.ret(Some(px))]
    });
    assert_eq!(result, Value::Int(9));
}

#[test]
fn test_reading_unknown_name_yields_nil() {
    let result = run(|b| {
        let ghost = b.ident("ghost");
        vec![b.ret(Some(ghost))]
    });
    assert_eq!(result, Value::Nil);
}

#[test]
fn test_nested_member_vivification() {
    // o.a.b = 3; return o.a.b;
    let result = run(|b| {
        let o = b.ident("o");
        let oa = b.member(o, "a");
        let oab = b.member(oa, "b");
        let three = b.int(3);
        let s1 = {
            let e = b.assign(oab, three);
            b.expr_stmt(e)
        };
        let o2 = b.ident("o");
        let oa2 = b.member(o2, "a");
        let oab2 = b.member(oa2, "b");
        vec![s1, b.ret(Some(oab2))]
    });
    assert_eq!(result, Value::Int(3));
}

#[test]
fn test_array_literal_and_push() {
    // a = [10, 20]; a[] = 30; return a[2];
    let result = run(|b| {
        let ten = b.int(10);
        let twenty = b.int(20);
        let lit = b.array_lit(&[ten, twenty]);
        let a = b.ident("a");
        let s1 = {
            let e = b.assign(a, lit);
            b.expr_stmt(e)
        };
        let a2 = b.ident("a");
        let push = b.index_push(a2);
        let thirty = b.int(30);
        let s2 = {
            let e = b.assign(push, thirty);
            b.expr_stmt(e)
        };
        let a3 = b.ident("a");
        let two = b.int(2);
        let at2 = b.index(a3, two);
        vec![s1, s2, b.ret(Some(at2))]
    });
    assert_eq!(result, Value::Int(30));
}

#[test]
fn test_integral_real_key_aliases_int_slot() {
    // m[1] = 7; return m[1.0];
    let result = run(|b| {
        let m = b.ident("m");
        let one = b.int(1);
        let m1 = b.index(m, one);
        let seven = b.int(7);
        let s1 = {
            let e = b.assign(m1, seven);
            b.expr_stmt(e)
        };
        let m2 = b.ident("m");
        let one_real = b.real(1.0);
        let m1r = b.index(m2, one_real);
        vec![s1, b.ret(Some(m1r))]
    });
    assert_eq!(result, Value::Int(7));
}

#[test]
fn test_string_concatenation() {
    // return "n=" + (1 + 2);
    let result = run(|b| {
        let prefix = b.str("n=");
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        let concat = b.binary(BinaryOp::Add, prefix, sum);
        vec![b.ret(Some(concat))]
    });
    assert_eq!(result, Value::string("n=3"));
}

#[test]
fn test_while_with_break_and_continue() {
    // i = 0; s = 0;
    // while (i < 10) { i = i + 1; if (i == 3) continue; if (i == 5) break; s = s + i; }
    // return s;   -> 1 + 2 + 4 = 7
    let result = run(|b| {
        let i = b.ident("i");
        let zero = b.int(0);
        let s_init = {
            let e = b.assign(i, zero);
            b.expr_stmt(e)
        };
        let s = b.ident("s");
        let zero2 = b.int(0);
        let s_init2 = {
            let e = b.assign(s, zero2);
            b.expr_stmt(e)
        };

        let i2 = b.ident("i");
        let ten = b.int(10);
        let cond = b.binary(BinaryOp::Lt, i2, ten);

        let i3 = b.ident("i");
        let i4 = b.ident("i");
        let one = b.int(1);
        let bump = b.binary(BinaryOp::Add, i4, one);
        let body1 = {
            let e = b.assign(i3, bump);
            b.expr_stmt(e)
        };

        let i5 = b.ident("i");
        let three = b.int(3);
        let is3 = b.binary(BinaryOp::Eq, i5, three);
        let cont = b.cont();
        let body2 = b.if_stmt(is3, cont, None);

        let i6 = b.ident("i");
        let five = b.int(5);
        let is5 = b.binary(BinaryOp::Eq, i6, five);
        let brk = b.brk();
        let body3 = b.if_stmt(is5, brk, None);

        let s2 = b.ident("s");
        let s3 = b.ident("s");
        let i7 = b.ident("i");
        let add = b.binary(BinaryOp::Add, s3, i7);
        let body4 = {
            let e = b.assign(s2, add);
            b.expr_stmt(e)
        };

        let body = b.block(&[body1, body2, body3, body4]);
        let loop_stmt = b.while_stmt(cond, body);

        let s_ret = b.ident("s");
        vec![s_init, s_init2, loop_stmt, b.ret(Some(s_ret))]
    });
    assert_eq!(result, Value::Int(7));
}

#[test]
fn test_for_loop_sums() {
    // s = 0; for (i = 0; i < 5; i = i + 1) s = s + i; return s;  -> 10
    let result = run(|b| {
        let s = b.ident("s");
        let zero = b.int(0);
        let s_init = {
            let e = b.assign(s, zero);
            b.expr_stmt(e)
        };

        let i = b.ident("i");
        let zero2 = b.int(0);
        let init = b.assign(i, zero2);

        let i2 = b.ident("i");
        let five = b.int(5);
        let cond = b.binary(BinaryOp::Lt, i2, five);

        let i3 = b.ident("i");
        let i4 = b.ident("i");
        let one = b.int(1);
        let bump = b.binary(BinaryOp::Add, i4, one);
        let update = b.assign(i3, bump);

        let s2 = b.ident("s");
        let s3 = b.ident("s");
        let i5 = b.ident("i");
        let add = b.binary(BinaryOp::Add, s3, i5);
        let body = {
            let e = b.assign(s2, add);
            b.expr_stmt(e)
        };

        let loop_stmt = b.for_stmt(Some(init), Some(cond), Some(update), body);
        let s_ret = b.ident("s");
        vec![s_init, loop_stmt, b.ret(Some(s_ret))]
    });
    assert_eq!(result, Value::Int(10));
}

#[test]
fn test_goto_backward_jump() {
    // i = 0; top: i = i + 1; if (i < 3) goto top; return i;
    let result = run(|b| {
        let i = b.ident("i");
        let zero = b.int(0);
        let s1 = {
            let e = b.assign(i, zero);
            b.expr_stmt(e)
        };
        let top = b.label("top");
        let i2 = b.ident("i");
        let i3 = b.ident("i");
        let one = b.int(1);
        let bump = b.binary(BinaryOp::Add, i3, one);
        let s2 = {
            let e = b.assign(i2, bump);
            b.expr_stmt(e)
        };
        let i4 = b.ident("i");
        let three = b.int(3);
        let cond = b.binary(BinaryOp::Lt, i4, three);
        let jump = b.goto("top");
        let s3 = b.if_stmt(cond, jump, None);
        let i_ret = b.ident("i");
        vec![s1, top, s2, s3, b.ret(Some(i_ret))]
    });
    assert_eq!(result, Value::Int(3));
}

#[test]
fn test_goto_unknown_label_is_fatal() {
    let mut job = build_job(|b| {
        vec![b.goto("nowhere")]
    });
    let err = job.finish().expect_err("goto to a missing label");
    assert!(matches!(err.kind, ErrorKind::UndefinedLabel { .. }));
}

#[test]
fn test_compound_assign_and_inc_dec() {
    // i = 1; i += 4; i++; return ++i;  -> 7
    let result = run(|b| {
        let i = b.ident("i");
        let one = b.int(1);
        let s1 = {
            let e = b.assign(i, one);
            b.expr_stmt(e)
        };
        let i2 = b.ident("i");
        let four = b.int(4);
        let s2 = {
            let e = b.compound_assign(BinaryOp::Add, i2, four);
            b.expr_stmt(e)
        };
        let i3 = b.ident("i");
        let s3 = {
            let e = b.inc_dec(IncDecOp::Incr, false, i3);
            b.expr_stmt(e)
        };
        let i4 = b.ident("i");
        let pre = b.inc_dec(IncDecOp::Incr, true, i4);
        vec![s1, s2, s3, b.ret(Some(pre))]
    });
    assert_eq!(result, Value::Int(7));
}

#[test]
fn test_postfix_yields_old_value() {
    // i = 5; return i++;
    let result = run(|b| {
        let i = b.ident("i");
        let five = b.int(5);
        let s1 = {
            let e = b.assign(i, five);
            b.expr_stmt(e)
        };
        let i2 = b.ident("i");
        let post = b.inc_dec(IncDecOp::Incr, false, i2);
        vec![s1, b.ret(Some(post))]
    });
    assert_eq!(result, Value::Int(5));
}

#[test]
fn test_logical_short_circuit_skips_rhs() {
    // x = 0; t = true || (x = 5); f = false && (x = 7); return x;
    let result = run(|b| {
        let x = b.ident("x");
        let zero = b.int(0);
        let s1 = {
            let e = b.assign(x, zero);
            b.expr_stmt(e)
        };
        let t = b.ident("t");
        let tru = b.bool(true);
        let x2 = b.ident("x");
        let five = b.int(5);
        let set5 = b.assign(x2, five);
        let or = b.logical(LogicalOp::Or, tru, set5);
        let s2 = {
            let e = b.assign(t, or);
            b.expr_stmt(e)
        };
        let f = b.ident("f");
        let fls = b.bool(false);
        let x3 = b.ident("x");
        let seven = b.int(7);
        let set7 = b.assign(x3, seven);
        let and = b.logical(LogicalOp::And, fls, set7);
        let s3 = {
            let e = b.assign(f, and);
            b.expr_stmt(e)
        };
        let x_ret = b.ident("x");
        vec![s1, s2, s3, b.ret(Some(x_ret))]
    });
    assert_eq!(result, Value::Int(0));
}

#[test]
fn test_division_by_zero_fails_the_job() {
    let mut job = build_job(|b| {
        let one = b.int(1);
        let zero = b.int(0);
        let div = b.binary(BinaryOp::Div, one, zero);
        vec![b.ret(Some(div))]
    });
    let err = job.finish().expect_err("division by zero is fatal");
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
    // The report names the module the job was running.
    assert_eq!(err.source.as_deref(), Some("test.rd"));
    assert_eq!(job.state(), JobState::Failed);
}

#[test]
fn test_function_call_by_value() {
    // func twice(v) { v = v + v; return v; } m = 5; return twice(m) + m;  -> 15
    let result = run(|b| {
        let v = b.ident("v");
        let v2 = b.ident("v");
        let v3 = b.ident("v");
        let dbl = b.binary(BinaryOp::Add, v2, v3);
        let set = {
            let e = b.assign(v, dbl);
            b.expr_stmt(e)
        };
        let v4 = b.ident("v");
        let ret = b.ret(Some(v4));
        let body = b.block(&[set, ret]);
        let def = b.func("twice", &[("v", false)], body);

        let m = b.ident("m");
        let five = b.int(5);
        let s1 = {
            let e = b.assign(m, five);
            b.expr_stmt(e)
        };
        let callee = b.ident("twice");
        let m2 = b.ident("m");
        let call = b.call(callee, &[m2]);
        let m3 = b.ident("m");
        let sum = b.binary(BinaryOp::Add, call, m3);
        vec![def, s1, b.ret(Some(sum))]
    });
    assert_eq!(result, Value::Int(15));
}

#[test]
fn test_by_ref_parameter_aliases_caller() {
    // func bump(x&) { x = x + 1; } n = 1; bump(n); return n;  -> 2
    let result = run(|b| {
        let x = b.ident("x");
        let x2 = b.ident("x");
        let one = b.int(1);
        let add = b.binary(BinaryOp::Add, x2, one);
        let set = {
            let e = b.assign(x, add);
            b.expr_stmt(e)
        };
        let body = b.block(&[set]);
        let def = b.func("bump", &[("x", true)], body);

        let n = b.ident("n");
        let one2 = b.int(1);
        let s1 = {
            let e = b.assign(n, one2);
            b.expr_stmt(e)
        };
        let callee = b.ident("bump");
        let n2 = b.ident("n");
        let call = b.call(callee, &[n2]);
        let s2 = b.expr_stmt(call);
        let n_ret = b.ident("n");
        vec![def, s1, s2, b.ret(Some(n_ret))]
    });
    assert_eq!(result, Value::Int(2));
}

#[test]
fn test_recursion_runs_at_depth_without_native_stack() {
    // func down(n) { if (n > 0) { return down(n - 1); } return 0; }
    // return down(500);
    let result = run(|b| {
        let n = b.ident("n");
        let zero = b.int(0);
        let cond = b.binary(BinaryOp::Gt, n, zero);
        let callee = b.ident("down");
        let n2 = b.ident("n");
        let one = b.int(1);
        let sub = b.binary(BinaryOp::Sub, n2, one);
        let call = b.call(callee, &[sub]);
        let recurse = b.ret(Some(call));
        let zero2 = b.int(0);
        let base = b.ret(Some(zero2));
        let guard = b.if_stmt(cond, recurse, None);
        let body = b.block(&[guard, base]);
        let def = b.func("down", &[("n", false)], body);

        let callee2 = b.ident("down");
        let depth = b.int(500);
        let call2 = b.call(callee2, &[depth]);
        vec![def, b.ret(Some(call2))]
    });
    assert_eq!(result, Value::Int(0));
}

#[test]
fn test_wrong_arg_count_is_fatal() {
    let mut job = build_job(|b| {
        let a = b.ident("a");
        let ret = b.ret(Some(a));
        let body = b.block(&[ret]);
        let def = b.func("f", &[("a", false)], body);
        let callee = b.ident("f");
        let call = b.call(callee, &[]);
        vec![def, b.expr_stmt(call)]
    });
    let err = job.finish().expect_err("arity mismatch is fatal");
    assert!(matches!(
        err.kind,
        ErrorKind::WrongArgCount { expected: 1, got: 0, .. }
    ));
}

#[test]
fn test_calling_a_non_function_is_fatal() {
    let mut job = build_job(|b| {
        let x = b.ident("x");
        let one = b.int(1);
        let s1 = {
            let e = b.assign(x, one);
            b.expr_stmt(e)
        };
        let x2 = b.ident("x");
        let call = b.call(x2, &[]);
        vec![s1, b.expr_stmt(call)]
    });
    let err = job.finish().expect_err("calling an int is fatal");
    assert!(matches!(err.kind, ErrorKind::NotCallable { .. }));
}

#[test]
fn test_set_instances_duplicate_defaults() {
    // set Point { x = 1; y = 2; }
    // p = new Point; q = new Point; p.x = 9; return q.x + p.y;  -> 3
    let result = run(|b| {
        let x = b.ident("x");
        let one = b.int(1);
        let sx = {
            let e = b.assign(x, one);
            b.expr_stmt(e)
        };
        let y = b.ident("y");
        let two = b.int(2);
        let sy = {
            let e = b.assign(y, two);
            b.expr_stmt(e)
        };
        let def = b.set_def("Point", &[sx, sy]);

        let p = b.ident("p");
        let newp = b.new_object("Point");
        let s1 = {
            let e = b.assign(p, newp);
            b.expr_stmt(e)
        };
        let q = b.ident("q");
        let newq = b.new_object("Point");
        let s2 = {
            let e = b.assign(q, newq);
            b.expr_stmt(e)
        };
        let p2 = b.ident("p");
        let px = b.member(p2, "x");
        let nine = b.int(9);
        let s3 = {
            let e = b.assign(px, nine);
            b.expr_stmt(e)
        };
        let q2 = b.ident("q");
        let qx = b.member(q2, "x");
        let p3 = b.ident("p");
        let py = b.member(p3, "y");
        let sum = b.binary(BinaryOp::Add, qx, py);
        vec![def, s1, s2, s3, b.ret(Some(sum))]
    });
    assert_eq!(result, Value::Int(3));
}

#[test]
fn test_new_unknown_set_is_fatal() {
    let mut job = build_job(|b| {
        let e = b.new_object("Ghost");
        vec![b.expr_stmt(e)]
    });
    let err = job.finish().expect_err("unknown set is fatal");
    assert!(matches!(err.kind, ErrorKind::UndefinedSet { .. }));
}

#[test]
fn test_native_function_and_globals() {
    // total = add(19, 23); return total;
    let mut job = build_job(|b| {
        let total = b.ident("total");
        let callee = b.ident("add");
        let x = b.int(19);
        let y = b.int(23);
        let call = b.call(callee, &[x, y]);
        let s1 = {
            let e = b.assign(total, call);
            b.expr_stmt(e)
        };
        let t = b.ident("total");
        vec![s1, b.ret(Some(t))]
    });
    job.register_native("add", 2, |_job, args| {
        let sum = match (args[0].get(), args[1].get()) {
            (Value::Int(a), Value::Int(b)) => a + b,
            _ => 0,
        };
        Ok(NativeOutcome::Return(Value::Int(sum)))
    });
    assert_eq!(job.finish().unwrap(), Value::Int(42));
    assert_eq!(job.global("total"), Some(Value::Int(42)));
}

#[test]
fn test_native_suspension_round_trip() {
    // x = 1; y = wait(); return x + y;
    let mut job = build_job(|b| {
        let x = b.ident("x");
        let one = b.int(1);
        let s1 = {
            let e = b.assign(x, one);
            b.expr_stmt(e)
        };
        let y = b.ident("y");
        let callee = b.ident("wait");
        let call = b.call(callee, &[]);
        let s2 = {
            let e = b.assign(y, call);
            b.expr_stmt(e)
        };
        let x2 = b.ident("x");
        let y2 = b.ident("y");
        let sum = b.binary(BinaryOp::Add, x2, y2);
        vec![s1, s2, b.ret(Some(sum))]
    });
    job.register_native("wait", 0, |_job, _args| Ok(NativeOutcome::Suspend));

    // Step until the native parks the job.
    loop {
        match job.step() {
            StepOutcome::Running => {}
            StepOutcome::Suspended => break,
            other => panic!("unexpected outcome before suspension: {other:?}"),
        }
    }
    assert_eq!(job.state(), JobState::Suspended);
    // Variables assigned before the suspension survive it.
    assert_eq!(job.global("x"), Some(Value::Int(1)));

    job.resume(Value::Int(41));
    loop {
        match job.step() {
            StepOutcome::Running => {}
            StepOutcome::Done => break,
            other => panic!("unexpected outcome after resume: {other:?}"),
        }
    }
    assert_eq!(job.take_result(), Value::Int(42));
}

#[test]
fn test_suspension_mid_expression_keeps_left_operand() {
    // return 1 + wait();
    // The binary frame already holds its evaluated left operand when
    // the native parks the job; the resume value must land as the
    // right operand, not disturb it.
    let mut job = build_job(|b| {
        let one = b.int(1);
        let callee = b.ident("wait");
        let call = b.call(callee, &[]);
        let sum = b.binary(BinaryOp::Add, one, call);
        vec![b.ret(Some(sum))]
    });
    job.register_native("wait", 0, |_job, _args| Ok(NativeOutcome::Suspend));

    loop {
        match job.step() {
            StepOutcome::Running => {}
            StepOutcome::Suspended => break,
            other => panic!("unexpected outcome before suspension: {other:?}"),
        }
    }
    job.resume(Value::Int(41));
    loop {
        match job.step() {
            StepOutcome::Running => {}
            StepOutcome::Done => break,
            other => panic!("unexpected outcome after resume: {other:?}"),
        }
    }
    assert_eq!(job.take_result(), Value::Int(42));
}

#[test]
fn test_watch_fires_on_assignment() {
    let mut job = build_job(|b| {
        let w = b.ident("w");
        let five = b.int(5);
        let e = b.assign(w, five);
        vec![b.expr_stmt(e)]
    });
    let log: Rc<RefCell<Vec<(Value, Value)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    job.register_native("on_change", 2, move |_job, args| {
        sink.borrow_mut().push((args[0].get(), args[1].get()));
        Ok(NativeOutcome::Return(Value::Nil))
    });
    job.define_global("w", Value::Nil);
    let Some(Value::Func(hook)) = job.global("on_change") else {
        panic!("native should be bound");
    };
    job.global_var("w")
        .expect("w is defined")
        .set_watch(hook, Value::string("tag"));

    job.finish().unwrap();
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], (Value::string("tag"), Value::Int(5)));
}

#[test]
fn test_frozen_variable_rejects_assignment() {
    let mut job = build_job(|b| {
        let c = b.ident("c");
        let one = b.int(1);
        let e = b.assign(c, one);
        vec![b.expr_stmt(e)]
    });
    job.define_global("c", Value::Int(7));
    job.global_var("c").expect("c is defined").freeze();

    let err = job.finish().expect_err("writing a frozen slot is fatal");
    assert_eq!(err.kind, ErrorKind::FrozenValue);
    assert_eq!(job.global("c"), Some(Value::Int(7)));
}

#[test]
fn test_acyclic_object_is_freed_by_refcount_alone() {
    // o.x = 1; inspect(o); o = 1;
    let mut job = build_job(|b| {
        let o = b.ident("o");
        let ox = b.member(o, "x");
        let one = b.int(1);
        let s1 = {
            let e = b.assign(ox, one);
            b.expr_stmt(e)
        };
        let callee = b.ident("inspect");
        let o2 = b.ident("o");
        let call = b.call(callee, &[o2]);
        let s2 = b.expr_stmt(call);
        let o3 = b.ident("o");
        let one2 = b.int(1);
        let s3 = {
            let e = b.assign(o3, one2);
            b.expr_stmt(e)
        };
        vec![s1, s2, s3]
    });
    let inspect: Rc<RefCell<Option<ObjectWeak>>> = Rc::new(RefCell::new(None));
    let slot = inspect.clone();
    job.register_native("inspect", 1, move |_job, args| {
        if let Value::Object(obj) = args[0].get() {
            *slot.borrow_mut() = Some(obj.downgrade());
        }
        Ok(NativeOutcome::Return(Value::Nil))
    });
    job.finish().unwrap();

    let weak = inspect.borrow_mut().take().expect("inspect saw the object");
    // The overwrite dropped the last strong handle; no collector needed.
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_unreachable_cycle_collected_after_function_exit() {
    // func make() { a.next = a; }  make();
    let mut job = build_job(|b| {
        let a = b.ident("a");
        let a_next = b.member(a, "next");
        let a2 = b.ident("a");
        let set = {
            let e = b.assign(a_next, a2);
            b.expr_stmt(e)
        };
        let body = b.block(&[set]);
        let def = b.func("make", &[], body);
        let callee = b.ident("make");
        let call = b.call(callee, &[]);
        vec![def, b.expr_stmt(call)]
    });
    job.finish().unwrap();

    // The self-referential object escaped no further than the callee
    // scope; only the cycle keeps it alive now.
    assert_eq!(job.collect_garbage(), 1);
    assert_eq!(job.collect_garbage(), 0);
}

#[test]
fn test_reachable_cycle_survives_collection() {
    // g.me = g;
    let mut job = build_job(|b| {
        let g = b.ident("g");
        let gme = b.member(g, "me");
        let g2 = b.ident("g");
        let e = b.assign(gme, g2);
        vec![b.expr_stmt(e)]
    });
    job.finish().unwrap();

    assert_eq!(job.collect_garbage(), 0);
    let Some(Value::Object(g)) = job.global("g") else {
        panic!("g should hold an object");
    };
    assert_eq!(g.borrow().len(), 1);
}

#[test]
fn test_block_scope_does_not_leak() {
    // { t = 1; } return t;  -> nil (t lived in the block scope)
    let result = run(|b| {
        let t = b.ident("t");
        let one = b.int(1);
        let s1 = {
            let e = b.assign(t, one);
            b.expr_stmt(e)
        };
        let block = b.block(&[s1]);
        let t_ret = b.ident("t");
        vec![block, b.ret(Some(t_ret))]
    });
    assert_eq!(result, Value::Nil);
}

#[test]
fn test_function_reads_globals_not_caller_locals() {
    // g = 10; func get() { return g; } return get();
    // The function body sees the global through its function boundary.
    let result = run(|b| {
        let g = b.ident("g");
        let ten = b.int(10);
        let s1 = {
            let e = b.assign(g, ten);
            b.expr_stmt(e)
        };
        let g2 = b.ident("g");
        let ret = b.ret(Some(g2));
        let body = b.block(&[ret]);
        let def = b.func("get", &[], body);
        let callee = b.ident("get");
        let call = b.call(callee, &[]);
        vec![s1, def, b.ret(Some(call))]
    });
    assert_eq!(result, Value::Int(10));
}
