//! Scheduler behavior: interleaving, suspension, mailboxes, job death.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use reed_eval::{NativeOutcome, Value};
use reed_ir::{BinaryOp, Module, ModuleBuilder, SharedInterner, StmtId};
use reed_rt::{BufferPrint, ResourceScope, Scheduler};

fn build(build: impl FnOnce(&mut ModuleBuilder) -> Vec<StmtId>) -> (Rc<Module>, SharedInterner) {
    let interner = SharedInterner::new();
    let mut b = ModuleBuilder::new(interner.clone(), "test.rd");
    let top = build(&mut b);
    (Rc::new(b.finish(&top)), interner)
}

/// for (i = 0; i < n; i = i + 1) mark();
fn counting_module(n: i64) -> (Rc<Module>, SharedInterner) {
    build(|b| {
        let i = b.ident("i");
        let zero = b.int(0);
        let init = b.assign(i, zero);
        let i2 = b.ident("i");
        let limit = b.int(n);
        let cond = b.binary(BinaryOp::Lt, i2, limit);
        let i3 = b.ident("i");
        let i4 = b.ident("i");
        let one = b.int(1);
        let bump = b.binary(BinaryOp::Add, i4, one);
        let update = b.assign(i3, bump);
        let callee = b.ident("mark");
        let call = b.call(callee, &[]);
        let body = b.expr_stmt(call);
        vec![b.for_stmt(Some(init), Some(cond), Some(update), body)]
    })
}

/// mailbox(name); return recv(name);
fn receiver_module(name: &str) -> (Rc<Module>, SharedInterner) {
    let name = name.to_owned();
    build(move |b| {
        let create = b.ident("mailbox");
        let chan = b.str(&name);
        let create_call = b.call(create, &[chan]);
        let callee = b.ident("recv");
        let chan = b.str(&name);
        let call = b.call(callee, &[chan]);
        vec![b.expr_stmt(create_call), b.ret(Some(call))]
    })
}

#[test]
fn test_two_jobs_interleave_under_budget() {
    let mut sched = Scheduler::builder().step_budget(20).build();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    for tag in ["a", "b"] {
        let (module, interner) = counting_module(50);
        let id = sched.spawn(module, interner);
        let sink = log.clone();
        sched
            .job_mut(id)
            .unwrap()
            .register_native("mark", 0, move |_job, _args| {
                sink.borrow_mut().push(tag);
                Ok(NativeOutcome::Return(Value::Nil))
            });
    }

    sched.run_until_idle();
    assert_eq!(sched.live_jobs(), 0);

    let log = log.borrow();
    assert_eq!(log.iter().filter(|&&t| t == "a").count(), 50);
    assert_eq!(log.iter().filter(|&&t| t == "b").count(), 50);
    // Round-robin rounds interleave the two jobs; neither runs to
    // completion while the other starves.
    let first_b = log.iter().position(|&t| t == "b").unwrap();
    let last_a = log.iter().rposition(|&t| t == "a").unwrap();
    assert!(first_b < last_a);
}

#[test]
fn test_mailbox_handoff_between_jobs() {
    let mut sched = Scheduler::new();

    // Receiver first, so it creates the mailbox and parks before the
    // sender runs.
    let (recv_mod, recv_int) = receiver_module("chan");
    let receiver = sched.spawn(recv_mod, recv_int);

    let (send_mod, send_int) = build(|b| {
        let callee = b.ident("send");
        let chan = b.str("chan");
        let seven = b.int(7);
        let call = b.call(callee, &[chan, seven]);
        vec![b.ret(Some(call))]
    });
    let sender = sched.spawn(send_mod, send_int);

    sched.run_until_idle();
    assert_eq!(sched.take_result(receiver).unwrap().unwrap(), Value::Int(7));
    // The send reached a live waiter.
    assert_eq!(sched.take_result(sender).unwrap().unwrap(), Value::Bool(true));
}

#[test]
fn test_script_send_fills_the_host_slot() {
    let mut sched = Scheduler::new();

    // With nobody waiting, the first send lands in the host-facing
    // slot and the second finds it full.
    let (module, interner) = build(|b| {
        let create = b.ident("mailbox");
        let chan = b.str("out");
        let create_call = b.call(create, &[chan]);
        let callee = b.ident("send");
        let chan = b.str("out");
        let msg = b.str("hello");
        let first = b.call(callee, &[chan, msg]);
        let callee = b.ident("send");
        let chan = b.str("out");
        let msg = b.str("again");
        let second = b.call(callee, &[chan, msg]);
        vec![
            b.expr_stmt(create_call),
            b.expr_stmt(first),
            b.ret(Some(second)),
        ]
    });
    let id = sched.spawn(module, interner);
    sched.run_until_idle();

    assert_eq!(
        sched.take_result(id).unwrap().unwrap(),
        Value::Bool(false)
    );
    assert_eq!(sched.poll("out").unwrap(), Some(Value::string("hello")));
    assert_eq!(sched.poll("out").unwrap(), None);
}

#[test]
fn test_recv_on_unknown_mailbox_returns_nil() {
    let mut sched = Scheduler::new();
    let (module, interner) = build(|b| {
        let callee = b.ident("recv");
        let chan = b.str("never-created");
        let call = b.call(callee, &[chan]);
        vec![b.ret(Some(call))]
    });
    let id = sched.spawn(module, interner);
    sched.run_until_idle();
    assert_eq!(sched.take_result(id).unwrap().unwrap(), Value::Nil);
}

#[test]
fn test_host_post_wakes_receiver() {
    let mut sched = Scheduler::new();
    let (module, interner) = receiver_module("in");
    let id = sched.spawn(module, interner);

    sched.run_until_idle();
    // Parked on the empty mailbox, not finished.
    assert_eq!(sched.live_jobs(), 1);
    assert!(sched.take_result(id).is_none());

    sched.post("in", Value::Int(5)).unwrap();
    sched.run_until_idle();
    assert_eq!(sched.take_result(id).unwrap().unwrap(), Value::Int(5));
}

#[test]
fn test_failing_job_does_not_disturb_siblings() {
    let mut sched = Scheduler::new();

    let (bad_mod, bad_int) = build(|b| {
        let one = b.int(1);
        let zero = b.int(0);
        let div = b.binary(BinaryOp::Div, one, zero);
        vec![b.expr_stmt(div)]
    });
    let bad = sched.spawn(bad_mod, bad_int);

    let (good_mod, good_int) = build(|b| {
        let one = b.int(1);
        vec![b.ret(Some(one))]
    });
    let good = sched.spawn(good_mod, good_int);

    sched.run_until_idle();
    assert!(sched.take_result(bad).unwrap().is_err());
    assert_eq!(sched.take_result(good).unwrap().unwrap(), Value::Int(1));
}

#[test]
fn test_completion_callback_gets_the_result() {
    let mut sched = Scheduler::new();
    let (module, interner) = build(|b| {
        let v = b.int(11);
        vec![b.ret(Some(v))]
    });
    let id = sched.spawn(module, interner);

    let seen: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
    let sink = seen.clone();
    sched
        .on_complete(
            id,
            Box::new(move |_id, result| {
                *sink.borrow_mut() = Some(result.expect("job should succeed"));
            }),
        )
        .unwrap();

    sched.run_until_idle();
    assert_eq!(seen.borrow().clone(), Some(Value::Int(11)));
    // The callback consumed the result; nothing is stored.
    assert!(sched.take_result(id).is_none());
}

#[test]
fn test_kill_releases_resources() {
    let mut sched = Scheduler::new();
    // while (true) {}
    let (module, interner) = build(|b| {
        let forever = b.bool(true);
        let body = b.block(&[]);
        vec![b.while_stmt(forever, body)]
    });
    let id = sched.spawn(module, interner);

    // Run a little so the loop is mid-flight, then open a resource on
    // the job's behalf and kill it.
    for _ in 0..10 {
        assert!(sched.tick());
    }
    let resources = sched.resources();
    let closed = Rc::new(RefCell::new(false));
    let flag = closed.clone();
    resources.register(
        ResourceScope::Job(id),
        "sock",
        99u8,
        Some(Box::new(move |_| *flag.borrow_mut() = true)),
    );
    assert_eq!(resources.len(), 1);

    sched.kill(id).unwrap();
    assert_eq!(sched.live_jobs(), 0);
    assert!(resources.is_empty());
    assert!(*closed.borrow());
    assert!(sched.take_result(id).unwrap().is_err());
}

#[test]
fn test_waker_pulses_on_new_work() {
    let pulses = Rc::new(RefCell::new(0u32));
    let counter = pulses.clone();
    let mut sched = Scheduler::builder()
        .waker(Rc::new(move || *counter.borrow_mut() += 1))
        .build();

    let (module, interner) = receiver_module("in");
    sched.spawn(module, interner);
    assert_eq!(*pulses.borrow(), 1);

    sched.run_until_idle();
    let parked = *pulses.borrow();
    sched.post("in", Value::Int(1)).unwrap();
    // The wakeup made the parked job runnable again.
    assert_eq!(*pulses.borrow(), parked + 1);
}

#[test]
fn test_print_goes_to_the_installed_handler() {
    let buffer = BufferPrint::new();
    let mut sched = Scheduler::builder()
        .print_handler(Rc::new(buffer.clone()))
        .build();

    let (module, interner) = build(|b| {
        let callee = b.ident("print");
        let one = b.int(1);
        let two = b.int(2);
        let sum = b.binary(BinaryOp::Add, one, two);
        let call = b.call(callee, &[sum]);
        vec![b.expr_stmt(call)]
    });
    sched.spawn(module, interner);
    sched.run_until_idle();

    assert_eq!(buffer.contents(), "3\n");
}
