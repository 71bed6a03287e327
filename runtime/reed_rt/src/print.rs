//! Script output.
//!
//! `print` is a native like any other; what it writes to is the host's
//! choice. The scheduler installs one handler per spawn — stdout by
//! default, a buffer in tests and embedded hosts.

use std::cell::RefCell;
use std::rc::Rc;

use reed_eval::{Job, NativeOutcome, Value};

/// Destination for script `print` output.
pub trait PrintHandler {
    /// One `print` call's rendered text, no trailing newline.
    fn print(&self, text: &str);
}

/// Writes each print as one stdout line.
#[derive(Default)]
pub struct StdoutPrint;

impl PrintHandler for StdoutPrint {
    fn print(&self, text: &str) {
        println!("{text}");
    }
}

/// Collects prints into a shared buffer, newline separated.
#[derive(Clone, Default)]
pub struct BufferPrint {
    buf: Rc<RefCell<String>>,
}

impl BufferPrint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything printed so far.
    pub fn contents(&self) -> String {
        self.buf.borrow().clone()
    }
}

impl PrintHandler for BufferPrint {
    fn print(&self, text: &str) {
        let mut buf = self.buf.borrow_mut();
        buf.push_str(text);
        buf.push('\n');
    }
}

/// Register the `print(value)` native on a Job.
pub fn install_print(job: &mut Job, handler: Rc<dyn PrintHandler>) {
    job.register_native("print", 1, move |_job, args| {
        handler.print(&args[0].get().display_value());
        Ok(NativeOutcome::Return(Value::Nil))
    });
}
