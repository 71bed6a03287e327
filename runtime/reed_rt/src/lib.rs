//! Host runtime for Reed scripts: a cooperative round-robin scheduler
//! over `reed_eval` Jobs, plus the host services scripts expect —
//! mailboxes, a resource registry, and `print`.

pub mod mailbox;
pub mod print;
pub mod resource;
pub mod scheduler;

pub use mailbox::{MailboxError, MailboxTable, RecvOutcome};
pub use print::{BufferPrint, PrintHandler, StdoutPrint};
pub use resource::{FreeFn, ResourceScope, ResourceTable};
pub use scheduler::{
    CompletionFn, RtError, Scheduler, SchedulerBuilder, DEFAULT_GC_INTERVAL, DEFAULT_STEP_BUDGET,
};
