//! Named mailboxes between Jobs and the host.
//!
//! A mailbox must be created before use and carries one bounded slot
//! per direction: one value toward script receivers, one toward the
//! host. A script `recv` on an empty mailbox parks the Job; the next
//! send hands the value straight to the parked receiver. Unknown names
//! and full slots are recoverable, never fatal. Wakeups are not
//! performed here — natives only have the Job in hand — so the table
//! records them and the scheduler drains the list after every step.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use reed_eval::{JobId, Value};

/// Why a mailbox operation did not deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// No mailbox with that name was created.
    Unknown,
    /// The slot for that direction already holds a value.
    Full,
    /// `create` on a name that is already taken.
    Exists,
}

/// Outcome of a script-side receive.
pub enum RecvOutcome {
    Ready(Value),
    /// Nothing pending; the Job was parked as the waiter.
    Parked,
    Unknown,
}

#[derive(Default)]
struct Mailbox {
    /// The creating Job, if script-created; the mailbox dies with it.
    owner: Option<JobId>,
    to_script: Option<Value>,
    to_host: Option<Value>,
    waiting: Option<JobId>,
}

#[derive(Default)]
struct Inner {
    boxes: FxHashMap<String, Mailbox>,
    /// Parked receivers handed a value, pending resume.
    wakeups: Vec<(JobId, Value)>,
}

/// The mailbox table, shared between a scheduler, its Jobs' natives,
/// and the host. Clones refer to the same boxes.
#[derive(Clone, Default)]
pub struct MailboxTable {
    inner: Rc<RefCell<Inner>>,
}

impl MailboxTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named mailbox. `owner` ties its lifetime to a Job;
    /// `None` makes it host-owned.
    pub fn create(&self, name: &str, owner: Option<JobId>) -> Result<(), MailboxError> {
        let mut inner = self.inner.borrow_mut();
        if inner.boxes.contains_key(name) {
            return Err(MailboxError::Exists);
        }
        inner.boxes.insert(
            name.to_owned(),
            Mailbox {
                owner,
                ..Mailbox::default()
            },
        );
        trace!(mailbox = name, "created");
        Ok(())
    }

    /// Deliver one value. A parked receiver takes it directly;
    /// otherwise it occupies the slot the sender's side feeds
    /// (host senders feed script receivers and vice versa).
    pub fn send(&self, name: &str, value: Value, from_host: bool) -> Result<(), MailboxError> {
        let mut inner = self.inner.borrow_mut();
        let Inner { boxes, wakeups } = &mut *inner;
        let mbox = boxes.get_mut(name).ok_or(MailboxError::Unknown)?;
        if let Some(job) = mbox.waiting.take() {
            trace!(mailbox = name, job = %job, "handoff to waiter");
            wakeups.push((job, value));
            return Ok(());
        }
        let slot = if from_host {
            &mut mbox.to_script
        } else {
            &mut mbox.to_host
        };
        if slot.is_some() {
            return Err(MailboxError::Full);
        }
        *slot = Some(value);
        Ok(())
    }

    /// Script-side receive: take the pending value or park `receiver`
    /// until a sender shows up.
    pub fn recv(&self, name: &str, receiver: JobId) -> RecvOutcome {
        let mut inner = self.inner.borrow_mut();
        let Some(mbox) = inner.boxes.get_mut(name) else {
            return RecvOutcome::Unknown;
        };
        match mbox.to_script.take() {
            Some(value) => RecvOutcome::Ready(value),
            None => {
                mbox.waiting = Some(receiver);
                trace!(mailbox = name, job = %receiver, "parked");
                RecvOutcome::Parked
            }
        }
    }

    /// Host-side receive: drain the host-facing slot.
    pub fn host_recv(&self, name: &str) -> Result<Option<Value>, MailboxError> {
        let mut inner = self.inner.borrow_mut();
        let mbox = inner.boxes.get_mut(name).ok_or(MailboxError::Unknown)?;
        Ok(mbox.to_host.take())
    }

    /// Wakeups recorded since the last call.
    pub fn take_wakeups(&self) -> Vec<(JobId, Value)> {
        std::mem::take(&mut self.inner.borrow_mut().wakeups)
    }

    /// Drop what a dead Job left behind: mailboxes it created and any
    /// parked receive.
    pub fn free_owned(&self, job: JobId) {
        let mut inner = self.inner.borrow_mut();
        inner.boxes.retain(|_, mbox| mbox.owner != Some(job));
        for mbox in inner.boxes.values_mut() {
            if mbox.waiting == Some(job) {
                mbox.waiting = None;
            }
        }
        inner.wakeups.retain(|&(waiter, _)| waiter != job);
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().boxes.is_empty()
    }
}
