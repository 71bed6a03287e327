//! The cooperative scheduler.
//!
//! `tick` runs exactly one engine step of the front Job and hands
//! control back, so an embedding event loop never waits longer than one
//! grammar-production transition. A Job keeps the front of the run
//! queue until its step budget for the round is spent, then moves to
//! the blocked list; when the run queue drains, every blocked Job is
//! reinstated with a fresh budget (round-robin fairness). A suspended
//! Job leaves the queues entirely and re-enters on `resume` or when a
//! mailbox message arrives for it. Nothing here is global — a host can
//! run several schedulers side by side.

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

use reed_eval::errors::RuntimeError;
use reed_eval::{Job, JobId, JobState, NativeOutcome, StepOutcome, Value, Var};
use reed_ir::{Module, SharedInterner};

use crate::mailbox::{MailboxError, MailboxTable, RecvOutcome};
use crate::print::{install_print, PrintHandler, StdoutPrint};
use crate::resource::ResourceTable;

/// Host-facing scheduler errors.
#[derive(Debug, Error)]
pub enum RtError {
    #[error("unknown {0}")]
    UnknownJob(JobId),
    #[error("{0} is not suspended")]
    NotSuspended(JobId),
    #[error("unknown mailbox {0:?}")]
    UnknownMailbox(String),
    #[error("mailbox {0:?} slot is full")]
    MailboxFull(String),
    #[error("mailbox {0:?} already exists")]
    MailboxExists(String),
    #[error(transparent)]
    Script(#[from] RuntimeError),
}

fn mailbox_err(name: &str, err: MailboxError) -> RtError {
    match err {
        MailboxError::Unknown => RtError::UnknownMailbox(name.to_owned()),
        MailboxError::Full => RtError::MailboxFull(name.to_owned()),
        MailboxError::Exists => RtError::MailboxExists(name.to_owned()),
    }
}

/// Called once when a Job finishes, fails, or is killed.
pub type CompletionFn = Box<dyn FnOnce(JobId, Result<Value, RuntimeError>)>;

/// Engine steps a Job may run per round before yielding to its peers.
pub const DEFAULT_STEP_BUDGET: u32 = 100;

/// Budget windows between cycle-collector passes over a running Job.
pub const DEFAULT_GC_INTERVAL: u64 = 64;

struct JobSlot {
    job: Job,
    /// Steps left in the current round.
    budget_left: u32,
    /// Budget windows consumed so far; drives the collection cadence.
    slices: u64,
    completion: Option<CompletionFn>,
}

/// Configures a [`Scheduler`].
pub struct SchedulerBuilder {
    step_budget: u32,
    gc_interval: u64,
    print: Rc<dyn PrintHandler>,
    wake: Option<Rc<dyn Fn()>>,
}

impl SchedulerBuilder {
    /// Engine steps per round before the next Job gets the core.
    #[must_use]
    pub fn step_budget(mut self, steps: u32) -> Self {
        self.step_budget = steps.max(1);
        self
    }

    /// Run the cycle collector on a Job every this many of its budget
    /// windows.
    #[must_use]
    pub fn gc_interval(mut self, slices: u64) -> Self {
        self.gc_interval = slices.max(1);
        self
    }

    /// Where script `print` output goes for every spawned Job.
    #[must_use]
    pub fn print_handler(mut self, handler: Rc<dyn PrintHandler>) -> Self {
        self.print = handler;
        self
    }

    /// Pulsed whenever runnable work appears, so an embedding event
    /// loop knows to call [`Scheduler::tick`] again.
    #[must_use]
    pub fn waker(mut self, wake: Rc<dyn Fn()>) -> Self {
        self.wake = Some(wake);
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            jobs: FxHashMap::default(),
            run_queue: VecDeque::new(),
            blocked: Vec::new(),
            finished: FxHashMap::default(),
            next_id: 0,
            step_budget: self.step_budget,
            gc_interval: self.gc_interval,
            print: self.print,
            wake: self.wake,
            mailboxes: MailboxTable::new(),
            resources: ResourceTable::new(),
        }
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        SchedulerBuilder {
            step_budget: DEFAULT_STEP_BUDGET,
            gc_interval: DEFAULT_GC_INTERVAL,
            print: Rc::new(StdoutPrint),
            wake: None,
        }
    }
}

/// Round-robin executor for a set of Jobs.
pub struct Scheduler {
    jobs: FxHashMap<JobId, JobSlot>,
    run_queue: VecDeque<JobId>,
    /// Jobs whose budget ran out this round.
    blocked: Vec<JobId>,
    /// Results of Jobs that had no completion callback installed.
    finished: FxHashMap<JobId, Result<Value, RuntimeError>>,
    next_id: u64,
    step_budget: u32,
    gc_interval: u64,
    print: Rc<dyn PrintHandler>,
    wake: Option<Rc<dyn Fn()>>,
    mailboxes: MailboxTable,
    resources: ResourceTable,
}

impl Scheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::default()
    }

    pub fn new() -> Self {
        SchedulerBuilder::default().build()
    }

    /// The shared resource registry, for host natives.
    pub fn resources(&self) -> ResourceTable {
        self.resources.clone()
    }

    /// The shared mailbox table.
    pub fn mailboxes(&self) -> MailboxTable {
        self.mailboxes.clone()
    }

    /// Create a Job for `module`, wire the standard natives, and queue
    /// it. Use [`Scheduler::job_mut`] to add host natives before the
    /// first tick.
    pub fn spawn(&mut self, module: Rc<Module>, interner: SharedInterner) -> JobId {
        let id = JobId::new(self.next_id);
        self.next_id += 1;
        let mut job = Job::new(id, module, interner);
        install_print(&mut job, self.print.clone());
        self.install_mailbox_natives(&mut job);
        self.jobs.insert(
            id,
            JobSlot {
                job,
                budget_left: self.step_budget,
                slices: 0,
                completion: None,
            },
        );
        self.run_queue.push_back(id);
        debug!(job = %id, "spawned");
        self.pulse_wake();
        id
    }

    fn install_mailbox_natives(&self, job: &mut Job) {
        let table = self.mailboxes.clone();
        job.register_native("mailbox", 1, move |job, args| {
            let name = mailbox_name(&args[0], "mailbox")?;
            let created = table.create(&name, Some(job.id())).is_ok();
            Ok(NativeOutcome::Return(Value::Bool(created)))
        });

        let table = self.mailboxes.clone();
        job.register_native("send", 2, move |_job, args| {
            let name = mailbox_name(&args[0], "send")?;
            let sent = table.send(&name, args[1].get(), false).is_ok();
            Ok(NativeOutcome::Return(Value::Bool(sent)))
        });

        let table = self.mailboxes.clone();
        job.register_native("recv", 1, move |job, args| {
            let name = mailbox_name(&args[0], "recv")?;
            match table.recv(&name, job.id()) {
                RecvOutcome::Ready(value) => Ok(NativeOutcome::Return(value)),
                RecvOutcome::Parked => Ok(NativeOutcome::Suspend),
                RecvOutcome::Unknown => Ok(NativeOutcome::Return(Value::Nil)),
            }
        });
    }

    /// Access a Job (for natives, globals, watches) before or between
    /// ticks.
    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id).map(|slot| &mut slot.job)
    }

    /// Install a completion callback for `id`.
    pub fn on_complete(&mut self, id: JobId, f: CompletionFn) -> Result<(), RtError> {
        let slot = self.jobs.get_mut(&id).ok_or(RtError::UnknownJob(id))?;
        slot.completion = Some(f);
        Ok(())
    }

    /// Jobs currently alive (queued, running, or suspended).
    pub fn live_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// True when no Job is eligible to run.
    pub fn is_idle(&self) -> bool {
        self.run_queue.is_empty() && self.blocked.is_empty()
    }

    /// Run one engine step of the front Job. Returns false when no Job
    /// is eligible.
    pub fn tick(&mut self) -> bool {
        if self.run_queue.is_empty() && !self.blocked.is_empty() {
            trace!(reinstated = self.blocked.len(), "new round");
            for id in std::mem::take(&mut self.blocked) {
                if let Some(slot) = self.jobs.get_mut(&id) {
                    slot.budget_left = self.step_budget;
                }
                self.run_queue.push_back(id);
            }
        }
        let Some(&id) = self.run_queue.front() else {
            return false;
        };
        let Some(slot) = self.jobs.get_mut(&id) else {
            self.run_queue.pop_front();
            return true;
        };

        match slot.job.step() {
            StepOutcome::Running => {
                slot.budget_left = slot.budget_left.saturating_sub(1);
                if slot.budget_left == 0 {
                    slot.slices += 1;
                    if slot.slices % self.gc_interval == 0 {
                        slot.job.collect_garbage();
                    }
                    trace!(job = %id, slices = slot.slices, "budget exhausted");
                    self.run_queue.pop_front();
                    self.blocked.push(id);
                }
            }
            StepOutcome::Suspended => {
                debug!(job = %id, "suspended");
                self.run_queue.pop_front();
            }
            StepOutcome::Done => {
                let mut slot = self.remove_slot(id);
                let value = slot.job.take_result();
                self.settle(id, slot.completion.take(), Ok(value));
            }
            StepOutcome::Failed => {
                let mut slot = self.remove_slot(id);
                let err = slot
                    .job
                    .take_error()
                    .unwrap_or_else(|| reed_eval::errors::custom("job failed"));
                self.settle(id, slot.completion.take(), Err(err));
            }
        }

        self.drain_wakeups();
        true
    }

    /// Tick until every Job is finished or suspended. Returns the
    /// number of steps run.
    pub fn run_until_idle(&mut self) -> u64 {
        let mut steps = 0;
        while self.tick() {
            steps += 1;
        }
        steps
    }

    /// Hand a suspended Job its resume value and requeue it.
    pub fn resume(&mut self, id: JobId, value: Value) -> Result<(), RtError> {
        let slot = self.jobs.get_mut(&id).ok_or(RtError::UnknownJob(id))?;
        if slot.job.state() != JobState::Suspended {
            return Err(RtError::NotSuspended(id));
        }
        slot.job.resume(value);
        slot.budget_left = self.step_budget;
        self.run_queue.push_back(id);
        self.pulse_wake();
        Ok(())
    }

    /// Create a host-owned mailbox.
    pub fn create_mailbox(&self, name: &str) -> Result<(), RtError> {
        self.mailboxes
            .create(name, None)
            .map_err(|err| mailbox_err(name, err))
    }

    /// Deliver a host message toward script receivers, waking a waiting
    /// Job.
    pub fn post(&mut self, name: &str, value: Value) -> Result<(), RtError> {
        self.mailboxes
            .send(name, value, true)
            .map_err(|err| mailbox_err(name, err))?;
        self.drain_wakeups();
        Ok(())
    }

    /// Take the value a script sent toward the host, if any.
    pub fn poll(&self, name: &str) -> Result<Option<Value>, RtError> {
        self.mailboxes
            .host_recv(name)
            .map_err(|err| mailbox_err(name, err))
    }

    /// Terminate a Job, release its mailboxes and resources, and report
    /// the kill through its completion callback.
    pub fn kill(&mut self, id: JobId) -> Result<(), RtError> {
        if !self.jobs.contains_key(&id) {
            return Err(RtError::UnknownJob(id));
        }
        debug!(job = %id, "killed");
        let mut slot = self.remove_slot(id);
        self.settle(
            id,
            slot.completion.take(),
            Err(reed_eval::errors::custom("job killed")),
        );
        Ok(())
    }

    /// Take the stored result of a finished Job that had no completion
    /// callback.
    pub fn take_result(&mut self, id: JobId) -> Option<Result<Value, RuntimeError>> {
        self.finished.remove(&id)
    }

    fn remove_slot(&mut self, id: JobId) -> JobSlot {
        self.run_queue.retain(|&queued| queued != id);
        self.blocked.retain(|&queued| queued != id);
        self.mailboxes.free_owned(id);
        self.resources.free_owned(id);
        match self.jobs.remove(&id) {
            Some(slot) => slot,
            None => unreachable!("caller checked the job exists"),
        }
    }

    fn settle(
        &mut self,
        id: JobId,
        completion: Option<CompletionFn>,
        result: Result<Value, RuntimeError>,
    ) {
        match completion {
            Some(f) => f(id, result),
            None => {
                self.finished.insert(id, result);
            }
        }
    }

    fn drain_wakeups(&mut self) {
        for (id, value) in self.mailboxes.take_wakeups() {
            // The waiter may have died since it parked.
            if self.resume(id, value).is_err() {
                debug!(job = %id, "dropping wakeup for a gone job");
            }
        }
    }

    fn pulse_wake(&self) {
        if let Some(wake) = &self.wake {
            wake();
        }
    }
}

fn mailbox_name(arg: &Var, what: &str) -> Result<String, RuntimeError> {
    let name = arg.get();
    match name.as_str() {
        Some(name) => Ok(name.to_owned()),
        None => Err(reed_eval::errors::custom(format!(
            "{what}: mailbox name must be a string"
        ))),
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
