//! A Job: one independent script execution.
//!
//! A Job owns everything one running script needs — its module, scope
//! chain, continuation stack and set templates — and exposes a single
//! `step` operation that advances evaluation by one frame transition.
//! Because the engine keeps all state in the Job rather than on the Rust
//! call stack, a Job can be parked between any two steps and resumed
//! later, which is what the cooperative scheduler builds on.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use reed_ir::{Module, Name, SharedInterner};

use crate::engine::frame::{Frame, RetExp};
use crate::engine::{self, StepOutcome};
use crate::errors::{self, RuntimeError};
use crate::object::SetRef;
use crate::scope::ScopeChain;
use crate::value::{FuncValue, NativeOutcome, Value, Var};

/// Job identity, assigned by the host or scheduler.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub struct JobId(u64);

impl JobId {
    pub const fn new(raw: u64) -> Self {
        JobId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Lifecycle state, as observed by the host.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum JobState {
    /// Has work and can be stepped.
    Runnable,
    /// A native suspended; waiting for `resume`.
    Suspended,
    /// Ran to completion.
    Done,
    /// Hit a fatal runtime error; see [`Job::error`].
    Failed,
}

/// One script execution.
pub struct Job {
    id: JobId,
    module: Rc<Module>,
    interner: SharedInterner,
    pub(crate) frames: Vec<Frame>,
    pub(crate) scopes: ScopeChain,
    /// The value (or place) the most recent expression produced.
    pub(crate) ret: Option<RetExp>,
    /// Value handed in by the host for a suspended native to return.
    pub(crate) resume: Option<Value>,
    /// Set templates defined so far, visible to `new`.
    pub(crate) sets: FxHashMap<Name, SetRef>,
    state: JobState,
    error: Option<RuntimeError>,
    steps: u64,
}

impl Job {
    /// Create a Job ready to run `module` from its first statement.
    pub fn new(id: JobId, module: Rc<Module>, interner: SharedInterner) -> Self {
        let frames = vec![Frame::Block {
            range: module.body,
            idx: 0,
            scoped: false,
            entered: true,
        }];
        Job {
            id,
            module,
            interner,
            frames,
            scopes: ScopeChain::new(),
            ret: None,
            resume: None,
            sets: FxHashMap::default(),
            state: JobState::Runnable,
            error: None,
            steps: 0,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Total frame transitions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) fn module_rc(&self) -> Rc<Module> {
        self.module.clone()
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub(crate) fn name_str(&self, name: Name) -> String {
        self.interner.lookup(name)
    }

    /// Bind a host value under `name` in the global scope.
    pub fn define_global(&mut self, name: &str, value: Value) {
        let name = self.interner.intern(name);
        self.scopes.root_mut().join(name, Var::new(value));
    }

    /// Register a native function in the global scope.
    pub fn register_native<F>(&mut self, name: &str, arity: usize, f: F)
    where
        F: Fn(&mut Job, &[Var]) -> Result<NativeOutcome, RuntimeError> + 'static,
    {
        let name = self.interner.intern(name);
        let func = Rc::new(FuncValue::Native {
            name,
            arity,
            f: Rc::new(f),
        });
        self.scopes.root_mut().join(name, Var::new(Value::Func(func)));
    }

    /// Read a global binding (host inspection).
    pub fn global(&self, name: &str) -> Option<Value> {
        let name = self.interner.intern(name);
        self.scopes.search(name, false).map(|var| var.get())
    }

    /// Read a global binding's slot, for aliasing or watch installation.
    pub fn global_var(&self, name: &str) -> Option<Var> {
        let name = self.interner.intern(name);
        self.scopes.search(name, false)
    }

    /// Advance evaluation by one frame transition.
    pub fn step(&mut self) -> StepOutcome {
        match self.state {
            JobState::Done => return StepOutcome::Done,
            JobState::Failed => return StepOutcome::Failed,
            JobState::Runnable | JobState::Suspended => {}
        }
        self.steps += 1;
        match engine::step(self) {
            Ok(outcome) => {
                self.state = match outcome {
                    StepOutcome::Running => JobState::Runnable,
                    StepOutcome::Suspended => JobState::Suspended,
                    StepOutcome::Done => JobState::Done,
                    StepOutcome::Failed => JobState::Failed,
                };
                outcome
            }
            Err(err) => {
                let err = err.with_source(self.name_str(self.module.source_name));
                debug!(job = %self.id, error = %err, "fatal runtime error");
                self.error = Some(err);
                self.state = JobState::Failed;
                StepOutcome::Failed
            }
        }
    }

    /// Hand a suspended native its return value and make the Job
    /// runnable again.
    pub fn resume(&mut self, value: Value) {
        if self.state != JobState::Suspended {
            debug!(job = %self.id, state = ?self.state, "resume on a non-suspended job");
        }
        self.resume = Some(value);
        if self.state == JobState::Suspended {
            self.state = JobState::Runnable;
        }
    }

    /// Run until the Job finishes, without a scheduler. Suspension is an
    /// error here; hosts that use suspending natives drive stepping
    /// themselves.
    pub fn finish(&mut self) -> Result<Value, RuntimeError> {
        loop {
            match self.step() {
                StepOutcome::Running => {}
                StepOutcome::Done => return Ok(self.take_result()),
                StepOutcome::Suspended => {
                    return Err(errors::custom("job suspended with no scheduler attached"));
                }
                StepOutcome::Failed => {
                    return Err(self
                        .error
                        .take()
                        .unwrap_or_else(|| errors::custom("job failed")));
                }
            }
        }
    }

    /// The program's final value: a top-level `return`'s operand, Nil
    /// otherwise.
    pub fn take_result(&mut self) -> Value {
        self.ret.take().map_or(Value::Nil, |r| r.value())
    }

    /// The fatal error, if the Job failed.
    pub fn error(&self) -> Option<&RuntimeError> {
        self.error.as_ref()
    }

    /// Take ownership of the fatal error (scheduler teardown).
    pub fn take_error(&mut self) -> Option<RuntimeError> {
        self.error.take()
    }

    /// Run the cycle collector over every scope's arena. Returns the
    /// number of containers severed.
    pub fn collect_garbage(&mut self) -> usize {
        let roots = self.gc_roots();
        let mut severed = 0;
        for scope in self.scopes.scopes_mut() {
            if let Some(arena) = scope.arena.as_mut() {
                severed += arena.collect(&roots);
            }
        }
        if severed > 0 {
            debug!(job = %self.id, severed, "cycle collection");
        }
        severed
    }

    /// Everything the collector must treat as live.
    fn gc_roots(&self) -> Vec<Value> {
        let mut roots: Vec<Value> = Vec::new();
        for var in self.scopes.all_vars() {
            roots.push(var.get());
        }
        for frame in &self.frames {
            frame.trace(&mut roots);
        }
        if let Some(ret) = &self.ret {
            roots.push(ret.value());
        }
        if let Some(resume) = &self.resume {
            roots.push(resume.clone());
        }
        for set in self.sets.values() {
            for value in set.members.values() {
                roots.push(value.clone());
            }
        }
        roots
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("frames", &self.frames.len())
            .field("scopes", &self.scopes.depth())
            .field("steps", &self.steps)
            .finish()
    }
}
