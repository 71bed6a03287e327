//! The evaluation engine: values, scopes, operators, the cycle
//! collector, and the continuation-stack step machine.
//!
//! The central type is [`Job`], one independent script execution.
//! Nothing here touches threads or global state; a Job is a plain value
//! the host (or the `reed_rt` scheduler) steps at its own pace.

pub mod array;
pub mod compare;
pub mod engine;
pub mod errors;
pub mod gc;
pub mod job;
pub mod object;
pub mod operators;
pub mod scope;
pub mod value;

pub use array::{Array, ArrayRef, ArrayWeak, Element};
pub use compare::{compare, values_equal, KeyValue};
pub use engine::frame::RetExp;
pub use engine::StepOutcome;
pub use errors::{ErrorKind, EvalResult, RuntimeError};
pub use gc::GcArena;
pub use job::{Job, JobId, JobState};
pub use object::{Object, ObjectRef, ObjectWeak, SetDef, SetRef};
pub use operators::{evaluate_binary, evaluate_inc_dec, evaluate_unary};
pub use scope::{Scope, ScopeChain, ScopeKind};
pub use value::{duplicate, FuncRef, FuncValue, NativeFn, NativeOutcome, Value, Var, Watch};
