//! Reactive value-flow primitive: a signal holds a current value and an
//! ordered chain of transformation steps, re-run on every pushed value, with
//! explicit suspension ([`Halt`]), forced values, and failure ([`Fail`]) but
//! no scheduler or coroutine runtime.

pub mod deferred;
pub mod extend;
pub mod flow;
pub mod signal;
pub mod state;

pub use deferred::{Deferred, SettleError};
pub use extend::{Capability, Descriptor, Extension, ExtensionSource, InvokeError};
pub use flow::{Fail, Flow, Halt, Thunk};
pub use signal::{Resume, Signal};
pub use state::{Scratch, State};
