//! Bot runtime: routes gateway events to the trigger listener until a
//! shutdown signal arrives.

mod runtime;
mod signal;

pub use runtime::{BotRuntime, ServeEnd};
pub use signal::{ShutdownListener, ShutdownSignal};
