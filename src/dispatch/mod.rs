//! Command dispatch: the transport seam plus an in-process reference
//! implementation.

pub mod local;
pub mod registry;
pub mod traits;

pub use local::{Completions, LocalDispatcher};
pub use registry::HandlerRegistry;
pub use traits::{CommandDispatcher, CommandHandler};
