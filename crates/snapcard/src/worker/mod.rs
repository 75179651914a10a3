//! Background execution: fire-and-forget dispatch and the sweep scheduler.

pub mod dispatcher;
pub mod scheduler;

pub use dispatcher::Dispatcher;
pub use scheduler::SweepScheduler;
