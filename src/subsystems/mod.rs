pub mod scheduler;
pub mod server;

pub use scheduler::SchedulerSubsystem;
pub use server::{AppState, ServerSubsystem};
