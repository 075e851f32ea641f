//! Time-driven key issuance and rotation

mod runner;
mod schedule;

pub use runner::{Scheduler, SchedulerHandle, TaskReport};
pub use schedule::{next_daily_after, DueTracker, ScheduleConfig, ScheduledTask};
