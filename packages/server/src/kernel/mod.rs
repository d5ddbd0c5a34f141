//! Kernel module - scheduling and outbound sync triggers.

pub mod scheduled_tasks;
pub mod sync_trigger;

pub use scheduled_tasks::{
    http_triggers, scheduled_syncs, start_scheduler, ScheduledSync, SyncTriggers,
};
pub use sync_trigger::{HttpSyncTrigger, SyncTrigger, TriggerResponse};
