//! # Vigil Scheduler
//!
//! The scheduling authority: a durable destination registry, a min-heap
//! fire queue, per-period dedup, and one interruptible engine loop that
//! drives the dedup → fetch → parse → dispatch pipeline.
//!
//! ## Architecture
//! ```text
//! SchedulerHandle (add / remove / enable / snapshot)
//!   → engine loop (tokio::select!)
//!       ├── FireQueue: min-heap of (next_fire_at, destination_id)
//!       ├── grace window: late wake fires, later wake skips + reschedules
//!       ├── pipeline per due destination (semaphore-bounded):
//!       │     dedup check → fetch → parse → dispatch → mark_notified
//!       └── ScheduleStore: atomic JSON file, one record per destination
//! ```

pub mod dedup;
pub mod destination;
pub mod engine;
pub mod queue;
pub mod store;

pub use destination::{Destination, Schedule};
pub use engine::{EngineOptions, Scheduler, SchedulerHandle};
pub use queue::{FireQueue, ScheduleEntry};
pub use store::ScheduleStore;
