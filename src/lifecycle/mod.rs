mod job;
mod state;

pub use job::{InvalidField, JobFields, JobPatch, JobRecord, NewJob, TimestampField};
pub use state::{InvalidStatus, JobStatus, LifecycleEngine, TransitionEffects, TransitionPolicy};
