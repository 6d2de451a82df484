//! Run orchestration for Coffer: the audit trail every run appends to,
//! the pipeline that sequences one backup, and the scheduler that repeats
//! it on an interval.

pub mod audit;
pub mod pipeline;
pub mod scheduler;

pub use audit::AuditLog;
pub use pipeline::BackupPipeline;
pub use scheduler::Scheduler;
