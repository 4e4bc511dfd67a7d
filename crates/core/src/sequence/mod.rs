//! Multi-step, multi-channel outreach sequence engine.
//!
//! Data flows one way:
//!
//! ```text
//! raw JSON payload
//!   -> normalize      (alias resolution, one StepDraft per entry)
//!   -> assembler      (typed steps: channel, send_at, subject, delay)
//!   -> ordering       (dense 1..N in submitted order)
//!   -> branching      (target existence, then cycle detection)
//!   => ValidatedSequenceTemplate
//!   -> schedule       (relative delays to absolute dispatch instants)
//!   -> calendar       (optional business-hours post-processing)
//! ```
//!
//! Nothing here performs I/O. Persistence, eventing and authentication are
//! handled by the `db`, `events` and `api` crates.

pub mod assembler;
pub mod branching;
pub mod calendar;
pub mod normalize;
pub mod ordering;
pub mod schedule;
pub mod step;

pub use assembler::{build, build_from, ValidatedSequenceTemplate};
pub use branching::{validate_branches, BranchGraph};
pub use calendar::ScheduleDefinition;
pub use normalize::{normalize_payload, normalize_step, NormalizedPayload, StepDraft};
pub use ordering::validate_ordering;
pub use schedule::{compute_schedule, ScheduledDispatch};
pub use step::{
    serialize_with_mirrors, Attachment, BranchConditions, BranchSlot, CampaignSequenceStep, Channel,
    SendAt, StepOutput,
};
