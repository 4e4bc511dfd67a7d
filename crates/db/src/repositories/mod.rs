//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod activity_repo;
pub mod event_repo;
pub mod schedule_definition_repo;
pub mod sequence_template_repo;

pub use activity_repo::ActivityRepo;
pub use event_repo::EventRepo;
pub use schedule_definition_repo::ScheduleDefinitionRepo;
pub use sequence_template_repo::SequenceTemplateRepo;
