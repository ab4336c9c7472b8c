//! Application layer with use cases, services and DTOs.

/// Data transfer objects.
pub mod dto;
/// Services shared by the use cases.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use dto::{CommitOrder, PublicationReport, PublicationRequest, TriggerOutcome};
pub use services::{BusyPolicy, PublicationWorker, WorkerConfig, WorkerHandle};
pub use use_cases::{PipelineDeps, PublicationPipeline, TriggerListener};
