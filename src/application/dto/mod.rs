//! Data transfer objects for the application layer.

mod publication_dto;

pub use publication_dto::{
    CommitOrder, IgnoreReason, PublicationReport, PublicationRequest, TriggerOutcome,
};
