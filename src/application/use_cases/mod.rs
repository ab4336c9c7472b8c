//! Use case implementations.

mod publish_use_case;
mod trigger_use_case;

pub use publish_use_case::{PipelineDeps, PublicationPipeline};
pub use trigger_use_case::TriggerListener;
