pub mod client;
pub mod source;
pub mod token;
pub mod types;

use std::sync::Arc;

use crate::config::ApiShape;

pub use client::ApiClient;
pub use source::{FlatSchedules, ScheduleGroup, ScheduleRef, ScheduleSource, TeamSchedules};
pub use token::{Credential, TokenManager};

/// Pick the enumeration strategy for the configured API shape.
pub fn source_for(shape: ApiShape, client: ApiClient) -> Arc<dyn ScheduleSource> {
    match shape {
        ApiShape::Flat => Arc::new(FlatSchedules::new(client)),
        ApiShape::Teams => Arc::new(TeamSchedules::new(client)),
    }
}
