//! Core of the plan service: request validation, prompt construction, model
//! output normalization, the generation and storage seams, and the
//! orchestration that ties them together.

pub mod error;
pub mod generation;
pub mod plan;
pub mod store;

pub use error::{ParseError, PlanError, ProviderError};
pub use generation::{GroqClient, GroqConfig, PlanGenerator};
pub use plan::{PlanRequest, PlanService};
pub use store::{PgPlanStore, PlanStore};
