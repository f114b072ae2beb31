//! Plan generation pipeline: request validation, prompt construction,
//! response normalization, pagination and the service that orchestrates them.

pub mod normalize;
pub mod pagination;
pub mod prompt;
pub mod request;
pub mod service;

pub use normalize::{parse_plan_response, strip_code_fence};
pub use pagination::{PageInfo, Pagination};
pub use prompt::{ACTIVITY_FIELDS, DAYS, NUTRITION_FIELDS, SYSTEM_PROMPT, build_user_prompt};
pub use request::{PlanRequest, VALID_TARGET_MONTHS};
pub use service::{CreatedPlan, HealthReport, PlanMetadata, PlanPage, PlanService};
