//! Plan service layer.
//!
//! Orchestrates plan creation (validate, build prompt, generate, parse,
//! persist) and the read-back operations. Holds no mutable state of its
//! own: the store and the generator are injected and shared behind `Arc`s,
//! so the service is cheap to clone into every request handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use fitplan_db::models::{NewPlanDocument, PlanDocument};

use super::normalize::parse_plan_response;
use super::pagination::{PageInfo, Pagination};
use super::prompt::{SYSTEM_PROMPT, build_user_prompt};
use super::request::PlanRequest;
use crate::error::PlanError;
use crate::generation::PlanGenerator;
use crate::store::PlanStore;

/// Request values echoed back with a newly created plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanMetadata {
    pub present_weight: f64,
    pub expected_weight: f64,
    pub target_months: i32,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful [`PlanService::create_plan`].
#[derive(Debug, Clone)]
pub struct CreatedPlan {
    pub id: Uuid,
    pub plan: Value,
    pub metadata: PlanMetadata,
}

/// One page of stored plans, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct PlanPage {
    pub plans: Vec<PlanDocument>,
    pub pagination: PageInfo,
}

/// Outcome of a store connectivity probe.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Why the probe failed, if it did.
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// The four plan operations behind the HTTP surface.
#[derive(Clone)]
pub struct PlanService {
    store: Arc<dyn PlanStore>,
    generator: Arc<dyn PlanGenerator>,
}

impl PlanService {
    pub fn new(store: Arc<dyn PlanStore>, generator: Arc<dyn PlanGenerator>) -> Self {
        Self { store, generator }
    }

    /// Validate `input`, ask the generator for a weekly plan, parse it and
    /// persist it.
    ///
    /// Any failing stage stops the pipeline; nothing is written unless the
    /// model output parsed as a JSON object. Identical inputs produce
    /// distinct documents.
    pub async fn create_plan(&self, input: &Value) -> Result<CreatedPlan, PlanError> {
        let request = PlanRequest::from_json(input)
            .inspect_err(|e| warn!(error = %e, "rejected plan request"))?;
        info!(
            present_weight = request.present_weight,
            expected_weight = request.expected_weight,
            target_months = request.target_months,
            "plan request validated"
        );

        let user_prompt = build_user_prompt(&request);

        info!(provider = self.generator.name(), "requesting plan from generator");
        let raw = self
            .generator
            .generate(SYSTEM_PROMPT, &user_prompt)
            .await
            .inspect_err(|e| {
                error!(provider = self.generator.name(), error = %e, "plan generation failed");
            })?;
        info!(chars = raw.chars().count(), "generator response received");

        let plan = parse_plan_response(&raw).inspect_err(|e| {
            warn!(reason = %e.reason, excerpt = %e.excerpt, "generator response is not valid JSON");
        })?;

        let new = NewPlanDocument {
            present_weight: request.present_weight,
            expected_weight: request.expected_weight,
            target_months: request.target_months,
            plan,
            created_at: Utc::now(),
        };
        let doc = self.store.insert(&new).await.map_err(store_error)?;
        info!(plan_id = %doc.id, "plan saved");

        Ok(CreatedPlan {
            id: doc.id,
            metadata: PlanMetadata {
                present_weight: doc.present_weight,
                expected_weight: doc.expected_weight,
                target_months: doc.target_months,
                created_at: doc.created_at,
            },
            plan: doc.plan,
        })
    }

    /// Return one page of plans plus the total count.
    pub async fn list_plans(&self, pagination: Pagination) -> Result<PlanPage, PlanError> {
        let (plans, total) = tokio::try_join!(
            self.store.list(pagination.skip(), pagination.limit),
            self.store.count(),
        )
        .map_err(store_error)?;

        info!(
            page = pagination.page,
            limit = pagination.limit,
            returned = plans.len(),
            total,
            "plans listed"
        );

        Ok(PlanPage {
            plans,
            pagination: pagination.info(total),
        })
    }

    /// Fetch a single plan by its string id.
    ///
    /// Malformed ids are rejected without touching the store.
    pub async fn get_plan(&self, id: &str) -> Result<PlanDocument, PlanError> {
        let id = Uuid::parse_str(id).map_err(|_| {
            warn!(id, "invalid plan id");
            PlanError::invalid_input("Invalid plan ID format")
        })?;

        self.store
            .get(id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| {
                info!(plan_id = %id, "plan not found");
                PlanError::NotFound("Plan not found".to_owned())
            })
    }

    /// Probe store connectivity. Never fails; problems land in the report.
    pub async fn health(&self) -> HealthReport {
        let error = match self.store.ping().await {
            Ok(()) => None,
            Err(e) => {
                let message = format!("{e:#}");
                error!(error = %message, "store health check failed");
                Some(message)
            }
        };
        HealthReport {
            error,
            timestamp: Utc::now(),
        }
    }
}

fn store_error(err: anyhow::Error) -> PlanError {
    error!(error = %format!("{err:#}"), "store operation failed");
    PlanError::Store(err)
}
