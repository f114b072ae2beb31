//! In-process stand-ins for the store and the generation provider.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use fitplan_core::plan::{ACTIVITY_FIELDS, DAYS, NUTRITION_FIELDS};
use fitplan_core::{PlanGenerator, PlanStore, ProviderError};
use fitplan_db::models::{NewPlanDocument, PlanDocument};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// A [`PlanStore`] backed by a `Vec`.
///
/// Counts insert calls and can be switched into a failing mode to exercise
/// store-error paths.
#[derive(Default)]
pub struct MemoryPlanStore {
    docs: Mutex<Vec<PlanDocument>>,
    inserts: AtomicUsize,
    reads: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a connection error.
    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Number of `insert` calls, successful or not.
    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of `list`/`count`/`get` calls.
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Snapshot of everything stored, in insertion order.
    pub fn documents(&self) -> Vec<PlanDocument> {
        self.docs.lock().unwrap().clone()
    }

    /// Store `n` documents, one minute apart, the last one newest.
    pub fn seed(&self, n: usize) -> Vec<PlanDocument> {
        let base: DateTime<Utc> = Utc::now() - Duration::minutes(n as i64);
        let seeded: Vec<PlanDocument> = (0..n)
            .map(|i| {
                NewPlanDocument {
                    present_weight: 80.0,
                    expected_weight: 72.0,
                    target_months: 6,
                    plan: sample_week_plan(),
                    created_at: base + Duration::minutes(i as i64),
                }
                .into_document(Uuid::new_v4())
            })
            .collect();
        self.docs.lock().unwrap().extend(seeded.iter().cloned());
        seeded
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn insert(&self, new: &NewPlanDocument) -> Result<PlanDocument> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let doc = new.clone().into_document(Uuid::new_v4());
        self.docs.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<PlanDocument>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut docs = self.documents();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.docs.lock().unwrap().len() as i64)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PlanDocument>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.id == id)
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// A [`PlanGenerator`] that always gives the same answer and records the
/// prompts it was called with.
pub struct ScriptedGenerator {
    reply: Result<String, ProviderError>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    /// Always reply with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with a well-formed seven-day plan.
    pub fn with_week_plan() -> Self {
        Self::replying(sample_week_plan().to_string())
    }

    /// Always fail with `err`.
    pub fn failing(err: ProviderError) -> Self {
        Self {
            reply: Err(err),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(system_prompt, user_prompt)` pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlanGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_owned(), user_prompt.to_owned()));
        self.reply.clone()
    }
}

/// A complete plan in the shape the prompt asks for: every day, every field.
pub fn sample_week_plan() -> Value {
    let mut week = Map::new();
    for (i, day) in DAYS.iter().enumerate() {
        let mut fields = Map::new();
        for field in ACTIVITY_FIELDS {
            fields.insert(field.to_owned(), json!(10 + i * 5));
        }
        for field in NUTRITION_FIELDS {
            fields.insert(field.to_owned(), json!(100 + i * 10));
        }
        week.insert((*day).to_owned(), Value::Object(fields));
    }
    Value::Object(week)
}
