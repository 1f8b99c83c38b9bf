use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::eta::{EtaResolver, RouteProvider};
use crate::ingest::{self, IngestReport, RawRow};
use crate::lifecycle::{
    JobFields, JobPatch, JobRecord, LifecycleEngine, NewJob, TimestampField, TransitionPolicy,
};
use crate::store::{JobStore, SortKey};

/// Entry point for every job operation a transport exposes.
///
/// The store and the routing provider are injected, so tests and embedders
/// can swap either one.
pub struct JobService<S, P> {
    store: S,
    provider: P,
    policy: TransitionPolicy,
}

impl<S: JobStore, P: RouteProvider> JobService<S, P> {
    pub fn new(store: S, provider: P) -> Self {
        Self::with_policy(store, provider, TransitionPolicy::default())
    }

    pub fn with_policy(store: S, provider: P, policy: TransitionPolicy) -> Self {
        Self {
            store,
            provider,
            policy,
        }
    }

    /// Create a `Scheduled` job. Any status in the input is ignored.
    pub fn create(&self, input: NewJob) -> Result<JobRecord, DispatchError> {
        if let Some(status) = &input.status {
            debug!(%status, "ignoring caller-supplied status on create");
        }
        let fields = validate_new_job(input)?;
        let job = self.store.insert(JobRecord::scheduled(fields))?;
        info!(id = %job.id, reference = %job.reference_number, "job created");
        Ok(job)
    }

    /// All jobs, earliest collection first.
    pub fn list(&self) -> Result<Vec<JobRecord>, DispatchError> {
        Ok(self.store.find_all(SortKey::CollectionTime)?)
    }

    pub fn get(&self, id: &str) -> Result<JobRecord, DispatchError> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))
    }

    /// Move a job to `target`, stamping the matching milestone.
    ///
    /// Moving to `Loaded` also tries to fetch a fresh ETA. A failed lookup is
    /// logged and leaves `estimatedDuration` as it was; the status change
    /// still goes through.
    pub async fn update_status(&self, id: &str, target: &str) -> Result<JobRecord, DispatchError> {
        let effects = LifecycleEngine::compute_transition_effects(target)?;
        let job = self.get(id)?;

        if !self.policy.allows(job.status, effects.status) {
            return Err(DispatchError::Validation(format!(
                "cannot move job from {:?} to {:?}",
                job.status.as_str(),
                effects.status.as_str()
            )));
        }

        let now = Utc::now();
        let mut patch = JobPatch {
            status: Some(effects.status),
            stamp_if_unset: effects.stamp.map(|field| (field, now)),
            ..Default::default()
        };

        if effects.resolve_eta {
            match EtaResolver::resolve(&self.provider, &job.collection_address, &job.delivery_address)
                .await
            {
                Ok(minutes) => patch.estimated_duration = Some(minutes),
                Err(e) => warn!(id, error = %e, "ETA lookup failed during status change"),
            }
        }

        let updated = self
            .store
            .update_by_id(id, &patch)?
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))?;
        info!(id, status = %updated.status, "job status updated");
        Ok(updated)
    }

    pub fn update_notes(&self, id: &str, notes: &str) -> Result<JobRecord, DispatchError> {
        let patch = JobPatch {
            notes: Some(notes.to_string()),
            ..Default::default()
        };
        self.store
            .update_by_id(id, &patch)?
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))
    }

    /// Manually correct one of the editable instants. Status is untouched.
    pub fn update_timestamp(
        &self,
        id: &str,
        field: &str,
        at: DateTime<Utc>,
    ) -> Result<JobRecord, DispatchError> {
        let field: TimestampField = field.parse()?;
        self.set_timestamp(id, field, at)
    }

    /// Like [`update_timestamp`](Self::update_timestamp), for a raw time as
    /// typed by a user. The field name is checked before the time is parsed.
    pub fn correct_timestamp(
        &self,
        id: &str,
        field: &str,
        raw_time: &str,
    ) -> Result<JobRecord, DispatchError> {
        let field: TimestampField = field.parse()?;
        let at = ingest::parse_instant(raw_time).ok_or_else(|| {
            DispatchError::Validation(format!("{raw_time:?} is not a valid date"))
        })?;
        self.set_timestamp(id, field, at)
    }

    fn set_timestamp(
        &self,
        id: &str,
        field: TimestampField,
        at: DateTime<Utc>,
    ) -> Result<JobRecord, DispatchError> {
        let patch = JobPatch {
            set_timestamp: Some((field, at)),
            ..Default::default()
        };
        let updated = self
            .store
            .update_by_id(id, &patch)?
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))?;
        info!(id, %field, %at, "timestamp corrected");
        Ok(updated)
    }

    /// Fetch a fresh ETA and store it. Any lookup failure is returned and
    /// the job is left as it was.
    pub async fn refresh_eta(&self, id: &str) -> Result<JobRecord, DispatchError> {
        let job = self.get(id)?;
        let minutes =
            EtaResolver::resolve(&self.provider, &job.collection_address, &job.delivery_address)
                .await?;
        let patch = JobPatch {
            estimated_duration: Some(minutes),
            ..Default::default()
        };
        let updated = self
            .store
            .update_by_id(id, &patch)?
            .ok_or_else(|| DispatchError::NotFound(id.to_string()))?;
        info!(id, minutes, "ETA refreshed");
        Ok(updated)
    }

    pub fn ingest(
        &self,
        rows: Vec<RawRow>,
        replace_existing: bool,
    ) -> Result<IngestReport, DispatchError> {
        ingest::ingest(&self.store, rows, replace_existing)
    }
}

fn required(value: String, name: &str) -> Result<String, DispatchError> {
    if value.trim().is_empty() {
        return Err(DispatchError::Validation(format!("{name} is required")));
    }
    Ok(value)
}

fn validate_new_job(input: NewJob) -> Result<JobFields, DispatchError> {
    let reference_number = required(input.reference_number, "referenceNumber")?;
    let customer_name = required(input.customer_name, "customerName")?;
    let driver_name = required(input.driver_name, "driverName")?;
    let collection_address = required(input.collection_address, "collectionAddress")?;
    let delivery_address = required(input.delivery_address, "deliveryAddress")?;
    let raw_time = required(input.collection_time, "collectionTime")?;
    let collection_time = ingest::parse_instant(&raw_time).ok_or_else(|| {
        DispatchError::Validation(format!("collectionTime {raw_time:?} is not a valid date"))
    })?;

    Ok(JobFields {
        reference_number: reference_number.trim().to_string(),
        customer_name: customer_name.trim().to_string(),
        driver_name: driver_name.trim().to_string(),
        collection_address,
        delivery_address,
        collection_time,
        notes: input.notes.unwrap_or_default(),
    })
}
