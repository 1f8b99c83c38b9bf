use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::JobStatus;

/// A delivery job as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub reference_number: String,
    pub customer_name: String,
    pub driver_name: String,
    pub collection_address: String,
    pub delivery_address: String,
    pub collection_time: DateTime<Utc>,
    /// Travel time in whole minutes from the last successful ETA lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<i64>,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_en_route_to_collection: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_arrived_at_collection: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_loaded: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_en_route_to_delivery: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_arrived_at_delivery: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Build a fresh `Scheduled` record from validated fields. The store
    /// overwrites `id` and the bookkeeping instants on insert.
    pub fn scheduled(fields: JobFields) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            reference_number: fields.reference_number,
            customer_name: fields.customer_name,
            driver_name: fields.driver_name,
            collection_address: fields.collection_address,
            delivery_address: fields.delivery_address,
            collection_time: fields.collection_time,
            estimated_duration: None,
            status: JobStatus::Scheduled,
            notes: fields.notes,
            time_en_route_to_collection: None,
            time_arrived_at_collection: None,
            time_loaded: None,
            time_en_route_to_delivery: None,
            time_arrived_at_delivery: None,
            time_completed: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn timestamp(&self, field: TimestampField) -> Option<DateTime<Utc>> {
        match field {
            TimestampField::CollectionTime => Some(self.collection_time),
            TimestampField::TimeEnRouteToCollection => self.time_en_route_to_collection,
            TimestampField::TimeArrivedAtCollection => self.time_arrived_at_collection,
            TimestampField::TimeLoaded => self.time_loaded,
            TimestampField::TimeEnRouteToDelivery => self.time_en_route_to_delivery,
            TimestampField::TimeArrivedAtDelivery => self.time_arrived_at_delivery,
            TimestampField::TimeCompleted => self.time_completed,
        }
    }

    pub fn set_timestamp(&mut self, field: TimestampField, at: DateTime<Utc>) {
        let slot = match field {
            TimestampField::CollectionTime => {
                self.collection_time = at;
                return;
            }
            TimestampField::TimeEnRouteToCollection => &mut self.time_en_route_to_collection,
            TimestampField::TimeArrivedAtCollection => &mut self.time_arrived_at_collection,
            TimestampField::TimeLoaded => &mut self.time_loaded,
            TimestampField::TimeEnRouteToDelivery => &mut self.time_en_route_to_delivery,
            TimestampField::TimeArrivedAtDelivery => &mut self.time_arrived_at_delivery,
            TimestampField::TimeCompleted => &mut self.time_completed,
        };
        *slot = Some(at);
    }
}

/// Validated, trimmed field values for a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct JobFields {
    pub reference_number: String,
    pub customer_name: String,
    pub driver_name: String,
    pub collection_address: String,
    pub delivery_address: String,
    pub collection_time: DateTime<Utc>,
    pub notes: String,
}

/// Caller input for creating a job, as received from a transport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub driver_name: String,
    #[serde(default)]
    pub collection_address: String,
    #[serde(default)]
    pub delivery_address: String,
    /// Free-text instant, parsed on creation.
    #[serde(default)]
    pub collection_time: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Accepted for compatibility and ignored: new jobs always start `Scheduled`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Partial update applied by `JobStore::update_by_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub notes: Option<String>,
    pub estimated_duration: Option<i64>,
    /// Always overwrites the field.
    pub set_timestamp: Option<(TimestampField, DateTime<Utc>)>,
    /// Only fills the field when it is still empty.
    pub stamp_if_unset: Option<(TimestampField, DateTime<Utc>)>,
}

impl JobPatch {
    pub fn apply(&self, record: &mut JobRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
        if let Some(minutes) = self.estimated_duration {
            record.estimated_duration = Some(minutes);
        }
        if let Some((field, at)) = self.set_timestamp {
            record.set_timestamp(field, at);
        }
        if let Some((field, at)) = self.stamp_if_unset
            && record.timestamp(field).is_none()
        {
            record.set_timestamp(field, at);
        }
    }
}

/// The instants that can be corrected by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimestampField {
    CollectionTime,
    TimeEnRouteToCollection,
    TimeArrivedAtCollection,
    TimeLoaded,
    TimeEnRouteToDelivery,
    TimeArrivedAtDelivery,
    TimeCompleted,
}

impl TimestampField {
    pub const EDITABLE: [TimestampField; 7] = [
        TimestampField::CollectionTime,
        TimestampField::TimeEnRouteToCollection,
        TimestampField::TimeArrivedAtCollection,
        TimestampField::TimeLoaded,
        TimestampField::TimeEnRouteToDelivery,
        TimestampField::TimeArrivedAtDelivery,
        TimestampField::TimeCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampField::CollectionTime => "collectionTime",
            TimestampField::TimeEnRouteToCollection => "timeEnRouteToCollection",
            TimestampField::TimeArrivedAtCollection => "timeArrivedAtCollection",
            TimestampField::TimeLoaded => "timeLoaded",
            TimestampField::TimeEnRouteToDelivery => "timeEnRouteToDelivery",
            TimestampField::TimeArrivedAtDelivery => "timeArrivedAtDelivery",
            TimestampField::TimeCompleted => "timeCompleted",
        }
    }
}

impl fmt::Display for TimestampField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned for field names outside the editable allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field {0:?} cannot be edited")]
pub struct InvalidField(pub String);

impl FromStr for TimestampField {
    type Err = InvalidField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimestampField::EDITABLE
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| InvalidField(s.to_string()))
    }
}
