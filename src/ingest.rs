//! Bulk job upload.
//!
//! Rows arrive as loose header → value maps (usually straight from a CSV
//! export). Headers are normalized against a fixed table, each row is either
//! admitted whole as a `Scheduled` job or skipped, and the survivors are
//! inserted as one all-or-nothing batch, optionally after clearing the store.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::lifecycle::{JobFields, JobRecord};
use crate::store::JobStore;

/// One uploaded row, keyed by the header as it appeared in the upload.
pub type RawRow = HashMap<String, String>;

/// Fields an upload can populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadField {
    ReferenceNumber,
    CustomerName,
    DriverName,
    CollectionAddress,
    DeliveryAddress,
    CollectionTime,
    Notes,
}

impl UploadField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadField::ReferenceNumber => "referenceNumber",
            UploadField::CustomerName => "customerName",
            UploadField::DriverName => "driverName",
            UploadField::CollectionAddress => "collectionAddress",
            UploadField::DeliveryAddress => "deliveryAddress",
            UploadField::CollectionTime => "collectionTime",
            UploadField::Notes => "notes",
        }
    }
}

const REQUIRED: [UploadField; 6] = [
    UploadField::ReferenceNumber,
    UploadField::CustomerName,
    UploadField::DriverName,
    UploadField::CollectionAddress,
    UploadField::DeliveryAddress,
    UploadField::CollectionTime,
];

/// Map an upload header to the field it fills. Matching ignores case and
/// surrounding whitespace; unknown headers map to `None` and are dropped.
pub fn normalize_header(header: &str) -> Option<UploadField> {
    let field = match header.trim().to_lowercase().as_str() {
        "reference number" | "referencenumber" => UploadField::ReferenceNumber,
        "customer" | "customername" => UploadField::CustomerName,
        "driver" | "drivername" => UploadField::DriverName,
        "collection address" | "collectionaddress" => UploadField::CollectionAddress,
        "delivery address" | "deliveryaddress" => UploadField::DeliveryAddress,
        "collection time" | "collectiontime" => UploadField::CollectionTime,
        "notes" => UploadField::Notes,
        _ => return None,
    };
    Some(field)
}

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M",
];

/// Parse a free-text instant. Values without an offset are taken as UTC.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingField(&'static str),
    InvalidCollectionTime(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing {field}"),
            SkipReason::InvalidCollectionTime(value) => {
                write!(f, "invalid collection time {value:?}")
            }
        }
    }
}

/// A row left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// 1-based position among the data rows.
    pub row: usize,
    pub reference: Option<String>,
    pub reason: SkipReason,
}

/// Outcome of a successful upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    /// Records removed first because the upload asked to replace existing data.
    pub replaced: Option<usize>,
    pub skipped: Vec<SkippedRow>,
}

impl IngestReport {
    pub fn summary(&self) -> String {
        format!("{} jobs successfully uploaded.", self.inserted)
    }
}

/// Collect a row's values by field. When several headers map to the same
/// field, the first non-blank value in header order wins.
fn resolve_fields(row: &RawRow) -> HashMap<UploadField, &str> {
    let mut headers: Vec<_> = row.iter().collect();
    headers.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut fields: HashMap<UploadField, &str> = HashMap::new();
    for (header, value) in headers {
        let Some(field) = normalize_header(header) else {
            continue;
        };
        let slot = fields.entry(field).or_insert(value.as_str());
        if slot.trim().is_empty() {
            *slot = value.as_str();
        }
    }
    fields
}

/// Decide whether a single row becomes a job. Rows are admitted whole or not
/// at all.
pub fn admit_row(row: &RawRow) -> Result<JobFields, SkipReason> {
    let fields = resolve_fields(row);

    let present = |field: UploadField| {
        fields
            .get(&field)
            .copied()
            .filter(|value| !value.trim().is_empty())
    };
    for field in REQUIRED {
        if present(field).is_none() {
            return Err(SkipReason::MissingField(field.as_str()));
        }
    }
    let get = |field: UploadField| present(field).unwrap_or_default();

    let raw_time = get(UploadField::CollectionTime);
    let collection_time = parse_instant(raw_time)
        .ok_or_else(|| SkipReason::InvalidCollectionTime(raw_time.to_string()))?;

    Ok(JobFields {
        reference_number: get(UploadField::ReferenceNumber).trim().to_string(),
        customer_name: get(UploadField::CustomerName).trim().to_string(),
        driver_name: get(UploadField::DriverName).trim().to_string(),
        collection_address: get(UploadField::CollectionAddress).to_string(),
        delivery_address: get(UploadField::DeliveryAddress).to_string(),
        collection_time,
        notes: present(UploadField::Notes).unwrap_or_default().to_string(),
    })
}

fn reference_of(row: &RawRow) -> Option<String> {
    resolve_fields(row)
        .get(&UploadField::ReferenceNumber)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn first_repeated_reference(candidates: &[JobRecord]) -> Option<String> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .iter()
        .find(|job| !seen.insert(job.reference_number.as_str()))
        .map(|job| job.reference_number.clone())
}

/// Admit what can be admitted and insert it as one batch.
///
/// With `replace_existing`, every stored record is deleted before the insert,
/// but only once at least one row was admitted and the batch is free of
/// internal duplicates. The delete and the insert are two separate store
/// operations: a concurrent reader may briefly see an empty store.
pub fn ingest<S: JobStore + ?Sized>(
    store: &S,
    rows: Vec<RawRow>,
    replace_existing: bool,
) -> Result<IngestReport, DispatchError> {
    let mut candidates = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        match admit_row(row) {
            Ok(fields) => candidates.push(JobRecord::scheduled(fields)),
            Err(reason) => {
                let reference = reference_of(row);
                warn!(
                    row = index + 1,
                    reference = reference.as_deref().unwrap_or("-"),
                    %reason,
                    "skipping upload row"
                );
                skipped.push(SkippedRow {
                    row: index + 1,
                    reference,
                    reason,
                });
            }
        }
    }

    if candidates.is_empty() {
        warn!(rows = rows.len(), "upload contained no valid rows");
        return Err(DispatchError::EmptyOrInvalidUpload);
    }

    if let Some(dup) = first_repeated_reference(&candidates) {
        warn!(reference = %dup, "upload repeats a reference number");
        return Err(DispatchError::DuplicateReference(dup));
    }

    let replaced = if replace_existing {
        let deleted = store.delete_all()?;
        info!(deleted, "cleared existing jobs before upload");
        Some(deleted)
    } else {
        None
    };

    let inserted = store.insert_many(candidates)?;
    info!(inserted, skipped = skipped.len(), "upload stored");

    Ok(IngestReport {
        inserted,
        replaced,
        skipped,
    })
}

/// Read a CSV upload with a header row into raw rows. Short or long rows are
/// tolerated; missing cells simply leave the field absent.
pub fn read_csv(reader: impl Read) -> Result<Vec<RawRow>, DispatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| DispatchError::Validation(format!("malformed CSV header: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record =
            record.map_err(|e| DispatchError::Validation(format!("malformed CSV row: {e}")))?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lifecycle::JobStatus;
    use crate::store::test_support::record;
    use crate::store::{MemoryStore, SortKey};
    use chrono::TimeZone;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_row(reference: &str) -> RawRow {
        row(&[
            ("Reference Number", reference),
            ("Customer", "Acme Ltd"),
            ("Driver", "Sam Driver"),
            ("Collection Address", "1 Dock Road, Leeds"),
            ("Delivery Address", "9 High Street, York"),
            ("Collection Time", "2026-03-01 09:00"),
        ])
    }

    fn references(store: &MemoryStore) -> Vec<String> {
        store
            .find_all(SortKey::CreatedAt)
            .unwrap()
            .into_iter()
            .map(|r| r.reference_number)
            .collect()
    }

    #[test]
    fn header_table() {
        assert_eq!(
            normalize_header("  REFERENCE NUMBER "),
            Some(UploadField::ReferenceNumber)
        );
        assert_eq!(normalize_header("Driver"), Some(UploadField::DriverName));
        assert_eq!(
            normalize_header("collectionTime"),
            Some(UploadField::CollectionTime)
        );
        assert_eq!(normalize_header("Vehicle"), None);
        assert_eq!(normalize_header("status"), None);
    }

    #[test]
    fn parses_supported_instant_formats() {
        let nine = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_instant("2026-03-01T09:00:00Z"), Some(nine));
        assert_eq!(parse_instant("2026-03-01T10:00:00+01:00"), Some(nine));
        assert_eq!(parse_instant("2026-03-01 09:00"), Some(nine));
        assert_eq!(parse_instant("2026-03-01T09:00:00"), Some(nine));
        assert_eq!(parse_instant("01/03/2026 09:00"), Some(nine));
        assert_eq!(
            parse_instant("2026-03-01"),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_instant("tomorrow-ish"), None);
        assert_eq!(parse_instant("2026-13-45 09:00"), None);
    }

    #[test]
    fn admit_row_trims_identity_fields_and_drops_unknown_headers() {
        let mut r = full_row("  R-1 ");
        r.insert("Vehicle".into(), "Van 3".into());
        r.insert("Notes".into(), "fragile".into());
        let fields = admit_row(&r).unwrap();
        assert_eq!(fields.reference_number, "R-1");
        assert_eq!(fields.notes, "fragile");
    }

    #[test]
    fn blank_required_field_is_missing() {
        let mut r = full_row("R-1");
        r.insert("Driver".into(), "   ".into());
        assert_eq!(
            admit_row(&r),
            Err(SkipReason::MissingField("driverName"))
        );
    }

    #[test]
    fn blank_alias_does_not_hide_filled_one() {
        for _ in 0..64 {
            let mut r = full_row("R-1");
            r.insert("Customer".into(), "".into());
            r.insert("customerName".into(), "Acme".into());
            assert_eq!(admit_row(&r).unwrap().customer_name, "Acme");
        }
    }

    #[test]
    fn conflicting_aliases_resolve_by_header_order() {
        for _ in 0..64 {
            let mut r = full_row("R-1");
            r.insert("customerName".into(), "Beta plc".into());
            assert_eq!(admit_row(&r).unwrap().customer_name, "Acme Ltd");
        }
    }

    #[test]
    fn skipped_row_reports_filled_reference_alias() {
        let mut r = full_row("");
        r.insert("referenceNumber".into(), "R-9".into());
        r.remove("Driver");
        assert_eq!(reference_of(&r).as_deref(), Some("R-9"));
    }

    #[test]
    fn row_missing_driver_is_skipped() {
        let store = MemoryStore::new();
        let mut second = full_row("R-2");
        second.remove("Driver");
        let rows = vec![full_row("R-1"), second, full_row("R-3")];

        let report = ingest(&store, rows, false).unwrap();

        assert_eq!(report.inserted, 2);
        assert_eq!(report.summary(), "2 jobs successfully uploaded.");
        assert_eq!(
            report.skipped,
            vec![SkippedRow {
                row: 2,
                reference: Some("R-2".into()),
                reason: SkipReason::MissingField("driverName"),
            }]
        );
        assert_eq!(references(&store), ["R-1", "R-3"]);
        assert!(
            store
                .find_all(SortKey::CreatedAt)
                .unwrap()
                .iter()
                .all(|job| job.status == JobStatus::Scheduled)
        );
    }

    #[test]
    fn invalid_date_row_is_skipped() {
        let store = MemoryStore::new();
        let mut bad = full_row("R-2");
        bad.insert("Collection Time".into(), "next tuesday".into());

        let report = ingest(&store, vec![full_row("R-1"), bad], false).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::InvalidCollectionTime("next tuesday".into())
        );
    }

    #[test]
    fn duplicate_within_batch_inserts_nothing() {
        let store = MemoryStore::new();
        let rows = vec![full_row("R-1"), full_row("R-2"), full_row("R-1")];

        let err = ingest(&store, rows, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateReference);
        assert!(references(&store).is_empty());
    }

    #[test]
    fn collision_with_existing_inserts_nothing() {
        let store = MemoryStore::new();
        store.insert(record("R-2", 1, 9)).unwrap();

        let err = ingest(&store, vec![full_row("R-1"), full_row("R-2")], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateReference);
        assert_eq!(references(&store), ["R-2"]);
    }

    #[test]
    fn empty_upload_with_replace_keeps_existing_data() {
        let store = MemoryStore::new();
        store.insert(record("KEEP", 1, 9)).unwrap();
        let mut bad = full_row("R-1");
        bad.remove("Customer");

        let err = ingest(&store, vec![bad], true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyOrInvalidUpload);
        assert_eq!(references(&store), ["KEEP"]);

        let err = ingest(&store, Vec::new(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyOrInvalidUpload);
        assert_eq!(references(&store), ["KEEP"]);
    }

    #[test]
    fn self_colliding_batch_with_replace_keeps_existing_data() {
        let store = MemoryStore::new();
        store.insert(record("KEEP", 1, 9)).unwrap();

        let err = ingest(&store, vec![full_row("R-1"), full_row("R-1")], true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateReference);
        assert_eq!(references(&store), ["KEEP"]);
    }

    #[test]
    fn replace_clears_existing_before_insert() {
        let store = MemoryStore::new();
        store.insert(record("OLD-1", 1, 9)).unwrap();
        store.insert(record("R-1", 1, 9)).unwrap();

        let report = ingest(&store, vec![full_row("R-1"), full_row("R-2")], true).unwrap();
        assert_eq!(report.replaced, Some(2));
        assert_eq!(report.inserted, 2);
        assert_eq!(references(&store), ["R-1", "R-2"]);
    }

    #[test]
    fn reads_csv_with_loose_headers() {
        let data = "\
Reference Number, Customer ,Driver,Collection Address,Delivery Address,Collection Time,Vehicle
J-100,Acme Ltd,Sam,\"1 Dock Road, Leeds\",\"9 High Street, York\",2026-03-01 09:00,Van
J-101,Beta plc,Alex,2 Mill Lane,3 Quay Side
";
        let rows = read_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Customer"], "Acme Ltd");
        assert_eq!(rows[0]["Collection Address"], "1 Dock Road, Leeds");
        assert!(!rows[1].contains_key("Collection Time"));

        let store = MemoryStore::new();
        let report = ingest(&store, rows, false).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::MissingField("collectionTime")
        );
    }
}
