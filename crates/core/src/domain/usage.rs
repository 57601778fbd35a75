//! Route batch attendance and usage statistics.
//!
//! Every morning a `BatchUseRecord` is created per rider of an active batch. The rider
//! later confirms (or skips) the trip, and the usage report aggregates those answers
//! per batch into active and dormant lists.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{BatchUseRecordId, RouteBatchId, UserId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendStatus {
    Confirmed,
    Skip,
    Pending,
    NotAssigned,
}

impl AttendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed",
            Self::Skip => "Skip",
            Self::Pending => "Pending",
            Self::NotAssigned => "NotAssigned",
        }
    }
}

impl fmt::Display for AttendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Confirmed" => Ok(Self::Confirmed),
            "Skip" => Ok(Self::Skip),
            "Pending" => Ok(Self::Pending),
            "NotAssigned" => Ok(Self::NotAssigned),
            other => {
                Err(DomainError::UnknownStatus { kind: "attendance", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUseRecord {
    pub id: BatchUseRecordId,
    pub user_id: UserId,
    pub batch_id: RouteBatchId,
    pub user_attend_status: AttendStatus,
    pub batch_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBatchUseRecord {
    pub user_id: UserId,
    pub batch_id: RouteBatchId,
    pub batch_date: NaiveDate,
}

/// One attendance answer joined with the route and batch names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageEntry {
    pub batch_id: RouteBatchId,
    pub route: String,
    pub route_batch: String,
    pub user_attend_status: AttendStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUsage {
    #[serde(rename = "Route")]
    pub route: String,
    #[serde(rename = "RouteBatch")]
    pub route_batch: String,
    pub users: usize,
    pub percentage_usage: u32,
}

impl BatchUsage {
    /// Placeholder reported when there is nothing to compare against.
    pub fn empty() -> Self {
        Self { route: "N/A".to_string(), route_batch: String::new(), users: 0, percentage_usage: 0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extreme {
    Max,
    Min,
}

/// Computes the usage of a single batch and files it under `active` or `dormant`.
///
/// A batch with no confirmed attendance is dormant at 0%. Otherwise the percentage is
/// `confirmed / total * 100`, rounded half away from zero. Empty input is ignored.
pub fn find_percentage_usage(
    records: &[UsageEntry],
    active: &mut Vec<BatchUsage>,
    dormant: &mut Vec<BatchUsage>,
) {
    let Some(first) = records.first() else {
        return;
    };

    let confirmed = records
        .iter()
        .filter(|record| record.user_attend_status == AttendStatus::Confirmed)
        .count();
    let mut usage = BatchUsage {
        route: first.route.clone(),
        route_batch: first.route_batch.clone(),
        users: records.len(),
        percentage_usage: 0,
    };

    if confirmed == 0 {
        dormant.push(usage);
        return;
    }

    let percentage = (confirmed as f64 / records.len() as f64) * 100.0;
    usage.percentage_usage = percentage.round() as u32;
    active.push(usage);
}

/// Picks the most or least used batch. Ties on percentage are broken by rider count.
///
/// A single-entry list has no meaningful minimum, so `Min` reports the empty record.
pub fn find_max_or_min(list: &[BatchUsage], extreme: Extreme) -> BatchUsage {
    if list.is_empty() || (extreme == Extreme::Min && list.len() == 1) {
        return BatchUsage::empty();
    }

    let compare = |a: &&BatchUsage, b: &&BatchUsage| -> Ordering {
        a.percentage_usage.cmp(&b.percentage_usage).then_with(|| a.users.cmp(&b.users))
    };

    let picked = match extreme {
        Extreme::Max => list.iter().max_by(compare),
        Extreme::Min => list.iter().min_by(compare),
    };
    picked.cloned().unwrap_or_else(BatchUsage::empty)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub active: Vec<BatchUsage>,
    pub dormant: Vec<BatchUsage>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub most_used_batch: BatchUsage,
    pub least_used_batch: BatchUsage,
    pub dormant_batches: Vec<BatchUsage>,
}

impl UsageReport {
    /// Groups entries by batch (keeping first-seen order) and classifies each batch.
    pub fn from_entries(entries: &[UsageEntry]) -> Self {
        let mut order: Vec<RouteBatchId> = Vec::new();
        for entry in entries {
            if !order.contains(&entry.batch_id) {
                order.push(entry.batch_id);
            }
        }

        let mut report = Self::default();
        for batch_id in order {
            let batch: Vec<UsageEntry> =
                entries.iter().filter(|entry| entry.batch_id == batch_id).cloned().collect();
            find_percentage_usage(&batch, &mut report.active, &mut report.dormant);
        }
        report
    }

    pub fn summarize(&self) -> UsageSummary {
        UsageSummary {
            most_used_batch: find_max_or_min(&self.active, Extreme::Max),
            least_used_batch: find_max_or_min(&self.active, Extreme::Min),
            dormant_batches: self.dormant.clone(),
        }
    }
}
