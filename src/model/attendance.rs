use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::backend::{BackendError, Row, decode_row};

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
pub enum AttendanceStatus {
    #[serde(rename = "present")]
    #[strum(serialize = "present")]
    Present,
    #[serde(rename = "late")]
    #[strum(serialize = "late")]
    Late,
    #[serde(rename = "absent")]
    #[strum(serialize = "absent")]
    Absent,
    #[serde(rename = "half-day")]
    #[strum(serialize = "half-day")]
    HalfDay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default = "default_location")]
    pub location: String,
    pub total_hours: Option<f64>,
}

fn default_location() -> String {
    "Office".to_string()
}

impl AttendanceRecord {
    /// Checked in and not yet checked out.
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}

impl TryFrom<Row> for AttendanceRecord {
    type Error = BackendError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        let record: AttendanceRecord = decode_row("attendance", row)?;

        if let Some(out) = record.check_out {
            if out < record.check_in {
                return Err(BackendError::Decode {
                    table: "attendance",
                    message: format!("record {} checks out before it checks in", record.id),
                });
            }
        }

        Ok(record)
    }
}

/// Hours between check-in and check-out, rounded to two decimals.
pub fn worked_hours(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    let seconds = (check_out - check_in).num_milliseconds() as f64 / 1000.0;
    (seconds / 3600.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn worked_hours_rounds_to_two_decimals() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 2, 17, 5, 20).unwrap();
        assert_eq!(worked_hours(start, end), 8.59);
        assert_eq!(worked_hours(start, start), 0.0);
    }

    #[test]
    fn decodes_remote_row() {
        let record = AttendanceRecord::try_from(row(json!({
            "id": "a1",
            "user_id": "u1",
            "check_in": "2026-03-02T08:30:00Z",
            "check_out": null,
            "date": "2026-03-02",
            "status": "half-day",
            "location": "Office",
            "total_hours": null,
            "created_at": "2026-03-02T08:30:00Z"
        })))
        .unwrap();

        assert!(record.is_open());
        assert_eq!(record.status, AttendanceStatus::HalfDay);
    }

    #[test]
    fn rejects_check_out_before_check_in() {
        let err = AttendanceRecord::try_from(row(json!({
            "id": "a1",
            "user_id": "u1",
            "check_in": "2026-03-02T08:30:00Z",
            "check_out": "2026-03-02T07:00:00Z",
            "date": "2026-03-02",
            "status": "present",
            "location": "Office",
            "total_hours": 1.5
        })))
        .unwrap_err();

        assert!(matches!(err, BackendError::Decode { table: "attendance", .. }));
    }
}
