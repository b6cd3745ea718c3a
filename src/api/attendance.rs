use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::api::outcome;
use crate::auth::auth::Authed;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::identity::Identity;
use crate::session::SessionContext;
use crate::utils::clock::Workday;
use crate::utils::export::to_csv;

pub const EXPORT_COLUMNS: [&str; 6] = [
    "Date",
    "Check In",
    "Check Out",
    "Total Hours",
    "Status",
    "Location",
];

#[derive(Serialize, ToSchema)]
pub struct AttendanceView {
    pub checked_in: bool,
    pub today: Option<AttendanceRecord>,
    #[schema(value_type = String, format = "date")]
    pub date: chrono::NaiveDate,
    /// Check-ins after this wall-clock time are late.
    pub late_after: String,
    pub location: String,
    pub loading: bool,
}

pub async fn attendance_view(ctx: &SessionContext, identity: &Identity) -> AttendanceView {
    let today = ctx.attendance.refresh_today(identity).await;
    let workday = ctx.attendance.workday();

    AttendanceView {
        checked_in: ctx.attendance.is_checked_in(),
        today,
        date: ctx.attendance.today_date(),
        late_after: workday.late_after.format("%H:%M").to_string(),
        location: workday.location.clone(),
        loading: ctx.attendance.is_loading(),
    }
}

/// One row of the history table, formatted the way it is displayed and exported.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HistoryRow {
    pub id: String,
    pub date: String,
    pub check_in: String,
    pub check_out: String,
    pub total_hours: String,
    pub status: AttendanceStatus,
    pub location: String,
}

impl HistoryRow {
    pub fn new(record: &AttendanceRecord, workday: &Workday) -> Self {
        Self {
            id: record.id.clone(),
            date: record.date.to_string(),
            check_in: workday.local_time(record.check_in, "%H:%M"),
            check_out: record
                .check_out
                .map(|at| workday.local_time(at, "%H:%M"))
                .unwrap_or_else(|| "-".to_string()),
            total_hours: match record.total_hours {
                Some(h) if h > 0.0 => format!("{h}h"),
                _ => "0h".to_string(),
            },
            status: record.status,
            location: record.location.clone(),
        }
    }

    fn cells(&self) -> Vec<&str> {
        vec![
            self.date.as_str(),
            self.check_in.as_str(),
            self.check_out.as_str(),
            self.total_hours.as_str(),
            self.status.as_ref(),
            self.location.as_str(),
        ]
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Matches a date substring or, case-insensitively, the location.
    pub search: Option<String>,
    /// `present`, `late`, `absent`, `half-day` or `all`.
    pub status: Option<String>,
}

impl HistoryQuery {
    fn keeps(&self, record: &AttendanceRecord) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                record.date.to_string().contains(term)
                    || record.location.to_lowercase().contains(&term.to_lowercase())
            }
        };
        let matches_status = match self.status.as_deref() {
            None | Some("") | Some("all") => true,
            Some(status) => record.status.as_ref() == status,
        };
        matches_search && matches_status
    }
}

pub fn filter_history(records: &[AttendanceRecord], query: &HistoryQuery) -> Vec<AttendanceRecord> {
    records.iter().filter(|r| query.keeps(r)).cloned().collect()
}

#[derive(Debug, PartialEq, Serialize, ToSchema)]
pub struct HistoryStats {
    pub total_days: usize,
    /// Late days count as present.
    pub present_days: usize,
    pub absent_days: usize,
    pub late_days: usize,
    pub total_hours: f64,
    /// Percentage with one decimal, `0.0` without records.
    pub attendance_rate: String,
}

impl HistoryStats {
    pub fn of(records: &[AttendanceRecord]) -> Self {
        let count = |pred: fn(AttendanceStatus) -> bool| {
            records.iter().filter(|r| pred(r.status)).count()
        };
        let total_days = records.len();
        let present_days =
            count(|s| matches!(s, AttendanceStatus::Present | AttendanceStatus::Late));
        let total_hours = records.iter().filter_map(|r| r.total_hours).sum::<f64>();

        let attendance_rate = if total_days == 0 {
            "0.0".to_string()
        } else {
            format!("{:.1}", present_days as f64 / total_days as f64 * 100.0)
        };

        Self {
            total_days,
            present_days,
            absent_days: count(|s| s == AttendanceStatus::Absent),
            late_days: count(|s| s == AttendanceStatus::Late),
            total_hours: (total_hours * 100.0).round() / 100.0,
            attendance_rate,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryView {
    pub records: Vec<HistoryRow>,
    pub stats: HistoryStats,
    /// Set when the filtered table is empty.
    pub empty_message: Option<String>,
    pub loading: bool,
}

pub async fn history_view(
    ctx: &SessionContext,
    identity: &Identity,
    query: &HistoryQuery,
) -> HistoryView {
    let records = ctx.attendance.fetch_history(identity).await;
    let workday = ctx.attendance.workday();
    let filtered = filter_history(&records, query);

    HistoryView {
        empty_message: filtered
            .is_empty()
            .then(|| "No attendance records found".to_string()),
        records: filtered.iter().map(|r| HistoryRow::new(r, workday)).collect(),
        stats: HistoryStats::of(&records),
        loading: ctx.attendance.is_loading(),
    }
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 200, description = "Checked in", body = Object, example = json!({
            "ok": true,
            "data": { "status": "present", "location": "Office" },
            "notifications": [{ "id": 1, "title": "Checked In Successfully", "description": "Welcome! You checked in at 08:30:00", "variant": "default" }]
        })),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Already checked in today", body = Object, example = json!({
            "ok": false,
            "data": null,
            "notifications": [{ "id": 2, "title": "Error", "description": "Already checked in today", "variant": "destructive" }]
        }))
    ),
    tag = "Attendance"
)]
pub async fn check_in(auth: Authed) -> HttpResponse {
    let record = auth.attendance.check_in(&auth.identity).await;
    outcome(&auth, record)
}

/// Check out of today's open record
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out"),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "No active check-in found for today", body = Object, example = json!({
            "ok": false,
            "data": null,
            "notifications": [{ "id": 3, "title": "Error", "description": "No active check-in found for today", "variant": "destructive" }]
        }))
    ),
    tag = "Attendance"
)]
pub async fn check_out(auth: Authed) -> HttpResponse {
    let record = auth.attendance.check_out(&auth.identity).await;
    outcome(&auth, record)
}

/// Download the filtered attendance history as CSV
#[utoipa::path(
    get,
    path = "/api/attendance/history/export",
    params(HistoryQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
        (status = 401, description = "Not signed in"),
        (status = 422, description = "Nothing to export", body = Object, example = json!({
            "ok": false,
            "data": null,
            "notifications": [{ "id": 4, "title": "No Data", "description": "No attendance records to export", "variant": "destructive" }]
        }))
    ),
    tag = "Attendance"
)]
pub async fn export_history(auth: Authed, query: web::Query<HistoryQuery>) -> HttpResponse {
    let records = auth.attendance.fetch_history(&auth.identity).await;
    let filtered = filter_history(&records, &query);

    if filtered.is_empty() {
        auth.notifications
            .error("No Data", "No attendance records to export");
        return outcome::<()>(&auth, None);
    }

    let workday = auth.attendance.workday();
    let rows: Vec<HistoryRow> = filtered.iter().map(|r| HistoryRow::new(r, workday)).collect();
    let cells: Vec<Vec<&str>> = rows.iter().map(HistoryRow::cells).collect();
    let csv = to_csv(&EXPORT_COLUMNS, &cells);

    info!(user_id = %auth.identity.id, rows = rows.len(), "Attendance history exported");
    auth.notifications
        .success("Success", "Attendance history exported successfully");

    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename("attendance-history.csv".to_string())],
        })
        .body(csv)
}
