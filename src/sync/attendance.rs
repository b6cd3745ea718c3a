use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::backend::{DataService, Query, Row, Table, decode_rows};
use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, worked_hours};
use crate::model::identity::Identity;
use crate::sync::Loading;
use crate::sync::notify::Notifications;
use crate::utils::clock::{Clock, Workday};

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub struct AttendanceSync {
    data: Arc<dyn DataService>,
    clock: Arc<dyn Clock>,
    workday: Workday,
    notes: Arc<Notifications>,
    loading: Loading,
    today: RwLock<Option<AttendanceRecord>>,
    history: RwLock<Vec<AttendanceRecord>>,
}

impl AttendanceSync {
    pub fn new(
        data: Arc<dyn DataService>,
        clock: Arc<dyn Clock>,
        workday: Workday,
        notes: Arc<Notifications>,
    ) -> Self {
        Self {
            data,
            clock,
            workday,
            notes,
            loading: Loading::default(),
            today: RwLock::new(None),
            history: RwLock::new(Vec::new()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    pub fn today(&self) -> Option<AttendanceRecord> {
        self.today.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn is_checked_in(&self) -> bool {
        self.today().is_some_and(|r| r.is_open())
    }

    pub fn history(&self) -> Vec<AttendanceRecord> {
        self.history.read().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn today_date(&self) -> NaiveDate {
        self.workday.date_of(self.clock.now())
    }

    pub fn workday(&self) -> &Workday {
        &self.workday
    }

    pub fn clear(&self) {
        self.store_today(None);
        if let Ok(mut history) = self.history.write() {
            history.clear();
        }
    }

    fn store_today(&self, record: Option<AttendanceRecord>) {
        if let Ok(mut today) = self.today.write() {
            *today = record;
        }
    }

    async fn load_one(&self, query: Query) -> Result<Option<AttendanceRecord>, AppError> {
        let rows = self.data.select(Table::Attendance, &query.limit(1)).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(AttendanceRecord::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn load_day(
        &self,
        identity: &Identity,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, AppError> {
        self.load_one(
            Query::new()
                .eq("user_id", identity.id.as_str())
                .eq("date", date.to_string()),
        )
        .await
    }

    /// Reloads today's record. Failures are logged only; the cache keeps its last value.
    pub async fn refresh_today(&self, identity: &Identity) -> Option<AttendanceRecord> {
        let _loading = self.loading.begin();
        match self.load_day(identity, self.today_date()).await {
            Ok(record) => {
                self.store_today(record.clone());
                record
            }
            Err(e) => {
                error!(error = %e, user_id = %identity.id, "Error checking today's attendance");
                self.today()
            }
        }
    }

    pub async fn check_in(&self, identity: &Identity) -> Option<AttendanceRecord> {
        match self.try_check_in(identity).await {
            Ok(record) => Some(record),
            Err(e) => {
                error!(error = %e, user_id = %identity.id, "Check-in failed");
                self.notes.failure(&e, "Failed to check in");
                None
            }
        }
    }

    async fn try_check_in(&self, identity: &Identity) -> Result<AttendanceRecord, AppError> {
        let _loading = self.loading.begin_exclusive("Check-in")?;

        let now = self.clock.now();
        let date = self.workday.date_of(now);

        if let Some(existing) = self.load_day(identity, date).await? {
            let open = existing.is_open();
            self.store_today(Some(existing));
            return Err(AppError::Conflict(if open {
                "Already checked in today".to_string()
            } else {
                "Attendance already recorded for today".to_string()
            }));
        }

        let status = self.workday.status_at(now);
        let row = object(json!({
            "user_id": identity.id,
            "check_in": timestamp(now),
            "check_out": null,
            "date": date.to_string(),
            "status": status,
            "location": self.workday.location,
            "total_hours": null,
        }));
        let inserted = AttendanceRecord::try_from(self.data.insert(Table::Attendance, row).await?)?;

        let record = self
            .load_one(Query::new().eq("id", inserted.id.as_str()))
            .await?
            .ok_or(AppError::NotFound("Attendance record"))?;
        self.store_today(Some(record.clone()));

        info!(user_id = %identity.id, %date, status = %record.status, "Checked in");
        self.notes.success(
            "Checked In Successfully",
            format!(
                "Welcome! You checked in at {}",
                self.workday.local_time(now, "%H:%M:%S")
            ),
        );
        Ok(record)
    }

    pub async fn check_out(&self, identity: &Identity) -> Option<AttendanceRecord> {
        match self.try_check_out(identity).await {
            Ok(record) => Some(record),
            Err(e) => {
                error!(error = %e, user_id = %identity.id, "Check-out failed");
                self.notes.failure(&e, "Failed to check out");
                None
            }
        }
    }

    async fn try_check_out(&self, identity: &Identity) -> Result<AttendanceRecord, AppError> {
        let _loading = self.loading.begin_exclusive("Check-out")?;

        // A shift that crossed midnight is still closed against the record it opened.
        let open = match self.today().filter(|r| r.is_open() && r.user_id == identity.id) {
            Some(record) => Some(record),
            None => self.load_day(identity, self.today_date()).await?,
        }
        .filter(|r| r.is_open())
        .ok_or_else(|| AppError::Conflict("No active check-in found for today".to_string()))?;

        let check_out = self.clock.now().max(open.check_in);
        let total_hours = worked_hours(open.check_in, check_out);

        self.data
            .update(
                Table::Attendance,
                &Query::new().eq("id", open.id.as_str()),
                object(json!({
                    "check_out": timestamp(check_out),
                    "total_hours": total_hours,
                })),
            )
            .await?;

        let record = self
            .load_one(Query::new().eq("id", open.id.as_str()))
            .await?
            .ok_or(AppError::NotFound("Attendance record"))?;
        self.store_today(Some(record.clone()));

        info!(user_id = %identity.id, total_hours, "Checked out");
        self.notes.success(
            "Checked Out Successfully",
            format!("You worked {total_hours} hours today"),
        );
        Ok(record)
    }

    /// All of the identity's records, newest date first.
    pub async fn fetch_history(&self, identity: &Identity) -> Vec<AttendanceRecord> {
        let _loading = self.loading.begin();
        let query = Query::new()
            .eq("user_id", identity.id.as_str())
            .order_desc("date");

        match self.data.select(Table::Attendance, &query).await {
            Ok(rows) => {
                let records: Vec<AttendanceRecord> = decode_rows(rows);
                if let Ok(mut history) = self.history.write() {
                    *history = records.clone();
                }
                records
            }
            Err(e) => {
                error!(error = %e, user_id = %identity.id, "Failed to fetch attendance history");
                self.notes
                    .failure(&AppError::from(e), "Failed to fetch attendance history");
                self.history()
            }
        }
    }
}
