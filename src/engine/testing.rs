//! In-memory collaborators for engine and handler tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use super::error::StoreError;
use super::session::{AttendanceService, SweepPolicy};
use super::store::{AchievementCheck, Clock, RecordStore};
use crate::model::attendance::{AttendanceRecord, RecordId, SessionState};

/// 2025-01-08, a Wednesday.
pub fn wed() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 8).unwrap()
}

pub fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, 0).unwrap()
}

pub struct ManualClock(Mutex<NaiveDateTime>);

impl ManualClock {
    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
struct MemoryInner {
    records: Vec<AttendanceRecord>,
    next_id: RecordId,
    failing_marks: HashSet<RecordId>,
    pending_race: Option<(String, NaiveDateTime)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn insert(&self, mut record: AttendanceRecord) -> RecordId {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        record.record_id = inner.next_id;
        inner.records.push(record);
        inner.next_id
    }

    pub fn get(&self, record_id: RecordId) -> AttendanceRecord {
        let inner = self.inner.lock().unwrap();
        inner
            .records
            .iter()
            .find(|r| r.record_id == record_id)
            .cloned()
            .expect("record exists")
    }

    pub fn all(&self) -> Vec<AttendanceRecord> {
        self.inner.lock().unwrap().records.clone()
    }

    pub fn force_state(&self, record_id: RecordId, state: SessionState) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(r) = inner.records.iter_mut().find(|r| r.record_id == record_id) {
            r.state = state;
        }
    }

    pub fn open_count(&self, student_id: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .records
            .iter()
            .filter(|r| r.student_id == student_id && r.state == SessionState::Open)
            .count()
    }

    pub fn fail_mark(&self, record_id: RecordId) {
        self.inner.lock().unwrap().failing_marks.insert(record_id);
    }

    pub fn heal_marks(&self) {
        self.inner.lock().unwrap().failing_marks.clear();
    }

    /// The next `find_open_session` for `student_id` misses, while a competing
    /// request inserts an open session clocked in at `clock_in`.
    pub fn race_open_on_next_find(&self, student_id: &str, clock_in: NaiveDateTime) {
        self.inner.lock().unwrap().pending_race = Some((student_id.to_string(), clock_in));
    }
}

fn newest_first(records: &mut [AttendanceRecord]) {
    records.sort_by(|a, b| {
        b.work_date
            .cmp(&a.work_date)
            .then(b.clock_in.cmp(&a.clock_in))
    });
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_open_session(
        &self,
        student_id: &str,
        work_date: NaiveDate,
        clock_in: NaiveDateTime,
    ) -> Result<RecordId, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .records
            .iter()
            .any(|r| r.student_id == student_id && r.state == SessionState::Open)
        {
            return Err(StoreError::Conflict);
        }
        inner.next_id += 1;
        let record_id = inner.next_id;
        inner.records.push(AttendanceRecord {
            record_id,
            student_id: student_id.to_string(),
            work_date,
            clock_in,
            clock_out: None,
            work_minutes: None,
            state: SessionState::Open,
        });
        Ok(record_id)
    }

    async fn find_open_session(
        &self,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some((racer, clock_in)) = inner.pending_race.take() {
            if racer == student_id {
                inner.next_id += 1;
                let record_id = inner.next_id;
                inner.records.push(AttendanceRecord {
                    record_id,
                    student_id: racer,
                    work_date: clock_in.date(),
                    clock_in,
                    clock_out: None,
                    work_minutes: None,
                    state: SessionState::Open,
                });
                return Ok(None);
            }
            inner.pending_race = Some((racer, clock_in));
        }
        let mut open: Vec<_> = inner
            .records
            .iter()
            .filter(|r| r.student_id == student_id && r.state == SessionState::Open)
            .cloned()
            .collect();
        newest_first(&mut open);
        Ok(open.into_iter().next())
    }

    async fn close_session(
        &self,
        record_id: RecordId,
        clock_out: NaiveDateTime,
        work_minutes: i64,
        _overtime_minutes: i64,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .records
            .iter_mut()
            .find(|r| r.record_id == record_id && r.state != SessionState::Closed)
        {
            Some(r) => {
                r.clock_out = Some(clock_out);
                r.work_minutes = Some(work_minutes);
                r.state = SessionState::Closed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_abandoned(&self, record_id: RecordId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_marks.contains(&record_id) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        match inner
            .records
            .iter_mut()
            .find(|r| r.record_id == record_id && r.state == SessionState::Open)
        {
            Some(r) => {
                r.state = SessionState::Abandoned;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_record(
        &self,
        record_id: RecordId,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .iter()
            .find(|r| r.record_id == record_id && r.student_id == student_id)
            .cloned())
    }

    async fn scan_open_older_than(
        &self,
        cutoff: NaiveDateTime,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut page: Vec<_> = inner
            .records
            .iter()
            .filter(|r| r.state == SessionState::Open && r.clock_in < cutoff)
            .filter(|r| after.is_none_or(|a| r.record_id > a))
            .cloned()
            .collect();
        page.sort_by_key(|r| r.record_id);
        page.truncate(limit);
        Ok(page)
    }

    async fn latest_record(
        &self,
        student_id: &str,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut mine: Vec<_> = self
            .all()
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect();
        newest_first(&mut mine);
        Ok(mine.into_iter().next())
    }

    async fn find_abandoned(&self, student_id: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut mine: Vec<_> = self
            .all()
            .into_iter()
            .filter(|r| r.student_id == student_id && r.state == SessionState::Abandoned)
            .collect();
        newest_first(&mut mine);
        Ok(mine)
    }

    async fn list_records(
        &self,
        student_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut mine: Vec<_> = self
            .all()
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .filter(|r| from.is_none_or(|f| r.work_date >= f))
            .filter(|r| to.is_none_or(|t| r.work_date <= t))
            .collect();
        newest_first(&mut mine);
        Ok(mine)
    }
}

/// Hands out queued grants once and records who was checked.
pub struct RecordingAchievements {
    calls: Mutex<Vec<String>>,
    pending: Mutex<Vec<u32>>,
    failing: Mutex<bool>,
}

impl RecordingAchievements {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl AchievementCheck for RecordingAchievements {
    async fn check_and_grant(&self, student_id: &str) -> Result<Vec<u32>, StoreError> {
        self.calls.lock().unwrap().push(student_id.to_string());
        if *self.failing.lock().unwrap() {
            return Err(StoreError::Unavailable("achievement store down".into()));
        }
        Ok(std::mem::take(&mut *self.pending.lock().unwrap()))
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub achievements: Arc<RecordingAchievements>,
}

impl Harness {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            clock: Arc::new(ManualClock(Mutex::new(now))),
            achievements: Arc::new(RecordingAchievements {
                calls: Mutex::new(Vec::new()),
                pending: Mutex::new(vec![1]),
                failing: Mutex::new(false),
            }),
        }
    }

    pub fn service(&self) -> AttendanceService {
        self.service_with(SweepPolicy::default())
    }

    pub fn service_with(&self, sweep: SweepPolicy) -> AttendanceService {
        AttendanceService::new(
            self.store.clone(),
            self.clock.clone(),
            self.achievements.clone(),
            sweep,
        )
    }
}
