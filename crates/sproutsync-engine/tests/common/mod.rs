//! In-memory collaborators for engine integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde_json::json;
use sproutsync_core::{
    AnalyticsDataPoint, DateRange, DocumentEntry, Group, GroupId, Profile, ProfileId, TitleMatch,
    SPREADSHEET_MIME_TYPE,
};
use sproutsync_engine::{
    AccessToken, AnalyticsSource, AuthError, BackoffPolicy, CredentialProvider, DocumentStore,
    EngineSettings, IssuedToken, Row, SchedulePolicy, SourceError, StoreError, SyncEngine,
};

pub const FOLDER: &str = "folder-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Rename,
    Move,
    ListSubsections,
    AddSubsection,
    Write,
}

#[derive(Debug, Clone)]
pub struct StoredDoc {
    pub id: String,
    pub name: String,
    pub parents: Vec<String>,
    pub mime_type: String,
    pub trashed: bool,
    pub modified_tick: i64,
    pub subsections: BTreeMap<String, Vec<Row>>,
}

struct Scripted {
    op: Op,
    /// Sub-section name the failure is limited to, if any.
    target: Option<String>,
    error: StoreError,
    remaining: u32,
}

#[derive(Default)]
struct StoreState {
    docs: Vec<StoredDoc>,
    next_id: u32,
    tick: i64,
    scripted: Vec<Scripted>,
    calls: Vec<(Op, Option<String>)>,
}

/// A single-folder document store kept in memory.
///
/// Trashed documents are returned by listings so the locator's own filtering
/// is exercised. Each mutation advances a logical modified clock.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `times` calls of `op` fail with `error`.
    pub fn fail(&self, op: Op, error: StoreError, times: u32) {
        self.push_failure(op, None, error, times);
    }

    /// Like [`fail`](Self::fail) but only for calls naming `subsection`.
    pub fn fail_subsection(&self, op: Op, subsection: &str, error: StoreError, times: u32) {
        self.push_failure(op, Some(subsection.to_owned()), error, times);
    }

    fn push_failure(&self, op: Op, target: Option<String>, error: StoreError, times: u32) {
        self.state.lock().unwrap().scripted.push(Scripted {
            op,
            target,
            error,
            remaining: times,
        });
    }

    /// Adds a document directly, bypassing the engine.
    pub fn seed(&self, name: &str, trashed: bool, subsections: &[&str]) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state.tick += 1;
        let id = format!("seeded-{}", state.next_id);
        let doc = StoredDoc {
            id: id.clone(),
            name: name.to_owned(),
            parents: vec![FOLDER.to_owned()],
            mime_type: SPREADSHEET_MIME_TYPE.to_owned(),
            trashed,
            modified_tick: state.tick,
            subsections: subsections
                .iter()
                .map(|s| ((*s).to_owned(), Vec::new()))
                .collect(),
        };
        state.docs.push(doc);
        id
    }

    pub fn documents(&self) -> Vec<StoredDoc> {
        self.state.lock().unwrap().docs.clone()
    }

    /// Live spreadsheets in the folder whose name contains `pattern`.
    pub fn live_matches(&self, pattern: &str) -> Vec<StoredDoc> {
        self.documents()
            .into_iter()
            .filter(|d| !d.trashed && d.parents.iter().any(|p| p == FOLDER))
            .filter(|d| d.name.contains(pattern))
            .collect()
    }

    pub fn document(&self, id: &str) -> Option<StoredDoc> {
        self.documents().into_iter().find(|d| d.id == id)
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(o, _)| *o == op)
            .count()
    }

    pub fn calls_for(&self, op: Op, subsection: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(o, target)| *o == op && target.as_deref() == Some(subsection))
            .count()
    }

    fn enter(&self, op: Op, target: Option<&str>) -> Result<std::sync::MutexGuard<'_, StoreState>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((op, target.map(str::to_owned)));
        let scripted = state.scripted.iter_mut().find(|s| {
            s.op == op
                && s.remaining > 0
                && (s.target.is_none() || s.target.as_deref() == target)
        });
        if let Some(s) = scripted {
            s.remaining -= 1;
            return Err(s.error.clone());
        }
        Ok(state)
    }
}

fn modified_at(tick: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(tick)
}

fn not_found(id: &str) -> StoreError {
    StoreError::Status {
        status: 404,
        message: format!("File not found: {id}"),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_documents(
        &self,
        _token: &AccessToken,
        container_id: &str,
        name_pattern: &str,
    ) -> Result<Vec<DocumentEntry>, StoreError> {
        let state = self.enter(Op::List, None)?;
        Ok(state
            .docs
            .iter()
            .filter(|d| d.parents.iter().any(|p| p == container_id))
            .filter(|d| d.name.contains(name_pattern))
            .map(|d| DocumentEntry {
                id: d.id.clone(),
                name: d.name.clone(),
                modified_time: modified_at(d.modified_tick),
                mime_type: d.mime_type.clone(),
                trashed: d.trashed,
            })
            .collect())
    }

    async fn create_document(
        &self,
        _token: &AccessToken,
        title: &str,
        subsections: &[&str],
    ) -> Result<String, StoreError> {
        let mut state = self.enter(Op::Create, None)?;
        state.next_id += 1;
        state.tick += 1;
        let id = format!("doc-{}", state.next_id);
        let doc = StoredDoc {
            id: id.clone(),
            name: title.to_owned(),
            parents: vec!["root".to_owned()],
            mime_type: SPREADSHEET_MIME_TYPE.to_owned(),
            trashed: false,
            modified_tick: state.tick,
            subsections: if subsections.is_empty() {
                BTreeMap::from([("Sheet1".to_owned(), Vec::new())])
            } else {
                subsections
                    .iter()
                    .map(|s| ((*s).to_owned(), Vec::new()))
                    .collect()
            },
        };
        state.docs.push(doc);
        Ok(id)
    }

    async fn rename_document(
        &self,
        _token: &AccessToken,
        document_id: &str,
        new_title: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.enter(Op::Rename, None)?;
        state.tick += 1;
        let tick = state.tick;
        let doc = state
            .docs
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found(document_id))?;
        doc.name = new_title.to_owned();
        doc.modified_tick = tick;
        Ok(())
    }

    async fn move_document(
        &self,
        _token: &AccessToken,
        document_id: &str,
        container_id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.enter(Op::Move, None)?;
        let doc = state
            .docs
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found(document_id))?;
        doc.parents = vec![container_id.to_owned()];
        Ok(())
    }

    async fn list_subsections(
        &self,
        _token: &AccessToken,
        document_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let state = self.enter(Op::ListSubsections, None)?;
        let doc = state
            .docs
            .iter()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found(document_id))?;
        Ok(doc.subsections.keys().cloned().collect())
    }

    async fn add_subsection(
        &self,
        _token: &AccessToken,
        document_id: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.enter(Op::AddSubsection, Some(name))?;
        let doc = state
            .docs
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found(document_id))?;
        if doc.subsections.contains_key(name) {
            return Err(StoreError::Status {
                status: 400,
                message: format!(
                    "Invalid requests[0].addSheet: A sheet with the name \"{name}\" already exists."
                ),
            });
        }
        doc.subsections.insert(name.to_owned(), Vec::new());
        Ok(())
    }

    async fn write_rows(
        &self,
        _token: &AccessToken,
        document_id: &str,
        subsection: &str,
        rows: &[Row],
    ) -> Result<(), StoreError> {
        let mut state = self.enter(Op::Write, Some(subsection))?;
        state.tick += 1;
        let tick = state.tick;
        let doc = state
            .docs
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| not_found(document_id))?;
        let Some(target) = doc.subsections.get_mut(subsection) else {
            return Err(StoreError::Status {
                status: 400,
                message: format!("Unable to parse range: '{subsection}'!A1"),
            });
        };
        *target = rows.to_vec();
        doc.modified_tick = tick;
        Ok(())
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("memory://spreadsheets/{document_id}")
    }
}

/// Issues tokens and counts how often it was asked.
///
/// Tokens last until 2100 unless built with [`short_lived`](Self::short_lived).
#[derive(Default)]
pub struct CountingProvider {
    pub authorize_calls: AtomicU32,
    pub reauthorize_calls: AtomicU32,
    lifetime: Option<chrono::Duration>,
    reauthorize_fails: AtomicBool,
}

impl CountingProvider {
    /// Tokens expire `lifetime` after they are issued.
    pub fn short_lived(lifetime: chrono::Duration) -> Self {
        Self {
            lifetime: Some(lifetime),
            ..Self::default()
        }
    }

    /// Every later `reauthorize` call is rejected.
    pub fn fail_reauthorize(self) -> Self {
        self.reauthorize_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn authorizations(&self) -> u32 {
        self.authorize_calls.load(Ordering::SeqCst)
    }

    pub fn reauthorizations(&self) -> u32 {
        self.reauthorize_calls.load(Ordering::SeqCst)
    }

    fn expiry(&self) -> DateTime<Utc> {
        match self.lifetime {
            Some(lifetime) => Utc::now() + lifetime,
            None => Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap(),
        }
    }
}

#[async_trait]
impl CredentialProvider for CountingProvider {
    async fn authorize(&self) -> Result<IssuedToken, AuthError> {
        let n = self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(IssuedToken {
            access_token: AccessToken::new(format!("token-{n}")),
            expires_at: self.expiry(),
        })
    }

    async fn reauthorize(&self) -> Result<IssuedToken, AuthError> {
        let n = self.reauthorize_calls.fetch_add(1, Ordering::SeqCst);
        if self.reauthorize_fails.load(Ordering::SeqCst) {
            return Err(AuthError::Rejected(
                "invalid_grant: Token has been expired or revoked.".to_owned(),
            ));
        }
        Ok(IssuedToken {
            access_token: AccessToken::new(format!("refreshed-{n}")),
            expires_at: self.expiry(),
        })
    }
}

/// Fixed groups, profiles and data points.
#[derive(Default)]
pub struct ScriptedSource {
    pub groups: Vec<Group>,
    pub profiles: Vec<Profile>,
    pub points: Vec<AnalyticsDataPoint>,
    pub fail_groups: bool,
    pub analytics_calls: AtomicU32,
}

#[async_trait]
impl AnalyticsSource for ScriptedSource {
    async fn fetch_groups(&self) -> Result<Vec<Group>, SourceError> {
        if self.fail_groups {
            return Err(SourceError::Request("HTTP 503: upstream unavailable".to_owned()));
        }
        Ok(self.groups.clone())
    }

    async fn fetch_profiles(&self) -> Result<Vec<Profile>, SourceError> {
        Ok(self.profiles.clone())
    }

    async fn fetch_analytics(
        &self,
        profile_ids: &[ProfileId],
        range: DateRange,
    ) -> Result<Vec<AnalyticsDataPoint>, SourceError> {
        self.analytics_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .points
            .iter()
            .filter(|p| profile_ids.contains(&p.profile_id) && range.contains(p.reporting_date))
            .cloned()
            .collect())
    }
}

pub fn group(id: GroupId, name: &str) -> Group {
    Group {
        id,
        name: name.to_owned(),
    }
}

pub fn profile(id: ProfileId, network_type: &str, group_ids: &[GroupId]) -> Profile {
    Profile {
        id,
        display_name: format!("profile-{id}"),
        network_type: network_type.to_owned(),
        group_ids: group_ids.to_vec(),
    }
}

pub fn point(profile_id: ProfileId, date: NaiveDate, impressions: i64) -> AnalyticsDataPoint {
    AnalyticsDataPoint {
        profile_id,
        reporting_date: date,
        metrics: json!({ "impressions": impressions, "lifetime_snapshot.followers_count": 10 }),
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Zero back-off delays and no inter-group pause.
pub fn settings() -> EngineSettings {
    EngineSettings {
        container_id: FOLDER.to_owned(),
        title_prefix: "Sprout Analytics".to_owned(),
        title_match: TitleMatch::Anchored,
        title_offset: FixedOffset::east_opt(0).unwrap(),
        backoff: BackoffPolicy {
            max_retries: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        },
        schedule: SchedulePolicy::disabled(),
        refresh_threshold: Duration::from_secs(300),
        lookback_days: 30,
    }
}

pub type TestEngine = SyncEngine<ScriptedSource, InMemoryStore, CountingProvider>;

pub fn engine(source: ScriptedSource) -> TestEngine {
    engine_with(source, settings())
}

pub fn engine_with(source: ScriptedSource, settings: EngineSettings) -> TestEngine {
    SyncEngine::new(source, InMemoryStore::new(), CountingProvider::default(), settings)
}

pub fn engine_with_provider(source: ScriptedSource, provider: CountingProvider) -> TestEngine {
    SyncEngine::new(source, InMemoryStore::new(), provider, settings())
}

pub fn quota_error() -> StoreError {
    StoreError::Status {
        status: 429,
        message: "Quota exceeded for quota metric 'Write requests'".to_owned(),
    }
}

pub fn server_error() -> StoreError {
    StoreError::Status {
        status: 500,
        message: "Internal error encountered.".to_owned(),
    }
}

pub fn auth_error() -> StoreError {
    StoreError::Status {
        status: 401,
        message: "Request had invalid authentication credentials.".to_owned(),
    }
}
