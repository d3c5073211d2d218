//! Sync engine
//!
//! Keeps the in-memory record set consistent with the shared store. A cycle
//! pulls the remote snapshot, drops tombstoned records, sets malformed ones
//! aside, skips work when the snapshot fingerprint is unchanged, collapses
//! duplicates, and replaces the cache. Local mutations are written to the
//! durable copy first and then pushed best-effort; a failed push leaves a
//! manual export behind. Entries set aside are appended to every push
//! unchanged, so this client never erases what it cannot read.
//!
//! The record store and ledger sit behind a synchronous mutex that is never
//! held across an `.await`. Only one cycle runs at a time and pushes are
//! serialized.

mod runner;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::conflict::{format_conflict_message, ConflictDetector};
use crate::db::LocalSlots;
use crate::dedup::{dedupe, find_duplicate_groups, DuplicateGroup};
use crate::error::{Error, Result};
use crate::export::{manual_export, shared_payload, ManualExport};
use crate::integrity::{inspect_snapshot, IntegrityIssue};
use crate::ledger::TombstoneLedger;
use crate::models::{Conflict, LeaveRecord, RecordId, Tombstone, TombstoneDocument};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use crate::state::{SyncPhase, SyncState};
use crate::store::RecordStore;
use crate::util::local_today;
use crate::validation::{LeaveRequest, ValidationError};

pub use runner::{activity_channel, run_periodic, ActivityHandle};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Timing knobs for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub pull_timeout: Duration,
    pub push_timeout: Duration,
    pub refresh_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            pull_timeout: Duration::from_secs(8),
            push_timeout: Duration::from_secs(8),
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Cheap change detector for pulled snapshots.
///
/// Two snapshots with the same size and the same last id compare equal even
/// when their contents differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub count: usize,
    pub last_id: Option<RecordId>,
}

impl Fingerprint {
    #[must_use]
    pub fn of(records: &[LeaveRecord]) -> Self {
        Self {
            count: records.len(),
            last_id: records.last().map(|record| record.id),
        }
    }
}

/// Why the engine is running on possibly stale or unshared data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedNotice {
    PullFailed { reason: String },
    PushFailed { reason: String },
    TombstonePushFailed { reason: String },
    LocalCopyFailed { reason: String },
}

impl fmt::Display for DegradedNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullFailed { reason } => write!(
                f,
                "Could not load shared records, showing the last known copy: {reason}"
            ),
            Self::PushFailed { reason } => write!(
                f,
                "Could not update shared records, change kept locally: {reason}"
            ),
            Self::TombstonePushFailed { reason } => {
                write!(f, "Could not share the deletion: {reason}")
            }
            Self::LocalCopyFailed { reason } => {
                write!(f, "Could not write the local copy: {reason}")
            }
        }
    }
}

/// Notifications for whoever presents the records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    StatusChanged { phase: SyncPhase, state: SyncState },
    RecordsChanged { count: usize },
    Degraded(DegradedNotice),
    IntegrityIssues(Vec<IntegrityIssue>),
}

/// Result of a best-effort push of the record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Synced,
    /// The change lives only in this client. `export` is a replacement
    /// `data.json` the operator can place by hand.
    Failed {
        reason: String,
        export: Option<ManualExport>,
    },
}

impl PushOutcome {
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

/// What a reconciled cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Entries in the pulled array, valid or not
    pub pulled: usize,
    /// Pulled records dropped because their id is tombstoned
    pub tombstoned: usize,
    /// Ids newly learned from the shared tombstone document
    pub tombstones_learned: usize,
    pub duplicates_removed: Vec<RecordId>,
    pub integrity_issues: Vec<IntegrityIssue>,
    pub record_count: usize,
    /// Set when duplicates were removed and the result had to be pushed
    pub push: Option<PushOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another cycle was already running
    Skipped,
    PullFailed { reason: String },
    /// Fingerprint matched the previous snapshot
    Unchanged,
    /// A local mutation landed while pulling; the snapshot was discarded
    Stale,
    Reconciled(ReconcileReport),
}

/// How the submission path treats overlapping records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPolicy {
    #[default]
    RejectConflicts,
    AllowConflicts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Added {
        record: LeaveRecord,
        push: PushOutcome,
    },
    Blocked {
        conflicts: Vec<Conflict>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// The removed record, `None` if the id was not in the store
    pub removed: Option<LeaveRecord>,
    /// Both the local ledger copy and the shared tombstone document were
    /// written
    pub tombstone_persisted: bool,
    pub push: PushOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub before: usize,
    pub removed: Vec<RecordId>,
    pub after: usize,
    pub push: Option<PushOutcome>,
}

#[derive(Debug, Default)]
struct Session {
    store: RecordStore,
    ledger: TombstoneLedger,
    /// Pulled entries that failed the integrity check, as pulled
    unreadable: Vec<Value>,
    /// Last reported phase
    phase: SyncPhase,
    /// What the running cycle is doing, `Idle` when none is
    cycle_phase: SyncPhase,
    pushes: usize,
    state: SyncState,
    last_fingerprint: Option<Fingerprint>,
    /// The last push failed; the store holds changes the remote lacks
    pending_push: bool,
    /// Bumped by every local mutation
    generation: u64,
}

impl Session {
    /// Recompute the reported phase, returning the event to emit when it
    /// changed
    fn refresh_phase(&mut self) -> Option<SyncEvent> {
        let phase = if self.pushes > 0 {
            SyncPhase::Pushing
        } else {
            self.cycle_phase
        };
        if self.phase == phase {
            return None;
        }
        self.phase = phase;
        Some(SyncEvent::StatusChanged {
            phase,
            state: self.state,
        })
    }
}

fn update_phase(
    session: &Mutex<Session>,
    events: &broadcast::Sender<SyncEvent>,
    update: impl FnOnce(&mut Session),
) {
    let event = {
        let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut session);
        session.refresh_phase()
    };
    if let Some(event) = event {
        let _ = events.send(event);
    }
}

enum Admission {
    Added {
        record: LeaveRecord,
        snapshot: Vec<LeaveRecord>,
    },
    Blocked(Vec<Conflict>),
}

enum Reconciled {
    Stale {
        pending_push: bool,
    },
    Unchanged {
        /// Store to push again because the last push failed
        retry: Option<Vec<LeaveRecord>>,
        /// New set of unreadable entries to write to the durable copy
        unreadable: Option<Vec<Value>>,
    },
    Replaced {
        snapshot: Vec<LeaveRecord>,
        ledger: TombstoneDocument,
        report: ReconcileReport,
    },
}

/// Marks a cycle in flight; released on completion, error or drop
struct CycleGuard<'a> {
    in_flight: &'a AtomicBool,
    session: &'a Mutex<Session>,
    events: &'a broadcast::Sender<SyncEvent>,
}

impl<'a> CycleGuard<'a> {
    fn acquire(
        in_flight: &'a AtomicBool,
        session: &'a Mutex<Session>,
        events: &'a broadcast::Sender<SyncEvent>,
    ) -> Option<Self> {
        in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            in_flight,
            session,
            events,
        })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        update_phase(self.session, self.events, |session| {
            session.cycle_phase = SyncPhase::Idle;
        });
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Reports `Pushing` while alive, whatever the cycle is doing
struct PushGuard<'a> {
    session: &'a Mutex<Session>,
    events: &'a broadcast::Sender<SyncEvent>,
}

impl<'a> PushGuard<'a> {
    fn enter(session: &'a Mutex<Session>, events: &'a broadcast::Sender<SyncEvent>) -> Self {
        update_phase(session, events, |session| session.pushes += 1);
        Self { session, events }
    }
}

impl Drop for PushGuard<'_> {
    fn drop(&mut self) {
        update_phase(self.session, self.events, |session| {
            session.pushes = session.pushes.saturating_sub(1);
        });
    }
}

async fn within<T>(
    limit: Duration,
    request: impl Future<Output = RemoteResult<T>>,
) -> RemoteResult<T> {
    tokio::time::timeout(limit, request)
        .await
        .map_err(|_| RemoteError::Timeout(limit))?
}

/// Reconciles one client's records with the shared store
pub struct SyncEngine<R, S> {
    remote: R,
    slots: S,
    settings: SyncSettings,
    session: Mutex<Session>,
    in_flight: AtomicBool,
    push_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SyncEvent>,
}

impl<R: RemoteStore, S: LocalSlots> SyncEngine<R, S> {
    pub fn new(remote: R, slots: S, settings: SyncSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            remote,
            slots,
            settings,
            session: Mutex::new(Session::default()),
            in_flight: AtomicBool::new(false),
            push_lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn slots(&self) -> &S {
        &self.slots
    }

    pub const fn settings(&self) -> SyncSettings {
        self.settings
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_cycle_phase(&self, phase: SyncPhase) {
        update_phase(&self.session, &self.events, |session| {
            session.cycle_phase = phase;
        });
    }

    fn set_state(&self, state: SyncState) {
        let (previous, phase) = self.with_session(|session| {
            let previous = std::mem::replace(&mut session.state, state);
            (previous, session.phase)
        });
        if previous != state {
            tracing::info!("Sync state changed: {previous} -> {state}");
            self.emit(SyncEvent::StatusChanged { phase, state });
        }
    }

    fn degrade(&self, error: &RemoteError, notice: DegradedNotice) {
        if matches!(error, RemoteError::NotConfigured) {
            tracing::debug!("{notice}");
            return;
        }
        tracing::warn!("{notice}");
        self.set_state(SyncState::Degraded);
        self.emit(SyncEvent::Degraded(notice));
    }

    // -- read side --------------------------------------------------------

    #[must_use]
    pub fn records(&self) -> Vec<LeaveRecord> {
        self.with_session(|session| session.store.all().to_vec())
    }

    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<LeaveRecord> {
        self.with_session(|session| session.store.get(id).cloned())
    }

    #[must_use]
    pub fn by_date(&self, date: NaiveDate) -> Vec<LeaveRecord> {
        self.with_session(|session| session.store.by_date(date).into_iter().cloned().collect())
    }

    #[must_use]
    pub fn by_month(&self, year: i32, month: u32) -> Vec<LeaveRecord> {
        self.with_session(|session| {
            session
                .store
                .by_month(year, month)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    #[must_use]
    pub fn subjects(&self) -> Vec<String> {
        self.with_session(|session| {
            session
                .store
                .subjects()
                .into_iter()
                .map(ToString::to_string)
                .collect()
        })
    }

    #[must_use]
    pub fn conflicts(
        &self,
        subject: &str,
        start: NaiveDate,
        end: NaiveDate,
        exclude: Option<RecordId>,
    ) -> Vec<Conflict> {
        self.with_session(|session| {
            ConflictDetector::new(&session.store).conflicts(subject, start, end, exclude)
        })
    }

    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        self.with_session(|session| find_duplicate_groups(session.store.all()))
    }

    #[must_use]
    pub fn tombstones(&self) -> Vec<Tombstone> {
        self.with_session(|session| session.ledger.tombstones().collect())
    }

    #[must_use]
    pub fn is_deleted(&self, id: RecordId) -> bool {
        self.with_session(|session| session.ledger.is_deleted(id))
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.with_session(|session| session.phase)
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.with_session(|session| session.state)
    }

    #[must_use]
    pub fn last_fingerprint(&self) -> Option<Fingerprint> {
        self.with_session(|session| session.last_fingerprint)
    }

    /// Pulled entries that failed the integrity check. They are written back
    /// with every push.
    #[must_use]
    pub fn unreadable_entries(&self) -> Vec<Value> {
        self.with_session(|session| session.unreadable.clone())
    }

    /// The last push failed and the shared store is behind this client
    #[must_use]
    pub fn has_pending_push(&self) -> bool {
        self.with_session(|session| session.pending_push)
    }

    /// Manual export of everything this client would push
    pub fn manual_export(&self) -> Result<ManualExport> {
        let (records, unreadable) =
            self.with_session(|session| (session.store.all().to_vec(), session.unreadable.clone()));
        Ok(manual_export(&records, &unreadable)?)
    }

    // -- startup ----------------------------------------------------------

    /// Restore records and tombstones from the durable copy.
    ///
    /// A missing copy leaves the store empty. Returns the number of records
    /// loaded.
    pub async fn load_local(&self) -> Result<usize> {
        let records = self.slots.load_records().await?.unwrap_or_default();
        let tombstones = self.slots.load_tombstones().await?;
        let unreadable = self.slots.load_unreadable().await?;

        let count = self.with_session(|session| {
            if let Some(document) = &tombstones {
                session.ledger.merge_remote(document);
            }
            session.unreadable = unreadable
                .into_iter()
                .filter(|entry| !is_tombstoned(&session.ledger, entry))
                .collect();
            let records = session.ledger.filter(records);
            let dropped = session.store.replace_all(records);
            if !dropped.is_empty() {
                tracing::warn!("Local copy repeated {} record ids", dropped.len());
            }
            session.generation += 1;
            session.store.len()
        });

        tracing::info!("Loaded {count} records from the local copy");
        self.emit(SyncEvent::RecordsChanged { count });
        Ok(count)
    }

    // -- sync cycle -------------------------------------------------------

    /// Run one pull and reconcile cycle
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = CycleGuard::acquire(&self.in_flight, &self.session, &self.events)
        else {
            tracing::debug!("Sync cycle already in flight, skipping tick");
            return TickOutcome::Skipped;
        };

        let generation = self.with_session(|session| session.generation);
        self.set_cycle_phase(SyncPhase::Pulling);

        let pulled = match within(self.settings.pull_timeout, self.remote.fetch_records()).await {
            Ok(pulled) => pulled,
            Err(error) => {
                let reason = error.to_string();
                self.degrade(
                    &error,
                    DegradedNotice::PullFailed {
                        reason: reason.clone(),
                    },
                );
                return TickOutcome::PullFailed { reason };
            }
        };

        let remote_tombstones =
            match within(self.settings.pull_timeout, self.remote.fetch_tombstones()).await {
                Ok(document) => Some(document),
                Err(error) => {
                    tracing::warn!("Using local tombstones only: {error}");
                    None
                }
            };

        self.set_cycle_phase(SyncPhase::Reconciling);
        let pulled_count = pulled.len();
        let inspection = inspect_snapshot(pulled);
        if !inspection.issues.is_empty() {
            for issue in &inspection.issues {
                tracing::warn!("Setting aside unreadable pulled record {issue}");
            }
            self.emit(SyncEvent::IntegrityIssues(inspection.issues.clone()));
        }

        let reconciled = self.with_session(|session| {
            let tombstones_learned = remote_tombstones
                .as_ref()
                .map_or(0, |document| session.ledger.merge_remote(document));

            if session.generation != generation {
                return Reconciled::Stale {
                    pending_push: session.pending_push,
                };
            }

            let unreadable = inspection
                .issues
                .iter()
                .map(|issue| issue.raw.clone())
                .filter(|entry| !is_tombstoned(&session.ledger, entry))
                .collect::<Vec<_>>();
            let unreadable_changed = session.unreadable != unreadable;
            session.unreadable = unreadable;

            let valid_count = inspection.records.len();
            let filtered = session.ledger.filter(inspection.records);
            let fingerprint = Fingerprint::of(&filtered);
            if session.last_fingerprint == Some(fingerprint) {
                return Reconciled::Unchanged {
                    retry: session
                        .pending_push
                        .then(|| session.store.all().to_vec()),
                    unreadable: unreadable_changed.then(|| session.unreadable.clone()),
                };
            }

            let tombstoned = valid_count - filtered.len();
            let outcome = dedupe(filtered);
            for id in &outcome.removed {
                session.ledger.mark_deleted(*id);
            }
            let dropped = session.store.replace_all(outcome.kept);
            if !dropped.is_empty() {
                tracing::warn!("Pulled snapshot repeated {} record ids", dropped.len());
            }
            session.last_fingerprint = Some(fingerprint);
            // The cache now mirrors the shared store
            session.pending_push = false;

            Reconciled::Replaced {
                snapshot: session.store.all().to_vec(),
                ledger: session.ledger.to_document(),
                report: ReconcileReport {
                    pulled: pulled_count,
                    tombstoned,
                    tombstones_learned,
                    duplicates_removed: outcome.removed.into_iter().collect(),
                    integrity_issues: inspection.issues,
                    record_count: session.store.len(),
                    push: None,
                },
            }
        });

        let (snapshot, ledger, mut report) = match reconciled {
            Reconciled::Stale { pending_push } => {
                tracing::debug!("Local change landed during pull, discarding snapshot");
                if !pending_push {
                    self.set_state(SyncState::Synced);
                }
                return TickOutcome::Stale;
            }
            Reconciled::Unchanged { retry, unreadable } => {
                tracing::debug!("Remote snapshot unchanged");
                if let Some(entries) = unreadable {
                    self.persist_unreadable(&entries).await;
                }
                match retry {
                    Some(snapshot) => {
                        tracing::info!("Retrying the last failed push");
                        self.push_records(&snapshot).await;
                    }
                    None => self.set_state(SyncState::Synced),
                }
                return TickOutcome::Unchanged;
            }
            Reconciled::Replaced {
                snapshot,
                ledger,
                report,
            } => (snapshot, ledger, report),
        };

        tracing::info!(
            records = report.record_count,
            tombstoned = report.tombstoned,
            duplicates = report.duplicates_removed.len(),
            "Reconciled remote snapshot"
        );
        self.set_state(SyncState::Synced);
        self.emit(SyncEvent::RecordsChanged {
            count: report.record_count,
        });
        self.persist_local(&snapshot, &ledger).await;

        if !report.duplicates_removed.is_empty() {
            self.push_tombstones().await;
            report.push = Some(self.push_records(&snapshot).await);
        }

        TickOutcome::Reconciled(report)
    }

    // -- mutations --------------------------------------------------------

    /// Submit a request dated today
    pub async fn submit(
        &self,
        request: LeaveRequest,
        policy: SubmitPolicy,
    ) -> std::result::Result<SubmitOutcome, ValidationError> {
        self.submit_on(request, local_today(), policy).await
    }

    /// Submit a request as if today were `today`
    pub async fn submit_on(
        &self,
        request: LeaveRequest,
        today: NaiveDate,
        policy: SubmitPolicy,
    ) -> std::result::Result<SubmitOutcome, ValidationError> {
        request.validate(today)?;

        let admission = self.with_session(|session| -> std::result::Result<_, ValidationError> {
            let conflicts = ConflictDetector::new(&session.store).conflicts(
                request.subject(),
                request.start_date(),
                request.end_date(),
                None,
            );
            if !conflicts.is_empty() {
                if policy == SubmitPolicy::RejectConflicts {
                    return Ok(Admission::Blocked(conflicts));
                }
                tracing::warn!(
                    "Recording leave for {} despite {} overlapping records",
                    request.subject(),
                    conflicts.len()
                );
            }

            let mut id = RecordId::from_now();
            while session.store.contains(id) || session.ledger.is_deleted(id) {
                id = id.next();
            }
            let record = request.clone().into_record(id, today);
            session.store.add(record.clone())?;
            session.generation += 1;
            Ok(Admission::Added {
                record,
                snapshot: session.store.all().to_vec(),
            })
        })?;

        let (record, snapshot) = match admission {
            Admission::Blocked(conflicts) => {
                let message = format_conflict_message(
                    request.subject(),
                    request.start_date(),
                    request.end_date(),
                    &conflicts,
                );
                tracing::info!(
                    "Blocked leave for {}: {} conflicts",
                    request.subject(),
                    conflicts.len()
                );
                return Ok(SubmitOutcome::Blocked { conflicts, message });
            }
            Admission::Added { record, snapshot } => (record, snapshot),
        };

        tracing::info!(
            id = %record.id,
            "Recorded leave for {} ({} - {})",
            record.subject,
            record.start_date,
            record.end_date
        );
        self.emit(SyncEvent::RecordsChanged {
            count: snapshot.len(),
        });
        self.persist_records(&snapshot).await;
        let push = self.push_records(&snapshot).await;

        Ok(SubmitOutcome::Added { record, push })
    }

    /// Delete a record and tombstone its id.
    ///
    /// An id that is not in the store is still tombstoned, so a copy of it
    /// arriving later from the shared store stays hidden.
    pub async fn delete(&self, id: RecordId) -> DeleteOutcome {
        let (removed, snapshot, ledger) = self.with_session(|session| {
            let removed = session.store.remove(id);
            session.ledger.mark_deleted(id);
            let ledger = &session.ledger;
            session
                .unreadable
                .retain(|entry| !is_tombstoned(ledger, entry));
            session.generation += 1;
            (
                removed,
                session.store.all().to_vec(),
                session.ledger.to_document(),
            )
        });

        match &removed {
            Some(record) => tracing::info!(%id, "Deleted leave for {}", record.subject),
            None => tracing::info!(%id, "Tombstoned unknown record id"),
        }
        if removed.is_some() {
            self.emit(SyncEvent::RecordsChanged {
                count: snapshot.len(),
            });
        }

        let saved_locally = self.persist_local(&snapshot, &ledger).await;
        let shared = self.push_tombstones().await;
        let push = self.push_records(&snapshot).await;

        DeleteOutcome {
            removed,
            tombstone_persisted: saved_locally && shared,
            push,
        }
    }

    /// Collapse duplicates already in the store
    pub async fn cleanup_duplicates(&self) -> CleanupReport {
        let (before, removed, snapshot, ledger) = self.with_session(|session| {
            let before = session.store.len();
            let outcome = dedupe(session.store.all().to_vec());
            if outcome.is_clean() {
                return (before, Vec::new(), None, None);
            }
            for id in &outcome.removed {
                session.ledger.mark_deleted(*id);
            }
            session.store.replace_all(outcome.kept);
            session.generation += 1;
            (
                before,
                outcome.removed.into_iter().collect::<Vec<_>>(),
                Some(session.store.all().to_vec()),
                Some(session.ledger.to_document()),
            )
        });

        let (Some(snapshot), Some(ledger)) = (snapshot, ledger) else {
            tracing::info!("No duplicate records found");
            return CleanupReport {
                before,
                removed,
                after: before,
                push: None,
            };
        };

        tracing::info!("Removed {} duplicate records", removed.len());
        self.emit(SyncEvent::RecordsChanged {
            count: snapshot.len(),
        });
        self.persist_local(&snapshot, &ledger).await;
        self.push_tombstones().await;
        let push = self.push_records(&snapshot).await;

        CleanupReport {
            before,
            removed,
            after: snapshot.len(),
            push: Some(push),
        }
    }

    /// Push the current record set and tombstones without pulling first
    pub async fn push_now(&self) -> PushOutcome {
        let snapshot = self.records();
        self.push_tombstones().await;
        self.push_records(&snapshot).await
    }

    // -- persistence ------------------------------------------------------

    fn local_copy_failed(&self, error: &Error) {
        let notice = DegradedNotice::LocalCopyFailed {
            reason: error.to_string(),
        };
        tracing::warn!("{notice}");
        self.emit(SyncEvent::Degraded(notice));
    }

    async fn persist_unreadable(&self, entries: &[Value]) -> bool {
        match self.slots.save_unreadable(entries).await {
            Ok(()) => true,
            Err(error) => {
                self.local_copy_failed(&error);
                false
            }
        }
    }

    async fn persist_records(&self, records: &[LeaveRecord]) -> bool {
        let unreadable = self.unreadable_entries();
        match self.slots.save_records(records).await {
            Ok(()) => self.persist_unreadable(&unreadable).await,
            Err(error) => {
                self.local_copy_failed(&error);
                false
            }
        }
    }

    async fn persist_local(&self, records: &[LeaveRecord], ledger: &TombstoneDocument) -> bool {
        let records_saved = self.persist_records(records).await;
        match self.slots.save_tombstones(ledger).await {
            Ok(()) => records_saved,
            Err(error) => {
                self.local_copy_failed(&error);
                false
            }
        }
    }

    async fn push_records(&self, records: &[LeaveRecord]) -> PushOutcome {
        let _push = self.push_lock.lock().await;
        let _pushing = PushGuard::enter(&self.session, &self.events);

        let unreadable = self.unreadable_entries();
        let result = match shared_payload(records, &unreadable) {
            Ok(payload) => {
                within(self.settings.push_timeout, self.remote.push_records(&payload)).await
            }
            Err(error) => Err(RemoteError::Payload(error.to_string())),
        };

        match result {
            Ok(()) => {
                tracing::debug!(
                    unreadable = unreadable.len(),
                    "Pushed {} records",
                    records.len()
                );
                self.with_session(|session| {
                    session.last_fingerprint = Some(Fingerprint::of(records));
                    session.pending_push = false;
                });
                self.set_state(SyncState::Synced);
                PushOutcome::Synced
            }
            Err(error) => {
                let reason = error.to_string();
                self.with_session(|session| session.pending_push = true);
                self.degrade(
                    &error,
                    DegradedNotice::PushFailed {
                        reason: reason.clone(),
                    },
                );
                let export = manual_export(records, &unreadable)
                    .map_err(|error| tracing::warn!("Could not build manual export: {error}"))
                    .ok();
                PushOutcome::Failed { reason, export }
            }
        }
    }

    /// Merge the shared tombstone document into the ledger, then write the
    /// union back so deletions from other clients are not overwritten.
    async fn push_tombstones(&self) -> bool {
        let _push = self.push_lock.lock().await;
        let _pushing = PushGuard::enter(&self.session, &self.events);

        match within(self.settings.pull_timeout, self.remote.fetch_tombstones()).await {
            Ok(document) => {
                let learned = self.with_session(|session| session.ledger.merge_remote(&document));
                if learned > 0 {
                    tracing::debug!("Learned {learned} tombstones before pushing");
                }
            }
            Err(error) => tracing::debug!("Pushing tombstones without merging: {error}"),
        }

        let document = self.with_session(|session| {
            session.ledger.touch(Utc::now());
            session.ledger.to_document()
        });

        let result = within(
            self.settings.push_timeout,
            self.remote.push_tombstones(&document),
        )
        .await;
        match result {
            Ok(()) => {
                tracing::debug!("Pushed {} tombstones", document.deleted_records.len());
                true
            }
            Err(error) => {
                self.degrade(
                    &error,
                    DegradedNotice::TombstonePushFailed {
                        reason: error.to_string(),
                    },
                );
                false
            }
        }
    }
}

fn is_tombstoned(ledger: &TombstoneLedger, entry: &Value) -> bool {
    entry
        .get("id")
        .and_then(Value::as_i64)
        .is_some_and(|id| ledger.is_deleted(RecordId::new(id)))
}
