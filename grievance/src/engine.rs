//! Grievance lifecycle engine.
//!
//! Sole writer of grievance state. Orchestrates creation, status-transition
//! authorization, timeline appends, SLA evaluation, and notification
//! fan-out. Every operation either fully applies or leaves the record
//! untouched: the status field and the corresponding timeline append become
//! visible together via a single compare-and-swap on the whole record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::events::{GrievanceEvent, NotificationSink};
use crate::model::{
    AiAnalysis, Attachment, Category, GrievanceRecord, Location, Priority, Resolution,
    TimelineEvent, DESCRIPTION_MAX, TITLE_MAX,
};
use crate::policy::{UserId, UserRef};
use crate::scorer::UrgencyScorer;
use crate::sla;
use crate::status::{self, Status};
use crate::store::{GrievanceFilter, SharedGrievanceStore, StoreError, Versioned};

/// Priority used when the urgency scorer is unavailable.
const FALLBACK_PRIORITY: Priority = Priority::Medium;

/// Input for submitting a new grievance.
#[derive(Debug, Clone)]
pub struct NewGrievance {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: Location,
    pub attachments: Vec<Attachment>,
    pub submitter: UserId,
}

/// The lifecycle engine. Cheap to clone behind an `Arc`.
pub struct LifecycleEngine {
    store: SharedGrievanceStore,
    sink: Arc<dyn NotificationSink>,
    scorer: Arc<dyn UrgencyScorer>,
    clock: Arc<dyn Clock>,
}

impl LifecycleEngine {
    pub fn new(
        store: SharedGrievanceStore,
        sink: Arc<dyn NotificationSink>,
        scorer: Arc<dyn UrgencyScorer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            sink,
            scorer,
            clock,
        }
    }

    /// The underlying store, for read-path collaborators.
    pub fn store(&self) -> &SharedGrievanceStore {
        &self.store
    }

    /// Submit a new grievance.
    ///
    /// Validates the input, rates urgency (falling back to
    /// [`FALLBACK_PRIORITY`] if the scorer fails), classifies priority,
    /// computes the SLA deadline, and creates the record with status
    /// `Pending` and its creation timeline event. Officials of the
    /// grievance's jurisdiction are notified best-effort.
    pub async fn submit(&self, input: NewGrievance) -> EngineResult<GrievanceRecord> {
        let (title, description) = validate_submission(&input)?;

        let ai_analysis = match self
            .scorer
            .score(&title, &description, input.category)
            .await
        {
            Ok(assessment) => {
                let assessment = assessment.clamped();
                debug!(
                    urgency_score = assessment.urgency_score,
                    sentiment = %assessment.sentiment,
                    "Urgency analysis complete"
                );
                Some(AiAnalysis {
                    sentiment: assessment.sentiment,
                    urgency_score: assessment.urgency_score,
                    recommended_actions: assessment.recommended_actions,
                })
            }
            Err(err) => {
                warn!(error = %err, "Urgency scorer failed; falling back to default priority");
                None
            }
        };

        let priority = ai_analysis
            .as_ref()
            .map(|a| classify(a.urgency_score))
            .unwrap_or(FALLBACK_PRIORITY);

        let now = self.clock.now();
        let record = GrievanceRecord::new(
            title,
            description,
            input.category,
            input.location,
            input.submitter,
            input.attachments,
            ai_analysis,
            priority,
            now,
        );

        self.store.insert(record.clone())?;

        info!(
            grievance_id = %record.id,
            priority = %record.priority,
            category = %record.category,
            "Grievance submitted"
        );

        self.sink.notify(GrievanceEvent::GrievanceSubmitted {
            grievance_id: record.id.clone(),
            priority: record.priority,
            category: record.category,
            village: record.location.address.village.clone(),
            district: record.location.address.district.clone(),
            timestamp: now,
        });

        Ok(record)
    }

    /// Transition a grievance to a new status.
    ///
    /// Check order: existence, role authorization, comment presence, legal
    /// edge. SLA breach is re-evaluated against the *pre-transition* status,
    /// so a transition to `Resolved` still records whether the deadline had
    /// already passed. The timeline append and the status update land in
    /// one compare-and-swap; a racing writer surfaces as
    /// [`EngineError::Conflict`].
    pub async fn transition(
        &self,
        grievance_id: &str,
        acting_user: &UserRef,
        new_status: Status,
        comment: &str,
    ) -> EngineResult<GrievanceRecord> {
        let Versioned {
            mut record,
            version,
        } = self
            .store
            .get(grievance_id)?
            .ok_or_else(|| EngineError::NotFound(grievance_id.to_string()))?;

        if !acting_user.role.can_transition() {
            return Err(EngineError::Authorization {
                role: acting_user.role,
                action: "update grievance status",
            });
        }

        let comment = comment.trim();
        if comment.is_empty() {
            return Err(EngineError::Validation(
                "comment required for status update".to_string(),
            ));
        }

        let from = record.status;
        if !status::is_legal_transition(from, new_status) {
            return Err(EngineError::InvalidTransition {
                from,
                to: new_status,
            });
        }

        let now = self.clock.now();

        // Breach check uses the pre-transition status: resolving after the
        // deadline still latches the historical breach.
        if !record.sla.is_breached && sla::is_breached(record.sla.deadline, from, now) {
            record.sla.is_breached = true;
        }

        record.timeline.push(TimelineEvent {
            status: new_status,
            comment: comment.to_string(),
            updated_by: acting_user.id.clone(),
            updated_at: now,
        });
        record.status = new_status;
        if new_status == Status::Resolved {
            record.resolution = Some(Resolution {
                resolved_by: acting_user.id.clone(),
                resolved_at: now,
                comment: comment.to_string(),
                satisfaction_rating: None,
            });
        }
        record.updated_at = now;

        match self.store.update(grievance_id, version, record.clone()) {
            Ok(_) => {}
            Err(StoreError::VersionConflict { .. }) => {
                return Err(EngineError::Conflict(grievance_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            grievance_id,
            from = %from,
            to = %new_status,
            updated_by = %acting_user.id,
            "Grievance status updated"
        );

        self.sink.notify(GrievanceEvent::StatusChanged {
            grievance_id: grievance_id.to_string(),
            submitter: record.submitter.clone(),
            from,
            to: new_status,
            comment: comment.to_string(),
            timestamp: now,
        });

        Ok(record)
    }

    /// Evaluate and persist the SLA breach latch for one grievance.
    ///
    /// Idempotent read-path helper: has no effect on status or the
    /// timeline, and emits the `SlaBreached` event only on the false→true
    /// edge. A version race with a concurrent transition is retried
    /// internally — the latch is monotonic, so re-reading is always safe.
    pub fn check_breach(&self, grievance_id: &str, now: DateTime<Utc>) -> EngineResult<bool> {
        loop {
            let Versioned {
                mut record,
                version,
            } = self
                .store
                .get(grievance_id)?
                .ok_or_else(|| EngineError::NotFound(grievance_id.to_string()))?;

            if record.sla.is_breached {
                return Ok(true);
            }
            if !sla::is_breached(record.sla.deadline, record.status, now) {
                return Ok(false);
            }

            record.sla.is_breached = true;
            let deadline = record.sla.deadline;

            match self.store.update(grievance_id, version, record) {
                Ok(_) => {
                    info!(grievance_id, %deadline, "SLA breached");
                    self.sink.notify(GrievanceEvent::SlaBreached {
                        grievance_id: grievance_id.to_string(),
                        deadline,
                        timestamp: now,
                    });
                    return Ok(true);
                }
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Assign or reassign an official to a grievance.
    ///
    /// Touches neither status nor the timeline; subject to the same role
    /// matrix as status updates.
    pub fn assign(
        &self,
        grievance_id: &str,
        acting_user: &UserRef,
        assignee: UserId,
    ) -> EngineResult<GrievanceRecord> {
        let Versioned {
            mut record,
            version,
        } = self
            .store
            .get(grievance_id)?
            .ok_or_else(|| EngineError::NotFound(grievance_id.to_string()))?;

        if !acting_user.role.can_transition() {
            return Err(EngineError::Authorization {
                role: acting_user.role,
                action: "assign grievances",
            });
        }

        record.assignee = Some(assignee.clone());
        record.updated_at = self.clock.now();

        match self.store.update(grievance_id, version, record.clone()) {
            Ok(_) => {}
            Err(StoreError::VersionConflict { .. }) => {
                return Err(EngineError::Conflict(grievance_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        info!(grievance_id, assignee = %assignee, "Grievance assigned");
        Ok(record)
    }

    /// Fetch a grievance by id.
    pub fn get(&self, grievance_id: &str) -> EngineResult<GrievanceRecord> {
        self.store
            .get(grievance_id)?
            .map(|v| v.record)
            .ok_or_else(|| EngineError::NotFound(grievance_id.to_string()))
    }

    /// List grievances matching a filter, most recent first.
    pub fn list(&self, filter: &GrievanceFilter) -> EngineResult<Vec<GrievanceRecord>> {
        Ok(self.store.list(filter)?)
    }
}

fn validate_submission(input: &NewGrievance) -> EngineResult<(String, String)> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(EngineError::Validation(
            "grievance title is required".to_string(),
        ));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(EngineError::Validation(format!(
            "title cannot be more than {TITLE_MAX} characters"
        )));
    }

    let description = input.description.trim();
    if description.is_empty() {
        return Err(EngineError::Validation(
            "grievance description is required".to_string(),
        ));
    }
    if description.chars().count() > DESCRIPTION_MAX {
        return Err(EngineError::Validation(format!(
            "description cannot be more than {DESCRIPTION_MAX} characters"
        )));
    }

    if !input.location.longitude.is_finite() || !input.location.latitude.is_finite() {
        return Err(EngineError::Validation(
            "location coordinates are required".to_string(),
        ));
    }

    Ok((title.to_string(), description.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::EventBus;
    use crate::model::Address;
    use crate::policy::Role;
    use crate::scorer::{ScorerError, UrgencyAssessment};
    use crate::store::GrievanceStore;
    use async_trait::async_trait;
    use chrono::Duration;

    /// Scorer returning a fixed urgency score, or an error if configured to.
    struct FixedScorer {
        score: f64,
        fail: bool,
    }

    impl FixedScorer {
        fn scoring(score: f64) -> Self {
            Self { score, fail: false }
        }

        fn failing() -> Self {
            Self {
                score: 0.0,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl UrgencyScorer for FixedScorer {
        async fn score(
            &self,
            _title: &str,
            _description: &str,
            _category: Category,
        ) -> Result<UrgencyAssessment, ScorerError> {
            if self.fail {
                return Err(ScorerError::Request("connection refused".into()));
            }
            Ok(UrgencyAssessment {
                sentiment: "negative".into(),
                urgency_score: self.score,
                recommended_actions: vec!["dispatch inspection team".into()],
            })
        }
    }

    struct Harness {
        engine: Arc<LifecycleEngine>,
        clock: Arc<ManualClock>,
        bus: Arc<EventBus>,
    }

    fn harness(scorer: FixedScorer) -> Harness {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let bus = EventBus::new().shared();
        let engine = Arc::new(LifecycleEngine::new(
            GrievanceStore::new().shared(),
            bus.clone(),
            Arc::new(scorer),
            clock.clone(),
        ));
        Harness { engine, clock, bus }
    }

    fn submission() -> NewGrievance {
        NewGrievance {
            title: "Sewage overflow near the school".into(),
            description: "Open sewage has been flooding the school road for three days".into(),
            category: Category::PublicServices,
            location: Location {
                longitude: 80.68,
                latitude: 27.57,
                address: Address {
                    village: "Rampur".into(),
                    district: "Sitapur".into(),
                    state: "Uttar Pradesh".into(),
                    pincode: "261001".into(),
                },
            },
            attachments: Vec::new(),
            submitter: "villager-1".into(),
        }
    }

    fn official() -> UserRef {
        UserRef::new("official-1", Role::PanchayatOfficial)
    }

    fn villager() -> UserRef {
        UserRef::new("villager-1", Role::Villager)
    }

    // Scenario A: urgency 0.85 at time T → urgent, deadline T+24h,
    // pending, timeline length 1.
    #[tokio::test]
    async fn test_submit_classifies_and_sets_deadline() {
        let h = harness(FixedScorer::scoring(0.85));
        let t = h.clock.now();

        let record = h.engine.submit(submission()).await.unwrap();

        assert_eq!(record.priority, Priority::Urgent);
        assert_eq!(record.sla.deadline, t + Duration::hours(24));
        assert_eq!(record.status, Status::Pending);
        assert_eq!(record.timeline.len(), 1);
        assert!(!record.sla.is_breached);
        let analysis = record.ai_analysis.unwrap();
        assert_eq!(analysis.urgency_score, 0.85);
    }

    #[tokio::test]
    async fn test_submit_notifies_jurisdiction() {
        let h = harness(FixedScorer::scoring(0.5));
        let mut rx = h.bus.subscribe();

        let record = h.engine.submit(submission()).await.unwrap();

        let event = rx.recv().await.unwrap();
        match event {
            GrievanceEvent::GrievanceSubmitted {
                grievance_id,
                village,
                district,
                priority,
                ..
            } => {
                assert_eq!(grievance_id, record.id);
                assert_eq!(village, "Rampur");
                assert_eq!(district, "Sitapur");
                assert_eq!(priority, Priority::Medium);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_scorer_failure_falls_back_to_medium() {
        let h = harness(FixedScorer::failing());

        let record = h.engine.submit(submission()).await.unwrap();

        assert_eq!(record.priority, Priority::Medium);
        assert!(record.ai_analysis.is_none());
        assert_eq!(record.status, Status::Pending);
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let h = harness(FixedScorer::scoring(0.5));

        let mut blank_title = submission();
        blank_title.title = "   ".into();
        assert!(matches!(
            h.engine.submit(blank_title).await,
            Err(EngineError::Validation(msg)) if msg.contains("title")
        ));

        let mut long_title = submission();
        long_title.title = "x".repeat(TITLE_MAX + 1);
        assert!(matches!(
            h.engine.submit(long_title).await,
            Err(EngineError::Validation(_))
        ));

        let mut long_description = submission();
        long_description.description = "y".repeat(DESCRIPTION_MAX + 1);
        assert!(matches!(
            h.engine.submit(long_description).await,
            Err(EngineError::Validation(_))
        ));

        let mut bad_location = submission();
        bad_location.location.latitude = f64::NAN;
        assert!(matches!(
            h.engine.submit(bad_location).await,
            Err(EngineError::Validation(msg)) if msg.contains("coordinates")
        ));

        assert!(h.engine.store().is_empty());
    }

    // Scenario B: pending → in-progress, timeline grows, breach untouched.
    #[tokio::test]
    async fn test_transition_appends_timeline() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        let updated = h
            .engine
            .transition(&record.id, &official(), Status::InProgress, "reviewing")
            .await
            .unwrap();

        assert_eq!(updated.status, Status::InProgress);
        assert_eq!(updated.timeline.len(), 2);
        assert_eq!(updated.latest_timeline_status(), Status::InProgress);
        assert_eq!(updated.timeline[1].comment, "reviewing");
        assert_eq!(updated.timeline[1].updated_by, "official-1");
        assert!(!updated.sla.is_breached);
    }

    // Scenario C: clock past deadline, check_breach latches; status and
    // timeline unaffected; second call idempotent.
    #[tokio::test]
    async fn test_check_breach_latches_once() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();
        let mut rx = h.bus.subscribe();

        // Before the deadline: not breached.
        assert!(!h.engine.check_breach(&record.id, h.clock.now()).unwrap());

        h.clock.advance(Duration::hours(25));
        let now = h.clock.now();

        assert!(h.engine.check_breach(&record.id, now).unwrap());
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "sla_breached");

        // Second call: same answer, no new event, nothing else moved.
        assert!(h.engine.check_breach(&record.id, now).unwrap());
        assert!(rx.try_recv().is_err());

        let after = h.engine.get(&record.id).unwrap();
        assert_eq!(after.status, Status::Pending);
        assert_eq!(after.timeline.len(), 1);
        assert!(after.sla.is_breached);
    }

    // Scenario D: villager may not transition; no state change.
    #[tokio::test]
    async fn test_villager_cannot_transition() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        let err = h
            .engine
            .transition(&record.id, &villager(), Status::Resolved, "done")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Authorization { .. }));

        let after = h.engine.get(&record.id).unwrap();
        assert_eq!(after.status, Status::Pending);
        assert_eq!(after.timeline.len(), 1);
    }

    // Scenario E: missing comment; no state change.
    #[tokio::test]
    async fn test_missing_comment_rejected() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        let err = h
            .engine
            .transition(&record.id, &official(), Status::Resolved, "  ")
            .await
            .unwrap_err();
        assert!(
            matches!(err, EngineError::Validation(ref msg) if msg == "comment required for status update")
        );

        let after = h.engine.get(&record.id).unwrap();
        assert_eq!(after.status, Status::Pending);
        assert_eq!(after.timeline.len(), 1);
        assert_eq!(after.latest_timeline_status(), Status::Pending);
    }

    // Scenario F: no transition out of a terminal status.
    #[tokio::test]
    async fn test_resolved_is_terminal() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        h.engine
            .transition(&record.id, &official(), Status::Resolved, "fixed")
            .await
            .unwrap();

        let err = h
            .engine
            .transition(&record.id, &official(), Status::Pending, "reopen")
            .await
            .unwrap_err();
        match err {
            EngineError::InvalidTransition { from, to } => {
                assert_eq!(from, Status::Resolved);
                assert_eq!(to, Status::Pending);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolution_populated_on_resolve() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        let resolved = h
            .engine
            .transition(&record.id, &official(), Status::Resolved, "pump repaired")
            .await
            .unwrap();

        let resolution = resolved.resolution.unwrap();
        assert_eq!(resolution.resolved_by, "official-1");
        assert_eq!(resolution.comment, "pump repaired");
        assert_eq!(resolution.resolved_at, h.clock.now());
        assert!(resolution.satisfaction_rating.is_none());
    }

    #[tokio::test]
    async fn test_late_resolution_latches_historical_breach() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        h.clock.advance(Duration::hours(30));

        // Breach is evaluated against the pre-transition (pending) status,
        // so resolving after the deadline still records the breach.
        let resolved = h
            .engine
            .transition(&record.id, &official(), Status::Resolved, "late fix")
            .await
            .unwrap();

        assert_eq!(resolved.status, Status::Resolved);
        assert!(resolved.sla.is_breached);

        // The latch never reverts.
        assert!(h.engine.check_breach(&record.id, h.clock.now()).unwrap());
    }

    #[tokio::test]
    async fn test_notfound_and_unknown_id() {
        let h = harness(FixedScorer::scoring(0.85));

        assert!(matches!(
            h.engine
                .transition("no-such-id", &official(), Status::Resolved, "x")
                .await,
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            h.engine.check_breach("no-such-id", h.clock.now()),
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            h.engine.get("no-such-id"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transition_notifies_submitter() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();
        let mut rx = h.bus.subscribe();

        h.engine
            .transition(&record.id, &official(), Status::InProgress, "on it")
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        match event {
            GrievanceEvent::StatusChanged {
                submitter,
                from,
                to,
                comment,
                ..
            } => {
                assert_eq!(submitter, "villager-1");
                assert_eq!(from, Status::Pending);
                assert_eq!(to, Status::InProgress);
                assert_eq!(comment, "on it");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    /// Concurrent transitions on the same record: exactly one append wins
    /// per legal edge; the rest fail with Conflict or InvalidTransition.
    /// No lost updates.
    #[tokio::test]
    async fn test_concurrent_transitions_no_lost_update() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let engine = h.engine.clone();
            let id = record.id.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .transition(
                        &id,
                        &UserRef::new(format!("official-{i}"), Role::PanchayatOfficial),
                        Status::InProgress,
                        "picking this up",
                    )
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(EngineError::Conflict(_)) | Err(EngineError::InvalidTransition { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        let after = h.engine.get(&record.id).unwrap();
        assert_eq!(after.status, Status::InProgress);
        assert_eq!(after.timeline.len(), 2);
        assert_eq!(after.status, after.latest_timeline_status());
    }

    #[tokio::test]
    async fn test_assign_requires_official() {
        let h = harness(FixedScorer::scoring(0.85));
        let record = h.engine.submit(submission()).await.unwrap();

        assert!(matches!(
            h.engine.assign(&record.id, &villager(), "official-2".into()),
            Err(EngineError::Authorization { .. })
        ));

        let assigned = h
            .engine
            .assign(&record.id, &official(), "official-2".into())
            .unwrap();
        assert_eq!(assigned.assignee.as_deref(), Some("official-2"));
        // Assignment leaves status and timeline alone.
        assert_eq!(assigned.status, Status::Pending);
        assert_eq!(assigned.timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let h = harness(FixedScorer::scoring(0.85));
        let first = h.engine.submit(submission()).await.unwrap();

        let mut other = submission();
        other.location.address.village = "Basti".into();
        other.submitter = "villager-2".into();
        h.engine.submit(other).await.unwrap();

        let all = h.engine.list(&GrievanceFilter::new()).unwrap();
        assert_eq!(all.len(), 2);

        let rampur = h
            .engine
            .list(&GrievanceFilter::new().village("Rampur"))
            .unwrap();
        assert_eq!(rampur.len(), 1);
        assert_eq!(rampur[0].id, first.id);

        let pending = h
            .engine
            .list(&GrievanceFilter::new().status(Status::Pending))
            .unwrap();
        assert_eq!(pending.len(), 2);
    }
}
