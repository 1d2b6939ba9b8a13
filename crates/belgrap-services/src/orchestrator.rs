//! Call lifecycle orchestrator
//!
//! Drives a call from creation through completion. The ordering on the start
//! path is deliberate: the external call is created first and the credit is
//! charged only after the provider confirmed the call started, so a user is
//! never billed for a call that never existed. Each running call gets a
//! spawned monitor task that polls the provider, persists status transitions,
//! and triggers settlement on `ended`. Poll errors reschedule with a backoff
//! instead of aborting; the loop is bounded by a maximum elapsed time after
//! which the call is forced to `timeout` and settled.

use crate::settlement::SettlementService;
use belgrap_cache::{keys, RedisCache};
use belgrap_core::{
    config::CallConfig,
    models::{Call, CallStatus, Scenario, User},
    phone,
    traits::{CacheService, CallRepository, Repository, UserRepository},
    AppError, AppResult,
};
use belgrap_db::{PgCallRepository, PgUserRepository};
use belgrap_gateway::{
    AssistantOverrides, CallCustomer, CreateCallRequest, ProviderCall, VoiceGatewayClient,
};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Result of starting a call
#[derive(Debug, Clone)]
pub struct StartCallOutcome {
    /// The persisted call record, in `queued` state
    pub call: Call,

    /// The user's balance after the one-credit charge
    pub credits_remaining: i64,
}

/// What a single poll decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollVerdict {
    /// Call still active; poll again
    Continue,
    /// Terminal status observed; stop polling
    Done,
}

/// Call lifecycle orchestrator
pub struct CallOrchestrator {
    pool: PgPool,
    voice: Arc<VoiceGatewayClient>,
    settlement: Arc<SettlementService>,
    cache: Option<RedisCache>,
    config: CallConfig,
    monitors: Arc<RwLock<HashMap<Uuid, JoinHandle<()>>>>,
}

impl CallOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        pool: PgPool,
        voice: Arc<VoiceGatewayClient>,
        settlement: Arc<SettlementService>,
        cache: Option<RedisCache>,
        config: CallConfig,
    ) -> Self {
        Self {
            pool,
            voice,
            settlement,
            cache,
            config,
            monitors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start an outbound call for a user
    ///
    /// Preconditions: the scenario has a linked agent, the user holds at
    /// least one credit, and the phone number validates. Any failure before
    /// or during external call creation aborts with no persistence and no
    /// charge.
    #[instrument(skip(self, user, scenario))]
    pub async fn start_call(
        self: Arc<Self>,
        user: &User,
        scenario: &Scenario,
        target_number: &str,
        target_name: Option<String>,
    ) -> AppResult<StartCallOutcome> {
        if !scenario.is_callable() {
            return Err(AppError::ScenarioUnavailable(format!(
                "Scenario {} has no linked agent",
                scenario.id
            )));
        }

        if !user.can_start_call() {
            return Err(AppError::InsufficientCredits {
                required: 1,
                available: user.credits,
            });
        }

        let check = phone::check_dutch_number(target_number);
        if !check.is_valid {
            return Err(AppError::InvalidPhoneNumber(target_number.to_string()));
        }

        // Create the external call first; the credit is charged only after
        // the provider confirmed the call started.
        let request = CreateCallRequest {
            assistant_id: scenario.assistant_id.clone(),
            phone_number_id: self.voice.phone_number_id().to_string(),
            customer: CallCustomer {
                number: check.formatted.clone(),
                name: target_name.clone(),
            },
            assistant_overrides: target_name.clone().map(|name| AssistantOverrides {
                variable_values: HashMap::from([("targetName".to_string(), name)]),
            }),
        };

        let provider_call = self.voice.create_call(&request).await?;

        info!(
            provider_call_id = %provider_call.id,
            scenario_id = %scenario.id,
            "External call created"
        );

        let users = PgUserRepository::new(self.pool.clone());
        let credits_remaining = match users.debit_call_credit(user.id).await? {
            Some(balance) => balance,
            None => {
                // Balance was spent concurrently; undo the external call.
                warn!(user_id = %user.id, "Credit debit lost the race, hanging up");
                self.hangup_best_effort(&provider_call.id).await;
                return Err(AppError::InsufficientCredits {
                    required: 1,
                    available: 0,
                });
            }
        };

        let record = Call {
            user_id: user.id,
            user_email: user.email.clone(),
            provider_call_id: provider_call.id.clone(),
            target_number: target_number.to_string(),
            formatted_number: check.formatted,
            target_name,
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            scenario_icon: scenario.icon.clone(),
            assistant_id: scenario.assistant_id.clone(),
            status: CallStatus::Queued,
            ..Default::default()
        };

        let calls = PgCallRepository::new(self.pool.clone());
        let created = match calls.create(&record).await {
            Ok(created) => created,
            Err(e) => {
                error!("Failed to persist call record, rolling back charge: {}", e);
                users.revert_call_credit(user.id).await?;
                self.hangup_best_effort(&provider_call.id).await;
                return Err(e);
            }
        };

        let this = Arc::clone(&self);
        let monitor_call_id = created.id;
        let monitor_provider_id = provider_call.id.clone();
        let handle = tokio::spawn(async move {
            this.monitor_loop(monitor_call_id, monitor_provider_id).await;
        });
        self.monitors.write().await.insert(created.id, handle);

        Ok(StartCallOutcome {
            call: created,
            credits_remaining,
        })
    }

    /// User-initiated termination
    ///
    /// The provider hangup is best-effort; the local record is marked ended
    /// regardless. The monitor observes the terminal status on its next
    /// iteration and stops naturally.
    #[instrument(skip(self))]
    pub async fn end_call(&self, call_id: Uuid) -> AppResult<Call> {
        let calls = PgCallRepository::new(self.pool.clone());
        let call = calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| AppError::CallNotFound(call_id.to_string()))?;

        if !call.status.is_terminal() {
            self.hangup_best_effort(&call.provider_call_id).await;
            calls.mark_terminal(call_id, CallStatus::Ended).await?;
        }

        calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| AppError::CallNotFound(call_id.to_string()))
    }

    /// One-shot status refresh, used by the fetch endpoint
    ///
    /// Runs a single poll without rescheduling and returns the freshest
    /// record. Gateway errors are swallowed: the caller sees the last
    /// persisted state, exactly as with a failed background poll.
    #[instrument(skip(self))]
    pub async fn refresh(&self, call_id: Uuid) -> AppResult<Call> {
        let calls = PgCallRepository::new(self.pool.clone());
        let call = calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| AppError::CallNotFound(call_id.to_string()))?;

        if let Err(e) = self.poll_once(call_id, &call.provider_call_id).await {
            warn!("Status refresh failed for call {}: {}", call_id, e);
        }

        calls
            .find_by_id(call_id)
            .await?
            .ok_or_else(|| AppError::CallNotFound(call_id.to_string()))
    }

    /// Number of calls currently being monitored
    pub async fn active_monitors(&self) -> usize {
        self.monitors.read().await.len()
    }

    /// Poll until a terminal status or the elapsed bound
    async fn monitor_loop(self: Arc<Self>, call_id: Uuid, provider_call_id: String) {
        let started = Instant::now();
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let error_backoff = Duration::from_secs(self.config.poll_error_backoff_secs);
        let max_elapsed = Duration::from_secs(self.config.max_poll_elapsed_secs);

        let mut delay = poll_interval;

        loop {
            sleep(delay).await;

            if started.elapsed() >= max_elapsed {
                warn!(
                    call_id = %call_id,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Polling bound reached, forcing timeout"
                );
                if let Err(e) = self.force_timeout(call_id).await {
                    error!("Failed to force timeout for call {}: {}", call_id, e);
                }
                break;
            }

            match self.poll_once(call_id, &provider_call_id).await {
                Ok(PollVerdict::Done) => break,
                Ok(PollVerdict::Continue) => delay = poll_interval,
                Err(e) => {
                    // Transient upstream failure: keep retrying on a backoff.
                    warn!("Poll failed for call {}: {}", call_id, e);
                    delay = error_backoff;
                }
            }
        }

        self.monitors.write().await.remove(&call_id);
        debug!(call_id = %call_id, "Monitor stopped");
    }

    /// Fetch, normalize and persist the current provider status
    pub async fn poll_once(
        &self,
        call_id: Uuid,
        provider_call_id: &str,
    ) -> AppResult<PollVerdict> {
        let calls = PgCallRepository::new(self.pool.clone());

        let Some(mut call) = calls.find_by_id(call_id).await? else {
            warn!("Call {} disappeared, stopping monitor", call_id);
            return Ok(PollVerdict::Done);
        };

        // Externally marked terminal (user end, concurrent poller): settle
        // ended calls with a final snapshot when available, then stop.
        if call.status.is_terminal() {
            if call.status == CallStatus::Ended && call.settled_at.is_none() {
                if let Ok(snapshot) = self.voice.get_call(provider_call_id).await {
                    apply_snapshot(&mut call, &snapshot);
                    call.status = CallStatus::Ended;
                    calls.apply_provider_snapshot(&call).await?;
                }
                self.try_settle(call_id).await;
            }
            return Ok(PollVerdict::Done);
        }

        let snapshot = self.voice.get_call(provider_call_id).await?;

        let Some(status) = CallStatus::from_provider(&snapshot.status) else {
            debug!(
                raw_status = %snapshot.status,
                "Unknown provider status, keeping stored status"
            );
            return Ok(PollVerdict::Continue);
        };

        apply_snapshot(&mut call, &snapshot);
        call.status = status;
        if status == CallStatus::Failed && call.error_message.is_none() {
            call.error_message = Some(
                snapshot
                    .ended_reason
                    .clone()
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            );
        }

        calls.apply_provider_snapshot(&call).await?;
        self.cache_status(call_id, status).await;

        match status {
            CallStatus::Ended => {
                self.try_settle(call_id).await;
                Ok(PollVerdict::Done)
            }
            // Failed calls never produced provider data; no refund logic runs.
            CallStatus::Failed | CallStatus::Cancelled | CallStatus::Timeout => {
                Ok(PollVerdict::Done)
            }
            _ => Ok(PollVerdict::Continue),
        }
    }

    /// Force a stuck call to `timeout` and settle it with that status
    async fn force_timeout(&self, call_id: Uuid) -> AppResult<()> {
        let calls = PgCallRepository::new(self.pool.clone());
        calls.mark_terminal(call_id, CallStatus::Timeout).await?;
        self.cache_status(call_id, CallStatus::Timeout).await;
        self.try_settle(call_id).await;
        Ok(())
    }

    /// Run settlement, logging failures without unwinding the terminal status
    async fn try_settle(&self, call_id: Uuid) {
        if let Err(e) = self.settlement.settle(call_id).await {
            // The call stays ended; an idempotent re-settlement picks this up.
            error!("Settlement failed for call {}: {}", call_id, e);
        }
    }

    async fn hangup_best_effort(&self, provider_call_id: &str) {
        if let Err(e) = self.voice.end_call(provider_call_id).await {
            warn!("Best-effort hangup failed for {}: {}", provider_call_id, e);
        }
    }

    async fn cache_status(&self, call_id: Uuid, status: CallStatus) {
        if let Some(cache) = &self.cache {
            let key = keys::call_status(&call_id.to_string());
            if let Err(e) = cache
                .set(&key, &status.to_string(), keys::CALL_STATUS_TTL)
                .await
            {
                debug!("Failed to cache call status: {}", e);
            }
        }
    }
}

/// Copy a provider snapshot onto the call record
///
/// Existing values win over absent snapshot fields; the persisted duration is
/// recomputed so it never understates.
fn apply_snapshot(call: &mut Call, snapshot: &ProviderCall) {
    if snapshot.started_at.is_some() {
        call.started_at = snapshot.started_at;
    }
    if snapshot.ended_at.is_some() {
        call.ended_at = snapshot.ended_at;
    }
    if snapshot.duration_seconds.is_some() {
        call.outcome.duration_secs = snapshot.duration_seconds;
    }
    if snapshot.cost.is_some() {
        call.outcome.cost = snapshot.cost;
    }
    if snapshot.transcript.is_some() {
        call.outcome.transcript = snapshot.transcript.clone();
    }
    if let Some(url) = &snapshot.recording_url {
        call.outcome.recording_url = Some(url.clone());
        call.recording.url = Some(url.clone());
        call.recording.available = true;
    }
    if snapshot.ended_reason.is_some() {
        call.outcome.ended_reason = snapshot.ended_reason.clone();
    }
    if let Some(analysis) = &snapshot.analysis {
        if let Some(voicemail) = analysis.voicemail_detected {
            call.outcome.voicemail = voicemail;
        }
        if analysis.human_interaction.is_some() {
            call.outcome.human_interaction = analysis.human_interaction;
        }
        if analysis.classification.is_some() {
            call.outcome.classification = analysis.classification.clone();
        }
        if analysis.flow_score.is_some() {
            call.outcome.flow_score = analysis.flow_score;
        }
    }
    call.duration_secs = call.computed_duration_secs();
}

#[cfg(test)]
mod tests {
    use super::*;
    use belgrap_gateway::voice::CallAnalysis;
    use chrono::{Duration as ChronoDuration, Utc};

    #[test]
    fn test_apply_snapshot_fills_outcome() {
        let mut call = Call::default();
        let start = Utc::now();

        let snapshot = ProviderCall {
            id: "call_1".to_string(),
            status: "completed".to_string(),
            started_at: Some(start),
            ended_at: Some(start + ChronoDuration::seconds(42)),
            duration_seconds: Some(40),
            transcript: Some("hallo".to_string()),
            recording_url: Some("https://storage.example/rec.mp3".to_string()),
            ended_reason: Some("customer-ended-call".to_string()),
            analysis: Some(CallAnalysis {
                voicemail_detected: Some(false),
                human_interaction: Some(true),
                classification: None,
                flow_score: Some(75),
            }),
            ..Default::default()
        };

        apply_snapshot(&mut call, &snapshot);

        // duration is the max of reported (40) and derived (42)
        assert_eq!(call.duration_secs, 42);
        assert_eq!(call.outcome.transcript.as_deref(), Some("hallo"));
        assert!(call.recording.available);
        assert_eq!(call.outcome.human_interaction, Some(true));
        assert_eq!(call.outcome.flow_score, Some(75));
    }

    #[test]
    fn test_apply_snapshot_keeps_existing_values() {
        let mut call = Call::default();
        call.outcome.transcript = Some("eerdere transcript".to_string());
        call.started_at = Some(Utc::now());

        let snapshot = ProviderCall {
            id: "call_1".to_string(),
            status: "ringing".to_string(),
            ..Default::default()
        };

        apply_snapshot(&mut call, &snapshot);

        assert_eq!(
            call.outcome.transcript.as_deref(),
            Some("eerdere transcript")
        );
        assert!(call.started_at.is_some());
    }
}
