use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::models::{
    AvailabilityWindow, BookingRecord, BookingService, BookingSession, BookingStatus, InitialData, Professional,
    SessionEdit,
};
use crate::services::flow::gate::{ProfessionalsState, SettingsState};
use crate::services::flow::sequencer::{StepKind, StepPlan};
use crate::services::flow::validators::{self, StepContext, ValidationError};
use crate::services::ports::{BookingStore, PortError, ProfessionalDirectory, SettingsSource};

type ProfessionalsResult = Result<Vec<Professional>, PortError>;

/// Host-supplied parameters for one flow instance.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub card_id: String,
    /// The business owner; bookings and professionals are scoped to this id.
    pub owner_id: String,
    pub inline_mode: bool,
    pub initial_step: usize,
    pub initial_data: InitialData,
}

#[derive(Clone)]
pub struct FlowPorts {
    pub settings: Arc<dyn SettingsSource>,
    pub professionals: Arc<dyn ProfessionalDirectory>,
    pub bookings: Arc<dyn BookingStore>,
}

/// Callbacks into the page hosting the flow.
pub trait FlowHost: Send + Sync {
    fn on_inline_complete(&self, completion: &InlineCompletion);
    fn on_close(&self);
}

pub struct NoopHost;

impl FlowHost for NoopHost {
    fn on_inline_complete(&self, _completion: &InlineCompletion) {}
    fn on_close(&self) {}
}

/// What an inline flow hands back once its last step validates.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineCompletion {
    pub date: String,
    pub time: String,
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowPhase {
    Active,
    Submitting,
    Booked { booking_id: String },
    InlineCompleted(InlineCompletion),
    Closed,
}

impl FlowPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowPhase::Active => "active",
            FlowPhase::Submitting => "submitting",
            FlowPhase::Booked { .. } => "booked",
            FlowPhase::InlineCompleted(_) => "inline_completed",
            FlowPhase::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NextOutcome {
    Advanced { step: usize, kind: StepKind },
    Rejected { error: String },
    InlineCompleted { completion: InlineCompletion },
    /// Modal flow on its last step: only `submit` moves it forward.
    AwaitingSubmit,
    Unavailable,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created { booking_id: String },
    Rejected { error: String },
    Failed { error: String },
    InProgress,
    AlreadyBooked { booking_id: String },
    Unavailable,
}

/// A booking ready to be written, detached from the flow so the write can
/// run without holding the flow borrowed.
pub struct PreparedSubmission {
    owner_id: String,
    record: BookingRecord,
    store: Arc<dyn BookingStore>,
}

impl PreparedSubmission {
    pub fn record(&self) -> &BookingRecord {
        &self.record
    }

    pub async fn run(self) -> Result<String, PortError> {
        self.store.create_booking(&self.owner_id, &self.record).await
    }
}

/// Serializable snapshot of a flow for hosts that render it.
#[derive(Debug, Clone, Serialize)]
pub struct FlowView {
    pub card_id: String,
    pub settings_state: &'static str,
    pub message: Option<String>,
    pub professionals_state: &'static str,
    pub warning: Option<String>,
    pub phase: &'static str,
    pub booking_id: Option<String>,
    pub inline_mode: bool,
    pub current_step: usize,
    pub total_steps: usize,
    pub step: Option<StepKind>,
    pub steps: Vec<StepKind>,
    pub is_submitting: bool,
    pub form_error: Option<String>,
    pub session: BookingSession,
    pub services: Vec<BookingService>,
    pub professionals: Vec<Professional>,
    pub availability: Option<String>,
    /// Opening windows on the selected date.
    pub date_windows: Vec<AvailabilityWindow>,
}

pub struct BookingFlow {
    config: FlowConfig,
    ports: FlowPorts,
    host: Arc<dyn FlowHost>,
    settings: SettingsState,
    professionals: ProfessionalsState,
    professionals_rx: Option<oneshot::Receiver<ProfessionalsResult>>,
    professionals_task: Option<JoinHandle<()>>,
    session: BookingSession,
    phase: FlowPhase,
    idempotency_key: String,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl BookingFlow {
    pub fn new(config: FlowConfig, ports: FlowPorts, host: Arc<dyn FlowHost>) -> Self {
        let session = BookingSession::new(config.initial_step, &config.initial_data);
        Self {
            config,
            ports,
            host,
            settings: SettingsState::Loading,
            professionals: ProfessionalsState::NotRequested,
            professionals_rx: None,
            professionals_task: None,
            session,
            phase: FlowPhase::Active,
            idempotency_key: uuid::Uuid::new_v4().to_string(),
            today: local_today,
        }
    }

    /// Overrides the source of "today" used by the date validator.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Builds a flow and resolves its settings gate.
    pub async fn start(config: FlowConfig, ports: FlowPorts, host: Arc<dyn FlowHost>) -> Self {
        let mut flow = Self::new(config, ports, host);
        flow.load().await;
        flow
    }

    /// Fetches the card's settings. Once they are ready and allow choosing a
    /// professional, the directory fetch starts in the background.
    pub async fn load(&mut self) {
        if !matches!(self.settings, SettingsState::Loading) || self.phase == FlowPhase::Closed {
            return;
        }

        let result = self
            .ports
            .settings
            .fetch_booking_settings(&self.config.card_id)
            .await;
        self.settings = SettingsState::from_fetch(result);

        tracing::info!(
            card_id = %self.config.card_id,
            settings = self.settings.as_str(),
            inline = self.config.inline_mode,
            "booking settings resolved"
        );

        let wants_professionals = self
            .settings
            .settings()
            .is_some_and(|s| s.allow_professional_selection);
        if wants_professionals {
            self.spawn_professionals_fetch();
        }

        if self.settings.settings().is_some() {
            let plan = self.plan();
            self.session.set_step(plan.clamp(self.session.current_step()));
        }
    }

    /// Re-reads the settings of a running flow. A failed fetch keeps the
    /// settings already loaded. A gate that already closed the flow stays
    /// closed for the rest of the session.
    pub async fn reload_settings(&mut self) -> Result<(), PortError> {
        if self.phase == FlowPhase::Closed || self.settings.is_terminal() {
            return Ok(());
        }
        let fresh = self
            .ports
            .settings
            .fetch_booking_settings(&self.config.card_id)
            .await
            .inspect_err(|e| {
                tracing::warn!(card_id = %self.config.card_id, error = %e, "settings reload failed");
            })?;

        self.refresh();
        let allowed_before = self
            .settings
            .settings()
            .is_some_and(|s| s.allow_professional_selection);
        self.settings = SettingsState::from_fetch(Ok(fresh));

        let Some(settings) = self.settings.settings() else {
            tracing::info!(
                card_id = %self.config.card_id,
                settings = self.settings.as_str(),
                "booking closed by settings reload"
            );
            return Ok(());
        };

        let id = self.session.selected_service_id();
        if !id.is_empty() && settings.service(id).is_none() {
            self.session.clear_service();
            self.session
                .set_error(ValidationError::ServiceUnavailable.to_string());
        }

        let allowed_now = settings.allow_professional_selection;
        if allowed_now && !allowed_before {
            self.spawn_professionals_fetch();
        } else if !allowed_now && allowed_before {
            self.abort_professionals_fetch();
            self.professionals = ProfessionalsState::NotRequested;
        }
        self.clamp_step();
        Ok(())
    }

    fn spawn_professionals_fetch(&mut self) {
        self.abort_professionals_fetch();

        let (tx, rx) = oneshot::channel();
        let directory = Arc::clone(&self.ports.professionals);
        let owner_id = self.config.owner_id.clone();
        let handle = tokio::spawn(async move {
            let result = directory.fetch_professionals(&owner_id).await;
            if tx.send(result).is_err() {
                tracing::debug!(owner_id = %owner_id, "flow gone before professionals arrived, dropping result");
            }
        });

        self.professionals = ProfessionalsState::Loading;
        self.professionals_rx = Some(rx);
        self.professionals_task = Some(handle);
    }

    fn abort_professionals_fetch(&mut self) {
        self.professionals_rx = None;
        if let Some(handle) = self.professionals_task.take() {
            handle.abort();
        }
        if matches!(self.professionals, ProfessionalsState::Loading) {
            self.professionals = ProfessionalsState::NotRequested;
        }
    }

    /// Applies a finished directory fetch, if any. Called before every
    /// interaction so the step layout always reflects the latest data.
    pub fn refresh(&mut self) {
        let Some(rx) = self.professionals_rx.as_mut() else {
            return;
        };
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => Err(PortError::Unavailable(
                "professional directory stopped responding".to_string(),
            )),
        };
        self.apply_professionals(result);
    }

    /// Waits for the background directory fetch to finish.
    pub async fn professionals_settled(&mut self) {
        let Some(rx) = self.professionals_rx.take() else {
            return;
        };
        let result = rx.await.unwrap_or_else(|_| {
            Err(PortError::Unavailable(
                "professional directory stopped responding".to_string(),
            ))
        });
        self.apply_professionals(result);
    }

    fn apply_professionals(&mut self, result: ProfessionalsResult) {
        self.professionals_rx = None;
        self.professionals_task = None;
        self.professionals = ProfessionalsState::from_fetch(result);

        match &self.professionals {
            ProfessionalsState::Error { .. } => tracing::warn!(
                owner_id = %self.config.owner_id,
                "professional directory failed, omitting the professional step"
            ),
            state => tracing::debug!(
                owner_id = %self.config.owner_id,
                count = state.list().len(),
                "professional directory loaded"
            ),
        }
        self.clamp_step();
    }

    fn clamp_step(&mut self) {
        if self.settings.settings().is_none() {
            return;
        }
        let plan = self.plan();
        let step = self.session.current_step();
        if step > plan.total_steps() {
            self.session.set_step(plan.total_steps());
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn settings_state(&self) -> &SettingsState {
        &self.settings
    }

    pub fn professionals_state(&self) -> &ProfessionalsState {
        &self.professionals
    }

    pub fn phase(&self) -> &FlowPhase {
        &self.phase
    }

    pub fn session(&self) -> &BookingSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut BookingSession {
        &mut self.session
    }

    /// Applies field edits. Outside the active phase the session is frozen
    /// and this returns false.
    pub fn edit(&mut self, edit: SessionEdit) -> bool {
        self.refresh();
        if self.phase != FlowPhase::Active {
            return false;
        }
        self.session.apply(edit);
        true
    }

    pub fn plan(&self) -> StepPlan {
        StepPlan::new(self.config.inline_mode, self.professionals.step_available())
    }

    pub fn total_steps(&self) -> usize {
        self.plan().total_steps()
    }

    /// The logical step on screen, `None` while the settings gate is not open.
    pub fn current_step_kind(&self) -> Option<StepKind> {
        self.settings.settings()?;
        self.plan().step_at(self.session.current_step())
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FlowPhase::Submitting
    }

    fn is_interactive(&self) -> bool {
        self.phase == FlowPhase::Active && self.settings.settings().is_some()
    }

    fn step_context(&self) -> Option<StepContext<'_>> {
        let settings = self.settings.settings()?;
        Some(StepContext {
            services: &settings.services,
            today: (self.today)(),
        })
    }

    fn validate(&mut self, kind: StepKind) -> bool {
        let Some(settings) = self.settings.settings() else {
            return false;
        };
        let ctx = StepContext {
            services: &settings.services,
            today: (self.today)(),
        };
        validators::validate_step(kind, &mut self.session, ctx)
    }

    pub fn next(&mut self) -> NextOutcome {
        self.refresh();
        if !self.is_interactive() {
            return NextOutcome::Unavailable;
        }

        let plan = self.plan();
        let index = self.session.current_step();
        let Some(kind) = plan.step_at(index) else {
            return NextOutcome::Unavailable;
        };

        if !self.validate(kind) {
            return NextOutcome::Rejected {
                error: self.session.form_error().unwrap_or_default().to_string(),
            };
        }

        if !plan.is_last(index) {
            let step = index + 1;
            self.session.set_step(step);
            let kind = plan.step_at(step).unwrap_or(kind);
            return NextOutcome::Advanced { step, kind };
        }

        if !self.config.inline_mode {
            return NextOutcome::AwaitingSubmit;
        }

        let completion = self.inline_completion(plan);
        tracing::info!(
            card_id = %self.config.card_id,
            service_id = %completion.service_id,
            "inline booking flow completed"
        );
        self.phase = FlowPhase::InlineCompleted(completion.clone());
        self.host.on_inline_complete(&completion);
        NextOutcome::InlineCompleted { completion }
    }

    fn inline_completion(&self, plan: StepPlan) -> InlineCompletion {
        let professional_id = Some(self.session.selected_professional_id())
            .filter(|id| plan.professional_step && !id.is_empty())
            .map(str::to_string);
        InlineCompletion {
            date: self.session.selected_date().to_string(),
            time: self.session.selected_time().to_string(),
            service_id: self.session.selected_service_id().to_string(),
            professional_id,
        }
    }

    pub fn prev(&mut self) {
        self.refresh();
        if !self.is_interactive() {
            return;
        }
        let step = self.session.current_step();
        if step > 1 {
            self.session.set_step(step - 1);
        }
        self.session.clear_error();
    }

    /// Validates the details step and builds the booking to write, marking
    /// the flow as submitting. Pair with [`BookingFlow::finish_submit`].
    pub fn begin_submit(&mut self) -> Result<PreparedSubmission, SubmitOutcome> {
        self.refresh();
        match &self.phase {
            FlowPhase::Active => {}
            FlowPhase::Submitting => return Err(SubmitOutcome::InProgress),
            FlowPhase::Booked { booking_id } => {
                return Err(SubmitOutcome::AlreadyBooked {
                    booking_id: booking_id.clone(),
                })
            }
            FlowPhase::InlineCompleted(_) | FlowPhase::Closed => {
                return Err(SubmitOutcome::Unavailable)
            }
        }
        if self.config.inline_mode || self.current_step_kind() != Some(StepKind::Details) {
            return Err(SubmitOutcome::Unavailable);
        }

        if !self.validate(StepKind::Details) {
            return Err(self.rejected());
        }
        if !self.validate(StepKind::Service) {
            // back to the service step so a new one can be picked
            self.session.set_step(1);
            return Err(self.rejected());
        }

        let date_time = match self.appointment_time() {
            Ok(dt) => dt,
            Err(e) => {
                self.session.set_error(e);
                return Err(self.rejected());
            }
        };

        let record = self.build_record(date_time);
        self.session.clear_error();
        self.phase = FlowPhase::Submitting;

        Ok(PreparedSubmission {
            owner_id: self.config.owner_id.clone(),
            record,
            store: Arc::clone(&self.ports.bookings),
        })
    }

    fn rejected(&self) -> SubmitOutcome {
        SubmitOutcome::Rejected {
            error: self.session.form_error().unwrap_or_default().to_string(),
        }
    }

    fn appointment_time(&self) -> Result<NaiveDateTime, String> {
        let Some(ctx) = self.step_context() else {
            return Err(ValidationError::DateRequired.to_string());
        };
        let date =
            validators::validate_date(self.session.selected_date(), ctx.today).map_err(|e| e.to_string())?;
        validators::validate_time(self.session.selected_time()).map_err(|e| e.to_string())?;
        let time = NaiveTime::parse_from_str(self.session.selected_time().trim(), "%H:%M")
            .map_err(|_| "Please select a valid time.".to_string())?;
        Ok(date.and_time(time))
    }

    fn build_record(&self, date_time: NaiveDateTime) -> BookingRecord {
        let service_id = self.session.selected_service_id().to_string();
        let service_name = self
            .settings
            .settings()
            .and_then(|s| s.service(&service_id))
            .map(|s| s.name.clone())
            .unwrap_or_default();

        let professional = Some(self.session.selected_professional_id())
            .filter(|id| self.plan().professional_step && !id.is_empty())
            .map(|id| {
                let name = self
                    .professionals
                    .list()
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| p.name.clone());
                (id.to_string(), name)
            });
        let (professional_id, professional_name) = match professional {
            Some((id, name)) => (Some(id), name),
            None => (None, None),
        };

        BookingRecord {
            professional_user_id: self.config.owner_id.clone(),
            card_id: self.config.card_id.clone(),
            service_id,
            service_name,
            customer_name: self.session.customer_name().trim().to_string(),
            customer_email: self.session.customer_email().trim().to_string(),
            date_time,
            status: BookingStatus::Pending,
            professional_id,
            professional_name,
            created_at: Utc::now().naive_utc(),
            payment_status: None,
            stripe_checkout_session_id: None,
            idempotency_key: Some(self.idempotency_key.clone()),
        }
    }

    /// Records the result of a write started by [`BookingFlow::begin_submit`].
    pub fn finish_submit(&mut self, result: Result<String, PortError>) -> SubmitOutcome {
        if self.phase == FlowPhase::Closed {
            tracing::info!(
                card_id = %self.config.card_id,
                ok = result.is_ok(),
                "submission finished after the flow was closed"
            );
            return match result {
                Ok(booking_id) => SubmitOutcome::Created { booking_id },
                Err(e) => SubmitOutcome::Failed {
                    error: e.to_string(),
                },
            };
        }

        match result {
            Ok(booking_id) => {
                tracing::info!(
                    card_id = %self.config.card_id,
                    owner_id = %self.config.owner_id,
                    booking_id = %booking_id,
                    "booking created"
                );
                self.phase = FlowPhase::Booked {
                    booking_id: booking_id.clone(),
                };
                SubmitOutcome::Created { booking_id }
            }
            Err(e) => {
                tracing::error!(card_id = %self.config.card_id, error = %e, "failed to save booking");
                let error = format!("Could not save your booking: {e}");
                self.phase = FlowPhase::Active;
                self.session.set_error(error.clone());
                SubmitOutcome::Failed { error }
            }
        }
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        match self.begin_submit() {
            Ok(prepared) => {
                let result = prepared.run().await;
                self.finish_submit(result)
            }
            Err(outcome) => outcome,
        }
    }

    /// Ends the flow. Pending fetches are abandoned and later results ignored.
    pub fn close(&mut self) {
        if self.phase == FlowPhase::Closed {
            return;
        }
        self.abort_professionals_fetch();
        self.phase = FlowPhase::Closed;
        tracing::debug!(card_id = %self.config.card_id, "booking flow closed");
        self.host.on_close();
    }

    pub fn view(&mut self) -> FlowView {
        self.refresh();
        let ready = self.settings.settings();
        let plan = self.plan();
        let (total_steps, steps) = match ready {
            Some(_) => (plan.total_steps(), plan.steps()),
            None => (0, Vec::new()),
        };
        FlowView {
            card_id: self.config.card_id.clone(),
            settings_state: self.settings.as_str(),
            message: self.settings.message(),
            professionals_state: self.professionals.as_str(),
            warning: self.professionals.warning().map(str::to_string),
            phase: self.phase.as_str(),
            booking_id: match &self.phase {
                FlowPhase::Booked { booking_id } => Some(booking_id.clone()),
                _ => None,
            },
            inline_mode: self.config.inline_mode,
            current_step: self.session.current_step(),
            total_steps,
            step: self.current_step_kind(),
            steps,
            is_submitting: self.is_submitting(),
            form_error: self.session.form_error().map(str::to_string),
            session: self.session.clone(),
            services: ready.map(|s| s.services.clone()).unwrap_or_default(),
            professionals: self.professionals.list().to_vec(),
            availability: ready
                .map(|s| s.availability.to_human_readable())
                .filter(|s| !s.is_empty()),
            date_windows: ready
                .zip(NaiveDate::parse_from_str(self.session.selected_date().trim(), "%Y-%m-%d").ok())
                .map(|(s, date)| s.availability.windows_for(date).to_vec())
                .unwrap_or_default(),
        }
    }
}

impl Drop for BookingFlow {
    fn drop(&mut self) {
        self.abort_professionals_fetch();
    }
}
