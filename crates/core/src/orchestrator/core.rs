use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    error::{Error, StrategyError, StrategyErrorKind},
    events::{EventChannel, FatalReason, Notification},
    orchestrator::{Event, EventResult, OrchestratorHandle, SessionStats, SessionSummary},
    persistence::{Snapshot, StateStore},
    resolver::{ResolutionOutcome, Resolver},
    strategy::{StrategyRegistry, StrategyReporter},
    types::{
        config::OrchestratorConfig,
        position::Position,
        primitives::StrategyName,
        selector::{StrategyRole, StrategySelector},
        state::OrchestratorState,
    },
};

struct PendingResolution {
    ticket: u64,
    kind: StrategyErrorKind,
    /// State to return to once the outcome is known.
    resume: OrchestratorState,
    task: JoinHandle<()>,
}

/// Per-start delivery caps.
#[derive(Debug, Default)]
struct SessionFlags {
    initial_sent: bool,
    fatal_sent: bool,
}

/// Single-owner state machine driving one active strategy at a time.
///
/// All mutations arrive as [`Event`]s on one queue: control calls from
/// [`OrchestratorHandle`], fixes and failures from strategies, and resolver
/// outcomes. Nothing here is shared, so nothing is locked.
pub struct Orchestrator {
    config: OrchestratorConfig,
    strategies: StrategyRegistry,
    resolver: Arc<dyn Resolver>,
    store: Arc<dyn StateStore>,
    channel: EventChannel,
    clock: Arc<dyn Clock>,
    queue: mpsc::UnboundedSender<Event>,
    inbox: mpsc::UnboundedReceiver<Event>,
    state: OrchestratorState,
    last_position: Option<Position>,
    current: StrategyRole,
    active: bool,
    stopped: bool,
    fallback_enabled: bool,
    pending: Option<PendingResolution>,
    next_ticket: u64,
    session: SessionFlags,
    stats: SessionStats,
}

impl Orchestrator {
    /// Builds an orchestrator from whatever the store holds. Nothing starts
    /// until a `Start` event is handled.
    pub async fn restore(
        config: OrchestratorConfig,
        strategies: StrategyRegistry,
        resolver: Arc<dyn Resolver>,
        store: Arc<dyn StateStore>,
        channel: EventChannel,
    ) -> Result<Self, Error> {
        let snapshot = Snapshot::load(store.as_ref()).await?;
        info!(
            state = ?snapshot.state,
            cached = snapshot.position.is_some(),
            "restored orchestrator"
        );

        let (queue, inbox) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            strategies,
            resolver,
            store,
            channel,
            clock: Arc::new(SystemClock),
            queue,
            inbox,
            state: snapshot.state,
            last_position: snapshot.position,
            current: StrategyRole::Primary,
            active: false,
            stopped: true,
            fallback_enabled: true,
            pending: None,
            next_ticket: 0,
            session: SessionFlags::default(),
            stats: SessionStats::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle::new(self.queue.clone())
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    /// Role of the strategy currently acquiring, if any.
    pub fn active_strategy(&self) -> Option<StrategyRole> {
        self.active.then_some(self.current)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    pub fn is_resolving(&self) -> bool {
        self.pending.is_some()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Processes events until shutdown, then tears down.
    pub async fn run(mut self) -> Result<SessionSummary, Error> {
        while let Some(result) = self.next().await {
            if let EventResult::Finished = result {
                break;
            }
        }

        self.teardown().await
    }

    /// Waits for and handles the next queued event.
    pub async fn next(&mut self) -> Option<EventResult> {
        let event = self.inbox.recv().await?;
        Some(self.handle_event(event))
    }

    /// Handles every event already queued without waiting for more.
    pub fn drain(&mut self) -> EventResult {
        while let Ok(event) = self.inbox.try_recv() {
            if let EventResult::Finished = self.handle_event(event) {
                return EventResult::Finished;
            }
        }
        EventResult::Continue
    }

    pub fn handle_event(&mut self, event: Event) -> EventResult {
        match event {
            Event::Start(selector) => self.start(selector),
            Event::Stop => self.stop(),
            Event::Shutdown => {
                self.stop();
                return EventResult::Finished;
            }
            Event::LocationObtained { strategy, position } => {
                if self.accepts(strategy) {
                    self.on_location(position);
                }
            }
            Event::StrategyFailed(error) => {
                if self.accepts(error.strategy) {
                    self.on_failure(error);
                }
            }
            Event::Resolution { ticket, outcome } => self.on_resolution(ticket, outcome),
        }

        EventResult::Continue
    }

    /// Stops acquisition and persists state and last position.
    pub async fn teardown(&mut self) -> Result<SessionSummary, Error> {
        self.cancel_resolution();
        self.deactivate();

        if self.state == OrchestratorState::AbortingUpdate {
            self.state = OrchestratorState::Done;
        }

        let snapshot = Snapshot {
            state: self.state,
            position: self.last_position.clone(),
        };
        snapshot.save(self.store.as_ref()).await?;
        info!(state = ?self.state, "orchestrator state persisted");

        Ok(SessionSummary {
            state: snapshot.state,
            last_position: snapshot.position,
            stats: self.stats,
        })
    }

    fn start(&mut self, selector: StrategySelector) {
        self.cancel_resolution();
        self.deactivate();

        self.stopped = false;
        self.fallback_enabled = selector.fallback_enabled();
        self.session = SessionFlags::default();

        let now = self.clock.now();
        self.state = match self.last_position.clone() {
            None => OrchestratorState::WaitingInitialFix,
            Some(position) if position.is_stale(now, self.config.staleness_threshold) => {
                debug!(age = ?position.age_at(now), "cached position is stale");
                self.emit_initial(position);
                OrchestratorState::WaitingUpdatedFix
            }
            Some(position) => {
                self.emit_updated(position);
                OrchestratorState::Done
            }
        };

        info!(%selector, state = ?self.state, "starting location session");
        self.activate(selector.initial_role());
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.cancel_resolution();

        if self.state == OrchestratorState::WaitingUpdatedFix {
            self.state = OrchestratorState::AbortingUpdate;
        }

        self.deactivate();
        info!(state = ?self.state, "location session stopped");
    }

    /// Drops late callbacks after stop and callbacks from a strategy that
    /// is no longer the active one.
    fn accepts(&self, strategy: StrategyName) -> bool {
        if self.stopped {
            debug!(%strategy, "orchestrator stopped, dropping strategy callback");
            return false;
        }
        if !self.active || self.strategies.name(self.current) != strategy {
            debug!(%strategy, "callback from inactive strategy dropped");
            return false;
        }
        true
    }

    fn on_location(&mut self, position: Position) {
        self.last_position = Some(position.clone());

        let state = match &self.pending {
            Some(pending) => pending.resume,
            None => self.state,
        };

        let next = if state == OrchestratorState::AbortingUpdate {
            debug!("update aborted, fix cached without delivery");
            state
        } else if state.awaits_initial_fix() && !self.session.initial_sent {
            self.emit_initial(position);
            OrchestratorState::WaitingUpdatedFix
        } else {
            self.emit_updated(position);
            OrchestratorState::Done
        };

        match &mut self.pending {
            Some(pending) => pending.resume = next,
            None => self.state = next,
        }
    }

    fn on_failure(&mut self, error: StrategyError) {
        let role = self.current;
        let kind = error.kind;
        warn!(strategy = %error.strategy, %kind, ?role, "strategy failed");

        match kind {
            StrategyErrorKind::ConnectionFailure if error.payload.is_some() => {
                self.escalate(error);
            }
            StrategyErrorKind::ConnectionFailure | StrategyErrorKind::Unrecoverable => {
                self.handle_unrecoverable(kind);
            }
            StrategyErrorKind::Disabled => {
                self.deactivate();
                if self.may_fall_back() {
                    self.cancel_resolution();
                    self.fall_back();
                } else {
                    self.escalate(error);
                }
            }
        }
    }

    fn handle_unrecoverable(&mut self, kind: StrategyErrorKind) {
        self.cancel_resolution();
        self.deactivate();

        if self.may_fall_back() {
            self.fall_back();
            return;
        }

        let reason = FatalReason {
            strategy: self.strategies.name(self.current),
            kind,
        };
        self.state = OrchestratorState::UnrecoverableError;

        if self.session.fatal_sent {
            debug!(%reason, "fatal error already reported for this session");
            return;
        }
        self.session.fatal_sent = true;
        warn!(%reason, "location acquisition failed");
        self.channel.publish(Notification::FatalError(reason));
    }

    fn may_fall_back(&self) -> bool {
        self.fallback_enabled && self.current == StrategyRole::Primary
    }

    fn fall_back(&mut self) {
        info!(
            from = %self.strategies.name(StrategyRole::Primary),
            to = %self.strategies.name(StrategyRole::Fallback),
            "falling back"
        );
        self.stats.fallbacks += 1;
        self.activate(StrategyRole::Fallback);
    }

    /// Hands `error` to the resolver on its own task. A second escalation
    /// while one is outstanding is dropped.
    fn escalate(&mut self, error: StrategyError) {
        if self.pending.is_some() {
            debug!(strategy = %error.strategy, kind = %error.kind, "resolution in flight, dropping");
            return;
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let kind = error.kind;
        let resolver = Arc::clone(&self.resolver);
        let queue = self.queue.clone();
        let timeout = self.config.resolution_timeout;

        info!(strategy = %error.strategy, %kind, ticket, "escalating to resolver");

        let task = tokio::spawn(async move {
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, resolver.resolve(error)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(ticket, ?limit, "resolution timed out");
                        ResolutionOutcome::NotSolved
                    }
                },
                None => resolver.resolve(error).await,
            };
            let _ = queue.send(Event::Resolution { ticket, outcome });
        });

        self.pending = Some(PendingResolution {
            ticket,
            kind,
            resume: self.state,
            task,
        });
        self.state = OrchestratorState::RecoveringFromError;
        self.stats.resolutions += 1;
    }

    fn on_resolution(&mut self, ticket: u64, outcome: ResolutionOutcome) {
        let pending = match self.pending.take() {
            Some(pending) if pending.ticket == ticket => pending,
            other => {
                self.pending = other;
                debug!(ticket, ?outcome, "ignoring outcome of an abandoned resolution");
                return;
            }
        };
        self.state = pending.resume;

        if self.stopped {
            return;
        }

        info!(ticket, ?outcome, strategy = %self.strategies.name(self.current), "resolution finished");
        match outcome {
            ResolutionOutcome::Solved => {
                self.deactivate();
                self.activate(self.current);
            }
            ResolutionOutcome::NotSolved => self.handle_unrecoverable(pending.kind),
        }
    }

    fn cancel_resolution(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(ticket = pending.ticket, "abandoning resolution");
            pending.task.abort();
            self.state = pending.resume;
        }
    }

    fn activate(&mut self, role: StrategyRole) {
        self.current = role;
        let name = self.strategies.name(role);
        let reporter = StrategyReporter::new(name, self.queue.clone());
        self.strategies.get_mut(role).start(reporter);
        self.active = true;
        info!(strategy = %name, ?role, "strategy started");
    }

    fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.strategies.get_mut(self.current).stop();
        debug!(strategy = %self.strategies.name(self.current), "strategy stopped");
    }

    fn emit_initial(&mut self, position: Position) {
        self.session.initial_sent = true;
        self.stats.initial_fixes += 1;
        self.channel.publish(Notification::InitialFix(position));
    }

    fn emit_updated(&mut self, position: Position) {
        self.stats.updated_fixes += 1;
        self.channel.publish(Notification::UpdatedFix(position));
    }
}
