//! Strategy backed by a fused/cloud location service.
//!
//! Connects, verifies that the device settings allow the requested quality,
//! delivers the service's last location and then forwards its update stream.
//! Failures that the service can resolve (through a settings dialog, an
//! update of the service itself, ...) are reported as connection failures
//! carrying the service's resolution payload; everything else is reported as
//! unrecoverable.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    error::{ResolutionPayload, StrategyError},
    strategy::traits::{Strategy, StrategyReporter},
    types::{position::Position, primitives::StrategyName},
};

pub const SERVICE_STRATEGY: StrategyName = StrategyName::new("service");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    HighAccuracy,
    Balanced,
    LowPower,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRequest {
    pub priority: Priority,
    pub interval: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            priority: Priority::HighAccuracy,
            interval: Duration::from_secs(10),
        }
    }
}

/// Failure of a service call, optionally resolvable.
#[derive(Debug, Clone)]
pub struct ServiceFailure {
    pub message: String,
    pub resolution: Option<ResolutionPayload>,
}

impl ServiceFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resolution: None,
        }
    }

    pub fn with_resolution(mut self, resolution: ResolutionPayload) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

pub type PositionStream = BoxStream<'static, Position>;

#[async_trait]
pub trait LocationService: Send + Sync + 'static {
    fn is_connected(&self) -> bool;

    async fn connect(&self) -> Result<(), ServiceFailure>;

    async fn check_settings(&self, request: &LocationRequest) -> Result<(), ServiceFailure>;

    async fn last_location(&self) -> Option<Position>;

    /// The stream ending means the service suspended the subscription.
    async fn subscribe(&self, request: &LocationRequest) -> Result<PositionStream, ServiceFailure>;

    fn unsubscribe(&self);

    fn disconnect(&self);
}

pub struct ServiceStrategy<S> {
    service: Arc<S>,
    request: LocationRequest,
    session: Option<JoinHandle<()>>,
}

impl<S> ServiceStrategy<S>
where
    S: LocationService,
{
    pub fn new(service: S) -> Self {
        Self::with_request(service, LocationRequest::default())
    }

    pub fn with_request(service: S, request: LocationRequest) -> Self {
        Self {
            service: Arc::new(service),
            request,
            session: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// A session is in flight from `start` until it reports an error or is stopped.
    pub fn is_waiting_for_status(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.is_finished())
    }
}

impl<S> Strategy for ServiceStrategy<S>
where
    S: LocationService,
{
    fn name(&self) -> StrategyName {
        SERVICE_STRATEGY
    }

    fn start(&mut self, reporter: StrategyReporter) {
        if self.is_waiting_for_status() {
            debug!(strategy = %SERVICE_STRATEGY, "start already in flight, ignoring");
            return;
        }

        let service = Arc::clone(&self.service);
        let request = self.request.clone();
        self.session = Some(tokio::spawn(run_session(service, request, reporter)));
    }

    fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.abort();
        }
        if self.service.is_connected() {
            self.service.unsubscribe();
        }
        self.service.disconnect();
    }
}

impl<S> Drop for ServiceStrategy<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.abort();
        }
    }
}

async fn run_session<S>(service: Arc<S>, request: LocationRequest, reporter: StrategyReporter)
where
    S: LocationService,
{
    let strategy = reporter.strategy();

    if !service.is_connected() {
        if let Err(failure) = service.connect().await {
            return report_failure(&reporter, "connect", failure);
        }
        info!(strategy = %strategy, "connected to location service");
    }

    if let Err(failure) = service.check_settings(&request).await {
        return report_failure(&reporter, "settings check", failure);
    }

    if let Some(position) = service.last_location().await {
        reporter.location_obtained(position);
    }

    let mut updates = match service.subscribe(&request).await {
        Ok(updates) => updates,
        Err(failure) => return report_failure(&reporter, "subscribe", failure),
    };

    while let Some(position) = updates.next().await {
        reporter.location_obtained(position);
    }

    warn!(strategy = %strategy, "location service suspended the subscription");
    reporter.strategy_error(StrategyError::connection_failure(strategy, None));
}

fn report_failure(reporter: &StrategyReporter, step: &str, failure: ServiceFailure) {
    let strategy = reporter.strategy();
    warn!(
        strategy = %strategy,
        step,
        message = %failure.message,
        resolvable = failure.resolution.is_some(),
        "location service call failed"
    );

    let error = match failure.resolution {
        Some(payload) => StrategyError::connection_failure(strategy, Some(payload)),
        None => StrategyError::unrecoverable(strategy),
    };
    reporter.strategy_error(error);
}
