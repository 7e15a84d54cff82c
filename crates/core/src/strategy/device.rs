//! Strategy backed by the device's own location providers (GPS, Wi-Fi, cell).
//!
//! Slower than the service strategy but independent of any third-party
//! service. The best provider is re-probed on every provider status change;
//! a disabled location system is reported instead of silently stalling.

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, stream::BoxStream};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    error::StrategyError,
    strategy::traits::{Strategy, StrategyReporter},
    types::{position::Position, primitives::StrategyName},
};

pub const DEVICE_STRATEGY: StrategyName = StrategyName::new("device");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccuracyCriteria {
    Fine,
    #[default]
    Medium,
    Coarse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Location(Position),
    StatusChanged(String),
    ProviderEnabled(String),
    ProviderDisabled(String),
}

pub type ProviderEventStream = BoxStream<'static, ProviderEvent>;

pub trait DeviceProviders: Send + Sync + 'static {
    /// Whether the device-wide location setting is on.
    fn is_location_enabled(&self) -> bool;

    /// Best enabled provider for `criteria`, if any.
    fn best_provider(&self, criteria: AccuracyCriteria) -> Option<String>;

    fn last_known(&self, provider: &str) -> Option<Position>;

    /// Registers for updates from `provider`. Replaces any previous registration.
    fn request_updates(
        &self,
        provider: &str,
        min_interval: Duration,
        min_distance: f32,
    ) -> ProviderEventStream;

    fn remove_updates(&self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateSettings {
    pub criteria: AccuracyCriteria,
    pub min_interval: Duration,
    /// Meters.
    pub min_distance: f32,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            criteria: AccuracyCriteria::Medium,
            min_interval: Duration::from_secs(20),
            min_distance: 1.0,
        }
    }
}

pub struct DeviceStrategy<D> {
    providers: Arc<D>,
    settings: UpdateSettings,
    listener: Option<JoinHandle<()>>,
}

impl<D> DeviceStrategy<D>
where
    D: DeviceProviders,
{
    pub fn new(providers: D) -> Self {
        Self::with_settings(providers, UpdateSettings::default())
    }

    pub fn with_settings(providers: D, settings: UpdateSettings) -> Self {
        Self {
            providers: Arc::new(providers),
            settings,
            listener: None,
        }
    }

    pub fn providers(&self) -> &D {
        &self.providers
    }

    fn abort_listener(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl<D> Strategy for DeviceStrategy<D>
where
    D: DeviceProviders,
{
    fn name(&self) -> StrategyName {
        DEVICE_STRATEGY
    }

    fn start(&mut self, reporter: StrategyReporter) {
        self.abort_listener();

        let Some(provider) = find_best_provider(self.providers.as_ref(), &self.settings, &reporter)
        else {
            return;
        };

        if let Some(position) = self.providers.last_known(&provider) {
            reporter.location_obtained(position);
        }

        let updates = self.providers.request_updates(
            &provider,
            self.settings.min_interval,
            self.settings.min_distance,
        );
        info!(strategy = %DEVICE_STRATEGY, %provider, "requested provider updates");

        self.listener = Some(tokio::spawn(listen(
            Arc::clone(&self.providers),
            self.settings,
            provider,
            updates,
            reporter,
        )));
    }

    fn stop(&mut self) {
        self.abort_listener();
        self.providers.remove_updates();
    }
}

impl<D> Drop for DeviceStrategy<D> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Reports `Disabled` when the location system is off or no provider qualifies.
fn find_best_provider<D>(
    providers: &D,
    settings: &UpdateSettings,
    reporter: &StrategyReporter,
) -> Option<String>
where
    D: DeviceProviders,
{
    let best = providers
        .is_location_enabled()
        .then(|| providers.best_provider(settings.criteria))
        .flatten()
        .filter(|provider| !provider.is_empty());

    if best.is_none() {
        reporter.strategy_error(StrategyError::disabled(reporter.strategy()));
    }
    best
}

async fn listen<D>(
    providers: Arc<D>,
    settings: UpdateSettings,
    mut provider: String,
    mut updates: ProviderEventStream,
    reporter: StrategyReporter,
) where
    D: DeviceProviders,
{
    while let Some(event) = updates.next().await {
        let changed = match event {
            ProviderEvent::Location(position) => {
                reporter.location_obtained(position);
                continue;
            }
            ProviderEvent::StatusChanged(name)
            | ProviderEvent::ProviderEnabled(name)
            | ProviderEvent::ProviderDisabled(name) => name,
        };
        debug!(strategy = %reporter.strategy(), provider = %changed, "provider status changed");

        let Some(best) = find_best_provider(providers.as_ref(), &settings, &reporter) else {
            return;
        };
        if best != provider {
            info!(from = %provider, to = %best, "best provider changed, restarting updates");
            providers.remove_updates();
            updates = providers.request_updates(&best, settings.min_interval, settings.min_distance);
            provider = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex, PoisonError,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
    };

    use tokio::sync::mpsc;

    use super::*;
    use crate::{error::StrategyErrorKind, orchestrator::Event, types::primitives::Timestamp};

    #[derive(Default)]
    struct FakeProviders {
        enabled: AtomicBool,
        best: Mutex<Option<String>>,
        last: Option<Position>,
        requests: Mutex<Vec<String>>,
        removals: AtomicUsize,
        feeds: Mutex<VecDeque<mpsc::UnboundedReceiver<ProviderEvent>>>,
    }

    impl FakeProviders {
        fn enabled_with(provider: &str) -> Self {
            Self {
                enabled: AtomicBool::new(true),
                best: Mutex::new(Some(provider.to_string())),
                ..Default::default()
            }
        }

        fn feed(&self) -> mpsc::UnboundedSender<ProviderEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.feeds
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(rx);
            tx
        }

        fn set_best(&self, provider: Option<&str>) {
            *self.best.lock().unwrap_or_else(PoisonError::into_inner) =
                provider.map(str::to_string);
        }

        fn requests(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl DeviceProviders for FakeProviders {
        fn is_location_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn best_provider(&self, _criteria: AccuracyCriteria) -> Option<String> {
            self.best.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        fn last_known(&self, _provider: &str) -> Option<Position> {
            self.last.clone()
        }

        fn request_updates(
            &self,
            provider: &str,
            _min_interval: Duration,
            _min_distance: f32,
        ) -> ProviderEventStream {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(provider.to_string());
            match self
                .feeds
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
            {
                Some(receiver) => futures::stream::unfold(receiver, |mut receiver| async move {
                    receiver.recv().await.map(|event| (event, receiver))
                })
                .boxed(),
                None => futures::stream::pending().boxed(),
            }
        }

        fn remove_updates(&self) {
            self.removals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fix(provider: &str, ms: u64) -> Position {
        Position::new(provider, Timestamp::from_millis(ms), 35.68, 139.69)
    }

    async fn next_event(inbox: &mut mpsc::UnboundedReceiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(1), inbox.recv())
            .await
            .expect("strategy should report")
            .expect("queue open")
    }

    fn expect_fix(event: Event) -> Position {
        match event {
            Event::LocationObtained { position, .. } => position,
            other => panic!("expected a fix, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_location_reports_disabled_without_subscribing() {
        let mut strategy = DeviceStrategy::new(FakeProviders::default());
        let (queue, mut inbox) = mpsc::unbounded_channel();

        strategy.start(StrategyReporter::new(DEVICE_STRATEGY, queue));

        match inbox.try_recv().expect("reported synchronously") {
            Event::StrategyFailed(error) => {
                assert_eq!(error.kind, StrategyErrorKind::Disabled);
                assert_eq!(error.strategy, DEVICE_STRATEGY);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(strategy.providers().requests().is_empty());
    }

    #[tokio::test]
    async fn delivers_last_known_before_updates() {
        let providers = FakeProviders {
            last: Some(fix("gps", 1)),
            ..FakeProviders::enabled_with("gps")
        };
        let feed = providers.feed();
        let mut strategy = DeviceStrategy::new(providers);
        let (queue, mut inbox) = mpsc::unbounded_channel();

        strategy.start(StrategyReporter::new(DEVICE_STRATEGY, queue));
        feed.send(ProviderEvent::Location(fix("gps", 2))).expect("feed");

        assert_eq!(expect_fix(inbox.try_recv().expect("synchronous last known")).time.as_millis(), 1);
        assert_eq!(expect_fix(next_event(&mut inbox).await).time.as_millis(), 2);
        assert_eq!(strategy.providers().requests(), vec!["gps".to_string()]);
    }

    #[tokio::test]
    async fn restarts_updates_only_when_best_provider_changes() {
        let providers = FakeProviders::enabled_with("network");
        let first = providers.feed();
        let second = providers.feed();
        let mut strategy = DeviceStrategy::new(providers);
        let (queue, mut inbox) = mpsc::unbounded_channel();

        strategy.start(StrategyReporter::new(DEVICE_STRATEGY, queue));

        first
            .send(ProviderEvent::StatusChanged("network".into()))
            .expect("feed");
        first
            .send(ProviderEvent::Location(fix("network", 10)))
            .expect("feed");
        assert_eq!(expect_fix(next_event(&mut inbox).await).provider, "network");
        assert_eq!(strategy.providers().requests().len(), 1);

        strategy.providers().set_best(Some("gps"));
        first
            .send(ProviderEvent::ProviderEnabled("gps".into()))
            .expect("feed");
        second.send(ProviderEvent::Location(fix("gps", 20))).expect("feed");

        assert_eq!(expect_fix(next_event(&mut inbox).await).provider, "gps");
        assert_eq!(
            strategy.providers().requests(),
            vec!["network".to_string(), "gps".to_string()]
        );
        assert_eq!(strategy.providers().removals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_loss_is_reported_as_disabled() {
        let providers = FakeProviders::enabled_with("gps");
        let feed = providers.feed();
        let mut strategy = DeviceStrategy::new(providers);
        let (queue, mut inbox) = mpsc::unbounded_channel();

        strategy.start(StrategyReporter::new(DEVICE_STRATEGY, queue));
        strategy.providers().enabled.store(false, Ordering::SeqCst);
        feed.send(ProviderEvent::ProviderDisabled("gps".into()))
            .expect("feed");

        match next_event(&mut inbox).await {
            Event::StrategyFailed(error) => assert_eq!(error.kind, StrategyErrorKind::Disabled),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut strategy = DeviceStrategy::new(FakeProviders::enabled_with("gps"));
        strategy.stop();

        let (queue, _inbox) = mpsc::unbounded_channel();
        strategy.start(StrategyReporter::new(DEVICE_STRATEGY, queue));
        strategy.stop();
        strategy.stop();

        assert_eq!(strategy.providers().removals.load(Ordering::SeqCst), 3);
    }
}
