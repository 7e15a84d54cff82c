//! Scripted location sources driven by a TOML track file.
//!
//! Lets the orchestrator run end to end without real hardware: the service
//! side can be scripted to fail at a given stage (optionally with a
//! resolution the prompt can apply) and the device side can lose its
//! provider after a number of fixes.

use std::{
    fmt,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use serde::Deserialize;
use tracing::debug;

use locus_core::{
    AccuracyCriteria, Clock, DeviceProviders, LocationRequest, LocationService, Position,
    PositionStream, ProviderEvent, ProviderEventStream, ResolutionPayload, ServiceFailure,
    Timestamp,
};

use crate::config::{ConfigError, read_toml};

pub const SERVICE_PROVIDER: &str = "fused";

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Track {
    pub service: ServiceTrack,
    pub device: DeviceTrack,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TrackFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: f32,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub bearing: f32,
    #[serde(default)]
    pub speed: f32,
    /// How old the fix already is when it is delivered.
    #[serde(default)]
    pub age_secs: u64,
}

impl TrackFix {
    pub fn to_position(&self, provider: &str, now: Timestamp) -> Position {
        let age_ms = self.age_secs.saturating_mul(1_000);
        let time = Timestamp::from_millis(now.as_millis().saturating_sub(age_ms));

        Position::new(provider, time, self.latitude, self.longitude)
            .with_accuracy(self.accuracy)
            .with_altitude(self.altitude)
            .with_bearing(self.bearing)
            .with_speed(self.speed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Connect,
    Settings,
    Subscribe,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("connect"),
            Self::Settings => f.write_str("settings check"),
            Self::Subscribe => f.write_str("subscribe"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptedFailure {
    pub stage: FailureStage,
    #[serde(default)]
    pub resolvable: bool,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceTrack {
    pub last: Option<TrackFix>,
    pub fixes: Vec<TrackFix>,
    pub interval_ms: u64,
    pub failure: Option<ScriptedFailure>,
    /// Suspend the subscription once the fixes run out.
    pub suspend_at_end: bool,
}

impl Default for ServiceTrack {
    fn default() -> Self {
        Self {
            last: None,
            fixes: Vec::new(),
            interval_ms: 1_000,
            failure: None,
            suspend_at_end: false,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceTrack {
    pub enabled: bool,
    pub provider: String,
    pub last: Option<TrackFix>,
    pub fixes: Vec<TrackFix>,
    pub interval_ms: u64,
    /// Provider is switched off after this many fixes.
    pub disable_after: Option<usize>,
}

impl Default for DeviceTrack {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "gps".to_string(),
            last: None,
            fixes: Vec::new(),
            interval_ms: 1_000,
            disable_after: None,
        }
    }
}

pub fn load_track(path: impl AsRef<Path>) -> Result<Track, ConfigError> {
    read_toml(path.as_ref())
}

/// Resolution handed out with a resolvable scripted failure. Applying it
/// makes the failing stage succeed from then on.
#[derive(Debug, Clone)]
pub struct Repair {
    stage: FailureStage,
    applied: Arc<AtomicBool>,
}

impl Repair {
    pub fn stage(&self) -> FailureStage {
        self.stage
    }

    pub fn apply(&self) {
        self.applied.store(true, Ordering::SeqCst);
    }

    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::SeqCst)
    }
}

/// Device-wide location toggle shared with whoever can flip it.
#[derive(Debug, Clone)]
pub struct LocationSwitch(Arc<AtomicBool>);

impl LocationSwitch {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn enable(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ReplayService {
    track: ServiceTrack,
    clock: Arc<dyn Clock>,
    connected: AtomicBool,
    repair: Option<Repair>,
}

impl ReplayService {
    pub fn new(track: ServiceTrack, clock: Arc<dyn Clock>) -> Self {
        let repair = track.failure.map(|failure| Repair {
            stage: failure.stage,
            applied: Arc::new(AtomicBool::new(false)),
        });

        Self {
            track,
            clock,
            connected: AtomicBool::new(false),
            repair,
        }
    }

    fn scripted(&self, stage: FailureStage) -> Result<(), ServiceFailure> {
        let (Some(failure), Some(repair)) = (self.track.failure, &self.repair) else {
            return Ok(());
        };
        if failure.stage != stage || repair.is_applied() {
            return Ok(());
        }

        let error = ServiceFailure::new(format!("scripted {stage} failure"));
        if failure.resolvable {
            Err(error.with_resolution(ResolutionPayload::new(repair.clone())))
        } else {
            Err(error)
        }
    }
}

#[async_trait]
impl LocationService for ReplayService {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<(), ServiceFailure> {
        self.scripted(FailureStage::Connect)?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn check_settings(&self, _request: &LocationRequest) -> Result<(), ServiceFailure> {
        self.scripted(FailureStage::Settings)
    }

    async fn last_location(&self) -> Option<Position> {
        self.track
            .last
            .as_ref()
            .map(|fix| fix.to_position(SERVICE_PROVIDER, self.clock.now()))
    }

    async fn subscribe(&self, _request: &LocationRequest) -> Result<PositionStream, ServiceFailure> {
        self.scripted(FailureStage::Subscribe)?;

        let clock = Arc::clone(&self.clock);
        let fixes = paced(self.track.fixes.clone(), self.track.interval_ms).map(move |fix| {
            fix.to_position(SERVICE_PROVIDER, clock.now())
        });

        if self.track.suspend_at_end {
            Ok(fixes.boxed())
        } else {
            Ok(fixes.chain(stream::pending()).boxed())
        }
    }

    fn unsubscribe(&self) {
        debug!("replay service unsubscribed");
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

pub struct ReplayProviders {
    track: DeviceTrack,
    clock: Arc<dyn Clock>,
    switch: LocationSwitch,
}

impl ReplayProviders {
    pub fn new(track: DeviceTrack, clock: Arc<dyn Clock>) -> Self {
        let switch = LocationSwitch::new(track.enabled);
        Self {
            track,
            clock,
            switch,
        }
    }

    pub fn switch(&self) -> LocationSwitch {
        self.switch.clone()
    }
}

impl DeviceProviders for ReplayProviders {
    fn is_location_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    fn best_provider(&self, _criteria: AccuracyCriteria) -> Option<String> {
        self.switch.is_enabled().then(|| self.track.provider.clone())
    }

    fn last_known(&self, provider: &str) -> Option<Position> {
        self.track
            .last
            .as_ref()
            .map(|fix| fix.to_position(provider, self.clock.now()))
    }

    fn request_updates(
        &self,
        provider: &str,
        _min_interval: Duration,
        _min_distance: f32,
    ) -> ProviderEventStream {
        let clock = Arc::clone(&self.clock);
        let name = provider.to_string();
        let limit = self.track.disable_after.unwrap_or(self.track.fixes.len());
        let fixes: Vec<TrackFix> = self.track.fixes.iter().take(limit).cloned().collect();

        let locations = paced(fixes, self.track.interval_ms)
            .map(move |fix| ProviderEvent::Location(fix.to_position(&name, clock.now())));

        if self.track.disable_after.is_none() {
            return locations.chain(stream::pending()).boxed();
        }

        let switch = self.switch.clone();
        let name = provider.to_string();
        let loss = stream::once(async move {
            switch.disable();
            ProviderEvent::ProviderDisabled(name)
        });
        locations.chain(loss).chain(stream::pending()).boxed()
    }

    fn remove_updates(&self) {
        debug!(provider = %self.track.provider, "replay provider updates removed");
    }
}

fn paced(fixes: Vec<TrackFix>, interval_ms: u64) -> impl futures::Stream<Item = TrackFix> + Send {
    let interval = Duration::from_millis(interval_ms);
    stream::iter(fixes).then(move |fix| async move {
        tokio::time::sleep(interval).await;
        fix
    })
}
