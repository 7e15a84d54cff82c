use std::{path::PathBuf, sync::Arc};

use eyre::Result;
use tracing::info;

use locus_core::{
    Clock, DecliningResolver, DeviceStrategy, EventChannel, FatalReason, FileStore,
    LocationListener, Orchestrator, Position, Resolver, ServiceStrategy, SessionSummary,
    StrategyRegistry, StrategySelector, SystemClock, deliver,
};

use crate::{
    config::Settings,
    prompt::PromptResolver,
    replay::{ReplayProviders, ReplayService, load_track},
};

#[derive(Debug, Clone)]
pub struct TrackArgs {
    pub selector: StrategySelector,
    pub track: PathBuf,
    /// Stop after this many updated fixes.
    pub updates: Option<u32>,
    /// Ask on the terminal instead of declining every resolution.
    pub interactive: bool,
}

/// Prints fixes as they arrive and remembers whether the session is over.
#[derive(Debug, Default)]
pub struct ConsoleListener {
    pub initial: Option<Position>,
    pub updates: u32,
    pub fatal: Option<FatalReason>,
}

impl ConsoleListener {
    pub fn is_finished(&self, max_updates: Option<u32>) -> bool {
        self.fatal.is_some() || max_updates.is_some_and(|max| self.updates >= max)
    }
}

impl LocationListener for ConsoleListener {
    fn on_initial_position(&mut self, position: Position) {
        println!("initial  {}", describe(&position));
        self.initial = Some(position);
    }

    fn on_updated_position(&mut self, position: Position) {
        self.updates += 1;
        println!("update#{:<2} {}", self.updates, describe(&position));
    }

    fn on_error(&mut self, reason: FatalReason) {
        eprintln!("location unavailable: {reason}");
        self.fatal = Some(reason);
    }
}

fn describe(position: &Position) -> String {
    format!(
        "{:.6}, {:.6} ±{}m via {}",
        position.latitude, position.longitude, position.accuracy, position.provider
    )
}

pub async fn track(settings: &Settings, args: TrackArgs) -> Result<(SessionSummary, ConsoleListener)> {
    let track = load_track(&args.track)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let providers = ReplayProviders::new(track.device, Arc::clone(&clock));
    let resolver: Arc<dyn Resolver> = if args.interactive {
        Arc::new(PromptResolver::new(providers.switch()))
    } else {
        Arc::new(DecliningResolver)
    };
    let strategies = StrategyRegistry::new(
        ServiceStrategy::new(ReplayService::new(track.service, Arc::clone(&clock))),
        DeviceStrategy::new(providers),
    );

    let (channel, mut notifications) = EventChannel::new();
    let orchestrator = Orchestrator::restore(
        settings.orchestrator.clone(),
        strategies,
        resolver,
        Arc::new(FileStore::new(&settings.store_dir)),
        channel,
    )
    .await?
    .with_clock(clock);

    let handle = orchestrator.handle();
    let running = tokio::spawn(orchestrator.run());
    handle.start(args.selector)?;

    let mut listener = ConsoleListener::default();
    loop {
        tokio::select! {
            notification = notifications.recv() => {
                let Some(notification) = notification else { break };
                deliver(&mut listener, notification);
                if listener.is_finished(args.updates) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    handle.shutdown()?;
    let summary = running.await??;
    info!(
        state = ?summary.state,
        updates = summary.stats.updated_fixes,
        fallbacks = summary.stats.fallbacks,
        "tracking finished"
    );

    Ok((summary, listener))
}
