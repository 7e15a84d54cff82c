use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tracing::warn;

use locus_core::{ResolutionOutcome, Resolver, StrategyError, StrategyErrorKind};

use crate::replay::{LocationSwitch, Repair};

/// Asks on the terminal whether to apply the fix a failure calls for.
#[derive(Debug, Clone)]
pub struct PromptResolver {
    switch: LocationSwitch,
}

impl PromptResolver {
    pub fn new(switch: LocationSwitch) -> Self {
        Self { switch }
    }

    pub fn question(&self, error: &StrategyError) -> String {
        match (error.kind, repair_of(error)) {
            (StrategyErrorKind::Disabled, _) => {
                format!("Location is turned off for {}. Turn it on?", error.strategy)
            }
            (_, Some(repair)) => format!(
                "The {} strategy failed its {}. Apply the suggested fix?",
                error.strategy,
                repair.stage()
            ),
            _ => format!("{error}. Retry?"),
        }
    }

    /// Applies the user's answer and reports whether the failure is gone.
    pub fn decide(&self, error: &StrategyError, accepted: bool) -> ResolutionOutcome {
        if !accepted {
            return ResolutionOutcome::NotSolved;
        }

        match (error.kind, repair_of(error)) {
            (StrategyErrorKind::Disabled, _) => {
                self.switch.enable();
                if self.switch.is_enabled() {
                    ResolutionOutcome::Solved
                } else {
                    ResolutionOutcome::NotSolved
                }
            }
            (StrategyErrorKind::Unrecoverable, _) => ResolutionOutcome::NotSolved,
            (StrategyErrorKind::ConnectionFailure, Some(repair)) => {
                repair.apply();
                ResolutionOutcome::Solved
            }
            (StrategyErrorKind::ConnectionFailure, None) => ResolutionOutcome::Solved,
        }
    }
}

#[async_trait]
impl Resolver for PromptResolver {
    async fn resolve(&self, error: StrategyError) -> ResolutionOutcome {
        let question = self.question(&error);
        let answer = tokio::task::spawn_blocking(move || ask(&question)).await;

        match answer {
            Ok(Ok(accepted)) => self.decide(&error, accepted),
            Ok(Err(err)) => {
                warn!(error = %err, "could not read answer from terminal");
                ResolutionOutcome::NotSolved
            }
            Err(err) => {
                warn!(error = %err, "prompt task failed");
                ResolutionOutcome::NotSolved
            }
        }
    }
}

fn repair_of(error: &StrategyError) -> Option<&Repair> {
    error
        .payload
        .as_ref()
        .and_then(|payload| payload.downcast_ref::<Repair>())
}

fn ask(question: &str) -> io::Result<bool> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{question} [y/N] ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(parse_answer(&line))
}

pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::replay::{FailureStage, ReplayService, ScriptedFailure, ServiceTrack};
    use locus_core::{
        LocationService, ManualClock, ResolutionPayload, SERVICE_STRATEGY, StrategyName,
        Timestamp,
    };

    #[test]
    fn only_explicit_yes_accepts() {
        assert!(parse_answer("y\n"));
        assert!(parse_answer("  YES "));
        assert!(!parse_answer(""));
        assert!(!parse_answer("no"));
        assert!(!parse_answer("yep"));
    }

    #[test]
    fn accepting_a_disablement_turns_location_back_on() {
        let switch = LocationSwitch::new(false);
        let resolver = PromptResolver::new(switch.clone());
        let error = StrategyError::disabled(StrategyName::new("device"));

        assert!(resolver.question(&error).contains("turned off"));
        assert_eq!(resolver.decide(&error, false), ResolutionOutcome::NotSolved);
        assert!(!switch.is_enabled());

        assert_eq!(resolver.decide(&error, true), ResolutionOutcome::Solved);
        assert!(switch.is_enabled());
    }

    #[tokio::test]
    async fn accepting_a_repair_applies_it() {
        let service = ReplayService::new(
            ServiceTrack {
                failure: Some(ScriptedFailure {
                    stage: FailureStage::Settings,
                    resolvable: true,
                }),
                ..ServiceTrack::default()
            },
            Arc::new(ManualClock::new(Timestamp::from_millis(0))),
        );
        let failure = service
            .check_settings(&Default::default())
            .await
            .expect_err("scripted failure");
        let error = StrategyError::connection_failure(SERVICE_STRATEGY, failure.resolution);
        let resolver = PromptResolver::new(LocationSwitch::new(true));

        assert!(resolver.question(&error).contains("settings check"));
        assert_eq!(resolver.decide(&error, true), ResolutionOutcome::Solved);

        service
            .check_settings(&Default::default())
            .await
            .expect("repair applied");
    }

    #[test]
    fn unrecoverable_errors_are_never_solved() {
        let resolver = PromptResolver::new(LocationSwitch::new(true));
        let error = StrategyError::unrecoverable(SERVICE_STRATEGY);

        assert_eq!(resolver.decide(&error, true), ResolutionOutcome::NotSolved);
        assert_eq!(
            resolver.decide(
                &StrategyError::connection_failure(
                    SERVICE_STRATEGY,
                    Some(ResolutionPayload::new("opaque"))
                ),
                true
            ),
            ResolutionOutcome::Solved
        );
    }
}
