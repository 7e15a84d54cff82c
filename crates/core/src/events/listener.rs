use super::notification::{FatalReason, Notification, NotificationReceiver};
use crate::types::position::Position;

/// Caller-side surface for acquisition results.
pub trait LocationListener: Send {
    /// At most once per session; may carry a stale cached fix.
    fn on_initial_position(&mut self, position: Position);

    fn on_updated_position(&mut self, position: Position);

    /// At most once per session.
    fn on_error(&mut self, reason: FatalReason);
}

pub fn deliver<L>(listener: &mut L, notification: Notification)
where
    L: LocationListener + ?Sized,
{
    match notification {
        Notification::InitialFix(position) => listener.on_initial_position(position),
        Notification::UpdatedFix(position) => listener.on_updated_position(position),
        Notification::FatalError(reason) => listener.on_error(reason),
    }
}

/// Forwards notifications in publish order until the channel closes.
pub async fn dispatch<L>(mut notifications: NotificationReceiver, listener: &mut L)
where
    L: LocationListener + ?Sized,
{
    while let Some(notification) = notifications.recv().await {
        deliver(listener, notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StrategyErrorKind,
        events::EventChannel,
        types::primitives::{StrategyName, Timestamp},
    };

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl LocationListener for Recorder {
        fn on_initial_position(&mut self, position: Position) {
            self.calls.push(format!("initial {}", position.time.as_millis()));
        }

        fn on_updated_position(&mut self, position: Position) {
            self.calls.push(format!("updated {}", position.time.as_millis()));
        }

        fn on_error(&mut self, reason: FatalReason) {
            self.calls.push(format!("error {reason}"));
        }
    }

    fn fix(ms: u64) -> Position {
        Position::new("gps", Timestamp::from_millis(ms), 0.0, 0.0)
    }

    #[tokio::test]
    async fn dispatch_preserves_publish_order() {
        let (channel, notifications) = EventChannel::new();
        channel.publish(Notification::InitialFix(fix(1)));
        channel.publish(Notification::UpdatedFix(fix(2)));
        channel.publish(Notification::FatalError(FatalReason {
            strategy: StrategyName::new("device"),
            kind: StrategyErrorKind::Disabled,
        }));
        drop(channel);

        let mut recorder = Recorder::default();
        dispatch(notifications, &mut recorder).await;

        assert_eq!(
            recorder.calls,
            vec![
                "initial 1".to_string(),
                "updated 2".to_string(),
                "error strategy disabled on device".to_string(),
            ]
        );
    }

    #[test]
    fn publish_reports_missing_listener() {
        let (channel, notifications) = EventChannel::new();
        assert!(channel.has_listener());

        drop(notifications);

        assert!(!channel.has_listener());
        assert!(!channel.publish(Notification::UpdatedFix(fix(3))));
    }
}
