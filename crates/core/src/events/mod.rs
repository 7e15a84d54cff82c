pub mod listener;
pub mod notification;

pub use listener::{LocationListener, deliver, dispatch};
pub use notification::{EventChannel, FatalReason, Notification, NotificationReceiver};
