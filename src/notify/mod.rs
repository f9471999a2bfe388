mod format;
pub mod slack;

pub use format::format_listing;
pub use slack::{LogNotifier, Notifier, SlackNotifier};
