pub mod dispatcher;
pub mod telegram;

pub use dispatcher::{format_flip, run_dispatcher};
pub use telegram::{LogNotifier, Notifier, TelegramNotifier};
