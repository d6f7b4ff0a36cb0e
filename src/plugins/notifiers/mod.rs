// Notifier plugin implementations
pub mod email;

pub use email::{EmailKind, EmailNotifier, MailTransport, SmtpMailTransport};
