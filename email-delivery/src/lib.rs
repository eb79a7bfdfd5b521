pub mod delivery;
pub mod smtp_sender;

pub use delivery::{deliver, send_test_email, DeliveryReport};
pub use smtp_sender::{SmtpConfig, SmtpMailer, TlsMode};
