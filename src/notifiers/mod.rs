//! Alert delivery channels.

pub mod email;
pub mod whatsapp;

pub use email::EmailNotifier;
pub use whatsapp::WhatsAppNotifier;
