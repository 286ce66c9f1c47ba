// Adapters layer: concrete implementations of the domain ports.

pub mod audit;
pub mod dispatch;
pub mod gemini;

pub use audit::JsonlAuditSink;
pub use dispatch::LogDispatchNotifier;
pub use gemini::GeminiClient;
