// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod scrub;
pub mod traits;
pub mod types;

// ── Decorator layers ────────────────────────────────────────────────────────
pub mod factory;
pub mod reliable;

// ── Provider implementations ────────────────────────────────────────────────
pub mod openai;

pub use factory::{API_KEY_ENV, create_provider, default_base_url, resolve_api_key};
pub use openai::OpenAiCompatibleProvider;
pub use reliable::{ReliableProvider, is_transient};
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};
pub use traits::{Provider, ProviderCapabilities, ProviderChatRequest};
pub use types::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason, ToolSpec};
