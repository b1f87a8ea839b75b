use super::traits::{Provider, ProviderCapabilities, ProviderChatRequest};
use super::types::ProviderResponse;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 10_000;

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("insufficient_quota")
        || lower.contains("exceeded your current quota")
        || lower.contains("billing")
}

fn is_transient_status(code: u16) -> bool {
    code == 408 || code == 429 || (500..600).contains(&code)
}

/// Status code embedded by `api_error` as `"... API error (503 Service Unavailable)"`.
fn status_from_message(message: &str) -> Option<u16> {
    let rest = &message[message.find("API error (")? + "API error (".len()..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Whether a failed backend call is worth retrying.
///
/// Only network-level failures and 408/429/5xx responses qualify. Other
/// client errors, quota exhaustion and unreadable bodies fail immediately.
pub fn is_transient(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    if is_quota_exhausted(&msg) {
        return false;
    }

    if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>() {
        if let Some(status) = reqwest_err.status() {
            return is_transient_status(status.as_u16());
        }
        return reqwest_err.is_timeout() || reqwest_err.is_connect() || reqwest_err.is_request();
    }

    status_from_message(&msg).is_some_and(is_transient_status)
}

/// Provider wrapper with bounded retry and exponential backoff.
pub struct ReliableProvider {
    inner: Box<dyn Provider>,
    max_retries: u32,
    base_backoff_ms: u64,
}

impl ReliableProvider {
    pub fn new(inner: Box<dyn Provider>, max_retries: u32, base_backoff_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff_ms: base_backoff_ms.max(50),
        }
    }
}

impl Provider for ReliableProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.inner.capabilities()
    }

    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            if let Err(e) = self.inner.warmup().await {
                tracing::warn!(provider = self.inner.name(), "Warmup failed (non-fatal): {e}");
            }
            Ok(())
        })
    }

    fn chat<'a>(
        &'a self,
        request: &'a ProviderChatRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let provider_name = self.inner.name();
            let mut backoff_ms = self.base_backoff_ms;
            let mut attempt = 0;

            loop {
                match self.inner.chat(request).await {
                    Ok(resp) => {
                        if attempt > 0 {
                            tracing::info!(
                                provider = provider_name,
                                attempt,
                                "Provider recovered after retries"
                            );
                        }
                        return Ok(resp);
                    }
                    Err(e) => {
                        if attempt >= self.max_retries || !is_transient(&e) {
                            return Err(e.context(format!(
                                "{provider_name} failed after {} attempt(s)",
                                attempt + 1
                            )));
                        }
                        attempt += 1;
                        tracing::warn!(
                            provider = provider_name,
                            attempt,
                            max_retries = self.max_retries,
                            backoff_ms,
                            "Transient provider failure, retrying: {e}"
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms = backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
                    }
                }
            }
        })
    }
}
