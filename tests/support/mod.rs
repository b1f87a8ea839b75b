#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use promptgate::llm::{Provider, ProviderChatRequest, ProviderMessage, ProviderResponse};

/// Backend that replays canned responses and records every request.
#[derive(Debug, Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<anyhow::Result<ProviderResponse>>>,
    seen: Mutex<Vec<ProviderChatRequest>>,
}

impl MockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_error_at(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(anyhow::anyhow!(message.to_string())));
        self
    }

    pub fn requests(&self) -> Vec<ProviderChatRequest> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn seen_messages(&self) -> Vec<Vec<ProviderMessage>> {
        self.requests().into_iter().map(|r| r.messages).collect()
    }

    pub fn call_count(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn chat<'a>(
        &'a self,
        request: &'a ProviderChatRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Box::pin(async move {
            next.unwrap_or_else(|| Ok(ProviderResponse::text_only("done")))
        })
    }
}
