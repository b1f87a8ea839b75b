use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use super::state::PipelineState;

/// Receives a notification each time the pipeline enters a state.
pub trait ProgressSink: Send + Sync {
    fn on_state<'a>(&'a self, state: PipelineState) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_state<'a>(&'a self, _state: PipelineState) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async {})
    }
}

/// Prints each state's label to stderr so stdout stays clean for the answer.
#[derive(Debug, Default)]
pub struct CliProgressSink;

impl ProgressSink for CliProgressSink {
    fn on_state<'a>(&'a self, state: PipelineState) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", state.label());
        })
    }
}

/// Keeps every state it is told about, in order.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    states: Mutex<Vec<PipelineState>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> Vec<PipelineState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn on_state<'a>(&'a self, state: PipelineState) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            self.states
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(state);
        })
    }
}
