//! Test-only chat backends with scripted responses.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};

use crate::llm::ChatModel;

/// Chat backend that replays a fixed response script, in order.
///
/// Running past the end of the script is an error, so tests also pin the
/// exact number of model calls a code path makes.
#[derive(Debug, Default)]
pub struct ScriptedChat {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedChat {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completions served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatModel for ScriptedChat {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .expect("script lock should not be poisoned")
            .pop_front();
        match next {
            Some(response) => Ok(response),
            None => bail!("scripted chat exhausted its responses"),
        }
    }
}
