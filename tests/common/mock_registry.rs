//! Recording action registry

use async_trait::async_trait;
use optus::actions::ActionRegistry;
use optus::error::{OptusError, OptusResult};
use optus::intent::{DispatchOutcome, Utterance};
use optus::listening::Session;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Records every dispatched outcome and behaves as configured
pub struct RecordingRegistry {
    behavior: Behavior,
    pub calls: Arc<Mutex<Vec<DispatchOutcome>>>,
    pub shutdowns: Arc<AtomicUsize>,
}

impl RecordingRegistry {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ActionRegistry for RecordingRegistry {
    async fn execute(
        &mut self,
        outcome: &DispatchOutcome,
        _utterance: &Utterance,
        session: &mut dyn Session,
    ) -> OptusResult<()> {
        self.calls.lock().unwrap().push(outcome.clone());
        match self.behavior {
            Behavior::Succeed => {
                session.say("done").await;
                Ok(())
            }
            Behavior::Fail => Err(OptusError::Action("handler exploded".into())),
            Behavior::Panic => panic!("handler panicked"),
        }
    }

    async fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
