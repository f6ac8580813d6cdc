//! Event sink between an executor and the task manager.
//!
//! Executors never touch the task store. They enqueue [`ExecutionEvent`]s and
//! the task manager folds them into the task in the order they arrive.

use crate::a2a::types::{Artifact, TaskState};
use tokio::sync::mpsc;

/// Coarse execution state reported by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Thinking,
    Working,
    InputRequired,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionState {
    pub fn task_state(self) -> TaskState {
        match self {
            ExecutionState::Thinking | ExecutionState::Working => TaskState::Working,
            ExecutionState::InputRequired => TaskState::InputRequired,
            ExecutionState::Completed => TaskState::Completed,
            ExecutionState::Failed => TaskState::Failed,
            ExecutionState::Cancelled => TaskState::Canceled,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// Response text. `append = false` replaces what was sent so far.
    Text { text: String, append: bool },
    State {
        state: ExecutionState,
        description: Option<String>,
    },
    Artifact {
        artifact: Artifact,
        append: bool,
        last_chunk: bool,
    },
}

impl ExecutionEvent {
    pub fn text(text: impl Into<String>) -> Self {
        ExecutionEvent::Text {
            text: text.into(),
            append: false,
        }
    }

    pub fn text_chunk(text: impl Into<String>) -> Self {
        ExecutionEvent::Text {
            text: text.into(),
            append: true,
        }
    }

    pub fn state(state: ExecutionState, description: impl Into<String>) -> Self {
        ExecutionEvent::State {
            state,
            description: Some(description.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("event queue closed")]
    QueueClosed,
}

/// Writer half handed to executors.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<ExecutionEvent>,
}

/// Reader half owned by the task manager.
pub type EventReceiver = mpsc::UnboundedReceiver<ExecutionEvent>;

impl EventQueue {
    pub fn channel() -> (EventQueue, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventQueue { tx }, rx)
    }

    pub async fn enqueue_event(&self, event: ExecutionEvent) -> Result<(), QueueError> {
        self.tx.send(event).map_err(|_| QueueError::QueueClosed)
    }

    pub async fn text(&self, text: impl Into<String>) -> Result<(), QueueError> {
        self.enqueue_event(ExecutionEvent::text(text)).await
    }

    pub async fn text_chunk(&self, text: impl Into<String>) -> Result<(), QueueError> {
        self.enqueue_event(ExecutionEvent::text_chunk(text)).await
    }

    pub async fn state(
        &self,
        state: ExecutionState,
        description: impl Into<String>,
    ) -> Result<(), QueueError> {
        self.enqueue_event(ExecutionEvent::state(state, description))
            .await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
