//! JSON-RPC 2.0 handler for A2A protocol operations.
//!
//! Dispatches JSON-RPC methods:
//! - `message/send`   → create task, run the executor, return the settled task
//! - `message/stream` → same, but updates are pushed to a subscriber (SSE)
//! - `tasks/get`      → retrieve task by ID
//! - `tasks/cancel`   → cancel a running task

use crate::a2a::error::A2aError;
use crate::a2a::event_queue::{EventQueue, EventReceiver, ExecutionEvent, ExecutionState};
use crate::a2a::executor::{AgentExecutor, RequestContext};
use crate::a2a::types::*;
use crate::utils::truncate_str;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// In-memory task store.
pub type TaskStore = Arc<RwLock<HashMap<String, Task>>>;

/// Create a new empty task store.
pub fn new_task_store() -> TaskStore {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Name of the artifact that text events are written to.
pub const RESPONSE_ARTIFACT: &str = "response";

type Subscriber = mpsc::UnboundedSender<StreamResponse>;

/// Tasks whose executor is still running.
struct RunningTask {
    ctx: RequestContext,
    subscribers: Vec<Subscriber>,
}

/// Owns the task store and drives executors through the task lifecycle.
#[derive(Clone)]
pub struct TaskManager {
    store: TaskStore,
    executor: Arc<dyn AgentExecutor>,
    running: Arc<RwLock<HashMap<String, RunningTask>>>,
}

impl TaskManager {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            store: new_task_store(),
            executor,
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// `message/send`. Blocks until the task settles unless `blocking: false`.
    pub async fn send_message(&self, params: SendMessageParams) -> Result<Task, A2aError> {
        let config = params.configuration.clone().unwrap_or_default();
        let (snapshot, handle) = self.submit(params, None).await?;

        if config.blocking == Some(false) {
            return Ok(trim_history(snapshot, config.history_length));
        }

        if let Err(e) = handle.await {
            tracing::error!("A2A: run loop for task {} aborted: {}", snapshot.id, e);
        }

        let tasks = self.store.read().await;
        let task = tasks
            .get(&snapshot.id)
            .cloned()
            .ok_or_else(|| A2aError::TaskNotFound(snapshot.id.clone()))?;
        Ok(trim_history(task, config.history_length))
    }

    /// `message/stream`. The receiver yields the task snapshot first and
    /// closes after the final status update.
    pub async fn stream_message(
        &self,
        params: SendMessageParams,
    ) -> Result<mpsc::UnboundedReceiver<StreamResponse>, A2aError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.submit(params, Some(tx)).await?;
        Ok(rx)
    }

    /// `tasks/get`.
    pub async fn get_task(&self, params: GetTaskParams) -> Result<Task, A2aError> {
        let tasks = self.store.read().await;
        tasks
            .get(&params.id)
            .cloned()
            .map(|t| trim_history(t, params.history_length))
            .ok_or(A2aError::TaskNotFound(params.id))
    }

    /// `tasks/cancel`.
    pub async fn cancel_task(&self, params: CancelTaskParams) -> Result<Task, A2aError> {
        let task = {
            let tasks = self.store.read().await;
            tasks
                .get(&params.id)
                .cloned()
                .ok_or_else(|| A2aError::TaskNotFound(params.id.clone()))?
        };
        if task.status.state.is_terminal() {
            return Err(A2aError::TaskNotCancelable(task.status.state));
        }

        let ctx = {
            let running = self.running.read().await;
            running.get(&task.id).map(|r| r.ctx.clone())
        }
        .unwrap_or_else(|| {
            let last = task
                .history
                .last()
                .cloned()
                .unwrap_or_else(|| Message::user_text(""));
            RequestContext::new(
                task.id.clone(),
                task.context_id.clone().unwrap_or_default(),
                last,
            )
        });
        ctx.cancellation_token().cancel();

        let (queue, mut rx) = EventQueue::channel();
        let result = self.executor.cancel(&ctx, &queue).await;
        drop(queue);
        while let Ok(event) = rx.try_recv() {
            self.apply(&task.id, event).await;
        }
        if let Err(e) = result {
            tracing::warn!("A2A: executor cancel for task {} failed: {}", task.id, e);
        }

        self.apply(
            &task.id,
            ExecutionEvent::state(ExecutionState::Cancelled, "Task canceled."),
        )
        .await;
        // the run loop leaves the entry to us once the token is tripped
        self.running.write().await.remove(&task.id);

        let settled = {
            let tasks = self.store.read().await;
            tasks
                .get(&task.id)
                .cloned()
                .ok_or_else(|| A2aError::TaskNotFound(task.id.clone()))?
        };
        if settled.status.state != TaskState::Canceled {
            tracing::info!(
                "A2A: task {} settled as {:?} before it could be canceled",
                task.id,
                settled.status.state
            );
            return Err(A2aError::TaskNotCancelable(settled.status.state));
        }
        tracing::info!("A2A: Canceled task {}", task.id);
        Ok(settled)
    }

    /// Create (or continue) a task and spawn its run loop.
    async fn submit(
        &self,
        params: SendMessageParams,
        subscriber: Option<Subscriber>,
    ) -> Result<(Task, JoinHandle<()>), A2aError> {
        let mut message = params.message;
        let user_text = message.text();

        let snapshot = {
            let mut tasks = self.store.write().await;
            match message.task_id.clone() {
                Some(existing) => {
                    let task = tasks
                        .get_mut(&existing)
                        .ok_or_else(|| A2aError::TaskNotFound(existing.clone()))?;
                    if task.status.state != TaskState::InputRequired {
                        return Err(A2aError::UnsupportedOperation(format!(
                            "Task {} is {:?} and not awaiting input",
                            existing, task.status.state
                        )));
                    }
                    message.context_id = task.context_id.clone();
                    task.history.push(message.clone());
                    task.status = TaskStatus::now(TaskState::Submitted, None);
                    task.clone()
                }
                None => {
                    let task_id = Uuid::new_v4().to_string();
                    let context_id = message
                        .context_id
                        .clone()
                        .unwrap_or_else(|| Uuid::new_v4().to_string());
                    message.task_id = Some(task_id.clone());
                    message.context_id = Some(context_id.clone());
                    let task = Task {
                        id: task_id.clone(),
                        context_id: Some(context_id),
                        status: TaskStatus::now(TaskState::Submitted, None),
                        artifacts: vec![],
                        history: vec![message.clone()],
                        metadata: params.metadata,
                    };
                    tasks.insert(task_id, task.clone());
                    task
                }
            }
        };

        tracing::info!(
            "A2A: Submitted task {} for message: {}",
            snapshot.id,
            truncate_str(&user_text, 100)
        );

        let ctx = RequestContext::new(
            snapshot.id.clone(),
            snapshot.context_id.clone().unwrap_or_default(),
            message,
        );

        let mut subscribers = Vec::new();
        if let Some(tx) = subscriber {
            let _ = tx.send(StreamResponse::Task(snapshot.clone()));
            subscribers.push(tx);
        }
        self.running.write().await.insert(
            snapshot.id.clone(),
            RunningTask {
                ctx: ctx.clone(),
                subscribers,
            },
        );

        let (queue, rx) = EventQueue::channel();
        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.run(ctx, queue, rx).await });
        Ok((snapshot, handle))
    }

    /// Run the executor and fold its events into the task until it returns.
    async fn run(self, ctx: RequestContext, queue: EventQueue, mut rx: EventReceiver) {
        let executor = Arc::clone(&self.executor);
        let exec_ctx = ctx.clone();
        let exec = tokio::spawn(async move { executor.execute(&exec_ctx, &queue).await });

        while let Some(event) = rx.recv().await {
            self.apply(&ctx.task_id, event).await;
        }

        let outcome = match exec.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("executor task aborted: {}", e)),
        };

        match outcome {
            // cancel_task owns the final state once the token is tripped
            _ if ctx.is_cancelled() => {
                tracing::debug!("A2A: task {} stopped after cancellation", ctx.task_id);
            }
            Err(e) => {
                tracing::warn!("A2A: task {} failed: {}", ctx.task_id, e);
                self.apply(
                    &ctx.task_id,
                    ExecutionEvent::state(ExecutionState::Failed, e.to_string()),
                )
                .await;
            }
            Ok(()) => {
                let settled = {
                    let tasks = self.store.read().await;
                    tasks
                        .get(&ctx.task_id)
                        .is_none_or(|t| t.status.state.is_settled())
                };
                if !settled {
                    self.apply(
                        &ctx.task_id,
                        ExecutionEvent::State {
                            state: ExecutionState::Completed,
                            description: None,
                        },
                    )
                    .await;
                }
            }
        }

        if !ctx.is_cancelled() {
            self.running.write().await.remove(&ctx.task_id);
        }
    }

    /// Apply one event to the stored task and notify stream subscribers.
    async fn apply(&self, task_id: &str, event: ExecutionEvent) {
        let update = {
            let mut tasks = self.store.write().await;
            let Some(task) = tasks.get_mut(task_id) else {
                tracing::warn!("A2A: event for unknown task {}", task_id);
                return;
            };
            if task.status.state.is_terminal() {
                tracing::debug!(
                    "A2A: ignoring {:?} for task {} in terminal state {:?}",
                    event,
                    task_id,
                    task.status.state
                );
                return;
            }
            apply_event(task, event)
        };

        let mut running = self.running.write().await;
        if let Some(entry) = running.get_mut(task_id) {
            entry.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
            if update.is_final() {
                entry.subscribers.clear();
            }
        }
    }
}

/// Fold an event into a task and describe the change as a stream frame.
fn apply_event(task: &mut Task, event: ExecutionEvent) -> StreamResponse {
    match event {
        ExecutionEvent::State { state, description } => {
            let message = description.map(|text| {
                let mut msg = Message::agent_text(text);
                msg.task_id = Some(task.id.clone());
                msg.context_id = task.context_id.clone();
                msg
            });
            task.status = TaskStatus::now(state.task_state(), message);
            StreamResponse::StatusUpdate(TaskStatusUpdateEvent {
                task_id: task.id.clone(),
                context_id: task.context_id.clone(),
                status: task.status.clone(),
                is_final: task.status.state.is_settled(),
            })
        }
        ExecutionEvent::Text { text, append } => {
            let artifact_id = format!("{}-{}", task.id, RESPONSE_ARTIFACT);
            let idx = match task.artifacts.iter().position(|a| a.artifact_id == artifact_id) {
                Some(idx) => idx,
                None => {
                    task.artifacts.push(Artifact {
                        artifact_id: artifact_id.clone(),
                        name: Some(RESPONSE_ARTIFACT.to_string()),
                        description: None,
                        parts: vec![],
                        metadata: None,
                    });
                    task.artifacts.len() - 1
                }
            };
            let artifact = &mut task.artifacts[idx];
            let appended = append
                && match artifact.parts.last_mut().and_then(|p| p.text.as_mut()) {
                    Some(existing) => {
                        existing.push_str(&text);
                        true
                    }
                    None => false,
                };
            if !appended {
                artifact.parts = vec![Part::text(text.clone())];
            }
            StreamResponse::ArtifactUpdate(TaskArtifactUpdateEvent {
                task_id: task.id.clone(),
                context_id: task.context_id.clone(),
                artifact: Artifact {
                    parts: vec![Part::text(text)],
                    ..artifact.clone()
                },
                append,
                last_chunk: false,
            })
        }
        ExecutionEvent::Artifact {
            artifact,
            append,
            last_chunk,
        } => {
            match task
                .artifacts
                .iter()
                .position(|a| a.artifact_id == artifact.artifact_id)
            {
                Some(idx) if append => task.artifacts[idx].parts.extend(artifact.parts.clone()),
                Some(idx) => task.artifacts[idx] = artifact.clone(),
                None => task.artifacts.push(artifact.clone()),
            }
            StreamResponse::ArtifactUpdate(TaskArtifactUpdateEvent {
                task_id: task.id.clone(),
                context_id: task.context_id.clone(),
                artifact,
                append,
                last_chunk,
            })
        }
    }
}

/// Keep only the last `n` history messages.
fn trim_history(mut task: Task, history_length: Option<usize>) -> Task {
    if let Some(n) = history_length {
        let excess = task.history.len().saturating_sub(n);
        task.history.drain(..excess);
    }
    task
}

fn to_json(task: &Task) -> serde_json::Value {
    serde_json::to_value(task).unwrap_or_else(|_| serde_json::json!({"error": "serialize"}))
}

/// Dispatch a JSON-RPC request to the appropriate handler.
pub async fn dispatch(req: JsonRpcRequest, manager: &TaskManager) -> JsonRpcResponse {
    match req.method.as_str() {
        "message/send" => handle_send_message(req.id, req.params, manager).await,
        "tasks/get" => handle_get_task(req.id, req.params, manager).await,
        "tasks/cancel" => handle_cancel_task(req.id, req.params, manager).await,
        "message/stream" => A2aError::UnsupportedOperation(
            "message/stream must be called over the streaming HTTP endpoint".to_string(),
        )
        .into_response(req.id),
        _ => JsonRpcResponse::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    }
}

/// Handle `message/send`: create a task and run the executor.
async fn handle_send_message(
    id: serde_json::Value,
    params: serde_json::Value,
    manager: &TaskManager,
) -> JsonRpcResponse {
    let send_params: SendMessageParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return A2aError::from(e).into_response(id),
    };

    match manager.send_message(send_params).await {
        Ok(task) => JsonRpcResponse::success(id, to_json(&task)),
        Err(e) => e.into_response(id),
    }
}

/// Handle `tasks/get`: look a task up by ID.
async fn handle_get_task(
    id: serde_json::Value,
    params: serde_json::Value,
    manager: &TaskManager,
) -> JsonRpcResponse {
    let get_params: GetTaskParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return A2aError::from(e).into_response(id),
    };

    match manager.get_task(get_params).await {
        Ok(task) => JsonRpcResponse::success(id, to_json(&task)),
        Err(e) => e.into_response(id),
    }
}

/// Handle `tasks/cancel`: cancel a running task.
async fn handle_cancel_task(
    id: serde_json::Value,
    params: serde_json::Value,
    manager: &TaskManager,
) -> JsonRpcResponse {
    let cancel_params: CancelTaskParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return A2aError::from(e).into_response(id),
    };

    match manager.cancel_task(cancel_params).await {
        Ok(task) => JsonRpcResponse::success(id, to_json(&task)),
        Err(e) => e.into_response(id),
    }
}
