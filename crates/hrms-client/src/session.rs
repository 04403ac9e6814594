//! Session driver: one task per mounted chat view.
//!
//! The task is the only owner of the [`ChatStore`]. Commands, push signals
//! and completed backend calls are funnelled into it and handled one at a
//! time, so the store never sees concurrent mutation. After every input a
//! fresh [`ChatSnapshot`] is published on a watch channel.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use hrms_shared::models::{Conversation, Employee};
use hrms_shared::normalize::Batch;
use hrms_shared::types::{ConversationId, UserId};

use crate::api::ChatBackend;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{emit_event, SessionEvent};
use crate::optimistic::{FireAndForget, ReadPolicy, ReadReceipt};
use crate::socket::{PushConnection, PushSignal};
use crate::state::{ChatStore, Effect};
use crate::view::ChatSnapshot;

const COMMAND_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 64;

#[derive(Debug)]
pub struct SessionOptions {
    pub local_user: UserId,
    pub organization_id: Option<String>,
    pub read_policy: Box<dyn ReadPolicy>,
}

impl SessionOptions {
    pub fn new(local_user: UserId) -> Self {
        Self {
            local_user,
            organization_id: None,
            read_policy: Box::new(FireAndForget),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let local_user = config.validate()?.clone();
        Ok(Self {
            local_user,
            organization_id: config.organization_id.clone(),
            read_policy: config.read_policy.build(),
        })
    }
}

#[derive(Debug)]
enum SessionCommand {
    Refresh,
    MarkRead(ConversationId),
    MarkAllRead,
    Teardown(oneshot::Sender<()>),
}

/// Completion of a spawned backend call.
#[derive(Debug)]
enum Completion {
    Pulled(Result<Batch<Conversation>, String>),
    DirectoryLoaded(Result<Batch<Employee>, String>),
    Acked(ReadReceipt, Result<(), String>),
}

pub struct ChatSession {
    store: ChatStore,
    backend: Arc<dyn ChatBackend>,
    organization_id: Option<String>,
    snapshots: watch::Sender<ChatSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl ChatSession {
    /// Start a session: spawn the driver, kick off the first pull and the
    /// directory load, and start consuming the push channel.
    pub fn activate(
        options: SessionOptions,
        backend: Arc<dyn ChatBackend>,
        push: PushConnection,
    ) -> SessionHandle {
        let store = ChatStore::with_policy(options.local_user, options.read_policy);
        let (snapshots, snapshot_rx) = watch::channel(store.snapshot());
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (completions, completion_rx) = mpsc::unbounded_channel();

        let session = Self {
            store,
            backend,
            organization_id: options.organization_id,
            snapshots,
            events: events.clone(),
            completions,
        };

        let task = tokio::spawn(session.run(command_rx, completion_rx, push));

        SessionHandle {
            commands,
            snapshots: snapshot_rx,
            events,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        mut push: PushConnection,
    ) {
        info!(user = %self.store.local_user(), "Chat session started");
        self.load_directory();
        let effects = self.store.request_reload();
        self.execute(effects);
        self.publish();

        let mut push_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Refresh) => {
                        let effects = self.store.request_reload();
                        self.execute(effects);
                    }
                    Some(SessionCommand::MarkRead(id)) => {
                        let effects = self.store.mark_read(&id);
                        self.execute(effects);
                    }
                    Some(SessionCommand::MarkAllRead) => {
                        let effects = self.store.mark_all_read();
                        self.execute(effects);
                    }
                    Some(SessionCommand::Teardown(done)) => {
                        self.close(&mut push).await;
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        debug!("All session handles dropped");
                        self.close(&mut push).await;
                        return;
                    }
                },
                Some(completion) = completions.recv() => self.on_completion(completion),
                signal = push.recv(), if push_open => match signal {
                    Some(PushSignal::Connected) => {
                        emit_event(&self.events, SessionEvent::PushConnected);
                    }
                    Some(PushSignal::Disconnected) => {
                        self.store.on_disconnected();
                        emit_event(&self.events, SessionEvent::PushDisconnected);
                    }
                    Some(PushSignal::Event(event)) => {
                        let effects = self.store.on_push(event);
                        self.execute(effects);
                    }
                    None => {
                        info!("Push channel closed");
                        push_open = false;
                        self.store.on_disconnected();
                        emit_event(&self.events, SessionEvent::PushDisconnected);
                    }
                },
            }

            self.publish();
        }
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Pulled(result) => {
                if let Err(message) = &result {
                    emit_event(
                        &self.events,
                        SessionEvent::LoadFailed {
                            message: message.clone(),
                        },
                    );
                }
                let effects = self.store.finish_pull(result);
                self.execute(effects);
            }
            Completion::DirectoryLoaded(Ok(batch)) => {
                debug!(employees = batch.items.len(), dropped = batch.dropped, "Directory loaded");
                self.store.set_directory(batch.items);
            }
            Completion::DirectoryLoaded(Err(message)) => {
                warn!(error = %message, "Directory load failed");
                emit_event(&self.events, SessionEvent::DirectoryFailed { message });
            }
            Completion::Acked(receipt, result) => {
                if let Err(message) = &result {
                    emit_event(
                        &self.events,
                        SessionEvent::ReadFailed {
                            conversation_id: receipt.conversation_id.to_string(),
                            message: message.clone(),
                        },
                    );
                }
                self.store.on_ack_result(&receipt, result);
            }
        }
    }

    fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            let backend = Arc::clone(&self.backend);
            let completions = self.completions.clone();

            match effect {
                Effect::Reload => {
                    tokio::spawn(async move {
                        let result = backend
                            .fetch_conversations()
                            .await
                            .map_err(|e| e.to_string());
                        // The session may be gone by now.
                        let _ = completions.send(Completion::Pulled(result));
                    });
                }
                Effect::Acknowledge(receipt) => {
                    tokio::spawn(async move {
                        let result = backend
                            .acknowledge_read(&receipt.conversation_id, receipt.message_id.as_ref())
                            .await
                            .map_err(|e| e.to_string());
                        let _ = completions.send(Completion::Acked(receipt, result));
                    });
                }
            }
        }
    }

    fn load_directory(&self) {
        let Some(organization_id) = self.organization_id.clone() else {
            debug!("No organization configured; skipping directory");
            return;
        };
        let backend = Arc::clone(&self.backend);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let result = backend
                .fetch_employees(&organization_id)
                .await
                .map_err(|e| e.to_string());
            let _ = completions.send(Completion::DirectoryLoaded(result));
        });
    }

    async fn close(&mut self, push: &mut PushConnection) {
        self.store.close();
        push.disconnect().await;
        self.publish();
        emit_event(&self.events, SessionEvent::SessionClosed);
        info!("Chat session closed");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.store.snapshot());
    }
}

/// Handle owned by the view. Dropping every clone of the command side ends
/// the session the same way as [`SessionHandle::teardown`].
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<ChatSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn watch(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.send(SessionCommand::Refresh).await
    }

    pub async fn mark_read(&self, conversation_id: ConversationId) -> Result<(), ClientError> {
        self.send(SessionCommand::MarkRead(conversation_id)).await
    }

    pub async fn mark_all_read(&self) -> Result<(), ClientError> {
        self.send(SessionCommand::MarkAllRead).await
    }

    /// Close the push channel and stop the driver. Backend calls still in
    /// flight complete into the void.
    pub async fn teardown(self) -> Result<(), ClientError> {
        let (done, done_rx) = oneshot::channel();
        self.send(SessionCommand::Teardown(done)).await?;
        done_rx.await.map_err(|_| ClientError::SessionClosed)?;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Session task ended abnormally");
        }
        Ok(())
    }

    async fn send(&self, command: SessionCommand) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::SessionClosed)
    }
}
