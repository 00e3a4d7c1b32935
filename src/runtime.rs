//! Per-chat update processing
//!
//! Every chat gets its own worker task fed through a channel, so one chat's
//! updates are dispatched strictly in arrival order while different chats
//! run concurrently. A worker that sits idle for the idle timeout removes
//! itself; the chat's next update starts a fresh one.

use crate::bot::Bot;
use crate::message::ChatId;
use crate::route::Schema;
use crate::update::Update;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

const CHAT_QUEUE_DEPTH: usize = 32;

/// How long a chat worker waits for its next update before stopping
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Handle to a running chat worker
struct ChatWorker {
    /// Distinguishes a restarted worker from the one it replaced
    generation: u64,
    update_tx: mpsc::Sender<Update>,
    task: JoinHandle<()>,
}

type WorkerMap = Arc<RwLock<HashMap<ChatId, ChatWorker>>>;

/// Manager for all chat workers
pub struct BotRuntime<S: Schema> {
    bot: Arc<Bot<S>>,
    workers: WorkerMap,
    idle_timeout: Duration,
    next_generation: AtomicU64,
}

impl<S: Schema> BotRuntime<S> {
    pub fn new(bot: Arc<Bot<S>>) -> Self {
        Self {
            bot,
            workers: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn bot(&self) -> &Arc<Bot<S>> {
        &self.bot
    }

    /// Queue an update for its chat, starting the chat's worker if needed.
    ///
    /// Sends happen under the read lock, so a worker retiring under the
    /// write lock never loses a queued update.
    pub async fn submit(&self, update: Update) {
        let chat_id = update.chat_id;
        let mut update = update;
        loop {
            {
                let workers = self.workers.read().await;
                if let Some(worker) = workers.get(&chat_id) {
                    match worker.update_tx.send(update).await {
                        Ok(()) => return,
                        Err(mpsc::error::SendError(returned)) => {
                            tracing::debug!(%chat_id, "Chat worker gone, restarting");
                            update = returned;
                        }
                    }
                }
            }
            self.start_worker(chat_id).await;
        }
    }

    /// Start a worker unless a live one is already registered
    async fn start_worker(&self, chat_id: ChatId) {
        let mut workers = self.workers.write().await;
        // Another submit may have won the race
        if workers
            .get(&chat_id)
            .is_some_and(|w| !w.update_tx.is_closed())
        {
            return;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (update_tx, update_rx) = mpsc::channel(CHAT_QUEUE_DEPTH);
        let task = tokio::spawn(run_chat(
            Arc::clone(&self.bot),
            Arc::clone(&self.workers),
            ChatSlot {
                chat_id,
                generation,
                idle_timeout: self.idle_timeout,
            },
            update_rx,
        ));
        workers.insert(
            chat_id,
            ChatWorker {
                generation,
                update_tx,
                task,
            },
        );
        tracing::debug!(%chat_id, generation, "Started chat worker");
    }

    /// Number of chats with a live worker
    pub async fn active_chats(&self) -> usize {
        self.workers.read().await.len()
    }

    /// Stop accepting updates and wait for every queued one to finish
    pub async fn shutdown(&self) {
        let workers: Vec<(ChatId, ChatWorker)> = self.workers.write().await.drain().collect();
        for (chat_id, worker) in workers {
            drop(worker.update_tx);
            if let Err(e) = worker.task.await {
                tracing::error!(%chat_id, error = %e, "Chat worker panicked");
            }
        }
        tracing::info!("Bot runtime stopped");
    }
}

/// Identity of one worker task
struct ChatSlot {
    chat_id: ChatId,
    generation: u64,
    idle_timeout: Duration,
}

async fn run_chat<S: Schema>(
    bot: Arc<Bot<S>>,
    workers: WorkerMap,
    slot: ChatSlot,
    mut update_rx: mpsc::Receiver<Update>,
) {
    let chat_id = slot.chat_id;
    loop {
        let update = match tokio::time::timeout(slot.idle_timeout, update_rx.recv()).await {
            Ok(Some(update)) => update,
            Ok(None) => break,
            Err(_) => {
                let mut workers = workers.write().await;
                // No send is in flight while the write lock is held
                if !update_rx.is_empty() {
                    continue;
                }
                if workers
                    .get(&chat_id)
                    .is_some_and(|w| w.generation == slot.generation)
                {
                    workers.remove(&chat_id);
                }
                tracing::debug!(%chat_id, "Chat worker idle");
                break;
            }
        };

        match bot.handle_update(&update).await {
            Ok(outcome) => {
                tracing::debug!(%chat_id, kind = update.kind_name(), ?outcome, "Update handled");
            }
            Err(e) => {
                tracing::error!(%chat_id, kind = update.kind_name(), error = %e, "Update failed");
            }
        }
    }
    tracing::debug!(%chat_id, "Chat worker stopped");
}
