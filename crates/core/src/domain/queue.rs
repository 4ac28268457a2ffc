// Queue Domain Model

use super::error::QueueError;
use super::message::Message;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Queue identifier
pub type QueueName = String;

/// Named, unbounded, multi-producer multi-consumer FIFO.
///
/// `put` never waits. `get` suspends until a message is available or the
/// optional bound elapses. `consumer_count` is fixed when the queue is built.
#[derive(Debug)]
pub struct Queue {
    name: QueueName,
    items: Mutex<VecDeque<Message>>,
    available: Notify,
    consumer_count: usize,
}

impl Queue {
    pub fn new(name: impl Into<String>, consumer_count: usize) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            consumer_count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of instances configured to read from this queue
    pub fn consumer_count(&self) -> usize {
        self.consumer_count
    }

    /// Append a message and wake one waiting consumer
    pub fn put(&self, message: Message) -> Result<(), QueueError> {
        self.items
            .lock()
            .map_err(|_| QueueError::Poisoned(self.name.clone()))?
            .push_back(message);
        self.available.notify_one();
        Ok(())
    }

    /// Pop the front message without waiting
    pub fn try_get(&self) -> Result<Option<Message>, QueueError> {
        Ok(self
            .items
            .lock()
            .map_err(|_| QueueError::Poisoned(self.name.clone()))?
            .pop_front())
    }

    /// Wait for the next message, at most `timeout` when one is given
    pub async fn get(&self, timeout: Option<Duration>) -> Result<Message, QueueError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.next_message())
                .await
                .map_err(|_| QueueError::Timeout {
                    queue: self.name.clone(),
                    timeout: limit,
                })?,
            None => self.next_message().await,
        }
    }

    async fn next_message(&self) -> Result<Message, QueueError> {
        loop {
            // Register interest before looking, so a put between the check
            // and the await still wakes us
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.try_get()? {
                return Ok(message);
            }
            notified.await;
        }
    }

    /// Pending messages, sentinels included
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending termination sentinels
    pub fn pending_terminations(&self) -> usize {
        self.items
            .lock()
            .map(|items| items.iter().filter(|m| m.is_terminate()).count())
            .unwrap_or(0)
    }
}
