use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::warn;
use uuid::Uuid;

use naegong_types::events::GatewayEvent;
use naegong_types::models::ChatMessage;

/// Manages all connected clients and publishes events.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for gateway events — every connection receives the
    /// full stream and filters room-scoped events by its subscription set.
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                user_channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to the raw gateway event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event to all connected clients.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    pub async fn register_user_channel(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .user_channels
            .write()
            .await
            .insert(user_id, (conn_id, tx));
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches —
    /// a newer connection may have taken the slot over.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user, if connected.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }

    /// Feed of `MessageCreate` events for one room. Each matching event is
    /// decoded and handed to `callback` in arrival order. A receiver that
    /// lags past the channel capacity skips the missed events — there is no
    /// replay.
    pub fn subscribe_room<F>(&self, room_id: Uuid, mut callback: F) -> SubscriptionHandle
    where
        F: FnMut(ChatMessage) + Send + 'static,
    {
        let mut rx = self.subscribe();

        let task = tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("room {} feed lagged by {} events", room_id, n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                if event.room_id() != Some(room_id) {
                    continue;
                }

                if let GatewayEvent::MessageCreate {
                    id,
                    room_id,
                    sender_id,
                    content,
                    created_at,
                } = event
                {
                    callback(ChatMessage {
                        id,
                        room_id,
                        sender_id,
                        content,
                        created_at,
                    });
                }
            }
        });

        SubscriptionHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
            task,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation handle for a room feed. `cancel` may be called any number
/// of times; dropping the handle cancels too, so a feed can never outlive
/// the component that opened it.
pub struct SubscriptionHandle {
    cancelled: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use uuid::Uuid;

    use naegong_types::events::GatewayEvent;
    use naegong_types::models::ChatMessage;

    use super::Dispatcher;

    fn message(room_id: Uuid, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            room_id,
            sender_id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    async fn settle() {
        // give the feed task a chance to drain
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_room_feed_filters_by_room() {
        let dispatcher = Dispatcher::new();
        let room = Uuid::new_v4();
        let other_room = Uuid::new_v4();

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = dispatcher.subscribe_room(room, move |m| {
            sink.lock().unwrap().push(m.content);
        });

        dispatcher.broadcast(GatewayEvent::message_created(&message(room, "one")));
        dispatcher.broadcast(GatewayEvent::message_created(&message(other_room, "noise")));
        dispatcher.broadcast(GatewayEvent::message_created(&message(room, "two")));
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery_and_is_idempotent() {
        let dispatcher = Dispatcher::new();
        let room = Uuid::new_v4();

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handle = dispatcher.subscribe_room(room, move |m| {
            sink.lock().unwrap().push(m.content);
        });

        dispatcher.broadcast(GatewayEvent::message_created(&message(room, "before")));
        settle().await;

        handle.cancel();
        handle.cancel(); // second cancel is a no-op
        assert!(handle.is_cancelled());

        dispatcher.broadcast(GatewayEvent::message_created(&message(room, "after")));
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec!["before"]);
    }

    #[tokio::test]
    async fn test_dropping_the_handle_cancels() {
        let dispatcher = Dispatcher::new();
        let room = Uuid::new_v4();

        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        {
            let _handle = dispatcher.subscribe_room(room, move |m| {
                sink.lock().unwrap().push(m.content);
            });
            dispatcher.broadcast(GatewayEvent::message_created(&message(room, "in scope")));
            settle().await;
        }

        dispatcher.broadcast(GatewayEvent::message_created(&message(room, "after drop")));
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec!["in scope"]);
    }

    #[tokio::test]
    async fn test_targeted_channel_ownership() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();

        let (old_conn, _old_rx) = dispatcher.register_user_channel(user).await;
        let (new_conn, mut new_rx) = dispatcher.register_user_channel(user).await;

        // the stale connection's teardown must not evict the new one
        dispatcher.unregister_user_channel(user, old_conn).await;
        dispatcher
            .send_to_user(
                user,
                GatewayEvent::NotificationCreate {
                    id: Uuid::new_v4(),
                    kind: "application".into(),
                    body: "approved".into(),
                    created_at: chrono::Utc::now(),
                },
            )
            .await;

        let delivered = new_rx.try_recv();
        assert!(delivered.is_ok());

        dispatcher.unregister_user_channel(user, new_conn).await;
        dispatcher
            .send_to_user(
                user,
                GatewayEvent::Ready {
                    user_id: user,
                    username: "alice".into(),
                },
            )
            .await;
        assert!(new_rx.try_recv().is_err());
    }
}
