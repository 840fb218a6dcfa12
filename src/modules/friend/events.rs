use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A change to the friend graph. Carries only the pair of users it touches;
/// subscribers re-query the full list, they never patch diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FriendGraphEvent {
    pub users: [Uuid; 2],
}

impl FriendGraphEvent {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        Self { users: [a, b] }
    }

    pub fn touches(&self, user_id: &Uuid) -> bool {
        self.users.contains(user_id)
    }
}

/// In-process change feed for the friend graph. Every successful mutation
/// publishes here; each subscription is an independent stream with its own
/// receiver.
pub struct FriendEventHub {
    sender: broadcast::Sender<FriendGraphEvent>,
}

impl FriendEventHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: FriendGraphEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.sender.send(event);
    }

    pub fn listen(&self) -> broadcast::Receiver<FriendGraphEvent> {
        self.sender.subscribe()
    }
}

impl Default for FriendEventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a live subscription. The feed runs until `unsubscribe` is called
/// or the handle is dropped; each registered subscription must be released by
/// the scope that created it.
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    pub fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
