use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::a2a::Task;
use crate::llm::ModelMessage;

pub type SessionHistory = Arc<Mutex<Vec<ModelMessage>>>;

/// Tasks and sessions kept before the oldest entries are evicted.
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;

/// Tasks by id and conversation histories by context id. Nothing survives a
/// restart; each map holds at most `capacity` entries and evicts the oldest
/// insert first.
#[derive(Debug)]
pub struct InMemoryStore {
    tasks: RwLock<BoundedMap<Task>>,
    sessions: Mutex<BoundedMap<SessionHistory>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STORE_CAPACITY)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tasks: RwLock::new(BoundedMap::new(capacity)),
            sessions: Mutex::new(BoundedMap::new(capacity)),
        }
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn save_task(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    /// History handle for `context_id`, created empty on first use. Holding
    /// the handle's lock serializes turns within one context. An evicted
    /// session stays alive for whoever still holds its handle.
    pub async fn session(&self, context_id: &str) -> SessionHistory {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(context_id) {
            return Arc::clone(session);
        }

        let session = SessionHistory::default();
        sessions.insert(context_id.to_string(), Arc::clone(&session));
        session
    }
}

/// Insertion-ordered map with a fixed upper bound.
#[derive(Debug)]
struct BoundedMap<V> {
    entries: HashMap<String, V>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<V> BoundedMap<V> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: String, value: V) {
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}
