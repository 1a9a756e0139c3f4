//! Session-scoped registry of persona agents, one per user.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};

use crate::agents::persona_agent::PersonaAgent;
use crate::memory::storage::{EpisodicStorage, InMemoryEpisodicStorage};
use crate::utilities::config::PersonaConfig;

/// A user's slot; `None` once the agent in it has been evicted.
type AgentSlot = Arc<Mutex<Option<PersonaAgent>>>;

/// Exclusive access to a live agent; holding it serializes that user's requests.
pub type AgentGuard = OwnedMappedMutexGuard<Option<PersonaAgent>, PersonaAgent>;

/// Creates persona agents on first use and hands out exclusive access.
///
/// Creation is atomic: concurrent first requests for the same user all land
/// on the same agent. Eviction happens under the agent's lock and empties
/// its slot, so a request that was waiting on an evicted agent moves on to
/// the replacement instead. At most one agent per user is ever usable.
///
/// Every agent created here shares one episodic storage backend, partitioned
/// by user id, so an evicted user's history is still there when the agent is
/// created again.
pub struct AgentRegistry {
    agents: DashMap<String, AgentSlot>,
    storage: Arc<dyn EpisodicStorage>,
    config: Arc<PersonaConfig>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(
            Arc::new(InMemoryEpisodicStorage::new()),
            Arc::new(PersonaConfig::default()),
        )
    }
}

impl AgentRegistry {
    pub fn new(storage: Arc<dyn EpisodicStorage>, config: Arc<PersonaConfig>) -> Self {
        Self {
            agents: DashMap::new(),
            storage,
            config,
        }
    }

    fn slot(&self, user_id: &str) -> AgentSlot {
        self.agents
            .entry(user_id.to_string())
            .or_insert_with(|| {
                log::debug!("AgentRegistry: creating agent for user '{}'", user_id);
                Arc::new(Mutex::new(Some(PersonaAgent::with_storage(
                    user_id,
                    Arc::clone(&self.storage),
                    Arc::clone(&self.config),
                ))))
            })
            .clone()
    }

    /// Lock the agent for `user_id`, creating it if absent.
    pub async fn acquire(&self, user_id: &str) -> AgentGuard {
        loop {
            let slot = self.slot(user_id);
            match OwnedMutexGuard::try_map(slot.lock_owned().await, |agent| agent.as_mut()) {
                Ok(agent) => return agent,
                Err(_) => {
                    log::debug!("AgentRegistry: agent for '{}' was evicted, retrying", user_id)
                }
            }
        }
    }

    /// Whether an agent for `user_id` is cached.
    pub fn contains(&self, user_id: &str) -> bool {
        self.agents.contains_key(user_id)
    }

    /// Drop the cached agent for `user_id` once in-flight requests finish.
    ///
    /// Stored history is untouched. Returns whether an agent was evicted.
    pub async fn evict(&self, user_id: &str) -> bool {
        let Some(slot) = self.agents.get(user_id).map(|entry| entry.value().clone()) else {
            return false;
        };
        let mut agent = slot.lock().await;
        let evicted = agent.take().is_some();
        self.agents
            .remove_if(user_id, |_, current| Arc::ptr_eq(current, &slot));
        if evicted {
            log::info!("AgentRegistry: evicted agent for user '{}'", user_id);
        }
        evicted
    }

    /// Run `f` on the agent for `user_id`, then evict it before any other
    /// request can reach it. Creates the agent first if absent.
    pub async fn retire_with<F, R>(&self, user_id: &str, f: F) -> R
    where
        F: FnOnce(&mut PersonaAgent) -> R,
    {
        loop {
            let slot = self.slot(user_id);
            let mut guard = slot.lock().await;
            if let Some(mut agent) = guard.take() {
                let outcome = f(&mut agent);
                self.agents
                    .remove_if(user_id, |_, current| Arc::ptr_eq(current, &slot));
                log::info!("AgentRegistry: retired agent for user '{}'", user_id);
                return outcome;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Users with a cached agent, in no particular order.
    pub fn user_ids(&self) -> Vec<String> {
        self.agents.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn config(&self) -> &PersonaConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::episodic::render_events;
    use crate::tools::base_tool::{FnTool, ToolSet};
    use std::time::Duration;

    #[test]
    fn test_slot_is_shared_per_user() {
        let registry = AgentRegistry::default();
        let a = registry.slot("userA");
        let b = registry.slot("userA");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert!(!registry.contains("userB"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_creates_one_agent() {
        let registry = Arc::new(AgentRegistry::default());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.slot("userA") })
            })
            .collect();

        let mut slots = Vec::new();
        for handle in handles {
            slots.push(handle.await.unwrap());
        }
        assert!(slots.iter().all(|s| Arc::ptr_eq(s, &slots[0])));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acts_record_every_exchange() {
        let registry = Arc::new(AgentRegistry::default());
        let tools = ToolSet::new().with(Arc::new(FnTool::static_wiki()));
        let n = 12;

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let tools = tools.clone();
                tokio::spawn(async move {
                    let mut agent = registry.acquire("userA").await;
                    let response = agent.act(&format!("question {}", i), &tools).await;
                    response
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let agent = registry.acquire("userA").await;
        let events = agent.episodic().events().unwrap();
        assert_eq!(events.len(), n);
        assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        for i in 0..n {
            let query = format!("question {}", i);
            assert_eq!(events.iter().filter(|e| e.query == query).count(), 1);
        }

        let window = agent.config().profile_window;
        assert_eq!(
            agent.profile().get(),
            render_events(&events[events.len() - window..])
        );
    }

    #[tokio::test]
    async fn test_evict_keeps_stored_history() {
        let registry = AgentRegistry::default();
        {
            let mut agent = registry.acquire("userA").await;
            agent.update_memories("q", "a").unwrap();
        }
        assert!(registry.evict("userA").await);
        assert!(registry.is_empty());
        assert!(!registry.evict("userA").await);

        let agent = registry.acquire("userA").await;
        assert_eq!(agent.episodic().len().unwrap(), 1);
        assert_eq!(agent.profile().get(), "Q: q | A: a");
    }

    #[tokio::test]
    async fn test_evicted_slot_yields_no_agent() {
        let registry = AgentRegistry::default();
        registry.acquire("userA").await.update_memories("q1", "a1").unwrap();

        let stale = registry.slot("userA");
        assert!(registry.evict("userA").await);
        registry.acquire("userA").await.update_memories("q2", "a2").unwrap();
        assert!(stale.lock().await.is_none());

        let mut agent = registry.acquire("userA").await;
        agent.update_memories("q3", "a3").unwrap();
        assert_eq!(
            agent.profile().get(),
            "Q: q1 | A: a1; Q: q2 | A: a2; Q: q3 | A: a3"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_request_waiting_during_eviction_lands_on_fresh_agent() {
        let registry = Arc::new(AgentRegistry::default());
        let held = registry.acquire("userA").await;

        let evictor = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.evict("userA").await })
        };
        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let mut agent = registry.acquire("userA").await;
                agent.update_memories("waiting", "done").unwrap();
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        assert!(evictor.await.unwrap());
        waiter.await.unwrap();

        let agent = registry.acquire("userA").await;
        assert_eq!(registry.len(), 1);
        assert_eq!(agent.episodic().len().unwrap(), 1);
        assert_eq!(agent.profile().get(), "Q: waiting | A: done");
    }

    #[tokio::test]
    async fn test_retire_with_runs_before_eviction() {
        let registry = AgentRegistry::default();
        let cleared = registry
            .retire_with("userA", |agent| {
                agent.update_memories("q", "a").unwrap();
                agent.episodic().len().unwrap()
            })
            .await;
        assert_eq!(cleared, 1);
        assert!(!registry.contains("userA"));
    }
}
