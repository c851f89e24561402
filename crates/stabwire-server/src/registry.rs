//! Registry of live systems and their named states.
//!
//! The map of systems sits behind an async `RwLock`; each system has its own
//! mutex so requests on distinct systems run in parallel.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info};

use stabwire_circuit::Circuit;
use stabwire_proto::Outcomes;

use crate::config::EngineConfig;
use crate::engine::{self, StateKind, Tableau};
use crate::error::{Result, ServerError};

/// Server-side identifier of a system.
pub type SystemKey = u64;

/// Identifier of a state, unique within its system.
pub type StateKey = u64;

/// One simulator instance.
pub struct QuantumSystem {
    id: SystemKey,
    kind: StateKind,
    states: FxHashMap<StateKey, Tableau>,
    next_state: StateKey,
    rng: StdRng,
}

impl QuantumSystem {
    fn new(id: SystemKey, kind: StateKind, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id)),
            None => StdRng::from_entropy(),
        };
        Self {
            id,
            kind,
            states: FxHashMap::default(),
            next_state: 0,
            rng,
        }
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Encode a new named state by running `circuit` on an empty register.
    pub fn create_state(&mut self, circuit: &Circuit) -> StateKey {
        let mut tableau = Tableau::new(0);
        let _ = engine::execute(&mut tableau, circuit, &mut self.rng);

        let key = self.next_state;
        self.next_state += 1;
        self.states.insert(key, tableau);
        debug!(system = self.id, state = key, "state created");
        key
    }

    /// Run `circuit` on a temporary register that is dropped afterwards.
    pub fn compute_result(&mut self, circuit: &Circuit) -> Outcomes {
        let mut tableau = Tableau::new(0);
        engine::execute(&mut tableau, circuit, &mut self.rng)
    }

    /// Qubit count of a named state.
    pub fn state_size(&self, state: StateKey) -> Result<usize> {
        self.state(state).map(Tableau::num_qubits)
    }

    /// Run `circuit` on a named state, keeping the resulting state.
    pub fn run_on_state(&mut self, state: StateKey, circuit: &Circuit) -> Result<Outcomes> {
        let system = self.id;
        let tableau = self
            .states
            .get_mut(&state)
            .ok_or_else(|| state_not_found(system, state))?;
        Ok(engine::execute(tableau, circuit, &mut self.rng))
    }

    pub fn delete_state(&mut self, state: StateKey) -> Result<()> {
        self.states
            .remove(&state)
            .map(|_| debug!(system = self.id, state, "state deleted"))
            .ok_or_else(|| state_not_found(self.id, state))
    }

    fn state(&self, state: StateKey) -> Result<&Tableau> {
        self.states
            .get(&state)
            .ok_or_else(|| state_not_found(self.id, state))
    }
}

fn state_not_found(system: SystemKey, state: StateKey) -> ServerError {
    ServerError::StateNotFound {
        system: system.to_string(),
        state: state.to_string(),
    }
}

/// All live systems of one server process.
pub struct SystemRegistry {
    systems: RwLock<FxHashMap<SystemKey, Arc<Mutex<QuantumSystem>>>>,
    next_id: AtomicU64,
    config: EngineConfig,
}

impl SystemRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            systems: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(0),
            config,
        }
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a system. Ids come from a process-wide counter and are never reused.
    pub async fn create_system(&self, kind: StateKind) -> SystemKey {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let system = QuantumSystem::new(id, kind, self.config.rng_seed);
        self.systems
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(system)));
        info!(system = id, %kind, "system created");
        id
    }

    /// Remove a system and every state it owns.
    pub async fn delete_system(&self, id: SystemKey) -> Result<()> {
        let removed = self.systems.write().await.remove(&id);
        match removed {
            Some(_) => {
                info!(system = id, "system deleted");
                Ok(())
            }
            None => Err(ServerError::SystemNotFound(id.to_string())),
        }
    }

    /// Run `f` with exclusive access to one system.
    pub async fn with_system<T>(
        &self,
        id: SystemKey,
        f: impl FnOnce(&mut QuantumSystem) -> Result<T>,
    ) -> Result<T> {
        let system = self
            .systems
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ServerError::SystemNotFound(id.to_string()))?;

        let mut guard = system.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub async fn system_count(&self) -> usize {
        self.systems.read().await.len()
    }
}
