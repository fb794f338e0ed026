//! Locks asíncronos por clave
//!
//! Serializa operaciones sobre la misma solicitud o registro sin bloquear
//! las de otras claves. La entrada de una clave desaparece del mapa cuando
//! se suelta el último guard y nadie más espera por ella.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = HashMap<Uuid, Arc<AsyncMutex<()>>>;

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<LockMap>,
}

/// Guard de una clave; al soltarse limpia la entrada si ya no se usa
pub struct KeyedGuard<'a> {
    owner: &'a KeyedLocks,
    key: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Espera el lock de `key`; se libera al soltar el guard
    pub async fn lock(&self, key: Uuid) -> KeyedGuard<'_> {
        // Declarado antes que el mutex: si la espera se cancela, el clon del
        // Arc ya se ha soltado cuando corre la limpieza
        let mut slot = KeyedGuard {
            owner: self,
            key,
            guard: None,
        };
        let lock = Arc::clone(self.map().entry(key).or_default());
        slot.guard = Some(lock.lock_owned().await);
        slot
    }

    /// Claves con lock vivo o en espera
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.owner.map();
        // Los clones solo se toman con el mapa bloqueado, así que un conteo
        // de 1 significa que nadie más lo tiene ni lo espera
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
