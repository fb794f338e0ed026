//! Registro de disponibilidad de vehículos
//!
//! Índice en memoria, autoritativo, de qué vehículos están libres. Mantiene
//! un mapa id → vehículo y una cola FIFO con los ids AVAILABLE, ambos bajo el
//! mismo `Mutex`: todo id en la cola está AVAILABLE y viceversa.
//!
//! La reserva es lineal: un vehículo reservado sale de la cola y no vuelve a
//! ella hasta que alguien lo libera. Cada reserva recuerda su dueño (una
//! solicitud o el administrador) para que la liberación administrativa no
//! pueda quitarle el vehículo a un despacho en curso.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AvailabilityStatus, Vehicle};
use crate::utils::errors::{DispatchError, DispatchResult};

/// Quién tiene reservado un vehículo DISPATCHED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Request(Uuid),
    Admin,
}

#[derive(Default)]
struct RegistryState {
    vehicles: HashMap<Uuid, Vehicle>,
    available: VecDeque<Uuid>,
    reservations: HashMap<Uuid, Reservation>,
}

impl RegistryState {
    fn availability(&self, id: Uuid) -> DispatchResult<AvailabilityStatus> {
        self.vehicles
            .get(&id)
            .map(|v| v.availability)
            .ok_or(DispatchError::UnknownVehicle(id))
    }

    fn set_availability(&mut self, id: Uuid, availability: AvailabilityStatus) {
        if let Some(vehicle) = self.vehicles.get_mut(&id) {
            vehicle.availability = availability;
        }
    }

    fn dequeue(&mut self, id: Uuid) {
        self.available.retain(|queued| *queued != id);
    }

    /// DISPATCHED → AVAILABLE; devuelve false si no estaba despachado
    fn free(&mut self, id: Uuid) -> bool {
        if self.vehicles.get(&id).map(|v| v.availability) != Some(AvailabilityStatus::Dispatched) {
            return false;
        }
        self.set_availability(id, AvailabilityStatus::Available);
        self.reservations.remove(&id);
        true
    }
}

/// Conteo de la flota por estado
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub total: usize,
    pub available: usize,
    pub dispatched: usize,
    pub out_of_service: usize,
}

#[derive(Default)]
pub struct AvailabilityRegistry {
    state: Mutex<RegistryState>,
}

impl AvailabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruye el registro desde el almacenamiento durable.
    ///
    /// Los vehículos AVAILABLE se encolan en orden de id, de modo que el
    /// orden de asignación tras un arranque es determinista. `owners` asigna
    /// los vehículos DISPATCHED a su solicitud activa; los que no aparecen
    /// quedan como reserva administrativa.
    pub fn rebuild(vehicles: Vec<Vehicle>, owners: &HashMap<Uuid, Uuid>) -> Self {
        let mut vehicles = vehicles;
        vehicles.sort_by_key(|v| v.id);

        let mut state = RegistryState::default();
        for vehicle in vehicles {
            match vehicle.availability {
                AvailabilityStatus::Available => state.available.push_back(vehicle.id),
                AvailabilityStatus::Dispatched => {
                    let owner = owners
                        .get(&vehicle.id)
                        .map_or(Reservation::Admin, |request_id| {
                            Reservation::Request(*request_id)
                        });
                    state.reservations.insert(vehicle.id, owner);
                }
                AvailabilityStatus::OutOfService => {}
            }
            state.vehicles.insert(vehicle.id, vehicle);
        }

        log::info!(
            "🚑 Registro reconstruido: {} vehículos ({} disponibles)",
            state.vehicles.len(),
            state.available.len()
        );

        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // Ninguna operación deja el estado a medias antes de un panic
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reserva el vehículo que lleva más tiempo disponible a nombre de `owner`.
    ///
    /// Devuelve `None` sin esperar cuando no hay ninguno.
    pub fn reserve_next(&self, owner: Reservation) -> Option<Vehicle> {
        let mut state = self.lock();
        let id = state.available.pop_front()?;
        state.set_availability(id, AvailabilityStatus::Dispatched);
        state.reservations.insert(id, owner);
        let vehicle = state.vehicles.get(&id).cloned();
        log::debug!("🔒 Vehículo {} reservado ({:?})", id, owner);
        vehicle
    }

    pub fn reservation(&self, vehicle_id: Uuid) -> Option<Reservation> {
        self.lock().reservations.get(&vehicle_id).copied()
    }

    /// Devuelve un vehículo a AVAILABLE, al final de la cola.
    ///
    /// Idempotente si ya estaba AVAILABLE; no hace nada si está
    /// OUT_OF_SERVICE.
    pub fn release(&self, vehicle_id: Uuid) -> DispatchResult<()> {
        let mut state = self.lock();
        state.availability(vehicle_id)?;
        if state.free(vehicle_id) {
            state.available.push_back(vehicle_id);
            log::debug!("🔓 Vehículo {} liberado", vehicle_id);
        }
        Ok(())
    }

    /// Deshace una reserva que no llegó a persistirse.
    ///
    /// El vehículo vuelve a la cabeza de la cola, donde estaba.
    pub fn restore_front(&self, vehicle_id: Uuid) -> DispatchResult<()> {
        let mut state = self.lock();
        state.availability(vehicle_id)?;
        if state.free(vehicle_id) {
            state.available.push_front(vehicle_id);
            log::debug!("↩️ Reserva del vehículo {} deshecha", vehicle_id);
        }
        Ok(())
    }

    /// Comprueba que un vehículo DISPATCHED es una reserva administrativa.
    ///
    /// Solo el administrador libera sus propias reservas, así que la
    /// respuesta sigue siendo válida mientras se tenga el lock del vehículo.
    pub fn ensure_admin_reserved(&self, vehicle_id: Uuid) -> DispatchResult<()> {
        let state = self.lock();
        state.availability(vehicle_id)?;
        match state.reservations.get(&vehicle_id) {
            Some(Reservation::Admin) => Ok(()),
            _ => Err(DispatchError::VehicleInUse(vehicle_id)),
        }
    }

    /// Retira un vehículo del servicio y de la cola.
    ///
    /// Un vehículo despachado no puede retirarse: el número de despachos
    /// activos nunca supera al de vehículos en servicio.
    pub fn mark_out_of_service(&self, vehicle_id: Uuid) -> DispatchResult<()> {
        let mut state = self.lock();
        match state.availability(vehicle_id)? {
            AvailabilityStatus::Dispatched => Err(DispatchError::VehicleInUse(vehicle_id)),
            AvailabilityStatus::OutOfService => Ok(()),
            AvailabilityStatus::Available => {
                state.dequeue(vehicle_id);
                state.set_availability(vehicle_id, AvailabilityStatus::OutOfService);
                Ok(())
            }
        }
    }

    /// Devuelve al servicio un vehículo retirado, al final de la cola
    pub fn mark_in_service(&self, vehicle_id: Uuid) -> DispatchResult<()> {
        let mut state = self.lock();
        if state.availability(vehicle_id)? == AvailabilityStatus::OutOfService {
            state.set_availability(vehicle_id, AvailabilityStatus::Available);
            state.available.push_back(vehicle_id);
        }
        Ok(())
    }

    /// Registra un vehículo nuevo; si está AVAILABLE entra al final de la cola
    pub fn register(&self, vehicle: Vehicle) {
        let mut state = self.lock();
        let id = vehicle.id;
        state.dequeue(id);
        if vehicle.is_available() {
            state.available.push_back(id);
        }
        state.vehicles.insert(id, vehicle);
    }

    /// Saca de la flota un vehículo que no está despachado
    pub fn remove(&self, vehicle_id: Uuid) -> DispatchResult<Vehicle> {
        let mut state = self.lock();
        if state.availability(vehicle_id)? == AvailabilityStatus::Dispatched {
            return Err(DispatchError::VehicleInUse(vehicle_id));
        }
        state.dequeue(vehicle_id);
        state
            .vehicles
            .remove(&vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))
    }

    pub fn set_location(&self, vehicle_id: Uuid, location: &str) -> DispatchResult<Vehicle> {
        let mut state = self.lock();
        let vehicle = state
            .vehicles
            .get_mut(&vehicle_id)
            .ok_or(DispatchError::UnknownVehicle(vehicle_id))?;
        vehicle.location = location.to_string();
        vehicle.audit.touch(Utc::now());
        Ok(vehicle.clone())
    }

    pub fn get(&self, vehicle_id: Uuid) -> Option<Vehicle> {
        self.lock().vehicles.get(&vehicle_id).cloned()
    }

    /// Copia de todos los vehículos ordenada por id
    pub fn snapshot(&self) -> Vec<Vehicle> {
        let mut vehicles: Vec<Vehicle> = self.lock().vehicles.values().cloned().collect();
        vehicles.sort_by_key(|v| v.id);
        vehicles
    }

    /// Ids disponibles en el orden en que serán asignados
    pub fn available_queue(&self) -> Vec<Uuid> {
        self.lock().available.iter().copied().collect()
    }

    pub fn summary(&self) -> FleetSummary {
        let state = self.lock();
        let mut summary = FleetSummary {
            total: state.vehicles.len(),
            ..FleetSummary::default()
        };
        for vehicle in state.vehicles.values() {
            match vehicle.availability {
                AvailabilityStatus::Available => summary.available += 1,
                AvailabilityStatus::Dispatched => summary.dispatched += 1,
                AvailabilityStatus::OutOfService => summary.out_of_service += 1,
            }
        }
        summary
    }
}
