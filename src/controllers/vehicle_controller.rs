use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::dto::vehicle_dto::{CreateVehicleRequest, UpdateLocationRequest, VehicleResponse};
use crate::dto::ApiResponse;
use crate::services::{DispatchCoordinator, FleetSummary};
use crate::utils::errors::{AppError, DispatchError};

pub struct VehicleController {
    coordinator: Arc<DispatchCoordinator>,
}

impl VehicleController {
    pub fn new(coordinator: Arc<DispatchCoordinator>) -> Self {
        Self { coordinator }
    }

    pub async fn create(
        &self,
        body: CreateVehicleRequest,
    ) -> Result<ApiResponse<VehicleResponse>, AppError> {
        body.validate()?;

        // Matrícula repetida → DuplicateLicensePlate → 409
        let vehicle = self
            .coordinator
            .register_vehicle(&body.license_plate, &body.location)
            .await?;

        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Vehículo creado exitosamente".to_string(),
        ))
    }

    pub async fn deregister(&self, id: Uuid) -> Result<ApiResponse<VehicleResponse>, AppError> {
        let vehicle = self.coordinator.deregister_vehicle(id).await?;
        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Vehículo dado de baja".to_string(),
        ))
    }

    pub async fn update_location(
        &self,
        id: Uuid,
        body: UpdateLocationRequest,
    ) -> Result<VehicleResponse, AppError> {
        body.validate()?;
        let vehicle = self
            .coordinator
            .update_vehicle_location(id, &body.location)
            .await?;
        Ok(VehicleResponse::from(vehicle))
    }

    pub fn list(&self) -> Vec<VehicleResponse> {
        self.coordinator
            .list_vehicles()
            .into_iter()
            .map(VehicleResponse::from)
            .collect()
    }

    pub fn summary(&self) -> FleetSummary {
        self.coordinator.fleet_summary()
    }

    pub async fn set_out_of_service(&self, id: Uuid) -> Result<VehicleResponse, AppError> {
        let vehicle = self.coordinator.set_vehicle_out_of_service(id).await?;
        Ok(VehicleResponse::from(vehicle))
    }

    pub async fn set_in_service(&self, id: Uuid) -> Result<VehicleResponse, AppError> {
        let vehicle = self.coordinator.set_vehicle_in_service(id).await?;
        Ok(VehicleResponse::from(vehicle))
    }

    /// Reserva administrativa; sin capacidad responde como un despacho fallido
    pub async fn reserve(&self) -> Result<ApiResponse<VehicleResponse>, AppError> {
        let vehicle = self
            .coordinator
            .admin_reserve_vehicle()
            .await?
            .ok_or(DispatchError::NoAvailableVehicle)?;

        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Vehículo reservado manualmente".to_string(),
        ))
    }

    pub async fn release(&self, id: Uuid) -> Result<ApiResponse<VehicleResponse>, AppError> {
        let vehicle = self.coordinator.admin_release_vehicle(id).await?;
        Ok(ApiResponse::success_with_message(
            VehicleResponse::from(vehicle),
            "Vehículo liberado manualmente".to_string(),
        ))
    }
}
