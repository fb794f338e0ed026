//! Almacenamiento PostgreSQL
//!
//! Implementa `DispatchStore` y `PatientResolver` con SQLx. Las escrituras
//! compuestas se ejecutan dentro de una transacción.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    DispatchStore, DispatchWrite, PatientResolver, ServiceRecordFilter, TransitionWrite,
};
use crate::models::{
    patient::format_medical_note, AvailabilityStatus, Patient, Request, RequestStatus,
    ServiceRecord, StatusHistoryEntry, Vehicle,
};
use crate::utils::errors::{StoreError, StoreResult};

const VEHICLE_COLUMNS: &str =
    "id, license_plate, location, availability, created_at, updated_at, deleted, deleted_at";

const REQUEST_COLUMNS: &str = "id, requester_name, contact, location, emergency_description, \
     medical_notes, status, patient_id, vehicle_id, created_at, dispatch_time, updated_at";

const RECORD_COLUMNS: &str = "id, request_id, patient_id, vehicle_id, status, arrival_time, \
     completion_time, notes, created_at, updated_at";

const HISTORY_COLUMNS: &str =
    "id, request_id, old_status, new_status, notes, changed_by, created_at";

const PATIENT_COLUMNS: &str =
    "id, name, contact, medical_notes, created_at, updated_at, deleted, deleted_at";

#[derive(Clone)]
pub struct PgDispatchStore {
    pool: PgPool,
}

impl PgDispatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DispatchStore for PgDispatchStore {
    async fn load_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles WHERE deleted = FALSE ORDER BY id",
            VEHICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    async fn find_vehicle(&self, id: Uuid) -> StoreResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles WHERE id = $1 AND deleted = FALSE",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn insert_vehicle(&self, vehicle: &Vehicle) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vehicles (id, license_plate, location, availability, created_at, updated_at, deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.license_plate)
        .bind(&vehicle.location)
        .bind(vehicle.availability)
        .bind(vehicle.audit.created_at)
        .bind(vehicle.audit.updated_at)
        .bind(vehicle.audit.deleted)
        .bind(vehicle.audit.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
                entity: "vehicle",
                key: vehicle.license_plate.clone(),
            },
            other => StoreError::Database(other),
        })?;

        Ok(())
    }

    async fn soft_delete_vehicle(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET deleted = TRUE, deleted_at = $2, updated_at = $2
            WHERE id = $1 AND deleted = FALSE AND availability <> 'DISPATCHED'
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.find_vehicle(id).await? {
                Some(_) => Err(StoreError::Conflict {
                    entity: "vehicle",
                    id,
                }),
                None => Err(StoreError::Backend(format!("vehicle '{}' does not exist", id))),
            };
        }
        Ok(())
    }

    async fn update_vehicle_location(&self, id: Uuid, location: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE vehicles SET location = $2, updated_at = $3 WHERE id = $1 AND deleted = FALSE",
        )
        .bind(id)
        .bind(location)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!("vehicle '{}' does not exist", id)));
        }
        Ok(())
    }

    async fn update_vehicle_availability(
        &self,
        id: Uuid,
        availability: AvailabilityStatus,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE vehicles SET availability = $2, updated_at = $3 WHERE id = $1 AND deleted = FALSE",
        )
        .bind(id)
        .bind(availability)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!("vehicle '{}' does not exist", id)));
        }
        Ok(())
    }

    async fn persist_dispatch(&self, write: &DispatchWrite) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let reserved = sqlx::query(
            r#"
            UPDATE vehicles
            SET availability = 'DISPATCHED', updated_at = $2
            WHERE id = $1 AND availability = 'AVAILABLE' AND deleted = FALSE
            "#,
        )
        .bind(write.vehicle_id)
        .bind(write.request.updated_at)
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            // El drop de `tx` hace rollback
            return Err(StoreError::Conflict {
                entity: "vehicle",
                id: write.vehicle_id,
            });
        }

        let request = &write.request;
        sqlx::query(
            r#"
            INSERT INTO requests (id, requester_name, contact, location, emergency_description,
                                  medical_notes, status, patient_id, vehicle_id, created_at,
                                  dispatch_time, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(request.id)
        .bind(&request.requester_name)
        .bind(&request.contact)
        .bind(&request.location)
        .bind(&request.emergency_description)
        .bind(&request.medical_notes)
        .bind(request.status)
        .bind(request.patient_id)
        .bind(request.vehicle_id)
        .bind(request.created_at)
        .bind(request.dispatch_time)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await?;

        let record = &write.service_record;
        sqlx::query(
            r#"
            INSERT INTO service_records (id, request_id, patient_id, vehicle_id, status,
                                         arrival_time, completion_time, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.request_id)
        .bind(record.patient_id)
        .bind(record.vehicle_id)
        .bind(record.status)
        .bind(record.arrival_time)
        .bind(record.completion_time)
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_history(&mut tx, &write.history).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn persist_transition(&self, write: &TransitionWrite) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE requests SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(write.request.id)
        .bind(write.request.status)
        .bind(write.request.updated_at)
        .bind(write.expected_status)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                entity: "request",
                id: write.request.id,
            });
        }

        if let Some(record) = &write.service_record {
            update_record(&mut *tx, record).await?;
        }

        insert_history(&mut tx, &write.history).await?;

        if let Some(vehicle_id) = write.release_vehicle {
            // OUT_OF_SERVICE se respeta: solo se libera lo que sigue despachado
            sqlx::query(
                r#"
                UPDATE vehicles
                SET availability = 'AVAILABLE', updated_at = $2
                WHERE id = $1 AND availability = 'DISPATCHED'
                "#,
            )
            .bind(vehicle_id)
            .bind(write.request.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> StoreResult<Option<Request>> {
        let request = sqlx::query_as::<_, Request>(&format!(
            "SELECT {} FROM requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn list_requests_by_status(&self, status: RequestStatus) -> StoreResult<Vec<Request>> {
        let requests = sqlx::query_as::<_, Request>(&format!(
            "SELECT {} FROM requests WHERE status = $1 ORDER BY created_at DESC",
            REQUEST_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn list_history(&self, request_id: Uuid) -> StoreResult<Vec<StatusHistoryEntry>> {
        let entries = sqlx::query_as::<_, StatusHistoryEntry>(&format!(
            "SELECT {} FROM request_status_history WHERE request_id = $1 ORDER BY seq",
            HISTORY_COLUMNS
        ))
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn find_service_record(&self, id: Uuid) -> StoreResult<Option<ServiceRecord>> {
        let record = sqlx::query_as::<_, ServiceRecord>(&format!(
            "SELECT {} FROM service_records WHERE id = $1",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_service_record_by_request(
        &self,
        request_id: Uuid,
    ) -> StoreResult<Option<ServiceRecord>> {
        let record = sqlx::query_as::<_, ServiceRecord>(&format!(
            "SELECT {} FROM service_records WHERE request_id = $1",
            RECORD_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn update_service_record(&self, record: &ServiceRecord) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        update_record(&mut *conn, record).await
    }

    async fn list_service_records(
        &self,
        filter: &ServiceRecordFilter,
    ) -> StoreResult<Vec<ServiceRecord>> {
        let records = sqlx::query_as::<_, ServiceRecord>(&format!(
            r#"
            SELECT {} FROM service_records
            WHERE ($1::service_status IS NULL OR status = $1)
              AND ($2::timestamptz IS NULL OR created_at >= $2)
              AND ($3::timestamptz IS NULL OR created_at <= $3)
            ORDER BY created_at DESC
            "#,
            RECORD_COLUMNS
        ))
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl PatientResolver for PgDispatchStore {
    async fn find_or_create(
        &self,
        name: &str,
        contact: &str,
        notes: Option<&str>,
    ) -> StoreResult<Patient> {
        let now = Utc::now();
        let entry = notes.and_then(|n| format_medical_note(n, now));

        // El índice único parcial sobre contact hace atómico el find-or-create
        let patient = sqlx::query_as::<_, Patient>(&format!(
            r#"
            INSERT INTO patients (id, name, contact, medical_notes, created_at, updated_at, deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $5, FALSE, NULL)
            ON CONFLICT (contact) WHERE deleted = FALSE DO UPDATE
            SET medical_notes = CASE
                    WHEN EXCLUDED.medical_notes IS NULL THEN patients.medical_notes
                    WHEN patients.medical_notes IS NULL OR patients.medical_notes = '' THEN EXCLUDED.medical_notes
                    ELSE patients.medical_notes || E'\n' || EXCLUDED.medical_notes
                END,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            PATIENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(contact)
        .bind(entry)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(patient)
    }
}

async fn insert_history(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &StatusHistoryEntry,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO request_status_history (id, request_id, old_status, new_status, notes, changed_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id)
    .bind(entry.request_id)
    .bind(entry.old_status)
    .bind(entry.new_status)
    .bind(&entry.notes)
    .bind(&entry.changed_by)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn update_record(conn: &mut sqlx::PgConnection, record: &ServiceRecord) -> StoreResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE service_records
        SET status = $2, arrival_time = $3, completion_time = $4, notes = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(record.id)
    .bind(record.status)
    .bind(record.arrival_time)
    .bind(record.completion_time)
    .bind(&record.notes)
    .bind(record.updated_at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict {
            entity: "service_record",
            id: record.id,
        });
    }
    Ok(())
}
