//! Campos de auditoría compuestos en cada entidad
//!
//! Sustituyen a la herencia de una entidad base: cada modelo los incorpora
//! con `#[sqlx(flatten)]` y las consultas filtran `deleted = false` de forma
//! explícita.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditFields {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AuditFields {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted: false,
            deleted_at: None,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Borrado lógico: la fila se conserva pero deja de ser visible
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn is_visible(&self) -> bool {
        !self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_delete_hides_row() {
        let now = Utc::now();
        let mut audit = AuditFields::new(now);
        assert!(audit.is_visible());

        audit.soft_delete(now);
        assert!(!audit.is_visible());
        assert_eq!(audit.deleted_at, Some(now));
    }
}
