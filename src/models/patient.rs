//! Modelo de Patient
//!
//! Paciente resuelto por contacto (find-or-create).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::audit::AuditFields;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub medical_notes: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Patient {
    pub fn new(name: String, contact: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            contact,
            medical_notes: None,
            audit: AuditFields::new(now),
        }
    }

    /// Añade notas médicas con marca de tiempo, conservando las anteriores
    pub fn append_medical_notes(&mut self, notes: &str, now: DateTime<Utc>) {
        let Some(entry) = format_medical_note(notes, now) else {
            return;
        };
        self.medical_notes = Some(match self.medical_notes.take() {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, entry),
            _ => entry,
        });
        self.audit.touch(now);
    }
}

/// Entrada de nota médica `[YYYY-mm-dd HH:MM:SS] texto`, `None` si está vacía
pub fn format_medical_note(notes: &str, now: DateTime<Utc>) -> Option<String> {
    let notes = notes.trim();
    if notes.is_empty() {
        return None;
    }
    Some(format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S"), notes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_append_medical_notes() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let mut patient = Patient::new("Ana".into(), "+34600123456".into(), now);

        patient.append_medical_notes("  ", now);
        assert_eq!(patient.medical_notes, None);

        patient.append_medical_notes("Alergia a penicilina", now);
        patient.append_medical_notes("Diabético", now);
        assert_eq!(
            patient.medical_notes.as_deref(),
            Some("[2025-03-01 10:00:00] Alergia a penicilina\n[2025-03-01 10:00:00] Diabético")
        );
    }
}
