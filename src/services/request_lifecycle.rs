//! Máquina de estados de una solicitud
//!
//! Lógica pura, sin E/S. PENDING es un estado momentáneo previo a la
//! reserva; COMPLETED y CANCELLED son terminales.

use crate::models::RequestStatus;
use crate::utils::errors::{DispatchError, DispatchResult};

/// Efecto lateral que el coordinador debe aplicar junto con la transición
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Reservar vehículo y abrir el registro de servicio
    ReserveAndOpen,
    /// Sin vehículo retenido
    None,
    /// Liberar vehículo y cerrar el registro como completado
    ReleaseAndComplete,
    /// Liberar vehículo
    Release,
}

/// Valida `from → to` y devuelve el efecto asociado.
///
/// Cualquier par fuera de la tabla falla con `InvalidTransition`.
pub fn validate(from: RequestStatus, to: RequestStatus) -> DispatchResult<TransitionEffect> {
    use RequestStatus::*;

    match (from, to) {
        (Pending, Dispatched) => Ok(TransitionEffect::ReserveAndOpen),
        (Pending, Cancelled) => Ok(TransitionEffect::None),
        (Dispatched, Completed) => Ok(TransitionEffect::ReleaseAndComplete),
        (Dispatched, Cancelled) => Ok(TransitionEffect::Release),
        _ => Err(DispatchError::InvalidTransition { from, to }),
    }
}

/// Estados alcanzables desde `from`
pub fn allowed_targets(from: RequestStatus) -> &'static [RequestStatus] {
    match from {
        RequestStatus::Pending => &[RequestStatus::Dispatched, RequestStatus::Cancelled],
        RequestStatus::Dispatched => &[RequestStatus::Completed, RequestStatus::Cancelled],
        RequestStatus::Completed | RequestStatus::Cancelled => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    const ALL: [RequestStatus; 4] = [Pending, Dispatched, Completed, Cancelled];

    #[test]
    fn test_transition_table() {
        assert_eq!(validate(Pending, Dispatched).unwrap(), TransitionEffect::ReserveAndOpen);
        assert_eq!(validate(Pending, Cancelled).unwrap(), TransitionEffect::None);
        assert_eq!(validate(Dispatched, Completed).unwrap(), TransitionEffect::ReleaseAndComplete);
        assert_eq!(validate(Dispatched, Cancelled).unwrap(), TransitionEffect::Release);
    }

    #[test]
    fn test_everything_else_is_rejected() {
        for from in ALL {
            for to in ALL {
                let allowed = allowed_targets(from).contains(&to);
                match validate(from, to) {
                    Ok(_) => assert!(allowed, "{} -> {} should be rejected", from, to),
                    Err(DispatchError::InvalidTransition { from: f, to: t }) => {
                        assert!(!allowed, "{} -> {} should be allowed", from, to);
                        assert_eq!((f, t), (from, to));
                    }
                    Err(other) => panic!("unexpected error {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        assert!(allowed_targets(Completed).is_empty());
        assert!(allowed_targets(Cancelled).is_empty());
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
    }
}
