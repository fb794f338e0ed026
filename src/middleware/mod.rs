//! Middleware del sistema
//!
//! Este módulo contiene la configuración de CORS y el extractor del actor
//! que firma cada cambio de estado.

pub mod actor;
pub mod cors;

pub use actor::*;
pub use cors::*;
