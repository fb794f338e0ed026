use std::net::SocketAddr;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ambulance_dispatch::config::EnvironmentConfig;
use ambulance_dispatch::create_app;
use ambulance_dispatch::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚑 Ambulance Dispatch - Motor de despacho");
    info!("=========================================");

    let config = EnvironmentConfig::from_env()?;
    if config.is_production() && config.cors_origins.is_empty() {
        warn!("⚠️ CORS_ORIGINS vacío en producción: se acepta cualquier origen");
    }
    let addr: SocketAddr = config.server_url().parse()?;

    let app_state = match AppState::from_config(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("❌ Error inicializando el estado: {:#}", e);
            return Err(e);
        }
    };
    let app = create_app(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Estado del servicio y de la flota");
    info!("🆘 Solicitudes:");
    info!("   POST /api/requests - Registrar emergencia y despachar");
    info!("   GET  /api/requests?status= - Listar solicitudes");
    info!("   GET  /api/requests/:id - Obtener solicitud");
    info!("   GET  /api/requests/:id/history - Historial de estados");
    info!("   PUT  /api/requests/:id/status - Completar o cancelar");
    info!("📋 Registros de servicio:");
    info!("   GET   /api/service-records?status=&from=&to= - Historial de servicios");
    info!("   GET   /api/service-records/:id - Obtener registro");
    info!("   POST  /api/service-records/:id/arrival - Registrar llegada");
    info!("   POST  /api/service-records/:id/completion - Registrar finalización");
    info!("   PATCH /api/service-records/:id/notes - Añadir notas");
    info!("🚗 Flota:");
    info!("   GET  /api/vehicles - Listar vehículos");
    info!("   POST /api/vehicles - Registrar vehículo");
    info!("   GET  /api/vehicles/summary - Resumen de disponibilidad");
    info!("   PUT  /api/vehicles/:id/out-of-service - Retirar del servicio");
    info!("   PUT  /api/vehicles/:id/in-service - Devolver al servicio");
    info!("   POST /api/vehicles/reserve - Reserva manual");
    info!("   POST /api/vehicles/:id/release - Liberación manual");
    info!("   PUT  /api/vehicles/:id/location - Actualizar ubicación");
    info!("   DELETE /api/vehicles/:id - Dar de baja");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
