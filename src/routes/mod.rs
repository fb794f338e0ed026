pub mod request_routes;
pub mod service_record_routes;
pub mod vehicle_routes;
