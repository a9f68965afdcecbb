use crate::{
    handlers,
    models::Role,
    routing::{RouteDescriptor, RouteTable},
};

/// Report Route Table
pub fn report_routes() -> RouteTable {
    RouteTable::new("report")
        // POST /reports
        // Managers only.
        .route(RouteDescriptor::post("/reports", handlers::submit_report).require_roles([Role::Manager]))
}
