/// Router Module Index
///
/// One route table per feature area. Each table declares its own access rules;
/// `feature_tables` is the order in which they are composed into the dispatch table.
use crate::routing::RouteTable;

/// Registration and login (public).
pub mod auth;

/// Menu maintenance (ADMIN / MANAGER / WAITER, per route).
pub mod menu;

/// Report submission (MANAGER).
pub mod report;

/// All feature tables, in composition order.
pub fn feature_tables() -> Vec<RouteTable> {
    vec![auth::auth_routes(), menu::menu_routes(), report::report_routes()]
}
