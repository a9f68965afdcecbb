use crate::{
    handlers,
    models::Role,
    routing::{RouteDescriptor, RouteTable},
};

/// Menu Route Table
///
/// Menu maintenance. Every route is authenticated; the permitted roles differ
/// per operation and are matched exactly (no role inherits another's rights).
pub fn menu_routes() -> RouteTable {
    RouteTable::new("menu")
        // POST /menu
        // Adds an item. New items start unapproved.
        .route(
            RouteDescriptor::post("/menu", handlers::create_menu_item)
                .require_roles([Role::Admin, Role::Manager]),
        )
        // GET /menu
        // Lists items. Waiters only see approved ones.
        .route(
            RouteDescriptor::get("/menu", handlers::get_all_menu_items)
                .require_roles([Role::Admin, Role::Manager, Role::Waiter]),
        )
        // PUT /menu/{id}
        // Partial update of an existing item.
        .route(
            RouteDescriptor::put("/menu/{id}", handlers::update_menu_item)
                .require_roles([Role::Admin, Role::Manager]),
        )
        // DELETE /menu/{id}
        .route(RouteDescriptor::delete("/menu/{id}", handlers::delete_menu_item).require_roles([Role::Admin]))
        // PATCH /menu/approve/{id}
        // Publishes an item to waiters.
        .route(
            RouteDescriptor::patch("/menu/approve/{id}", handlers::approve_menu_item)
                .require_roles([Role::Admin]),
        )
}
