use crate::{handlers, routing::{RouteDescriptor, RouteTable}};

/// Auth Route Table
///
/// Account creation and login. Both routes are public: they are how a caller
/// obtains the credential every other route asks for.
pub fn auth_routes() -> RouteTable {
    RouteTable::new("auth")
        // POST /register
        // Creates a staff account. The role defaults to WAITER when omitted.
        .route(RouteDescriptor::post("/register", handlers::register))
        // POST /login
        // Exchanges email and password for a bearer token.
        .route(RouteDescriptor::post("/login", handlers::login))
}
