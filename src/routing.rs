use std::collections::HashMap;

use axum::{
    Router,
    handler::Handler,
    http::Method,
    middleware::from_fn_with_state,
    routing::{self, MethodRouter},
};

use crate::{
    AppState,
    access::RoleSet,
    error::RouteConfigError,
    middleware::{self, GateState, MiddlewareChain, Stage},
    models::Role,
};

/// Access
///
/// Who may call a route. `Roles` always implies authentication: there is no
/// way to ask for a role check without the gate running first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Roles(RoleSet),
}

impl Access {
    /// The middleware chain this rule expands to, in execution order.
    pub fn chain(&self) -> MiddlewareChain {
        match self {
            Access::Public => MiddlewareChain::default(),
            Access::Roles(roles) => MiddlewareChain::new(vec![Stage::Authenticate, Stage::Authorize(roles.clone())]),
        }
    }
}

/// RouteDescriptor
///
/// One endpoint: method, path, access rule and the handler that serves it.
pub struct RouteDescriptor {
    method: Method,
    path: &'static str,
    access: Access,
    endpoint: MethodRouter<AppState>,
}

macro_rules! method_constructor {
    ($name:ident, $method:expr) => {
        pub fn $name<H, T>(path: &'static str, handler: H) -> Self
        where
            H: Handler<T, AppState>,
            T: 'static,
        {
            Self::new($method, path, routing::$name(handler))
        }
    };
}

impl RouteDescriptor {
    fn new(method: Method, path: &'static str, endpoint: MethodRouter<AppState>) -> Self {
        Self {
            method,
            path,
            access: Access::Public,
            endpoint,
        }
    }

    method_constructor!(get, Method::GET);
    method_constructor!(post, Method::POST);
    method_constructor!(put, Method::PUT);
    method_constructor!(patch, Method::PATCH);
    method_constructor!(delete, Method::DELETE);

    /// require_roles
    ///
    /// Gates the route behind authentication plus membership in `roles`.
    pub fn require_roles(mut self, roles: impl Into<RoleSet>) -> Self {
        self.access = Access::Roles(roles.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn chain(&self) -> MiddlewareChain {
        self.access.chain()
    }

    /// Whether this route would let a caller with `role` through to the handler.
    pub fn permits(&self, role: Role) -> bool {
        match &self.access {
            Access::Public => true,
            Access::Roles(roles) => roles.contains(role),
        }
    }
}

impl std::fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// RouteTable
///
/// The routes of one feature area, in declaration order.
#[derive(Debug)]
pub struct RouteTable {
    feature: &'static str,
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new(feature: &'static str) -> Self {
        Self {
            feature,
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }
}

/// DispatchTable
///
/// The validated concatenation of all feature tables. Built once at startup.
#[derive(Debug)]
pub struct DispatchTable {
    routes: Vec<RouteDescriptor>,
}

impl DispatchTable {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in composition order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<&RouteDescriptor> {
        self.routes().find(|route| route.method == *method && route.path == path)
    }

    /// into_router
    ///
    /// Mounts every route on an axum `Router`. Gated routes get their chain as a
    /// `route_layer`, so a request for an unregistered method on a known path
    /// still answers 405 without touching the gate.
    pub fn into_router(self, state: &AppState) -> Router<AppState> {
        self.routes.into_iter().fold(Router::new(), |router, route| {
            let chain = route.chain();
            let endpoint = if chain.is_empty() {
                route.endpoint
            } else {
                let gate_state = GateState {
                    app: state.clone(),
                    chain,
                };
                route.endpoint.route_layer(from_fn_with_state(gate_state, middleware::gate))
            };
            router.route(route.path, endpoint)
        })
    }
}

/// compose
///
/// Concatenates the feature tables, preserving order, and validates the result.
/// Any duplicate (method, path), empty role set or malformed path is reported
/// here, before a single request is served.
pub fn compose(tables: impl IntoIterator<Item = RouteTable>) -> Result<DispatchTable, RouteConfigError> {
    let mut seen: HashMap<(Method, String), &'static str> = HashMap::new();
    let mut shapes: HashMap<String, &'static str> = HashMap::new();
    let mut routes = Vec::new();

    for table in tables {
        let feature = table.feature;
        for route in table.routes {
            validate_path(&route)?;

            if let Access::Roles(roles) = &route.access {
                if roles.is_empty() {
                    return Err(RouteConfigError::EmptyRoleSet {
                        method: route.method.clone(),
                        path: route.path.to_string(),
                    });
                }
            }

            let shape = route_shape(route.path);
            if let Some(first) = seen.insert((route.method.clone(), shape.clone()), feature) {
                return Err(RouteConfigError::DuplicateRoute {
                    method: route.method.clone(),
                    path: route.path.to_string(),
                    first,
                });
            }

            // Methods on one path share a single dispatcher entry, so every
            // spelling of a shape must be identical.
            let existing = *shapes.entry(shape).or_insert(route.path);
            if existing != route.path {
                return Err(RouteConfigError::ConflictingParameters {
                    method: route.method.clone(),
                    path: route.path.to_string(),
                    existing,
                });
            }

            tracing::debug!(
                feature,
                method = %route.method,
                path = route.path,
                access = ?route.access,
                "route registered"
            );
            routes.push(route);
        }
    }

    tracing::info!(routes = routes.len(), "route table composed");
    Ok(DispatchTable { routes })
}

fn validate_path(route: &RouteDescriptor) -> Result<(), RouteConfigError> {
    let malformed = |reason| RouteConfigError::MalformedPath {
        method: route.method.clone(),
        path: route.path.to_string(),
        reason,
    };

    let path = route.path;
    if !path.starts_with('/') {
        return Err(malformed("must start with '/'"));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(malformed("must not contain whitespace"));
    }
    if path.len() > 1 && path.ends_with('/') {
        return Err(malformed("must not end with '/'"));
    }
    for segment in path.split('/').skip(1) {
        if segment.is_empty() && path != "/" {
            return Err(malformed("must not contain empty segments"));
        }
        if segment.starts_with(':') || segment.starts_with('*') {
            return Err(malformed("parameters are written as {name}"));
        }
        let is_param = segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2;
        if !is_param && (segment.contains('{') || segment.contains('}')) {
            return Err(malformed("unbalanced parameter braces"));
        }
    }
    Ok(())
}

/// Path with parameter names erased: `/menu/{id}` and `/menu/{item}` match the
/// same requests and therefore count as the same route.
fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with('{') { "{}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}
