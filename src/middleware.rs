use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    access::{self, RoleSet},
    auth::{self, Credential, Identity},
    error::AccessError,
};

/// Stage
///
/// One gating step of a route's middleware chain. Each stage either lets the
/// request through (possibly after annotating it) or rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Resolve the caller's credential into an `Identity` and attach it.
    Authenticate,
    /// Require the attached identity's role to be in the set.
    Authorize(RoleSet),
}

impl Stage {
    /// apply
    ///
    /// Runs this stage against the request. `Authenticate` is the only writer of
    /// the `Identity` extension; `Authorize` only reads it.
    pub async fn apply(&self, request: &mut Request, state: &AppState) -> Result<(), AccessError> {
        match self {
            Stage::Authenticate => {
                let credentials = Credential::from_headers(request.headers(), state.config.env);
                if credentials.is_empty() {
                    tracing::debug!(uri = %request.uri(), "request carries no credential");
                    return Err(AccessError::Unauthenticated);
                }
                let identity = auth::authenticate_first(&credentials, state.repo.as_ref(), &state.config).await?;
                request.extensions_mut().insert(identity);
                Ok(())
            }
            Stage::Authorize(permitted) => {
                let identity = request.extensions().get::<Identity>();
                access::authorize(identity, permitted).inspect_err(|e| {
                    if *e == AccessError::Forbidden {
                        tracing::warn!(
                            uri = %request.uri(),
                            role = ?identity.map(|i| i.role),
                            permitted = %permitted,
                            "role not permitted"
                        );
                    }
                })
            }
        }
    }
}

/// MiddlewareChain
///
/// The ordered stages guarding one route. Built once from the route's access
/// rule and shared read-only between all requests to that route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiddlewareChain(Arc<[Stage]>);

impl MiddlewareChain {
    pub fn new(stages: Vec<Stage>) -> Self {
        MiddlewareChain(stages.into())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// run
    ///
    /// Walks the stages strictly in order. The first failure stops the walk;
    /// later stages never see the request.
    pub async fn run(&self, request: &mut Request, state: &AppState) -> Result<(), AccessError> {
        for stage in self.stages() {
            stage.apply(request, state).await?;
        }
        Ok(())
    }
}

/// GateState
///
/// State handed to `gate`: the application state plus the chain of the route
/// the layer is attached to.
#[derive(Clone)]
pub struct GateState {
    pub app: AppState,
    pub chain: MiddlewareChain,
}

/// gate
///
/// Route-scoped axum middleware. Runs the chain and only then hands the request
/// to the handler; a rejection becomes the response.
pub async fn gate(State(gate): State<GateState>, mut request: Request, next: Next) -> Result<Response, AccessError> {
    gate.chain.run(&mut request, &gate.app).await?;
    Ok(next.run(request).await)
}
