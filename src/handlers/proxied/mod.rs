// handlers/proxied/mod.rs - Forwarded routes
//
// One generic handler serves every entry of the route table. Entries that
// share a browser path are folded into a single MethodRouter so axum sees
// each path exactly once.

pub mod routes;

use axum::{
    extract::{Path, Request, State},
    http::Method,
    response::Response,
    routing::{MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::middleware::MaybeIdentity;
use crate::proxy::{self, ProxyRoute};
use crate::state::AppState;
pub use routes::{table, RouteEntry};

/// Register every entry; returns the router with the forwarded routes added
pub fn register(router: Router<AppState>, entries: Vec<RouteEntry>) -> Router<AppState> {
    let mut grouped: BTreeMap<&'static str, MethodRouter<AppState>> = BTreeMap::new();

    for entry in entries {
        let filter = method_filter(&entry.route.method);
        let handler = forward(Arc::new(entry.route));
        let methods = grouped.remove(entry.path).unwrap_or_default();
        grouped.insert(entry.path, methods.on(filter, handler));
    }

    grouped
        .into_iter()
        .fold(router, |router, (path, methods)| router.route(path, methods))
}

/// Handler closure bound to one descriptor
fn forward(
    route: Arc<ProxyRoute>,
) -> impl Fn(
    State<AppState>,
    Option<Path<HashMap<String, String>>>,
    MaybeIdentity,
    Request,
) -> futures::future::BoxFuture<'static, Response>
       + Clone
       + Send
       + Sync
       + 'static {
    move |State(state), params, MaybeIdentity(identity), request| {
        let route = route.clone();
        Box::pin(async move {
            let params = params.map(|Path(p)| p).unwrap_or_default();
            proxy::dispatch(&state, &route, &params, identity.as_ref(), request).await
        })
    }
}

fn method_filter(method: &Method) -> MethodFilter {
    if *method == Method::POST {
        MethodFilter::POST
    } else if *method == Method::PUT {
        MethodFilter::PUT
    } else if *method == Method::PATCH {
        MethodFilter::PATCH
    } else if *method == Method::DELETE {
        MethodFilter::DELETE
    } else {
        MethodFilter::GET
    }
}

