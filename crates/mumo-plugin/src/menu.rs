//! Per-module context menu bookkeeping.
//!
//! The voice server knows one dispatch callback per (server, action). Many
//! users can carry the same action in their menu, each possibly routed to a
//! different handler. An [`ActionRoute`] owns the shared callback together
//! with the sessions using it; the callback is released once the last
//! session is gone.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mumo_core::types::{ActionId, HandlerKey, ServerId, SessionId};
use mumo_transport::{ContextCallback, ServerProxy};

/// The shared dispatch callback of one (server, action) and its users.
pub struct ActionRoute {
    /// Server the callback is registered on.
    pub server: Arc<dyn ServerProxy>,
    /// Callback registered with the transport.
    pub callback: ContextCallback,
    /// Sessions carrying the entry, and the handler each one is routed to.
    pub sessions: HashMap<SessionId, HandlerKey>,
}

impl fmt::Debug for ActionRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRoute")
            .field("server", &self.server.id())
            .field("callback", &self.callback.id)
            .field("sessions", &self.sessions)
            .finish()
    }
}

/// All context menu routes of one module.
#[derive(Debug, Default)]
pub struct ContextMenuState {
    routes: HashMap<(ServerId, ActionId), ActionRoute>,
}

impl ContextMenuState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The route of (server, action), if any session uses it.
    pub fn route(&self, server: ServerId, action: &ActionId) -> Option<&ActionRoute> {
        self.routes.get(&(server, action.clone()))
    }

    /// The dispatch callback already registered for (server, action).
    pub fn callback(&self, server: ServerId, action: &ActionId) -> Option<ContextCallback> {
        self.route(server, action).map(|route| route.callback.clone())
    }

    /// Create the route for (server, action). An existing route is kept.
    pub fn insert_route(
        &mut self,
        server: Arc<dyn ServerProxy>,
        action: ActionId,
        callback: ContextCallback,
    ) {
        self.routes
            .entry((server.id(), action))
            .or_insert_with(|| ActionRoute {
                server,
                callback,
                sessions: HashMap::new(),
            });
    }

    /// Route `session` to `handler` on an existing route. Returns `false` if
    /// there is no route for (server, action).
    pub fn add_session(
        &mut self,
        server: ServerId,
        action: &ActionId,
        session: SessionId,
        handler: HandlerKey,
    ) -> bool {
        match self.routes.get_mut(&(server, action.clone())) {
            Some(route) => {
                route.sessions.insert(session, handler);
                true
            }
            None => false,
        }
    }

    /// The server and handler an invocation by `session` should reach.
    pub fn resolve(
        &self,
        server: ServerId,
        action: &ActionId,
        session: SessionId,
    ) -> Option<(Arc<dyn ServerProxy>, HandlerKey)> {
        let route = self.route(server, action)?;
        let key = route.sessions.get(&session)?;
        Some((Arc::clone(&route.server), key.clone()))
    }

    /// Drop one session from a route. Returns the route if it became empty
    /// and was removed; its callback must then be released.
    pub fn remove_session(
        &mut self,
        server: ServerId,
        action: &ActionId,
        session: SessionId,
    ) -> Option<ActionRoute> {
        let route_key = (server, action.clone());
        let route = self.routes.get_mut(&route_key)?;
        route.sessions.remove(&session);
        if route.sessions.is_empty() {
            self.routes.remove(&route_key)
        } else {
            None
        }
    }

    /// Drop a route with all its sessions.
    pub fn remove_action(&mut self, server: ServerId, action: &ActionId) -> Option<ActionRoute> {
        self.routes.remove(&(server, action.clone()))
    }

    /// Drop `session` from every route on `server`. Returns the routes that
    /// became empty.
    pub fn forget_session(&mut self, server: ServerId, session: SessionId) -> Vec<ActionRoute> {
        let emptied: Vec<(ServerId, ActionId)> = self
            .routes
            .iter_mut()
            .filter(|((route_server, _), _)| *route_server == server)
            .filter_map(|(route_key, route)| {
                route.sessions.remove(&session);
                route.sessions.is_empty().then(|| route_key.clone())
            })
            .collect();

        emptied
            .into_iter()
            .filter_map(|route_key| self.routes.remove(&route_key))
            .collect()
    }

    /// Drop every route on `server`.
    pub fn forget_server(&mut self, server: ServerId) -> Vec<ActionRoute> {
        let keys: Vec<(ServerId, ActionId)> = self
            .routes
            .keys()
            .filter(|(route_server, _)| *route_server == server)
            .cloned()
            .collect();

        keys.into_iter()
            .filter_map(|route_key| self.routes.remove(&route_key))
            .collect()
    }

    /// Number of live routes (registered dispatch callbacks).
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Number of (session, action) entries across all routes.
    pub fn entry_count(&self) -> usize {
        self.routes.values().map(|route| route.sessions.len()).sum()
    }
}
