//! In-memory transport for development and testing.
//!
//! Simulates a voice server process with any number of virtual servers
//! without a network connection. Events are emitted synchronously on the
//! thread that triggers them, the way an RPC layer would call listeners
//! from one of its dispatch threads.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use tracing;

use mumo_core::types::{ActionId, CallbackId, ChannelId, ServerId, SessionId};

use crate::error::{TransportError, TransportResult};
use crate::proxy::{
    ContextCallback, MetaListener, MetaProxy, ServerListener, ServerProxy,
};
use crate::types::{Channel, ContextMask, TextMessage, User};

/// A context menu entry registered for one user.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    /// Text shown in the client.
    pub text: String,
    /// Where the entry is shown.
    pub mask: ContextMask,
    /// Listener invoked when the entry is used.
    pub callback: ContextCallback,
}

/// Mock voice server process.
pub struct MockMeta {
    /// Virtual servers by id
    servers: DashMap<ServerId, Arc<MockServer>>,
    /// Registered lifecycle listeners
    listeners: Mutex<Vec<Arc<dyn MetaListener>>>,
    /// Process start, for uptime
    started_at: Mutex<Instant>,
    /// Fixed uptime for tests, overrides the clock
    uptime_override: Mutex<Option<u64>>,
    /// Whether calls succeed; shared with every server
    reachable: Arc<AtomicBool>,
}

impl MockMeta {
    /// Create a mock process without servers.
    pub fn new() -> Self {
        Self {
            servers: DashMap::new(),
            listeners: Mutex::new(Vec::new()),
            started_at: Mutex::new(Instant::now()),
            uptime_override: Mutex::new(None),
            reachable: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a mock process with running servers `1..=count`.
    pub fn with_servers(count: i32) -> Self {
        let meta = Self::new();
        for id in 1..=count {
            meta.add_server(ServerId(id));
        }
        meta
    }

    /// Add a running virtual server. Returns the existing one if `id` is taken.
    pub fn add_server(&self, id: ServerId) -> Arc<MockServer> {
        self.servers
            .entry(id)
            .or_insert_with(|| Arc::new(MockServer::new(id, Arc::clone(&self.reachable))))
            .clone()
    }

    /// Concrete handle on a mock server.
    pub fn mock_server(&self, id: ServerId) -> Option<Arc<MockServer>> {
        self.servers.get(&id).map(|s| Arc::clone(s.value()))
    }

    /// Boot a server and notify lifecycle listeners.
    pub fn start_server(&self, id: ServerId) -> TransportResult<()> {
        let server = self
            .mock_server(id)
            .ok_or(TransportError::ServerNotFound(id))?;
        server.running.store(true, Ordering::SeqCst);
        tracing::info!("[MockMeta] Server {} started", id);

        for listener in self.meta_listeners() {
            listener.started(Arc::clone(&server) as Arc<dyn ServerProxy>);
        }
        Ok(())
    }

    /// Stop a server and notify lifecycle listeners.
    ///
    /// Like a real voice server, this drops the server's listeners, menu
    /// entries and connected users.
    pub fn stop_server(&self, id: ServerId) -> TransportResult<()> {
        let server = self
            .mock_server(id)
            .ok_or(TransportError::ServerNotFound(id))?;
        server.shutdown();
        tracing::info!("[MockMeta] Server {} stopped", id);

        for listener in self.meta_listeners() {
            listener.stopped(Arc::clone(&server) as Arc<dyn ServerProxy>);
        }
        Ok(())
    }

    /// Make every call fail (or succeed again), simulating a lost connection.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Pin the reported uptime, or return to the clock with `None`.
    pub fn set_uptime(&self, uptime: Option<u64>) {
        *self
            .uptime_override
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = uptime;
    }

    /// Simulate a process restart: all listeners and menu entries are lost
    /// and uptime starts over.
    pub fn restart(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        for server in self.servers.iter() {
            server.clear_registrations();
        }
        *self.started_at.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
        self.set_uptime(None);
        tracing::info!("[MockMeta] Restarted");
    }

    /// Number of registered lifecycle listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn meta_listeners(&self) -> Vec<Arc<dyn MetaListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check_reachable(&self) -> TransportResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::ConnectionRefused("mock".to_string()))
        }
    }
}

impl Default for MockMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaProxy for MockMeta {
    fn booted_servers(&self) -> TransportResult<Vec<Arc<dyn ServerProxy>>> {
        self.check_reachable()?;
        let mut servers: Vec<Arc<MockServer>> = self
            .servers
            .iter()
            .filter(|s| s.running.load(Ordering::SeqCst))
            .map(|s| Arc::clone(s.value()))
            .collect();
        servers.sort_by_key(|s| s.id);
        Ok(servers
            .into_iter()
            .map(|s| s as Arc<dyn ServerProxy>)
            .collect())
    }

    fn server(&self, id: ServerId) -> TransportResult<Option<Arc<dyn ServerProxy>>> {
        self.check_reachable()?;
        Ok(self.mock_server(id).map(|s| s as Arc<dyn ServerProxy>))
    }

    fn uptime(&self) -> TransportResult<u64> {
        self.check_reachable()?;
        let pinned = *self
            .uptime_override
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        Ok(pinned.unwrap_or_else(|| {
            self.started_at
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .elapsed()
                .as_secs()
        }))
    }

    fn add_callback(&self, listener: Arc<dyn MetaListener>) -> TransportResult<()> {
        self.check_reachable()?;
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
        Ok(())
    }
}

/// Mock virtual server.
pub struct MockServer {
    /// Virtual server id
    id: ServerId,
    /// Whether the server is booted
    running: AtomicBool,
    /// Shared reachability flag of the owning process
    reachable: Arc<AtomicBool>,
    /// Connected users by session
    users: DashMap<SessionId, User>,
    /// Channels by id
    channels: DashMap<ChannelId, Channel>,
    /// Registered server listeners
    listeners: Mutex<Vec<Arc<dyn ServerListener>>>,
    /// Context menu entries by (user, action)
    menu: DashMap<(SessionId, ActionId), MenuEntry>,
    /// Messages sent through `send_message`
    sent: Mutex<Vec<(SessionId, String)>>,
    /// Next session number
    next_session: AtomicU32,
    /// Next channel id
    next_channel: AtomicI32,
}

impl MockServer {
    fn new(id: ServerId, reachable: Arc<AtomicBool>) -> Self {
        let channels = DashMap::new();
        channels.insert(ChannelId(0), Channel::new(ChannelId(0), "Root", None));
        Self {
            id,
            running: AtomicBool::new(true),
            reachable,
            users: DashMap::new(),
            channels,
            listeners: Mutex::new(Vec::new()),
            menu: DashMap::new(),
            sent: Mutex::new(Vec::new()),
            next_session: AtomicU32::new(1),
            next_channel: AtomicI32::new(1),
        }
    }

    /// Connect a user to the root channel and notify listeners.
    pub fn connect_user(&self, name: &str) -> User {
        let session = SessionId(self.next_session.fetch_add(1, Ordering::SeqCst));
        let user = User::new(session, name, ChannelId(0));
        self.users.insert(session, user.clone());
        tracing::debug!("[MockServer {}] User '{}' connected", self.id, name);

        for listener in self.server_listeners() {
            listener.user_connected(&user);
        }
        user
    }

    /// Disconnect a user, drop their menu entries and notify listeners.
    pub fn disconnect_user(&self, session: SessionId) -> Option<User> {
        let (_, user) = self.users.remove(&session)?;
        self.menu.retain(|(owner, _), _| *owner != session);
        tracing::debug!("[MockServer {}] User '{}' disconnected", self.id, user.name);

        for listener in self.server_listeners() {
            listener.user_disconnected(&user);
        }
        Some(user)
    }

    /// Create a channel and notify listeners.
    pub fn add_channel(&self, name: &str, parent: ChannelId) -> Channel {
        let id = ChannelId(self.next_channel.fetch_add(1, Ordering::SeqCst));
        let channel = Channel::new(id, name, Some(parent));
        self.channels.insert(id, channel.clone());

        for listener in self.server_listeners() {
            listener.channel_created(&channel);
        }
        channel
    }

    /// Remove a channel and notify listeners.
    pub fn remove_channel(&self, id: ChannelId) -> Option<Channel> {
        let (_, channel) = self.channels.remove(&id)?;
        for listener in self.server_listeners() {
            listener.channel_removed(&channel);
        }
        Some(channel)
    }

    /// Have a user send a text message to their channel.
    pub fn say(&self, session: SessionId, text: &str) -> TransportResult<()> {
        let user = self.user(session)?;
        let message = TextMessage {
            sessions: Vec::new(),
            channels: vec![user.channel],
            trees: Vec::new(),
            text: text.to_string(),
        };
        for listener in self.server_listeners() {
            listener.user_text_message(&user, &message);
        }
        Ok(())
    }

    /// Have `invoker` use a context menu entry. Returns whether the entry existed.
    pub fn invoke_context(
        &self,
        invoker: SessionId,
        action: &ActionId,
        session: Option<SessionId>,
        channel: Option<ChannelId>,
    ) -> bool {
        let Some(user) = self.users.get(&invoker).map(|u| u.value().clone()) else {
            return false;
        };
        let Some(callback) = self
            .menu
            .get(&(invoker, action.clone()))
            .map(|e| e.callback.clone())
        else {
            return false;
        };

        callback
            .listener
            .context_action(action, &user, session, channel);
        true
    }

    /// Actions currently in a user's context menu.
    pub fn menu_actions(&self, session: SessionId) -> Vec<ActionId> {
        let mut actions: Vec<ActionId> = self
            .menu
            .iter()
            .filter(|e| e.key().0 == session)
            .map(|e| e.key().1.clone())
            .collect();
        actions.sort();
        actions
    }

    /// The menu entry `action` of a user, if registered.
    pub fn menu_entry(&self, session: SessionId, action: &ActionId) -> Option<MenuEntry> {
        self.menu
            .get(&(session, action.clone()))
            .map(|e| e.value().clone())
    }

    /// Distinct context callbacks that currently back at least one entry.
    pub fn context_callback_ids(&self) -> HashSet<CallbackId> {
        self.menu.iter().map(|e| e.callback.id).collect()
    }

    /// Messages sent through [`ServerProxy::send_message`].
    pub fn sent_messages(&self) -> Vec<(SessionId, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of registered server listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.users.clear();
        self.clear_registrations();
    }

    fn clear_registrations(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.menu.clear();
    }

    fn server_listeners(&self) -> Vec<Arc<dyn ServerListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn check_reachable(&self) -> TransportResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::ConnectionRefused("mock".to_string()))
        }
    }

    fn check_running(&self) -> TransportResult<()> {
        self.check_reachable()?;
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::ServerStopped(self.id))
        }
    }
}

impl ServerProxy for MockServer {
    fn id(&self) -> ServerId {
        self.id
    }

    fn is_running(&self) -> TransportResult<bool> {
        self.check_reachable()?;
        Ok(self.running.load(Ordering::SeqCst))
    }

    fn users(&self) -> TransportResult<Vec<User>> {
        self.check_running()?;
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by_key(|u| u.session);
        Ok(users)
    }

    fn user(&self, session: SessionId) -> TransportResult<User> {
        self.check_running()?;
        self.users
            .get(&session)
            .map(|u| u.value().clone())
            .ok_or(TransportError::InvalidSession(session))
    }

    fn channels(&self) -> TransportResult<Vec<Channel>> {
        self.check_running()?;
        let mut channels: Vec<Channel> =
            self.channels.iter().map(|c| c.value().clone()).collect();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }

    fn channel(&self, id: ChannelId) -> TransportResult<Channel> {
        self.check_running()?;
        self.channels
            .get(&id)
            .map(|c| c.value().clone())
            .ok_or(TransportError::InvalidChannel(id))
    }

    fn set_state(&self, user: &User) -> TransportResult<()> {
        self.check_running()?;
        if !self.users.contains_key(&user.session) {
            return Err(TransportError::InvalidSession(user.session));
        }
        if !self.channels.contains_key(&user.channel) {
            return Err(TransportError::InvalidChannel(user.channel));
        }
        self.users.insert(user.session, user.clone());

        for listener in self.server_listeners() {
            listener.user_state_changed(user);
        }
        Ok(())
    }

    fn send_message(&self, session: SessionId, text: &str) -> TransportResult<()> {
        self.check_running()?;
        if !self.users.contains_key(&session) {
            return Err(TransportError::InvalidSession(session));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((session, text.to_string()));
        Ok(())
    }

    fn add_callback(&self, listener: Arc<dyn ServerListener>) -> TransportResult<()> {
        self.check_running()?;
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
        Ok(())
    }

    fn add_context_callback(
        &self,
        session: SessionId,
        action: &ActionId,
        text: &str,
        callback: ContextCallback,
        mask: ContextMask,
    ) -> TransportResult<()> {
        self.check_running()?;
        if !self.users.contains_key(&session) {
            return Err(TransportError::InvalidSession(session));
        }
        self.menu.insert(
            (session, action.clone()),
            MenuEntry {
                text: text.to_string(),
                mask,
                callback,
            },
        );
        Ok(())
    }

    fn remove_context_callback(&self, callback: CallbackId) -> TransportResult<()> {
        self.check_running()?;
        self.menu.retain(|_, entry| entry.callback.id != callback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ContextListener;

    #[derive(Default)]
    struct Trace(Mutex<Vec<String>>);

    impl Trace {
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ServerListener for Trace {
        fn user_connected(&self, user: &User) {
            self.0.lock().unwrap().push(format!("connected {}", user.name));
        }
        fn user_disconnected(&self, user: &User) {
            self.0.lock().unwrap().push(format!("disconnected {}", user.name));
        }
        fn user_state_changed(&self, user: &User) {
            self.0.lock().unwrap().push(format!("moved {} {}", user.name, user.channel));
        }
        fn user_text_message(&self, user: &User, message: &TextMessage) {
            self.0.lock().unwrap().push(format!("{} says {}", user.name, message.text));
        }
        fn channel_created(&self, channel: &Channel) {
            self.0.lock().unwrap().push(format!("created {}", channel.name));
        }
        fn channel_removed(&self, channel: &Channel) {
            self.0.lock().unwrap().push(format!("removed {}", channel.name));
        }
        fn channel_state_changed(&self, _channel: &Channel) {}
    }

    impl ContextListener for Trace {
        fn context_action(
            &self,
            action: &ActionId,
            user: &User,
            session: Option<SessionId>,
            _channel: Option<ChannelId>,
        ) {
            self.0
                .lock()
                .unwrap()
                .push(format!("{} used {} on {:?}", user.name, action, session));
        }
    }

    #[test]
    fn test_server_events_reach_listeners() {
        let meta = MockMeta::with_servers(1);
        let server = meta.mock_server(ServerId(1)).unwrap();
        let trace = Arc::new(Trace::default());
        server.add_callback(trace.clone()).unwrap();

        let alice = server.connect_user("alice");
        let lobby = server.add_channel("lobby", ChannelId(0));
        let mut moved = alice.clone();
        moved.channel = lobby.id;
        server.set_state(&moved).unwrap();
        server.say(alice.session, "hi").unwrap();
        server.disconnect_user(alice.session);

        assert_eq!(
            trace.entries(),
            vec![
                "connected alice",
                "created lobby",
                "moved alice 1",
                "alice says hi",
                "disconnected alice"
            ]
        );
    }

    #[test]
    fn test_set_state_rejects_unknown_channel() {
        let meta = MockMeta::with_servers(1);
        let server = meta.mock_server(ServerId(1)).unwrap();
        let mut user = server.connect_user("bob");
        user.channel = ChannelId(42);
        assert!(matches!(
            server.set_state(&user),
            Err(TransportError::InvalidChannel(ChannelId(42)))
        ));
    }

    #[test]
    fn test_context_entries() {
        let meta = MockMeta::with_servers(1);
        let server = meta.mock_server(ServerId(1)).unwrap();
        let alice = server.connect_user("alice");
        let bob = server.connect_user("bob");
        let trace = Arc::new(Trace::default());
        let callback = ContextCallback::new(trace.clone());
        let poke = ActionId::new("poke");

        server
            .add_context_callback(alice.session, &poke, "Poke", callback.clone(), ContextMask::USER)
            .unwrap();
        server
            .add_context_callback(bob.session, &poke, "Poke", callback.clone(), ContextMask::USER)
            .unwrap();
        assert_eq!(server.context_callback_ids().len(), 1);

        assert!(server.invoke_context(alice.session, &poke, Some(bob.session), None));
        assert_eq!(trace.entries(), vec![format!("alice used poke on {:?}", Some(bob.session))]);

        server.remove_context_callback(callback.id).unwrap();
        assert!(server.menu_actions(alice.session).is_empty());
        assert!(!server.invoke_context(alice.session, &poke, None, None));
    }

    #[test]
    fn test_unreachable_and_restart() {
        let meta = MockMeta::with_servers(2);
        meta.set_uptime(Some(100));
        assert_eq!(meta.uptime().unwrap(), 100);
        assert_eq!(meta.booted_servers().unwrap().len(), 2);

        meta.set_reachable(false);
        assert!(meta.uptime().is_err());
        assert!(meta.booted_servers().is_err());

        meta.set_reachable(true);
        let server = meta.mock_server(ServerId(2)).unwrap();
        server.add_callback(Arc::new(Trace::default())).unwrap();
        meta.restart();
        assert_eq!(server.listener_count(), 0);
        assert!(meta.uptime().unwrap() < 100);
    }

    #[test]
    fn test_stop_server_drops_registrations() {
        let meta = MockMeta::with_servers(1);
        let server = meta.mock_server(ServerId(1)).unwrap();
        server.add_callback(Arc::new(Trace::default())).unwrap();
        meta.stop_server(ServerId(1)).unwrap();

        assert_eq!(server.listener_count(), 0);
        assert!(meta.booted_servers().unwrap().is_empty());
        assert!(matches!(
            server.users(),
            Err(TransportError::ServerStopped(ServerId(1)))
        ));
    }
}
