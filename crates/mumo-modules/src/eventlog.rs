//! Logs every meta, server and context callback. Heavy output, meant for
//! debugging the framework and new transports.

use serde::Deserialize;
use tracing::{debug, info};

use mumo_core::config::de::comma_separated;
use mumo_plugin::prelude::*;

#[derive(Debug, Default, Deserialize)]
struct EventLogSection {
    #[serde(default, deserialize_with = "comma_separated")]
    servers: Vec<ServerId>,
}

/// The eventlog module.
pub struct EventLog {
    name: String,
    scopes: Vec<ServerScope>,
}

/// Factory registered as `eventlog`.
pub fn create(name: &str, _remote: &mut ModuleRemote, config: ModuleConfig) -> AppResult<Box<dyn Module>> {
    let section: EventLogSection = config.section("eventlog")?;
    debug!(module = %name, servers = ?section.servers, "Configured");
    Ok(Box::new(EventLog {
        name: name.to_string(),
        scopes: ServerScope::from_ids(&section.servers),
    }))
}

impl EventLog {
    fn log(&self, server: &Arc<dyn ServerProxy>, event: &str, detail: impl std::fmt::Display) {
        info!(module = %self.name, server_id = %server.id(), event, "{}", detail);
    }
}

impl Module for EventLog {
    fn connected(&mut self, remote: &mut ModuleRemote) -> AppResult<()> {
        debug!(module = %self.name, "Connected, register for everything out there");
        remote.subscribe_meta_callbacks(HandlerKey::module(), ServerScope::ALL)?;
        remote.subscribe_server_callbacks(HandlerKey::module(), &self.scopes)?;
        remote.subscribe_context_callbacks(HandlerKey::module(), &self.scopes)
    }

    fn disconnected(&mut self, _remote: &mut ModuleRemote) -> AppResult<()> {
        debug!(module = %self.name, "Disconnected");
        Ok(())
    }

    fn meta_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn MetaCallbacks> {
        (*key == HandlerKey::module()).then_some(self as &mut dyn MetaCallbacks)
    }

    fn server_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ServerCallbacks> {
        (*key == HandlerKey::module()).then_some(self as &mut dyn ServerCallbacks)
    }

    fn context_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ContextCallbacks> {
        (*key == HandlerKey::module()).then_some(self as &mut dyn ContextCallbacks)
    }
}

impl MetaCallbacks for EventLog {
    fn started(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>) -> AppResult<()> {
        self.log(server, "started", "server started");
        Ok(())
    }

    fn stopped(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>) -> AppResult<()> {
        self.log(server, "stopped", "server stopped");
        Ok(())
    }
}

impl ServerCallbacks for EventLog {
    fn user_connected(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>, user: &User) -> AppResult<()> {
        self.log(server, "user_connected", format_args!("'{}' ({})", user.name, user.session));
        Ok(())
    }

    fn user_disconnected(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>, user: &User) -> AppResult<()> {
        self.log(server, "user_disconnected", format_args!("'{}' ({})", user.name, user.session));
        Ok(())
    }

    fn user_state_changed(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>, user: &User) -> AppResult<()> {
        self.log(
            server,
            "user_state_changed",
            format_args!("'{}' ({}) in channel {}", user.name, user.session, user.channel),
        );
        Ok(())
    }

    fn user_text_message(
        &mut self,
        _remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
        message: &TextMessage,
    ) -> AppResult<()> {
        self.log(server, "user_text_message", format_args!("'{}': {}", user.name, message.text));
        Ok(())
    }

    fn channel_created(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>, channel: &Channel) -> AppResult<()> {
        self.log(server, "channel_created", format_args!("'{}' ({})", channel.name, channel.id));
        Ok(())
    }

    fn channel_removed(&mut self, _remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>, channel: &Channel) -> AppResult<()> {
        self.log(server, "channel_removed", format_args!("'{}' ({})", channel.name, channel.id));
        Ok(())
    }

    fn channel_state_changed(
        &mut self,
        _remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        channel: &Channel,
    ) -> AppResult<()> {
        self.log(server, "channel_state_changed", format_args!("'{}' ({})", channel.name, channel.id));
        Ok(())
    }
}

impl ContextCallbacks for EventLog {
    fn context_action(
        &mut self,
        _remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        action: &ActionId,
        user: &User,
        session: Option<SessionId>,
        channel: Option<ChannelId>,
    ) -> AppResult<()> {
        self.log(
            server,
            "context_action",
            format_args!("'{}' used {} (session {:?}, channel {:?})", user.name, action, session, channel),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use serde_json::json;

    use mumo_core::config::ModulesConfig;
    use mumo_plugin::{Category, Manager};
    use mumo_transport::mock::MockMeta;

    use super::*;

    #[test]
    fn test_subscribes_everything_on_connect() {
        let mut manager = Manager::new(ModulesConfig::default(), ModuleCatalog::new());
        manager.start().unwrap();
        let handle = manager.handle();
        handle
            .load_module_with("eventlog", create, ModuleConfig::from_json(json!({ "eventlog": { "servers": "3,4" } })).unwrap())
            .unwrap();
        handle.start_modules(None).unwrap();
        handle.announce_connected(Arc::new(MockMeta::new()));

        let deadline = Instant::now() + Duration::from_secs(5);
        let count = |category| handle.list_subscriptions(category).map(|s| s.len()).unwrap_or(0);
        while count(Category::Context) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        let meta = handle.list_subscriptions(Category::Meta).unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].scope, ServerScope::All);

        let server: Vec<ServerScope> = handle
            .list_subscriptions(Category::Server)
            .unwrap()
            .into_iter()
            .map(|s| s.scope)
            .collect();
        assert!(server.contains(&ServerScope::Server(ServerId(3))));
        assert!(server.contains(&ServerScope::Server(ServerId(4))));
        assert_eq!(count(Category::Context), 2);

        manager.shutdown(false);
    }
}
