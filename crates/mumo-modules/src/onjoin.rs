//! Moves users into a specific channel once they connect, regardless of
//! the channel they were in when they left.
//!
//! ```toml
//! [onjoin]
//! servers = [1, 2]   # empty: every server
//!
//! [all]
//! channel = 1
//!
//! [server_2]
//! channel = 5
//! ```

use serde::Deserialize;
use tracing::{debug, error};

use mumo_core::config::de::comma_separated;
use mumo_plugin::prelude::*;
use mumo_transport::TransportError;

#[derive(Debug, Default, Deserialize)]
struct OnJoinSection {
    #[serde(default, deserialize_with = "comma_separated")]
    servers: Vec<ServerId>,
}

/// Target channel of one server (or of `[all]`).
#[derive(Debug, Deserialize)]
struct Target {
    #[serde(default = "default_channel")]
    channel: i32,
}

fn default_channel() -> i32 {
    1
}

impl Default for Target {
    fn default() -> Self {
        Self {
            channel: default_channel(),
        }
    }
}

/// The onjoin module.
pub struct OnJoin {
    config: ModuleConfig,
    servers: Vec<ServerId>,
}

/// Factory registered as `onjoin`.
pub fn create(_name: &str, _remote: &mut ModuleRemote, config: ModuleConfig) -> AppResult<Box<dyn Module>> {
    let section: OnJoinSection = config.section("onjoin")?;
    Ok(Box::new(OnJoin {
        config,
        servers: section.servers,
    }))
}

impl Module for OnJoin {
    fn connected(&mut self, remote: &mut ModuleRemote) -> AppResult<()> {
        debug!(module = %remote.name(), "Register for server callbacks");
        remote.subscribe_server_callbacks(HandlerKey::module(), &ServerScope::from_ids(&self.servers))
    }

    fn disconnected(&mut self, _remote: &mut ModuleRemote) -> AppResult<()> {
        Ok(())
    }

    fn server_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ServerCallbacks> {
        (*key == HandlerKey::module()).then_some(self as &mut dyn ServerCallbacks)
    }
}

impl ServerCallbacks for OnJoin {
    fn user_connected(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        let server_id = server.id();
        let target: Target = self.config.server_section(server_id, "all")?;
        let channel = ChannelId(target.channel);
        if user.channel == channel {
            return Ok(());
        }

        debug!(
            module = %remote.name(),
            "Moving user '{}' from channel {} to {} on server {}",
            user.name,
            user.channel,
            channel,
            server_id
        );
        let mut moved = user.clone();
        moved.channel = channel;

        match server.set_state(&moved) {
            Ok(()) => Ok(()),
            Err(TransportError::InvalidChannel(_)) => {
                error!(
                    module = %remote.name(),
                    "Moving user '{}' failed, target channel {} does not exist on server {}",
                    user.name,
                    channel,
                    server_id
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use serde_json::json;

    use mumo_core::config::{ModulesConfig, MurmurConfig};
    use mumo_plugin::{Category, ConnectionSupervisor, Manager, ManagerHandle};
    use mumo_transport::mock::MockMeta;

    use super::*;

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    fn subscribed(handle: &ManagerHandle) -> bool {
        handle
            .list_subscriptions(Category::Server)
            .map(|subs| subs.iter().any(|s| s.module == "onjoin"))
            .unwrap_or(false)
    }

    fn running(meta: &Arc<MockMeta>, config: serde_json::Value) -> Manager {
        let mut manager = Manager::new(ModulesConfig::default(), ModuleCatalog::new());
        manager.start().unwrap();
        let handle = manager.handle();
        handle
            .load_module_with("onjoin", create, ModuleConfig::from_json(config).unwrap())
            .unwrap();
        handle.start_modules(None).unwrap();

        let supervisor = ConnectionSupervisor::new(
            Arc::clone(meta) as Arc<dyn MetaProxy>,
            handle.clone(),
            MurmurConfig::default(),
            Duration::ZERO,
        );
        assert!(supervisor.attach_callbacks());
        assert!(wait_for(|| subscribed(&handle)));
        manager
    }

    #[test]
    fn test_moves_user_to_default_channel() {
        let meta = Arc::new(MockMeta::with_servers(1));
        let server = meta.mock_server(ServerId(1)).unwrap();
        let lobby = server.add_channel("Lobby", ChannelId(0));
        let mut manager = running(&meta, json!({}));

        let user = server.connect_user("ann");
        assert!(wait_for(|| server.user(user.session).ok().map(|u| u.channel) == Some(lobby.id)));

        manager.shutdown(false);
    }

    #[test]
    fn test_server_section_overrides_all() {
        let meta = Arc::new(MockMeta::with_servers(2));
        let first = meta.mock_server(ServerId(1)).unwrap();
        let second = meta.mock_server(ServerId(2)).unwrap();
        for server in [&first, &second] {
            server.add_channel("A", ChannelId(0));
            server.add_channel("B", ChannelId(0));
        }
        let mut manager = running(
            &meta,
            json!({ "all": { "channel": 1 }, "server_2": { "channel": 2 } }),
        );

        let on_first = first.connect_user("bo");
        let on_second = second.connect_user("cy");
        assert!(wait_for(|| first.user(on_first.session).ok().map(|u| u.channel) == Some(ChannelId(1))));
        assert!(wait_for(|| second.user(on_second.session).ok().map(|u| u.channel) == Some(ChannelId(2))));

        manager.shutdown(false);
    }

    #[test]
    fn test_missing_channel_leaves_user() {
        let meta = Arc::new(MockMeta::with_servers(1));
        let server = meta.mock_server(ServerId(1)).unwrap();
        let mut manager = running(&meta, json!({ "all": { "channel": 9 } }));

        let user = server.connect_user("dee");
        let other = server.connect_user("eli");
        // The failed moves are logged and the module keeps running.
        thread::sleep(Duration::from_millis(100));
        assert_eq!(server.user(user.session).unwrap().channel, ChannelId(0));
        assert_eq!(server.user(other.session).unwrap().channel, ChannelId(0));
        assert!(manager.handle().list_modules().unwrap()[0].running);

        manager.shutdown(false);
    }
}
