//! Adds three entries to the context menu of every connecting user:
//! "Poke" messages the target, "Info" shows what was clicked and
//! "Remove" drops its own entry from every user on the server.
//!
//! Entries are only added on connect, so users already online when the
//! module starts get them after reconnecting.

use serde::Deserialize;
use tracing::{debug, info};

use mumo_core::config::de::comma_separated;
use mumo_plugin::prelude::*;

#[derive(Debug, Default, Deserialize)]
struct SampleContextSection {
    #[serde(default, deserialize_with = "comma_separated")]
    servers: Vec<ServerId>,
}

/// The samplecontext module.
pub struct SampleContext {
    servers: Vec<ServerId>,
    poke: ActionId,
    info: ActionId,
    remove: ActionId,
}

/// Factory registered as `samplecontext`.
pub fn create(_name: &str, remote: &mut ModuleRemote, config: ModuleConfig) -> AppResult<Box<dyn Module>> {
    let section: SampleContextSection = config.section("samplecontext")?;
    Ok(Box::new(SampleContext {
        servers: section.servers,
        poke: remote.unique_action(),
        info: remote.unique_action(),
        remove: remote.unique_action(),
    }))
}

fn menu_key() -> HandlerKey {
    HandlerKey::new("menu")
}

/// Escape text for the HTML subset clients render in messages.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

impl SampleContext {
    fn on_poke(&self, server: &Arc<dyn ServerProxy>, user: &User, target: &ContextTarget) -> AppResult<()> {
        let ContextTarget::User(target) = target else {
            debug!("Poke without a user target, ignoring");
            return Ok(());
        };
        info!("{} poked {}", user.name, target.name);
        server.send_message(target.session, &format!("{} poked you", escape(&user.name)))?;
        Ok(())
    }

    fn on_info(&self, server: &Arc<dyn ServerProxy>, user: &User, target: &ContextTarget) -> AppResult<()> {
        info!("{} wants info on {}", user.name, target);
        server.send_message(
            user.session,
            &format!("<small><pre>{}</pre></small>", escape(&target.to_string())),
        )?;
        Ok(())
    }
}

impl Module for SampleContext {
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

    fn menu_handler(&mut self, key: &HandlerKey) -> Option<&mut dyn ContextMenuHandler> {
        (*key == menu_key()).then_some(self as &mut dyn ContextMenuHandler)
    }
}

impl ServerCallbacks for SampleContext {
    fn user_connected(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        info!(module = %remote.name(), "Adding menu entries for {}", user.name);

        let entries = [
            (&self.poke, "Poke", ContextMask::USER),
            (&self.info, "Info", ContextMask::USER | ContextMask::CHANNEL),
            (
                &self.remove,
                "Remove this entry from everyone",
                ContextMask::USER | ContextMask::CHANNEL | ContextMask::SERVER,
            ),
        ];
        for (action, text, mask) in entries {
            remote.add_context_menu_entry(server, user, action, text, menu_key(), mask)?;
        }
        Ok(())
    }
}

impl ContextMenuHandler for SampleContext {
    fn on_action(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        action: &ActionId,
        user: &User,
        target: &ContextTarget,
    ) -> AppResult<()> {
        if *action == self.poke {
            self.on_poke(server, user, target)
        } else if *action == self.info {
            self.on_info(server, user, target)
        } else if *action == self.remove {
            info!(module = %remote.name(), "{} triggered removal", user.name);
            remote.remove_context_menu_entry(server.id(), action)
        } else {
            debug!(module = %remote.name(), action = %action, "Unknown menu action");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use serde_json::json;

    use mumo_core::config::{ModulesConfig, MurmurConfig};
    use mumo_plugin::{Category, ConnectionSupervisor, Manager};
    use mumo_transport::mock::{MockMeta, MockServer};

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

    fn running() -> (Manager, Arc<MockServer>) {
        let meta = Arc::new(MockMeta::with_servers(1));
        let server = meta.mock_server(ServerId(1)).unwrap();

        let mut manager = Manager::new(ModulesConfig::default(), ModuleCatalog::new());
        manager.start().unwrap();
        let handle = manager.handle();
        handle
            .load_module_with("samplecontext", create, ModuleConfig::from_json(json!({})).unwrap())
            .unwrap();
        handle.start_modules(None).unwrap();

        let supervisor = ConnectionSupervisor::new(
            meta as Arc<dyn MetaProxy>,
            handle.clone(),
            MurmurConfig::default(),
            Duration::ZERO,
        );
        assert!(supervisor.attach_callbacks());
        assert!(wait_for(|| {
            handle
                .list_subscriptions(Category::Server)
                .map(|subs| !subs.is_empty())
                .unwrap_or(false)
        }));
        (manager, server)
    }

    /// The action whose entry carries `text`.
    fn action(server: &MockServer, session: SessionId, text: &str) -> ActionId {
        server
            .menu_actions(session)
            .into_iter()
            .find(|a| server.menu_entry(session, a).map(|e| e.text) == Some(text.to_string()))
            .unwrap()
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    }

    #[test]
    fn test_entries_poke_and_remove() {
        let (mut manager, server) = running();
        let fred = server.connect_user("fred");
        let gina = server.connect_user("gina");
        assert!(wait_for(|| server.menu_actions(gina.session).len() == 3));
        assert_eq!(server.menu_actions(fred.session).len(), 3);

        let poke = action(&server, fred.session, "Poke");
        assert!(server.invoke_context(fred.session, &poke, Some(gina.session), None));
        assert!(wait_for(|| {
            server.sent_messages().contains(&(gina.session, "fred poked you".to_string()))
        }));

        let info = action(&server, gina.session, "Info");
        assert!(server.invoke_context(gina.session, &info, None, None));
        assert!(wait_for(|| {
            server
                .sent_messages()
                .contains(&(gina.session, "<small><pre>server</pre></small>".to_string()))
        }));

        let remove = action(&server, gina.session, "Remove this entry from everyone");
        assert!(server.invoke_context(gina.session, &remove, None, None));
        assert!(wait_for(|| server.menu_actions(fred.session).len() == 2));
        assert_eq!(server.menu_actions(gina.session).len(), 2);
        assert!(!server.menu_actions(fred.session).contains(&remove));

        manager.shutdown(false);
    }
}
