//! Callback category traits.
//!
//! A module opts into a category by returning a handler from the matching
//! `Module::*_handler` method. Every callback defaults to doing nothing, so
//! implementors only write the ones they care about.

use std::sync::Arc;

use mumo_core::result::AppResult;
use mumo_core::types::{ActionId, ChannelId, SessionId};
use mumo_transport::{Channel, ContextTarget, ServerProxy, TextMessage, User};

use crate::remote::ModuleRemote;

/// Virtual server lifecycle callbacks.
#[allow(unused_variables)]
pub trait MetaCallbacks {
    /// `server` was started.
    fn started(&mut self, remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>) -> AppResult<()> {
        Ok(())
    }

    /// `server` was stopped.
    fn stopped(&mut self, remote: &mut ModuleRemote, server: &Arc<dyn ServerProxy>) -> AppResult<()> {
        Ok(())
    }
}

/// Per-server state change callbacks.
#[allow(unused_variables)]
pub trait ServerCallbacks {
    /// A user connected.
    fn user_connected(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        Ok(())
    }

    /// A user disconnected.
    fn user_disconnected(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        Ok(())
    }

    /// A user's state changed.
    fn user_state_changed(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
    ) -> AppResult<()> {
        Ok(())
    }

    /// A user sent a text message.
    fn user_text_message(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        user: &User,
        message: &TextMessage,
    ) -> AppResult<()> {
        Ok(())
    }

    /// A channel was created.
    fn channel_created(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        channel: &Channel,
    ) -> AppResult<()> {
        Ok(())
    }

    /// A channel was removed.
    fn channel_removed(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        channel: &Channel,
    ) -> AppResult<()> {
        Ok(())
    }

    /// A channel's state changed.
    fn channel_state_changed(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        channel: &Channel,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Server-wide context action callbacks.
#[allow(unused_variables)]
pub trait ContextCallbacks {
    /// `user` invoked `action`.
    fn context_action(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        action: &ActionId,
        user: &User,
        session: Option<SessionId>,
        channel: Option<ChannelId>,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Receives the context menu entries a module registered through
/// [`ModuleRemote::add_context_menu_entry`].
#[allow(unused_variables)]
pub trait ContextMenuHandler {
    /// `user` used the entry `action` on `target`.
    fn on_action(
        &mut self,
        remote: &mut ModuleRemote,
        server: &Arc<dyn ServerProxy>,
        action: &ActionId,
        user: &User,
        target: &ContextTarget,
    ) -> AppResult<()> {
        Ok(())
    }
}
