//! Subscription registry: which module handlers receive which server's events.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use mumo_core::types::{HandlerKey, MailboxId, ServerId, ServerScope};

use crate::module::ModuleMailbox;

/// Callback category a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Server lifecycle callbacks.
    Meta,
    /// Per-server state callbacks.
    Server,
    /// Server-wide context action callbacks.
    Context,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta => write!(f, "meta"),
            Self::Server => write!(f, "server"),
            Self::Context => write!(f, "context"),
        }
    }
}

/// Handlers one mailbox registered under one scope.
#[derive(Debug)]
struct Entry {
    /// Where to deliver.
    mailbox: ModuleMailbox,
    /// Registered handlers, without duplicates.
    keys: Vec<HandlerKey>,
}

/// One row of [`SubscriptionRegistry::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Scope the handler is registered under.
    pub scope: ServerScope,
    /// Name of the subscribing module.
    pub module: String,
    /// Registered handler.
    pub key: HandlerKey,
}

/// Registry of one callback category.
///
/// Maps a scope to the handlers each mailbox registered for it. A
/// (scope, mailbox) pair never holds the same handler twice.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// Scope → mailbox → handlers.
    entries: HashMap<ServerScope, HashMap<MailboxId, Entry>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` on `mailbox` for every scope. Returns how many
    /// registrations were new.
    pub fn add(&mut self, mailbox: &ModuleMailbox, key: &HandlerKey, scopes: &[ServerScope]) -> usize {
        let mut added = 0;
        for scope in scopes {
            let entry = self
                .entries
                .entry(*scope)
                .or_default()
                .entry(mailbox.id())
                .or_insert_with(|| Entry {
                    mailbox: mailbox.clone(),
                    keys: Vec::new(),
                });
            if !entry.keys.contains(key) {
                entry.keys.push(key.clone());
                added += 1;
            }
        }
        added
    }

    /// Removes `key` of `mailbox` from every scope. Absent registrations are
    /// ignored. Returns how many registrations were removed.
    pub fn remove(&mut self, mailbox: MailboxId, key: &HandlerKey, scopes: &[ServerScope]) -> usize {
        let mut removed = 0;
        for scope in scopes {
            let Some(by_mailbox) = self.entries.get_mut(scope) else {
                continue;
            };
            if let Some(entry) = by_mailbox.get_mut(&mailbox) {
                let before = entry.keys.len();
                entry.keys.retain(|k| k != key);
                removed += before - entry.keys.len();
                if entry.keys.is_empty() {
                    by_mailbox.remove(&mailbox);
                }
            }
            if by_mailbox.is_empty() {
                self.entries.remove(scope);
            }
        }
        removed
    }

    /// Removes `key` of `mailbox` under every scope it is registered in.
    pub fn remove_key(&mut self, mailbox: MailboxId, key: &HandlerKey) -> usize {
        let scopes: Vec<ServerScope> = self.entries.keys().copied().collect();
        self.remove(mailbox, key, &scopes)
    }

    /// Removes every registration of `mailbox`.
    pub fn remove_mailbox(&mut self, mailbox: MailboxId) -> usize {
        let mut removed = 0;
        for by_mailbox in self.entries.values_mut() {
            if let Some(entry) = by_mailbox.remove(&mailbox) {
                removed += entry.keys.len();
            }
        }
        self.entries.retain(|_, by_mailbox| !by_mailbox.is_empty());
        removed
    }

    /// Handlers to notify for an event on `server`: the registrations for
    /// that server plus the wildcard ones, each (mailbox, handler) once.
    pub fn subscribers(&self, server: ServerId) -> Vec<(ModuleMailbox, HandlerKey)> {
        let mut seen: HashSet<(MailboxId, HandlerKey)> = HashSet::new();
        let mut found = Vec::new();

        for scope in [ServerScope::Server(server), ServerScope::All] {
            let Some(by_mailbox) = self.entries.get(&scope) else {
                continue;
            };
            for (id, entry) in by_mailbox {
                for key in &entry.keys {
                    if seen.insert((*id, key.clone())) {
                        found.push((entry.mailbox.clone(), key.clone()));
                    }
                }
            }
        }
        found
    }

    /// Whether `key` of `mailbox` is registered under exactly `scope`.
    pub fn contains(&self, mailbox: MailboxId, key: &HandlerKey, scope: ServerScope) -> bool {
        self.entries
            .get(&scope)
            .and_then(|by_mailbox| by_mailbox.get(&mailbox))
            .is_some_and(|entry| entry.keys.contains(key))
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|by_mailbox| by_mailbox.values())
            .map(|entry| entry.keys.len())
            .sum()
    }

    /// Whether there are no registrations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registrations, sorted by module name, scope and key.
    pub fn snapshot(&self) -> Vec<Subscription> {
        let mut rows: Vec<Subscription> = self
            .entries
            .iter()
            .flat_map(|(scope, by_mailbox)| {
                by_mailbox.values().flat_map(move |entry| {
                    entry.keys.iter().map(move |key| Subscription {
                        scope: *scope,
                        module: entry.mailbox.name().to_string(),
                        key: key.clone(),
                    })
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            (a.module.as_str(), scope_order(a.scope), &a.key)
                .cmp(&(b.module.as_str(), scope_order(b.scope), &b.key))
        });
        rows
    }
}

fn scope_order(scope: ServerScope) -> (u8, i32) {
    match scope {
        ServerScope::All => (0, 0),
        ServerScope::Server(id) => (1, id.get()),
    }
}

#[cfg(test)]
mod tests {
    use mumo_worker::Mailbox;

    use super::*;

    fn keys(found: &[(ModuleMailbox, HandlerKey)]) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = found
            .iter()
            .map(|(m, k)| (m.name().to_string(), k.to_string()))
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = SubscriptionRegistry::new();
        let mailbox: ModuleMailbox = Mailbox::new("alpha");
        let scope = [ServerScope::Server(ServerId(1))];

        assert_eq!(registry.add(&mailbox, &HandlerKey::module(), &scope), 1);
        assert_eq!(registry.add(&mailbox, &HandlerKey::module(), &scope), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut registry = SubscriptionRegistry::new();
        let mailbox: ModuleMailbox = Mailbox::new("alpha");
        let scope = [ServerScope::Server(ServerId(1))];

        assert_eq!(registry.remove(mailbox.id(), &HandlerKey::module(), &scope), 0);
        registry.add(&mailbox, &HandlerKey::module(), &scope);
        assert_eq!(registry.remove(mailbox.id(), &HandlerKey::module(), &scope), 1);
        assert_eq!(registry.remove(mailbox.id(), &HandlerKey::module(), &scope), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_subscribers_union_exact_and_wildcard() {
        let mut registry = SubscriptionRegistry::new();
        let exact: ModuleMailbox = Mailbox::new("exact");
        let wildcard: ModuleMailbox = Mailbox::new("wildcard");
        let other: ModuleMailbox = Mailbox::new("other");
        let key = HandlerKey::module();

        registry.add(&exact, &key, &[ServerScope::Server(ServerId(7))]);
        registry.add(&wildcard, &key, ServerScope::ALL);
        registry.add(&other, &key, &[ServerScope::Server(ServerId(8))]);

        assert_eq!(
            keys(&registry.subscribers(ServerId(7))),
            vec![
                ("exact".to_string(), "module".to_string()),
                ("wildcard".to_string(), "module".to_string())
            ]
        );
        assert_eq!(
            keys(&registry.subscribers(ServerId(9))),
            vec![("wildcard".to_string(), "module".to_string())]
        );
    }

    #[test]
    fn test_wildcard_and_exact_deliver_once() {
        let mut registry = SubscriptionRegistry::new();
        let mailbox: ModuleMailbox = Mailbox::new("both");
        let key = HandlerKey::module();

        registry.add(&mailbox, &key, &[ServerScope::All, ServerScope::Server(ServerId(3))]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.subscribers(ServerId(3)).len(), 1);
    }

    #[test]
    fn test_distinct_handlers_of_one_mailbox() {
        let mut registry = SubscriptionRegistry::new();
        let mailbox: ModuleMailbox = Mailbox::new("multi");

        registry.add(&mailbox, &HandlerKey::new("a"), ServerScope::ALL);
        registry.add(&mailbox, &HandlerKey::new("b"), ServerScope::ALL);
        assert_eq!(registry.subscribers(ServerId(1)).len(), 2);

        assert_eq!(registry.remove_mailbox(mailbox.id()), 2);
        assert!(registry.subscribers(ServerId(1)).is_empty());
    }

    #[test]
    fn test_remove_key_across_scopes() {
        let mut registry = SubscriptionRegistry::new();
        let mailbox: ModuleMailbox = Mailbox::new("scoped");
        let keep = HandlerKey::new("keep");
        let drop = HandlerKey::new("drop");

        registry.add(&mailbox, &drop, &[ServerScope::All, ServerScope::Server(ServerId(2))]);
        registry.add(&mailbox, &keep, &[ServerScope::Server(ServerId(2))]);

        assert_eq!(registry.remove_key(mailbox.id(), &drop), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(mailbox.id(), &keep, ServerScope::Server(ServerId(2))));
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let mut registry = SubscriptionRegistry::new();
        let b: ModuleMailbox = Mailbox::new("b");
        let a: ModuleMailbox = Mailbox::new("a");
        registry.add(&b, &HandlerKey::module(), &[ServerScope::Server(ServerId(2))]);
        registry.add(&a, &HandlerKey::module(), &[ServerScope::Server(ServerId(2)), ServerScope::All]);

        let rows = registry.snapshot();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].module, "a");
        assert_eq!(rows[0].scope, ServerScope::All);
        assert_eq!(rows[2].module, "b");
        assert!(registry.contains(a.id(), &HandlerKey::module(), ServerScope::All));
    }
}
