//! Connection supervisor: attaches listeners to the voice server and keeps
//! checking that it is still the same process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use mumo_core::config::MurmurConfig;
use mumo_transport::{MetaProxy, TransportError, TransportResult};

use crate::bridge::forwarders::{MetaForwarder, ServerForwarder};
use crate::manager::ManagerHandle;

/// Allowed drift, in seconds, between the expected and the reported uptime.
const UPTIME_SLACK: u64 = 5;

/// Attaches the transport listeners and announces connectivity changes.
pub struct ConnectionSupervisor {
    meta: Arc<dyn MetaProxy>,
    manager: ManagerHandle,
    murmur: MurmurConfig,
    watchdog: Duration,
    connected: Arc<AtomicBool>,
}

impl ConnectionSupervisor {
    /// A supervisor for `meta`. A zero `watchdog` disables the watchdog.
    pub fn new(
        meta: Arc<dyn MetaProxy>,
        manager: ManagerHandle,
        murmur: MurmurConfig,
        watchdog: Duration,
    ) -> Self {
        Self {
            meta,
            manager,
            murmur,
            watchdog,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the last attachment succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Attach the meta listener and a server listener to every booted
    /// server that passes the server filter.
    ///
    /// On success every module is told the connection is up. On failure
    /// they are told it is down, once per lost connection.
    pub fn attach_callbacks(&self) -> bool {
        debug!("Attaching callbacks");
        match self.attach() {
            Ok(()) => {
                self.connected.store(true, Ordering::SeqCst);
                self.manager.announce_connected(Arc::clone(&self.meta));
                true
            }
            Err(e) => {
                match &e {
                    TransportError::ConnectionRefused(_) => error!(error = %e, "Server refused connection"),
                    TransportError::InvalidSecret => error!("Invalid secret"),
                    _ => error!(error = %e, "Failed to attach callbacks"),
                }
                if self.connected.swap(false, Ordering::SeqCst) {
                    self.manager.announce_disconnected();
                }
                false
            }
        }
    }

    fn attach(&self) -> TransportResult<()> {
        info!("Attaching meta callback");
        self.meta.add_callback(Arc::new(MetaForwarder::new(
            self.manager.clone(),
            self.murmur.clone(),
            Arc::clone(&self.connected),
        )))?;

        for server in self.meta.booted_servers()? {
            let server_id = server.id();
            if self.murmur.includes(server_id) {
                info!(server_id = %server_id, "Setting callbacks for virtual server");
                server.add_callback(Arc::new(ServerForwarder::new(
                    self.manager.clone(),
                    Arc::clone(&server),
                )))?;
            }
        }
        Ok(())
    }

    /// One watchdog round. `previous` is the uptime seen last round.
    ///
    /// Returns the uptime to compare against next round.
    pub fn check_connection(&self, previous: Option<u64>) -> Option<u64> {
        match self.meta.uptime() {
            Ok(uptime) => {
                if let Some(previous) = previous {
                    let expected = previous + self.watchdog.as_secs();
                    let drift_ok = uptime.saturating_sub(UPTIME_SLACK) <= expected
                        && expected <= uptime + UPTIME_SLACK;
                    if !drift_ok {
                        info!(previous, uptime, "Voice server restarted, re-attaching callbacks");
                        self.attach_callbacks();
                    }
                }
                Some(uptime)
            }
            Err(e) => {
                error!(
                    "Connection to server lost, will try to reestablish callbacks in next watchdog run ({}s)",
                    self.watchdog.as_secs()
                );
                debug!(error = %e, "Uptime poll failed");
                self.attach_callbacks();
                previous
            }
        }
    }

    /// Run [`ConnectionSupervisor::check_connection`] every watchdog period
    /// until `cancel` turns `true`.
    pub fn spawn_watchdog(self: Arc<Self>, mut cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if self.watchdog.is_zero() {
                info!("Connection watchdog disabled");
                return;
            }
            info!("Connection watchdog started, interval={}s", self.watchdog.as_secs());

            let mut interval = time::interval(self.watchdog);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            let mut uptime = None;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let supervisor = Arc::clone(&self);
                        match tokio::task::spawn_blocking(move || supervisor.check_connection(uptime)).await {
                            Ok(next) => uptime = next,
                            Err(e) => error!(error = %e, "Watchdog check failed"),
                        }
                    }
                    changed = cancel.changed() => {
                        if changed.is_err() || *cancel.borrow() {
                            info!("Connection watchdog shutting down");
                            break;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use mumo_core::config::ModulesConfig;
    use mumo_core::types::ServerId;
    use mumo_transport::mock::MockMeta;

    use super::*;
    use crate::catalog::ModuleCatalog;
    use crate::manager::Manager;

    fn supervisor(meta: Arc<MockMeta>, murmur: MurmurConfig) -> (Manager, ConnectionSupervisor) {
        let mut manager = Manager::new(ModulesConfig::default(), ModuleCatalog::new());
        manager.start().unwrap();
        let supervisor = ConnectionSupervisor::new(meta, manager.handle(), murmur, Duration::from_secs(30));
        (manager, supervisor)
    }

    #[test]
    fn test_attach_respects_server_filter() {
        let meta = Arc::new(MockMeta::with_servers(3));
        let murmur = MurmurConfig {
            servers: vec![ServerId(2)],
        };
        let (mut manager, supervisor) = supervisor(Arc::clone(&meta), murmur);

        assert!(supervisor.attach_callbacks());
        assert!(supervisor.is_connected());
        assert_eq!(meta.listener_count(), 1);
        assert_eq!(meta.mock_server(ServerId(1)).unwrap().listener_count(), 0);
        assert_eq!(meta.mock_server(ServerId(2)).unwrap().listener_count(), 1);
        assert!(manager.handle().meta().unwrap().is_some());

        manager.shutdown(false);
    }

    #[test]
    fn test_unreachable_server_announces_disconnect_once() {
        let meta = Arc::new(MockMeta::with_servers(1));
        let (mut manager, supervisor) = supervisor(Arc::clone(&meta), MurmurConfig::default());

        assert!(supervisor.attach_callbacks());
        meta.set_reachable(false);
        assert!(!supervisor.attach_callbacks());
        assert!(!supervisor.is_connected());
        // The manager processes its queue in order, so the query sees the
        // disconnect announced before it.
        assert!(manager.handle().meta().unwrap().is_none());

        manager.shutdown(false);
    }

    #[test]
    fn test_restart_detected_by_uptime_jump() {
        let meta = Arc::new(MockMeta::with_servers(1));
        let (mut manager, supervisor) = supervisor(Arc::clone(&meta), MurmurConfig::default());
        assert!(supervisor.attach_callbacks());

        // Uptime advanced by one watchdog period: same process.
        meta.set_uptime(Some(130));
        assert_eq!(supervisor.check_connection(Some(100)), Some(130));
        assert_eq!(meta.listener_count(), 1);

        // Uptime went backwards: the process restarted and lost its listeners.
        meta.restart();
        meta.set_uptime(Some(3));
        assert_eq!(supervisor.check_connection(Some(130)), Some(3));
        assert_eq!(meta.listener_count(), 1);

        manager.shutdown(false);
    }

    #[test]
    fn test_failed_poll_keeps_previous_uptime() {
        let meta = Arc::new(MockMeta::with_servers(1));
        let (mut manager, supervisor) = supervisor(Arc::clone(&meta), MurmurConfig::default());
        assert!(supervisor.attach_callbacks());

        meta.set_reachable(false);
        assert_eq!(supervisor.check_connection(Some(42)), Some(42));
        assert!(!supervisor.is_connected());

        manager.shutdown(false);
    }

    #[tokio::test]
    async fn test_watchdog_stops_on_cancel() {
        let meta = Arc::new(MockMeta::with_servers(1));
        let (mut manager, supervisor) = supervisor(Arc::clone(&meta), MurmurConfig::default());
        let (tx, rx) = watch::channel(false);

        let task = Arc::new(supervisor).spawn_watchdog(rx);
        tx.send(true).unwrap();
        time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        manager.shutdown(false);
    }
}
