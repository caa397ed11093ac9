// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Keeps a [`DeviceLink`] alive and its state fresh.
//!
//! The [`ConnectionSupervisor`] owns a link, connects it on
//! [`start`](ConnectionSupervisor::start), polls the device status on a fixed
//! interval and restores the connection whenever the link reports it lost.
//! Observers can follow along through a `watch` channel of state snapshots
//! or through the [`EventBus`](crate::event::EventBus).
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use mcintosh_lib::{ConnectionSupervisor, LinkConfig, SupervisorConfig};
//!
//! # async fn example() -> mcintosh_lib::Result<()> {
//! let config = SupervisorConfig::new(LinkConfig::new("192.168.1.60"))
//!     .with_poll_interval(Duration::from_secs(60));
//! let supervisor = ConnectionSupervisor::new(config);
//!
//! let mut states = supervisor.watch_state();
//! if let Err(e) = supervisor.start().await {
//!     // Not fatal: the supervisor keeps trying in the background.
//!     eprintln!("device not reachable yet: {e}");
//! }
//!
//! states.changed().await.ok();
//! println!("volume: {}", states.borrow().volume());
//!
//! supervisor.link().set_volume(40).await?;
//! supervisor.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod supervisor_state;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SupervisorConfig;
use crate::error::Error;
use crate::event::{EventBus, SupervisorEvent};
use crate::link::DeviceLink;
use crate::state::DeviceState;
use crate::subscription::{Subscribable, SubscriptionId};

pub use supervisor_state::SupervisorState;

/// Bookkeeping for the single reconnect loop.
#[derive(Default)]
struct ReconnectSlot {
    active: bool,
    task: Option<JoinHandle<()>>,
}

struct SupervisorInner {
    config: SupervisorConfig,
    link: DeviceLink,
    subscription: SubscriptionId,
    state: RwLock<SupervisorState>,
    started: AtomicBool,
    should_reconnect: AtomicBool,
    reconnect: Mutex<ReconnectSlot>,
    loops_started: AtomicU64,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    events: EventBus,
    state_tx: watch::Sender<DeviceState>,
    was_connected: AtomicBool,
    last_refresh: RwLock<Option<DateTime<Utc>>>,
}

impl SupervisorInner {
    fn supervisor_state(&self) -> SupervisorState {
        *self.state.read()
    }

    /// Moves to `next` unless already shut down.
    fn set_state(&self, next: SupervisorState) {
        let mut state = self.state.write();
        if !state.is_terminal() {
            *state = next;
        }
    }

    /// Reacts to the link's change notification.
    ///
    /// Runs on whichever task fired the notification, so it only updates
    /// flags, publishes and spawns.
    fn handle_notification(self: &Arc<Self>) {
        if self.supervisor_state().is_terminal() {
            return;
        }

        let connected = self.link.is_connected();
        if self.was_connected.swap(connected, Ordering::SeqCst) != connected {
            self.events.publish(SupervisorEvent::ConnectionChanged { connected });
        }

        if connected {
            let snapshot = self.link.state();
            self.state_tx.send_replace(snapshot.clone());
            self.events.publish(SupervisorEvent::state_updated(snapshot));
        } else {
            self.schedule_reconnect();
        }
    }

    /// Starts the reconnect loop unless one is already running.
    fn schedule_reconnect(self: &Arc<Self>) {
        if !self.config.reconnection().enabled {
            tracing::debug!("Automatic reconnection disabled");
            return;
        }

        let mut slot = self.reconnect.lock();
        if slot.active || !self.should_reconnect.load(Ordering::SeqCst) {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            tracing::error!("No tokio runtime available, cannot reconnect");
            return;
        };

        slot.active = true;
        self.loops_started.fetch_add(1, Ordering::SeqCst);
        self.set_state(SupervisorState::Reconnecting);
        tracing::warn!(
            address = %self.config.link().address(),
            "Connection lost, will attempt to reconnect"
        );
        self.events.publish(SupervisorEvent::ReconnectStarted);

        let inner = Arc::clone(self);
        slot.task = Some(runtime.spawn(inner.reconnect_loop()));
    }

    async fn reconnect_loop(self: Arc<Self>) {
        let policy = self.config.reconnection().clone();
        let mut attempts: u32 = 0;

        loop {
            let delay = policy.delay_for_attempt(attempts);
            tracing::info!(
                address = %self.config.link().address(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Attempting to reconnect"
            );

            tokio::select! {
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }

            attempts = attempts.saturating_add(1);
            let result = tokio::select! {
                () = self.shutdown.cancelled() => break,
                result = self.link.connect() => result,
            };

            match result {
                Ok(()) => {
                    tracing::info!(attempts, "Reconnected successfully");
                    self.events.publish(SupervisorEvent::Reconnected { attempts });
                    self.resync().await;

                    let mut slot = self.reconnect.lock();
                    if self.link.is_connected() || !self.should_reconnect.load(Ordering::SeqCst) {
                        slot.active = false;
                        return;
                    }
                    tracing::warn!("Connection lost again during resync");
                    self.set_state(SupervisorState::Reconnecting);
                }
                Err(e) => {
                    tracing::warn!(attempts, error = %e, "Reconnection attempt failed");
                }
            }
        }

        self.reconnect.lock().active = false;
    }

    /// Brings the snapshot up to date after a (re)connect.
    ///
    /// Polling resumes only if the link survived the query.
    async fn resync(&self) {
        if let Err(e) = self.link.query_status().await {
            tracing::warn!(error = %e, "Status query after connect failed");
        }
        self.link.notify();

        // Same lock `schedule_reconnect` takes before entering Reconnecting.
        let _slot = self.reconnect.lock();
        if self.link.is_connected() {
            self.set_state(SupervisorState::Polling);
        }
    }

    async fn refresh(&self) -> crate::Result<DeviceState> {
        if !self.link.is_connected() {
            return Err(self.update_failed("device is not connected"));
        }

        if let Err(e) = self.link.query_status().await {
            return Err(self.update_failed(format!("status query failed: {e}")));
        }

        *self.last_refresh.write() = Some(Utc::now());
        Ok(self.link.state())
    }

    fn update_failed(&self, reason: impl Into<String>) -> Error {
        let reason = reason.into();
        tracing::warn!(reason = %reason, "Update failed");
        self.events.publish(SupervisorEvent::update_failed(reason.clone()));
        Error::UpdateFailed(reason)
    }

    async fn poll_loop(self: Arc<Self>) {
        let period = self.config.poll_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // Failures are already logged and published.
            let _ = self.refresh().await;
        }
    }
}

impl Drop for SupervisorInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.link.unsubscribe(self.subscription);
    }
}

/// Supervises the connection to one preamplifier.
///
/// Create it with [`new`](Self::new), call [`start`](Self::start) once, and
/// [`shutdown`](Self::shutdown) when done. Commands go through
/// [`link`](Self::link).
pub struct ConnectionSupervisor {
    inner: Arc<SupervisorInner>,
}

impl ConnectionSupervisor {
    /// Creates an idle supervisor with its own link.
    #[must_use]
    pub fn new(config: SupervisorConfig) -> Self {
        let link = DeviceLink::new(config.link().clone());
        let (state_tx, _) = watch::channel(link.state());

        let inner = Arc::new_cyclic(|weak: &Weak<SupervisorInner>| {
            let weak = weak.clone();
            let subscription = link.on_change(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_notification();
                }
            });

            SupervisorInner {
                config,
                link,
                subscription,
                state: RwLock::new(SupervisorState::Idle),
                started: AtomicBool::new(false),
                should_reconnect: AtomicBool::new(false),
                reconnect: Mutex::new(ReconnectSlot::default()),
                loops_started: AtomicU64::new(0),
                poll_task: Mutex::new(None),
                shutdown: CancellationToken::new(),
                events: EventBus::new(),
                state_tx,
                was_connected: AtomicBool::new(false),
                last_refresh: RwLock::new(None),
            }
        });

        Self { inner }
    }

    /// Connects the link and starts polling.
    ///
    /// On success the device status is queried and the supervisor enters
    /// [`SupervisorState::Polling`]. If the first connect fails the
    /// supervisor enters [`SupervisorState::Reconnecting`] and keeps trying
    /// in the background. Calling `start` more than once does nothing.
    ///
    /// A zero poll interval disables the periodic poll; [`refresh`](Self::refresh)
    /// still works.
    ///
    /// # Errors
    ///
    /// Returns the initial connect error. The supervisor stays usable.
    pub async fn start(&self) -> crate::Result<()> {
        let state = self.inner.supervisor_state();
        if state.is_terminal() || self.inner.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(%state, "Supervisor already started");
            return Ok(());
        }

        self.inner.should_reconnect.store(true, Ordering::SeqCst);
        if self.inner.config.poll_interval().is_zero() {
            tracing::debug!("Poll interval is zero, periodic polling disabled");
        } else {
            let poll = tokio::spawn(Arc::clone(&self.inner).poll_loop());
            *self.inner.poll_task.lock() = Some(poll);
        }

        match self.inner.link.connect().await {
            Ok(()) => {
                self.inner.resync().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Initial connection failed");
                self.inner.schedule_reconnect();
                if !self.inner.config.reconnection().enabled {
                    self.inner.set_state(SupervisorState::Polling);
                }
                Err(e)
            }
        }
    }

    /// Runs one poll cycle now.
    ///
    /// Never reconnects; reconnection is driven by the link's notifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpdateFailed`] if the link is down or the status query
    /// could not be sent. The failure is also published as
    /// [`SupervisorEvent::UpdateFailed`].
    pub async fn refresh(&self) -> crate::Result<DeviceState> {
        self.inner.refresh().await
    }

    /// Stops everything and closes the link.
    ///
    /// Waits for the reconnect loop and the poll task to finish. Terminal:
    /// the supervisor cannot be started again.
    pub async fn shutdown(&self) {
        tracing::info!(address = %self.inner.config.link().address(), "Shutting down supervisor");

        let reconnect = {
            let mut slot = self.inner.reconnect.lock();
            self.inner.should_reconnect.store(false, Ordering::SeqCst);
            *self.inner.state.write() = SupervisorState::ShuttingDown;
            self.inner.shutdown.cancel();
            slot.task.take()
        };
        if let Some(task) = reconnect {
            // Cancellation is the expected outcome.
            let _ = task.await;
        }

        let poll = self.inner.poll_task.lock().take();
        if let Some(task) = poll {
            let _ = task.await;
        }

        self.inner.link.disconnect().await;
    }

    /// Returns the supervised link.
    #[must_use]
    pub fn link(&self) -> &DeviceLink {
        &self.inner.link
    }

    /// Returns the supervisor configuration.
    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Returns the current device state snapshot.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.inner.link.state()
    }

    /// Returns the supervisor's lifecycle state.
    #[must_use]
    pub fn supervisor_state(&self) -> SupervisorState {
        self.inner.supervisor_state()
    }

    /// Returns true if the link is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.link.is_connected()
    }

    /// Returns a receiver of state snapshots published while connected.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.inner.state_tx.subscribe()
    }

    /// Subscribes to supervisor events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.inner.events.subscribe()
    }

    /// Returns when the last successful refresh completed.
    #[must_use]
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_refresh.read()
    }

    /// Returns how many reconnect loops have been started so far.
    #[must_use]
    pub fn reconnect_loops_started(&self) -> u64 {
        self.inner.loops_started.load(Ordering::SeqCst)
    }

    /// Returns true while a reconnect loop is running.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.inner.reconnect.lock().active
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        self.inner.should_reconnect.store(false, Ordering::SeqCst);
        self.inner.shutdown.cancel();
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("link", &self.inner.link)
            .field("state", &self.inner.supervisor_state())
            .field("last_refresh", &self.last_refresh())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;
    use crate::config::{LinkConfig, ReconnectionPolicy};

    /// A port with nothing listening on it.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn config(port: u16, delay: Duration) -> SupervisorConfig {
        SupervisorConfig::new(LinkConfig::new("127.0.0.1").with_port(port))
            .with_poll_interval(Duration::from_secs(3600))
            .with_reconnection(ReconnectionPolicy::new().with_delay(delay))
    }

    fn drain(rx: &mut broadcast::Receiver<SupervisorEvent>) -> Vec<SupervisorEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn new_supervisor_is_idle() {
        let supervisor = ConnectionSupervisor::new(config(84, Duration::from_secs(5)));
        assert_eq!(supervisor.supervisor_state(), SupervisorState::Idle);
        assert!(!supervisor.is_connected());
        assert!(supervisor.last_refresh().is_none());
        assert_eq!(supervisor.reconnect_loops_started(), 0);
    }

    #[tokio::test]
    async fn notifications_before_start_do_not_reconnect() {
        let supervisor = ConnectionSupervisor::new(config(84, Duration::from_secs(5)));
        supervisor.link().notify();
        assert_eq!(supervisor.reconnect_loops_started(), 0);
        assert_eq!(supervisor.supervisor_state(), SupervisorState::Idle);
    }

    #[tokio::test]
    async fn failed_start_enters_reconnecting() {
        let port = closed_port().await;
        let supervisor = ConnectionSupervisor::new(config(port, Duration::from_secs(3600)));
        let mut events = supervisor.subscribe();

        assert!(supervisor.start().await.is_err());
        assert_eq!(supervisor.supervisor_state(), SupervisorState::Reconnecting);
        assert!(supervisor.is_reconnecting());
        assert_eq!(drain(&mut events), vec![SupervisorEvent::ReconnectStarted]);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn repeated_disconnect_notifications_start_one_loop() {
        let port = closed_port().await;
        let supervisor = ConnectionSupervisor::new(config(port, Duration::from_secs(3600)));
        let mut events = supervisor.subscribe();
        let _ = supervisor.start().await;

        for _ in 0..5 {
            supervisor.link().notify();
        }

        assert_eq!(supervisor.reconnect_loops_started(), 1);
        let started = drain(&mut events)
            .into_iter()
            .filter(|e| *e == SupervisorEvent::ReconnectStarted)
            .count();
        assert_eq!(started, 1);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn refresh_while_disconnected_fails_without_reconnecting() {
        let supervisor = ConnectionSupervisor::new(config(84, Duration::from_secs(5)));
        let mut events = supervisor.subscribe();

        let err = supervisor.refresh().await.unwrap_err();
        assert!(matches!(err, Error::UpdateFailed(_)));
        assert!(matches!(
            events.try_recv(),
            Ok(SupervisorEvent::UpdateFailed { .. })
        ));
        assert_eq!(supervisor.reconnect_loops_started(), 0);
        assert!(supervisor.last_refresh().is_none());
    }

    #[tokio::test]
    async fn shutdown_is_terminal() {
        let port = closed_port().await;
        let supervisor = ConnectionSupervisor::new(config(port, Duration::from_secs(3600)));
        let _ = supervisor.start().await;

        supervisor.shutdown().await;
        assert_eq!(supervisor.supervisor_state(), SupervisorState::ShuttingDown);
        assert!(!supervisor.is_reconnecting());

        assert!(supervisor.start().await.is_ok());
        assert_eq!(supervisor.supervisor_state(), SupervisorState::ShuttingDown);

        supervisor.link().notify();
        assert_eq!(supervisor.reconnect_loops_started(), 1);
    }

    #[tokio::test]
    async fn disabled_reconnection_never_loops() {
        let port = closed_port().await;
        let config = config(port, Duration::from_millis(10))
            .with_reconnection(ReconnectionPolicy::disabled());
        let supervisor = ConnectionSupervisor::new(config);

        assert!(supervisor.start().await.is_err());
        assert_eq!(supervisor.reconnect_loops_started(), 0);
        assert_eq!(supervisor.supervisor_state(), SupervisorState::Polling);

        supervisor.shutdown().await;
    }

    /// Accepts connections, holds them open and never replies.
    async fn silent_listener() -> (u16, Arc<AtomicU64>, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&accepted);
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });
        (port, accepted, task)
    }

    #[tokio::test]
    async fn zero_poll_interval_disables_periodic_polling() {
        let (port, _accepted, server) = silent_listener().await;
        let config = SupervisorConfig::from_json(&format!(
            r#"{{"host": "127.0.0.1", "port": {port}, "poll_interval": 0}}"#
        ))
        .unwrap();
        let supervisor = ConnectionSupervisor::new(config);

        supervisor.start().await.unwrap();
        assert!(supervisor.inner.poll_task.lock().is_none());
        assert_eq!(supervisor.supervisor_state(), SupervisorState::Polling);

        supervisor.refresh().await.unwrap();
        assert!(supervisor.last_refresh().is_some());

        supervisor.shutdown().await;
        server.abort();
    }

    #[tokio::test]
    async fn polling_is_entered_after_the_resync_notification() {
        let (port, _accepted, server) = silent_listener().await;
        let supervisor = ConnectionSupervisor::new(config(port, Duration::from_secs(3600)));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&supervisor.inner);
        let record = Arc::clone(&seen);
        supervisor.link().on_change(move || {
            if let Some(inner) = weak.upgrade() {
                if inner.link.is_connected() {
                    record.lock().push(inner.supervisor_state());
                }
            }
        });

        supervisor.start().await.unwrap();
        assert_eq!(*seen.lock(), vec![SupervisorState::Idle]);
        assert_eq!(supervisor.supervisor_state(), SupervisorState::Polling);

        supervisor.shutdown().await;
        server.abort();
    }

    #[tokio::test]
    async fn connection_lost_during_resync_keeps_one_loop() {
        let (port, accepted, server) = silent_listener().await;
        let supervisor = ConnectionSupervisor::new(config(port, Duration::from_millis(10)));

        // Drop the first two connections as soon as their resync notifies.
        let drops = Arc::new(AtomicU64::new(0));
        let observer = supervisor.link().clone();
        let counter = Arc::clone(&drops);
        supervisor.link().on_change(move || {
            if observer.is_connected() && counter.load(Ordering::SeqCst) < 2 {
                counter.fetch_add(1, Ordering::SeqCst);
                observer.force_disconnect();
            }
        });

        supervisor.start().await.unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !(supervisor.is_connected()
            && !supervisor.is_reconnecting()
            && accepted.load(Ordering::SeqCst) == 3)
        {
            assert!(Instant::now() < deadline, "link was not restored");
            assert_eq!(supervisor.reconnect_loops_started(), 1);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(drops.load(Ordering::SeqCst), 2);
        assert_eq!(supervisor.reconnect_loops_started(), 1);
        assert_eq!(supervisor.supervisor_state(), SupervisorState::Polling);

        supervisor.shutdown().await;
        server.abort();
    }
}
