// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TCP link to a single preamplifier.
//!
//! A [`DeviceLink`] owns one persistent connection. Outgoing commands are
//! framed and written under an async mutex so concurrent callers never
//! interleave bytes on the wire. A background reader decodes every reply the
//! device sends, whether solicited or not, applies it to the local state
//! snapshot and fires the change notification.
//!
//! The link never reconnects on its own. When the stream fails it marks
//! itself disconnected and notifies subscribers; recovery is the job of
//! [`ConnectionSupervisor`](crate::supervisor::ConnectionSupervisor).
//!
//! # Examples
//!
//! ```no_run
//! use mcintosh_lib::{DeviceLink, LinkConfig};
//! use mcintosh_lib::subscription::Subscribable;
//!
//! # async fn example() -> mcintosh_lib::Result<()> {
//! let link = DeviceLink::new(LinkConfig::new("192.168.1.60"));
//!
//! let observer = link.clone();
//! link.on_change(move || {
//!     println!("volume is now {}", observer.volume());
//! });
//!
//! link.connect().await?;
//! link.query_status().await?;
//! link.set_volume(35).await?;
//! link.select_source("USB").await?;
//! link.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod connection_state;
mod reader;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::{Command, InputCommand, MuteCommand, PowerCommand, VolumeCommand};
use crate::config::LinkConfig;
use crate::error::{Error, ParseError, ProtocolError, ValueError};
use crate::protocol::Reply;
use crate::state::{DeviceState, StateChange};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::Volume;

pub use connection_state::ConnectionState;

/// Default overall bound for [`DeviceLink::test_connection`].
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Handle on the running reader task of one connection.
struct ReaderHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct LinkInner {
    config: LinkConfig,
    state: RwLock<DeviceState>,
    connection: RwLock<ConnectionState>,
    /// Incremented on every successful connect.
    generation: AtomicU64,
    writer: tokio::sync::Mutex<Option<BoxedWriter>>,
    reader: parking_lot::Mutex<Option<ReaderHandle>>,
    /// Serializes connect and disconnect.
    lifecycle: tokio::sync::Mutex<()>,
    callbacks: CallbackRegistry,
}

impl LinkInner {
    fn connection_state(&self) -> ConnectionState {
        *self.connection.read()
    }

    fn set_connection_state(&self, state: ConnectionState) {
        *self.connection.write() = state;
    }

    fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Installs freshly opened stream halves and starts the reader.
    async fn attach(self: &Arc<Self>, reader: BoxedReader, writer: BoxedWriter) {
        let mut slot = self.writer.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *slot = Some(writer);
        self.set_connection_state(ConnectionState::Connected);
        drop(slot);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(reader::run(
            Arc::downgrade(self),
            reader,
            self.config.framing(),
            cancel.clone(),
            generation,
            self.config.address(),
        ));
        *self.reader.lock() = Some(ReaderHandle { cancel, task });
    }

    /// Stops the reader and closes the write half, if any.
    async fn teardown(&self) {
        let handle = self.reader.lock().take();
        if let Some(handle) = handle {
            handle.cancel.cancel();
            // A panicked or aborted reader has nothing left to clean up.
            let _ = handle.task.await;
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            let _ = writer.shutdown().await;
        }
    }

    /// Applies one decoded reply to the snapshot and notifies subscribers.
    fn handle_message(&self, message: &str) {
        tracing::debug!(message, "Received reply");

        match Reply::parse(message) {
            Ok(reply) => {
                let change = reply.into_change(self.config.sources());
                self.state.write().apply(&change);
                self.callbacks.dispatch(&change);
            }
            Err(ParseError::UnknownTag(tag)) => {
                tracing::debug!(tag = %tag, "Ignoring unrecognized reply");
            }
            Err(e) => {
                tracing::debug!(message, error = %e, "Discarding malformed reply");
            }
        }
    }

    /// Final act of a reader task.
    fn reader_finished(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.set_connection_state(ConnectionState::Disconnected);
        }
        self.callbacks.dispatch_disconnected();
    }

    /// Handles a failed write: the connection is considered lost.
    ///
    /// A failure on a writer from an earlier connection leaves the current
    /// one alone.
    fn write_failed(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "Ignoring write failure from a replaced connection");
            return;
        }
        self.set_connection_state(ConnectionState::Disconnected);
        if let Some(handle) = self.reader.lock().as_ref() {
            handle.cancel.cancel();
        }
        self.callbacks.dispatch_disconnected();
    }
}

impl Drop for LinkInner {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.get_mut().take() {
            handle.cancel.cancel();
        }
    }
}

/// A connection to one preamplifier.
///
/// `DeviceLink` is a cheap handle: clones share the same connection, state
/// snapshot and subscriptions.
#[derive(Clone)]
pub struct DeviceLink {
    inner: Arc<LinkInner>,
}

impl DeviceLink {
    /// Creates a disconnected link.
    #[must_use]
    pub fn new(config: LinkConfig) -> Self {
        Self {
            inner: Arc::new(LinkInner {
                config,
                state: RwLock::new(DeviceState::new()),
                connection: RwLock::new(ConnectionState::Disconnected),
                generation: AtomicU64::new(0),
                writer: tokio::sync::Mutex::new(None),
                reader: parking_lot::Mutex::new(None),
                lifecycle: tokio::sync::Mutex::new(()),
                callbacks: CallbackRegistry::new(),
            }),
        }
    }

    /// Returns the link configuration.
    #[must_use]
    pub fn config(&self) -> &LinkConfig {
        &self.inner.config
    }

    // ========== Lifecycle ==========

    /// Opens the TCP connection and starts the background reader.
    ///
    /// Calling this while already connected is a no-op. Any reader left over
    /// from a dropped connection is stopped first.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Timeout`] if the connect does not complete
    /// within the configured timeout, [`ProtocolError::ConnectionFailed`] if
    /// it is refused or the host cannot be resolved, and
    /// [`ProtocolError::InvalidAddress`] for an empty host. The link is left
    /// disconnected in every case.
    pub async fn connect(&self) -> crate::Result<()> {
        let _guard = self.inner.lifecycle.lock().await;

        if self.inner.is_connected() {
            return Ok(());
        }

        self.inner.teardown().await;

        let address = self.inner.config.address();
        if self.inner.config.host().is_empty() {
            return Err(ProtocolError::InvalidAddress(address).into());
        }

        self.inner.set_connection_state(ConnectionState::Connecting);
        tracing::debug!(%address, "Connecting to device");

        let timeout = self.inner.config.connect_timeout();
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::error!(%address, error = %e, "Failed to connect to device");
                self.inner.set_connection_state(ConnectionState::Disconnected);
                return Err(ProtocolError::ConnectionFailed(e.to_string()).into());
            }
            Err(_) => {
                tracing::error!(%address, timeout_ms = duration_ms(timeout), "Timed out connecting to device");
                self.inner.set_connection_state(ConnectionState::Disconnected);
                return Err(ProtocolError::Timeout(duration_ms(timeout)).into());
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%address, error = %e, "Could not disable Nagle's algorithm");
        }

        let (read_half, write_half) = stream.into_split();
        self.inner
            .attach(Box::new(read_half), Box::new(write_half))
            .await;

        tracing::info!(%address, "Connected to device");
        Ok(())
    }

    /// Closes the connection.
    ///
    /// Cancels the reader, waits for it to stop, and shuts down the socket.
    /// Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        let _guard = self.inner.lifecycle.lock().await;

        let was_connected = self.inner.is_connected();
        self.inner.teardown().await;
        self.inner.set_connection_state(ConnectionState::Disconnected);

        if was_connected {
            tracing::info!(address = %self.inner.config.address(), "Disconnected from device");
        }
    }

    /// Checks that a device is reachable by connecting and disconnecting.
    ///
    /// The whole check is bounded by `timeout`, see [`DEFAULT_TEST_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Timeout`] if the check takes too long, or the
    /// connect error otherwise.
    pub async fn test_connection(config: LinkConfig, timeout: Duration) -> crate::Result<()> {
        let link = Self::new(config);
        let result = tokio::time::timeout(timeout, link.connect()).await;
        link.disconnect().await;

        match result {
            Ok(result) => result,
            Err(_) => Err(ProtocolError::Timeout(duration_ms(timeout)).into()),
        }
    }

    // ========== Commands ==========

    /// Sends raw command text, framed for the configured protocol variant.
    ///
    /// Concurrent callers are serialized. Nothing waits for a reply; replies
    /// arrive through the reader and the change notification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without touching the socket when the
    /// link is down. A failed write marks the link disconnected, fires the
    /// change notification and returns [`ProtocolError::Io`].
    pub async fn send_command(&self, command: &str) -> crate::Result<()> {
        if !self.inner.is_connected() {
            tracing::warn!(command, "Not connected, cannot send command");
            return Err(Error::NotConnected);
        }

        let frame = self.inner.config.framing().encode(command);

        let mut writer = self.inner.writer.lock().await;
        if !self.inner.is_connected() {
            return Err(Error::NotConnected);
        }
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let Some(stream) = writer.as_mut() else {
            return Err(Error::NotConnected);
        };

        tracing::debug!(command, "Sending command");
        let result = match stream.write_all(&frame).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::error!(command, error = %e, "Error sending command");
            writer.take();
            drop(writer);
            self.inner.write_failed(generation);
            return Err(ProtocolError::Io(e).into());
        }

        Ok(())
    }

    /// Sends a typed command.
    ///
    /// # Errors
    ///
    /// See [`send_command`](Self::send_command).
    pub async fn send<C>(&self, command: &C) -> crate::Result<()>
    where
        C: Command + Sync + ?Sized,
    {
        let text = command.to_wire_text();
        self.send_command(&text).await
    }

    /// Turns the device on.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn power_on(&self) -> crate::Result<()> {
        self.send(&PowerCommand::on()).await
    }

    /// Puts the device in standby.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn power_off(&self) -> crate::Result<()> {
        self.send(&PowerCommand::off()).await
    }

    /// Sets the absolute volume, 0 to 100.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`] for values above 100; nothing is
    /// sent in that case.
    pub async fn set_volume(&self, level: u8) -> crate::Result<()> {
        let volume = Volume::new(level)?;
        self.send(&VolumeCommand::Set(volume)).await
    }

    /// Steps the volume up by one.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn volume_up(&self) -> crate::Result<()> {
        self.send(&VolumeCommand::Up).await
    }

    /// Steps the volume down by one.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn volume_down(&self) -> crate::Result<()> {
        self.send(&VolumeCommand::Down).await
    }

    /// Mutes the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn mute_on(&self) -> crate::Result<()> {
        self.set_mute(true).await
    }

    /// Unmutes the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn mute_off(&self) -> crate::Result<()> {
        self.set_mute(false).await
    }

    /// Sets the mute state.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be sent.
    pub async fn set_mute(&self, muted: bool) -> crate::Result<()> {
        self.send(&MuteCommand::Set(muted)).await
    }

    /// Selects an input by display name or by raw device token.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::UnknownSource`] when `source` is neither a
    /// configured name nor a configured token; nothing is sent in that case.
    pub async fn select_source(&self, source: &str) -> crate::Result<()> {
        let Some(token) = self.inner.config.sources().resolve(source) else {
            return Err(ValueError::UnknownSource(source.to_string()).into());
        };
        let command = InputCommand::select(token);
        self.send(&command).await
    }

    /// Asks the device to report power, volume, mute and input.
    ///
    /// All four queries are attempted even if one fails.
    ///
    /// # Errors
    ///
    /// Returns the first send error.
    pub async fn query_status(&self) -> crate::Result<()> {
        let queries: [&(dyn Command + Sync); 4] = [
            &PowerCommand::Get,
            &VolumeCommand::Get,
            &MuteCommand::Get,
            &InputCommand::Get,
        ];

        let mut first_error = None;
        for query in queries {
            if let Err(e) = self.send(query).await {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ========== State ==========

    /// Returns the last reported power state.
    #[must_use]
    pub fn power(&self) -> bool {
        self.inner.state.read().power()
    }

    /// Returns the last reported volume.
    #[must_use]
    pub fn volume(&self) -> Volume {
        self.inner.state.read().volume()
    }

    /// Returns the last reported mute state.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.inner.state.read().is_muted()
    }

    /// Returns the last reported input as a display name.
    ///
    /// Inputs missing from the source map are reported by their raw token.
    #[must_use]
    pub fn source(&self) -> Option<String> {
        self.inner.state.read().source().map(ToString::to_string)
    }

    /// Returns a copy of the full state snapshot.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.inner.state.read().clone()
    }

    /// Returns true if the link is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection_state()
    }

    /// Fires the change notification without a state change.
    pub fn notify(&self) {
        self.inner.callbacks.notify();
    }

    /// Drops the current connection as if a write to it had failed.
    #[cfg(test)]
    pub(crate) fn force_disconnect(&self) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.write_failed(generation);
    }
}

impl Subscribable for DeviceLink {
    fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.callbacks.on_change(callback)
    }

    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.inner.callbacks.on_state_changed(callback)
    }

    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.callbacks.on_disconnected(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.callbacks.unsubscribe(id)
    }
}

impl fmt::Debug for DeviceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLink")
            .field("address", &self.inner.config.address())
            .field("connection", &self.inner.connection_state())
            .field("state", &*self.inner.state.read())
            .finish_non_exhaustive()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
