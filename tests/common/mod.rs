// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A scripted preamplifier on a local TCP port.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(3);

struct Panel {
    power: bool,
    volume: u8,
    muted: bool,
    input: String,
}

struct Shared {
    panel: Mutex<Panel>,
    commands: Mutex<Vec<String>>,
    connections: AtomicUsize,
}

impl Shared {
    /// Applies a command and returns the device's reply.
    fn handle(&self, command: &str) -> String {
        self.commands.lock().unwrap().push(command.to_string());

        let mut parts = command.split_whitespace();
        let tag = parts.next().unwrap_or_default();
        let arg = parts.next();

        let mut panel = self.panel.lock().unwrap();
        match (tag, arg) {
            ("PWR", Some(v)) => panel.power = v == "1",
            ("VOL", Some("U")) => panel.volume = (panel.volume + 1).min(100),
            ("VOL", Some("D")) => panel.volume = panel.volume.saturating_sub(1),
            ("VOL", Some(v)) => {
                if let Ok(v) = v.parse() {
                    panel.volume = v;
                }
            }
            ("MUT", Some(v)) => panel.muted = v == "1",
            ("INP", Some(v)) => panel.input = v.to_string(),
            _ => {}
        }

        match tag {
            "PWR" => format!("(PWR {})", u8::from(panel.power)),
            "VOL" => format!("(VOL {})", panel.volume),
            "MUT" => format!("(MUT {})", u8::from(panel.muted)),
            "INP" => format!("(INP {})", panel.input),
            _ => String::new(),
        }
    }
}

/// Mock device answering the parenthesized protocol.
///
/// Starts powered on at volume 30, unmuted, on input 14 (USB).
pub struct MockDevice {
    port: u16,
    shared: Arc<Shared>,
    kick: broadcast::Sender<()>,
    push: broadcast::Sender<String>,
    listener: JoinHandle<()>,
}

impl MockDevice {
    pub async fn start() -> Self {
        Self::start_on(0).await
    }

    pub async fn start_on(port: u16) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let shared = Arc::new(Shared {
            panel: Mutex::new(Panel {
                power: true,
                volume: 30,
                muted: false,
                input: "14".to_string(),
            }),
            commands: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
        });
        let (kick, _) = broadcast::channel(4);
        let (push, _) = broadcast::channel(16);

        let accept_shared = Arc::clone(&shared);
        let accept_kick = kick.clone();
        let accept_push = push.clone();
        let listener = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_shared.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(
                    stream,
                    Arc::clone(&accept_shared),
                    accept_kick.subscribe(),
                    accept_push.subscribe(),
                ));
            }
        });

        Self {
            port,
            shared,
            kick,
            push,
            listener,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Every command received so far, unframed.
    pub fn commands(&self) -> Vec<String> {
        self.shared.commands.lock().unwrap().clone()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Closes every open connection from the device side.
    pub fn drop_connections(&self) {
        let _ = self.kick.send(());
    }

    /// Sends raw bytes to every open connection, as the front panel would.
    pub fn push(&self, text: &str) {
        let _ = self.push.send(text.to_string());
    }

    /// Stops accepting and closes every open connection.
    pub fn stop(&self) {
        self.listener.abort();
        self.drop_connections();
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(
    mut stream: TcpStream,
    shared: Arc<Shared>,
    mut kick: broadcast::Receiver<()>,
    mut push: broadcast::Receiver<String>,
) {
    let mut buf = [0u8; 1024];
    let mut pending = String::new();

    loop {
        tokio::select! {
            _ = kick.recv() => return,
            pushed = push.recv() => match pushed {
                Ok(text) => {
                    if stream.write_all(text.as_bytes()).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return,
            },
            read = stream.read(&mut buf) => {
                let n = match read {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                pending.push_str(&String::from_utf8_lossy(&buf[..n]));

                while let Some(start) = pending.find('(') {
                    let Some(len) = pending[start..].find(')') else {
                        break;
                    };
                    let command = pending[start + 1..start + len].to_string();
                    pending.drain(..=start + len);

                    let reply = shared.handle(&command);
                    if stream.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Polls `condition` until it holds, panicking after [`WAIT`].
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Returns a port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
