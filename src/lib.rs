// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `McIntosh` Lib - A Rust library to control McIntosh preamplifiers.
//!
//! The preamplifiers expose a plain-text control protocol on a TCP port
//! (84 by default). This library keeps one persistent connection per device,
//! tracks everything the device reports, and recovers the connection when it
//! drops.
//!
//! # Supported Features
//!
//! - **Power control**: Operate / standby
//! - **Volume control**: Absolute level 0-100, single steps up and down
//! - **Mute control**: Mute / unmute
//! - **Input selection**: By display name or raw device token, with the
//!   C2800 input table built in and custom tables configurable
//! - **Unsolicited updates**: Front-panel and remote changes are reflected
//!   immediately
//! - **Supervision**: Periodic status polling and automatic reconnection
//!
//! # Protocol Variants
//!
//! Two wire framings are supported, selected per device with
//! [`Framing`](protocol::Framing): parenthesized `(VOL 35)` messages, which
//! is the default, and newline-terminated lines.
//!
//! # Quick Start
//!
//! ## Direct Link
//!
//! ```no_run
//! use mcintosh_lib::{DeviceLink, LinkConfig};
//!
//! #[tokio::main]
//! async fn main() -> mcintosh_lib::Result<()> {
//!     let link = DeviceLink::new(LinkConfig::new("192.168.1.60"));
//!     link.connect().await?;
//!
//!     link.power_on().await?;
//!     link.set_volume(30).await?;
//!     link.select_source("BAL 1").await?;
//!
//!     // Replies arrive asynchronously; accessors return the last report.
//!     println!("muted: {}", link.is_muted());
//!
//!     link.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supervised Connection
//!
//! ```no_run
//! use mcintosh_lib::{ConnectionSupervisor, LinkConfig, SupervisorConfig};
//! use mcintosh_lib::event::SupervisorEvent;
//!
//! #[tokio::main]
//! async fn main() -> mcintosh_lib::Result<()> {
//!     let config = SupervisorConfig::from_json(r#"{ "host": "192.168.1.60" }"#)?;
//!     let supervisor = ConnectionSupervisor::new(config);
//!     let mut events = supervisor.subscribe();
//!
//!     supervisor.start().await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         if let SupervisorEvent::StateUpdated { state } = event {
//!             println!("volume {} source {:?}", state.volume(), state.source());
//!         }
//!     }
//!
//!     supervisor.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod link;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod supervisor;
pub mod types;

pub use command::{Command, InputCommand, MuteCommand, PowerCommand, VolumeCommand};
pub use config::{LinkConfig, ReconnectionPolicy, SupervisorConfig};
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use link::{ConnectionState, DeviceLink};
pub use protocol::Framing;
pub use state::{DeviceState, StateChange};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use supervisor::{ConnectionSupervisor, SupervisorState};
pub use types::{SourceEntry, SourceMap, Volume};
