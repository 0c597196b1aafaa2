// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! Sunlamp is a tiny WiFi-controlled white lamp.
//!
//! sunlamp-core - Core state machines and rendering used by the sunlamp
//! firmware: the network association monitor, the lamp state, the status
//! page renderer and the settings record store.
//!
//! This library is `no_std` compatible and free of hardware dependencies,
//! so its tests run on the host:
//!
//! ```sh
//! cargo test -p sunlamp-core --target x86_64-unknown-linux-gnu
//! ```

#![no_std]

pub mod lamp;
pub mod monitor;
pub mod page;
pub mod settings;
