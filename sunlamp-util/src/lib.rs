// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! Sunlamp is a WiFi-controlled white LED lamp.
//!
//! sunlamp-util - WiFi and networking helpers for building Sunlamp
//! firmware.
//!
//! [`net`] - provides the WiFi station helper, using `esp-wifi` and
//! `embassy-net`, wired to the association monitor from `sunlamp-core`.

#![no_std]
#![feature(type_alias_impl_trait)]
#![feature(impl_trait_in_assoc_type)]

extern crate alloc;

pub mod net;
