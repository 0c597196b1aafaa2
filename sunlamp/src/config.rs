// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp - Compile time configuration
//!
//! WiFi credentials are baked in at build time.  Set the `SUNLAMP_SSID`
//! and `SUNLAMP_PASSWORD` environment variables before building and
//! flashing.

use embassy_time::Duration;
use esp_wifi::wifi::AuthMethod;

/// SSID of the WiFi network to join.  Empty if unset at build time.
pub const WIFI_SSID: &str = match option_env!("SUNLAMP_SSID") {
    Some(ssid) => ssid,
    None => "",
};

/// Password of the WiFi network to join.  Empty if unset at build time.
pub const WIFI_PASSWORD: &str = match option_env!("SUNLAMP_PASSWORD") {
    Some(password) => password,
    None => "",
};

/// Authentication method the network is expected to use.
pub const WIFI_AUTH_METHOD: AuthMethod = AuthMethod::WPA2Personal;

/// Maximum number of reconnect attempts after the initial one fails.
/// Once spent, the association resolves as failed and stays failed.
pub const WIFI_MAX_RETRY: u32 = 5;

/// Bound on how long boot waits for the association to resolve.  `None`
/// waits indefinitely; the retry budget still unblocks the wait when
/// the station cannot connect.
pub const RESOLVE_TIMEOUT: Option<Duration> = None;

/// Flash offset of the settings sector.  Matches the `nvs` entry of the
/// default partition table.
pub const SETTINGS_OFFSET: u32 = 0x9000;
