// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp - main binary
//!
//! Drives a white LED on GPIO3 from a tiny web server, reachable over
//! WiFi on the local network.
//!
//! To build, set the WiFi credentials in your environment first:
//! - `SUNLAMP_SSID` - WiFi network name
//! - `SUNLAMP_PASSWORD` - WiFi network password
//!
//! Boot sequence:
//! - configure the lamp pin
//! - initialize the settings store, recovering the flash sector if needed
//! - start the WiFi station and wait for the association to resolve
//! - start the HTTP server tasks, whatever the association outcome
//!
//! To change other configuration:
//! - [`config::WIFI_MAX_RETRY`] - connection attempts before giving up
//! - [`config::RESOLVE_TIMEOUT`] - optional cap on the wait for a resolution
//! - [`http::HTTPD_PORT`] and the buffer sizes in [`http`]

#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![feature(type_alias_impl_trait)]
#![feature(impl_trait_in_assoc_type)]

extern crate alloc;

use alloc::string::String;
use core::cell::RefCell;
use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer, with_timeout};
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level as PinLevel, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use esp_storage::FlashStorage;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use static_cell::make_static;

use sunlamp_core::lamp::Lamp;
use sunlamp_core::monitor::{AssociationMonitor, Resolution};
use sunlamp_core::settings::SettingsStore;
use sunlamp_util::net::{Station, StationConfig};

mod config;
mod error;
mod http;

pub(crate) use error::SunlampError;

// Creates app descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

/// Heap size to allocate
pub const HEAP_SIZE: usize = 64 * 1024;

// One socket per HTTPD task, plus DHCP and a spare for the WiFi stack.
const NUM_SOCKETS: usize = http::WEB_TASK_POOL_SIZE + 2;

/// The lamp shared between the HTTP server tasks.  Pin writes and the
/// recorded level change together under the lock.
pub(crate) type SharedLamp = Mutex<CriticalSectionRawMutex, RefCell<Lamp<Output<'static>>>>;

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) -> ! {
    // Initialize logging
    esp_println::logger::init_logger_from_env();
    info!("*** sunlamp ***");

    // Initialize the HAL
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    let clocks = esp_hal::clock::Clocks::get();
    info!(
        "Value: {} running at {}MHz",
        esp_hal::chip!(),
        clocks.cpu_clock.as_mhz()
    );

    // Set up the heap
    esp_alloc::heap_allocator!(size: HEAP_SIZE);

    // Initialize embassy
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    esp_hal_embassy::init(timg1.timer0);

    // Configure the lamp pin before anything else starts
    let pin = Output::new(peripherals.GPIO3, PinLevel::Low, OutputConfig::default());
    let lamp: &'static SharedLamp = make_static!(Mutex::new(RefCell::new(Lamp::new(pin))));

    // Initialize the settings store, erasing and retrying once if the
    // stored record is unusable.  A flash driver error is fatal.
    let flash = FlashStorage::new(peripherals.FLASH);
    let mut settings_store = SettingsStore::new(flash, config::SETTINGS_OFFSET);
    let mut settings = settings_store
        .init_or_recover()
        .expect("Failed to initialize settings storage");
    settings.boot_count += 1;
    if let Err(e) = settings_store.save(&settings) {
        warn!("Warn:  Failed to store boot count: {e}");
    }
    info!("Info:  Boot number {}", settings.boot_count);

    // Build the WiFi station and spawn its tasks
    let monitor: &'static AssociationMonitor =
        make_static!(AssociationMonitor::new(config::WIFI_MAX_RETRY));
    let station_config = StationConfig {
        ssid: String::from(config::WIFI_SSID),
        password: String::from(config::WIFI_PASSWORD),
        auth_method: config::WIFI_AUTH_METHOD,
        net: embassy_net::Config::dhcpv4(Default::default()),
    };
    let stack_resources = make_static!(StackResources::<NUM_SOCKETS>::new());
    let mut station = Station::builder::<NUM_SOCKETS>()
        .with_interface(station_config, stack_resources)
        .build(
            &spawner,
            peripherals.TIMG0,
            peripherals.RNG,
            peripherals.WIFI,
        )
        .expect("Failed to build WiFi station");
    station.must_spawn(monitor);

    // Block until the association resolves, one way or the other
    match wait_for_resolution(monitor).await {
        Resolution::Connected => info!("Ok:    Connected to SSID {}", config::WIFI_SSID),
        Resolution::Failed => warn!("Warn:  Failed to connect to SSID {}", config::WIFI_SSID),
    }

    // Start the HTTP server tasks, whatever the association outcome
    let stack = station.stack().expect("Station stack not initialized");
    http::start(stack, lamp, &spawner);

    // Bootstrap is complete and the server tasks own the lamp from here
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}

// A timeout counts as a failed association.
async fn wait_for_resolution(monitor: &AssociationMonitor) -> Resolution {
    match config::RESOLVE_TIMEOUT {
        None => monitor.wait_for_resolution().await,
        Some(timeout) => match with_timeout(timeout, monitor.wait_for_resolution()).await {
            Ok(resolution) => resolution,
            Err(_) => {
                warn!(
                    "Warn:  Association did not resolve within {}s",
                    timeout.as_secs()
                );
                Resolution::Failed
            }
        },
    }
}
