// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp-util - Networking utilities and helpers
//!
//! The [`Station`] object provides a way to configure and run the Sunlamp's
//! WiFi station interface.  Connection attempts are driven by the
//! [`AssociationMonitor`], which decides whether a disconnect is retried
//! and resolves the overall outcome.
//!
//! # Example
//! ```rust
//! use sunlamp_util::net::{Station, StationConfig};
//! use embassy_net::StackResources;
//!
//! // Create the station config, and the static resources `embassy-net`
//! // requires to run the networking stack.
//! let stack_resources = make_static!(StackResources::<4>::new());
//! let config = StationConfig {
//!     ssid: String::from("MyNetwork"),
//!     password: String::from("password123"),
//!     auth_method: AuthMethod::WPA2Personal,
//!     net: embassy_net::Config::dhcpv4(Default::default()),
//! };
//!
//! // Create the Station object using the builder pattern.  Builds all
//! // required `esp-wifi` and `embassy-net` objects.
//! // <4> is the number of sockets the station interface can serve.
//! let mut station = Station::builder::<4>()
//!     .with_interface(config, stack_resources)
//!     .build(&spawner, timg0, rng, wifi_hw)
//!     .expect("Failed to build WiFi station");
//!
//! // Spawn the networking and WiFi tasks.  The monitor receives the
//! // station lifecycle events from here on.
//! station.must_spawn(monitor);
//!
//! // Block on the association outcome.
//! let resolution = monitor.wait_for_resolution().await;
//! ```

use alloc::format;
use alloc::string::String;
use core::fmt;
use core::future::pending;
use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_net::{Config as NetConfig, Runner, Stack, StackResources, StaticConfigV4};
use embassy_time::Timer;
use esp_hal::peripherals::{RNG, TIMG0, WIFI};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_wifi::wifi::{
    AuthMethod, ClientConfiguration, Configuration, WifiController, WifiDevice, WifiEvent,
};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use static_cell::make_static;
use sunlamp_core::monitor::{AssociationMonitor, Directive};

/// Error type for WiFi operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Hit error in the esp-wifi stack
    Wifi(String),

    /// Configuration error, e.g. missing required configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Wifi(msg) => write!(f, "WiFi stack error: {msg}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

/// Configuration for the WiFi station interface.
// Debug is not derived: printing the Debug representation of (Net)Config
// can crash inside embassy-net.
#[derive(Clone)]
pub struct StationConfig {
    /// SSID of the WiFi network
    pub ssid: String,

    /// Password for the WiFi network
    pub password: String,

    /// Authentication method the network expects
    pub auth_method: AuthMethod,

    /// Network configuration for the station interface.  Either a static
    /// IP or DHCP configuration.
    pub net: NetConfig,
}

impl fmt::Debug for StationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep net out of the output
        f.debug_struct("StationConfig")
            .field("ssid", &self.ssid)
            .field("password", &self.password)
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

/// Builder for the WiFi station.  Use [`Station::builder`] to create a new
/// instance of this builder and see the documentation for that method for
/// examples of how to use it.
#[derive(Default)]
pub struct StationBuilder<const SOCKS: usize> {
    config: Option<StationConfig>,
    stack_resources: Option<&'static mut StackResources<SOCKS>>,
}

impl<const SOCKS: usize> StationBuilder<SOCKS> {
    fn new() -> Self {
        Self::default()
    }

    /// Adds the station interface configuration to the builder.
    ///
    /// Arguments:
    /// - `config`: The configuration for the station interface, including
    ///   SSID, password, auth method, and network configuration.
    /// - `stack_resources`: The stack resources for the station interface,
    ///   which are used to manage the networking stack.
    ///
    /// Returns:
    /// - `Self` to allow method chaining.
    pub fn with_interface(
        mut self,
        config: StationConfig,
        stack_resources: &'static mut StackResources<SOCKS>,
    ) -> Self {
        self.config = Some(config);
        self.stack_resources = Some(stack_resources);
        self
    }

    /// Builds the WiFi station with the specified configuration.
    ///
    /// After this function you likely want to call [`Station::must_spawn`]
    /// to start the networking and WiFi tasks.
    ///
    /// Arguments:
    /// - `spawner`: The spawner used to spawn the WiFi tasks.
    /// - `timg0`: The timer group used for WiFi timing.
    /// - `rng`: The random number generator used for WiFi operations.
    /// - `wifi`: The WiFi peripheral to use for the station interface.
    ///
    /// Returns:
    /// - `Ok(Station)` if the WiFi station was built successfully.
    /// - `Err(Error)` if there was an error building the WiFi station.
    pub fn build(
        self,
        spawner: &Spawner,
        timg0: TIMG0<'static>,
        rng: RNG<'static>,
        wifi: WIFI<'static>,
    ) -> Result<Station, Error> {
        let mut station = Station::new(spawner);
        station.init(timg0, rng, wifi, self.config, self.stack_resources)?;
        Ok(station)
    }
}

/// Main WiFi station object, used to add WiFi capability to the Sunlamp
/// firmware.
///
/// Uses `esp-wifi` and `embassy-net`.
///
/// See [`Station::builder`] for an example of creating and starting WiFi
/// using this object.
pub struct Station {
    spawner: Spawner,
    controller: Option<WifiController<'static>>,
    stack: Option<Stack<'static>>,
    runner: Option<Runner<'static, WifiDevice<'static>>>,
}

impl Station {
    /// Creates a new station builder with the specified resource (socket)
    /// size for the station interface.
    ///
    /// Generics:
    /// - `SOCKS`: The number of sockets for the station interface
    ///
    /// Returns:
    /// - `StationBuilder<SOCKS>`
    pub fn builder<const SOCKS: usize>() -> StationBuilder<SOCKS> {
        StationBuilder::new()
    }

    // Creates an empty Station for the builder to initialize.
    fn new(spawner: &Spawner) -> Self {
        Self {
            spawner: *spawner,
            controller: None,
            stack: None,
            runner: None,
        }
    }

    // Initializes the WiFi controller and creates the station interface.
    //
    // Arguments:
    // - `timg0`: The timer group used for WiFi timing
    // - `rng`: The random number generator used for WiFi operations
    // - `wifi`: The WiFi peripheral
    // - `config`: The station interface configuration
    // - `stack_resources`: Stack resources for the station interface
    //
    // Returns:
    // - `Ok(())` if the WiFi controller was initialized successfully
    fn init<const SOCKS: usize>(
        &mut self,
        timg0: TIMG0<'static>,
        rng: RNG<'static>,
        wifi: WIFI<'static>,
        config: Option<StationConfig>,
        stack_resources: Option<&'static mut StackResources<SOCKS>>,
    ) -> Result<(), Error> {
        let config = config
            .ok_or_else(|| Error::Config(String::from("No station interface configured")))?;

        // Set up the peripherals for WiFi
        let timg0 = TimerGroup::new(timg0);
        let mut rng = Rng::new(rng);

        // Create and configure the WiFi controller.
        // Use &* to make the mutable reference that make_static! returns
        // immutable, which is what esp_wifi expects.
        let esp_wifi_ctrl = &*make_static!(esp_wifi::init(timg0.timer0, rng).unwrap());
        let (mut controller, interfaces) = esp_wifi::wifi::new(esp_wifi_ctrl, wifi).unwrap();

        // Configure and store the controller
        self.configure(&mut controller, &config)?;
        self.controller = Some(controller);

        debug!(
            "Info:  Configuring station interface with SSID: {}",
            config.ssid
        );
        let seed = (rng.random() as u64) << 32 | rng.random() as u64;
        let (stack, runner) = embassy_net::new(
            interfaces.sta,
            config.net.clone(),
            stack_resources.expect("Station stack resources not provided"),
            seed,
        );
        self.stack = Some(stack);
        self.runner = Some(runner);

        Ok(())
    }

    // Configures the WiFi controller for station operation.
    fn configure(
        &self,
        controller: &mut WifiController<'static>,
        config: &StationConfig,
    ) -> Result<(), Error> {
        // Avoid power saving mode for more reliable WiFi
        controller
            .set_power_saving(esp_wifi::config::PowerSaveMode::None)
            .inspect_err(|e| {
                error!("Error: Failed to set WiFi power saving mode {e:?}");
            })
            .ok();

        debug!("Info:  Station SSID: {}", config.ssid);
        debug!("Info:  Station password: {}", config.password);
        let client_config = ClientConfiguration {
            ssid: config.ssid.clone(),
            password: config.password.clone(),
            auth_method: config.auth_method,
            ..Default::default()
        };

        controller
            .set_configuration(&Configuration::Client(client_config))
            .inspect(|_| trace!("Ok:    WiFi configuration set successfully"))
            .inspect_err(|e| {
                warn!("Error: Failed to set WiFi configuration: {e:?}");
            })
            .map_err(|e| Error::Wifi(format!("Failed to set WiFi configuration: {e:?}")))
    }

    /// Spawns the WiFi and networking tasks.  The networking task is
    /// spawned first, so it is ready to handle events when the WiFi
    /// connection is established.
    ///
    /// The station task reports lifecycle events to `monitor` and issues
    /// connection attempts according to its directives.
    ///
    /// Uses `Spawner::must_spawn` to ensure that the tasks are spawned or
    /// panics.
    pub fn must_spawn(&mut self, monitor: &'static AssociationMonitor) {
        let runner = self.runner.take().expect("Network runner not initialized");
        self.spawner.must_spawn(net_task(runner));

        let controller = self
            .controller
            .take()
            .expect("WiFi controller not initialized");
        let stack = self.stack.expect("Network stack not initialized");
        self.spawner.must_spawn(station_task(controller, stack, monitor));
    }

    /// Gets the station networking stack.
    ///
    /// Returns:
    /// - `Some(Stack)` if the station has been built
    /// - `None` otherwise
    pub fn stack(&self) -> Option<Stack<'static>> {
        self.stack
    }
}

// Drives the WiFi station according to the association monitor's
// directives: issues connection attempts, reports disconnects and acquired
// addresses back to the monitor, and parks once it stops retrying.
#[embassy_executor::task]
async fn station_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    monitor: &'static AssociationMonitor,
) -> ! {
    debug!(
        "Info:  WiFi device capabilities: {:?}",
        controller.capabilities()
    );

    info!("Exec:  Starting WiFi station");
    controller
        .start_async()
        .await
        .expect("Failed to start WiFi station");

    let mut directive = monitor.on_started();
    loop {
        match directive {
            Directive::Connect => {
                info!("Exec:  Connecting WiFi station");
                directive = match controller.connect_async().await {
                    Ok(()) => associated(&mut controller, &stack, monitor).await,
                    Err(e) => {
                        warn!("Warn:  WiFi station connect failed: {e:?}");
                        monitor.on_disconnected()
                    }
                };
            }
            Directive::Idle => pending().await,
        }
    }
}

// Handles a live association: reports the DHCP address to the monitor once
// it lands, then waits out the disconnect either way.
async fn associated(
    controller: &mut WifiController<'static>,
    stack: &Stack<'static>,
    monitor: &AssociationMonitor,
) -> Directive {
    match select(
        controller.wait_for_all_events(WifiEvent::StaDisconnected.into(), false),
        wait_for_ipv4(stack),
    )
    .await
    {
        Either::First(()) => {}
        Either::Second(config) => {
            monitor.on_address_acquired(config.address.address());
            controller
                .wait_for_all_events(WifiEvent::StaDisconnected.into(), false)
                .await;
        }
    }
    warn!("Warn:  WiFi station disconnected");
    monitor.on_disconnected()
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

// Waits for the station to receive IPv4 configuration, e.g. via DHCP.
async fn wait_for_ipv4(net_stack: &Stack<'static>) -> StaticConfigV4 {
    loop {
        // Wait for the network stack to receive valid IP configuration
        net_stack.wait_config_up().await;
        if let Some(config) = net_stack.config_v4() {
            return config;
        }
        Timer::after_millis(100).await;
    }
}
