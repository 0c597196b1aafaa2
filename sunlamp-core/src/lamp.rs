// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp-core - Lamp state
//!
//! Pairs the logical lamp level with the physical output pin behind a
//! single mutation entry point: the recorded level always matches the
//! last pin write.

use embedded_hal::digital::OutputPin;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Logical level of the lamp output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Off,
    On,
}

impl Level {
    /// Label used on the status page.
    pub fn label(&self) -> &'static str {
        match self {
            Level::Off => "off",
            Level::On => "on",
        }
    }
}

/// The white lamp: one output pin plus its logical level.
///
/// Generic over [`OutputPin`] so the firmware hands it an `esp-hal` output
/// and tests hand it a recording mock.  Pin driver errors are logged and
/// swallowed - the control surface never surfaces them.
pub struct Lamp<P> {
    pin: P,
    level: Level,
}

impl<P: OutputPin> Lamp<P> {
    /// Wraps an already configured output pin.  The pin is expected to be
    /// driven low; the lamp starts Off.
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            level: Level::Off,
        }
    }

    /// Drives the pin and records the level.  Idempotent.
    pub fn set(&mut self, level: Level) {
        let result = match level {
            Level::On => self.pin.set_high(),
            Level::Off => self.pin.set_low(),
        };
        if let Err(e) = result {
            warn!("Warn:  Failed to drive lamp pin: {e:?}");
        }
        self.level = level;
    }

    /// Current logical level.
    pub fn level(&self) -> Level {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockPin {
        high: bool,
        writes: usize,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn set_drives_pin_and_level_together() {
        let mut lamp = Lamp::new(MockPin::default());
        assert_eq!(lamp.level(), Level::Off);

        lamp.set(Level::On);
        assert_eq!(lamp.level(), Level::On);
        assert!(lamp.pin.high);

        lamp.set(Level::Off);
        assert_eq!(lamp.level(), Level::Off);
        assert!(!lamp.pin.high);
    }

    #[test]
    fn set_is_idempotent() {
        let mut lamp = Lamp::new(MockPin::default());
        lamp.set(Level::On);
        lamp.set(Level::On);
        assert_eq!(lamp.level(), Level::On);
        assert!(lamp.pin.high);
        assert_eq!(lamp.pin.writes, 2);
    }

    #[test]
    fn labels_match_page_wording() {
        assert_eq!(Level::Off.label(), "off");
        assert_eq!(Level::On.label(), "on");
    }
}
