// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp - Error types

use core::fmt;

/// Sunlamp firmware error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunlampError {
    BadRequest,
    InvalidPath,
    InvalidMethod,
    TooLarge,
    Network,
}

impl fmt::Display for SunlampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SunlampError::BadRequest => write!(f, "Bad request"),
            SunlampError::InvalidPath => write!(f, "Invalid path"),
            SunlampError::InvalidMethod => write!(f, "Invalid method"),
            SunlampError::TooLarge => write!(f, "Request too large"),
            SunlampError::Network => write!(f, "network error"),
        }
    }
}

impl SunlampError {
    pub fn status_code(&self) -> u16 {
        match self {
            SunlampError::BadRequest => 400,    // Bad Request
            SunlampError::InvalidPath => 404,   // Not Found
            SunlampError::InvalidMethod => 405, // Method Not Allowed
            SunlampError::TooLarge => 413,      // Payload Too Large
            SunlampError::Network => 503,       // Service Unavailable
        }
    }
}

impl From<embassy_net::tcp::Error> for SunlampError {
    fn from(_error: embassy_net::tcp::Error) -> Self {
        SunlampError::Network
    }
}
