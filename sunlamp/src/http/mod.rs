// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp - Web server types and configuration

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;
use embassy_time::Duration;
use embedded_io_async::Write;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::SunlampError;
use sunlamp_core::page::Page;

pub(crate) mod server;

pub(crate) use server::start;

// Number of HTTP worker tasks, each with its own accept loop.
pub(crate) const WEB_TASK_POOL_SIZE: usize = 2;

// Port the HTTP server listens on
pub(crate) const HTTPD_PORT: u16 = 80;

// Connections idle for this long are dropped.
pub(crate) const HTTPD_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

// Per-task buffer sizes
pub(crate) const HTTPD_TASK_TCP_RX_BUF_SIZE: usize = 4096;
pub(crate) const HTTPD_TASK_TCP_TX_BUF_SIZE: usize = 4096;
pub(crate) const HTTPD_HEADER_BUF_SIZE: usize = 2048;

// Largest request body accepted.  No route consumes one, but anything up
// to this size is drained to keep the connection parseable.
pub(crate) const HTTPD_MAX_BODY_SIZE: usize = 4096;

pub(crate) const HTTPD_MAX_HEADERS: usize = 32;

/// Supported HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

impl Method {
    pub fn from_str(method: &str) -> Option<Method> {
        match method {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ContentType {
    Html,
}

impl ContentType {
    pub const HTML: &'static str = "text/html";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => Self::HTML,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response to a single HTTP request.  Content, when present, is the
/// rendered status page - this server serves exactly one document.
#[derive(Debug, Clone)]
pub struct Response {
    pub path: Option<String>,
    pub status_code: StatusCode,
    pub content: Option<Page>,
    pub content_type: Option<ContentType>,
}

impl Response {
    pub fn page(path: &str, content: Page) -> Self {
        Self {
            path: Some(path.to_string()),
            status_code: StatusCode::Ok,
            content: Some(content),
            content_type: Some(ContentType::Html),
        }
    }

    pub fn error(path: Option<&str>, error: SunlampError) -> Self {
        Self::status_code(path, error.into())
    }

    pub fn status_code(path: Option<&str>, status_code: StatusCode) -> Response {
        Response {
            path: path.map(String::from),
            status_code,
            content: None,
            content_type: None,
        }
    }

    pub async fn write_to(
        &self,
        socket: &mut embassy_net::tcp::TcpSocket<'_>,
    ) -> Result<(), embassy_net::tcp::Error> {
        let content_len = self.content.as_ref().map_or(0, |page| page.len());

        let header_str = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: {}\r\n\r\n",
            self.status_code.as_str(),
            content_len,
            self.content_type
                .as_ref()
                .map_or("text/plain", |ct| ct.as_str())
        );

        socket.write_all(header_str.as_bytes()).await?;

        if let Some(page) = &self.content {
            socket.write_all(page.as_bytes()).await?;
        }

        Ok(())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{path} {}", self.status_code)
        } else {
            write!(f, "No path {}", self.status_code)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StatusCode {
    Ok = 200,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    TooLarge = 413,
    InternalServerError = 500,
}

impl From<SunlampError> for StatusCode {
    fn from(error: SunlampError) -> Self {
        Self::from_u16(error.status_code())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "200 OK",
            Self::BadRequest => "400 Bad Request",
            Self::NotFound => "404 Not Found",
            Self::MethodNotAllowed => "405 Method Not Allowed",
            Self::TooLarge => "413 Payload Too Large",
            Self::InternalServerError => "500 Internal Server Error",
        }
    }

    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            400 => Self::BadRequest,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            413 => Self::TooLarge,
            _ => Self::InternalServerError,
        }
    }
}
