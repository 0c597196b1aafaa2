// Copyright (C) 2026 Sunlamp Project
//
// MIT License

//! sunlamp - Web server implementation

use embassy_executor::Spawner;
use embassy_net::{Stack, tcp::TcpSocket};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use sunlamp_core::lamp::Level;
use sunlamp_core::page::render_status;

use crate::http::{
    HTTPD_HEADER_BUF_SIZE, HTTPD_IDLE_TIMEOUT, HTTPD_MAX_BODY_SIZE, HTTPD_MAX_HEADERS, HTTPD_PORT,
    HTTPD_TASK_TCP_RX_BUF_SIZE, HTTPD_TASK_TCP_TX_BUF_SIZE, WEB_TASK_POOL_SIZE,
};
use crate::http::{Method, Response};
use crate::{SharedLamp, SunlampError};

// Scratch buffer size used when draining request bodies.
const BODY_SCRATCH_SIZE: usize = 256;

/// Main HTTP server object that handles incoming connections and requests.
struct Server {
    lamp: &'static SharedLamp,
    header_buf: [u8; HTTPD_HEADER_BUF_SIZE],
}

impl Server {
    fn new(lamp: &'static SharedLamp) -> Self {
        Self {
            lamp,
            header_buf: [0; HTTPD_HEADER_BUF_SIZE],
        }
    }

    /// Reads and parses a single request off the socket.
    ///
    /// Protocol problems are reported as an error `Response` for the
    /// caller to send.  `Err` is returned only when the connection
    /// itself is unusable and must be closed.
    async fn handle_request(
        &mut self,
        socket: &mut TcpSocket<'_>,
    ) -> Result<Response, SunlampError> {
        // Accumulate until the end of the request head (\r\n\r\n)
        let mut total_read = 0;
        let header_end;
        loop {
            if total_read >= HTTPD_HEADER_BUF_SIZE {
                info!("httpd: Header buffer overflow, request too large");
                return Ok(Response::error(None, SunlampError::TooLarge));
            }

            let n = socket.read(&mut self.header_buf[total_read..]).await?;
            if n == 0 {
                if total_read == 0 {
                    debug!("httpd: Client dropped connection");
                } else {
                    info!("httpd: Connection closed during reading headers");
                }
                return Err(SunlampError::Network);
            }
            total_read += n;

            if let Some(pos) = self.header_buf[..total_read]
                .windows(4)
                .position(|w| w == b"\r\n\r\n")
            {
                header_end = pos + 4;
                break;
            }
        }

        // Parse the request line and headers
        let mut headers = [httparse::EMPTY_HEADER; HTTPD_MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        if let Err(e) = req.parse(&self.header_buf[..header_end]) {
            info!("httpd: Failed to parse HTTP request: {e}");
            return Ok(Response::error(None, SunlampError::BadRequest));
        }

        let (method, path) = match (req.method, req.path) {
            (Some(method_str), Some(path)) => match Method::from_str(method_str) {
                Some(method) => (method, path),
                None => {
                    info!("httpd: Unsupported method {method_str}");
                    return Ok(Response::error(Some(path), SunlampError::InvalidMethod));
                }
            },
            (None, _) => {
                info!("httpd: Failed to parse method");
                return Ok(Response::error(None, SunlampError::BadRequest));
            }
            (Some(_), None) => {
                info!("httpd: Failed to parse path");
                return Ok(Response::error(None, SunlampError::InvalidPath));
            }
        };

        let content_length = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-length"))
            .and_then(|h| core::str::from_utf8(h.value).ok())
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        if content_length > HTTPD_MAX_BODY_SIZE {
            info!("httpd: Request body too large");
            return Ok(Response::error(Some(path), SunlampError::TooLarge));
        }

        // No route consumes a body.  Drain it anyway so the next request
        // on this connection starts at a clean boundary.
        let mut body_read = (total_read - header_end).min(content_length);
        let mut scratch = [0u8; BODY_SCRATCH_SIZE];
        while body_read < content_length {
            let n = socket.read(&mut scratch).await?;
            if n == 0 {
                info!("httpd: Connection closed before body was fully read");
                return Err(SunlampError::Network);
            }
            body_read += n;
        }

        Ok(self.route_request(method, path))
    }

    fn route_request(&self, method: Method, path: &str) -> Response {
        trace!("httpd: Handle {method} {path}");

        if method != Method::Get {
            return Response::error(Some(path), SunlampError::InvalidMethod);
        }

        match path {
            "/" => self.handle_lamp(path, None),
            "/white/on" => self.handle_lamp(path, Some(Level::On)),
            "/white/off" => self.handle_lamp(path, Some(Level::Off)),
            _ => Response::error(Some(path), SunlampError::InvalidPath),
        }
    }

    // Applies the requested level change and renders the status page.
    // The pin write and the recorded level change together inside the
    // lock, and the page is rendered from the level read under it.
    fn handle_lamp(&self, path: &str, set: Option<Level>) -> Response {
        let level = self.lamp.lock(|lamp| {
            let mut lamp = lamp.borrow_mut();
            if let Some(level) = set {
                lamp.set(level);
            }
            lamp.level()
        });

        Response::page(path, render_status(level))
    }
}

/// Starts the HTTP server tasks.
///
/// The tasks accept on port 80 whether or not the station association
/// succeeded.
pub(crate) fn start(net_stack: Stack<'static>, lamp: &'static SharedLamp, spawner: &Spawner) {
    for id in 0..WEB_TASK_POOL_SIZE {
        spawner.must_spawn(task(id, net_stack, lamp));
    }
}

#[embassy_executor::task(pool_size = WEB_TASK_POOL_SIZE)]
async fn task(id: usize, stack: Stack<'static>, lamp: &'static SharedLamp) -> ! {
    match stack.config_v4() {
        Some(config) => info!(
            "Exec:  HTTPD {id} task started on {}:{}",
            config.address.address(),
            HTTPD_PORT
        ),
        None => info!("Exec:  HTTPD {id} task started on port {HTTPD_PORT}, no IP assigned yet"),
    }

    let mut rx_buffer = [0; HTTPD_TASK_TCP_RX_BUF_SIZE];
    let mut tx_buffer = [0; HTTPD_TASK_TCP_TX_BUF_SIZE];
    let mut server = Server::new(lamp);

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(HTTPD_IDLE_TIMEOUT));

        if let Err(e) = socket.accept(HTTPD_PORT).await {
            warn!("httpd: Task {id} server accept error: {e:?}");
            continue;
        }

        // Log the peer once per connection
        if let Some(edpt) = socket.remote_endpoint().as_ref() {
            info!("httpd: Task {id} connection from {}", edpt.addr);
        } else {
            warn!("httpd: Task {id} connection from unknown address");
        }

        // Serve requests on this connection until it closes or errors
        let _ = loop {
            match server.handle_request(&mut socket).await {
                Ok(rsp) => {
                    trace!("httpd: Task {id} Response {rsp}");
                    if let Err(e) = rsp.write_to(&mut socket).await {
                        // Failed write, drop the connection
                        break e.into();
                    }
                }
                Err(e) => {
                    // Connection closed, timed out, or read failed
                    break e;
                }
            }
        };
        info!("httpd: Task {id} connection closed");
        socket.close();
    }
}
