//! Plain-socket delivery.
//!
//! The request is written byte for byte as rendered, so no HTTP client
//! library sits between the builder and the wire.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::Transport;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::request::Request;

#[derive(Debug, Clone)]
pub struct SocketTransport {
    timeout: Option<Duration>,
    fire_and_forget: bool,
}

impl SocketTransport {
    pub fn new(config: &Config) -> Self {
        let timeout = config.timeout();
        Self {
            // Zero would be rejected by the socket options; treat as "no limit".
            timeout: (!timeout.is_zero()).then_some(timeout),
            fire_and_forget: config.fire_and_forget,
        }
    }

    fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::Delivery(format!("Cannot resolve {}:{}: {}", host, port, e)))?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            let attempt = match self.timeout {
                Some(t) => TcpStream::connect_timeout(&addr, t),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    log::debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(Error::Delivery(match last_err {
            Some(e) => format!("Cannot connect to {}:{}: {}", host, port, e),
            None => format!("No address found for {}:{}", host, port),
        }))
    }
}

impl Default for SocketTransport {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Transport for SocketTransport {
    fn deliver(&self, request: &Request) -> Result<Option<String>> {
        let mut stream = self.connect(&request.host, request.port)?;
        stream
            .set_read_timeout(self.timeout)
            .and_then(|_| stream.set_write_timeout(self.timeout))
            .map_err(|e| Error::Delivery(format!("Socket setup for {} failed: {}", request.host, e)))?;

        stream
            .write_all(request.as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| Error::Delivery(format!("Write to {} failed: {}", request.host, e)))?;
        log::debug!(
            "sent {} beacon to {}:{} ({} bytes)",
            request.kind,
            request.host,
            request.port,
            request.as_bytes().len()
        );

        if self.fire_and_forget {
            return Ok(None);
        }

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .map_err(|e| Error::Delivery(format!("Read from {} failed: {}", request.host, e)))?;
        Ok(Some(String::from_utf8_lossy(&response).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::request::BeaconKind;

    fn local_config(port: u16) -> Config {
        Config::new()
            .with_endpoint(&format!("http://127.0.0.1:{}/__utm.gif", port))
            .unwrap()
            .with_request_timeout(Duration::from_secs(5))
    }

    /// Accept one connection, read the request head, answer with a tiny gif.
    fn serve_once(listener: TcpListener) -> thread::JoinHandle<String> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(b"HTTP/1.0 200 OK\r\nContent-Type: image/gif\r\n\r\nGIF89a")
                .unwrap();
            String::from_utf8(received).unwrap()
        })
    }

    #[test]
    fn test_deliver_reads_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = serve_once(listener);

        let config = local_config(port);
        let request = Request::render(
            BeaconKind::Pageview,
            &config,
            "utmwv=4.7.2".into(),
            Some("TestAgent/1.0"),
            None,
        );
        let response = SocketTransport::new(&config).deliver(&request).unwrap();

        assert!(response.unwrap().starts_with("HTTP/1.0 200 OK"));
        let received = server.join().unwrap();
        assert!(received.starts_with("GET /__utm.gif?utmwv=4.7.2 HTTP/1.0\r\nHost: 127.0.0.1\r\n"));
    }

    #[test]
    fn test_fire_and_forget_skips_response() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = serve_once(listener);

        let config = local_config(port).with_fire_and_forget(true);
        let request = Request::render(BeaconKind::Event, &config, "utmt=event".into(), None, None);
        let response = SocketTransport::new(&config).deliver(&request).unwrap();

        assert!(response.is_none());
        assert!(server.join().unwrap().contains("utmt=event"));
    }

    #[test]
    fn test_zero_timeout_means_no_limit() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = serve_once(listener);

        let config = local_config(port).with_request_timeout(Duration::ZERO);
        let transport = SocketTransport::new(&config);
        assert_eq!(transport.timeout, None);

        let request = Request::render(BeaconKind::Pageview, &config, "a=1".into(), None, None);
        assert!(transport.deliver(&request).unwrap().is_some());
        server.join().unwrap();
    }

    #[test]
    fn test_connection_refused_is_delivery_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = local_config(port);
        let request = Request::render(BeaconKind::Pageview, &config, "a=1".into(), None, None);

        let err = SocketTransport::new(&config).deliver(&request).unwrap_err();
        assert!(matches!(err, Error::Delivery(_)));
    }
}
