use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use may::coroutine::{self, JoinHandle};
use tracing::{debug, info, warn};
use url::Url;

use super::tcp::TcpAcceptor;
use crate::dispatcher::{Control, TickReport};
use crate::error::ControlError;
use crate::node::Node;
use crate::runtime_config::RuntimeConfig;
use crate::sse::LogSink;

/// Resolve a control URI such as `http://127.0.0.1:5001` to a socket address.
///
/// Host and port are required; the scheme is not interpreted.
pub fn resolve_uri(uri: &str) -> Result<SocketAddr, ControlError> {
    let invalid = |reason: &str| ControlError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(uri).map_err(|err| invalid(&err.to_string()))?;
    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| invalid("missing port"))?;
    (host, port)
        .to_socket_addrs()
        .map_err(|err| invalid(&err.to_string()))?
        .next()
        .ok_or_else(|| invalid("host did not resolve"))
}

/// Entry point for running the control API over TCP.
pub struct ControlServer;

impl ControlServer {
    /// Bind the control listener and start the tick coroutine.
    ///
    /// # Errors
    ///
    /// Fails if `uri` is not a usable address, the port cannot be bound, or the
    /// coroutines cannot be spawned.
    pub fn start(
        node: Arc<dyn Node>,
        uri: &str,
        config: &RuntimeConfig,
    ) -> Result<ControlHandle, ControlError> {
        let addr = resolve_uri(uri)?;
        let acceptor = TcpAcceptor::bind(addr, *config)
            .map_err(|source| ControlError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = acceptor.local_addr();

        let mut control = Control::new(node, Box::new(acceptor));
        let log_sink = control.log_sink();
        for route in control.router().routes() {
            debug!(
                method = %route.method,
                path = %route.template,
                handler_name = route.id.handler_name(),
                "Control route"
            );
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let interval = config.tick_interval;

        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The tick loop owns the Control and an Arc'd stop flag; nothing is borrowed.
        let handle = unsafe {
            coroutine::Builder::new()
                .name("brrtc-tick".to_owned())
                .stack_size(config.stack_size)
                .spawn(move || {
                    while !stop_flag.load(Ordering::Acquire) {
                        match control.tick() {
                            Ok(report) if report != TickReport::default() => {
                                debug!(
                                    accepted = report.accepted,
                                    dispatched = report.dispatched,
                                    not_found = report.not_found,
                                    reaped = report.reaped,
                                    "Control tick"
                                );
                            }
                            Ok(_) => {}
                            Err(err) => warn!(error = %err, "Control tick aborted"),
                        }
                        coroutine::sleep(interval);
                    }
                    control.shutdown();
                })
        }
        .map_err(ControlError::Spawn)?;

        info!(addr = %local_addr, uri = %uri, "Control API listening");
        Ok(ControlHandle {
            addr: local_addr,
            stop,
            handle,
            log_sink,
        })
    }
}

/// Handle to a running control server.
pub struct ControlHandle {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
    log_sink: Arc<LogSink>,
}

impl ControlHandle {
    /// Address actually bound (useful with port `0`).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sink that actor firings are published to.
    #[must_use]
    pub fn log_sink(&self) -> Arc<LogSink> {
        Arc::clone(&self.log_sink)
    }

    /// Wait until the listener accepts connections.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server is not reachable within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "control server not ready"))
    }

    /// Stop ticking, close every connection and release the port.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Release);
        if self.handle.join().is_err() {
            warn!(addr = %self.addr, "Control tick coroutine panicked");
        }
        info!(addr = %self.addr, "Control API stopped");
    }
}
