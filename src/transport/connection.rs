//! Transport loop
//!
//! One background worker per connection owns the socket. The worker frames
//! the byte stream into command envelopes, deposits scene-mutation kinds
//! into the shared inbound queue, and drains the shared outbound queue to
//! the socket in submission order. It never decodes scene payloads; that
//! happens on the consuming thread.
//!
//! The two queues are the only state shared with the consuming thread and
//! each is guarded by its own mutex, held just long enough to swap or push.
//! Socket reads and writes happen outside those locks.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::protocol::{Command, FrameHeader, HEADER_SIZE, MessageKind};

use super::error::{Result, TransportError};

/// Pause between idle loop passes so the alive flag stays responsive
/// without spinning.
const IDLE_WAIT: Duration = Duration::from_millis(1);

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket
    Disconnected,
    /// Resolving and connecting
    Connecting,
    /// Run loop active
    Connected,
    /// Shutdown requested, worker winding down
    Closing,
}

#[derive(Debug, Default)]
struct SharedQueues {
    inbound: Mutex<Vec<Command>>,
    outbound: Mutex<Vec<Command>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One TCP connection to a collaboration server with its background worker
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    worker: Option<JoinHandle<()>>,
    alive: Arc<AtomicBool>,
    queues: Arc<SharedQueues>,
    state: Arc<Mutex<ConnectionState>>,
}

impl Connection {
    /// Resolve `host`, open the stream, send the room join, and start the
    /// run loop
    ///
    /// Connect failures are fatal: no automatic retry or reconnect.
    #[instrument(skip(room))]
    pub fn connect(host: &str, port: u16, room: &str) -> Result<Self> {
        let state = Arc::new(Mutex::new(ConnectionState::Connecting));

        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Resolve {
                host: host.to_string(),
                port,
            })?;
        let mut stream = TcpStream::connect(addr).map_err(TransportError::Connect)?;
        stream.set_nodelay(true)?;

        // Join the room before anything else flows on this connection.
        let join = Command::new(MessageKind::JoinRoom, room.as_bytes().to_vec());
        write_frame(&mut stream, &join)?;
        info!(%addr, room, "connected");

        stream.set_nonblocking(true)?;
        let worker_stream = stream.try_clone()?;

        let alive = Arc::new(AtomicBool::new(true));
        let queues = Arc::new(SharedQueues::default());
        let worker = {
            let alive = Arc::clone(&alive);
            let queues = Arc::clone(&queues);
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("scenelink-transport".to_string())
                .spawn(move || run_loop(worker_stream, &alive, &queues, &state))?
        };

        *lock(&state) = ConnectionState::Connected;
        Ok(Self {
            stream,
            worker: Some(worker),
            alive,
            queues,
            state,
        })
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Append a command to the outbound queue; returns immediately and
    /// never blocks on network I/O
    pub fn submit(&self, command: Command) {
        lock(&self.queues.outbound).push(command);
    }

    /// Swap out everything the worker has queued inbound, in arrival order
    #[must_use]
    pub fn drain_inbound(&self) -> Vec<Command> {
        std::mem::take(&mut *lock(&self.queues.inbound))
    }

    /// Shut the connection down: clear the alive flag, wait for the worker
    /// to observe it, then disconnect the socket
    pub fn join(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        *lock(&self.state) = ConnectionState::Closing;
        self.alive.store(false, Ordering::Relaxed);
        if worker.join().is_err() {
            warn!("transport worker panicked");
        }
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!(error = %err, "socket shutdown after close");
        }
        *lock(&self.state) = ConnectionState::Disconnected;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_loop(
    mut stream: TcpStream,
    alive: &AtomicBool,
    queues: &SharedQueues,
    state: &Mutex<ConnectionState>,
) {
    while alive.load(Ordering::Relaxed) {
        let mut idle = true;

        match try_read_frame(&mut stream) {
            Ok(Some(command)) => {
                idle = false;
                debug!(kind = %command.kind(), id = command.id(), "received");
                if command.kind().is_scene_mutation() {
                    lock(&queues.inbound).push(command);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(error = %err, "transport loop fault, disconnecting");
                break;
            }
        }

        let pending = std::mem::take(&mut *lock(&queues.outbound));
        if !pending.is_empty() {
            idle = false;
            let mut faulted = false;
            for command in pending {
                if let Err(err) = write_frame(&mut stream, &command) {
                    warn!(error = %err, "send failed, disconnecting");
                    faulted = true;
                    break;
                }
            }
            if faulted {
                break;
            }
        }

        if idle {
            thread::sleep(IDLE_WAIT);
        }
    }
    *lock(state) = ConnectionState::Disconnected;
}

/// Attempt one non-blocking frame read
///
/// Proceeds only when a full header is already buffered; once the header is
/// consumed the payload read runs to completion (partial reads handled), per
/// the framing contract that decode never sees a short message.
fn try_read_frame(stream: &mut TcpStream) -> Result<Option<Command>> {
    let mut header_buf = [0u8; HEADER_SIZE];
    match stream.peek(&mut header_buf) {
        Ok(0) => return Err(TransportError::Closed),
        Ok(n) if n < HEADER_SIZE => return Ok(None),
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    read_full(stream, &mut header_buf)?;
    let header = FrameHeader::from_bytes(&header_buf)?;

    let mut payload = vec![0u8; header.payload_len() as usize];
    read_full(stream, &mut payload)?;

    Ok(Some(Command::from_parts(&header, payload)?))
}

/// Read until `buf` is filled, riding out partial and would-block reads
fn read_full(stream: &mut TcpStream, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(IDLE_WAIT),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Emit header and payload as one contiguous send
fn write_frame(stream: &mut TcpStream, command: &Command) -> Result<()> {
    let frame = command.encode_frame();
    let mut written = 0;
    while written < frame.len() {
        match stream.write(&frame[written..]) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => written += n,
            Err(err) if err.kind() == ErrorKind::WouldBlock => thread::sleep(IDLE_WAIT),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
