//! In-memory transport
//!
//! [`ChannelTransport`] stands in for a radio link. Its [`DevicePeer`] plays the
//! motor: it sees every frame the engine writes and can push notifications,
//! drop the link or refuse connections. Hosts use it for simulation and the
//! test suites use it for end-to-end scenarios.

use crate::event::EventSink;
use crate::transport::Transport;
use am43_core::{Am43Error, Am43Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct LinkShared {
    sink: Option<EventSink>,
    connected: bool,
    refuse_connect: bool,
    connect_attempts: u32,
}

fn lock(shared: &Mutex<LinkShared>) -> MutexGuard<'_, LinkShared> {
    // The guarded state stays consistent even if a holder panicked.
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Transport half handed to the engine
#[derive(Debug)]
pub struct ChannelTransport {
    shared: Arc<Mutex<LinkShared>>,
    outbound: mpsc::UnboundedSender<Bytes>,
}

/// Motor half kept by the host or test
#[derive(Debug)]
pub struct DevicePeer {
    shared: Arc<Mutex<LinkShared>>,
    outbound: mpsc::UnboundedReceiver<Bytes>,
}

impl ChannelTransport {
    /// Create a transport and the peer that observes it
    pub fn pair() -> (ChannelTransport, DevicePeer) {
        let shared = Arc::new(Mutex::new(LinkShared::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ChannelTransport {
                shared: shared.clone(),
                outbound: tx,
            },
            DevicePeer {
                shared,
                outbound: rx,
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn attach(&mut self, sink: EventSink) {
        lock(&self.shared).sink = Some(sink);
    }

    async fn connect(&mut self) -> Am43Result<()> {
        let mut shared = lock(&self.shared);
        shared.connect_attempts += 1;
        if shared.refuse_connect {
            return Err(Am43Error::Transport("connection refused by peer".to_string()));
        }
        shared.connected = true;
        Ok(())
    }

    async fn send(&mut self, frame: &[u8]) -> Am43Result<()> {
        if !lock(&self.shared).connected {
            return Err(Am43Error::NotConnected);
        }
        self.outbound
            .send(Bytes::copy_from_slice(frame))
            .map_err(|_| Am43Error::Transport("peer has gone away".to_string()))
    }

    async fn disconnect(&mut self) -> Am43Result<()> {
        lock(&self.shared).connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.shared).connected
    }
}

impl DevicePeer {
    /// Deliver a notification to the engine
    ///
    /// # Returns
    /// `false` if no engine is attached or it has been torn down
    pub fn notify(&self, data: &[u8]) -> bool {
        match lock(&self.shared).sink.as_ref() {
            Some(sink) => sink.notify(data),
            None => false,
        }
    }

    /// Drop the link from the motor side, as an out-of-range motor would
    pub fn drop_link(&self) -> bool {
        let mut shared = lock(&self.shared);
        shared.connected = false;
        match shared.sink.as_ref() {
            Some(sink) => sink.disconnected(),
            None => false,
        }
    }

    /// Bring the link up from the stack side without a connect call
    pub fn announce_connected(&self) -> bool {
        let mut shared = lock(&self.shared);
        shared.connected = true;
        match shared.sink.as_ref() {
            Some(sink) => sink.connected(),
            None => false,
        }
    }

    /// Report a connection attempt the stack made on its own as failed
    pub fn report_connect_failure(&self, reason: &str) -> bool {
        let mut shared = lock(&self.shared);
        shared.connected = false;
        match shared.sink.as_ref() {
            Some(sink) => sink.connect_failed(reason),
            None => false,
        }
    }

    /// Make subsequent connect calls fail
    pub fn refuse_connections(&self, refuse: bool) {
        lock(&self.shared).refuse_connect = refuse;
    }

    /// Number of connect calls seen so far
    pub fn connect_attempts(&self) -> u32 {
        lock(&self.shared).connect_attempts
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared).connected
    }

    /// Take the next frame written by the engine, if any
    pub fn try_recv_frame(&mut self) -> Option<Bytes> {
        self.outbound.try_recv().ok()
    }

    /// Wait for the next frame written by the engine
    pub async fn recv_frame(&mut self) -> Option<Bytes> {
        self.outbound.recv().await
    }

    /// Take every frame written so far
    pub fn sent_frames(&mut self) -> Vec<Bytes> {
        let mut frames = Vec::new();
        while let Some(frame) = self.try_recv_frame() {
            frames.push(frame);
        }
        frames
    }
}
