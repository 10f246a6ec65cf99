//! Peer broadcast adapter.
//!
//! Implements [`BroadcastPort`] by copying each telemetry payload into a
//! bounded outbox, once per connected peer.  The radio task drains the
//! outbox; on the host the frames are only logged.
//!
//! A payload with no connected peer is a [`CommsError::NoPeers`] failure,
//! and a full outbox drops the frame with [`CommsError::SendFailed`].

use heapless::Deque;
use log::{debug, info};

use crate::app::ports::BroadcastPort;
use crate::error::CommsError;

/// Maximum number of simultaneously connected peers.
pub const MAX_PEERS: usize = 4;

/// Frames queued for the radio before new ones are refused.
pub const OUTBOX_DEPTH: usize = 8;

pub type PeerId = u8;

/// One payload addressed to one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub peer: PeerId,
    pub seq: u32,
    pub payload: Vec<u8>,
}

pub struct PeerBroadcast {
    connected: [bool; MAX_PEERS],
    outbox: Deque<OutboundFrame, OUTBOX_DEPTH>,
    seq: u32,
}

impl Default for PeerBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerBroadcast {
    pub fn new() -> Self {
        Self {
            connected: [false; MAX_PEERS],
            outbox: Deque::new(),
            seq: 0,
        }
    }

    pub fn connect(&mut self, peer: PeerId) {
        if let Some(slot) = self.connected.get_mut(peer as usize) {
            *slot = true;
            info!("Broadcast: peer {} connected", peer);
        }
    }

    pub fn disconnect(&mut self, peer: PeerId) {
        if let Some(slot) = self.connected.get_mut(peer as usize) {
            *slot = false;
            info!("Broadcast: peer {} disconnected", peer);
        }
    }

    pub fn peer_count(&self) -> usize {
        self.connected.iter().filter(|c| **c).count()
    }

    /// Take the oldest queued frame.
    pub fn next_frame(&mut self) -> Option<OutboundFrame> {
        self.outbox.pop_front()
    }

    pub fn queued(&self) -> usize {
        self.outbox.len()
    }
}

impl BroadcastPort for PeerBroadcast {
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), CommsError> {
        if self.peer_count() == 0 {
            return Err(CommsError::NoPeers);
        }
        if self.outbox.capacity() - self.outbox.len() < self.peer_count() {
            return Err(CommsError::SendFailed);
        }

        let seq = self.seq;
        self.seq = self.seq.wrapping_add(1);
        for (peer, _) in self.connected.iter().enumerate().filter(|(_, c)| **c) {
            let frame = OutboundFrame {
                peer: peer as PeerId,
                seq,
                payload: payload.to_vec(),
            };
            self.outbox.push_back(frame).map_err(|_| CommsError::SendFailed)?;
        }
        debug!(
            "Broadcast #{}: {} bytes to {} peer(s)",
            seq,
            payload.len(),
            self.peer_count()
        );
        Ok(())
    }
}
