//! Wire frames for the collaboration relay.
//!
//! The relay is content-agnostic: `Update` payloads are opaque bytes produced
//! by whatever sync engine the clients run. Frames are postcard-encoded and
//! carried in binary WebSocket messages.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::FrameError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollabFrame {
    /// A peer announced itself in a room.
    Join { peer: SmolStr, name: Option<SmolStr> },
    /// A peer left the room.
    Leave { peer: SmolStr },
    /// Opaque document update from `peer`.
    Update { peer: SmolStr, data: Vec<u8> },
    /// Cursor/selection broadcast, as document positions.
    Presence { peer: SmolStr, anchor: usize, head: usize },
}

impl CollabFrame {
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        postcard::to_stdvec(self).map_err(FrameError::Encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        postcard::from_bytes(bytes).map_err(FrameError::Decode)
    }

    pub fn peer(&self) -> &str {
        match self {
            Self::Join { peer, .. }
            | Self::Leave { peer }
            | Self::Update { peer, .. }
            | Self::Presence { peer, .. } => peer,
        }
    }
}
