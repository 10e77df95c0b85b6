//! Room relay for collaborative editing.
//!
//! Every binary WebSocket message a peer sends to `/collab/{room}` is
//! forwarded unchanged to the other peers in that room. The relay never
//! decodes payloads; clients may use [`quire_common::CollabFrame`] framing or
//! their sync engine's own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    body::Bytes,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::server::AppState;

/// A blob relayed within a room, tagged with the connection that sent it.
#[derive(Debug, Clone)]
pub struct Relayed {
    pub from: u64,
    pub data: Bytes,
}

/// A connection's handle on its room.
pub struct Membership {
    pub id: u64,
    pub room: SmolStr,
    pub tx: broadcast::Sender<Relayed>,
    pub rx: broadcast::Receiver<Relayed>,
}

/// Live rooms, created on first join and dropped when the last peer leaves.
#[derive(Debug)]
pub struct Rooms {
    rooms: Mutex<HashMap<SmolStr, broadcast::Sender<Relayed>>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl Rooms {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Mutex::default(),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SmolStr, broadcast::Sender<Relayed>>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn join(&self, room: &str) -> Membership {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let room = SmolStr::new(room);
        // Subscribing under the lock keeps `leave` from closing the room
        // between lookup and subscription.
        let (tx, rx) = {
            let mut rooms = self.lock();
            let tx = rooms
                .entry(room.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0);
            let joined = (tx.clone(), tx.subscribe());
            gauge!("quire_collab_rooms").set(rooms.len() as f64);
            joined
        };
        debug!(%room, peer = id, "joined room");
        Membership { id, room, tx, rx }
    }

    /// Drop the membership and remove the room if nobody is left.
    pub fn leave(&self, membership: Membership) {
        let Membership { id, room, tx, rx } = membership;
        let mut rooms = self.lock();
        drop(rx);
        // The entry may already belong to a newer channel for the same name.
        let current = rooms.get(&room).is_some_and(|live| live.same_channel(&tx));
        if current && tx.receiver_count() == 0 {
            rooms.remove(&room);
            gauge!("quire_collab_rooms").set(rooms.len() as f64);
            debug!(%room, "room closed");
        }
        debug!(%room, peer = id, "left room");
    }

    pub fn peer_count(&self, room: &str) -> usize {
        self.lock().get(room).map_or(0, |tx| tx.receiver_count())
    }

    pub fn room_count(&self) -> usize {
        self.lock().len()
    }
}

impl Membership {
    /// Forward `data` to every other peer in the room. Returns how many
    /// receivers (including the sender's own) the message reached.
    pub fn publish(&self, data: Bytes) -> usize {
        counter!("quire_relay_frames_total").increment(1);
        self.tx
            .send(Relayed {
                from: self.id,
                data,
            })
            .unwrap_or(0)
    }

    /// Next blob from another peer; `None` once the room is gone.
    pub async fn next(&mut self) -> Option<Bytes> {
        loop {
            match self.rx.recv().await {
                Ok(relayed) if relayed.from == self.id => continue,
                Ok(relayed) => return Some(relayed.data),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    counter!("quire_relay_lagged_total").increment(1);
                    counter!("quire_relay_dropped_frames_total").increment(skipped);
                    warn!(room = %self.room, peer = self.id, skipped, "peer lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// `GET /collab/{room}`
pub async fn collab(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let rooms = state.rooms.clone();
    ws.on_upgrade(move |socket| relay(socket, rooms, room))
}

async fn relay(socket: WebSocket, rooms: Arc<Rooms>, room: String) {
    let mut membership = rooms.join(&room);
    let peer = membership.id;
    info!(%room, peer, peers = rooms.peer_count(&room), "collaboration peer connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Binary(data))) => {
                    membership.publish(data);
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Text is not part of the protocol; pings are answered by axum.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%room, peer, %err, "websocket error");
                    break;
                }
            },
            outgoing = membership.next() => match outgoing {
                Some(data) => {
                    if sink.send(Message::Binary(data)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    rooms.leave(membership);
    info!(%room, peer, "collaboration peer disconnected");
}
