use std::collections::HashMap;
use tandem_core::{PeerId, Role, RoomId, SignalMessage};
use tracing::{debug, info, warn};

/// A room pairs exactly two negotiators.
pub const ROOM_CAPACITY: usize = 2;

/// A frame the coordinator owes to one peer after a state change.
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub to: PeerId,
    pub message: SignalMessage,
}

impl Announcement {
    fn new(to: &PeerId, message: SignalMessage) -> Self {
        Self {
            to: to.clone(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First occupant; waits for a partner.
    Waiting,
    /// Second occupant; the waiting peer becomes the caller.
    Paired { caller: PeerId, callee: PeerId },
    /// The peer was already in this room.
    AlreadyJoined,
    /// The room already holds two peers.
    Full,
}

#[derive(Debug)]
pub struct Room {
    id: RoomId,
    occupants: Vec<PeerId>,
}

impl Room {
    fn new(id: RoomId) -> Self {
        Self {
            id,
            occupants: Vec::with_capacity(ROOM_CAPACITY),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn occupants(&self) -> &[PeerId] {
        &self.occupants
    }

    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.occupants.contains(peer_id)
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= ROOM_CAPACITY
    }
}

/// Occupancy of every live room. Pure state; the caller delivers the returned
/// announcements.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
    memberships: HashMap<PeerId, RoomId>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room(&self, room: &RoomId) -> Option<&Room> {
        self.rooms.get(room)
    }

    pub fn room_of(&self, peer_id: &PeerId) -> Option<&RoomId> {
        self.memberships.get(peer_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn join(&mut self, peer_id: &PeerId, room_id: &RoomId) -> (JoinOutcome, Vec<Announcement>) {
        let mut announcements = Vec::new();

        match self.memberships.get(peer_id) {
            Some(current) if current == room_id => {
                debug!("{} is already in room '{}'", peer_id, room_id);
                return (JoinOutcome::AlreadyJoined, announcements);
            }
            Some(current) => {
                let current = current.clone();
                announcements.extend(self.leave(peer_id, &current));
            }
            None => {}
        }

        let room = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone()));

        if room.is_full() {
            warn!("Room '{}' is full, rejecting {}", room_id, peer_id);
            announcements.push(Announcement::new(
                peer_id,
                SignalMessage::RoomFull {
                    room: room_id.clone(),
                },
            ));
            return (JoinOutcome::Full, announcements);
        }

        let waiting = room.occupants.first().cloned();
        room.occupants.push(peer_id.clone());
        self.memberships.insert(peer_id.clone(), room_id.clone());

        let Some(existing) = waiting else {
            info!("{} waits alone in room '{}'", peer_id, room_id);
            return (JoinOutcome::Waiting, announcements);
        };

        info!(
            "Paired {} (caller) with {} (callee) in room '{}'",
            existing, peer_id, room_id
        );
        announcements.push(Announcement::new(
            &existing,
            SignalMessage::OtherUser {
                user_id: peer_id.clone(),
                role: Role::Caller,
            },
        ));
        announcements.push(Announcement::new(
            peer_id,
            SignalMessage::UserJoined {
                user_id: existing.clone(),
                role: Role::Callee,
            },
        ));

        (
            JoinOutcome::Paired {
                caller: existing,
                callee: peer_id.clone(),
            },
            announcements,
        )
    }

    pub fn leave(&mut self, peer_id: &PeerId, room_id: &RoomId) -> Vec<Announcement> {
        if self.memberships.get(peer_id) != Some(room_id) {
            debug!("{} is not in room '{}', nothing to leave", peer_id, room_id);
            return Vec::new();
        }
        self.memberships.remove(peer_id);

        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };
        room.occupants.retain(|p| p != peer_id);

        if room.occupants.is_empty() {
            info!("Room '{}' is empty, removing it", room_id);
            self.rooms.remove(room_id);
            return Vec::new();
        }

        room.occupants
            .iter()
            .map(|other| {
                Announcement::new(
                    other,
                    SignalMessage::UserLeft {
                        user_id: peer_id.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn disconnect(&mut self, peer_id: &PeerId) -> Vec<Announcement> {
        match self.memberships.get(peer_id).cloned() {
            Some(room_id) => self.leave(peer_id, &room_id),
            None => Vec::new(),
        }
    }
}
