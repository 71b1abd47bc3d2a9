//! Room manager: creation, join codes and lookup
//!
//! Rooms are shared as `Arc<Mutex<Room>>` so each room's tick task and its
//! connection handlers synchronize on the room alone; rooms never share
//! mutable state with each other. The manager itself only guards the
//! directory.

use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use rand::Rng;
use uuid::Uuid;

use crate::game::state::RoomMode;
use crate::lobby::room::Room;

/// Characters used in join codes; ambiguous glyphs excluded.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

pub type SharedRoom = Arc<Mutex<Room>>;

/// Manager errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ManagerError {
    #[error("Too many rooms")]
    TooManyRooms,
    #[error("Room not found")]
    RoomNotFound,
}

/// Directory of live rooms.
pub struct RoomManager {
    rooms: HashMap<Uuid, SharedRoom>,
    codes: HashMap<String, Uuid>,
    max_rooms: usize,
}

impl RoomManager {
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            codes: HashMap::new(),
            max_rooms,
        }
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code: String = (0..CODE_LENGTH)
                .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
                .collect();
            if !self.codes.contains_key(&code) {
                return code;
            }
        }
    }

    /// Create a room with a fresh seed and join code.
    pub fn create_room(&mut self, mode: RoomMode) -> Result<(Uuid, String, SharedRoom), ManagerError> {
        if self.rooms.len() >= self.max_rooms {
            return Err(ManagerError::TooManyRooms);
        }

        let seed: u64 = rand::thread_rng().gen();
        let room = Room::new(mode, seed);
        let id = room.id;
        let code = self.generate_code();
        let shared: SharedRoom = Arc::new(Mutex::new(room));

        self.rooms.insert(id, shared.clone());
        self.codes.insert(code.clone(), id);
        tracing::info!(room = %id, code = %code, ?mode, "room created");

        Ok((id, code, shared))
    }

    pub fn get_room(&self, id: Uuid) -> Option<SharedRoom> {
        self.rooms.get(&id).cloned()
    }

    pub fn find_by_code(&self, code: &str) -> Option<SharedRoom> {
        let id = self.codes.get(&code.to_uppercase())?;
        self.rooms.get(id).cloned()
    }

    /// A crew room with space, or a fresh one.
    pub fn find_or_create(&mut self, mode: RoomMode) -> Result<SharedRoom, ManagerError> {
        for room in self.rooms.values() {
            let guard = room.lock();
            if guard.mode == mode && !guard.is_full() {
                drop(guard);
                return Ok(room.clone());
            }
        }
        self.create_room(mode).map(|(_, _, room)| room)
    }

    /// Drop rooms with no occupied seats. Returns how many were removed.
    pub fn cleanup_empty(&mut self) -> usize {
        let empty: Vec<Uuid> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.lock().is_empty())
            .map(|(id, _)| *id)
            .collect();
        for id in &empty {
            self.rooms.remove(id);
            self.codes.retain(|_, room_id| room_id != id);
            tracing::info!(room = %id, "empty room removed");
        }
        empty.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn all_rooms(&self) -> Vec<SharedRoom> {
        self.rooms.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_room_with_code() {
        let mut manager = RoomManager::new(10);
        let (id, code, _room) = manager.create_room(RoomMode::Crew).unwrap();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(manager.get_room(id).is_some());
        assert!(manager.find_by_code(&code).is_some());
        // Codes are case-insensitive on lookup
        assert!(manager.find_by_code(&code.to_lowercase()).is_some());
    }

    #[test]
    fn test_room_cap() {
        let mut manager = RoomManager::new(1);
        manager.create_room(RoomMode::Crew).unwrap();
        assert!(matches!(
            manager.create_room(RoomMode::Crew),
            Err(ManagerError::TooManyRooms)
        ));
    }

    #[test]
    fn test_find_or_create_reuses_open_room() {
        let mut manager = RoomManager::new(10);
        let (id, _, room) = manager.create_room(RoomMode::Crew).unwrap();
        room.lock()
            .join(Uuid::new_v4(), "P1".to_string(), None, None)
            .unwrap();

        let found = manager.find_or_create(RoomMode::Crew).unwrap();
        assert_eq!(found.lock().id, id);
        assert_eq!(manager.room_count(), 1);
    }

    #[test]
    fn test_find_or_create_respects_mode() {
        let mut manager = RoomManager::new(10);
        manager.create_room(RoomMode::Crew).unwrap();
        let solo = manager.find_or_create(RoomMode::Solo).unwrap();
        assert_eq!(solo.lock().mode, RoomMode::Solo);
        assert_eq!(manager.room_count(), 2);
    }

    #[test]
    fn test_cleanup_empty_rooms() {
        let mut manager = RoomManager::new(10);
        let (_, _, occupied) = manager.create_room(RoomMode::Crew).unwrap();
        manager.create_room(RoomMode::Crew).unwrap();
        occupied
            .lock()
            .join(Uuid::new_v4(), "P1".to_string(), None, None)
            .unwrap();

        let removed = manager.cleanup_empty();
        assert_eq!(removed, 1);
        assert_eq!(manager.room_count(), 1);
    }
}
