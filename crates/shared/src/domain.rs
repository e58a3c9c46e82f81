use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(RoomId);
id_newtype!(ItemId);
id_newtype!(ProgressEventId);

/// A named grouping of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
}

/// A single fact to memorize. Always belongs to exactly one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub room_id: RoomId,
    pub name: String,
    pub hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// Append-only record that an item was shown at `seen_at`.
///
/// The item reference is weak: deleting the item leaves its history behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub id: ProgressEventId,
    pub item_id: ItemId,
    pub seen_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A progress event joined with the name of its item, if the item still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub event: ProgressEvent,
    pub item_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let encoded = serde_json::to_string(&ItemId(42)).expect("encode");
        assert_eq!(encoded, "42");
        assert_eq!(RoomId(7).to_string(), "7");
    }

    #[test]
    fn absent_image_path_is_omitted_from_json() {
        let item = Item {
            id: ItemId(1),
            room_id: RoomId(1),
            name: "winged cat".into(),
            hint: "golden wings".into(),
            image_path: None,
        };
        let value = serde_json::to_value(&item).expect("encode");
        assert!(value.get("image_path").is_none());

        let decoded: Item = serde_json::from_value(value).expect("decode");
        assert_eq!(decoded, item);
    }
}
