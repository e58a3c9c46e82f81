use std::{fmt::Write as _, path::Path};

use shared::domain::{Item, ProgressEntry, Room, RoomId};

pub fn item_card(item: &Item) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Practice: {}", item.name);
    if !item.hint.is_empty() {
        let _ = writeln!(out, "Hint: {}", item.hint);
    }
    match item.image_path.as_deref() {
        Some(path) if Path::new(path).exists() => {
            let _ = writeln!(out, "Image: {path}");
        }
        Some(path) => {
            let _ = writeln!(out, "Image: {path} (file not found)");
        }
        None => out.push_str("(no image for this item)\n"),
    }
    out
}

pub fn session_started(scope: Option<RoomId>, queued: usize) -> String {
    match scope {
        Some(room_id) => format!("Practicing room #{room_id}: {queued} item(s) queued."),
        None => format!("Practicing all rooms: {queued} item(s) queued."),
    }
}

pub fn session_finished(shown: usize) -> String {
    format!("End of practice sequence ({shown} item(s) shown).")
}

pub fn room_table(rooms: &[Room]) -> String {
    if rooms.is_empty() {
        return "No rooms yet. Add one with `palace add-room <name>`.\n".into();
    }
    let mut out = String::new();
    for room in rooms {
        if room.description.is_empty() {
            let _ = writeln!(out, "#{:<4} {}", room.id, room.name);
        } else {
            let _ = writeln!(out, "#{:<4} {}  ({})", room.id, room.name, room.description);
        }
    }
    out
}

pub fn item_table(items: &[Item]) -> String {
    if items.is_empty() {
        return "No items.\n".into();
    }
    let mut out = String::new();
    for item in items {
        let image = item
            .image_path
            .as_deref()
            .and_then(|path| Path::new(path).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "#{:<4} room #{:<4} {:<24} {:<32} {}",
            item.id, item.room_id, item.name, item.hint, image
        );
    }
    out
}

pub fn history_table(entries: &[ProgressEntry]) -> String {
    if entries.is_empty() {
        return "No reviews recorded yet.\n".into();
    }
    let mut out = String::new();
    for entry in entries {
        let name = entry.item_name.as_deref().unwrap_or("(deleted item)");
        let _ = write!(
            out,
            "{}  #{:<4} {}",
            entry.event.seen_at.format("%Y-%m-%d %H:%M:%S"),
            entry.event.item_id,
            name
        );
        if let Some(note) = &entry.event.note {
            let _ = write!(out, "  [{note}]");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shared::domain::{ItemId, ProgressEvent, ProgressEventId};

    use super::*;

    fn item(image_path: Option<&str>) -> Item {
        Item {
            id: ItemId(3),
            room_id: RoomId(1),
            name: "Winged cat".into(),
            hint: "A cat with golden wings".into(),
            image_path: image_path.map(str::to_string),
        }
    }

    #[test]
    fn card_shows_name_hint_and_image_state() {
        let card = item_card(&item(None));
        assert!(card.starts_with("Practice: Winged cat\n"));
        assert!(card.contains("Hint: A cat with golden wings"));
        assert!(card.contains("(no image for this item)"));

        let missing = item_card(&item(Some("/definitely/not/here.png")));
        assert!(missing.contains("/definitely/not/here.png (file not found)"));

        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("cat.png");
        std::fs::write(&image, b"png").expect("write image");
        let present = item_card(&item(Some(image.to_str().expect("utf8 path"))));
        assert!(!present.contains("file not found"));
    }

    #[test]
    fn history_marks_deleted_items_and_notes() {
        let entries = vec![ProgressEntry {
            event: ProgressEvent {
                id: ProgressEventId(1),
                item_id: ItemId(9),
                seen_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
                note: Some("on the bus".into()),
            },
            item_name: None,
        }];
        assert_eq!(
            history_table(&entries),
            "2024-05-01 08:30:00  #9    (deleted item)  [on the bus]\n"
        );
    }

    #[test]
    fn empty_listings_explain_themselves() {
        assert!(room_table(&[]).contains("add-room"));
        assert_eq!(item_table(&[]), "No items.\n");
        assert_eq!(session_finished(0), "End of practice sequence (0 item(s) shown).");
    }
}
