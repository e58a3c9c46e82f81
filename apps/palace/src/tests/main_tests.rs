use super::*;

use shared::domain::Item;

async fn memory_storage() -> Storage {
    Storage::new("sqlite::memory:").await.expect("db")
}

fn add_item(room_id: i64, name: &str) -> Command {
    Command::AddItem {
        room_id,
        name: name.into(),
        hint: String::new(),
        image: None,
    }
}

fn add_room(name: &str) -> Command {
    Command::AddRoom {
        name: name.into(),
        description: String::new(),
    }
}

async fn failure(storage: &Storage, command: Command) -> ReportedError {
    let err = execute(storage, command, true)
        .await
        .expect_err("command should fail");
    report(&err)
}

#[tokio::test]
async fn missing_room_is_not_found_for_every_command() {
    let storage = memory_storage().await;
    let commands = [
        add_item(99, "ghost"),
        Command::DeleteRoom { room_id: 99 },
        Command::ListItems { room: Some(99) },
        Command::Practice {
            room: Some(99),
            note: None,
            all: true,
        },
    ];

    for command in commands {
        let reported = failure(&storage, command).await;
        assert_eq!(reported.code, ErrorCode::NotFound);
        assert_eq!(reported.message, "room 99 does not exist");
    }
    assert!(storage.list_all_items().await.expect("items").is_empty());
}

#[tokio::test]
async fn missing_item_is_not_found() {
    let storage = memory_storage().await;
    let reported = failure(&storage, Command::DeleteItem { item_id: 5 }).await;
    assert_eq!(reported.code, ErrorCode::NotFound);
    assert_eq!(reported.message, "item 5 does not exist");
}

#[tokio::test]
async fn blank_and_duplicate_names_are_validation_errors() {
    let storage = memory_storage().await;
    execute(&storage, add_room("First room"), true)
        .await
        .expect("first room");
    let room_id = storage.list_rooms().await.expect("rooms")[0].id;

    let blank_room = failure(&storage, add_room("   ")).await;
    assert_eq!(blank_room.code, ErrorCode::Validation);
    assert_eq!(blank_room.message, "room name must not be empty");

    let duplicate = failure(&storage, add_room("First room")).await;
    assert_eq!(duplicate.code, ErrorCode::Validation);
    assert!(duplicate.message.contains("already exists"));

    let blank_item = failure(&storage, add_item(room_id.0, " ")).await;
    assert_eq!(blank_item.code, ErrorCode::Validation);
    assert_eq!(blank_item.message, "item name must not be empty");
}

#[test]
fn untyped_failures_stay_storage_errors() {
    let reported = report(&anyhow::anyhow!("disk I/O error"));
    assert_eq!(reported.code, ErrorCode::Storage);
    assert_eq!(reported.message, "disk I/O error");
}

async fn practice_loop(storage: &Storage, json: bool) -> PracticeLoop<Vec<u8>> {
    let room_id = storage.add_room("hall", "").await.expect("room");
    for name in ["lamp", "mirror"] {
        storage
            .add_item(room_id, name, "", None)
            .await
            .expect("item");
    }
    PracticeLoop {
        controller: SessionController::with_seed(storage.clone(), 7),
        scope: Some(room_id),
        note: None,
        json,
        out: Vec::new(),
    }
}

#[tokio::test]
async fn json_practice_writes_only_item_objects() {
    let storage = memory_storage().await;
    let mut session = practice_loop(&storage, true).await;

    // Past the end, stop, an unknown key, then a restart that shows one more item.
    session
        .run_interactive(&b"n\nn\nn\ns\nx\nr\nq\n"[..])
        .await
        .expect("interactive run");

    let out = String::from_utf8(session.out).expect("utf8 output");
    let items: Vec<Item> = out
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is an item"))
        .collect();
    assert_eq!(items.len(), 3);

    let mut first_round: Vec<&str> = items[..2].iter().map(|item| item.name.as_str()).collect();
    first_round.sort_unstable();
    assert_eq!(first_round, ["lamp", "mirror"]);
    assert!(!session.controller.is_active());
}

#[tokio::test]
async fn text_practice_prompts_and_reports_the_end() {
    let storage = memory_storage().await;
    let mut session = practice_loop(&storage, false).await;

    session
        .run_interactive(&b"\n\n\nq\n"[..])
        .await
        .expect("interactive run");

    let out = String::from_utf8(session.out).expect("utf8 output");
    assert!(out.starts_with("Practicing room #1: 2 item(s) queued."));
    assert_eq!(out.matches("Practice: ").count(), 2);
    assert!(out.contains("End of practice sequence (2 item(s) shown)."));
    assert!(out.contains("No practice running."));
    assert!(out.contains("[Enter/n] next"));
}

#[tokio::test]
async fn run_to_end_records_each_item_once() {
    let storage = memory_storage().await;
    let mut session = practice_loop(&storage, true).await;
    session.note = Some("commute".into());

    session.run_to_end().await.expect("run to end");

    let history = storage.list_progress(None, 10).await.expect("history");
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|entry| entry.event.note.as_deref() == Some("commute")));
    assert_eq!(String::from_utf8(session.out).expect("utf8").lines().count(), 2);
}
