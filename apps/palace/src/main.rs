use std::io::Write;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use practice::{Advance, SessionController};
use serde::Serialize;
use shared::{
    domain::{ItemId, RoomId},
    error::{ErrorCode, PracticeError, ReportedError, StoreError},
};
use storage::Storage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "palace", about = "Rooms of things to remember, and a daily practice loop")]
struct Cli {
    /// Overrides the configured database location.
    #[arg(long)]
    database_url: Option<String>,
    /// Print listings and practice items as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    AddRoom {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    ListRooms,
    /// Deletes a room together with all of its items.
    DeleteRoom {
        room_id: i64,
    },
    AddItem {
        room_id: i64,
        name: String,
        #[arg(long, default_value = "")]
        hint: String,
        /// Path to an image that illustrates the item.
        #[arg(long)]
        image: Option<String>,
    },
    ListItems {
        #[arg(long)]
        room: Option<i64>,
    },
    DeleteItem {
        item_id: i64,
    },
    /// Shuffled pass over one room, or every room. Enter/n: next, s: stop, r: restart, q: quit.
    Practice {
        #[arg(long)]
        room: Option<i64>,
        /// Note attached to every review recorded in this session.
        #[arg(long)]
        note: Option<String>,
        /// Walk the whole sequence without prompting.
        #[arg(long)]
        all: bool,
    },
    History {
        #[arg(long)]
        item: Option<i64>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    match run(cli, settings).await {
        Ok(()) => Ok(()),
        Err(err) if json => {
            println!("{}", serde_json::to_string(&report(&err))?);
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

async fn run(cli: Cli, settings: config::Settings) -> Result<()> {
    let raw_database_url = cli.database_url.as_deref().unwrap_or(&settings.database_url);
    let database_url = normalize_database_url(raw_database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    if settings.seed_sample_room && storage.seed_sample_room().await? {
        info!("created a sample room for the first run");
    }

    execute(&storage, cli.command, cli.json).await
}

async fn execute(storage: &Storage, command: Command, json: bool) -> Result<()> {
    match command {
        Command::AddRoom { name, description } => {
            let room_id = storage.add_room(&name, &description).await?;
            println!("created room_id={room_id}");
        }
        Command::ListRooms => {
            let rooms = storage.list_rooms().await?;
            output(json, &rooms, || render::room_table(&rooms))?;
        }
        Command::DeleteRoom { room_id } => {
            if !storage.delete_room(RoomId(room_id)).await? {
                bail!(StoreError::RoomNotFound(RoomId(room_id)));
            }
            println!("deleted room_id={room_id} and its items");
        }
        Command::AddItem {
            room_id,
            name,
            hint,
            image,
        } => {
            let item_id = storage
                .add_item(RoomId(room_id), &name, &hint, image.as_deref())
                .await?;
            println!("created item_id={item_id}");
        }
        Command::ListItems { room } => {
            let items = match room.map(RoomId) {
                Some(room_id) => storage
                    .list_room_items(room_id)
                    .await?
                    .ok_or(StoreError::RoomNotFound(room_id))?,
                None => storage.list_all_items().await?,
            };
            output(json, &items, || render::item_table(&items))?;
        }
        Command::DeleteItem { item_id } => {
            if !storage.delete_item(ItemId(item_id)).await? {
                bail!(StoreError::ItemNotFound(ItemId(item_id)));
            }
            println!("deleted item_id={item_id}");
        }
        Command::Practice { room, note, all } => {
            let mut session = PracticeLoop {
                controller: SessionController::new(storage.clone()),
                scope: room.map(RoomId),
                note,
                json,
                out: std::io::stdout(),
            };
            if all {
                session.run_to_end().await?;
            } else {
                session
                    .run_interactive(BufReader::new(tokio::io::stdin()))
                    .await?;
            }
        }
        Command::History { item, limit } => {
            let entries = storage.list_progress(item.map(ItemId), limit).await?;
            output(json, &entries, || render::history_table(&entries))?;
        }
    }

    Ok(())
}

fn output<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

fn report(err: &anyhow::Error) -> ReportedError {
    if let Some(practice) = err.downcast_ref::<PracticeError>() {
        return practice.into();
    }
    if let Some(store) = err.downcast_ref::<StoreError>() {
        return store.into();
    }
    ReportedError::new(ErrorCode::Storage, format!("{err:#}"))
}

/// Drives one practice session. In JSON mode `out` receives nothing but
/// one JSON object per shown item; status lines go to stderr instead.
struct PracticeLoop<W> {
    controller: SessionController<Storage>,
    scope: Option<RoomId>,
    note: Option<String>,
    json: bool,
    out: W,
}

impl<W: Write> PracticeLoop<W> {
    async fn begin(&mut self) -> Result<()> {
        let queued = self.controller.start(self.scope).await?;
        if !self.json {
            writeln!(self.out, "{}", render::session_started(self.scope, queued))?;
        }
        Ok(())
    }

    /// Pulls the next item and prints it. Returns `false` once the sequence is done.
    async fn step(&mut self) -> Result<bool> {
        match self.controller.advance_with_note(self.note.as_deref()).await? {
            Advance::Shown(shown) => {
                if self.json {
                    writeln!(self.out, "{}", serde_json::to_string(&shown.item)?)?;
                } else {
                    writeln!(self.out)?;
                    write!(self.out, "{}", render::item_card(&shown.item))?;
                }
                if let Some(fault) = shown.logging_fault {
                    eprintln!("warning: this review was not recorded: {fault}");
                }
                Ok(true)
            }
            Advance::Finished { shown } => {
                if !self.json {
                    writeln!(self.out, "{}", render::session_finished(shown))?;
                }
                Ok(false)
            }
        }
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        if self.json {
            eprintln!("{message}");
        } else {
            writeln!(self.out, "{message}")?;
        }
        Ok(())
    }

    async fn run_to_end(&mut self) -> Result<()> {
        self.begin().await?;
        while self.step().await? {}
        Ok(())
    }

    async fn run_interactive<R: AsyncBufRead + Unpin>(&mut self, input: R) -> Result<()> {
        self.begin().await?;
        self.step().await?;

        let mut lines = input.lines();
        loop {
            if !self.json {
                write!(self.out, "[Enter/n] next  [s] stop  [r] restart  [q] quit > ")?;
                self.out.flush()?;
            }

            let Some(line) = lines.next_line().await? else {
                self.controller.stop();
                break;
            };
            match line.trim() {
                "" | "n" if self.controller.is_active() => {
                    self.step().await?;
                }
                "" | "n" => {
                    self.notice("No practice running. Press r to start again or q to quit.")?;
                }
                "s" => {
                    self.controller.stop();
                    self.notice("Stopped.")?;
                }
                "r" => {
                    self.begin().await?;
                    self.step().await?;
                }
                "q" => {
                    self.controller.stop();
                    break;
                }
                other => self.notice(&format!("Unknown command '{other}'."))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
