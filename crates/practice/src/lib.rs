//! Practice session engine: turns a set of items into a review stream and
//! records every item shown.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{Item, ItemId, ProgressEvent, RoomId},
    error::StoreError,
};

mod sequencer;
mod session;

pub use sequencer::{SequencePolicy, Sequencer};
pub use session::{Advance, SessionController, Shown};

/// The slice of the entity store the engine depends on.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Items of `room_id` in insertion order, or every item when `room_id` is `None`.
    ///
    /// A room that does not exist is `StoreError::RoomNotFound`, not an empty list.
    async fn list_items(&self, room_id: Option<RoomId>) -> Result<Vec<Item>, StoreError>;

    /// Appends a review record for `item_id`. The store assigns the timestamp.
    async fn append_progress_event(
        &self,
        item_id: ItemId,
        note: Option<&str>,
    ) -> Result<ProgressEvent, StoreError>;
}

#[async_trait]
impl<T: EntityStore + ?Sized> EntityStore for Arc<T> {
    async fn list_items(&self, room_id: Option<RoomId>) -> Result<Vec<Item>, StoreError> {
        (**self).list_items(room_id).await
    }

    async fn append_progress_event(
        &self,
        item_id: ItemId,
        note: Option<&str>,
    ) -> Result<ProgressEvent, StoreError> {
        (**self).append_progress_event(item_id, note).await
    }
}
