//! Change notifications published by the store.
//!
//! Consumers that render recipe or profile state subscribe once and refresh
//! whenever an event arrives. Events are only emitted after the change has
//! been committed and the store's cache rebuilt.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::RecipeId;

/// Number of undelivered events a slow subscriber may fall behind by before
/// it starts missing events.
pub const EVENT_CAPACITY: usize = 64;

/// A committed change to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A recipe was created.
    RecipeAdded {
        /// The new recipe.
        id: RecipeId,
    },
    /// A recipe's fields or image changed.
    RecipeUpdated {
        /// The edited recipe.
        id: RecipeId,
    },
    /// A recipe was removed.
    RecipeDeleted {
        /// The removed recipe.
        id: RecipeId,
    },
    /// A recipe's favorite flag flipped.
    FavoriteToggled {
        /// The recipe.
        id: RecipeId,
        /// The flag after the change.
        is_favorite: bool,
    },
    /// The profile was edited.
    ProfileUpdated,
}

/// Fan-out of [`StoreEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a bus with [`EVENT_CAPACITY`] slots.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Register a new subscriber. It receives events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: StoreEvent) {
        tracing::trace!(?event, "Publishing store event");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
