//! Streaming results: world-list enumeration and per-cell object queries.
//!
//! Both are single-pass sequences fed by the router and closed by their
//! terminal wire signal. The registry is the meeting point: request code
//! registers a sender, the router pushes into it, the terminal callback or
//! event drops it, and the consumer observes channel closure as the end.

use crate::entities::{Object, World};
use crate::types::Cell;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

#[derive(Default)]
pub(crate) struct StreamRegistry {
    world: Mutex<Option<mpsc::UnboundedSender<World>>>,
    cells: DashMap<Cell, mpsc::UnboundedSender<Object>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the world-list lane. The caller holds the enumeration gate, so
    /// any previous sender here belongs to a finished or abandoned pass.
    pub fn begin_world_stream(&self) -> mpsc::UnboundedReceiver<World> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.world.lock() = Some(tx);
        rx
    }

    pub fn push_world(&self, world: World) {
        let sender = self.world.lock().clone();
        match sender {
            Some(tx) => {
                if tx.send(world).is_err() {
                    debug!("world stream consumer gone, dropping listed world");
                }
            }
            None => debug!("listed world arrived outside an enumeration, dropping"),
        }
    }

    /// Terminal world-list callback: close the lane.
    pub fn end_world_stream(&self) {
        *self.world.lock() = None;
    }

    /// Open an object lane for one cell. A live lane for the same cell
    /// means a query is already streaming.
    pub fn begin_cell_stream(
        &self,
        cell: Cell,
    ) -> Result<mpsc::UnboundedReceiver<Object>, &'static str> {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.cells.entry(cell) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if entry.get().is_closed() {
                    entry.insert(tx);
                    Ok(rx)
                } else {
                    Err("cell query")
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Route a bulk-loaded object to the lane of its cell.
    pub fn push_cell_object(&self, object: Object) {
        let cell = object.cell();
        match self.cells.get(&cell) {
            Some(tx) => {
                if tx.send(object).is_err() {
                    debug!(?cell, "cell stream consumer gone, dropping object");
                }
            }
            None => debug!(?cell, "bulk-loaded object without a pending query, dropping"),
        }
    }

    pub fn end_cell_stream(&self, cell: Cell) {
        self.cells.remove(&cell);
    }

    /// Close every open lane (disconnect path).
    pub fn fail_all(&self) {
        *self.world.lock() = None;
        self.cells.clear();
    }
}

/// Lazy single-pass sequence of listed worlds.
///
/// Each world the universe reports appears exactly once, in arrival order.
/// The guard serializes enumerations: a second caller blocks until this
/// stream is dropped.
pub struct WorldStream {
    rx: mpsc::UnboundedReceiver<World>,
    _gate: OwnedMutexGuard<()>,
}

impl WorldStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<World>, gate: OwnedMutexGuard<()>) -> Self {
        Self { rx, _gate: gate }
    }

    /// Next listed world, or `None` once the enumeration is complete.
    pub async fn next(&mut self) -> Option<World> {
        self.rx.recv().await
    }

    /// Drain the remaining worlds into a `Vec`.
    pub async fn collect(mut self) -> Vec<World> {
        let mut worlds = Vec::new();
        while let Some(world) = self.next().await {
            worlds.push(world);
        }
        worlds
    }
}

/// Single-pass sequence of one cell's objects.
pub struct ObjectStream {
    cell: Cell,
    rx: mpsc::UnboundedReceiver<Object>,
}

impl ObjectStream {
    pub(crate) fn new(cell: Cell, rx: mpsc::UnboundedReceiver<Object>) -> Self {
        Self { cell, rx }
    }

    /// The queried cell.
    #[must_use]
    pub fn cell(&self) -> Cell {
        self.cell
    }

    /// Next object, or `None` once the query has finished.
    pub async fn next(&mut self) -> Option<Object> {
        self.rx.recv().await
    }

    /// Drain the remaining objects into a `Vec`.
    pub async fn collect(mut self) -> Vec<Object> {
        let mut objects = Vec::new();
        while let Some(object) = self.next().await {
            objects.push(object);
        }
        objects
    }
}
