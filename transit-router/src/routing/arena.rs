//! Label storage reused across queries.
//!
//! A search allocates many small labels. Each query checks an arena out of
//! the router's pool, clears it and hands it back when done, so the
//! allocations of one query serve the next.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use super::label::{Label, LabelId};

/// Labels of one search plus the labels currently alive at each node.
#[derive(Debug, Default)]
pub struct LabelArena {
    labels: Vec<Label>,
    node_labels: Vec<Vec<LabelId>>,
}

impl LabelArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            labels: Vec::with_capacity(capacity),
            node_labels: Vec::new(),
        }
    }

    /// Forget all labels and size the node lists for `node_count` nodes.
    pub fn reset(&mut self, node_count: usize) {
        self.labels.clear();
        for list in &mut self.node_labels {
            list.clear();
        }
        self.node_labels.resize_with(node_count, Vec::new);
    }

    pub fn push(&mut self, label: Label) -> LabelId {
        let id = LabelId(self.labels.len() as u32);
        self.labels.push(label);
        id
    }

    pub fn get(&self, id: LabelId) -> &Label {
        &self.labels[id.index()]
    }

    pub fn get_mut(&mut self, id: LabelId) -> &mut Label {
        &mut self.labels[id.index()]
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn node_labels(&self, node: usize) -> &[LabelId] {
        self.node_labels.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_labels_mut(&mut self, node: usize) -> &mut Vec<LabelId> {
        if node >= self.node_labels.len() {
            self.node_labels.resize_with(node + 1, Vec::new);
        }
        &mut self.node_labels[node]
    }

    /// Walk the chain from `id` back to its start label.
    pub fn chain(&self, id: LabelId) -> impl Iterator<Item = &Label> + '_ {
        let mut current = Some(id);
        std::iter::from_fn(move || {
            let label = self.labels.get(current?.index())?;
            current = label.pred;
            Some(label)
        })
    }
}

/// A bounded set of idle arenas shared by concurrent queries.
#[derive(Debug)]
pub struct ArenaPool {
    idle: Mutex<Vec<LabelArena>>,
    max_idle: usize,
    capacity: usize,
}

impl ArenaPool {
    pub fn new(max_idle: usize, capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            capacity,
        }
    }

    /// Take an idle arena, or allocate one, prepared for `node_count` nodes.
    pub fn checkout(&self, node_count: usize) -> ArenaGuard<'_> {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop();
        let mut arena = reused.unwrap_or_else(|| LabelArena::with_capacity(self.capacity));
        arena.reset(node_count);
        ArenaGuard {
            pool: self,
            arena: Some(arena),
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn give_back(&self, arena: LabelArena) {
        let mut idle = self
            .idle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if idle.len() < self.max_idle {
            idle.push(arena);
        }
    }
}

/// An arena on loan from a pool. Returned when dropped.
pub struct ArenaGuard<'a> {
    pool: &'a ArenaPool,
    arena: Option<LabelArena>,
}

impl Deref for ArenaGuard<'_> {
    type Target = LabelArena;

    fn deref(&self) -> &LabelArena {
        // only `drop` takes the arena out
        self.arena.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for ArenaGuard<'_> {
    fn deref_mut(&mut self) -> &mut LabelArena {
        self.arena.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for ArenaGuard<'_> {
    fn drop(&mut self) {
        if let Some(arena) = self.arena.take() {
            self.pool.give_back(arena);
        }
    }
}
