//! Ownership regions for message storage.

mod cache;

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use self::cache::IdentityCache;
use crate::{
    dynamic::{Block, MessageHandle},
    minitable::MiniTable,
};

static NEXT_ARENA_ID: AtomicUsize = AtomicUsize::new(0);

/// An ownership region holding the storage of [`DynamicMessage`][crate::DynamicMessage]s.
///
/// Every message is allocated in an arena, and its storage stays valid for as long as the arena
/// or any arena [fused](Arena::fuse) to it is alive. Sub-messages set on a message are shared with
/// the parent when both live in the same fused group, and copied into the parent's arena
/// otherwise.
///
/// `Arena` is a cheap handle: cloning it refers to the same region.
#[derive(Clone)]
pub struct Arena {
    node: Arc<ArenaNode>,
}

struct ArenaNode {
    id: usize,
    // The heap this arena was created with, or a heap further up its fused group.
    heap: Mutex<Arc<Heap>>,
}

struct Heap {
    state: Mutex<HeapState>,
}

#[derive(Default)]
struct HeapState {
    // Set once this heap has been fused into another. All regions live in the root.
    parent: Option<Arc<Heap>>,
    regions: Vec<Region>,
    cache: IdentityCache,
}

struct Region {
    owner: usize,
    blocks: Vec<Arc<Block>>,
    bytes: usize,
}

impl Arena {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Arena {
            node: Arc::new(ArenaNode {
                id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
                heap: Mutex::new(Arc::new(Heap {
                    state: Mutex::new(HeapState::default()),
                })),
            }),
        }
    }

    /// Joins the lifetimes of this arena and `other`.
    ///
    /// After fusing, storage allocated in either arena stays alive until every arena in the fused
    /// group has been dropped. Fusing is irreversible, and fusing two arenas which are already
    /// fused does nothing.
    pub fn fuse(&self, other: &Arena) {
        loop {
            let left = self.root();
            let right = other.root();
            if Arc::ptr_eq(&left, &right) {
                return;
            }

            let (first, second) = if Arc::as_ptr(&left) < Arc::as_ptr(&right) {
                (left, right)
            } else {
                (right, left)
            };

            let mut first_state = lock(&first.state);
            let mut second_state = lock(&second.state);
            if first_state.parent.is_some() || second_state.parent.is_some() {
                // Another thread fused one of these heaps while we were finding the roots.
                continue;
            }

            let regions = std::mem::take(&mut second_state.regions);
            first_state.regions.extend(regions);
            let cache = std::mem::take(&mut second_state.cache);
            first_state.cache.absorb(cache);
            second_state.parent = Some(first.clone());

            tracing::debug!(
                regions = first_state.regions.len(),
                messages = first_state.message_count(),
                "fused arenas"
            );
            return;
        }
    }

    /// Returns `true` if this arena and `other` are the same arena, or have been fused together.
    pub fn is_fused(&self, other: &Arena) -> bool {
        Arc::ptr_eq(&self.node, &other.node) || Arc::ptr_eq(&self.root(), &other.root())
    }

    /// Gets the number of bytes reserved for message storage by this arena and every arena fused
    /// to it.
    pub fn space_allocated(&self) -> usize {
        self.with_root(|state| state.regions.iter().map(|region| region.bytes).sum())
    }

    /// Gets the number of messages allocated by this arena and every arena fused to it.
    pub fn message_count(&self) -> usize {
        self.with_root(|state| state.message_count())
    }

    /// Allocates an empty message block laid out by `table`.
    pub(crate) fn alloc(&self, table: Arc<MiniTable>) -> Arc<Block> {
        let bytes = Block::footprint(&table);
        let block = Arc::new(Block::new(table));
        self.with_root(|state| {
            let region = match state
                .regions
                .iter()
                .position(|region| region.owner == self.node.id)
            {
                Some(index) => &mut state.regions[index],
                None => {
                    state.regions.push(Region {
                        owner: self.node.id,
                        blocks: Vec::new(),
                        bytes: 0,
                    });
                    state.regions.last_mut().expect("region just pushed")
                }
            };
            region.blocks.push(block.clone());
            region.bytes += bytes;
        });
        block
    }

    /// Gets the handle for `block`, reusing the existing one if a live handle for the same
    /// storage is already known to this arena's fused group.
    pub(crate) fn wrap(&self, block: Arc<Block>) -> Arc<MessageHandle> {
        self.with_root(|state| {
            let key = Arc::as_ptr(&block) as usize;
            if let Some(handle) = state.cache.get(key) {
                return handle;
            }

            let handle = Arc::new(MessageHandle::new(self.clone(), block));
            state.cache.insert(key, &handle);
            handle
        })
    }

    fn root(&self) -> Arc<Heap> {
        let mut heap = lock(&self.node.heap);
        let mut root = heap.clone();
        loop {
            let parent = lock(&root.state).parent.clone();
            match parent {
                Some(parent) => root = parent,
                None => break,
            }
        }
        if !Arc::ptr_eq(&heap, &root) {
            *heap = root.clone();
        }
        root
    }

    fn with_root<R>(&self, f: impl FnOnce(&mut HeapState) -> R) -> R {
        loop {
            let root = self.root();
            let mut state = lock(&root.state);
            if state.parent.is_none() {
                return f(&mut state);
            }
        }
    }
}

impl HeapState {
    fn message_count(&self) -> usize {
        self.regions.iter().map(|region| region.blocks.len()).sum()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.node.id)
            .field("message_count", &self.message_count())
            .field("space_allocated", &self.space_allocated())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
