//! Per-frame allocation.

use std::mem;
use std::sync::Mutex;
use typed_arena::Arena;

const DEFAULT_CAPACITY: usize = 64;

/// Bump allocator for values that live until the end of the current frame.
///
/// Works like the per-lifetime resource arenas of a renderer backend: values are
/// allocated behind a shared reference and all released at once. [reset](FrameArena::reset)
/// takes `&mut self`, so the borrow checker proves that no reference handed out by
/// [alloc](FrameArena::alloc) survives the release point.
pub struct FrameArena<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
}

struct Inner<T> {
    arena: Arena<T>,
    len: usize,
}

impl<T> FrameArena<T> {
    pub fn new() -> FrameArena<T> {
        FrameArena::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` is the number of values the first chunk can hold before the arena
    /// grows. Growth never moves values that were already allocated.
    pub fn with_capacity(capacity: usize) -> FrameArena<T> {
        FrameArena {
            inner: Mutex::new(Inner {
                arena: Arena::with_capacity(capacity),
                len: 0,
            }),
            capacity,
        }
    }

    /// Stores `value` until the next reset.
    pub fn alloc(&self, value: T) -> &mut T {
        let mut inner = self.inner.lock().unwrap();
        inner.len += 1;
        // The arena never moves its chunks, and reset requires `&mut self`, so the
        // reference stays valid for as long as `self` is only borrowed shared.
        unsafe { mem::transmute::<&mut T, &mut T>(inner.arena.alloc(value)) }
    }

    /// Number of values allocated since the last reset.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every allocation and returns the backing memory to the allocator, keeping
    /// only the configured initial capacity.
    pub fn reset(&mut self) {
        let inner = self.inner.get_mut().unwrap();
        inner.arena = Arena::with_capacity(self.capacity);
        inner.len = 0;
    }
}
