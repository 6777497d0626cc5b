//! The operand stack.
//!
//! One mapped region, low to high:
//!
//! ```text
//! [ guard page | usable pages ... | slack page ]
//!                                 ^ limit
//! ```
//!
//! The stack grows down from `limit`, one 8-byte word per value, and `top`
//! points at the word holding the top value. Generated code keeps the top
//! value in a register, so entering and leaving a unit touches one word above
//! the top even when the stack is empty; that word lives in the slack page.
//! Running past the usable pages hits the inaccessible guard page.

use crate::common::memory::{page_size, MappedRegion, Protection};
use crate::error::{Error, Result};

const WORD: usize = core::mem::size_of::<i64>();

#[derive(Debug)]
pub struct OperandStack {
    region: MappedRegion,
    limit: *mut i64,
    top: *mut i64,
    capacity: usize,
}

impl OperandStack {
    /// Map a stack with `pages` usable pages.
    pub fn new(pages: usize) -> Result<Self> {
        if pages < 2 {
            return Err(Error::InvalidConfig(format!(
                "operand stack needs at least 2 pages, got {}",
                pages
            )));
        }
        let page = page_size();
        let mut region = MappedRegion::map((pages + 2) * page)?;
        region.protect(0, page, Protection::None)?;
        // SAFETY: the offset is inside the mapping, below the slack page.
        let limit = unsafe { region.as_ptr().add((pages + 1) * page) } as *mut i64;
        Ok(Self {
            region,
            limit,
            top: limit,
            capacity: pages * page / WORD,
        })
    }

    pub fn top(&self) -> *mut i64 {
        self.top
    }

    pub fn limit(&self) -> *mut i64 {
        self.limit
    }

    /// Number of values on the stack.
    pub fn depth(&self) -> usize {
        (self.limit as usize - self.top as usize) / WORD
    }

    /// Maximum number of values the stack can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.top == self.limit
    }

    /// The stack contents, bottom first.
    pub fn values(&self) -> Vec<i64> {
        // SAFETY: `top..limit` lies in the usable pages and every word there
        // was written by generated code or `push`.
        let words = unsafe { std::slice::from_raw_parts(self.top, self.depth()) };
        words.iter().rev().copied().collect()
    }

    /// Push a value from the host side.
    pub fn push(&mut self, value: i64) -> Result<()> {
        if self.depth() >= self.capacity {
            return Err(Error::StackOverflow {
                required: self.depth() + 1,
                capacity: self.capacity,
            });
        }
        // SAFETY: depth < capacity, so the word below `top` is usable.
        unsafe {
            self.top = self.top.sub(1);
            self.top.write(value);
        }
        Ok(())
    }

    /// Slide the stack contents up and put `count` zeros beneath the bottom
    /// value.
    pub fn pad_bottom(&mut self, count: usize) -> Result<()> {
        let depth = self.depth();
        if depth + count > self.capacity {
            return Err(Error::StackOverflow {
                required: depth + count,
                capacity: self.capacity,
            });
        }
        // SAFETY: both ranges lie in the usable pages since the new depth
        // fits the capacity; `copy` allows the overlap.
        unsafe {
            let top = self.top.sub(count);
            std::ptr::copy(self.top, top, depth);
            std::ptr::write_bytes(self.limit.sub(count), 0, count);
            self.top = top;
        }
        Ok(())
    }

    /// Adopt the top pointer returned by generated code.
    ///
    /// A pointer above `limit` is clamped to it; returns whether that
    /// happened.
    pub fn set_top(&mut self, top: *mut i64) -> bool {
        debug_assert!(top as usize >= self.region.as_ptr() as usize + page_size());
        if top > self.limit {
            self.top = self.limit;
            true
        } else {
            self.top = top;
            false
        }
    }

    pub fn clear(&mut self) {
        self.top = self.limit;
    }
}
