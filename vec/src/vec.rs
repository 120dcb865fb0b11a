extern crate alloc as crate_alloc;

use core::alloc::Layout;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use core::{fmt, mem, ptr, slice};

use crate_alloc::alloc;

use crate::arena::{Arena, NodeId};

/// Growable contiguous array of fixed-size elements.
///
/// Appending and popping never move the other elements, so handles handed
/// out by [`Array::push_node`] stay valid across them. [`Array::insert`],
/// [`Array::remove`] and [`Array::swap_remove`] do move elements and must not
/// be used while any of them is linked into a container.
pub struct Array<T> {
    // INVARIANTS:
    //  * `len <= cap` and `cap * size_of::<T>() <= isize::MAX`
    //  * the first `len` slots of `buf` hold initialized values
    //  * `buf` points to an allocation of `cap` `T`s, or is dangling when `cap == 0`
    buf: NonNull<T>,
    len: usize,
    cap: usize,
    marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for Array<T> {}
unsafe impl<T: Sync> Sync for Array<T> {}

impl<T> fmt::Debug for Array<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("len", &self.len)
            .field("cap", &self.cap)
            .field("items", &self.as_slice())
            .finish()
    }
}

impl<T> Drop for Array<T> {
    fn drop(&mut self) {
        if self.cap == 0 {
            return;
        }

        /// Keeps dropping elements and frees the buffer even if some `T::drop` panics.
        ///
        /// A second panic while unwinding aborts.
        struct Guard<'a, U>(&'a mut Array<U>);

        impl<U> Drop for Guard<'_, U> {
            fn drop(&mut self) {
                while self.0.pop().is_some() {}

                let layout = self.0.layout();
                self.0.cap = 0;
                let buf = mem::replace(&mut self.0.buf, NonNull::dangling());

                // SAFETY: `buf` was allocated by the global allocator with `layout`
                unsafe { alloc::dealloc(buf.as_ptr().cast::<u8>(), layout) };
            }
        }

        let g = Guard(self);
        while g.0.pop().is_some() {}
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for Array<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for Array<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Arena for Array<T> {
    type Node = T;

    #[inline]
    fn node(&self, id: NodeId) -> Option<&T> {
        self.get(id.index())
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_mut(id.index())
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut a = Self::with_capacity(iter.size_hint().0);
        for val in iter {
            a.push(val);
        }
        a
    }
}

impl<T> Array<T> {
    const INITIAL_CAP: usize = 2;

    pub fn new() -> Self {
        assert!(mem::size_of::<T>() != 0, "zero sized elements are not supported");
        Self {
            buf: NonNull::dangling(),
            len: 0,
            cap: 0,
            marker: PhantomData,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        let mut a = Self::new();
        a.grow_to(cap);
        a
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Makes room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        let needed = self
            .len
            .checked_add(additional)
            .expect("capacity overflow");
        if needed > self.cap {
            self.grow_to(needed.max(self.cap * 2));
        }
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `buf` is non-null and aligned (dangling is fine for an empty
        // slice) and its first `len` slots are initialized
        unsafe { slice::from_raw_parts(self.buf.as_ptr().cast_const(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: same as `as_slice`, `&mut self` guarantees exclusive access
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    pub fn push(&mut self, val: T) {
        if self.len == self.cap {
            self.grow();
        }

        debug_assert!(self.len < self.cap);
        // SAFETY: slot `len` is inside the buffer and currently uninitialized
        unsafe {
            self.write_at(self.len, val);
            self.set_len(self.len + 1);
        }
    }

    /// Appends `val` and returns the handle that addresses it.
    pub fn push_node(&mut self, val: T) -> NodeId {
        let id = NodeId::new(self.len);
        self.push(val);
        id
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        self.len -= 1;
        // SAFETY: slot `len` was the last initialized one and is now outside
        // the initialized prefix, so it is read exactly once
        Some(unsafe { self.read_at(self.len) })
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        // SAFETY: `index < len`, the slot is initialized
        unsafe { Some(&*self.slot(index)) }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }

        // SAFETY: `index < len`, the slot is initialized and `&mut self` is exclusive
        unsafe { Some(&mut *self.slot(index)) }
    }

    /// Inserts `val` at `index`, shifting the tail up by one.
    ///
    /// Returns the value back if `index > len`.
    pub fn insert(&mut self, index: usize, val: T) -> Result<(), T> {
        if index > self.len {
            return Err(val);
        }

        if self.len == self.cap {
            self.grow();
        }

        let tail = self.len - index;
        // SAFETY:
        //  * `[index, len)` is initialized
        //  * there is room for one more element, so `[index + 1, len + 1)` is writable
        //  * afterwards the gap at `index` is filled and `len + 1` slots are initialized
        unsafe {
            if tail > 0 {
                self.shift(index, tail, 1);
            }
            self.write_at(index, val);
            self.set_len(self.len + 1);
        }

        Ok(())
    }

    /// Removes the element at `index`, shifting the tail down by one.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }

        // SAFETY: `index < len`; the slot is overwritten by the shift below
        // or falls outside the initialized prefix, so it is never read again
        let val = unsafe { self.read_at(index) };
        self.len -= 1;
        let tail = self.len - index;
        if tail > 0 {
            // SAFETY: `[index + 1, index + 1 + tail)` was initialized before the read
            unsafe { self.shift(index + 1, tail, -1) };
        }

        Some(val)
    }

    /// Removes the element at `index` and moves the last element into its place.
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }

        let last = self.len - 1;
        self.as_mut_slice().swap(index, last);
        self.pop()
    }

    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }

    /// # SAFETY
    ///
    /// * the first `new_len` slots must be initialized
    unsafe fn set_len(&mut self, new_len: usize) {
        self.len = new_len;
    }

    /// # SAFETY
    ///
    /// * `index < self.cap`
    #[inline]
    unsafe fn slot(&self, index: usize) -> *mut T {
        // SAFETY: the offset stays inside the allocation, which is at most isize::MAX bytes
        unsafe { self.buf.as_ptr().add(index) }
    }

    /// # SAFETY
    ///
    /// * `index < self.cap` and the slot holds no live value
    unsafe fn write_at(&mut self, index: usize, val: T) {
        unsafe { self.slot(index).write(val) };
    }

    /// # SAFETY
    ///
    /// * the slot at `index` is initialized and is never read again afterwards
    unsafe fn read_at(&mut self, index: usize) -> T {
        unsafe { self.slot(index).read() }
    }

    /// Moves `count` elements starting at `start` by `amount` slots.
    ///
    /// # SAFETY
    ///
    /// * `[start, start + count)` is initialized
    /// * `[start + amount, start + amount + count)` lies inside the buffer
    unsafe fn shift(&mut self, start: usize, count: usize, amount: isize) {
        unsafe {
            let src = self.slot(start);
            let dst = src.offset(amount);
            // ranges may overlap
            ptr::copy(src, dst, count);
        }
    }

    #[inline]
    fn layout(&self) -> Layout {
        // Already validated when the buffer was allocated
        Layout::array::<T>(self.cap).expect("layout of an allocated buffer")
    }

    fn grow_to(&mut self, new_cap: usize) {
        if new_cap <= self.cap {
            return;
        }

        let new_layout = Layout::array::<T>(new_cap).expect("capacity overflow");
        let buf = if self.cap == 0 {
            // SAFETY: `new_cap > 0` and `T` is not zero sized, so the layout is non-zero
            unsafe { alloc::alloc(new_layout) }
        } else {
            // SAFETY:
            //  * `buf` was allocated by the global allocator with `self.layout()`
            //  * the new size is non-zero and `Layout::array` bounded it by isize::MAX
            unsafe {
                alloc::realloc(
                    self.buf.as_ptr().cast::<u8>(),
                    self.layout(),
                    new_layout.size(),
                )
            }
        };

        match NonNull::new(buf.cast::<T>()) {
            Some(buf) => {
                self.buf = buf;
                self.cap = new_cap;
            }
            None => alloc::handle_alloc_error(new_layout),
        }
    }

    fn grow(&mut self) {
        let new_cap = if self.cap == 0 {
            Self::INITIAL_CAP
        } else {
            // `Layout::array` keeps `cap` below isize::MAX, so doubling cannot overflow
            self.cap * 2
        };
        self.grow_to(new_cap);
    }
}
