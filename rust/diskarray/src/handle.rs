//! The element handle returned by reads.

use std::{fmt, ops::Deref};

/// An element read from a [`DiskArray`](crate::DiskArray).
///
/// Resident elements are returned as [`ElementRef::Borrowed`] references into the
/// in-memory buffer. Spilled elements are reconstructed from disk and returned as
/// [`ElementRef::Owned`] values that are dropped together with the handle. Either
/// way, the handle dereferences to `T`.
///
/// A borrowed handle keeps the array immutably borrowed, so no append or spill can
/// happen while it is alive.
pub enum ElementRef<'a, T> {
    Borrowed(&'a T),
    Owned(T),
}

impl<T> ElementRef<'_, T> {
    /// Returns `true` if the element was reconstructed from the spill files.
    pub fn is_owned(&self) -> bool {
        matches!(self, ElementRef::Owned(_))
    }

    /// Returns `true` if the element is a reference into the resident buffer.
    pub fn is_borrowed(&self) -> bool {
        matches!(self, ElementRef::Borrowed(_))
    }

    /// Extracts the owned element, cloning it if it is borrowed.
    pub fn into_owned(self) -> T
    where
        T: Clone,
    {
        match self {
            ElementRef::Borrowed(element) => element.clone(),
            ElementRef::Owned(element) => element,
        }
    }
}

impl<T> Deref for ElementRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            ElementRef::Borrowed(element) => element,
            ElementRef::Owned(element) => element,
        }
    }
}

impl<T> AsRef<T> for ElementRef<'_, T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for ElementRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Borrowed(element) => f.debug_tuple("Borrowed").field(element).finish(),
            ElementRef::Owned(element) => f.debug_tuple("Owned").field(element).finish(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for ElementRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

/// Compares the referenced elements, regardless of ownership.
impl<'b, T: PartialEq> PartialEq<ElementRef<'b, T>> for ElementRef<'_, T> {
    fn eq(&self, other: &ElementRef<'b, T>) -> bool {
        **self == **other
    }
}
