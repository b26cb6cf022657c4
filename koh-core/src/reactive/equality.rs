//! Same-value equality for signal writes.
//!
//! A write only stores and notifies when the new value is not the "same
//! value" as the current one. For plain data this is value equality; floats
//! follow `Object.is` rules (NaN equals NaN, `0.0` and `-0.0` differ);
//! handles (signals, records, `Arc`s) compare by identity, so a record whose
//! fields were edited in place is still the same record.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Equality used to decide whether a write is a change.
pub trait SameValue {
    /// Whether `other` is the same value as `self`.
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_by_eq!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, String,
    &'static str,
);

impl SameValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
    }
}

impl SameValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        (self.is_nan() && other.is_nan()) || self.to_bits() == other.to_bits()
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<T: ?Sized> SameValue for Arc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<A: SameValue, B: SameValue> SameValue for (A, B) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1)
    }
}

/// Stable identity of a reactive handle.
///
/// Survives clones and in-place field edits, and is what the list
/// reconciler keys its output nodes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(u64);

impl Identity {
    /// Allocate a fresh identity.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw identity value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handles with a stable identity.
pub trait HasIdentity {
    fn identity(&self) -> Identity;
}

impl<T: HasIdentity> HasIdentity for &T {
    fn identity(&self) -> Identity {
        (**self).identity()
    }
}
