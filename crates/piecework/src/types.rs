//! # Common Types and Traits

use core::{
    fmt::{Debug, Display},
    hash::Hash,
};

use num_traits::{FromPrimitive, PrimInt, ToPrimitive, Unsigned};

/// A type that can be used as a token id.
///
/// These are constrained to be unsigned primitive integers;
/// such that the max token id in a vocabulary is less than `T::max()`.
pub trait TokenType:
    'static
    + PrimInt
    + FromPrimitive
    + ToPrimitive
    + Unsigned
    + Hash
    + Default
    + Debug
    + Display
    + Send
    + Sync
{
}

impl<T> TokenType for T where
    T: 'static
        + PrimInt
        + FromPrimitive
        + ToPrimitive
        + Unsigned
        + Hash
        + Default
        + Debug
        + Display
        + Send
        + Sync
{
}

/// A pair of adjacent symbols.
pub type Pair<T> = (T, T);

/// Type alias for hash maps in this crate.
pub type PwHashMap<K, V> = ahash::AHashMap<K, V>;

/// Compile-time check that a value is `Send`.
pub fn check_is_send<T: Send>(_value: &T) {}

/// Compile-time check that a value is `Sync`.
pub fn check_is_sync<T: Sync>(_value: &T) {}
