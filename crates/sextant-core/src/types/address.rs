//! File address and address range types.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed file address
///
/// This wrapper around `u64` provides type safety when working with addresses
/// taken from debug info. It prevents accidentally mixing addresses with other
/// `u64` values (like sizes, file indexes, or other numeric types).
///
/// Addresses in this crate are *file* addresses: the values recorded in the
/// binary's debug info, before any loader slide is applied. Mapping to a live
/// process is a different layer's job.
///
/// ## Example
///
/// ```rust
/// use sextant_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100; // Add offset
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// This is typically an invalid address on most systems, but can be used
    /// as a sentinel value or for initialization.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// This is equivalent to `Address::from(value)` but can be used in const contexts.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use sextant_core::types::Address;
    ///
    /// const TEXT_BASE: Address = Address::new(0x100000000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    ///
    /// ## Example
    ///
    /// ```rust
    /// use sextant_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.value(), 0x1000);
    /// ```
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// Returns `Some(new_address)` if the addition doesn't overflow, or `None` if it does.
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    ///
    /// Returns `Some(new_address)` if the subtraction doesn't underflow, or `None` if it does.
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Add an offset to this address, saturating at the maximum value
    ///
    /// If the addition would overflow, returns `Address::new(u64::MAX)` instead.
    pub fn saturating_add(self, offset: u64) -> Self
    {
        Address(self.0.saturating_add(offset))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}

/// A half-open range of file addresses: `[base, base + size)`
///
/// Line entries, functions, and lexical blocks all describe the machine code
/// they cover with one or more of these ranges. A zero-sized range contains
/// no addresses.
///
/// ## Example
///
/// ```rust
/// use sextant_core::types::{Address, AddressRange};
///
/// let range = AddressRange::new(Address::new(0x1000), 0x20);
/// assert!(range.contains(Address::new(0x101f)));
/// assert!(!range.contains(Address::new(0x1020))); // End is exclusive
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AddressRange
{
    base: Address,
    size: u64,
}

impl AddressRange
{
    /// Create a range starting at `base` and covering `size` bytes.
    pub const fn new(base: Address, size: u64) -> Self
    {
        AddressRange { base, size }
    }

    /// The first address in the range.
    pub const fn base(self) -> Address
    {
        self.base
    }

    /// The number of bytes the range covers.
    pub const fn size(self) -> u64
    {
        self.size
    }

    /// One past the last address in the range (saturating).
    pub fn end(self) -> Address
    {
        self.base.saturating_add(self.size)
    }

    /// Whether `address` falls inside the range. Zero-sized ranges contain nothing.
    pub fn contains(self, address: Address) -> bool
    {
        address >= self.base && address < self.end()
    }
}

impl fmt::Display for AddressRange
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[{}, {})", self.base, self.end())
    }
}
