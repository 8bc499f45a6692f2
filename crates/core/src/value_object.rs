//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attributes. In this
/// workspace they are `Capability` (`sales:approve`) and the workflow's
/// `DocumentStatus` and `PaymentStatus`: two instances with the same values
/// are the same thing.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
