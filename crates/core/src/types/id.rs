//! Newtype IDs for type-safe entity references.
//!
//! The catalog backend hands out numeric ids for every collection entry;
//! the `define_id!` macro wraps those in distinct types so a user id can
//! never be passed where an order id is expected. String-shaped
//! identifiers (file-storage ids, order correlation references) get their
//! own wrappers below.

/// Macro to define a type-safe numeric ID wrapper.
///
/// Creates a newtype around `i32` (the catalog backend's id type) with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - `new()`, `as_i32()`, `Display`, and `From` conversions
///
/// # Example
///
/// ```rust
/// # use paperstack_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::new(7);
/// // WidgetId and GadgetId are distinct types; mixing them won't compile.
/// assert_eq!(widget.as_i32(), 7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Catalog collection ids
define_id!(UserId);
define_id!(ProductId);
define_id!(CategoryId);
define_id!(SubCategoryId);
define_id!(OrderId);
define_id!(OrderItemId);

/// Identifier of a delivered file in the file-storage provider.
///
/// The same value keys the product in the catalog (`Product::file_id`),
/// the permission grant, and the viewer link, so it gets a real type
/// rather than a bare `String`.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ::serde::Serialize, ::serde::Deserialize,
)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Wrap a raw file-storage id.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for FileId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for FileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for FileId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Correlation key tying a catalog order to its payment invoice.
///
/// Generated once at checkout and shared verbatim with the invoicing
/// provider as its `external_id`, so the payment webhook can find the
/// order again.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize,
)]
#[serde(transparent)]
pub struct OrderReference(String);

impl OrderReference {
    /// Wrap an existing reference (e.g. one echoed back by a webhook).
    #[must_use]
    pub const fn new(reference: String) -> Self {
        Self(reference)
    }

    /// Derive a reference from a Unix-millisecond timestamp.
    ///
    /// Locally unique as long as two checkouts do not land on the same
    /// millisecond; the invoicing provider additionally rejects duplicate
    /// external ids.
    #[must_use]
    pub fn from_timestamp_millis(millis: i64) -> Self {
        Self(format!("order-{millis}"))
    }

    /// The reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderReference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderReference {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id_roundtrip() {
        let id = OrderId::new(42);
        assert_eq!(id.as_i32(), 42);
        assert_eq!(i32::from(id), 42);
        assert_eq!(OrderId::from(42), id);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_numeric_id_serde_transparent() {
        let id = UserId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let parsed: UserId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_order_reference_from_timestamp() {
        let reference = OrderReference::from_timestamp_millis(1_700_000_000_123);
        assert_eq!(reference.as_str(), "order-1700000000123");
    }

    #[test]
    fn test_file_id_display() {
        let id = FileId::from("1wY44azXq");
        assert_eq!(id.to_string(), "1wY44azXq");
        assert_eq!(id.as_str(), "1wY44azXq");
    }
}
