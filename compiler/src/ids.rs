//! Typed handles for registry entries
//!
//! Each handle is a `u32` index into one of the registry's arenas. Wrapping
//! them keeps a class handle from being passed where a method handle is
//! expected.

use std::fmt;

/// Macro to define ID types with consistent behavior
macro_rules! define_id_type {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        pub struct $name(u32);

        impl $name {
            /// Create a new ID from a raw u32 value
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw u32 value of this ID
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Position in the owning arena
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

define_id_type!(
    /// Handle to a [`crate::ClassInfo`] in the registry
    ClassId
);

define_id_type!(
    /// Handle to a [`crate::MethodInfo`] in the registry
    MethodId
);

define_id_type!(
    /// Handle to a scope node in a [`crate::scope::ScopeTree`]
    ScopeId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types_with_stable_indices() {
        let class = ClassId::from_index(3);
        let method = MethodId::from_raw(3);
        assert_eq!(class.index(), 3);
        assert_eq!(method.as_raw(), 3);
        assert_eq!(class.to_string(), "ClassId(3)");
        assert!(ClassId::from_raw(1) < ClassId::from_raw(2));
    }
}
