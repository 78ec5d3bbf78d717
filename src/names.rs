//! Diagnostic name tables
//!
//! Every closed enumeration exported by the crate (error kinds, event codes,
//! event states) carries a compile-time name table indexed by the enum's own
//! integer value. Lookups by raw index are bounds-checked and fall back to
//! [`INVALID`].

/// Placeholder returned for out-of-range name lookups
pub const INVALID: &str = "invalid";

/// Declare a fieldless enum together with its variant list and name table.
///
/// The first variant gets discriminant 0, the rest follow in declaration order.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $label:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[repr($repr)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, ordered by discriminant
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Number of variants
            pub const COUNT: usize = Self::ALL.len();

            const NAMES: &'static [&'static str] = &[$($label,)+];

            /// Integer value of this variant
            #[inline]
            pub const fn index(self) -> usize {
                self as usize
            }

            /// Diagnostic name of this variant
            pub fn name(self) -> &'static str {
                Self::name_of(self as usize)
            }

            /// Variant for a raw integer value, if it is in range
            pub fn from_index(index: usize) -> Option<Self> {
                Self::ALL.get(index).copied()
            }

            /// Diagnostic name for a raw integer value (bounds-checked)
            pub fn name_of(index: usize) -> &'static str {
                Self::NAMES
                    .get(index)
                    .copied()
                    .unwrap_or($crate::names::INVALID)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub(crate) use named_enum;
