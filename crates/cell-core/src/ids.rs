//! Identifiers for the things the kernel tracks: communication units,
//! network regions and V2X messages.
//!
//! Every identifier is a thin `Copy` newtype ordered by its numeric value.
//! Registries keep them in `BTreeMap`s, which is what makes per-region
//! grouping and receiver iteration come out in the same order on every run.

use std::fmt;

macro_rules! cell_id {
    ($(#[$doc:meta])* $name:ident($raw:ty), $label:literal) => {
        $(#[$doc])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub $raw);

        impl $name {
            /// Placeholder for "not assigned". Never handed out by a registry.
            pub const INVALID: $name = $name(<$raw>::MAX);

            /// Position in a dense table indexed by this id.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn is_valid(self) -> bool {
                self.0 != <$raw>::MAX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, "{}#{}", $label, self.0)
                } else {
                    write!(f, "{}#-", $label)
                }
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;

            fn try_from(raw: usize) -> Result<Self, Self::Error> {
                Ok($name(<$raw>::try_from(raw)?))
            }
        }
    };
}

cell_id!(
    /// A vehicle, roadside unit, traffic light, charging station or server
    /// known to the cellular network.
    UnitId(u32),
    "unit"
);

cell_id!(
    /// Position of a region in the network configuration. Regions are
    /// numbered in declaration order and the global network comes last.
    RegionId(u16),
    "region"
);

cell_id!(
    /// Sender-assigned message number.
    MessageId(u64),
    "msg"
);
