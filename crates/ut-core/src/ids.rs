//! Typed ids.
//!
//! Road ids index straight into the arenas of a compiled `RoadNetwork`, so
//! they are only meaningful for the compile pass that produced them.  A
//! recompile invalidates every `NodeId`, `SegmentId` and `TurnId` handed out
//! before it.  `AgentId`s are never reused within a run.

use std::fmt;

macro_rules! typed_id {
    ($(#[$attr:meta])* $name:ident, $label:literal) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub u32);

        impl $name {
            /// Placeholder for "not set".  Never a valid arena index.
            pub const INVALID: $name = $name(u32::MAX);

            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_valid() {
                    write!(f, concat!($label, "#{}"), self.0)
                } else {
                    f.write_str(concat!($label, "#-"))
                }
            }
        }
    };
}

typed_id! {
    /// Port, normal, cross or guide node.
    NodeId, "node"
}

typed_id! {
    /// One `break`-terminated run of node records.
    SegmentId, "seg"
}

typed_id! {
    /// A path through a crossing.
    TurnId, "turn"
}

typed_id! {
    /// A vehicle owned by the traffic manager.
    AgentId, "agent"
}
