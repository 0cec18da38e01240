use std::{
    borrow::Borrow,
    fmt::{Debug, Display},
};

use serde::{Deserialize, Serialize};

pub mod net;
pub mod player;
pub mod round;

pub use player::Role;
pub use round::Difficulty;

/// Protocol version. Clients must present exactly this string during the handshake.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Setup Newtype pattern for IDs
macro_rules! decl_id {
    ($name:ident, $repr:ty) => {
        #[derive(Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Hash)]
        pub struct $name(pub $repr);

        impl Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                <Self as Display>::fmt(self, f)
            }
        }
        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                // Always diplay IDs in hex
                write!(f, "{:#X}", self.0)
            }
        }

        impl From<$repr> for $name {
            #[inline]
            fn from(v: $repr) -> Self {
                Self(v)
            }
        }
        impl From<$name> for $repr {
            #[inline]
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl Borrow<$repr> for $name {
            #[inline]
            fn borrow(&self) -> &$repr {
                &self.0
            }
        }
        impl PartialEq<$repr> for $name {
            #[inline]
            fn eq(&self, other: &$repr) -> bool {
                self.0 == *other
            }
        }
    };
}

decl_id!(ConnectionId, u32);
decl_id!(SessionId, u64);
