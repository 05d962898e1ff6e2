//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements | Connects to                     |
//! |------------|------------|---------------------------------|
//! | `hardware` | HapticPort | GPIO enable lines + PulseChannel |

pub mod hardware;
