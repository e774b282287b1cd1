//! # Shared-world synchronization client
//!
//! Client for the shared-world game. It reconciles three independent streams
//! into one coherent local picture:
//!
//! - **Snapshots** replace the remote participant cache wholesale; each
//!   remote entry keeps a rendered proxy position that converges toward its
//!   authoritative target a fixed fraction per render tick, smoothing the
//!   server's ~20 Hz update cadence.
//! - **Sentinel turn announcements** carry an absolute server timestamp. The
//!   client samples its wall clock against its monotonic render clock once
//!   per announcement and schedules the visible turn at the translated local
//!   deadline, so every client begins the sweep at the same real-world
//!   moment regardless of clock skew. A deadline that has already passed
//!   fires immediately.
//! - **Local input** moves the player kinematically and is reported to the
//!   server every 50 ms.
//!
//! Everything runs on a single cooperative `tokio::select!` loop, so snapshot
//! application, scheduling, and interpolation never interleave destructively.
//!
//! ## Module organization
//!
//! - [`cache`]: remote state cache and convergence stepping.
//! - [`sentinel`]: clock offset sampling and the turn state machine.
//! - [`input`]: local movement and reported color.
//! - [`rendering`]: top-down field view.
//! - [`network`]: UDP event loop tying the pieces together.

pub mod cache;
pub mod input;
pub mod network;
pub mod rendering;
pub mod sentinel;
