//! # Shared-world synchronization server
//!
//! Authoritative server for the shared-world game: it keeps every connected
//! client agreeing on participant positions and on the exact wall-clock
//! moment the sentinel turns.
//!
//! ## Architecture
//!
//! The server is a single-threaded, run-to-completion event loop. Background
//! tokio tasks handle raw I/O and feed the loop through channels:
//!
//! - **Network receiver**: listens on the UDP socket and forwards decoded
//!   packets to the main loop.
//! - **Network sender**: drains the outgoing queue, fanning broadcasts out to
//!   every connected address.
//! - **Timeout checker**: sweeps the connection table for clients that have
//!   gone silent and reports them as disconnects.
//! - **Sentinel driver**: flips the sentinel phase at randomized intervals
//!   and announces each turn with an absolute server timestamp.
//!
//! Registry mutation and the follow-up snapshot broadcast happen inside one
//! turn of the main loop, so concurrent updates from different connections
//! are serialized rather than interleaved.
//!
//! ## Module organization
//!
//! - [`registry`]: authoritative id -> participant state table.
//! - [`connections`]: transport-side id/address table and timeout sweep.
//! - [`sentinel`]: the randomized two-phase turn driver.
//! - [`network`]: UDP event loop tying the pieces together.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", 32).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod connections;
pub mod network;
pub mod registry;
pub mod sentinel;
