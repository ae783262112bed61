//! # World Relay Server Library
//!
//! This library implements the relay that keeps every client's view of
//! "who is where" consistent in the shared 3D world. Clients simulate their
//! own physics and animation locally; the server's only job is to register
//! connections, relay state reports to everyone else, and evict players
//! that stop moving.
//!
//! ## Core Responsibilities
//!
//! ### Connection Registry
//! One `PlayerState` per live connection, created with the default spawn
//! pose on connect and destroyed on disconnect or eviction. A connection
//! may only ever mutate its own entry, and no participant is ever notified
//! about itself: the initial roster snapshot goes to the newcomer alone
//! (own entry excluded) while the join announcement goes to everyone else.
//!
//! ### Inactivity Eviction
//! A periodic sweep, sharing the relay loop, force-disconnects players
//! whose last qualifying movement is older than the timeout window.
//! Movement only counts when the displacement from the last recorded
//! position exceeds a minimum threshold, so sub-threshold jitter cannot
//! keep an idle connection alive. Eviction is fail-open toward registry
//! consistency: the entry is removed even when the transport is already
//! half-closed.
//!
//! ### Broadcast Fan-out
//! Every outbound packet goes through a per-connection unbounded queue
//! drained by a dedicated writer task, so one slow or dead recipient never
//! delays the rest. Broadcasts are best-effort and ordered only within a
//! single connection's stream.
//!
//! ## Architecture
//!
//! A single relay loop owns the registry and the peer map; per-connection
//! reader tasks feed it typed events over an mpsc channel and handlers run
//! to completion, so no locking is needed anywhere. No error in this
//! subsystem is fatal to the process: a misbehaving connection only ever
//! takes down itself.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! The connection-to-state map:
//! - One entry per live connection, spawn pose on insert
//! - Minimum-movement inactivity bookkeeping
//! - Roster snapshots and idle-id sweeps
//!
//! ### Network Module (`network`)
//! Socket handling and the relay loop:
//! - TCP accept loop and per-connection reader/writer tasks
//! - Typed events into the single owning loop
//! - Broadcast fan-out and the inactivity sweep

pub mod network;
pub mod registry;
