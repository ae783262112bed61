//! # World Client Library
//!
//! Client side of the shared 3D world: it simulates the local player's
//! physics and input itself, reports the resulting pose to the relay once
//! per tick, and mirrors every other participant by reconciling the
//! relay's events into the scene.
//!
//! ## Architecture
//!
//! ### Remote State Reconciliation
//! Inbound events are queued and consumed once per rendered frame. The
//! reconciler owns the remote-player handle table: joins reserve an entry
//! and start an asynchronous character-model load, moves update transforms
//! and pick an animation from the reported motion, leaves tear the handle
//! down. A leave that races a still-loading model cancels it; the finished
//! model is discarded without ever touching the scene.
//!
//! ### Animation Derivation
//! Remote characters have no physics here; their animation is a pure
//! function of the reported motion. Jumping always wins; otherwise speed
//! thresholds choose between run, walk, and idle.
//!
//! ### Local State Emission
//! After each physics step the emitter packages position, yaw, horizontal
//! speed, and the airborne flag into exactly one update. There is no
//! client-side prediction to reconcile: every client is authoritative over
//! its own avatar, the relay only redistributes.
//!
//! ## Module Organization
//!
//! ### Reconciler Module (`reconciler`)
//! Turns relay events into scene mutations:
//! - Remote-player handle table (loading/ready)
//! - Join idempotence and self-filtering
//! - Load cancellation when a leave races a pending model
//!
//! ### Emitter Module (`emitter`)
//! Packages the local body once per simulation step:
//! - Position, yaw, horizontal speed, airborne flag
//!
//! ### Network Module (`network`)
//! Connects the frame loop to the relay:
//! - Reader/writer socket tasks on the tokio runtime
//! - Non-blocking per-frame event drain
//! - Fixed-step simulation accumulator and per-step emission
//!
//! ### Scene Module (`scene`)
//! The rendering/animation boundary:
//! - `Scene` trait consumed by the reconciler
//! - Asynchronous character model loading
//! - Placeholder macroquad implementation
//!
//! ### Game Module (`game`)
//! Local rigid body simulation:
//! - Gravity, ground plane, damped horizontal movement
//!
//! ### Input Module (`input`)
//! Keyboard/mouse sampling into per-frame move intents.

pub mod emitter;
pub mod game;
pub mod input;
pub mod network;
pub mod reconciler;
pub mod scene;
