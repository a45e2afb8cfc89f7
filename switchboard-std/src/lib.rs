//! # switchboard-std
//!
//! Standard implementations for the switchboard message router.
//!
//! This crate provides:
//! - **Routing engine**: [`routing::Routes`] with `:name` / `*name` patterns and chains
//! - **Server router**: [`server::ServerRouter`], its builder, and the [`handlers!`] macro
//! - **Connection-side router**: [`receiver::Receiver`]
//! - **Fan-out protocol**: [`hub::Hub`], [`envelope`], and the local [`directory`]
//! - **Replies**: [`response::Response`]
//! - **Adapters**: [`adapters::JsonCodec`], [`adapters::MemoryDistributor`], and
//!   (feature `channel`) `adapters::ChannelConnection`
//! - **Testing**: [`testing::RecordingConnection`], [`testing::RecordingDistributor`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core types
pub use switchboard_core;

// Modules
pub mod adapters;
pub mod config;
pub mod directory;
pub mod envelope;
pub mod hub;
pub mod receiver;
pub mod response;
pub mod routing;
pub mod server;
pub mod testing;
