//! Reference implementations of the collaborator seams.
//!
//! - [`JsonCodec`] - JSON wire format
//! - [`MemoryDistributor`] - In-process distributor; share one between routers
//!   to simulate a fleet
//! - [`ChannelConnection`] - Connection over a tokio channel (feature `channel`)

#[cfg(feature = "channel")]
mod channel;
mod json;
mod memory;

#[cfg(feature = "channel")]
pub use channel::ChannelConnection;
pub use json::JsonCodec;
pub use memory::MemoryDistributor;
