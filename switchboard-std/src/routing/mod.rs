//! # Routing Engine
//!
//! This module provides the pieces both router sides are built from:
//!
//! - **Matching**: [`PathMatcher`] compiles `:name` / `*name` patterns.
//! - **Storage**: [`RouteTable`] keeps per-verb routes in registration order.
//! - **Chains**: [`ChainRegistry`] records batches of routes for bulk removal.
//! - **Dispatch**: [`Routes`] ties the three together and runs handlers
//!   sequentially for one message.
//!
//! # Dispatch Semantics
//!
//! | Property        | Behavior                                      |
//! |-----------------|-----------------------------------------------|
//! | Matches fired   | All of them, not just the first               |
//! | Order           | Route registration order, then handler order  |
//! | Concurrency     | One handler at a time per message             |
//! | Replies         | Never dispatched                              |
//! | Handler error   | Stops the message; the caller applies policy  |

pub mod chain;
pub mod dispatch;
pub mod matcher;
pub mod table;

pub use chain::{ChainEntry, ChainRegistry};
pub use dispatch::{DispatchOutcome, DispatchStatus, Routes};
pub use matcher::PathMatcher;
pub use table::{HandlerId, RouteHandle, RouteMatch, RouteTable, RouteTemplate};
