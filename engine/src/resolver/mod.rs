//! Resolver Pool (§4.1, §2 20% share): the lowest layer of the resolution
//! pipeline. [`client`] implements one UDP/TCP client against a single
//! upstream; [`pool`] owns the set of clients and the selection policy.

pub mod client;
pub mod pool;

pub use client::ResolverClient;
pub use pool::ResolverPool;
