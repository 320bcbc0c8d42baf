//! Application layer: the `Marketplace` engine orchestrating order lifecycle,
//! escrow custody and payment settlement over the domain ports.

pub mod engine;
