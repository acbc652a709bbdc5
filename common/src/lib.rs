//! Types shared by every crate in the coordinator workspace.
//!
//! Only the error location lives here today. Every error enum in
//! `coordinator-core` and the `ws-coordinator` binary embeds one so that a
//! logged failure points back at the line that produced it.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
