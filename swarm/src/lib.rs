//! Article-generation swarm: three workers cooperating over a shared transcript.
//!
//! A drafting worker writes the article, an illustration worker produces a
//! cover image, and a publishing worker posts the result. Workers never call
//! each other; they append to an append-only transcript and request explicit
//! handoffs, which the [`coordinator`] validates and bounds.
//!
//! - **[`core`]**: Pure, deterministic types (transcript, limits, statuses,
//!   draft parsing). No I/O.
//! - **[`io`]**: Side effects (HTTP capability adapters, config, prompts,
//!   image cache, run log). Each adapter sits behind a trait so tests can
//!   script it.
//! - **[`agents`]**: The worker contract and the three roles.
//!
//! [`pipeline`] wires config and adapters into a ready [`coordinator::Coordinator`].

pub mod agents;
pub mod coordinator;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
