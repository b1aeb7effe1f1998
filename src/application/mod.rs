//! Application Layer - The agent's loops
//!
//! Wires discovery, domain rules and adapters into the running strategies:
//! the master agent loop, the sniper and its exit monitor, the rotation
//! cycle, the yield farmer, governance, the strategic review, and the
//! supervising watcher process.

pub mod agent;
pub mod executor;
pub mod governance;
pub mod review;
pub mod rotation;
pub mod sniper;
pub mod sniper_monitor;
pub mod supervisor;
pub mod yield_farmer;

pub use agent::Agent;
pub use executor::{ExecutorError, SwapExecutor};
pub use supervisor::Supervisor;
