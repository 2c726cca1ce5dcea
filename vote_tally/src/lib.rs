/*!
Vote tabulation for book club polls.

Three voting methods are supported, behind the [`engine::TallyEngine`] trait:
plurality, ranked-choice (instant-runoff) and cumulative (point allocation).
A hosting application talks to a single [`manager::VotingManager`], which
records the votes with the active method, serves the live and final results,
and starts a new round whenever the voting method is changed.

See the [`manual`] for the ballot formats and the `bookvote` command line tool.
*/

mod config;

pub mod ballot;
pub mod cumulative;
pub mod engine;
pub mod manager;
pub mod manual;
pub mod plurality;
pub mod ranked;

pub use crate::config::*;
pub use crate::manager::VotingManager;
