//! The abstract memory that the buffer-overrun fixed-point iteration
//! computes with.
//!
//! The working domain element is the [`Memory`] attached to each program
//! point: either the point is unreachable, or a [`State`] records
//! * which locations live on the current stack frame,
//! * the abstract value stored at each tracked location,
//! * what the live SSA temporaries are known to alias,
//! * how the most recent branch condition relates to a boolean program
//!   variable (so that branch refinements survive being stored into a flag
//!   and tested later), and
//! * the relational constraints between tracked quantities.
//!
//! Transfer functions clone the incoming memory and mutate the clone; all
//! map- and set-shaped components share structure, so snapshots are cheap.
//! The fixed-point engine joins memories at control-flow merges and widens
//! them at loop heads. At the fixed point, checkers read the memories to
//! bound each array access.

mod alias;
pub use alias::*;

mod prune;
pub use prune::*;

mod state;
pub use state::*;

pub use crate::utils::log::Config;
