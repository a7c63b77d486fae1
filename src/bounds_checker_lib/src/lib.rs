/*!
# bounds_checker_lib

The abstract domains of a buffer-overrun analyzer.

A fixed-point engine iterates transfer functions over the control flow graph
of an analyzed procedure. This crate provides the lattices those transfer
functions compute with: abstract values combining numeric intervals, pointer
and array descriptors, relational symbols and provenance traces
([`abstract_domain`]), and the abstract memory built from them
([`analysis::buffer_overrun`]). At the fixed point, the memory attached to
each program point over-approximates the set of concrete states that may
reach it, strongly enough to justify per-access bounds of the form
"the index interval is contained in `[0, size - 1]`".

The fixed-point engine itself, the front-end producing the instructions and
the checker consuming the final states are external to this crate; the
[`intermediate_representation`] module holds the vocabulary shared with them.
*/

pub mod abstract_domain;
pub mod analysis;
pub mod intermediate_representation;
pub mod utils;

mod prelude {
    pub use anyhow::{anyhow, Error};
    pub use serde::{Deserialize, Serialize};

    pub use crate::intermediate_representation::Tid;
}
