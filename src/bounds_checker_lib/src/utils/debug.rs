//! Little helpers for developers that try to understand what an analysis run
//! is doing.

/// A trait for types that can be rendered into a compact JSON representation.
///
/// The result is intended for debug output and differs from the serde
/// serialization of the type: sharing, lattice tags and other implementation
/// details are flattened away. It is not suitable for round-trips.
pub trait ToJsonCompact {
    /// Returns a compact JSON representation of the type that is meant for
    /// pretty printing.
    fn to_json_compact(&self) -> serde_json::Value;

    /// Print the compact JSON representation of the type.
    fn print_compact_json(&self) {
        println!("{:#}", self.to_json_compact())
    }
}
