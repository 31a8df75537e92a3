use indexmap::IndexMap;

/// Per-node values keyed by node id, kept in graph insertion order.
///
/// Serializes as a JSON object whose keys appear in insertion order.
pub type NodeValues<T> = IndexMap<String, T>;
