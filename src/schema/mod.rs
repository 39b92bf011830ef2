/// Enumerated fields of a fault record and the wire event/access taxonomy
/// the hook dispatches on.
pub mod enums;
