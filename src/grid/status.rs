//! Boundary status for grid nodes.
//!
//! Each node carries a status that determines how the flow kernels
//! treat it. Status assignment is fixed before a run begins; the
//! integration loop never mutates it.

/// Status of a grid node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Interior node: depth evolves by mass conservation.
    Core,

    /// Outlet node: depth is held at the prescribed value, but links
    /// incident to it still carry discharge.
    FixedValue,

    /// Node outside the domain (e.g. beyond the watershed boundary).
    /// Depth is held at zero and incident links carry no flow.
    Closed,
}

impl NodeStatus {
    /// Check if this node participates in flow (not closed).
    pub fn is_open(&self) -> bool {
        !matches!(self, NodeStatus::Closed)
    }

    /// Check if this is an interior node.
    pub fn is_core(&self) -> bool {
        matches!(self, NodeStatus::Core)
    }

    /// Check if this is an outlet node.
    pub fn is_fixed_value(&self) -> bool {
        matches!(self, NodeStatus::FixedValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_equality() {
        assert_eq!(NodeStatus::Core, NodeStatus::Core);
        assert_ne!(NodeStatus::Core, NodeStatus::Closed);
        assert_ne!(NodeStatus::FixedValue, NodeStatus::Closed);
    }

    #[test]
    fn test_is_open() {
        assert!(NodeStatus::Core.is_open());
        assert!(NodeStatus::FixedValue.is_open());
        assert!(!NodeStatus::Closed.is_open());
    }

    #[test]
    fn test_is_core() {
        assert!(NodeStatus::Core.is_core());
        assert!(!NodeStatus::FixedValue.is_core());
    }

    #[test]
    fn test_is_fixed_value() {
        assert!(NodeStatus::FixedValue.is_fixed_value());
        assert!(!NodeStatus::Core.is_fixed_value());
    }
}
