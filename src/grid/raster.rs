//! Structured raster grid with node/link topology.
//!
//! The grid is the read-only substrate of a simulation: node
//! coordinates, surface elevation, boundary status, link connectivity,
//! and the precomputed adjacency the flow kernels need. It is built
//! once from externally supplied topography (a DEM that has already
//! been depression-resolved by the delineation step) and never mutated
//! during a run.
//!
//! # Layout
//!
//! Nodes are row-major: node `r * n_cols + c` sits at
//! `(c * spacing, r * spacing)`. Horizontal links come first (west to
//! east within each row), then vertical links (south to north within
//! each column). Positive discharge on a link flows from its head node
//! to its tail node.

use crate::types::{LinkIndex, NodeIndex};

use super::status::NodeStatus;
use super::GridError;

/// A directed link between two adjacent nodes.
///
/// Positive discharge flows from `head` to `tail`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    /// Upstream end of the sign convention (west or south node).
    pub head: NodeIndex,
    /// Downstream end of the sign convention (east or north node).
    pub tail: NodeIndex,
}

/// Structured raster grid.
///
/// Topology and boundary status are fixed once construction and status
/// assignment are done; the flow loop only reads from the grid.
///
/// # Example
///
/// ```
/// use runoff_rs::grid::RasterGrid;
///
/// let grid = RasterGrid::flat(4, 5, 10.0).unwrap();
/// assert_eq!(grid.n_nodes(), 20);
/// assert_eq!(grid.n_links(), 4 * 4 + 3 * 5);
/// ```
#[derive(Clone, Debug)]
pub struct RasterGrid {
    n_rows: usize,
    n_cols: usize,
    spacing: f64,
    elevation: Vec<f64>,
    status: Vec<NodeStatus>,
    links: Vec<Link>,
    /// Per node: incident links with the sign that converts link
    /// discharge into inflow at this node (+1 if the node is the tail).
    node_links: Vec<Vec<(LinkIndex, f64)>>,
    /// Per link: the previous/next link along the same row (horizontal)
    /// or column (vertical), used by the theta-weighted momentum update.
    axis_neighbors: Vec<[Option<LinkIndex>; 2]>,
    /// Links joining a core node to a core or fixed-value node.
    active_links: Vec<LinkIndex>,
}

impl RasterGrid {
    /// Create a raster grid from a surface elevation field.
    ///
    /// Perimeter nodes start `Closed` and interior nodes `Core`; use
    /// [`RasterGrid::set_outlet`] or [`RasterGrid::with_watershed`] to
    /// assign the outlet before running a simulation.
    ///
    /// # Arguments
    /// * `n_rows`, `n_cols` - grid dimensions (at least 3 x 3)
    /// * `spacing` - node spacing in meters
    /// * `elevation` - row-major surface elevation, `n_rows * n_cols` values
    pub fn new(
        n_rows: usize,
        n_cols: usize,
        spacing: f64,
        elevation: Vec<f64>,
    ) -> Result<Self, GridError> {
        if n_rows < 3 || n_cols < 3 {
            return Err(GridError::DimensionsTooSmall { n_rows, n_cols });
        }
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(GridError::InvalidSpacing(spacing));
        }
        let n_nodes = n_rows * n_cols;
        if elevation.len() != n_nodes {
            return Err(GridError::ElevationLength {
                expected: n_nodes,
                actual: elevation.len(),
            });
        }
        if let Some(node) = elevation.iter().position(|z| !z.is_finite()) {
            return Err(GridError::NonFiniteElevation {
                node: NodeIndex::new(node),
            });
        }

        let n_horizontal = n_rows * (n_cols - 1);
        let n_vertical = (n_rows - 1) * n_cols;
        let mut links = Vec::with_capacity(n_horizontal + n_vertical);

        // Horizontal links, west head to east tail
        for r in 0..n_rows {
            for c in 0..n_cols - 1 {
                links.push(Link {
                    head: NodeIndex::new(r * n_cols + c),
                    tail: NodeIndex::new(r * n_cols + c + 1),
                });
            }
        }
        // Vertical links, south head to north tail
        for r in 0..n_rows - 1 {
            for c in 0..n_cols {
                links.push(Link {
                    head: NodeIndex::new(r * n_cols + c),
                    tail: NodeIndex::new((r + 1) * n_cols + c),
                });
            }
        }

        let mut node_links = vec![Vec::with_capacity(4); n_nodes];
        for (li, link) in links.iter().enumerate() {
            let l = LinkIndex::new(li);
            node_links[link.head.get()].push((l, -1.0));
            node_links[link.tail.get()].push((l, 1.0));
        }

        // Along-axis neighbor links for the de Almeida stencil
        let horizontal = |r: usize, c: usize| LinkIndex::new(r * (n_cols - 1) + c);
        let vertical = |r: usize, c: usize| LinkIndex::new(n_horizontal + r * n_cols + c);
        let mut axis_neighbors = vec![[None, None]; links.len()];
        for r in 0..n_rows {
            for c in 0..n_cols - 1 {
                let l = horizontal(r, c).get();
                if c > 0 {
                    axis_neighbors[l][0] = Some(horizontal(r, c - 1));
                }
                if c + 1 < n_cols - 1 {
                    axis_neighbors[l][1] = Some(horizontal(r, c + 1));
                }
            }
        }
        for r in 0..n_rows - 1 {
            for c in 0..n_cols {
                let l = vertical(r, c).get();
                if r > 0 {
                    axis_neighbors[l][0] = Some(vertical(r - 1, c));
                }
                if r + 1 < n_rows - 1 {
                    axis_neighbors[l][1] = Some(vertical(r + 1, c));
                }
            }
        }

        let mut status = vec![NodeStatus::Core; n_nodes];
        for r in 0..n_rows {
            for c in 0..n_cols {
                if r == 0 || r == n_rows - 1 || c == 0 || c == n_cols - 1 {
                    status[r * n_cols + c] = NodeStatus::Closed;
                }
            }
        }

        let mut grid = Self {
            n_rows,
            n_cols,
            spacing,
            elevation,
            status,
            links,
            node_links,
            axis_neighbors,
            active_links: Vec::new(),
        };
        grid.rebuild_active_links();
        Ok(grid)
    }

    /// Create a flat grid at elevation zero (mostly for tests and benches).
    pub fn flat(n_rows: usize, n_cols: usize, spacing: f64) -> Result<Self, GridError> {
        Self::new(n_rows, n_cols, spacing, vec![0.0; n_rows * n_cols])
    }

    /// Mark a node as the fixed-value outlet.
    ///
    /// # Errors
    /// `NodeOutOfRange` if the index does not name a grid node.
    pub fn set_outlet(&mut self, node: NodeIndex) -> Result<(), GridError> {
        if node.get() >= self.n_nodes() {
            return Err(GridError::NodeOutOfRange {
                node,
                n_nodes: self.n_nodes(),
            });
        }
        self.status[node.get()] = NodeStatus::FixedValue;
        self.rebuild_active_links();
        Ok(())
    }

    /// Apply a watershed mask produced by an external delineation step.
    ///
    /// Nodes where the mask is `false` are closed; masked-in nodes
    /// become core except the outlet, which becomes fixed-value.
    ///
    /// # Errors
    /// - `MaskLength` if the mask does not cover every node
    /// - `NodeOutOfRange` if the outlet index is invalid
    pub fn with_watershed(mut self, mask: &[bool], outlet: NodeIndex) -> Result<Self, GridError> {
        if mask.len() != self.n_nodes() {
            return Err(GridError::MaskLength {
                expected: self.n_nodes(),
                actual: mask.len(),
            });
        }
        if outlet.get() >= self.n_nodes() {
            return Err(GridError::NodeOutOfRange {
                node: outlet,
                n_nodes: self.n_nodes(),
            });
        }
        for (i, &inside) in mask.iter().enumerate() {
            self.status[i] = if inside {
                NodeStatus::Core
            } else {
                NodeStatus::Closed
            };
        }
        self.status[outlet.get()] = NodeStatus::FixedValue;
        self.rebuild_active_links();
        Ok(self)
    }

    /// Number of grid rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of grid columns.
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.n_rows * self.n_cols
    }

    /// Number of links.
    pub fn n_links(&self) -> usize {
        self.links.len()
    }

    /// Node spacing in meters.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Physical (x, y) coordinates of a node.
    pub fn node_xy(&self, node: NodeIndex) -> (f64, f64) {
        let r = node.get() / self.n_cols;
        let c = node.get() % self.n_cols;
        (c as f64 * self.spacing, r as f64 * self.spacing)
    }

    /// Length of every link (uniform raster).
    pub fn link_length(&self) -> f64 {
        self.spacing
    }

    /// Width of the cell face a link discharge flows through.
    pub fn face_width(&self) -> f64 {
        self.spacing
    }

    /// Plan area of a node's cell.
    pub fn cell_area(&self) -> f64 {
        self.spacing * self.spacing
    }

    /// Surface elevation at a node.
    pub fn elevation(&self, node: NodeIndex) -> f64 {
        self.elevation[node]
    }

    /// Surface elevation field, row-major.
    pub fn elevations(&self) -> &[f64] {
        &self.elevation
    }

    /// Boundary status of a node.
    pub fn status(&self, node: NodeIndex) -> NodeStatus {
        self.status[node]
    }

    /// Boundary status of every node, row-major.
    pub fn statuses(&self) -> &[NodeStatus] {
        &self.status
    }

    /// A link's endpoints.
    pub fn link(&self, link: LinkIndex) -> Link {
        self.links[link]
    }

    /// All links.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links that participate in flow: both endpoints open, at least
    /// one of them core.
    pub fn active_links(&self) -> &[LinkIndex] {
        &self.active_links
    }

    /// Incident links of a node with inflow signs (+1 when the node is
    /// the link tail, -1 when it is the head).
    pub fn node_links(&self, node: NodeIndex) -> &[(LinkIndex, f64)] {
        &self.node_links[node]
    }

    /// The previous/next links along a link's own axis, if present.
    pub fn axis_neighbors(&self, link: LinkIndex) -> [Option<LinkIndex>; 2] {
        self.axis_neighbors[link]
    }

    /// Find all fixed-value (outlet) nodes.
    pub fn fixed_value_nodes(&self) -> Vec<NodeIndex> {
        NodeIndex::iter(self.n_nodes())
            .filter(|&n| self.status[n].is_fixed_value())
            .collect()
    }

    fn rebuild_active_links(&mut self) {
        self.active_links = LinkIndex::iter(self.links.len())
            .filter(|&l| {
                let link = self.links[l];
                let sh = self.status[link.head];
                let st = self.status[link.tail];
                (sh.is_core() && st.is_open()) || (st.is_core() && sh.is_open())
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_dimensions() {
        let grid = RasterGrid::flat(4, 5, 2.0).unwrap();
        assert_eq!(grid.n_nodes(), 20);
        // 4 rows of 4 horizontal links + 3 rows of 5 vertical links
        assert_eq!(grid.n_links(), 16 + 15);
        assert_eq!(grid.cell_area(), 4.0);
    }

    #[test]
    fn test_rejects_degenerate_grids() {
        assert!(matches!(
            RasterGrid::flat(2, 5, 1.0),
            Err(GridError::DimensionsTooSmall { .. })
        ));
        assert!(matches!(
            RasterGrid::flat(3, 3, 0.0),
            Err(GridError::InvalidSpacing(_))
        ));
        assert!(matches!(
            RasterGrid::new(3, 3, 1.0, vec![0.0; 8]),
            Err(GridError::ElevationLength { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_elevation() {
        let mut z = vec![0.0; 9];
        z[4] = f64::NAN;
        assert!(matches!(
            RasterGrid::new(3, 3, 1.0, z),
            Err(GridError::NonFiniteElevation { .. })
        ));
    }

    #[test]
    fn test_perimeter_closed_by_default() {
        let grid = RasterGrid::flat(3, 3, 1.0).unwrap();
        assert_eq!(grid.status(NodeIndex::new(0)), NodeStatus::Closed);
        assert_eq!(grid.status(NodeIndex::new(4)), NodeStatus::Core);
        assert_eq!(grid.status(NodeIndex::new(8)), NodeStatus::Closed);
    }

    #[test]
    fn test_link_orientation() {
        let grid = RasterGrid::flat(3, 3, 1.0).unwrap();
        // First horizontal link joins nodes 0 and 1
        let l = grid.link(LinkIndex::new(0));
        assert_eq!(l.head.get(), 0);
        assert_eq!(l.tail.get(), 1);
        // First vertical link joins nodes 0 and 3
        let l = grid.link(LinkIndex::new(6));
        assert_eq!(l.head.get(), 0);
        assert_eq!(l.tail.get(), 3);
    }

    #[test]
    fn test_node_link_signs() {
        let grid = RasterGrid::flat(3, 3, 1.0).unwrap();
        // Center node of a 3x3 grid has four incident links
        let incident = grid.node_links(NodeIndex::new(4));
        assert_eq!(incident.len(), 4);
        let inflow: f64 = incident.iter().map(|&(_, s)| s).sum();
        // Two links end here (+1) and two start here (-1)
        assert_eq!(inflow, 0.0);
    }

    #[test]
    fn test_active_links_need_core_endpoint() {
        // 3x3 with all perimeter closed: only the center node is core,
        // and all four of its links join it to closed nodes.
        let grid = RasterGrid::flat(3, 3, 1.0).unwrap();
        assert!(grid.active_links().is_empty());

        let mut grid = RasterGrid::flat(3, 4, 1.0).unwrap();
        // Two adjacent core nodes (5 and 6) share one active link
        assert_eq!(grid.active_links().len(), 1);

        // Opening an outlet next to a core node activates their link
        grid.set_outlet(NodeIndex::new(4)).unwrap();
        assert_eq!(grid.active_links().len(), 2);
    }

    #[test]
    fn test_watershed_mask() {
        let mask = vec![
            false, false, false, false, //
            false, true, true, false, //
            true, true, true, false, //
            false, false, false, false,
        ];
        let grid = RasterGrid::flat(4, 4, 1.0)
            .unwrap()
            .with_watershed(&mask, NodeIndex::new(8))
            .unwrap();
        assert_eq!(grid.status(NodeIndex::new(8)), NodeStatus::FixedValue);
        assert_eq!(grid.status(NodeIndex::new(5)), NodeStatus::Core);
        assert_eq!(grid.status(NodeIndex::new(0)), NodeStatus::Closed);
        assert_eq!(grid.fixed_value_nodes(), vec![NodeIndex::new(8)]);
    }

    #[test]
    fn test_axis_neighbors() {
        let grid = RasterGrid::flat(3, 4, 1.0).unwrap();
        // Middle horizontal link of the first row has both neighbors
        let [west, east] = grid.axis_neighbors(LinkIndex::new(1));
        assert_eq!(west, Some(LinkIndex::new(0)));
        assert_eq!(east, Some(LinkIndex::new(2)));
        // Edge link only has one
        let [west, east] = grid.axis_neighbors(LinkIndex::new(0));
        assert_eq!(west, None);
        assert_eq!(east, Some(LinkIndex::new(1)));
    }

    #[test]
    fn test_node_xy() {
        let grid = RasterGrid::flat(3, 4, 2.5).unwrap();
        assert_eq!(grid.node_xy(NodeIndex::new(0)), (0.0, 0.0));
        assert_eq!(grid.node_xy(NodeIndex::new(5)), (2.5, 2.5));
    }
}
