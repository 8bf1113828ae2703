//! Frame-geometry generator
//!
//! Emits the `(node_id, coords)` and `(elem_id, node_ids)` sequences of a
//! regular multi-bay multi-floor plane frame, plus the id-set helpers used
//! to target restraints, loads, and tracked nodes. Node ids start at 1:
//! first every column line bottom-to-top (bases and vertices included),
//! then the interior beam nodes floor by floor, bay by bay.

use serde::{Deserialize, Serialize};

use crate::mesh::{ElemIdNodeIdPairs, NodeIdCoordsPairs};

/// Regular plane frame: `nbays` x `nfloors` with subdivided beams and
/// columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMesh {
    nbays: u32,
    nfloors: u32,
    bay_length: f64,
    floor_height: f64,
    beam_divisions: u32,
    column_divisions: u32,
}

impl FrameMesh {
    pub fn new(
        nbays: u32,
        nfloors: u32,
        bay_length: f64,
        floor_height: f64,
        beam_divisions: u32,
        column_divisions: u32,
    ) -> Self {
        Self {
            nbays,
            nfloors,
            bay_length,
            floor_height,
            beam_divisions,
            column_divisions,
        }
    }

    /// Nodes on one column line, bases and vertices included.
    fn nodes_per_column_line(&self) -> u32 {
        self.nfloors * self.column_divisions + 1
    }

    /// Interior nodes of one beam (vertices excluded).
    fn nodes_per_beam(&self) -> u32 {
        self.beam_divisions - 1
    }

    /// Total node count of the frame.
    pub fn num_nodes(&self) -> u32 {
        (self.nbays + 1) * self.nodes_per_column_line()
            + self.nfloors * self.nbays * self.nodes_per_beam()
    }

    /// Total element count of the frame.
    pub fn num_elements(&self) -> u32 {
        (self.nbays + 1) * self.nfloors * self.column_divisions
            + self.nfloors * self.nbays * self.beam_divisions
    }

    /// Id of the column-line node at `(column_line, floor)` intersections;
    /// floor 0 is the base.
    pub fn vertex_id(&self, column_line: u32, floor: u32) -> u32 {
        1 + column_line * self.nodes_per_column_line() + floor * self.column_divisions
    }

    /// First id of the interior nodes of the beam at `(bay, floor)`; bays
    /// and floors count from 1.
    fn beam_interior_base(&self, bay: u32, floor: u32) -> u32 {
        let column_nodes = (self.nbays + 1) * self.nodes_per_column_line();
        let beams_before = (floor - 1) * self.nbays + (bay - 1);
        1 + column_nodes + beams_before * self.nodes_per_beam()
    }

    /// Ids of the column bases, one per column line.
    pub fn column_base_ids(&self) -> Vec<u32> {
        (0..=self.nbays).map(|line| self.vertex_id(line, 0)).collect()
    }

    /// Ids of every node on the beam line of `floor` (1-based), vertices
    /// included when requested.
    pub fn beam_line_node_ids(&self, floor: u32, include_vertices: bool) -> Vec<u32> {
        let mut ids = Vec::new();
        if include_vertices {
            for line in 0..=self.nbays {
                ids.push(self.vertex_id(line, floor));
            }
        }
        for bay in 1..=self.nbays {
            let base = self.beam_interior_base(bay, floor);
            for k in 0..self.nodes_per_beam() {
                ids.push(base + k);
            }
        }
        ids.sort_unstable();
        ids
    }

    /// Every node id of the frame.
    pub fn all_node_ids(&self) -> Vec<u32> {
        (1..=self.num_nodes()).collect()
    }

    /// The `(node_id, coords)` sequence.
    pub fn node_coords_pairs(&self) -> NodeIdCoordsPairs {
        let mut pairs = NodeIdCoordsPairs::with_capacity(self.num_nodes() as usize);
        let dy = self.floor_height / self.column_divisions as f64;
        for line in 0..=self.nbays {
            let x = line as f64 * self.bay_length;
            let base = self.vertex_id(line, 0);
            for k in 0..self.nodes_per_column_line() {
                pairs.push((base + k, [x, k as f64 * dy, 0.0]));
            }
        }
        let dx = self.bay_length / self.beam_divisions as f64;
        for floor in 1..=self.nfloors {
            let y = floor as f64 * self.floor_height;
            for bay in 1..=self.nbays {
                let x0 = (bay - 1) as f64 * self.bay_length;
                let base = self.beam_interior_base(bay, floor);
                for k in 0..self.nodes_per_beam() {
                    pairs.push((base + k, [x0 + (k + 1) as f64 * dx, y, 0.0]));
                }
            }
        }
        pairs
    }

    /// The `(elem_id, node_ids)` sequence: columns first, then beams.
    pub fn element_node_pairs(&self) -> ElemIdNodeIdPairs {
        let mut pairs = ElemIdNodeIdPairs::with_capacity(self.num_elements() as usize);
        let mut next_elem = 1;
        for line in 0..=self.nbays {
            let base = self.vertex_id(line, 0);
            for segment in 0..self.nfloors * self.column_divisions {
                pairs.push((next_elem, vec![base + segment, base + segment + 1]));
                next_elem += 1;
            }
        }
        for floor in 1..=self.nfloors {
            for bay in 1..=self.nbays {
                let mut chain = Vec::with_capacity(self.beam_divisions as usize + 1);
                chain.push(self.vertex_id(bay - 1, floor));
                let base = self.beam_interior_base(bay, floor);
                for k in 0..self.nodes_per_beam() {
                    chain.push(base + k);
                }
                chain.push(self.vertex_id(bay, floor));
                for pair in chain.windows(2) {
                    pairs.push((next_elem, vec![pair[0], pair[1]]));
                    next_elem += 1;
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn frame() -> FrameMesh {
        FrameMesh::new(3, 2, 6.0, 4.0, 3, 2)
    }

    #[test]
    fn test_node_and_element_counts() {
        let f = frame();
        assert_eq!(f.num_nodes(), 32);
        assert_eq!(f.num_elements(), 16 + 18);
        assert_eq!(f.node_coords_pairs().len(), 32);
        assert_eq!(f.element_node_pairs().len(), 34);
    }

    #[test]
    fn test_column_bases_sit_at_ground() {
        let f = frame();
        let coords = f.node_coords_pairs();
        for base in f.column_base_ids() {
            let (_, xyz) = coords.iter().find(|(id, _)| *id == base).unwrap();
            assert_eq!(xyz[1], 0.0);
        }
        assert_eq!(f.column_base_ids().len(), 4);
    }

    #[test]
    fn test_beam_line_nodes_share_the_floor_height() {
        let f = frame();
        let coords: std::collections::HashMap<u32, [f64; 3]> =
            f.node_coords_pairs().into_iter().collect();
        for floor in 1..=2 {
            let ids = f.beam_line_node_ids(floor, true);
            // vertices plus interior nodes of each bay
            assert_eq!(ids.len(), 4 + 3 * 2);
            for id in ids {
                assert_eq!(coords[&id][1], floor as f64 * 4.0);
            }
        }
    }

    #[test]
    fn test_every_element_node_exists() {
        let f = frame();
        let node_ids: BTreeSet<u32> = f.node_coords_pairs().iter().map(|(id, _)| *id).collect();
        for (_, elem_nodes) in f.element_node_pairs() {
            assert_eq!(elem_nodes.len(), 2);
            for node in elem_nodes {
                assert!(node_ids.contains(&node));
            }
        }
    }

    #[test]
    fn test_element_lengths_match_divisions() {
        let f = frame();
        let coords: std::collections::HashMap<u32, [f64; 3]> =
            f.node_coords_pairs().into_iter().collect();
        for (_, elem_nodes) in f.element_node_pairs() {
            let a = coords[&elem_nodes[0]];
            let b = coords[&elem_nodes[1]];
            let length =
                ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2) + (b[2] - a[2]).powi(2)).sqrt();
            // column segments are 4/2 long and beam segments 6/3
            assert!((length - 2.0).abs() < 1e-12);
        }
    }
}
