//! Global mesh: builds, distributes, renumbers, and owns the node and
//! element collections
//!
//! Every rank runs the same deterministic decomposition: node ids are
//! partitioned into contiguous ranges, each rank instantiates every element
//! touching one of its nodes (boundary elements are deliberately duplicated
//! on both adjacent ranks), and nodes referenced but not owned become
//! read-only interface copies. Two pairwise exchange waves tell each
//! interface copy its renumbered id and its global DoF start index.

pub mod frame;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, info};
use rayon::prelude::*;

use crate::comms::{tags, Collective};
use crate::elements::beam::{BeamElement, ElementType, NodeSlot};
use crate::elements::node::Node;
use crate::elements::section::Section;
use crate::error::{BlazeError, BlazeResult};

/// `(node_id, coordinates)` input sequence
pub type NodeIdCoordsPairs = Vec<(u32, [f64; 3])>;
/// `(elem_id, node_ids)` input sequence
pub type ElemIdNodeIdPairs = Vec<(u32, Vec<u32>)>;

/// Which node arena an id lookup may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Interface,
    All,
}

/// Break a line between two points into equal divisions, emitting the node
/// and element sequences with ids starting at 1.
pub fn map_a_line_mesh(
    divisions: u32,
    end_coords: [[f64; 3]; 2],
) -> (NodeIdCoordsPairs, ElemIdNodeIdPairs) {
    let mut nodes = NodeIdCoordsPairs::with_capacity(divisions as usize + 1);
    let mut elements = ElemIdNodeIdPairs::with_capacity(divisions as usize);

    let delta = [
        (end_coords[1][0] - end_coords[0][0]) / divisions as f64,
        (end_coords[1][1] - end_coords[0][1]) / divisions as f64,
        (end_coords[1][2] - end_coords[0][2]) / divisions as f64,
    ];
    for i in 0..=divisions {
        nodes.push((
            i + 1,
            [
                end_coords[0][0] + i as f64 * delta[0],
                end_coords[0][1] + i as f64 * delta[1],
                end_coords[0][2] + i as f64 * delta[2],
            ],
        ));
    }
    for i in 0..divisions {
        elements.push((i + 1, vec![i + 1, i + 2]));
    }
    (nodes, elements)
}

/// The per-rank view of the global mesh.
pub struct GlobalMesh {
    rank: usize,
    num_ranks: usize,

    nnodes: usize,
    ndofs: usize,
    nelems: usize,
    rank_nnodes: usize,
    rank_interface_nnodes: usize,
    rank_ndofs: usize,
    rank_nelems: usize,
    rank_starting_node_id: u32,
    rank_starting_nz_i: usize,

    ranks_ndofs: Vec<usize>,
    ranks_nnodes: Vec<usize>,

    node_vector: Vec<Node>,
    interface_node_vector: Vec<Node>,
    elem_vector: Vec<BeamElement>,

    node_id_set_owned: BTreeSet<u32>,
    interface_node_id_set: BTreeSet<u32>,

    /// neighbour rank -> node ids that neighbour wants from this rank
    wanted_by_neighbour: BTreeMap<usize, BTreeSet<u32>>,
    /// neighbour rank -> node ids this rank wants from that neighbour
    wanted_from_neighbour: BTreeMap<usize, BTreeSet<u32>>,

    element_type: ElementType,
    section: Section,
}

impl GlobalMesh {
    pub fn new(element_type: ElementType, section: Section) -> Self {
        Self {
            rank: 0,
            num_ranks: 1,
            nnodes: 0,
            ndofs: 0,
            nelems: 0,
            rank_nnodes: 0,
            rank_interface_nnodes: 0,
            rank_ndofs: 0,
            rank_nelems: 0,
            rank_starting_node_id: 1,
            rank_starting_nz_i: 0,
            ranks_ndofs: Vec::new(),
            ranks_nnodes: Vec::new(),
            node_vector: Vec::new(),
            interface_node_vector: Vec::new(),
            elem_vector: Vec::new(),
            node_id_set_owned: BTreeSet::new(),
            interface_node_id_set: BTreeSet::new(),
            wanted_by_neighbour: BTreeMap::new(),
            wanted_from_neighbour: BTreeMap::new(),
            element_type,
            section,
        }
    }

    // ---- mesh creation ---------------------------------------------------

    /// Build a line mesh on a single rank.
    pub fn create_line_mesh(
        &mut self,
        divisions: u32,
        end_coords: [[f64; 3]; 2],
        comm: &dyn Collective,
    ) -> BlazeResult<()> {
        let (nodes, elements) = map_a_line_mesh(divisions, end_coords);
        self.setup_distributed_mesh(nodes, elements, comm)
    }

    /// Build a frame mesh (see [`frame::FrameMesh`]) over the ranks of the
    /// collective.
    pub fn create_frame_mesh(
        &mut self,
        frame: &frame::FrameMesh,
        comm: &dyn Collective,
    ) -> BlazeResult<()> {
        let nodes = frame.node_coords_pairs();
        let elements = frame.element_node_pairs();
        self.setup_distributed_mesh(nodes, elements, comm)
    }

    /// Decompose the global node/element sequences over the ranks of the
    /// collective and instantiate this rank's share. With one rank this
    /// degenerates to a serial mesh with no interfaces.
    pub fn setup_distributed_mesh(
        &mut self,
        mut nodes_coords: NodeIdCoordsPairs,
        elem_nodes: ElemIdNodeIdPairs,
        comm: &dyn Collective,
    ) -> BlazeResult<()> {
        self.rank = comm.rank();
        self.num_ranks = comm.num_ranks();
        self.nnodes = nodes_coords.len();
        self.nelems = elem_nodes.len();

        // canonical global order: sorted by node id
        nodes_coords.sort_unstable_by_key(|(id, _)| *id);

        // 1. partition node ids into contiguous ranges
        let node_rank_map = self.populate_node_rank_map(&nodes_coords);

        // 2. invert to node -> connected elements
        let mut node_element_map: HashMap<u32, BTreeSet<u32>> = HashMap::new();
        for (elem_id, node_ids) in &elem_nodes {
            for node_id in node_ids {
                node_element_map.entry(*node_id).or_default().insert(*elem_id);
            }
        }

        // 3. every element touching an owned node lives on this rank;
        //    boundary elements are created on both adjacent ranks
        let mut elem_id_set_on_rank: BTreeSet<u32> = BTreeSet::new();
        for node_id in &self.node_id_set_owned {
            if let Some(elem_ids) = node_element_map.get(node_id) {
                elem_id_set_on_rank.extend(elem_ids);
            }
        }
        let elem_nodes_on_rank: ElemIdNodeIdPairs = elem_nodes
            .iter()
            .filter(|(elem_id, _)| elem_id_set_on_rank.contains(elem_id))
            .cloned()
            .collect();
        self.rank_nelems = elem_nodes_on_rank.len();

        // 4. classify the rank's element node references
        self.interface_node_id_set.clear();
        let mut interface_elem_id_set: BTreeSet<u32> = BTreeSet::new();
        for (elem_id, node_ids) in &elem_nodes_on_rank {
            for node_id in node_ids {
                if !self.node_id_set_owned.contains(node_id) {
                    self.interface_node_id_set.insert(*node_id);
                    interface_elem_id_set.insert(*elem_id);
                }
            }
        }
        self.rank_nnodes = self.node_id_set_owned.len();
        self.rank_interface_nnodes = self.interface_node_id_set.len();

        // 5. per-neighbour wanted sets; symmetric across rank pairs
        self.wanted_by_neighbour.clear();
        self.wanted_from_neighbour.clear();
        for (elem_id, node_ids) in &elem_nodes_on_rank {
            if !interface_elem_id_set.contains(elem_id) {
                continue;
            }
            let neighbour_ranks: Vec<usize> = node_ids
                .iter()
                .filter(|node_id| self.interface_node_id_set.contains(node_id))
                .map(|node_id| node_rank_map[node_id])
                .collect();
            for node_id in node_ids {
                let parent_rank = node_rank_map[node_id];
                if parent_rank == self.rank {
                    for neighbour in &neighbour_ranks {
                        self.wanted_by_neighbour
                            .entry(*neighbour)
                            .or_default()
                            .insert(*node_id);
                    }
                } else {
                    self.wanted_from_neighbour
                        .entry(parent_rank)
                        .or_default()
                        .insert(*node_id);
                }
            }
        }

        // 6. instantiate this rank's nodes and elements, sorted by id
        self.node_vector.clear();
        self.interface_node_vector.clear();
        self.elem_vector.clear();
        self.node_vector.reserve(self.rank_nnodes);
        self.interface_node_vector.reserve(self.rank_interface_nnodes);
        for (node_id, coords) in &nodes_coords {
            if self.node_id_set_owned.contains(node_id) {
                let mut node = Node::new(*node_id, *coords);
                node.set_parent_rank(self.rank, self.rank);
                self.node_vector.push(node);
            } else if self.interface_node_id_set.contains(node_id) {
                let mut node = Node::new(*node_id, *coords);
                node.set_parent_rank(node_rank_map[node_id], self.rank);
                self.interface_node_vector.push(node);
            }
        }
        self.make_elements(&elem_nodes_on_rank)?;

        info!(
            "rank {} of {}: {} owned nodes, {} interface nodes, {} elements",
            self.rank,
            self.num_ranks,
            self.rank_nnodes,
            self.rank_interface_nnodes,
            self.rank_nelems
        );

        // 7.-8. renumber owned nodes and tell the neighbours
        self.renumber_nodes(comm)?;
        self.exchange_interface_nodes_updated_ids(comm)?;

        // 9.-10. count DoFs and exchange the interface nz_i values
        self.count_and_exchange_distributed_dofs(comm)
    }

    /// Contiguous partition of the sorted node list; the last rank absorbs
    /// the remainder. Fills the owned-id set and returns the full
    /// `node_id -> owning rank` map.
    fn populate_node_rank_map(&mut self, nodes_coords: &NodeIdCoordsPairs) -> HashMap<u32, usize> {
        let nnodes = nodes_coords.len();
        let nodes_per_rank = nnodes / self.num_ranks;
        let mut node_rank_map = HashMap::with_capacity(nnodes);
        self.node_id_set_owned.clear();

        for rank_i in 0..self.num_ranks {
            let start = rank_i * nodes_per_rank;
            let end = if rank_i == self.num_ranks - 1 {
                nnodes
            } else {
                (rank_i + 1) * nodes_per_rank
            };
            for (node_id, _) in &nodes_coords[start..end] {
                node_rank_map.insert(*node_id, rank_i);
                if rank_i == self.rank {
                    self.node_id_set_owned.insert(*node_id);
                }
            }
        }
        node_rank_map
    }

    fn make_elements(&mut self, elem_nodes: &ElemIdNodeIdPairs) -> BlazeResult<()> {
        for (elem_id, node_ids) in elem_nodes {
            if node_ids.len() != 2 {
                return Err(BlazeError::InvalidInput(format!(
                    "element {} expects 2 nodes but got {}",
                    elem_id,
                    node_ids.len()
                )));
            }
            let mut slots = [NodeSlot::Owned(0); 2];
            let mut end_coords = [[0.0; 3]; 2];
            for (k, node_id) in node_ids.iter().enumerate() {
                let slot = self.find_node_slot(*node_id).ok_or(
                    BlazeError::UnknownElementNode {
                        elem_id: *elem_id,
                        node_id: *node_id,
                    },
                )?;
                slots[k] = slot;
                end_coords[k] = self.node(slot).coords();
            }
            for slot in slots {
                self.node_mut(slot).add_connected_element(*elem_id);
            }
            let elem =
                BeamElement::new(*elem_id, self.element_type, slots, end_coords, &self.section)?;
            self.elem_vector.push(elem);
        }
        self.elem_vector.sort_by_key(|e| e.id());
        Ok(())
    }

    // ---- renumbering and halo exchange -----------------------------------

    /// Assign contiguous new ids to the owned nodes; each rank's base comes
    /// from an all-gather of per-rank node counts.
    fn renumber_nodes(&mut self, comm: &dyn Collective) -> BlazeResult<()> {
        self.ranks_nnodes = comm.all_gather(self.rank_nnodes)?;
        self.rank_starting_node_id = 1 + self.ranks_nnodes[..self.rank].iter().sum::<usize>() as u32;

        let mut next_id = self.rank_starting_node_id;
        for node in &mut self.node_vector {
            node.set_id(next_id);
            next_id += 1;
        }
        debug!(
            "rank {}: owned node ids renumbered from {}",
            self.rank, self.rank_starting_node_id
        );
        Ok(())
    }

    /// One send/receive wave per neighbour carrying the renumbered ids of
    /// the nodes it wants; payloads are ordered by sorted original id on
    /// both sides.
    fn exchange_interface_nodes_updated_ids(&mut self, comm: &dyn Collective) -> BlazeResult<()> {
        for neighbour in self.neighbours() {
            let send: Vec<u32> = self
                .wanted_by_neighbour
                .get(&neighbour)
                .into_iter()
                .flatten()
                .map(|record_id| {
                    self.node_by_record_id(*record_id, Ownership::Owned)
                        .map(|n| n.id())
                })
                .collect::<BlazeResult<_>>()?;
            let wanted: Vec<u32> = self
                .wanted_from_neighbour
                .get(&neighbour)
                .into_iter()
                .flatten()
                .copied()
                .collect();

            let received = comm.send_recv_ids(neighbour, tags::HALO_IDS, &send, wanted.len())?;

            for (record_id, new_id) in wanted.iter().zip(received.iter()) {
                let slot = self
                    .find_node_slot(*record_id)
                    .ok_or(BlazeError::NodeNotFound(*record_id, "interface"))?;
                self.node_mut(slot).set_id(*new_id);
            }
        }
        Ok(())
    }

    /// One send/receive wave per neighbour carrying the global DoF start
    /// index of every wanted node.
    fn exchange_interface_nodes_nz_i(&mut self, comm: &dyn Collective) -> BlazeResult<()> {
        for neighbour in self.neighbours() {
            let send: Vec<i64> = self
                .wanted_by_neighbour
                .get(&neighbour)
                .into_iter()
                .flatten()
                .map(|record_id| {
                    self.node_by_record_id(*record_id, Ownership::Owned)
                        .map(|n| n.nz_i() as i64)
                })
                .collect::<BlazeResult<_>>()?;
            let wanted: Vec<u32> = self
                .wanted_from_neighbour
                .get(&neighbour)
                .into_iter()
                .flatten()
                .copied()
                .collect();

            let received = comm.send_recv_ints(neighbour, tags::HALO_NZ_I, &send, wanted.len())?;

            for (record_id, nz_i) in wanted.iter().zip(received.iter()) {
                let slot = self
                    .find_node_slot(*record_id)
                    .ok_or(BlazeError::NodeNotFound(*record_id, "interface"))?;
                self.node_mut(slot).set_nz_i(*nz_i as usize);
            }
        }
        Ok(())
    }

    fn neighbours(&self) -> Vec<usize> {
        let mut neighbours: BTreeSet<usize> = self.wanted_by_neighbour.keys().copied().collect();
        neighbours.extend(self.wanted_from_neighbour.keys().copied());
        neighbours.into_iter().collect()
    }

    /// Count active DoFs over the sorted owned nodes, shift every `nz_i` by
    /// the sum of lower ranks' counts, and refresh the interface copies.
    /// Re-run after any fixity change.
    pub fn count_and_exchange_distributed_dofs(
        &mut self,
        comm: &dyn Collective,
    ) -> BlazeResult<()> {
        self.rank_ndofs = 0;
        for node in &mut self.node_vector {
            node.set_nz_i(self.rank_ndofs);
            self.rank_ndofs += node.ndof();
        }

        self.ranks_ndofs = comm.all_gather(self.rank_ndofs)?;
        self.rank_starting_nz_i = self.ranks_ndofs[..self.rank].iter().sum();
        for node in &mut self.node_vector {
            node.increment_nz_i(self.rank_starting_nz_i);
        }
        self.ndofs = self.ranks_ndofs.iter().sum();

        self.exchange_interface_nodes_nz_i(comm)
    }

    // ---- node lookup -----------------------------------------------------

    fn find_owned_index(&self, record_id: u32) -> Option<usize> {
        self.node_vector
            .binary_search_by_key(&record_id, |n| n.record_id())
            .ok()
    }

    fn find_interface_index(&self, record_id: u32) -> Option<usize> {
        self.interface_node_vector
            .binary_search_by_key(&record_id, |n| n.record_id())
            .ok()
    }

    /// Locate a record id in the owned arena first, then the interface one.
    pub fn find_node_slot(&self, record_id: u32) -> Option<NodeSlot> {
        self.find_owned_index(record_id)
            .map(NodeSlot::Owned)
            .or_else(|| self.find_interface_index(record_id).map(NodeSlot::Interface))
    }

    pub fn node(&self, slot: NodeSlot) -> &Node {
        match slot {
            NodeSlot::Owned(i) => &self.node_vector[i],
            NodeSlot::Interface(i) => &self.interface_node_vector[i],
        }
    }

    pub fn node_mut(&mut self, slot: NodeSlot) -> &mut Node {
        match slot {
            NodeSlot::Owned(i) => &mut self.node_vector[i],
            NodeSlot::Interface(i) => &mut self.interface_node_vector[i],
        }
    }

    pub fn node_by_record_id(&self, record_id: u32, ownership: Ownership) -> BlazeResult<&Node> {
        let slot = match ownership {
            Ownership::Owned => self.find_owned_index(record_id).map(NodeSlot::Owned),
            Ownership::Interface => self.find_interface_index(record_id).map(NodeSlot::Interface),
            Ownership::All => self.find_node_slot(record_id),
        };
        slot.map(|s| self.node(s)).ok_or(BlazeError::NodeNotFound(
            record_id,
            match ownership {
                Ownership::Owned => "rank-owned",
                Ownership::Interface => "interface",
                Ownership::All => "all",
            },
        ))
    }

    /// Filter a user-supplied id list to the ids present on this rank in the
    /// requested ownership class.
    pub fn filter_node_ids<I: IntoIterator<Item = u32>>(
        &self,
        ids: I,
        ownership: Ownership,
    ) -> BTreeSet<u32> {
        ids.into_iter()
            .filter(|id| match ownership {
                Ownership::Owned => self.node_id_set_owned.contains(id),
                Ownership::Interface => self.interface_node_id_set.contains(id),
                Ownership::All => {
                    self.node_id_set_owned.contains(id)
                        || self.interface_node_id_set.contains(id)
                }
            })
            .collect()
    }

    // ---- boundary conditions and loads -----------------------------------

    /// Fix one freedom of a node (any copy on this rank); a negative index
    /// fixes all six.
    pub fn fix_node(&mut self, record_id: u32, dof: i32) -> BlazeResult<()> {
        let slot = self
            .find_node_slot(record_id)
            .ok_or(BlazeError::NodeNotFound(record_id, "all"))?;
        if dof < 0 {
            self.node_mut(slot).fix_all_dofs();
            Ok(())
        } else {
            self.node_mut(slot).fix_dof(dof as usize)
        }
    }

    /// Set the load on a freedom of an owned node.
    pub fn load_node(&mut self, record_id: u32, dof: usize, load: f64) -> BlazeResult<()> {
        let index = self
            .find_owned_index(record_id)
            .ok_or(BlazeError::NodeNotFound(record_id, "rank-owned"))?;
        self.node_vector[index].add_nodal_load(load, dof)
    }

    /// Add a load increment on a freedom of an owned node.
    pub fn increment_node_load(
        &mut self,
        record_id: u32,
        dof: usize,
        increment: f64,
    ) -> BlazeResult<()> {
        let index = self
            .find_owned_index(record_id)
            .ok_or(BlazeError::NodeNotFound(record_id, "rank-owned"))?;
        self.node_vector[index].increment_nodal_load(increment, dof)
    }

    /// Fail if any owned node has a freedom that is both restrained and
    /// loaded.
    pub fn check_nodal_loads(&self) -> BlazeResult<()> {
        for node in &self.node_vector {
            node.check_loads()?;
        }
        Ok(())
    }

    // ---- element state ---------------------------------------------------

    /// Precompute every element's stiffness map. Call after restraints are
    /// final (and again after any fixity change).
    pub fn map_element_stiffnesses(&mut self) {
        let owned = &self.node_vector;
        let interface = &self.interface_node_vector;
        self.elem_vector
            .par_iter_mut()
            .for_each(|elem| elem.map_stiffness(owned, interface));
    }

    /// Recompute every element's state and triplet buffers from the current
    /// nodal displacements.
    pub fn update_elements_states(&mut self) {
        let owned = &self.node_vector;
        let interface = &self.interface_node_vector;
        self.elem_vector
            .par_iter_mut()
            .for_each(|elem| elem.update_state(owned, interface));
    }

    /// Commit plastic section states after a converged load step.
    pub fn update_element_sections_starting_states(&mut self) {
        self.elem_vector
            .par_iter_mut()
            .for_each(|elem| elem.update_section_starting_state());
    }

    /// Refresh every owned node's load triplets.
    pub fn calc_nodal_contributions_to_p(&mut self) {
        for node in &mut self.node_vector {
            node.compute_load_triplets();
        }
    }

    // ---- accessors -------------------------------------------------------

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    pub fn num_nodes(&self) -> usize {
        self.nnodes
    }

    pub fn num_elems(&self) -> usize {
        self.nelems
    }

    pub fn ndofs(&self) -> usize {
        self.ndofs
    }

    pub fn rank_ndofs(&self) -> usize {
        self.rank_ndofs
    }

    pub fn rank_starting_nz_i(&self) -> usize {
        self.rank_starting_nz_i
    }

    pub fn rank_num_nodes(&self) -> usize {
        self.rank_nnodes
    }

    pub fn rank_num_interface_nodes(&self) -> usize {
        self.rank_interface_nnodes
    }

    pub fn rank_num_elems(&self) -> usize {
        self.rank_nelems
    }

    pub fn owned_node_ids(&self) -> &BTreeSet<u32> {
        &self.node_id_set_owned
    }

    pub fn interface_node_ids(&self) -> &BTreeSet<u32> {
        &self.interface_node_id_set
    }

    pub fn wanted_by_neighbour(&self) -> &BTreeMap<usize, BTreeSet<u32>> {
        &self.wanted_by_neighbour
    }

    pub fn wanted_from_neighbour(&self) -> &BTreeMap<usize, BTreeSet<u32>> {
        &self.wanted_from_neighbour
    }

    pub fn nodes(&self) -> &[Node] {
        &self.node_vector
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.node_vector
    }

    pub fn interface_nodes(&self) -> &[Node] {
        &self.interface_node_vector
    }

    pub fn interface_nodes_mut(&mut self) -> &mut [Node] {
        &mut self.interface_node_vector
    }

    pub fn elements(&self) -> &[BeamElement] {
        &self.elem_vector
    }

    pub fn element_by_id(&self, elem_id: u32) -> BlazeResult<&BeamElement> {
        self.elem_vector
            .iter()
            .find(|e| e.id() == elem_id)
            .ok_or(BlazeError::ElementNotFound(elem_id))
    }
}
