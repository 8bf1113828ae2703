//! Element-level building blocks: nodes, materials, sections, transforms,
//! beam-columns, and restraints.

pub mod beam;
pub mod material;
pub mod node;
pub mod restraint;
pub mod section;
pub mod transform;

pub use beam::{BeamElement, ElementType, NodeSlot};
pub use material::ElasticPlasticMaterial;
pub use node::{Node, DOFS_PER_NODE};
pub use restraint::{NodalRestraint, RestraintManager};
pub use section::{i_section_fibres, BasicSection, Fibre, FibreSection, Section};
pub use transform::CorotationalTransform;
