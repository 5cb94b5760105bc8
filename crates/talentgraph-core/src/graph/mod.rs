//! Knowledge graph: typed nodes and edges over SQLite
//!
//! Nodes are keyed by (node_type, node_id); properties are a typed record
//! per node kind with a JSON bag for forward-compatible unknown fields.
//! Embedding vectors live on nodes as little-endian f32 BLOBs and are read
//! and written through calls separate from property access.

mod edge;
mod node;
mod store;

pub use edge::{EdgeKind, EdgeProperties, EmploymentProps, GraduationProps, HasSkillProps};
pub use node::{
    company_node_id, education_node_id, person_node_id, skill_node_id, CompanyProps,
    EducationProps, GraphNode, NodeKind, NodeProperties, PersonProps, SkillProps, EMBEDDING_DIM,
};
pub use store::{embedding_from_bytes, embedding_to_bytes, GraphStore};
