pub mod call_tree;
pub mod profile;

pub use call_tree::{CallTree, ProfileNode};
pub use profile::{CallFrame, CpuProfile, NodeRecord};
