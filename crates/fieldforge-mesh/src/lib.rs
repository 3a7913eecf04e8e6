//! Mesh data exchanged with the mesher, the meshing region, the OBJ codec
//! used for ground-truth files, and tolerant mesh comparison.

pub mod compare;
pub mod data;
pub mod error;
pub mod obj;
pub mod region;

pub use compare::{DEFAULT_TOLERANCE, MeshMismatch, compare_meshes};
pub use data::MeshData;
pub use error::ObjError;
pub use obj::{parse_obj, read_obj, to_obj_string, write_obj};
pub use region::MeshRegion;
