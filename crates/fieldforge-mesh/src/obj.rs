//! Wavefront OBJ reading and writing.
//!
//! Only geometry is handled: `v` records become vertices, `f` records become
//! faces. Face tokens of the form `a`, `a/b`, `a//c` or `a/b/c` are accepted
//! and only the position index `a` is kept. Indices are 1-based on disk;
//! negative indices count back from the last vertex read so far. Every other
//! record (normals, texture coordinates, groups, comments) is ignored.

use std::fs;
use std::path::Path;

use glam::DVec3;
use tracing::debug;

use crate::data::MeshData;
use crate::error::ObjError;

/// Reads and parses the OBJ file at `path`.
pub fn read_obj(path: &Path) -> Result<MeshData, ObjError> {
    let text = fs::read_to_string(path).map_err(|e| ObjError::io(path, e))?;
    let mesh = parse_obj(&text)?;
    debug!(
        "Read {} ({} vertices, {} faces)",
        path.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

/// Writes `mesh` to `path`, creating parent directories as needed.
pub fn write_obj(path: &Path, mesh: &MeshData) -> Result<(), ObjError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ObjError::io(parent, e))?;
    }
    fs::write(path, to_obj_string(mesh)).map_err(|e| ObjError::io(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Parses OBJ text.
pub fn parse_obj(text: &str) -> Result<MeshData, ObjError> {
    let mut mesh = MeshData::default();

    for (line_index, raw) in text.lines().enumerate() {
        let line = line_index + 1;
        let mut tokens = raw.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let mut coords = [0.0_f64; 3];
                for coord in &mut coords {
                    let token = tokens
                        .next()
                        .ok_or_else(|| ObjError::invalid(line, "vertex needs three coordinates"))?;
                    *coord = token.parse().map_err(|_| {
                        ObjError::invalid(line, format!("invalid coordinate {token:?}"))
                    })?;
                }
                // An optional w component or vertex colour may follow.
                mesh.vertices.push(DVec3::from_array(coords));
            }
            Some("f") => {
                let face = tokens
                    .map(|token| resolve_index(token, line, mesh.vertices.len()))
                    .collect::<Result<Vec<u32>, ObjError>>()?;
                if face.len() < 3 {
                    return Err(ObjError::invalid(line, "face needs at least three vertices"));
                }
                mesh.faces.push(face);
            }
            _ => {}
        }
    }

    Ok(mesh)
}

/// Converts one face token to a 0-based vertex index.
fn resolve_index(token: &str, line: usize, vertex_count: usize) -> Result<u32, ObjError> {
    let position = token.split('/').next().unwrap_or_default();
    let raw: i64 = position
        .parse()
        .map_err(|_| ObjError::invalid(line, format!("invalid face index {token:?}")))?;

    let out_of_range = || ObjError::IndexOutOfRange {
        line,
        index: raw,
        vertex_count,
    };
    let resolved = match raw {
        0 => return Err(out_of_range()),
        r if r > 0 => r - 1,
        r => vertex_count as i64 + r,
    };
    if resolved < 0 || resolved >= vertex_count as i64 {
        return Err(out_of_range());
    }
    u32::try_from(resolved).map_err(|_| out_of_range())
}

/// Renders `mesh` as OBJ text.
///
/// Coordinates use the shortest representation that parses back to the same
/// `f64`, so writing the same mesh twice yields identical bytes.
pub fn to_obj_string(mesh: &MeshData) -> String {
    let mut out = String::with_capacity(32 * (mesh.vertices.len() + mesh.faces.len()) + 32);
    out.push_str("# fieldforge mesh\n");
    for v in &mesh.vertices {
        out.push_str(&format!("v {} {} {}\n", v.x, v.y, v.z));
    }
    for face in &mesh.faces {
        out.push('f');
        for index in face {
            out.push_str(&format!(" {}", u64::from(*index) + 1));
        }
        out.push('\n');
    }
    out
}
