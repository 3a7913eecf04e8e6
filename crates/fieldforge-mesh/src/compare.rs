//! Tolerant comparison of a generated mesh against its ground truth.
//!
//! Vertex order out of the mesher is not stable across library versions, so
//! every generated vertex is paired with an unused expected vertex within
//! `tolerance`. Expected vertices that coincide within `tolerance` share one
//! rank; faces of both meshes are rewritten over those ranks, rotated to
//! their smallest rotation, and compared as a multiset.

use std::cmp::Ordering;

use glam::DVec3;
use thiserror::Error;

use crate::data::MeshData;

/// Default per-component vertex tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Why two meshes were judged different.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MeshMismatch {
    #[error("vertex count mismatch: {generated} vs {expected}")]
    VertexCount { generated: usize, expected: usize },
    #[error("face count mismatch: {generated} vs {expected}")]
    FaceCount { generated: usize, expected: usize },
    #[error("vertex mismatch: {generated} vs {expected}")]
    Vertex { generated: DVec3, expected: DVec3 },
    #[error("face topology differs")]
    Topology,
}

/// Compares `generated` with `expected`.
///
/// Passes iff vertex and face counts are equal, every generated vertex can be
/// paired with a distinct expected vertex within `tolerance` on every
/// component, and the canonical face multisets match.
pub fn compare_meshes(
    generated: &MeshData,
    expected: &MeshData,
    tolerance: f64,
) -> Result<(), MeshMismatch> {
    if generated.vertex_count() != expected.vertex_count() {
        return Err(MeshMismatch::VertexCount {
            generated: generated.vertex_count(),
            expected: expected.vertex_count(),
        });
    }
    if generated.face_count() != expected.face_count() {
        return Err(MeshMismatch::FaceCount {
            generated: generated.face_count(),
            expected: expected.face_count(),
        });
    }

    let matching = match_vertices(&generated.vertices, &expected.vertices, tolerance)?;
    let ranks_expected = coincident_ranks(&expected.vertices, tolerance);
    let ranks_generated: Vec<u32> = matching.iter().map(|&e| ranks_expected[e]).collect();

    if canonical_faces(&generated.faces, &ranks_generated)
        != canonical_faces(&expected.faces, &ranks_expected)
    {
        return Err(MeshMismatch::Topology);
    }
    Ok(())
}

fn lexicographic(a: &DVec3, b: &DVec3) -> Ordering {
    a.x.total_cmp(&b.x)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.z.total_cmp(&b.z))
}

fn sorted_indices(vertices: &[DVec3]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..vertices.len()).collect();
    order.sort_by(|&a, &b| lexicographic(&vertices[a], &vertices[b]).then(a.cmp(&b)));
    order
}

/// Indices in `order` (sorted by x) whose x lies within `tolerance` of `p.x`.
fn x_window<'a>(
    vertices: &'a [DVec3],
    order: &'a [usize],
    p: DVec3,
    tolerance: f64,
) -> impl Iterator<Item = usize> + 'a {
    let start = order.partition_point(|&i| vertices[i].x < p.x - tolerance);
    order[start..]
        .iter()
        .copied()
        .take_while(move |&i| vertices[i].x <= p.x + tolerance)
}

/// For each generated vertex, the index of the expected vertex it is paired
/// with. Generated vertices are taken in sorted order and each takes the
/// closest unused expected vertex within `tolerance`.
fn match_vertices(
    generated: &[DVec3],
    expected: &[DVec3],
    tolerance: f64,
) -> Result<Vec<usize>, MeshMismatch> {
    let expected_order = sorted_indices(expected);
    let mut taken = vec![false; expected.len()];
    let mut matching = vec![0; generated.len()];

    for g in sorted_indices(generated) {
        let p = generated[g];
        let closest = x_window(expected, &expected_order, p, tolerance)
            .filter(|&e| !taken[e] && expected[e].abs_diff_eq(p, tolerance))
            .min_by(|&a, &b| {
                expected[a]
                    .distance_squared(p)
                    .total_cmp(&expected[b].distance_squared(p))
            });
        match closest {
            Some(e) => {
                taken[e] = true;
                matching[g] = e;
            }
            None => {
                return Err(MeshMismatch::Vertex {
                    generated: p,
                    expected: nearest(expected, p),
                });
            }
        }
    }
    Ok(matching)
}

fn nearest(vertices: &[DVec3], p: DVec3) -> DVec3 {
    vertices
        .iter()
        .copied()
        .min_by(|a, b| a.distance_squared(p).total_cmp(&b.distance_squared(p)))
        .unwrap_or(DVec3::NAN)
}

/// Rank of each vertex in sorted order, where vertices within `tolerance` of
/// an earlier one reuse its rank.
fn coincident_ranks(vertices: &[DVec3], tolerance: f64) -> Vec<u32> {
    let order = sorted_indices(vertices);
    let mut ranks = vec![0_u32; vertices.len()];
    let mut next = 0_u32;
    for (position, &v) in order.iter().enumerate() {
        let p = vertices[v];
        let shared = x_window(vertices, &order[..position], p, tolerance)
            .find(|&earlier| vertices[earlier].abs_diff_eq(p, tolerance))
            .map(|earlier| ranks[earlier]);
        ranks[v] = shared.unwrap_or_else(|| {
            next += 1;
            next - 1
        });
    }
    ranks
}

fn canonical_faces(faces: &[Vec<u32>], ranks: &[u32]) -> Vec<Vec<u32>> {
    let mut canonical: Vec<Vec<u32>> = faces
        .iter()
        .map(|face| {
            let mapped: Vec<u32> = face
                .iter()
                .map(|&i| ranks.get(i as usize).copied().unwrap_or(u32::MAX))
                .collect();
            // Rotation keeps winding; only the starting corner is normalised.
            (0..mapped.len())
                .map(|start| {
                    let mut rotated = mapped.clone();
                    rotated.rotate_left(start);
                    rotated
                })
                .min()
                .unwrap_or_default()
        })
        .collect();
    canonical.sort_unstable();
    canonical
}
