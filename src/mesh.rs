//! Triangle mesh input for the renderer.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use obj::raw::object::Polygon;
use obj::raw::{parse_obj, RawObj};

use crate::error::MeshError;
use crate::geometry::{Vec2f, Vec3f};

/// Indices of one face corner. All indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub vertex: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    pub fn position(vertex: usize) -> Self {
        FaceVertex {
            vertex,
            uv: None,
            normal: None,
        }
    }

    pub fn textured(vertex: usize, uv: usize) -> Self {
        FaceVertex {
            vertex,
            uv: Some(uv),
            normal: None,
        }
    }
}

/// Read access to an already parsed mesh. Getters return None for indices
/// past the end.
pub trait MeshSource {
    fn vertex_count(&self) -> usize;
    fn face_count(&self) -> usize;
    fn vertex(&self, i: usize) -> Option<Vec3f>;
    /// Corners of a face in winding order; faces may have more than 3 corners.
    fn face(&self, i: usize) -> Option<&[FaceVertex]>;
    fn uv(&self, i: usize) -> Option<Vec2f>;
    fn normal(&self, i: usize) -> Option<Vec3f>;
}

/// In-memory mesh with validated indices.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vec3f>,
    uvs: Vec<Vec2f>,
    normals: Vec<Vec3f>,
    faces: Vec<Vec<FaceVertex>>,
}

impl Mesh {
    /// Builds a mesh, checking that every face index points at existing data.
    pub fn new(
        vertices: Vec<Vec3f>,
        uvs: Vec<Vec2f>,
        normals: Vec<Vec3f>,
        faces: Vec<Vec<FaceVertex>>,
    ) -> Result<Mesh, MeshError> {
        fn check(face: usize, kind: &'static str, index: usize, count: usize) -> Result<(), MeshError> {
            if index >= count {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    kind,
                    index,
                    count,
                });
            }
            Ok(())
        }

        for (i, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(MeshError::FaceTooSmall { face: i, len: face.len() });
            }
            for corner in face {
                check(i, "vertex", corner.vertex, vertices.len())?;
                if let Some(uv) = corner.uv {
                    check(i, "uv", uv, uvs.len())?;
                }
                if let Some(normal) = corner.normal {
                    check(i, "normal", normal, normals.len())?;
                }
            }
        }

        return Ok(Mesh {
            vertices,
            uvs,
            normals,
            faces,
        });
    }

    /// Parses Wavefront OBJ text.
    pub fn from_obj_reader<R: BufRead>(reader: R) -> Result<Mesh, MeshError> {
        let raw = parse_obj(reader)?;
        return Mesh::from_raw_obj(raw);
    }

    pub fn load_obj(path: impl AsRef<Path>) -> Result<Mesh, MeshError> {
        let file = File::open(path)?;
        let mesh = Mesh::from_obj_reader(BufReader::new(file))?;
        log::info!(
            "Loaded mesh: {} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        );
        return Ok(mesh);
    }

    fn from_raw_obj(raw: RawObj) -> Result<Mesh, MeshError> {
        let vertices: Vec<Vec3f> = raw
            .positions
            .iter()
            .map(|&(x, y, z, _w)| Vec3f::new(x, y, z))
            .collect();
        let uvs: Vec<Vec2f> = raw.tex_coords.iter().map(|&(u, v, _w)| Vec2f::new(u, v)).collect();
        let normals: Vec<Vec3f> = raw
            .normals
            .iter()
            .map(|&(x, y, z)| Vec3f::new(x, y, z))
            .collect();

        // obj-rs already converted the 1-based file indices.
        let faces: Vec<Vec<FaceVertex>> = raw
            .polygons
            .into_iter()
            .map(|polygon| -> Vec<FaceVertex> {
                match polygon {
                    Polygon::P(corners) => corners.into_iter().map(FaceVertex::position).collect(),
                    Polygon::PT(corners) => corners
                        .into_iter()
                        .map(|(v, t)| FaceVertex::textured(v, t))
                        .collect(),
                    Polygon::PN(corners) => corners
                        .into_iter()
                        .map(|(v, n)| FaceVertex {
                            vertex: v,
                            uv: None,
                            normal: Some(n),
                        })
                        .collect(),
                    Polygon::PTN(corners) => corners
                        .into_iter()
                        .map(|(v, t, n)| FaceVertex {
                            vertex: v,
                            uv: Some(t),
                            normal: Some(n),
                        })
                        .collect(),
                }
            })
            .collect();

        return Mesh::new(vertices, uvs, normals, faces);
    }
}

impl MeshSource for Mesh {
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn vertex(&self, i: usize) -> Option<Vec3f> {
        self.vertices.get(i).copied()
    }

    fn face(&self, i: usize) -> Option<&[FaceVertex]> {
        self.faces.get(i).map(|face| face.as_slice())
    }

    fn uv(&self, i: usize) -> Option<Vec2f> {
        self.uvs.get(i).copied()
    }

    fn normal(&self, i: usize) -> Option<Vec3f> {
        self.normals.get(i).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# unit quad split in two
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

    #[test]
    fn obj_text_is_parsed_with_zero_based_indices() {
        let mesh = Mesh::from_obj_reader(QUAD.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        let face = mesh.face(1).unwrap();
        assert_eq!(
            face[1],
            FaceVertex {
                vertex: 2,
                uv: Some(2),
                normal: Some(0)
            }
        );
        assert_eq!(mesh.vertex(2), Some(Vec3f::new(1.0, 1.0, 0.0)));
        assert_eq!(mesh.uv(3), Some(Vec2f::new(0.0, 1.0)));
        assert_eq!(mesh.normal(0), Some(Vec3f::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn position_only_faces_have_no_uv() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = Mesh::from_obj_reader(text.as_bytes()).unwrap();
        assert_eq!(mesh.face(0).unwrap()[0], FaceVertex::position(0));
        assert_eq!(mesh.face(1), None);
        assert_eq!(mesh.vertex(3), None);
    }

    #[test]
    fn dangling_indices_are_rejected() {
        let err = Mesh::new(
            vec![Vec3f::default(); 3],
            Vec::new(),
            Vec::new(),
            vec![vec![
                FaceVertex::position(0),
                FaceVertex::position(1),
                FaceVertex::textured(2, 0),
            ]],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::IndexOutOfRange { kind: "uv", .. }));
    }

    #[test]
    fn faces_need_three_corners() {
        let err = Mesh::new(
            vec![Vec3f::default(); 2],
            Vec::new(),
            Vec::new(),
            vec![vec![FaceVertex::position(0), FaceVertex::position(1)]],
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::FaceTooSmall { face: 0, len: 2 }));
    }
}
