use crate::*;
use std::io::{self, Write};

/// Dense, zero-based indices for every element in iteration order, keyed by
/// element id. This is all a converter to flat arrays needs.
#[derive(Debug, Default, Clone)]
pub struct ExportIndex {
    verts: HashMap<usize, usize>,
    edges: HashMap<usize, usize>,
    faces: HashMap<usize, usize>,
}

impl ExportIndex {
    pub fn vert(&self, id: usize) -> Option<usize> {
        self.verts.get(&id).copied()
    }

    pub fn edge(&self, id: usize) -> Option<usize> {
        self.edges.get(&id).copied()
    }

    pub fn face(&self, id: usize) -> Option<usize> {
        self.faces.get(&id).copied()
    }
}

/// A per-corner attribute, deduplicated per vertex within a face.
struct VertAttr<F> {
    func: F,
    items: Vec<Vec3>,
    local: HashMap<usize, Option<usize>>,
}

impl<F> VertAttr<F> {
    fn new(func: F) -> Self {
        Self {
            func,
            items: Vec::new(),
            local: HashMap::new(),
        }
    }

    fn add<'tok, 'brand, 'arena>(&mut self, face: lens!(Face), vert: lens!(Vertex)) -> Option<usize>
    where
        F: FnMut(lens!(Face), lens!(Vertex)) -> Option<Vec3>,
    {
        *self.local.entry(vert.id()).or_insert_with(|| {
            (self.func)(face, vert).map(|item| {
                self.items.push(item);
                self.items.len()
            })
        })
    }
}

/// Writes a mesh as Wavefront OBJ: one `v` per vertex, one `f` per face,
/// and a `vn` per corner for which `vertex_normal` returns something.
pub struct ObjExport<'tok, 'brand, 'arena, W, VNorm> {
    writer: &'tok mut W,
    mesh: &'tok Mesh<'brand, 'arena>,
    index: ExportIndex,
    normals: VertAttr<VNorm>,
}

impl<'tok, 'brand, 'arena, W, VNorm> ObjExport<'tok, 'brand, 'arena, W, VNorm>
where
    W: Write,
    VNorm: FnMut(lens!(Face), lens!(Vertex)) -> Option<Vec3>,
{
    pub fn export(
        writer: &'tok mut W,
        mesh: &'tok Mesh<'brand, 'arena>,
        vertex_normal: VNorm,
    ) -> io::Result<()> {
        Self {
            writer,
            mesh,
            index: mesh.export_indices(),
            normals: VertAttr::new(vertex_normal),
        }
        .write()
    }

    fn write(&mut self) -> io::Result<()> {
        let mesh = self.mesh;
        for v in mesh.iter_verts() {
            let Vec3 { x, y, z } = v.co();
            writeln!(self.writer, "v {x} {y} {z}")?;
        }

        // normals are only known after walking the faces
        let mut faces = Vec::with_capacity(mesh.face_count());
        for face in mesh.iter_faces() {
            let mut line = String::from("f");
            for l in face.iter_loops() {
                let vert = l.vert();
                // OBJ counts from one
                let pos = self.index.vert(vert.id()).map_or(0, |i| i + 1);
                match self.normals.add(face, vert) {
                    Some(n) => line.push_str(&format!(" {pos}//{n}")),
                    None => line.push_str(&format!(" {pos}")),
                }
            }
            self.normals.local.clear();
            faces.push(line);
        }

        for Vec3 { x, y, z } in &self.normals.items {
            writeln!(self.writer, "vn {x} {y} {z}")?;
        }
        for line in faces {
            writeln!(self.writer, "{line}")?;
        }

        Ok(())
    }
}

impl<'brand, 'arena> Mesh<'brand, 'arena> {
    /// Number every vertex, edge and face in iteration order.
    pub fn export_indices(&self) -> ExportIndex {
        ExportIndex {
            verts: self.iter_verts().enumerate().map(|(i, v)| (v.id(), i)).collect(),
            edges: self.iter_edges().enumerate().map(|(i, e)| (e.id(), i)).collect(),
            faces: self.iter_faces().enumerate().map(|(i, f)| (f.id(), i)).collect(),
        }
    }

    /// Write positions and faces as OBJ, without normals.
    pub fn write_obj(&self, writer: &mut impl Write) -> io::Result<()> {
        ObjExport::export(writer, self, |_, _| None)
    }

    /// Write as OBJ with the stored face normal on every corner.
    pub fn write_obj_with_normals(&self, writer: &mut impl Write) -> io::Result<()> {
        ObjExport::export(writer, self, |face, _| Some(face.item.no(&face)))
    }
}
