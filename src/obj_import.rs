use crate::*;
pub use obj;
use obj::raw::object::{Polygon, RawObj};
use std::io::BufRead;

#[derive(Debug, Error)]
pub enum ObjImportError {
    #[error("parse error: {0}")]
    Parse(#[from] obj::ObjError),
    #[error("face {0} is empty")]
    EmptyFace(usize),
    #[error("invalid polygon: {0}")]
    Make(#[from] MakeError),
}

pub struct ObjImport<'tok, 'brand, 'arena> {
    mesh: &'tok mut Mesh<'brand, 'arena>,
    obj: &'tok RawObj,
}

impl<'tok, 'brand, 'arena> ObjImport<'tok, 'brand, 'arena> {
    /// Add every position of `obj` as a vertex and every polygon as a face.
    ///
    /// Texture and normal indices are ignored. Nothing is added on error.
    pub fn import(
        mesh: &'tok mut Mesh<'brand, 'arena>,
        obj: &'tok RawObj,
    ) -> Result<(Vec<ptr!(Vertex)>, Vec<ptr!(Face)>), ObjImportError> {
        ObjImport { mesh, obj }.import_faces()
    }

    fn iter_polygon(p: &Polygon) -> impl DoubleEndedIterator<Item = usize> + '_ {
        use either::{Left, Right};
        use Polygon::*;

        match p {
            P(v) => Left(Left(v.iter().cloned())),
            PT(v) => Left(Right(v.iter().map(|&(x, _)| x))),
            PN(v) => Right(Left(v.iter().map(|&(x, _)| x))),
            PTN(v) => Right(Right(v.iter().map(|&(x, _, _)| x))),
        }
    }

    fn import_faces(self) -> Result<(Vec<ptr!(Vertex)>, Vec<ptr!(Face)>), ObjImportError> {
        let positions: Vec<_> = self
            .obj
            .positions
            .iter()
            .map(|&(x, y, z, _)| Vec3::new(x, y, z))
            .collect();

        let mut polygons = Vec::with_capacity(self.obj.polygons.len());
        for (i, p) in self.obj.polygons.iter().enumerate() {
            let indices: Vec<_> = Self::iter_polygon(p).collect();
            if indices.is_empty() {
                return Err(ObjImportError::EmptyFace(i + 1));
            }
            polygons.push(indices);
        }

        let (verts, faces) = self.mesh.add_polygons(&positions, &polygons)?;
        tracing::debug!(verts = verts.len(), faces = faces.len(), "imported obj");
        Ok((verts, faces))
    }
}

impl<'brand, 'arena> Mesh<'brand, 'arena> {
    pub fn import_obj(
        &mut self,
        obj: &RawObj,
    ) -> Result<(Vec<ptr!(Vertex)>, Vec<ptr!(Face)>), ObjImportError> {
        ObjImport::import(self, obj)
    }

    /// Parse OBJ text from `reader` and import it.
    pub fn read_obj(
        &mut self,
        reader: impl BufRead,
    ) -> Result<(Vec<ptr!(Vertex)>, Vec<ptr!(Face)>), ObjImportError> {
        let obj = obj::raw::parse_obj(reader)?;
        self.import_obj(&obj)
    }
}
