use crate::*;

// Split Face-Make Edge

/// Split a face in two by a new edge between two of its vertices.
///
/// See [`Mesh::split_face`] for details.
pub struct Sfme<'brand, 'arena> {
    pub face: ptr!(Face),
    pub v1: ptr!(Vertex),
    pub v2: ptr!(Vertex),
}

impl<'brand, 'arena> Sfme<'brand, 'arena> {
    pub fn new(face: ptr!(Face), v1: ptr!(Vertex), v2: ptr!(Vertex)) -> Self {
        Self { face, v1, v2 }
    }
}

/// Precondition Error for [`Sfme`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SfmeError {
    #[error("face is dead")]
    Dead,
    #[error("both vertices are the same")]
    SameVertex,
    #[error("vertex is not part of face")]
    VertexNotInFace,
    #[error("vertices are adjacent in face")]
    Adjacent,
}

impl<'brand, 'arena> Operator<'brand, 'arena> for Sfme<'brand, 'arena> {
    type Inverse = Jfke<'brand, 'arena>;
    type Error = SfmeError;
    type Check = [ptr!(Loop); 2];

    fn check(&self, mesh: &Mesh<'brand, 'arena>) -> Result<Self::Check, Self::Error> {
        use SfmeError::*;

        or_err(self.face.alive(mesh), Dead)?;
        or_err(self.v1 != self.v2, SameVertex)?;

        let l1 = self.face.find_loop(self.v1, mesh).ok_or(VertexNotInFace)?;
        let l2 = self.face.find_loop(self.v2, mesh).ok_or(VertexNotInFace)?;

        or_err(
            l1.next(mesh) != l2 && l2.next(mesh) != l1,
            Adjacent,
        )?;

        Ok([l1, l2])
    }

    fn apply(
        self,
        mesh: &mut Mesh<'brand, 'arena>,
    ) -> Result<Self::Inverse, OperatorErr<Self, Self::Error>> {
        //   p2 <---- l2          p2 <---- l2
        //   |         ^          |   lb    ^
        //   v         |    =>    v  ---->  |
        //   l1 ----> p1          l1 <---- p1
        //                              la

        let [l1, l2] = try_check!(self, mesh);
        let face = self.face;
        let (p1, p2) = (l1.prev(mesh), l2.prev(mesh));

        let edge = mesh.make_edge_unchecked(self.v1, self.v2, None);
        let la = mesh.make_loop(self.v1, edge, face, Some(l1));
        let lb = mesh.make_loop(self.v2, edge, face, Some(l2));
        la.radial_append(edge, mesh);
        lb.radial_append(edge, mesh);

        mesh.follow(p1, la);
        mesh.follow(la, l2);
        mesh.follow(p2, lb);
        mesh.follow(lb, l1);

        // the half holding the face's first loop stays with the face
        let base = face.loops(mesh);
        let a_keeps_base = la.iter_loops_from(mesh).any(|l| l.item == base);
        let (kept, moved) = if a_keeps_base { (la, lb) } else { (lb, la) };

        let new_face = mesh.make_face_empty(Some(face));
        new_face.set_loops(moved, mesh);

        let moved_loops: Vec<_> = moved.iter_loops_from(mesh).map(|l| l.item).collect();
        for &l in &moved_loops {
            l.set_face(new_face, mesh);
        }
        new_face.set_len(moved_loops.len(), mesh);

        let kept_len = kept.iter_loops_from(mesh).count();
        face.set_len(kept_len, mesh);

        Ok(Jfke {
            face_a: face,
            face_b: new_face,
            edge,
        })
    }
}

// Join Faces-Kill Edge

/// Merge two faces across a shared edge, removing the edge.
///
/// See [`Mesh::join_faces`] for details.
pub struct Jfke<'brand, 'arena> {
    pub face_a: ptr!(Face),
    pub face_b: ptr!(Face),
    pub edge: ptr!(Edge),
}

impl<'brand, 'arena> Jfke<'brand, 'arena> {
    pub fn new(face_a: ptr!(Face), face_b: ptr!(Face), edge: ptr!(Edge)) -> Self {
        Self {
            face_a,
            face_b,
            edge,
        }
    }
}

/// Precondition Error for [`Jfke`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JfkeError {
    #[error("face or edge is dead")]
    Dead,
    #[error("both faces are the same")]
    SameFace,
    #[error("edge is used by {0} faces, expected 2")]
    NotManifold(usize),
    #[error("edge is not part of face")]
    EdgeNotInFace,
    #[error("faces share more than one edge")]
    MultipleSharedEdges,
    #[error("faces have opposite winding")]
    WindingMismatch,
}

impl<'brand, 'arena> Operator<'brand, 'arena> for Jfke<'brand, 'arena> {
    type Inverse = Sfme<'brand, 'arena>;
    type Error = JfkeError;
    type Check = [ptr!(Loop); 2];

    fn check(&self, mesh: &Mesh<'brand, 'arena>) -> Result<Self::Check, Self::Error> {
        use JfkeError::*;

        or_err(
            self.face_a.alive(mesh) && self.face_b.alive(mesh) && self.edge.alive(mesh),
            Dead,
        )?;
        or_err(self.face_a != self.face_b, SameFace)?;

        let len = self.edge.radial_len(mesh).unwrap_or(usize::MAX);
        or_err(len == 2, NotManifold(len))?;

        let la = self.edge.radial_loop_in(self.face_a, mesh).ok_or(EdgeNotInFace)?;
        let lb = self.edge.radial_loop_in(self.face_b, mesh).ok_or(EdgeNotInFace)?;

        or_err(
            !self
                .face_a
                .iter_loops(mesh)
                .filter(|l| l.item != la)
                .any(|l| l.edge().item.radial_face_uses(self.face_b, mesh)),
            MultipleSharedEdges,
        )?;

        // last, so that a caller fixing the winding knows nothing else fails
        or_err(
            la.radial_count_vertex_uses(la.vert(mesh), mesh) == 1,
            WindingMismatch,
        )?;

        Ok([la, lb])
    }

    fn apply(
        self,
        mesh: &mut Mesh<'brand, 'arena>,
    ) -> Result<Self::Inverse, OperatorErr<Self, Self::Error>> {
        let [la, lb] = try_check!(self, mesh);
        let (face_a, face_b) = (self.face_a, self.face_b);

        let (pa, na) = (la.prev(mesh), la.next(mesh));
        let (pb, nb) = (lb.prev(mesh), lb.next(mesh));
        let (v1, v2) = (la.vert(mesh), lb.vert(mesh));

        mesh.follow(pa, nb);
        mesh.follow(pb, na);

        let mut l = nb;
        loop {
            l.set_face(face_a, mesh);
            if l == pb {
                break;
            }
            l = l.next(mesh);
        }

        if face_a.loops(mesh) == la {
            face_a.set_loops(na, mesh);
        }
        let len = face_a.len(mesh) + face_b.len(mesh) - 2;
        face_a.set_len(len, mesh);

        for l in [la, lb] {
            l.radial_remove(self.edge, mesh);
            mesh.kill_loop(l);
        }

        self.edge.disk_remove(v1, mesh);
        self.edge.disk_remove(v2, mesh);
        mesh.free_edge(self.edge);
        mesh.free_face(face_b);

        Ok(Sfme {
            face: face_a,
            v1,
            v2,
        })
    }
}

impl<'brand, 'arena> ptr!(Loop) {
    /// The loop cycle this loop is part of, starting here.
    pub fn iter_loops_from<'tok>(
        self,
        token: &'tok impl ReflAsRef<GhostToken<'brand>>,
    ) -> EntityIterator<'tok, 'brand, 'arena, Loop<'brand, 'arena>> {
        CycleIterator::new(Siblings, Some(self), token)
    }
}

impl<'brand, 'arena> Mesh<'brand, 'arena> {
    /// Like [`Mesh::join_faces`], but first reverses `face_b` if the two
    /// faces are wound against each other across `edge`.
    ///
    /// The reversal only happens once every other precondition holds, so a
    /// rejected join still leaves the mesh unchanged.
    pub fn join_faces_safe(
        &mut self,
        face_a: ptr!(Face),
        face_b: ptr!(Face),
        edge: ptr!(Edge),
    ) -> Result<Sfme<'brand, 'arena>, OperatorErr<Jfke<'brand, 'arena>, JfkeError>> {
        let op = Jfke::new(face_a, face_b, edge);
        match op.check(self) {
            Err(JfkeError::WindingMismatch) => {
                if self.reverse_face(face_b).is_err() {
                    return Err(OperatorErr::new(op, JfkeError::Dead));
                }
            }
            Err(err) => return Err(OperatorErr::new(op, err)),
            Ok(_) => {}
        }
        op.apply(self)
    }
}
