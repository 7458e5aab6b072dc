use crate::*;

/// Error for the element constructors and destructors of [`Mesh`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MakeError {
    #[error("element is dead")]
    Dead,
    #[error("edge endpoints must be distinct")]
    DegenerateEdge,
    #[error("face needs at least {min} vertices, got {got}")]
    TooFewVerts { min: usize, got: usize },
    #[error("vertex appears twice in face")]
    RepeatedVertex,
    #[error("edge appears twice in face")]
    RepeatedEdge,
    #[error("edge {0} of face does not connect consecutive vertices")]
    EdgeMismatch(usize),
    #[error("polygon {polygon} refers to vertex {index} out of range")]
    IndexOutOfRange { polygon: usize, index: usize },
    #[error("edge is still used by a face")]
    EdgeInUse,
    #[error("vertex still has incident edges")]
    VertexInUse,
    #[error("face has {0} sides, expected 2")]
    NotTwoGon(usize),
}

/// The first violated invariant found by [`Mesh::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("element list: {0}")]
    List(#[from] CycleError),
    #[error("{kind} count: counted {counted}, recorded {recorded}")]
    Count {
        kind: &'static str,
        counted: usize,
        recorded: usize,
    },
    #[error("dead {0} reachable from the mesh")]
    DeadElement(&'static str),
    #[error("vertex {0}: disk cycle is not closed")]
    BrokenDisk(usize),
    #[error("edge {edge} is in the disk cycle of vertex {vertex} but not incident to it")]
    NotIncident { edge: usize, vertex: usize },
    #[error("edge {edge} is missing from the disk cycle of vertex {vertex}")]
    NotInDisk { edge: usize, vertex: usize },
    #[error("edge {0} has identical endpoints")]
    DegenerateEdge(usize),
    #[error("edge {0}: radial cycle is not closed")]
    BrokenRadial(usize),
    #[error("loop {loop_} is not part of the radial cycle of edge {edge}")]
    NotInRadial { loop_: usize, edge: usize },
    #[error("face {0}: loop cycle is not closed")]
    BrokenLoops(usize),
    #[error("face {face}: recorded length {len}, loop cycle has {counted}")]
    FaceLen {
        face: usize,
        len: usize,
        counted: usize,
    },
    #[error("face {0}: a loop points at another face")]
    LoopFace(usize),
    #[error("face {0}: a loop's edge does not lead to the next loop's vertex")]
    LoopEdge(usize),
}

fn list_insert<'brand, 'arena, T: Entity<'brand, 'arena>>(
    head: &mut Option<ptr_t!(T)>,
    x: ptr_t!(T),
    token: &mut GhostToken<'brand>,
) {
    *head = Some(T::list_add(x, *head, token));
}

fn list_unlink<'brand, 'arena, T: Entity<'brand, 'arena>>(
    head: &mut Option<ptr_t!(T)>,
    x: ptr_t!(T),
    token: &mut GhostToken<'brand>,
) {
    let next = T::list_remove(x, token);
    if *head == Some(x) {
        *head = next;
    }
}

impl<'brand, 'arena> Mesh<'brand, 'arena> {
    pub fn vert_count(&self) -> usize {
        self.totvert
    }

    pub fn edge_count(&self) -> usize {
        self.totedge
    }

    pub fn loop_count(&self) -> usize {
        self.totloop
    }

    pub fn face_count(&self) -> usize {
        self.totface
    }

    /// `V - E + F`.
    pub fn euler_characteristic(&self) -> isize {
        self.totvert as isize - self.totedge as isize + self.totface as isize
    }

    pub fn iter_verts<'tok>(&'tok self) -> EntityIterator<'tok, 'brand, 'arena, Vertex<'brand, 'arena>> {
        CycleIterator::new(Siblings, self.verts, self)
    }

    pub fn iter_edges<'tok>(&'tok self) -> EntityIterator<'tok, 'brand, 'arena, Edge<'brand, 'arena>> {
        CycleIterator::new(Siblings, self.edges, self)
    }

    pub fn iter_faces<'tok>(&'tok self) -> EntityIterator<'tok, 'brand, 'arena, Face<'brand, 'arena>> {
        CycleIterator::new(Siblings, self.faces, self)
    }

    pub fn make_vert(&mut self, co: Vec3, example: Option<ptr!(Vertex)>) -> ptr!(Vertex) {
        let v = *Vertex::new(self);

        let data = self.alloc_block(ElemKind::Vertex, example.and_then(|x| x.data(self)));
        v.set_data(data, self);
        v.set_co(co, self);
        if let Some(example) = example {
            v.set_no(example.no(self), self);
            v.set_flags(example.flags(self), self);
        }

        list_insert(&mut self.verts, v, &mut self.token);
        self.totvert += 1;
        v
    }

    /// Create an edge between two distinct vertices and link it into both
    /// disk cycles. Does not check for an existing edge.
    pub fn make_edge(
        &mut self,
        v1: ptr!(Vertex),
        v2: ptr!(Vertex),
        example: Option<ptr!(Edge)>,
    ) -> Result<ptr!(Edge), MakeError> {
        or_err(v1.alive(self) && v2.alive(self), MakeError::Dead)?;
        or_err(v1 != v2, MakeError::DegenerateEdge)?;

        Ok(self.make_edge_unchecked(v1, v2, example))
    }

    pub(crate) fn make_edge_unchecked(
        &mut self,
        v1: ptr!(Vertex),
        v2: ptr!(Vertex),
        example: Option<ptr!(Edge)>,
    ) -> ptr!(Edge) {
        let e = self.make_edge_detached(v1, v2, example);
        e.disk_append(v1, self);
        e.disk_append(v2, self);
        e
    }

    /// A new edge that is not yet part of any disk cycle.
    pub(crate) fn make_edge_detached(
        &mut self,
        v1: ptr!(Vertex),
        v2: ptr!(Vertex),
        example: Option<ptr!(Edge)>,
    ) -> ptr!(Edge) {
        let e = *Edge::new(self);
        e.set_v1(v1, self);
        e.set_v2(v2, self);

        let data = self.alloc_block(ElemKind::Edge, example.and_then(|x| x.data(self)));
        e.set_data(data, self);
        if let Some(example) = example {
            e.set_crease(example.crease(self), self);
            e.set_bevel_weight(example.bevel_weight(self), self);
            e.set_flags(example.flags(self), self);
        }

        list_insert(&mut self.edges, e, &mut self.token);
        self.totedge += 1;
        e
    }

    /// Create a face bounded by `verts`, where `edges[i]` connects `verts[i]`
    /// with `verts[i + 1]` (wrapping around).
    pub fn make_face(
        &mut self,
        verts: &[ptr!(Vertex)],
        edges: &[ptr!(Edge)],
        example: Option<ptr!(Face)>,
    ) -> Result<ptr!(Face), MakeError> {
        let n = verts.len();
        or_err(n >= 2, MakeError::TooFewVerts { min: 2, got: n })?;
        or_err(edges.len() == n, MakeError::EdgeMismatch(edges.len().min(n)))?;

        for (i, (&v, &e)) in verts.iter().zip(edges).enumerate() {
            or_err(v.alive(self) && e.alive(self), MakeError::Dead)?;
            or_err(!verts[..i].contains(&v), MakeError::RepeatedVertex)?;
            or_err(!edges[..i].contains(&e), MakeError::RepeatedEdge)?;
            or_err(
                e.other_vert(v, self) == Some(verts[(i + 1) % n]),
                MakeError::EdgeMismatch(i),
            )?;
        }

        Ok(self.make_face_unchecked(verts, edges, example))
    }

    /// A new loop at `vert` along `edge`, not yet part of any radial or loop
    /// cycle.
    pub(crate) fn make_loop(
        &mut self,
        vert: ptr!(Vertex),
        edge: ptr!(Edge),
        face: ptr!(Face),
        example: Option<ptr!(Loop)>,
    ) -> ptr!(Loop) {
        let l = *Loop::new(self);
        l.set_vert(vert, self);
        l.set_edge(edge, self);
        l.set_face(face, self);

        let data = self.alloc_block(ElemKind::Loop, example.and_then(|x| x.data(self)));
        l.set_data(data, self);

        self.totloop += 1;
        l
    }

    /// A new face without loops, copying attributes of `example`.
    pub(crate) fn make_face_empty(&mut self, example: Option<ptr!(Face)>) -> ptr!(Face) {
        let f = *Face::new(self);

        let data = self.alloc_block(ElemKind::Face, example.and_then(|x| x.data(self)));
        f.set_data(data, self);
        if let Some(example) = example {
            f.set_mat_nr(example.mat_nr(self), self);
            f.set_flags(example.flags(self), self);
            f.set_no(example.no(self), self);
        }

        list_insert(&mut self.faces, f, &mut self.token);
        self.totface += 1;
        f
    }

    pub(crate) fn make_face_unchecked(
        &mut self,
        verts: &[ptr!(Vertex)],
        edges: &[ptr!(Edge)],
        example: Option<ptr!(Face)>,
    ) -> ptr!(Face) {
        let f = self.make_face_empty(example);

        for (&v, &e) in verts.iter().zip(edges) {
            let l = self.make_loop(v, e, f, None);
            l.radial_append(e, self);
            f.add_loop_(l, self);
        }

        f.set_len(verts.len(), self);
        let no = f.calc_normal(self);
        f.set_no(no, self);
        f
    }

    /// Create a face over `verts`, reusing existing edges between consecutive
    /// vertices and creating the missing ones.
    pub fn make_face_from_verts(&mut self, verts: &[ptr!(Vertex)]) -> Result<ptr!(Face), MakeError> {
        let n = verts.len();
        or_err(n >= 3, MakeError::TooFewVerts { min: 3, got: n })?;
        for (i, &v) in verts.iter().enumerate() {
            or_err(v.alive(self), MakeError::Dead)?;
            or_err(!verts[..i].contains(&v), MakeError::RepeatedVertex)?;
        }

        let mut edges = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = (verts[i], verts[(i + 1) % n]);
            let e = match a.find_edge(b, self) {
                Some(e) => e,
                None => self.make_edge_unchecked(a, b, None),
            };
            edges.push(e);
        }

        Ok(self.make_face_unchecked(verts, &edges, None))
    }

    /// Add a vertex per position and a face per polygon of position indices.
    ///
    /// Everything is validated before the first element is created, so an
    /// error leaves the mesh as it was.
    pub fn add_polygons<P: AsRef<[usize]>>(
        &mut self,
        positions: &[Vec3],
        polygons: &[P],
    ) -> Result<(Vec<ptr!(Vertex)>, Vec<ptr!(Face)>), MakeError> {
        for (i, p) in polygons.iter().enumerate() {
            let p = p.as_ref();
            or_err(p.len() >= 3, MakeError::TooFewVerts { min: 3, got: p.len() })?;
            for (j, &index) in p.iter().enumerate() {
                or_err(
                    index < positions.len(),
                    MakeError::IndexOutOfRange { polygon: i, index },
                )?;
                or_err(!p[..j].contains(&index), MakeError::RepeatedVertex)?;
            }
        }

        let verts: Vec<_> = positions.iter().map(|&co| self.make_vert(co, None)).collect();
        let faces = polygons
            .iter()
            .map(|p| {
                let fv: Vec<_> = p.as_ref().iter().map(|&i| verts[i]).collect();
                self.make_face_from_verts(&fv)
            })
            .collect::<Result<_, _>>()?;

        Ok((verts, faces))
    }

    fn free_loop(&mut self, l: ptr!(Loop)) {
        let data = l.data(self);
        self.free_block(ElemKind::Loop, data);
        Own::unsafe_make_owned(l).free(self);
        self.totloop -= 1;
    }

    /// Free an edge already removed from both disk cycles.
    pub(crate) fn free_edge(&mut self, e: ptr!(Edge)) {
        let data = e.data(self);
        self.free_block(ElemKind::Edge, data);
        list_unlink(&mut self.edges, e, &mut self.token);
        Own::unsafe_make_owned(e).free(self);
        self.totedge -= 1;
    }

    /// Free a vertex with an empty disk cycle.
    pub(crate) fn free_vert(&mut self, v: ptr!(Vertex)) {
        let data = v.data(self);
        self.free_block(ElemKind::Vertex, data);
        list_unlink(&mut self.verts, v, &mut self.token);
        Own::unsafe_make_owned(v).free(self);
        self.totvert -= 1;
    }

    /// Free a face whose loops are already gone.
    pub(crate) fn free_face(&mut self, f: ptr!(Face)) {
        let data = f.data(self);
        self.free_block(ElemKind::Face, data);
        list_unlink(&mut self.faces, f, &mut self.token);
        Own::unsafe_make_owned(f).free(self);
        self.totface -= 1;
    }

    /// Free a loop after it left its radial and loop cycles.
    pub(crate) fn kill_loop(&mut self, l: ptr!(Loop)) {
        self.free_loop(l);
    }

    /// Remove a face and its loops. Its edges and vertices stay.
    pub fn kill_face(&mut self, face: ptr!(Face)) -> Result<(), MakeError> {
        or_err(face.alive(self), MakeError::Dead)?;

        let loops: Vec<_> = face.iter_loops(self).map(|l| l.item).collect();
        for l in loops {
            l.radial_remove(l.edge(self), self);
            self.free_loop(l);
        }
        self.free_face(face);
        Ok(())
    }

    /// Remove an edge not used by any face.
    pub fn kill_edge(&mut self, edge: ptr!(Edge)) -> Result<(), MakeError> {
        or_err(edge.alive(self), MakeError::Dead)?;
        or_err(edge.is_wire(self), MakeError::EdgeInUse)?;

        let [v1, v2] = edge.verts(self);
        edge.disk_remove(v1, self);
        edge.disk_remove(v2, self);
        self.free_edge(edge);
        Ok(())
    }

    /// Remove a vertex without incident edges.
    pub fn kill_vert(&mut self, vertex: ptr!(Vertex)) -> Result<(), MakeError> {
        or_err(vertex.alive(self), MakeError::Dead)?;
        or_err(vertex.is_isolated(self), MakeError::VertexInUse)?;

        self.free_vert(vertex);
        Ok(())
    }

    /// Flip the winding of `face`. Per-corner data stays with its vertex.
    pub fn reverse_face(&mut self, face: ptr!(Face)) -> Result<(), MakeError> {
        or_err(face.alive(self), MakeError::Dead)?;

        let loops: Vec<_> = face.iter_loops(self).map(|l| l.item).collect();
        let corners: Vec<_> = loops.iter().map(|l| (l.vert(self), l.data(self))).collect();
        let n = loops.len();

        for (i, &l) in loops.iter().enumerate() {
            let (vert, data) = corners[(i + 1) % n];
            l.set_vert(vert, self);
            l.set_data(data, self);

            let (next, prev) = (l.next(self), l.prev(self));
            l.set_next(prev, self);
            l.set_prev(next, self);
        }

        let no = face.no(self);
        face.set_no(-no, self);
        Ok(())
    }

    /// Remove a two-sided face, merging its two edges into the first one.
    ///
    /// Faces on the other side of the second edge are moved over to the
    /// surviving edge. Returns the surviving edge.
    pub fn collapse_two_gon(&mut self, face: ptr!(Face)) -> Result<ptr!(Edge), MakeError> {
        or_err(face.alive(self), MakeError::Dead)?;
        let len = face.len(self);
        or_err(len == 2, MakeError::NotTwoGon(len))?;

        let l1 = face.loops(self);
        let [e1, e2] = [l1.edge(self), l1.next(self).edge(self)];

        self.kill_face(face)?;
        if e1 == e2 {
            return Ok(e1);
        }

        let moved: Vec<_> = e2.iter_radial(self).map(|l| l.item).collect();
        for l in moved {
            l.radial_remove(e2, self);
            l.set_edge(e1, self);
            l.radial_append(e1, self);
        }

        self.kill_edge(e2)?;
        Ok(e1)
    }

    /// Recompute face normals, then vertex normals as the normalized sum of
    /// the normals of the faces around them.
    pub fn recalc_normals(&mut self) {
        let faces: Vec<_> = self.iter_faces().map(|f| f.item).collect();
        for f in faces {
            let no = f.calc_normal(self);
            f.set_no(no, self);
        }

        let verts: Vec<_> = self.iter_verts().map(|v| v.item).collect();
        for v in verts {
            let mut no = Vec3::ZERO;
            for e in v.iter_disk(self) {
                for l in e.iter_radial() {
                    if l.vert().item == v {
                        no += l.face().item.no(self);
                    }
                }
            }
            v.set_no(no.normalize_or_zero(), self);
        }
    }

    /// Check every structural invariant: element lists and counters, disk,
    /// radial and loop cycles closed in both directions, and all
    /// back-references pointing where they should.
    pub fn validate(&self) -> Result<(), InvariantError> {
        use InvariantError::*;

        let check_count = |kind, counted, recorded| {
            or_err(
                counted == recorded,
                Count {
                    kind,
                    counted,
                    recorded,
                },
            )
        };

        check_count("vertex", cycle::length(&Siblings, self.verts, self)?, self.totvert)?;
        check_count("edge", cycle::length(&Siblings, self.edges, self)?, self.totedge)?;
        check_count("face", cycle::length(&Siblings, self.faces, self)?, self.totface)?;

        let mut disk_entries = 0;
        for v in self.iter_verts() {
            let vid = v.maybe_id().ok_or(DeadElement("vertex"))?;
            let head = v.item.maybe_edge(self);
            let n = cycle::length(&Disk(v.item), head, self).map_err(|_| BrokenDisk(vid))?;
            or_err(cycle::validate(&Disk(v.item), n, head, self), BrokenDisk(vid))?;

            for e in v.iter_disk() {
                let eid = e.maybe_id().ok_or(DeadElement("edge"))?;
                or_err(
                    e.item.has_vert(v.item, self),
                    NotIncident {
                        edge: eid,
                        vertex: vid,
                    },
                )?;
            }
            disk_entries += n;
        }
        check_count("disk entry", disk_entries, 2 * self.totedge)?;

        let mut radial_entries = 0;
        for e in self.iter_edges() {
            let eid = e.maybe_id().ok_or(DeadElement("edge"))?;
            let [v1, v2] = [e.item.maybe_v1(self), e.item.maybe_v2(self)];
            let (Some(v1), Some(v2)) = (v1, v2) else {
                return Err(DeadElement("vertex"));
            };
            or_err(v1.alive(self) && v2.alive(self), DeadElement("vertex"))?;
            or_err(v1 != v2, DegenerateEdge(eid))?;

            for v in [v1, v2] {
                or_err(
                    v.iter_disk(self).any(|x| x.item == e.item),
                    NotInDisk {
                        edge: eid,
                        vertex: v.id(self),
                    },
                )?;
            }

            let head = e.item.maybe_loop_(self);
            let n = cycle::length(&Radial, head, self).map_err(|_| BrokenRadial(eid))?;
            or_err(cycle::validate(&Radial, n, head, self), BrokenRadial(eid))?;

            for l in e.iter_radial() {
                let lid = l.maybe_id().ok_or(DeadElement("loop"))?;
                or_err(
                    l.item.maybe_edge(self) == Some(e.item),
                    NotInRadial {
                        loop_: lid,
                        edge: eid,
                    },
                )?;
            }
            radial_entries += n;
        }
        check_count("radial entry", radial_entries, self.totloop)?;

        let mut loop_entries = 0;
        for f in self.iter_faces() {
            let fid = f.maybe_id().ok_or(DeadElement("face"))?;
            let head = f.item.maybe_loops(self);
            let len = f.item.len(self);
            let counted = cycle::length(&Siblings, head, self).map_err(|_| BrokenLoops(fid))?;
            or_err(
                counted == len && len >= 2,
                FaceLen {
                    face: fid,
                    len,
                    counted,
                },
            )?;
            or_err(cycle::validate(&Siblings, len, head, self), BrokenLoops(fid))?;

            for l in f.iter_loops() {
                let lid = l.maybe_id().ok_or(DeadElement("loop"))?;
                or_err(l.item.maybe_face(self) == Some(f.item), LoopFace(fid))?;

                let (Some(v), Some(e)) = (l.item.maybe_vert(self), l.item.maybe_edge(self)) else {
                    return Err(LoopEdge(fid));
                };
                or_err(
                    e.other_vert(v, self) == l.next().item.maybe_vert(self),
                    LoopEdge(fid),
                )?;
                or_err(
                    e.iter_radial(self).any(|x| x.item == l.item),
                    NotInRadial {
                        loop_: lid,
                        edge: e.id(self),
                    },
                )?;
            }
            loop_entries += len;
        }
        check_count("loop", loop_entries, self.totloop)?;

        Ok(())
    }
}

impl<'brand, 'arena> ptr!(Face) {
    /// Number of sides.
    pub fn len(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> usize {
        self.borrow(token).len
    }

    pub(crate) fn set_len(self, len: usize, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).len = len;
    }

    pub fn mat_nr(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> u16 {
        self.borrow(token).mat_nr
    }

    pub fn set_mat_nr(self, mat_nr: u16, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).mat_nr = mat_nr;
    }

    /// The stored normal, as of the last topology change or
    /// [`Mesh::recalc_normals`].
    pub fn no(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Vec3 {
        self.borrow(token).no
    }

    pub fn set_no(self, no: Vec3, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).no = no;
    }

    /// Newell normal of the current vertex positions.
    pub fn calc_normal(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Vec3 {
        let mut no = Vec3::ZERO;
        for l in self.iter_loops(token) {
            let a = l.vert().co();
            let b = l.next().vert().co();
            no.x += (a.y - b.y) * (a.z + b.z);
            no.y += (a.z - b.z) * (a.x + b.x);
            no.z += (a.x - b.x) * (a.y + b.y);
        }
        no.normalize_or_zero()
    }

    pub fn center(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Vec3 {
        let (sum, n) = self
            .iter_loops(token)
            .fold((Vec3::ZERO, 0usize), |(sum, n), l| (sum + l.vert().co(), n + 1));
        if n == 0 {
            sum
        } else {
            sum / n as f32
        }
    }

    pub fn vertices(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Vec<ptr!(Vertex)> {
        self.iter_loops(token).map(|l| l.vert().item).collect()
    }

    /// The loop of this face starting at `vertex`.
    pub fn find_loop(
        self,
        vertex: ptr!(Vertex),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr!(Loop)> {
        self.iter_loops(token)
            .find(|l| l.item.maybe_vert(token) == Some(vertex))
            .map(|l| l.item)
    }
}
