use crate::*;

// Split Edge-Make Vertex

/// Insert a new vertex on an edge, next to one of its endpoints.
///
/// See [`Mesh::split_edge`] for details.
pub struct Semv<'brand, 'arena> {
    pub vertex: ptr!(Vertex),
    pub edge: ptr!(Edge),
}

impl<'brand, 'arena> Semv<'brand, 'arena> {
    pub fn new(vertex: ptr!(Vertex), edge: ptr!(Edge)) -> Self {
        Self { vertex, edge }
    }
}

/// Precondition Error for [`Semv`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SemvError {
    #[error("vertex or edge is dead")]
    Dead,
    #[error("vertex is not an endpoint of edge")]
    VertexNotInEdge,
}

impl<'brand, 'arena> Operator<'brand, 'arena> for Semv<'brand, 'arena> {
    type Inverse = Jekv<'brand, 'arena>;
    type Error = SemvError;
    type Check = ptr!(Vertex);

    fn check(&self, mesh: &Mesh<'brand, 'arena>) -> Result<Self::Check, Self::Error> {
        or_err(
            self.vertex.alive(mesh) && self.edge.alive(mesh),
            SemvError::Dead,
        )?;
        self.edge
            .other_vert(self.vertex, mesh)
            .ok_or(SemvError::VertexNotInEdge)
    }

    fn apply(
        self,
        mesh: &mut Mesh<'brand, 'arena>,
    ) -> Result<Self::Inverse, OperatorErr<Self, Self::Error>> {
        //  v ------ e ------ tv
        //
        //  v -- ne -- nv -- e -- tv

        let tv = try_check!(self, mesh);
        let (v, e) = (self.vertex, self.edge);

        let co = v.co(mesh).lerp(tv.co(mesh), 0.5);
        let nv = mesh.make_vert(co, Some(v));
        let ne = mesh.make_edge_detached(v, nv, Some(e));

        // ne takes the place of e around v, e moves over to nv
        cycle::replace(&Disk(v), e, ne, mesh);
        if v.maybe_edge(mesh) == Some(e) {
            v.set_edge(ne, mesh);
        }
        e.swap_vert(v, nv, mesh);
        e.disk_append(nv, mesh);
        ne.disk_append(nv, mesh);

        let loops: Vec<_> = e.iter_radial(mesh).map(|l| l.item).collect();
        for l in loops {
            let face = l.face(mesh);
            if l.vert(mesh) == v {
                // v -> nv along ne, then nv -> tv along e
                let nl = mesh.make_loop(nv, e, face, Some(l));
                cycle::replace(&Radial, l, nl, mesh);
                if e.maybe_loop_(mesh) == Some(l) {
                    e.set_loop_(nl, mesh);
                }
                l.set_edge(ne, mesh);
                l.radial_append(ne, mesh);
                mesh.insert_loop_after(l, nl);
            } else {
                // tv -> nv along e, then nv -> v along ne
                let nl = mesh.make_loop(nv, ne, face, Some(l.next(mesh)));
                nl.radial_append(ne, mesh);
                mesh.insert_loop_after(l, nl);
            }
        }

        Ok(Jekv { edge: ne, vertex: nv })
    }
}

// Join Edge-Kill Vertex

/// Remove a two-valent vertex, merging its two edges into one.
///
/// See [`Mesh::join_edge_kill_vert`] for details.
pub struct Jekv<'brand, 'arena> {
    pub edge: ptr!(Edge),
    pub vertex: ptr!(Vertex),
}

impl<'brand, 'arena> Jekv<'brand, 'arena> {
    pub fn new(edge: ptr!(Edge), vertex: ptr!(Vertex)) -> Self {
        Self { edge, vertex }
    }
}

/// Precondition Error for [`Jekv`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JekvError {
    #[error("vertex or edge is dead")]
    Dead,
    #[error("vertex is not an endpoint of edge")]
    VertexNotInEdge,
    #[error("vertex has {0} edges, expected 2")]
    NotTwoValent(usize),
    #[error("joined edge would connect a vertex to itself")]
    Degenerate,
    #[error("faces along the two edges do not match")]
    LoopMismatch,
}

impl<'brand, 'arena> Operator<'brand, 'arena> for Jekv<'brand, 'arena> {
    type Inverse = Semv<'brand, 'arena>;
    type Error = JekvError;
    type Check = (ptr!(Edge), ptr!(Vertex));

    fn check(&self, mesh: &Mesh<'brand, 'arena>) -> Result<Self::Check, Self::Error> {
        use JekvError::*;

        let (ke, kv) = (self.edge, self.vertex);
        or_err(ke.alive(mesh) && kv.alive(mesh), Dead)?;
        let tv = ke.other_vert(kv, mesh).ok_or(VertexNotInEdge)?;

        let degree = kv.degree(mesh).unwrap_or(usize::MAX);
        or_err(degree == 2, NotTwoValent(degree))?;

        let oe = ke.disk_next(kv, mesh).ok_or(VertexNotInEdge)?;
        let ov = oe.other_vert(kv, mesh).ok_or(VertexNotInEdge)?;
        // an existing tv-ov edge is fine: faces between the two become 2-gons
        or_err(ov != tv, Degenerate)?;

        or_err(ke.radial_len(mesh) == oe.radial_len(mesh), LoopMismatch)?;
        for l in ke.iter_radial(mesh) {
            let across = if l.vert().item == kv { l.prev() } else { l.next() };
            or_err(across.edge().item == oe, LoopMismatch)?;
        }

        Ok((oe, tv))
    }

    fn apply(
        self,
        mesh: &mut Mesh<'brand, 'arena>,
    ) -> Result<Self::Inverse, OperatorErr<Self, Self::Error>> {
        let (oe, tv) = try_check!(self, mesh);
        let (ke, kv) = (self.edge, self.vertex);

        // every loop starting at kv goes; loops along ke from tv move to oe
        let loops: Vec<_> = ke.iter_radial(mesh).map(|l| l.item).collect();
        for l in loops {
            l.radial_remove(ke, mesh);
            if l.vert(mesh) == kv {
                mesh.remove_loop(l);
            } else {
                let dead = l.next(mesh);
                cycle::replace(&Radial, dead, l, mesh);
                if oe.maybe_loop_(mesh) == Some(dead) {
                    oe.set_loop_(l, mesh);
                }
                l.set_edge(oe, mesh);
                mesh.remove_loop(dead);
            }
        }

        // oe takes the place of ke around tv
        cycle::remove(&Disk(kv), oe, mesh);
        cycle::remove(&Disk(kv), ke, mesh);
        oe.swap_vert(kv, tv, mesh);
        cycle::replace(&Disk(tv), ke, oe, mesh);
        if tv.maybe_edge(mesh) == Some(ke) {
            tv.set_edge(oe, mesh);
        }
        kv.set_opt_edge(None, mesh);

        mesh.free_edge(ke);
        mesh.free_vert(kv);

        Ok(Semv { vertex: tv, edge: oe })
    }
}

impl<'brand, 'arena> Mesh<'brand, 'arena> {
    pub(crate) fn insert_loop_after(&mut self, l: ptr!(Loop), nl: ptr!(Loop)) {
        let next = l.next(self);
        self.follow(l, nl);
        self.follow(nl, next);

        let face = l.face(self);
        let len = face.len(self);
        face.set_len(len + 1, self);
    }

    /// Unlink a loop, already out of its radial cycle, from its face and
    /// free it.
    pub(crate) fn remove_loop(&mut self, l: ptr!(Loop)) {
        let face = l.face(self);
        let (prev, next) = (l.prev(self), l.next(self));
        self.follow(prev, next);

        if face.loops(self) == l {
            face.set_loops(next, self);
        }
        let len = face.len(self);
        face.set_len(len - 1, self);

        self.kill_loop(l);
    }
}
