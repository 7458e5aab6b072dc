use super::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

// corners whose two edges are closer to parallel than this get no offset
const MIN_SINE: f32 = 1e-4;

struct Corner<'brand, 'arena> {
    vert: ptr!(Vertex),
    e_in: ptr!(Edge),
    e_out: ptr!(Edge),
}

struct FaceCorners<'brand, 'arena> {
    id: usize,
    corners: Vec<Corner<'brand, 'arena>>,
}

/// A vertex inserted on an original edge, next to an original vertex.
struct Split<'brand, 'arena> {
    from: ptr!(Vertex),
    vert: ptr!(Vertex),
    // unit direction along the edge, away from `from`
    dir: Vec3,
}

/// One round of bevel over the tagged part of the mesh.
///
/// Every tagged vertex gets a new vertex on each of its edges, every face
/// corner at a tagged vertex is clipped off, strips are cut along tagged
/// edges and joined across them, and finally the original vertices and the
/// vertices left in the middle of the strips are dissolved. Positions are not
/// touched; new vertices only get an entry in the transform table.
pub(super) struct Pass<'m, 'brand, 'arena> {
    mesh: &'m mut Mesh<'brand, 'arena>,
    table: &'m mut TransDataTable,
    report: &'m mut BevelReport,
    tags: &'m BevelTags,
    vertex_only: bool,
    d: f32,

    // keyed by (vertex id, edge id)
    splits: HashMap<(usize, usize), Split<'brand, 'arena>>,
    split_order: Vec<(usize, usize)>,
    edge_splits: HashMap<usize, Vec<ptr!(Vertex)>>,
    // split vertices of edges whose strip halves were joined
    joined: Vec<ptr!(Vertex)>,
    // keyed by (face id, vertex id)
    insets: HashMap<(usize, usize), ptr!(Vertex)>,
    mains: HashMap<usize, ptr!(Face)>,
    created: HashSet<usize>,
}

impl<'m, 'brand, 'arena> Pass<'m, 'brand, 'arena> {
    pub(super) fn new(
        mesh: &'m mut Mesh<'brand, 'arena>,
        table: &'m mut TransDataTable,
        report: &'m mut BevelReport,
        tags: &'m BevelTags,
        vertex_only: bool,
        d: f32,
    ) -> Self {
        Self {
            mesh,
            table,
            report,
            tags,
            vertex_only,
            d,
            splits: HashMap::new(),
            split_order: Vec::new(),
            edge_splits: HashMap::new(),
            joined: Vec::new(),
            insets: HashMap::new(),
            mains: HashMap::new(),
            created: HashSet::new(),
        }
    }

    /// Runs the pass. Returns the ids of the faces it created.
    pub(super) fn run(mut self) -> HashSet<usize> {
        let (verts, edges, faces) = {
            let mesh = &*self.mesh;
            let tags = self.tags;

            let verts: Vec<_> = mesh
                .iter_verts()
                .filter(|v| tags.verts.contains_key(&v.id()))
                .map(|v| v.item)
                .collect();
            let edges: Vec<_> = mesh
                .iter_edges()
                .filter(|e| tags.edges.contains(&e.id()))
                .map(|e| e.item)
                .collect();
            let faces: Vec<_> = mesh
                .iter_faces()
                .filter(|f| f.item.len(mesh) >= 3)
                .map(|f| FaceCorners {
                    id: f.id(),
                    corners: f
                        .iter_loops()
                        .map(|l| Corner {
                            vert: l.vert().item,
                            e_in: l.prev().edge().item,
                            e_out: l.edge().item,
                        })
                        .collect(),
                })
                .collect();
            self.mains = mesh
                .iter_faces()
                .map(|f| (f.id(), f.item))
                .collect();

            (verts, edges, faces)
        };

        let mut corners_at: HashMap<usize, Vec<(usize, usize)>> = HashMap::new();
        for fc in &faces {
            for c in &fc.corners {
                corners_at.entry(c.vert.id(self.mesh)).or_default().push((
                    c.e_in.id(self.mesh),
                    c.e_out.id(self.mesh),
                ));
            }
        }

        self.split_edges(&verts);
        self.place_splits(&corners_at);
        self.clip_corners(&faces);
        if !self.vertex_only {
            self.cut_strips(&faces, &edges);
        }
        self.dissolve_verts(&verts);
        self.tessellate();

        let mesh = &*self.mesh;
        let created = &self.created;
        mesh.iter_faces()
            .map(|f| f.id())
            .filter(|id| created.contains(id))
            .collect()
    }

    fn warn(&mut self, warning: BevelWarning) {
        warn!("{}", warning);
        self.report.warnings.push(warning);
    }

    fn tagged_edge(&self, e: ptr!(Edge)) -> bool {
        self.tags.edges.contains(&e.id(self.mesh))
    }

    fn tagged_vert(&self, v: ptr!(Vertex)) -> bool {
        self.tags.verts.contains_key(&v.id(self.mesh))
    }

    fn split_vert(&self, v: ptr!(Vertex), e: ptr!(Edge)) -> Option<ptr!(Vertex)> {
        let key = (v.id(self.mesh), e.id(self.mesh));
        self.splits.get(&key).map(|s| s.vert)
    }

    /// Where `v` sits before any bevel moved it.
    fn origin(&self, v: ptr!(Vertex)) -> Vec3 {
        match self.table.get(v.id(self.mesh)) {
            Some(td) => td.origin,
            None => v.co(self.mesh),
        }
    }

    /// Direction from `a` to `b` for an infinitely small bevel value.
    ///
    /// Vertices split off the same original vertex still sit on top of each
    /// other, so their offsets tell them apart instead.
    fn direction(&self, a: ptr!(Vertex), b: ptr!(Vertex)) -> Vec3 {
        let ta = self.table.get(a.id(self.mesh));
        let tb = self.table.get(b.id(self.mesh));
        let v = match (ta, tb) {
            (Some(ta), Some(tb)) if ta.origin.distance_squared(tb.origin) <= f32::EPSILON => {
                tb.disp() - ta.disp()
            }
            _ => self.origin(b) - self.origin(a),
        };
        v.normalize_or_zero()
    }

    /// The transform entry of `v`, created with a fresh limit if missing.
    fn entry(&mut self, v: ptr!(Vertex)) -> TransData {
        let id = v.id(self.mesh);
        if let Some(td) = self.table.get(id) {
            return *td;
        }

        let weight = self.tags.verts.get(&id).copied().unwrap_or(1.0);
        let limit = self.table.new_limit();
        let td = TransData::new(v.co(self.mesh), Vec3::ZERO, weight, limit);
        self.table.insert(id, td);
        td
    }

    fn split_edges(&mut self, verts: &[ptr!(Vertex)]) {
        // directions first, the splits below move edge endpoints around
        let mut plan = Vec::new();
        for &v in verts {
            for e in v.iter_disk(self.mesh) {
                if let Some(w) = e.other_vert(v) {
                    plan.push((v, e.item, self.direction(v, w.item)));
                }
            }
        }

        for (v, e, dir) in plan {
            let key = (v.id(self.mesh), e.id(self.mesh));
            match self.mesh.split_edge(v, e) {
                Ok(Jekv { vertex, .. }) => {
                    self.splits.insert(
                        key,
                        Split {
                            from: v,
                            vert: vertex,
                            dir,
                        },
                    );
                    self.split_order.push(key);
                    self.edge_splits.entry(key.1).or_default().push(vertex);
                }
                Err(err) => debug!(vertex = key.0, edge = key.1, "not split: {}", err),
            }
        }
        debug!(count = self.split_order.len(), "split edges");
    }

    /// Give every split vertex its offset: the bevel distance along its edge,
    /// stretched so that it ends up that far from the tagged edges next to it.
    fn place_splits(&mut self, corners_at: &HashMap<usize, Vec<(usize, usize)>>) {
        let order = std::mem::take(&mut self.split_order);

        for &(vid, eid) in &order {
            let Some(split) = self.splits.get(&(vid, eid)) else {
                continue;
            };
            let (from, vert, dir) = (split.from, split.vert, split.dir);

            let base = self.entry(from);
            let weight = self.tags.verts.get(&vid).copied().unwrap_or(1.0);
            let mut dist = self.d * weight;

            if dir == Vec3::ZERO {
                self.warn(BevelWarning::ZeroLengthEdge {
                    vertex: vid,
                    edge: eid,
                });
                dist = 0.0;
            } else if !self.vertex_only {
                let mut sum = 0.0;
                let mut n = 0;
                let mut parallel = false;

                for &(e_in, e_out) in corners_at.get(&vid).into_iter().flatten() {
                    let other = match (e_in == eid, e_out == eid) {
                        (true, _) => e_out,
                        (_, true) => e_in,
                        _ => continue,
                    };
                    if !self.tags.edges.contains(&other) {
                        continue;
                    }
                    let Some(o) = self.splits.get(&(vid, other)) else {
                        continue;
                    };

                    let sine = dir.cross(o.dir).length();
                    if sine < MIN_SINE {
                        parallel = true;
                    } else {
                        sum += self.d * weight / sine;
                        n += 1;
                    }
                }

                if n > 0 {
                    dist = sum / n as f32;
                } else if parallel {
                    self.warn(BevelWarning::DegenerateCorner { vertex: vid });
                    dist = 0.0;
                }
            }

            let td = TransData::new(base.origin, base.disp() + dir * dist, weight, base.limit);
            self.table.insert(vert.id(self.mesh), td);
        }

        self.split_order = order;
    }

    /// Cut every corner at a tagged vertex off its face. Where both edges of
    /// the corner are tagged, the cut gets a vertex of its own: the corner of
    /// the inset face.
    fn clip_corners(&mut self, faces: &[FaceCorners<'brand, 'arena>]) {
        for fc in faces {
            let Some(&face) = self.mains.get(&fc.id) else {
                continue;
            };
            let mut main = face;

            for c in &fc.corners {
                if !self.tagged_vert(c.vert) {
                    continue;
                }
                let (Some(p_in), Some(p_out)) =
                    (self.split_vert(c.vert, c.e_in), self.split_vert(c.vert, c.e_out))
                else {
                    continue;
                };

                let Jfke {
                    face_a,
                    face_b,
                    edge,
                } = match self.mesh.split_face(main, p_in, p_out) {
                    Ok(x) => x,
                    Err(err) => {
                        let vertex = c.vert.id(self.mesh);
                        self.warn(BevelWarning::CornerNotClipped {
                            face: fc.id,
                            vertex,
                            reason: err.err,
                        });
                        continue;
                    }
                };

                let (cap, rest) = if face_a.find_loop(c.vert, self.mesh).is_some() {
                    (face_a, face_b)
                } else {
                    (face_b, face_a)
                };
                main = rest;
                self.created.insert(cap.id(self.mesh));

                if !self.vertex_only && self.tagged_edge(c.e_in) && self.tagged_edge(c.e_out) {
                    self.make_inset(fc.id, c.vert, p_in, p_out, edge);
                }
            }

            self.mains.insert(fc.id, main);
        }
    }

    fn make_inset(
        &mut self,
        face: usize,
        v: ptr!(Vertex),
        p_in: ptr!(Vertex),
        p_out: ptr!(Vertex),
        clip: ptr!(Edge),
    ) {
        let q = match self.mesh.split_edge(p_in, clip) {
            Ok(Jekv { vertex, .. }) => vertex,
            Err(err) => {
                debug!(face, "no inset corner: {}", err);
                return;
            }
        };

        // q completes the parallelogram v, p_in, q, p_out
        let base = self.entry(v);
        let disp_in = self.entry(p_in).disp();
        let disp_out = self.entry(p_out).disp();
        let td = TransData::new(
            base.origin,
            disp_in + disp_out - base.disp(),
            base.weight,
            base.limit,
        );
        self.table.insert(q.id(self.mesh), td);
        self.insets.insert((face, v.id(self.mesh)), q);
    }

    /// Where a strip along a tagged edge meets the corner at `v`, `other`
    /// being the corner's second edge.
    fn exit_point(&self, face: usize, v: ptr!(Vertex), other: ptr!(Edge)) -> ptr!(Vertex) {
        if !self.tagged_vert(v) {
            return v;
        }
        if self.tagged_edge(other) {
            if let Some(&q) = self.insets.get(&(face, v.id(self.mesh))) {
                return q;
            }
        }
        self.split_vert(v, other).unwrap_or(v)
    }

    fn cut_strips(&mut self, faces: &[FaceCorners<'brand, 'arena>], edges: &[ptr!(Edge)]) {
        let mut pieces: HashMap<usize, Vec<ptr!(Face)>> = HashMap::new();

        for fc in faces {
            let Some(&face) = self.mains.get(&fc.id) else {
                continue;
            };
            let mut main = face;
            let n = fc.corners.len();

            for i in 0..n {
                let (a, b) = (&fc.corners[i], &fc.corners[(i + 1) % n]);
                let e = a.e_out;
                if !self.tagged_edge(e) {
                    continue;
                }

                let xa = self.exit_point(fc.id, a.vert, a.e_in);
                let xb = self.exit_point(fc.id, b.vert, b.e_out);

                match self.mesh.split_face(main, xa, xb) {
                    Ok(Jfke { face_a, face_b, .. }) => {
                        let (piece, rest) = if e.radial_face_uses(face_a, self.mesh) {
                            (face_a, face_b)
                        } else {
                            (face_b, face_a)
                        };
                        main = rest;
                        pieces.entry(e.id(self.mesh)).or_default().push(piece);
                    }
                    Err(err) => {
                        let edge = e.id(self.mesh);
                        self.warn(BevelWarning::StripNotCut {
                            face: fc.id,
                            edge,
                            reason: err.err,
                        });
                    }
                }
            }

            self.mains.insert(fc.id, main);
        }

        // join the two halves of each strip across the rest of its edge; the
        // vertices that were splitting that edge end up two-valent
        for &e in edges {
            let eid = e.id(self.mesh);
            let Some(ps) = pieces.get(&eid) else {
                continue;
            };

            if let [a, b] = ps[..] {
                match self.mesh.join_faces_safe(a, b, e) {
                    Ok(_) => {
                        self.created.insert(a.id(self.mesh));
                        let splits = self.edge_splits.get(&eid).into_iter().flatten();
                        self.joined.extend(splits.copied());
                        continue;
                    }
                    Err(err) => self.warn(BevelWarning::NotJoined {
                        edge: eid,
                        reason: err.err,
                    }),
                }
            }
            for &p in ps {
                self.created.insert(p.id(self.mesh));
            }
        }
    }

    fn dissolve_verts(&mut self, verts: &[ptr!(Vertex)]) {
        for &v in verts {
            if !v.alive(self.mesh) {
                continue;
            }

            let interior = v
                .iter_disk(self.mesh)
                .all(|e| e.item.radial_len(self.mesh) == Ok(2));

            self.join_fan(v);
            if interior || self.vertex_only || self.is_straight(v) {
                self.dissolve(v);
            }
        }

        for p in std::mem::take(&mut self.joined) {
            if !p.alive(self.mesh) || p.degree(self.mesh) != Ok(2) {
                continue;
            }
            let Some(e) = p.maybe_edge(self.mesh) else {
                continue;
            };
            match self.mesh.join_edge_kill_vert(e, p) {
                Ok(Semv { edge, .. }) => {
                    self.collapse_two_gons(edge);
                }
                Err(err) => debug!(vertex = p.id(self.mesh), "kept: {}", err),
            }
        }
    }

    /// Whether `v` is two-valent with its edges running in opposite
    /// directions, so dissolving it leaves the outline unchanged.
    fn is_straight(&self, v: ptr!(Vertex)) -> bool {
        if v.degree(self.mesh) != Ok(2) {
            return false;
        }
        let dirs: Vec<_> = v
            .iter_disk(self.mesh)
            .filter_map(|e| e.other_vert(v).map(|w| self.direction(v, w.item)))
            .collect();
        match dirs[..] {
            [a, b] => a.cross(b).length() < MIN_SINE && a.dot(b) < 0.0,
            _ => false,
        }
    }

    /// Merge the faces around `v` until no two of them share exactly one
    /// edge. A closed fan ends up as two faces, an open one as one.
    fn join_fan(&mut self, v: ptr!(Vertex)) {
        loop {
            let spokes: Vec<_> = v.iter_disk(self.mesh).map(|e| e.item).collect();

            let mut joined = false;
            for s in spokes {
                if s.radial_len(self.mesh) != Ok(2) {
                    continue;
                }
                let l = s.loop_(self.mesh);
                let (fa, fb) = (l.face(self.mesh), l.radial_next(self.mesh).face(self.mesh));
                if fa != fb && self.mesh.join_faces_safe(fa, fb, s).is_ok() {
                    joined = true;
                    break;
                }
            }

            if !joined {
                break;
            }
        }
    }

    fn dissolve(&mut self, v: ptr!(Vertex)) {
        let Some(spoke) = v.maybe_edge(self.mesh) else {
            return;
        };

        match self.mesh.join_edge_kill_vert(spoke, v) {
            Ok(Semv { edge, .. }) => {
                if !self.collapse_two_gons(edge) {
                    self.join_across(edge);
                }
            }
            Err(err) => {
                let vertex = v.id(self.mesh);
                self.warn(BevelWarning::NotDissolved {
                    vertex,
                    reason: err.err,
                });
            }
        }
    }

    fn join_across(&mut self, edge: ptr!(Edge)) {
        if edge.radial_len(self.mesh) != Ok(2) {
            return;
        }
        let l = edge.loop_(self.mesh);
        let (fa, fb) = (l.face(self.mesh), l.radial_next(self.mesh).face(self.mesh));
        if let Err(err) = self.mesh.join_faces_safe(fa, fb, edge) {
            let edge = edge.id(self.mesh);
            self.warn(BevelWarning::NotJoined {
                edge,
                reason: err.err,
            });
        }
    }

    /// Collapse the two-sided faces around `edge`. Returns whether there
    /// were any.
    fn collapse_two_gons(&mut self, edge: ptr!(Edge)) -> bool {
        let faces: Vec<_> = edge
            .iter_radial(self.mesh)
            .map(|l| l.face().item)
            .collect();

        let mut any = false;
        for f in faces {
            if f.alive(self.mesh) && f.len(self.mesh) == 2 {
                any |= self.mesh.collapse_two_gon(f).is_ok();
            }
        }
        any
    }

    /// Fan-split created faces with more than four sides into quads.
    fn tessellate(&mut self) {
        let faces: Vec<_> = self
            .mesh
            .iter_faces()
            .filter(|f| self.created.contains(&f.id()) && f.item.len(self.mesh) > 4)
            .map(|f| f.item)
            .collect();

        for mut f in faces {
            while f.len(self.mesh) > 4 {
                let vs = f.vertices(self.mesh);
                match self.mesh.split_face(f, vs[0], vs[3]) {
                    Ok(Jfke { face_a, face_b, .. }) => {
                        self.created.insert(face_a.id(self.mesh));
                        self.created.insert(face_b.id(self.mesh));
                        f = if face_a.len(self.mesh) > 4 { face_a } else { face_b };
                    }
                    Err(err) => {
                        let face = f.id(self.mesh);
                        self.warn(BevelWarning::NotTessellated {
                            face,
                            reason: err.err,
                        });
                        break;
                    }
                }
            }
        }
    }
}
