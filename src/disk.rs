use crate::*;

// Disk cycle: the edges around one vertex.
//
// Each edge carries two link slots, one per endpoint; `Disk(v)` selects the
// slot belonging to `v`, so the same edge sits in two disk cycles at once.

/// The disk cycle around a vertex.
#[derive(Clone, Copy)]
pub struct Disk<'brand, 'arena>(pub ptr!(Vertex));

impl<'brand, 'arena> Disk<'brand, 'arena> {
    fn slot(&self, edge: ptr!(Edge), token: &impl ReflAsRef<GhostToken<'brand>>) -> usize {
        if edge.maybe_v1(token) == Some(self.0) {
            0
        } else {
            1
        }
    }
}

impl<'brand, 'arena> Cycle<'brand, 'arena, Edge<'brand, 'arena>> for Disk<'brand, 'arena> {
    fn next(&self, node: ptr!(Edge), token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<ptr!(Edge)> {
        node.borrow(token).disk[self.slot(node, token)].next
    }

    fn prev(&self, node: ptr!(Edge), token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<ptr!(Edge)> {
        node.borrow(token).disk[self.slot(node, token)].prev
    }

    fn set_next(
        &self,
        node: ptr!(Edge),
        x: Option<ptr!(Edge)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        let slot = self.slot(node, token);
        node.borrow_mut(token).disk[slot].next = x;
    }

    fn set_prev(
        &self,
        node: ptr!(Edge),
        x: Option<ptr!(Edge)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        let slot = self.slot(node, token);
        node.borrow_mut(token).disk[slot].prev = x;
    }
}

pub type DiskIterator<'tok, 'brand, 'arena> =
    CycleIterator<'tok, 'brand, 'arena, Disk<'brand, 'arena>, Edge<'brand, 'arena>>;

impl<'brand, 'arena> ptr!(Edge) {
    pub fn verts(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> [ptr!(Vertex); 2] {
        [self.v1(token), self.v2(token)]
    }

    pub fn has_vert(self, vertex: ptr!(Vertex), token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        self.maybe_v1(token) == Some(vertex) || self.maybe_v2(token) == Some(vertex)
    }

    /// The endpoint that is not `vertex`, or `None` if `vertex` is not an
    /// endpoint at all.
    pub fn other_vert(
        self,
        vertex: ptr!(Vertex),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr!(Vertex)> {
        let [v1, v2] = self.verts(token);
        if v1 == vertex {
            Some(v2)
        } else if v2 == vertex {
            Some(v1)
        } else {
            None
        }
    }

    /// Replace endpoint `from` with `to` without touching any disk cycle.
    pub(crate) fn swap_vert(
        self,
        from: ptr!(Vertex),
        to: ptr!(Vertex),
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        if self.maybe_v1(token) == Some(from) {
            self.set_v1(to, token);
        } else {
            debug_assert!(self.maybe_v2(token) == Some(from));
            self.set_v2(to, token);
        }
    }

    /// Link this edge into the disk cycle of `vertex`, one of its endpoints.
    ///
    /// An isolated vertex gets this edge as its one-element disk; otherwise
    /// the vertex keeps its first edge.
    pub(crate) fn disk_append(
        self,
        vertex: ptr!(Vertex),
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        debug_assert!(self.has_vert(vertex, token));

        let head = vertex.maybe_edge(token);
        let head = cycle::append(&Disk(vertex), head, self, token);
        vertex.set_edge(head, token);
    }

    /// Unlink this edge from the disk cycle of `vertex`, rebasing the
    /// vertex's first edge if it pointed here.
    pub(crate) fn disk_remove(
        self,
        vertex: ptr!(Vertex),
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        debug_assert!(self.has_vert(vertex, token));

        let next = cycle::remove(&Disk(vertex), self, token);
        if vertex.maybe_edge(token) == Some(self) {
            vertex.set_opt_edge(next, token);
        }
    }

    /// The edge after this one around `vertex`, `None` if not incident.
    pub fn disk_next(
        self,
        vertex: ptr!(Vertex),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr!(Edge)> {
        if !self.has_vert(vertex, token) {
            return None;
        }
        Disk(vertex).next(self, token)
    }

    /// The edge before this one around `vertex`, `None` if not incident.
    pub fn disk_prev(
        self,
        vertex: ptr!(Vertex),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr!(Edge)> {
        if !self.has_vert(vertex, token) {
            return None;
        }
        Disk(vertex).prev(self, token)
    }
}

impl<'brand, 'arena> ptr!(Vertex) {
    pub fn co(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Vec3 {
        self.borrow(token).co
    }

    pub fn set_co(self, co: Vec3, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).co = co;
    }

    pub fn no(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Vec3 {
        self.borrow(token).no
    }

    pub fn set_no(self, no: Vec3, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).no = no;
    }

    pub fn iter_disk<'tok>(self, token: &'tok impl ReflAsRef<GhostToken<'brand>>) -> DiskIterator<'tok, 'brand, 'arena> {
        CycleIterator::new(Disk(self), self.maybe_edge(token), token)
    }

    /// Number of edges incident to this vertex.
    pub fn degree(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Result<usize, CycleError> {
        cycle::length(&Disk(self), self.maybe_edge(token), token)
    }

    pub fn is_isolated(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        self.maybe_edge(token).is_none()
    }

    /// The edge connecting this vertex to `other`, if any.
    pub fn find_edge(
        self,
        other: ptr!(Vertex),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr!(Edge)> {
        self.iter_disk(token)
            .find(|e| e.item.other_vert(self, token) == Some(other))
            .map(|e| e.item)
    }

    /// Number of incident edges satisfying `pred`.
    pub fn disk_count_matching<'tok>(
        self,
        token: &'tok impl ReflAsRef<GhostToken<'brand>>,
        mut pred: impl FnMut(lens!(Edge)) -> bool,
    ) -> usize
    where
        'brand: 'tok,
        'arena: 'tok,
    {
        self.iter_disk(token).filter(|&e| pred(e)).count()
    }

    /// Whether any incident edge is used by fewer or more than two faces.
    pub fn is_boundary<'tok>(self, token: &'tok impl ReflAsRef<GhostToken<'brand>>) -> bool
    where
        'brand: 'tok,
        'arena: 'tok,
    {
        self.disk_count_matching(token, |e| e.item.radial_len(token) != Ok(2)) > 0
    }
}

impl<'tok, 'brand, 'arena> lens!(Vertex) {
    pub fn co(self) -> Vec3 {
        self.item.co(&self)
    }

    pub fn iter_disk(self) -> DiskIterator<'tok, 'brand, 'arena> {
        self.item.iter_disk(self.token)
    }
}

impl<'tok, 'brand, 'arena> lens!(Edge) {
    pub fn other_vert(self, vertex: ptr!(Vertex)) -> Option<lens!(Vertex)> {
        self.item.other_vert(vertex, &self).map(|v| v.lens(self.token))
    }

    pub fn disk_next(self, vertex: ptr!(Vertex)) -> Option<lens!(Edge)> {
        self.item.disk_next(vertex, &self).map(|e| e.lens(self.token))
    }
}
