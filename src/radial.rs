use crate::*;

// Radial cycle: the loops running along one edge, one per face using it.

/// The radial cycle around an edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct Radial;

impl<'brand, 'arena> Cycle<'brand, 'arena, Loop<'brand, 'arena>> for Radial {
    fn next(&self, node: ptr!(Loop), token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<ptr!(Loop)> {
        node.borrow(token).radial.next
    }

    fn prev(&self, node: ptr!(Loop), token: &impl ReflAsRef<GhostToken<'brand>>) -> Option<ptr!(Loop)> {
        node.borrow(token).radial.prev
    }

    fn set_next(
        &self,
        node: ptr!(Loop),
        x: Option<ptr!(Loop)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        node.borrow_mut(token).radial.next = x;
    }

    fn set_prev(
        &self,
        node: ptr!(Loop),
        x: Option<ptr!(Loop)>,
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        node.borrow_mut(token).radial.prev = x;
    }
}

pub type RadialIterator<'tok, 'brand, 'arena> =
    CycleIterator<'tok, 'brand, 'arena, Radial, Loop<'brand, 'arena>>;

impl<'brand, 'arena> ptr!(Loop) {
    /// Link this loop into the radial cycle of `edge`.
    pub(crate) fn radial_append(
        self,
        edge: ptr!(Edge),
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        let head = edge.maybe_loop_(token);
        let head = cycle::append(&Radial, head, self, token);
        edge.set_loop_(head, token);
    }

    /// Unlink this loop from the radial cycle of `edge`. The edge becomes a
    /// wire edge when its last loop leaves.
    pub(crate) fn radial_remove(
        self,
        edge: ptr!(Edge),
        token: &mut impl ReflAsMut<GhostToken<'brand>>,
    ) {
        let next = cycle::remove(&Radial, self, token);
        if edge.maybe_loop_(token) == Some(self) {
            edge.set_opt_loop_(next, token);
        }
    }

    pub fn radial_next(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> ptr!(Loop) {
        Radial.next(self, token).unwrap_or(self)
    }

    pub fn radial_prev(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> ptr!(Loop) {
        Radial.prev(self, token).unwrap_or(self)
    }

    /// Number of loops along this loop's edge that start at `vertex`.
    pub fn radial_count_vertex_uses(
        self,
        vertex: ptr!(Vertex),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> usize {
        CycleIterator::new(Radial, Some(self), token)
            .filter(|l| l.vert().item == vertex)
            .count()
    }
}

impl<'brand, 'arena> ptr!(Edge) {
    pub fn iter_radial<'tok>(
        self,
        token: &'tok impl ReflAsRef<GhostToken<'brand>>,
    ) -> RadialIterator<'tok, 'brand, 'arena> {
        CycleIterator::new(Radial, self.maybe_loop_(token), token)
    }

    /// Number of faces using this edge.
    pub fn radial_len(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> Result<usize, CycleError> {
        cycle::length(&Radial, self.maybe_loop_(token), token)
    }

    /// Whether any loop along this edge belongs to `face`.
    pub fn radial_face_uses(self, face: ptr!(Face), token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        self.radial_loop_in(face, token).is_some()
    }

    /// The loop along this edge that belongs to `face`.
    pub fn radial_loop_in(
        self,
        face: ptr!(Face),
        token: &impl ReflAsRef<GhostToken<'brand>>,
    ) -> Option<ptr!(Loop)> {
        self.iter_radial(token)
            .find(|l| l.item.maybe_face(token) == Some(face))
            .map(|l| l.item)
    }

    pub fn is_wire(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        self.maybe_loop_(token).is_none()
    }

    pub fn is_boundary(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        self.radial_len(token) == Ok(1)
    }

    pub fn is_manifold(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        self.radial_len(token) == Ok(2)
    }

    pub fn crease(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> f32 {
        self.borrow(token).crease
    }

    pub fn set_crease(self, crease: f32, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).crease = crease;
    }

    pub fn bevel_weight(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> f32 {
        self.borrow(token).bweight
    }

    pub fn set_bevel_weight(self, weight: f32, token: &mut impl ReflAsMut<GhostToken<'brand>>) {
        self.borrow_mut(token).bweight = weight;
    }
}

impl<'brand, 'arena> ptr!(Vertex) {
    /// Whether the surface around this vertex is not a single disc or
    /// half-disc.
    ///
    /// True for isolated vertices, vertices with a wire edge or an edge used
    /// by more than two faces, and vertices where walking the fan of faces
    /// does not reach every incident edge (two fans pinched together).
    pub fn is_nonmanifold(self, token: &impl ReflAsRef<GhostToken<'brand>>) -> bool {
        let Some(start) = self.maybe_edge(token) else {
            return true;
        };

        let mut degree = 0;
        for e in self.iter_disk(token) {
            degree += 1;
            if !matches!(e.item.radial_len(token), Ok(1 | 2)) {
                return true;
            }
        }

        let first = start.loop_(token);
        let mut l = first;
        let mut count = 1;
        let mut turned = false;

        loop {
            // the other edge of l's face at this vertex
            let other = if l.vert(token) == self {
                l.prev(token)
            } else {
                l.next(token)
            };

            if other.edge(token) == start {
                break;
            }

            count += 1;
            if count > degree {
                break;
            }

            let across = other.radial_next(token);
            if across != other {
                l = across;
                continue;
            }

            // hit a boundary, walk the fan the other way once
            let back = first.radial_next(token);
            if turned || back == first {
                break;
            }
            turned = true;
            l = back;
        }

        count < degree
    }
}

impl<'tok, 'brand, 'arena> lens!(Loop) {
    pub fn radial_next(self) -> lens!(Loop) {
        self.item.radial_next(&self).lens(self.token)
    }
}

impl<'tok, 'brand, 'arena> lens!(Edge) {
    pub fn iter_radial(self) -> RadialIterator<'tok, 'brand, 'arena> {
        self.item.iter_radial(self.token)
    }
}
