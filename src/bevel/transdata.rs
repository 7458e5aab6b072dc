use crate::*;

/// Index of a shared offset limit in a [`TransDataTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LimitId(usize);

/// Where a vertex created by a bevel ends up, as a function of the bevel
/// value: `origin + dir * factor * value`, with `value` clamped to the limit
/// shared by every vertex split off the same original vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransData {
    /// Position of the original vertex.
    pub origin: Vec3,
    /// Position after the last [`TransDataTable::apply`].
    pub co: Vec3,
    /// Unit direction of the offset, zero if the vertex does not move.
    pub dir: Vec3,
    /// Offset length per unit of bevel value.
    pub factor: f32,
    pub weight: f32,
    pub limit: LimitId,
}

impl TransData {
    pub(crate) fn new(origin: Vec3, disp: Vec3, weight: f32, limit: LimitId) -> Self {
        let factor = disp.length();
        Self {
            origin,
            co: origin,
            dir: if factor > 0.0 { disp / factor } else { Vec3::ZERO },
            factor,
            weight,
            limit,
        }
    }

    /// Offset per unit of bevel value.
    pub fn disp(&self) -> Vec3 {
        self.dir * self.factor
    }
}

/// Per-vertex transform data of a bevel, keyed by vertex id.
///
/// Returned by [`bevel_transdata`](super::bevel_transdata) so the final
/// positions can be recomputed for any bevel value without redoing the
/// topology.
#[derive(Debug, Default, Clone)]
pub struct TransDataTable {
    entries: HashMap<usize, TransData>,
    // negative means no limit yet
    limits: Vec<f32>,
}

impl TransDataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, vertex: usize) -> Option<&TransData> {
        self.entries.get(&vertex)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TransData)> + '_ {
        self.entries.iter().map(|(&id, td)| (id, td))
    }

    /// The largest value `td` can be moved by, if one was found.
    pub fn limit(&self, td: &TransData) -> Option<f32> {
        self.limits.get(td.limit.0).copied().filter(|&max| max > 0.0)
    }

    /// Where `td` lands for `value`.
    pub fn position(&self, td: &TransData, value: f32) -> Vec3 {
        let value = match self.limit(td) {
            Some(max) if value > max => max,
            _ => value,
        };
        td.origin + td.disp() * value
    }

    pub(crate) fn insert(&mut self, vertex: usize, td: TransData) {
        self.entries.insert(vertex, td);
    }

    pub(crate) fn new_limit(&mut self) -> LimitId {
        self.limits.push(-1.0);
        LimitId(self.limits.len() - 1)
    }

    /// Lower the shared limit to `max` unless it is already tighter.
    pub(crate) fn tighten(&mut self, id: LimitId, max: f32) {
        if let Some(limit) = self.limits.get_mut(id.0) {
            if *limit < 0.0 || max < *limit {
                *limit = max;
            }
        }
    }

    /// Move every vertex of `mesh` that has an entry to its position for
    /// `value`. Returns how many vertices were moved.
    pub fn apply<'brand, 'arena>(&mut self, mesh: &mut Mesh<'brand, 'arena>, value: f32) -> usize {
        let verts: Vec<_> = mesh.iter_verts().map(|v| (v.item, v.id())).collect();

        let mut moved = 0;
        for (v, id) in verts {
            let Some(td) = self.entries.get(&id).copied() else {
                continue;
            };
            let co = self.position(&td, value);
            v.set_co(co, mesh);
            if let Some(td) = self.entries.get_mut(&id) {
                td.co = co;
            }
            moved += 1;
        }
        moved
    }
}
