//! Edge and vertex bevel built on the Euler operators.
//!
//! The topology is rebuilt first with every new vertex sitting on top of the
//! vertex it was split off; a [`TransDataTable`] then says where each one
//! goes for a given bevel value. [`bevel`] does both, [`bevel_transdata`]
//! hands back the table so the value can be changed afterwards.

use crate::*;
use std::collections::HashSet;
use tracing::debug;

mod options;
pub use options::*;

mod transdata;
pub use transdata::*;

mod pass;
use pass::Pass;

#[cfg(test)]
mod tests;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BevelError {
    #[error("bevel value must be finite, got {0}")]
    NonFiniteValue(f32),
    #[error("mesh is inconsistent: {0}")]
    Invalid(#[from] InvariantError),
}

/// Something a bevel had to skip. The mesh stays consistent; the affected
/// spot just looks less beveled than asked for.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum BevelWarning {
    #[error("vertex {vertex}: edges of a corner are parallel, no offset")]
    DegenerateCorner { vertex: usize },
    #[error("vertex {vertex}: edge {edge} has zero length, no offset")]
    ZeroLengthEdge { vertex: usize, edge: usize },
    #[error("face {face}: corner at vertex {vertex} not clipped: {reason}")]
    CornerNotClipped {
        face: usize,
        vertex: usize,
        reason: SfmeError,
    },
    #[error("face {face}: no strip along edge {edge}: {reason}")]
    StripNotCut {
        face: usize,
        edge: usize,
        reason: SfmeError,
    },
    #[error("faces across edge {edge} not joined: {reason}")]
    NotJoined { edge: usize, reason: JfkeError },
    #[error("vertex {vertex} not dissolved: {reason}")]
    NotDissolved { vertex: usize, reason: JekvError },
    #[error("face {face} not split into quads: {reason}")]
    NotTessellated { face: usize, reason: SfmeError },
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BevelReport {
    pub passes: usize,
    /// Edges beveled by the first pass.
    pub edges: usize,
    /// Vertices beveled by the first pass.
    pub verts: usize,
    /// Vertices placed by the transform table.
    pub moved: usize,
    pub warnings: Vec<BevelWarning>,
}

/// Which elements a pass works on, by id. Vertices map to their weight.
#[derive(Debug, Default)]
pub(crate) struct BevelTags {
    pub verts: HashMap<usize, f32>,
    pub edges: HashSet<usize>,
}

impl BevelTags {
    fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }
}

/// Bevel `mesh` as described by `opts` and move the new vertices into place.
pub fn bevel<'brand, 'arena>(
    mesh: &mut Mesh<'brand, 'arena>,
    opts: &BevelOptions,
) -> Result<BevelReport, BevelError> {
    let (mut table, mut report) = run(mesh, opts)?;
    report.moved = table.apply(mesh, opts.value);
    Ok(report)
}

/// Like [`bevel`], but leaves every new vertex on its original vertex and
/// returns the table that places them.
pub fn bevel_transdata<'brand, 'arena>(
    mesh: &mut Mesh<'brand, 'arena>,
    opts: &BevelOptions,
) -> Result<(TransDataTable, BevelReport), BevelError> {
    let (mut table, report) = run(mesh, opts)?;
    table.apply(mesh, 0.0);
    Ok((table, report))
}

fn run<'brand, 'arena>(
    mesh: &mut Mesh<'brand, 'arena>,
    opts: &BevelOptions,
) -> Result<(TransDataTable, BevelReport), BevelError> {
    if !opts.value.is_finite() {
        return Err(BevelError::NonFiniteValue(opts.value));
    }

    let mut table = TransDataTable::new();
    let mut report = BevelReport::default();
    if opts.value <= 0.0 {
        debug!(value = opts.value, "nothing to bevel");
        return Ok((table, report));
    }
    mesh.validate()?;

    let vertex_only = opts.is_vertex_only();
    let mut d = opts.first_pass_factor();
    let mut created: Option<HashSet<usize>> = None;

    for pass in 0..opts.passes() {
        let tags = match &created {
            None => initialize(mesh, opts),
            Some(faces) => retag(mesh, faces, vertex_only, &table),
        };
        if tags.is_empty() {
            break;
        }
        if pass == 0 {
            report.edges = tags.edges.len();
            report.verts = tags.verts.len();
        }
        debug!(
            pass,
            verts = tags.verts.len(),
            edges = tags.edges.len(),
            d,
            "bevel pass"
        );

        let faces = Pass::new(mesh, &mut table, &mut report, &tags, vertex_only, d).run();
        if pass == 0 {
            compute_limits(mesh, &mut table);
        }

        created = Some(faces);
        d /= if pass == 0 { 3.0 } else { 2.0 };
        report.passes += 1;
    }

    debug!(
        passes = report.passes,
        warnings = report.warnings.len(),
        "bevel done"
    );
    Ok((table, report))
}

/// Angle between the faces on either side of a manifold edge, in degrees.
fn face_angle<'brand, 'arena>(e: ptr!(Edge), mesh: &Mesh<'brand, 'arena>) -> Option<f32> {
    if e.radial_len(mesh) != Ok(2) {
        return None;
    }
    let l = e.loop_(mesh);
    let a = l.face(mesh).calc_normal(mesh);
    let b = l.radial_next(mesh).face(mesh).calc_normal(mesh);
    if a == Vec3::ZERO || b == Vec3::ZERO {
        return None;
    }
    Some(a.angle_between(b).to_degrees())
}

/// Tag the elements of the first pass.
fn initialize<'brand, 'arena>(mesh: &Mesh<'brand, 'arena>, opts: &BevelOptions) -> BevelTags {
    let nonman: HashSet<usize> = mesh
        .iter_verts()
        .filter(|v| v.item.is_nonmanifold(mesh))
        .map(|v| v.id())
        .collect();

    // weight of an edge that passes the limit
    let passes = |e: ptr!(Edge)| -> Option<f32> {
        if !matches!(e.radial_len(mesh), Ok(1 | 2)) {
            return None;
        }
        match opts.limit {
            BevelLimit::None => Some(1.0),
            BevelLimit::Angle(min) => {
                let sharp = face_angle(e, mesh).is_some_and(|a| a > min);
                (sharp || e.crease(mesh) > 0.0).then_some(1.0)
            }
            BevelLimit::Crease => (e.crease(mesh) > 0.0).then_some(1.0),
            BevelLimit::Weight => Some(e.bevel_weight(mesh)).filter(|&w| w > 0.0),
        }
    };

    let mut tags = BevelTags::default();
    let mut weights: HashMap<usize, Vec<f32>> = HashMap::new();

    if opts.is_vertex_only() {
        for v in mesh.iter_verts() {
            if nonman.contains(&v.id()) || (opts.select_only && !v.item.is_selected(mesh)) {
                continue;
            }
            let ws: Vec<_> = v.iter_disk().filter_map(|e| passes(e.item)).collect();
            if !ws.is_empty() {
                weights.insert(v.id(), ws);
            }
        }
    } else {
        for e in mesh.iter_edges() {
            if opts.select_only && !e.item.is_selected(mesh) {
                continue;
            }
            let Some(w) = passes(e.item) else {
                continue;
            };
            let ends: Vec<_> = e
                .item
                .verts(mesh)
                .into_iter()
                .map(|v| v.id(mesh))
                .filter(|id| !nonman.contains(id))
                .collect();
            if ends.is_empty() {
                continue;
            }

            tags.edges.insert(e.id());
            for id in ends {
                weights.entry(id).or_default().push(w);
            }
        }
    }

    for (id, ws) in weights {
        if let Some(w) = opts.weight_mode.combine(ws) {
            tags.verts.insert(id, w);
        }
    }

    debug!(
        verts = tags.verts.len(),
        edges = tags.edges.len(),
        nonmanifold = nonman.len(),
        "tagged"
    );
    tags
}

/// Tag the elements of a later pass: everything around the faces the
/// previous pass created, except on the boundary. The first pass already
/// offset the boundary; splitting it again would only stack new vertices on
/// the old ones.
fn retag<'brand, 'arena>(
    mesh: &Mesh<'brand, 'arena>,
    created: &HashSet<usize>,
    vertex_only: bool,
    table: &TransDataTable,
) -> BevelTags {
    let weight = |id: usize| table.get(id).map_or(1.0, |td| td.weight);
    let inner = |v: ptr!(Vertex)| !v.is_boundary(mesh) && !v.is_nonmanifold(mesh);
    let mut tags = BevelTags::default();

    for f in mesh.iter_faces().filter(|f| created.contains(&f.id())) {
        for l in f.iter_loops() {
            if vertex_only {
                let v = l.vert();
                if inner(v.item) {
                    tags.verts.insert(v.id(), weight(v.id()));
                }
                continue;
            }

            let e = l.edge();
            if e.item.radial_len(mesh) != Ok(2) {
                continue;
            }
            let ends = e.item.verts(mesh);
            if !ends.iter().all(|&v| inner(v)) {
                continue;
            }
            tags.edges.insert(e.id());
            for v in ends {
                let id = v.id(mesh);
                tags.verts.insert(id, weight(id));
            }
        }
    }
    tags
}

/// Limit how far vertices may travel so that the two ends of an edge never
/// pass each other.
fn compute_limits<'brand, 'arena>(mesh: &Mesh<'brand, 'arena>, table: &mut TransDataTable) {
    let mut limits = Vec::new();

    for e in mesh.iter_edges() {
        let [a, b] = e.item.verts(mesh);
        let ta = table.get(a.id(mesh)).copied();
        let tb = table.get(b.id(mesh)).copied();
        if ta.is_none() && tb.is_none() {
            continue;
        }

        let oa = ta.map_or(a.co(mesh), |td| td.origin);
        let ob = tb.map_or(b.co(mesh), |td| td.origin);
        let len = oa.distance(ob);
        if len <= f32::EPSILON {
            continue;
        }
        let dir = (ob - oa) / len;

        // how fast each end moves toward the other
        let fa = ta.map_or(0.0, |td| td.disp().dot(dir).max(0.0));
        let fb = tb.map_or(0.0, |td| td.disp().dot(-dir).max(0.0));
        if fa + fb <= f32::EPSILON {
            continue;
        }

        let max = len / (fa + fb);
        for td in [ta, tb].into_iter().flatten() {
            limits.push((td.limit, max));
        }
    }

    for (id, max) in limits {
        table.tighten(id, max);
    }
}
