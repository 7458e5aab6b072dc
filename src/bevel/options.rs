#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which edges take part in a bevel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BevelLimit {
    /// Every eligible edge.
    #[default]
    None,
    /// Only edges whose faces meet at more than this many degrees, and
    /// creased edges.
    Angle(f32),
    /// Only edges with a crease above zero.
    Crease,
    /// Only edges with a bevel weight above zero, scaled by that weight.
    Weight,
}

/// How the weights of the beveled edges around a vertex combine into the
/// vertex's weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WeightMode {
    #[default]
    Average,
    Min,
    Max,
}

impl WeightMode {
    pub(crate) fn combine(self, weights: impl IntoIterator<Item = f32>) -> Option<f32> {
        let mut n = 0;
        let mut acc: Option<f32> = None;
        for w in weights {
            n += 1;
            acc = Some(match (self, acc) {
                (_, None) => w,
                (Self::Average, Some(a)) => a + w,
                (Self::Min, Some(a)) => a.min(w),
                (Self::Max, Some(a)) => a.max(w),
            });
        }
        match self {
            Self::Average => acc.map(|a| a / n as f32),
            _ => acc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BevelOptions {
    /// Offset distance. Zero or less leaves the mesh alone.
    pub value: f32,
    /// Number of passes; more passes round the profile. Zero means a single
    /// vertex-only pass.
    pub resolution: u32,
    /// Bevel vertices instead of edges.
    pub vertex_only: bool,
    /// Only consider selected edges (or vertices, with `vertex_only`).
    pub select_only: bool,
    pub limit: BevelLimit,
    pub weight_mode: WeightMode,
}

impl Default for BevelOptions {
    fn default() -> Self {
        Self {
            value: 0.1,
            resolution: 1,
            vertex_only: false,
            select_only: false,
            limit: BevelLimit::None,
            weight_mode: WeightMode::Average,
        }
    }
}

impl BevelOptions {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_vertex_only(mut self, vertex_only: bool) -> Self {
        self.vertex_only = vertex_only;
        self
    }

    pub fn with_select_only(mut self, select_only: bool) -> Self {
        self.select_only = select_only;
        self
    }

    pub fn with_limit(mut self, limit: BevelLimit) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_weight_mode(mut self, weight_mode: WeightMode) -> Self {
        self.weight_mode = weight_mode;
        self
    }

    pub(crate) fn is_vertex_only(&self) -> bool {
        self.vertex_only || self.resolution == 0
    }

    pub(crate) fn passes(&self) -> usize {
        self.resolution.max(1) as usize
    }

    /// Offset of the first pass, relative to `value`. Later passes divide it
    /// by three, then by two each time, and all of them together add up to
    /// one.
    pub(crate) fn first_pass_factor(&self) -> f32 {
        let mut fac = 1.0;
        for i in 0..self.resolution.saturating_sub(1) {
            fac += if i == 0 { 1.0 / 3.0 } else { 1.0 / (6.0 * i as f32) };
        }
        1.0 / fac
    }
}
