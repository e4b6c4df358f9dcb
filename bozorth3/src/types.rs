use std::fmt;

/// Kind of a minutia, when the template provides it.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MinutiaKind {
    /// Ridge bifurcation.
    Bif,
    /// Ridge ending.
    Rig,
}

/// A single oriented fingerprint feature point.
#[derive(Debug, Copy, Clone)]
pub struct Minutia {
    /// X coordinate in image space.
    pub x: i32,
    /// Y coordinate in image space.
    pub y: i32,
    /// Ridge orientation in degrees, normalized to (-180, 180].
    pub theta: i32,
    /// Minutia kind, if the source template carried one.
    pub kind: Option<MinutiaKind>,
}

/// Index of a minutia in its template's prepared sequence.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq)]
pub struct Endpoint(pub(crate) u32);

impl Endpoint {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl From<usize> for Endpoint {
    #[inline]
    fn from(index: usize) -> Self {
        Endpoint(index as u32)
    }
}

impl From<u32> for Endpoint {
    #[inline]
    fn from(index: u32) -> Self {
        Endpoint(index)
    }
}

/// Which endpoint the smaller beta angle came from, before the two were
/// sorted into `min_beta`/`max_beta`.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum BetaOrder {
    /// `min_beta` is the beta of endpoint K, `max_beta` that of endpoint J.
    KJ,
    /// `min_beta` is the beta of endpoint J, `max_beta` that of endpoint K.
    JK,
}

/// Translation- and rotation-invariant descriptor of a minutia pair on a
/// single fingerprint.
#[derive(Debug, Copy, Clone)]
pub struct Edge {
    /// Squared distance between the two minutiae.
    pub distance_squared: i32,
    /// The smaller of the two beta angles.
    pub min_beta: i32,
    /// The greater of the two beta angles.
    pub max_beta: i32,
    /// The endpoint with the smaller x coordinate.
    pub endpoint_k: Endpoint,
    /// The endpoint with the greater x coordinate.
    pub endpoint_j: Endpoint,
    /// Absolute direction of the edge from K to J, in degrees.
    pub theta_kj: i32,
    /// Which endpoint `min_beta` was taken from.
    pub beta_order: BetaOrder,
}

/// Candidate correspondence between one probe edge and one gallery edge.
#[derive(Debug, Copy, Clone)]
pub struct Pair {
    /// Estimated rotation between the two templates, normalized to
    /// (-180, 180].
    pub delta_theta: i32,
    /// Endpoint K on the probe.
    pub probe_k: Endpoint,
    /// Endpoint J on the probe.
    pub probe_j: Endpoint,
    /// Endpoint on the gallery corresponding to `probe_k`.
    pub gallery_k: Endpoint,
    /// Endpoint on the gallery corresponding to `probe_j`.
    pub gallery_j: Endpoint,
    /// Score contribution of this pair: 1 by default, plus 1 per endpoint
    /// whose minutia kind matches across the templates.
    pub points: u32,
}

/// Coordinate convention of the source template files.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Format {
    NistInternal,
    Ansi,
}
