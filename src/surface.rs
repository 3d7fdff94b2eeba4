use std::sync::OnceLock;

use faer::{Col, Mat, MatMut, MatRef};
use itertools::Itertools;
use log::warn;

use crate::{
    error::{AssemblyError, Result},
    maps::PanelVertexMap,
    util::{col3, cross, norm, scale, sub, Vec3},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Lifting surface carrying physical circulation
    Bound,
    /// Trailing wake shed from the bound surface with the same index
    Wake,
}

/// One lifting or wake surface discretised into `M x N` vortex-ring panels.
#[derive(Debug, Clone)]
pub struct Surface {
    pub kind: SurfaceKind,
    m: usize,
    n: usize,
    zeta: Mat<f64>,                 // Vertex positions `[3][Kzeta]`
    gamma: Mat<f64>,                // Panel circulation `[M][N]`
    normals: Mat<f64>,              // Panel unit normals `[3][K]`
    u_ind_coll: Option<Mat<f64>>,   // Induced velocity at collocation points `[3][K]`
    u_input_coll: Option<Mat<f64>>, // External velocity at collocation points `[3][K]`
    weights: [f64; 4],              // Collocation weights in panel winding order
    collocation: OnceLock<Mat<f64>>, // Cached collocation points `[3][K]`
    maps: OnceLock<PanelVertexMap>,
}

impl Surface {
    /// Create a surface of `m` chordwise by `n` spanwise panels with all
    /// vertices at the origin and zero circulation.
    pub fn new(kind: SurfaceKind, m: usize, n: usize) -> Result<Self> {
        if m == 0 || n == 0 {
            return Err(AssemblyError::shape(
                "surface panel grid",
                "at least 1 x 1 panels",
                (m, n),
            ));
        }
        Ok(Self {
            kind,
            m,
            n,
            zeta: Mat::zeros(3, (m + 1) * (n + 1)),
            gamma: Mat::zeros(m, n),
            normals: Mat::zeros(3, m * n),
            u_ind_coll: None,
            u_input_coll: None,
            weights: collocation_weights(0.5, 0.5),
            collocation: OnceLock::new(),
            maps: OnceLock::new(),
        })
    }

    /// Create a surface whose vertex `(m, n)` is placed at `position(m, n)`.
    /// Normals are generated from the resulting geometry.
    pub fn from_fn(
        kind: SurfaceKind,
        m: usize,
        n: usize,
        position: impl Fn(usize, usize) -> Vec3,
    ) -> Result<Self> {
        let mut surface = Self::new(kind, m, n)?;
        let positions = (0..m + 1)
            .cartesian_product(0..n + 1)
            .map(|(im, jn)| position(im, jn))
            .collect_vec();
        surface.zeta = Mat::from_fn(3, positions.len(), |i, j| positions[j][i]);
        surface.generate_normals();
        Ok(surface)
    }

    /// Place the collocation point at fraction `a_m` of the panel chord and
    /// `a_n` of the panel span (0.5, 0.5 is the panel centre).
    pub fn with_collocation_fractions(mut self, a_m: f64, a_n: f64) -> Result<Self> {
        if !(0. ..=1.).contains(&a_m) || !(0. ..=1.).contains(&a_n) {
            return Err(AssemblyError::UnsupportedConfiguration(format!(
                "collocation fractions ({a_m}, {a_n}) outside [0, 1]"
            )));
        }
        self.weights = collocation_weights(a_m, a_n);
        self.collocation.take();
        Ok(self)
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.m, self.n)
    }

    /// Panel-vertex index map, built on first use
    pub fn maps(&self) -> &PanelVertexMap {
        self.maps.get_or_init(|| PanelVertexMap::new(self.m, self.n))
    }

    pub fn k(&self) -> usize {
        self.m * self.n
    }

    pub fn kzeta(&self) -> usize {
        (self.m + 1) * (self.n + 1)
    }

    //--------------------------------------------------------------------------
    // Geometry
    //--------------------------------------------------------------------------

    pub fn zeta(&self) -> MatRef<'_, f64> {
        self.zeta.as_ref()
    }

    /// Mutable vertex positions; drops the cached collocation points
    pub fn zeta_mut(&mut self) -> MatMut<'_, f64> {
        self.collocation.take();
        self.zeta.as_mut()
    }

    pub fn set_zeta(&mut self, zeta: MatRef<f64>) -> Result<()> {
        check_shape("zeta", &self.zeta, zeta)?;
        self.zeta_mut().copy_from(zeta);
        Ok(())
    }

    /// Position of vertex `(m, n)`, `m <= M` and `n <= N`
    pub fn vertex(&self, m: usize, n: usize) -> Result<Vec3> {
        if m > self.m || n > self.n {
            return Err(AssemblyError::shape(
                "vertex index",
                format!("at most ({}, {})", self.m, self.n),
                (m, n),
            ));
        }
        Ok(col3(self.zeta.as_ref(), self.maps().vertex_1d(m, n)))
    }

    /// Coordinates of the four vertices of panel `k` in winding order
    pub fn panel_vertex_coords(&self, k: usize) -> [Vec3; 4] {
        self.maps()
            .panel_vertices(k)
            .map(|v| col3(self.zeta.as_ref(), v))
    }

    /// Vertex coordinates flattened as `[x..., y..., z...]`, matching the
    /// column layout of the Jacobian matrices.
    pub fn zeta_flat(&self) -> Col<f64> {
        let kzeta = self.kzeta();
        Col::from_fn(3 * kzeta, |i| self.zeta[(i / kzeta, i % kzeta)])
    }

    //--------------------------------------------------------------------------
    // Circulation
    //--------------------------------------------------------------------------

    pub fn gamma(&self) -> MatRef<'_, f64> {
        self.gamma.as_ref()
    }

    pub fn gamma_mut(&mut self) -> MatMut<'_, f64> {
        self.gamma.as_mut()
    }

    pub fn set_gamma(&mut self, gamma: MatRef<f64>) -> Result<()> {
        check_shape("gamma", &self.gamma, gamma)?;
        self.gamma.copy_from(gamma);
        Ok(())
    }

    /// Panel circulation flattened in panel index order
    pub fn gamma_flat(&self) -> Col<f64> {
        let map = self.maps();
        Col::from_fn(self.k(), |k| {
            let (m, n) = map.panel_2d(k);
            self.gamma[(m, n)]
        })
    }

    //--------------------------------------------------------------------------
    // Normals
    //--------------------------------------------------------------------------

    pub fn normals(&self) -> MatRef<'_, f64> {
        self.normals.as_ref()
    }

    pub fn set_normals(&mut self, normals: MatRef<f64>) -> Result<()> {
        check_shape("normals", &self.normals, normals)?;
        self.normals.copy_from(normals);
        Ok(())
    }

    /// Compute unit normals from the panel diagonals, `(r02 x r13) / |r02 x r13|`
    pub fn generate_normals(&mut self) {
        for k in 0..self.k() {
            let z = self.panel_vertex_coords(k);
            let w = cross(&sub(&z[2], &z[0]), &sub(&z[3], &z[1]));
            let w_norm = norm(&w);
            let nv = if w_norm > f64::EPSILON {
                scale(1. / w_norm, &w)
            } else {
                warn!("panel {k} is degenerate, normal set to zero");
                [0.; 3]
            };
            (0..3).for_each(|i| self.normals[(i, k)] = nv[i]);
        }
    }

    //--------------------------------------------------------------------------
    // Collocation points
    //--------------------------------------------------------------------------

    pub fn collocation_weights(&self) -> [f64; 4] {
        self.weights
    }

    /// Collocation points `[3][K]`, computed from the vertices on first use
    pub fn ensure_collocations(&self) -> MatRef<'_, f64> {
        self.collocation
            .get_or_init(|| {
                let mut zetac = Mat::<f64>::zeros(3, self.k());
                (0..self.k()).for_each(|k| {
                    let z = self.panel_vertex_coords(k);
                    z.iter().zip(self.weights.iter()).for_each(|(zv, &w)| {
                        (0..3).for_each(|i| zetac[(i, k)] += w * zv[i]);
                    });
                });
                zetac
            })
            .as_ref()
    }

    //--------------------------------------------------------------------------
    // Collocation point velocities
    //--------------------------------------------------------------------------

    pub fn u_ind_coll(&self) -> Option<MatRef<'_, f64>> {
        self.u_ind_coll.as_ref().map(|u| u.as_ref())
    }

    pub fn set_u_ind_coll(&mut self, u: MatRef<f64>) -> Result<()> {
        check_shape("u_ind_coll", &self.normals, u)?;
        self.u_ind_coll = Some(u.to_owned());
        Ok(())
    }

    pub fn u_input_coll(&self) -> Option<MatRef<'_, f64>> {
        self.u_input_coll.as_ref().map(|u| u.as_ref())
    }

    pub fn set_u_input_coll(&mut self, u: MatRef<f64>) -> Result<()> {
        check_shape("u_input_coll", &self.normals, u)?;
        self.u_input_coll = Some(u.to_owned());
        Ok(())
    }

    /// Total velocity (input + induced) at the collocation points
    pub fn total_velocity_coll(&self) -> Result<Mat<f64>> {
        let u_ind = self.u_ind_coll().ok_or(AssemblyError::MissingAttribute {
            attribute: "u_ind_coll",
        })?;
        let u_input = self.u_input_coll().ok_or(AssemblyError::MissingAttribute {
            attribute: "u_input_coll",
        })?;
        Ok(u_ind + u_input)
    }
}

/// Bilinear weights of the four panel vertices in winding order
fn collocation_weights(a_m: f64, a_n: f64) -> [f64; 4] {
    [
        (1. - a_m) * (1. - a_n),
        a_m * (1. - a_n),
        a_m * a_n,
        (1. - a_m) * a_n,
    ]
}

fn check_shape(context: &'static str, expected: &Mat<f64>, found: MatRef<f64>) -> Result<()> {
    if expected.nrows() != found.nrows() || expected.ncols() != found.ncols() {
        return Err(AssemblyError::shape(
            context,
            (expected.nrows(), expected.ncols()),
            (found.nrows(), found.ncols()),
        ));
    }
    Ok(())
}

/// Bound surfaces paired index-for-index with the wakes they shed.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub bound: Vec<Surface>,
    pub wake: Vec<Surface>,
}

impl Configuration {
    pub fn new(bound: Vec<Surface>, wake: Vec<Surface>) -> Result<Self> {
        check_pairing(&bound, &wake)?;
        Ok(Self { bound, wake })
    }

    pub fn n_surf(&self) -> usize {
        self.bound.len()
    }
}

/// Bound and wake lists must have equal length and each wake must continue
/// the trailing edge of its bound surface.
pub(crate) fn check_pairing(bound: &[Surface], wake: &[Surface]) -> Result<()> {
    if bound.len() != wake.len() {
        return Err(AssemblyError::shape(
            "bound and wake surface lists",
            bound.len(),
            wake.len(),
        ));
    }
    bound
        .iter()
        .zip(wake.iter())
        .try_for_each(|(b, w)| {
            if b.n != w.n {
                return Err(AssemblyError::shape("wake spanwise panels", b.n, w.n));
            }
            Ok(())
        })
}
