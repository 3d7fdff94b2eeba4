pub mod aic;
pub mod boundary;
pub mod normal;

use std::ops::Index;

use faer::{Col, Mat, MatRef};
use itertools::izip;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    error::{AssemblyError, Result},
    kernels::{BiotSavart, ElementaryKernel},
    settings::AssemblySettings,
    surface::Configuration,
};

pub use aic::{AicProjection, AicTarget, InfluenceMatrices};
pub use boundary::BoundaryJacobian;

/// Matrices indexed by (output surface, input surface), sized once from the
/// surface count.
#[derive(Debug, Clone)]
pub struct BlockMatrix {
    n_out: usize,
    n_in: usize,
    blocks: Vec<Mat<f64>>, // Row-major over (output, input)
}

impl BlockMatrix {
    pub(crate) fn from_rows(rows: Vec<Vec<Mat<f64>>>) -> Self {
        let n_out = rows.len();
        let n_in = rows.first().map_or(0, |r| r.len());
        debug_assert!(rows.iter().all(|r| r.len() == n_in));
        Self {
            n_out,
            n_in,
            blocks: rows.into_iter().flatten().collect(),
        }
    }

    /// Number of (output, input) surfaces
    pub fn shape(&self) -> (usize, usize) {
        (self.n_out, self.n_in)
    }

    pub fn block(&self, i_out: usize, i_in: usize) -> MatRef<'_, f64> {
        self[(i_out, i_in)].as_ref()
    }

    /// All blocks acting on output surface `i_out`
    pub fn row(&self, i_out: usize) -> &[Mat<f64>] {
        &self.blocks[i_out * self.n_in..(i_out + 1) * self.n_in]
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &Mat<f64>)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| ((i / self.n_in, i % self.n_in), b))
    }
}

impl Index<(usize, usize)> for BlockMatrix {
    type Output = Mat<f64>;

    fn index(&self, (i_out, i_in): (usize, usize)) -> &Mat<f64> {
        assert!(i_out < self.n_out && i_in < self.n_in);
        &self.blocks[i_out * self.n_in + i_in]
    }
}

/// Block matrix-vector product `y_i = sum_j A_ij x_j`. Fails unless there is
/// one input per block column, each sized to the columns of its blocks.
pub(crate) fn block_product(a: &BlockMatrix, x: &[Col<f64>]) -> Result<Vec<Col<f64>>> {
    if x.len() != a.n_in {
        return Err(AssemblyError::shape("block product inputs", a.n_in, x.len()));
    }
    if let Some(((_, j), block)) = a.iter().find(|((_, j), b)| b.ncols() != x[*j].nrows()) {
        return Err(AssemblyError::shape(
            "block product input length",
            block.ncols(),
            x[j].nrows(),
        ));
    }
    Ok((0..a.n_out)
        .map(|i| {
            let nrows = a.row(i).first().map_or(0, |b| b.nrows());
            a.row(i)
                .iter()
                .zip(x.iter())
                .fold(Col::<f64>::zeros(nrows), |acc, (aij, xj)| acc + aij * xj)
        })
        .collect())
}

/// Stateless assembler of influence and sensitivity matrices over a set of
/// surfaces. The elementary kernel can be replaced through `with_kernel`.
#[derive(Debug, Clone)]
pub struct Assembler<K = BiotSavart> {
    kernel: K,
    parallel: bool,
}

impl Assembler<BiotSavart> {
    pub fn new(settings: &AssemblySettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            kernel: BiotSavart::new(settings.vortex_core_radius),
            parallel: settings.parallel,
        })
    }
}

impl Default for Assembler<BiotSavart> {
    fn default() -> Self {
        Self {
            kernel: BiotSavart::default(),
            parallel: true,
        }
    }
}

impl<K: ElementaryKernel> Assembler<K> {
    pub fn with_kernel(kernel: K, parallel: bool) -> Self {
        Self { kernel, parallel }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Evaluate `f` for every output surface; outputs write disjoint rows so
    /// they may run on the rayon pool.
    fn map_outputs<T, F>(&self, n_out: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        if self.parallel {
            (0..n_out).into_par_iter().map(f).collect()
        } else {
            (0..n_out).map(f).collect()
        }
    }
}

impl Configuration {
    pub fn influence_matrices<K: ElementaryKernel>(
        &self,
        assembler: &Assembler<K>,
        projection: AicProjection,
    ) -> Result<InfluenceMatrices> {
        assembler.build_aic(&self.bound, &self.wake, AicTarget::Collocation, projection)
    }

    pub fn boundary_jacobian<K: ElementaryKernel>(
        &self,
        assembler: &Assembler<K>,
    ) -> Result<BoundaryJacobian> {
        assembler.assemble_all(&self.bound, &self.wake)
    }

    pub fn normal_velocity_jacobians<K: ElementaryKernel>(
        &self,
        assembler: &Assembler<K>,
    ) -> Result<Vec<Mat<f64>>> {
        assembler.normal_velocity_jacobians(&self.bound)
    }

    /// Circulation of every bound and wake surface, flattened in panel order
    pub fn gamma_flat(&self) -> (Vec<Col<f64>>, Vec<Col<f64>>) {
        izip!(self.bound.iter(), self.wake.iter())
            .map(|(b, w)| (b.gamma_flat(), w.gamma_flat()))
            .unzip()
    }
}
