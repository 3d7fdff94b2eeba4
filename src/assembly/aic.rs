use faer::{Col, Mat};
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    assembly::{block_product, Assembler, BlockMatrix},
    error::Result,
    kernels::ElementaryKernel,
    surface::{check_pairing, Surface},
    util::{col3, dot},
};

/// Points at which influence coefficients are evaluated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AicTarget {
    #[default]
    Collocation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AicProjection {
    /// Velocity projected on the output panel normal, blocks `[K_out][K_in]`
    #[default]
    Normal,
    /// Raw velocity components, blocks `[3 K_out][K_in]` with component `i`
    /// of collocation point `c` in row `c + i K_out`
    Components,
}

/// Influence of bound (`aic`) and wake (`aic_star`) circulation on the bound
/// collocation points; block `(i, j)` maps surface `j` to surface `i`.
#[derive(Debug, Clone)]
pub struct InfluenceMatrices {
    pub aic: BlockMatrix,
    pub aic_star: BlockMatrix,
}

impl InfluenceMatrices {
    /// Velocity at every bound collocation point due to the given circulation,
    /// `sum_j AIC_ij gamma_j + AIC*_ij gamma*_j`
    pub fn induced_velocity(
        &self,
        gamma: &[Col<f64>],
        gamma_star: &[Col<f64>],
    ) -> Result<Vec<Col<f64>>> {
        let bound = block_product(&self.aic, gamma)?;
        let wake = block_product(&self.aic_star, gamma_star)?;
        Ok(bound.into_iter().zip(wake).map(|(a, b)| a + b).collect())
    }
}

impl<K: ElementaryKernel> Assembler<K> {
    /// Build the AIC blocks from every bound and wake surface onto every bound
    /// surface. Caches the collocation points of the bound surfaces.
    pub fn build_aic(
        &self,
        bound: &[Surface],
        wake: &[Surface],
        target: AicTarget,
        projection: AicProjection,
    ) -> Result<InfluenceMatrices> {
        check_pairing(bound, wake)?;
        let AicTarget::Collocation = target;
        debug!(
            "building AIC for {} surfaces ({} bound panels)",
            bound.len(),
            bound.iter().map(|s| s.k()).sum::<usize>()
        );

        let (aic, aic_star): (Vec<_>, Vec<_>) = self
            .map_outputs(bound.len(), |i_out| {
                let surf_out = &bound[i_out];
                let aic_row = bound
                    .iter()
                    .map(|surf_in| self.surface_aic(surf_in, surf_out, projection))
                    .collect_vec();
                let aic_star_row = wake
                    .iter()
                    .map(|surf_in| self.surface_aic(surf_in, surf_out, projection))
                    .collect_vec();
                (aic_row, aic_star_row)
            })
            .into_iter()
            .unzip();

        Ok(InfluenceMatrices {
            aic: BlockMatrix::from_rows(aic),
            aic_star: BlockMatrix::from_rows(aic_star),
        })
    }

    /// Velocity at the collocation points of `surf_out` due to unit circulation
    /// on each panel of `surf_in`.
    pub fn surface_aic(
        &self,
        surf_in: &Surface,
        surf_out: &Surface,
        projection: AicProjection,
    ) -> Mat<f64> {
        let zetac = surf_out.ensure_collocations();
        let normals = surf_out.normals();
        let (k_out, k_in) = (surf_out.k(), surf_in.k());
        trace!("AIC block {k_out} x {k_in}");

        let panels = (0..k_in)
            .map(|p| surf_in.panel_vertex_coords(p))
            .collect_vec();

        let mut aic = match projection {
            AicProjection::Normal => Mat::<f64>::zeros(k_out, k_in),
            AicProjection::Components => Mat::<f64>::zeros(3 * k_out, k_in),
        };
        (0..k_out).for_each(|c| {
            let zc = col3(zetac, c);
            let nc = col3(normals, c);
            panels.iter().enumerate().for_each(|(p, vertices)| {
                let q = self.kernel.panel_velocity(&zc, vertices, 1.);
                match projection {
                    AicProjection::Normal => aic[(c, p)] = dot(&nc, &q),
                    AicProjection::Components => {
                        (0..3).for_each(|i| aic[(c + i * k_out, p)] = q[i]);
                    }
                }
            });
        });
        aic
    }
}
