//! Derivative of the boundary condition `n . (AIC gamma)` with respect to the
//! vertex coordinates of bound surfaces, with frozen panel normals.
//!
//! The derivative is split into the movement of the output collocation
//! points (`d_coll`, columns on the output surface) and the movement of the
//! input vortex-ring vertices (`d_vert`, columns on the input bound surface).
//!
//! Wake surfaces contribute to `d_vert` through their trailing-edge segment
//! only. Wake circulation is a function of the trailing-edge circulation of
//! the parent bound surface, and the wake vertices downstream of the trailing
//! edge are treated as carrying zero net circulation change. This is a
//! modelling approximation: it is exact for wakes with uniform circulation
//! away from the wake tips.

use faer::{Col, Mat, MatMut};
use itertools::Itertools;
use log::{debug, trace};

use crate::{
    assembly::{block_product, Assembler, BlockMatrix},
    error::{AssemblyError, Result},
    kernels::ElementaryKernel,
    surface::{check_pairing, Surface},
    util::{col3, project},
};

/// Jacobian of the bound boundary condition for a full configuration.
///
/// `d_coll[i]` is `[K_i][3 Kzeta_i]`, `d_vert[(i, j)]` is `[K_i][3 Kzeta_j]`
/// with `j` a bound surface (its wake contributions included).
#[derive(Debug, Clone)]
pub struct BoundaryJacobian {
    pub d_coll: Vec<Mat<f64>>,
    pub d_vert: BlockMatrix,
}

impl BoundaryJacobian {
    /// First-order change of the normal velocity at every bound collocation
    /// point for bound vertex perturbations `dzeta` (one per bound surface,
    /// laid out as `Surface::zeta_flat`).
    pub fn directional_derivative(&self, dzeta: &[Col<f64>]) -> Result<Vec<Col<f64>>> {
        // Checks one perturbation per bound surface, sized 3 Kzeta
        let d_vert = block_product(&self.d_vert, dzeta)?;
        Ok(d_vert
            .into_iter()
            .zip(self.d_coll.iter().zip(dzeta.iter()))
            .map(|(dv, (dc, dz))| dv + dc * dz)
            .collect())
    }
}

/// Trailing edge of the bound surface that sheds a wake
#[derive(Debug, Clone, Copy)]
struct TrailingEdge {
    m_bound: usize, // Chordwise panels of the bound surface
    n: usize,       // Spanwise panels
}

impl TrailingEdge {
    /// Vertex index of trailing-edge vertex `n_vert` on the bound surface
    fn vertex(&self, n_vert: usize) -> usize {
        self.m_bound * (self.n + 1) + n_vert
    }

    fn kzeta(&self) -> usize {
        (self.m_bound + 1) * (self.n + 1)
    }
}

impl<K: ElementaryKernel> Assembler<K> {
    /// Accumulate into `der_coll` and `der_vert` the derivative of the
    /// normal velocity induced by `surf_in` at the collocation points of
    /// `surf_out`.
    ///
    /// `der_coll` must be `[K_out][3 Kzeta_out]`. `der_vert` must be
    /// `[K_out][3 Kzeta_in]` when `surf_in_is_bound`, otherwise
    /// `[K_out][3 Kzeta_bound]` where the bound surface shedding `surf_in` is
    /// inferred from the number of columns. Shapes are checked before any
    /// entry is written.
    pub fn pairwise_jacobian(
        &self,
        surf_in: &Surface,
        surf_out: &Surface,
        mut der_coll: MatMut<f64>,
        mut der_vert: MatMut<f64>,
        surf_in_is_bound: bool,
    ) -> Result<()> {
        let map_out = surf_out.maps();
        let map_in = surf_in.maps();
        let (k_out, kzeta_out) = (map_out.k, map_out.kzeta);

        if (der_coll.nrows(), der_coll.ncols()) != (k_out, 3 * kzeta_out) {
            return Err(AssemblyError::shape(
                "collocation derivative",
                (k_out, 3 * kzeta_out),
                (der_coll.nrows(), der_coll.ncols()),
            ));
        }
        let trailing_edge = if surf_in_is_bound {
            if (der_vert.nrows(), der_vert.ncols()) != (k_out, 3 * map_in.kzeta) {
                return Err(AssemblyError::shape(
                    "vertex derivative",
                    (k_out, 3 * map_in.kzeta),
                    (der_vert.nrows(), der_vert.ncols()),
                ));
            }
            None
        } else {
            Some(infer_trailing_edge(surf_in, k_out, der_vert.nrows(), der_vert.ncols())?)
        };

        trace!(
            "pairwise jacobian: {} panels in ({}), {} collocation points",
            map_in.k,
            if surf_in_is_bound { "bound" } else { "wake" },
            k_out
        );

        let zetac = surf_out.ensure_collocations();
        let normals = surf_out.normals();
        let weights = surf_out.collocation_weights();
        let gamma = surf_in.gamma();
        let panels = (0..map_in.k)
            .map(|p| {
                let (m, n) = map_in.panel_2d(p);
                (m, n, gamma[(m, n)], surf_in.panel_vertex_coords(p))
            })
            .collect_vec();

        for c in 0..k_out {
            let zc = col3(zetac, c);
            let nc = col3(normals, c);
            let coll_vertices = map_out.panel_vertices(c);

            for (p, &(m_in, n_in, gamma_p, ref vertices)) in panels.iter().enumerate() {
                let der = self.kernel.eval_panel(&zc, vertices, gamma_p);

                // Collocation point moves with its panel vertices through the
                // collocation weights
                let d_coll = project(&nc, &der.d_point);
                coll_vertices
                    .iter()
                    .zip(weights.iter())
                    .for_each(|(&v, &w)| {
                        (0..3).for_each(|comp| der_coll[(c, map_out.dof(v, comp))] += w * d_coll[comp]);
                    });

                match trailing_edge {
                    None => {
                        map_in
                            .panel_vertices(p)
                            .iter()
                            .zip(der.d_vertices.iter())
                            .for_each(|(&v, d)| {
                                let dv = project(&nc, d);
                                (0..3).for_each(|comp| der_vert[(c, map_in.dof(v, comp))] += dv[comp]);
                            });
                    }
                    Some(te) if m_in == 0 => {
                        // Leading segment of the first wake row, 3 -> 0, lies
                        // on the bound trailing edge
                        let [d_a, d_b] =
                            self.kernel
                                .eval_segment(&zc, &vertices[3], &vertices[0], gamma_p);
                        let kzeta_bound = te.kzeta();
                        let (v_a, v_b) = (te.vertex(n_in + 1), te.vertex(n_in));
                        let (dv_a, dv_b) = (project(&nc, &d_a), project(&nc, &d_b));
                        (0..3).for_each(|comp| {
                            der_vert[(c, v_a + comp * kzeta_bound)] += dv_a[comp];
                            der_vert[(c, v_b + comp * kzeta_bound)] += dv_b[comp];
                        });
                    }
                    // Net circulation of wake segments downstream of the
                    // trailing edge is null
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Assemble the boundary-condition Jacobian of every bound surface with
    /// respect to the vertices of every bound surface.
    pub fn assemble_all(&self, bound: &[Surface], wake: &[Surface]) -> Result<BoundaryJacobian> {
        check_pairing(bound, wake)?;
        debug!("assembling boundary jacobian for {} surfaces", bound.len());

        let rows = self
            .map_outputs(bound.len(), |i_out| -> Result<(Mat<f64>, Vec<Mat<f64>>)> {
                let surf_out = &bound[i_out];

                // Every input surface moves the collocation points of surf_out
                let mut d_coll = Mat::<f64>::zeros(surf_out.k(), 3 * surf_out.kzeta());
                let d_vert_row = bound
                    .iter()
                    .zip(wake.iter())
                    .map(|(surf_bound, surf_wake)| -> Result<Mat<f64>> {
                        let mut d_vert = Mat::<f64>::zeros(surf_out.k(), 3 * surf_bound.kzeta());
                        self.pairwise_jacobian(
                            surf_bound,
                            surf_out,
                            d_coll.as_mut(),
                            d_vert.as_mut(),
                            true,
                        )?;
                        self.pairwise_jacobian(
                            surf_wake,
                            surf_out,
                            d_coll.as_mut(),
                            d_vert.as_mut(),
                            false,
                        )?;
                        Ok(d_vert)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((d_coll, d_vert_row))
            })
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let (d_coll, d_vert): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        Ok(BoundaryJacobian {
            d_coll,
            d_vert: BlockMatrix::from_rows(d_vert),
        })
    }
}

/// Recover the bound surface shedding `wake` from the width of its vertex
/// derivative accumulator.
fn infer_trailing_edge(
    wake: &Surface,
    k_out: usize,
    nrows: usize,
    ncols: usize,
) -> Result<TrailingEdge> {
    let (_, n) = wake.dims();
    let kzeta_bound = ncols / 3;
    let valid = nrows == k_out
        && ncols % 3 == 0
        && kzeta_bound % (n + 1) == 0
        && kzeta_bound / (n + 1) >= 2;
    if !valid {
        return Err(AssemblyError::shape(
            "wake vertex derivative",
            format!("({k_out}, 3 * (M_bound + 1) * {})", n + 1),
            (nrows, ncols),
        ));
    }
    Ok(TrailingEdge {
        m_bound: kzeta_bound / (n + 1) - 1,
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceKind;

    fn flat(kind: SurfaceKind, m: usize, n: usize, x0: f64) -> Surface {
        Surface::from_fn(kind, m, n, |i, j| [x0 + 0.5 * i as f64, j as f64, 0.]).unwrap()
    }

    #[test]
    fn test_infer_trailing_edge() {
        let wake = flat(SurfaceKind::Wake, 5, 3, 1.);
        let te = infer_trailing_edge(&wake, 6, 6, 3 * 3 * 4).unwrap();
        assert_eq!(te.m_bound, 2);
        assert_eq!(te.vertex(0), 8);
        assert_eq!(te.vertex(3), 11);
        assert!(infer_trailing_edge(&wake, 6, 6, 3 * 4).is_err());
        assert!(infer_trailing_edge(&wake, 6, 6, 3 * 10).is_err());
        assert!(infer_trailing_edge(&wake, 6, 5, 3 * 12).is_err());
    }

    #[test]
    fn test_wrong_accumulator_shapes_are_untouched() {
        let bound = flat(SurfaceKind::Bound, 2, 2, 0.);
        let assembler = crate::assembly::Assembler::default();
        let mut d_coll = Mat::<f64>::zeros(4, 3 * 9);
        let mut d_vert = Mat::<f64>::zeros(4, 3 * 8);
        let err = assembler
            .pairwise_jacobian(&bound, &bound, d_coll.as_mut(), d_vert.as_mut(), true)
            .unwrap_err();
        assert!(matches!(err, AssemblyError::ShapeMismatch { .. }));
        assert!(d_coll.col_iter().all(|c| c.iter().all(|&v| v == 0.)));

        let mut d_coll = Mat::<f64>::zeros(4, 3 * 8);
        let mut d_vert = Mat::<f64>::zeros(4, 3 * 9);
        assert!(assembler
            .pairwise_jacobian(&bound, &bound, d_coll.as_mut(), d_vert.as_mut(), true)
            .is_err());
    }
}
