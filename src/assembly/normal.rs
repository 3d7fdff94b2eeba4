use faer::Mat;
use log::debug;

use crate::{
    assembly::Assembler,
    error::Result,
    kernels::ElementaryKernel,
    surface::Surface,
    util::col3,
};

impl<K: ElementaryKernel> Assembler<K> {
    /// Derivative `[K][3 Kzeta]` of `u_c . n_c` with respect to the vertices of
    /// `surface`, where `u_c` is the total (input + induced) velocity at each
    /// collocation point, held fixed, and `n_c` is the panel normal as a
    /// function of its own four vertices.
    ///
    /// Fails with `MissingAttribute` unless both `u_ind_coll` and
    /// `u_input_coll` are set on the surface.
    pub fn normal_velocity_jacobian(&self, surface: &Surface) -> Result<Mat<f64>> {
        let u_total = surface.total_velocity_coll()?;
        let map = surface.maps();
        let mut der = Mat::<f64>::zeros(map.k, 3 * map.kzeta);

        (0..map.k).for_each(|p| {
            let vertices = surface.panel_vertex_coords(p);
            let u = col3(u_total.as_ref(), p);
            let d_local = self.kernel.eval_normal_derivative(&vertices, &u);
            map.panel_vertices(p)
                .iter()
                .zip(d_local.iter())
                .for_each(|(&v, d)| {
                    der[(p, map.dof(v, 0))] = d[0]; // w.r.t. x
                    der[(p, map.dof(v, 1))] = d[1]; // w.r.t. y
                    der[(p, map.dof(v, 2))] = d[2]; // w.r.t. z
                });
        });
        Ok(der)
    }

    /// `normal_velocity_jacobian` for each surface in turn
    pub fn normal_velocity_jacobians(&self, surfaces: &[Surface]) -> Result<Vec<Mat<f64>>> {
        debug!("assembling normal velocity jacobian for {} surfaces", surfaces.len());
        self.map_outputs(surfaces.len(), |i| self.normal_velocity_jacobian(&surfaces[i]))
            .into_iter()
            .collect()
    }
}
