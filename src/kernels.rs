//! Elementary Biot-Savart kernels for straight vortex segments and
//! quadrilateral vortex rings.
//!
//! All derivative blocks are `[[f64; 3]; 3]` with entry `[i][j]` equal to
//! `d q_i / d x_j`, where `q` is the induced velocity and `x` the position
//! being differentiated (evaluation point or a vertex).

use std::f64::consts::PI;

use crate::util::{
    cross, dot, mat3_add_assign, mat3_neg, norm, outer, scale, sub, vec_tilde, Mat3, Vec3, ZERO3,
};

const INV_FOUR_PI: f64 = 0.25 / PI;

/// Derivatives of the velocity induced by one vortex ring at a point
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDerivative {
    /// With respect to the evaluation point
    pub d_point: Mat3,
    /// With respect to each ring vertex, in winding order
    pub d_vertices: [Mat3; 4],
}

/// Contract of the lowest-level evaluators consumed by the assemblers.
///
/// Vortex-ring vertices are given in winding order and the ring is made of
/// the segments `0->1`, `1->2`, `2->3`, `3->0`.
pub trait ElementaryKernel: Sync {
    /// Velocity induced at `point` by a ring of circulation `gamma`
    fn panel_velocity(&self, point: &Vec3, vertices: &[Vec3; 4], gamma: f64) -> Vec3;

    /// Derivatives of `panel_velocity` with respect to the point and vertices
    fn eval_panel(&self, point: &Vec3, vertices: &[Vec3; 4], gamma: f64) -> PanelDerivative;

    /// Derivatives of the velocity induced by segment `a -> b` with respect to `a` and `b`
    fn eval_segment(&self, point: &Vec3, a: &Vec3, b: &Vec3, gamma: f64) -> [Mat3; 2];

    /// Derivative of `velocity . n` with respect to the four vertices, where `n`
    /// is the unit normal `(r02 x r13) / |r02 x r13|` and `velocity` is frozen
    fn eval_normal_derivative(&self, vertices: &[Vec3; 4], velocity: &Vec3) -> [Vec3; 4];
}

/// Closed-form straight-segment Biot-Savart law,
/// `q = gamma / 4pi * (r1 x r2) / |r1 x r2|^2 * r0 . (r1/|r1| - r2/|r2|)`,
/// with `r1 = p - a`, `r2 = p - b`, `r0 = b - a`.
///
/// Segments for which `|r1 x r2|^2` falls below `core_radius^2` induce no
/// velocity and have zero derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiotSavart {
    pub core_radius: f64,
}

/// Scalar pieces of the segment law shared by velocity and derivatives
struct SegmentTerms {
    r1: Vec3,
    r2: Vec3,
    v: Vec3,  // r1 x r2
    d: f64,   // |r1 x r2|^2
    r1n: f64, // |r1|
    r2n: f64, // |r2|
    c: f64,   // cosine of the angle between r1 and r2
    s: f64,   // r0 . (r1/|r1| - r2/|r2|)
}

impl BiotSavart {
    pub fn new(core_radius: f64) -> Self {
        Self { core_radius }
    }

    fn terms(&self, point: &Vec3, a: &Vec3, b: &Vec3) -> Option<SegmentTerms> {
        let r1 = sub(point, a);
        let r2 = sub(point, b);
        let v = cross(&r1, &r2);
        let d = dot(&v, &v);
        if d < self.core_radius * self.core_radius || d == 0. {
            return None;
        }
        let r1n = norm(&r1);
        let r2n = norm(&r2);
        let c = dot(&r1, &r2) / (r1n * r2n);
        Some(SegmentTerms {
            r1,
            r2,
            v,
            d,
            r1n,
            r2n,
            c,
            s: (r1n + r2n) * (1. - c),
        })
    }

    pub fn segment_velocity(&self, point: &Vec3, a: &Vec3, b: &Vec3, gamma: f64) -> Vec3 {
        match self.terms(point, a, b) {
            Some(t) => scale(INV_FOUR_PI * gamma * t.s / t.d, &t.v),
            None => [0.; 3],
        }
    }

    /// Derivatives of the segment velocity with respect to `r1` and `r2`.
    ///
    /// `dq/dp = dq/dr1 + dq/dr2`, `dq/da = -dq/dr1`, `dq/db = -dq/dr2`.
    fn segment_derivative(&self, point: &Vec3, a: &Vec3, b: &Vec3, gamma: f64) -> (Mat3, Mat3) {
        let Some(t) = self.terms(point, a, b) else {
            return (ZERO3, ZERO3);
        };
        let k = INV_FOUR_PI * gamma;
        let u1 = scale(1. / t.r1n, &t.r1);
        let u2 = scale(1. / t.r2n, &t.r2);
        let sum = t.r1n + t.r2n;

        // Gradients of s and d
        let ds_dr1 = sub(&scale(1. - t.c, &u1), &scale(sum / t.r1n, &sub(&u2, &scale(t.c, &u1))));
        let ds_dr2 = sub(&scale(1. - t.c, &u2), &scale(sum / t.r2n, &sub(&u1, &scale(t.c, &u2))));
        let dd_dr1 = scale(2., &cross(&t.r2, &t.v));
        let dd_dr2 = scale(2., &cross(&t.v, &t.r1));

        // q = k s v / d, dv/dr1 = -[r2]x, dv/dr2 = [r1]x
        let mut q1 = ZERO3;
        mat3_add_assign(&mut q1, -k * t.s / t.d, &vec_tilde(&t.r2));
        mat3_add_assign(&mut q1, k / t.d, &outer(&t.v, &ds_dr1));
        mat3_add_assign(&mut q1, -k * t.s / (t.d * t.d), &outer(&t.v, &dd_dr1));

        let mut q2 = ZERO3;
        mat3_add_assign(&mut q2, k * t.s / t.d, &vec_tilde(&t.r1));
        mat3_add_assign(&mut q2, k / t.d, &outer(&t.v, &ds_dr2));
        mat3_add_assign(&mut q2, -k * t.s / (t.d * t.d), &outer(&t.v, &dd_dr2));

        (q1, q2)
    }
}

impl Default for BiotSavart {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl ElementaryKernel for BiotSavart {
    fn panel_velocity(&self, point: &Vec3, vertices: &[Vec3; 4], gamma: f64) -> Vec3 {
        (0..4).fold([0.; 3], |q, i| {
            let qs = self.segment_velocity(point, &vertices[i], &vertices[(i + 1) % 4], gamma);
            [q[0] + qs[0], q[1] + qs[1], q[2] + qs[2]]
        })
    }

    fn eval_panel(&self, point: &Vec3, vertices: &[Vec3; 4], gamma: f64) -> PanelDerivative {
        let mut der = PanelDerivative {
            d_point: ZERO3,
            d_vertices: [ZERO3; 4],
        };
        (0..4).for_each(|i| {
            let j = (i + 1) % 4;
            let (q1, q2) = self.segment_derivative(point, &vertices[i], &vertices[j], gamma);
            mat3_add_assign(&mut der.d_point, 1., &q1);
            mat3_add_assign(&mut der.d_point, 1., &q2);
            mat3_add_assign(&mut der.d_vertices[i], -1., &q1);
            mat3_add_assign(&mut der.d_vertices[j], -1., &q2);
        });
        der
    }

    fn eval_segment(&self, point: &Vec3, a: &Vec3, b: &Vec3, gamma: f64) -> [Mat3; 2] {
        let (q1, q2) = self.segment_derivative(point, a, b, gamma);
        [mat3_neg(&q1), mat3_neg(&q2)]
    }

    fn eval_normal_derivative(&self, vertices: &[Vec3; 4], velocity: &Vec3) -> [Vec3; 4] {
        let r02 = sub(&vertices[2], &vertices[0]);
        let r13 = sub(&vertices[3], &vertices[1]);
        let w = cross(&r02, &r13);
        let w_norm = norm(&w);
        if w_norm < f64::EPSILON {
            return [[0.; 3]; 4];
        }

        // d(u.n)/dw = (u - (u.n) n) / |w|
        let nv = scale(1. / w_norm, &w);
        let g = scale(1. / w_norm, &sub(velocity, &scale(dot(velocity, &nv), &nv)));

        // dw = dr02 x r13 + r02 x dr13
        let d2 = cross(&r13, &g);
        let d3 = cross(&g, &r02);
        [scale(-1., &d2), scale(-1., &d3), d2, d3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const H: f64 = 1e-6;

    fn ring() -> [Vec3; 4] {
        [
            [0.0, 0.0, 0.0],
            [1.1, 0.1, 0.05],
            [1.0, 0.9, -0.1],
            [-0.1, 1.0, 0.02],
        ]
    }

    fn unit_normal(z: &[Vec3; 4]) -> Vec3 {
        let w = cross(&sub(&z[2], &z[0]), &sub(&z[3], &z[1]));
        scale(1. / norm(&w), &w)
    }

    /// Central difference of `f` with respect to component `j` of `x`
    fn fd<F: Fn(&Vec3) -> Vec3>(f: F, x: &Vec3, j: usize) -> Vec3 {
        let mut xp = *x;
        let mut xm = *x;
        xp[j] += H;
        xm[j] -= H;
        scale(0.5 / H, &sub(&f(&xp), &f(&xm)))
    }

    #[test]
    fn test_segment_velocity_right_hand_rule() {
        let bs = BiotSavart::default();
        let q = bs.segment_velocity(&[0.5, 0.5, 0.], &[0., 0., 0.], &[1., 0., 0.], 1.);
        assert_relative_eq!(q[0], 0.);
        assert_relative_eq!(q[1], 0.);
        assert_relative_eq!(q[2], 2_f64.sqrt() / (2. * PI), epsilon = 1e-14);
    }

    #[test]
    fn test_unit_ring_centre_velocity() {
        let bs = BiotSavart::default();
        let square = [[0., 0., 0.], [1., 0., 0.], [1., 1., 0.], [0., 1., 0.]];
        let q = bs.panel_velocity(&[0.5, 0.5, 0.], &square, 1.);
        assert_relative_eq!(q[2], 2. * 2_f64.sqrt() / PI, epsilon = 1e-14);
        assert_relative_eq!(norm(&[q[0], q[1], 0.]), 0., epsilon = 1e-14);
    }

    #[test]
    fn test_core_radius_cutoff() {
        let bs = BiotSavart::new(1e-2);
        // Point on the segment axis
        let p = [2., 0., 0.];
        let (a, b) = ([0., 0., 0.], [1., 0., 0.]);
        assert_eq!(bs.segment_velocity(&p, &a, &b, 1.), [0.; 3]);
        assert_eq!(bs.eval_segment(&p, &a, &b, 1.), [ZERO3; 2]);
    }

    #[test]
    fn test_eval_panel_point_derivative() {
        let bs = BiotSavart::default();
        let z = ring();
        let p = [0.3, 0.4, 0.25];
        let gamma = 1.7;
        let der = bs.eval_panel(&p, &z, gamma);
        (0..3).for_each(|j| {
            let dq = fd(|x| bs.panel_velocity(x, &z, gamma), &p, j);
            (0..3).for_each(|i| assert_relative_eq!(der.d_point[i][j], dq[i], epsilon = 1e-7));
        });
    }

    #[test]
    fn test_eval_panel_vertex_derivatives() {
        let bs = BiotSavart::default();
        let z = ring();
        let p = [0.3, 0.4, 0.25];
        let gamma = -0.8;
        let der = bs.eval_panel(&p, &z, gamma);
        (0..4).for_each(|v| {
            (0..3).for_each(|j| {
                let dq = fd(
                    |x| {
                        let mut zp = z;
                        zp[v] = *x;
                        bs.panel_velocity(&p, &zp, gamma)
                    },
                    &z[v],
                    j,
                );
                (0..3).for_each(|i| {
                    assert_relative_eq!(der.d_vertices[v][i][j], dq[i], epsilon = 1e-7)
                });
            });
        });
    }

    #[test]
    fn test_eval_segment_derivatives() {
        let bs = BiotSavart::default();
        let p = [0.2, -0.7, 0.4];
        let a = [1.0, 0.1, 0.0];
        let b = [0.9, 1.2, 0.3];
        let gamma = 2.5;
        let [da, db] = bs.eval_segment(&p, &a, &b, gamma);
        (0..3).for_each(|j| {
            let dqa = fd(|x| bs.segment_velocity(&p, x, &b, gamma), &a, j);
            let dqb = fd(|x| bs.segment_velocity(&p, &a, x, gamma), &b, j);
            (0..3).for_each(|i| {
                assert_relative_eq!(da[i][j], dqa[i], epsilon = 1e-7);
                assert_relative_eq!(db[i][j], dqb[i], epsilon = 1e-7);
            });
        });
    }

    #[test]
    fn test_translation_invariance() {
        // Moving point and all vertices together leaves the velocity unchanged
        let bs = BiotSavart::default();
        let der = bs.eval_panel(&[0.3, 0.4, 0.25], &ring(), 1.);
        let mut total = der.d_point;
        der.d_vertices
            .iter()
            .for_each(|d| mat3_add_assign(&mut total, 1., d));
        total
            .iter()
            .flatten()
            .for_each(|&v| assert_relative_eq!(v, 0., epsilon = 1e-12));
    }

    #[test]
    fn test_eval_normal_derivative() {
        let bs = BiotSavart::default();
        let z = ring();
        let u = [10., -1., 2.];
        let der = bs.eval_normal_derivative(&z, &u);
        (0..4).for_each(|v| {
            (0..3).for_each(|j| {
                let mut zp = z;
                let mut zm = z;
                zp[v][j] += H;
                zm[v][j] -= H;
                let expected = (dot(&u, &unit_normal(&zp)) - dot(&u, &unit_normal(&zm))) / (2. * H);
                assert_relative_eq!(der[v][j], expected, epsilon = 1e-7);
            });
        });
    }

    #[test]
    fn test_eval_normal_derivative_degenerate_panel() {
        let bs = BiotSavart::default();
        let z = [[0.; 3]; 4];
        assert_eq!(bs.eval_normal_derivative(&z, &[1., 0., 0.]), [[0.; 3]; 4]);
    }
}
