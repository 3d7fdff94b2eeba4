use faer::MatRef;

pub type Vec3 = [f64; 3];

/// 3x3 block with entry `[i][j]` holding `d q_i / d x_j`
pub type Mat3 = [[f64; 3]; 3];

pub const ZERO3: Mat3 = [[0.; 3]; 3];

#[inline]
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(s: f64, a: &Vec3) -> Vec3 {
    [s * a[0], s * a[1], s * a[2]]
}

#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn norm(a: &Vec3) -> f64 {
    dot(a, a).sqrt()
}

// Returns the cross product of two vectors
#[inline]
pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Skew-symmetric matrix such that `vec_tilde(v) * x == cross(v, x)`
pub fn vec_tilde(v: &Vec3) -> Mat3 {
    // [0., -v[2], v[1]]
    // [v[2], 0., -v[0]]
    // [-v[1], v[0], 0.]
    [[0., -v[2], v[1]], [v[2], 0., -v[0]], [-v[1], v[0], 0.]]
}

/// Outer product `a b^T`
#[inline]
pub fn outer(a: &Vec3, b: &Vec3) -> Mat3 {
    [
        [a[0] * b[0], a[0] * b[1], a[0] * b[2]],
        [a[1] * b[0], a[1] * b[1], a[1] * b[2]],
        [a[2] * b[0], a[2] * b[1], a[2] * b[2]],
    ]
}

#[inline]
pub fn mat3_add_assign(m: &mut Mat3, s: f64, other: &Mat3) {
    m.iter_mut()
        .flatten()
        .zip(other.iter().flatten())
        .for_each(|(a, &b)| *a += s * b);
}

#[inline]
pub fn mat3_neg(m: &Mat3) -> Mat3 {
    m.map(|row| row.map(|v| -v))
}

/// Row vector `n^T D`: projects the velocity index of a derivative block on `n`
#[inline]
pub fn project(n: &Vec3, d: &Mat3) -> Vec3 {
    [
        n[0] * d[0][0] + n[1] * d[1][0] + n[2] * d[2][0],
        n[0] * d[0][1] + n[1] * d[1][1] + n[2] * d[2][1],
        n[0] * d[0][2] + n[1] * d[1][2] + n[2] * d[2][2],
    ]
}

/// Copy column `j` of a `[3][n]` matrix into a 3-vector
#[inline]
pub fn col3(m: MatRef<f64>, j: usize) -> Vec3 {
    [m[(0, j)], m[(1, j)], m[(2, j)]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vec_tilde_matches_cross() {
        let v = [1., -2., 0.5];
        let x = [0.3, 0.7, -1.1];
        let t = vec_tilde(&v);
        let tx = [dot(&t[0], &x), dot(&t[1], &x), dot(&t[2], &x)];
        let c = cross(&v, &x);
        (0..3).for_each(|i| assert_relative_eq!(tx[i], c[i], epsilon = 1e-14));
    }

    #[test]
    fn test_project() {
        let d = [[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]];
        assert_eq!(project(&[0., 1., 0.], &d), [4., 5., 6.]);
        assert_eq!(project(&[1., 0., 1.], &d), [8., 10., 12.]);
    }
}
