use itertools::Itertools;

/// Bidirectional map between 2-D (chordwise, spanwise) panel/vertex indices
/// and the flattened 1-D indices used by every assembled matrix.
///
/// Panels `(m, n)` of an `M x N` grid and vertices `(m, n)` of the
/// `(M+1) x (N+1)` grid are both flattened in row-major order. The vertices
/// of panel `(m, n)` are listed in the winding order used by the elementary
/// kernels: `(m, n)`, `(m+1, n)`, `(m+1, n+1)`, `(m, n+1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelVertexMap {
    pub m: usize,     // Chordwise panels
    pub n: usize,     // Spanwise panels
    pub k: usize,     // Number of panels
    pub kzeta: usize, // Number of vertices
    panel_2d: Vec<(usize, usize)>,
    vertex_2d: Vec<(usize, usize)>,
    panel_vertices: Vec<[usize; 4]>,
}

impl PanelVertexMap {
    pub fn new(m: usize, n: usize) -> Self {
        let panel_2d = (0..m).cartesian_product(0..n).collect_vec();
        let vertex_2d = (0..m + 1).cartesian_product(0..n + 1).collect_vec();
        let panel_vertices = panel_2d
            .iter()
            .map(|&(im, jn)| {
                let v = |a: usize, b: usize| a * (n + 1) + b;
                [v(im, jn), v(im + 1, jn), v(im + 1, jn + 1), v(im, jn + 1)]
            })
            .collect_vec();
        Self {
            m,
            n,
            k: m * n,
            kzeta: (m + 1) * (n + 1),
            panel_2d,
            vertex_2d,
            panel_vertices,
        }
    }

    /// Panics outside the `M x N` panel grid
    #[inline]
    pub fn panel_1d(&self, m: usize, n: usize) -> usize {
        assert!(
            m < self.m && n < self.n,
            "panel ({m}, {n}) outside {} x {} grid",
            self.m,
            self.n
        );
        m * self.n + n
    }

    #[inline]
    pub fn panel_2d(&self, k: usize) -> (usize, usize) {
        self.panel_2d[k]
    }

    /// Panics outside the `(M+1) x (N+1)` vertex grid
    #[inline]
    pub fn vertex_1d(&self, m: usize, n: usize) -> usize {
        assert!(
            m <= self.m && n <= self.n,
            "vertex ({m}, {n}) outside {} x {} grid",
            self.m + 1,
            self.n + 1
        );
        m * (self.n + 1) + n
    }

    #[inline]
    pub fn vertex_2d(&self, kzeta: usize) -> (usize, usize) {
        self.vertex_2d[kzeta]
    }

    /// Global vertex indices of panel `k` in winding order
    #[inline]
    pub fn panel_vertices(&self, k: usize) -> &[usize; 4] {
        &self.panel_vertices[k]
    }

    /// Column of vertex `kzeta`, component `comp` in a `[*][3 Kzeta]` Jacobian
    #[inline]
    pub fn dof(&self, kzeta: usize, comp: usize) -> usize {
        kzeta + comp * self.kzeta
    }
}
