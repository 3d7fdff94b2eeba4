//! Aerodynamic influence coefficients and geometric sensitivities of a
//! multi-surface unsteady vortex-lattice model, for use in linearised
//! aeroelastic analysis.

pub mod assembly;
pub mod error;
pub mod filter;
pub mod kernels;
pub mod maps;
pub mod settings;
pub mod surface;
pub mod util;
pub mod vtk;

pub use assembly::{
    AicProjection, AicTarget, Assembler, BlockMatrix, BoundaryJacobian, InfluenceMatrices,
};
pub use error::{AssemblyError, Result};
pub use kernels::{BiotSavart, ElementaryKernel, PanelDerivative};
pub use maps::PanelVertexMap;
pub use settings::AssemblySettings;
pub use surface::{Configuration, Surface, SurfaceKind};
