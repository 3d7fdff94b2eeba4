use itertools::Itertools;
use vtkio::model::*;

use crate::surface::Surface;

/// Surface as an unstructured grid of quad cells, one per panel, with
/// circulation, normal and (when set) induced velocity as cell data.
pub fn surface_as_vtk(surface: &Surface) -> Vtk {
    let map = surface.maps();
    let k = map.k;

    let mut cell_data = vec![
        Attribute::DataArray(DataArrayBase {
            name: "Gamma".to_string(),
            elem: ElementType::Scalars {
                num_comp: 1,
                lookup_table: None,
            },
            data: IOBuffer::F64(surface.gamma_flat().iter().copied().collect_vec()),
        }),
        Attribute::DataArray(DataArrayBase {
            name: "Normal".to_string(),
            elem: ElementType::Vectors,
            data: IOBuffer::F64(
                surface
                    .normals()
                    .col_iter()
                    .flat_map(|c| [c[0], c[1], c[2]])
                    .collect_vec(),
            ),
        }),
    ];
    if let Some(u) = surface.u_ind_coll() {
        cell_data.push(Attribute::DataArray(DataArrayBase {
            name: "InducedVelocity".to_string(),
            elem: ElementType::Vectors,
            data: IOBuffer::F64(u.col_iter().flat_map(|c| [c[0], c[1], c[2]]).collect_vec()),
        }));
    }

    Vtk {
        version: Version { major: 4, minor: 2 },
        title: String::new(),
        byte_order: ByteOrder::LittleEndian,
        file_path: None,
        data: DataSet::inline(UnstructuredGridPiece {
            points: IOBuffer::F64(
                surface
                    .zeta()
                    .col_iter()
                    .flat_map(|c| [c[0], c[1], c[2]])
                    .collect_vec(),
            ),
            cells: Cells {
                cell_verts: VertexNumbers::XML {
                    connectivity: (0..k)
                        .flat_map(|p| map.panel_vertices(p).map(|v| v as u64))
                        .collect_vec(),
                    offsets: (1..k + 1).map(|i| 4 * i as u64).collect_vec(),
                },
                types: vec![CellType::Quad; k],
            },
            data: Attributes {
                cell: cell_data,
                ..Default::default()
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceKind;
    use faer::Mat;

    #[test]
    fn test_surface_grid() {
        let mut s =
            Surface::from_fn(SurfaceKind::Bound, 2, 3, |i, j| [i as f64, j as f64, 0.]).unwrap();
        let vtk = surface_as_vtk(&s);
        let DataSet::UnstructuredGrid { pieces, .. } = &vtk.data else {
            panic!("expected unstructured grid");
        };
        let Piece::Inline(piece) = &pieces[0] else {
            panic!("expected inline piece");
        };
        assert_eq!(piece.points.len(), 3 * 12);
        assert_eq!(piece.cells.types.len(), 6);
        assert_eq!(piece.data.cell.len(), 2);
        match &piece.cells.cell_verts {
            VertexNumbers::XML {
                connectivity,
                offsets,
            } => {
                assert_eq!(&connectivity[..4], &[0, 4, 5, 1]);
                assert_eq!(offsets.last(), Some(&24));
            }
            _ => panic!("expected XML vertex numbers"),
        }

        s.set_u_ind_coll(Mat::<f64>::zeros(3, 6).as_ref()).unwrap();
        let vtk = surface_as_vtk(&s);
        let DataSet::UnstructuredGrid { pieces, .. } = &vtk.data else {
            panic!("expected unstructured grid");
        };
        let Piece::Inline(piece) = &pieces[0] else {
            panic!("expected inline piece");
        };
        assert_eq!(piece.data.cell.len(), 3);
    }
}
