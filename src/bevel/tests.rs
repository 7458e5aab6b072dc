use super::*;
use crate::tests::{cube, face_sizes, grid, has_vert_at, square, SQUARE};

fn shape(mesh: &Mesh) -> [usize; 3] {
    [mesh.vert_count(), mesh.edge_count(), mesh.face_count()]
}

/// Corner positions of every face.
fn face_corners(mesh: &Mesh) -> Vec<Vec<Vec3>> {
    mesh.iter_faces()
        .map(|f| f.iter_loops().map(|l| l.vert().co()).collect())
        .collect()
}

/// No two vertices in one spot, no face with a straight or folded corner.
fn assert_clean(mesh: &Mesh) {
    let cos: Vec<_> = mesh.iter_verts().map(|v| v.co()).collect();
    for (i, a) in cos.iter().enumerate() {
        assert!(!cos[i + 1..].iter().any(|b| a.abs_diff_eq(*b, 1e-5)), "{a} twice");
    }

    for cs in face_corners(mesh) {
        let n = cs.len();
        for i in 0..n {
            let (a, b, c) = (cs[(i + n - 1) % n], cs[i], cs[(i + 1) % n]);
            let sine = (b - a)
                .normalize_or_zero()
                .cross((c - b).normalize_or_zero())
                .length();
            assert!(sine > 1e-3, "straight corner at {b} in {cs:?}");
        }
    }
}

#[test]
fn quad_edges() {
    Mesh::new(|mut mesh| {
        square(&mut mesh);

        let report = bevel(&mut mesh, &BevelOptions::new(0.1)).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(report.edges, 4);
        assert_eq!(report.verts, 4);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        // inset quad, a strip per edge, a quad per corner
        assert_eq!(shape(&mesh), [16, 24, 9]);
        assert_eq!(mesh.euler_characteristic(), 1);
        assert_eq!(face_sizes(&mesh), [4; 9]);

        for co in [[0.1, 0.1], [0.9, 0.1], [0.9, 0.9], [0.1, 0.9]] {
            assert!(has_vert_at(&mesh, Vec3::new(co[0], co[1], 0.0)), "{co:?}");
        }
        assert!(mesh.iter_edges().all(|e| matches!(e.item.radial_len(&mesh), Ok(1 | 2))));
        assert!(mesh.iter_verts().all(|v| !v.item.is_nonmanifold(&mesh)));

        // boundary corners stay put
        assert!(has_vert_at(&mesh, Vec3::ZERO));
        assert!(has_vert_at(&mesh, Vec3::new(0.1, 0.0, 0.0)));

        let faces = face_corners(&mesh);
        let inside = |co: &Vec3| (0.09..=0.91).contains(&co.x) && (0.09..=0.91).contains(&co.y);

        // the inset is the square shrunk about its center
        let inner: Vec<_> = faces.iter().filter(|cs| cs.iter().all(inside)).collect();
        assert_eq!(inner.len(), 1);
        for co in inner[0] {
            let rel = (*co - Vec3::new(0.5, 0.5, 0.0)).abs();
            assert!(rel.abs_diff_eq(Vec3::new(0.4, 0.4, 0.0), 1e-5), "{co}");
        }

        // one quad per original corner, 0.1 on a side
        for corner in SQUARE {
            let around: Vec<_> = faces.iter().filter(|cs| cs.contains(&corner)).collect();
            assert_eq!(around.len(), 1, "{corner}");
            assert!(around[0].iter().all(|co| co.distance(corner) < 0.15));
        }

        // and the four strips in between
        let strips = faces
            .iter()
            .filter(|cs| !cs.iter().all(inside) && !cs.iter().any(|co| SQUARE.contains(co)))
            .count();
        assert_eq!(strips, 4);
    })
}

#[test]
fn hexagon_edges() {
    Mesh::new(|mut mesh| {
        let corners: Vec<_> = (0..6)
            .map(|i| {
                let a = (60.0 * i as f32).to_radians();
                Vec3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        mesh.add_polygons(&corners, &[[0, 1, 2, 3, 4, 5]]).unwrap();

        let report = bevel(&mut mesh, &BevelOptions::new(0.1)).unwrap();
        mesh.validate().unwrap();

        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(shape(&mesh), [24, 36, 13]);
        let mut sizes = vec![4; 12];
        sizes.push(6);
        assert_eq!(face_sizes(&mesh), sizes);

        // corners of 120 degrees: the offset along each edge is 0.1 / sin 120,
        // and the inset hexagon keeps 0.1 away from every side
        let along = 0.1 / 60f32.to_radians().sin();
        for i in 0..6 {
            let (v, w) = (corners[i], corners[(i + 1) % 6]);
            assert!(has_vert_at(&mesh, v));
            assert!(has_vert_at(&mesh, v.lerp(w, along)), "{i}");
            assert!(has_vert_at(&mesh, v * (1.0 - along)), "{i}");
        }
        assert_clean(&mesh);
    })
}

#[test]
fn grid_edges() {
    Mesh::new(|mut mesh| {
        grid(&mut mesh);

        let report = bevel(&mut mesh, &BevelOptions::new(0.1)).unwrap();
        mesh.validate().unwrap();

        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.edges, 12);
        assert_eq!(report.verts, 9);

        // a six by six lattice of quads
        assert_eq!(shape(&mesh), [36, 60, 25]);
        assert_eq!(face_sizes(&mesh), [4; 25]);
        assert_eq!(mesh.euler_characteristic(), 1);

        let stops = [0.0, 0.1, 0.9, 1.1, 1.9, 2.0];
        let on_stop = |x: f32| stops.iter().any(|s| (s - x).abs() < 1e-5);
        for v in mesh.iter_verts() {
            let co = v.co();
            assert!(on_stop(co.x) && on_stop(co.y), "{co}");
        }

        // the boundary midpoints and the middle are gone, the corners stay
        for co in [[1.0, 0.0], [0.0, 1.0], [2.0, 1.0], [1.0, 2.0], [1.0, 1.0]] {
            assert!(!has_vert_at(&mesh, Vec3::new(co[0], co[1], 0.0)), "{co:?}");
        }
        assert!(has_vert_at(&mesh, Vec3::new(2.0, 2.0, 0.0)));
        assert_eq!(
            mesh.iter_edges().filter(|e| e.item.is_boundary(&mesh)).count(),
            20
        );
        assert_clean(&mesh);
    })
}

#[test]
fn open_meshes_round_inward() {
    for resolution in [2, 3] {
        Mesh::new(|mut mesh| {
            square(&mut mesh);

            let opts = BevelOptions::new(0.1).with_resolution(resolution);
            let report = bevel(&mut mesh, &opts).unwrap();
            mesh.validate().unwrap();

            assert_eq!(report.passes, resolution as usize);
            assert!(mesh.vert_count() > 16, "{resolution}");
            assert_eq!(mesh.euler_characteristic(), 1);
            // later passes leave the boundary of the first one alone
            assert_eq!(
                mesh.iter_edges().filter(|e| e.item.is_boundary(&mesh)).count(),
                12
            );
            assert!(has_vert_at(&mesh, Vec3::ZERO));
            assert_clean(&mesh);

            if resolution == 2 {
                assert!(report.warnings.is_empty(), "{:?}", report.warnings);
                assert_eq!(shape(&mesh), [24, 40, 17]);
            }
        })
    }

    Mesh::new(|mut mesh| {
        grid(&mut mesh);

        let report = bevel(&mut mesh, &BevelOptions::new(0.1).with_resolution(2)).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.passes, 2);
        assert!(mesh.vert_count() > 36);
        assert_eq!(mesh.euler_characteristic(), 1);
        assert_eq!(
            mesh.iter_edges().filter(|e| e.item.is_boundary(&mesh)).count(),
            20
        );
        assert_clean(&mesh);
    })
}

#[test]
fn quad_vertices() {
    Mesh::new(|mut mesh| {
        square(&mut mesh);

        let opts = BevelOptions::new(0.1).with_vertex_only(true);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.verts, 4);
        assert_eq!(report.edges, 0);
        assert_eq!(shape(&mesh), [8, 8, 1]);
        assert_eq!(face_sizes(&mesh), [8]);

        assert!(!has_vert_at(&mesh, Vec3::ZERO));
        assert!(has_vert_at(&mesh, Vec3::new(0.1, 0.0, 0.0)));
        assert!(has_vert_at(&mesh, Vec3::new(0.0, 0.1, 0.0)));
        assert!(has_vert_at(&mesh, Vec3::new(0.9, 1.0, 0.0)));
    })
}

#[test]
fn cube_edges() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        let report = bevel(&mut mesh, &BevelOptions::new(0.1)).unwrap();
        mesh.validate().unwrap();

        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.edges, 12);
        assert_eq!(report.verts, 8);
        assert_eq!(report.moved, 24);

        assert_eq!(shape(&mesh), [24, 48, 26]);
        assert_eq!(mesh.euler_characteristic(), 2);
        let sizes = face_sizes(&mesh);
        assert_eq!(sizes.iter().filter(|&&n| n == 3).count(), 8);
        assert_eq!(sizes.iter().filter(|&&n| n == 4).count(), 18);

        assert!(mesh.iter_edges().all(|e| e.item.is_manifold(&mesh)));
        assert!(mesh.iter_verts().all(|v| v.item.degree(&mesh) == Ok(4)));

        // corner triangle at the origin
        assert!(has_vert_at(&mesh, Vec3::new(0.1, 0.1, 0.0)));
        assert!(has_vert_at(&mesh, Vec3::new(0.1, 0.0, 0.1)));
        assert!(has_vert_at(&mesh, Vec3::new(0.0, 0.1, 0.1)));
        assert!(!has_vert_at(&mesh, Vec3::ZERO));
    })
}

#[test]
fn cube_vertices() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        let opts = BevelOptions::new(0.25).with_vertex_only(true);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(shape(&mesh), [24, 36, 14]);
        assert_eq!(mesh.euler_characteristic(), 2);

        let sizes = face_sizes(&mesh);
        assert_eq!(&sizes[..8], [3; 8]);
        assert_eq!(&sizes[8..], [8; 6]);

        assert!(has_vert_at(&mesh, Vec3::new(0.25, 0.0, 0.0)));
        assert!(has_vert_at(&mesh, Vec3::new(1.0, 1.0, 0.75)));
    })
}

#[test]
fn resolution_zero_is_vertex_only() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        let opts = BevelOptions::new(0.25).with_resolution(0);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.passes, 1);
        assert_eq!(shape(&mesh), [24, 36, 14]);
    })
}

#[test]
fn one_selected_edge() {
    Mesh::new(|mut mesh| {
        let (verts, _) = cube(&mut mesh);
        let edge = verts[0].find_edge(verts[1], &mesh).unwrap();
        edge.enable(ElemFlags::SELECT, &mut mesh);

        let opts = BevelOptions::new(0.1).with_select_only(true);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.edges, 1);
        assert_eq!(report.verts, 2);
        assert_eq!(shape(&mesh), [10, 15, 7]);
        assert_eq!(mesh.euler_characteristic(), 2);

        // the two faces along the edge pull back, the strip is a quad
        for co in [
            Vec3::new(0.0, 0.1, 0.0),
            Vec3::new(0.0, 0.0, 0.1),
            Vec3::new(1.0, 0.1, 0.0),
            Vec3::new(1.0, 0.0, 0.1),
        ] {
            assert!(has_vert_at(&mesh, co), "{co}");
        }
        assert!(!has_vert_at(&mesh, Vec3::ZERO));
        assert!(!has_vert_at(&mesh, Vec3::X));
        assert!(has_vert_at(&mesh, Vec3::ONE));
    })
}

#[test]
fn nothing_selected() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        let opts = BevelOptions::new(0.1).with_select_only(true);
        let report = bevel(&mut mesh, &opts).unwrap();

        assert_eq!(report, BevelReport::default());
        assert_eq!(shape(&mesh), [8, 12, 6]);
    })
}

#[test]
fn angle_limit() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        let opts = BevelOptions::new(0.1).with_limit(BevelLimit::Angle(100.0));
        let report = bevel(&mut mesh, &opts).unwrap();
        assert_eq!(report.passes, 0);
        assert_eq!(shape(&mesh), [8, 12, 6]);

        let opts = BevelOptions::new(0.1).with_limit(BevelLimit::Angle(45.0));
        let report = bevel(&mut mesh, &opts).unwrap();
        assert_eq!(report.edges, 12);
        assert_eq!(shape(&mesh), [24, 48, 26]);
        mesh.validate().unwrap();
    })
}

#[test]
fn crease_limit() {
    Mesh::new(|mut mesh| {
        let (verts, _) = cube(&mut mesh);
        let edge = verts[0].find_edge(verts[1], &mesh).unwrap();
        edge.set_crease(1.0, &mut mesh);

        let opts = BevelOptions::new(0.1).with_limit(BevelLimit::Crease);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.edges, 1);
        assert_eq!(shape(&mesh), [10, 15, 7]);
        assert!(has_vert_at(&mesh, Vec3::new(0.0, 0.1, 0.0)));
        assert!(has_vert_at(&mesh, Vec3::ONE));
    });

    // a crease also lets an edge under the angle limit through
    Mesh::new(|mut mesh| {
        let (verts, _) = cube(&mut mesh);
        let edge = verts[6].find_edge(verts[7], &mesh).unwrap();
        edge.set_crease(0.5, &mut mesh);

        let opts = BevelOptions::new(0.1).with_limit(BevelLimit::Angle(100.0));
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.edges, 1);
        assert_eq!(shape(&mesh), [10, 15, 7]);
        assert!(!has_vert_at(&mesh, Vec3::ONE));
        assert!(has_vert_at(&mesh, Vec3::ZERO));
    })
}

#[test]
fn weight_limit() {
    Mesh::new(|mut mesh| {
        let (verts, _) = cube(&mut mesh);
        let edge = verts[0].find_edge(verts[1], &mesh).unwrap();
        edge.set_bevel_weight(0.5, &mut mesh);

        let opts = BevelOptions::new(0.1).with_limit(BevelLimit::Weight);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.edges, 1);
        assert_eq!(shape(&mesh), [10, 15, 7]);
        assert!(has_vert_at(&mesh, Vec3::new(0.0, 0.05, 0.0)));
        assert!(has_vert_at(&mesh, Vec3::new(0.0, 0.0, 0.05)));
    })
}

#[test]
fn zero_value_is_a_no_op() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        for value in [0.0, -1.0] {
            let report = bevel(&mut mesh, &BevelOptions::new(value)).unwrap();
            assert_eq!(report, BevelReport::default());
        }
        assert_eq!(shape(&mesh), [8, 12, 6]);
    })
}

#[test]
fn non_finite_value() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        assert!(matches!(
            bevel(&mut mesh, &BevelOptions::new(f32::NAN)),
            Err(BevelError::NonFiniteValue(_))
        ));
        assert_eq!(
            bevel(&mut mesh, &BevelOptions::new(f32::INFINITY)).err(),
            Some(BevelError::NonFiniteValue(f32::INFINITY))
        );
        assert_eq!(shape(&mesh), [8, 12, 6]);
    })
}

#[test]
fn transdata_moves_later() {
    Mesh::new(|mut mesh| {
        square(&mut mesh);

        let (mut table, report) = bevel_transdata(&mut mesh, &BevelOptions::new(0.1)).unwrap();
        assert_eq!(report.moved, 0);
        assert_eq!(shape(&mesh), [16, 24, 9]);

        // everything still sits on the original corners
        for v in mesh.iter_verts() {
            let co = v.co();
            assert!(co.x == 0.0 || co.x == 1.0, "{co}");
            assert!(co.y == 0.0 || co.y == 1.0, "{co}");
        }

        let moved = table.apply(&mut mesh, 0.2);
        assert_eq!(moved, 16);
        assert!(has_vert_at(&mesh, Vec3::new(0.2, 0.2, 0.0)));
        assert!(has_vert_at(&mesh, Vec3::new(0.8, 0.8, 0.0)));

        for (id, td) in table.iter() {
            let v = mesh.iter_verts().find(|v| v.id() == id).unwrap();
            assert!(v.co().abs_diff_eq(td.co, 1e-6));
        }
    })
}

#[test]
fn limits_clamp_offsets() {
    Mesh::new(|mut mesh| {
        square(&mut mesh);

        let (mut table, _) = bevel_transdata(&mut mesh, &BevelOptions::new(0.1)).unwrap();
        for (_, td) in table.iter() {
            let limit = table.limit(td).unwrap();
            assert!((limit - 0.5).abs() < 1e-5, "{limit}");
        }

        table.apply(&mut mesh, 0.7);
        assert!(has_vert_at(&mesh, Vec3::new(0.5, 0.5, 0.0)));
        assert!(mesh
            .iter_verts()
            .map(|v| v.co())
            .all(|co| (0.0..=1.0).contains(&co.x) && (0.0..=1.0).contains(&co.y)));
        mesh.validate().unwrap();
    })
}

#[test]
fn second_pass_rounds() {
    Mesh::new(|mut mesh| {
        cube(&mut mesh);

        let opts = BevelOptions::new(0.2).with_resolution(2);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.passes, 2);
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.face_count() > 26);
        assert!(mesh.iter_edges().all(|e| e.item.is_manifold(&mesh)));
    })
}

#[test]
fn nonmanifold_vertex_is_left_alone() {
    Mesh::new(|mut mesh| {
        let positions = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
        ];
        mesh.add_polygons(&positions, &[[0, 1, 2], [0, 3, 4]])
            .unwrap();

        let opts = BevelOptions::new(0.1).with_vertex_only(true);
        let report = bevel(&mut mesh, &opts).unwrap();
        mesh.validate().unwrap();

        assert_eq!(report.verts, 4);
        assert!(has_vert_at(&mesh, Vec3::ZERO));
        assert_eq!(mesh.euler_characteristic(), 1);
    })
}

#[test]
fn weight_modes() {
    let ws = [0.2, 0.4, 0.9];
    assert_eq!(WeightMode::Min.combine(ws), Some(0.2));
    assert_eq!(WeightMode::Max.combine(ws), Some(0.9));
    let avg = WeightMode::Average.combine(ws).unwrap();
    assert!((avg - 0.5).abs() < 1e-6);
    assert_eq!(WeightMode::Average.combine([]), None);
}

#[test]
fn pass_offsets_add_up() {
    for resolution in 1..6 {
        let opts = BevelOptions::new(1.0).with_resolution(resolution);
        let mut d = opts.first_pass_factor();
        let mut total = 0.0;
        for pass in 0..opts.passes() {
            total += d;
            d /= if pass == 0 { 3.0 } else { 2.0 };
        }
        assert!((total - 1.0).abs() < 1e-5, "{resolution}: {total}");
    }
    let two = BevelOptions::new(1.0).with_resolution(2).first_pass_factor();
    assert!((two - 0.75).abs() < 1e-6);
}
