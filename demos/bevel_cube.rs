//! Bevels every edge of a unit cube and prints the result as OBJ.
//!
//! `cargo run --example bevel_cube -- 0.2 3` bevels by 0.2 with three passes.

use bmesh::bevel::{bevel, BevelOptions};
use bmesh::{Mesh, Vec3};
use std::io;

fn main() {
    let mut args = std::env::args().skip(1);
    let value = args.next().and_then(|x| x.parse().ok()).unwrap_or(0.1);
    let resolution = args.next().and_then(|x| x.parse().ok()).unwrap_or(1);

    let positions: Vec<_> = (0..8)
        .map(|i| Vec3::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
        .collect();
    let faces = [
        [0, 2, 3, 1],
        [4, 5, 7, 6],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 4, 6, 2],
        [1, 3, 7, 5],
    ];

    Mesh::new(|mut mesh| {
        mesh.add_polygons(&positions, &faces).unwrap();

        let opts = BevelOptions::new(value).with_resolution(resolution);
        let report = bevel(&mut mesh, &opts).unwrap();
        for warning in &report.warnings {
            eprintln!("warning: {warning}");
        }
        eprintln!(
            "{} passes, {} verts, {} edges, {} faces",
            report.passes,
            mesh.vert_count(),
            mesh.edge_count(),
            mesh.face_count()
        );

        mesh.recalc_normals();
        mesh.write_obj_with_normals(&mut io::stdout().lock()).unwrap();
    })
}
