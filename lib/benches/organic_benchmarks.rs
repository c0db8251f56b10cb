//! Organic support benchmarks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use organic_support::geometry::{ExPolygon, Point};
use organic_support::mesh::TriangleMesh;
use organic_support::support::{
    extract_trees, extrude_branch, never_cancel, organic_smooth_branches_avoid_collisions,
    BranchMeshConfig, ElementsWithLinkDown, OrganicSmoothConfig, SupportElement,
    SupportElementState, SupportElements, TreeModelVolumes, TreeModelVolumesConfig,
    TreeSelection, TreeSupportSettings,
};
use organic_support::scale;

/// Slanted column of `layers` elements, leaning 0.05mm per layer.
fn slanted_column(layers: usize, radius: f64) -> Vec<SupportElements> {
    (0..layers)
        .map(|layer| {
            let parents = if layer + 1 < layers { vec![0] } else { vec![] };
            vec![SupportElement::with_parents(
                SupportElementState::new(
                    layer as i64,
                    Point::new_scale(0.05 * layer as f64, 0.0),
                    scale(radius),
                ),
                parents,
            )]
        })
        .collect()
}

fn extrusion_benchmark(c: &mut Criterion) {
    let settings = TreeSupportSettings::default();
    let config = BranchMeshConfig::default();
    let mut group = c.benchmark_group("extrude_branch");

    for radius in [0.5, 1.0, 3.0] {
        let mut move_bounds = slanted_column(100, radius);
        let trees = extract_trees(&mut move_bounds, TreeSelection::All);
        let path = trees[0].branches[0].path.clone();

        group.bench_with_input(BenchmarkId::from_parameter(radius), &path, |b, path| {
            b.iter(|| {
                let mut mesh = TriangleMesh::new();
                let span = extrude_branch(path, &move_bounds, &settings, &config, &mut mesh);
                black_box((span, mesh.triangle_count()))
            })
        });
    }
    group.finish();
}

fn relaxation_benchmark(c: &mut Criterion) {
    let settings = TreeSupportSettings::default();
    let config = OrganicSmoothConfig::default();
    let wall = vec![ExPolygon::rectangle(
        Point::new_scale(0.5, -20.0),
        Point::new_scale(20.0, 20.0),
    )];
    let volumes = TreeModelVolumes::with_layer_outlines(
        TreeModelVolumesConfig::default(),
        vec![wall; 60],
    );

    c.bench_function("relax_column_near_wall", |b| {
        b.iter(|| {
            let mut move_bounds = slanted_column(60, 1.0);
            let links = ElementsWithLinkDown::build(&move_bounds);
            let stats = organic_smooth_branches_avoid_collisions(
                &volumes,
                &settings,
                &config,
                &mut move_bounds,
                &links,
                &never_cancel,
            );
            black_box(stats.map(|s| s.iterations))
        })
    });
}

criterion_group!(benches, extrusion_benchmark, relaxation_benchmark);
criterion_main!(benches);
