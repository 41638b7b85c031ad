use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::dvec3;
use quadfill::{BoundarySide, Config, MeshBuilder, PatchTree, QuadMesh, TriangleSurface, VH};
use std::hint::black_box;

// Lay out the side lengths as a convex polygon in the XY plane.
fn polygon(mesh: &mut QuadMesh, lengths: &[usize]) -> Vec<BoundarySide> {
    let total: usize = lengths.iter().sum();
    let k = lengths.len();
    let mut corners = Vec::with_capacity(k);
    let mut acc = 0usize;
    for l in lengths {
        let angle = std::f64::consts::TAU * acc as f64 / total as f64;
        corners.push(dvec3(angle.cos(), angle.sin(), 0.0) * total as f64 * 0.25);
        acc += l;
    }
    let first = mesh.new_vertex(corners[0]);
    let mut prev = first;
    let mut sides = Vec::with_capacity(k);
    for (i, l) in lengths.iter().enumerate() {
        let (a, b) = (corners[i], corners[(i + 1) % k]);
        let mut verts: Vec<VH> = vec![prev];
        for j in 1..*l {
            verts.push(mesh.new_vertex(a.lerp(b, j as f64 / *l as f64)));
        }
        let last = if i + 1 == k { first } else { mesh.new_vertex(b) };
        verts.push(last);
        prev = last;
        sides.push(BoundarySide::new(verts));
    }
    sides
}

fn ground() -> TriangleSurface {
    TriangleSurface::new(
        vec![
            dvec3(-1000.0, -1000.0, 0.0),
            dvec3(1000.0, -1000.0, 0.0),
            dvec3(1000.0, 1000.0, 0.0),
            dvec3(-1000.0, 1000.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
    .unwrap()
}

// Shapes that need reducing, scaled up.
fn shapes(n: usize) -> Vec<(&'static str, Vec<usize>)> {
    vec![
        ("rectangle", vec![2 * n, n, 2 * n, n]),
        ("quad", vec![4 * n, 3 * n, 2 * n, n]),
        ("pentagon", vec![3 * n, 2 * n, 3 * n, n, n]),
        ("hexagon", vec![5 * n, 3 * n, 2 * n, 4 * n, 2 * n, 2 * n]),
    ]
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for n in [1, 4, 16] {
        for (name, lengths) in shapes(n) {
            group.bench_with_input(BenchmarkId::new(name, n), &lengths, |b, lengths| {
                let mut mesh = QuadMesh::new();
                let sides = polygon(&mut mesh, lengths);
                b.iter(|| {
                    let tree = PatchTree::build(&mut mesh, black_box(sides.clone())).unwrap();
                    tree.release(&mut mesh).unwrap();
                });
            });
        }
    }
    group.finish();
}

fn bench_build_and_instantiate(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_instantiate");
    let surface = ground();
    let config = Config::default();
    for n in [1, 4, 16] {
        for (name, lengths) in shapes(n) {
            group.bench_with_input(BenchmarkId::new(name, n), &lengths, |b, lengths| {
                b.iter(|| {
                    let mut mesh = QuadMesh::new();
                    let sides = polygon(&mut mesh, lengths);
                    let tree = quadfill::build_and_instantiate(
                        &mut mesh,
                        &surface,
                        black_box(sides),
                        &config,
                    )
                    .unwrap();
                    black_box((mesh, tree));
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_build_and_instantiate);
criterion_main!(benches);
