//! Ear-clip polygon triangulation (spec §4.E "Triangulation", §4.J).
//!
//! Invariants held by `triangulate`: the input index array is never mutated;
//! output is exactly `3(n-2)` indices for `n>=3`; the projection basis is
//! derived only from vertex 0 and its neighbors, so a degenerate face (zero
//! length edge vectors) simply produces no triangles rather than panicking.

/// Triangulate one polygon face given its vertex positions (indexed by
/// `indices`, each resolved via `position_of`). Returns a flat list of
/// indices into the *original* vertex array, three per emitted triangle.
pub fn triangulate(indices: &[u32], position_of: impl Fn(u32) -> [f64; 3]) -> Vec<u32> {
    let n = indices.len();
    if n < 3 {
        return Vec::new();
    }
    if n == 3 {
        return indices.to_vec();
    }
    if n == 4 {
        return vec![indices[0], indices[1], indices[3], indices[2], indices[3], indices[1]];
    }

    let v0 = position_of(indices[0]);
    let v1 = position_of(indices[1]);
    let vn = position_of(indices[n - 1]);

    let face_u = normalize(sub(v1, v0));
    let face_normal = normalize(cross(face_u, normalize(sub(vn, v0))));
    let face_v = cross(face_normal, face_u);

    // Project every vertex into 2D face-plane coordinates.
    let points2d: Vec<(f64, f64)> = indices
        .iter()
        .map(|&idx| {
            let p = sub(position_of(idx), v0);
            (dot3(p, face_u), dot3(p, face_v))
        })
        .collect();

    // Circular doubly linked list over positions 0..n, via next/prev arrays.
    let mut next: Vec<usize> = (0..n).map(|i| (i + 1) % n).collect();
    let mut prev: Vec<usize> = (0..n).map(|i| (i + n - 1) % n).collect();
    let mut alive: Vec<bool> = vec![true; n];
    let mut remaining = n;

    let mut out = Vec::with_capacity(3 * (n - 2));

    while remaining > 3 {
        let mut best: Option<(usize, f64)> = None;
        let start = (0..n).find(|&k| alive[k]).unwrap();
        let mut i = start;
        loop {
            if alive[i] {
                let angle = interior_angle(points2d[prev[i]], points2d[i], points2d[next[i]]);
                let score = if angle <= 0.0 || angle >= std::f64::consts::PI { f64::MAX } else { angle };
                if best.map(|(_, b)| score < b).unwrap_or(true) {
                    best = Some((i, score));
                }
            }
            i = next[i];
            if i == start {
                break;
            }
        }

        let Some((ear, _)) = best else { break };
        out.push(indices[ear]);
        out.push(indices[next[ear]]);
        out.push(indices[prev[ear]]);

        let p = prev[ear];
        let nx = next[ear];
        next[p] = nx;
        prev[nx] = p;
        alive[ear] = false;
        remaining -= 1;
    }

    if remaining == 3 {
        let last = (0..n).find(|&k| alive[k]).unwrap();
        out.push(indices[last]);
        out.push(indices[next[last]]);
        out.push(indices[prev[last]]);
    }

    out
}

fn interior_angle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    let ba = (a.0 - b.0, a.1 - b.1);
    let bc = (c.0 - b.0, c.1 - b.1);
    let dot = ba.0 * bc.0 + ba.1 * bc.1;
    let cross = ba.0 * bc.1 - ba.1 * bc.0;
    cross.atan2(dot).abs()
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

fn dot3(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 0.0 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        v
    }
}
