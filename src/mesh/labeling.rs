use super::topology::TetAdjacency;

/// Disjoint-set forest with path halving and union by size
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    /// Canonical labels: sets numbered in order of their first element
    pub fn labels(&mut self) -> (Vec<usize>, usize) {
        let n = self.parent.len();
        let mut root_label = vec![usize::MAX; n];
        let mut labels = Vec::with_capacity(n);
        let mut count = 0;
        for x in 0..n {
            let root = self.find(x);
            if root_label[root] == usize::MAX {
                root_label[root] = count;
                count += 1;
            }
            labels.push(root_label[root]);
        }
        (labels, count)
    }
}

/// Connected components of the tetrahedron graph, ignoring interior faces
/// for which `separated(face)` holds
///
/// Returns canonical per-tet labels (tet 0 has label 0, labels appear in
/// increasing order of their smallest tet) and the component count.
pub fn connected_labels<F>(adjacency: &TetAdjacency, separated: F) -> (Vec<usize>, usize)
where
    F: Fn(usize) -> bool,
{
    let mut sets = UnionFind::new(adjacency.num_tets());
    for (idx, face) in adjacency.interior_faces().iter().enumerate() {
        if !separated(idx) {
            sets.union(face.tets[0], face.tets[1]);
        }
    }
    sets.labels()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;

    #[test]
    fn test_labels_are_canonical() {
        let mut sets = UnionFind::new(6);
        sets.union(5, 3);
        sets.union(1, 4);
        sets.union(4, 5);
        let (labels, count) = sets.labels();
        assert_eq!(labels, vec![0, 1, 2, 1, 1, 1]);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_cutting_a_plane_splits_box() {
        let mesh = MeshGenerator::generate_box(4, 2, 2, 1.0, 1.0, 1.0).unwrap();
        let adj = TetAdjacency::build(&mesh).unwrap();

        let (labels, count) = connected_labels(&adj, |_| false);
        assert_eq!(count, 1);
        assert!(labels.iter().all(|&l| l == 0));

        // Cut along x = 0.5
        let left = |t: usize| mesh.tet_centroid(t).x < 0.5;
        let (labels, count) = connected_labels(&adj, |f| {
            let [a, b] = adj.interior_faces()[f].tets;
            left(a) != left(b)
        });
        assert_eq!(count, 2);
        for t in 0..mesh.num_tets() {
            assert_eq!(labels[t] == labels[0], left(t) == left(0));
        }
    }
}
