//! Edge and vertex adjacency helpers shared by the repair passes

use std::collections::HashMap;

/// Undirected edge with the smaller index first
pub type Edge = (usize, usize);

/// Normalize an edge so that `(a, b)` and `(b, a)` hash the same
#[inline]
pub fn edge_key(a: usize, b: usize) -> Edge {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The three directed edges of a face in winding order
#[inline]
pub fn directed_edges(face: &[usize; 3]) -> [(usize, usize); 3] {
    [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])]
}

/// Map every undirected edge to the faces using it
pub fn edge_face_map(faces: &[[usize; 3]]) -> HashMap<Edge, Vec<usize>> {
    let mut map: HashMap<Edge, Vec<usize>> = HashMap::with_capacity(faces.len() * 3 / 2);
    for (fi, face) in faces.iter().enumerate() {
        for (a, b) in directed_edges(face) {
            map.entry(edge_key(a, b)).or_default().push(fi);
        }
    }
    map
}

/// Incident faces of every vertex
pub fn vertex_face_map(vertex_count: usize, faces: &[[usize; 3]]) -> Vec<Vec<usize>> {
    let mut map = vec![Vec::new(); vertex_count];
    for (fi, face) in faces.iter().enumerate() {
        for &v in face {
            map[v].push(fi);
        }
    }
    map
}

/// Flags vertices lying on an edge used by exactly one face
pub fn boundary_vertices(vertex_count: usize, faces: &[[usize; 3]]) -> Vec<bool> {
    let mut flags = vec![false; vertex_count];
    for ((a, b), users) in edge_face_map(faces) {
        if users.len() == 1 {
            flags[a] = true;
            flags[b] = true;
        }
    }
    flags
}

/// Minimal union-find over dense indices
#[derive(Debug, Clone)]
pub struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Dense component label per element, numbered in first-seen order
    pub fn labels(&mut self) -> (Vec<usize>, usize) {
        let n = self.parent.len();
        let mut root_label = HashMap::new();
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let root = self.find(i);
            let next = root_label.len();
            labels.push(*root_label.entry(root).or_insert(next));
        }
        let count = root_label.len();
        (labels, count)
    }
}

/// Label edge-connected face components
pub fn face_components(faces: &[[usize; 3]]) -> (Vec<usize>, usize) {
    let mut sets = DisjointSets::new(faces.len());
    for users in edge_face_map(faces).values() {
        for w in users.windows(2) {
            sets.union(w[0], w[1]);
        }
    }
    sets.labels()
}
