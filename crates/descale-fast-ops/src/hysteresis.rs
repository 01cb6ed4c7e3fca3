use descale_fast_types::{FrameResult, Plane};

/// Horizontal span of set pixels, `end` exclusive.
#[derive(Clone, Copy)]
struct RowRun {
    start: usize,
    end: usize,
    row: usize,
    label: u32,
}

/// Keeps the 8-connected components of `mask` that contain at least one set
/// pixel of `seeds`. Kept pixels become `peak`, everything else 0. A sample is
/// set when it is above zero.
pub fn hysteresis(seeds: &Plane, mask: &Plane, peak: f32) -> FrameResult<Plane> {
    seeds.ensure_same_size(mask)?;
    let (width, height) = mask.dimensions();
    let data = mask.data();

    let mut runs: Vec<RowRun> = Vec::new();
    let mut offsets = vec![0usize; height + 1];
    for row in 0..height {
        offsets[row] = runs.len();
        let line = &data[row * width..(row + 1) * width];
        let mut x = 0;
        while x < width {
            if line[x] <= 0.0 {
                x += 1;
                continue;
            }
            let start = x;
            while x < width && line[x] > 0.0 {
                x += 1;
            }
            runs.push(RowRun {
                start,
                end: x,
                row,
                label: 0,
            });
        }
    }
    offsets[height] = runs.len();

    let mut out = vec![0.0f32; mask.len()];
    if runs.is_empty() {
        return mask.with_data(out);
    }

    let mut dsu = DisjointSet::with_capacity(runs.len());
    for run in runs.iter_mut() {
        run.label = dsu.make_set();
    }

    for row in 1..height {
        let (mut prev, prev_end) = (offsets[row - 1], offsets[row]);
        let (mut curr, curr_end) = (offsets[row], offsets[row + 1]);
        while prev < prev_end && curr < curr_end {
            let run_a = runs[prev];
            let run_b = runs[curr];
            if runs_touch(&run_a, &run_b) {
                dsu.union(run_a.label, run_b.label);
            }
            if run_a.end <= run_b.end {
                prev += 1;
            } else {
                curr += 1;
            }
        }
    }

    let seed_data = seeds.data();
    let mut seeded = vec![false; dsu.len()];
    for run in &runs {
        let base = run.row * width;
        if seed_data[base + run.start..base + run.end]
            .iter()
            .any(|&v| v > 0.0)
        {
            let root = dsu.find(run.label);
            seeded[root as usize] = true;
        }
    }

    for run in &runs {
        if seeded[dsu.find(run.label) as usize] {
            let base = run.row * width;
            out[base + run.start..base + run.end].fill(peak);
        }
    }
    mask.with_data(out)
}

/// Overlapping or diagonally adjacent runs on neighbouring rows.
fn runs_touch(a: &RowRun, b: &RowRun) -> bool {
    a.start <= b.end && b.start <= a.end
}

struct DisjointSet {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            parent: Vec::with_capacity(capacity),
            rank: Vec::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    fn make_set(&mut self) -> u32 {
        let idx = self.parent.len() as u32;
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut node = x;
        while self.parent[node as usize] != root {
            let next = self.parent[node as usize];
            self.parent[node as usize] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: u32, b: u32) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        let rank_a = self.rank[root_a as usize];
        let rank_b = self.rank[root_b as usize];
        if rank_a < rank_b {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b as usize] = root_a;
        if rank_a == rank_b {
            self.rank[root_a as usize] = rank_a + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> Plane {
        let width = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| if c == '#' { 1.0 } else { 0.0 }))
            .collect();
        Plane::from_vec(width, rows.len(), data).unwrap()
    }

    #[test]
    fn unseeded_islands_are_dropped() {
        let mask = grid(&["##...", "##...", ".....", "...##", "...##"]);
        let seeds = grid(&[".....", ".#...", ".....", ".....", "....."]);
        let out = hysteresis(&seeds, &mask, 1.0).unwrap();
        assert_eq!(out, grid(&["##...", "##...", ".....", ".....", "....."]));
    }

    #[test]
    fn diagonal_neighbours_are_connected() {
        let mask = grid(&["#...", ".#..", "..#.", "...#"]);
        let seeds = grid(&["....", "....", "....", "...#"]);
        let out = hysteresis(&seeds, &mask, 1.0).unwrap();
        assert_eq!(out, mask);
    }

    #[test]
    fn ring_around_a_hole_is_kept_whole() {
        let mask = grid(&["#####", "#...#", "#...#", "#####"]);
        let seeds = grid(&[".....", ".....", ".....", "....#"]);
        let out = hysteresis(&seeds, &mask, 255.0).unwrap();
        assert_eq!(out.get(0, 0), 255.0);
        assert_eq!(out.get(2, 1), 0.0);
        assert_eq!(out.data().iter().filter(|&&v| v > 0.0).count(), 14);
    }

    #[test]
    fn seeds_outside_the_mask_do_nothing() {
        let mask = grid(&["#..", "...", "..."]);
        let seeds = grid(&["...", ".#.", "..."]);
        let out = hysteresis(&seeds, &mask, 1.0).unwrap();
        assert!(out.data().iter().all(|&v| v == 0.0));
    }
}
