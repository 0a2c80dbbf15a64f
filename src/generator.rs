//! Synthetic dataset generation.
//!
//! Word files have exact per-word totals but a randomized layout; the join
//! tables are fully deterministic.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{HarnessResult, IoContext};
use crate::types::WordSpec;

/// Narrowest generated line.
pub const MIN_LINE_WIDTH: usize = 5;
/// Widest generated line.
pub const MAX_LINE_WIDTH: usize = 9;

/// Rows in join table A.
pub const TABLE_A_ROWS: usize = 1000;
/// Rows in join table B.
pub const TABLE_B_ROWS: usize = 2 * TABLE_A_ROWS;

/// File name of join table A inside the working directory.
pub const TABLE_A_FILE: &str = "data-a";
/// File name of join table B inside the working directory.
pub const TABLE_B_FILE: &str = "data-b";

/// Source of the randomness used for shuffling and line widths.
pub trait RandomSource {
    /// Uniform index in `[0, bound)`. `bound` is never zero.
    fn index_below(&mut self, bound: usize) -> usize;

    /// Uniform value in `[lo, hi]`.
    fn between(&mut self, lo: usize, hi: usize) -> usize;
}

/// `StdRng`-backed random source.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Deterministic source for reproducible fixtures.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::from_seed)
    }
}

impl RandomSource for SeededRandom {
    fn index_below(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }

    fn between(&mut self, lo: usize, hi: usize) -> usize {
        self.rng.gen_range(lo..=hi)
    }
}

/// Expands word counts into the full multiset, in declaration order.
pub fn expand_words(specs: &[WordSpec]) -> Vec<&str> {
    specs
        .iter()
        .flat_map(|spec| std::iter::repeat_n(spec.word.as_str(), spec.count))
        .collect()
}

/// In-place shuffle: every position is swapped with a uniformly random one.
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    let n = items.len();
    for i in 0..n {
        let j = rng.index_below(n);
        items.swap(i, j);
    }
}

/// Lays the shuffled multiset out as lines of 5 to 9 words.
///
/// The last line may be shorter. No line is ever empty.
pub fn layout_lines(specs: &[WordSpec], rng: &mut dyn RandomSource) -> Vec<String> {
    let mut words = expand_words(specs);
    shuffle(&mut words, rng);

    let mut lines = Vec::new();
    let mut rest = words.as_slice();
    while !rest.is_empty() {
        let width = rng.between(MIN_LINE_WIDTH, MAX_LINE_WIDTH).min(rest.len());
        let (line, tail) = rest.split_at(width);
        lines.push(line.join(" "));
        rest = tail;
    }
    lines
}

/// Writes a word file for `specs` to `path`.
pub fn write_word_file(
    path: &Path,
    specs: &[WordSpec],
    rng: &mut dyn RandomSource,
) -> HarnessResult<()> {
    let mut content = String::new();
    for line in layout_lines(specs, rng) {
        content.push_str(&line);
        content.push('\n');
    }
    fs::write(path, content).at_path(path)?;

    log::debug!(
        "Generated {} ({} words)",
        path.display(),
        specs.iter().map(|s| s.count).sum::<usize>()
    );
    Ok(())
}

/// Contents of the two tab-separated join tables, `(A, B)`.
///
/// A row `i` is `i, 2i`: its second column is the key of a B row.
/// B row `j` is `j, 1002 + 2j`.
pub fn join_tables() -> (String, String) {
    let mut table_a = String::new();
    let mut table_b = String::new();

    let mut id_b = 0usize;
    let mut value = 1000usize;

    for id_a in 0..TABLE_A_ROWS {
        // Writing to a String cannot fail.
        let _ = writeln!(table_a, "{id_a}\t{id_b}");

        for _ in 0..TABLE_B_ROWS / TABLE_A_ROWS {
            value += 2;
            let _ = writeln!(table_b, "{id_b}\t{value}");
            id_b += 1;
        }
    }

    (table_a, table_b)
}

/// Writes both join tables into `dir`, returning their paths.
pub fn write_join_tables(dir: &Path) -> HarnessResult<(PathBuf, PathBuf)> {
    let (table_a, table_b) = join_tables();

    let path_a = dir.join(TABLE_A_FILE);
    fs::write(&path_a, table_a).at_path(&path_a)?;

    let path_b = dir.join(TABLE_B_FILE);
    fs::write(&path_b, table_b).at_path(&path_b)?;

    Ok((path_a, path_b))
}
