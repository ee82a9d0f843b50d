//! Character-level diff.
//!
//! Myers' O(ND) algorithm over the middle section left after trimming the
//! common prefix and suffix. Among edit scripts of equal length the one
//! preferring insertions first on each diagonal is chosen, so changes are
//! anchored as far right of the common prefix as the classic algorithm puts
//! them.

use std::ops::Range;

/// Kind of a diff opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Insert,
    Delete,
    Replace,
}

/// One diff opcode: `old[old_range]` becomes `new[new_range]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub old: Range<usize>,
    pub new: Range<usize>,
}

impl Opcode {
    fn new(tag: OpTag, old: Range<usize>, new: Range<usize>) -> Self {
        Self { tag, old, new }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Keep,
    Insert,
    Delete,
}

/// Diff two character sequences into coalesced opcodes covering both inputs.
pub fn diff(old: &[char], new: &[char]) -> Vec<Opcode> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut steps = Vec::with_capacity(prefix + suffix + old_mid.len() + new_mid.len());
    steps.extend(std::iter::repeat(Step::Keep).take(prefix));
    steps.extend(myers(old_mid, new_mid));
    steps.extend(std::iter::repeat(Step::Keep).take(suffix));

    coalesce(&steps)
}

/// Shortest edit script between `a` and `b`.
fn myers(a: &[char], b: &[char]) -> Vec<Step> {
    if a.is_empty() {
        return vec![Step::Insert; b.len()];
    }
    if b.is_empty() {
        return vec![Step::Delete; a.len()];
    }
    backtrack(&forward(a, b), a.len() as isize, b.len() as isize)
}

/// Furthest-reaching x per diagonal before each round `d`, holding only
/// diagonals `-d-1..=d+1`.
struct Frontier(Vec<isize>);

impl Frontier {
    fn at(&self, d: isize, k: isize) -> isize {
        self.0[(k + d + 1) as usize]
    }
}

fn forward(a: &[char], b: &[char]) -> Vec<Frontier> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    let offset = max + 1;
    let mut v = vec![0isize; (2 * max + 3) as usize];
    let mut trace = Vec::new();

    for d in 0..=max {
        let window = ((offset - d - 1) as usize)..=((offset + d + 1) as usize);
        trace.push(Frontier(v[window].to_vec()));
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            // Ties go to the insertion
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                return trace;
            }
            k += 2;
        }
    }
    trace
}

// Walk the trace backwards from (n, m)
fn backtrack(trace: &[Frontier], n: isize, m: isize) -> Vec<Step> {
    let mut steps = Vec::new();
    let (mut x, mut y) = (n, m);
    for d in (0..trace.len() as isize).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && v.at(d, k - 1) < v.at(d, k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v.at(d, prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            steps.push(Step::Keep);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                steps.push(Step::Insert);
            } else {
                steps.push(Step::Delete);
            }
        }
        x = prev_x;
        y = prev_y;
    }

    steps.reverse();
    steps
}

fn coalesce(steps: &[Step]) -> Vec<Opcode> {
    let mut ops = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    let mut pos = 0;

    while pos < steps.len() {
        let (start_i, start_j) = (i, j);
        if steps[pos] == Step::Keep {
            while pos < steps.len() && steps[pos] == Step::Keep {
                i += 1;
                j += 1;
                pos += 1;
            }
            ops.push(Opcode::new(OpTag::Equal, start_i..i, start_j..j));
            continue;
        }

        while pos < steps.len() && steps[pos] != Step::Keep {
            if steps[pos] == Step::Delete {
                i += 1;
            } else {
                j += 1;
            }
            pos += 1;
        }
        let tag = match (i > start_i, j > start_j) {
            (true, true) => OpTag::Replace,
            (true, false) => OpTag::Delete,
            _ => OpTag::Insert,
        };
        ops.push(Opcode::new(tag, start_i..i, start_j..j));
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn apply(old: &str, new: &str) -> String {
        let (a, b) = (chars(old), chars(new));
        let mut out = String::new();
        for op in diff(&a, &b) {
            match op.tag {
                OpTag::Equal => out.extend(&a[op.old]),
                _ => out.extend(&b[op.new]),
            }
        }
        out
    }

    #[test]
    fn test_equal_input() {
        let a = chars("same");
        let ops = diff(&a, &a);
        assert_eq!(ops, vec![Opcode::new(OpTag::Equal, 0..4, 0..4)]);
        assert!(diff(&[], &[]).is_empty());
    }

    #[test]
    fn test_single_deletion() {
        let ops = diff(&chars("abc-def"), &chars("abcdef"));
        assert_eq!(
            ops,
            vec![
                Opcode::new(OpTag::Equal, 0..3, 0..3),
                Opcode::new(OpTag::Delete, 3..4, 3..3),
                Opcode::new(OpTag::Equal, 4..7, 3..6),
            ]
        );
    }

    #[test]
    fn test_replacement() {
        let ops = diff(&chars("the cort"), &chars("the court"));
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[1].tag, OpTag::Insert);
        assert_eq!(ops[1].old, 6..6);

        let ops = diff(&chars("l0ve"), &chars("love"));
        assert_eq!(ops[1], Opcode::new(OpTag::Replace, 1..2, 1..2));
    }

    #[test]
    fn test_scripts_reproduce_target() {
        let cases = [
            ("", "abc"),
            ("abc", ""),
            ("kitten", "sitting"),
            ("Tbe plaintif sued", "The plaintiff sued"),
            ("a b c d", "d c b a"),
            ("aaaa", "aa"),
        ];
        for (old, new) in cases {
            assert_eq!(apply(old, new), new, "{:?} -> {:?}", old, new);
        }
    }

    #[test]
    fn test_opcodes_cover_both_inputs() {
        let (a, b) = (chars("Tbe plaintif sued"), chars("The plaintiff sued"));
        let ops = diff(&a, &b);
        assert_eq!(ops.first().unwrap().old.start, 0);
        assert_eq!(ops.last().unwrap().old.end, a.len());
        assert_eq!(ops.last().unwrap().new.end, b.len());
        for pair in ops.windows(2) {
            assert_eq!(pair[0].old.end, pair[1].old.start);
            assert_eq!(pair[0].new.end, pair[1].new.start);
        }
    }

    #[test]
    fn test_trace_holds_live_diagonals_only() {
        let old = "ab".repeat(1_500);
        let new = "ba".repeat(1_500);
        assert_eq!(apply(&old, &new), new);

        let (a, b) = (chars("the plaintif sued the defendent"), chars("a plaintiff sued defendants"));
        let trace = forward(&a, &b);
        assert!(trace.len() > 5);
        for (d, frontier) in trace.iter().enumerate() {
            assert_eq!(frontier.0.len(), 2 * d + 3);
        }
        assert_eq!(apply("the plaintif sued the defendent", "a plaintiff sued defendants"), "a plaintiff sued defendants");
    }

    #[test]
    fn test_replace_step_order() {
        assert_eq!(myers(&chars("a"), &chars("b")), vec![Step::Delete, Step::Insert]);
        assert_eq!(
            myers(&chars("ab"), &chars("ba")),
            vec![Step::Delete, Step::Keep, Step::Insert]
        );
    }
}
