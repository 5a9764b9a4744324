//! Line diff for previewing a proposed file change.

use serde::{Deserialize, Serialize};

/// Unchanged lines shown around each change.
pub const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Context,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
}

impl DiffLine {
    fn prefix(&self) -> char {
        match self.kind {
            DiffLineKind::Context => ' ',
            DiffLineKind::Added => '+',
            DiffLineKind::Removed => '-',
        }
    }
}

/// A run of changes with surrounding context. Line numbers are 1-based;
/// an empty side starts at the line before the hunk, as in unified diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_len, self.new_start, self.new_len
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffPreview {
    pub path: String,
    pub hunks: Vec<DiffHunk>,
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffPreview {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Render as a unified diff.
    pub fn unified(&self) -> String {
        let mut out = format!("--- a/{}\n+++ b/{}\n", self.path, self.path);
        for hunk in &self.hunks {
            out.push_str(&hunk.header());
            out.push('\n');
            for line in &hunk.lines {
                out.push(line.prefix());
                out.push_str(&line.text);
                out.push('\n');
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// One edit step with the number of old/new lines before it.
#[derive(Debug, Clone, Copy)]
struct Step {
    op: Op,
    old_pos: usize,
    new_pos: usize,
}

/// Largest LCS table (old x new lines of the changed region) built for a
/// diff; 16 MiB of `u32` cells.
const MAX_TABLE_CELLS: usize = 4 * 1024 * 1024;

fn edit_script(old: &[&str], new: &[&str]) -> Vec<Step> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    let mut ops = vec![Op::Equal; prefix];
    if a.len().saturating_mul(b.len()) > MAX_TABLE_CELLS {
        // too large to align line by line: replace the changed region whole
        ops.extend(std::iter::repeat_n(Op::Delete, a.len()));
        ops.extend(std::iter::repeat_n(Op::Insert, b.len()));
    } else {
        ops.extend(lcs_ops(a, b));
    }
    ops.extend(std::iter::repeat_n(Op::Equal, suffix));
    with_positions(ops)
}

fn lcs_ops(a: &[&str], b: &[&str]) -> Vec<Op> {
    // lcs[i][j] = longest common subsequence of a[i..] and b[j..]
    let width = b.len() + 1;
    let mut lcs = vec![0u32; (a.len() + 1) * width];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            ops.push(Op::Equal);
            i += 1;
            j += 1;
        } else if j >= b.len() || (i < a.len() && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            ops.push(Op::Delete);
            i += 1;
        } else {
            ops.push(Op::Insert);
            j += 1;
        }
    }
    ops
}

fn with_positions(ops: Vec<Op>) -> Vec<Step> {
    let (mut old_pos, mut new_pos) = (0, 0);
    ops.into_iter()
        .map(|op| {
            let step = Step { op, old_pos, new_pos };
            match op {
                Op::Equal => {
                    old_pos += 1;
                    new_pos += 1;
                }
                Op::Delete => old_pos += 1,
                Op::Insert => new_pos += 1,
            }
            step
        })
        .collect()
}

/// Diff `current` (absent files diff as empty) against `proposed`.
pub fn diff_preview(path: &str, current: &str, proposed: &str) -> DiffPreview {
    let old: Vec<&str> = current.lines().collect();
    let new: Vec<&str> = proposed.lines().collect();
    let steps = edit_script(&old, &new);

    let changes: Vec<usize> = steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.op != Op::Equal)
        .map(|(i, _)| i)
        .collect();

    // group changes whose gap fits inside shared context
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &c in &changes {
        match groups.last_mut() {
            Some((_, last)) if c - *last <= 2 * CONTEXT_LINES + 1 => *last = c,
            _ => groups.push((c, c)),
        }
    }

    let mut preview = DiffPreview {
        path: path.to_string(),
        ..Default::default()
    };
    for (first, last) in groups {
        let start = first.saturating_sub(CONTEXT_LINES);
        let end = (last + CONTEXT_LINES + 1).min(steps.len());
        let mut hunk = DiffHunk {
            old_start: 0,
            old_len: 0,
            new_start: 0,
            new_len: 0,
            lines: Vec::with_capacity(end - start),
        };
        for step in &steps[start..end] {
            let (kind, text) = match step.op {
                Op::Equal => {
                    hunk.old_len += 1;
                    hunk.new_len += 1;
                    (DiffLineKind::Context, old[step.old_pos])
                }
                Op::Delete => {
                    hunk.old_len += 1;
                    preview.lines_removed += 1;
                    (DiffLineKind::Removed, old[step.old_pos])
                }
                Op::Insert => {
                    hunk.new_len += 1;
                    preview.lines_added += 1;
                    (DiffLineKind::Added, new[step.new_pos])
                }
            };
            hunk.lines.push(DiffLine {
                kind,
                text: text.to_string(),
            });
        }
        let head = steps[start];
        hunk.old_start = head.old_pos + usize::from(hunk.old_len > 0);
        hunk.new_start = head.new_pos + usize::from(hunk.new_len > 0);
        preview.hunks.push(hunk);
    }
    preview
}
