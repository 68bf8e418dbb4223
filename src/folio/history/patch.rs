//! Line-level patches and the content hash used to verify them.
//!
//! A [`Patch`] is a list of edits walked over the lines of a source text:
//! keep some lines, drop some lines, insert literal text. Line boundaries
//! are kept (`split_inclusive`), so applying a patch reproduces its target
//! byte for byte, trailing newline or not.

use serde::{Deserialize, Serialize};

/// Above this many line comparisons the middle section is replaced whole
/// rather than diffed.
const LCS_CELL_LIMIT: usize = 4_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edit {
    Keep(usize),
    Drop(usize),
    Insert(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    edits: Vec<Edit>,
}

impl Patch {
    /// Builds the patch that turns `from` into `to`.
    pub fn between(from: &str, to: &str) -> Self {
        let a: Vec<&str> = from.split_inclusive('\n').collect();
        let b: Vec<&str> = to.split_inclusive('\n').collect();

        let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
        let suffix = a[prefix..]
            .iter()
            .rev()
            .zip(b[prefix..].iter().rev())
            .take_while(|(x, y)| x == y)
            .count();

        let mut patch = Patch::default();
        patch.push(Edit::Keep(prefix));

        let a_mid = &a[prefix..a.len() - suffix];
        let b_mid = &b[prefix..b.len() - suffix];
        if a_mid.len().saturating_mul(b_mid.len()) <= LCS_CELL_LIMIT {
            diff_lines(&mut patch, a_mid, b_mid);
        } else {
            patch.push(Edit::Drop(a_mid.len()));
            patch.push(Edit::Insert(b_mid.concat()));
        }

        patch.push(Edit::Keep(suffix));
        patch
    }

    /// Applies the patch to `source`. `None` if the patch does not fit it.
    pub fn apply(&self, source: &str) -> Option<String> {
        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        let mut out = String::with_capacity(source.len());
        let mut cursor: usize = 0;

        for edit in &self.edits {
            match edit {
                Edit::Keep(n) => {
                    let end = cursor.checked_add(*n).filter(|end| *end <= lines.len())?;
                    lines[cursor..end].iter().for_each(|line| out.push_str(line));
                    cursor = end;
                }
                Edit::Drop(n) => {
                    cursor = cursor.checked_add(*n).filter(|end| *end <= lines.len())?;
                }
                Edit::Insert(text) => out.push_str(text),
            }
        }

        (cursor == lines.len()).then_some(out)
    }

    /// True when applying the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.edits.iter().all(|edit| matches!(edit, Edit::Keep(_)))
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    fn push(&mut self, edit: Edit) {
        match &edit {
            Edit::Keep(0) | Edit::Drop(0) => return,
            Edit::Insert(text) if text.is_empty() => return,
            _ => {}
        }
        if let Some(last) = self.edits.last_mut() {
            match (last, &edit) {
                (Edit::Keep(n), Edit::Keep(m)) | (Edit::Drop(n), Edit::Drop(m)) => {
                    *n += m;
                    return;
                }
                (Edit::Insert(s), Edit::Insert(t)) => {
                    s.push_str(t);
                    return;
                }
                _ => {}
            }
        }
        self.edits.push(edit);
    }
}

/// Longest-common-subsequence walk over two line slices.
fn diff_lines(patch: &mut Patch, a: &[&str], b: &[&str]) {
    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    // lcs[i * width + j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            patch.push(Edit::Keep(1));
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            patch.push(Edit::Drop(1));
            i += 1;
        } else {
            patch.push(Edit::Insert(b[j].to_string()));
            j += 1;
        }
    }
    patch.push(Edit::Drop(n - i));
    patch.push(Edit::Insert(b[j..].concat()));
}

/// Order-sensitive 64-bit digest of a field value.
pub fn content_hash(text: &str) -> u64 {
    let digest = blake3::hash(text.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}
