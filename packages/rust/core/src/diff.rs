//! Line-level unified diff between two text blocks.
//!
//! Lines are compared with their trailing newline, so `"a"` and `"a\n"` differ.
//! Output follows the conventional unified format with three lines of context:
//! `--- old` / `+++ new` headers, `@@ -a,b +c,d @@` hunk markers, then
//! context (` `), removed (`-`), and added (`+`) lines. Emitted lines carry no
//! line terminator.

const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// Turns `old[a0..a1]` into `new[b0..b1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Opcode {
    tag: Tag,
    a0: usize,
    a1: usize,
    b0: usize,
    b1: usize,
}

/// Unified diff of `previous` against `current`. Empty when they are equal.
pub fn unified_diff(previous: &str, current: &str) -> Vec<String> {
    let old: Vec<&str> = previous.split_inclusive('\n').collect();
    let new: Vec<&str> = current.split_inclusive('\n').collect();

    let mut out = Vec::new();
    for group in group_opcodes(opcodes(&old, &new)) {
        if out.is_empty() {
            out.push("--- old".to_string());
            out.push("+++ new".to_string());
        }

        let (first, last) = (group[0], group[group.len() - 1]);
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a0, last.a1),
            format_range(first.b0, last.b1)
        ));

        for op in &group {
            if op.tag == Tag::Equal {
                out.extend(old[op.a0..op.a1].iter().map(|l| format!(" {}", strip_eol(l))));
                continue;
            }
            if matches!(op.tag, Tag::Replace | Tag::Delete) {
                out.extend(old[op.a0..op.a1].iter().map(|l| format!("-{}", strip_eol(l))));
            }
            if matches!(op.tag, Tag::Replace | Tag::Insert) {
                out.extend(new[op.b0..op.b1].iter().map(|l| format!("+{}", strip_eol(l))));
            }
        }
    }
    out
}

fn strip_eol(line: &str) -> &str {
    line.strip_suffix('\n').unwrap_or(line)
}

/// Hunk range: `start` is 0-based, the output is 1-based.
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    match length {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{length}", start + 1),
    }
}

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

/// Edit script from a longest common subsequence of lines.
fn opcodes(old: &[&str], new: &[&str]) -> Vec<Opcode> {
    let (n, m) = (old.len(), new.len());

    let prefix = common_prefix(old, new);
    let suffix = common_suffix(&old[prefix..], &new[prefix..]);

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();
    pairs.extend(
        lcs_pairs(&old[prefix..n - suffix], &new[prefix..m - suffix])
            .into_iter()
            .map(|(i, j)| (i + prefix, j + prefix)),
    );
    pairs.extend((0..suffix).map(|k| (n - suffix + k, m - suffix + k)));

    // Merge consecutive pairs into (a, b, size) blocks, then add a sentinel
    let mut blocks: Vec<(usize, usize, usize)> = Vec::new();
    for (i, j) in pairs {
        match blocks.last_mut() {
            Some((a, b, size)) if *a + *size == i && *b + *size == j => *size += 1,
            _ => blocks.push((i, j, 1)),
        }
    }
    blocks.push((n, m, 0));

    let mut codes = Vec::new();
    let (mut i, mut j) = (0, 0);
    for (a, b, size) in blocks {
        let tag = match (i < a, j < b) {
            (true, true) => Some(Tag::Replace),
            (true, false) => Some(Tag::Delete),
            (false, true) => Some(Tag::Insert),
            (false, false) => None,
        };
        if let Some(tag) = tag {
            codes.push(Opcode { tag, a0: i, a1: a, b0: j, b1: b });
        }
        i = a + size;
        j = b + size;
        if size > 0 {
            codes.push(Opcode { tag: Tag::Equal, a0: a, a1: i, b0: b, b1: j });
        }
    }
    codes
}

/// Index pairs of one longest common subsequence.
///
/// Myers' divide-and-conquer search: memory stays linear in the input size.
fn lcs_pairs(old: &[&str], new: &[&str]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let max_d = max_edit_distance(old.len(), new.len());
    let mut forward = Frontier::new(max_d);
    let mut backward = Frontier::new(max_d);
    collect_matches(old, 0, new, 0, &mut forward, &mut backward, &mut pairs);
    pairs
}

fn max_edit_distance(n: usize, m: usize) -> usize {
    (n + m + 1) / 2 + 1
}

/// Furthest x reached on each diagonal `k = x - y`.
struct Frontier {
    offset: isize,
    xs: Vec<usize>,
}

impl Frontier {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            xs: vec![0; 2 * max_d + 2],
        }
    }

    fn get(&self, k: isize) -> usize {
        self.xs[(k + self.offset) as usize]
    }

    fn set(&mut self, k: isize, x: usize) {
        self.xs[(k + self.offset) as usize] = x;
    }
}

/// Append the matches between `old` and `new` (shifted by the offsets) in
/// increasing order.
fn collect_matches(
    old: &[&str],
    old_offset: usize,
    new: &[&str],
    new_offset: usize,
    forward: &mut Frontier,
    backward: &mut Frontier,
    pairs: &mut Vec<(usize, usize)>,
) {
    let prefix = common_prefix(old, new);
    pairs.extend((0..prefix).map(|k| (old_offset + k, new_offset + k)));
    let (old, new) = (&old[prefix..], &new[prefix..]);
    let (old_offset, new_offset) = (old_offset + prefix, new_offset + prefix);

    let suffix = common_suffix(old, new);
    let (old, new) = (&old[..old.len() - suffix], &new[..new.len() - suffix]);

    if !old.is_empty() && !new.is_empty() {
        match middle_snake(old, new, forward, backward) {
            Some((x, y))
                if x <= old.len()
                    && y <= new.len()
                    && (x, y) != (0, 0)
                    && (x, y) != (old.len(), new.len()) =>
            {
                collect_matches(
                    &old[..x],
                    old_offset,
                    &new[..y],
                    new_offset,
                    forward,
                    backward,
                    pairs,
                );
                collect_matches(
                    &old[x..],
                    old_offset + x,
                    &new[y..],
                    new_offset + y,
                    forward,
                    backward,
                    pairs,
                );
            }
            // No usable split: treat the rest as replaced
            _ => {}
        }
    }

    let (old_end, new_end) = (old_offset + old.len(), new_offset + new.len());
    pairs.extend((0..suffix).map(|k| (old_end + k, new_end + k)));
}

/// A point on an optimal edit path roughly halfway between the corners,
/// found by searching forward from the start and backward from the end.
fn middle_snake(
    old: &[&str],
    new: &[&str],
    forward: &mut Frontier,
    backward: &mut Frontier,
) -> Option<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    forward.set(1, 0);
    backward.set(1, 0);

    for d in 0..max_edit_distance(n, m) as isize {
        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && forward.get(k - 1) < forward.get(k + 1)) {
                forward.get(k + 1)
            } else {
                forward.get(k - 1) + 1
            };
            let y = (x as isize - k) as usize;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix(&old[x..], &new[y..]);
            }
            forward.set(k, x);

            if odd && (k - delta).abs() < d && x + backward.get(delta - k) >= n {
                return Some((x0, y0));
            }
        }

        for k in (-d..=d).rev().step_by(2) {
            let mut x = if k == -d || (k != d && backward.get(k - 1) < backward.get(k + 1)) {
                backward.get(k + 1)
            } else {
                backward.get(k - 1) + 1
            };
            let mut y = (x as isize - k) as usize;
            if x < n && y < m {
                let run = common_suffix(&old[..n - x], &new[..m - y]);
                x += run;
                y += run;
            }
            backward.set(k, x);

            if !odd && (k - delta).abs() <= d && x + forward.get(delta - k) >= n {
                return n.checked_sub(x).zip(m.checked_sub(y));
            }
        }
    }
    None
}

fn common_prefix(a: &[&str], b: &[&str]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[&str], b: &[&str]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Split an edit script into hunks with up to [`CONTEXT`] lines of context.
fn group_opcodes(mut codes: Vec<Opcode>) -> Vec<Vec<Opcode>> {
    if codes.is_empty() {
        codes.push(Opcode { tag: Tag::Equal, a0: 0, a1: 1, b0: 0, b1: 1 });
    }

    if let Some(first) = codes.first_mut().filter(|c| c.tag == Tag::Equal) {
        first.a0 = first.a0.max(first.a1.saturating_sub(CONTEXT));
        first.b0 = first.b0.max(first.b1.saturating_sub(CONTEXT));
    }
    if let Some(last) = codes.last_mut().filter(|c| c.tag == Tag::Equal) {
        last.a1 = last.a1.min(last.a0 + CONTEXT);
        last.b1 = last.b1.min(last.b0 + CONTEXT);
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    for mut op in codes {
        // Long unchanged runs close the current hunk and open the next
        if op.tag == Tag::Equal && op.a1 - op.a0 > 2 * CONTEXT {
            group.push(Opcode {
                a1: op.a1.min(op.a0 + CONTEXT),
                b1: op.b1.min(op.b0 + CONTEXT),
                ..op
            });
            groups.push(std::mem::take(&mut group));
            op.a0 = op.a0.max(op.a1 - CONTEXT);
            op.b0 = op.b0.max(op.b1 - CONTEXT);
        }
        group.push(op);
    }
    if !(group.is_empty() || (group.len() == 1 && group[0].tag == Tag::Equal)) {
        groups.push(group);
    }
    groups
}
