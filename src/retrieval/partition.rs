//! Fragment partitioning and combination enumeration
//!
//! A document is cut into N sentence groups. Scoring a document through the average of
//! its C(N, k) fragment combinations dilutes any single poisoned fragment.

/// Split on whitespace that follows a sentence terminator (`.`, `!` or `?`)
pub fn split_sentences(content: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;
    let mut chars = content.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.') | Some('!') | Some('?')) {
            let sentence = content[start..idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            // swallow the rest of the whitespace run
            let mut end = idx + c.len_utf8();
            while let Some(&(next_idx, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                end = next_idx + next.len_utf8();
                chars.next();
            }
            start = end;
            prev = None;
            continue;
        }
        prev = Some(c);
    }

    let tail = content[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Split `content` into exactly `num_partitions` fragments
///
/// With no more sentences than partitions, each sentence is its own fragment and the
/// rest are padded with empty strings. Otherwise sentences are spread as evenly as
/// possible, earlier fragments taking the remainder. Empty content yields no fragments.
pub fn partition_document(content: &str, num_partitions: usize) -> Vec<String> {
    if content.is_empty() || num_partitions == 0 {
        return Vec::new();
    }

    let sentences = split_sentences(content);
    let mut fragments = Vec::with_capacity(num_partitions);

    if sentences.len() <= num_partitions {
        fragments.extend(sentences);
        fragments.resize(num_partitions, String::new());
    } else {
        let per_partition = sentences.len() / num_partitions;
        let remainder = sentences.len() % num_partitions;

        let mut iter = sentences.into_iter();
        for i in 0..num_partitions {
            let count = per_partition + usize::from(i < remainder);
            let fragment: Vec<String> = iter.by_ref().take(count).collect();
            fragments.push(fragment.join(" "));
        }
    }

    tracing::debug!("Partitioned document into {} fragments", fragments.len());
    fragments
}

/// All k-element index combinations of `0..n`, in lexicographic order
pub fn generate_combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn helper(n: usize, k: usize, start: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            current.push(i);
            helper(n, k, i + 1, current, out);
            current.pop();
        }
    }

    let mut out = Vec::new();
    helper(n, k, 0, &mut Vec::with_capacity(k), &mut out);
    out
}

/// Text of one combination: its non-empty fragments joined by spaces. `None` when empty.
pub fn combination_text(fragments: &[String], combination: &[usize]) -> Option<String> {
    let parts: Vec<&str> = combination
        .iter()
        .filter_map(|&i| fragments.get(i))
        .map(|f| f.as_str())
        .filter(|f| !f.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
