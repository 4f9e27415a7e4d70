//! Vector similarity and ranking utilities.

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank items by cosine similarity to `query`.
///
/// `items` yields `(sequence, embedding, value)`; the sequence number breaks
/// ties so equal scores keep insertion order. Items below `min_score` are
/// dropped and at most `limit` are returned, best first.
pub fn rank_by_similarity<'a, T, I>(
    items: I,
    query: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<(f32, T)>
where
    I: IntoIterator<Item = (u64, &'a [f32], T)>,
{
    let mut scored: Vec<(f32, u64, T)> = items
        .into_iter()
        .filter_map(|(seq, embedding, value)| {
            let sim = cosine_similarity(embedding, query);
            (sim >= min_score).then_some((sim, seq, value))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    scored.truncate(limit);
    scored.into_iter().map(|(sim, _, value)| (sim, value)).collect()
}
