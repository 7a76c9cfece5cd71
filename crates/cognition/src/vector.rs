//! Vector Search - 相似度检索模块
//!
//! 职责：
//! - 线性扫描，逐个计算余弦相似度（无索引）
//! - 稳定降序排序，同分保持候选顺序

use kbridge_core::Assembly;
use std::cmp::Ordering;

/// Sort `(item, score)` pairs by descending score and keep the first `top_k`.
///
/// Stable: ties keep their input order. NaN scores compare as equal.
pub fn rank_descending<T>(mut scored: Vec<(T, f32)>, top_k: usize) -> Vec<(T, f32)> {
    scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    scored
}

/// Score each candidate against `query` and rank.
pub fn scan<'a, I>(query: &Assembly, candidates: I, top_k: usize) -> Vec<(&'a Assembly, f32)>
where
    I: IntoIterator<Item = &'a Assembly>,
{
    if top_k == 0 {
        return Vec::new();
    }
    let scored = candidates
        .into_iter()
        .map(|candidate| (candidate, query.cosine(candidate)))
        .collect();
    rank_descending(scored, top_k)
}
