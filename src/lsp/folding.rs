//! Folding ranges merged from the host and the embedded modes.

use std::cmp::Reverse;

use tower_lsp::lsp_types::FoldingRange;

use crate::document::{DocumentState, LanguageId};
use crate::error::Result;
use crate::modes::{Capability, LanguageModes};

/// Host folds plus embedded folds that stay inside their region, at most
/// `limit` of them, sorted by start line.
pub async fn folding_ranges(
    modes: &LanguageModes,
    doc: &DocumentState,
    limit: Option<usize>,
) -> Result<Vec<FoldingRange>> {
    let mut ranges = Vec::new();
    if let Some(host) = modes
        .mode(LanguageId::Html)
        .filter(|m| m.supports(Capability::FoldingRanges))
    {
        ranges = host.get_folding_ranges(doc).await?;
    }
    let host_count = ranges.len();

    for mode in modes.all_modes_in_document(doc) {
        if mode.id() == LanguageId::Html || !mode.supports(Capability::FoldingRanges) {
            continue;
        }
        let spans: Vec<(u32, u32)> = doc
            .regions()
            .regions()
            .iter()
            .filter(|r| r.language == Some(mode.id()) && !r.attribute_value)
            .map(|r| (doc.position_at(r.start).line, doc.position_at(r.end).line))
            .collect();
        for range in mode.get_folding_ranges(doc).await? {
            let inside = spans
                .iter()
                .any(|&(start, end)| range.start_line >= start && range.end_line < end);
            let duplicate = ranges[..host_count]
                .iter()
                .any(|h| h.start_line == range.start_line && h.end_line == range.end_line);
            if inside && !duplicate {
                ranges.push(range);
            }
        }
    }

    ranges.sort_by_key(|r| (r.start_line, r.end_line));
    Ok(match limit {
        Some(limit) if ranges.len() > limit => limit_ranges(ranges, limit),
        _ => ranges,
    })
}

/// Nesting level of each range in `ranges`, in input order.
///
/// A range sharing its start line with a longer one nests inside it.
fn nesting_levels(ranges: &[FoldingRange]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ranges.len()).collect();
    order.sort_by_key(|&i| (ranges[i].start_line, Reverse(ranges[i].end_line)));

    let mut levels = vec![0; ranges.len()];
    let mut parents: Vec<&FoldingRange> = Vec::new();
    for i in order {
        let range = &ranges[i];
        while parents
            .last()
            .is_some_and(|p| !(p.start_line <= range.start_line && range.end_line <= p.end_line))
        {
            parents.pop();
        }
        levels[i] = parents.len();
        parents.push(range);
    }
    levels
}

/// Drop the least nested ranges first, ties by ascending start line, until
/// `limit` remain.
fn limit_ranges(ranges: Vec<FoldingRange>, limit: usize) -> Vec<FoldingRange> {
    let levels = nesting_levels(&ranges);
    let mut order: Vec<usize> = (0..ranges.len()).collect();
    order.sort_by_key(|&i| (levels[i], ranges[i].start_line));
    let mut keep = vec![true; ranges.len()];
    for &i in &order[..ranges.len() - limit] {
        keep[i] = false;
    }
    ranges
        .into_iter()
        .zip(keep)
        .filter_map(|(range, keep)| keep.then_some(range))
        .collect()
}
