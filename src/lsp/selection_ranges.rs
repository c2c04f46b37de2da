//! Selection ranges: embedded chains grafted onto the host chain.

use std::sync::Arc;

use tower_lsp::lsp_types::{Position, Range, SelectionRange};

use crate::document::{DocumentState, LanguageId};
use crate::error::Result;
use crate::modes::{Capability, LanguageMode, LanguageModes};
use crate::services::selection_chain;

/// One chain per position, index aligned with `positions`.
pub async fn selection_ranges(
    modes: &LanguageModes,
    doc: &DocumentState,
    positions: &[Position],
) -> Result<Vec<SelectionRange>> {
    let mut chains: Vec<SelectionRange> = match modes
        .mode(LanguageId::Html)
        .filter(|m| m.supports(Capability::SelectionRanges))
    {
        Some(host) => host.get_selection_ranges(doc, positions).await?,
        None => Vec::new(),
    };
    if chains.len() != positions.len() {
        chains = positions.iter().map(|p| empty(*p)).collect();
    }

    let mut groups: Vec<(Arc<dyn LanguageMode>, Vec<usize>)> = Vec::new();
    for (i, position) in positions.iter().enumerate() {
        let Some(mode) = modes.mode_at_position(doc, *position) else {
            continue;
        };
        if mode.id() == LanguageId::Html || !mode.supports(Capability::SelectionRanges) {
            continue;
        }
        match groups.iter_mut().find(|(m, _)| m.id() == mode.id()) {
            Some((_, indices)) => indices.push(i),
            None => groups.push((mode, vec![i])),
        }
    }

    for (mode, indices) in groups {
        let subset: Vec<Position> = indices.iter().map(|&i| positions[i]).collect();
        let embedded = mode.get_selection_ranges(doc, &subset).await?;
        for (i, chain) in indices.into_iter().zip(embedded) {
            chains[i] = graft(&chain, &chains[i]);
        }
    }
    Ok(chains)
}

fn empty(position: Position) -> SelectionRange {
    SelectionRange {
        range: Range::new(position, position),
        parent: None,
    }
}

fn ranges(chain: &SelectionRange) -> impl Iterator<Item = Range> + '_ {
    std::iter::successors(Some(chain), |c| c.parent.as_deref()).map(|c| c.range)
}

/// `inner` followed by the parts of `outer` that enclose it.
fn graft(inner: &SelectionRange, outer: &SelectionRange) -> SelectionRange {
    selection_chain(ranges(inner).chain(ranges(outer))).unwrap_or_else(|| outer.clone())
}
