//! Content ranking: choose which blocks make it onto the page

use crate::config::SelectionConfig;
use crate::error::{Result, ResumeTailorError};
use crate::llm::prompts::{PromptTemplates, SYSTEM_PROMPT};
use crate::llm::response::{extract_integer, extract_json};
use crate::llm::{complete_structured, LlmClient, LlmRequest};
use crate::processing::document::{
    BlockCategory, JobRequirement, PageBudget, RankedSelection, ResumeBlock,
};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RankerSettings {
    pub pinned_categories: Vec<BlockCategory>,
    pub budget: PageBudget,
    pub llm_threshold: bool,
    pub default_threshold: usize,
}

impl RankerSettings {
    pub fn from_config(selection: &SelectionConfig) -> Self {
        Self {
            pinned_categories: selection.pinned_categories.clone(),
            budget: PageBudget {
                max_blocks: selection.max_blocks,
                max_chars: selection.max_chars,
            },
            llm_threshold: selection.llm_threshold,
            default_threshold: selection.default_threshold,
        }
    }
}

/// Ranking as returned by the LLM, before id validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RankingReply {
    #[serde(default)]
    pub must_include: Vec<String>,
    #[serde(default)]
    pub ranked_list: Vec<RankedEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedEntry {
    pub block_id: String,
    #[serde(default)]
    pub rank: Option<f64>,
}

pub struct ContentRanker<'a, L: LlmClient> {
    llm: &'a L,
    settings: RankerSettings,
    prompts: PromptTemplates,
}

impl<'a, L: LlmClient> ContentRanker<'a, L> {
    pub fn new(llm: &'a L, settings: RankerSettings) -> Self {
        Self {
            llm,
            settings,
            prompts: PromptTemplates::default(),
        }
    }

    pub async fn rank(
        &self,
        blocks: &[ResumeBlock],
        requirements: &[JobRequirement],
    ) -> Result<RankedSelection> {
        if blocks.is_empty() {
            return Err(ResumeTailorError::InvalidInput(
                "No resume blocks to rank".to_string(),
            ));
        }

        let (pinned, candidates): (Vec<ResumeBlock>, Vec<ResumeBlock>) = blocks
            .iter()
            .cloned()
            .partition(|b| self.settings.pinned_categories.contains(&b.category));
        debug!(
            "{} pinned blocks, {} candidates for ranking",
            pinned.len(),
            candidates.len()
        );

        if candidates.is_empty() {
            return Ok(RankedSelection::assemble(pinned, Vec::new(), self.settings.budget));
        }

        let request = LlmRequest::new(
            SYSTEM_PROMPT,
            self.prompts.render_rank_blocks(&candidates, requirements),
        );
        let reply = complete_structured(self.llm, &request, interpret_ranking).await?;
        let (must_include, ranked) = resolve_ranking(&reply, &candidates);

        let cutoff = if self.settings.llm_threshold && !ranked.is_empty() {
            self.threshold(&must_include, &ranked).await?
        } else {
            ranked.len()
        };

        let mut ordered = must_include;
        let mut excluded = Vec::new();
        for (i, block) in ranked.into_iter().enumerate() {
            if i < cutoff {
                ordered.push(block);
            } else {
                excluded.push(block);
            }
        }
        let included_count = ordered.len();
        ordered.extend(excluded);

        let selection = RankedSelection::assemble(pinned, ordered, self.settings.budget);
        info!(
            "Selected {} of {} blocks ({} ranked blocks above the cutoff)",
            selection.len(),
            blocks.len(),
            included_count
        );
        Ok(trim_to_cutoff(selection, included_count))
    }

    /// Ask how many ranked blocks fit; falls back to the configured default.
    async fn threshold(&self, must_include: &[ResumeBlock], ranked: &[ResumeBlock]) -> Result<usize> {
        let must: Vec<&ResumeBlock> = must_include.iter().collect();
        let numbered: Vec<(usize, &ResumeBlock)> =
            ranked.iter().enumerate().map(|(i, b)| (i + 1, b)).collect();
        let request = LlmRequest::new(SYSTEM_PROMPT, self.prompts.render_threshold(&must, &numbered));

        let reply = self.llm.complete(&request).await?;
        let cutoff = match extract_integer(&reply) {
            Some(n) => n,
            None => {
                warn!(
                    "Threshold reply had no number, using default {}",
                    self.settings.default_threshold
                );
                self.settings.default_threshold
            }
        };
        debug!("Rank cutoff {}", cutoff);
        Ok(cutoff.min(ranked.len()))
    }
}

pub fn interpret_ranking(reply: &str) -> Result<RankingReply> {
    let value = extract_json(reply)?;
    let ranking: RankingReply = serde_json::from_value(value).map_err(|e| {
        ResumeTailorError::MalformedResponse(format!("Ranking reply has the wrong shape: {}", e))
    })?;
    if ranking.must_include.is_empty() && ranking.ranked_list.is_empty() {
        return Err(ResumeTailorError::MalformedResponse(
            "Ranking reply selected no blocks".to_string(),
        ));
    }
    Ok(ranking)
}

/// Map ranked ids back to candidate blocks.
///
/// Unknown ids and repeats are dropped. Ranked entries are ordered by their
/// rank number when one is given, otherwise by list position.
pub fn resolve_ranking(
    reply: &RankingReply,
    candidates: &[ResumeBlock],
) -> (Vec<ResumeBlock>, Vec<ResumeBlock>) {
    let mut seen = HashSet::new();
    let mut lookup = |id: &str| -> Option<ResumeBlock> {
        let id = id.trim();
        match candidates.iter().find(|b| b.id == id) {
            Some(block) if seen.insert(block.id.clone()) => Some(block.clone()),
            Some(_) => {
                debug!("Dropping repeated block id {}", id);
                None
            }
            None => {
                warn!("LLM ranked unknown block id {}", id);
                None
            }
        }
    };

    let must_include: Vec<ResumeBlock> = reply.must_include.iter().filter_map(|id| lookup(id)).collect();

    let mut entries: Vec<(usize, &RankedEntry)> = reply.ranked_list.iter().enumerate().collect();
    entries.sort_by(|(ia, a), (ib, b)| {
        let ra = a.rank.unwrap_or(f64::MAX);
        let rb = b.rank.unwrap_or(f64::MAX);
        ra.total_cmp(&rb).then(ia.cmp(ib))
    });
    let ranked: Vec<ResumeBlock> = entries
        .into_iter()
        .filter_map(|(_, entry)| lookup(&entry.block_id))
        .collect();

    (must_include, ranked)
}

/// Blocks past the rank cutoff stay available to feedback but are not placed.
fn trim_to_cutoff(mut selection: RankedSelection, included_count: usize) -> RankedSelection {
    let beyond: Vec<String> = selection
        .droppable()
        .skip(included_count)
        .map(|b| b.id.clone())
        .collect();
    for id in beyond.iter().rev() {
        selection.drop_block(id);
    }
    selection
}
