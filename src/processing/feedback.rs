//! Visual feedback: critique rendered pages and adjust layout or content

use crate::config::FeedbackConfig;
use crate::error::{Result, ResumeTailorError};
use crate::llm::prompts::{CritiqueParams, PromptTemplates, SYSTEM_PROMPT};
use crate::llm::response::extract_json;
use crate::llm::{complete_structured, ImageAttachment, LlmClient, LlmRequest};
use crate::processing::document::RankedSelection;
use crate::typeset::{LayoutSettings, RenderedDocument, ResumeBuilder, Typesetter};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many block ids of each kind the critique prompt names
const CONTEXT_BLOCKS: usize = 3;

/// Structured verdict returned by the LLM for one rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub acceptable: bool,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub font_size_pt: Option<f64>,
    #[serde(default)]
    pub margin_in: Option<f64>,
    #[serde(default)]
    pub item_sep_pt: Option<f64>,
    #[serde(default)]
    pub drop_blocks: Vec<String>,
    #[serde(default)]
    pub add_blocks: Vec<String>,
}

pub fn interpret_critique(reply: &str) -> Result<Critique> {
    let value = extract_json(reply)?;
    serde_json::from_value(value).map_err(|e| {
        ResumeTailorError::MalformedResponse(format!("Critique reply has the wrong shape: {}", e))
    })
}

/// What one pass actually changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedChanges {
    pub layout: LayoutSettings,
    pub dropped: Vec<String>,
    pub added: Vec<String>,
    /// Set when the loop removed a block itself because the page was over-full.
    pub forced_drop: Option<String>,
}

impl AppliedChanges {
    fn is_empty(&self, previous: &LayoutSettings) -> bool {
        self.layout == *previous
            && self.dropped.is_empty()
            && self.added.is_empty()
            && self.forced_drop.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackPass {
    pub iteration: u32,
    pub page_count: usize,
    pub critique: Critique,
    pub changes: Option<AppliedChanges>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Disabled,
    Accepted,
    IterationCapReached,
    NoFurtherChange,
}

impl fmt::Display for FeedbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FeedbackOutcome::Disabled => "feedback disabled",
            FeedbackOutcome::Accepted => "layout accepted",
            FeedbackOutcome::IterationCapReached => "iteration cap reached",
            FeedbackOutcome::NoFurtherChange => "no further change possible",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackResult {
    pub document: RenderedDocument,
    pub selection: RankedSelection,
    pub layout: LayoutSettings,
    pub outcome: FeedbackOutcome,
    pub passes: Vec<FeedbackPass>,
}

pub struct VisualFeedbackLoop<'a, L: LlmClient, T: Typesetter> {
    llm: &'a L,
    typesetter: &'a T,
    builder: &'a ResumeBuilder,
    settings: FeedbackConfig,
    vision_model: Option<String>,
    prompts: PromptTemplates,
}

impl<'a, L: LlmClient, T: Typesetter> VisualFeedbackLoop<'a, L, T> {
    pub fn new(llm: &'a L, typesetter: &'a T, builder: &'a ResumeBuilder, settings: FeedbackConfig) -> Self {
        Self {
            llm,
            typesetter,
            builder,
            settings,
            vision_model: None,
            prompts: PromptTemplates::default(),
        }
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    /// Critique and revise until accepted, stuck, or out of iterations.
    ///
    /// Never runs more than `max_iterations` critiques.
    pub async fn run(
        &self,
        mut selection: RankedSelection,
        mut layout: LayoutSettings,
        mut document: RenderedDocument,
    ) -> Result<FeedbackResult> {
        let max_iterations = if self.settings.enabled {
            self.settings.max_iterations
        } else {
            0
        };
        let mut passes = Vec::new();
        let mut outcome = if max_iterations == 0 {
            FeedbackOutcome::Disabled
        } else {
            FeedbackOutcome::IterationCapReached
        };

        for iteration in 1..=max_iterations {
            if document.page_images.is_empty() {
                document.page_images = self.typesetter.rasterize(&document.pdf).await?;
            }
            let critique = self.critique(&selection, &layout, &document).await?;
            let fits = document.page_count <= self.settings.max_pages;
            info!(
                "Feedback pass {}: {} page(s), acceptable={}: {}",
                iteration, document.page_count, critique.acceptable, critique.summary
            );

            if critique.acceptable && fits {
                passes.push(FeedbackPass {
                    iteration,
                    page_count: document.page_count,
                    critique,
                    changes: None,
                });
                outcome = FeedbackOutcome::Accepted;
                break;
            }
            if critique.acceptable {
                warn!(
                    "Critique accepted a {}-page document; limit is {}",
                    document.page_count, self.settings.max_pages
                );
            }

            let changes = self.apply(&critique, &mut selection, &layout, fits);
            let unchanged = changes.is_empty(&layout);
            passes.push(FeedbackPass {
                iteration,
                page_count: document.page_count,
                critique,
                changes: Some(changes.clone()),
            });
            if unchanged {
                outcome = FeedbackOutcome::NoFurtherChange;
                break;
            }

            layout = changes.layout;
            let source = self.builder.build(&selection, &layout)?;
            document = self.typesetter.compile(&source).await?;
        }

        info!("Feedback finished after {} pass(es): {}", passes.len(), outcome);
        Ok(FeedbackResult {
            document,
            selection,
            layout,
            outcome,
            passes,
        })
    }

    async fn critique(
        &self,
        selection: &RankedSelection,
        layout: &LayoutSettings,
        document: &RenderedDocument,
    ) -> Result<Critique> {
        let mut least_important: Vec<String> = selection.droppable().map(|b| b.id.clone()).collect();
        least_important.reverse();
        least_important.truncate(CONTEXT_BLOCKS);

        let params = CritiqueParams {
            page_count: document.page_count,
            max_pages: self.settings.max_pages,
            font_size_pt: layout.font_size_pt,
            margin_in: layout.margin_in,
            item_sep_pt: layout.item_sep_pt,
            least_important_included: least_important,
            most_important_excluded: selection
                .excluded()
                .iter()
                .take(CONTEXT_BLOCKS)
                .map(|b| b.id.clone())
                .collect(),
        };

        let images = document
            .page_images
            .iter()
            .cloned()
            .map(ImageAttachment::png)
            .collect();
        let mut request =
            LlmRequest::new(SYSTEM_PROMPT, self.prompts.render_critique(&params)).with_images(images);
        if let Some(model) = &self.vision_model {
            request = request.with_model(model.clone());
        }

        complete_structured(self.llm, &request, interpret_critique).await
    }

    /// Apply a critique without generating any text: clamp layout values,
    /// drop selected non-pinned blocks, re-add excluded ones.
    fn apply(
        &self,
        critique: &Critique,
        selection: &mut RankedSelection,
        layout: &LayoutSettings,
        fits: bool,
    ) -> AppliedChanges {
        let proposed = LayoutSettings {
            font_size_pt: critique.font_size_pt.unwrap_or(layout.font_size_pt),
            margin_in: critique.margin_in.unwrap_or(layout.margin_in),
            item_sep_pt: critique.item_sep_pt.unwrap_or(layout.item_sep_pt),
        }
        .clamped(&self.settings);

        let mut dropped = Vec::new();
        for id in &critique.drop_blocks {
            if selection.drop_block(id) {
                dropped.push(id.clone());
            } else {
                debug!("Ignoring drop of {}: not a droppable selected block", id);
            }
        }

        let mut added = Vec::new();
        for id in &critique.add_blocks {
            if selection.add_block(id) {
                added.push(id.clone());
            } else {
                debug!("Ignoring add of {}: not an excluded block or over budget", id);
            }
        }

        let mut changes = AppliedChanges {
            layout: proposed,
            dropped,
            added,
            forced_drop: None,
        };

        if !fits && changes.is_empty(layout) {
            let last = selection.droppable().last().map(|b| b.id.clone());
            if let Some(id) = last {
                if selection.drop_block(&id) {
                    info!("Over length with no usable suggestion; dropping {}", id);
                    changes.forced_drop = Some(id);
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::mock::ScriptedLlm;
    use crate::processing::document::{BlockCategory, PageBudget, ResumeBlock};
    use crate::typeset::fake::FakeTypesetter;
    use crate::typeset::TemplateStore;

    fn builder() -> ResumeBuilder {
        ResumeBuilder::new(TemplateStore::default().load("classic").unwrap())
    }

    fn selection() -> RankedSelection {
        let contact = ResumeBlock::new(1, BlockCategory::ContactInformation, None, "Jane Doe".to_string());
        let jobs: Vec<_> = (2..=4)
            .map(|i| {
                ResumeBlock::new(
                    i,
                    BlockCategory::WorkExperience,
                    Some(format!("Role {}", i)),
                    "- One\n- Two".to_string(),
                )
            })
            .collect();
        RankedSelection::assemble(vec![contact], jobs, PageBudget::default())
    }

    fn layout() -> LayoutSettings {
        LayoutSettings::from_config(&Config::default().template)
    }

    async fn render<T: Typesetter>(typesetter: &T, selection: &RankedSelection) -> RenderedDocument {
        typesetter
            .compile(&builder().build(selection, &layout()).unwrap())
            .await
            .unwrap()
    }

    fn settings(max_iterations: u32) -> FeedbackConfig {
        FeedbackConfig {
            max_iterations,
            ..Config::default().feedback
        }
    }

    #[test]
    fn test_interpret_critique_defaults() {
        let critique = interpret_critique(r#"{"acceptable": false, "font_size_pt": 10}"#).unwrap();
        assert_eq!(critique.font_size_pt, Some(10.0));
        assert!(critique.drop_blocks.is_empty());
        assert!(matches!(
            interpret_critique(r#"{"summary": "missing verdict"}"#),
            Err(ResumeTailorError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_accepts_fitting_document() {
        let typesetter = FakeTypesetter::new(40);
        let selection = selection();
        let document = render(&typesetter, &selection).await;
        let llm = ScriptedLlm::new().reply(r#"{"acceptable": true, "summary": "Looks clean"}"#);
        let builder = builder();

        let result = VisualFeedbackLoop::new(&llm, &typesetter, &builder, settings(3))
            .with_vision_model("vision")
            .run(selection, layout(), document)
            .await
            .unwrap();

        assert_eq!(result.outcome, FeedbackOutcome::Accepted);
        assert_eq!(result.passes.len(), 1);
        let request = &llm.requests()[0];
        assert_eq!(request.images.len(), 1);
        assert_eq!(request.model.as_deref(), Some("vision"));
    }

    #[tokio::test]
    async fn test_acceptance_ignored_when_over_length() {
        // 3 headings + 6 items = 9 lines; 4 lines per page gives 3 pages.
        let typesetter = FakeTypesetter::new(4);
        let selection = selection();
        let document = render(&typesetter, &selection).await;
        assert_eq!(document.page_count, 3);

        let llm = ScriptedLlm::new()
            .reply(r#"{"acceptable": true, "summary": "fine"}"#)
            .reply(r#"{"acceptable": true, "summary": "fine"}"#)
            .reply(r#"{"acceptable": true, "summary": "fine"}"#);
        let builder = builder();
        let result = VisualFeedbackLoop::new(&llm, &typesetter, &builder, settings(3))
            .run(selection, layout(), document)
            .await
            .unwrap();

        // Two forced drops bring it to one page, then the third critique is honored.
        assert_eq!(result.outcome, FeedbackOutcome::Accepted);
        assert_eq!(result.document.page_count, 1);
        let forced: Vec<_> = result
            .passes
            .iter()
            .filter_map(|p| p.changes.as_ref().and_then(|c| c.forced_drop.clone()))
            .collect();
        assert_eq!(forced, vec!["block_4", "block_3"]);
        assert!(result.selection.contains("block_1"));
    }

    #[tokio::test]
    async fn test_pinned_blocks_survive_drop_requests() {
        let typesetter = FakeTypesetter::new(40);
        let selection = selection();
        let document = render(&typesetter, &selection).await;
        let llm = ScriptedLlm::new()
            .reply(r#"{"acceptable": false, "summary": "drop", "drop_blocks": ["block_1", "block_9"]}"#);
        let builder = builder();

        let result = VisualFeedbackLoop::new(&llm, &typesetter, &builder, settings(1))
            .run(selection, layout(), document)
            .await
            .unwrap();

        assert_eq!(result.outcome, FeedbackOutcome::NoFurtherChange);
        assert!(result.selection.contains("block_1"));
        assert_eq!(result.selection.len(), 4);
    }

    #[tokio::test]
    async fn test_layout_changes_are_clamped_and_loop_terminates() {
        let typesetter = FakeTypesetter::new(40);
        let selection = selection();
        let document = render(&typesetter, &selection).await;
        let llm = ScriptedLlm::new()
            .reply(r#"{"acceptable": false, "summary": "tighter", "font_size_pt": 2, "margin_in": 0.5}"#)
            .reply(r#"{"acceptable": false, "summary": "tighter", "item_sep_pt": 3}"#);
        let builder = builder();

        let result = VisualFeedbackLoop::new(&llm, &typesetter, &builder, settings(2))
            .run(selection, layout(), document)
            .await
            .unwrap();

        assert_eq!(result.outcome, FeedbackOutcome::IterationCapReached);
        assert_eq!(result.passes.len(), 2);
        assert_eq!(result.layout.font_size_pt, 9.0);
        assert_eq!(result.layout.margin_in, 0.5);
        assert_eq!(result.layout.item_sep_pt, 3.0);
        assert!(result.document.source.contains("margin=0.5in"));
        assert_eq!(llm.remaining(), 0);
    }

    #[tokio::test]
    async fn test_zero_iterations_disables_loop() {
        let typesetter = FakeTypesetter::new(40);
        let selection = selection();
        let document = render(&typesetter, &selection).await;
        let llm = ScriptedLlm::new();
        let builder = builder();

        let result = VisualFeedbackLoop::new(&llm, &typesetter, &builder, settings(0))
            .run(selection, layout(), document)
            .await
            .unwrap();

        assert_eq!(result.outcome, FeedbackOutcome::Disabled);
        assert_eq!(llm.call_count(), 0);
    }
}
