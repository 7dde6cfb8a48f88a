use super::Section;
use crate::config::LayoutConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answer decision for one question.
///
/// `marked_positions` uses the right-to-left position convention (0 is the
/// rightmost mark) and is ordered most-confident first. `fill_ratios` and
/// `mean_intensities` are aligned to position order, one entry per detected
/// mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDecision {
    /// Global question number (1-based).
    pub question: u32,
    /// Selected positions, highest fill ratio first.
    pub marked_positions: Vec<usize>,
    /// Fill ratio per retained candidate, in position order.
    ///
    /// Holds `candidate_count` entries and is not padded: a row where only
    /// two marks were found has two ratios, so `fill_ratios[3]` may not exist.
    pub fill_ratios: Vec<f32>,
    /// Mean enhanced intensity per retained candidate, aligned with `fill_ratios`.
    pub mean_intensities: Vec<f32>,
    /// Number of retained candidates (at most the per-row mark count).
    pub candidate_count: usize,
    /// Number of accepted candidates before truncation.
    pub accepted_count: usize,
}

impl QuestionDecision {
    /// A single unambiguous answer, if there is one.
    pub fn answer(&self) -> Option<usize> {
        match self.marked_positions.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// More than one position is marked.
    pub fn is_ambiguous(&self) -> bool {
        self.marked_positions.len() > 1
    }

    /// Exactly `expected` marks were found and none were truncated away.
    pub fn is_reliable(&self, expected: usize) -> bool {
        self.candidate_count == expected && self.accepted_count == expected
    }
}

/// Per-section roll-up, mirroring the printed summary of a scanned sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    /// Section being summarised.
    pub section: Section,
    /// First global question number in the section.
    pub first_question: u32,
    /// Last global question number in the section.
    pub last_question: u32,
    /// Questions present in the result with at least one mark.
    pub answered: usize,
    /// Marked positions per question in order; `None` for absent questions.
    pub answers: Vec<Option<Vec<usize>>>,
}

/// All decisions for one sheet, keyed by global question number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetResult {
    /// Decisions in ascending question order.
    pub questions: BTreeMap<u32, QuestionDecision>,
}

impl SheetResult {
    /// Build from decisions; a later duplicate number replaces an earlier one.
    pub fn from_decisions<I: IntoIterator<Item = QuestionDecision>>(decisions: I) -> Self {
        let questions = decisions.into_iter().map(|d| (d.question, d)).collect();
        Self { questions }
    }

    /// Decision for a question, `None` when it was not determined.
    pub fn get(&self, question: u32) -> Option<&QuestionDecision> {
        self.questions.get(&question)
    }

    /// Number of questions present.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// No question was determined.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Iterate decisions in ascending question order.
    pub fn iter(&self) -> impl Iterator<Item = &QuestionDecision> {
        self.questions.values()
    }

    /// Question numbers in `1..=total` with no decision.
    pub fn missing_questions(&self, total: u32) -> Vec<u32> {
        (1..=total)
            .filter(|q| !self.questions.contains_key(q))
            .collect()
    }

    /// Every question in `1..=total` is present.
    pub fn is_complete(&self, total: u32) -> bool {
        self.missing_questions(total).is_empty()
    }

    /// Questions whose candidate count differs from `expected`.
    pub fn unreliable_questions(&self, expected: usize) -> Vec<u32> {
        self.iter()
            .filter(|d| !d.is_reliable(expected))
            .map(|d| d.question)
            .collect()
    }

    /// Complete and every decision reliable.
    pub fn is_trustworthy(&self, total: u32, expected: usize) -> bool {
        self.is_complete(total) && self.unreliable_questions(expected).is_empty()
    }

    /// Summarise one section's questions.
    pub fn section_summary(&self, section: Section, layout: &LayoutConfig) -> SectionSummary {
        let first = section.offset(&layout.offsets) + 1;
        let last = section.offset(&layout.offsets) + layout.rows_per_section;
        let answers: Vec<Option<Vec<usize>>> = (first..=last)
            .map(|q| self.get(q).map(|d| d.marked_positions.clone()))
            .collect();
        let answered = answers
            .iter()
            .filter(|a| a.as_ref().is_some_and(|m| !m.is_empty()))
            .count();
        SectionSummary {
            section,
            first_question: first,
            last_question: last,
            answered,
            answers,
        }
    }
}
