//! Pipeline record and knowledge card types.
//!
//! A [`PipelineRecord`] tracks one captured image from upload through
//! analysis to the user's disposition. The nested [`AnalysisResult`] is the
//! structured payload produced by the vision model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Source tag used when the capture client does not send one.
pub const DEFAULT_SOURCE: &str = "shortcut";

/// Current time at the microsecond precision records are persisted with.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ─── Status ─────────────────────────────────────────────────────────────────

/// Lifecycle status of a pipeline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Image archived, waiting for analysis.
    Uploaded,
    /// Analysis finished; `analysis_result` is present.
    Ready,
    /// Analysis failed; `error_message` is present.
    Error,
    /// Kept by the user. Terminal.
    Saved,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Uploaded => "uploaded",
            RecordStatus::Ready => "ready",
            RecordStatus::Error => "error",
            RecordStatus::Saved => "saved",
        }
    }

    /// Whether a record in `self` may move to `next`.
    ///
    /// `ready` and `error` may be re-entered by repeated or retried
    /// processing runs; `saved` is never left.
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        use RecordStatus::*;
        match (self, next) {
            (Uploaded, Ready | Error) => true,
            (Ready, Ready | Error | Saved) => true,
            (Error, Ready | Error) => true,
            _ => false,
        }
    }

    /// Statuses from which a transition into `next` is allowed.
    pub fn sources_for(next: RecordStatus) -> Vec<RecordStatus> {
        [
            RecordStatus::Uploaded,
            RecordStatus::Ready,
            RecordStatus::Error,
            RecordStatus::Saved,
        ]
        .into_iter()
        .filter(|from| from.can_transition_to(next))
        .collect()
    }

    /// Whether records in this status carry an analysis result.
    pub fn has_result(&self) -> bool {
        matches!(self, RecordStatus::Ready | RecordStatus::Saved)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown record status: '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for RecordStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(RecordStatus::Uploaded),
            "ready" => Ok(RecordStatus::Ready),
            "error" => Ok(RecordStatus::Error),
            "saved" => Ok(RecordStatus::Saved),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ─── Cards ──────────────────────────────────────────────────────────────────

/// Kind of knowledge a card carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardType {
    /// Theory or definition.
    Concept,
    /// Deeper thought or interpretation.
    Insight,
    /// How-to or method.
    Tutorial,
    /// Memorable sentence.
    Quote,
    /// Data point or news.
    Fact,
}

impl CardType {
    pub const ALL: [CardType; 5] = [
        CardType::Concept,
        CardType::Insight,
        CardType::Tutorial,
        CardType::Quote,
        CardType::Fact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Concept => "CONCEPT",
            CardType::Insight => "INSIGHT",
            CardType::Tutorial => "TUTORIAL",
            CardType::Quote => "QUOTE",
            CardType::Fact => "FACT",
        }
    }
}

/// A single knowledge card distilled from a screenshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "type")]
    pub card_type: CardType,
    /// Short, catchy title (about 15 characters by convention).
    pub title: String,
    /// One-sentence synopsis.
    pub summary: String,
    /// Body text in light markdown (bold, lists, block quotes, links).
    pub content: String,
    pub tags: Vec<String>,
    /// Hex background color hint for display.
    pub color: String,
}

impl Card {
    /// All free-text fields of the card, in display order.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        [
            self.title.as_str(),
            self.summary.as_str(),
            self.content.as_str(),
        ]
        .into_iter()
        .chain(self.tags.iter().map(String::as_str))
    }
}

/// Structured model output stored on a `ready` record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub cards: Vec<Card>,
}

// ─── Record ─────────────────────────────────────────────────────────────────

/// One captured image moving through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRecord {
    pub id: String,
    /// Durable reference to the archived image. Write-once.
    pub image_ref: String,
    pub status: RecordStatus,
    pub source: String,
    /// Write-once.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of processing runs started for this record.
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
}

impl PipelineRecord {
    /// Creates a freshly uploaded record with a new identifier.
    pub fn new_uploaded(image_ref: impl Into<String>, source: Option<String>) -> Self {
        let now = timestamp_now();
        let source = source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            image_ref: image_ref.into(),
            status: RecordStatus::Uploaded,
            source,
            created_at: now,
            updated_at: now,
            analysis_result: None,
            error_message: None,
            attempts: 0,
            strategy_id: None,
        }
    }

    /// Checks the status/payload invariant: a result is present iff the
    /// status is `ready` or `saved`, and `error` records carry a message.
    pub fn is_consistent(&self) -> bool {
        if self.status.has_result() != self.analysis_result.is_some() {
            return false;
        }
        match self.status {
            RecordStatus::Error => self.error_message.is_some(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            RecordStatus::Uploaded,
            RecordStatus::Ready,
            RecordStatus::Error,
            RecordStatus::Saved,
        ] {
            assert_eq!(status.as_str().parse::<RecordStatus>().unwrap(), status);
        }
        assert!("processing".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_transition_table() {
        use RecordStatus::*;
        assert!(Uploaded.can_transition_to(Ready));
        assert!(Uploaded.can_transition_to(Error));
        assert!(!Uploaded.can_transition_to(Saved));
        assert!(Ready.can_transition_to(Saved));
        assert!(Error.can_transition_to(Ready));
        assert!(!Error.can_transition_to(Saved));
        assert!(!Saved.can_transition_to(Ready));
        assert!(!Saved.can_transition_to(Error));
        assert!(!Ready.can_transition_to(Uploaded));
    }

    #[test]
    fn test_sources_for_ready_excludes_saved() {
        let sources = RecordStatus::sources_for(RecordStatus::Ready);
        assert_eq!(
            sources,
            vec![RecordStatus::Uploaded, RecordStatus::Ready, RecordStatus::Error]
        );
        assert_eq!(
            RecordStatus::sources_for(RecordStatus::Saved),
            vec![RecordStatus::Ready]
        );
    }

    #[test]
    fn test_card_deserializes_uppercase_type() {
        let json = r##"{"type":"QUOTE","title":"t","summary":"s","content":"c","tags":["a"],"color":"#FEF3C7"}"##;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.card_type, CardType::Quote);
        assert_eq!(card.tags, vec!["a".to_string()]);
    }

    #[test]
    fn test_card_rejects_unknown_type() {
        let json = r##"{"type":"RUMOR","title":"t","summary":"s","content":"c","tags":[],"color":"#fff"}"##;
        assert!(serde_json::from_str::<Card>(json).is_err());
    }

    #[test]
    fn test_new_uploaded_timestamps_are_microsecond_precision() {
        let record = PipelineRecord::new_uploaded("https://img/1.jpg", None);
        assert_eq!(record.created_at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_new_uploaded_defaults_source() {
        let record = PipelineRecord::new_uploaded("https://img/1.jpg", None);
        assert_eq!(record.status, RecordStatus::Uploaded);
        assert_eq!(record.source, DEFAULT_SOURCE);
        assert!(record.is_consistent());

        let blank = PipelineRecord::new_uploaded("https://img/2.jpg", Some("  ".into()));
        assert_eq!(blank.source, DEFAULT_SOURCE);

        let tagged = PipelineRecord::new_uploaded("https://img/3.jpg", Some("ios".into()));
        assert_eq!(tagged.source, "ios");
    }

    #[test]
    fn test_consistency_invariant() {
        let mut record = PipelineRecord::new_uploaded("https://img/1.jpg", None);
        record.status = RecordStatus::Ready;
        assert!(!record.is_consistent());
        record.analysis_result = Some(AnalysisResult::default());
        assert!(record.is_consistent());

        record.status = RecordStatus::Error;
        assert!(!record.is_consistent());
        record.analysis_result = None;
        record.error_message = Some("boom".into());
        assert!(record.is_consistent());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = PipelineRecord::new_uploaded("https://img/1.jpg", None);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["imageRef"], "https://img/1.jpg");
        assert_eq!(value["status"], "uploaded");
        assert!(value.get("analysisResult").is_none());
    }
}
