use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no content script responded: {0}")]
    NoResponder(String),
    #[error("timed out after {0} ms waiting for the page")]
    Timeout(u64),
    #[error("a scan is already in flight")]
    Busy,
    #[error("stale response (generation {issued}, current {current})")]
    Stale { issued: u64, current: u64 },
    #[error("store error: {0}")]
    Store(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Page,
    Selection,
}

impl ScanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanMode::Page => "page",
            ScanMode::Selection => "selection",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScanMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page" => Ok(ScanMode::Page),
            "selection" => Ok(ScanMode::Selection),
            other => Err(Error::InvalidInput(format!("unknown scan mode: {other}"))),
        }
    }
}

/// Input to one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mode: ScanMode,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: String::new(),
            title: String::new(),
            mode: ScanMode::Page,
            language: default_language(),
        }
    }
}

/// Category of rhetorical or evidentiary concern.
///
/// This single enum is shared by the span highlighter (which emits it), the report
/// aggregator (which collects it into `flags`) and the DOM applier (which maps it to a
/// marker class), so a highlight can never carry a category the rest of the pipeline
/// does not know.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Exaggeration,
    Sensationalism,
    BiasedLanguage,
    UncitedStatistic,
    SourceAmbiguity,
    MisleadingContext,
    MissingEvidence,
    LanguageBias,
    ProvenFalse,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Exaggeration,
        Category::Sensationalism,
        Category::BiasedLanguage,
        Category::UncitedStatistic,
        Category::SourceAmbiguity,
        Category::MisleadingContext,
        Category::MissingEvidence,
        Category::LanguageBias,
        Category::ProvenFalse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Exaggeration => "exaggeration",
            Category::Sensationalism => "sensationalism",
            Category::BiasedLanguage => "biased_language",
            Category::UncitedStatistic => "uncited_statistic",
            Category::SourceAmbiguity => "source_ambiguity",
            Category::MisleadingContext => "misleading_context",
            Category::MissingEvidence => "missing_evidence",
            Category::LanguageBias => "language_bias",
            Category::ProvenFalse => "proven_false",
        }
    }

    /// CSS class applied to markers of this category.
    pub fn display_class(self) -> &'static str {
        match self {
            Category::ProvenFalse => "factlens-red",
            Category::MissingEvidence => "factlens-blue",
            _ => "factlens-yellow",
        }
    }

    pub fn default_reason(self) -> &'static str {
        match self {
            Category::Exaggeration => "Potential exaggeration",
            Category::Sensationalism => "Likely sensational framing",
            Category::BiasedLanguage => "Potentially biased language",
            Category::UncitedStatistic => "Statistic may lack citation",
            Category::SourceAmbiguity => "Ambiguous source reference",
            Category::MisleadingContext => "Context warning",
            Category::MissingEvidence => "Claim lacks supporting evidence",
            Category::LanguageBias => "Loaded or one-sided wording",
            Category::ProvenFalse => "Contradicted by established fact-checks",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flagged span of the analyzed text.
///
/// `start`/`end` are character offsets into the analyzed text at detection time. They are
/// not stable against the live document; the applier re-locates spans by substring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Highlight {
    pub span: String,
    pub start: usize,
    pub end: usize,
    pub category: Category,
    pub reason: String,
    pub explanation: String,
}

impl Highlight {
    /// Marker tooltip text.
    pub fn tooltip(&self) -> String {
        if self.explanation.is_empty() {
            self.reason.clone()
        } else {
            format!("{}: {}", self.reason, self.explanation)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiasResult {
    pub label: String,
    /// 0 = left, 100 = right.
    pub score: u8,
    pub confidence: f64,
}

impl BiasResult {
    pub fn neutral() -> Self {
        Self {
            label: "Neutral".to_string(),
            score: 50,
            confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSuggestion {
    pub title: String,
    pub url: String,
    pub reliability_score: u8,
    pub reason: String,
    pub evidence_snippet: Option<String>,
    #[serde(rename = "type")]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub initial_score: u8,
    /// 0..=100, higher is more suspicious.
    pub final_score: u8,
    pub model_confidence: f64,
    pub flags: BTreeSet<Category>,
    pub highlights: Vec<Highlight>,
    pub suggested_sources: Vec<SourceSuggestion>,
    pub suggested_search_queries: Vec<String>,
    pub bias: BiasResult,
    pub source_reliability: u8,
    /// Placeholder text; not a paraphrase of the input.
    pub neutral_rewrite: String,
    pub notices: Vec<String>,
}

impl AnalysisReport {
    /// Report used when there is no text to analyze.
    pub fn neutral() -> Self {
        Self {
            initial_score: 50,
            final_score: 50,
            model_confidence: 0.5,
            flags: BTreeSet::new(),
            highlights: Vec::new(),
            suggested_sources: Vec::new(),
            suggested_search_queries: Vec::new(),
            bias: BiasResult::neutral(),
            source_reliability: 50,
            neutral_rewrite: String::new(),
            notices: Vec::new(),
        }
    }

    pub fn band(&self) -> ScoreBand {
        ScoreBand::for_score(self.final_score)
    }
}

/// Display color bucket for a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Green,
    Yellow,
    Red,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        if score >= 80 {
            ScoreBand::Green
        } else if score >= 60 {
            ScoreBand::Yellow
        } else {
            ScoreBand::Red
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Surrounding {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanMeta {
    pub kind: ScanMode,
    pub headline: String,
    pub description: String,
    pub published: Option<String>,
    /// Selection scans only.
    pub surrounding: Option<Surrounding>,
    pub link_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanResult {
    pub text: String,
    pub meta: ScanMeta,
}

/// Messages the analysis side sends to the page side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRequest {
    ScanPage,
    ScanSelection,
    ApplyHighlights { highlights: Vec<Highlight> },
    ToggleHighlights { visible: bool },
}

impl ContentRequest {
    pub fn scan(mode: ScanMode) -> Self {
        match mode {
            ScanMode::Page => ContentRequest::ScanPage,
            ScanMode::Selection => ContentRequest::ScanSelection,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentResponse {
    Scan(ScanResult),
    Ack,
}

/// Request/response link to the content script of one page.
#[async_trait::async_trait]
pub trait ContentChannel: Send + Sync {
    async fn send(&self, req: ContentRequest) -> Result<ContentResponse>;
}

pub const DEFAULT_SNOPES_API_BASE: &str = "https://api.snopes.com/fact-check";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub telemetry: bool,
    #[serde(default)]
    pub snopes_opt_in: bool,
    /// Stored for the options page; never used for network calls.
    #[serde(default)]
    pub snopes_api_key: Option<String>,
    #[serde(default = "default_snopes_api_base")]
    pub snopes_api_base: String,
}

fn default_snopes_api_base() -> String {
    DEFAULT_SNOPES_API_BASE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            telemetry: false,
            snopes_opt_in: false,
            snopes_api_key: None,
            snopes_api_base: default_snopes_api_base(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub url: String,
    pub timestamp_ms: u64,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackTally {
    pub agree_count: u64,
    pub disagree_count: u64,
}

/// Flat key-value persistence (settings, history, feedback).
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}
