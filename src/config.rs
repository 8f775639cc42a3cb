//! Configuration types for question extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The defaults reproduce a run against
//! the published ACT mathematics practice test with output written to
//! `./output`, so `ExtractionConfig::default()` needs no arguments at all.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Public location of the ACT International Subject Test mathematics practice PDF.
pub const DEFAULT_SOURCE_URL: &str =
    "https://www.act.org/content/dam/act/unsecured/documents/AIST-Math-Practice-Test.pdf";

/// Browser-like agent string; act.org rejects some non-browser clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Instruction and passage phrases that look like numbered questions but are not.
pub const DEFAULT_BOILERPLATE_PHRASES: &[&str] = &[
    "Illustrative figures",
    "Geometric figures lie",
    "The word line indicates",
    "Do not linger",
    "If I get a job",
];

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use act_mcq_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .source("act_math.pdf")
///     .output_dir("out")
///     .dpi(150)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Local PDF path or HTTP/HTTPS URL. Default: [`DEFAULT_SOURCE_URL`].
    pub source: String,

    /// Directory receiving the JSON records and page images. Default: `output`.
    pub output_dir: PathBuf,

    /// File name of the JSON records inside `output_dir`. Default: `act_math_questions.json`.
    pub questions_file: String,

    /// Prefix of every `question_id` (`{prefix}_{number}`). Default: `act_math`.
    pub question_id_prefix: String,

    /// Rendering DPI for page images. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 3000.
    ///
    /// Caps the bitmap pdfium allocates when an oversized page meets a high DPI.
    pub max_rendered_pixels: u32,

    /// Write one PNG per page that carries at least one question. Default: true.
    pub render_images: bool,

    /// Heading phrase that opens the answer-key section. Default: `Answer Key`.
    ///
    /// Matched case-insensitively at the start of a line, with any run of
    /// whitespace between words.
    pub answer_key_heading: String,

    /// Last option label; options run from `A` up to this letter. Default: `E`.
    pub last_label: char,

    /// Minimum number of options for a candidate to be kept. Default: 1.
    pub min_options: usize,

    /// Stems containing any of these phrases are dropped as instructions.
    pub boilerplate_phrases: Vec<String>,

    /// Download timeout for URL sources in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// `User-Agent` header sent with the download. Default: [`DEFAULT_USER_AGENT`].
    pub user_agent: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_URL.to_string(),
            output_dir: PathBuf::from("output"),
            questions_file: "act_math_questions.json".to_string(),
            question_id_prefix: "act_math".to_string(),
            dpi: 200,
            max_rendered_pixels: 3000,
            render_images: true,
            answer_key_heading: "Answer Key".to_string(),
            last_label: 'E',
            min_options: 1,
            boilerplate_phrases: DEFAULT_BOILERPLATE_PHRASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            download_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("source", &self.source)
            .field("output_dir", &self.output_dir)
            .field("questions_file", &self.questions_file)
            .field("question_id_prefix", &self.question_id_prefix)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("render_images", &self.render_images)
            .field("answer_key_heading", &self.answer_key_heading)
            .field("last_label", &self.last_label)
            .field("min_options", &self.min_options)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the JSON records file.
    pub fn questions_path(&self) -> PathBuf {
        self.output_dir.join(&self.questions_file)
    }

    /// Option labels in order, `A..=last_label`.
    pub fn labels(&self) -> Vec<char> {
        ('A'..=self.last_label).collect()
    }

    /// Whether `c` is one of the configured option labels.
    pub fn is_label(&self, c: char) -> bool {
        ('A'..=self.last_label).contains(&c)
    }

    /// `question_id` for a question number.
    pub fn question_id(&self, number: u32) -> String {
        format!("{}_{}", self.question_id_prefix, number)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.config.source = source.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn questions_file(mut self, name: impl Into<String>) -> Self {
        self.config.questions_file = name.into();
        self
    }

    pub fn question_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.question_id_prefix = prefix.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.clamp(100, i32::MAX as u32);
        self
    }

    pub fn render_images(mut self, v: bool) -> Self {
        self.config.render_images = v;
        self
    }

    pub fn answer_key_heading(mut self, heading: impl Into<String>) -> Self {
        self.config.answer_key_heading = heading.into();
        self
    }

    pub fn last_label(mut self, label: char) -> Self {
        self.config.last_label = label.to_ascii_uppercase();
        self
    }

    pub fn min_options(mut self, n: usize) -> Self {
        self.config.min_options = n.max(1);
        self
    }

    pub fn boilerplate_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.boilerplate_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if !('B'..='Z').contains(&c.last_label) {
            return Err(ExtractError::InvalidConfig(format!(
                "Last option label must be a letter B–Z, got {:?}",
                c.last_label
            )));
        }
        if c.min_options > c.labels().len() {
            return Err(ExtractError::InvalidConfig(format!(
                "min_options ({}) exceeds the {} available labels",
                c.min_options,
                c.labels().len()
            )));
        }
        if c.answer_key_heading.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Answer key heading must not be empty".into(),
            ));
        }
        if c.questions_file.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Questions file name must not be empty".into(),
            ));
        }
        if c.source.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("Source must not be empty".into()));
        }
        Ok(self.config)
    }
}
