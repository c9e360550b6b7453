//! Campaign brief: the identity fields of a workflow run.
//!
//! A brief is fixed when the state is created. No step rewrites it.

use crate::domain::errors::WorkflowError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Marketing objective of the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignGoal {
    Awareness,
    Traffic,
    Engagement,
    Leads,
    AppInstalls,
}

/// Which draft shape an ad platform takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformKind {
    Video,
    Static,
}

impl PlatformKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlatformKind::Video => "Video",
            PlatformKind::Static => "Static",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Target ad placement.
///
/// Unknown values deserialize into [`AdPlatform::Unrecognized`] so that the
/// brief still loads and the failure is raised by the first step that needs
/// a schema, before any model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdPlatform {
    InstagramReels,
    InstagramStories,
    FacebookStories,
    YoutubeShorts,
    TiktokFeed,
    SnapchatSpotlight,
    InstagramFeeds,
    FacebookFeeds,
    Unrecognized(String),
}

impl AdPlatform {
    pub fn as_str(&self) -> &str {
        match self {
            AdPlatform::InstagramReels => "instagram_reels",
            AdPlatform::InstagramStories => "instagram_stories",
            AdPlatform::FacebookStories => "facebook_stories",
            AdPlatform::YoutubeShorts => "youtube_shorts",
            AdPlatform::TiktokFeed => "tiktok_feed",
            AdPlatform::SnapchatSpotlight => "snapchat_spotlight",
            AdPlatform::InstagramFeeds => "instagram_feeds",
            AdPlatform::FacebookFeeds => "facebook_feeds",
            AdPlatform::Unrecognized(raw) => raw,
        }
    }

    /// Classifies the platform into its draft bucket.
    pub fn kind(&self) -> Result<PlatformKind, WorkflowError> {
        match self {
            AdPlatform::InstagramReels
            | AdPlatform::InstagramStories
            | AdPlatform::FacebookStories
            | AdPlatform::YoutubeShorts
            | AdPlatform::TiktokFeed
            | AdPlatform::SnapchatSpotlight => Ok(PlatformKind::Video),
            AdPlatform::InstagramFeeds | AdPlatform::FacebookFeeds => Ok(PlatformKind::Static),
            AdPlatform::Unrecognized(raw) => Err(WorkflowError::UnsupportedPlatform {
                platform: raw.clone(),
            }),
        }
    }
}

impl From<String> for AdPlatform {
    fn from(value: String) -> Self {
        match value.as_str() {
            "instagram_reels" => AdPlatform::InstagramReels,
            "instagram_stories" => AdPlatform::InstagramStories,
            "facebook_stories" => AdPlatform::FacebookStories,
            "youtube_shorts" => AdPlatform::YoutubeShorts,
            "tiktok_feed" => AdPlatform::TiktokFeed,
            "snapchat_spotlight" => AdPlatform::SnapchatSpotlight,
            "instagram_feeds" => AdPlatform::InstagramFeeds,
            "facebook_feeds" => AdPlatform::FacebookFeeds,
            _ => AdPlatform::Unrecognized(value),
        }
    }
}

impl From<AdPlatform> for String {
    fn from(value: AdPlatform) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AdPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportedPlatform {
    Ios,
    Android,
    Web,
}

/// The product being advertised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Product {
    pub product_name: String,
    pub product_description: String,
    /// Feature name to short description.
    pub product_features: BTreeMap<String, String>,
    #[serde(default = "default_supported_platforms")]
    pub supported_platforms: Vec<SupportedPlatform>,
    pub unique_selling_point: Vec<String>,
    pub problems_solved: Vec<String>,
}

fn default_supported_platforms() -> Vec<SupportedPlatform> {
    vec![SupportedPlatform::Ios]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Country {
    Usa,
    Uk,
    Canada,
    Australia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeRange {
    #[serde(rename = "<$30k")]
    Under30k,
    #[serde(rename = "$30k–$60k", alias = "$30k-$60k")]
    From30kTo60k,
    #[serde(rename = "$60k–$100k", alias = "$60k-$100k")]
    From60kTo100k,
    #[serde(rename = "$100k–$200k", alias = "$100k-$200k")]
    From100kTo200k,
    #[serde(rename = ">$200k")]
    Over200k,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    None,
    HighSchool,
    SomeCollege,
    Bachelors,
    Masters,
    Doctorate,
}

/// Who the ad speaks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudiencePersona {
    /// Free-form range such as "25-34".
    pub age_range: String,
    pub gender: Gender,
    pub location: Vec<Country>,
    pub income_range: IncomeRange,
    #[serde(default)]
    pub education_level: Option<EducationLevel>,
    pub lifestyle: Vec<String>,
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub aspiration: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeDirection {
    UserGeneratedContent,
    ProblemSolution,
    Testimonial,
    Lifestyle,
    Educational,
    Motivational,
    ProductInAction,
    Gamification,
    Humor,
    Storytelling,
    DayInLife,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptTone {
    Friendly,
    Conversational,
    Authoritative,
    Energetic,
    Enthusiastic,
    Humorous,
    Emotional,
    Inspirational,
    Motivational,
    Trustworthy,
    Sincere,
    Playful,
    Urgent,
    Dramatic,
    Sophisticated,
    Professional,
    Calm,
    Bold,
    Clever,
    Reassuring,
}

/// Identity fields supplied by the caller when a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignBrief {
    pub campaign_goal: CampaignGoal,
    pub ad_platform: AdPlatform,
    pub product: Product,
    pub product_feature_focus: String,
    pub audience_persona: AudiencePersona,
    pub creative_direction: CreativeDirection,
    pub script_tone: ScriptTone,
}

impl CampaignBrief {
    /// Loads a brief from a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read brief file: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let brief: CampaignBrief = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse brief JSON: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse brief YAML: {}", path.display()))?
        };
        brief.validate()?;
        Ok(brief)
    }

    /// Rejects briefs that cannot produce a meaningful run.
    ///
    /// The ad platform is not checked here. An unknown platform surfaces as
    /// [`WorkflowError::UnsupportedPlatform`] from the first step that needs it.
    pub fn validate(&self) -> Result<()> {
        if self.product.product_name.trim().is_empty() {
            anyhow::bail!("product.product_name must not be empty");
        }
        if self.product_feature_focus.trim().is_empty() {
            anyhow::bail!("product_feature_focus must not be empty");
        }
        if self.audience_persona.location.is_empty() {
            anyhow::bail!("audience_persona.location must name at least one country");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/campaign_tests.rs"]
mod tests;
