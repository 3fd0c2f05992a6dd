//! Entity shapes as stored in the document collections.
//!
//! Stored documents use camelCase field names. Decoding is lenient: list
//! fields tolerate `null` and comma-joined strings, timestamps tolerate
//! epoch millis, RFC 3339 strings or nothing, and unknown enum values fall
//! back to a default instead of failing the whole record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::text::split_list;

pub const TOOL_STATUS_ACTIVE: &str = "active";
pub const SUBMISSION_STATUS_REJECTED: &str = "rejected";
pub const ANONYMOUS_SUBMITTER: &str = "anonymous";

pub const DEFAULT_TOOL_CATEGORY: &str = "text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolPricing {
    Free,
    Freemium,
    Paid,
    Subscription,
    Enterprise,
}

impl ToolPricing {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolPricing::Free => "free",
            ToolPricing::Freemium => "freemium",
            ToolPricing::Paid => "paid",
            ToolPricing::Subscription => "subscription",
            ToolPricing::Enterprise => "enterprise",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(ToolPricing::Free),
            "freemium" => Some(ToolPricing::Freemium),
            "paid" => Some(ToolPricing::Paid),
            "subscription" => Some(ToolPricing::Subscription),
            "enterprise" | "contact" => Some(ToolPricing::Enterprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ToolStatus {
    #[default]
    Active,
    Beta,
    Discontinued,
}

impl ToolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolStatus::Active => TOOL_STATUS_ACTIVE,
            ToolStatus::Beta => "beta",
            ToolStatus::Discontinued => "discontinued",
        }
    }
}

impl From<String> for ToolStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beta" => ToolStatus::Beta,
            "discontinued" | "archived" => ToolStatus::Discontinued,
            _ => ToolStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub website_url: String,
    /// Possibly comma-joined; the first segment is the primary category.
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, deserialize_with = "pricing_list")]
    pub pricing: Vec<ToolPricing>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub pros: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub cons: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub alternatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_link: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub sponsored: bool,
    #[serde(default)]
    pub status: ToolStatus,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub featured: bool,
    #[serde(default, deserialize_with = "lenient_count")]
    pub view_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    #[serde(
        default,
        with = "crate::timestamp::lenient_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    pub fn primary_category(&self) -> &str {
        crate::text::primary_category(&self.category)
    }

    pub fn is_active(&self) -> bool {
        self.status == ToolStatus::Active
    }
}

/// Caller-supplied fields for a new tool. Server fields (`id`, timestamps,
/// `viewCount`) are stamped by the store layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTool {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, deserialize_with = "pricing_list")]
    pub pricing: Vec<ToolPricing>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub pros: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub cons: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub alternatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_link: Option<String>,
    #[serde(default)]
    pub sponsored: bool,
    #[serde(default)]
    pub status: ToolStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<i64>,
}

/// Partial tool update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Vec<ToolPricing>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pros: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cons: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsored: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<i64>,
}

/// Staging copy of a publicly submitted tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSubmission {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub website_url: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "pricing_list")]
    pub pricing: Vec<ToolPricing>,
    #[serde(default, deserialize_with = "string_list")]
    pub tags: Vec<String>,
    /// `beta` while pending, `rejected` once moderated away.
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub approved: bool,
    #[serde(default = "anonymous_submitter")]
    pub submitted_by: String,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(
        default,
        with = "crate::timestamp::lenient_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Pending,
    Rejected,
}

impl ToolSubmission {
    pub fn state(&self) -> SubmissionState {
        if self.status.eq_ignore_ascii_case(SUBMISSION_STATUS_REJECTED) {
            SubmissionState::Rejected
        } else {
            SubmissionState::Pending
        }
    }
}

fn anonymous_submitter() -> String {
    ANONYMOUS_SUBMITTER.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum BlogStatus {
    #[default]
    Draft,
    Published,
}

impl BlogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BlogStatus::Draft => "DRAFT",
            BlogStatus::Published => "PUBLISHED",
        }
    }
}

impl From<String> for BlogStatus {
    fn from(raw: String) -> Self {
        if raw.trim().eq_ignore_ascii_case("published") {
            BlogStatus::Published
        } else {
            BlogStatus::Draft
        }
    }
}

/// How a post body should be rendered. Inferred at read time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Html,
    Markdown,
    Plain,
}

/// Canonical blog post, produced by normalizing either stored shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: String,
    pub status: BlogStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub view_count: i64,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub updated_at: DateTime<Utc>,
}

const MARKDOWN_MARKERS: &[&str] = &["# ", "## ", "**", "```", "- ", "* ", "](", "> "];

impl BlogPost {
    pub fn is_published(&self) -> bool {
        self.status == BlogStatus::Published
    }

    pub fn content_format(&self) -> ContentFormat {
        let body = self.content.trim_start();
        if body.starts_with('<') || (body.contains("</") && body.contains('>')) {
            ContentFormat::Html
        } else if body
            .lines()
            .any(|line| MARKDOWN_MARKERS.iter().any(|m| line.trim_start().starts_with(m)))
            || body.contains("](")
            || body.contains("**")
        {
            ContentFormat::Markdown
        } else {
            ContentFormat::Plain
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlogPost {
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub status: BlogStatus,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BlogStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub tool_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub tool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "crate::timestamp::lenient_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookmark {
    pub user_id: String,
    pub tool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Lifecycle shared by the intake entities. Every entity starts at its
/// `new` state; administrators move it forward.
pub trait IntakeStatus: Copy + PartialEq + Serialize + Send + Sync {
    fn as_str(self) -> &'static str;
    fn is_new(self) -> bool;
}

macro_rules! intake_status {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(from = "String", into = "&'static str")]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl IntakeStatus for $name {
            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn is_new(self) -> bool {
                self == Self::default()
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                let raw = raw.trim().to_ascii_lowercase();
                $(if raw == $wire {
                    return $name::$variant;
                })+
                Self::default()
            }
        }

        impl From<$name> for &'static str {
            fn from(status: $name) -> Self {
                status.as_str()
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let wanted = raw.trim().to_ascii_lowercase();
                $(if wanted == $wire {
                    return Ok($name::$variant);
                })+
                Err(format!("unknown {} `{raw}`", stringify!($name)))
            }
        }
    };
}

intake_status!(FeedbackStatus {
    New => "new",
    InProgress => "in-progress",
    Resolved => "resolved",
    Closed => "closed",
});

intake_status!(ReportStatus {
    New => "new",
    Reviewing => "reviewing",
    Resolved => "resolved",
});

intake_status!(ContactStatus {
    New => "new",
    Read => "read",
    Replied => "replied",
    Closed => "closed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Bug,
    Feature,
    Content,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Broken,
    Misleading,
    Spam,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: FeedbackKind,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    #[serde(default)]
    pub status: FeedbackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    #[serde(rename = "type", default)]
    pub kind: FeedbackKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolReport {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tool_id: String,
    #[serde(default)]
    pub reason: ReportReason,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewToolReport {
    pub tool_id: String,
    #[serde(default)]
    pub reason: ReportReason,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(with = "crate::timestamp::lenient", default = "crate::timestamp::default_now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: String,
    pub message: String,
}

/// Accepts a list, a comma-joined string, or null.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(raw)) => split_list(&raw),
        _ => Vec::new(),
    })
}

/// Like [`string_list`], keeping only recognized pricing tiers.
fn pricing_list<'de, D>(deserializer: D) -> Result<Vec<ToolPricing>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut tiers = Vec::new();
    for raw in string_list(deserializer)? {
        if let Some(tier) = ToolPricing::parse(&raw) {
            if !tiers.contains(&tier) {
                tiers.push(tier);
            }
        }
    }
    Ok(tiers)
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

impl<'de> Deserialize<'de> for ToolPricing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ToolPricing::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown pricing tier `{raw}`")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_decodes_sparse_and_legacy_shapes() {
        let tool: Tool = serde_json::from_value(json!({
            "id": "t1",
            "name": "Alpha Writer",
            "category": "text, productivity",
            "pricing": "Free, Paid, unknown",
            "tags": null,
            "features": "drafts,  outlines",
            "status": "ACTIVE",
            "featured": "true",
            "viewCount": 7,
            "createdAt": 1_700_000_000_000_i64
        }))
        .unwrap();

        assert_eq!(tool.primary_category(), "text");
        assert_eq!(tool.pricing, vec![ToolPricing::Free, ToolPricing::Paid]);
        assert!(tool.tags.is_empty());
        assert_eq!(tool.features, vec!["drafts", "outlines"]);
        assert!(tool.is_active());
        assert!(tool.featured);
        assert_eq!(tool.view_count, 7);
        assert_eq!(tool.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn tool_patch_serializes_only_present_fields() {
        let patch = ToolPatch {
            name: Some("Renamed".to_string()),
            featured: Some(true),
            ..ToolPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "name": "Renamed", "featured": true })
        );
    }

    #[test]
    fn intake_statuses_use_kebab_wire_names() {
        assert_eq!(serde_json::to_value(FeedbackStatus::InProgress).unwrap(), json!("in-progress"));
        let parsed: FeedbackStatus = serde_json::from_value(json!("in-progress")).unwrap();
        assert_eq!(parsed, FeedbackStatus::InProgress);
        let unknown: ReportStatus = serde_json::from_value(json!("escalated")).unwrap();
        assert_eq!(unknown, ReportStatus::New);
        assert!("replied".parse::<ContactStatus>().is_ok());
        assert!("bogus".parse::<ContactStatus>().is_err());
    }

    #[test]
    fn content_format_is_sniffed() {
        let mut post = BlogPost {
            id: "p".to_string(),
            title: "t".to_string(),
            slug: "t".to_string(),
            content: "<p>Hello</p>".to_string(),
            summary: String::new(),
            image_url: None,
            category: None,
            tags: Vec::new(),
            author: String::new(),
            status: BlogStatus::Draft,
            featured: false,
            view_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(post.content_format(), ContentFormat::Html);
        post.content = "# Title\n\nSome **bold** text".to_string();
        assert_eq!(post.content_format(), ContentFormat::Markdown);
        post.content = "Just words.".to_string();
        assert_eq!(post.content_format(), ContentFormat::Plain);
    }

    #[test]
    fn submission_state_reads_status() {
        let pending: ToolSubmission = serde_json::from_value(json!({ "name": "Foo" })).unwrap();
        assert_eq!(pending.state(), SubmissionState::Pending);
        assert_eq!(pending.submitted_by, ANONYMOUS_SUBMITTER);
        let rejected: ToolSubmission =
            serde_json::from_value(json!({ "name": "Foo", "status": "rejected" })).unwrap();
        assert_eq!(rejected.state(), SubmissionState::Rejected);
    }
}
