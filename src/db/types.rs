use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Record {0} does not exist")]
    MissingRecord(i64),

    #[error("Attribute {0} does not exist")]
    MissingAttribute(i64),
}

// ---------------------------------------------------------------------------
// Record fields
// ---------------------------------------------------------------------------

/// Scalar text fields of a record that enrichment may read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Name,
    Status,
    Category,
    ShortDescription,
    Description,
    Features,
    Slug,
    Link,
    Unit,
    ImageLink,
    ImageAltTitle,
    ImageFilename,
    OgImage,
    SeoTitle,
    SeoDescription,
    SeoKeywords,
    SeoRobots,
}

impl RecordField {
    pub const ALL: [RecordField; 17] = [
        RecordField::Name,
        RecordField::Status,
        RecordField::Category,
        RecordField::ShortDescription,
        RecordField::Description,
        RecordField::Features,
        RecordField::Slug,
        RecordField::Link,
        RecordField::Unit,
        RecordField::ImageLink,
        RecordField::ImageAltTitle,
        RecordField::ImageFilename,
        RecordField::OgImage,
        RecordField::SeoTitle,
        RecordField::SeoDescription,
        RecordField::SeoKeywords,
        RecordField::SeoRobots,
    ];

    /// Column name in the `records` table. Also the candidate-map key.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Status => "status",
            Self::Category => "category",
            Self::ShortDescription => "short_description",
            Self::Description => "description",
            Self::Features => "features",
            Self::Slug => "slug",
            Self::Link => "link",
            Self::Unit => "unit",
            Self::ImageLink => "image_link",
            Self::ImageAltTitle => "image_alt_title",
            Self::ImageFilename => "image_filename",
            Self::OgImage => "og_image",
            Self::SeoTitle => "seo_title",
            Self::SeoDescription => "seo_description",
            Self::SeoKeywords => "seo_keywords",
            Self::SeoRobots => "seo_robots",
        }
    }

    /// Human-readable label for operator feedback.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Status => "Status",
            Self::Category => "Category",
            Self::ShortDescription => "Short description",
            Self::Description => "Description",
            Self::Features => "Features",
            Self::Slug => "Slug",
            Self::Link => "Link",
            Self::Unit => "Unit",
            Self::ImageLink => "Image link",
            Self::ImageAltTitle => "Image alt/title",
            Self::ImageFilename => "Image filename",
            Self::OgImage => "OG image",
            Self::SeoTitle => "SEO title",
            Self::SeoDescription => "SEO description",
            Self::SeoKeywords => "SEO keywords",
            Self::SeoRobots => "SEO robots",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.column() == column)
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Field writes to apply to one record, in field order.
pub type UpdateSet = BTreeMap<RecordField, String>;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `records` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub status: Option<String>,
    pub category: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub features: Option<String>,
    pub slug: Option<String>,
    pub link: Option<String>,
    pub unit: Option<String>,
    pub image_link: Option<String>,
    pub image_alt_title: Option<String>,
    pub image_filename: Option<String>,
    pub og_image: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub seo_robots: Option<String>,
    pub net_price: Option<f64>,
    pub gross_price: Option<f64>,
    pub min_quantity: Option<i64>,
    pub max_quantity: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Record {
    /// Current value of a text field.
    pub fn get(&self, field: RecordField) -> Option<&str> {
        match field {
            RecordField::Name => Some(self.name.as_str()),
            RecordField::Status => self.status.as_deref(),
            RecordField::Category => self.category.as_deref(),
            RecordField::ShortDescription => self.short_description.as_deref(),
            RecordField::Description => self.description.as_deref(),
            RecordField::Features => self.features.as_deref(),
            RecordField::Slug => self.slug.as_deref(),
            RecordField::Link => self.link.as_deref(),
            RecordField::Unit => self.unit.as_deref(),
            RecordField::ImageLink => self.image_link.as_deref(),
            RecordField::ImageAltTitle => self.image_alt_title.as_deref(),
            RecordField::ImageFilename => self.image_filename.as_deref(),
            RecordField::OgImage => self.og_image.as_deref(),
            RecordField::SeoTitle => self.seo_title.as_deref(),
            RecordField::SeoDescription => self.seo_description.as_deref(),
            RecordField::SeoKeywords => self.seo_keywords.as_deref(),
            RecordField::SeoRobots => self.seo_robots.as_deref(),
        }
    }
}

/// Input for seeding a record. The engine itself never creates records.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub external_id: String,
    pub name: String,
    pub fields: BTreeMap<RecordField, String>,
    pub net_price: Option<f64>,
    pub gross_price: Option<f64>,
}

impl NewRecord {
    pub fn new(external_id: &str, name: &str) -> Self {
        Self {
            external_id: external_id.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: RecordField, value: &str) -> Self {
        self.fields.insert(field, value.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    #[default]
    Text,
    Number,
    Date,
}

impl AttributeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
        }
    }
}

impl FromStr for AttributeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            other => Err(format!("unknown attribute type: {}", other)),
        }
    }
}

/// A row from the `attributes` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: i64,
    pub record_id: i64,
    pub name: String,
    pub kind: AttributeKind,
    pub value: Option<String>,
}
