//! Action → routine table.
//!
//! Every [`Action`] resolves to exactly one [`Route`]: which generator runs,
//! which record fields its candidates may fill, and how attributes merge.

use crate::db::RecordField;
use crate::intent::Action;
use crate::merge::AttributeMergeMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Description,
    Images { multiple: bool },
    Keywords,
    Seo,
    FullEnrichment,
    ExtractParameters,
    UpdateParameter,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub generator: Generator,
    /// Record fields the generator's candidates may fill.
    pub fields: &'static [RecordField],
    /// `None` when the action never touches attributes.
    pub attributes: Option<AttributeMergeMode>,
}

const SEO_FIELDS: &[RecordField] = &[
    RecordField::SeoTitle,
    RecordField::SeoDescription,
    RecordField::SeoKeywords,
];

/// Fields full enrichment may fill.
pub const FULL_ENRICHMENT_FIELDS: &[RecordField] = &[
    RecordField::Name,
    RecordField::ShortDescription,
    RecordField::Description,
    RecordField::Features,
    RecordField::Slug,
    RecordField::SeoTitle,
    RecordField::SeoDescription,
    RecordField::SeoKeywords,
];

pub fn route(action: Action) -> Route {
    match action {
        Action::GenerateDescription => Route {
            generator: Generator::Description,
            fields: &[RecordField::Description],
            attributes: None,
        },
        Action::FindImage => Route {
            generator: Generator::Images { multiple: false },
            fields: &[RecordField::ImageLink],
            attributes: None,
        },
        Action::FindMultipleImages => Route {
            generator: Generator::Images { multiple: true },
            fields: &[RecordField::ImageLink],
            attributes: None,
        },
        Action::GenerateKeywords => Route {
            generator: Generator::Keywords,
            fields: &[RecordField::SeoKeywords],
            attributes: None,
        },
        Action::GenerateSeo => Route {
            generator: Generator::Seo,
            fields: SEO_FIELDS,
            attributes: None,
        },
        Action::GenerateAll => Route {
            generator: Generator::FullEnrichment,
            fields: FULL_ENRICHMENT_FIELDS,
            attributes: Some(AttributeMergeMode::AdditiveOnly),
        },
        Action::ExtractParameters => Route {
            generator: Generator::ExtractParameters,
            fields: &[],
            attributes: Some(AttributeMergeMode::Upsert),
        },
        Action::UpdateParameter => Route {
            generator: Generator::UpdateParameter,
            fields: &[],
            attributes: Some(AttributeMergeMode::Upsert),
        },
        Action::Chat => Route {
            generator: Generator::Chat,
            fields: &[],
            attributes: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_has_a_route() {
        for action in Action::ALL {
            let r = route(action);
            if action == Action::Chat {
                assert!(r.fields.is_empty() && r.attributes.is_none());
            }
        }
    }

    #[test]
    fn test_attribute_modes() {
        assert_eq!(
            route(Action::GenerateAll).attributes,
            Some(AttributeMergeMode::AdditiveOnly)
        );
        assert_eq!(
            route(Action::ExtractParameters).attributes,
            Some(AttributeMergeMode::Upsert)
        );
        assert_eq!(
            route(Action::UpdateParameter).attributes,
            Some(AttributeMergeMode::Upsert)
        );
        assert_eq!(route(Action::GenerateSeo).attributes, None);
    }

    #[test]
    fn test_image_routes_only_touch_image_link() {
        assert_eq!(route(Action::FindImage).fields, &[RecordField::ImageLink]);
        assert_eq!(
            route(Action::FindMultipleImages).generator,
            Generator::Images { multiple: true }
        );
    }

    #[test]
    fn test_full_enrichment_fields_include_name() {
        assert!(route(Action::GenerateAll).fields.contains(&RecordField::Name));
        assert!(!route(Action::GenerateAll).fields.contains(&RecordField::ImageLink));
    }
}
