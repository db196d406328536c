//! Content generators: one per routine in the dispatch table.
//!
//! Generators only talk to the generation and image services; they never
//! write. Their output is a [`Candidate`] that the merge policy consumes.

use std::collections::BTreeMap;

use serde_json::Value;

use super::dispatch::Generator;
use super::prompts;
use crate::db::{Attribute, Record, RecordField};
use crate::error::EnrichError;
use crate::generation::{GenerateOptions, GenerationClient};
use crate::images::ImageSearch;
use crate::merge::CandidateMap;
use crate::parser::{json_string_pairs, json_value_text, parse_json_object, parse_listing};
use crate::types::{EnrichConfig, FullEnrichmentFormat};

const DESCRIPTION_MAX_TOKENS: u32 = 200;
const TRANSLATE_MAX_TOKENS: u32 = 100;
const FULL_JSON_MAX_TOKENS: u32 = 2000;

/// Everything a generator may read.
pub struct GeneratorContext<'a> {
    pub client: &'a dyn GenerationClient,
    pub images: &'a dyn ImageSearch,
    pub config: &'a EnrichConfig,
    pub record: &'a Record,
    pub attributes: &'a [Attribute],
    pub request: &'a str,
}

/// Generated, not yet merged, content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub fields: CandidateMap,
    pub attributes: Option<BTreeMap<String, String>>,
    /// Operator-facing text that replaces the computed summary (chat replies,
    /// lookups that found nothing).
    pub note: Option<String>,
}

impl Candidate {
    fn field(field: RecordField, value: String) -> Self {
        let mut fields = CandidateMap::new();
        fields.insert(field.column().to_string(), value);
        Self {
            fields,
            ..Self::default()
        }
    }

    fn note(text: impl Into<String>) -> Self {
        Self {
            note: Some(text.into()),
            ..Self::default()
        }
    }
}

pub async fn generate(generator: Generator, ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    match generator {
        Generator::Description => description(ctx).await,
        Generator::Images { multiple } => {
            let count = if multiple { ctx.config.image_count.max(1) } else { 1 };
            Ok(images(ctx, count).await)
        }
        Generator::Keywords => keywords(ctx).await,
        Generator::Seo => seo(ctx).await,
        Generator::FullEnrichment => match ctx.config.full_enrichment_format {
            FullEnrichmentFormat::Lines => full_enrichment_lines(ctx).await,
            FullEnrichmentFormat::Json => full_enrichment_json(ctx).await,
        },
        Generator::ExtractParameters => extract_parameters(ctx).await,
        Generator::UpdateParameter => update_parameter(ctx).await,
        Generator::Chat => chat(ctx).await,
    }
}

async fn description(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let text = ctx
        .client
        .generate(
            &prompts::description_system(&ctx.config.output_language),
            &prompts::product_line(ctx.record),
            &GenerateOptions::text(Some(DESCRIPTION_MAX_TOKENS)),
        )
        .await?;
    Ok(Candidate::field(RecordField::Description, text.trim().to_string()))
}

async fn keywords(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let text = ctx
        .client
        .generate(
            &prompts::keywords_system(&ctx.config.output_language),
            &prompts::product_line(ctx.record),
            &GenerateOptions::text(None),
        )
        .await?;
    Ok(Candidate::field(RecordField::SeoKeywords, text.trim().to_string()))
}

async fn seo(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let text = ctx
        .client
        .generate(
            &prompts::seo_system(&ctx.config.output_language),
            &prompts::product_line(ctx.record),
            &GenerateOptions::json(None),
        )
        .await?;
    let map = parse_json_object(&text)?;

    let mut fields = CandidateMap::new();
    for field in [
        RecordField::SeoTitle,
        RecordField::SeoDescription,
        RecordField::SeoKeywords,
    ] {
        if let Some(value) = map.get(field.column()).and_then(json_value_text) {
            fields.insert(field.column().to_string(), value);
        }
    }
    Ok(Candidate {
        fields,
        ..Candidate::default()
    })
}

/// Translate the name, search, keep the first `count` URLs joined by `|`.
///
/// Failures become a note; the image field is simply left alone.
async fn images(ctx: &GeneratorContext<'_>, count: usize) -> Candidate {
    let query = match ctx
        .client
        .generate(
            prompts::translate_query_system(),
            &ctx.record.name,
            &GenerateOptions::text(Some(TRANSLATE_MAX_TOKENS)),
        )
        .await
    {
        Ok(q) if !q.trim().is_empty() => q.trim().to_string(),
        Ok(_) => ctx.record.name.clone(),
        Err(e) => {
            log::warn!("Image query translation failed for record {}: {}", ctx.record.id, e);
            return Candidate::note("No image found");
        }
    };

    let urls = match ctx.images.search(&query).await {
        Ok(urls) => urls,
        Err(e) => {
            log::warn!("Image search failed for record {}: {}", ctx.record.id, e);
            return Candidate::note("No image found");
        }
    };

    let picked: Vec<String> = urls.into_iter().take(count).collect();
    if picked.is_empty() {
        return Candidate::note("No image found");
    }
    Candidate::field(RecordField::ImageLink, picked.join("|"))
}

async fn full_enrichment_lines(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let text = ctx
        .client
        .generate(
            &prompts::full_enrichment_lines_system(&ctx.config.output_language),
            &prompts::record_state_json(ctx.record, ctx.attributes),
            &GenerateOptions::web_search(ctx.config.search_reasoning_effort),
        )
        .await?;

    let parsed = parse_listing(&text);
    if !parsed.has_markers() {
        return Err(EnrichError::Parse(
            "response contained none of the expected field markers".into(),
        ));
    }

    let mut fields = CandidateMap::new();
    for (field, value) in [
        (RecordField::Name, parsed.product_name),
        (RecordField::Description, parsed.description),
        (RecordField::Features, parsed.features),
    ] {
        if !value.trim().is_empty() {
            fields.insert(field.column().to_string(), value);
        }
    }

    Ok(Candidate {
        fields,
        attributes: Some(parsed.parameters),
        note: None,
    })
}

async fn full_enrichment_json(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let text = ctx
        .client
        .generate(
            &prompts::full_enrichment_json_system(&ctx.config.output_language),
            &prompts::record_state_json(ctx.record, ctx.attributes),
            &GenerateOptions::json(Some(FULL_JSON_MAX_TOKENS)),
        )
        .await?;
    let map = parse_json_object(&text)?;

    let mut fields = CandidateMap::new();
    for field in super::dispatch::FULL_ENRICHMENT_FIELDS {
        if let Some(value) = map.get(field.column()).and_then(json_value_text) {
            fields.insert(field.column().to_string(), value);
        }
    }

    let attributes = match map.get("parameters") {
        Some(Value::Object(params)) => json_string_pairs(params),
        _ => BTreeMap::new(),
    };

    Ok(Candidate {
        fields,
        attributes: Some(attributes),
        note: None,
    })
}

async fn extract_parameters(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let text = ctx
        .client
        .generate(
            &prompts::extract_parameters_system(&ctx.config.output_language),
            &prompts::product_line(ctx.record),
            &GenerateOptions::json(None),
        )
        .await?;
    let map = parse_json_object(&text)?;
    Ok(Candidate {
        attributes: Some(json_string_pairs(&map)),
        ..Candidate::default()
    })
}

async fn update_parameter(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let user = format!("{}. Request: {}", prompts::product_line(ctx.record), ctx.request);
    let text = ctx
        .client
        .generate(
            &prompts::update_parameter_system(&ctx.config.output_language),
            &user,
            &GenerateOptions::json(None),
        )
        .await?;
    let map = parse_json_object(&text)?;

    let name = map.get("parameter_name").and_then(json_value_text);
    let value = map.get("value").and_then(json_value_text);
    match (name, value) {
        (Some(name), Some(value)) => {
            let mut single = BTreeMap::new();
            single.insert(name, value);
            Ok(Candidate {
                attributes: Some(single),
                ..Candidate::default()
            })
        }
        _ => {
            log::warn!(
                "Could not determine attribute for record {} from request '{}'",
                ctx.record.id,
                ctx.request
            );
            Ok(Candidate::note("Could not determine which attribute to update"))
        }
    }
}

async fn chat(ctx: &GeneratorContext<'_>) -> Result<Candidate, EnrichError> {
    let reply = ctx
        .client
        .generate(
            &prompts::chat_system(ctx.record),
            ctx.request,
            &GenerateOptions::text(None),
        )
        .await?;
    Ok(Candidate::note(reply.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::GenerationError;
    use crate::test_support::{FakeImages, ScriptedClient};

    fn record() -> Record {
        Record {
            id: 7,
            name: "Piros bőrkesztyű".into(),
            ..Record::default()
        }
    }

    async fn run(
        generator: Generator,
        client: &ScriptedClient,
        images: &FakeImages,
        config: &EnrichConfig,
    ) -> Result<Candidate, EnrichError> {
        let record = record();
        let ctx = GeneratorContext {
            client,
            images,
            config,
            record: &record,
            attributes: &[],
            request: "set color to red",
        };
        generate(generator, &ctx).await
    }

    #[tokio::test]
    async fn test_description_is_capped_at_200_tokens() {
        let client = ScriptedClient::fixed("  Soft leather gloves.  ");
        let cand = run(Generator::Description, &client, &FakeImages::empty(), &EnrichConfig::default())
            .await
            .unwrap();
        assert_eq!(cand.fields.get("description").map(String::as_str), Some("Soft leather gloves."));
        assert_eq!(client.calls()[0].options.max_output_tokens, Some(200));
    }

    #[tokio::test]
    async fn test_single_image_takes_first_url() {
        let client = ScriptedClient::fixed("red leather glove");
        let images = FakeImages::with_urls(&["https://a/1.jpg", "https://a/2.jpg"]);
        let cand = run(Generator::Images { multiple: false }, &client, &images, &EnrichConfig::default())
            .await
            .unwrap();
        assert_eq!(cand.fields.get("image_link").map(String::as_str), Some("https://a/1.jpg"));
        assert_eq!(images.queries(), vec!["red leather glove".to_string()]);
        assert_eq!(client.calls()[0].options.max_output_tokens, Some(100));
    }

    #[tokio::test]
    async fn test_multiple_images_joined_with_pipe() {
        let client = ScriptedClient::fixed("red leather glove");
        let images = FakeImages::with_urls(&["u1", "u2", "u3", "u4"]);
        let cand = run(Generator::Images { multiple: true }, &client, &images, &EnrichConfig::default())
            .await
            .unwrap();
        assert_eq!(cand.fields.get("image_link").map(String::as_str), Some("u1|u2|u3"));
    }

    #[tokio::test]
    async fn test_image_failures_become_notes() {
        let client = ScriptedClient::fixed("glove");
        let cand = run(Generator::Images { multiple: true }, &client, &FakeImages::failing(), &EnrichConfig::default())
            .await
            .unwrap();
        assert!(cand.fields.is_empty());
        assert_eq!(cand.note.as_deref(), Some("No image found"));

        let broken = ScriptedClient::new(|_, _, _| Err(GenerationError::EmptyOutput));
        let images = FakeImages::with_urls(&["u1"]);
        let cand = run(Generator::Images { multiple: false }, &broken, &images, &EnrichConfig::default())
            .await
            .unwrap();
        assert!(cand.fields.is_empty());
        assert!(images.queries().is_empty());
    }

    #[tokio::test]
    async fn test_seo_reads_json_fields() {
        let client = ScriptedClient::fixed(
            r#"{"seo_title": "Gloves", "seo_description": "Warm gloves", "seo_keywords": null, "other": "x"}"#,
        );
        let cand = run(Generator::Seo, &client, &FakeImages::empty(), &EnrichConfig::default())
            .await
            .unwrap();
        assert_eq!(cand.fields.len(), 2);
        assert!(client.calls()[0].options.json_mode);
    }

    #[tokio::test]
    async fn test_seo_malformed_json_is_parse_error() {
        let client = ScriptedClient::fixed("Title: Gloves");
        let result = run(Generator::Seo, &client, &FakeImages::empty(), &EnrichConfig::default()).await;
        assert!(matches!(result, Err(EnrichError::Parse(_))));
    }

    #[tokio::test]
    async fn test_full_enrichment_lines_uses_web_search() {
        let client = ScriptedClient::fixed(
            "product_name: Red Leather Gloves\ndescription: Soft.\nfeatures: A\nB\nparameters: Szín:Piros; Méret:L",
        );
        let cand = run(Generator::FullEnrichment, &client, &FakeImages::empty(), &EnrichConfig::default())
            .await
            .unwrap();

        assert_eq!(cand.fields.get("name").map(String::as_str), Some("Red Leather Gloves"));
        assert_eq!(cand.fields.get("features").map(String::as_str), Some("A\nB"));
        assert_eq!(cand.attributes.as_ref().map(|a| a.len()), Some(2));

        let call = &client.calls()[0];
        assert!(call.options.web_search);
        assert_eq!(call.options.effective_max_output_tokens(), None);
        assert!(call.user.contains("Piros bőrkesztyű"));
    }

    #[tokio::test]
    async fn test_full_enrichment_lines_without_markers_fails() {
        let client = ScriptedClient::fixed("Sorry, I could not find this product.");
        let result = run(Generator::FullEnrichment, &client, &FakeImages::empty(), &EnrichConfig::default()).await;
        assert!(matches!(result, Err(EnrichError::Parse(_))));
    }

    #[tokio::test]
    async fn test_full_enrichment_json_format() {
        let config = EnrichConfig {
            full_enrichment_format: FullEnrichmentFormat::Json,
            ..EnrichConfig::default()
        };
        let client = ScriptedClient::fixed(
            r#"{"name": "Red Gloves", "short_description": null, "slug": "red-gloves", "status": "x", "parameters": {"Szín": "Piros", "Súly": null}}"#,
        );
        let cand = run(Generator::FullEnrichment, &client, &FakeImages::empty(), &config)
            .await
            .unwrap();

        assert_eq!(cand.fields.get("name").map(String::as_str), Some("Red Gloves"));
        assert_eq!(cand.fields.get("slug").map(String::as_str), Some("red-gloves"));
        assert!(!cand.fields.contains_key("short_description"));
        assert!(!cand.fields.contains_key("status"));
        let attrs = cand.attributes.unwrap();
        assert_eq!(attrs.len(), 1);

        let call = &client.calls()[0];
        assert!(call.options.json_mode);
        assert_eq!(call.options.max_output_tokens, Some(2000));
        assert!(!call.options.web_search);
    }

    #[tokio::test]
    async fn test_update_parameter_missing_value_is_a_note() {
        let client = ScriptedClient::fixed(r#"{"parameter_name": "Szín"}"#);
        let cand = run(Generator::UpdateParameter, &client, &FakeImages::empty(), &EnrichConfig::default())
            .await
            .unwrap();
        assert!(cand.attributes.is_none());
        assert!(cand.note.is_some());
        assert!(client.calls()[0].user.contains("set color to red"));
    }

    #[tokio::test]
    async fn test_chat_reply_is_note() {
        let client = ScriptedClient::fixed("They are made of leather.");
        let cand = run(Generator::Chat, &client, &FakeImages::empty(), &EnrichConfig::default())
            .await
            .unwrap();
        assert_eq!(cand.note.as_deref(), Some("They are made of leather."));
        assert!(cand.fields.is_empty());
    }
}
