//! Prompt builders for the content generators.
//!
//! System prompts carry the instructions, user prompts carry the record.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::db::{Attribute, Record, RecordField};

pub fn description_system(language: &str) -> String {
    format!(
        "Write a short product description of 2-3 sentences in {}. \
         Return only the description text.",
        language
    )
}

pub fn keywords_system(language: &str) -> String {
    format!(
        "Write 10-15 SEO keywords in {}, separated by commas. Return only the keywords.",
        language
    )
}

pub fn seo_system(language: &str) -> String {
    format!(
        "Write SEO metadata in {} for the product. seo_title is at most 60 characters, \
         seo_description at most 160 characters, seo_keywords is a comma separated list. \
         Return JSON: {{\"seo_title\": \"...\", \"seo_description\": \"...\", \"seo_keywords\": \"...\"}}",
        language
    )
}

pub fn translate_query_system() -> &'static str {
    "Translate the product name to English. Return only the translation, nothing else."
}

pub fn extract_parameters_system(language: &str) -> String {
    format!(
        "Extract the product's attributes. Return a flat JSON object of attribute name to value. \
         Attribute names are in {} (e.g. manufacturer, brand, color, size).",
        language
    )
}

pub fn update_parameter_system(language: &str) -> String {
    format!(
        "The operator wants to set one product attribute. Return JSON: \
         {{\"parameter_name\": \"attribute name in {}\", \"value\": \"value\"}}",
        language
    )
}

pub fn chat_system(record: &Record) -> String {
    format!(
        "You are a catalog assistant. Answer the operator's question about this product.\n{}",
        product_line(record)
    )
}

pub fn product_line(record: &Record) -> String {
    format!("Product: {}", record.name)
}

/// Shared rules for full enrichment, independent of the output format.
fn full_enrichment_rules(language: &str) -> String {
    format!(
        "You process and complete e-commerce product data. Fill every missing field, using only \
information you can verify in public, authoritative sources (manufacturer pages, catalogs, \
established web shops). All output is in {language}, whatever the input language.

RULES:
1. Only fill fields that are empty, missing or null. Never change a filled field, except the \
product name, which you may rewrite into a concise, natural, SEO-friendly and sales-oriented form \
without keyword stuffing.
2. Never invent, guess or infer data. If a value cannot be found with certainty, leave it empty.
3. Do not return dimensions, weight, material, technical ratings, composition, certification, \
production year or place, or warranty unless they are explicitly stated in a reliable source \
for this exact product.
4. Attribute names are in {language}. Return only attributes found verbatim in a reliable source.
5. The short description is 2-3 sentences. The features text is 10-18 sentences, starts with \
the main keywords, is split into at least two paragraphs with <br />, and contains no lists.
6. seo_title is at most 60 characters, seo_description at most 160 characters.",
        language = language
    )
}

pub fn full_enrichment_lines_system(language: &str) -> String {
    format!(
        "{}

OUTPUT FORMAT:
Answer with exactly these lines and nothing else. Leave the text after a marker empty when \
unknown. features may continue over several lines; every other field is a single line.
product_name: <product name>
description: <short description>
features: <features text>
parameters: <Name:Value; Name:Value>",
        full_enrichment_rules(language)
    )
}

pub fn full_enrichment_json_system(language: &str) -> String {
    format!(
        "{}
7. slug is built from the product name: lowercase, without accents, words joined by hyphens, \
letters and digits only.

OUTPUT FORMAT:
Answer with a single valid JSON object with exactly this structure and no other text:
{{
  \"name\": \"...\",
  \"short_description\": \"... or null\",
  \"description\": \"... or null\",
  \"features\": \"... or null\",
  \"slug\": \"... or null\",
  \"seo_title\": \"... or null\",
  \"seo_description\": \"... or null\",
  \"seo_keywords\": \"... or null\",
  \"parameters\": {{ \"name\": \"value\" }}
}}",
        full_enrichment_rules(language)
    )
}

/// The record's current state as a JSON document for full enrichment.
pub fn record_state_json(record: &Record, attributes: &[Attribute]) -> String {
    const FIELDS: [RecordField; 8] = [
        RecordField::Name,
        RecordField::ShortDescription,
        RecordField::Description,
        RecordField::Features,
        RecordField::Slug,
        RecordField::SeoTitle,
        RecordField::SeoDescription,
        RecordField::SeoKeywords,
    ];

    let mut doc = Map::new();
    for field in FIELDS {
        let value = match record.get(field) {
            Some(v) if !v.trim().is_empty() => Value::String(v.to_string()),
            _ => Value::Null,
        };
        doc.insert(field.column().to_string(), value);
    }

    let parameters: BTreeMap<&str, &str> = attributes
        .iter()
        .filter_map(|a| a.value.as_deref().map(|v| (a.name.as_str(), v)))
        .collect();
    doc.insert("parameters".to_string(), json!(parameters));

    Value::Object(doc).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::AttributeKind;

    #[test]
    fn test_record_state_json_marks_empty_fields_null() {
        let record = Record {
            id: 1,
            name: "Drill".into(),
            description: Some("Strong".into()),
            seo_title: Some("  ".into()),
            ..Record::default()
        };
        let attrs = vec![Attribute {
            id: 1,
            record_id: 1,
            name: "Szín".into(),
            kind: AttributeKind::Text,
            value: Some("Piros".into()),
        }];

        let doc: Value = serde_json::from_str(&record_state_json(&record, &attrs)).unwrap();
        assert_eq!(doc["name"], "Drill");
        assert_eq!(doc["description"], "Strong");
        assert!(doc["seo_title"].is_null());
        assert!(doc["short_description"].is_null());
        assert_eq!(doc["parameters"]["Szín"], "Piros");
    }

    #[test]
    fn test_line_format_prompt_names_every_marker() {
        let prompt = full_enrichment_lines_system("Hungarian");
        for marker in ["product_name:", "description:", "features:", "parameters:"] {
            assert!(prompt.contains(marker));
        }
        assert!(prompt.contains("Hungarian"));
    }
}
