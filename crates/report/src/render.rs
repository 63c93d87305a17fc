use admet::AdmetPrediction;
use anyhow::{Context, Result};
use literature::LiteratureBundle;
use normalize::NormalizedEntity;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::collections::HashMap;
use std::io;

/// Everything joined onto the entity list, keyed by `normalized_id`.
pub struct Joined<'a> {
    pub web: HashMap<String, Vec<String>>,
    pub literature: HashMap<&'a str, &'a LiteratureBundle>,
    pub admet: HashMap<&'a str, &'a AdmetPrediction>,
}

impl<'a> Joined<'a> {
    /// Index bundles and predictions. Last write wins on duplicate ids.
    pub fn new(
        web: HashMap<String, Vec<String>>,
        bundles: &'a [LiteratureBundle],
        predictions: &'a [AdmetPrediction],
    ) -> Self {
        Self {
            web,
            literature: bundles.iter().map(|b| (b.normalized_id.as_str(), b)).collect(),
            admet: predictions.iter().map(|p| (p.normalized_id.as_str(), p)).collect(),
        }
    }
}

pub struct Preamble<'a> {
    pub job_id: &'a str,
    pub input_file: &'a str,
    pub input_hash: &'a str,
}

pub fn render_markdown(preamble: &Preamble, entities: &[NormalizedEntity], joined: &Joined) -> Result<String> {
    let mut lines = vec![
        format!("# Biology Research Run – {}", preamble.job_id),
        String::new(),
        format!("- **Input file**: `{}`", preamble.input_file),
        format!("- **SHA1**: `{}`", preamble.input_hash),
        format!("- **Entities**: {}", entities.len()),
        String::new(),
        "## Entities".to_string(),
    ];

    for entity in entities {
        render_entity(&mut lines, entity, joined)?;
    }

    Ok(lines.join("\n"))
}

fn render_entity(lines: &mut Vec<String>, entity: &NormalizedEntity, joined: &Joined) -> Result<()> {
    let extras = inline_json(&entity.extras).context("Failed to serialize extras")?;
    let context = if entity.context_tags.is_empty() {
        "(none)".to_string()
    } else {
        entity.context_tags.join(", ")
    };

    lines.push(format!("### {} ({})", entity.display_name(), entity.entity_type));
    lines.push(format!("- Normalized ID: `{}`", entity.normalized_id));
    lines.push(format!("- Context: {}", context));
    lines.push(format!("- Extras: `{}`", extras));
    lines.push(String::new());

    let summary = match joined.web.get(&entity.normalized_id) {
        Some(summaries) if !summaries.is_empty() => summaries.concat(),
        _ => "No pubmed refs available".to_string(),
    };

    lines.push("#### Literature Summary".to_string());
    lines.push(summary);
    lines.push("- **PubMed refs**:".to_string());

    match joined.literature.get(entity.normalized_id.as_str()) {
        Some(bundle) if !bundle.references.is_empty() => {
            for reference in &bundle.references {
                match &reference.url {
                    Some(url) if !url.is_empty() => lines.push(format!("- {}", url)),
                    _ => lines.push("- (no URL available)".to_string()),
                }
            }
        }
        _ => lines.push("- (none)".to_string()),
    }
    lines.push(String::new());

    lines.push("#### ADMET / Toxicity".to_string());
    match joined.admet.get(entity.normalized_id.as_str()) {
        Some(prediction) => {
            let json = serde_json::to_string_pretty(prediction).context("Failed to serialize ADMET prediction")?;
            lines.push("```json".to_string());
            lines.push(json);
            lines.push("```".to_string());
        }
        None => lines.push("No ADMET data available".to_string()),
    }
    lines.push(String::new());

    Ok(())
}

/// Single-line JSON with `", "` and `": "` separators and non-ASCII
/// characters escaped, as Python's `json.dumps` writes it.
fn inline_json<T: Serialize>(value: &T) -> Result<String> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, InlineFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(out)?)
}

struct InlineFormatter;

impl Formatter for InlineFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
