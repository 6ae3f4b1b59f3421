//! Presentation helpers: proposal prose tokenization, the printable quotation
//! document, and saving it to the downloads directory.
//!
//! The generator makes no structural promise about its output, so everything
//! here is heuristic and tolerates arbitrary prose.

use std::path::PathBuf;
use std::{fs, io};

use comrak::{ComrakOptions, markdown_to_html};
use once_cell::sync::Lazy;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::config::AppConfig;
use crate::types::{ClientDetails, Quotation};

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options
});

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Header(String),
    Bullet(String),
    Paragraph(String),
}

/// One blank-line-separated chunk of generated prose.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub blocks: Vec<Block>,
}

/// Splits raw prose into sections on blank lines, then classifies each line:
/// `**…**` on its own line is a header, `*`/`-` prefixes are bullets,
/// everything else is a paragraph line.
pub fn tokenize(raw: &str) -> Vec<Section> {
    raw.split("\n\n")
        .filter(|section| !section.trim().is_empty())
        .map(|section| Section {
            blocks: section
                .lines()
                .filter_map(classify_line)
                .collect(),
        })
        .filter(|section| !section.blocks.is_empty())
        .collect()
}

fn classify_line(line: &str) -> Option<Block> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() > 4 && trimmed.starts_with("**") && trimmed.ends_with("**") {
        return Some(Block::Header(trimmed.trim_matches('*').trim().to_string()));
    }
    if let Some(rest) = trimmed.strip_prefix('*').or_else(|| trimmed.strip_prefix('-')) {
        return Some(Block::Bullet(rest.trim().to_string()));
    }
    Some(Block::Paragraph(trimmed.to_string()))
}

/// Full printable HTML document for a quotation. Pure formatting; no network.
pub fn printable_quotation(
    quotation: &Quotation,
    details: &ClientDetails,
    config: &AppConfig,
) -> String {
    let now = local_now();
    let date = now.format(DATE_FORMAT).unwrap_or_default();
    let quote_no = 1000 + (now.unix_timestamp_nanos() / 1_000_000) % 9000;
    let body = markdown_to_html(&quotation.raw_content, &MARKDOWN_OPTIONS);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Quotation</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; }}
    .header {{ background-color: #0066cc; color: white; padding: 20px; }}
    .company-name {{ font-size: 24px; margin-bottom: 5px; }}
    .quote-info {{ display: flex; justify-content: space-between; }}
    .client-info {{ background-color: #0066cc; color: white; padding: 20px; margin-top: 20px; }}
    .services {{ margin-top: 20px; }}
    table {{ width: 100%; border-collapse: collapse; }}
    th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
    th {{ background-color: #f2f2f2; }}
    .total {{ font-weight: bold; }}
    .footer {{ margin-top: 30px; font-size: 12px; text-align: center; }}
  </style>
</head>
<body>
  <div class="header">
    <div class="company-name">{company}</div>
    <div>{tagline}</div>
    <div class="quote-info">
      <div>Quote No. {quote_no}</div>
      <div>Date: {date}</div>
    </div>
  </div>
  <div class="client-info">
    <h2>Client Information</h2>
    <p>Client Name: {client_name}</p>
    <p>Company Name: {client_company}</p>
    <p>Address: {address}</p>
    <p>Phone Number: {phone}</p>
    <p>Email: {email}</p>
  </div>
  <div class="services">
    <h2>Quotation Details</h2>
    {body}
  </div>
  <div class="footer">
    <p>This quotation is valid for 30 days from the date of issue.</p>
    <p>Authorized Signature: _______________________</p>
  </div>
</body>
</html>
"#,
        company = escape_html(&config.company_name),
        tagline = escape_html(&config.company_tagline),
        client_name = escape_html(&details.client_name),
        client_company = escape_html(&details.company_name),
        address = escape_html(&details.address),
        phone = escape_html(&details.phone_number),
        email = escape_html(&details.email),
    )
}

/// Saves a printable document into the platform downloads directory and
/// returns the written path.
pub fn write_download(html: &str, company_name: &str) -> io::Result<PathBuf> {
    let dir = dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads"));
    fs::create_dir_all(&dir)?;
    let slug = slugify_for_filename(company_name);
    let stamp = OffsetDateTime::now_utc().unix_timestamp();
    let filename = if slug.is_empty() {
        format!("quotation-{stamp}.html")
    } else {
        format!("quotation-{slug}-{stamp}.html")
    };
    let path = dir.join(filename);
    fs::write(&path, html)?;
    Ok(path)
}

fn local_now() -> OffsetDateTime {
    let mut now = OffsetDateTime::now_utc();
    if let Ok(offset) = UtcOffset::current_local_offset() {
        now = now.to_offset(offset);
    }
    now
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn slugify_for_filename(input: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = false;
    for ch in input.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() {
            slug.push(lower);
            last_dash = false;
        } else if (lower.is_ascii_whitespace() || lower == '-') && !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
        if slug.len() >= 40 {
            break;
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_sections_headers_and_bullets() {
        let raw = "**Executive Summary**\nA fine soap business.\n\n* Custom scents\n- Gift boxes\n\n\n";
        let sections = tokenize(raw);
        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections[0].blocks,
            vec![
                Block::Header("Executive Summary".to_string()),
                Block::Paragraph("A fine soap business.".to_string()),
            ]
        );
        assert_eq!(
            sections[1].blocks,
            vec![
                Block::Bullet("Custom scents".to_string()),
                Block::Bullet("Gift boxes".to_string()),
            ]
        );
    }

    #[test]
    fn tolerates_arbitrary_prose() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \n\n \n").is_empty());

        let sections = tokenize("just one line of plain prose");
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].blocks,
            vec![Block::Paragraph("just one line of plain prose".to_string())]
        );
    }

    #[test]
    fn bare_asterisk_pair_is_not_a_header() {
        // "**" alone has no title between the markers; the leading asterisk
        // makes it a bullet like any other starred line.
        let sections = tokenize("**\ntext");
        assert_eq!(sections[0].blocks[0], Block::Bullet("*".to_string()));
    }

    #[test]
    fn printable_contains_client_company_name() {
        let quotation = Quotation {
            raw_content: "Starter package: $500\n\nTotal: $500".to_string(),
        };
        let details = ClientDetails {
            client_name: "Ada Patel".to_string(),
            company_name: "Soapworks Ltd".to_string(),
            ..ClientDetails::default()
        };
        let html = printable_quotation(&quotation, &details, &AppConfig::default());
        assert!(html.contains("Soapworks Ltd"));
        assert!(html.contains("Ada Patel"));
        assert!(html.contains("Quotation Details"));
        assert!(html.contains("valid for 30 days"));
    }

    #[test]
    fn printable_escapes_markup_in_details() {
        let quotation = Quotation {
            raw_content: "Total: $1".to_string(),
        };
        let details = ClientDetails {
            company_name: "<script>alert(1)</script>".to_string(),
            ..ClientDetails::default()
        };
        let html = printable_quotation(&quotation, &details, &AppConfig::default());
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn slugifies_company_names() {
        assert_eq!(slugify_for_filename("Soapworks Ltd"), "soapworks-ltd");
        assert_eq!(slugify_for_filename("  !!  "), "");
    }
}
