// =============================================================================
// PSX historical page parser
// =============================================================================
//
// The `/historical` endpoint answers with an HTML fragment holding one table
// row per trading day:
//
//   <tr><td>Jul 31, 2025</td><td>1,234.50</td>...<td>2,345,678</td></tr>
//
// Cells are date, open, high, low, close, volume.  Rows that cannot be turned
// into a valid bar are skipped rather than failing the whole page.
// =============================================================================

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::types::PriceBar;

/// Bodies shorter than this carry no table.
const MIN_BODY_LEN: usize = 100;

static ROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("valid row regex"));
static CELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("valid cell regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Date layouts the portal has used over time.
const DATE_FORMATS: [&str; 2] = ["%b %d, %Y", "%d-%b-%Y"];

/// Parse every usable bar from a PSX historical page, in page order.
///
/// Returns an empty vector when the body is too short or holds no table.
pub fn parse_historical_page(html: &str) -> Vec<PriceBar> {
    if html.len() < MIN_BODY_LEN {
        return Vec::new();
    }
    let lower = html.to_ascii_lowercase();
    let Some(table_start) = lower.find("<table") else {
        return Vec::new();
    };
    let table_end = lower[table_start..]
        .find("</table>")
        .map(|i| table_start + i)
        .unwrap_or(html.len());
    let table = &html[table_start..table_end];

    let mut bars = Vec::new();
    let mut skipped = 0usize;

    for row in ROW_RE.captures_iter(table) {
        let cells: Vec<String> = CELL_RE
            .captures_iter(&row[1])
            .map(|c| cell_text(&c[1]))
            .collect();
        if cells.len() < 6 {
            // Header rows use <th>.
            continue;
        }
        match parse_row(&cells) {
            Some(bar) => bars.push(bar),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(parsed = bars.len(), skipped, "skipped unusable PSX rows");
    }
    bars
}

/// Build a bar from the first six cell texts, or `None` if any required piece
/// is missing or the OHLC values are inconsistent.
fn parse_row(cells: &[String]) -> Option<PriceBar> {
    let date = parse_date(&cells[0])?;
    let open = parse_price(&cells[1])?;
    let high = parse_price(&cells[2])?;
    let low = parse_price(&cells[3])?;
    let close = parse_price(&cells[4])?;
    let volume = parse_volume(&cells[5])?;

    PriceBar::new(date, open, high, low, close, volume).ok()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Prices of `-`, `0` or blank mean the field is missing.
fn parse_price(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");
    if is_blank_marker(&cleaned) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite() && *p > 0.0)
}

/// Volume may be written with a decimal part; missing markers read as zero.
/// Anything else that is not a number rejects the row.
fn parse_volume(text: &str) -> Option<u64> {
    let cleaned = text.replace(',', "");
    if is_blank_marker(&cleaned) {
        return Some(0);
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.trunc() as u64)
}

fn is_blank_marker(s: &str) -> bool {
    matches!(s, "" | "-" | "0")
}

/// Strip inner tags and decode the few entities the portal emits.
fn cell_text(raw: &str) -> String {
    let text = TAG_RE.replace_all(raw, "");
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: &str) -> String {
        format!(
            r#"<div class="historical"><table class="tbl"><thead><tr><th>DATE</th><th>OPEN</th><th>HIGH</th><th>LOW</th><th>CLOSE</th><th>VOLUME</th></tr></thead><tbody>{rows}</tbody></table></div>"#
        )
    }

    #[test]
    fn parses_both_date_formats() {
        let html = page(
            "<tr><td>Jul 31, 2025</td><td>100.00</td><td>105.50</td><td>99.00</td><td>104.25</td><td>1,234,567</td></tr>\
             <tr><td>30-Jul-2025</td><td>98.00</td><td>101.00</td><td>97.50</td><td>100.00</td><td>987654</td></tr>",
        );
        let bars = parse_historical_page(&html);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 7, 31).unwrap());
        assert_eq!(bars[0].volume, 1_234_567);
        assert!((bars[0].close - 104.25).abs() < 1e-12);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2025, 7, 30).unwrap());
    }

    #[test]
    fn strips_inner_markup_and_thousands_separators() {
        let html = page(
            r#"<tr class="odd"><td><span>Jul 01, 2025</span></td><td>1,200.00</td><td> 1,250.00 </td><td>1,190.00</td><td><b>1,240.00</b></td><td>12,500.0</td></tr>"#,
        );
        let bars = parse_historical_page(&html);
        assert_eq!(bars.len(), 1);
        assert!((bars[0].high - 1250.0).abs() < 1e-12);
        assert_eq!(bars[0].volume, 12_500);
    }

    #[test]
    fn skips_rows_with_missing_prices() {
        let html = page(
            "<tr><td>Jul 02, 2025</td><td>-</td><td>10</td><td>9</td><td>9.5</td><td>100</td></tr>\
             <tr><td>Jul 03, 2025</td><td>9.6</td><td>0</td><td>9</td><td>9.5</td><td>100</td></tr>\
             <tr><td>Jul 04, 2025</td><td>9.6</td><td>10</td><td>9</td><td>9.5</td><td>-</td></tr>",
        );
        let bars = parse_historical_page(&html);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn skips_inconsistent_and_undated_rows() {
        let html = page(
            "<tr><td>Jul 05, 2025</td><td>12</td><td>10</td><td>9</td><td>9.5</td><td>100</td></tr>\
             <tr><td>2025/07/06</td><td>9.6</td><td>10</td><td>9</td><td>9.5</td><td>100</td></tr>\
             <tr><td>Jul 07, 2025</td><td>9.6</td><td>10</td></tr>",
        );
        assert!(parse_historical_page(&html).is_empty());
    }

    #[test]
    fn short_or_tableless_body_has_no_data() {
        assert!(parse_historical_page("<p>No data</p>").is_empty());
        let long = "<div>".repeat(40);
        assert!(parse_historical_page(&long).is_empty());
    }

    #[test]
    fn skips_rows_with_unreadable_volume() {
        let html = page(
            "<tr><td>Jul 08, 2025</td><td>9.6</td><td>10</td><td>9</td><td>9.5</td><td>abc</td></tr>\
             <tr><td>Jul 09, 2025</td><td>9.6</td><td>10</td><td>9</td><td>9.5</td><td>250</td></tr>",
        );
        let bars = parse_historical_page(&html);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 7, 9).unwrap());
    }

    #[test]
    fn volume_parsing() {
        assert_eq!(parse_volume("1,000.9"), Some(1000));
        assert_eq!(parse_volume("abc"), None);
        assert_eq!(parse_volume("0"), Some(0));
        assert_eq!(parse_volume("-"), Some(0));
        assert_eq!(parse_volume(""), Some(0));
    }
}
