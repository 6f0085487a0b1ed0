use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::crawler::models::{CategoryFields, Listing};

/// Extracts canonical listing records from one category page.
///
/// Each advertisement occupies a `tr[id^="tr_"]` row. Rows without an
/// extractable title (ad-injection or malformed markup) are dropped
/// silently; a count is logged once per page. Duplicate ids within one
/// page collapse to the first occurrence.
pub fn parse_listings(html: &str, base_url: &str, is_defect: bool) -> Vec<Listing> {
    let doc = Html::parse_document(html);
    let row_sel = Selector::parse(r#"tr[id^="tr_"]"#).unwrap();
    let title_sel = Selector::parse("td.msg2 a.am, td.msga2 a.am").unwrap();
    let price_sel = Selector::parse("td.msga2-o.pp6").unwrap();
    let detail_sel = Selector::parse("td.msga2").unwrap();

    let base = base_url.trim_end_matches('/');
    let mut listings = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut row_count = 0usize;
    let mut dropped = 0usize;

    for row in doc.select(&row_sel) {
        row_count += 1;

        let Some(title_el) = row.select(&title_sel).next() else {
            dropped += 1;
            continue;
        };
        let title = cell_text(&title_el);
        if title.is_empty() {
            dropped += 1;
            continue;
        }

        let link = match title_el.value().attr("href") {
            Some(href) if href.starts_with("http") => href.to_string(),
            Some(href) if !href.is_empty() => format!("{base}{href}"),
            _ => String::new(),
        };

        let id = row
            .value()
            .attr("id")
            .map(|raw| raw.trim_start_matches("tr_").trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| link.clone());
        if id.is_empty() {
            // neither row id nor link; nothing stable to dedup on
            dropped += 1;
            continue;
        }
        if !seen_ids.insert(id.clone()) {
            continue;
        }

        let price_cells: Vec<_> = row.select(&price_sel).collect();
        let price = price_cells
            .last()
            .map(cell_text)
            .filter(|p| !p.is_empty())
            .map(|p| normalize_price(&p))
            .unwrap_or_else(|| "N/A".to_string());

        let description = row
            .select(&detail_sel)
            .map(|el| cell_text(&el))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let category_fields = if is_defect && price_cells.len() >= 4 {
            Some(CategoryFields {
                make: cell_text(&price_cells[0]),
                model: cell_text(&price_cells[1]),
                year: cell_text(&price_cells[2]),
                condition_pct: cell_text(&price_cells[3]),
            })
        } else {
            None
        };

        listings.push(Listing {
            id,
            title,
            description,
            price,
            link,
            fuel_hint: String::new(),
            is_defect,
            category_fields,
        });
    }

    debug!(rows = row_count, parsed = listings.len(), dropped, "Parsed category page");
    listings
}

/// Pulls the engine/fuel field from a detail page. Two known markup
/// variants: a label/value table-cell pair, and a label/value generic
/// container pair. The label is matched case-insensitively against
/// "motor" / "dzinēj". Returns an empty string when neither matches.
pub fn parse_fuel_hint(html: &str) -> String {
    let doc = Html::parse_document(html);

    let label_sel = Selector::parse("td.ads_opt_name").unwrap();
    for label in doc.select(&label_sel) {
        if !is_engine_label(&cell_text(&label)) {
            continue;
        }
        let value = label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().classes().any(|c| c == "ads_opt"));
        if let Some(value) = value {
            return cell_text(&value);
        }
    }

    let row_label_sel = Selector::parse("div.row-label").unwrap();
    let row_value_sel = Selector::parse("div.row-value").unwrap();
    let labels = doc.select(&row_label_sel);
    let values: Vec<_> = doc.select(&row_value_sel).collect();
    for (i, label) in labels.enumerate() {
        if is_engine_label(&cell_text(&label)) {
            if let Some(value) = values.get(i) {
                return cell_text(value);
            }
        }
    }

    String::new()
}

fn is_engine_label(label: &str) -> bool {
    let label = label.to_lowercase();
    label.contains("motor") || label.contains("dzinēj")
}

fn cell_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Appends the default currency when the source shows a bare number.
fn normalize_price(price: &str) -> String {
    let upper = price.to_uppercase();
    if upper.contains('€') || upper.contains("EUR") {
        return price.to_string();
    }
    let cleaned: String = price
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | '.'))
        .collect();
    if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
        format!("{price} €")
    } else {
        price.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, href: &str, title: &str, price: &str) -> String {
        format!(
            r#"<tr id="{id}">
                 <td class="msga2"><a class="am" href="{href}">{title}</a></td>
                 <td class="msga2">2.0 benzīns</td>
                 <td class="msga2-o pp6">{price}</td>
               </tr>"#
        )
    }

    #[test]
    fn parses_row_and_resolves_relative_link() {
        let html = format!(
            "<table>{}</table>",
            row("tr_bhphed", "/msg/lv/transport/cars/toyota/rav4/abc.html", "Toyota RAV4", "15 000 €")
        );
        let out = parse_listings(&html, "https://www.ss.lv", false);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "bhphed");
        assert_eq!(out[0].link, "https://www.ss.lv/msg/lv/transport/cars/toyota/rav4/abc.html");
        assert_eq!(out[0].title, "Toyota RAV4");
        assert!(out[0].description.contains("benzīns"));
    }

    #[test]
    fn numeric_price_gets_default_currency() {
        let html = format!("<table>{}</table>", row("tr_x", "/a.html", "Toyota Yaris", "15000"));
        let out = parse_listings(&html, "https://www.ss.lv", false);
        assert_eq!(out[0].price, "15000 €");
    }

    #[test]
    fn priced_price_left_untouched() {
        let html = format!("<table>{}</table>", row("tr_x", "/a.html", "Toyota Yaris", "15 000 €"));
        let out = parse_listings(&html, "https://www.ss.lv", false);
        assert_eq!(out[0].price, "15 000 €");
    }

    #[test]
    fn row_without_title_is_dropped() {
        let html = r#"<table><tr id="tr_ad"><td class="msga2">banner</td></tr></table>"#;
        let out = parse_listings(html, "https://www.ss.lv", false);
        assert!(out.is_empty());
    }

    #[test]
    fn missing_row_id_falls_back_to_link() {
        let html = r#"<table><tr id="tr_">
            <td class="msga2"><a class="am" href="/msg/toyota/x.html">Toyota Auris</a></td>
            <td class="msga2-o pp6">900</td>
        </tr></table>"#;
        let out = parse_listings(html, "https://www.ss.lv", false);
        assert_eq!(out[0].id, "https://www.ss.lv/msg/toyota/x.html");
    }

    #[test]
    fn duplicate_ids_collapse_to_first() {
        let html = format!(
            "<table>{}{}</table>",
            row("tr_dup", "/first.html", "Toyota Corolla", "5000"),
            row("tr_dup", "/second.html", "Toyota Corolla relist", "5100"),
        );
        let out = parse_listings(&html, "https://www.ss.lv", false);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Toyota Corolla");
    }

    #[test]
    fn defect_page_reads_four_positional_columns() {
        let html = r#"<table><tr id="tr_def1">
            <td class="msga2"><a class="am" href="/msg/defects/y.html">Toyota Avensis pēc avārijas</a></td>
            <td class="msga2-o pp6">Toyota</td>
            <td class="msga2-o pp6">Avensis</td>
            <td class="msga2-o pp6">2008</td>
            <td class="msga2-o pp6">45%</td>
        </tr></table>"#;
        let out = parse_listings(html, "https://www.ss.lv", true);
        let fields = out[0].category_fields.as_ref().unwrap();
        assert_eq!(fields.make, "Toyota");
        assert_eq!(fields.model, "Avensis");
        assert_eq!(fields.year, "2008");
        assert_eq!(fields.condition_pct, "45%");
        assert!(out[0].is_defect);
    }

    #[test]
    fn defect_page_with_few_columns_has_no_fields() {
        let html = r#"<table><tr id="tr_def2">
            <td class="msga2"><a class="am" href="/msg/defects/z.html">Toyota</a></td>
            <td class="msga2-o pp6">3000</td>
        </tr></table>"#;
        let out = parse_listings(html, "https://www.ss.lv", true);
        assert!(out[0].category_fields.is_none());
    }

    #[test]
    fn fuel_hint_from_option_table() {
        let html = r#"<table>
            <tr><td class="ads_opt_name">Motors:</td><td class="ads_opt">2.0 Benzīns</td></tr>
        </table>"#;
        assert_eq!(parse_fuel_hint(html), "2.0 Benzīns");
    }

    #[test]
    fn fuel_hint_from_row_label_variant() {
        let html = r#"<div>
            <div class="row-label">Gads</div>
            <div class="row-label">Dzinējs</div>
            <div class="row-value">2015</div>
            <div class="row-value">1.8 Dīzelis</div>
        </div>"#;
        assert_eq!(parse_fuel_hint(html), "1.8 Dīzelis");
    }

    #[test]
    fn fuel_hint_missing_is_empty() {
        assert_eq!(parse_fuel_hint("<html><body><p>nav datu</p></body></html>"), "");
    }
}
