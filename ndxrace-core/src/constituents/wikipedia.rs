//! Refresh the constituent table from the Wikipedia "Nasdaq-100" article.
//!
//! The article's layout drifts, so the parser looks for the first table
//! whose header row has a `Ticker` or `Symbol` column rather than relying
//! on a table index.

use super::{Constituent, ConstituentError, ConstituentTable};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::debug;

pub const NASDAQ_100_URL: &str = "https://en.wikipedia.org/wiki/Nasdaq-100";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Download the article and parse its constituents table.
pub fn fetch_constituents(url: &str) -> Result<ConstituentTable, ConstituentError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ConstituentError::Wikipedia(e.to_string()))?;

    debug!("GET {url}");
    let html = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.text())
        .map_err(|e| ConstituentError::Wikipedia(e.to_string()))?;

    parse_constituents_table(&html)
}

/// Yahoo writes class shares with a dash (`BRK.B` → `BRK-B`).
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().replace('.', "-")
}

fn selector(css: &str) -> Result<Selector, ConstituentError> {
    Selector::parse(css).map_err(|e| ConstituentError::Parse(format!("selector {css}: {e:?}")))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Find the constituents table in the article HTML.
pub fn parse_constituents_table(html: &str) -> Result<ConstituentTable, ConstituentError> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header) = rows.next() else {
            continue;
        };
        let headers: Vec<String> = header.select(&cell_sel).map(cell_text).collect();

        let Some(ticker_col) = headers.iter().position(|h| h == "Ticker" || h == "Symbol") else {
            continue;
        };
        let name_col = headers
            .iter()
            .position(|h| h == "Company" || h == "Security" || h == "Name");
        let sector_col = headers.iter().position(|h| h.contains("Sector"));

        let mut constituents = Vec::new();
        for row in rows {
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            let Some(raw_ticker) = cells.get(ticker_col) else {
                continue;
            };
            let ticker = normalize_ticker(raw_ticker);
            if ticker.is_empty() {
                continue;
            }
            let name = name_col
                .and_then(|i| cells.get(i))
                .cloned()
                .unwrap_or_else(|| ticker.clone());
            let mut constituent = Constituent::new(ticker, name);
            if let Some(sector) = sector_col.and_then(|i| cells.get(i)) {
                constituent = constituent.with_sector(sector.clone());
            }
            constituents.push(constituent);
        }

        debug!("found constituents table with {} rows", constituents.len());
        return ConstituentTable::new(constituents);
    }

    Err(ConstituentError::Wikipedia(
        "no table with a Ticker or Symbol column".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"
        <html><body>
        <table class="infobox"><tr><th>Foundation</th><td>1985</td></tr></table>
        <table class="wikitable sortable" id="constituents">
          <tbody>
            <tr><th>Company</th><th>Ticker</th><th>GICS Sector</th><th>GICS Sub-Industry</th></tr>
            <tr><td><a href="/wiki/Adobe_Inc.">Adobe Inc.</a></td><td>ADBE</td><td>Information Technology</td><td>Application Software</td></tr>
            <tr><td>Berkshire Example</td><td>BRK.B</td><td>Financials</td><td>Insurance</td></tr>
            <tr><td>Microsoft</td><td> MSFT </td><td>Information Technology</td><td>Systems Software</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn parses_first_ticker_table() {
        let table = parse_constituents_table(ARTICLE).unwrap();
        assert_eq!(table.tickers(), vec!["ADBE", "BRK-B", "MSFT"]);
        let adbe = table.get("ADBE").unwrap();
        assert_eq!(adbe.name, "Adobe Inc.");
        assert_eq!(adbe.sector.as_deref(), Some("Information Technology"));
    }

    #[test]
    fn symbol_header_is_accepted() {
        let html = "<table><tr><th>Symbol</th><th>Name</th></tr><tr><td>NVDA</td><td>Nvidia</td></tr></table>";
        let table = parse_constituents_table(html).unwrap();
        assert_eq!(table.get("NVDA").unwrap().name, "Nvidia");
        assert_eq!(table.get("NVDA").unwrap().sector, None);
    }

    #[test]
    fn missing_table_is_an_error() {
        let html = "<table><tr><th>Year</th><th>Close</th></tr></table>";
        assert!(matches!(
            parse_constituents_table(html),
            Err(ConstituentError::Wikipedia(_))
        ));
    }

    #[test]
    fn normalizes_class_shares() {
        assert_eq!(normalize_ticker(" BRK.B "), "BRK-B");
        assert_eq!(normalize_ticker("GOOGL"), "GOOGL");
    }
}
