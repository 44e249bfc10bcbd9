//! Scraping of the admin web tier's report listing page.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{ReportPackSummary, parse_id, sort_by_id};

pub const REPORTS_RESOURCE: &str = "admin/reports/";

const ROW_SELECTOR: &str = "table.content-table > tbody > tr";
const HEADER_SELECTOR: &str = "table.content-table > thead > tr > th";

/// Extract the pinned report packs from the admin listing markup, sorted by id.
pub fn parse_pinned(html: &str) -> Result<Vec<ReportPackSummary>> {
    let document = Html::parse_document(html);
    let rows = selector(ROW_SELECTOR)?;
    let cells = selector("td")?;

    let headers: Vec<String> = document
        .select(&selector(HEADER_SELECTOR)?)
        .map(|th| cell_text(&th))
        .collect();
    debug!(?headers, "parsed report table headers");

    let mut packs = Vec::new();
    for row in document.select(&rows) {
        let Some(raw_id) = row.value().attr("data-id") else {
            debug!("skipping report row without data-id");
            continue;
        };
        let id = parse_id(raw_id, REPORTS_RESOURCE)?;
        let name = row
            .select(&cells)
            .next()
            .map(|cell| cell_text(&cell))
            .ok_or_else(|| {
                Error::protocol(REPORTS_RESOURCE, format!("report row {id} has no cells"))
            })?;
        let pack = ReportPackSummary::new(id, name);
        debug!(?pack, "pinned report pack");
        packs.push(pack);
    }
    sort_by_id(&mut packs);
    Ok(packs)
}

fn selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw)
        .map_err(|err| Error::protocol(REPORTS_RESOURCE, format!("bad selector `{raw}`: {err:?}")))
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
