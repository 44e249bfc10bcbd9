use reportpack_core::ReportPackSummary;

const HEADERS: [&str; 2] = ["id", "name"];

/// Plain-text table with a right-aligned id column and a left-aligned name
/// column, separated by two spaces.
pub fn render(packs: &[ReportPackSummary]) -> String {
    let ids: Vec<String> = packs.iter().map(|pack| pack.id.to_string()).collect();
    let id_width = ids
        .iter()
        .map(String::len)
        .chain([HEADERS[0].len()])
        .max()
        .unwrap_or_default();
    let name_width = packs
        .iter()
        .map(|pack| pack.name.chars().count())
        .chain([HEADERS[1].len()])
        .max()
        .unwrap_or_default();

    let mut lines = Vec::with_capacity(packs.len() + 2);
    lines.push(format!("{:>id_width$}  {:<name_width$}", HEADERS[0], HEADERS[1]));
    lines.push(format!("{}  {}", "-".repeat(id_width), "-".repeat(name_width)));
    for (id, pack) in ids.iter().zip(packs) {
        lines.push(format!("{id:>id_width$}  {:<name_width$}", pack.name));
    }
    lines
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_columns() {
        let table = render(&[
            ReportPackSummary::new(3, "VMware"),
            ReportPackSummary::new(112, "Exchange"),
        ]);
        assert_eq!(
            table,
            " id  name\n---  --------\n  3  VMware\n112  Exchange"
        );
    }

    #[test]
    fn empty_listing_keeps_headers() {
        assert_eq!(render(&[]), "id  name\n--  ----");
    }
}
