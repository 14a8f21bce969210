use csv::{ReaderBuilder, StringRecord, Trim};

const HEADING: &str = "## Document Data\n\n";

/// Render CSV text as a markdown table under a "Document Data" heading.
///
/// The first non-blank row is the header. Rows whose width differs from the header are left
/// out. Blank input renders as an empty string.
pub fn csv_to_markdown(raw: &str) -> Result<String, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(record);
    }

    let Some((header, body)) = rows.split_first() else {
        return Ok(String::new());
    };

    let mut out = String::from(HEADING);
    push_row(&mut out, header);
    out.push('|');
    out.push_str(&vec!["---"; header.len()].join("|"));
    out.push_str("|\n");
    for row in body.iter().filter(|row| row.len() == header.len()) {
        push_row(&mut out, row);
    }

    Ok(out)
}

fn push_row(out: &mut String, record: &StringRecord) {
    let cells: Vec<String> = record
        .iter()
        .map(|cell| cell.replace('|', "\\|").replace(['\r', '\n'], " "))
        .collect();
    out.push_str("| ");
    out.push_str(&cells.join(" | "));
    out.push_str(" |\n");
}
