//! Human-readable tables via comfy-table.

use comfy_table::{presets::ASCII_BORDERS_ONLY_CONDENSED, Table};
use strata_core::RecordList;

pub fn render(list: &RecordList) -> String {
    let rows: Vec<Vec<String>> = list
        .iter()
        .map(|rec| list.columns().iter().map(|col| rec.render(col)).collect())
        .collect();
    let header: Vec<String> = list.columns().to_vec();
    render_rows(&header, &rows)
}

pub fn render_rows(header: &[String], rows: &[Vec<String>]) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);
    table.set_header(header);
    for row in rows {
        table.add_row(row);
    }
    format!("{}\n({} rows)", table, rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{Record, ResourceKind};

    #[test]
    fn renders_header_and_row_count() {
        let rec = Record::from_value(
            ResourceKind::Editor,
            json!({"name": "jupyterlab", "id": "jl", "is_default": true}),
        )
        .unwrap();
        let list = RecordList::from_records(ResourceKind::Editor, vec![rec]);
        let out = render(&list);
        assert!(out.contains("name"));
        assert!(out.contains("jupyterlab"));
        assert!(out.ends_with("(1 rows)"));
    }

    #[test]
    fn empty_tables_still_show_columns() {
        let list = RecordList::empty(ResourceKind::Editor);
        let out = render(&list);
        assert!(out.contains("name"));
        assert!(out.ends_with("(0 rows)"));
    }
}
