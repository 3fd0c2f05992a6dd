#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::{json, Map, Value};
    use tempfile::NamedTempFile;
    use toolshelf_cli::utils;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn parse_rows_accepts_arrays_wrappers_and_ndjson() {
        let array = utils::parse_rows(r#"[{"name": "A"}, {"name": "B", "tags": "x,y"}]"#)
            .expect("parse array");
        assert_eq!(array.len(), 2);
        assert_eq!(array[1].tags.as_deref(), Some("x,y"));

        let wrapped = utils::parse_rows(r#"{"rows": [{"name": "A", "featured": true}]}"#)
            .expect("parse wrapper");
        assert_eq!(wrapped[0].featured.as_deref(), Some("true"));

        let ndjson = utils::parse_rows("{\"name\": \"A\"}\n\n{\"name\": \"B\", \"rating\": 4}\n")
            .expect("parse ndjson");
        assert_eq!(ndjson.len(), 2);
        assert_eq!(ndjson[1].rating.as_deref(), Some("4"));

        assert!(utils::parse_rows("   ").expect("parse empty").is_empty());
        assert!(utils::parse_rows("{\"name\": \"A\"}\nnot json").is_err());
    }

    #[test]
    fn read_rows_file_reads_from_disk() {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(br#"[{"name": "Writer", "pricing": "free, paid"}]"#)
            .expect("write rows");
        file.flush().expect("flush rows");

        let rows = utils::read_rows_file(file.path()).expect("read rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name.as_deref(), Some("Writer"));
        assert_eq!(rows[0].pricing.as_deref(), Some("free, paid"));
    }

    #[test]
    fn cell_text_flattens_values() {
        assert_eq!(utils::cell_text(&json!(["free", "paid"])), "free, paid");
        assert_eq!(utils::cell_text(&Value::Null), "");
        assert_eq!(utils::cell_text(&json!(12)), "12");
        assert_eq!(utils::cell_text(&json!("plain")), "plain");
    }

    #[test]
    fn format_table_pads_columns_and_clips_long_cells() {
        let rows = vec![
            row(json!({"name": "Alpha", "views": 3})),
            row(json!({"name": "A much longer tool name that keeps going and going"})),
        ];
        let table = utils::format_table(&["name", "views"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("+-"));
        assert!(lines[1].contains(" name "));
        assert!(lines[4].contains("..."));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|line| line.chars().count() == width));
    }

    #[test]
    fn format_vertical_numbers_rows() {
        let rows = vec![row(json!({"id": "t1", "name": "Alpha"}))];
        let output = utils::format_vertical(&rows);
        assert!(output.contains("[1]"));
        assert!(output.contains("id: t1\n"));
        assert!(output.contains("name: Alpha\n"));
        assert_eq!(utils::format_vertical(&[]), "(no rows)\n");
    }
}
