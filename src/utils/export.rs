//! Minimal CSV writer for table exports (RFC 4180 quoting, CRLF rows).

/// Quotes a field when it contains a delimiter, quote or line break.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn line<S: AsRef<str>>(fields: &[S]) -> String {
    let mut out = fields
        .iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str("\r\n");
    out
}

pub fn to_csv<S: AsRef<str>>(header: &[&str], rows: &[Vec<S>]) -> String {
    let mut out = line(header);
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_left_alone() {
        let csv = to_csv(&["Date", "Status"], &[vec!["2026-03-02", "present"]]);
        assert_eq!(csv, "Date,Status\r\n2026-03-02,present\r\n");
    }

    #[test]
    fn special_characters_are_quoted() {
        let csv = to_csv(&["Location"], &[vec!["Office, 3rd \"B\" floor".to_string()]]);
        assert_eq!(csv, "Location\r\n\"Office, 3rd \"\"B\"\" floor\"\r\n");
    }
}
