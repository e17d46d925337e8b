//! CSV output with minimal RFC-4180 escaping.

pub fn render(header: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    push_row(&mut out, header);
    for row in rows {
        push_row(&mut out, row);
    }
    out
}

fn push_row(out: &mut String, row: &[String]) {
    let escaped: Vec<String> = row.iter().map(|v| escape(v)).collect();
    out.push_str(&escaped.join(","));
    out.push('\n');
}

fn escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn renders_header_then_rows() {
        let header = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1".to_string(), "x,y".to_string()]];
        assert_eq!(render(&header, &rows), "a,b\n1,\"x,y\"\n");
    }
}
