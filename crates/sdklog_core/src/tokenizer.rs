// tokenizer.rs: quote-aware CSV splitting for CSV-formatted SDK logs
use memchr::{memchr, memchr_iter};

/// Split one CSV line into fields. Double quotes delimit a field, `""` inside a quoted
/// field is a literal quote, and a trailing comma yields a trailing empty field.
pub fn split_csv(line: &str) -> Vec<String> {
    let bytes = line.as_bytes();
    let n = bytes.len();
    let mut i = 0usize;
    // Pre-reserve capacity based on comma count to reduce reallocations
    let approx_fields = memchr_iter(b',', bytes).count() + 1;
    let mut out: Vec<String> = Vec::with_capacity(approx_fields);

    if n == 0 {
        return out;
    }

    loop {
        let mut field = String::new();
        if bytes[i] == b'"' {
            i += 1;
            // every split point below is an ASCII quote or comma, so slicing stays on char boundaries
            while i < n {
                match memchr(b'"', &bytes[i..]) {
                    Some(pos) => {
                        field.push_str(&line[i..i + pos]);
                        i += pos;
                        if i + 1 < n && bytes[i + 1] == b'"' {
                            field.push('"');
                            i += 2;
                        } else {
                            i += 1;
                            break;
                        }
                    }
                    None => {
                        // unterminated quote: keep the rest of the line
                        field.push_str(&line[i..]);
                        i = n;
                    }
                }
            }
            // text between a closing quote and the next comma is kept as-is
            if let Some(pos) = memchr(b',', &bytes[i..]) {
                field.push_str(&line[i..i + pos]);
                i += pos;
            } else {
                field.push_str(&line[i..]);
                i = n;
            }
        } else if let Some(pos) = memchr(b',', &bytes[i..]) {
            field.push_str(&line[i..i + pos]);
            i += pos;
        } else {
            field.push_str(&line[i..]);
            i = n;
        }
        out.push(field);

        if i < n && bytes[i] == b',' {
            i += 1;
            if i == n {
                out.push(String::new());
                break;
            }
        } else {
            break;
        }
    }

    out
}

/// True when the line contains an opening quote that is never closed, i.e. the CSV
/// record continues on the next physical line.
pub fn has_open_quote(line: &str) -> bool {
    // an escaped `""` contributes two quotes, so parity alone decides
    memchr_iter(b'"', line.as_bytes()).count() % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::{has_open_quote, split_csv};

    #[test]
    fn test_split_csv_basic_and_quotes() {
        assert_eq!(split_csv("a,b,c"), vec!["a", "b", "c"]);
        // Quoted with comma and escaped quotes
        assert_eq!(split_csv("\"a,b\",\"c\"\"d\"\"e\",f"), vec!["a,b", "c\"d\"e", "f"]);
        // Trailing empty field
        assert_eq!(split_csv("a,b,"), vec!["a", "b", ""]);
        assert_eq!(split_csv(",leading"), vec!["", "leading"]);
        assert_eq!(split_csv("a,,b"), vec!["a", "", "b"]);
        let v: Vec<String> = split_csv("");
        assert!(v.is_empty());
    }

    #[test]
    fn test_split_csv_keeps_multibyte_text() {
        assert_eq!(split_csv("\"héllo, wörld\",ünïcode"), vec!["héllo, wörld", "ünïcode"]);
    }

    #[test]
    fn test_split_csv_json_column() {
        let line = r#"2023-01-10 11:30:24.459,INFO,main,"{""az.sdk.message"":""hi"",""n"":1}""#;
        let fields = split_csv(line);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3], r#"{"az.sdk.message":"hi","n":1}"#);
    }

    #[test]
    fn test_split_csv_unterminated_quote() {
        assert_eq!(split_csv("a,\"open, still"), vec!["a", "open, still"]);
    }

    #[test]
    fn test_has_open_quote() {
        assert!(!has_open_quote("a,\"b\",c"));
        assert!(has_open_quote("a,\"b, still going"));
        assert!(!has_open_quote("a,\"b\"\"c\""));
    }
}
