//! Reference directive extraction.
//!
//! A submission may name reference scripts in its leading comment block:
//!
//! ```text
//! //!!Alpha
//! // an ordinary comment
//! //!!Beta
//! function main() { ... }
//! ```
//!
//! Extraction stops at the first non-comment line; everything after it is
//! left alone (it is still part of the compiled source).

/// Marker that opens an ordinary comment line.
pub const COMMENT_MARKER: &str = "//";

/// Marker that opens a reference directive line.
pub const DIRECTIVE_MARKER: &str = "//!!";

/// Scan the leading comment lines of `source` for reference directives.
///
/// Returns the directive names in order of appearance, duplicates included.
/// Empty lines are discarded before scanning and each remaining line is
/// trimmed of leading whitespace, so comment-indented directives count.
pub fn extract_references(source: &str) -> Vec<String> {
    let mut references = Vec::new();
    let lines = source
        .split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(str::trim_start);

    for line in lines {
        // Read until the first non-comment line
        if !line.starts_with(COMMENT_MARKER) {
            break;
        }
        if !line.starts_with(DIRECTIVE_MARKER) {
            continue;
        }
        references.push(line[DIRECTIVE_MARKER.len()..].trim().to_string());
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_comments_yields_empty_list() {
        let refs = extract_references("function main() {}\n");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_directives_extracted_in_order() {
        let source = "//!!Alpha\n//!!Beta\nfunction main() {}\n";
        assert_eq!(extract_references(source), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_plain_comment_does_not_stop_scan() {
        let source = "// note\n//!!Gamma\nfunction main() {}\n";
        assert_eq!(extract_references(source), vec!["Gamma"]);
    }

    #[test]
    fn test_code_first_line_yields_empty_list() {
        let source = "var x = 1;\n//!!Ignored\n";
        assert!(extract_references(source).is_empty());
    }

    #[test]
    fn test_extraction_stops_at_first_code_line() {
        let source = "//!!Alpha\nfunction main() {}\n//!!Beta\n";
        assert_eq!(extract_references(source), vec!["Alpha"]);
    }

    #[test]
    fn test_directive_name_is_trimmed() {
        let source = "//!!  Alpha  \nfunction main() {}\n";
        assert_eq!(extract_references(source), vec!["Alpha"]);
    }

    #[test]
    fn test_indented_directive_counts() {
        let source = "   //!!Alpha\nfunction main() {}\n";
        assert_eq!(extract_references(source), vec!["Alpha"]);
    }

    #[test]
    fn test_duplicates_preserved() {
        let source = "//!!Alpha\n//!!Alpha\nfunction main() {}\n";
        assert_eq!(extract_references(source), vec!["Alpha", "Alpha"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let source = "//!!Alpha\r\n//!!Beta\r\nfunction main() {}\r\n";
        assert_eq!(extract_references(source), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_blank_line_between_directives_is_discarded() {
        let source = "//!!Alpha\n\n//!!Beta\nfunction main() {}\n";
        assert_eq!(extract_references(source), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_whitespace_only_line_terminates_scan() {
        let source = "//!!Alpha\n   \n//!!Beta\nfunction main() {}\n";
        assert_eq!(extract_references(source), vec!["Alpha"]);
    }

    #[test]
    fn test_empty_source() {
        assert!(extract_references("").is_empty());
    }
}
