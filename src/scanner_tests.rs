#[cfg(test)]
mod tests {
    use crate::scanner::*;

    #[test]
    fn test_nested_span_with_quoted_closer() {
        let text = "foo(bar(1), 'x)')";
        let span = scan_balanced(text, 3).unwrap();
        assert_eq!(span.open, 3);
        assert_eq!(span.close, text.len() - 1);
        assert_eq!(span.inner(text), "bar(1), 'x)'");
        assert_eq!(span.end(), text.len());
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        let text = r#"("a\"b)") tail"#;
        let span = scan_balanced(text, 0).unwrap();
        assert_eq!(span.inner(text), r#""a\"b)""#);
        assert_eq!(&text[span.end()..], " tail");
    }

    #[test]
    fn test_backtick_and_mixed_delimiters() {
        assert_eq!(scan_balanced("(`)`)", 0).map(|s| s.close), Some(4));

        let text = "{a: [1, 2], b: '}'}";
        let span = scan_balanced(text, 0).unwrap();
        assert_eq!(span.close, text.len() - 1);

        let text = "[[1], [2, [3]]] + x";
        let span = scan_balanced(text, 0).unwrap();
        assert_eq!(span.inner(text), "[1], [2, [3]]");
    }

    #[test]
    fn test_unbalanced_is_not_found() {
        assert_eq!(scan_balanced("(a, (b)", 0), None);
        assert_eq!(scan_balanced("('unterminated)", 0), None);
        assert_eq!(scan_balanced("{ [ }", 2), None);
    }

    #[test]
    fn test_non_delimiter_start() {
        assert_eq!(scan_balanced("abc", 0), None);
        assert_eq!(scan_balanced("", 0), None);
        assert_eq!(scan_balanced("(x)", 10), None);
    }

    #[test]
    fn test_scan_args_skips_blanks_only() {
        let text = "@if  ($a)";
        let span = scan_args(text, 3).unwrap();
        assert_eq!(span.inner(text), "$a");

        assert_eq!(scan_args("@if\n($a)", 3), None);
        assert_eq!(scan_args("@else", 5), None);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("a, fn(b, c), 'd,e', [f, g],", b','),
            vec!["a", "fn(b, c)", "'d,e'", "[f, g]"]
        );
        assert!(split_top_level("", b',').is_empty());
    }

    #[test]
    fn test_find_top_level_skips_quotes() {
        assert_eq!(find_top_level("'x=>y' => z", "=>"), Some(7));
        assert_eq!(find_top_level("f(a => b)", "=>"), None);
    }

    #[test]
    fn test_find_assignment() {
        assert_eq!(find_assignment("$a = $b == 1"), Some(3));
        assert_eq!(find_assignment("$a == $b"), None);
        assert_eq!(find_assignment("$x <= 2"), None);
        assert_eq!(find_assignment("$x != 2"), None);
        assert_eq!(find_assignment("fn => 1"), None);
        assert_eq!(find_assignment("[$a, $b] = useState(0)"), Some(9));
    }

    #[test]
    fn test_unquote_and_bare_name() {
        assert_eq!(unquote("'abc'"), Some("abc"));
        assert_eq!(unquote(" \"abc\" "), Some("abc"));
        assert_eq!(unquote("'abc\""), None);
        assert_eq!(unquote("'"), None);
        assert_eq!(bare_name("$user"), "user");
        assert_eq!(bare_name("'key'"), "key");
        assert_eq!(bare_name(" plain "), "plain");
    }

    #[test]
    fn test_read_word() {
        assert_eq!(read_word("@foreach($x)", 1), "foreach");
        assert_eq!(read_word("@end_if2 rest", 1), "end_if2");
        assert_eq!(read_word("@(", 1), "");
    }
}
