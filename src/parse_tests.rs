#[cfg(test)]
mod tests {
    use crate::parse::*;

    fn directive(name: &str, args: Option<&str>, raw: &str) -> Token {
        Token::Directive(DirectiveToken {
            name: name.to_string(),
            args: args.map(str::to_string),
            raw: raw.to_string(),
        })
    }

    fn text(t: &str) -> Token {
        Token::Text(t.to_string())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PREPROCESSING
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("a{{-- note --}}b"), "ab");
        assert_eq!(strip_comments("a{{--\nmulti\nline\n--}}b"), "ab");
    }

    #[test]
    fn test_backticks_escaped() {
        assert_eq!(preprocess("<p>`x`</p>").body, "<p>\\`x\\`</p>");
    }

    #[test]
    fn test_verbatim_protected_and_restored() {
        let pre = preprocess("@verbatim{{ $x }}@endverbatim");
        assert_eq!(pre.body, "__VERBATIM_BLOCK_0__");
        assert_eq!(pre.verbatim, vec!["{{ $x }}".to_string()]);
        assert_eq!(restore_verbatim(&pre.body, &pre.verbatim), "{{ $x }}");
        assert_eq!(restore_verbatim("__VERBATIM_BLOCK_7__", &pre.verbatim), "__VERBATIM_BLOCK_7__");
    }

    #[test]
    fn test_view_directives_removed() {
        let pre = preprocess("@extends('layouts.app')\n@vars($user)\n<div>{{ $user }}</div>");
        assert_eq!(pre.body, "<div>{{ $user }}</div>");

        let pre = preprocess("@await\n<p>x</p>");
        assert_eq!(pre.body, "<p>x</p>");
    }

    #[test]
    fn test_unbalanced_view_directive_left_in_place() {
        let pre = preprocess("@extends('layouts.app'\n<p>x</p>");
        assert!(pre.body.starts_with("@extends('layouts.app'"));
    }

    #[test]
    fn test_standalone_subscribe_removed_attribute_kept() {
        let pre = preprocess("@subscribe($count)\n<div @subscribe($count)>x</div>");
        assert_eq!(pre.body, "<div @subscribe($count)>x</div>");
    }

    #[test]
    fn test_register_region_removed() {
        let pre = preprocess("@register\n<script>let a = 1;</script>\n@endregister\n<p>x</p>");
        assert_eq!(pre.body.trim(), "<p>x</p>");

        let pre = preprocess("<script setup>const a = 1;</script>\n<p>x</p>");
        assert_eq!(pre.body.trim(), "<p>x</p>");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // LEXER
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_text_lines_trimmed_and_grouped() {
        assert_eq!(
            lex("  <div>\n    <p>x</p>\n  </div>"),
            vec![text("<div>\n<p>x</p>\n</div>")]
        );
    }

    #[test]
    fn test_directive_followed_by_text_on_same_line() {
        assert_eq!(
            lex("@if($a) <b>yes</b>\n@endif"),
            vec![
                directive("if", Some("$a"), "@if($a)"),
                text("<b>yes</b>"),
                directive("endif", None, "@endif"),
            ]
        );
    }

    #[test]
    fn test_block_directive_only_at_line_start() {
        assert_eq!(lex("<p>@if($a)</p>"), vec![text("<p>@if($a)</p>")]);
    }

    #[test]
    fn test_unbalanced_arguments_become_text() {
        assert_eq!(lex("@if($a\n<p>x</p>"), vec![text("@if($a\n<p>x</p>")]);
    }

    #[test]
    fn test_multiline_arguments() {
        let tokens = lex("@if($a &&\n   $b)\nX\n@endif");
        assert_eq!(tokens.len(), 3);
        assert_eq!(
            tokens[0],
            directive("if", Some("$a &&\n   $b"), "@if($a &&\n   $b)")
        );
        assert_eq!(tokens[1], text("X"));
    }

    #[test]
    fn test_required_arguments() {
        assert_eq!(lex("@section"), vec![text("@section")]);
        assert_eq!(lex("@iffy"), vec![text("@iffy")]);
        assert_eq!(lex("@endif2"), vec![text("@endif2")]);
        assert_eq!(lex("@php"), vec![directive("php", None, "@php")]);
    }

    #[test]
    fn test_server_region_dropped() {
        assert_eq!(
            lex("@serverside\n<p>server</p>\n@endserverside\n<p>both</p>"),
            vec![text("<p>both</p>")]
        );
    }

    #[test]
    fn test_client_region_kept() {
        assert_eq!(
            lex("@clientside\n<p>client</p>\n@endclientside"),
            vec![text("<p>client</p>")]
        );
    }

    #[test]
    fn test_pre_keeps_indentation() {
        assert_eq!(
            lex("<pre>\n  indented\n</pre>\n  <p>x</p>"),
            vec![text("<pre>\n  indented\n</pre>\n<p>x</p>")]
        );
    }
}
