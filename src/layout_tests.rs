#[cfg(test)]
mod tests {
    use crate::layout::*;
    use crate::transform::Translator;
    use crate::validate::Subscription;

    #[test]
    fn test_extends_forms() {
        let tr = Translator::default();

        let ext = parse_extends("@extends('layouts.app')", &tr).unwrap();
        assert_eq!(ext.view, SuperView::Literal("layouts.app".to_string()));
        assert_eq!(ext.data, None);
        assert_eq!(ext.metadata_value(), "'layouts.app'");

        let ext = parse_extends("@extends(\"layouts.$theme\")", &tr).unwrap();
        assert_eq!(ext.view, SuperView::Expr("`layouts.${theme}`".to_string()));

        let ext = parse_extends("@extends($layout, ['a' => 1])", &tr).unwrap();
        assert_eq!(ext.view, SuperView::Expr("layout".to_string()));
        assert_eq!(ext.data.as_deref(), Some("{\"a\": 1}"));

        assert!(parse_extends("<p>no layout</p>", &tr).is_none());
        assert!(parse_extends("@extends('broken'", &tr).is_none());
    }

    #[test]
    fn test_deferred_markers() {
        assert!(has_await("@await\n<p>x</p>"));
        assert!(!has_await("@awaiting"));
        assert!(has_fetch("@fetch ('/x')"));
        assert!(!has_fetch("@fetchAll"));
    }

    #[test]
    fn test_fetch_config() {
        let tr = Translator::default();
        assert_eq!(
            parse_fetch("@fetch(['url' => '/api', 'data' => ['id' => $id], 'headers' => ['X' => 'y']])", &tr)
                .as_deref(),
            Some("{ url: \"/api\", method: \"GET\", data: {\"id\": id}, headers: {\"X\": \"y\"} }")
        );
        assert_eq!(
            parse_fetch("@fetch($endpoint)", &tr).as_deref(),
            Some("endpoint")
        );
        assert_eq!(parse_fetch("<p>x</p>", &tr), None);
    }

    #[test]
    fn test_subscription_values() {
        assert_eq!(parse_subscription(""), Subscription::All);
        assert_eq!(parse_subscription("true"), Subscription::All);
        assert_eq!(parse_subscription("'@all'"), Subscription::All);
        assert_eq!(parse_subscription("false"), Subscription::Off);
        assert_eq!(parse_subscription("[]"), Subscription::Off);
        assert_eq!(
            parse_subscription("[$a, 'b']"),
            Subscription::Keys(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            parse_subscription("$count"),
            Subscription::Keys(vec!["count".to_string()])
        );
    }

    #[test]
    fn test_view_subscribe_directive() {
        assert_eq!(parse_subscribe("<p>x</p>"), None);
        assert_eq!(parse_subscribe("@dontsubscribe"), Some(Subscription::Off));
        assert_eq!(parse_subscribe("  @subscribe(false)  "), Some(Subscription::Off));
        assert_eq!(parse_subscribe("<div @subscribe($a)>x</div>"), None);
        assert_eq!(parse_subscribe("@subscribeBlock('x')"), None);
    }

    #[test]
    fn test_view_type_and_init() {
        assert_eq!(parse_view_type("<p>x</p>"), "view");
        assert_eq!(parse_view_type("@viewType('layout')"), "layout");
        assert_eq!(parse_view_type("@viewtype(partial)"), "partial");

        let init = parse_init("@onInit\nconsole.log(1);\n@endOnInit\n<p>x</p>\n@oninit\nstart();\n@endoninit");
        assert_eq!(init, "console.log(1);\nstart();");
        assert_eq!(parse_init("<p>x</p>"), "");
    }
}
