#[cfg(test)]
mod tests {
    use crate::scope::*;
    use crate::validate::DeclarationSource;

    #[test]
    fn test_vars_with_defaults() {
        let list = track_declarations("@vars($user, $count = 0, 'title' => 'Home')");
        assert_eq!(list.items.len(), 1);
        let decl = &list.items[0];
        assert_eq!(decl.source, DeclarationSource::Vars);
        assert_eq!(decl.names, vec!["user", "count", "title"]);
        assert_eq!(
            decl.defaults,
            vec![None, Some("0".to_string()), Some("\"Home\"".to_string())]
        );
        assert!(decl.has_default);
        assert_eq!(list.injected_names(), vec!["user", "count", "title"]);
        assert!(list.has_injected());
    }

    #[test]
    fn test_vars_bracketed_list() {
        let list = track_declarations("@vars([$a, $b])");
        assert_eq!(list.injected_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_let_and_const_in_order() {
        let list = track_declarations(
            "@let($total = count($items))\n<p>x</p>\n@const($LIMIT = 10)",
        );
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].source, DeclarationSource::Let);
        assert_eq!(list.items[0].target, "total");
        assert_eq!(
            list.items[0].value.as_deref(),
            Some("App.Helper.count(items)")
        );
        assert_eq!(list.items[1].source, DeclarationSource::Const);
        assert_eq!(list.items[1].names, vec!["LIMIT"]);
        assert!(!list.has_injected());
    }

    #[test]
    fn test_destructuring_let() {
        let list = track_declarations("@let([$first, $second] = $pair)");
        let decl = &list.items[0];
        assert!(decl.is_destructuring);
        assert_eq!(decl.names, vec!["first", "second"]);
        assert_eq!(decl.target, "[first, second]");
        assert!(!decl.is_stateful);
    }

    #[test]
    fn test_unclosed_destructuring_skipped() {
        let list = track_declarations("@let([aé)\n@let($ok = 1)");
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].names, vec!["ok"]);

        assert!(track_declarations("@let({$é = $x)").items.is_empty());
        assert!(track_declarations("@const([$a, $b} = $pair)").items.is_empty());
    }

    #[test]
    fn test_use_state_destructuring() {
        let list = track_declarations("@let([$count, $setCount] = useState(0))");
        let state = list.items[0].stateful.as_ref().unwrap();
        assert_eq!(state.state_key, "count");
        assert_eq!(state.setter_name, "setCount");
        assert_eq!(state.register_setter, "set$count");
        assert_eq!(state.initial_value, "0");
        assert!(list.has_stateful());
    }

    #[test]
    fn test_use_state_directive_forms() {
        let list = track_declarations("@useState($open, 'isOpen')");
        let state = list.items[0].stateful.as_ref().unwrap();
        assert_eq!(state.state_key, "isOpen");
        assert_eq!(state.setter_name, "setIsOpen");
        assert_eq!(state.register_setter, "set$isOpen");
        assert_eq!(state.initial_value, "open");

        let list = track_declarations("@useState([], 'items', 'updateItems')");
        let state = list.items[0].stateful.as_ref().unwrap();
        assert_eq!(state.setter_name, "updateItems");
        assert_eq!(state.register_setter, "set$items");
        assert_eq!(state.initial_value, "[]");

        let list = track_declarations("@useState([$n, $setN] = useState())");
        let state = list.items[0].stateful.as_ref().unwrap();
        assert_eq!(state.state_key, "n");
        assert_eq!(state.initial_value, "null");
    }

    #[test]
    fn test_malformed_and_opaque_regions_skipped() {
        let list = track_declarations("@vars($a\n@let($b = 1)");
        assert!(list.injected_names().is_empty());
        assert_eq!(list.items.len(), 1);

        let list = track_declarations("<script>@vars($hidden)</script>\n@verbatim @let($x = 1) @endverbatim");
        assert!(list.items.is_empty());

        let list = track_declarations("@@vars($escaped)");
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_binding_table_frozen_with_setters() {
        let list = track_declarations("@vars($user)\n@useState(0, 'count')");
        let table = list.binding_table();
        assert!(table.is_frozen());
        for name in ["user", "count", "setCount"] {
            assert!(table.has(name), "missing {}", name);
        }
        assert!(!table.has("other"));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("user_1"));
        assert!(!is_identifier("$x"));
        assert!(!is_identifier("1user"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a-b"));
    }
}
