#[cfg(test)]
mod tests {
    use crate::transform::*;

    #[test]
    fn test_sigils_and_member_access() {
        assert_eq!(translate("$user->name"), "user.name");
        assert_eq!(translate("$user?->profile"), "user?.profile");
        assert_eq!(translate("Str::upper($x)"), "Str.upper(x)");
        assert_eq!(translate("user.name"), "user.name");
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(translate("'Hello ' . $name"), "\"Hello \" + name");
        assert_eq!(translate("$a.'x'"), "a + \"x\"");
        assert_eq!(translate("$s .= 'x'"), "s += \"x\"");
    }

    #[test]
    fn test_function_routing() {
        assert_eq!(translate("count($items)"), "App.Helper.count(items)");
        assert_eq!(translate("route('home')"), "App.View.route(\"home\")");
        assert_eq!(translate("$user->getName()"), "user.getName()");
        assert_eq!(translate("Math.max($a, 1)"), "Math.max(a, 1)");
        assert_eq!(translate("typeof($x)"), "typeof(x)");
        assert_eq!(translate("new Foo()"), "new Foo()");
    }

    #[test]
    fn test_local_bindings_stay_unqualified() {
        let mut table = BindingTable::new();
        table.add("format");
        table.freeze();
        assert!(!table.add("late"));

        let translator = Translator::new(&table);
        assert_eq!(translator.translate("format($x)"), "format(x)");
        assert_eq!(translator.translate("late($x)"), "App.Helper.late(x)");
    }

    #[test]
    fn test_arrays_and_objects() {
        assert_eq!(translate("[1, 2, 3]"), "[1, 2, 3]");
        assert_eq!(translate("['a' => 1, 'b' => $x]"), "{\"a\": 1, \"b\": x}");
        assert_eq!(translate("['x', 'k' => 2]"), "{\"0\": \"x\", \"k\": 2}");
        assert_eq!(translate("[$key => 1]"), "{[key]: 1}");
    }

    #[test]
    fn test_index_access() {
        assert_eq!(translate("$items[0]"), "items[0]");
        assert_eq!(translate("$row['id']"), "row[\"id\"]");
        assert_eq!(translate("$rows[0]['id']"), "rows[0][\"id\"]");
    }

    #[test]
    fn test_arrow_shorthand() {
        assert_eq!(translate("fn($x) => $x * 2"), "(x) => x * 2");
    }

    #[test]
    fn test_string_literals_kept() {
        assert_eq!(translate(r"'it\'s'"), r"'it\'s'");
        assert_eq!(translate(r#"'say "hi"'"#), r#"'say "hi"'"#);
        assert_eq!(translate("'$notAVar'"), "\"$notAVar\"");
    }

    #[test]
    fn test_translation_is_idempotent() {
        let inputs = [
            "$user->name",
            "count($items)",
            "'Hello ' . $name",
            "['a' => 1, 'b' => $x]",
            "$rows[0]['id']",
            "fn($x) => $x * 2",
            "$user?->profile ?? 'guest'",
            "$s .= 'x'",
            "route('home', ['id' => $post->id])",
        ];
        for input in inputs {
            let once = translate(input);
            assert_eq!(translate(&once), once, "input: {}", input);
        }
    }

    #[test]
    fn test_namespace_classification() {
        assert_eq!(FunctionNamespace::classify("foreach"), FunctionNamespace::View);
        assert_eq!(FunctionNamespace::classify("csrfToken"), FunctionNamespace::View);
        assert_eq!(FunctionNamespace::classify("url"), FunctionNamespace::Helper);
        assert_eq!(FunctionNamespace::qualify("csrfToken"), "App.View.csrfToken");
        assert_eq!(FunctionNamespace::Helper.prefix(), "App.Helper");
        assert_eq!(FunctionNamespace::classify("foreachTemplate"), FunctionNamespace::View);
        assert_eq!(VIEW_FUNCTIONS.len(), 46);
    }

    #[test]
    fn test_unbalanced_bracket_rest_translated() {
        assert_eq!(translate("$a[ $b"), "a[ b");
        assert_eq!(translate("count($items[0"), "App.Helper.count(items[0");
        assert_eq!(translate("$list[$user->id"), "list[user.id");
    }
}
