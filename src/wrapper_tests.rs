#[cfg(test)]
mod tests {
    use crate::transform::Translator;
    use crate::validate::{Subscription, WrapperConfig};
    use crate::wrapper::*;
    use std::fs;

    fn wrap(args: &str) -> WrapperConfig {
        parse_wrap_args(args, &Translator::default())
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // @wrap ARGUMENTS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_positional_tag_and_attributes() {
        let config = wrap("'section', ['class' => 'card', 'id' => $id]");
        assert_eq!(config.tag.as_deref(), Some("section"));
        assert_eq!(
            config.attributes,
            vec![
                ("class".to_string(), "\"card\"".to_string()),
                ("id".to_string(), "id".to_string()),
            ]
        );
        assert_eq!(config.follow, Subscription::All);
        assert_eq!(config.subscribe, None);
    }

    #[test]
    fn test_keyed_options() {
        let config = wrap("['tag' => 'div', 'follow' => false, 'subscribe' => ['a'], 'role' => 'main']");
        assert_eq!(config.tag.as_deref(), Some("div"));
        assert_eq!(config.follow, Subscription::Off);
        assert_eq!(config.subscribe, Some(Subscription::Keys(vec!["a".to_string()])));
        assert_eq!(config.attributes, vec![("role".to_string(), "\"main\"".to_string())]);

        let config = wrap("tag: 'aside', attrs: {'data-x': 1}");
        assert_eq!(config.tag.as_deref(), Some("aside"));
        assert_eq!(config.attributes, vec![("data-x".to_string(), "1".to_string())]);

        let config = wrap("$tag = 'nav'");
        assert_eq!(config.tag.as_deref(), Some("nav"));
    }

    #[test]
    fn test_config_assignment() {
        assert_eq!(
            config_assignment(&wrap("")),
            "__WRAPPER_CONFIG__ = { enable: true, tag: null, follow: true, attributes: {} };"
        );
        assert_eq!(
            config_assignment(&wrap("'div', 'subscribe' => false, 'class' => 'x'")),
            "__WRAPPER_CONFIG__ = { enable: true, tag: \"div\", follow: true, subscribe: false, attributes: {\"class\": \"x\"} };"
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SPLITTING
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_split_wrapper() {
        let body = "<p>junk</p>\n${App.View.section('title', \"T\", 'string')}\n\
                    __WRAPPER_CONFIG__ = { enable: true, tag: \"div\", follow: true, attributes: {} };\n\
                    <main>x</main>\n\
                    __WRAPPER_END__\n\
                    <footer>${App.View.escString(year)}</footer>";
        let split = split_wrapper(body).unwrap();
        assert_eq!(
            split.config,
            "{ enable: true, tag: \"div\", follow: true, attributes: {} }"
        );
        assert_eq!(split.inner, "<main>x</main>");
        assert_eq!(split.before, "${App.View.section('title', \"T\", 'string')}");
        assert_eq!(split.after, "");
    }

    #[test]
    fn test_split_without_end_marker() {
        let split = split_wrapper("__WRAPPER_CONFIG__ = { enable: true };\n<p>rest</p>").unwrap();
        assert_eq!(split.inner, "<p>rest</p>");
        assert!(split_wrapper("<p>no wrapper</p>").is_none());
    }

    #[test]
    fn test_filter_directives_only() {
        let text = "<p>${App.View.escString(a)}</p>\n${App.View.execute(() => { if(x){ return `y`; } return ''; })}\n${this.__useBlock('b')}";
        assert_eq!(
            filter_directives_only(text),
            "${App.View.execute(() => { if(x){ return `y`; } return ''; })}\n${this.__useBlock('b')}"
        );
        assert_eq!(filter_directives_only("<p>plain</p>"), "");
    }

    #[test]
    fn test_take_subscribe() {
        let (config, subscribe) =
            take_subscribe("{ enable: true, tag: null, follow: true, subscribe: [\"a\",\"b\"], attributes: {} }");
        assert_eq!(
            subscribe,
            Some(Subscription::Keys(vec!["a".to_string(), "b".to_string()]))
        );
        assert!(!config.contains("subscribe"));
        assert!(config.contains("follow: true,"));

        let (config, subscribe) = take_subscribe("{ enable: true }");
        assert_eq!(config, "{ enable: true }");
        assert_eq!(subscribe, None);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SHARED RESOURCES
    // ═══════════════════════════════════════════════════════════════════════════════

    const RESOURCES: &str = "// header\n\
        // start wrapper\n\
        const self = new View();\n\
        // end wrapper\n\
        const config = {\n\
        // start wrapper config\n\
        base: true,\n\
        // end wrapper config\n\
        };\n";

    #[test]
    fn test_resources_parse() {
        let resources = WrapperResources::parse(RESOURCES);
        assert_eq!(resources.function_content, "const self = new View();");
        assert_eq!(resources.config_content, "base: true,");
        assert_eq!(WrapperResources::parse("no markers"), WrapperResources::default());
    }

    #[test]
    fn test_resources_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wraper.js");
        fs::write(&path, RESOURCES).unwrap();
        assert_eq!(WrapperResources::load(&path), WrapperResources::parse(RESOURCES));

        let missing = WrapperResources::load(dir.path().join("missing.js"));
        assert_eq!(missing, WrapperResources::default());
    }
}
