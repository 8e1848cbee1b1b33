#[cfg(test)]
mod tests {
    use crate::analyze::*;
    use crate::directives::run;
    use crate::parse::lex;
    use crate::scope::track_declarations;
    use crate::transform::Translator;
    use crate::validate::{SectionDescriptor, SectionKind};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prerender_truth_table() {
        for mask in 0u8..16 {
            let deferred = mask & 1 != 0;
            let injected = mask & 2 != 0;
            let section = mask & 4 != 0;
            let body = mask & 8 != 0;
            for declaration in [false, true] {
                let inputs = PrerenderInputs {
                    deferred,
                    injected,
                    section_uses_vars: section,
                    body_uses_vars: body,
                    declaration_uses_vars: declaration,
                };
                let expected = deferred && injected && (section || body || declaration);
                assert_eq!(needs_prerender(inputs), expected, "{:?}", inputs);
            }
        }
        assert!(!needs_prerender(PrerenderInputs::default()));
    }

    #[test]
    fn test_mentions_whole_identifier() {
        assert!(mentions("App.View.escString(user.name)", "user"));
        assert!(mentions("user", "user"));
        assert!(!mentions("username", "user"));
        assert!(!mentions("this.user", "user"));
        assert!(!mentions("$user", "user"));
        assert!(!mentions("anything", ""));
    }

    #[test]
    fn test_interpolates_any() {
        let injected = names(&["user"]);
        assert!(interpolates_any("<p>${App.View.escString(user.name)}</p>", &injected));
        assert!(!interpolates_any("<p>user</p>", &injected));
        assert!(!interpolates_any("<p>${other}</p>", &injected));
        assert!(!interpolates_any("<p>${user", &injected));
    }

    #[test]
    fn test_section_classification() {
        let injected = names(&["user"]);
        let mut sections = vec![
            SectionDescriptor::new("title", SectionKind::Short, "user.name".to_string()),
            SectionDescriptor::new("static", SectionKind::Short, "\"Home\"".to_string()),
            SectionDescriptor::new("body", SectionKind::Long, "<p>${user.name}</p>".to_string()),
            SectionDescriptor::new("plain", SectionKind::Long, "<p>user</p>".to_string()),
        ];
        analyze_sections(&mut sections, &injected, true);
        let uses: Vec<bool> = sections.iter().map(|s| s.uses_injected_vars).collect();
        assert_eq!(uses, vec![true, false, true, false]);
        assert!(sections[0].needs_placeholder);
        assert!(!sections[1].needs_placeholder);

        analyze_sections(&mut sections, &injected, false);
        assert!(sections.iter().all(|s| !s.needs_placeholder));
    }

    #[test]
    fn test_conditional_outside_sections() {
        let injected = names(&["user"]);
        let out = run(
            &lex("@section('a')\n@if($user)\nx\n@endif\n@endsection"),
            Translator::default(),
        );
        let template = out.template();
        assert!(!conditional_uses_vars(&template, &out.sections, &injected));

        let out = run(&lex("@if($user->admin)\nx\n@endif"), Translator::default());
        assert!(conditional_uses_vars(&out.template(), &out.sections, &injected));
        assert!(!conditional_uses_vars(&out.template(), &out.sections, &names(&["other"])));
    }

    #[test]
    fn test_prerender_inputs_from_declarations() {
        let declarations = track_declarations("@vars($user)\n@let($greeting = 'Hi ' . $user->name)");
        let inputs = prerender_inputs(&declarations, &[], "<p>static</p>", true);
        assert!(inputs.deferred);
        assert!(inputs.injected);
        assert!(!inputs.section_uses_vars);
        assert!(!inputs.body_uses_vars);
        assert!(inputs.declaration_uses_vars);
        assert!(needs_prerender(inputs));

        let declarations = track_declarations("@vars($user)");
        let inputs = prerender_inputs(&declarations, &[], "<p>${user}</p>", false);
        assert!(inputs.body_uses_vars);
        assert!(!needs_prerender(inputs));
    }

    #[test]
    fn test_section_name_lists() {
        let out = run(
            &lex("@section('title', 'T')\n@section('body')\nx\n@endsection"),
            Translator::default(),
        );
        assert_eq!(long_section_names(&out.sections), vec!["body"]);
        assert_eq!(
            rendered_section_names(&out.template(), &out.sections),
            vec!["title", "body"]
        );
        assert!(rendered_section_names("", &out.sections).is_empty());
    }
}
