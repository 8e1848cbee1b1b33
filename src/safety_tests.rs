//! End-to-end compilation tests.
//!
//! Each test feeds a complete template through [`crate::Compiler`] and checks
//! properties of the emitted module text:
//! - plain markup survives unchanged
//! - conditional closures are balanced
//! - deferred sections get a placeholder in the prerender pass
//! - state is initialized before render does anything else
//! - malformed directives pass through without failing the compile

#[cfg(test)]
mod tests {
    use crate::{CompiledModule, Compiler, WrapperResources};

    fn compile(src: &str, view: &str) -> CompiledModule {
        Compiler::new(WrapperResources::default()).compile_module(src, view)
    }

    fn count(text: &str, c: char) -> usize {
        text.chars().filter(|&x| x == c).count()
    }

    #[test]
    fn test_plain_markup() {
        let module = compile("<h1>Hello World</h1>", "web.home");
        assert_eq!(module.function_name, "WebHome");
        assert!(module
            .source
            .contains("export function WebHome($$$DATA$$$ = {}, systemData = {}) {"));
        assert!(module.source.contains("hasAwaitData: false,"));
        assert!(module.source.contains("hasFetchData: false,"));
        assert!(module.source.contains("subscribe: false,"));
        assert!(module
            .render
            .contains("__outputRenderedContent__ = `<h1>Hello World</h1>`;"));
        assert!(module.render.contains("return __outputRenderedContent__;"));
    }

    #[test]
    fn test_single_conditional_is_balanced() {
        let module = compile("@if($show)\n<p>Shown</p>\n@endif", "web.cond");
        assert_eq!(
            module.render.matches("App.View.execute(() => { if(show){ return `").count(),
            1
        );
        assert!(module.render.contains("`; }\nreturn '';\n})}"));
        assert_eq!(count(&module.render, '{'), count(&module.render, '}'));
        assert_eq!(count(&module.render, '('), count(&module.render, ')'));
    }

    #[test]
    fn test_deferred_section_gets_placeholder() {
        let src = "@vars($user)\n@await\n@section('content')\n<p>{{ $user->name }}</p>\n@endsection";
        let module = compile(src, "web.profile");
        assert!(module.has_prerender);
        assert!(module.source.contains("hasPrerender: true,"));
        assert!(module.source.contains("prerenderSections: [\"content\"],"));
        assert!(module.prerender.contains("this.__section('content', `<div class=\"data-preloader\""));
        assert!(!module.prerender.contains("user.name"));
        assert!(module.render.contains("${App.View.escString(user.name)}"));
    }

    #[test]
    fn test_static_section_moves_to_prerender() {
        let src = "@vars($user)\n@await\n@section('title', 'Profile')\n@section('content')\n<p>{{ $user->name }}</p>\n@endsection";
        let module = compile(src, "web.profile");
        assert!(module.prerender.contains("this.__section('title', \"Profile\", 'string')"));
        assert!(!module.render.contains("this.__section('title'"));
    }

    #[test]
    fn test_no_prerender_without_deferred_data() {
        let src = "@vars($user)\n@section('content')\n<p>{{ $user->name }}</p>\n@endsection";
        let module = compile(src, "web.profile");
        assert!(!module.has_prerender);
        assert!(module.source.contains("hasPrerender: false,"));
    }

    #[test]
    fn test_stateful_binding() {
        let module = compile(
            "@let([$count, $setCount] = useState(0))\n<button>{{ $count }}</button>",
            "web.counter",
        );
        assert!(module
            .source
            .contains("const set$count = __STATE__.__register('count');"));
        assert!(module.source.contains("const update$count = (value) => {"));
        assert!(module.source.contains("if(__STATE__._canUpdateStateByKey){"));

        let first = module
            .render
            .lines()
            .nth(1)
            .map(str::trim)
            .unwrap_or_default();
        assert_eq!(first, "update$count(0);");
        assert!(module.render.contains("${App.View.escString(count)}"));
    }

    #[test]
    fn test_unbalanced_directive_passes_through() {
        let module = compile("<div>\n@if($a > (b)\n</div>", "web.broken");
        assert!(module.render.contains("@if($a > (b)"));
        assert!(!module.render.contains("App.View.execute"));
    }

    #[test]
    fn test_non_ascii_unclosed_destructuring_compiles() {
        let module = compile("@let([aé)\n<p>x</p>", "web.accent");
        assert!(module.render.contains("`<p>x</p>`"));
    }

    #[test]
    fn test_unclosed_block_does_not_fail() {
        let module = compile("@foreach($items as $item)\n<li>{{ $item }}</li>", "web.open");
        assert!(module.render.contains("App.View.foreach(items, (item, __loopKey, __loopIndex, loop) => `"));
    }

    #[test]
    fn test_runtime_errors_are_guarded() {
        let module = compile("<p>{{ $x }}</p>", "web.guarded");
        assert!(module.render.contains("} catch(e) {"));
        assert!(module
            .render
            .contains("__outputRenderedContent__ = this.__showError(e.message);"));
        assert!(module.render.contains("console.warn(e);"));
    }

    #[test]
    fn test_compiler_is_shareable_across_threads() {
        let compiler = Compiler::new(WrapperResources::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let compiler = compiler.clone();
                std::thread::spawn(move || compiler.compile(&format!("<p>{}</p>", i), "web.t"))
            })
            .collect();
        for (i, handle) in handles.into_iter().enumerate() {
            let source = handle.join().unwrap();
            assert!(source.contains(&format!("`<p>{}</p>`", i)));
        }
    }
}
