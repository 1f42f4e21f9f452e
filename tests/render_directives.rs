//! Directive behaviour through the public `render` entry point

use rstest::rstest;
use serde_json::json;
use vtl::vtl::testing::render_str;
use vtl::{render, Context, Error, RenderOptions};

fn context(json: serde_json::Value) -> Context {
    Context::from_json(json)
}

#[rstest]
#[case(7, "big")]
#[case(3, "medium")]
#[case(1, "small")]
fn test_if_elseif_else(#[case] n: i32, #[case] expected: &str) {
    let source = "#if($n > 5)big#elseif($n > 2)medium#{else}small#end";
    assert_eq!(render_str(source, &Context::new().with("n", n)), expected);
}

#[rstest]
#[case(json!({"v": false}), "no")]
#[case(json!({"v": null}), "no")]
#[case(json!({}), "no")]
#[case(json!({"v": 0}), "no")]
#[case(json!({"v": ""}), "no")]
#[case(json!({"v": []}), "no")]
#[case(json!({"v": {}}), "yes")]
#[case(json!({"v": "0"}), "yes")]
#[case(json!({"v": "false"}), "yes")]
#[case(json!({"v": [0]}), "yes")]
#[case(json!({"v": 0.5}), "yes")]
fn test_truthiness(#[case] data: serde_json::Value, #[case] expected: &str) {
    assert_eq!(
        render_str("#if($v)yes#{else}no#end", &context(data)),
        expected
    );
}

#[test]
fn test_else_keyword_followed_by_blank() {
    let source = "#if($v)yes#else no#end";
    assert_eq!(render_str(source, &Context::new().with("v", true)), "yes");
    assert_eq!(render_str(source, &Context::new().with("v", false)), " no");
}

#[test]
fn test_foreach_over_range() {
    assert_eq!(
        render_str("#foreach($i in [1..3])$i,#end", &Context::new()),
        "1,2,3,"
    );
    assert_eq!(
        render_str("#foreach($i in [3..1])$i#end", &Context::new()),
        "321"
    );
}

#[test]
fn test_foreach_is_capped_at_max_iterations() {
    let output = render_str("#foreach($i in [1..2000])$i,#end", &Context::new());
    let expected: String = (1..=1000).map(|i| format!("{},", i)).collect();
    assert_eq!(output, expected);
}

#[test]
fn test_foreach_cap_is_configurable() {
    let options = RenderOptions::default().with_max_loop_iterations(2);
    let output = render("#foreach($i in $items)$i#end", &context(json!({"items": [1, 2, 3]})), &options)
        .expect("renders");
    assert_eq!(output, "12");
}

#[test]
fn test_break_ends_nearest_loop() {
    assert_eq!(
        render_str(
            "#foreach($i in [1..2000])$i,#if($i==5)#break#end#end",
            &Context::new()
        ),
        "1,2,3,4,5,"
    );
    assert_eq!(
        render_str(
            "#foreach($a in [1..2])#foreach($b in [1..9])$a$b #break#end#end",
            &Context::new()
        ),
        "11 21 "
    );
}

#[test]
fn test_loop_metadata() {
    let source = "#foreach($x in ['a','b','c'])$foreach.index:$foreach.count:$foreach.first:$foreach.last:$foreach.hasNext #end";
    assert_eq!(
        render_str(source, &Context::new()),
        "0:1:true:false:true 1:2:false:false:true 2:3:false:true:false "
    );
    assert_eq!(
        render_str("#foreach($x in ['a','b'])$velocityCount#end", &Context::new()),
        "12"
    );
    assert_eq!(
        render_str(
            "#foreach($a in [1..2])#foreach($b in ['x'])$foreach.parent.index$b#end#end",
            &Context::new()
        ),
        "0x1x"
    );
}

#[test]
fn test_loop_stop_method() {
    assert_eq!(
        render_str(
            "#foreach($i in [1..5])$i#if($i == 2)$!foreach.stop()#end#end",
            &Context::new()
        ),
        "12"
    );
}

#[test]
fn test_foreach_else_and_odd_iterables() {
    let data = context(json!({"empty": [], "m": {"a": 1, "b": 2}}));
    assert_eq!(render_str("#foreach($x in $empty)x#{else}none#end", &data), "none");
    assert_eq!(render_str("#foreach($x in $undefined)x#{else}none#end", &data), "none");
    assert_eq!(render_str("#foreach($v in $m)$v#end", &data), "12");
    assert_eq!(render_str("#foreach($v in $nothing)x#end", &data), "");
    assert_eq!(render_str("#foreach($v in 'solo')<$v>#end", &data), "<solo>");
}

#[test]
fn test_set() {
    assert_eq!(
        render_str("#set($a = 5)#set($b = $a * 2)$b", &Context::new()),
        "10"
    );
    assert_eq!(
        render_str("#set($m = {})#set($m.k = 'v')$m.k $m", &Context::new()),
        "v {k=v}"
    );
    assert_eq!(
        render_str("#set($l = [1, 2])#set($ok = $l.add(3))$l", &Context::new()),
        "[1, 2, 3]"
    );
    assert_eq!(
        render_str("#set($a = 1)#set($a = $nothing)$!a|$a", &Context::new()),
        "|$a"
    );
}

#[test]
fn test_context_is_never_mutated() {
    let data = context(json!({"items": [1]}));
    assert_eq!(
        render_str("#set($ok = $items.add(9))#set($fresh = 1)$items", &data),
        "[1, 9]"
    );
    assert_eq!(data.get("items").map(|v| v.to_string()), Some("[1]".to_string()));
    assert!(data.get("fresh").is_none());
}

#[test]
fn test_macros() {
    let empty = Context::new();
    assert_eq!(
        render_str("#macro(greet $name)Hello $name!#end#greet('World')", &empty),
        "Hello World!"
    );
    assert_eq!(
        render_str("#macro(pair $a $b)[$a|$!b]#end#pair(1)", &empty),
        "[1|]"
    );
    assert_eq!(
        render_str("#macro(sum, $a, $b)$a+$b#end#sum(1, 2)", &empty),
        "1+2"
    );
    assert_eq!(render_str("#m()#macro(m)x#end", &empty), "x");
}

#[test]
fn test_undefined_macro_echoes_source() {
    assert_eq!(
        render_str("#nope(1, 2) and #tag", &Context::new()),
        "#nope(1, 2) and #tag"
    );
}

#[test]
fn test_macro_recursion_is_bounded() {
    let source = "#macro(r $n)$n#set($m = $n + 1)#r($m)#end#r(1)";
    let expected: String = (1..=20).map(|i| i.to_string()).collect();
    assert_eq!(render_str(source, &Context::new()), expected);
}

#[test]
fn test_macro_redefinition() {
    let source = "#macro(m)one#end#macro(m)two#end#m()";
    assert_eq!(render_str(source, &Context::new()), "one");
    let options = RenderOptions {
        allow_macro_replace: true,
        ..RenderOptions::default()
    };
    assert_eq!(render(source, &Context::new(), &options).expect("renders"), "two");
}

#[test]
fn test_break_and_stop_boundaries() {
    let empty = Context::new();
    assert_eq!(render_str("#macro(m)a#break b#end#m()c", &empty), "ac");
    assert_eq!(render_str("a#break b", &empty), "a");
    assert_eq!(render_str("a#stop b", &empty), "a");
    assert_eq!(render_str("#macro(m)x#stop#end#m()y", &empty), "x");
}

#[test]
fn test_evaluate() {
    let empty = Context::new();
    assert_eq!(
        render_str("#set($code = '#set($x = 2)$x')#evaluate($code) $x", &empty),
        "2 2"
    );
    assert_eq!(render_str("#evaluate('#if(true)yes#end')", &empty), "yes");
    assert_eq!(render_str("#evaluate($nothing)", &empty), "");
}

#[test]
fn test_evaluate_syntax_error_fails_the_render() {
    let error = render("#evaluate('#if(true)')", &Context::new(), &RenderOptions::default())
        .expect_err("unclosed #if should fail");
    assert!(!error.parse_errors().is_empty());
}

#[test]
fn test_comments_unparsed_and_escapes() {
    let empty = Context::new();
    assert_eq!(render_str("a## comment\nb", &empty), "ab");
    assert_eq!(render_str("a#* block\ncomment *#b", &empty), "ab");
    assert_eq!(render_str("#[[$x #if]]#", &empty), "$x #if");
    assert_eq!(render_str(r"\#if(true)", &empty), "#if(true)");
    assert_eq!(render_str("100% #1 $", &empty), "100% #1 $");
}

#[test]
fn test_string_literals() {
    let data = Context::new().with("name", "x");
    assert_eq!(render_str(r#"#set($s = "Hi $name!")$s"#, &data), "Hi x!");
    assert_eq!(render_str("#set($s = 'Hi $name')$s", &data), "Hi $name");
    assert_eq!(render_str("#set($s = 'it''s')$s", &data), "it's");
    assert_eq!(
        render_str(r#"#set($s = "${name.toUpperCase()}#if(true)!#end")$s"#, &data),
        "X!"
    );
}

#[test]
fn test_snapshot_of_a_small_page() {
    let data = context(json!({"user": {"name": "Ada"}, "items": ["a", "b"]}));
    insta::assert_snapshot!(
        render_str("Hi $user.name: #foreach($i in $items)$i#if($foreach.hasNext), #end#end.", &data),
        @"Hi Ada: a, b."
    );
}

#[test]
fn test_json_maps_keep_their_key_order() {
    let data = context(json!({"m": {"b": 1, "a": 2}}));
    assert_eq!(
        render_str("#foreach($v in $m)$v#end $m", &data),
        "12 {b=1, a=2}"
    );
}

fn nested_ifs(depth: usize) -> String {
    format!("{}x{}", "#if(true)".repeat(depth), "#end".repeat(depth))
}

fn is_nesting_error(result: Result<String, Error>) -> bool {
    match result {
        Err(Error::Syntax(errors)) => errors[0].rule.as_deref() == Some("nesting"),
        _ => false,
    }
}

#[test]
fn test_deep_nesting_within_the_limit_renders() {
    // 63 blocks plus the innermost condition's parenthesis reach the default limit of 64
    assert_eq!(render_str(&nested_ifs(63), &Context::new()), "x");
    let parens = format!("#set($x = {}1{})$x", "(".repeat(20), ")".repeat(20));
    assert_eq!(render_str(&parens, &Context::new()), "1");
}

#[test]
fn test_nesting_past_the_limit_is_a_syntax_error() {
    let options = RenderOptions::default();
    assert!(is_nesting_error(render(&nested_ifs(64), &Context::new(), &options)));
    assert!(is_nesting_error(render(&nested_ifs(5000), &Context::new(), &options)));

    let parens = format!("#set($x = {}1{})", "(".repeat(3000), ")".repeat(3000));
    assert!(is_nesting_error(render(&parens, &Context::new(), &options)));

    let ternaries = format!("$a{}", "?1:$a".repeat(3000));
    assert!(is_nesting_error(render(
        &format!("#set($x = {})", ternaries),
        &Context::new(),
        &options
    )));
}

#[test]
fn test_nesting_limit_applies_to_evaluate() {
    let data = Context::new().with("deep", nested_ifs(100));
    let result = render("#evaluate($deep)", &data, &RenderOptions::default());
    assert!(is_nesting_error(result));
}

#[test]
fn test_nesting_limit_is_configurable() {
    let options = RenderOptions::default().with_max_nesting_depth(4);
    assert_eq!(
        render(&nested_ifs(3), &Context::new(), &options).expect("renders"),
        "x"
    );
    assert!(is_nesting_error(render(&nested_ifs(4), &Context::new(), &options)));
}

#[test]
fn test_too_deep_string_template_stays_text() {
    let source = format!("#set($s = \"{}\")$s", nested_ifs(40));
    assert_eq!(render_str(&source, &Context::new()), nested_ifs(40));
}
