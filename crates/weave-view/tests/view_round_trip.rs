//! Template → view → event → data → view round trips.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use weave_core::{PanicPolicy, Value, observe};
use weave_view::{CompileOptions, Compiler, Error, Event, MethodTable, Template, View};

fn form_template() -> Template {
    Template::from_json(json!({
        "tag": "div", "attrs": {"id": "app"},
        "children": [
            {"tag": "input", "attrs": {"id": "name", "type": "text", "v-model": "user.name"}},
            {"tag": "p", "attrs": {"id": "greeting"}, "children": ["Hello, {{ user.name }}!"]},
            {"tag": "button", "attrs": {"id": "reset", "v-on:click": "reset"}, "children": ["Reset"]}
        ]
    }))
    .expect("valid template")
}

#[test]
fn initial_render() {
    let data = observe(&Value::from_json(json!({"user": {"name": "bob"}}))).expect("object root");
    let view = View::from_template(&form_template(), &data, &MethodTable::new(), &Compiler::default())
        .expect("template compiles");

    assert_eq!(view.binding_count(), 2);
    assert_eq!(
        view.render(),
        "<div id=\"app\"><input id=\"name\" type=\"text\" value=\"bob\"><p id=\"greeting\">Hello, bob!</p>\
         <button id=\"reset\">Reset</button></div>"
    );
}

#[test]
fn typing_updates_data_and_text() {
    let data = observe(&Value::from_json(json!({"user": {"name": "bob"}}))).expect("object root");
    let view = View::from_template(&form_template(), &data, &MethodTable::new(), &Compiler::default())
        .expect("template compiles");

    assert_eq!(view.dispatch_to("name", &Event::input("lucy")).expect("known id"), 1);

    let user = data.peek("user").as_node().cloned().expect("object");
    assert_eq!(user.peek("name"), Value::from("lucy"));
    assert_eq!(view.find("greeting").expect("element").text_content(), "Hello, lucy!");
    assert_eq!(view.find("name").expect("element").value(), "lucy");
}

#[test]
fn methods_write_back_into_the_view() {
    let data = observe(&Value::from_json(json!({"user": {"name": "bob"}}))).expect("object root");
    let target = data.clone();
    let methods = MethodTable::new().with("reset", move |_: &Event| {
        target.set("user", Value::from_json(json!({"name": ""})));
    });
    let view = View::from_template(&form_template(), &data, &methods, &Compiler::default())
        .expect("template compiles");

    view.dispatch_to("reset", &Event::new("click")).expect("known id");
    assert_eq!(view.find("greeting").expect("element").text_content(), "Hello, !");
    assert_eq!(view.find("name").expect("element").value(), "");

    // The replacement object is live too.
    view.dispatch_to("name", &Event::input("ann")).expect("known id");
    assert_eq!(view.find("greeting").expect("element").text_content(), "Hello, ann!");
}

#[test]
fn unknown_target_is_an_error() {
    let data = observe(&Value::from_json(json!({"user": {"name": "bob"}}))).expect("object root");
    let view = View::from_template(&form_template(), &data, &MethodTable::new(), &Compiler::default())
        .expect("template compiles");
    assert!(matches!(
        view.dispatch_to("nope", &Event::new("click")),
        Err(Error::UnknownTarget { .. })
    ));
}

#[test]
fn dropping_the_view_releases_bindings() {
    let data = observe(&Value::from_json(json!({"user": {"name": "bob"}}))).expect("object root");
    let user = data.peek("user").as_node().cloned().expect("object");
    let view = View::from_template(&form_template(), &data, &MethodTable::new(), &Compiler::default())
        .expect("template compiles");
    assert_eq!(user.dep("name").expect("tracked").subscriber_count(), 2);

    let root = view.root().clone();
    drop(view);
    assert_eq!(user.dep("name").expect("tracked").subscriber_count(), 0);

    user.set("name", "zed");
    assert_eq!(
        root.find_by_id("greeting").expect("element").text_content(),
        "Hello, bob!"
    );
}

#[test]
fn isolated_bindings_survive_a_panicking_sibling() {
    let data = observe(&Value::from_json(json!({"n": 1}))).expect("object root");
    let calls = Rc::new(Cell::new(0));
    let hits = Rc::clone(&calls);
    let _boom = weave_core::Watcher::with_options(
        &data,
        "n",
        weave_core::WatchOptions::default().with_panic_policy(PanicPolicy::Isolate),
        move |_: &Value, _: &Value| {
            hits.set(hits.get() + 1);
            panic!("sink failure");
        },
    )
    .expect("valid path");

    let compiler = Compiler::new(CompileOptions::default().with_panic_policy(PanicPolicy::Isolate))
        .expect("default delimiters");
    let template = Template::element("div").with_child(
        Template::element("span").with_attr("id", "n").with_attr("v-text", "n"),
    );
    let view = View::from_template(&template, &data, &MethodTable::new(), &compiler).expect("template compiles");

    data.set("n", 2);
    assert_eq!(calls.get(), 1);
    assert_eq!(view.find("n").expect("element").text_content(), "2");
}
