#[cfg(test)]
mod tests {
    use crate::ast::{Component, Node};
    use crate::codegen::*;
    use crate::component::ComponentGenerator;
    use crate::js::{bound, function, ident, string, Printer, Stmt};
    use crate::registry::{ComponentRegistry, Registry};
    use crate::scope::ValidationContext;
    use crate::scope_tests::tests::core_registry;
    use crate::validate::ErrorKind;

    fn instance(name: &str, children: Vec<Node>) -> ComponentGenerator {
        ComponentGenerator::instance("app", &Component::new(name, children)).unwrap()
    }

    fn emit_instance(registry: &ComponentRegistry, name: &str, children: Vec<Node>) -> String {
        instance(name, children).generate(registry).unwrap()
    }

    fn emit_prototype(registry: &mut ComponentRegistry, type_id: &str, component: Component) -> String {
        registry.register(type_id, &component).unwrap();
        registry.component(type_id).unwrap().generate(&*registry).unwrap()
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PROTOTYPES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_prototype_layout() {
        let mut registry = core_registry();
        let code = emit_prototype(
            &mut registry,
            "app.Dialog",
            Component::new(
                "Item",
                vec![
                    Node::property("string", "title", Some("'OK'".into())),
                    Node::signal("accepted"),
                    Node::method("close", &[], "{ this.visible = false; }", false),
                    Node::Constructor {
                        code: "this._ready = false".to_string(),
                    },
                    Node::Component(Component::new(
                        "Text",
                        vec![Node::id("caption"), Node::assign("text", "parent.title")],
                    )),
                ],
            ),
        );

        assert!(code.starts_with("/**\n * @constructor\n * @extends {_globals.core.Item}\n */\n"));
        assert!(code.contains(concat!(
            "exports.app.Dialog = function(parent, _delegate) {\n",
            "\t_globals.core.Item.apply(this, arguments);\n",
            "\t// custom constructor:\n",
            "\tthis._ready = false\n",
            "};\n",
        )));
        assert!(code.contains(
            "exports.app.Dialog.prototype = Object.create(_globals.core.Item.prototype);\n"
        ));
        assert!(code.contains("exports.app.Dialog.prototype.constructor = exports.app.Dialog;\n"));
        assert!(code.contains("exports.app.Dialog.prototype.componentName = 'app.Dialog';\n"));
        assert!(code.contains(
            "exports.app.Dialog.prototype.accepted = _globals.core.createSignal('accepted');\n"
        ));
        assert!(code.contains(
            "exports.app.Dialog.prototype.close = function() { this.visible = false; };\n"
        ));
        assert!(code.contains(
            "core.addProperty(exports.app.Dialog.prototype, 'string', 'title', 'OK');\n"
        ));
        assert!(code.contains(concat!(
            "exports.app.Dialog.prototype.__create = function() {\n",
            "\t_globals.core.Item.prototype.__create.apply(this);\n",
            "\tvar this_child0 = new _globals.core.Text(this);\n",
            "\tthis.addChild(this_child0);\n",
            "\tthis_child0.__create();\n",
            "\tthis_child0._setId('caption');\n",
            "};\n",
        )));
        assert!(code.contains(concat!(
            "exports.app.Dialog.prototype.__setup = function() {\n",
            "\t_globals.core.Item.prototype.__setup.apply(this);\n",
            "\tvar this_child0 = this.children[0];\n",
            "\tthis_child0.__setup();\n",
        )));
        assert!(code.contains(
            "\tthis_child0.connectOnChanged(this_child0._get('parent'), 'title', _update_var_this_child0__text);\n"
        ));
    }

    #[test]
    fn test_prototype_enum_descriptors() {
        let mut registry = core_registry();
        let code = emit_prototype(
            &mut registry,
            "app.Aligned",
            Component::new(
                "Item",
                vec![Node::enumeration("mode", &["Left", "Right"], Some("Right"))],
            ),
        );

        assert!(code.contains(concat!(
            "/**\n",
            " * @const @type {number}\n",
            " */\n",
            "exports.app.Aligned.prototype.Left = 0;\n",
        )));
        assert!(code.contains("exports.app.Aligned.Right = 1;\n"));
        assert!(code.contains(
            "core.addProperty(exports.app.Aligned.prototype, 'enum', 'mode', exports.app.Aligned.Right);\n"
        ));
    }

    #[test]
    fn test_prototype_alias() {
        let mut registry = core_registry();
        let code = emit_prototype(
            &mut registry,
            "app.Labeled",
            Component::new(
                "Item",
                vec![
                    Node::alias("caption", "label.text"),
                    Node::Component(Component::new("Text", vec![Node::id("label")])),
                ],
            ),
        );

        assert!(code.contains(concat!(
            "\tcore.addAliasProperty(this, 'caption', (function() {\n",
            "\t\treturn this._get('label');\n",
            "\t}).bind(this), 'text');\n",
        )));
    }

    #[test]
    fn test_prototype_alias_to_unknown_property() {
        let mut registry = core_registry();
        registry
            .register(
                "app.Broken",
                &Component::new("Item", vec![Node::alias("caption", "missing")]),
            )
            .unwrap();
        let err = registry
            .component("app.Broken")
            .unwrap()
            .generate(&registry)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownProperty);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INSTANCES
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_instance_declares_own_members_only() {
        let registry = core_registry();
        let code = emit_instance(
            &registry,
            "Item",
            vec![
                Node::property("int", "width", Some("5".into())),
                Node::property("int", "extra", Some("3".into())),
                Node::signal("done"),
                Node::signal("clicked"),
            ],
        );

        assert!(code.starts_with(concat!(
            "var instance = new _globals.core.Item(parent);\n",
            "instance.__create();\n",
            "instance.done = _globals.core.createSignal('done').bind(instance);\n",
            "core.addProperty(instance, 'int', 'extra', 3);\n",
            "instance.__setup();\n",
        )));
        assert!(!code.contains("createSignal('clicked')"));
        assert!(!code.contains("'int', 'width'"));
        // The base already declares `width`, so only its default is applied.
        assert!(code.contains("instance._removeUpdater('width');\ninstance.width = (5);\n"));
    }

    #[test]
    fn test_instance_named_after_id() {
        let registry = core_registry();
        let code = emit_instance(&registry, "Item", vec![Node::id("root")]);
        assert!(code.starts_with(concat!(
            "var root = new _globals.core.Item(parent);\n",
            "root.__create();\n",
            "root._setId('root');\n",
            "root.__setup();\n",
        )));
    }

    #[test]
    fn test_static_binding() {
        let registry = core_registry();
        let code = emit_instance(&registry, "Item", vec![Node::assign("width", "100")]);
        assert!(code.contains("instance._removeUpdater('width');\ninstance.width = (100);\n"));
        assert!(!code.contains("connectOnChanged"));
    }

    #[test]
    fn test_static_scope_binding_runs_against_owner() {
        let mut registry = core_registry();
        let code = emit_prototype(
            &mut registry,
            "app.Panel",
            Component::new(
                "Item",
                vec![Node::Component(Component::new(
                    "ListView",
                    vec![Node::assign("model", "parent")],
                ))],
            ),
        );
        assert!(code.contains(concat!(
            "\tthis_child0._removeUpdater('model');\n",
            "\tthis_child0.model = (function() {\n",
            "\t\treturn (this._get('parent'));\n",
            "\t}).call(this_child0);\n",
        )));
        assert!(!code.contains("this_child0.model = (this._get('parent'));"));

        let code = emit_instance(
            &registry,
            "Item",
            vec![
                Node::Component(Component::new("Item", vec![Node::id("inner")])),
                Node::Component(Component::new("ListView", vec![Node::assign("model", "inner")])),
            ],
        );
        assert!(code.contains(concat!(
            "instance_child1.model = (function() {\n",
            "\treturn (this._get('inner'));\n",
            "}).call(instance_child1);\n",
        )));
    }

    #[test]
    fn test_dynamic_binding() {
        let registry = core_registry();
        let code = emit_instance(
            &registry,
            "Item",
            vec![Node::assign("width", "parent.width / 2 + height")],
        );

        let expected = concat!(
            "var instance = new _globals.core.Item(parent);\n",
            "instance.__create();\n",
            "instance.__setup();\n",
            "var _update_var_instance__width = (function() {\n",
            "\tthis.width = (this._get('parent').width / 2 + this._get('height'));\n",
            "}).bind(instance);\n",
            "_update_var_instance__width();\n",
            "instance.connectOnChanged(instance._get('parent'), 'width', _update_var_instance__width);\n",
            "instance.connectOnChanged(instance, 'height', _update_var_instance__width);\n",
            "instance._removeUpdater('width', (function() {\n",
            "\tthis._get('parent').removeOnChanged('width', _update_var_instance__width);\n",
            "\tthis.removeOnChanged('height', _update_var_instance__width);\n",
            "}).bind(instance));\n",
        );
        assert_eq!(code, expected);
        assert_eq!(count(&code, "_update_var_instance__width();"), 1);
    }

    #[test]
    fn test_scoped_target_binding() {
        let registry = core_registry();
        let code = emit_instance(
            &registry,
            "Item",
            vec![
                Node::Component(Component::new("Item", vec![Node::id("inner")])),
                Node::assign("inner.width", "height"),
            ],
        );
        assert!(code.contains("\tthis._get('inner').width = (this._get('height'));\n"));
        assert!(code.contains("var _update_var_instance__inner_width = "));
    }

    #[test]
    fn test_create_phase_has_no_behavior() {
        let registry = core_registry();
        let generator = instance(
            "Item",
            vec![
                Node::method("onWidthChanged", &[], "{ log(value); }", true),
                Node::Component(Component::new(
                    "Item",
                    vec![
                        Node::id("inner"),
                        Node::assign("width", "parent.width"),
                        Node::method("onClicked", &[], "{ }", true),
                        Node::method("onEscapePressed", &[], "{ return true; }", true),
                        Node::Component(Component::new(
                            "Text",
                            vec![Node::assign("text", "inner.width")],
                        )),
                    ],
                )),
            ],
        );
        let ctx = ValidationContext::new(&registry, &generator);
        let (prologue, creators) = generator.generate_creators(&ctx, "instance").unwrap();
        let create = print(&[prologue, creators].concat());

        for forbidden in ["connectOnChanged", ".on(", "onPressed", "onChanged(", "_removeUpdater"] {
            assert!(!create.contains(forbidden), "{} in CREATE:\n{}", forbidden, create);
        }
        assert!(create.starts_with("var instance_child0 = new _globals.core.Item(instance);\n"));
        assert!(create.contains("var instance_child0_child0 = new _globals.core.Text(instance_child0);\n"));

        let code = generator.generate(&registry).unwrap();
        let last_create = code.rfind(".__create()").unwrap();
        let first_setup = code.find(".__setup()").unwrap();
        assert!(last_create < first_setup);
        assert!(code.contains(
            "instance_child0_child0.connectOnChanged(instance_child0_child0._get('inner'), 'width', _update_var_instance_child0_child0__text);\n"
        ));
    }

    #[test]
    fn test_handlers() {
        let registry = core_registry();
        let code = emit_instance(
            &registry,
            "Item",
            vec![
                Node::method("reset", &["hard"], "{ this.x = 0; }", false),
                Node::method("onClicked", &[], "{ this.mode = Text.AlignRight; }", true),
                Node::method("onCompleted", &[], "{ init(); }", true),
                Node::method("onWidthChanged", &[], "{ log(value); }", true),
                Node::method("onEscapePressed", &[], "{ return true; }", true),
            ],
        );

        assert!(code.contains("instance.reset = (function(hard) { this.x = 0; }).bind(instance);\n"));
        assert!(code.contains(
            "instance.on('clicked', (function() { this.mode = 2; }).bind(instance));\n"
        ));
        assert!(code.contains(
            "instance._context._onCompleted((function() { init(); }).bind(instance));\n"
        ));
        assert!(code.contains(
            "instance.onChanged('width', (function(value) { log(value); }).bind(instance));\n"
        ));
        assert!(code.contains(
            "instance.onPressed('Escape', (function(key, event) { return true; }).bind(instance));\n"
        ));
    }

    #[test]
    fn test_delegate_factory_and_list_elements() {
        let registry = core_registry();
        let code = emit_instance(
            &registry,
            "ListView",
            vec![
                Node::assign(
                    "model",
                    Component::new(
                        "ListModel",
                        vec![Node::ListElement {
                            data: serde_json::json!({ "name": "a" }),
                        }],
                    ),
                ),
                Node::assign(
                    "delegate",
                    Component::new("Text", vec![Node::assign("text", "model.name")]),
                ),
            ],
        );

        assert!(code.contains(concat!(
            "var instance = new _globals.core.ListView(parent);\n",
            "instance.__create();\n",
            "var instance_model = new _globals.core.ListModel(instance);\n",
            "instance_model.__create();\n",
            "instance.model = instance_model;\n",
            "instance.delegate = (function() {\n",
            "\tvar instance_delegate = new _globals.core.Text(instance, true);\n",
            "\tinstance_delegate.__create();\n",
            "\tinstance_delegate.__setup();\n",
        )));
        assert_eq!(count(&code, "new _globals.core.Text("), 1);
        assert!(code.contains(
            "\tinstance_delegate.connectOnChanged(instance_delegate._get('_delegate'), '_row', _update_var_instance_delegate__text);\n"
        ));
        assert!(code.contains("\treturn instance_delegate;\n}).bind(instance);\n"));
        assert!(code.contains(concat!(
            "var instance_model = instance.model;\n",
            "instance_model.__setup();\n",
            "instance_model.assign([{\"name\":\"a\"}]);\n",
        )));
        assert!(!code.contains("instance.delegate;"));
    }

    #[test]
    fn test_animation() {
        let registry = core_registry();
        let code = emit_instance(
            &registry,
            "Item",
            vec![Node::behavior(
                &["x"],
                Component::new("Animation", vec![Node::assign("duration", "300")]),
            )],
        );
        assert!(code.ends_with(concat!(
            "var behavior_on_x = new _globals.core.Animation(instance);\n",
            "behavior_on_x.__create();\n",
            "behavior_on_x.__setup();\n",
            "behavior_on_x._removeUpdater('duration');\n",
            "behavior_on_x.duration = (300);\n",
            "instance.setAnimation('x', behavior_on_x);\n",
        )));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════

    fn emit_error(children: Vec<Node>) -> crate::validate::CompilerError {
        let registry = core_registry();
        instance("Item", children).generate(&registry).unwrap_err()
    }

    #[test]
    fn test_runtime_enum_rejected() {
        let err = emit_error(vec![Node::enumeration("mode", &["A", "B"], None)]);
        assert_eq!(err.kind, ErrorKind::UnsupportedRuntimeEnum);
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn test_remote_id_rejected() {
        let err = emit_error(vec![
            Node::Component(Component::new("Item", vec![Node::id("inner")])),
            Node::assign("inner.id", "other"),
        ]);
        assert_eq!(err.kind, ErrorKind::InvalidIdUsage);
    }

    #[test]
    fn test_malformed_id_rejected() {
        let err = emit_error(vec![Node::id("a + b")]);
        assert_eq!(err.kind, ErrorKind::MalformedBindingTarget);
        assert_eq!(err.code, "Q-ERR-ID-002");
    }

    #[test]
    fn test_unknown_target_rejected() {
        let err = emit_error(vec![Node::assign("colour", "'red'")]);
        assert_eq!(err.kind, ErrorKind::UnknownProperty);
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_unknown_component_rejected() {
        let err = emit_error(vec![Node::Component(Component::new("Missing", vec![]))]);
        assert_eq!(err.kind, ErrorKind::UnknownComponent);
        assert!(err.message.contains("Missing"));

        let registry = core_registry();
        let err = instance("Missing", vec![]).generate(&registry).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownComponent);
    }

    #[test]
    fn test_binding_syntax_error() {
        let err = emit_error(vec![Node::assign("width", "(")]);
        assert_eq!(err.kind, ErrorKind::InvalidExpression);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PACKAGE ENTRY POINT
    // ═══════════════════════════════════════════════════════════════════════════════

    fn source(type_id: &str, component: Component) -> ComponentSource {
        ComponentSource {
            type_id: type_id.to_string(),
            component,
        }
    }

    #[test]
    fn test_compile_components_keeps_registration_order() {
        let output = compile_components(
            &[
                source(
                    "app.Base",
                    Component::new("CoreObject", vec![Node::property("int", "size", Some("1".into()))]),
                ),
                source(
                    "app.Derived",
                    Component::new("Base", vec![Node::assign("size", "2")]),
                ),
            ],
            &CodegenOptions::default(),
        );

        assert!(output.errors.is_empty());
        let names: Vec<&str> = output.outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["app.Base", "app.Derived"]);
        assert_eq!(output.outputs[0].base_type, "core.CoreObject");
        assert_eq!(output.outputs[1].base_type, "app.Base");
        assert!(output.outputs[1]
            .code
            .contains("\t_globals.app.Base.prototype.__create.apply(this);\n"));
        assert!(output.outputs[1]
            .code
            .contains("\tthis._removeUpdater('size');\n\tthis.size = (2);\n"));
    }

    #[test]
    fn test_compile_components_reports_errors() {
        let output = compile_components(
            &[source(
                "app.Broken",
                Component::new("CoreObject", vec![Node::assign("size", "2")]),
            )],
            &CodegenOptions::default(),
        );
        assert!(output.outputs.is_empty());
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].code, "Q-ERR-SCOPE-001");

        let output = compile_components(
            &[
                source("app.Twice", Component::new("CoreObject", vec![])),
                source("app.Twice", Component::new("CoreObject", vec![])),
            ],
            &CodegenOptions::default(),
        );
        assert_eq!(output.errors[0].kind, ErrorKind::DuplicateDeclaration);
    }

    #[test]
    fn test_options_from_json() {
        let options: CodegenOptions = serde_json::from_str(r#"{ "banner": true }"#).unwrap();
        assert_eq!(options.indent, "\t");
        assert!(options.banner);

        let output = compile_components(
            &[source("app.Plain", Component::new("CoreObject", vec![]))],
            &CodegenOptions {
                indent: "  ".to_string(),
                banner: true,
            },
        );
        let code = &output.outputs[0].code;
        assert!(code.starts_with("// app.Plain\n/**\n"));
        assert!(code.contains("  _globals.core.CoreObject.apply(this, arguments);\n"));
    }

    #[test]
    fn test_sources_from_json() {
        let sources: Vec<ComponentSource> = serde_json::from_str(
            r#"[{ "typeId": "app.Empty", "component": { "name": "CoreObject" } }]"#,
        )
        .unwrap();
        let output = compile_components(&sources, &CodegenOptions::default());
        assert_eq!(output.outputs.len(), 1);

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["outputs"][0]["baseType"], "core.CoreObject");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PRINTER
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_printer_nesting_and_quoting() {
        let stmts = vec![
            Stmt::Var(
                "f".to_string(),
                Some(bound(
                    function(&[], vec![Stmt::Return(ident("this").get("a").member("b"))]),
                    "obj",
                )),
            ),
            ident("obj").call("say", vec![string("it's")]).stmt(),
        ];
        assert_eq!(
            print(&stmts),
            "var f = (function() {\n\treturn this._get('a').b;\n}).bind(obj);\nobj.say('it\\'s');\n"
        );
        assert_eq!(
            Printer::new("    ").print(&stmts[..1]),
            "var f = (function() {\n    return this._get('a').b;\n}).bind(obj);\n"
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("anchors.left"), "anchors_left");
        assert_eq!(escape("a-b c"), "a_b_c");
        assert_eq!(escape("plain$1"), "plain$1");
    }
}
