use noocrush::{Config, ErrorKind, Errors, Interpreter, Value};
use pretty_assertions::assert_eq;

fn run(input: &str) -> Result<Value, Errors> {
    Interpreter::new().run(input)
}

fn run_ok(input: &str) -> Value {
    match run(input) {
        Ok(value) => value,
        Err(errors) => panic!("program failed:\n{}", errors),
    }
}

fn first_error(input: &str) -> noocrush::Error {
    match run(input) {
        Ok(value) => panic!("expected an error, got {}", value),
        Err(errors) => errors.first().cloned().expect("at least one diagnostic"),
    }
}

#[test]
fn numeric_literals_print_canonically() {
    let cases = vec![
        ("42", "42"),
        ("3.5", "3.5"),
        ("007", "7"),
        ("2.50", "2.5"),
        ("10 / 4", "2.5"),
        ("1000000", "1000000"),
    ];
    for (input, expected) in cases {
        assert_eq!(run_ok(input).to_string(), expected, "input: {}", input);
    }
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(run_ok("2 + 3 * 4"), Value::Number(14.0));
    assert_eq!(run_ok("(2 + 3) * 4"), Value::Number(20.0));
}

#[test]
fn division_is_floating_point() {
    assert_eq!(run_ok("10 / 2"), Value::Number(5.0));
    assert_eq!(run_ok("10 / 2").to_string(), "5");

    let error = first_error("1 / 0");
    assert_eq!(error.kind, ErrorKind::ZeroDivisionError);
    assert_eq!(error.to_string(), "[line 1] ZeroDivisionError: division by zero");
}

#[test]
fn logical_operators_short_circuit() {
    assert_eq!(run_ok("false && (1/0 == 1)"), Value::Boolean(false));
    assert_eq!(run_ok("true || (1/0 == 1)"), Value::Boolean(true));
}

#[test]
fn closures_capture_their_scope() {
    let program = r#"
        fn makeCounter() {
            let count = 0;
            fn increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }

        let counter = makeCounter();
        let total = counter() + counter() + counter();
        total;
    "#;
    assert_eq!(run_ok(program), Value::Number(6.0));
}

#[test]
fn independent_closures_do_not_share_state() {
    let program = r#"
        fn makeCounter() {
            let count = 0;
            return fn() { count = count + 1; return count; };
        }
        let a = makeCounter();
        let b = makeCounter();
        a(); a();
        [a(), b()];
    "#;
    assert_eq!(run_ok(program).to_string(), "[3, 1]");
}

#[test]
fn recursive_factorial() {
    let program = r#"
        fn factorial(n) {
            if (n <= 1) return 1;
            else return n * factorial(n - 1);
        }
        factorial(5);
    "#;
    assert_eq!(run_ok(program), Value::Number(120.0));
}

#[test]
fn inheritance_with_super() {
    let program = r#"
        class Animal {
            init(name) {
                this.name = name;
            }

            speak() {
                return this.name + " says";
            }
        }

        class Dog : Animal {
            speak() {
                return super.speak() + " woof";
            }
        }

        let rex = Dog("Rex");
        rex.speak();
    "#;
    assert_eq!(run_ok(program), Value::String("Rex says woof".to_string()));
}

#[test]
fn super_resolves_to_the_defining_class() {
    let program = r#"
        class A { describe() { return "A"; } }
        class B : A { describe() { return "B>" + super.describe(); } }
        class C : B { describe() { return "C>" + super.describe(); } }
        C().describe();
    "#;
    assert_eq!(run_ok(program), Value::String("C>B>A".to_string()));
}

#[test]
fn constants_are_readable_but_not_assignable() {
    let mut interpreter = Interpreter::new();
    assert_eq!(
        interpreter.run("const limit = 10; limit;").unwrap(),
        Value::Number(10.0)
    );

    let errors = interpreter.run("limit = 11;").unwrap_err();
    let error = errors.first().unwrap();
    assert_eq!(error.kind, ErrorKind::ConstError);
    assert_ne!(error.kind, ErrorKind::NameError);
    assert_eq!(interpreter.run("limit").unwrap(), Value::Number(10.0));
}

#[test]
fn assigning_an_undeclared_name_is_an_error() {
    let mut interpreter = Interpreter::new();
    let errors = interpreter.run("x = 1;").unwrap_err();
    assert_eq!(errors.first().map(|e| e.kind), Some(ErrorKind::NameError));

    let errors = interpreter.run("x;").unwrap_err();
    assert_eq!(errors.first().map(|e| e.kind), Some(ErrorKind::NameError));
    assert_eq!(interpreter.global("x"), None);
}

#[test]
fn parser_recovers_after_a_malformed_statement() {
    let source = "let = 1;\nlet a = 2;\nlet b = a * 3;\nfn f() { return b; }\n";
    let tokens = noocrush::tokenize(source).unwrap();
    let (program, errors) = noocrush::Parser::new(tokens).parse_with_recovery();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::SyntaxError);
    assert_eq!(errors[0].line, 1);
    assert_eq!(program.statements.len(), 3);

    let errors = run(source).unwrap_err();
    assert!(errors.is_static());
}

#[test]
fn several_syntax_errors_are_reported_together() {
    let errors = run("let a = ;\nprint(1);\nlet 5 = 2;\nbreak;").unwrap_err();
    let lines: Vec<usize> = errors.iter().map(|error| error.line).collect();
    assert_eq!(lines, vec![1, 3, 4]);
}

#[test]
fn lists_are_shared_by_reference() {
    let program = r#"
        let a = [1, 2, 3];
        let b = a;
        b[0] = 10;
        push(b, 4);
        a;
    "#;
    assert_eq!(run_ok(program).to_string(), "[10, 2, 3, 4]");
}

#[test]
fn instances_are_shared_by_reference() {
    let program = r#"
        class Box { init(value) { this.value = value; } }
        fn fill(box) { box.value = "full"; }
        let box = Box("empty");
        fill(box);
        box.value;
    "#;
    assert_eq!(run_ok(program), Value::String("full".to_string()));
}

#[test]
fn stringify_callables() {
    let cases = vec![
        ("fn add(a, b) { return a + b; } add", "<fn add>"),
        ("fn(x) { return x; }", "<fn>"),
        ("class Counter {} Counter", "<class Counter>"),
        ("class Counter {} Counter()", "<Counter instance>"),
        ("len", "<native fn len>"),
    ];
    for (input, expected) in cases {
        assert_eq!(run_ok(input).to_string(), expected, "input: {}", input);
    }
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let mut interpreter = Interpreter::with_config(Config::default().with_max_call_depth(200));
    let errors = interpreter
        .run("fn forever(n) { return forever(n + 1); }\nforever(0);")
        .unwrap_err();
    let error = errors.first().unwrap();
    assert_eq!(error.kind, ErrorKind::RuntimeError);
    assert_eq!(
        error.message,
        "stack overflow (maximum recursion depth 200 exceeded)"
    );
    assert!(!errors.is_static());
}

#[test]
fn deeply_nested_expressions_parse_and_run() {
    let depth = 2000;
    let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(run_ok(&source), Value::Number(1.0));
}

#[test]
fn deeply_nested_statements_parse_and_run() {
    let depth = 2000;
    let blocks = format!("{}1;{}", "{".repeat(depth), "}".repeat(depth));
    assert_eq!(run_ok(&blocks), Value::Null);

    let ifs = format!("let hit = 0;\n{}hit = hit + 1;\nhit;", "if (true) ".repeat(depth));
    assert_eq!(run_ok(&ifs), Value::Number(1.0));

    let whiles = format!("let n = 0;\n{}n = n + 1;\nn;", "while (n < 1) ".repeat(depth));
    assert_eq!(run_ok(&whiles), Value::Number(1.0));
}

#[test]
fn self_containing_lists_print_and_compare() {
    let program = r#"
        let a = [1];
        push(a, a);
        str(a);
    "#;
    assert_eq!(run_ok(program), Value::String("[1, [...]]".to_string()));

    let program = r#"
        let a = [1, 2];
        a[1] = a;
        a;
    "#;
    assert_eq!(run_ok(program).to_string(), "[1, [...]]");

    let program = r#"
        let a = [1]; push(a, a);
        let b = [1]; push(b, b);
        let c = [2]; push(c, c);
        [a == b, a == c, a != c];
    "#;
    assert_eq!(run_ok(program).to_string(), "[true, false, true]");
}

#[test]
fn constructing_ignores_the_initializer_result() {
    let program = r#"
        class Token {
            init() {
                this.x = 1;
                return 5;
            }
        }
        Token().x;
    "#;
    assert_eq!(run_ok(program), Value::Number(1.0));

    let program = "class Token { init() { this.x = 1; return 5; } } Token()";
    assert_eq!(run_ok(program).to_string(), "<Token instance>");

    let program = r#"
        class Token { init() { this.x = 1; return 5; } }
        let t = Token();
        t.init() == t;
    "#;
    assert_eq!(run_ok(program), Value::Boolean(true));
}

#[test]
fn comments_and_annotations_are_ignored() {
    let program = r#"
        // line comment
        /* block
           comment */
        fn area(width: Number, height: Number) -> Number {
            return width * height; // trailing
        }
        let result: Number = area(3, 4);
        result
    "#;
    assert_eq!(run_ok(program), Value::Number(12.0));
}

#[test]
fn runtime_errors_report_their_line() {
    let error = first_error("let items = [1, 2];\n\nitems[5];");
    assert_eq!(
        error.to_string(),
        "[line 3] IndexError: index 5 out of range for length 2"
    );

    let error = first_error("class Empty {}\nEmpty().nothing;");
    assert_eq!(
        error.to_string(),
        "[line 2] AttributeError: 'Empty' instance has no attribute 'nothing'"
    );

    let error = first_error("let s = \"text\";\ns();");
    assert_eq!(error.to_string(), "[line 2] TypeError: 'string' value is not callable");
}

#[test]
fn lex_errors_are_reported() {
    let error = first_error("let s = \"open");
    assert_eq!(error.kind, ErrorKind::LexError);
    assert_eq!(error.message, "unterminated string");
}
