// Integration tests for the Swiftlet interpreter
//
// Table-driven suites run through the public entry points: parser robustness
// cases check that malformed input is reported rather than crashing, and
// program cases check the exact text `evaluate` returns.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use swiftlet::parser::parse_source;
use swiftlet::{evaluate, evaluate_with, Limits, Value};

/// Test result for a single test case
#[derive(Debug)]
pub enum TestResult {
    Pass,
    Fail(String),
    Crash(String),
}

/// What a test case expects from its input
#[derive(Debug, Clone)]
pub enum Expectation {
    Parses,
    /// Parsing reports at least one error, containing the text if given
    SyntaxError(Option<String>),
    /// `evaluate` returns exactly this text
    Output(String),
}

/// Individual test case
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expectation: Expectation,
}

/// Test suite containing multiple test cases
#[derive(Debug)]
pub struct TestSuite {
    pub name: String,
    pub tests: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tests: Vec::new(),
        }
    }

    pub fn add_test(&mut self, test: TestCase) {
        self.tests.push(test);
    }

    /// Run all tests in this suite
    pub fn run(&self) -> TestSuiteResults {
        let mut results = TestSuiteResults::new(&self.name);

        println!("Running test suite: {}", self.name);
        println!("{}", "=".repeat(50));

        for test in &self.tests {
            let result = run_single_test(test);
            results.add_result(&test.name, result);
        }

        results.print_summary();
        results
    }
}

/// Results for a test suite run
#[derive(Debug)]
pub struct TestSuiteResults {
    pub suite_name: String,
    pub results: Vec<(String, TestResult)>,
    pub passed: usize,
    pub failed: usize,
    pub crashed: usize,
}

impl TestSuiteResults {
    pub fn new(suite_name: &str) -> Self {
        Self {
            suite_name: suite_name.to_string(),
            results: Vec::new(),
            passed: 0,
            failed: 0,
            crashed: 0,
        }
    }

    pub fn add_result(&mut self, test_name: &str, result: TestResult) {
        match &result {
            TestResult::Pass => {
                self.passed += 1;
                println!("  ✓ {}", test_name);
            }
            TestResult::Fail(msg) => {
                self.failed += 1;
                println!("  ✗ {}: {}", test_name, msg);
            }
            TestResult::Crash(msg) => {
                self.crashed += 1;
                println!("  💥 {}: CRASHED - {}", test_name, msg);
            }
        }
        self.results.push((test_name.to_string(), result));
    }

    pub fn print_summary(&self) {
        println!();
        println!("Test Suite: {} - Summary", self.suite_name);
        println!("{}", "-".repeat(30));
        println!("Passed:  {}", self.passed);
        println!("Failed:  {}", self.failed);
        println!("Crashed: {}", self.crashed);
        println!("Total:   {}", self.results.len());

        if self.crashed > 0 {
            println!("\n⚠️  WARNING: {} tests panicked inside the interpreter.", self.crashed);
        }
        if self.failed > 0 {
            println!("\n❌ {} tests had unexpected results.", self.failed);
        }
        println!();
    }

    pub fn is_all_passed(&self) -> bool {
        self.crashed == 0 && self.failed == 0
    }
}

/// Run a single test case
fn run_single_test(test: &TestCase) -> TestResult {
    // Catch any panics to detect crashes
    let result = std::panic::catch_unwind(|| check(test));

    match result {
        Ok(Ok(())) => TestResult::Pass,
        Ok(Err(message)) => TestResult::Fail(message),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic".to_string()
            };
            TestResult::Crash(panic_msg)
        }
    }
}

fn check(test: &TestCase) -> Result<(), String> {
    match &test.expectation {
        Expectation::Parses => {
            let (_, errors) = parse_source(&test.input);
            match errors.first() {
                None => Ok(()),
                Some(error) => Err(format!("Expected parsing to succeed, but got error: {}", error)),
            }
        }
        Expectation::SyntaxError(expected) => {
            let (_, errors) = parse_source(&test.input);
            if errors.is_empty() {
                return Err("Expected parsing to fail, but it succeeded".to_string());
            }
            match expected {
                Some(expected) if !errors.iter().any(|e| e.message.contains(expected.as_str())) => {
                    Err(format!(
                        "No error message contains expected text '{}'; got {:?}",
                        expected,
                        errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>()
                    ))
                }
                _ => Ok(()),
            }
        }
        Expectation::Output(expected) => {
            let output = evaluate(&test.input, &HashMap::new());
            if &output == expected {
                Ok(())
            } else {
                Err(format!("Expected output {:?}, got {:?}", expected, output))
            }
        }
    }
}

/// Test case builder for convenience
impl TestCase {
    pub fn should_succeed(name: &str, input: &str) -> Self {
        Self::new(name, input, Expectation::Parses)
    }

    pub fn should_fail(name: &str, input: &str) -> Self {
        Self::new(name, input, Expectation::SyntaxError(None))
    }

    pub fn should_fail_with_message(name: &str, input: &str, expected_msg: &str) -> Self {
        Self::new(name, input, Expectation::SyntaxError(Some(expected_msg.to_string())))
    }

    pub fn should_print(name: &str, input: &str, expected_output: &str) -> Self {
        Self::new(name, input, Expectation::Output(expected_output.to_string()))
    }

    fn new(name: &str, input: &str, expectation: Expectation) -> Self {
        Self {
            name: name.to_string(),
            input: input.to_string(),
            expectation,
        }
    }
}

// ============================================================================
// Parser Suites
// ============================================================================

fn create_malformed_input_tests() -> TestSuite {
    let mut suite = TestSuite::new("Malformed Input");

    suite.add_test(TestCase::should_fail_with_message(
        "unmatched_opening_paren",
        "(1 + 2",
        "Expected ')' after expression",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "unmatched_opening_paren_nested",
        "((1 + 2)",
        "Expected ')' after expression",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "unclosed_array",
        "[1, 2",
        "Expected ']' after array elements",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "dictionary_missing_colon",
        "[\"a\": 1, \"b\" 2]",
        "Expected ':' after dictionary key",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "unclosed_call",
        "foo(1, 2",
        "Expected ')' after arguments",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "unclosed_print",
        "print(1",
        "Expected ')' after print arguments",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "if_without_braces",
        "if x > 1 print(x)",
        "Expected '{' to open a block",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "unclosed_block",
        "while true { print(1)",
        "Expected '}' after block",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "for_without_in",
        "for i [1, 2] { }",
        "Expected 'in' after loop variable",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "declaration_without_name",
        "var = 5",
        "Expected variable name",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "function_without_name",
        "func (x: Int) { }",
        "Expected function name after 'func'",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "switch_without_case",
        "switch x { print(1) }",
        "Expected 'case' or 'default' in switch",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "dangling_operator",
        "1 +",
        "Expected expression, found end of input",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "operator_before_close",
        "print(1 +)",
        "Expected expression, found ')'",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "cast_without_type",
        "x as! ",
        "Expected type name",
    ));
    suite.add_test(TestCase::should_fail_with_message(
        "unclosed_type_annotation",
        "let ages: [String: Int = [:]",
        "Expected type name",
    ));
    suite.add_test(TestCase::should_fail("if_missing_condition", "if { x = 1 }"));
    suite.add_test(TestCase::should_fail("while_missing_body", "while true"));
    suite.add_test(TestCase::should_fail("assignment_missing_value", "x ="));
    suite.add_test(TestCase::should_fail("mixed_paren_bracket_error", "x = [1 + (2 * 3]"));

    suite
}

fn create_edge_case_tests() -> TestSuite {
    let mut suite = TestSuite::new("Edge Cases");

    suite.add_test(TestCase::should_succeed("empty_input", ""));
    suite.add_test(TestCase::should_succeed("only_whitespace", "   \n\t  "));
    suite.add_test(TestCase::should_succeed("only_comments", "// note\n/* block */"));
    suite.add_test(TestCase::should_succeed("stray_closing_brace", "} print(1)"));
    suite.add_test(TestCase::should_succeed("leading_plus_is_skipped", "+ 1"));
    suite.add_test(TestCase::should_succeed("semicolons", ";;print(1); print(2);"));
    suite.add_test(TestCase::should_succeed("unknown_characters", "@ # $"));
    suite.add_test(TestCase::should_succeed("literal_target_is_ignored", "1 = x"));

    let deep_parens = "(".repeat(200) + "1" + &")".repeat(200);
    suite.add_test(TestCase::should_succeed("deeply_nested_parens", &deep_parens));

    suite
}

fn create_operator_tests() -> TestSuite {
    let mut suite = TestSuite::new("Operator Tests");

    suite.add_test(TestCase::should_succeed("double_minus", "1 -- 2")); // 1 - (-2)
    suite.add_test(TestCase::should_succeed("mixed_operators", "1 +- 2")); // 1 + (-2)
    suite.add_test(TestCase::should_succeed("assign_negative", "x =-1"));
    suite.add_test(TestCase::should_succeed("equals_not", "a ==!b"));
    suite.add_test(TestCase::should_succeed("logical", "a && b || !c"));
    suite.add_test(TestCase::should_succeed("closed_range", "1...5"));
    suite.add_test(TestCase::should_succeed("half_open_range", "0..<n"));
    suite.add_test(TestCase::should_succeed("compound_assignments", "x += 1\nx -= 1\nx *= 2\nx /= 2"));
    suite.add_test(TestCase::should_succeed("comparison_chain", "1 < 2 == true"));

    suite
}

fn create_statement_tests() -> TestSuite {
    let mut suite = TestSuite::new("Statement Tests");

    suite.add_test(TestCase::should_succeed("if", "if x { }"));
    suite.add_test(TestCase::should_succeed(
        "else_if_chain",
        "if x == 1 { } else if x == 2 { } else { }",
    ));
    suite.add_test(TestCase::should_succeed("if_let", "if let v = d[\"k\"] { }"));
    suite.add_test(TestCase::should_succeed("if_let_shorthand", "if let v { }"));
    suite.add_test(TestCase::should_succeed("while", "while i < 10 { i += 1 }"));
    suite.add_test(TestCase::should_succeed("for_underscore", "for _ in 1...3 { }"));
    suite.add_test(TestCase::should_succeed(
        "switch_with_break",
        "switch n { case 1: break default: break }",
    ));
    suite.add_test(TestCase::should_succeed("typed_let", "let x: Int = 5"));
    suite.add_test(TestCase::should_succeed("array_type", "var names: [String] = []"));
    suite.add_test(TestCase::should_succeed("nested_array_init", "var grid: [[Int]] = [[Int]]()"));
    suite.add_test(TestCase::should_succeed("tuple_type", "var t: (Int, String) = (1, \"a\")"));
    suite.add_test(TestCase::should_succeed("optional_type", "var o: Int? = nil"));
    suite.add_test(TestCase::should_succeed("generic_type", "var d: Dictionary<String, Int> = [:]"));
    suite.add_test(TestCase::should_succeed(
        "function",
        "func add(_ a: Int, _ b: Int) -> Int { return a + b }",
    ));
    suite.add_test(TestCase::should_succeed(
        "default_parameter",
        "func greet(name: String = \"you\") { }",
    ));
    suite.add_test(TestCase::should_succeed("bare_return", "func f() { return }"));

    suite
}

fn create_expression_tests() -> TestSuite {
    let mut suite = TestSuite::new("Expression Tests");

    suite.add_test(TestCase::should_succeed("call", "foo()"));
    suite.add_test(TestCase::should_succeed("call_with_args", "foo(1, 2, 3)"));
    suite.add_test(TestCase::should_succeed("labeled_args", "greet(name: \"Ann\")"));
    suite.add_test(TestCase::should_succeed("trailing_comma", "foo(1, 2,)"));
    suite.add_test(TestCase::should_succeed("postfix_chain", "a.b.c(1)[0]!"));
    suite.add_test(TestCase::should_succeed("conversion_call", "Int(\"4\")!"));
    suite.add_test(TestCase::should_succeed("try_optional", "try? f()"));
    suite.add_test(TestCase::should_succeed("optional_chain", "a?.count"));
    suite.add_test(TestCase::should_succeed("empty_array", "[]"));
    suite.add_test(TestCase::should_succeed("empty_dictionary", "[:]"));
    suite.add_test(TestCase::should_succeed("array_trailing_comma", "[1, 2,]"));
    suite.add_test(TestCase::should_succeed("dictionary_trailing_comma", "[\"a\": 1,]"));
    suite.add_test(TestCase::should_succeed("dictionary_init", "[String: Int]()"));
    suite.add_test(TestCase::should_succeed("labeled_tuple", "(x: 1, y: 2)"));
    suite.add_test(TestCase::should_succeed("tuple_member", "t.0.1"));
    suite.add_test(TestCase::should_succeed(
        "nested_interpolation",
        "print(\"a \\(b + \"c\") d\")",
    ));

    suite
}

// ============================================================================
// Program Suites
// ============================================================================

fn create_fault_tests() -> TestSuite {
    let mut suite = TestSuite::new("Runtime Faults");

    suite.add_test(TestCase::should_print(
        "division_by_zero",
        "let a = 10\nlet b = 0\nprint(a / b)\nprint(\"after\")",
        "Runtime Error: Division by zero",
    ));
    suite.add_test(TestCase::should_print(
        "index_out_of_range",
        "let arr = [1, 2, 3]\nprint(arr[3])",
        "Runtime Error: Index out of range",
    ));
    suite.add_test(TestCase::should_print(
        "output_before_fault_is_kept",
        "print(\"start\")\nlet items = [1]\nprint(items[1])\nprint(\"never\")",
        "start\nRuntime Error: Index out of range",
    ));
    suite.add_test(TestCase::should_print(
        "string_index_out_of_range",
        "let s = \"abc\"\nprint(s[3])",
        "Fatal error: String index out of range",
    ));
    suite.add_test(TestCase::should_print(
        "nil_force_unwrap",
        "var name: String? = nil\nprint(name!)",
        "Fatal error: Unexpectedly found nil while unwrapping an Optional value",
    ));
    suite.add_test(TestCase::should_print(
        "unbounded_recursion",
        "func loop(n){ loop(n+1) }; loop(0)",
        "Fatal error: Stack overflow",
    ));
    suite.add_test(TestCase::should_print(
        "failed_cast",
        "let value = \"12\"\nlet n = value as! Int",
        "Fatal error: Could not cast value of type 'String' to 'Int'",
    ));
    suite.add_test(TestCase::should_print(
        "try_force_error",
        "let r = try! \"Error: disk full\"",
        "Fatal error: 'try!' expression unexpectedly raised an error: Error: disk full",
    ));
    suite.add_test(TestCase::should_print(
        "remove_last_from_empty",
        "var stack: [Int] = []\nstack.removeLast()",
        "Runtime Error: Can't remove last element from an empty collection",
    ));
    suite.add_test(TestCase::should_print(
        "syntax_errors_are_joined",
        "print(1\nvar = 2",
        "Syntax Error: Expected ')' after print arguments\nSyntax Error: Expected variable name",
    ));

    suite
}

fn create_program_tests() -> TestSuite {
    let mut suite = TestSuite::new("Programs");

    suite.add_test(TestCase::should_print("hello", "print(\"Hello\")", "Hello"));
    suite.add_test(TestCase::should_print(
        "interpolation",
        "let age = 20\nprint(\"I am \\(age) years old\")",
        "I am 20 years old",
    ));
    suite.add_test(TestCase::should_print(
        "while_true_is_capped",
        "var count = 0\nwhile true { count += 1 }\nprint(count)",
        "1000",
    ));
    suite.add_test(TestCase::should_print(
        "function_locals_stay_local",
        "func f() { var secret = 42 }\nf()\nprint(secret)",
        "nil",
    ));
    suite.add_test(TestCase::should_print("case_insensitive_names", "var X = 1\nprint(x)", "1"));
    suite.add_test(TestCase::should_print("undefined_is_nil", "print(ghost)", "nil"));
    suite.add_test(TestCase::should_print(
        "output_is_trimmed",
        "print(\"\")\nprint(\"a\")\nprint(\"\")",
        "a",
    ));
    suite.add_test(TestCase::should_print(
        "fizzbuzz",
        "for i in 1...15 {\n    if i % 15 == 0 {\n        print(\"FizzBuzz\")\n    } else if i % 3 == 0 {\n        print(\"Fizz\")\n    } else if i % 5 == 0 {\n        print(\"Buzz\")\n    } else {\n        print(i)\n    }\n}",
        "1\n2\nFizz\n4\nBuzz\nFizz\n7\n8\nFizz\nBuzz\n11\nFizz\n13\n14\nFizzBuzz",
    ));
    suite.add_test(TestCase::should_print(
        "labeled_parameters",
        "func greet(person name: String, times: Int) -> String {\n    var result = \"\"\n    for _ in 0..<times { result += \"Hi \\(name)! \" }\n    return result\n}\nprint(greet(person: \"Ann\", times: 2))",
        "Hi Ann! Hi Ann!",
    ));
    suite.add_test(TestCase::should_print(
        "fibonacci",
        "func fib(_ n: Int) -> Int {\n    if n < 2 { return n }\n    return fib(n - 1) + fib(n - 2)\n}\nprint(fib(15))",
        "610",
    ));
    suite.add_test(TestCase::should_print(
        "dictionary",
        "var scores = [\"ann\": 90]\nscores[\"bob\"] = 85\nprint(scores)\nprint(scores[\"ann\"])\nprint(scores[\"zed\"])\nprint(scores.count)",
        "[\"ann\": 90, \"bob\": 85]\nOptional(90)\nnil\n2",
    ));
    suite.add_test(TestCase::should_print(
        "optional_binding",
        "let input = \"42\"\nif let n = Int(input) {\n    print(n + 1)\n} else {\n    print(\"bad\")\n}",
        "43",
    ));
    suite.add_test(TestCase::should_print(
        "switch_on_strings",
        "let c = \"b\"\nswitch c {\ncase \"a\": print(\"first\")\ncase \"b\", \"c\": print(\"later\")\ndefault: print(\"other\")\n}",
        "later",
    ));
    suite.add_test(TestCase::should_print(
        "array_methods",
        "var nums = [5, 3, 8]\nnums.append(1)\nnums.insert(9, at: 0)\nprint(nums)\nprint(nums.sorted())\nprint(nums.contains(8), nums.firstIndex(of: 3))\nprint(nums.removeFirst(), nums)",
        "[9, 5, 3, 8, 1]\n[1, 3, 5, 8, 9]\ntrue Optional(2)\n9 [5, 3, 8, 1]",
    ));
    suite.add_test(TestCase::should_print(
        "string_methods",
        "let word = \"Swift\"\nprint(word.count, word.uppercased(), word.hasPrefix(\"Sw\"))\nprint(String(word.reversed()))",
        "5 SWIFT true\ntfiwS",
    ));
    suite.add_test(TestCase::should_print(
        "tuples",
        "let point = (x: 3, y: 4)\nprint(point.x * point.y)\nprint(point)",
        "12\n(x: 3, y: 4)",
    ));
    suite.add_test(TestCase::should_print(
        "nested_subscript_assignment",
        "var grid = [[0, 0], [0, 0]]\ngrid[0][1] = 7\nprint(grid)",
        "[[0, 7], [0, 0]]",
    ));
    suite.add_test(TestCase::should_print(
        "doubles",
        "let price = 2.0\nprint(price * 3)\nprint(10 / 4)\nprint(10.0 / 4)",
        "6.0\n2\n2.5",
    ));
    suite.add_test(TestCase::should_print(
        "break_out_of_for",
        "var total = 0\nfor n in [1, 2, 3, 4, 5] {\n    if n == 4 { break }\n    total += n\n}\nprint(total)",
        "6",
    ));
    suite.add_test(TestCase::should_print(
        "stride",
        "for i in stride(from: 10, to: 0, by: -3) { print(i) }",
        "10\n7\n4\n1",
    ));
    suite.add_test(TestCase::should_print(
        "print_separator",
        "print(\"a\", \"b\", separator: \", \")",
        "a, b",
    ));
    suite.add_test(TestCase::should_print(
        "string_conversion",
        "let n = 3\nprint(\"n is \" + String(n))",
        "n is 3",
    ));
    suite.add_test(TestCase::should_print(
        "word_count_with_default",
        "let words = \"to be or not to be\".split(separator: \" \")\nvar counts: [String: Int] = [:]\nfor w in words { counts[w, default: 0] += 1 }\nprint(counts)",
        "[\"to\": 2, \"be\": 2, \"or\": 1, \"not\": 1]",
    ));
    suite.add_test(TestCase::should_print(
        "nil_element_is_not_bound",
        "var n: Int? = nil\nlet xs = [n]\nif let v = xs.first { print(\"bound \\(v)\") } else { print(\"none\") }",
        "none",
    ));
    suite.add_test(TestCase::should_print(
        "string_comparison",
        "print(\"apple\" < \"banana\")",
        "true",
    ));

    suite
}

// ============================================================================
// Main Test Functions
// ============================================================================

fn run_suites(suites: Vec<TestSuite>) {
    let mut all_passed = true;
    for suite in suites {
        let results = suite.run();
        if !results.is_all_passed() {
            all_passed = false;
        }
    }
    assert!(all_passed, "Some tests failed. See output above for details.");
}

#[test]
fn comprehensive_parser_tests() {
    run_suites(vec![
        create_malformed_input_tests(),
        create_edge_case_tests(),
        create_operator_tests(),
        create_statement_tests(),
        create_expression_tests(),
    ]);
}

#[test]
fn comprehensive_program_tests() {
    run_suites(vec![create_fault_tests(), create_program_tests()]);
}

#[test]
fn evaluation_is_deterministic() {
    let source = "var d = [\"b\": 2, \"a\": 1]\nd[\"c\"] = 3\nfor k in d.keys { print(k) }\nprint(d)";
    let first = evaluate(source, &HashMap::new());
    assert_eq!(first, "b\na\nc\n[\"b\": 2, \"a\": 1, \"c\": 3]");
    for _ in 0..5 {
        assert_eq!(evaluate(source, &HashMap::new()), first);
    }
}

#[test]
fn runs_are_isolated() {
    assert_eq!(evaluate("var leaked = 1\nfunc helper() { }", &HashMap::new()), "");
    assert_eq!(evaluate("print(leaked)\nprint(helper())", &HashMap::new()), "nil\nnil");
}

#[test]
fn initial_bindings_seed_globals() {
    let bindings = HashMap::from([
        ("n".to_string(), Value::Int(21)),
        ("Name".to_string(), Value::Str("Ann".to_string())),
    ]);
    assert_eq!(evaluate("print(n * 2)\nprint(\"hi \\(name)\")", &bindings), "42\nhi Ann");
}

#[test]
fn limits_are_configurable() {
    let limits = Limits {
        max_loop_iterations: 10,
        ..Limits::default()
    };
    assert_eq!(
        evaluate_with("var i = 0\nwhile true { i += 1 }\nprint(i)", &HashMap::new(), limits),
        "10"
    );

    let limits = Limits {
        max_call_depth: 3,
        ..Limits::default()
    };
    assert_eq!(
        evaluate_with(
            "func f(_ n: Int) -> Int { if n == 0 { return 0 } return f(n - 1) }\nprint(f(1))\nprint(f(5))",
            &HashMap::new(),
            limits
        ),
        "0\nFatal error: Stack overflow"
    );
}
