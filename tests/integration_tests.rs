use chrono::{TimeZone, Utc};
use object_query::{
    EvalError, ExpressionCompiler, Function, FunctionTable, Grammar, Value, compile_expression,
};
use serde_json::json;

fn eval_expr(expr_str: &str, record: serde_json::Value) -> Result<Value, String> {
    let compiled = compile_expression(expr_str).map_err(|e| e.to_string())?;
    compiled
        .evaluate(&Value::from(record))
        .map_err(|e| e.to_string())
}

fn eval(expr_str: &str) -> Value {
    eval_expr(expr_str, json!({})).unwrap()
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(eval("1 + 2 * 3"), Value::Integer(7));
    assert_eq!(eval("2 ^ 3 % 3"), Value::Integer(2));
    assert_eq!(eval("(1 + 2) * 3"), Value::Integer(9));
    assert_eq!(eval("-2 ^ 2"), Value::Integer(4));
}

#[test]
fn test_math_functions() {
    assert_eq!(eval("round(4.5)"), Value::Integer(5));
    assert_eq!(eval("log10(100)"), Value::Integer(2));
    assert_eq!(eval("abs(-3)"), Value::Integer(3));
    assert_eq!(eval("sqrt(16)"), Value::Integer(4));
    assert_eq!(eval("max(2,3,4)"), Value::Integer(4));
    assert_eq!(eval("min(2,3,4)"), Value::Integer(2));
}

#[test]
fn test_string_concatenation() {
    let result = eval_expr(r#"first + " " + last"#, json!({"first": "Ada", "last": "Lovelace"}));
    assert_eq!(result.unwrap(), Value::from("Ada Lovelace"));
}

// ============================================================================
// Boolean results are 1 or 0
// ============================================================================

#[test]
fn test_logic_yields_numbers() {
    assert_eq!(eval("0 and 1"), Value::Integer(0));
    assert_eq!(eval("1 and 1"), Value::Integer(1));
    assert_eq!(eval("0 or 0"), Value::Integer(0));
    assert_eq!(eval("2 or 0"), Value::Integer(1));
    assert_eq!(eval("not 0"), Value::Integer(1));
    assert_eq!(eval(r#"not "x""#), Value::Integer(0));
}

#[test]
fn test_comparisons_yield_numbers() {
    assert_eq!(eval("0 > 1"), Value::Integer(0));
    assert_eq!(eval("2 >= 1"), Value::Integer(1));
    assert_eq!(eval("1 < 2"), Value::Integer(1));
    assert_eq!(eval("2 <= 2"), Value::Integer(1));
    assert_eq!(eval("3 == 3.0"), Value::Integer(1));
    assert_eq!(eval("3 != 3"), Value::Integer(0));
    assert_eq!(eval(r#""3" == 3"#), Value::Integer(1));
    assert_eq!(eval(r#""abc" < "abd""#), Value::Integer(1));
}

#[test]
fn test_regex_match() {
    let record = json!({"name": "foobar"});
    assert_eq!(eval_expr(r#"name ~= "^fo+""#, record.clone()).unwrap(), Value::Integer(1));
    assert_eq!(eval_expr(r#"name ~= "^bar""#, record).unwrap(), Value::Integer(0));
}

#[test]
fn test_invalid_literal_pattern_fails_at_evaluation() {
    let compiled = compile_expression(r#"name ~= "(""#).unwrap();
    let err = compiled.evaluate(&Value::from(json!({"name": "x"}))).unwrap_err();
    assert!(matches!(err, EvalError::InvalidPattern { .. }));
}

#[test]
fn test_ternary() {
    assert_eq!(eval("1 ? 2 : 3"), Value::Integer(2));
    assert_eq!(eval("0 ? 2 : 3"), Value::Integer(3));
    assert_eq!(
        eval_expr(r#"age >= 18 ? "adult" : "minor""#, json!({"age": 12})).unwrap(),
        Value::from("minor")
    );
}

// ============================================================================
// Membership
// ============================================================================

#[test]
fn test_set_membership() {
    assert_eq!(eval("3 in (2,3,4)"), Value::Integer(1));
    assert_eq!(eval("3 not in (2,3,4)"), Value::Integer(0));
    assert_eq!(eval("not (3 in (2,3,4))"), Value::Integer(0));
    assert_eq!(eval(r#""3" in (2,3,4)"#), Value::Integer(1));
    assert_eq!(eval(r#"city in ("sz")"#), Value::Integer(0));
}

#[test]
fn test_has_operator_and_function_agree() {
    let record = json!({"numbers": [1, 2, 8, 9]});
    assert_eq!(eval_expr("numbers has 1", record.clone()).unwrap(), Value::Integer(1));
    assert_eq!(eval_expr("numbers has 3", record.clone()).unwrap(), Value::Integer(0));
    assert_eq!(eval_expr("numbers not has 3", record.clone()).unwrap(), Value::Integer(1));
    assert_eq!(
        eval_expr("has(numbers, 1)", record.clone()).unwrap(),
        Value::Boolean(true)
    );
    assert_eq!(
        eval_expr("has(numbers, 3)", record).unwrap(),
        Value::Boolean(false)
    );
    assert_eq!(eval("(2,3,4) has 4"), Value::Integer(1));
}

#[test]
fn test_has_on_text_is_substring() {
    let record = json!({"title": "hello world"});
    assert_eq!(eval_expr(r#"title has "lo w""#, record).unwrap(), Value::Integer(1));
}

#[test]
fn test_has_against_absent_is_false() {
    assert_eq!(eval_expr("missing has 1", json!({})).unwrap(), Value::Integer(0));
    assert_eq!(eval_expr("missing not has 1", json!({})).unwrap(), Value::Integer(1));
}

#[test]
fn test_has_is_strict_while_in_is_loose() {
    let record = json!({"numbers": [1, 2, 3]});
    assert_eq!(eval_expr(r#"numbers has "1""#, record).unwrap(), Value::Integer(0));
    assert_eq!(eval(r#""1" in (1, 2, 3)"#), Value::Integer(1));
}

// ============================================================================
// Property paths
// ============================================================================

#[test]
fn test_path_navigation() {
    let record = json!({"user": {"addr": {"city": "sz"}}, "number": 123});
    assert_eq!(eval_expr("user.addr.city", record.clone()).unwrap(), Value::from("sz"));
    assert_eq!(eval_expr("number", record).unwrap(), Value::Integer(123));
}

#[test]
fn test_missing_path_is_absent() {
    assert_eq!(eval_expr("a.b.c", json!({})).unwrap(), Value::Absent);
    assert_eq!(eval_expr("a.b.c", json!({"a": 5})).unwrap(), Value::Absent);
    assert_eq!(eval_expr("a.b.c == 1", json!({})).unwrap(), Value::Integer(0));
}

#[test]
fn test_quoted_segments() {
    let record = json!({
        "Danube.Steamboat.Shipping.Company": {"the captain": {"hat": "peaked"}},
        "hello-world": {"count": 2},
        "a.b": 1,
    });
    assert_eq!(
        eval_expr("'Danube.Steamboat.Shipping.Company'.'the captain'.hat", record.clone())
            .unwrap(),
        Value::from("peaked")
    );
    assert_eq!(
        eval_expr("'hello-world'.count + 1", record.clone()).unwrap(),
        Value::Integer(3)
    );
    assert_eq!(eval_expr("'a.b'", record.clone()).unwrap(), Value::Integer(1));
    // unquoted dots always mean nesting
    assert_eq!(eval_expr("a.b", record).unwrap(), Value::Absent);
}

#[test]
fn test_booleans_in_records_become_numbers() {
    let record = json!({"checked": true, "hidden": false});
    assert_eq!(eval_expr("checked", record.clone()).unwrap(), Value::Integer(1));
    assert_eq!(eval_expr("hidden", record.clone()).unwrap(), Value::Integer(0));
    assert_eq!(eval_expr("checked == 1", record).unwrap(), Value::Integer(1));
}

// ============================================================================
// Collections and dates
// ============================================================================

#[test]
fn test_count() {
    let record = json!({"numbers": [2, 3, 4]});
    assert_eq!(eval_expr("count(numbers)", record.clone()).unwrap(), Value::Integer(3));
    assert_eq!(eval_expr("count(missing)", record.clone()).unwrap(), Value::Integer(0));
    assert_eq!(eval_expr("maxof(numbers)", record.clone()).unwrap(), Value::Integer(4));
    assert_eq!(eval_expr("minof(numbers)", record).unwrap(), Value::Integer(2));
}

#[test]
fn test_date() {
    assert_eq!(
        eval("date(1000)"),
        Value::Date(Utc.timestamp_opt(1000, 0).unwrap())
    );
    assert_eq!(
        eval(r#"date("2021-6-1")"#),
        Value::Date(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap())
    );

    let before = Utc::now();
    let Value::Date(now) = eval("date()") else {
        panic!("date() should return a date");
    };
    assert!(now >= before && now <= Utc::now());
}

#[test]
fn test_days() {
    assert_eq!(eval("days(0, 259200)"), Value::Integer(3));
    assert_eq!(eval(r#"days("2021-1-1", "2021-1-10")"#), Value::Integer(9));
    assert_eq!(eval(r#"days("2021-1-10", "2021-1-1")"#), Value::Integer(-9));
    assert_eq!(eval(r#"days(date(0), "1970-1-2")"#), Value::Integer(1));
    assert_eq!(
        eval_expr("days(created, 864000)", json!({"created": 0})).unwrap(),
        Value::Integer(10)
    );
}

#[test]
fn test_invalid_date_is_an_error() {
    let err = eval_expr(r#"date("not a date")"#, json!({})).unwrap_err();
    assert!(err.contains("Invalid date"));
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn test_unknown_function_fails_on_every_evaluation() {
    let compiled = compile_expression("nope(1) + 1").unwrap();
    for _ in 0..3 {
        let err = compiled.evaluate(&Value::Null).unwrap_err();
        assert_eq!(err, EvalError::UnknownFunction("nope".to_string()));
    }
}

#[test]
fn test_unknown_function_in_untaken_branch_is_fine() {
    let compiled = compile_expression("flag ? nope() : 5").unwrap();
    assert_eq!(compiled.evaluate(&Value::from(json!({"flag": 0}))).unwrap(), Value::Integer(5));
    assert!(compiled.evaluate(&Value::from(json!({"flag": 1}))).is_err());
}

#[test]
fn test_recompiling_gives_independent_evaluators() {
    let first = compile_expression("price * qty").unwrap();
    let second = compile_expression("price * qty").unwrap();
    let record = Value::from(json!({"price": 3, "qty": 7}));

    let first = first.into_fn();
    assert_eq!(first(&record).unwrap(), Value::Integer(21));
    assert_eq!(second.evaluate(&record).unwrap(), first(&record).unwrap());
}

#[test]
fn test_grammar_is_built_once() {
    for expr in ["1", "a + b", "x in (1, 2)", "date()", "'q'.r ~= \"s\""] {
        compile_expression(expr).unwrap();
    }
    assert_eq!(Grammar::build_count(), 1);
}

#[test]
fn test_evaluators_are_shareable_across_threads() {
    let compiled = compile_expression("n * 2").unwrap();
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let compiled = compiled.clone();
            std::thread::spawn(move || compiled.evaluate(&Value::from(json!({"n": n}))))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
    assert_eq!(
        results,
        vec![Value::Integer(0), Value::Integer(2), Value::Integer(4), Value::Integer(6)]
    );
}

// ============================================================================
// Extension points
// ============================================================================

#[test]
fn test_extra_functions() {
    let compiler = ExpressionCompiler::new().with_function(
        "double",
        Function::fixed(1, |args| Ok(Value::from_f64(args[0].to_number() * 2.0))),
    );
    let compiled = compiler.compile("double(3) + 1").unwrap();
    assert_eq!(compiled.evaluate(&Value::Null).unwrap(), Value::Integer(7));

    let err = compiler.compile("double()").unwrap().evaluate(&Value::Null).unwrap_err();
    assert!(matches!(err, EvalError::Arity { got: 0, .. }));
}

#[test]
fn test_function_table_merge() {
    let mut extra = FunctionTable::new();
    extra.insert("one", Function::fixed(0, |_| Ok(Value::Integer(1))));
    extra.insert("two", Function::fixed(0, |_| Ok(Value::Integer(2))));
    let compiled = ExpressionCompiler::new()
        .with_functions(extra)
        .compile("one() + two() + abs(-3)")
        .unwrap();
    assert_eq!(compiled.evaluate(&Value::Null).unwrap(), Value::Integer(6));
}

#[test]
fn test_has_operator_uses_overridden_function() {
    let compiler = ExpressionCompiler::new().with_function(
        "has",
        Function::fixed(2, |_| Ok(Value::Boolean(true))),
    );
    let record = Value::from(json!({"numbers": [1, 2]}));
    assert_eq!(
        compiler.compile("numbers has 3").unwrap().evaluate(&record).unwrap(),
        Value::Integer(1)
    );
    assert_eq!(
        compiler.compile("numbers not has 3").unwrap().evaluate(&record).unwrap(),
        Value::Integer(0)
    );
}

#[test]
fn test_custom_resolver_replaces_the_walker() {
    let compiler = ExpressionCompiler::new().with_custom_resolver(|path, get, _record| {
        match path.strip_prefix("upper.") {
            Some(field) => Value::from(get.get(field).as_string().to_uppercase()),
            None => get.get(path),
        }
    });
    let record = Value::from(json!({"city": "sz", "user": {"name": "x"}}));

    let compiled = compiler.compile("upper.city").unwrap();
    assert_eq!(compiled.evaluate(&record).unwrap(), Value::from("SZ"));

    // the default walker would find user.name
    let compiled = compiler.compile("user.name").unwrap();
    assert_eq!(compiled.evaluate(&record).unwrap(), Value::Absent);
}

#[test]
fn test_custom_resolver_results_are_coerced() {
    let compiler = ExpressionCompiler::new().with_custom_resolver(|_, _, _| Value::Boolean(true));
    let compiled = compiler.compile("anything + 1").unwrap();
    assert_eq!(compiled.evaluate(&Value::Null).unwrap(), Value::Integer(2));
}

#[test]
fn test_syntax_errors() {
    for bad in ["1 +", "(1, 2", "a in b", "? 1", "1 2", "a & b", "f(1,)"] {
        assert!(compile_expression(bad).is_err(), "should reject {:?}", bad);
    }
}
