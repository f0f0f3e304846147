//! End-to-end evaluation tests over the core vocabulary.

use fallible_iterator::FallibleIterator;
use similar_asserts::assert_eq;

use dwquery_lang::op::{origin_as_op, origin_ref, OpRef, Origin};
use dwquery_lang::value::Brevity;
use dwquery_lang::{core_vocabulary, EvalError, Expr, Stack};

/// Runs a query on an empty seed stack and renders the top of each result.
fn run(query: &str) -> Vec<String> {
    let voc = core_vocabulary();
    let expr = Expr::parse(query, &voc).expect("query parses");
    let mut results = expr.query(Stack::new()).expect("query lowers");

    let mut out = Vec::new();
    while let Some(stk) = results.next().expect("query evaluates") {
        out.push(format!("{}", stk.top().display(Brevity::Brief)));
    }
    out
}

fn run_err(query: &str) -> EvalError {
    let voc = core_vocabulary();
    let expr = Expr::parse(query, &voc).expect("query parses");
    let mut results = expr.query(Stack::new()).expect("query lowers");

    loop {
        match results.next() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("query succeeded unexpectedly"),
            Err(err) => return err,
        }
    }
}

#[test]
fn seq_length() {
    assert_eq!(run("[1,2,3] length"), ["3"]);
}

#[test]
fn arithmetic() {
    assert_eq!(run("1 2 add"), ["3"]);
    assert_eq!(run("5 3 sub"), ["2"]);
    assert_eq!(run("6 7 mul"), ["42"]);
    assert_eq!(run("7 2 div"), ["3"]);
    assert_eq!(run("7 2 mod"), ["1"]);
}

#[test]
fn division_by_zero_drops_the_stack() {
    // A per-stack error: the message goes to stderr and iteration goes on.
    assert_eq!(run("1 0 div"), Vec::<String>::new());
    assert_eq!(run("(1, 2) 0 div"), Vec::<String>::new());
}

#[test]
fn alternation() {
    assert_eq!(run("(1,2,3)"), ["1", "2", "3"]);
}

#[test]
fn alternation_is_fair_across_upstream_stacks() {
    // The merge cursor picks up where it left off; every branch sees every
    // upstream stack exactly once.
    assert_eq!(run("(1,2) (10 add, 20 add)"), ["11", "21", "22", "12"]);
}

#[test]
fn dup_add() {
    assert_eq!(run("1 dup add"), ["2"]);
}

#[test]
fn elem_positions() {
    assert_eq!(run("[1,2,3] elem"), ["1", "2", "3"]);
    assert_eq!(run("[1,2,3] elem pos"), ["0", "1", "2"]);
    assert_eq!(run("[1,2,3] relem"), ["3", "2", "1"]);
    assert_eq!(run("[1,2,3] relem pos"), ["0", "1", "2"]);
}

#[test]
fn let_binding() {
    assert_eq!(run("let A := 5; A A add"), ["10"]);
}

#[test]
fn let_with_multiple_results() {
    // The initializer yields twice; each result binds its own copy of the
    // activation record.
    assert_eq!(run("let A := (1, 2); A A add"), ["2", "4"]);
}

#[test]
fn let_with_two_names() {
    assert_eq!(run("let A, B := 1 2; B A sub"), ["1"]);
}

#[test]
fn nested_scopes() {
    assert_eq!(run("let A := 1; (let B := 2; A B add)"), ["3"]);
}

#[test]
fn closures() {
    assert_eq!(run("let F := {dup add}; 5 F"), ["10"]);
    assert_eq!(run("let X := 3; let F := {X add}; 5 F"), ["8"]);
    assert_eq!(run("5 {dup add} apply"), ["10"]);
}

#[test]
fn block_formals() {
    assert_eq!(run("1 2 {|a b| b a sub} apply"), ["1"]);
}

#[test]
fn capture() {
    assert_eq!(run("[(1,2,3)]"), ["[1, 2, 3]"]);
    assert_eq!(run("[]"), ["[]"]);
    assert_eq!(run("[5 (dup)?]"), ["[5, 5]"]);
}

#[test]
fn or_takes_the_first_branch_with_results() {
    assert_eq!(run("(1 == 2) 5 || 7"), ["7"]);
    assert_eq!(run("(1 == 1) 5 || 7"), ["5"]);
    // All results of the winning branch are drained.
    assert_eq!(run("(5, 6) || 7"), ["5", "6"]);
}

#[test]
fn if_else() {
    assert_eq!(run("if (1 == 1) then 2 else 3"), ["2"]);
    assert_eq!(run("if (1 == 2) then 2 else 3"), ["3"]);
    assert_eq!(run("0 if (1 == 2) then 5"), ["0"]);
}

#[test]
fn transitive_closure() {
    // Each step maps n to n-1 while n is positive; the closure yields every
    // distinct intermediate state once.
    assert_eq!(
        run("3 (dup 0 ?gt drop drop 1 sub)*"),
        ["3", "2", "1", "0"]
    );
    // Zero applications still yield the seed itself.
    assert_eq!(run("7 (1 == 2)*"), ["7"]);
}

#[test]
fn maybe_and_plus() {
    assert_eq!(run("1 (dup)?").len(), 2);
    assert_eq!(
        run("2 (dup 9 ?lt drop drop 1 add)+"),
        ["3", "4", "5", "6", "7", "8", "9"]
    );
}

#[test]
fn format_strings() {
    assert_eq!(run("\"x%( 1 2 add %)y\""), ["x3y"]);
    assert_eq!(run("\"%( 1, 2 %)!\""), ["1!", "2!"]);
    assert_eq!(run("5 \"v=%( dup %)\""), ["v=5"]);
}

#[test]
fn string_overloads() {
    assert_eq!(run("\"a\" \"b\" add"), ["ab"]);
    assert_eq!(run("\"abc\" length"), ["3"]);
    assert_eq!(run("\"abc\" elem"), ["a", "b", "c"]);
    assert_eq!(run("\"abc\" relem"), ["c", "b", "a"]);
    assert_eq!(run("\"\" ?empty").len(), 1);
    assert_eq!(run("\"x\" ?empty").len(), 0);
    assert_eq!(run("\"x\" !empty").len(), 1);
}

#[test]
fn find_and_match() {
    assert_eq!(run("\"abcd\" \"bc\" ?find").len(), 1);
    assert_eq!(run("\"abcd\" \"xy\" ?find").len(), 0);
    assert_eq!(run("[1,2,3] [2,3] ?find").len(), 1);
    assert_eq!(run("[1,2,3] [3,2] ?find").len(), 0);
    assert_eq!(run("\"hello\" \"h.*o\" ?match").len(), 1);
    assert_eq!(run("\"hello\" \"h.*x\" ?match").len(), 0);
    // The pattern must cover the entire string.
    assert_eq!(run("\"hello\" \"ell\" ?match").len(), 0);
}

#[test]
fn sequence_concatenation() {
    assert_eq!(run("[1] [2] add"), ["[1, 2]"]);
}

#[test]
fn comparisons() {
    assert_eq!(run("1 2 ?lt").len(), 1);
    assert_eq!(run("1 2 ?gt").len(), 0);
    assert_eq!(run("1 1 ?le").len(), 1);
    assert_eq!(run("1 1 !ne").len(), 1);
    assert_eq!(run("1 2 !ne").len(), 0);
    assert_eq!(run("\"a\" \"b\" ?lt").len(), 1);
}

#[test]
fn shuffles() {
    assert_eq!(run("1 2 swap"), ["1"]);
    assert_eq!(run("1 2 over"), ["1"]);
    assert_eq!(run("1 2 3 rot"), ["1"]);
    assert_eq!(run("1 2 drop"), ["1"]);
}

#[test]
fn display_domains() {
    assert_eq!(run("23 hex"), ["0x17"]);
    assert_eq!(run("0x17 value"), ["23"]);
    assert_eq!(run("23 oct"), ["027"]);
    assert_eq!(run("5 bin"), ["0b101"]);
    // Radix survives arithmetic when the left operand carries it.
    assert_eq!(run("0x10 hex 0x1 hex add"), ["0x11"]);
}

#[test]
fn type_and_bool_constants() {
    assert_eq!(run("1 type"), ["T_CONST"]);
    assert_eq!(run("\"s\" type"), ["T_STR"]);
    assert_eq!(run("true"), ["true"]);
    assert_eq!(run("1 type T_CONST ?eq").len(), 1);
}

#[test]
fn subx_any_predicates() {
    assert_eq!(run("[1,2] ?(elem)").len(), 1);
    assert_eq!(run("[] ?(elem)").len(), 0);
    assert_eq!(run("[] !(elem)").len(), 1);
}

#[test]
fn missing_overload_skips_the_stack() {
    assert_eq!(run("1 elem"), Vec::<String>::new());
    // Only the mismatched stack is dropped.
    assert_eq!(run("(1, [7]) elem"), ["7"]);
}

#[test]
fn predicate_type_failure_is_fatal_under_assert() {
    assert!(matches!(
        run_err("1 \"x\" ?eq"),
        EvalError::PredicateFailure(_)
    ));
}

#[test]
fn unknown_identifier_is_a_lowering_error() {
    let voc = core_vocabulary();
    let expr = Expr::parse("frobnicate", &voc).unwrap();
    match expr.query(Stack::new()) {
        Err(EvalError::UnknownIdentifier(name)) => assert_eq!(name, "frobnicate"),
        other => panic!("expected an unknown-identifier error, got {other:?}", other = other.err()),
    }
}

#[test]
fn drain_reset_replay() {
    // After a full drain, reset() followed by re-priming the origin must
    // replay the identical result sequence.
    let voc = core_vocabulary();
    let expr = Expr::parse("(1,2,3) (10 add, 20 add) [dup]", &voc).unwrap();

    let origin = origin_ref(Origin::with_stack(Stack::new()));
    let op: OpRef = expr.tree().build_exec(origin_as_op(&origin), None).unwrap();

    let drain = |op: &OpRef| {
        let mut out = Vec::new();
        while let Some(stk) = op.borrow_mut().next().unwrap() {
            out.push(format!("{stk:?}"));
        }
        out
    };

    let first = drain(&op);
    assert!(!first.is_empty());

    op.borrow_mut().reset();
    origin.borrow_mut().set_next(Stack::new());
    let second = drain(&op);

    assert_eq!(first, second);
}

#[test]
fn predicate_combinators() {
    use dwquery_lang::cst::{Constant, DEC_DOM};
    use dwquery_lang::pred::{Pred, PredAnd, PredConstant, PredNot, PredOr, PredResult};
    use dwquery_lang::value::dec_value;

    let is = |n: i128| Box::new(PredConstant::new(Constant::new(n, &DEC_DOM))) as Box<dyn Pred>;

    let mut stk = Stack::new();
    stk.push(dec_value(5, 0));

    let mut and = PredAnd::new(is(5), is(5));
    assert_eq!(and.result(&mut stk).unwrap(), PredResult::Yes);
    let mut and = PredAnd::new(is(5), is(6));
    assert_eq!(and.result(&mut stk).unwrap(), PredResult::No);
    // Short-circuits: a failed left arm never reaches the right one.
    let mut and = PredAnd::new(is(6), is(5));
    assert_eq!(and.result(&mut stk).unwrap(), PredResult::No);

    let mut or = PredOr::new(is(6), is(5));
    assert_eq!(or.result(&mut stk).unwrap(), PredResult::Yes);
    let mut or = PredOr::new(is(6), is(7));
    assert_eq!(or.result(&mut stk).unwrap(), PredResult::No);

    // Double negation is observationally equivalent to the predicate.
    for n in [5, 6] {
        let mut plain = is(n);
        let mut doubled = PredNot::new(Box::new(PredNot::new(is(n))));
        assert_eq!(
            plain.result(&mut stk).unwrap(),
            doubled.result(&mut stk).unwrap()
        );
    }
}

#[test]
fn literal_constant_predicate() {
    use dwquery_lang::cst::{Constant, DEC_DOM};
    use dwquery_lang::pred::{Pred, PredConstant, PredResult};
    use dwquery_lang::value::dec_value;

    let mut pred = PredConstant::new(Constant::new(5, &DEC_DOM));

    let mut stk = Stack::new();
    stk.push(dec_value(5, 0));
    assert_eq!(pred.result(&mut stk).unwrap(), PredResult::Yes);

    let mut stk = Stack::new();
    stk.push(dec_value(6, 0));
    assert_eq!(pred.result(&mut stk).unwrap(), PredResult::No);
}
