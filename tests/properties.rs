use proptest::prelude::*;
use seq_shorthand::{Error, Limits, Parser, parse_and_evaluate, parse_and_evaluate_with, validate};

/// Well-formed shorthand alongside the values it should expand to.
#[derive(Debug, Clone)]
struct Shorthand {
    text: String,
    values: Vec<f64>,
}

fn join(items: &[Shorthand]) -> Shorthand {
    let text: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
    Shorthand {
        text: text.join(", "),
        values: items.iter().flat_map(|item| item.values.iter().copied()).collect(),
    }
}

fn number() -> impl Strategy<Value = Shorthand> {
    (-100i32..100, prop::option::of(0u32..1000)).prop_map(|(whole, fraction)| {
        let text = match fraction {
            Some(fraction) => format!("{whole}.{fraction}"),
            None => whole.to_string(),
        };
        let value = text.parse().unwrap();
        Shorthand {
            text,
            values: vec![value],
        }
    })
}

fn repeated(item: Shorthand, count: Option<usize>) -> Shorthand {
    match count {
        Some(n) => Shorthand {
            text: format!("{}x{n}", item.text),
            values: item.values.repeat(n),
        },
        None => item,
    }
}

fn element() -> impl Strategy<Value = Shorthand> {
    let leaf = (number(), prop::option::of(0usize..4)).prop_map(|(n, count)| repeated(n, count));
    leaf.prop_recursive(4, 32, 4, |inner| {
        (prop::collection::vec(inner, 1..4), prop::option::of(0usize..4)).prop_map(
            |(items, count)| {
                let inner = join(&items);
                let group = Shorthand {
                    text: format!("({})", inner.text),
                    values: inner.values,
                };
                repeated(group, count)
            },
        )
    })
}

fn sequence() -> impl Strategy<Value = Shorthand> {
    prop::collection::vec(element(), 1..5).prop_map(|items| join(&items))
}

proptest! {
    #[test]
    fn expands_to_expected(s in sequence()) {
        prop_assert_eq!(parse_and_evaluate(&s.text).unwrap(), s.values);
        prop_assert!(validate(&s.text).is_ok());
    }

    #[test]
    fn deterministic(s in sequence()) {
        prop_assert_eq!(parse_and_evaluate(&s.text), parse_and_evaluate(&s.text));
    }

    #[test]
    fn zero_repetitions_vanish(a in element(), s in sequence(), b in element()) {
        let text = format!("{}, ({})x0, {}", a.text, s.text, b.text);
        let expected: Vec<f64> = a.values.iter().chain(&b.values).copied().collect();
        prop_assert_eq!(parse_and_evaluate(&text).unwrap(), expected);
    }

    #[test]
    fn single_repetition_is_identity(s in sequence()) {
        let grouped = parse_and_evaluate(&format!("({})x1", s.text)).unwrap();
        prop_assert_eq!(grouped, parse_and_evaluate(&s.text).unwrap());
    }

    #[test]
    fn nesting_multiplies(e in sequence(), a in 0usize..5, b in 0usize..5) {
        let nested = parse_and_evaluate(&format!("(({})x{a})x{b}", e.text)).unwrap();
        prop_assert_eq!(nested, e.values.repeat(a * b));
    }

    #[test]
    fn canonical_rendering_expands_the_same(s in sequence()) {
        let ast = Parser::new(&s.text).parse().unwrap();
        let rendered = ast.to_string();
        prop_assert_eq!(parse_and_evaluate(&rendered).unwrap(), s.values);
    }

    #[test]
    fn validate_agrees_with_syntax_errors(input in "[0-9.,x() -]{0,24}") {
        let limits = Limits { max_output_len: 1_000, ..Limits::default() };
        let syntax_error = matches!(
            parse_and_evaluate_with(&input, limits),
            Err(Error::Lex(_) | Error::Parse(_))
        );
        prop_assert_eq!(seq_shorthand::validate_with(&input, limits).is_ok(), !syntax_error);
    }
}
