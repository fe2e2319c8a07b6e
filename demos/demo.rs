use pcre2_lab::config::Config;
use pcre2_lab::facade::{self, Pattern};

fn run(label: &str, input: &str) {
    println!("{label}");
    let parsed = Pattern::parse_delimited(input).unwrap();
    let config = Config::default();
    let ast = facade::parse(&parsed.body, &parsed.flags, &config).unwrap();

    println!("  Input:      '{input}'");
    println!("  Compiled:   '{}'", facade::compile(&ast));

    let validation = facade::validate(&ast, &parsed.flags, &config);
    println!("  Valid:      {}", validation.is_valid());

    let redos = facade::analyze(&ast, &parsed.flags, &config);
    println!("  ReDoS:      {:?} (score {})", redos.severity, redos.score);

    let literals = facade::literals(&ast, &parsed.flags);
    println!("  Prefixes:   {:?}\n", literals.prefixes);
}

fn main() {
    println!("=== pcre2_lab facade demo ===\n");

    run("Test 1: Anchored literal with a digit run", "/^user_\\d+$/");
    run("Test 2: Catastrophic nested quantifier", "/(a+)+$/");
    run("Test 3: Alternation", "/cat|dog|bird/");
    run("Test 4: Capturing group with quantifier", "/(ab)+/");
    run("Test 5: Named group", "/(?<word>\\w+)/");
    run("Test 6: Positive lookahead", "/test(?=123)/");
}
