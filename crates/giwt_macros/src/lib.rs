//! Proc macros for the `giwt` test engine.

mod codegen;
mod dsl;

/// Declares a test class and evaluates to a `giwt::TestClass`.
///
/// # Example
///
/// ```text
/// let class = giwt::test_class! {
///     class Calculator in "math" {
///         before_each { reset(); }
///
///         source sums { TestParameters::of([(1, 2), (2, 3)]) }
///
///         test adds "adds one and two" (tc: TestCase<i32, i32>) {
///             tc.given("one", || 1)?
///                 .when("adding 2", |v| v + 2)
///                 .then("is 3", |r| r.should_be(ExpectedToBe::equal_to(3)).verify());
///         }
///
///         parameterized adds_one "{0}+1={1}" from sums (tc: TestCase<i32, i32>, a: i32, b: i32) {
///             tc.given_value("a", a)?
///                 .when("adding 1", |v| v + 1)
///                 .then("is b", move |r| r.should_be(ExpectedToBe::equal_to(b)).verify());
///         }
///     }
/// };
/// ```
///
/// # Class items
///
/// - `test [ident] ["display name"] [skipped("reason")] (tc: TestCase<T, R>) { ... }`:
///   a test method; the body may use `?` on statement errors. Without an
///   identifier the method identity is derived from the display name.
/// - `parameterized ident ["template"] from source [skipped(...)] (tc: TestCase<T, R>, a: A, ...) { ... }`:
///   one run per tuple of `source`, named by the template (`{0}`, `{1}`, ...).
/// - `source name { expr }`: a parameter source returning `TestParameters`.
/// - `before_all` / `after_all` / `before_each` / `after_each` `[(order = N)] { ... }`
/// - `configure_with { expr }`: a `TestConfiguration` factory.
/// - `extend_with { expr }`: registers an `Extension`.
/// - `skipped` / `skipped("reason")`: skips every method without its own marker.
#[proc_macro]
pub fn test_class(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let class = syn::parse_macro_input!(input as dsl::ClassBlock);
    codegen::generate_class(&class).into()
}

/// Test runner macro: generates a `fn main()` running every declared class.
///
/// Use in a test target with `harness = false`.
///
/// # Setup
///
/// In `Cargo.toml`:
/// ```toml
/// [[test]]
/// name = "my_giwt_tests"
/// harness = false
/// ```
///
/// In your test file:
/// ```text
/// use giwt::prelude::*;
///
/// giwt::giwt_main! {
///     class Calculator {
///         test adds (tc: TestCase<i32, i32>) { ... }
///     }
///     class Parser in "text" {
///         test parses (tc: TestCase<String, usize>) { ... }
///     }
/// }
/// ```
///
/// Run with:
/// ```sh
/// cargo test --test my_giwt_tests -- [filter] [--list] [--report] [--report-dir <dir>] [--verbose]
/// ```
#[proc_macro]
pub fn giwt_main(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let classes = syn::parse_macro_input!(input as dsl::Classes);
    codegen::generate_main(&classes).into()
}
