//! Code generation: turns class declarations into `giwt::TestClass` builders.

use proc_macro2::TokenStream;
use quote::quote;

use crate::dsl::*;

// ============================================================================
// Public entry points
// ============================================================================

/// A `giwt::TestClass` expression.
pub fn generate_class(class: &ClassBlock) -> TokenStream {
    let name = class.name.to_string();
    let package = class.package.as_ref().map(|package| quote! { .package(#package) });
    let calls = class.items.iter().map(generate_item);

    quote! {
        ::giwt::TestClass::new(#name) #package #(#calls)*
    }
}

/// A `fn main()` that runs every class with the console runner.
pub fn generate_main(classes: &Classes) -> TokenStream {
    let classes = classes.classes.iter().map(generate_class);

    quote! {
        fn main() {
            ::giwt::run(::std::vec![#(#classes),*]);
        }
    }
}

// ============================================================================
// Item generation
// ============================================================================

fn generate_item(item: &ClassItem) -> TokenStream {
    match item {
        ClassItem::Skipped(reason) => {
            let reason = skip_reason(reason);
            quote! { .skipped(#reason) }
        }
        ClassItem::ConfigureWith(body) => quote! {
            .configure_with(move || { #body })
        },
        ClassItem::ExtendWith(body) => quote! {
            .extend_with({ #body })
        },
        ClassItem::Callback(callback) => generate_callback(callback),
        ClassItem::Source(source) => {
            let name = source.name.to_string();
            let body = &source.body;
            quote! {
                .parameter_source(#name, move || { #body })
            }
        }
        ClassItem::Test(test) => generate_test(test),
        ClassItem::Parameterized(parameterized) => generate_parameterized(parameterized),
    }
}

fn skip_reason(reason: &Option<syn::LitStr>) -> TokenStream {
    match reason {
        Some(reason) => quote! { ::core::option::Option::Some(#reason) },
        None => quote! { ::core::option::Option::None },
    }
}

fn skip_call(skip: &Option<Option<syn::LitStr>>) -> TokenStream {
    match skip {
        Some(reason) => {
            let reason = skip_reason(reason);
            quote! { .skipped(#reason) }
        }
        None => quote! {},
    }
}

fn generate_callback(callback: &CallbackBlock) -> TokenStream {
    let kind = match callback.kind {
        CallbackKind::BeforeAll => quote! { ::giwt::CallbackKind::BeforeAll },
        CallbackKind::AfterAll => quote! { ::giwt::CallbackKind::AfterAll },
        CallbackKind::BeforeEach => quote! { ::giwt::CallbackKind::BeforeEach },
        CallbackKind::AfterEach => quote! { ::giwt::CallbackKind::AfterEach },
    };
    let order = match &callback.order {
        Some(order) => quote! { #order },
        None => quote! { 0 },
    };
    let body = &callback.body;
    quote! {
        .callback(#kind, #order, move || { #body })
    }
}

/// The body of a unit closure. A body ending in a `Result` passes its error
/// on; a body ending in a statement succeeds.
fn unit_body(body: &TokenStream) -> TokenStream {
    quote! {
        ::giwt::IntoUnitResult::into_unit_result({ #body })
    }
}

fn generate_test(test: &TestBlock) -> TokenStream {
    let method = match (&test.method, &test.display) {
        (Some(method), _) => method.to_string(),
        (None, Some(display)) => method_from_display(&display.value()),
        (None, None) => "unnamed".to_string(),
    };
    let named = test.display.as_ref().map(|display| quote! { .named(#display) });
    let skip = skip_call(&test.skip);
    let case = &test.case.name;
    let case_ty = &test.case.ty;
    let body = unit_body(&test.body);

    quote! {
        .method(
            ::giwt::MethodDecl::test(
                #method,
                move |#case: &mut #case_ty| -> ::core::result::Result<(), ::giwt::GiwtError> {
                    #body
                },
            )
            #named
            #skip
        )
    }
}

fn generate_parameterized(block: &ParameterizedBlock) -> TokenStream {
    let method = block.method.to_string();
    let template = block
        .template
        .as_ref()
        .map(syn::LitStr::value)
        .unwrap_or_default();
    let source = &block.source;
    let skip = skip_call(&block.skip);
    let case = &block.case.name;
    let case_ty = &block.case.ty;
    let names = block.params.iter().map(|param| &param.name);
    let types = block.params.iter().map(|param| &param.ty);
    let body = unit_body(&block.body);

    quote! {
        .method(
            ::giwt::MethodDecl::parameterized(
                #method,
                #template,
                #source,
                move |#case: &mut #case_ty, (#(#names,)*): (#(#types,)*)|
                    -> ::core::result::Result<(), ::giwt::GiwtError> {
                    #body
                },
            )
            #skip
        )
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Lowercase words of `display` joined by underscores, so a test declared
/// only by its display name can still be selected by method.
fn method_from_display(display: &str) -> String {
    let words: Vec<String> = display
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    let mut method = words.join("_");
    if method.is_empty() {
        return "unnamed".to_string();
    }
    if method.starts_with(|c: char| c.is_ascii_digit()) {
        method.insert(0, '_');
    }
    // keywords such as `type` are not identifiers
    if syn::parse_str::<syn::Ident>(&method).is_err() {
        method.push('_');
    }
    method
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_become_method_identities() {
        assert_eq!(method_from_display("Pays the cart"), "pays_the_cart");
        assert_eq!(method_from_display("  refunds -1 cents! "), "refunds_1_cents");
        assert_eq!(method_from_display("1+1=2"), "_1_1_2");
        assert_eq!(method_from_display("type"), "type_");
        assert_eq!(method_from_display("--"), "unnamed");
    }

    #[test]
    fn body_tail_decides_the_unit_result() {
        let class: ClassBlock = syn::parse_quote! {
            class Checkout {
                test pays (tc: TestCase<(), ()>) { refuse() }
            }
        };
        let generated = generate_class(&class).to_string();
        assert!(
            generated.contains(":: giwt :: IntoUnitResult :: into_unit_result ({ refuse () })"),
            "{generated}"
        );
        assert!(!generated.contains("let _"), "{generated}");
    }

    #[test]
    fn display_only_test_gets_a_sanitized_method() {
        let class: ClassBlock = syn::parse_quote! {
            class Checkout in "shop" {
                test "pays the cart" (tc: TestCase<(), ()>) { }
            }
        };
        let generated = generate_class(&class).to_string();
        assert!(generated.contains("\"pays_the_cart\""), "{generated}");
        assert!(generated.contains(". named (\"pays the cart\")"), "{generated}");
        assert!(generated.contains(". package (\"shop\")"), "{generated}");
    }

    #[test]
    fn parameters_become_a_tuple_pattern() {
        let class: ClassBlock = syn::parse_quote! {
            class Sums {
                parameterized adds "{0}+1={1}" from sums (tc: TestCase<i32, i32>, a: i32, b: i32) { }
            }
        };
        let generated = generate_class(&class).to_string();
        assert!(generated.contains("(a , b ,)"), "{generated}");
        assert!(generated.contains("(i32 , i32 ,)"), "{generated}");
        assert!(generated.contains("\"sums\""), "{generated}");
    }
}
