//! DSL AST types and `syn::parse::Parse` implementations.
//!
//! Parses test class declarations into a structured AST.

use proc_macro2::TokenStream;
use syn::parse::{Parse, ParseStream};
use syn::{braced, parenthesized, Expr, Ident, LitStr, Result, Token, Type};

// ============================================================================
// AST types
// ============================================================================

/// Every class of a `giwt_main!` invocation.
#[derive(Debug)]
pub struct Classes {
    pub classes: Vec<ClassBlock>,
}

/// `class Name [in "package"] { items... }`
#[derive(Debug)]
pub struct ClassBlock {
    pub name: Ident,
    pub package: Option<LitStr>,
    pub items: Vec<ClassItem>,
}

/// A single item of a class body.
#[derive(Debug)]
pub enum ClassItem {
    Skipped(Option<LitStr>),
    ConfigureWith(TokenStream),
    ExtendWith(TokenStream),
    Callback(CallbackBlock),
    Source(SourceBlock),
    Test(TestBlock),
    Parameterized(ParameterizedBlock),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    BeforeAll,
    AfterAll,
    BeforeEach,
    AfterEach,
}

/// `before_all [(order = N)] { ... }` and the three other callback kinds.
#[derive(Debug)]
pub struct CallbackBlock {
    pub kind: CallbackKind,
    pub order: Option<Expr>,
    pub body: TokenStream,
}

/// `source name { expr }`
#[derive(Debug)]
pub struct SourceBlock {
    pub name: Ident,
    pub body: TokenStream,
}

/// A `name: Type` argument.
#[derive(Debug)]
pub struct Arg {
    pub name: Ident,
    pub ty: Type,
}

/// `test [ident] ["display name"] [skipped(...)] (tc: TestCase<T, R>) { body }`
#[derive(Debug)]
pub struct TestBlock {
    pub method: Option<Ident>,
    pub display: Option<LitStr>,
    pub skip: Option<Option<LitStr>>,
    pub case: Arg,
    pub body: TokenStream,
}

/// `parameterized ident ["template"] from source [skipped(...)]
/// (tc: TestCase<T, R>, a: A, ...) { body }`
#[derive(Debug)]
pub struct ParameterizedBlock {
    pub method: Ident,
    pub template: Option<LitStr>,
    pub source: LitStr,
    pub skip: Option<Option<LitStr>>,
    pub case: Arg,
    pub params: Vec<Arg>,
    pub body: TokenStream,
}

// ============================================================================
// Parsing
// ============================================================================

impl Parse for Classes {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut classes = Vec::new();
        while !input.is_empty() {
            classes.push(input.parse::<ClassBlock>()?);
        }
        Ok(Classes { classes })
    }
}

impl Parse for ClassBlock {
    fn parse(input: ParseStream) -> Result<Self> {
        let keyword: Ident = input.parse()?;
        if keyword != "class" {
            return Err(syn::Error::new(
                keyword.span(),
                format!("expected `class`, found `{keyword}`"),
            ));
        }
        let name: Ident = input.parse()?;
        let package = if input.peek(Token![in]) {
            input.parse::<Token![in]>()?;
            Some(input.parse::<LitStr>()?)
        } else {
            None
        };

        let content;
        braced!(content in input);
        let mut items = Vec::new();
        while !content.is_empty() {
            items.push(content.parse::<ClassItem>()?);
        }
        Ok(ClassBlock {
            name,
            package,
            items,
        })
    }
}

impl Parse for ClassItem {
    fn parse(input: ParseStream) -> Result<Self> {
        let ident: Ident = input.parse()?;
        let name = ident.to_string();

        match name.as_str() {
            "skipped" => Ok(ClassItem::Skipped(parse_skip_reason(input)?)),
            "configure_with" => Ok(ClassItem::ConfigureWith(parse_body(input)?)),
            "extend_with" => Ok(ClassItem::ExtendWith(parse_body(input)?)),

            // Callbacks
            "before_all" => Ok(ClassItem::Callback(parse_callback(input, CallbackKind::BeforeAll)?)),
            "after_all" => Ok(ClassItem::Callback(parse_callback(input, CallbackKind::AfterAll)?)),
            "before_each" => Ok(ClassItem::Callback(parse_callback(input, CallbackKind::BeforeEach)?)),
            "after_each" => Ok(ClassItem::Callback(parse_callback(input, CallbackKind::AfterEach)?)),

            "source" => {
                let name: Ident = input.parse()?;
                let body = parse_body(input)?;
                Ok(ClassItem::Source(SourceBlock { name, body }))
            }
            "test" => Ok(ClassItem::Test(parse_test(input)?)),
            "parameterized" => Ok(ClassItem::Parameterized(parse_parameterized(input)?)),

            _ => Err(syn::Error::new(
                ident.span(),
                format!(
                    "unknown class item `{name}`. Expected one of: \
                     test, parameterized, source, before_all, after_all, before_each, \
                     after_each, configure_with, extend_with, skipped"
                ),
            )),
        }
    }
}

// ============================================================================
// Item parsers
// ============================================================================

/// Parse: `{ body }`
fn parse_body(input: ParseStream) -> Result<TokenStream> {
    let content;
    braced!(content in input);
    content.parse()
}

/// Parse the optional `("reason")` after `skipped`. A parenthesized list that
/// does not start with a string is the argument list that follows.
fn parse_skip_reason(input: ParseStream) -> Result<Option<LitStr>> {
    if !input.peek(syn::token::Paren) {
        return Ok(None);
    }
    let lookahead = input.fork();
    let peeked;
    parenthesized!(peeked in lookahead);
    if !peeked.is_empty() && !peeked.peek(LitStr) {
        return Ok(None);
    }

    let content;
    parenthesized!(content in input);
    if content.is_empty() {
        return Ok(None);
    }
    Ok(Some(content.parse::<LitStr>()?))
}

/// Parse: `[(order = N)] { body }`
fn parse_callback(input: ParseStream, kind: CallbackKind) -> Result<CallbackBlock> {
    let order = if input.peek(syn::token::Paren) {
        let content;
        parenthesized!(content in input);
        let key: Ident = content.parse()?;
        if key != "order" {
            return Err(syn::Error::new(
                key.span(),
                format!("unknown callback option `{key}`. Expected `order`"),
            ));
        }
        content.parse::<Token![=]>()?;
        Some(content.parse::<Expr>()?)
    } else {
        None
    };
    let body = parse_body(input)?;
    Ok(CallbackBlock { kind, order, body })
}

/// Parse `skipped(...)` decorators until the argument list.
fn parse_decorators(input: ParseStream) -> Result<Option<Option<LitStr>>> {
    let mut skip = None;
    while !input.peek(syn::token::Paren) {
        let decorator: Ident = input.parse()?;
        match decorator.to_string().as_str() {
            "skipped" => skip = Some(parse_skip_reason(input)?),
            other => {
                return Err(syn::Error::new(
                    decorator.span(),
                    format!("unknown decorator `{other}`. Expected `skipped`"),
                ));
            }
        }
    }
    Ok(skip)
}

/// Parse: `(name: Type, ...)`
fn parse_args(input: ParseStream) -> Result<Vec<Arg>> {
    let content;
    parenthesized!(content in input);
    let mut args = Vec::new();
    while !content.is_empty() {
        let name: Ident = content.parse()?;
        content.parse::<Token![:]>()?;
        let ty: Type = content.parse()?;
        args.push(Arg { name, ty });
        if !content.is_empty() {
            content.parse::<Token![,]>()?;
        }
    }
    Ok(args)
}

/// Parse: `[ident] ["display"] [skipped(...)] (tc: TestCase<T, R>) { body }`
fn parse_test(input: ParseStream) -> Result<TestBlock> {
    let span = input.span();
    let method = if input.peek(Ident) {
        Some(input.parse::<Ident>()?)
    } else {
        None
    };
    let display = if input.peek(LitStr) {
        Some(input.parse::<LitStr>()?)
    } else {
        None
    };
    if method.is_none() && display.is_none() {
        return Err(syn::Error::new(
            span,
            "a test needs a method identifier, a display name, or both",
        ));
    }
    let skip = parse_decorators(input)?;

    let mut args = parse_args(input)?.into_iter();
    let case = match (args.next(), args.next()) {
        (Some(case), None) => case,
        _ => {
            return Err(syn::Error::new(
                span,
                "a test takes exactly one argument: the test case",
            ))
        }
    };
    let body = parse_body(input)?;
    Ok(TestBlock {
        method,
        display,
        skip,
        case,
        body,
    })
}

/// Parse: `ident ["template"] from source [skipped(...)] (tc: TestCase<T, R>, a: A, ...) { body }`
fn parse_parameterized(input: ParseStream) -> Result<ParameterizedBlock> {
    let method: Ident = input.parse()?;
    let template = if input.peek(LitStr) {
        Some(input.parse::<LitStr>()?)
    } else {
        None
    };

    let from: Ident = input.parse()?;
    if from != "from" {
        return Err(syn::Error::new(
            from.span(),
            format!("expected `from <source>`, found `{from}`"),
        ));
    }
    let source = if input.peek(LitStr) {
        input.parse::<LitStr>()?
    } else {
        let ident: Ident = input.parse()?;
        LitStr::new(&ident.to_string(), ident.span())
    };
    let skip = parse_decorators(input)?;

    let mut args = parse_args(input)?;
    if args.len() < 2 {
        return Err(syn::Error::new(
            method.span(),
            "a parameterized test takes the test case and at least one parameter",
        ));
    }
    let params = args.split_off(1);
    let case = args.remove(0);
    let body = parse_body(input)?;
    Ok(ParameterizedBlock {
        method,
        template,
        source,
        skip,
        case,
        params,
        body,
    })
}
