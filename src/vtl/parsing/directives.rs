//! Template grammar: text, references and directives
//!
//! A template body is a sequence of segments. Block directives (`#if`, `#foreach`,
//! `#macro`) recurse into the same body parser and must be closed by `#end`; `#elseif`,
//! `#else` and `#end` are never segments themselves, which is what ends a body.

use super::cst::{
    BranchWithSpans, ExpressionWithSpans, ForeachWithSpans, IfWithSpans, MacroCallWithSpans,
    MacroWithSpans, PrimaryWithSpans, SegmentWithSpans, SetWithSpans, Span,
};
use super::expressions::{
    expression, formal_body, identifier, parenthesized, reference, suffix, token, ParserError,
};
use crate::vtl::lexing::Token;
use chumsky::prelude::*;

/// Parser for a complete template.
pub(crate) fn template<'a>() -> impl Parser<Token, Vec<SegmentWithSpans>, Error = ParserError> + 'a
{
    let expr = expression().boxed();

    recursive(move |body| {
        let body = body.boxed();

        let text = select! {
            Token::Text(text) => text,
            Token::Newline(text) => text,
            Token::EscapedDirective(text) => text,
        }
        .repeated()
        .at_least(1)
        .map_with_span(|pieces: Vec<String>, span| SegmentWithSpans::Text {
            text: pieces.concat(),
            span,
        });

        let unparsed = select! { Token::Unparsed(text) => text }
            .map_with_span(|text, span| SegmentWithSpans::Unparsed { text, span });

        let reference_segment = reference()
            .then(suffix(expr.clone()).repeated())
            .map_with_span(|(primary, suffixes), span: Span| {
                let quiet = matches!(primary, PrimaryWithSpans::Reference { quiet: true, .. });
                let expression = if suffixes.is_empty() {
                    ExpressionWithSpans::Primary(primary)
                } else {
                    ExpressionWithSpans::Postfix {
                        primary,
                        suffixes,
                        span: span.clone(),
                    }
                };
                SegmentWithSpans::Reference {
                    expression,
                    quiet,
                    span,
                }
            });

        let formal = select! {
            Token::FormalStart => false,
            Token::QuietFormalStart => true,
        }
        .then(formal_body(expr.clone()))
        .then_ignore(just(Token::RBrace))
        .map_with_span(|(quiet, expression), span| SegmentWithSpans::Formal {
            expression,
            quiet,
            span,
        })
        .labelled("formal reference");

        let end = token(Token::End).labelled("#end").boxed();

        let else_branch = token(Token::Else)
            .then(body.clone())
            .map(|(header, body)| BranchWithSpans {
                header,
                condition: None,
                body,
            })
            .boxed();

        let conditional = |keyword: Token| {
            just(keyword)
                .ignore_then(parenthesized(expr.clone()))
                .map_with_span(|condition, span: Span| (condition, span))
                .then(body.clone())
                .map(|((condition, header), body)| BranchWithSpans {
                    header,
                    condition: Some(condition),
                    body,
                })
        };

        let if_directive = conditional(Token::If)
            .then(conditional(Token::ElseIf).repeated())
            .then(else_branch.clone().or_not())
            .then(end.clone())
            .map_with_span(|(((first, rest), otherwise), end), span| {
                let mut branches = vec![first];
                branches.extend(rest);
                SegmentWithSpans::If(IfWithSpans {
                    branches,
                    otherwise,
                    end,
                    span,
                })
            })
            .labelled("if directive")
            .boxed();

        let variable = select! {
            Token::Ref(name) => name,
            Token::QuietRef(name) => name,
        }
        .labelled("variable");

        let set = just(Token::Set)
            .ignore_then(parenthesized(
                variable
                    .clone()
                    .then(just(Token::Dot).ignore_then(identifier()).repeated())
                    .then_ignore(just(Token::Assign))
                    .then(expr.clone()),
            ))
            .map_with_span(|((name, path), value), span| {
                SegmentWithSpans::Set(SetWithSpans {
                    name,
                    path,
                    value,
                    span,
                })
            })
            .labelled("set directive")
            .boxed();

        let foreach = just(Token::Foreach)
            .ignore_then(parenthesized(
                variable
                    .then_ignore(just(Token::In))
                    .then(expr.clone()),
            ))
            .map_with_span(|header, span: Span| (header, span))
            .then(body.clone())
            .then(else_branch.or_not())
            .then(end.clone())
            .map_with_span(
                |(((((variable, iterable), header), body), otherwise), end), span| {
                    SegmentWithSpans::Foreach(ForeachWithSpans {
                        header,
                        variable,
                        iterable,
                        body,
                        otherwise,
                        end,
                        span,
                    })
                },
            )
            .labelled("foreach directive")
            .boxed();

        let parameter = select! { Token::Ref(name) => name }
            .labelled("macro parameter")
            .then_ignore(just(Token::Comma).or_not());

        let macro_definition = just(Token::Macro)
            .ignore_then(parenthesized(
                identifier()
                    .labelled("macro name")
                    .then_ignore(just(Token::Comma).or_not())
                    .then(parameter.repeated()),
            ))
            .map_with_span(|header, span: Span| (header, span))
            .then(body.clone())
            .then(end)
            .map_with_span(|((((name, parameters), header), body), end), span| {
                SegmentWithSpans::Macro(MacroWithSpans {
                    header,
                    name,
                    parameters,
                    body,
                    end,
                    span,
                })
            })
            .labelled("macro definition")
            .boxed();

        let macro_call = select! { Token::MacroCall(name) => name }
            .then(
                parenthesized(
                    expr.clone()
                        .then_ignore(just(Token::Comma).or_not())
                        .repeated(),
                )
                .or_not(),
            )
            .map_with_span(|(name, arguments), span| {
                SegmentWithSpans::MacroCall(MacroCallWithSpans {
                    name,
                    arguments,
                    span,
                })
            })
            .labelled("macro invocation")
            .boxed();

        let evaluate = just(Token::Evaluate)
            .ignore_then(parenthesized(expr.clone()))
            .map_with_span(|argument, span| SegmentWithSpans::Evaluate { argument, span })
            .labelled("evaluate directive");

        let parse = just(Token::Parse)
            .ignore_then(parenthesized(expr.clone()))
            .map_with_span(|argument, span| SegmentWithSpans::Parse { argument, span })
            .labelled("parse directive");

        let include = just(Token::Include)
            .ignore_then(parenthesized(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .at_least(1),
            ))
            .map_with_span(|arguments, span| SegmentWithSpans::Include { arguments, span })
            .labelled("include directive");

        let break_directive = token(Token::Break).map(|span| SegmentWithSpans::Break { span });
        let stop_directive = token(Token::Stop).map(|span| SegmentWithSpans::Stop { span });

        choice((
            text,
            unparsed,
            reference_segment,
            formal,
            if_directive,
            set,
            foreach,
            macro_definition,
            macro_call,
            evaluate,
            parse,
            include,
            break_directive,
            stop_directive,
        ))
        .repeated()
    })
    .then_ignore(end())
}
