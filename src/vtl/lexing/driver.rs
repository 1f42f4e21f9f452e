//! Mode-switching driver over the logos token sets
//!
//! The driver owns a template-mode logos lexer and morphs it into a code-mode lexer whenever
//! arguments, an index, or a formal reference body begin. Code mode ends once every bracket
//! it opened has been closed, at which point the lexer is morphed back.

use super::modes::{CodeToken, TemplateToken};
use super::{LexError, Spanned, Token};
use logos::{Lexer, Logos};

/// Tokenize a VTL template.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, LexError> {
    let mut tokens = Vec::new();
    let mut lexer = TemplateToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let token = result.map_err(|_| template_error(&lexer))?;
        match token {
            TemplateToken::LineComment | TemplateToken::BlockComment => {}
            TemplateToken::Text(text) => tokens.push((Token::Text(text), span)),
            TemplateToken::Stray => tokens.push((Token::Text(lexer.slice().to_string()), span)),
            TemplateToken::Newline => tokens.push((Token::Newline("\n".to_string()), span)),
            TemplateToken::Unparsed(body) => tokens.push((Token::Unparsed(body), span)),
            TemplateToken::EscapedDirective(text) => {
                tokens.push((Token::EscapedDirective(text), span))
            }
            TemplateToken::Else => tokens.push((Token::Else, span)),
            TemplateToken::End => tokens.push((Token::End, span)),
            TemplateToken::Break => tokens.push((Token::Break, span)),
            TemplateToken::Stop => tokens.push((Token::Stop, span)),
            TemplateToken::If => {
                tokens.push((Token::If, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::ElseIf => {
                tokens.push((Token::ElseIf, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::Set => {
                tokens.push((Token::Set, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::Foreach => {
                tokens.push((Token::Foreach, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::Macro => {
                tokens.push((Token::Macro, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::Evaluate => {
                tokens.push((Token::Evaluate, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::Parse => {
                tokens.push((Token::Parse, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::Include => {
                tokens.push((Token::Include, span));
                lexer = open_arguments(lexer, &mut tokens, true)?;
            }
            TemplateToken::MacroCall(name) => {
                tokens.push((Token::MacroCall(name), span));
                // `#tag (note)` in prose must stay text, so only an adjacent paren counts
                lexer = open_arguments(lexer, &mut tokens, false)?;
            }
            TemplateToken::Ref(name) => {
                tokens.push((Token::Ref(name), span));
                lexer = reference_tail(lexer, &mut tokens)?;
            }
            TemplateToken::QuietRef(name) => {
                tokens.push((Token::QuietRef(name), span));
                lexer = reference_tail(lexer, &mut tokens)?;
            }
            TemplateToken::FormalStart => {
                tokens.push((Token::FormalStart, span));
                lexer = lex_code(lexer.morph(), &mut tokens, true)?.morph();
            }
            TemplateToken::QuietFormalStart => {
                tokens.push((Token::QuietFormalStart, span));
                lexer = lex_code(lexer.morph(), &mut tokens, true)?.morph();
            }
        }
    }

    Ok(tokens)
}

/// Tokenize a whole source as a single expression (code mode from start to end).
pub fn tokenize_expression(source: &str) -> Result<Vec<Spanned>, LexError> {
    let mut tokens = Vec::new();
    lex_code(CodeToken::lexer(source), &mut tokens, false)?;
    Ok(tokens)
}

/// After a directive keyword: `(`, optionally preceded by blanks, switches to code mode.
fn open_arguments<'s>(
    mut lexer: Lexer<'s, TemplateToken>,
    tokens: &mut Vec<Spanned>,
    allow_blanks: bool,
) -> Result<Lexer<'s, TemplateToken>, LexError> {
    let rest = lexer.remainder();
    let blanks = if allow_blanks {
        rest.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
    } else {
        0
    };
    if !rest[blanks..].starts_with('(') {
        return Ok(lexer);
    }

    let at = lexer.span().end + blanks;
    lexer.bump(blanks + 1);
    tokens.push((Token::LParen, at..at + 1));
    Ok(lex_code(lexer.morph(), tokens, true)?.morph())
}

/// Lex the adjacent `.name`, `.name(...)` and `[...]` suffixes of a template reference.
fn reference_tail<'s>(
    mut lexer: Lexer<'s, TemplateToken>,
    tokens: &mut Vec<Spanned>,
) -> Result<Lexer<'s, TemplateToken>, LexError> {
    loop {
        let rest = lexer.remainder();
        let at = lexer.span().end;

        if let Some(len) = property_name_len(rest) {
            tokens.push((Token::Dot, at..at + 1));
            tokens.push((
                Token::Ident(rest[1..1 + len].to_string()),
                at + 1..at + 1 + len,
            ));
            lexer.bump(1 + len);
            if lexer.remainder().starts_with('(') {
                let paren = lexer.span().end;
                lexer.bump(1);
                tokens.push((Token::LParen, paren..paren + 1));
                lexer = lex_code(lexer.morph(), tokens, true)?.morph();
            }
        } else if rest.starts_with('[') {
            lexer.bump(1);
            tokens.push((Token::LBracket, at..at + 1));
            lexer = lex_code(lexer.morph(), tokens, true)?.morph();
        } else {
            return Ok(lexer);
        }
    }
}

/// Length of the identifier in `.ident...`, if `rest` starts with one.
fn property_name_len(rest: &str) -> Option<usize> {
    let name = rest.strip_prefix('.')?;
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return None,
    }
    Some(1 + bytes.take_while(|b| b.is_ascii_alphanumeric() || *b == b'_').count())
}

/// Lex code tokens. When `enclosed`, one bracket is already open and lexing returns right
/// after it closes; otherwise it runs to the end of input.
fn lex_code<'s>(
    mut lexer: Lexer<'s, CodeToken>,
    tokens: &mut Vec<Spanned>,
    enclosed: bool,
) -> Result<Lexer<'s, CodeToken>, LexError> {
    let mut depth: usize = usize::from(enclosed);

    loop {
        // `#` never appears in code; an unclosed bracket gives back to template mode so the
        // parser can report it against the next directive
        if enclosed && lexer.remainder().trim_start().starts_with('#') {
            break;
        }
        let Some(result) = lexer.next() else {
            break;
        };
        let span = lexer.span();
        let token = match result {
            Ok(token) => token,
            Err(()) => return Err(code_error(&lexer)),
        };

        let closes = matches!(
            token,
            CodeToken::RParen | CodeToken::RBracket | CodeToken::RBrace
        );
        let opens = matches!(
            token,
            CodeToken::LParen
                | CodeToken::LBracket
                | CodeToken::LBrace
                | CodeToken::FormalStart
                | CodeToken::QuietFormalStart
        );

        tokens.push((code_token(token), span));

        if opens {
            depth += 1;
        } else if closes && depth > 0 {
            depth -= 1;
            if depth == 0 && enclosed {
                break;
            }
        }
    }

    Ok(lexer)
}

fn code_token(token: CodeToken) -> Token {
    match token {
        CodeToken::QuietRef(name) => Token::QuietRef(name),
        CodeToken::Ref(name) => Token::Ref(name),
        CodeToken::QuietFormalStart => Token::QuietFormalStart,
        CodeToken::FormalStart => Token::FormalStart,
        CodeToken::Str(raw) => Token::Str(raw),
        CodeToken::Number(raw) => Token::Number(raw),
        CodeToken::True => Token::True,
        CodeToken::False => Token::False,
        CodeToken::Null => Token::Null,
        CodeToken::In => Token::In,
        CodeToken::Ident(name) => Token::Ident(name),
        CodeToken::AndAnd => Token::AndAnd,
        CodeToken::OrOr => Token::OrOr,
        CodeToken::Bang => Token::Bang,
        CodeToken::EqEq => Token::EqEq,
        CodeToken::NotEq => Token::NotEq,
        CodeToken::Lt => Token::Lt,
        CodeToken::LtEq => Token::LtEq,
        CodeToken::Gt => Token::Gt,
        CodeToken::GtEq => Token::GtEq,
        CodeToken::Plus => Token::Plus,
        CodeToken::Minus => Token::Minus,
        CodeToken::Star => Token::Star,
        CodeToken::Slash => Token::Slash,
        CodeToken::Percent => Token::Percent,
        CodeToken::Assign => Token::Assign,
        CodeToken::Question => Token::Question,
        CodeToken::Colon => Token::Colon,
        CodeToken::DotDot => Token::DotDot,
        CodeToken::Dot => Token::Dot,
        CodeToken::Comma => Token::Comma,
        CodeToken::LParen => Token::LParen,
        CodeToken::RParen => Token::RParen,
        CodeToken::LBracket => Token::LBracket,
        CodeToken::RBracket => Token::RBracket,
        CodeToken::LBrace => Token::LBrace,
        CodeToken::RBrace => Token::RBrace,
    }
}

fn template_error(lexer: &Lexer<'_, TemplateToken>) -> LexError {
    let offset = lexer.span().start;
    let slice = lexer.slice();
    if slice.starts_with("#*") {
        LexError::UnterminatedComment { offset }
    } else if slice.starts_with("#[[") {
        LexError::UnterminatedUnparsed { offset }
    } else {
        unexpected(slice, offset)
    }
}

fn code_error(lexer: &Lexer<'_, CodeToken>) -> LexError {
    let offset = lexer.span().start;
    let slice = lexer.slice();
    if slice.starts_with('"') || slice.starts_with('\'') {
        LexError::UnterminatedString { offset }
    } else {
        unexpected(slice, offset)
    }
}

fn unexpected(slice: &str, offset: usize) -> LexError {
    LexError::UnexpectedCharacter {
        character: slice.chars().next().unwrap_or('\0'),
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("lexing should succeed")
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_plain_text_is_one_token() {
        assert_eq!(kinds("Hello, world!"), vec![Token::Text("Hello, world!".into())]);
    }

    #[test]
    fn test_directive_arguments_switch_to_code() {
        assert_eq!(
            kinds("#if ($a == 1)yes#end"),
            vec![
                Token::If,
                Token::LParen,
                Token::Ref("a".into()),
                Token::EqEq,
                Token::Number("1".into()),
                Token::RParen,
                Token::Text("yes".into()),
                Token::End,
            ]
        );
    }

    #[test]
    fn test_nested_parens_stay_in_code_mode() {
        assert_eq!(
            kinds("#set($x = ($a + 1) * 2) after"),
            vec![
                Token::Set,
                Token::LParen,
                Token::Ref("x".into()),
                Token::Assign,
                Token::LParen,
                Token::Ref("a".into()),
                Token::Plus,
                Token::Number("1".into()),
                Token::RParen,
                Token::Star,
                Token::Number("2".into()),
                Token::RParen,
                Token::Text(" after".into()),
            ]
        );
    }

    #[test]
    fn test_reference_tail() {
        assert_eq!(
            kinds("$user.name.substring(0, 2)[1]."),
            vec![
                Token::Ref("user".into()),
                Token::Dot,
                Token::Ident("name".into()),
                Token::Dot,
                Token::Ident("substring".into()),
                Token::LParen,
                Token::Number("0".into()),
                Token::Comma,
                Token::Number("2".into()),
                Token::RParen,
                Token::LBracket,
                Token::Number("1".into()),
                Token::RBracket,
                Token::Text(".".into()),
            ]
        );
    }

    #[test]
    fn test_reference_followed_by_text() {
        assert_eq!(
            kinds("$a+$b"),
            vec![
                Token::Ref("a".into()),
                Token::Text("+".into()),
                Token::Ref("b".into()),
            ]
        );
    }

    #[test]
    fn test_formal_reference() {
        assert_eq!(
            kinds("${a}b"),
            vec![
                Token::FormalStart,
                Token::Ident("a".into()),
                Token::RBrace,
                Token::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_macro_call_needs_adjacent_paren() {
        assert_eq!(
            kinds("#tag (x)"),
            vec![Token::MacroCall("tag".into()), Token::Text(" (x)".into())]
        );
    }

    #[test]
    fn test_spans_cover_source() {
        let tokens = tokenize("a $b\n").unwrap();
        let spans: Vec<_> = tokens.iter().map(|(_, span)| span.clone()).collect();
        assert_eq!(spans, vec![0..2, 2..4, 4..5]);
    }

    #[test]
    fn test_lexical_errors() {
        assert_eq!(
            tokenize("#set($a = \"open)"),
            Err(LexError::UnterminatedString { offset: 10 })
        );
        assert_eq!(
            tokenize("text #* never closed"),
            Err(LexError::UnterminatedComment { offset: 5 })
        );
        assert!(matches!(
            tokenize("#if($a @ $b)"),
            Err(LexError::UnexpectedCharacter { character: '@', .. })
        ));
    }

    #[test]
    fn test_unclosed_paren_returns_to_template_mode() {
        assert_eq!(
            kinds("#if(($a)yes#end"),
            vec![
                Token::If,
                Token::LParen,
                Token::LParen,
                Token::Ref("a".into()),
                Token::RParen,
                Token::Ident("yes".into()),
                Token::End,
            ]
        );
    }

    #[test]
    fn test_expression_mode() {
        assert_eq!(
            tokenize_expression("$a / $b").unwrap().len(),
            3
        );
    }
}
