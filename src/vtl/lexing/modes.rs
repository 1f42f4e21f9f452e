//! Logos token sets for the two lexing modes
//!
//! [TemplateToken] covers free text and everything that can start a construct inside it.
//! [CodeToken] covers the inside of directive arguments, formal references and method
//! arguments. Neither is seen outside the lexing module; the driver maps both to
//! [super::Token].
//!
//! Priorities follow logos' longest-match rule: `#elseif` beats `#else`, `#ifx` is a macro
//! invocation rather than `#if` followed by text, and `$!name` beats `$` followed by text.
use logos::{Lexer, Logos};

/// Tokens recognised in free template text.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum TemplateToken {
    // Comments are matched first and dropped by the driver
    #[regex(r"##[^\n]*\n?")]
    LineComment,
    #[token("#*", block_comment)]
    BlockComment,
    #[token("#[[", unparsed_block)]
    Unparsed(String),

    #[regex(
        r"(\\\\)*\\#(if|elseif|else|end|set|foreach|break|stop|macro|evaluate|parse|include)",
        escaped_directive
    )]
    #[regex(
        r"(\\\\)*\\#\{(if|elseif|else|end|set|foreach|break|stop|macro|evaluate|parse|include)\}",
        escaped_directive
    )]
    EscapedDirective(String),

    #[token("#if")]
    #[token("#{if}")]
    If,
    #[token("#elseif")]
    #[token("#{elseif}")]
    ElseIf,
    #[token("#else")]
    #[token("#{else}")]
    Else,
    #[token("#end")]
    #[token("#{end}")]
    End,
    #[token("#set")]
    #[token("#{set}")]
    Set,
    #[token("#foreach")]
    #[token("#{foreach}")]
    Foreach,
    #[token("#break")]
    #[token("#{break}")]
    Break,
    #[token("#stop")]
    #[token("#{stop}")]
    Stop,
    #[token("#macro")]
    #[token("#{macro}")]
    Macro,
    #[token("#evaluate")]
    #[token("#{evaluate}")]
    Evaluate,
    #[token("#parse")]
    #[token("#{parse}")]
    Parse,
    #[token("#include")]
    #[token("#{include}")]
    Include,
    #[regex(r"#[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    #[regex(r"#\{[a-zA-Z_][a-zA-Z0-9_]*\}", braced_name)]
    MacroCall(String),

    #[regex(r"\$![a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[2..].to_string())]
    QuietRef(String),
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Ref(String),
    #[token("$!{")]
    QuietFormalStart,
    #[token("${")]
    FormalStart,

    #[token("\n")]
    Newline,
    #[regex(r"[^#$\\\n]+", |lex| lex.slice().to_string())]
    Text(String),
    // A lone `#`, `$` or `\` that starts nothing is literal text
    #[token("#")]
    #[token("$")]
    #[token("\\")]
    Stray,
}

/// Tokens recognised inside directive arguments and formal references.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n]+")]
pub enum CodeToken {
    #[regex(r"\$![a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[2..].to_string())]
    QuietRef(String),
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Ref(String),
    #[token("$!{")]
    QuietFormalStart,
    #[token("${")]
    FormalStart,

    #[regex(r#""([^"\\]|\\(.|\n)|"")*""#, |lex| lex.slice().to_string())]
    #[regex(r#"'([^'\\]|\\(.|\n)|'')*'"#, |lex| lex.slice().to_string())]
    Str(String),
    #[regex(r"[0-9]+", number)]
    Number(String),

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("in")]
    In,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("&&")]
    #[token("and")]
    AndAnd,
    #[token("||")]
    #[token("or")]
    OrOr,
    #[token("!")]
    #[token("not")]
    Bang,
    #[token("==")]
    #[token("eq")]
    EqEq,
    #[token("!=")]
    #[token("ne")]
    NotEq,
    #[token("<")]
    #[token("lt")]
    Lt,
    #[token("<=")]
    #[token("le")]
    LtEq,
    #[token(">")]
    #[token("gt")]
    Gt,
    #[token(">=")]
    #[token("ge")]
    GtEq,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Assign,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

fn block_comment(lex: &mut Lexer<'_, TemplateToken>) -> bool {
    match lex.remainder().find("*#") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

fn unparsed_block(lex: &mut Lexer<'_, TemplateToken>) -> Option<String> {
    let end = lex.remainder().find("]]#")?;
    let body = lex.remainder()[..end].to_string();
    lex.bump(end + 3);
    Some(body)
}

/// `\#if` renders as `#if`; every further pair of backslashes in front renders as one.
fn escaped_directive(lex: &mut Lexer<'_, TemplateToken>) -> String {
    let slice = lex.slice();
    let slashes = slice.bytes().take_while(|b| *b == b'\\').count();
    let mut text = "\\".repeat(slashes / 2);
    text.push_str(&slice[slashes..]);
    text
}

fn braced_name(lex: &mut Lexer<'_, TemplateToken>) -> String {
    let slice = lex.slice();
    slice[2..slice.len() - 1].to_string()
}

/// Integer part is matched by the regex; a fraction is only taken when a digit follows the
/// dot, so `1..5` stays a range. An exponent (`1e3`, `2.5E-1`) needs at least one digit.
fn number(lex: &mut Lexer<'_, CodeToken>) -> String {
    let rest = lex.remainder().as_bytes();
    let mut len = 0;
    if rest.len() >= 2 && rest[0] == b'.' && rest[1].is_ascii_digit() {
        len = 1 + rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
    }
    if matches!(rest.get(len), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(rest.get(len + 1), Some(b'+' | b'-')));
        let digits = rest[len + 1 + sign..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits > 0 {
            len += 1 + sign + digits;
        }
    }
    lex.bump(len);
    lex.slice().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(source: &str) -> Vec<TemplateToken> {
        TemplateToken::lexer(source).filter_map(Result::ok).collect()
    }

    fn code(source: &str) -> Vec<CodeToken> {
        CodeToken::lexer(source).filter_map(Result::ok).collect()
    }

    #[test]
    fn test_directive_keywords_are_whole_words() {
        assert_eq!(template("#if"), vec![TemplateToken::If]);
        assert_eq!(template("#elseif"), vec![TemplateToken::ElseIf]);
        assert_eq!(
            template("#ifx"),
            vec![TemplateToken::MacroCall("ifx".to_string())]
        );
        assert_eq!(template("#{else}"), vec![TemplateToken::Else]);
    }

    #[test]
    fn test_quiet_reference_wins_over_plain() {
        assert_eq!(
            template("$!name"),
            vec![TemplateToken::QuietRef("name".to_string())]
        );
        assert_eq!(
            template("$name"),
            vec![TemplateToken::Ref("name".to_string())]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            template("## note\nx"),
            vec![TemplateToken::LineComment, TemplateToken::Text("x".to_string())]
        );
        assert_eq!(
            template("#* a\nb *#"),
            vec![TemplateToken::BlockComment]
        );
        assert!(TemplateToken::lexer("#* open").any(|t| t.is_err()));
    }

    #[test]
    fn test_escaped_directive() {
        assert_eq!(
            template(r"\#if"),
            vec![TemplateToken::EscapedDirective("#if".to_string())]
        );
        assert_eq!(
            template(r"\\\#end"),
            vec![TemplateToken::EscapedDirective(r"\#end".to_string())]
        );
    }

    #[test]
    fn test_unparsed_block() {
        assert_eq!(
            template("#[[$x #if]]#"),
            vec![TemplateToken::Unparsed("$x #if".to_string())]
        );
    }

    #[test]
    fn test_numbers_and_ranges() {
        assert_eq!(
            code("1..5"),
            vec![
                CodeToken::Number("1".to_string()),
                CodeToken::DotDot,
                CodeToken::Number("5".to_string()),
            ]
        );
        assert_eq!(code("2.50"), vec![CodeToken::Number("2.50".to_string())]);
    }

    #[test]
    fn test_number_exponents() {
        assert_eq!(code("1e3"), vec![CodeToken::Number("1e3".to_string())]);
        assert_eq!(code("2.5E-1"), vec![CodeToken::Number("2.5E-1".to_string())]);
        assert_eq!(code("4e+2"), vec![CodeToken::Number("4e+2".to_string())]);
        // without digits the `e` is an identifier of its own
        assert_eq!(
            code("1eq 1"),
            vec![
                CodeToken::Number("1".to_string()),
                CodeToken::EqEq,
                CodeToken::Number("1".to_string()),
            ]
        );
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(
            code("$a and not $b"),
            vec![
                CodeToken::Ref("a".to_string()),
                CodeToken::AndAnd,
                CodeToken::Bang,
                CodeToken::Ref("b".to_string()),
            ]
        );
        assert_eq!(code("android"), vec![CodeToken::Ident("android".to_string())]);
    }

    #[test]
    fn test_strings_keep_quotes() {
        assert_eq!(
            code(r#""a \"b\" $c""#),
            vec![CodeToken::Str(r#""a \"b\" $c""#.to_string())]
        );
        assert_eq!(code("'x'"), vec![CodeToken::Str("'x'".to_string())]);
        assert_eq!(
            code(r#""say ""hi""""#),
            vec![CodeToken::Str(r#""say ""hi""""#.to_string())]
        );
    }
}
