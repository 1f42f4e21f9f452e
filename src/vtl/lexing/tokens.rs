//! Token definitions shared by the lexer driver and the parser
//!
//! The logos-derived enums in [super::modes] are private to lexing; the driver folds both of
//! them into this single [Token] type, which is what the chumsky grammar consumes. Tokens are
//! `Eq + Hash` so they can serve as chumsky input, which is why numbers keep their source text.

use std::fmt;

/// All tokens seen by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    // Template text
    Text(String),
    Newline(String),
    /// Body of a `#[[ ... ]]#` block, emitted verbatim
    Unparsed(String),
    /// An escaped directive such as `\#if`, already reduced to the text it renders as
    EscapedDirective(String),

    // Directives
    If,
    ElseIf,
    Else,
    End,
    Set,
    Foreach,
    Break,
    Stop,
    Macro,
    Evaluate,
    Parse,
    Include,
    /// `#name` or `#{name}` where `name` is not a directive keyword
    MacroCall(String),

    // References
    Ref(String),
    QuietRef(String),
    FormalStart,
    QuietFormalStart,

    // Code
    Ident(String),
    /// String literal including its quotes
    Str(String),
    Number(String),
    True,
    False,
    Null,
    In,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Bang,
    Assign,
    Question,
    Colon,
    DotDot,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl Token {
    /// Check if this token is literal template text (including newlines)
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Token::Text(_) | Token::Newline(_) | Token::EscapedDirective(_)
        )
    }

    /// Check if this token opens or continues a directive
    pub fn is_directive(&self) -> bool {
        matches!(
            self,
            Token::If
                | Token::ElseIf
                | Token::Else
                | Token::End
                | Token::Set
                | Token::Foreach
                | Token::Break
                | Token::Stop
                | Token::Macro
                | Token::Evaluate
                | Token::Parse
                | Token::Include
                | Token::MacroCall(_)
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => write!(f, "text {:?}", text),
            Token::Newline(_) => write!(f, "newline"),
            Token::Unparsed(_) => write!(f, "#[[...]]#"),
            Token::EscapedDirective(text) => write!(f, "\\{}", text),
            Token::If => write!(f, "#if"),
            Token::ElseIf => write!(f, "#elseif"),
            Token::Else => write!(f, "#else"),
            Token::End => write!(f, "#end"),
            Token::Set => write!(f, "#set"),
            Token::Foreach => write!(f, "#foreach"),
            Token::Break => write!(f, "#break"),
            Token::Stop => write!(f, "#stop"),
            Token::Macro => write!(f, "#macro"),
            Token::Evaluate => write!(f, "#evaluate"),
            Token::Parse => write!(f, "#parse"),
            Token::Include => write!(f, "#include"),
            Token::MacroCall(name) => write!(f, "#{}", name),
            Token::Ref(name) => write!(f, "${}", name),
            Token::QuietRef(name) => write!(f, "$!{}", name),
            Token::FormalStart => write!(f, "${{"),
            Token::QuietFormalStart => write!(f, "$!{{"),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Str(raw) => write!(f, "{}", raw),
            Token::Number(raw) => write!(f, "{}", raw),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::In => write!(f, "in"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::LtEq => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::GtEq => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::Assign => write!(f, "="),
            Token::Question => write!(f, "?"),
            Token::Colon => write!(f, ":"),
            Token::DotDot => write!(f, ".."),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
        }
    }
}
