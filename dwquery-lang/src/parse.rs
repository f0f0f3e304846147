//! The query parser.
//!
//! A `nom` tokenizer feeds a small recursive-descent parser that produces
//! the tree of §`tree`. The parser owns the lexical scope chain, so `let`
//! bindings and block formals resolve to scopes while the tree is built;
//! name-to-slot resolution itself happens later, at lowering time.

use std::rc::Rc;

use thiserror::Error;

use crate::builtin::Vocabulary;
use crate::cst::{Constant, DEC_DOM};
use crate::tree::{Scope, Tree, TreeKind};

/// A query that could not be parsed.
#[derive(Debug, Error)]
#[error("parse error: {msg}")]
pub struct ParseError {
    msg: String,
}

impl ParseError {
    fn new(msg: impl Into<String>) -> Self {
        ParseError { msg: msg.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(Constant),
    Str(Vec<StrPart>),
    Word(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Star,
    Plus,
    Maybe,
    /// `?(` (true) or `!(` (false).
    SubxOpen(bool),
    Bar,
    OrOr,
    Assign,
    CmpEq,
    CmpNe,
    CmpLt,
    CmpGt,
    CmpLe,
    CmpGe,
    KwLet,
    KwIf,
    KwThen,
    KwElse,
}

#[derive(Debug, Clone, PartialEq)]
enum StrPart {
    Lit(String),
    /// An embedded `%( … %)` sub-expression, pre-lexed.
    Expr(Vec<Tok>),
}

impl std::fmt::Display for Tok {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Int(c) => write!(f, "{c}"),
            Tok::Str(_) => write!(f, "string"),
            Tok::Word(w) => write!(f, "`{w}'"),
            Tok::LParen => write!(f, "`('"),
            Tok::RParen => write!(f, "`)'"),
            Tok::LBracket => write!(f, "`['"),
            Tok::RBracket => write!(f, "`]'"),
            Tok::LBrace => write!(f, "`{{'"),
            Tok::RBrace => write!(f, "`}}'"),
            Tok::Comma => write!(f, "`,'"),
            Tok::Semi => write!(f, "`;'"),
            Tok::Star => write!(f, "`*'"),
            Tok::Plus => write!(f, "`+'"),
            Tok::Maybe => write!(f, "`?'"),
            Tok::SubxOpen(true) => write!(f, "`?('"),
            Tok::SubxOpen(false) => write!(f, "`!('"),
            Tok::Bar => write!(f, "`|'"),
            Tok::OrOr => write!(f, "`||'"),
            Tok::Assign => write!(f, "`:='"),
            Tok::CmpEq => write!(f, "`=='"),
            Tok::CmpNe => write!(f, "`!='"),
            Tok::CmpLt => write!(f, "`<'"),
            Tok::CmpGt => write!(f, "`>'"),
            Tok::CmpLe => write!(f, "`<='"),
            Tok::CmpGe => write!(f, "`>='"),
            Tok::KwLet => write!(f, "`let'"),
            Tok::KwIf => write!(f, "`if'"),
            Tok::KwThen => write!(f, "`then'"),
            Tok::KwElse => write!(f, "`else'"),
        }
    }
}

/// The tokenizer. This is brought to you by [`nom`].
mod lexer {
    use nom::branch::alt;
    use nom::bytes::complete::{tag, take_while};
    use nom::character::complete::{
        char, digit1, hex_digit1, multispace1, oct_digit1, one_of, satisfy,
    };
    use nom::combinator::{map, map_res, opt, recognize};
    use nom::error::{ErrorKind, ParseError as NomParseError};
    use nom::multi::many0;
    use nom::sequence::{pair, preceded, terminated, tuple};
    use nom::IResult;
    use nom_supreme::error::ErrorTree;
    use nom_supreme::final_parser::{final_parser, Location};

    use super::{StrPart, Tok};
    use crate::cst::{Constant, DEC_DOM, HEX_DOM, OCT_DOM};

    type LexResult<'a, T> = IResult<&'a str, T, ErrorTree<&'a str>>;

    fn space(input: &str) -> LexResult<'_, ()> {
        map(
            many0(alt((
                map(multispace1, |_| ()),
                map(pair(char('#'), take_while(|c| c != '\n')), |_| ()),
            ))),
            |_| (),
        )(input)
    }

    fn integer(input: &str) -> LexResult<'_, Tok> {
        alt((
            map_res(preceded(tag("0x"), hex_digit1), |s: &str| {
                i128::from_str_radix(s, 16).map(|v| Tok::Int(Constant::new(v, &HEX_DOM)))
            }),
            map_res(recognize(pair(char('0'), oct_digit1)), |s: &str| {
                i128::from_str_radix(&s[1..], 8).map(|v| Tok::Int(Constant::new(v, &OCT_DOM)))
            }),
            map_res(digit1, |s: &str| {
                s.parse::<i128>()
                    .map(|v| Tok::Int(Constant::new(v, &DEC_DOM)))
            }),
        ))(input)
    }

    fn is_word_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_word_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    fn word(input: &str) -> LexResult<'_, Tok> {
        let (rest, w) = recognize(tuple((
            opt(one_of("?!@")),
            satisfy(is_word_start),
            take_while(is_word_char),
        )))(input)?;

        Ok((
            rest,
            match w {
                "let" => Tok::KwLet,
                "if" => Tok::KwIf,
                "then" => Tok::KwThen,
                "else" => Tok::KwElse,
                _ => Tok::Word(w.to_string()),
            },
        ))
    }

    fn fail<T>(input: &str) -> LexResult<'_, T> {
        Err(nom::Err::Failure(ErrorTree::from_error_kind(
            input,
            ErrorKind::Verify,
        )))
    }

    fn unescape(c: char) -> char {
        match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        }
    }

    /// A double-quoted string. `%( … %)` splits it into parts whose
    /// sub-expressions are lexed in place, nesting and all.
    fn string(input: &str) -> LexResult<'_, Tok> {
        let (mut rest, _) = char('"')(input)?;

        let mut parts: Vec<StrPart> = Vec::new();
        let mut lit = String::new();

        loop {
            let mut chars = rest.chars();
            match chars.next() {
                None => return fail(rest),
                Some('"') => {
                    rest = &rest[1..];
                    break;
                }
                Some('\\') => match chars.next() {
                    Some(c) => {
                        lit.push(unescape(c));
                        rest = &rest[1 + c.len_utf8()..];
                    }
                    None => return fail(rest),
                },
                Some('%') if rest[1..].starts_with('(') => {
                    if !lit.is_empty() {
                        parts.push(StrPart::Lit(std::mem::take(&mut lit)));
                    }
                    rest = &rest[2..];

                    let mut toks = Vec::new();
                    loop {
                        let (r, _) = space(rest)?;
                        if let Ok((r, _)) = tag::<_, _, ErrorTree<&str>>("%)")(r) {
                            rest = r;
                            break;
                        }
                        let (r, tok) = token(r)?;
                        toks.push(tok);
                        rest = r;
                    }
                    parts.push(StrPart::Expr(toks));
                }
                Some(c) => {
                    lit.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }

        if !lit.is_empty() || parts.is_empty() {
            parts.push(StrPart::Lit(lit));
        }

        Ok((rest, Tok::Str(parts)))
    }

    fn punct(input: &str) -> LexResult<'_, Tok> {
        alt((
            alt((
                map(tag("?("), |_| Tok::SubxOpen(true)),
                map(tag("!("), |_| Tok::SubxOpen(false)),
                map(tag("||"), |_| Tok::OrOr),
                map(tag(":="), |_| Tok::Assign),
                map(tag("=="), |_| Tok::CmpEq),
                map(tag("!="), |_| Tok::CmpNe),
                map(tag("<="), |_| Tok::CmpLe),
                map(tag(">="), |_| Tok::CmpGe),
                map(char('<'), |_| Tok::CmpLt),
                map(char('>'), |_| Tok::CmpGt),
            )),
            alt((
                map(char('('), |_| Tok::LParen),
                map(char(')'), |_| Tok::RParen),
                map(char('['), |_| Tok::LBracket),
                map(char(']'), |_| Tok::RBracket),
                map(char('{'), |_| Tok::LBrace),
                map(char('}'), |_| Tok::RBrace),
                map(char(','), |_| Tok::Comma),
                map(char(';'), |_| Tok::Semi),
                map(char('*'), |_| Tok::Star),
                map(char('+'), |_| Tok::Plus),
                map(char('?'), |_| Tok::Maybe),
                map(char('|'), |_| Tok::Bar),
            )),
        ))(input)
    }

    fn token(input: &str) -> LexResult<'_, Tok> {
        alt((string, integer, word, punct))(input)
    }

    fn tokens(input: &str) -> LexResult<'_, Vec<Tok>> {
        terminated(many0(preceded(space, token)), space)(input)
    }

    pub(super) fn tokens_final(input: &str) -> Result<Vec<Tok>, ErrorTree<Location>> {
        final_parser(tokens)(input)
    }
}

struct Parser<'a> {
    toks: &'a [Tok],
    pos: usize,
    voc: &'a Vocabulary,
    scope: Option<Rc<Scope>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn next_tok(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), ParseError> {
        match self.next_tok() {
            Some(ref t) if t == tok => Ok(()),
            Some(t) => Err(ParseError::new(format!("expected {tok}, found {t}"))),
            None => Err(ParseError::new(format!(
                "expected {tok}, found end of query"
            ))),
        }
    }

    fn in_scope(&self, name: &str) -> bool {
        let mut scope = self.scope.clone();
        while let Some(s) = scope {
            if s.has_name(name) {
                return true;
            }
            scope = s.parent();
        }
        false
    }

    /// Resolves a word: variables in scope shadow vocabulary words; a name
    /// known to neither stays a READ so lowering reports it.
    fn word_tree(&self, name: &str) -> Tree {
        if name == "debug" {
            Tree::new(TreeKind::Debug)
        } else if self.in_scope(name) {
            Tree::with_str(TreeKind::Read, name)
        } else if let Some(builtin) = self.voc.find(name) {
            Tree::with_builtin(TreeKind::Builtin, builtin)
        } else {
            Tree::with_str(TreeKind::Read, name)
        }
    }

    fn starts_atom(tok: &Tok) -> bool {
        matches!(
            tok,
            Tok::Int(_)
                | Tok::Str(_)
                | Tok::Word(_)
                | Tok::LParen
                | Tok::LBracket
                | Tok::LBrace
                | Tok::SubxOpen(_)
                | Tok::KwIf
        )
    }

    /// `|a b|` formal lists, as found at the head of groups and blocks.
    fn parse_formals(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        if !self.eat(&Tok::Bar) {
            return Ok(None);
        }

        let mut names = Vec::new();
        loop {
            match self.next_tok() {
                Some(Tok::Word(name)) => names.push(name),
                Some(Tok::Bar) => break,
                Some(t) => {
                    return Err(ParseError::new(format!(
                        "expected a formal name or `|', found {t}"
                    )))
                }
                None => {
                    return Err(ParseError::new(
                        "expected a formal name or `|', found end of query",
                    ))
                }
            }
        }

        if names.is_empty() {
            return Err(ParseError::new("empty formal list"));
        }
        Ok(Some(names))
    }

    /// Runs `body` under a fresh scope holding `names`, and wraps its
    /// result in SCOPE[CAT[binds…, body]]. The last name binds the top of
    /// the stack.
    fn scoped(
        &mut self,
        names: &[String],
        body: impl FnOnce(&mut Self) -> Result<Tree, ParseError>,
    ) -> Result<Tree, ParseError> {
        let scope = Scope::new(self.scope.clone());
        for name in names {
            if scope.has_name(name) {
                return Err(ParseError::new(format!("duplicate variable `{name}'")));
            }
            scope.add_name(name);
        }

        let saved = std::mem::replace(&mut self.scope, Some(Rc::clone(&scope)));
        let body = body(self);
        self.scope = saved;
        let body = body?;

        let mut cat = Tree::new(TreeKind::Cat);
        for name in names.iter().rev() {
            cat.push_child(Tree::with_str(TreeKind::Bind, name));
        }
        cat.push_child(body);

        let mut tree = Tree::with_scope(TreeKind::Scope, scope);
        tree.push_child(cat);
        Ok(tree)
    }

    /// First-match choice: `a || b`. Binds looser than alternation.
    fn parse_expr(&mut self) -> Result<Tree, ParseError> {
        let mut branches = vec![self.parse_alt()?];
        while self.eat(&Tok::OrOr) {
            branches.push(self.parse_alt()?);
        }

        if branches.len() == 1 {
            Ok(branches.pop().unwrap())
        } else {
            let mut or = Tree::new(TreeKind::Or);
            for branch in branches {
                or.push_child(branch);
            }
            Ok(or)
        }
    }

    /// Alternation: `a, b, c`.
    fn parse_alt(&mut self) -> Result<Tree, ParseError> {
        let mut branches = vec![self.parse_cmp()?];
        while self.eat(&Tok::Comma) {
            branches.push(self.parse_cmp()?);
        }

        if branches.len() == 1 {
            Ok(branches.pop().unwrap())
        } else {
            let mut alt = Tree::new(TreeKind::Alt);
            for branch in branches {
                alt.push_child(branch);
            }
            Ok(alt)
        }
    }

    /// Infix comparisons fold into an asserted sub-expression compare.
    fn parse_cmp(&mut self) -> Result<Tree, ParseError> {
        let lhs = self.parse_seq()?;

        let word = match self.peek() {
            Some(Tok::CmpEq) => "?eq",
            Some(Tok::CmpNe) => "!eq",
            Some(Tok::CmpLt) => "?lt",
            Some(Tok::CmpGt) => "?gt",
            Some(Tok::CmpLe) => "?le",
            Some(Tok::CmpGe) => "?ge",
            _ => return Ok(lhs),
        };
        self.pos += 1;

        let rhs = self.parse_seq()?;
        let builtin = self
            .voc
            .find(word)
            .ok_or_else(|| ParseError::new(format!("comparison word `{word}' not in vocabulary")))?;

        let mut cmp = Tree::with_builtin(TreeKind::PredSubxCmp, builtin);
        cmp.push_child(lhs);
        cmp.push_child(rhs);

        let mut assert = Tree::new(TreeKind::Assert);
        assert.push_child(cmp);
        Ok(assert)
    }

    /// Concatenation of postfix items; `let` swallows the remainder of the
    /// enclosing group into its scope.
    fn parse_seq(&mut self) -> Result<Tree, ParseError> {
        let mut items = Vec::new();

        loop {
            match self.peek() {
                Some(Tok::KwLet) => {
                    items.push(self.parse_let()?);
                    break;
                }
                Some(tok) if Self::starts_atom(tok) => items.push(self.parse_postfix()?),
                _ => break,
            }
        }

        match items.len() {
            0 => Ok(Tree::new(TreeKind::Nop)),
            1 => Ok(items.pop().unwrap()),
            _ => {
                let mut cat = Tree::new(TreeKind::Cat);
                for item in items {
                    cat.push_child(item);
                }
                Ok(cat)
            }
        }
    }

    /// `let A, B := expr ; rest` — the initializer runs as a keep-N
    /// sub-expression evaluation, each name binds one lifted value, and the
    /// new scope covers the remainder of the enclosing group.
    fn parse_let(&mut self) -> Result<Tree, ParseError> {
        self.expect(&Tok::KwLet)?;

        let mut names = Vec::new();
        loop {
            match self.next_tok() {
                Some(Tok::Word(name)) => names.push(name),
                Some(t) => {
                    return Err(ParseError::new(format!(
                        "expected a variable name, found {t}"
                    )))
                }
                None => {
                    return Err(ParseError::new(
                        "expected a variable name, found end of query",
                    ))
                }
            }
            if self.eat(&Tok::Assign) {
                break;
            }
            self.eat(&Tok::Comma);
        }

        let init = self.parse_seq()?;
        self.expect(&Tok::Semi)?;

        self.scoped(&names, |p| p.parse_expr()).map(|tree| {
            // Splice the initializer in front of the binds that `scoped`
            // produced: SCOPE[CAT[subx, binds…, rest]].
            let cat = tree.child(0).clone();
            let mut subx = Tree::with_cst(
                TreeKind::SubxEval,
                Constant::new(names.len() as i128, &DEC_DOM),
            );
            subx.push_child(init);

            let mut full = Tree::new(TreeKind::Cat);
            full.push_child(subx);
            for child in cat.children() {
                full.push_child(child.clone());
            }

            let mut scope_node = Tree::with_scope(TreeKind::Scope, Rc::clone(tree.scp()));
            scope_node.push_child(full);
            scope_node
        })
    }

    fn parse_postfix(&mut self) -> Result<Tree, ParseError> {
        let mut tree = self.parse_atom()?;

        loop {
            match self.peek() {
                Some(Tok::Star) => {
                    self.pos += 1;
                    let mut star = Tree::new(TreeKind::CloseStar);
                    star.push_child(tree);
                    tree = star;
                }
                Some(Tok::Plus) => {
                    self.pos += 1;
                    let mut star = Tree::new(TreeKind::CloseStar);
                    star.push_child(tree.clone());
                    let mut cat = Tree::new(TreeKind::Cat);
                    cat.push_child(tree);
                    cat.push_child(star);
                    tree = cat;
                }
                Some(Tok::Maybe) => {
                    self.pos += 1;
                    let mut alt = Tree::new(TreeKind::Alt);
                    alt.push_child(tree);
                    alt.push_child(Tree::new(TreeKind::Nop));
                    tree = alt;
                }
                _ => break,
            }
        }

        Ok(tree)
    }

    fn parse_atom(&mut self) -> Result<Tree, ParseError> {
        match self.next_tok() {
            Some(Tok::Int(cst)) => Ok(Tree::with_cst(TreeKind::Const, cst)),

            Some(Tok::Str(parts)) => self.parse_string(parts),

            Some(Tok::Word(name)) => Ok(self.word_tree(&name)),

            Some(Tok::LParen) => {
                let tree = match self.parse_formals()? {
                    Some(names) => self.scoped(&names, |p| p.parse_expr())?,
                    None => self.parse_expr()?,
                };
                self.expect(&Tok::RParen)?;
                Ok(tree)
            }

            Some(Tok::LBracket) => {
                if self.eat(&Tok::RBracket) {
                    return Ok(Tree::new(TreeKind::EmptyList));
                }
                let inner = self.parse_expr()?;
                self.expect(&Tok::RBracket)?;
                let mut capture = Tree::new(TreeKind::Capture);
                capture.push_child(inner);
                Ok(capture)
            }

            Some(Tok::LBrace) => {
                let body = match self.parse_formals()? {
                    Some(names) => self.scoped(&names, |p| p.parse_expr())?,
                    None => self.parse_expr()?,
                };
                self.expect(&Tok::RBrace)?;
                let mut block = Tree::new(TreeKind::Block);
                block.push_child(body);
                Ok(block)
            }

            Some(Tok::SubxOpen(positive)) => {
                let inner = self.parse_expr()?;
                self.expect(&Tok::RParen)?;

                let mut any = Tree::new(TreeKind::PredSubxAny);
                any.push_child(inner);

                let pred = if positive {
                    any
                } else {
                    let mut not = Tree::new(TreeKind::PredNot);
                    not.push_child(any);
                    not
                };

                let mut assert = Tree::new(TreeKind::Assert);
                assert.push_child(pred);
                Ok(assert)
            }

            Some(Tok::KwIf) => {
                let cond = self.parse_expr()?;
                self.expect(&Tok::KwThen)?;
                let then_branch = self.parse_expr()?;
                let else_branch = if self.eat(&Tok::KwElse) {
                    self.parse_expr()?
                } else {
                    Tree::new(TreeKind::Nop)
                };

                let mut ifelse = Tree::new(TreeKind::IfElse);
                ifelse.push_child(cond);
                ifelse.push_child(then_branch);
                ifelse.push_child(else_branch);
                Ok(ifelse)
            }

            Some(t) => Err(ParseError::new(format!("unexpected {t}"))),
            None => Err(ParseError::new("unexpected end of query")),
        }
    }

    fn parse_string(&mut self, parts: Vec<StrPart>) -> Result<Tree, ParseError> {
        if let [StrPart::Lit(lit)] = parts.as_slice() {
            return Ok(Tree::with_str(TreeKind::Str, lit.clone()));
        }

        let mut format = Tree::new(TreeKind::Format);
        for part in parts {
            match part {
                StrPart::Lit(lit) => format.push_child(Tree::with_str(TreeKind::Str, lit)),
                StrPart::Expr(toks) => {
                    let mut sub = Parser {
                        toks: &toks,
                        pos: 0,
                        voc: self.voc,
                        scope: self.scope.clone(),
                    };
                    let tree = sub.parse_expr()?;
                    if sub.pos != toks.len() {
                        return Err(ParseError::new("trailing input in %( %) expression"));
                    }
                    format.push_child(tree);
                }
            }
        }
        Ok(format)
    }

    fn parse_toplevel(&mut self) -> Result<Tree, ParseError> {
        let tree = match self.parse_formals()? {
            Some(names) => self.scoped(&names, |p| p.parse_expr())?,
            None => self.parse_expr()?,
        };

        if self.pos != self.toks.len() {
            return Err(ParseError::new(format!(
                "unexpected {}",
                self.toks[self.pos]
            )));
        }
        Ok(tree)
    }
}

/// Parses a query string into a tree, resolving words against `voc`.
pub fn parse_query(input: &str, voc: &Vocabulary) -> Result<Tree, ParseError> {
    let toks = lexer::tokens_final(input).map_err(|e| ParseError::new(e.to_string()))?;
    let mut parser = Parser {
        toks: &toks,
        pos: 0,
        voc,
        scope: None,
    };
    parser.parse_toplevel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::core_vocabulary;

    fn dump(query: &str) -> String {
        let voc = core_vocabulary();
        format!("{:?}", parse_query(query, &voc).unwrap())
    }

    #[test]
    fn literals() {
        assert_eq!(dump("17"), "(CONST<17>)");
        assert_eq!(dump("0x17"), "(CONST<0x17>)");
        assert_eq!(dump("017"), "(CONST<017>)");
        assert_eq!(dump("\"x\""), "(STR<x>)");
    }

    #[test]
    fn cat_and_alt() {
        assert_eq!(dump("1 2"), "(CAT (CONST<1>) (CONST<2>))");
        assert_eq!(dump("1, 2, 3"), "(ALT (CONST<1>) (CONST<2>) (CONST<3>))");
        assert_eq!(
            dump("(1, 2) 3"),
            "(CAT (ALT (CONST<1>) (CONST<2>)) (CONST<3>))"
        );
    }

    #[test]
    fn words() {
        assert_eq!(dump("dup swap"), "(CAT (F_BUILTIN<dup>) (F_BUILTIN<swap>))");
        assert_eq!(dump("nosuchword"), "(READ<nosuchword>)");
        assert_eq!(dump("debug"), "(F_DEBUG)");
    }

    #[test]
    fn postfix() {
        assert_eq!(dump("elem*"), "(CLOSE_STAR (F_BUILTIN<elem>))");
        assert_eq!(
            dump("elem+"),
            "(CAT (F_BUILTIN<elem>) (CLOSE_STAR (F_BUILTIN<elem>)))"
        );
        assert_eq!(dump("elem?"), "(ALT (F_BUILTIN<elem>) (NOP))");
    }

    #[test]
    fn capture_and_empty_list() {
        assert_eq!(dump("[]"), "(EMPTY_LIST)");
        assert_eq!(dump("[elem]"), "(CAPTURE (F_BUILTIN<elem>))");
        assert_eq!(
            dump("[1, 2]"),
            "(CAPTURE (ALT (CONST<1>) (CONST<2>)))"
        );
    }

    #[test]
    fn let_binding() {
        assert_eq!(
            dump("let A := 5; A"),
            "(SCOPE (CAT (SUBX_EVAL<1> (CONST<5>)) (BIND<A>) (READ<A>)))"
        );
        assert_eq!(
            dump("let A, B := 1 2; B"),
            "(SCOPE (CAT (SUBX_EVAL<2> (CAT (CONST<1>) (CONST<2>))) (BIND<B>) (BIND<A>) (READ<B>)))"
        );
    }

    #[test]
    fn blocks() {
        assert_eq!(
            dump("{|A| A}"),
            "(BLOCK (SCOPE (CAT (BIND<A>) (READ<A>))))"
        );
        assert_eq!(dump("{dup}"), "(BLOCK (F_BUILTIN<dup>))");
    }

    #[test]
    fn format_strings() {
        assert_eq!(
            dump("\"a%( 1 %)b\""),
            "(FORMAT (STR<a>) (CONST<1>) (STR<b>))"
        );
        assert_eq!(dump("\"%( 1 %)\""), "(FORMAT (CONST<1>))");
    }

    #[test]
    fn or_choice() {
        assert_eq!(dump("1 || 2"), "(OR (CONST<1>) (CONST<2>))");
        assert_eq!(
            dump("1, 2 || 3"),
            "(OR (ALT (CONST<1>) (CONST<2>)) (CONST<3>))"
        );
    }

    #[test]
    fn subx_predicates() {
        assert_eq!(
            dump("?(elem)"),
            "(ASSERT (PRED_SUBX_ANY (F_BUILTIN<elem>)))"
        );
        assert_eq!(
            dump("!(elem)"),
            "(ASSERT (PRED_NOT (PRED_SUBX_ANY (F_BUILTIN<elem>))))"
        );
    }

    #[test]
    fn infix_comparison() {
        assert_eq!(
            dump("(1 == 2)"),
            "(ASSERT (PRED_SUBX_CMP<?eq> (CONST<1>) (CONST<2>)))"
        );
        assert_eq!(
            dump("(1 2 add <= 4)"),
            "(ASSERT (PRED_SUBX_CMP<?le> (CAT (CONST<1>) (CONST<2>) (F_BUILTIN<add>)) (CONST<4>)))"
        );
    }

    #[test]
    fn if_else() {
        assert_eq!(
            dump("if 1 then 2 else 3"),
            "(IFELSE (CONST<1>) (CONST<2>) (CONST<3>))"
        );
        assert_eq!(dump("if 1 then 2"), "(IFELSE (CONST<1>) (CONST<2>) (NOP))");
    }

    #[test]
    fn comments_and_whitespace() {
        assert_eq!(dump("1 # comment\n 2"), "(CAT (CONST<1>) (CONST<2>))");
    }

    #[test]
    fn errors() {
        let voc = core_vocabulary();
        assert!(parse_query("(1", &voc).is_err());
        assert!(parse_query("\"unterminated", &voc).is_err());
        assert!(parse_query("let := 5; 1", &voc).is_err());
    }
}
