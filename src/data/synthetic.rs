//! Deterministic generator of labeled token streams.
//!
//! Stands in for a real labeled corpus when no JSONL paths are configured:
//! it emits statements of a tiny expression language and labels every token
//! position with an AST node kind, a symbol kind (identifiers only, `-1`
//! elsewhere), and an error category (almost always `none`, with a small
//! rate of injected corruptions).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::dataset::TokenSample;

// Token ids. 0 is reserved for padding.
pub const PAD_TOKEN: u32 = 0;
const KW_LET: u32 = 1;
const KW_FN: u32 = 2;
const ASSIGN: u32 = 3;
const OP_BASE: u32 = 4; // + - * /
const OP_COUNT: u32 = 4;
const OPEN_PAREN: u32 = 8;
const CLOSE_PAREN: u32 = 9;
const OPEN_BRACE: u32 = 10;
const CLOSE_BRACE: u32 = 11;
const SEMI: u32 = 12;
const COMMA: u32 = 13;
const UNKNOWN_GLYPH: u32 = 14;
const IDENT_BASE: u32 = 15;
const IDENT_COUNT: u32 = 16;
const LIT_BASE: u32 = 31;
const LIT_COUNT: u32 = 16;

/// One past the highest token id the generator emits.
pub const VOCAB_SIZE: usize = (LIT_BASE + LIT_COUNT) as usize;

// AST node kinds.
const AST_KEYWORD: i32 = 0;
const AST_IDENT: i32 = 1;
const AST_LITERAL: i32 = 2;
const AST_OPERATOR: i32 = 3;
const AST_ASSIGN: i32 = 4;
const AST_OPEN_DELIM: i32 = 5;
const AST_CLOSE_DELIM: i32 = 6;
const AST_SEPARATOR: i32 = 7;
const AST_UNKNOWN: i32 = 8;
pub const AST_CLASSES: usize = 9;

// Symbol kinds, assigned only at identifier positions.
const SYM_LOCAL_DEF: i32 = 0;
const SYM_LOCAL_USE: i32 = 1;
const SYM_FN_DEF: i32 = 2;
const SYM_PARAM_DEF: i32 = 3;
pub const SYMBOL_CLASSES: usize = 4;

// Error categories.
const ERR_NONE: i32 = 0;
const ERR_UNKNOWN_TOKEN: i32 = 1;
const ERR_UNBALANCED_DELIM: i32 = 2;
pub const ERROR_CLASSES: usize = 3;

const NO_SYMBOL: i32 = -1;

/// Probability that a sample gets one token replaced by an unknown glyph.
const CORRUPTION_RATE: f64 = 0.08;
/// Probability that a parenthesized expression loses its closing paren.
const UNBALANCED_RATE: f64 = 0.05;

/// Generate `count` unpadded samples, each at most `max_len` tokens long.
/// The same `seed` always yields the same corpus.
pub fn generate(count: usize, max_len: usize, seed: u64) -> Vec<TokenSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| generate_sample(max_len, &mut rng)).collect()
}

fn generate_sample(max_len: usize, rng: &mut StdRng) -> TokenSample {
    let mut stream = Stream::default();

    // A `let` statement needs at least 5 tokens, a fn definition up to 12.
    while stream.len() + 12 <= max_len {
        if rng.random_bool(0.25) {
            stream.emit_fn_def(rng);
        } else {
            stream.emit_let_stmt(rng, max_len);
        }
        if stream.len() >= max_len / 2 && rng.random_bool(0.4) {
            break;
        }
    }
    if stream.is_empty() {
        stream.emit_let_stmt(rng, max_len);
    }
    stream.truncate(max_len);

    if rng.random_bool(CORRUPTION_RATE) {
        let pos = rng.random_range(0..stream.len());
        stream.corrupt(pos);
    }

    stream.into_sample()
}

#[derive(Default)]
struct Stream {
    tokens: Vec<u32>,
    ast: Vec<i32>,
    symbol: Vec<i32>,
    error: Vec<i32>,
}

impl Stream {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn push(&mut self, token: u32, ast: i32, symbol: i32) {
        self.tokens.push(token);
        self.ast.push(ast);
        self.symbol.push(symbol);
        self.error.push(ERR_NONE);
    }

    /// `let <ident> = <expr> ;`
    fn emit_let_stmt(&mut self, rng: &mut StdRng, max_len: usize) {
        self.push(KW_LET, AST_KEYWORD, NO_SYMBOL);
        self.push(ident(rng), AST_IDENT, SYM_LOCAL_DEF);
        self.push(ASSIGN, AST_ASSIGN, NO_SYMBOL);
        self.emit_expr(rng, max_len);
        self.push(SEMI, AST_SEPARATOR, NO_SYMBOL);
    }

    /// `fn <ident> ( <ident> , <ident> ) { let ... }`
    fn emit_fn_def(&mut self, rng: &mut StdRng) {
        self.push(KW_FN, AST_KEYWORD, NO_SYMBOL);
        self.push(ident(rng), AST_IDENT, SYM_FN_DEF);
        self.push(OPEN_PAREN, AST_OPEN_DELIM, NO_SYMBOL);
        self.push(ident(rng), AST_IDENT, SYM_PARAM_DEF);
        if rng.random_bool(0.5) {
            self.push(COMMA, AST_SEPARATOR, NO_SYMBOL);
            self.push(ident(rng), AST_IDENT, SYM_PARAM_DEF);
        }
        self.push(CLOSE_PAREN, AST_CLOSE_DELIM, NO_SYMBOL);
        self.push(OPEN_BRACE, AST_OPEN_DELIM, NO_SYMBOL);
        self.push(term(rng), AST_LITERAL, NO_SYMBOL);
        self.push(CLOSE_BRACE, AST_CLOSE_DELIM, NO_SYMBOL);
    }

    /// `<term> (<op> <term>)*`, occasionally parenthesized; a parenthesized
    /// expression may drop its closing paren, which marks the opening paren
    /// with the unbalanced-delimiter error category.
    fn emit_expr(&mut self, rng: &mut StdRng, max_len: usize) {
        let parens = rng.random_bool(0.3);
        let open_at = self.len();
        if parens {
            self.push(OPEN_PAREN, AST_OPEN_DELIM, NO_SYMBOL);
        }
        self.emit_term(rng);
        let extra = rng.random_range(0..=2usize);
        for _ in 0..extra {
            if self.len() + 3 > max_len {
                break;
            }
            let op = OP_BASE + rng.random_range(0..OP_COUNT);
            self.push(op, AST_OPERATOR, NO_SYMBOL);
            self.emit_term(rng);
        }
        if parens {
            if rng.random_bool(UNBALANCED_RATE) {
                self.error[open_at] = ERR_UNBALANCED_DELIM;
            } else {
                self.push(CLOSE_PAREN, AST_CLOSE_DELIM, NO_SYMBOL);
            }
        }
    }

    fn emit_term(&mut self, rng: &mut StdRng) {
        if rng.random_bool(0.5) {
            self.push(ident(rng), AST_IDENT, SYM_LOCAL_USE);
        } else {
            self.push(term(rng), AST_LITERAL, NO_SYMBOL);
        }
    }

    fn truncate(&mut self, max_len: usize) {
        self.tokens.truncate(max_len);
        self.ast.truncate(max_len);
        self.symbol.truncate(max_len);
        self.error.truncate(max_len);
    }

    fn corrupt(&mut self, pos: usize) {
        self.tokens[pos] = UNKNOWN_GLYPH;
        self.ast[pos] = AST_UNKNOWN;
        self.symbol[pos] = NO_SYMBOL;
        self.error[pos] = ERR_UNKNOWN_TOKEN;
    }

    fn into_sample(self) -> TokenSample {
        TokenSample {
            tokens: self.tokens,
            ast_labels: self.ast,
            symbol_labels: self.symbol,
            error_labels: self.error,
        }
    }
}

fn ident(rng: &mut StdRng) -> u32 {
    IDENT_BASE + rng.random_range(0..IDENT_COUNT)
}

fn term(rng: &mut StdRng) -> u32 {
    LIT_BASE + rng.random_range(0..LIT_COUNT)
}
