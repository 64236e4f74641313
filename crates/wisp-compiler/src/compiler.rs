//! Single-pass Pratt-parsing compiler: consumes tokens from a `Scanner`
//! and emits bytecode directly into a `Chunk` as it parses — there is no
//! intermediate AST, matching `original_source/compiler.c`.

use crate::scanner::{Scanner, Token, TokenKind};
use wisp_core::{Chunk, Interner, OpCode, Value};

/// One compile-time diagnostic. `message` is the fully rendered text
/// (`"[line L] Error at 'x': ..."`), matching what `error_at` in the C
/// original writes to stderr — kept pre-rendered so callers that want to
/// print every diagnostic gathered under panic-mode recovery don't need to
/// re-derive the `at '...'`/`at end` clause themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: u32,
    pub message: String,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

fn infix_precedence(kind: TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        Minus | Plus => Precedence::Term,
        Slash | Star => Precedence::Factor,
        BangEqual | EqualEqual => Precedence::Equality,
        Less | LessEqual | Greater | GreaterEqual => Precedence::Comparison,
        _ => Precedence::None,
    }
}

struct Compiler<'src, 'intern> {
    scanner: Scanner<'src>,
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<CompileError>,
    chunk: Chunk,
    interner: &'intern mut Interner,
}

/// Compile `source` into a `Chunk`, interning any string literals (and
/// global-variable names) into `interner` along the way.
///
/// Returns every diagnostic gathered across panic-mode recovery on
/// failure, not just the first — see spec §7/§8 scenario 6.
pub fn compile(source: &str, interner: &mut Interner) -> Result<Chunk, Vec<CompileError>> {
    let mut compiler = Compiler::new(source, interner);
    compiler.run()
}

impl<'src, 'intern> Compiler<'src, 'intern> {
    fn new(source: &'src str, interner: &'intern mut Interner) -> Self {
        let scanner = Scanner::new(source);
        let placeholder = Token {
            kind: TokenKind::Eof,
            lexeme: "",
            line: 0,
        };
        Compiler {
            scanner,
            previous: placeholder,
            current: placeholder,
            had_error: false,
            panic_mode: false,
            errors: Vec::new(),
            chunk: Chunk::new(),
            interner,
        }
    }

    fn run(&mut self) -> Result<Chunk, Vec<CompileError>> {
        self.advance();
        while !self.match_token(TokenKind::Eof) {
            self.declaration();
        }
        self.end_compiler();
        if self.had_error {
            Err(std::mem::take(&mut self.errors))
        } else {
            Ok(std::mem::take(&mut self.chunk))
        }
    }

    // -- token stream plumbing -------------------------------------------------

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.next();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme.to_string();
            self.error_at_current(&message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    // -- error reporting --------------------------------------------------------

    fn error_at(&mut self, token: Token, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        let location = match token.kind {
            TokenKind::Eof => " at end".to_string(),
            TokenKind::Error => String::new(),
            _ => format!(" at '{}'", token.lexeme),
        };
        let rendered = format!("[line {}] Error{}: {}", token.line, location, message);
        eprintln!("{rendered}");
        self.errors.push(CompileError {
            line: token.line,
            message: rendered,
        });
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Def
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // -- bytecode emission --------------------------------------------------------

    fn emit(&mut self, op: OpCode, line: u32) {
        self.chunk.write_op(op, line);
    }

    fn emit_bytes(&mut self, a: u8, b: u8, line: u32) {
        self.chunk.write(a, line);
        self.chunk.write(b, line);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk.add_constant(value) {
            Ok(idx) => idx,
            Err(message) => {
                self.error(&message);
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let idx = self.make_constant(value);
        let line = self.previous.line;
        self.emit_bytes(OpCode::Constant as u8, idx, line);
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let r = self.interner.copy_string(name);
        self.make_constant(Value::Obj(r))
    }

    fn end_compiler(&mut self) {
        let line = self.previous.line;
        self.emit(OpCode::Return, line);
    }

    // -- grammar: declarations and statements --------------------------------------

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect variable name.");
        let name = self.previous;
        let global = self.identifier_constant(name.lexeme);

        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit(OpCode::None, name.line);
        }
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.");
        self.emit_bytes(OpCode::DefineGlobal as u8, global, name.line);
    }

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        let line = self.previous.line;
        self.emit(OpCode::Print, line);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        let line = self.previous.line;
        self.emit(OpCode::Pop, line);
    }

    // -- grammar: expressions -------------------------------------------------------

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix_kind = self.previous.kind;
        if !self.prefix(prefix_kind) {
            self.error("Expect expression.");
            return;
        }
        while precedence <= infix_precedence(self.current.kind) {
            self.advance();
            let infix_kind = self.previous.kind;
            self.infix(infix_kind);
        }
    }

    fn prefix(&mut self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::LeftParen => self.grouping(),
            TokenKind::Minus | TokenKind::Bang | TokenKind::Not => self.unary(kind),
            TokenKind::Number => self.number(),
            TokenKind::StringLit => self.string(),
            TokenKind::Identifier => self.variable(),
            TokenKind::True | TokenKind::False | TokenKind::None => self.literal(kind),
            _ => return false,
        }
        true
    }

    fn infix(&mut self, kind: TokenKind) {
        use TokenKind::*;
        match kind {
            Minus | Plus | Slash | Star | BangEqual | EqualEqual | Less | LessEqual | Greater
            | GreaterEqual => self.binary(),
            _ => {}
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, kind: TokenKind) {
        let line = self.previous.line;
        self.parse_precedence(Precedence::Unary);
        match kind {
            TokenKind::Minus => self.emit(OpCode::Negate, line),
            TokenKind::Bang | TokenKind::Not => self.emit(OpCode::Not, line),
            _ => unreachable!("unary() dispatched on non-unary token"),
        }
    }

    fn binary(&mut self) {
        let operator_kind = self.previous.kind;
        let line = self.previous.line;
        let rule_precedence = infix_precedence(operator_kind);
        self.parse_precedence(rule_precedence.next());
        match operator_kind {
            TokenKind::BangEqual => {
                self.emit(OpCode::Equal, line);
                self.emit(OpCode::Not, line);
            }
            TokenKind::EqualEqual => self.emit(OpCode::Equal, line),
            TokenKind::Greater => self.emit(OpCode::Greater, line),
            TokenKind::GreaterEqual => {
                self.emit(OpCode::Less, line);
                self.emit(OpCode::Not, line);
            }
            TokenKind::Less => self.emit(OpCode::Less, line),
            TokenKind::LessEqual => {
                self.emit(OpCode::Greater, line);
                self.emit(OpCode::Not, line);
            }
            TokenKind::Plus => self.emit(OpCode::Add, line),
            TokenKind::Minus => self.emit(OpCode::Subtract, line),
            TokenKind::Star => self.emit(OpCode::Multiply, line),
            TokenKind::Slash => self.emit(OpCode::Divide, line),
            _ => unreachable!("binary() dispatched on non-binary token"),
        }
    }

    fn number(&mut self) {
        // The scanner guarantees `[0-9]+ (\.[0-9]+)?`, so this never fails.
        let value: f64 = self.previous.lexeme.parse().unwrap_or(0.0);
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let content = &lexeme[1..lexeme.len() - 1];
        let r = self.interner.copy_string(content);
        self.emit_constant(Value::Obj(r));
    }

    fn literal(&mut self, kind: TokenKind) {
        let line = self.previous.line;
        match kind {
            TokenKind::False => self.emit(OpCode::False, line),
            TokenKind::True => self.emit(OpCode::True, line),
            TokenKind::None => self.emit(OpCode::None, line),
            _ => unreachable!("literal() dispatched on non-literal token"),
        }
    }

    fn variable(&mut self) {
        // Assignment (`x = e`) is reserved via PREC_ASSIGNMENT but never
        // compiled, matching `original_source/compiler.c`'s `named_variable`,
        // which never consults `TOKEN_EQUAL`. See spec §9.
        let name = self.previous;
        let idx = self.identifier_constant(name.lexeme);
        self.emit_bytes(OpCode::GetGlobal as u8, idx, name.line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisp_core::OpCode;

    fn compile_ok(source: &str) -> Chunk {
        let mut interner = Interner::new();
        compile(source, &mut interner).expect("expected successful compile")
    }

    #[test]
    fn successful_compile_ends_in_return() {
        let chunk = compile_ok("print 1;");
        assert_eq!(*chunk.code.last().unwrap(), OpCode::Return as u8);
    }

    #[test]
    fn arithmetic_precedence_emits_constants_then_operators() {
        let chunk = compile_ok("print 1 + 2 * 3;");
        // 1, CONSTANT 2, CONSTANT 3, MULTIPLY, ADD, PRINT, RETURN
        assert!(chunk.code.contains(&(OpCode::Multiply as u8)));
        assert!(chunk.code.contains(&(OpCode::Add as u8)));
        let mul_pos = chunk.code.iter().position(|&b| b == OpCode::Multiply as u8).unwrap();
        let add_pos = chunk.code.iter().position(|&b| b == OpCode::Add as u8).unwrap();
        assert!(mul_pos < add_pos, "* must bind tighter than + (left-to-right emission)");
    }

    #[test]
    fn not_equal_desugars_to_equal_then_not() {
        let chunk = compile_ok("print 1 != 2;");
        let eq = chunk.code.iter().position(|&b| b == OpCode::Equal as u8).unwrap();
        let not = chunk.code.iter().position(|&b| b == OpCode::Not as u8).unwrap();
        assert!(eq < not);
    }

    #[test]
    fn less_equal_desugars_to_greater_then_not() {
        let chunk = compile_ok("print 1 <= 2;");
        let greater = chunk.code.iter().position(|&b| b == OpCode::Greater as u8).unwrap();
        let not = chunk.code.iter().position(|&b| b == OpCode::Not as u8).unwrap();
        assert!(greater < not);
    }

    #[test]
    fn var_without_initializer_emits_none() {
        let chunk = compile_ok("var a;");
        assert!(chunk.code.contains(&(OpCode::None as u8)));
        assert!(chunk.code.contains(&(OpCode::DefineGlobal as u8)));
    }

    #[test]
    fn bare_expression_statement_emits_pop() {
        let chunk = compile_ok("1 + 1;");
        assert!(chunk.code.contains(&(OpCode::Pop as u8)));
    }

    #[test]
    fn missing_semicolon_is_a_compile_error() {
        let mut interner = Interner::new();
        let errors = compile("var a = 1 a = 2;", &mut interner).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("line 1"));
    }

    #[test]
    fn panic_mode_suppresses_cascading_errors_until_semicolon() {
        let mut interner = Interner::new();
        // Two missing-semicolon sites on one line separated by a real
        // statement boundary should not spew a diagnostic per token.
        let errors = compile("var a = 1 var b = 2;", &mut interner).unwrap_err();
        assert_eq!(errors.len(), 1, "panic mode should swallow the cascade");
    }

    #[test]
    fn too_many_constants_is_reported() {
        let mut interner = Interner::new();
        let mut source = String::new();
        for i in 0..300 {
            source.push_str(&format!("print {i};\n"));
        }
        let errors = compile(&source, &mut interner).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("Too many constants")));
    }

    #[test]
    fn compiling_same_source_twice_is_deterministic() {
        let mut i1 = Interner::new();
        let mut i2 = Interner::new();
        let c1 = compile("var a = 1; print a + 2;", &mut i1).unwrap();
        let c2 = compile("var a = 1; print a + 2;", &mut i2).unwrap();
        assert_eq!(c1.code, c2.code);
        assert_eq!(c1.lines, c2.lines);
    }

    #[test]
    fn string_literal_is_interned() {
        let mut interner = Interner::new();
        let chunk = compile("print \"hi\";", &mut interner).unwrap();
        let constant = chunk
            .constants
            .iter()
            .find_map(|v| v.as_obj())
            .expect("expected an interned string constant");
        assert_eq!(interner.resolve(constant).as_str(), "hi");
    }
}
