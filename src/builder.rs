//! Token stream to operation tree conversion.
//!
//! [`AstBuilder`] runs a shunting-yard pass over the token sequence,
//! augmented with function-call frames and unary-minus recognition. Names
//! are resolved against the registries while the tree is built: registered
//! constants become [`Operation::Constant`] nodes (so the optimizer can fold
//! over them), function calls are arity-checked on their closing bracket,
//! and everything else becomes a variable.

use crate::ast::{BinaryOp, Operation, UnaryOp};
use crate::error::{CalcError, Result};
use crate::registry::{Arity, ConstantRegistry, FunctionRegistry};
use crate::token::{Token, TokenKind};

/// Builds an [`Operation`] tree from a token sequence.
pub struct AstBuilder<'r> {
    functions: &'r FunctionRegistry,
    constants: &'r ConstantRegistry,
}

/// An entry on the operator stack.
enum StackEntry {
    Binary { op: BinaryOp, position: usize },
    UnaryNeg { position: usize },
    /// A plain `(` group.
    Bracket { position: usize },
    /// A pending function application opened by `name(`.
    Function {
        name: String,
        position: usize,
        args: usize,
    },
}

impl StackEntry {
    /// Binding strength of an operator entry; brackets and function frames
    /// are barriers, not operators.
    fn precedence(&self) -> Option<u8> {
        match self {
            StackEntry::Binary { op, .. } => Some(binary_precedence(*op)),
            StackEntry::UnaryNeg { .. } => Some(UNARY_PRECEDENCE),
            _ => None,
        }
    }
}

const UNARY_PRECEDENCE: u8 = 3;

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Add | BinaryOp::Sub => 1,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 2,
        // `^` binds tighter than unary minus, so `-2^2` is `-(2^2)`.
        BinaryOp::Pow => 4,
    }
}

fn is_right_associative(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Pow)
}

impl<'r> AstBuilder<'r> {
    pub fn new(functions: &'r FunctionRegistry, constants: &'r ConstantRegistry) -> Self {
        Self {
            functions,
            constants,
        }
    }

    /// Converts `tokens` into a single operation tree.
    pub fn build(&self, tokens: &[Token]) -> Result<Operation> {
        if tokens.is_empty() {
            return Err(CalcError::EmptyFormula);
        }

        let mut output: Vec<Operation> = Vec::new();
        let mut operators: Vec<StackEntry> = Vec::new();
        let mut prev: Option<&Token> = None;

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            match token.kind {
                TokenKind::Integer | TokenKind::FloatingPoint => {
                    self.expect_operand_position(prev, token)?;
                    // The reader guarantees a value on numeric tokens.
                    output.push(Operation::Constant(token.value.unwrap_or_default()));
                }
                TokenKind::Identifier => {
                    self.expect_operand_position(prev, token)?;
                    let followed_by_bracket = tokens
                        .get(i + 1)
                        .is_some_and(|t| t.kind == TokenKind::LeftBracket);
                    if followed_by_bracket {
                        if !self.functions.contains(&token.text) {
                            return Err(CalcError::parse(
                                token.position,
                                format!("unknown function '{}'", token.text),
                            ));
                        }
                        // An immediately closed pair is a zero-argument call.
                        let args = match tokens.get(i + 2) {
                            Some(t) if t.kind == TokenKind::RightBracket => 0,
                            _ => 1,
                        };
                        operators.push(StackEntry::Function {
                            name: token.text.clone(),
                            position: token.position,
                            args,
                        });
                        // Consume the bracket along with the name.
                        prev = Some(&tokens[i + 1]);
                        i += 2;
                        continue;
                    } else if let Some(constant) = self.constants.lookup(&token.text) {
                        output.push(Operation::Constant(constant.value()));
                    } else {
                        output.push(Operation::Variable(token.text.clone()));
                    }
                }
                TokenKind::Operation => {
                    if token.text == "-" && is_unary_position(prev) {
                        // Prefix operators take nothing from their left.
                        operators.push(StackEntry::UnaryNeg {
                            position: token.position,
                        });
                    } else {
                        if is_unary_position(prev) {
                            return Err(CalcError::parse(
                                token.position,
                                format!("unexpected operator '{}'", token.text),
                            ));
                        }
                        let op = binary_op_for(&token.text, token.position)?;
                        let precedence = binary_precedence(op);
                        while let Some(entry) = operators.pop_if(|top| {
                            top.precedence().is_some_and(|top_precedence| {
                                top_precedence > precedence
                                    || (top_precedence == precedence && !is_right_associative(op))
                            })
                        }) {
                            apply(entry, &mut output)?;
                        }
                        operators.push(StackEntry::Binary {
                            op,
                            position: token.position,
                        });
                    }
                }
                TokenKind::LeftBracket => {
                    self.expect_operand_position(prev, token)?;
                    operators.push(StackEntry::Bracket {
                        position: token.position,
                    });
                }
                TokenKind::RightBracket => {
                    if prev.is_some_and(|t| {
                        t.kind == TokenKind::Operation || t.kind == TokenKind::ArgumentSeparator
                    }) {
                        return Err(CalcError::parse(
                            token.position,
                            "expected an expression before ')'",
                        ));
                    }
                    self.close_bracket(token, prev, &mut operators, &mut output)?;
                }
                TokenKind::ArgumentSeparator => {
                    if prev.is_none_or(|t| {
                        t.kind == TokenKind::Operation
                            || t.kind == TokenKind::ArgumentSeparator
                            || t.kind == TokenKind::LeftBracket
                    }) {
                        return Err(CalcError::parse(
                            token.position,
                            format!("expected an expression before '{}'", token.text),
                        ));
                    }
                    while let Some(entry) = operators.pop_if(|top| top.precedence().is_some()) {
                        apply(entry, &mut output)?;
                    }
                    match operators.last_mut() {
                        Some(StackEntry::Function { args, .. }) => *args += 1,
                        _ => {
                            return Err(CalcError::parse(
                                token.position,
                                format!(
                                    "argument separator '{}' outside a function call",
                                    token.text
                                ),
                            ));
                        }
                    }
                }
            }
            prev = Some(token);
            i += 1;
        }

        let last_position = tokens.last().map(|t| t.position).unwrap_or(0);
        if prev.is_some_and(|t| t.kind == TokenKind::Operation) {
            return Err(CalcError::parse(last_position, "trailing operator"));
        }

        while let Some(entry) = operators.pop() {
            match entry {
                StackEntry::Bracket { position } | StackEntry::Function { position, .. } => {
                    return Err(CalcError::parse(position, "missing closing bracket ')'"));
                }
                entry => apply(entry, &mut output)?,
            }
        }

        match output.len() {
            1 => Ok(output.remove(0)),
            0 => Err(CalcError::parse(last_position, "empty expression")),
            _ => Err(CalcError::parse(last_position, "malformed expression")),
        }
    }

    /// Rejects a value token arriving directly after another value, which the
    /// infix grammar never produces.
    fn expect_operand_position(&self, prev: Option<&Token>, token: &Token) -> Result<()> {
        if prev.is_some_and(|t| {
            matches!(
                t.kind,
                TokenKind::Integer
                    | TokenKind::FloatingPoint
                    | TokenKind::Identifier
                    | TokenKind::RightBracket
            )
        }) {
            return Err(CalcError::parse(
                token.position,
                format!("unexpected '{}', expected an operator", token.text),
            ));
        }
        Ok(())
    }

    fn close_bracket(
        &self,
        token: &Token,
        prev: Option<&Token>,
        operators: &mut Vec<StackEntry>,
        output: &mut Vec<Operation>,
    ) -> Result<()> {
        loop {
            match operators.pop() {
                None => {
                    return Err(CalcError::parse(token.position, "unmatched ')'"));
                }
                Some(StackEntry::Bracket { position }) => {
                    if prev.is_some_and(|t| t.kind == TokenKind::LeftBracket) {
                        return Err(CalcError::parse(position, "empty expression inside '()'"));
                    }
                    return Ok(());
                }
                Some(StackEntry::Function {
                    name,
                    position,
                    args,
                }) => {
                    return self.finish_function(&name, position, args, output);
                }
                Some(entry) => apply(entry, output)?,
            }
        }
    }

    /// Pops a completed function frame: validates arity against the registry
    /// entry and emits the call node.
    fn finish_function(
        &self,
        name: &str,
        position: usize,
        args: usize,
        output: &mut Vec<Operation>,
    ) -> Result<()> {
        let entry = self.functions.lookup(name).ok_or_else(|| {
            CalcError::parse(position, format!("unknown function '{}'", name))
        })?;
        if !entry.arity().accepts(args) {
            let message = match entry.arity() {
                Arity::Fixed(expected) => format!(
                    "function '{}' expects {} arguments, got {}",
                    name, expected, args
                ),
                Arity::Variadic => format!(
                    "function '{}' expects at least 1 argument, got {}",
                    name, args
                ),
            };
            return Err(CalcError::parse(position, message));
        }

        let mut call_args = Vec::with_capacity(args);
        for _ in 0..args {
            let arg = output.pop().ok_or_else(|| {
                CalcError::parse(position, format!("malformed arguments to '{}'", name))
            })?;
            call_args.push(arg);
        }
        call_args.reverse();
        output.push(Operation::Function {
            name: entry.name().to_string(),
            args: call_args,
            idempotent: entry.is_idempotent(),
        });
        Ok(())
    }
}

fn binary_op_for(text: &str, position: usize) -> Result<BinaryOp> {
    match text {
        "+" => Ok(BinaryOp::Add),
        "-" => Ok(BinaryOp::Sub),
        "*" => Ok(BinaryOp::Mul),
        "/" => Ok(BinaryOp::Div),
        "%" => Ok(BinaryOp::Mod),
        "^" => Ok(BinaryOp::Pow),
        other => Err(CalcError::parse(
            position,
            format!("unknown operator '{}'", other),
        )),
    }
}

/// `-` is unary at the start of the input or directly after another
/// operator, a left bracket, or an argument separator.
fn is_unary_position(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(t) => matches!(
            t.kind,
            TokenKind::Operation | TokenKind::LeftBracket | TokenKind::ArgumentSeparator
        ),
    }
}

/// Applies a popped operator entry to the output stack.
fn apply(entry: StackEntry, output: &mut Vec<Operation>) -> Result<()> {
    match entry {
        StackEntry::Binary { op, position } => {
            let right = output.pop();
            let left = output.pop();
            match (left, right) {
                (Some(left), Some(right)) => {
                    output.push(Operation::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    });
                    Ok(())
                }
                _ => Err(CalcError::parse(
                    position,
                    format!("operator '{}' is missing an operand", op.symbol()),
                )),
            }
        }
        StackEntry::UnaryNeg { position } => {
            let operand = output.pop().ok_or_else(|| {
                CalcError::parse(position, "operator '-' is missing an operand")
            })?;
            output.push(Operation::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
            Ok(())
        }
        StackEntry::Bracket { position } | StackEntry::Function { position, .. } => {
            Err(CalcError::parse(position, "missing closing bracket ')'"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{default_constant_registry, default_function_registry};
    use crate::token::{Culture, TokenReader};

    struct Fixture {
        functions: FunctionRegistry,
        constants: ConstantRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                functions: default_function_registry(),
                constants: default_constant_registry(),
            }
        }

        fn build(&self, input: &str) -> Result<Operation> {
            let tokens = TokenReader::new(Culture::invariant()).read(input)?;
            AstBuilder::new(&self.functions, &self.constants).build(&tokens)
        }
    }

    fn constant(value: f64) -> Operation {
        Operation::Constant(value)
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let fixture = Fixture::new();
        let ast = fixture.build("2+3*4").unwrap();
        assert_eq!(
            ast,
            Operation::Binary {
                op: BinaryOp::Add,
                left: Box::new(constant(2.0)),
                right: Box::new(Operation::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(constant(3.0)),
                    right: Box::new(constant(4.0)),
                }),
            }
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        let fixture = Fixture::new();
        let ast = fixture.build("2^3^2").unwrap();
        assert_eq!(
            ast,
            Operation::Binary {
                op: BinaryOp::Pow,
                left: Box::new(constant(2.0)),
                right: Box::new(Operation::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(constant(3.0)),
                    right: Box::new(constant(2.0)),
                }),
            }
        );
    }

    #[test]
    fn test_unary_minus_binds_below_power() {
        let fixture = Fixture::new();
        let ast = fixture.build("-2^2").unwrap();
        assert_eq!(
            ast,
            Operation::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Operation::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(constant(2.0)),
                    right: Box::new(constant(2.0)),
                }),
            }
        );
    }

    #[test]
    fn test_unary_minus_inside_brackets_and_after_separator() {
        let fixture = Fixture::new();
        let ast = fixture.build("max(-1, -2)").unwrap();
        match ast {
            Operation::Function { name, args, .. } => {
                assert_eq!(name, "max");
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0], Operation::Unary { .. }));
                assert!(matches!(args[1], Operation::Unary { .. }));
            }
            other => panic!("expected function node, got {:?}", other),
        }
    }

    #[test]
    fn test_constants_resolve_during_build() {
        let fixture = Fixture::new();
        let ast = fixture.build("pi").unwrap();
        assert_eq!(ast, constant(core::f64::consts::PI));
    }

    #[test]
    fn test_unregistered_identifier_is_a_variable() {
        let fixture = Fixture::new();
        let ast = fixture.build("velocity").unwrap();
        assert_eq!(ast, Operation::Variable("velocity".to_string()));
    }

    #[test]
    fn test_function_call_carries_idempotency() {
        let fixture = Fixture::new();
        let ast = fixture.build("sin(1)").unwrap();
        assert_eq!(
            ast,
            Operation::Function {
                name: "sin".to_string(),
                args: vec![constant(1.0)],
                idempotent: true,
            }
        );
    }

    #[test]
    fn test_unknown_function_is_rejected() {
        let fixture = Fixture::new();
        let err = fixture.build("frobnicate(1)").unwrap_err();
        match err {
            CalcError::Parse { message, position } => {
                assert_eq!(position, 0);
                assert!(message.contains("unknown function 'frobnicate'"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let fixture = Fixture::new();
        let err = fixture.build("max(1)").unwrap_err();
        match err {
            CalcError::Parse { message, .. } => {
                assert!(message.contains("'max' expects 2 arguments, got 1"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        let err = fixture.build("sin(1,2)").unwrap_err();
        match err {
            CalcError::Parse { message, .. } => {
                assert!(message.contains("'sin' expects 1 arguments, got 2"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_structural_errors() {
        let fixture = Fixture::new();
        assert!(matches!(
            fixture.build("(1+2").unwrap_err(),
            CalcError::Parse { .. }
        ));
        assert!(matches!(
            fixture.build("1+2)").unwrap_err(),
            CalcError::Parse { .. }
        ));
        assert!(matches!(
            fixture.build("1+").unwrap_err(),
            CalcError::Parse { .. }
        ));
        assert!(matches!(
            fixture.build("()").unwrap_err(),
            CalcError::Parse { .. }
        ));
        assert!(matches!(
            fixture.build("2+*3").unwrap_err(),
            CalcError::Parse { .. }
        ));
        assert!(matches!(
            fixture.build("1 2").unwrap_err(),
            CalcError::Parse { .. }
        ));
        assert!(matches!(
            fixture.build("max(1,)").unwrap_err(),
            CalcError::Parse { .. }
        ));
        assert!(matches!(
            fixture.build("(1,2)").unwrap_err(),
            CalcError::Parse { .. }
        ));
    }

    #[test]
    fn test_nested_calls_and_groups() {
        let fixture = Fixture::new();
        let ast = fixture.build("logn(8, 2) + sqrt(abs(-9))").unwrap();
        assert!(matches!(ast, Operation::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn test_double_negation() {
        let fixture = Fixture::new();
        let ast = fixture.build("--2").unwrap();
        assert_eq!(
            ast,
            Operation::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Operation::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(constant(2.0)),
                }),
            }
        );
    }
}
