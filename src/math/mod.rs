use std::str::FromStr;
use thiserror::Error;

/// Divisors with a smaller magnitude than this are rejected (exclusive bound).
pub const MIN_DIVISOR_MAGNITUDE: f64 = 1e-10;

// -- Types --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    /// Label reported back to callers alongside the result.
    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "addition",
            Self::Subtract => "subtraction",
            Self::Multiply => "multiplication",
            Self::Divide => "division",
        }
    }

    /// Route segment under `/api/math/`.
    pub fn route(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> Result<f64, MathError> {
        match self {
            Self::Add => add(a, b),
            Self::Subtract => subtract(a, b),
            Self::Multiply => multiply(a, b),
            Self::Divide => divide(a, b),
        }
    }

    fn overflow_name(self) -> &'static str {
        match self {
            Self::Add => "Addition",
            Self::Subtract => "Subtraction",
            Self::Multiply => "Multiplication",
            Self::Divide => "Division",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.route())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation '{0}' (expected add, subtract, multiply or divide)")]
pub struct ParseOperationError(String);

impl FromStr for Operation {
    type Err = ParseOperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.route() == needle || op.label() == needle)
            .ok_or_else(|| ParseOperationError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandPosition {
    First,
    Second,
}

impl std::fmt::Display for OperandPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "operand1"),
            Self::Second => write!(f, "operand2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonFinite {
    NaN,
    Infinity,
}

impl std::fmt::Display for NonFinite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NaN => write!(f, "NaN"),
            Self::Infinity => write!(f, "Infinity"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("{operand} cannot be {kind}")]
    InvalidOperand {
        operand: OperandPosition,
        kind: NonFinite,
    },

    #[error("Division by zero is not allowed")]
    DivisionByZero,

    #[error("Divisor too small, may cause precision issues")]
    PrecisionLoss,

    #[error("{} result overflow", .operation.overflow_name())]
    ResultOverflow { operation: Operation },
}

// -- Operations --

pub fn add(a: f64, b: f64) -> Result<f64, MathError> {
    validate_operands(a, b)?;
    check_overflow(a + b, Operation::Add)
}

pub fn subtract(a: f64, b: f64) -> Result<f64, MathError> {
    validate_operands(a, b)?;
    check_overflow(a - b, Operation::Subtract)
}

pub fn multiply(a: f64, b: f64) -> Result<f64, MathError> {
    validate_operands(a, b)?;
    check_overflow(a * b, Operation::Multiply)
}

pub fn divide(a: f64, b: f64) -> Result<f64, MathError> {
    validate_operands(a, b)?;

    // -0.0 compares equal to 0.0
    if b == 0.0 {
        return Err(MathError::DivisionByZero);
    }
    if b.abs() < MIN_DIVISOR_MAGNITUDE {
        return Err(MathError::PrecisionLoss);
    }

    check_overflow(a / b, Operation::Divide)
}

// -- Validation --

fn validate_operands(a: f64, b: f64) -> Result<(), MathError> {
    validate_operand(a, OperandPosition::First)?;
    validate_operand(b, OperandPosition::Second)
}

fn validate_operand(value: f64, operand: OperandPosition) -> Result<(), MathError> {
    if value.is_nan() {
        return Err(MathError::InvalidOperand {
            operand,
            kind: NonFinite::NaN,
        });
    }
    if value.is_infinite() {
        return Err(MathError::InvalidOperand {
            operand,
            kind: NonFinite::Infinity,
        });
    }
    Ok(())
}

fn check_overflow(result: f64, operation: Operation) -> Result<f64, MathError> {
    if result.is_infinite() {
        return Err(MathError::ResultOverflow { operation });
    }
    Ok(result)
}
