//! Вычисление значений ограничений и переменных (числа или формулы)

use evalexpr::{build_operator_tree, ContextWithMutableVariables, HashMapContext, Value};
use std::collections::HashMap;

/// Результат вычисления выражения
pub type ExpressionResult = Result<f64, ExpressionError>;

/// Ошибки при работе с выражениями
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Пустое выражение
    Empty,
    /// Ошибка парсинга формулы
    ParseError(String),
    /// Ошибка вычисления формулы
    EvaluationError(String),
    /// Неверный тип значения
    InvalidType(String),
}

impl std::fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpressionError::Empty => write!(f, "Empty expression"),
            ExpressionError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ExpressionError::EvaluationError(msg) => write!(f, "Evaluation error: {}", msg),
            ExpressionError::InvalidType(msg) => write!(f, "Invalid type: {}", msg),
        }
    }
}

impl std::error::Error for ExpressionError {}

/// Проверить синтаксис выражения, не вычисляя его
pub fn check_expression(expression: &str) -> Result<(), ExpressionError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(ExpressionError::Empty);
    }
    build_operator_tree(trimmed)
        .map(|_| ())
        .map_err(|e| ExpressionError::ParseError(e.to_string()))
}

/// Числовое значение выражения без свободных идентификаторов.
///
/// `None` для символьных выражений (ссылки на параметры документа) и для мусора.
pub fn numeric_value(expression: &str) -> Option<f64> {
    evaluate_expression(expression, &HashMap::new()).ok()
}

/// Вычислить выражение с параметрами документа
pub fn evaluate_expression(expression: &str, params: &HashMap<String, f64>) -> ExpressionResult {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(ExpressionError::Empty);
    }

    // Быстрый путь для обычных чисел
    if let Ok(value) = trimmed.parse::<f64>() {
        return if value.is_finite() {
            Ok(value)
        } else {
            Err(ExpressionError::InvalidType(format!("non-finite value {trimmed}")))
        };
    }

    let mut context = HashMapContext::new();
    for (name, value) in params {
        context
            .set_value(name.clone(), Value::Float(*value))
            .map_err(|e| ExpressionError::EvaluationError(e.to_string()))?;
    }

    // Добавить математические константы
    context
        .set_value("PI".to_string(), Value::Float(std::f64::consts::PI))
        .ok();
    context
        .set_value("E".to_string(), Value::Float(std::f64::consts::E))
        .ok();

    let tree =
        build_operator_tree(trimmed).map_err(|e| ExpressionError::ParseError(e.to_string()))?;

    let value = tree
        .eval_with_context(&context)
        .map_err(|e| ExpressionError::EvaluationError(e.to_string()))?;

    // Преобразовать в f64
    let number = match value {
        Value::Float(f) => f,
        Value::Int(i) => i as f64,
        _ => {
            return Err(ExpressionError::InvalidType(format!(
                "Expected number, got {:?}",
                value
            )))
        }
    };
    if number.is_finite() {
        Ok(number)
    } else {
        Err(ExpressionError::InvalidType(format!("non-finite value {number}")))
    }
}
