//! Expression engine boundary.
//!
//! Scripted import columns evaluate small expressions in a per-row variable
//! scope. The engine is consumed through this seam only: create a scope,
//! set variables, evaluate expression text to a typed value. Variables set
//! earlier in a scope are visible to later expressions in the same scope.

use rhai::{Dynamic, Engine, Scope};
use rust_decimal::prelude::ToPrimitive;

use crate::core::value::CellValue;
use crate::error::{DbError, Result};

/// A reusable expression engine. Cheap scopes are created per row.
pub struct ScriptEngine {
    engine: Engine,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
        }
    }

    /// Create a fresh, empty variable scope.
    pub fn new_scope(&self) -> ExprScope<'_> {
        ExprScope {
            engine: &self.engine,
            scope: Scope::new(),
        }
    }
}

/// One variable scope bound to its engine.
pub struct ExprScope<'e> {
    engine: &'e Engine,
    scope: Scope<'static>,
}

impl ExprScope<'_> {
    /// Set a scope variable.
    pub fn set(&mut self, name: &str, value: &CellValue) {
        self.scope.push_dynamic(name.to_string(), to_dynamic(value));
    }

    /// Evaluate an expression in this scope, returning a typed value.
    pub fn eval(&mut self, expr: &str) -> Result<CellValue> {
        let result = self
            .engine
            .eval_with_scope::<Dynamic>(&mut self.scope, expr)
            .map_err(|e| DbError::Script(format!("expression {:?} failed: {}", expr, e)))?;
        Ok(from_dynamic(result))
    }
}

fn to_dynamic(value: &CellValue) -> Dynamic {
    match value {
        CellValue::Null => Dynamic::UNIT,
        CellValue::Bool(v) => Dynamic::from(*v),
        CellValue::Int(v) => Dynamic::from(*v),
        CellValue::Float(v) => Dynamic::from(*v),
        CellValue::Decimal(v) => Dynamic::from(v.to_f64().unwrap_or_default()),
        CellValue::Text(v) => Dynamic::from(v.clone()),
        CellValue::DateTime(v) => Dynamic::from(v.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

fn from_dynamic(value: Dynamic) -> CellValue {
    if value.is_unit() {
        return CellValue::Null;
    }
    if let Some(v) = value.clone().try_cast::<bool>() {
        return CellValue::Bool(v);
    }
    if let Some(v) = value.clone().try_cast::<i64>() {
        return CellValue::Int(v);
    }
    if let Some(v) = value.clone().try_cast::<f64>() {
        return CellValue::Float(v);
    }
    if let Some(v) = value.clone().try_cast::<String>() {
        return CellValue::Text(v);
    }
    CellValue::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_arithmetic_with_scope_variable() {
        let engine = ScriptEngine::new();
        let mut scope = engine.new_scope();
        scope.set("index", &CellValue::Int(4));
        assert_eq!(scope.eval("index * 10 + 1").unwrap(), CellValue::Int(41));
    }

    #[test]
    fn test_later_expressions_see_earlier_variables() {
        let engine = ScriptEngine::new();
        let mut scope = engine.new_scope();
        scope.set("index", &CellValue::Int(2));
        let code = scope.eval("\"user_\" + index").unwrap();
        assert_eq!(code, CellValue::Text("user_2".to_string()));

        scope.set("code", &code);
        assert_eq!(
            scope.eval("code + \"@example.com\"").unwrap(),
            CellValue::Text("user_2@example.com".to_string())
        );
    }

    #[test]
    fn test_eval_error_is_reported() {
        let engine = ScriptEngine::new();
        let mut scope = engine.new_scope();
        let err = scope.eval("missing_variable + 1").unwrap_err();
        assert!(matches!(err, DbError::Script(_)));
    }

    #[test]
    fn test_null_round_trip() {
        let engine = ScriptEngine::new();
        let mut scope = engine.new_scope();
        scope.set("nothing", &CellValue::Null);
        assert_eq!(scope.eval("nothing").unwrap(), CellValue::Null);
    }
}
