//! Invocation validator
//!
//! Deterministic gate between the translator and the executor. An
//! invocation is either accepted whole or rejected on the first violated
//! rule. No reasoning backend is involved.

use crate::catalog::ToolCatalog;
use crate::error::{ValidationFailure, ValidationRule};
use crate::fingerprint::fingerprint;
use crate::models::{Invocation, ParamMap, ParamSpec, ParamType, ParamValue, ToolSpec};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Accepted invocation. Only the validator can construct one, and its
/// contents cannot change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInvocation {
    inner: Invocation,
    fingerprint: String,
}

impl ValidatedInvocation {
    pub fn tool(&self) -> &str {
        &self.inner.tool
    }

    pub fn parameters(&self) -> &ParamMap {
        &self.inner.parameters
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn as_invocation(&self) -> &Invocation {
        &self.inner
    }
}

pub struct InvocationValidator;

impl InvocationValidator {
    /// Run every rule in order; copy the invocation on acceptance
    pub fn validate(
        invocation: &Invocation,
        catalog: &ToolCatalog,
    ) -> Result<ValidatedInvocation, ValidationFailure> {
        let result = Self::check(invocation, catalog);

        match &result {
            Ok(validated) => debug!(
                tool = %validated.tool(),
                fingerprint = %validated.fingerprint(),
                "Invocation accepted"
            ),
            Err(failure) => warn!(
                tool = %invocation.tool,
                rule = ?failure.rule,
                field = %failure.field,
                "Invocation rejected"
            ),
        }

        result
    }

    fn check(
        invocation: &Invocation,
        catalog: &ToolCatalog,
    ) -> Result<ValidatedInvocation, ValidationFailure> {
        // 1. tool exists
        let spec = catalog.lookup(&invocation.tool).ok_or_else(|| {
            ValidationFailure::new(
                ValidationRule::UnknownTool,
                invocation.tool.clone(),
                format!("tool '{}' is not in the catalog", invocation.tool),
            )
        })?;

        // 2. required parameters present
        check_required(spec, &invocation.parameters)?;

        // 3. declared parameters well-typed and within constraints
        for (name, value) in &invocation.parameters {
            if let Some(param) = spec.parameters.get(name) {
                check_value(name, param, value)?;
            }
        }

        // 4. nothing beyond the schema
        if let Some(extra) = invocation
            .parameters
            .keys()
            .find(|name| !spec.parameters.contains_key(*name))
        {
            return Err(ValidationFailure::new(
                ValidationRule::UnexpectedParameter,
                extra.clone(),
                format!("'{}' is not a parameter of {}", extra, spec.name),
            ));
        }

        let inner = invocation.clone();
        let fingerprint = fingerprint(&inner);
        Ok(ValidatedInvocation { inner, fingerprint })
    }
}

fn check_required(spec: &ToolSpec, params: &ParamMap) -> Result<(), ValidationFailure> {
    match spec.required_params().find(|(name, _)| !params.contains_key(*name)) {
        Some((name, _)) => Err(ValidationFailure::new(
            ValidationRule::MissingParameter,
            name.clone(),
            format!("{} requires '{}'", spec.name, name),
        )),
        None => Ok(()),
    }
}

fn check_value(name: &str, spec: &ParamSpec, value: &ParamValue) -> Result<(), ValidationFailure> {
    let type_ok = match (spec.param_type, value) {
        (ParamType::String, ParamValue::Text(_)) => true,
        (ParamType::Date, ParamValue::Text(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        (ParamType::Integer, ParamValue::Integer(_)) => true,
        (ParamType::Number, ParamValue::Integer(_) | ParamValue::Number(_)) => true,
        (ParamType::Boolean, ParamValue::Boolean(_)) => true,
        _ => false,
    };

    if !type_ok {
        return Err(ValidationFailure::new(
            ValidationRule::TypeMismatch,
            name,
            format!("expected {}, got {} '{}'", spec.param_type, value.type_name(), value),
        ));
    }

    if let (Some(allowed), ParamValue::Text(s)) = (&spec.allowed_values, value) {
        if !allowed.iter().any(|a| a == s) {
            return Err(ValidationFailure::new(
                ValidationRule::DisallowedValue,
                name,
                format!("'{}' is not one of: {}", s, allowed.join(", ")),
            ));
        }
    }

    if let Some(number) = value.as_f64() {
        let below = spec.minimum.is_some_and(|min| number < min);
        let above = spec.maximum.is_some_and(|max| number > max);
        if below || above {
            return Err(ValidationFailure::new(
                ValidationRule::OutOfRange,
                name,
                format!(
                    "{} is outside [{}, {}]",
                    number,
                    spec.minimum.map_or("-inf".to_string(), |m| m.to_string()),
                    spec.maximum.map_or("inf".to_string(), |m| m.to_string()),
                ),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_catalog, text};

    fn validate(invocation: &Invocation) -> Result<ValidatedInvocation, ValidationFailure> {
        InvocationValidator::validate(invocation, &sample_catalog())
    }

    /// Minimal well-formed invocation: every required parameter with a correct value
    fn minimal_invocation(spec: &ToolSpec) -> Invocation {
        let mut invocation = Invocation::new(&spec.name);
        for (name, param) in spec.required_params() {
            let value = match param.param_type {
                ParamType::String => match &param.allowed_values {
                    Some(values) => text(&values[0]),
                    None => text("TSLA"),
                },
                ParamType::Date => text("2024-01-02"),
                ParamType::Integer => ParamValue::Integer(param.minimum.unwrap_or(1.0) as i64),
                ParamType::Number => ParamValue::Number(param.minimum.unwrap_or(1.0)),
                ParamType::Boolean => ParamValue::Boolean(true),
            };
            invocation.parameters.insert(name.clone(), value);
        }
        invocation
    }

    #[test]
    fn test_every_catalog_tool_accepts_well_formed_invocation() {
        let catalog = sample_catalog();
        for spec in catalog.describe() {
            let invocation = minimal_invocation(spec);
            let validated = InvocationValidator::validate(&invocation, &catalog)
                .unwrap_or_else(|f| panic!("{} rejected: {}", spec.name, f));
            assert_eq!(validated.as_invocation(), &invocation);
        }
    }

    #[test]
    fn test_unknown_tool_rejected_regardless_of_params() {
        let invocation = Invocation::new("delete.account")
            .with("symbol", text("TSLA"))
            .with("account_id", ParamValue::Integer(42));

        let failure = validate(&invocation).unwrap_err();
        assert_eq!(failure.rule, ValidationRule::UnknownTool);
        assert_eq!(failure.field, "delete.account");
    }

    #[test]
    fn test_missing_required_named_even_with_other_errors() {
        // bad limit type and an extraneous key, but the missing symbol is reported first
        let invocation = Invocation::new("news.company")
            .with("limit", text("lots"))
            .with("verbose", ParamValue::Boolean(true));

        let failure = validate(&invocation).unwrap_err();
        assert_eq!(failure.rule, ValidationRule::MissingParameter);
        assert_eq!(failure.field, "symbol");
    }

    #[test]
    fn test_type_mismatch() {
        let invocation = Invocation::new("news.company")
            .with("symbol", text("TSLA"))
            .with("limit", text("5"));

        let failure = validate(&invocation).unwrap_err();
        assert_eq!(failure.rule, ValidationRule::TypeMismatch);
        assert_eq!(failure.field, "limit");
    }

    #[test]
    fn test_invalid_date_is_type_mismatch() {
        let invocation = Invocation::new("equity.price.historical")
            .with("symbol", text("NVDA"))
            .with("start_date", text("January 2024"));

        let failure = validate(&invocation).unwrap_err();
        assert_eq!(failure.rule, ValidationRule::TypeMismatch);
        assert_eq!(failure.field, "start_date");
    }

    #[test]
    fn test_disallowed_enum_value() {
        let invocation = Invocation::new("news.company")
            .with("symbol", text("TSLA"))
            .with("provider", text("reddit"));

        let failure = validate(&invocation).unwrap_err();
        assert_eq!(failure.rule, ValidationRule::DisallowedValue);
        assert_eq!(failure.field, "provider");
    }

    #[test]
    fn test_out_of_range() {
        let invocation = Invocation::new("news.company")
            .with("symbol", text("TSLA"))
            .with("limit", ParamValue::Integer(0));

        let failure = validate(&invocation).unwrap_err();
        assert_eq!(failure.rule, ValidationRule::OutOfRange);
    }

    #[test]
    fn test_extraneous_parameter_rejected_not_dropped() {
        let invocation = Invocation::new("news.company")
            .with("symbol", text("TSLA"))
            .with("exec", text("rm -rf /"));

        let failure = validate(&invocation).unwrap_err();
        assert_eq!(failure.rule, ValidationRule::UnexpectedParameter);
        assert_eq!(failure.field, "exec");
    }

    #[test]
    fn test_accepted_invocation_is_a_copy() {
        let mut invocation = Invocation::new("news.company").with("symbol", text("TSLA"));
        let validated = validate(&invocation).unwrap();

        invocation.parameters.insert("symbol".into(), text("GME"));

        assert_eq!(validated.parameters()["symbol"], text("TSLA"));
        assert_eq!(validated.fingerprint().len(), 64);
    }
}
