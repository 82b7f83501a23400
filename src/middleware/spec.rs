//! Middleware spec parsing.
//!
//! A spec is a pipe-and-colon encoded string: the middleware name,
//! optionally followed by an `only`/`except` method constraint, e.g.
//! `"auth|except:login,register"`.

use super::MiddlewareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Run only for the listed methods.
    Only,
    /// Run for every method except the listed ones.
    Except,
}

/// Method constraint attached to a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub methods: Vec<String>,
}

/// A parsed middleware spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareSpec {
    pub name: String,
    pub constraint: Option<Constraint>,
}

impl MiddlewareSpec {
    /// Parse a raw spec string.
    pub fn parse(raw: &str) -> Result<Self, MiddlewareError> {
        let mut parts = raw.splitn(2, '|');
        let name = parts.next().unwrap_or("").trim();
        if name.is_empty() {
            return Err(MiddlewareError::MalformedSpec { spec: raw.to_string() });
        }

        let constraint = match parts.next() {
            None => None,
            Some(rest) => {
                let (kind, list) = rest
                    .split_once(':')
                    .ok_or_else(|| MiddlewareError::MalformedSpec { spec: raw.to_string() })?;
                let kind = match kind.trim() {
                    "only" => ConstraintKind::Only,
                    "except" => ConstraintKind::Except,
                    _ => {
                        return Err(MiddlewareError::MalformedSpec { spec: raw.to_string() })
                    }
                };
                let methods: Vec<String> = list
                    .split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect();
                Some(Constraint { kind, methods })
            }
        };

        Ok(Self {
            name: name.to_string(),
            constraint,
        })
    }

    /// Whether the constraint allows this spec to run for a method.
    ///
    /// Constraints gate strictly by exact method-name membership.
    pub fn applies_to(&self, method: &str) -> bool {
        match &self.constraint {
            None => true,
            Some(c) => {
                let listed = c.methods.iter().any(|m| m == method);
                match c.kind {
                    ConstraintKind::Only => listed,
                    ConstraintKind::Except => !listed,
                }
            }
        }
    }
}
