//! # Import Identifier Codec
//!
//! Import identifiers are fixed-arity, `/`-separated tuples. The arity and the field
//! names come from the resource kind's [`ImportFormat`]:
//!
//! | Kind | Format |
//! |------|--------|
//! | org-scoped | `<organization>/<name>` |
//! | module-scoped | `<organization>/<module_name>/<module_provider>/<id>` |
//!
//! Decoding fails closed: a field-count mismatch or an empty field is a
//! [`ReconcileError::MalformedImportId`] naming the expected arity. There is no
//! best-effort split.

use crate::error::ReconcileError;

/// The field layout of one kind's import identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFormat {
    pub kind: &'static str,
    pub fields: &'static [&'static str],
}

pub const SEPARATOR: char = '/';

impl ImportFormat {
    pub const fn new(kind: &'static str, fields: &'static [&'static str]) -> Self {
        Self { kind, fields }
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Human-readable layout, e.g. `<organization>/<name>`.
    pub fn template(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("<{f}>"))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Parses an import identifier.
    ///
    /// # Errors
    /// [`ReconcileError::MalformedImportId`] when the field count differs from
    /// [`arity`](Self::arity) or any field is empty.
    pub fn decode(&self, import_id: &str) -> Result<ImportKey, ReconcileError> {
        let values: Vec<&str> = import_id.split(SEPARATOR).collect();
        if values.len() != self.arity() || values.iter().any(|v| v.is_empty()) {
            return Err(self.malformed(import_id));
        }
        Ok(ImportKey {
            format: *self,
            values: values.into_iter().map(str::to_string).collect(),
        })
    }

    /// Builds a key from already-separated values.
    ///
    /// # Errors
    /// Same rules as [`decode`](Self::decode); a value containing the separator is
    /// rejected since it could not be decoded back.
    pub fn key<I, S>(&self, values: I) -> Result<ImportKey, ReconcileError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != self.arity()
            || values.iter().any(|v| v.is_empty() || v.contains(SEPARATOR))
        {
            return Err(self.malformed(&values.join("/")));
        }
        Ok(ImportKey {
            format: *self,
            values,
        })
    }

    fn malformed(&self, import_id: &str) -> ReconcileError {
        ReconcileError::MalformedImportId {
            kind: self.kind.to_string(),
            import_id: import_id.to_string(),
            expected: self.arity(),
            format: self.template(),
        }
    }
}

/// A structured import key: one value per field of its [`ImportFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportKey {
    format: ImportFormat,
    values: Vec<String>,
}

impl ImportKey {
    /// Looks up a field by name.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.format
            .fields
            .iter()
            .position(|f| *f == field)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Canonical string form; `decode(encode(k)) == k`.
    pub fn encode(&self) -> String {
        self.values.join("/")
    }

    /// `(field, value)` pairs in format order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.format
            .fields
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: ImportFormat = ImportFormat::new("tfe_policy", &["organization", "name"]);
    const TEST_VARIABLE: ImportFormat = ImportFormat::new(
        "tfe_test_variable",
        &["organization", "module_name", "module_provider", "variable_id"],
    );

    #[test]
    fn test_decode_org_and_name() {
        let key = POLICY.decode("acme/infra-policy").unwrap();
        assert_eq!(key.get("organization"), Some("acme"));
        assert_eq!(key.get("name"), Some("infra-policy"));
        assert_eq!(key, POLICY.key(["acme", "infra-policy"]).unwrap());
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = POLICY.decode("acme").unwrap_err();
        match err {
            ReconcileError::MalformedImportId { expected, format, .. } => {
                assert_eq!(expected, 2);
                assert_eq!(format, "<organization>/<name>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extra_field_is_malformed_not_split() {
        assert!(POLICY.decode("acme/infra/policy").is_err());
        assert!(POLICY.decode("acme/").is_err());
        assert!(POLICY.decode("").is_err());
    }

    #[test]
    fn test_module_scoped_round_trip() {
        let key = TEST_VARIABLE
            .key(["acme", "vpc", "aws", "var-9"])
            .unwrap();
        let encoded = key.encode();
        assert_eq!(encoded, "acme/vpc/aws/var-9");
        assert_eq!(TEST_VARIABLE.decode(&encoded).unwrap(), key);
        assert_eq!(key.get("module_provider"), Some("aws"));
        assert!(TEST_VARIABLE.decode("acme/vpc/aws").is_err());
    }

    #[test]
    fn test_key_rejects_values_with_separator() {
        assert!(POLICY.key(["acme", "a/b"]).is_err());
    }
}
