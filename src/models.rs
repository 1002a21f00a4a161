// src/models.rs

use serde_json::Value;

use crate::constants::NEGATION_PREFIX;

/// A JSON object: the shape of every profile node in the configuration document.
pub type ProfileNode = serde_json::Map<String, Value>;

/// A stable handle to a node of a [`crate::core::tree::CommandTree`].
///
/// Handles are only minted by the tree that owns the node, so a child can keep
/// its parent's id without owning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// The value type of a bindable field. Drives both the argv conversion and
/// the JSON type accepted when merging persisted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, stored as a JSON string.
    Text,
    /// A signed integer, stored as a JSON number.
    Integer,
    /// A boolean switch (`--flag`), stored as a JSON boolean.
    Flag,
}

impl FieldKind {
    /// Whether a persisted JSON value can be loaded into a field of this kind.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_i64(),
            FieldKind::Flag => value.is_boolean(),
        }
    }

    /// Human name used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Integer => "an integer",
            FieldKind::Flag => "a boolean",
        }
    }
}

/// One bindable parameter of a command node.
///
/// The same entry serves three purposes: it is the JSON key under the node's
/// profile slice, the option declared to the argument parser, and the slot
/// the command body reads its value from.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    long: String,
    short: Option<char>,
    help: String,
    kind: FieldKind,
    mandatory: bool,
    required: bool,
    secret: bool,
    transient: bool,
    value: Option<Value>,
}

impl Field {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            long: name.clone(),
            name,
            short: None,
            help: String::new(),
            kind,
            mandatory: false,
            required: false,
            secret: false,
            transient: false,
            value: None,
        }
    }

    /// A text field. Its long flag defaults to its name.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    /// An integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// A boolean switch.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Flag)
    }

    /// Sets the short flag (`-x`).
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Overrides the long flag (`--xyz`).
    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = long.into();
        self
    }

    /// Sets the help line.
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Declares the field mandatory: parsing fails if it ends up with no value.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self.required = true;
        self
    }

    /// Never shows the value in help output.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Keeps the field out of the configuration document.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Sets an explicit default, present before any configuration is merged.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.set_value(value.into());
        self
    }

    /// The JSON key, also the parser id.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The long flag, without the leading `--`.
    pub fn long_flag(&self) -> &str {
        &self.long
    }

    /// The short flag, if any.
    pub fn short_flag(&self) -> Option<char> {
        self.short
    }

    /// The long flag that turns a [`FieldKind::Flag`] off (`no-<long>`).
    pub fn negated_long(&self) -> Option<String> {
        (self.kind == FieldKind::Flag).then(|| format!("{}{}", NEGATION_PREFIX, self.long))
    }

    /// The parser id of the negated flag.
    pub(crate) fn negation_id(&self) -> String {
        format!("{}{}", NEGATION_PREFIX, self.name)
    }

    /// The help line, empty when none was set.
    pub fn help_text(&self) -> &str {
        &self.help
    }

    /// The value type.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Whether the field was declared mandatory, regardless of relaxation.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Whether argv must still supply this field. Starts equal to
    /// [`Field::is_mandatory`] and is cleared by relaxation.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the value is hidden in help output.
    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// Whether the field is loaded from and saved to the configuration.
    pub fn is_persisted(&self) -> bool {
        !self.transient
    }

    /// The current value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The current value as text, for [`FieldKind::Text`] fields.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    /// The current value as an integer, for [`FieldKind::Integer`] fields.
    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_ref().and_then(Value::as_i64)
    }

    /// Flags read as `false` when unset.
    pub fn as_bool(&self) -> bool {
        self.value.as_ref().and_then(Value::as_bool).unwrap_or(false)
    }

    /// Replaces the current value; `null` clears it.
    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value).filter(|v| !v.is_null());
    }

    /// Removes the current value.
    pub fn clear(&mut self) {
        self.value = None;
    }

    pub(crate) fn relax(&mut self) {
        self.required = false;
    }

    /// Renders the current value the way the parser would accept it back.
    pub fn display_value(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_accepts_matching_json_types() {
        assert!(FieldKind::Text.accepts(&json!("x")));
        assert!(!FieldKind::Text.accepts(&json!(1)));
        assert!(FieldKind::Integer.accepts(&json!(-4)));
        assert!(!FieldKind::Integer.accepts(&json!(1.5)));
        assert!(FieldKind::Flag.accepts(&json!(true)));
        assert!(!FieldKind::Flag.accepts(&json!("true")));
    }

    #[test]
    fn test_null_default_means_no_value() {
        let field = Field::text("a").default_value(Value::Null);
        assert!(field.value().is_none());
    }

    #[test]
    fn test_mandatory_starts_required() {
        let mut field = Field::text("val").mandatory();
        assert!(field.is_required());
        field.relax();
        assert!(field.is_mandatory());
        assert!(!field.is_required());
    }

    #[test]
    fn test_only_flags_have_a_negated_long() {
        assert_eq!(
            Field::flag("shout").long("loud").negated_long().as_deref(),
            Some("no-loud")
        );
        assert_eq!(Field::text("name").negated_long(), None);
    }

    #[test]
    fn test_display_value_unquotes_strings() {
        assert_eq!(
            Field::text("a").default_value("foo").display_value().as_deref(),
            Some("foo")
        );
        assert_eq!(
            Field::integer("n").default_value(3).display_value().as_deref(),
            Some("3")
        );
    }
}
