use crate::stmt::StatementBuilder;
use std::borrow::Cow;

/// A column qualified by its table alias.
///
/// Text columns that are searched case-insensitively may carry a lowercase
/// twin: a stored column holding `LOWER(<column>)`. Conditions prefer the twin
/// so the lookup can use an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    table: Cow<'static, str>,
    name: Cow<'static, str>,
    lower: Option<Cow<'static, str>>,
}

impl Column {
    pub const fn new(table: &'static str, name: &'static str) -> Self {
        Self {
            table: Cow::Borrowed(table),
            name: Cow::Borrowed(name),
            lower: None,
        }
    }

    /// Use `<name>_lower` as the lowercase twin.
    pub fn with_lower_twin(mut self) -> Self {
        self.lower = Some(Cow::Owned(format!("{}_lower", self.name)));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_lower_twin(&self) -> bool {
        self.lower.is_some()
    }

    /// `table.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }

    /// Write `table.name`.
    pub fn write_qualified(&self, builder: &mut StatementBuilder) {
        builder.push(&self.table).push_char('.').push(&self.name);
    }

    /// Write the bare name, as used on the left side of a SET assignment.
    pub fn write_unqualified(&self, builder: &mut StatementBuilder) {
        builder.push(&self.name);
    }

    /// Write the lowercase form: the twin if present, `LOWER(table.name)` otherwise.
    pub(crate) fn write_lower(&self, builder: &mut StatementBuilder) {
        match &self.lower {
            Some(lower) => {
                builder.push(&self.table).push_char('.').push(lower);
            }
            None => {
                builder.push("LOWER(");
                self.write_qualified(builder);
                builder.push_char(')');
            }
        }
    }
}
