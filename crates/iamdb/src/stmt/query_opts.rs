use crate::stmt::{Column, Condition, StatementBuilder};

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A single `ORDER BY` item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: Column,
    pub direction: Direction,
}

/// Filtering, ordering and pagination for read operations.
///
/// A limit or offset of `0` means "not set" and renders nothing.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct QueryOpts {
    condition: Option<Condition>,
    order_by: Vec<OrderBy>,
    limit: u32,
    offset: u32,
}

impl QueryOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Add an ascending sort column.
    pub fn order_by(mut self, column: &Column) -> Self {
        self.order_by.push(OrderBy {
            column: column.clone(),
            direction: Direction::Asc,
        });
        self
    }

    /// Add a descending sort column.
    pub fn order_by_desc(mut self, column: &Column) -> Self {
        self.order_by.push(OrderBy {
            column: column.clone(),
            direction: Direction::Desc,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn get_condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Append ` WHERE`, ` ORDER BY`, ` LIMIT` and ` OFFSET` as configured.
    pub fn write(&self, builder: &mut StatementBuilder) {
        if let Some(condition) = &self.condition {
            builder.push_where(condition);
        }
        if !self.order_by.is_empty() {
            builder.push(" ORDER BY ");
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                item.column.write_qualified(builder);
                if item.direction == Direction::Desc {
                    builder.push(" DESC");
                }
            }
        }
        if self.limit > 0 {
            builder.push(" LIMIT ").push_arg(i64::from(self.limit));
        }
        if self.offset > 0 {
            builder.push(" OFFSET ").push_arg(i64::from(self.offset));
        }
    }
}
